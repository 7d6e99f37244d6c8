//! Property tests for delivery order, pause semantics and connection id allocation.

use std::collections::HashSet;

use crossbeam_channel::{unbounded, Receiver};
use p2pmux_core::{
    channel::{Channel, SendPolicy},
    config::Config,
    emulator::{EmulatedNetwork, EmulatedTransport, TransportCall},
    transport::TransportState,
    types::{ConnectionId, PeerId},
};
use p2pmux_host::{ChannelSink, Server, ServerEvent};
use proptest::prelude::*;

const SERVER: u64 = 1;

type TestServer = Server<EmulatedTransport, ChannelSink<ServerEvent>>;

fn peer(raw: u64) -> PeerId {
    PeerId::new(raw).unwrap()
}

fn server(config: Config) -> (EmulatedNetwork, TestServer, Receiver<ServerEvent>) {
    let network = EmulatedNetwork::new();
    let (sender, events) = unbounded();
    let server = Server::new(network.transport(peer(SERVER)), ChannelSink::new(sender), config);
    (network, server, events)
}

fn policy(reliable: bool) -> SendPolicy {
    if reliable {
        SendPolicy::Reliable
    } else {
        SendPolicy::Unreliable
    }
}

fn delivered(events: &Receiver<ServerEvent>) -> Vec<u16> {
    events
        .try_iter()
        .filter_map(|e| match e {
            ServerEvent::Data { payload, .. } => Some(u16::from_le_bytes([payload[0], payload[1]])),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn delivery_order_matches_arrival_order(
        arrivals in proptest::collection::vec(any::<bool>(), 1..64),
        connect_at in 0usize..64,
        tick_every in 1usize..8,
    ) {
        let (network, mut server, events) = server(Config::default());
        network.request_connect(peer(100), peer(SERVER));
        server.receive_data();

        for (i, reliable) in arrivals.iter().enumerate() {
            if i == connect_at {
                network.notify_state(peer(SERVER), peer(100), TransportState::Connected);
            }
            let seq = (i as u16).to_le_bytes();
            network.deliver(peer(SERVER), peer(100), policy(*reliable), seq.to_vec());
            if i % tick_every == 0 {
                server.receive_data();
            }
        }
        network.notify_state(peer(SERVER), peer(100), TransportState::Connected);
        server.receive_data();

        let expected: Vec<u16> = (0..arrivals.len() as u16).collect();
        prop_assert_eq!(delivered(&events), expected);
    }

    #[test]
    fn pause_keeps_reliable_and_drops_unreliable(
        arrivals in proptest::collection::vec(any::<bool>(), 0..64),
    ) {
        let (network, mut server, events) = server(Config::default());
        network.request_connect(peer(100), peer(SERVER));
        network.notify_state(peer(SERVER), peer(100), TransportState::Connected);
        server.receive_data();
        server.pause();

        for (i, reliable) in arrivals.iter().enumerate() {
            let seq = (i as u16).to_le_bytes();
            network.deliver(peer(SERVER), peer(100), policy(*reliable), seq.to_vec());
        }
        server.receive_data();
        prop_assert!(delivered(&events).is_empty());

        server.unpause();
        let expected: Vec<u16> = arrivals
            .iter()
            .enumerate()
            .filter(|(_, reliable)| **reliable)
            .map(|(i, _)| i as u16)
            .collect();
        prop_assert_eq!(delivered(&events), expected);
    }

    #[test]
    fn connection_ids_are_unique_and_never_reused(
        ops in proptest::collection::vec((1u64..6, any::<bool>()), 1..80),
        max_connections in 1usize..4,
    ) {
        let (network, mut server, events) = server(Config::with_max_connections(max_connections));
        let mut seen: HashSet<ConnectionId> = HashSet::new();

        for (raw, open) in ops {
            let remote = peer(100 + raw);
            if open {
                network.request_connect(remote, peer(SERVER));
                network.notify_state(peer(SERVER), remote, TransportState::Connected);
            } else {
                network.notify_state(peer(SERVER), remote, TransportState::Closed);
            }
            server.receive_data();

            prop_assert!(server.connection_count() <= max_connections);
            for event in events.try_iter() {
                if let ServerEvent::Connected(id) = event {
                    prop_assert!(seen.insert(id), "connection id {} handed out twice", id);
                }
            }

            let active: HashSet<ConnectionId> =
                (1..6).filter_map(|r| server.connection_for(peer(100 + r))).collect();
            prop_assert_eq!(active.len(), server.connection_count());
        }
    }

    #[test]
    fn requests_beyond_capacity_are_never_accepted(
        max_connections in 1usize..5,
        requests in 1u64..10,
    ) {
        let (network, mut server, _events) = server(Config::with_max_connections(max_connections));
        for raw in 0..requests {
            network.request_connect(peer(100 + raw), peer(SERVER));
        }
        server.receive_data();

        let accepted = (0..requests)
            .filter(|raw| {
                network.count_calls(peer(SERVER), &TransportCall::Accept(peer(100 + raw))) == 1
            })
            .count();
        let expected = max_connections.min(requests as usize);
        prop_assert_eq!(accepted, expected);
        prop_assert_eq!(server.connection_count(), expected);
    }

    #[test]
    fn oversized_reliable_send_closes(extra in 1usize..4096) {
        let (network, mut server, events) = server(Config::default());
        network.request_connect(peer(100), peer(SERVER));
        network.notify_state(peer(SERVER), peer(100), TransportState::Connected);
        server.receive_data();
        let id = server.connection_for(peer(100)).unwrap();

        let payload = vec![0u8; Channel::Reliable.max_payload_size() + extra];
        prop_assert!(!server.send(id, &payload, Channel::Reliable));
        prop_assert_eq!(server.connection_count(), 0);
        prop_assert!(network.sent_to(peer(SERVER), peer(100)).is_empty());
        prop_assert!(events.try_iter().any(|e| e == ServerEvent::Disconnected(id)));
    }

    #[test]
    fn native_policy_round_trip(tag in any::<u8>()) {
        let channel = Channel::from_policy(SendPolicy::from_tag(tag));
        let expected = if tag == SendPolicy::Unreliable.tag() {
            Channel::Unreliable
        } else {
            Channel::Reliable
        };
        prop_assert_eq!(channel, expected);
        prop_assert_eq!(Channel::from_policy(channel.send_policy()), channel);
    }
}
