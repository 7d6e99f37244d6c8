//! Echo server and client talking over an in-memory network.
//!
//! Run:
//! - cargo run -p p2pmux --example loopback
//! - RUST_LOG=debug cargo run -p p2pmux --example loopback

use crossbeam_channel::unbounded;
use p2pmux::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let network = EmulatedNetwork::new();
    let server_id = PeerId::new(76561198000000001).ok_or("invalid server id")?;
    let client_id = PeerId::new(76561198000000002).ok_or("invalid client id")?;

    let (server_tx, server_rx) = unbounded();
    let mut server =
        Server::new(network.transport(server_id), ChannelSink::new(server_tx), Config::default());
    let (client_tx, client_rx) = unbounded();
    let mut client =
        Client::new(network.transport(client_id), ChannelSink::new(client_tx), Config::default());

    let address = server_id.to_string();
    if !client.can_parse_id(&address) {
        return Err(format!("cannot parse {}", address).into());
    }
    client.connect(&address);

    let messages = ["hello", "from", "the", "loopback", "demo"];
    let mut sent = 0;
    let mut echoed = 0;

    for _ in 0..32 {
        server.receive_data();
        for event in server_rx.try_iter() {
            match event {
                ServerEvent::Connected(id) => println!("[server] connect {}", id),
                ServerEvent::Data { connection, payload, channel } => {
                    println!(
                        "[server] {} bytes on {:?} from {}",
                        payload.len(),
                        channel,
                        connection
                    );
                    server.send(connection, &payload, channel);
                }
                ServerEvent::Disconnected(id) => println!("[server] disconnect {}", id),
                ServerEvent::Error(id, err) => println!("[server] error on {}: {}", id, err),
            }
        }

        client.tick();
        for event in client_rx.try_iter() {
            match event {
                ClientEvent::Connected => println!("[client] connected to {}", address),
                ClientEvent::Data { payload, .. } => {
                    echoed += 1;
                    println!("[client] echo \"{}\"", String::from_utf8_lossy(&payload));
                }
                ClientEvent::Disconnected => println!("[client] disconnected"),
                ClientEvent::Error(err) => println!("[client] error: {}", err),
            }
        }

        if client.is_connected() && sent < messages.len() {
            let channel = if sent % 2 == 0 { Channel::Reliable } else { Channel::Unreliable };
            client.send(messages[sent].as_bytes(), channel);
            sent += 1;
        }
        if echoed == messages.len() {
            break;
        }
    }

    client.disconnect();
    server.receive_data();
    for event in server_rx.try_iter() {
        println!("[server] {:?}", event);
    }
    client.shutdown();
    server.shutdown();
    Ok(())
}
