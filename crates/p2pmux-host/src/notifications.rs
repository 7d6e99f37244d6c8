use crossbeam_channel::{unbounded, Receiver, Sender};
use p2pmux_core::{
    transport::{Transport, TransportState},
    types::PeerId,
};

/// A transport callback captured for later dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notification {
    ConnectRequest(PeerId),
    StateChanged(PeerId, TransportState),
}

/// Queue bridging transport callbacks into the owner's tick.
///
/// Handlers installed on the transport only push into the queue; the owner pops and
/// handles notifications on its own call path.
#[derive(Debug)]
pub(crate) struct NotificationQueue {
    sender: Sender<Notification>,
    receiver: Receiver<Notification>,
}

impl NotificationQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub(crate) fn register_connect_requests<T: Transport>(&self, transport: &mut T) {
        let sender = self.sender.clone();
        transport.set_connect_request_handler(Box::new(move |peer| {
            let _ = sender.send(Notification::ConnectRequest(peer));
        }));
    }

    pub(crate) fn register_state_changes<T: Transport>(&self, transport: &mut T) {
        let sender = self.sender.clone();
        transport.set_state_changed_handler(Box::new(move |peer, state| {
            let _ = sender.send(Notification::StateChanged(peer, state));
        }));
    }

    pub(crate) fn pop(&self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Discards everything queued.
    pub(crate) fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }
}
