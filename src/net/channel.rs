//! Peer transport seam and the inbound hand-off queue
//!
//! The host's network stack delivers bytes on whatever thread it likes;
//! they land in an [`InboundQueue`] and the simulation drains it once per
//! tick. Outbound traffic goes through the [`PeerChannel`] trait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::game::constants::net::INBOUND_QUEUE_CAPACITY;

/// Connection state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Something the transport handed to the simulation
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Payload(Vec<u8>),
    ConnectionChanged(ConnectionState),
}

/// Reliable, ordered delivery to every connected peer
pub trait PeerChannel: Send {
    fn send(&self, payload: &[u8]) -> Result<(), ChannelError>;

    fn is_connected(&self) -> bool;

    /// Tear down the connection; the remote side observes a disconnect
    fn disconnect(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("peer disconnected")]
    Disconnected,
    #[error("peer queue full")]
    Full,
}

/// Bounded queue between the transport and the tick loop
pub struct InboundQueue {
    sender: Sender<Inbound>,
    receiver: Receiver<Inbound>,
    capacity: usize,
}

impl InboundQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Handle the transport pushes into
    pub fn sender(&self) -> InboundSender {
        InboundSender {
            sender: self.sender.clone(),
        }
    }

    /// Non-blocking push; false when the queue is full
    #[inline]
    pub fn try_submit(&self, item: Inbound) -> bool {
        self.sender.try_send(item).is_ok()
    }

    /// Everything received since the previous tick, in arrival order
    pub fn drain(&self) -> Vec<Inbound> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new(INBOUND_QUEUE_CAPACITY)
    }
}

/// Clonable producer handle for transport callbacks
#[derive(Clone)]
pub struct InboundSender {
    sender: Sender<Inbound>,
}

impl InboundSender {
    pub fn try_send(&self, item: Inbound) -> Result<(), ChannelError> {
        self.sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::Full,
            TrySendError::Disconnected(_) => ChannelError::Disconnected,
        })
    }
}

/// In-process channel that delivers straight into the other peer's queue
pub struct LoopbackChannel {
    remote: InboundSender,
    connected: Arc<AtomicBool>,
}

impl PeerChannel for LoopbackChannel {
    fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ChannelError::Disconnected);
        }
        self.remote.try_send(Inbound::Payload(payload.to_vec()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn disconnect(&self) {
        // Only the first side to hang up notifies
        if self.connected.swap(false, Ordering::AcqRel) {
            // The peer still sees the cleared flag through is_connected
            if let Err(e) = self
                .remote
                .try_send(Inbound::ConnectionChanged(ConnectionState::Disconnected))
            {
                warn!("Disconnect notice not delivered: {}", e);
            }
        }
    }
}

/// One end of a loopback link
pub struct LoopbackEnd {
    pub channel: LoopbackChannel,
    pub inbound: InboundQueue,
}

/// Two connected in-process peers, for demos and tests
pub fn loopback_pair(capacity: usize) -> (LoopbackEnd, LoopbackEnd) {
    let queue_a = InboundQueue::new(capacity);
    let queue_b = InboundQueue::new(capacity);
    let connected = Arc::new(AtomicBool::new(true));

    let a = LoopbackEnd {
        channel: LoopbackChannel {
            remote: queue_b.sender(),
            connected: connected.clone(),
        },
        inbound: queue_a,
    };
    let b = LoopbackEnd {
        channel: LoopbackChannel {
            remote: a.inbound.sender(),
            connected,
        },
        inbound: queue_b,
    };
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_basic() {
        let queue = InboundQueue::new(10);
        assert!(queue.is_empty());
        assert!(queue.try_submit(Inbound::Payload(vec![1])));
        assert!(queue.try_submit(Inbound::Payload(vec![2])));
        assert_eq!(queue.pending_count(), 2);

        let drained = queue.drain();
        assert_eq!(drained, vec![Inbound::Payload(vec![1]), Inbound::Payload(vec![2])]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_backpressure() {
        let queue = InboundQueue::new(2);
        assert!(queue.try_submit(Inbound::Payload(vec![])));
        assert!(queue.try_submit(Inbound::Payload(vec![])));
        assert!(!queue.try_submit(Inbound::Payload(vec![])));
        assert_eq!(
            queue.sender().try_send(Inbound::Payload(vec![])),
            Err(ChannelError::Full)
        );
    }

    #[test]
    fn test_concurrent_submit() {
        use std::thread;

        let queue = InboundQueue::new(1000);
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let sender = queue.sender();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _ = sender.try_send(Inbound::Payload(vec![i]));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.drain().len(), 400);
    }

    #[test]
    fn test_loopback_delivers_to_other_side() {
        let (a, b) = loopback_pair(16);
        a.channel.send(b"hello").unwrap();
        b.channel.send(b"world").unwrap();
        assert_eq!(b.inbound.drain(), vec![Inbound::Payload(b"hello".to_vec())]);
        assert_eq!(a.inbound.drain(), vec![Inbound::Payload(b"world".to_vec())]);
    }

    #[test]
    fn test_loopback_disconnect_notifies_once() {
        let (a, b) = loopback_pair(16);
        a.channel.disconnect();
        a.channel.disconnect();
        b.channel.disconnect();

        assert!(!a.channel.is_connected());
        assert!(!b.channel.is_connected());
        assert_eq!(
            b.inbound.drain(),
            vec![Inbound::ConnectionChanged(ConnectionState::Disconnected)]
        );
        assert!(a.inbound.is_empty());
        assert_eq!(a.channel.send(b"late"), Err(ChannelError::Disconnected));
    }

    #[test]
    fn test_disconnect_with_full_queue_still_clears_flag() {
        let (a, b) = loopback_pair(1);
        a.channel.send(b"fill").unwrap();
        a.channel.disconnect();

        // Notice dropped; only the payload made it
        assert_eq!(b.inbound.drain(), vec![Inbound::Payload(b"fill".to_vec())]);
        assert!(!b.channel.is_connected());
    }
}
