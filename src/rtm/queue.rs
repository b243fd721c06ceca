use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use super::message::Message;

// ============================================================================
// MessageQueue - inbound/outbound FIFO buffers
// ============================================================================

/// Two independent FIFO buffers decoupling socket I/O from application code:
/// one for received messages, one for messages waiting to be sent.
///
/// All operations are safe under concurrent use from the receive loop, the
/// send loop and external callers; FIFO order is preserved per direction.
/// No operation blocks waiting for data: absence is represented by the
/// [`Message::none`] sentinel. Both buffers are unbounded; there is no
/// backpressure on producers.
#[derive(Clone)]
pub struct MessageQueue {
    inbound_tx: Sender<Message>,
    inbound_rx: Receiver<Message>,
    outbound_tx: Sender<Message>,
    outbound_rx: Receiver<Message>,
}

impl MessageQueue {
    pub fn new() -> MessageQueue {
        let (inbound_tx, inbound_rx) = unbounded();
        let (outbound_tx, outbound_rx) = unbounded();
        MessageQueue {
            inbound_tx,
            inbound_rx,
            outbound_tx,
            outbound_rx,
        }
    }

    /// Removes and returns the oldest inbound message, or the sentinel if the
    /// queue is empty. Never blocks.
    pub fn read_inbound(&self) -> Message {
        self.inbound_rx.try_recv().unwrap_or_else(|_| Message::none())
    }

    /// Appends to the inbound queue. Called only by the receive loop.
    pub(crate) fn enqueue_inbound(&self, message: Message) {
        // The queue owns both channel ends, so the send cannot fail.
        let _ = self.inbound_tx.send(message);
    }

    /// Appends to the outbound queue. Never blocks, never fails.
    pub fn enqueue_outbound(&self, message: Message) {
        let _ = self.outbound_tx.send(message);
    }

    /// Removes and returns the oldest outbound message, or the sentinel if
    /// the queue is empty. Never blocks.
    pub fn dequeue_outbound(&self) -> Message {
        self.outbound_rx.try_recv().unwrap_or_else(|_| Message::none())
    }

    /// Waits up to `timeout` for an outbound message. Used by the send loop:
    /// an enqueue wakes the loop immediately, the timeout is the fallback
    /// sleep between idle cycles.
    pub(crate) fn recv_outbound(&self, timeout: Duration) -> Option<Message> {
        match self.outbound_rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
