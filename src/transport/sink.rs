use crate::foundation::error::{RelayError, RelayResult};
use crate::transport::message::RelayMessage;

/// Outbound channel to the producer.
///
/// `send` must not block. An `Err` means the message was dropped; the relay logs it and carries
/// on as if it had been delivered.
pub trait AckSink {
    /// Queue one message.
    fn send(&mut self, msg: RelayMessage) -> RelayResult<()>;
}

/// In-memory sink for tests and replays.
#[derive(Debug, Default)]
pub struct InMemoryAckSink {
    messages: Vec<RelayMessage>,
    closed: bool,
}

impl InMemoryAckSink {
    /// Create an open, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, in send order.
    pub fn messages(&self) -> &[RelayMessage] {
        &self.messages
    }

    /// Drain received messages.
    pub fn take(&mut self) -> Vec<RelayMessage> {
        std::mem::take(&mut self.messages)
    }

    /// Refuse all further messages, as a disconnected channel would.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl AckSink for InMemoryAckSink {
    fn send(&mut self, msg: RelayMessage) -> RelayResult<()> {
        if self.closed {
            return Err(RelayError::transport("channel closed"));
        }
        self.messages.push(msg);
        Ok(())
    }
}

impl<T: AckSink + ?Sized> AckSink for Box<T> {
    fn send(&mut self, msg: RelayMessage) -> RelayResult<()> {
        (**self).send(msg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transport/sink.rs"]
mod tests;
