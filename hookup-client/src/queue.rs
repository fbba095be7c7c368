//! Outbound message buffering
//!
//! While the client is not connected, outbound messages either wait in a
//! [`MessageQueue`] (buffered clients) or are dropped with a warning
//! (unbuffered clients, the default). On the next successful open the queue
//! is drained into the new connection in FIFO order, before any message
//! sent after the open.

use crate::transport::Connection;
use hookup_core::{Message, Result};
use std::collections::VecDeque;

/// FIFO of messages waiting for a connection
#[derive(Debug, Default)]
pub struct MessageQueue {
    buffered: bool,
    pending: VecDeque<Message>,
}

impl MessageQueue {
    /// Create a queue; with `buffered` false every enqueue is a drop
    pub fn new(buffered: bool) -> Self {
        Self {
            buffered,
            pending: VecDeque::new(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Hold `message` until the next drain
    ///
    /// Returns false (and logs) when buffering is disabled and the message
    /// was discarded.
    pub fn enqueue(&mut self, message: Message) -> bool {
        if !self.buffered {
            tracing::warn!(
                bytes = message.len(),
                "Not connected and buffering disabled, dropping message"
            );
            return false;
        }

        self.pending.push_back(message);
        tracing::debug!(pending = self.pending.len(), "Message buffered");
        true
    }

    /// Send every pending message through `connection`, oldest first
    ///
    /// A message leaves the queue only once the connection accepted it, so
    /// on error the failed message and everything behind it stay queued for
    /// the next connection.
    pub async fn drain_into<C>(&mut self, connection: &mut C) -> Result<usize>
    where
        C: Connection + ?Sized,
    {
        let mut sent = 0;

        while let Some(message) = self.pending.front() {
            connection.send(message.clone()).await?;
            self.pending.pop_front();
            sent += 1;
        }

        if sent > 0 {
            tracing::debug!(sent, "Drained buffered messages");
        }

        Ok(sent)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discard everything pending, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hookup_core::Error;

    /// Records sends and fails after `accept` messages
    struct RecordingConnection {
        sent: Vec<Message>,
        accept: usize,
    }

    impl RecordingConnection {
        fn accepting(accept: usize) -> Self {
            Self {
                sent: Vec::new(),
                accept,
            }
        }
    }

    #[async_trait]
    impl Connection for RecordingConnection {
        async fn send(&mut self, message: Message) -> Result<()> {
            if self.sent.len() >= self.accept {
                return Err(Error::NotConnected);
            }
            self.sent.push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<Message>> {
            None
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unbuffered_queue_drops() {
        let mut queue = MessageQueue::new(false);
        assert!(!queue.is_buffered());

        assert!(!queue.enqueue(Message::text("lost")));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_buffered_queue_holds_messages() {
        let mut queue = MessageQueue::new(true);

        assert!(queue.enqueue(Message::text("one")));
        assert!(queue.enqueue(Message::text("two")));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let mut queue = MessageQueue::new(true);
        for text in ["a", "b", "c"] {
            queue.enqueue(Message::text(text));
        }

        let mut connection = RecordingConnection::accepting(usize::MAX);
        let sent = queue.drain_into(&mut connection).await.unwrap();

        assert_eq!(sent, 3);
        assert!(queue.is_empty());
        assert_eq!(
            connection.sent,
            vec![Message::text("a"), Message::text("b"), Message::text("c")]
        );
    }

    #[tokio::test]
    async fn test_failed_drain_keeps_remaining_messages() {
        let mut queue = MessageQueue::new(true);
        for text in ["a", "b", "c"] {
            queue.enqueue(Message::text(text));
        }

        let mut connection = RecordingConnection::accepting(1);
        let result = queue.drain_into(&mut connection).await;

        assert_eq!(result, Err(Error::NotConnected));
        assert_eq!(connection.sent, vec![Message::text("a")]);
        assert_eq!(queue.len(), 2);

        // Next connection picks up where the last one failed.
        let mut connection = RecordingConnection::accepting(usize::MAX);
        assert_eq!(queue.drain_into(&mut connection).await.unwrap(), 2);
        assert_eq!(connection.sent, vec![Message::text("b"), Message::text("c")]);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let mut queue = MessageQueue::new(true);
        let mut connection = RecordingConnection::accepting(0);
        assert_eq!(queue.drain_into(&mut connection).await.unwrap(), 0);
    }
}
