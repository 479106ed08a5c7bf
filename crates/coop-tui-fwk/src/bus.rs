//! Message bus between workers and the event loop.
//!
//! Every command runs on its own tokio task and reports back by enqueuing a
//! message onto one bounded channel. The event loop owns the only receiver,
//! so messages are applied in enqueue order, one at a time.

use thiserror::Error;
use tokio::sync::mpsc;

/// Default channel buffer size for worker messages.
pub const DEFAULT_CHANNEL_SIZE: usize = 128;

/// Error returned when the event loop has gone away.
#[derive(Debug, Error)]
#[error("message bus closed")]
pub struct SendError<M>(pub M);

/// Typed channel registry for messages of type `M`.
///
/// # Example
///
/// ```ignore
/// let mut bus = MessageBus::<String>::new();
/// let tx = bus.sender();
/// let mut rx = bus.take_receiver().unwrap();
///
/// tx.send("hello".to_string()).await?;
/// assert_eq!(rx.recv().await.as_deref(), Some("hello"));
/// ```
pub struct MessageBus<M> {
    tx: mpsc::Sender<M>,
    rx: Option<mpsc::Receiver<M>>,
}

impl<M: Send + 'static> MessageBus<M> {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_SIZE)
    }

    /// Create a bus holding up to `capacity` undelivered messages.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx: Some(rx) }
    }

    /// A sender for one more worker.
    pub fn sender(&self) -> BusSender<M> {
        BusSender {
            tx: self.tx.clone(),
        }
    }

    /// Take the receiver.
    ///
    /// This can only be called once; the event loop owns the receiver.
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<M>> {
        self.rx.take()
    }
}

impl<M: Send + 'static> Default for MessageBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sending half handed to workers.
pub struct BusSender<M> {
    tx: mpsc::Sender<M>,
}

impl<M> Clone for BusSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M: Send + 'static> BusSender<M> {
    /// Enqueue a message, waiting for room.
    pub async fn send(&self, message: M) -> Result<(), SendError<M>> {
        self.tx.send(message).await.map_err(|e| SendError(e.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_arrive_in_enqueue_order() {
        let mut bus = MessageBus::<u32>::new();
        let mut rx = bus.take_receiver().unwrap();
        assert!(bus.take_receiver().is_none());

        let a = bus.sender();
        let b = a.clone();
        a.send(1).await.unwrap();
        b.send(2).await.unwrap();
        a.send(3).await.unwrap();

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn test_concurrent_workers() {
        let mut bus = MessageBus::<usize>::with_capacity(4);
        let mut rx = bus.take_receiver().unwrap();
        for i in 0..16 {
            let tx = bus.sender();
            tokio::spawn(async move {
                tx.send(i).await.unwrap();
            });
        }
        let mut seen = Vec::new();
        for _ in 0..16 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_closed_bus_returns_message() {
        let mut bus = MessageBus::<u8>::with_capacity(1);
        let tx = bus.sender();
        drop(bus.take_receiver());
        assert!(matches!(tx.send(7).await, Err(SendError(7))));
    }
}
