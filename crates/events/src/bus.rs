//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus guarantees little:
//!
//! - **Fire-and-forget**: no acknowledgement, no retry, no persistence
//! - **At-most-once**: a subscriber that is gone when an event is published misses it
//! - **Ordering**: publish-call order within one process only
//!
//! Anything that needs stronger guarantees reads the session store instead.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use thiserror::Error;

/// A subscription to the bus.
///
/// Each subscription receives a copy of every event published after it was
/// created (broadcast semantics).
///
/// ```ignore
/// let sub = bus.subscribe();
/// while let Ok(event) = sub.recv_timeout(Duration::from_millis(100)) {
///     if event.name == "authToken" { /* ... */ }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Shared pub/sub bus.
///
/// `Send + Sync` so one instance can be handed to every micro-frontend.
pub trait EventBus<M>: Send + Sync {
    fn publish(&self, message: M) -> Result<(), BusError>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    fn publish(&self, message: M) -> Result<(), BusError> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
