//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus distributes small notifications to every mounted consumer:
//!
//! - **Broadcast**: each subscription gets its own copy of every message
//!   published after it subscribed.
//! - **No persistence**: a subscriber that mounts later does not see earlier
//!   messages; consumers re-read the session store on mount instead.
//! - **Unsubscription**: dropping a [`Subscription`] (or calling
//!   [`Subscription::unsubscribe`]) detaches it; the bus prunes detached
//!   subscribers on the next publish.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to a message stream.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Every message currently queued, oldest first, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Detach from the bus.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Domain-agnostic bus.
///
/// `publish` fails only on internal errors of the implementation; a message
/// with no subscribers is not an error.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
