//! Process-wide signals for the console (publish/subscribe).
//!
//! Components that render from the session (navigation, guards, notices)
//! subscribe for as long as they are mounted and drop the subscription on
//! teardown.

pub mod bus;
pub mod in_memory_bus;
pub mod signal;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use signal::{broadcast, SessionSignal, SignalBus};
