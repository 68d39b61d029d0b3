//! Cross-app event bus.
//!
//! Micro-frontends loaded into the same shell share one bus instance and react
//! to each other's events without importing one another.

pub mod broadcast;
pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use broadcast::{AUTH_TOKEN_EVENT, AuthBroadcaster, AuthTokenEvent};
pub use bus::{BusError, EventBus, Subscription};
pub use event::{BusEvent, EventMetadata};
pub use in_memory_bus::InMemoryEventBus;
