//! `bankflow-core` — shared building blocks for the session layer.
//!
//! This crate has no IO: errors, time, storage key names and configuration.

pub mod clock;
pub mod config;
pub mod error;
pub mod keys;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, ChannelHeaders};
pub use error::{AuthError, AuthResult};
