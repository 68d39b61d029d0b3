//! Auth-state propagation across micro-frontends.
//!
//! Every login and logout publishes an `authToken` event so remotes that keep
//! their own HTTP stack can pick up (or drop) the bearer token.

use std::sync::Arc;

use chrono::Utc;

use crate::bus::{EventBus, Subscription};
use crate::event::{BusEvent, EventMetadata};

/// Event name used for token changes.
pub const AUTH_TOKEN_EVENT: &str = "authToken";

/// Payload is the current bearer token; an empty string signals logout.
pub type AuthTokenEvent = BusEvent<String>;

impl AuthTokenEvent {
    pub fn is_logout(&self) -> bool {
        self.is(AUTH_TOKEN_EVENT) && self.payload.is_empty()
    }
}

#[derive(Clone)]
pub struct AuthBroadcaster {
    bus: Arc<dyn EventBus<AuthTokenEvent>>,
    source: String,
}

impl core::fmt::Debug for AuthBroadcaster {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthBroadcaster")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl AuthBroadcaster {
    pub fn new(bus: Arc<dyn EventBus<AuthTokenEvent>>, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    /// Publish the current token. Failures are logged, never returned.
    pub fn publish_token(&self, token: &str) {
        let event = BusEvent::new(
            AUTH_TOKEN_EVENT,
            token.to_string(),
            EventMetadata::new(self.source.clone(), Utc::now()),
        );

        match self.bus.publish(event) {
            Ok(()) => tracing::debug!(source = %self.source, logout = token.is_empty(), "auth token broadcast"),
            Err(err) => tracing::warn!(source = %self.source, ?err, "auth token broadcast dropped"),
        }
    }

    /// Publish the logout signal (empty token).
    pub fn publish_logout(&self) {
        self.publish_token("");
    }

    pub fn subscribe(&self) -> Subscription<AuthTokenEvent> {
        self.bus.subscribe()
    }
}
