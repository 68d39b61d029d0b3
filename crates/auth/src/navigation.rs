//! Navigation seam between the session layer and the host router.

use std::sync::Mutex;

/// Host router capable of moving the user to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only records where it was sent.
///
/// Used by headless hosts (CLI tools, tests) that have no router.
#[derive(Debug, Default)]
pub struct RouteHistory {
    visited: Mutex<Vec<String>>,
}

impl RouteHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.lock().ok().and_then(|v| v.last().cloned())
    }
}

impl Navigator for RouteHistory {
    fn navigate(&self, route: &str) {
        tracing::debug!(route, "navigate");
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(route.to_string());
        }
    }
}
