//! Environment-scoped configuration for the session layer.
//!
//! Values mirror what each micro-frontend ships in its environment file: the
//! API base URL, the fixed channel headers every auth call carries, and the
//! routes the guard and logout navigate to.

use serde::{Deserialize, Serialize};

/// Channel headers required by the auth endpoints.
///
/// These are per-environment constants, never derived from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelHeaders {
    pub guid: String,
    pub channel: String,
    pub medium: String,
    pub app: String,
    pub session: String,
}

impl Default for ChannelHeaders {
    fn default() -> Self {
        Self {
            guid: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            channel: "01".to_string(),
            medium: "01".to_string(),
            app: "12345".to_string(),
            session: "session123".to_string(),
        }
    }
}

impl ChannelHeaders {
    /// Header name/value pairs in wire form.
    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("x-guid", self.guid.as_str()),
            ("x-channel", self.channel.as_str()),
            ("x-medium", self.medium.as_str()),
            ("x-app", self.app.as_str()),
            ("x-session", self.session.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL the auth endpoints are resolved against.
    pub api_url: String,

    /// Substring identifying backend API requests that should carry a token.
    pub api_marker: String,

    pub login_endpoint: String,
    pub refresh_endpoint: String,
    pub exchange_endpoint: String,

    /// Route the guard and logout navigate to.
    pub login_route: String,

    /// Route navigated to after an identity-provider exchange succeeds.
    pub home_route: String,

    /// `source` stamped on broadcast events.
    pub event_source: String,

    pub request_timeout_secs: u64,

    pub channel_headers: ChannelHeaders,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            api_marker: "/api/".to_string(),
            login_endpoint: "/auth/login".to_string(),
            refresh_endpoint: "/auth/refresh".to_string(),
            exchange_endpoint: "/auth/azure-exchange".to_string(),
            login_route: "/auth/login".to_string(),
            home_route: "/cliente".to_string(),
            event_source: "shell".to_string(),
            request_timeout_secs: 30,
            channel_headers: ChannelHeaders::default(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from `BANKFLOW_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] but reads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        match lookup("BANKFLOW_API_URL") {
            Some(url) => cfg.api_url = url,
            None => tracing::warn!(api_url = %cfg.api_url, "BANKFLOW_API_URL not set; using dev default"),
        }

        let overlay: [(&str, &mut String); 12] = [
            ("BANKFLOW_API_MARKER", &mut cfg.api_marker),
            ("BANKFLOW_LOGIN_ENDPOINT", &mut cfg.login_endpoint),
            ("BANKFLOW_REFRESH_ENDPOINT", &mut cfg.refresh_endpoint),
            ("BANKFLOW_EXCHANGE_ENDPOINT", &mut cfg.exchange_endpoint),
            ("BANKFLOW_LOGIN_ROUTE", &mut cfg.login_route),
            ("BANKFLOW_HOME_ROUTE", &mut cfg.home_route),
            ("BANKFLOW_EVENT_SOURCE", &mut cfg.event_source),
            ("BANKFLOW_X_GUID", &mut cfg.channel_headers.guid),
            ("BANKFLOW_X_CHANNEL", &mut cfg.channel_headers.channel),
            ("BANKFLOW_X_MEDIUM", &mut cfg.channel_headers.medium),
            ("BANKFLOW_X_APP", &mut cfg.channel_headers.app),
            ("BANKFLOW_X_SESSION", &mut cfg.channel_headers.session),
        ];
        for (key, slot) in overlay {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }

        if let Some(raw) = lookup("BANKFLOW_REQUEST_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => cfg.request_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "invalid BANKFLOW_REQUEST_TIMEOUT_SECS; keeping default"),
            }
        }

        cfg
    }

    /// Absolute URL of an endpoint path such as `/auth/login`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}
