//! Bearer-token interceptor with single-flight refresh.
//!
//! At most one refresh is in flight per interceptor. The first request to see
//! a 401 becomes the leader and calls [`AuthSession::refresh`]; every other
//! request that sees a 401 meanwhile waits on the leader's `watch` signal and
//! replays with whatever token it publishes. A 401 for a token that a finished
//! refresh already replaced is replayed with the stored token instead of
//! starting another refresh. Nobody retries a failed refresh.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use bankflow_auth::AuthSession;

use crate::{ApiRequest, ApiResponse, HttpError, HttpTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
enum RefreshSignal {
    Pending,
    Refreshed(String),
    Failed,
}

type InFlight = Mutex<Option<watch::Receiver<RefreshSignal>>>;

enum Role {
    Leader(watch::Sender<RefreshSignal>),
    Waiter(watch::Receiver<RefreshSignal>),
    /// The 401 answered a token that has since been replaced.
    Replay(String),
}

// Clears the in-flight slot when the leader finishes or is dropped mid-refresh,
// so a cancelled leader never wedges later 401s.
struct LeaderSlot<'a> {
    slot: &'a InFlight,
}

impl Drop for LeaderSlot<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

pub struct AuthInterceptor {
    session: Arc<AuthSession>,
    transport: Arc<dyn HttpTransport>,
    in_flight: InFlight,
}

impl AuthInterceptor {
    pub fn new(session: Arc<AuthSession>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            session,
            transport,
            in_flight: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Backend API calls get a token; the login endpoint and anything outside
    /// the API (assets, remote entries) do not.
    pub fn should_attach_token(&self, url: &str) -> bool {
        let config = self.session.config();
        url.contains(&config.api_marker) && !url.contains(&config.login_endpoint)
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let request = self.decorate(request)?;

        match self.transport.send(request.clone()).await {
            // Re-read the store: the token may have been cleared while the call was in flight.
            Err(err) if err.is_unauthorized() && self.session.token().is_some() => {
                self.recover(request, err).await
            }
            other => other,
        }
    }

    fn decorate(&self, request: ApiRequest) -> Result<ApiRequest, HttpError> {
        if !self.should_attach_token(&request.url) {
            return Ok(request);
        }
        match self.session.token() {
            Some(token) => {
                tracing::debug!(url = %request.url, "attaching bearer token");
                request.with_bearer(&token)
            }
            None => Ok(request),
        }
    }

    async fn recover(&self, request: ApiRequest, original: HttpError) -> Result<ApiResponse, HttpError> {
        let role = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(rx) = slot.as_ref() {
                Role::Waiter(rx.clone())
            } else {
                match self.session.token() {
                    Some(stored) if request.bearer_token().is_some_and(|sent| sent != stored) => {
                        Role::Replay(stored)
                    }
                    _ => {
                        let (tx, rx) = watch::channel(RefreshSignal::Pending);
                        *slot = Some(rx);
                        Role::Leader(tx)
                    }
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                tracing::info!(url = %request.url, "401 received; refreshing access token");
                let slot = LeaderSlot { slot: &self.in_flight };
                let outcome = self.session.refresh().await;

                // Waiters must see the outcome before the slot opens for a new leader.
                tx.send_replace(match &outcome {
                    Ok(token) => RefreshSignal::Refreshed(token.clone()),
                    Err(_) => RefreshSignal::Failed,
                });
                drop(slot);

                match outcome {
                    Ok(token) => self.transport.send(request.with_bearer(&token)?).await,
                    // refresh() has already logged the user out.
                    Err(err) => Err(HttpError::Auth(err)),
                }
            }
            Role::Replay(token) => {
                tracing::debug!(url = %request.url, "401 for a replaced token; replaying with the current one");
                self.transport.send(request.with_bearer(&token)?).await
            }
            Role::Waiter(mut rx) => {
                tracing::debug!(url = %request.url, "401 received; waiting for in-flight refresh");
                let signal = rx
                    .wait_for(|s| *s != RefreshSignal::Pending)
                    .await
                    .map(|s| (*s).clone());

                match signal {
                    Ok(RefreshSignal::Refreshed(token)) => {
                        self.transport.send(request.with_bearer(&token)?).await
                    }
                    _ => Err(original),
                }
            }
        }
    }
}
