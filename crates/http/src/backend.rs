//! Auth endpoints over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use bankflow_auth::{
    AuthBackend, ExchangeRequest, ExchangeResponse, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse,
};
use bankflow_core::{AuthConfig, AuthError, AuthResult};

use crate::{ApiRequest, HttpError, HttpTransport};

/// [`AuthBackend`] that posts JSON to the configured auth endpoints.
///
/// Every call carries the environment's channel headers. Requests go straight
/// to the transport, never through the interceptor, so a failing refresh
/// cannot recurse into another refresh.
pub struct HttpAuthBackend {
    transport: Arc<dyn HttpTransport>,
    config: AuthConfig,
}

impl HttpAuthBackend {
    pub fn new(transport: Arc<dyn HttpTransport>, config: AuthConfig) -> Self {
        Self { transport, config }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, HttpError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| HttpError::InvalidRequest(e.to_string()))?;

        let mut request = ApiRequest::post(self.config.endpoint(path), body)
            .with_header("content-type", "application/json")?;
        for (name, value) in self.config.channel_headers.pairs() {
            request = request.with_header(name, value)?;
        }

        self.transport.send(request).await?.json()
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        self.post(&self.config.login_endpoint, request)
            .await
            .map_err(|e| AuthError::login(e.to_string()))
    }

    async fn refresh(&self, request: &RefreshRequest) -> AuthResult<RefreshResponse> {
        self.post(&self.config.refresh_endpoint, request)
            .await
            .map_err(|e| AuthError::refresh(e.to_string()))
    }

    async fn exchange(&self, request: &ExchangeRequest) -> AuthResult<ExchangeResponse> {
        self.post(&self.config.exchange_endpoint, request)
            .await
            .map_err(|e| AuthError::login(e.to_string()))
    }
}
