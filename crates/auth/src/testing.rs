//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use bankflow_core::{AuthError, AuthResult};

use crate::backend::{
    AuthBackend, ExchangeRequest, ExchangeResponse, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse,
};

/// Unsigned token with the given payload object.
pub fn mint(payload: Value) -> String {
    mint_payload(payload.to_string().as_bytes())
}

/// Unsigned token with raw payload bytes.
pub fn mint_payload(payload: &[u8]) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

/// Scripted backend: each call pops the next queued result.
#[derive(Default)]
pub struct ScriptedBackend {
    pub logins: Mutex<Vec<AuthResult<LoginResponse>>>,
    pub refreshes: Mutex<Vec<AuthResult<RefreshResponse>>>,
    pub exchanges: Mutex<Vec<AuthResult<ExchangeResponse>>>,
    pub refresh_calls: Mutex<Vec<RefreshRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_login(&self, result: AuthResult<LoginResponse>) {
        self.logins.lock().unwrap().push(result);
    }

    pub fn push_refresh(&self, result: AuthResult<RefreshResponse>) {
        self.refreshes.lock().unwrap().push(result);
    }

    pub fn push_exchange(&self, result: AuthResult<ExchangeResponse>) {
        self.exchanges.lock().unwrap().push(result);
    }
}

fn pop<T>(queue: &Mutex<Vec<AuthResult<T>>>, err: AuthError) -> AuthResult<T> {
    let mut queue = queue.lock().unwrap();
    if queue.is_empty() { Err(err) } else { queue.remove(0) }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, _request: &LoginRequest) -> AuthResult<LoginResponse> {
        pop(&self.logins, AuthError::login("unscripted"))
    }

    async fn refresh(&self, request: &RefreshRequest) -> AuthResult<RefreshResponse> {
        self.refresh_calls.lock().unwrap().push(request.clone());
        pop(&self.refreshes, AuthError::refresh("unscripted"))
    }

    async fn exchange(&self, _request: &ExchangeRequest) -> AuthResult<ExchangeResponse> {
        pop(&self.exchanges, AuthError::login("unscripted"))
    }
}
