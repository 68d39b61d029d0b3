//! Backend seam: the auth endpoints the session lifecycle calls.
//!
//! Wire shapes follow the banking API (`camelCase` JSON). Implementations
//! must report login/exchange problems as `AuthError::LoginFailure` and
//! refresh problems as `AuthError::RefreshFailure`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bankflow_core::AuthResult;

/// `POST /auth/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// `POST /auth/refresh` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Identity asserted by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUserInfo {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub object_id: Option<String>,
}

/// `POST /auth/azure-exchange` body: trade a provider token for a backend JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub azure_token: String,
    pub user_info: ExternalUserInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    #[serde(default)]
    pub jwt_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> AuthResult<LoginResponse>;

    async fn refresh(&self, request: &RefreshRequest) -> AuthResult<RefreshResponse>;

    async fn exchange(&self, request: &ExchangeRequest) -> AuthResult<ExchangeResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shapes_are_camel_case() {
        let refresh = serde_json::to_value(RefreshRequest { refresh_token: "r".into() }).unwrap();
        assert_eq!(refresh, json!({"refreshToken": "r"}));

        let login: LoginResponse = serde_json::from_value(json!({
            "token": "a.b.c",
            "refreshToken": "r1",
            "expiresIn": 3600,
            "user": {"id": "7"}
        }))
        .unwrap();
        assert_eq!(login.refresh_token.as_deref(), Some("r1"));
        assert_eq!(login.expires_in, Some(3600));

        let exchange: ExchangeResponse =
            serde_json::from_value(json!({"jwtToken": "x.y.z", "permissions": ["cliente.read"]})).unwrap();
        assert_eq!(exchange.jwt_token.as_deref(), Some("x.y.z"));
        assert!(exchange.refresh_token.is_none());
    }

    #[test]
    fn login_response_tolerates_missing_fields() {
        let empty: LoginResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, LoginResponse::default());
    }
}
