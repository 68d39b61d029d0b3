//! Token codec: structural decoding of three-segment signed tokens.
//!
//! Only the payload is inspected. The signature is NOT verified here; the
//! backend is the authority on whether a token is genuine.

use base64::Engine;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};

use bankflow_core::{AuthError, AuthResult, Clock, SystemClock};

use crate::{Role, UserInfo};

// Issuers differ on whether the payload keeps its trailing `=`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded token payload.
///
/// Field extraction is lenient: a claim of an unexpected JSON type is treated
/// as absent rather than failing the whole decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub sub: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,

    /// Expiry, seconds since the Unix epoch.
    pub exp: Option<f64>,

    pub roles: Vec<Role>,

    /// The full payload object, including claims not modelled above.
    pub raw: Map<String, Value>,
}

impl Claims {
    fn from_object(raw: Map<String, Value>) -> Self {
        Self {
            sub: string_claim(raw.get("sub")),
            username: string_claim(raw.get("username")),
            email: string_claim(raw.get("email")),
            exp: raw.get("exp").and_then(Value::as_f64),
            roles: roles_claim(raw.get("roles")),
            raw,
        }
    }

    /// `sub`, falling back to `username`.
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let exp = self.exp?;
        chrono::DateTime::from_timestamp(exp.trunc() as i64, 0)
    }

    /// Strict comparison: a token expiring exactly now is already invalid.
    pub fn is_live_at(&self, now_seconds: f64) -> bool {
        self.exp.is_some_and(|exp| exp > now_seconds)
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        let subject = self.subject()?.to_string();
        Some(UserInfo {
            id: subject.clone(),
            username: subject,
            email: self.email.clone(),
            roles: self.roles.clone(),
        })
    }
}

fn string_claim(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// A single role may be sent as a bare string.
fn roles_claim(value: Option<&Value>) -> Vec<Role> {
    match value {
        Some(Value::String(role)) => vec![Role::new(role.clone())],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|r| Role::new(r.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode a token's payload segment into [`Claims`].
pub fn decode(token: &str) -> AuthResult<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let bytes = PAYLOAD_ENGINE
        .decode(segments[1])
        .map_err(|e| AuthError::malformed(format!("payload is not base64url: {e}")))?;

    let json = String::from_utf8(bytes)
        .map_err(|_| AuthError::malformed("payload is not valid UTF-8"))?;

    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(obj)) => Ok(Claims::from_object(obj)),
        Ok(_) => Err(AuthError::malformed("payload is not a JSON object")),
        Err(e) => Err(AuthError::malformed(format!("payload is not JSON: {e}"))),
    }
}

/// Whether `token` is present, decodes, and expires strictly after `now_seconds`.
pub fn is_valid_at(token: Option<&str>, now_seconds: f64) -> bool {
    let Some(token) = token else {
        return false;
    };

    match decode(token) {
        Ok(claims) => claims.is_live_at(now_seconds),
        Err(err) => {
            tracing::debug!(%err, "stored token rejected");
            false
        }
    }
}

/// [`is_valid_at`] against the system clock.
pub fn is_valid(token: Option<&str>) -> bool {
    is_valid_at(token, SystemClock.now_seconds())
}
