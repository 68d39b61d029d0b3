//! `bankflow-auth` — client-side session and token lifecycle.
//!
//! This crate is decoupled from HTTP: the backend calls it depends on are
//! behind [`AuthBackend`], navigation is behind [`Navigator`].

pub mod backend;
pub mod claims;
pub mod guard;
pub mod navigation;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod store;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    AuthBackend, ExchangeRequest, ExchangeResponse, ExternalUserInfo, LoginRequest, LoginResponse,
    RefreshRequest, RefreshResponse,
};
pub use claims::{Claims, decode, is_valid, is_valid_at};
pub use guard::{AuthCheck, GuardDecision, RouteGuard};
pub use navigation::{Navigator, RouteHistory};
pub use permissions::Permission;
pub use roles::Role;
pub use session::{AuthSession, AuthStatus, SessionParts};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use user::UserInfo;
