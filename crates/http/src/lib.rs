//! `bankflow-http` — HTTP plumbing for the session layer.
//!
//! - [`AuthInterceptor`] decorates backend calls with the bearer token and
//!   recovers from 401s with a single coordinated refresh.
//! - [`HttpAuthBackend`] implements the auth endpoints over any [`HttpTransport`].
//! - [`ReqwestTransport`] is the production transport.

pub mod backend;
pub mod error;
pub mod interceptor;
pub mod request;
pub mod transport;

pub use backend::HttpAuthBackend;
pub use error::HttpError;
pub use interceptor::AuthInterceptor;
pub use request::{ApiRequest, ApiResponse};
pub use transport::{HttpTransport, ReqwestTransport};
