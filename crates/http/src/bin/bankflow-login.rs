//! Headless login: sign in against the banking API, persist the session to a
//! file, and optionally call one protected resource through the interceptor.
//!
//! ```text
//! BANKFLOW_PASSWORD=... bankflow-login <username> [resource-path]
//! ```
//!
//! The password is taken from `BANKFLOW_PASSWORD`, or read as one line from
//! stdin when that is unset; it is never accepted on the command line.
//! Configuration comes from `BANKFLOW_*` environment variables; the session
//! file defaults to `bankflow-session.json` (`BANKFLOW_SESSION_FILE`).

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};

use bankflow_auth::{AuthSession, FileSessionStore, LoginRequest, RouteGuard, RouteHistory, SessionParts};
use bankflow_core::AuthConfig;
use bankflow_events::{AuthBroadcaster, AuthTokenEvent, InMemoryEventBus};
use bankflow_http::{ApiRequest, AuthInterceptor, HttpAuthBackend, ReqwestTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bankflow_observability::init();

    let mut args = std::env::args().skip(1);
    let Some(username) = args.next() else {
        bail!("usage: BANKFLOW_PASSWORD=... bankflow-login <username> [resource-path]");
    };
    let resource = args.next();
    let password = read_password()?;

    let config = AuthConfig::from_env();
    let session_file =
        std::env::var("BANKFLOW_SESSION_FILE").unwrap_or_else(|_| "bankflow-session.json".to_string());

    let transport = Arc::new(
        ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))
            .context("failed to build HTTP client")?,
    );
    let store = Arc::new(FileSessionStore::new(session_file));
    let bus = Arc::new(InMemoryEventBus::<AuthTokenEvent>::new());
    let broadcaster = AuthBroadcaster::new(bus, config.event_source.clone());

    let parts = SessionParts::new(
        store.clone(),
        Arc::new(HttpAuthBackend::new(transport.clone(), config.clone())),
        Arc::new(RouteHistory::new()),
        broadcaster,
    );
    let session = Arc::new(AuthSession::new(config.clone(), parts));

    if !session.is_authenticated() {
        session
            .login(&LoginRequest::new(username, password))
            .await
            .context("login rejected")?;
    }
    let user = session.username().unwrap_or_else(|| "<unknown>".to_string());
    tracing::info!(%user, status = %session.status(), "session ready");

    if let Some(path) = resource {
        let guard = RouteGuard::new(session.clone(), store, config.login_route.clone());
        if !guard.check(&path).is_allowed() {
            bail!("session expired before {path} could be requested");
        }

        let interceptor = AuthInterceptor::new(session.clone(), transport);
        let response = interceptor
            .execute(ApiRequest::get(config.endpoint(&path)))
            .await
            .with_context(|| format!("GET {path} failed"))?;
        println!("{}", response.text());
    }

    println!("{} ({})", session.status(), user);
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    resolve_password(std::env::var("BANKFLOW_PASSWORD").ok(), std::io::stdin().lock())
}

fn resolve_password(from_env: Option<String>, mut stdin: impl BufRead) -> anyhow::Result<String> {
    if let Some(password) = from_env {
        return Ok(password);
    }

    let mut line = String::new();
    stdin
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password: set BANKFLOW_PASSWORD or pipe it on stdin");
    }
    Ok(password)
}
