//! Route guard for protected micro-frontend routes.

use std::sync::Arc;

use url::Url;

use bankflow_core::keys;

use crate::store::SessionStore;

/// Source of the "is the user signed in" answer the guard relies on.
pub trait AuthCheck: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate to this route instead.
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

pub struct RouteGuard {
    auth: Arc<dyn AuthCheck>,
    store: Arc<dyn SessionStore>,
    login_route: String,
}

impl RouteGuard {
    pub fn new(
        auth: Arc<dyn AuthCheck>,
        store: Arc<dyn SessionStore>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            store,
            login_route: login_route.into(),
        }
    }

    /// Decide whether navigation to `target` (path + optional query) may proceed.
    ///
    /// Unauthenticated navigation records `target` under `redirectUrl` so the
    /// login page can restore it. This never fails: a target that cannot be
    /// parsed is recorded as its bare path (or `/`) and still redirected.
    pub fn check(&self, target: &str) -> GuardDecision {
        if self.auth.is_authenticated() {
            return GuardDecision::Allow;
        }

        let recorded = match requested_url(target) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(target, %err, "unparseable navigation target; recording path only");
                fallback_path(target)
            }
        };

        tracing::info!(requested = %recorded, login = %self.login_route, "unauthenticated navigation redirected");
        self.store.set(keys::REDIRECT_URL, &recorded);

        GuardDecision::Redirect(self.login_route.clone())
    }
}

// Path plus query, as the browser location would report it.
fn requested_url(target: &str) -> Result<String, url::ParseError> {
    let base = Url::parse("http://shell.local/")?;
    let url = base.join(target)?;

    let mut out = url.path().to_string();
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    Ok(out)
}

// Drops query, fragment and any `scheme://host` prefix; always an in-app path.
fn fallback_path(target: &str) -> String {
    let bare = target.split(['?', '#']).next().unwrap_or_default();

    let path = match bare.find("//") {
        Some(i) if i == 0 || bare[..i].ends_with(':') => {
            let authority_and_path = &bare[i + 2..];
            authority_and_path.find('/').map_or("/", |j| &authority_and_path[j..])
        }
        _ => bare,
    };

    if path.starts_with('/') {
        path.to_string()
    } else {
        "/".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Flag(AtomicBool);

    impl AuthCheck for Flag {
        fn is_authenticated(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn guard(authenticated: bool) -> (RouteGuard, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let guard = RouteGuard::new(
            Arc::new(Flag(AtomicBool::new(authenticated))),
            store.clone(),
            "/auth/login",
        );
        (guard, store)
    }

    #[test]
    fn authenticated_navigation_proceeds() {
        let (guard, store) = guard(true);

        assert_eq!(guard.check("/cliente/edit/7"), GuardDecision::Allow);
        assert_eq!(store.get(keys::REDIRECT_URL), None);
    }

    #[test]
    fn unauthenticated_navigation_records_path_and_query() {
        let (guard, store) = guard(false);

        let decision = guard.check("/cliente/edit/7?x=1");

        assert_eq!(decision, GuardDecision::Redirect("/auth/login".to_string()));
        assert!(!decision.is_allowed());
        assert_eq!(store.get(keys::REDIRECT_URL).as_deref(), Some("/cliente/edit/7?x=1"));
    }

    #[test]
    fn fragment_and_origin_are_not_recorded() {
        let (guard, store) = guard(false);

        guard.check("https://bank.example/movimientos?page=2#top");

        assert_eq!(store.get(keys::REDIRECT_URL).as_deref(), Some("/movimientos?page=2"));
    }

    #[test]
    fn unparseable_target_still_redirects() {
        let (guard, store) = guard(false);

        let decision = guard.check("http://[::1/cuentas?id=3");

        assert_eq!(decision, GuardDecision::Redirect("/auth/login".to_string()));
        assert_eq!(store.get(keys::REDIRECT_URL).as_deref(), Some("/cuentas"));
    }

    #[test]
    fn unparseable_fallback_is_always_an_app_path() {
        assert_eq!(fallback_path("http://[::1/cuentas?id=3#x"), "/cuentas");
        assert_eq!(fallback_path("//[bad/movimientos"), "/movimientos");
        assert_eq!(fallback_path("http://[::1"), "/");
        assert_eq!(fallback_path("/cliente//edit?x=1"), "/cliente//edit");
        assert_eq!(fallback_path("garbage"), "/");
    }

    #[test]
    fn later_navigation_overwrites_recorded_target() {
        let (guard, store) = guard(false);

        guard.check("/cliente");
        guard.check("/cuentas?id=9");

        assert_eq!(store.get(keys::REDIRECT_URL).as_deref(), Some("/cuentas?id=9"));
    }
}
