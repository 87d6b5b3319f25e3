//! Navigation gating on credential presence.
//!
//! The guard only looks at whether a credential is stored. It does not check
//! signature or expiry, so a stale token still passes until the backend
//! answers 401. It keeps signed-out users away from the dashboard; it is not
//! a security boundary.

use std::sync::Arc;

use crate::session::CredentialStore;

pub const PROTECTED_PREFIX: &str = "/dashboard";
pub const SIGN_IN_PATH: &str = "/signin";
pub const SIGN_UP_PATH: &str = "/signup";
pub const LANDING_PATH: &str = PROTECTED_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

pub fn is_protected(path: &str) -> bool {
    path == PROTECTED_PREFIX
        || path
            .strip_prefix(PROTECTED_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn is_auth_entry(path: &str) -> bool {
    path == SIGN_IN_PATH || path == SIGN_UP_PATH
}

pub fn guard(path: &str, has_credential: bool) -> GuardDecision {
    if is_protected(path) && !has_credential {
        return GuardDecision::Redirect(SIGN_IN_PATH);
    }
    if is_auth_entry(path) && has_credential {
        return GuardDecision::Redirect(LANDING_PATH);
    }
    GuardDecision::Allow
}

/// Screens reachable by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    SignUp,
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::SignIn => SIGN_IN_PATH,
            Route::SignUp => SIGN_UP_PATH,
            Route::Dashboard => LANDING_PATH,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        if path == SIGN_IN_PATH {
            Some(Route::SignIn)
        } else if path == SIGN_UP_PATH {
            Some(Route::SignUp)
        } else if is_protected(path) {
            Some(Route::Dashboard)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    credentials: Arc<dyn CredentialStore>,
}

impl RouteGuard {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    pub fn check(&self, path: &str) -> GuardDecision {
        guard(path, self.credentials.is_authenticated())
    }

    /// Follows guard redirects to the screen that will actually render.
    ///
    /// Paths with no screen of their own (e.g. `/`) land on the dashboard
    /// when signed in and on sign-in otherwise.
    pub fn resolve(&self, path: &str) -> Route {
        let authenticated = self.credentials.is_authenticated();
        let mut current = path;
        // Every redirect target is a known route, so this settles in two hops.
        for _ in 0..2 {
            match guard(current, authenticated) {
                GuardDecision::Allow => break,
                GuardDecision::Redirect(target) => current = target,
            }
        }
        Route::from_path(current).unwrap_or(if authenticated {
            Route::Dashboard
        } else {
            Route::SignIn
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryCookieStore;

    #[test]
    fn protected_path_without_credential_redirects_to_sign_in() {
        assert_eq!(guard("/dashboard", false), GuardDecision::Redirect("/signin"));
        assert_eq!(
            guard("/dashboard/tasks/1", false),
            GuardDecision::Redirect("/signin")
        );
    }

    #[test]
    fn auth_entry_with_credential_redirects_to_landing() {
        assert_eq!(guard("/signin", true), GuardDecision::Redirect("/dashboard"));
        assert_eq!(guard("/signup", true), GuardDecision::Redirect("/dashboard"));
    }

    #[test]
    fn everything_else_is_allowed() {
        assert_eq!(guard("/dashboard", true), GuardDecision::Allow);
        assert_eq!(guard("/signin", false), GuardDecision::Allow);
        assert_eq!(guard("/", false), GuardDecision::Allow);
        assert_eq!(guard("/", true), GuardDecision::Allow);
        assert_eq!(guard("/dashboards", false), GuardDecision::Allow);
    }

    #[test]
    fn resolve_uses_store_presence() {
        let signed_out = RouteGuard::new(Arc::new(MemoryCookieStore::new()));
        assert_eq!(signed_out.resolve("/dashboard"), Route::SignIn);
        assert_eq!(signed_out.resolve("/signup"), Route::SignUp);
        assert_eq!(signed_out.resolve("/"), Route::SignIn);

        let signed_in = RouteGuard::new(Arc::new(MemoryCookieStore::with_credential("tok")));
        assert_eq!(signed_in.resolve("/signin"), Route::Dashboard);
        assert_eq!(signed_in.resolve("/"), Route::Dashboard);
        assert_eq!(signed_in.check("/signup"), GuardDecision::Redirect("/dashboard"));
    }
}
