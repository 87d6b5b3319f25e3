use std::sync::Arc;

use taskboard::guard::{Route, LANDING_PATH, SIGN_IN_PATH};
use taskboard::session::CookieAttributes;
use taskboard::{guard, CredentialStore, FileCookieStore, GuardDecision, RouteGuard};

#[test]
fn guard_is_a_pure_function_of_path_and_presence() {
    let cases = [
        ("/dashboard", false, GuardDecision::Redirect(SIGN_IN_PATH)),
        ("/dashboard/settings", false, GuardDecision::Redirect(SIGN_IN_PATH)),
        ("/dashboard", true, GuardDecision::Allow),
        ("/signin", true, GuardDecision::Redirect(LANDING_PATH)),
        ("/signup", true, GuardDecision::Redirect(LANDING_PATH)),
        ("/signin", false, GuardDecision::Allow),
        ("/signup", false, GuardDecision::Allow),
        ("/", true, GuardDecision::Allow),
    ];
    for (path, present, expected) in cases {
        assert_eq!(guard(path, present), expected, "{path} present={present}");
    }
}

#[test]
fn stored_but_unverified_token_still_passes_the_guard() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CredentialStore> = Arc::new(FileCookieStore::in_dir(dir.path()));
    let guard = RouteGuard::new(store.clone());

    assert_eq!(guard.resolve("/dashboard"), Route::SignIn);

    // Presence is all the guard checks; the backend is the authority.
    store
        .set("not-a-real-jwt", CookieAttributes::default())
        .unwrap();
    assert_eq!(guard.check("/dashboard"), GuardDecision::Allow);
    assert_eq!(guard.resolve("/signin"), Route::Dashboard);

    store.remove().unwrap();
    assert_eq!(guard.resolve("/dashboard"), Route::SignIn);
}
