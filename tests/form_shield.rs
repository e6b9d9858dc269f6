//! Gate behaviour against in-memory fakes of every collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, header, request::Parts};
use parking_lot::Mutex;
use serde_json::{Value, json};
use uuid::Uuid;

use form_shield::shield::{
    Authenticator, AuthnError, Authorizer, AuthzError, Decision, FormShield, Notifier, Principal,
    RoleResolver, RoleSet, SecurityEvent, SessionContext, SessionKey, ShieldConfig, ShieldError,
    role_set,
};

// ---- fakes -----------------------------------------------------------------

#[derive(Default)]
struct RecordingSession {
    entries: Mutex<HashMap<SessionKey, Value>>,
    accesses: AtomicUsize,
}

impl RecordingSession {
    fn with_user(user: &Principal) -> Self {
        let session = Self::default();
        session
            .entries
            .lock()
            .insert(SessionKey::User, serde_json::to_value(user).unwrap());
        session
    }

    fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn peek(&self, key: SessionKey) -> Option<Value> {
        self.entries.lock().get(&key).cloned()
    }

    fn stash(&self, target: &str) {
        self.entries
            .lock()
            .insert(SessionKey::LoginTarget, json!(target));
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionContext for RecordingSession {
    fn get(&self, key: SessionKey) -> Option<Value> {
        self.touch();
        self.entries.lock().get(&key).cloned()
    }

    fn set(&self, key: SessionKey, value: Value) {
        self.touch();
        self.entries.lock().insert(key, value);
    }

    fn remove(&self, key: SessionKey) {
        self.touch();
        self.entries.lock().remove(&key);
    }

    fn clear(&self) {
        self.touch();
        self.entries.lock().clear();
    }
}

#[derive(Clone, Copy)]
enum Reload {
    Keep,
    Gone,
    Fail,
}

struct FakeAuthenticator {
    user: Principal,
    password: &'static str,
    reload: Reload,
    authenticate_calls: AtomicUsize,
    reload_calls: AtomicUsize,
}

impl FakeAuthenticator {
    fn new(user: Principal, reload: Reload) -> Self {
        Self {
            user,
            password: "s3cret",
            reload,
            authenticate_calls: AtomicUsize::new(0),
            reload_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn authenticate(
        &self,
        session: &dyn SessionContext,
        username: &str,
        password: &str,
    ) -> Result<(), AuthnError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if username != self.user.username || password != self.password {
            return Err(AuthnError::InvalidCredentials);
        }
        session.set(SessionKey::User, serde_json::to_value(&self.user).unwrap());
        Ok(())
    }

    async fn reload_user(&self, principal: &Principal) -> Result<Option<Principal>, AuthnError> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        match self.reload {
            Reload::Keep => Ok(Some(principal.clone())),
            Reload::Gone => Ok(None),
            Reload::Fail => Err(AuthnError::Backend("directory offline".into())),
        }
    }
}

struct FakeAuthorizer {
    allow: bool,
    seen: Mutex<Vec<RoleSet>>,
}

impl FakeAuthorizer {
    fn new(allow: bool) -> Self {
        Self {
            allow,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Authorizer for FakeAuthorizer {
    fn authorize(&self, _principal: &Principal, required: &RoleSet) -> Result<(), AuthzError> {
        self.seen.lock().push(required.clone());
        if self.allow {
            Ok(())
        } else {
            Err(AuthzError::Forbidden)
        }
    }
}

struct StaticRoles(HashMap<&'static str, RoleSet>);

impl RoleResolver for StaticRoles {
    fn roles_for(&self, parts: &Parts) -> RoleSet {
        self.0.get(parts.uri.path()).cloned().unwrap_or_default()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<SecurityEvent>>,
}

impl Notifier for RecordingNotifier {
    fn emit(&self, event: SecurityEvent) {
        self.events.lock().push(event);
    }
}

// ---- harness ---------------------------------------------------------------

struct Harness {
    shield: FormShield,
    authenticator: Arc<FakeAuthenticator>,
    authorizer: Arc<FakeAuthorizer>,
    notifier: Arc<RecordingNotifier>,
}

fn alice() -> Principal {
    Principal::new(Uuid::new_v4(), "alice", ["user"])
}

fn harness_with(config: ShieldConfig, user: Principal, reload: Reload, allow: bool) -> Harness {
    let authenticator = Arc::new(FakeAuthenticator::new(user, reload));
    let authorizer = Arc::new(FakeAuthorizer::new(allow));
    let notifier = Arc::new(RecordingNotifier::default());
    let roles = StaticRoles(HashMap::from([
        ("/account", role_set(["user"])),
        ("/admin", role_set(["admin"])),
    ]));

    let shield = FormShield::new(
        Arc::new(config),
        authenticator.clone(),
        authorizer.clone(),
        Arc::new(roles),
        notifier.clone(),
    );

    Harness {
        shield,
        authenticator,
        authorizer,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(ShieldConfig::default(), alice(), Reload::Keep, true)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post_form(path: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn good_login() -> Request<Body> {
    post_form("/login", "username=alice&password=s3cret")
}

fn redirect_location(decision: Decision) -> String {
    match decision {
        Decision::Redirect(location) => location,
        Decision::Pass(req) => panic!("expected a redirect, got pass-through for {}", req.uri()),
    }
}

fn passed(decision: Decision) -> Request<Body> {
    match decision {
        Decision::Pass(req) => req,
        Decision::Redirect(location) => panic!("expected pass-through, got redirect to {location}"),
    }
}

// ---- public paths ----------------------------------------------------------

#[tokio::test]
async fn public_path_passes_without_touching_the_session() {
    let h = harness();
    let session = RecordingSession::with_user(&alice());

    let decision = h.shield.handle(&session, get("/about")).await.unwrap();

    assert!(decision.is_pass());
    assert_eq!(session.accesses(), 0);
    assert_eq!(h.authenticator.reload_calls.load(Ordering::SeqCst), 0);
    assert!(h.authorizer.seen.lock().is_empty());
}

// ---- login -----------------------------------------------------------------

#[tokio::test]
async fn get_on_login_path_passes_through() {
    let h = harness();
    let session = RecordingSession::default();

    let decision = h.shield.handle(&session, get("/login")).await.unwrap();

    assert!(decision.is_pass());
    assert_eq!(h.authenticator.authenticate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_or_missing_credentials_pass_through_without_authenticating() {
    let h = harness();

    for body in [
        "username=alice",
        "password=s3cret",
        "username=&password=s3cret",
        "username=alice&password=%20%20",
        "username=%09&password=s3cret",
        "username=alice&password=0",
        "username=0&password=x",
        "",
    ] {
        let session = RecordingSession::default();
        let decision = h
            .shield
            .handle(&session, post_form("/login", body))
            .await
            .unwrap();
        assert!(decision.is_pass(), "body {body:?} should pass through");
    }

    assert_eq!(h.authenticator.authenticate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unparseable_submission_passes_through() {
    let h = harness();
    let session = RecordingSession::default();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let decision = h.shield.handle(&session, req).await.unwrap();

    assert!(decision.is_pass());
    assert_eq!(h.authenticator.authenticate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn passed_through_login_keeps_its_body() {
    let h = harness();
    let session = RecordingSession::default();

    let req = passed(
        h.shield
            .handle(&session, post_form("/login", "username=alice&password="))
            .await
            .unwrap(),
    );

    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"username=alice&password=");
}

#[tokio::test]
async fn json_login_is_accepted() {
    let h = harness();
    let session = RecordingSession::default();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"alice","password":"s3cret"}"#))
        .unwrap();

    let location = redirect_location(h.shield.handle(&session, req).await.unwrap());

    assert_eq!(location, "/");
    assert!(session.peek(SessionKey::User).is_some());
}

#[tokio::test]
async fn multipart_login_is_accepted() {
    let h = harness();
    let session = RecordingSession::default();
    let body = "--XX\r\n\
Content-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n\
--XX\r\n\
Content-Disposition: form-data; name=\"password\"\r\n\r\ns3cret\r\n\
--XX--\r\n";
    let req = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
        .body(Body::from(body))
        .unwrap();

    let location = redirect_location(h.shield.handle(&session, req).await.unwrap());

    assert_eq!(location, "/");
    assert_eq!(h.authenticator.authenticate_calls.load(Ordering::SeqCst), 1);
    assert!(session.peek(SessionKey::User).is_some());
}

#[tokio::test]
async fn configured_field_names_are_used() {
    let config = ShieldConfig {
        username_field: "_user".into(),
        password_field: "_pass".into(),
        ..ShieldConfig::default()
    };
    let h = harness_with(config, alice(), Reload::Keep, true);

    let session = RecordingSession::default();
    let decision = h.shield.handle(&session, good_login()).await.unwrap();
    assert!(decision.is_pass());

    let decision = h
        .shield
        .handle(&session, post_form("/login", "_user=alice&_pass=s3cret"))
        .await
        .unwrap();
    assert_eq!(redirect_location(decision), "/");
}

#[tokio::test]
async fn login_returns_to_stashed_target_once() {
    let h = harness();
    let session = RecordingSession::default();
    session.stash("/account");

    let first = h.shield.handle(&session, good_login()).await.unwrap();
    assert_eq!(redirect_location(first), "/account");
    assert_eq!(session.peek(SessionKey::LoginTarget), None);

    let second = h.shield.handle(&session, good_login()).await.unwrap();
    assert_eq!(redirect_location(second), "/");
}

#[tokio::test]
async fn without_referrer_login_always_goes_to_configured_target() {
    let config = ShieldConfig {
        use_referrer: false,
        login_target: "/welcome".into(),
        ..ShieldConfig::default()
    };
    let h = harness_with(config, alice(), Reload::Keep, true);
    let session = RecordingSession::default();
    session.stash("/account");

    let decision = h.shield.handle(&session, good_login()).await.unwrap();

    assert_eq!(redirect_location(decision), "/welcome");
    assert_eq!(session.peek(SessionKey::LoginTarget), Some(json!("/account")));
}

#[tokio::test]
async fn authentication_failure_is_returned_unchanged() {
    let h = harness();
    let session = RecordingSession::default();
    session.stash("/account");

    let err = h
        .shield
        .handle(&session, post_form("/login", "username=alice&password=wrong"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ShieldError::Authentication(AuthnError::InvalidCredentials)
    ));
    assert_eq!(session.peek(SessionKey::User), None);
    assert_eq!(session.peek(SessionKey::LoginTarget), Some(json!("/account")));
}

#[tokio::test]
async fn login_wins_when_paths_collide() {
    let config = ShieldConfig {
        login_path_post: "/auth".into(),
        logout_path: "/auth".into(),
        ..ShieldConfig::default()
    };
    let h = harness_with(config, alice(), Reload::Keep, true);
    let session = RecordingSession::default();

    let decision = h
        .shield
        .handle(&session, post_form("/auth", "username=alice&password=s3cret"))
        .await
        .unwrap();

    assert_eq!(redirect_location(decision), "/");
    assert!(session.peek(SessionKey::User).is_some());
    assert!(h.notifier.events.lock().is_empty());
}

// ---- logout ----------------------------------------------------------------

#[tokio::test]
async fn logout_clears_session_and_emits_one_event() {
    let config = ShieldConfig {
        logout_target: "/bye".into(),
        ..ShieldConfig::default()
    };
    let user = alice();
    let h = harness_with(config, user.clone(), Reload::Keep, true);
    let session = RecordingSession::with_user(&user);
    session.stash("/account");

    let decision = h.shield.handle(&session, get("/logout")).await.unwrap();

    assert_eq!(redirect_location(decision), "/bye");
    assert!(session.entries.lock().is_empty());

    let events = h.notifier.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), SecurityEvent::LOGOUT);
    assert_eq!(events[0].principal(), Some(&user));
}

#[tokio::test]
async fn logout_without_principal_still_notifies() {
    let h = harness();
    let session = RecordingSession::default();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/logout")
        .body(Body::empty())
        .unwrap();
    let decision = h.shield.handle(&session, req).await.unwrap();

    assert_eq!(redirect_location(decision), "/");
    let events = h.notifier.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].principal(), None);
}

// ---- protected paths -------------------------------------------------------

#[tokio::test]
async fn protected_path_without_principal_stashes_and_redirects() {
    let h = harness();
    let session = RecordingSession::default();

    let decision = h.shield.handle(&session, get("/account")).await.unwrap();

    assert_eq!(redirect_location(decision), "/login");
    assert_eq!(session.peek(SessionKey::LoginTarget), Some(json!("/account")));
    assert!(h.authorizer.seen.lock().is_empty());
}

#[tokio::test]
async fn protected_path_without_referrer_does_not_stash() {
    let config = ShieldConfig {
        use_referrer: false,
        login_path: "/signin".into(),
        ..ShieldConfig::default()
    };
    let h = harness_with(config, alice(), Reload::Keep, true);
    let session = RecordingSession::default();

    let decision = h.shield.handle(&session, get("/account")).await.unwrap();

    assert_eq!(redirect_location(decision), "/signin");
    assert_eq!(session.peek(SessionKey::LoginTarget), None);
}

#[tokio::test]
async fn stale_principal_is_treated_as_signed_out() {
    for reload in [Reload::Gone, Reload::Fail] {
        let user = alice();
        let h = harness_with(ShieldConfig::default(), user.clone(), reload, true);
        let session = RecordingSession::with_user(&user);

        let decision = h.shield.handle(&session, get("/account")).await.unwrap();

        assert_eq!(redirect_location(decision), "/login");
        assert_eq!(session.peek(SessionKey::LoginTarget), Some(json!("/account")));
        assert_eq!(h.authenticator.reload_calls.load(Ordering::SeqCst), 1);
        assert!(h.authorizer.seen.lock().is_empty());
    }
}

#[tokio::test]
async fn malformed_principal_is_treated_as_signed_out() {
    let h = harness();
    let session = RecordingSession::default();
    session
        .entries
        .lock()
        .insert(SessionKey::User, json!({"name": "not a principal"}));

    let decision = h.shield.handle(&session, get("/account")).await.unwrap();

    assert_eq!(redirect_location(decision), "/login");
    assert_eq!(h.authenticator.reload_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn authorized_principal_passes_with_principal_attached() {
    let user = alice();
    let h = harness_with(ShieldConfig::default(), user.clone(), Reload::Keep, true);
    let session = RecordingSession::with_user(&user);

    let req = passed(h.shield.handle(&session, get("/account")).await.unwrap());

    assert_eq!(req.extensions().get::<Principal>(), Some(&user));
    assert_eq!(*h.authorizer.seen.lock(), vec![role_set(["user"])]);
    assert_eq!(session.peek(SessionKey::LoginTarget), None);
}

#[tokio::test]
async fn authorization_denial_is_returned_unchanged() {
    let user = alice();
    let h = harness_with(ShieldConfig::default(), user.clone(), Reload::Keep, false);
    let session = RecordingSession::with_user(&user);

    let err = h
        .shield
        .handle(&session, get("/admin"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ShieldError::Authorization(AuthzError::Forbidden)
    ));
    assert_eq!(*h.authorizer.seen.lock(), vec![role_set(["admin"])]);
}
