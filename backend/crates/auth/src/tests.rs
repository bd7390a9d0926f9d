//! Unit and HTTP tests for the auth crate
//! Everything runs against the in-memory repository and audit sink.

#[cfg(test)]
pub(crate) mod support {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use audit::{AuditLog, MemoryAuditSink};
    use chrono::{DateTime, Utc};
    use kernel::id::UserId;
    use axum::Router;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use platform::credential::CredentialStore;
    use platform::rate_limit::InMemoryRateLimiter;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::application::config::AuthConfig;
    use crate::domain::entity::session::Session;
    use crate::domain::entity::user::{PasswordCredential, User};
    use crate::domain::identity::IdentityProviders;
    use crate::domain::repository::{
        AuthStore, SessionRepository, TableCount, TableInventory, UserRepository,
    };
    use crate::domain::value_object::{display_name::DisplayName, email::Email, user_role::UserRole};
    use crate::error::{AuthError, AuthResult};
    use crate::infra::memory::MemoryAuthRepository;
    use crate::presentation::handlers::AuthAppState;
    use crate::presentation::router::{admin_router, auth_router};

    pub const STRONG_PASSWORD: &str = "Str0ng!Passw0rd123";

    /// Insert a user that cannot log in (its credential never verifies).
    pub fn seed_user(repo: &MemoryAuthRepository, email: &str, role: UserRole) -> User {
        let mut user = User::new(
            DisplayName::new("Seeded User").unwrap(),
            Email::new(email).unwrap(),
            PasswordCredential {
                hash: "00".into(),
                salt: "00".into(),
            },
            role,
            None,
        );
        loop {
            match repo.insert_user(user.clone()) {
                Ok(()) => return user,
                Err(AuthError::ReferralCodeTaken) => user.regenerate_referral_code(),
                Err(e) => panic!("seeding failed: {e}"),
            }
        }
    }

    /// Wraps the in-memory repository; after [`go_down`](Self::go_down)
    /// every call fails the way a lost database connection does.
    #[derive(Default)]
    pub struct FlakyRepository {
        pub inner: MemoryAuthRepository,
        down: AtomicBool,
    }

    impl FlakyRepository {
        pub fn go_down(&self) {
            self.down.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> AuthResult<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(AuthError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    impl UserRepository for FlakyRepository {
        async fn create(&self, user: &User) -> AuthResult<()> {
            self.check()?;
            self.inner.create(user).await
        }

        async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
            self.check()?;
            self.inner.find_by_id(user_id).await
        }

        async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
            self.check()?;
            self.inner.find_by_email(email).await
        }

        async fn find_many(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>> {
            self.check()?;
            self.inner.find_many(user_ids).await
        }

        async fn update(&self, user: &User) -> AuthResult<()> {
            self.check()?;
            self.inner.update(user).await
        }

        async fn update_and_revoke_sessions(&self, user: &User) -> AuthResult<u64> {
            self.check()?;
            self.inner.update_and_revoke_sessions(user).await
        }

        async fn list(&self) -> AuthResult<Vec<User>> {
            self.check()?;
            self.inner.list().await
        }

        async fn set_role(&self, user_id: &UserId, role: UserRole) -> AuthResult<bool> {
            self.check()?;
            self.inner.set_role(user_id, role).await
        }
    }

    impl SessionRepository for FlakyRepository {
        async fn replace_for_user(&self, session: &Session, revoke_others: bool) -> AuthResult<u64> {
            self.check()?;
            self.inner.replace_for_user(session, revoke_others).await
        }

        async fn find(&self, token_hash: &str) -> AuthResult<Option<Session>> {
            self.check()?;
            self.inner.find(token_hash).await
        }

        async fn delete(&self, token_hash: &str) -> AuthResult<bool> {
            self.check()?;
            self.inner.delete(token_hash).await
        }

        async fn delete_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
            self.check()?;
            self.inner.delete_all_for_user(user_id).await
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
            self.check()?;
            self.inner.delete_expired(now).await
        }
    }

    impl TableInventory for FlakyRepository {
        async fn table_counts(&self) -> AuthResult<Vec<TableCount>> {
            self.check()?;
            self.inner.table_counts().await
        }
    }

    pub struct TestApp<R = MemoryAuthRepository> {
        pub router: Router,
        pub state: AuthAppState<R, MemoryAuditSink>,
        pub repo: Arc<R>,
        pub sink: Arc<MemoryAuditSink>,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with(AuthConfig::default(), IdentityProviders::new())
        }

        pub fn with(config: AuthConfig, providers: IdentityProviders) -> Self {
            Self::on(Arc::new(MemoryAuthRepository::new()), config, providers)
        }
    }

    impl<R: AuthStore> TestApp<R> {
        pub fn on(repo: Arc<R>, config: AuthConfig, providers: IdentityProviders) -> Self {
            let sink = Arc::new(MemoryAuditSink::new());
            let state = AuthAppState::new(
                repo.clone(),
                AuditLog::new(sink.clone()),
                CredentialStore::default(),
                providers,
                config,
            );
            let limiter = Arc::new(InMemoryRateLimiter::new());

            let router = Router::new()
                .nest("/auth", auth_router(state.clone(), limiter))
                .nest("/admin", admin_router(state.clone()));

            Self {
                router,
                state,
                repo,
                sink,
            }
        }

        /// Send a JSON request from 127.0.0.1 and decode the JSON reply
        /// (`Null` for an empty body).
        pub async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let res = self.router.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        /// Register through the API and return `(token, user id)`.
        pub async fn register(&self, name: &str, email: &str) -> (String, String) {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/auth/register",
                    None,
                    Some(serde_json::json!({
                        "name": name,
                        "email": email,
                        "password": STRONG_PASSWORD,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "register failed: {body}");
            (
                body["token"].as_str().unwrap().to_string(),
                body["user"]["id"].as_str().unwrap().to_string(),
            )
        }

        /// Issue a session directly for a seeded user.
        pub async fn token_for(&self, user: &User) -> String {
            crate::application::session_manager::SessionManager::new(
                self.repo.clone(),
                self.state.config.clone(),
            )
            .issue(user.user_id)
            .await
            .unwrap()
            .token
        }
    }
}

#[cfg(test)]
mod register_tests {
    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::application::config::AuthConfig;
    use crate::domain::identity::IdentityProviders;

    #[tokio::test]
    async fn test_register_then_me() {
        let app = TestApp::new();
        let (token, _) = app.register("Ada Lovelace", "Ada@Example.com").await;

        let (status, body) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"]["referralCode"].as_str().unwrap().starts_with("ADA"));
        assert!(body["user"].get("passwordHash").is_none());

        let events: Vec<_> = app.sink.entries().iter().map(|e| e.event_type).collect();
        assert_eq!(events, vec![AuditEventType::AuthRegisterSuccess]);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_generic_400() {
        let app = TestApp::new();
        app.register("First", "dup@example.com").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": "Second", "email": "DUP@example.com", "password": STRONG_PASSWORD})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "User already exists");
        assert_eq!(app.repo.user_count(), 1);

        let last = app.sink.entries().pop().unwrap();
        assert_eq!(last.event_type, AuditEventType::AuthRegisterFailed);
        assert_eq!(last.metadata["email"], "dup@example.com");
    }

    #[tokio::test]
    async fn test_validation_failures_are_audited() {
        let app = TestApp::new();

        let cases = [
            json!({"name": "", "email": "a@example.com", "password": STRONG_PASSWORD}),
            json!({"name": "A", "email": "not-an-email", "password": STRONG_PASSWORD}),
            json!({"name": "A", "email": "a@example.com", "password": "short"}),
            json!({"name": "A", "email": "a@example.com", "password": "alllowercase1234"}),
            json!({"email": "a@example.com"}),
        ];
        for body in cases {
            let (status, _) = app.send(Method::POST, "/auth/register", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        assert_eq!(app.repo.user_count(), 0);
        assert!(
            app.sink
                .entries()
                .iter()
                .all(|e| e.event_type == AuditEventType::AuthRegisterFailed)
        );
    }

    #[tokio::test]
    async fn test_wrongly_typed_body_is_400_and_audited() {
        let app = TestApp::new();

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": 5, "email": "a@example.com", "password": STRONG_PASSWORD})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(app.repo.user_count(), 0);

        let entries = app.sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, AuditEventType::AuthRegisterFailed);
        assert_eq!(entries[0].client_ip.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_owner_email_bootstraps_owner_role() {
        let config = AuthConfig::default().with_owner_emails(["boss@example.com"]);
        let app = TestApp::with(config, IdentityProviders::new());

        let (token, _) = app.register("Boss", "boss@example.com").await;
        let (_, body) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(body["user"]["role"], "owner");
    }
}

#[cfg(test)]
mod login_tests {
    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_success() {
        let app = TestApp::new();
        app.register("Grace", "grace@example.com").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "grace@example.com", "password": STRONG_PASSWORD})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "grace@example.com");
        assert_eq!(body["token"].as_str().unwrap().len(), 43);
        assert_eq!(
            app.sink.entries().pop().unwrap().event_type,
            AuditEventType::AuthLoginSuccess
        );
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_identical() {
        let app = TestApp::new();
        app.register("Grace", "grace@example.com").await;

        let (s1, b1) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "grace@example.com", "password": "Wr0ngPassword!!"})),
            )
            .await;
        let (s2, b2) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "nobody@example.com", "password": "Wr0ngPassword!!"})),
            )
            .await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(b1, b2);

        let failures: Vec<_> = app
            .sink
            .entries()
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::AuthLoginFailed)
            .collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].metadata["reason"], "bad_password");
        assert_eq!(failures[1].metadata["reason"], "unknown_email");
    }

    #[tokio::test]
    async fn test_missing_fields_are_400() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::POST, "/auth/login", None, Some(json!({"email": "a@example.com"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            app.sink.entries().pop().unwrap().event_type,
            AuditEventType::AuthLoginFailed
        );
    }

    #[tokio::test]
    async fn test_wrongly_typed_login_is_400_and_audited() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": ["a@example.com"], "password": STRONG_PASSWORD})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["title"], "Bad Request");

        let failures: Vec<_> = app
            .sink
            .entries()
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::AuthLoginFailed)
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_new_login_invalidates_previous_token() {
        let app = TestApp::new();
        let (first, _) = app.register("Grace", "grace@example.com").await;

        let (_, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "grace@example.com", "password": STRONG_PASSWORD})),
            )
            .await;
        let second = body["token"].as_str().unwrap();

        let (status, _) = app.send(Method::GET, "/auth/me", Some(&first), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.send(Method::GET, "/auth/me", Some(second), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sixth_attempt_is_rate_limited() {
        let app = TestApp::new();
        let attempt = json!({"email": "grace@example.com", "password": "Wr0ngPassword!!"});

        for _ in 0..5 {
            let (status, _) = app
                .send(Method::POST, "/auth/login", None, Some(attempt.clone()))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, body) = app
            .send(Method::POST, "/auth/login", None, Some(attempt))
            .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["retryAfterSeconds"].as_u64().unwrap() > 0);
    }
}

#[cfg(test)]
mod session_tests {
    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_me_without_token_is_401() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn test_me_with_bogus_token_is_403() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::GET, "/auth/me", Some("definitely-not-a-session"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_password_change_revokes_sessions() {
        let app = TestApp::new();
        let (token, _) = app.register("Grace", "grace@example.com").await;

        let (status, _) = app
            .send(
                Method::PUT,
                "/auth/update",
                Some(&token),
                Some(json!({"password": "An0ther!Passphrase"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "grace@example.com", "password": "An0ther!Passphrase"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let changed = app
            .sink
            .entries()
            .into_iter()
            .find(|e| e.event_type == AuditEventType::AuthPasswordChanged)
            .unwrap();
        assert_eq!(changed.metadata["revokedSessions"], 1);
    }

    #[tokio::test]
    async fn test_weak_new_password_is_rejected_and_audited() {
        let app = TestApp::new();
        let (token, _) = app.register("Grace", "grace@example.com").await;

        let (status, _) = app
            .send(Method::PUT, "/auth/update", Some(&token), Some(json!({"password": "weak"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Old session untouched
        let (status, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            app.sink
                .entries()
                .iter()
                .any(|e| e.event_type == AuditEventType::AuthPasswordChangeFailed)
        );
    }

    #[tokio::test]
    async fn test_profile_update_keeps_session() {
        let app = TestApp::new();
        let (token, _) = app.register("Grace", "grace@example.com").await;

        let (status, body) = app
            .send(
                Method::PUT,
                "/auth/update",
                Some(&token),
                Some(json!({"name": "Grace Hopper", "company": "Navy", "email": "GH@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Grace Hopper");
        assert_eq!(body["user"]["company"], "Navy");
        assert_eq!(body["user"]["email"], "gh@example.com");

        let (status, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let updated = app.sink.entries().pop().unwrap();
        assert_eq!(updated.event_type, AuditEventType::AuthProfileUpdated);
        assert_eq!(updated.metadata["fields"], json!(["name", "company", "email"]));
    }

    #[tokio::test]
    async fn test_profile_update_to_taken_email() {
        let app = TestApp::new();
        app.register("Ada", "ada@example.com").await;
        let (token, _) = app.register("Grace", "grace@example.com").await;

        let (status, body) = app
            .send(
                Method::PUT,
                "/auth/update",
                Some(&token),
                Some(json!({"email": "ada@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "User already exists");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = TestApp::new();
        let (token, _) = app.register("Grace", "grace@example.com").await;

        let (status, _) = app.send(Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            app.sink.entries().pop().unwrap().event_type,
            AuditEventType::AuthLogout
        );
    }
}

#[cfg(test)]
mod oauth_tests {
    use std::sync::Arc;

    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::application::config::AuthConfig;
    use crate::domain::identity::{
        BoxFuture, ExternalIdentity, IdentityProvider, IdentityProviders,
    };
    use crate::error::{AuthError, AuthResult};

    struct StaticProvider {
        identity: ExternalIdentity,
    }

    impl IdentityProvider for StaticProvider {
        fn name(&self) -> &str {
            "google"
        }

        fn exchange<'a>(&'a self, code: &'a str) -> BoxFuture<'a, AuthResult<ExternalIdentity>> {
            Box::pin(async move {
                if code == "good-code" {
                    Ok(self.identity.clone())
                } else {
                    Err(AuthError::IdentityProvider("invalid_grant".into()))
                }
            })
        }
    }

    fn app() -> TestApp {
        let provider = StaticProvider {
            identity: ExternalIdentity {
                email: "Lin@Example.com".into(),
                display_name: "Lin".into(),
            },
        };
        TestApp::with(
            AuthConfig::default(),
            IdentityProviders::new().register(Arc::new(provider)),
        )
    }

    #[tokio::test]
    async fn test_unknown_provider_is_404() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::POST, "/auth/oauth/google", None, Some(json!({"code": "x"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_account() {
        let app = app();

        let (status, body) = app
            .send(Method::POST, "/auth/oauth/google", None, Some(json!({"code": "good-code"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "lin@example.com");
        assert_eq!(body["user"]["company"], "Google User");
        assert_eq!(body["user"]["role"], "user");

        let (status, again) = app
            .send(Method::POST, "/auth/oauth/google", None, Some(json!({"code": "good-code"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["user"]["id"], body["user"]["id"]);
        assert_eq!(app.repo.user_count(), 1);

        let oauth: Vec<_> = app
            .sink
            .entries()
            .into_iter()
            .filter(|e| e.event_type == AuditEventType::AuthOauthLogin)
            .collect();
        assert_eq!(oauth[0].metadata["created"], true);
        assert_eq!(oauth[1].metadata["created"], false);
    }

    #[tokio::test]
    async fn test_provider_failure_is_503() {
        let app = app();
        let (status, _) = app
            .send(Method::POST, "/auth/oauth/google", None, Some(json!({"code": "bad"})))
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(app.repo.user_count(), 0);
    }
}

#[cfg(test)]
mod admin_tests {
    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::domain::repository::INSPECTABLE_TABLES;
    use crate::domain::value_object::user_role::UserRole;

    #[tokio::test]
    async fn test_list_users_requires_privileged_role() {
        let app = TestApp::new();
        let user = seed_user(&app.repo, "user@example.com", UserRole::User);
        let team = seed_user(&app.repo, "team@example.com", UserRole::Team);

        let token = app.token_for(&user).await;
        let (status, _) = app.send(Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let token = app.token_for(&team).await;
        let (status, body) = app.send(Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_owner_changes_roles() {
        let app = TestApp::new();
        let owner = seed_user(&app.repo, "owner@example.com", UserRole::Owner);
        let team = seed_user(&app.repo, "team@example.com", UserRole::Team);
        let user = seed_user(&app.repo, "user@example.com", UserRole::User);
        let uri = format!("/admin/users/{}/role", user.user_id);

        let team_token = app.token_for(&team).await;
        let (status, _) = app
            .send(Method::PUT, &uri, Some(&team_token), Some(json!({"role": "team"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let owner_token = app.token_for(&owner).await;
        let (status, body) = app
            .send(Method::PUT, &uri, Some(&owner_token), Some(json!({"role": "team"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "team");

        let changed = app.sink.entries().pop().unwrap();
        assert_eq!(changed.event_type, AuditEventType::AdminRoleChanged);
        assert_eq!(changed.actor_id, Some(owner.user_id));
        assert_eq!(changed.metadata["previousRole"], "user");
        assert_eq!(changed.metadata["role"], "team");

        // The promoted user's existing session sees the new role.
        let user_token = app.token_for(&user).await;
        let (status, _) = app.send(Method::GET, "/admin/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_role_rejects_bad_input() {
        let app = TestApp::new();
        let owner = seed_user(&app.repo, "owner@example.com", UserRole::Owner);
        let token = app.token_for(&owner).await;

        let uri = format!("/admin/users/{}/role", owner.user_id);
        let (status, _) = app
            .send(Method::PUT, &uri, Some(&token), Some(json!({"role": "admin"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(Method::PUT, "/admin/users/not-a-uuid/role", Some(&token), Some(json!({"role": "team"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/admin/users/{}/role", kernel::id::UserId::new());
        let (status, _) = app
            .send(Method::PUT, &uri, Some(&token), Some(json!({"role": "team"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tables_are_owner_only() {
        let app = TestApp::new();
        let owner = seed_user(&app.repo, "owner@example.com", UserRole::Owner);
        let team = seed_user(&app.repo, "team@example.com", UserRole::Team);

        let token = app.token_for(&team).await;
        let (status, _) = app.send(Method::GET, "/admin/tables", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let token = app.token_for(&owner).await;
        let (status, body) = app.send(Method::GET, "/admin/tables", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let tables = body["tables"].as_array().unwrap();
        assert_eq!(tables.len(), INSPECTABLE_TABLES.len());
        assert_eq!(tables[0], json!({"table": "users", "rows": 2}));
    }

    #[tokio::test]
    async fn test_audit_listing_filters_by_type() {
        let app = TestApp::new();
        let owner = seed_user(&app.repo, "owner@example.com", UserRole::Owner);
        app.register("Grace", "grace@example.com").await;
        app.send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "grace@example.com", "password": "Wr0ngPassword!!"})),
        )
        .await;

        let token = app.token_for(&owner).await;
        let (status, body) = app
            .send(Method::GET, "/admin/audit?eventType=AUTH_LOGIN_FAILED", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["eventType"], "AUTH_LOGIN_FAILED");
        assert_eq!(entries[0]["clientIp"], "127.0.0.1");

        let (status, _) = app
            .send(Method::GET, "/admin/audit?eventType=NOPE", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = app
            .send(Method::GET, "/admin/audit?limit=1", Some(&token), None)
            .await;
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    }
}

#[cfg(test)]
mod infrastructure_tests {
    use super::support::*;
    use audit::AuditEventType;
    use axum::http::{Method, StatusCode};
    use std::sync::Arc;

    use crate::application::config::AuthConfig;
    use crate::domain::identity::IdentityProviders;

    fn flaky_app() -> TestApp<FlakyRepository> {
        TestApp::on(
            Arc::new(FlakyRepository::default()),
            AuthConfig::default(),
            IdentityProviders::new(),
        )
    }

    #[tokio::test]
    async fn test_store_outage_during_authentication_is_opaque_500() {
        let app = flaky_app();
        let (token, _) = app.register("Ada Lovelace", "ada@example.com").await;

        app.repo.go_down();
        let (status, body) = app.send(Method::GET, "/auth/me", Some(&token), None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
        assert!(!body.to_string().contains("pool"));

        let failure = app
            .sink
            .entries()
            .into_iter()
            .find(|e| e.event_type == AuditEventType::InfrastructureFailure)
            .expect("infrastructure failure audited");
        assert_eq!(failure.metadata["operation"], "authenticate");
        assert_eq!(failure.client_ip.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_store_outage_during_login_is_audited() {
        let app = flaky_app();
        app.register("Ada Lovelace", "ada@example.com").await;

        app.repo.go_down();
        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({"email": "ada@example.com", "password": STRONG_PASSWORD})),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");

        let failure = app
            .sink
            .entries()
            .into_iter()
            .find(|e| e.event_type == AuditEventType::InfrastructureFailure)
            .expect("infrastructure failure audited");
        assert_eq!(failure.metadata["operation"], "login");
    }
}
