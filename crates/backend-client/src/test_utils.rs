//! In-memory Auth Service and Profile Store for testing
//!
//! These fakes follow the observable behavior of the hosted backend closely
//! enough to drive the session resolver and the auth flows without a network:
//! sessions are announced on the change channel, one-time codes are fixed,
//! and a missing profile row is reported with the not-found error.

#![allow(dead_code)] // Not every helper is used by every test crate

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::auth::{AuthService, SessionEvents, SessionSubscription};
use crate::error::{AuthError, StoreError, TransportError};
use crate::models::{
    AuthChangeEvent, NewProfile, Profile, Role, Session, SessionChange, User, UserMetadata,
};
use crate::store::ProfileStore;

/// One-time code accepted by [`InMemoryAuth`]
pub const OTP_CODE: &str = "123456";

/// Build a session for `user_id`
pub fn session_for(user_id: &str, email: &str) -> Session {
    Session {
        access_token: format!("{}_access", user_id),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: None,
        refresh_token: format!("{}_refresh", user_id),
        user: User::new(user_id, Some(email.to_string())),
    }
}

/// Build a profile row for `user_id`
pub fn profile_for(user_id: &str, role: Role) -> Profile {
    Profile {
        id: user_id.to_string(),
        full_name: format!("User {}", user_id),
        role,
        organization: "Central Water Commission".to_string(),
        location: "Patna".to_string(),
        site_id: role.requires_site().then(|| "CWC-GAN-001".to_string()),
        created_at: None,
        is_active: Some(true),
    }
}

#[derive(Debug, Clone)]
struct RegisteredUser {
    id: String,
    password: String,
    metadata: UserMetadata,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    users: HashMap<String, RegisteredUser>,
    pending_otp: HashMap<String, String>,
    session_fetch_failures: usize,
    next_user: u64,
    calls: Vec<String>,
}

/// In-memory Auth Service
#[derive(Debug, Default)]
pub struct InMemoryAuth {
    state: Mutex<AuthState>,
    events: SessionEvents,
}

impl InMemoryAuth {
    /// Service with no stored session and no users
    pub fn new() -> Self {
        Self::default()
    }

    /// Service that restores `session` on the first session fetch
    pub fn with_session(session: Session) -> Self {
        let auth = Self::new();
        auth.state.lock().session = Some(session);
        auth
    }

    /// Register a user that can sign in with a password
    pub fn register(&self, user_id: &str, email: &str, password: &str) {
        self.state.lock().users.insert(
            email.to_string(),
            RegisteredUser {
                id: user_id.to_string(),
                password: password.to_string(),
                metadata: UserMetadata::default(),
            },
        );
    }

    /// Make the next `count` session fetches fail with a transport error
    pub fn fail_session_fetches(&self, count: usize) {
        self.state.lock().session_fetch_failures = count;
    }

    /// Replace the session and announce it, as the backend would on any
    /// sign-in, token refresh, or sign-out
    pub fn push_session(&self, session: Option<Session>) {
        let event = if session.is_some() {
            AuthChangeEvent::SignedIn
        } else {
            AuthChangeEvent::SignedOut
        };
        self.state.lock().session = session.clone();
        self.events.emit(SessionChange::new(event, session));
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Current session held by the service
    pub fn current(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    /// Metadata recorded for `email` at sign-up
    pub fn metadata_for(&self, email: &str) -> Option<UserMetadata> {
        self.state
            .lock()
            .users
            .get(email)
            .map(|user| user.metadata.clone())
    }

    /// Number of live change subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn record(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }

    fn start_session(&self, user: &RegisteredUser, email: &str) -> Session {
        let mut session = session_for(&user.id, email);
        session.user.user_metadata = user.metadata.clone();
        self.push_session(Some(session.clone()));
        session
    }
}

#[async_trait]
impl AuthService for InMemoryAuth {
    async fn get_current_session(&self) -> Result<Option<Session>, TransportError> {
        self.record("get_current_session");
        let mut state = self.state.lock();
        if state.session_fetch_failures > 0 {
            state.session_fetch_failures -= 1;
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(state.session.clone())
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.record("sign_in_with_password");
        let user = self
            .state
            .lock()
            .users
            .get(email)
            .filter(|user| user.password == password)
            .cloned()
            .ok_or_else(|| AuthError::with_status(400, "Invalid login credentials"))?;
        Ok(self.start_session(&user, email))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<Option<Session>, AuthError> {
        self.record("sign_up");
        let mut state = self.state.lock();
        if state.users.contains_key(email) {
            return Err(AuthError::with_status(422, "User already registered"));
        }
        state.next_user += 1;
        let id = format!("user-{}", state.next_user);
        state.users.insert(
            email.to_string(),
            RegisteredUser {
                id,
                password: password.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(None)
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<(), AuthError> {
        self.record("sign_in_with_otp");
        let mut state = self.state.lock();
        if !state.users.contains_key(email) {
            state.next_user += 1;
            let id = format!("user-{}", state.next_user);
            state.users.insert(
                email.to_string(),
                RegisteredUser {
                    id,
                    password: String::new(),
                    metadata: UserMetadata::default(),
                },
            );
        }
        state
            .pending_otp
            .insert(email.to_string(), OTP_CODE.to_string());
        Ok(())
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        self.record("verify_otp");
        let user = {
            let mut state = self.state.lock();
            match state.pending_otp.get(email) {
                Some(expected) if expected == code => {
                    state.pending_otp.remove(email);
                    state.users.get(email).cloned()
                }
                _ => None,
            }
        };
        let user =
            user.ok_or_else(|| AuthError::with_status(403, "Token has expired or is invalid"))?;
        Ok(self.start_session(&user, email))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record("sign_out");
        self.push_session(None);
        Ok(())
    }
}

/// In-memory Profile Store
#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    rows: Mutex<HashMap<String, Profile>>,
    failure: Mutex<Option<StoreError>>,
    delays: Mutex<HashMap<String, Duration>>,
    queries: Mutex<Vec<(String, Instant)>>,
    inserts: Mutex<Vec<NewProfile>>,
}

impl InMemoryProfiles {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a row directly, bypassing insert bookkeeping
    pub fn put(&self, profile: Profile) {
        self.rows.lock().insert(profile.id.clone(), profile);
    }

    /// Make every lookup fail with `error` (or stop failing with `None`)
    pub fn fail_lookups(&self, error: Option<StoreError>) {
        *self.failure.lock() = error;
    }

    /// Delay lookups for `user_id` by `delay`
    pub fn delay_lookups(&self, user_id: &str, delay: Duration) {
        self.delays.lock().insert(user_id.to_string(), delay);
    }

    /// User ids looked up so far with the (tokio) instant of each query
    pub fn queries(&self) -> Vec<(String, Instant)> {
        self.queries.lock().clone()
    }

    /// Records inserted so far
    pub fn inserts(&self) -> Vec<NewProfile> {
        self.inserts.lock().clone()
    }

    /// Row currently stored for `user_id`
    pub fn row(&self, user_id: &str) -> Option<Profile> {
        self.rows.lock().get(user_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
        self.queries
            .lock()
            .push((user_id.to_string(), Instant::now()));

        let delay = self.delays.lock().get(user_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        self.rows.lock().get(user_id).cloned().ok_or_else(|| {
            StoreError::NotFound("JSON object requested, multiple (or no) rows returned".to_string())
        })
    }

    async fn insert_profile(&self, record: &NewProfile) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        if rows.contains_key(&record.id) {
            return Err(StoreError::Backend {
                code: "23505".to_string(),
                message: "duplicate key value violates unique constraint \"profiles_pkey\""
                    .to_string(),
            });
        }
        rows.insert(record.id.clone(), record.clone().into_profile());
        self.inserts.lock().push(record.clone());
        Ok(())
    }
}
