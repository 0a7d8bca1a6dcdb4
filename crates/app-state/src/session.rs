//! Session resolution
//!
//! The [`SessionResolver`] decides which top-level screen the app shows. It
//! owns the current session and the cached profile, and derives a
//! [`ResolvedState`] from them whenever either changes.
//!
//! Two event sources drive it: the one-time bootstrap (fetch the stored
//! session at startup) and the Auth Service's change notifications. A session
//! leads to a profile lookup after a short grace period, because the profile
//! row may be written shortly after the user is created. Every lookup carries
//! a request token; when a newer event supersedes it, its result is dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use app_state::session::{ResolvedState, ResolverConfig, SessionResolver};
//! use backend_client::{BackendConfig, HostedBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(HostedBackend::new(BackendConfig::from_env()?)?);
//!     let resolver = SessionResolver::new(backend.clone(), backend, ResolverConfig::default());
//!
//!     let handle = resolver.start();
//!     let mut states = resolver.watch();
//!     let state = states.wait_for(|s| !matches!(s, ResolvedState::Loading)).await?.clone();
//!     println!("showing {}", state.label());
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use backend_client::{AuthError, AuthService, Profile, ProfileStore, Session, StoreError};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

/// Delay between learning about a session and querying its profile
pub const DEFAULT_PROFILE_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Message shown when the startup session check fails
pub const INIT_FAILURE_MESSAGE: &str = "Failed to initialize app. Please restart the app.";

/// Which top-level screen the app should show
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedState {
    /// Startup session check in progress, or a new session is being resolved
    Loading,
    /// Startup failed; the message is shown with a retry action
    Error(String),
    /// No session: show the auth screens
    Unauthenticated,
    /// Signed in without a profile row: show profile setup for this user id
    ProfileIncomplete(String),
    /// Signed in with a profile: show the main app
    Ready {
        /// Current session
        session: Session,
        /// Profile of the session's user
        profile: Profile,
    },
}

impl ResolvedState {
    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedState::Loading => "loading",
            ResolvedState::Error(_) => "error",
            ResolvedState::Unauthenticated => "unauthenticated",
            ResolvedState::ProfileIncomplete(_) => "profile_incomplete",
            ResolvedState::Ready { .. } => "ready",
        }
    }

    /// User id of the signed-in user, if the state knows one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ResolvedState::ProfileIncomplete(user_id) => Some(user_id),
            ResolvedState::Ready { session, .. } => Some(session.user_id()),
            _ => None,
        }
    }

    /// Whether the main app can be shown
    pub fn is_ready(&self) -> bool {
        matches!(self, ResolvedState::Ready { .. })
    }
}

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Wait before each profile lookup
    pub profile_grace_period: Duration,
}

impl ResolverConfig {
    /// Set the profile grace period
    pub fn with_profile_grace_period(mut self, period: Duration) -> Self {
        self.profile_grace_period = period;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            profile_grace_period: DEFAULT_PROFILE_GRACE_PERIOD,
        }
    }
}

/// Whether a commit starts a new request or completes an existing one
#[derive(Debug, Clone, Copy)]
enum Ticket {
    Supersede,
    Holds(u64),
}

/// Requested change to the resolver's record
#[derive(Debug)]
enum Next {
    Loading,
    Failed(String),
    SignedOut,
    Resolving(Session),
    Reresolve,
    Resolved {
        session: Session,
        profile: Option<Profile>,
    },
}

/// Outcome of an accepted commit
#[derive(Debug)]
struct Committed {
    token: u64,
    session: Option<Session>,
}

#[derive(Debug, Default)]
struct Record {
    session: Option<Session>,
    profile: Option<Profile>,
    generation: u64,
}

struct Inner {
    auth: Arc<dyn AuthService>,
    profiles: Arc<dyn ProfileStore>,
    config: ResolverConfig,
    record: Mutex<Record>,
    state_tx: watch::Sender<ResolvedState>,
}

/// Owner of the session/profile state and the screen decision derived from it
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<Inner>,
}

impl SessionResolver {
    /// Create a resolver in the `Loading` state
    ///
    /// # Arguments
    ///
    /// * `auth` - Auth Service used for the session check and sign-out
    /// * `profiles` - Profile Store used for lookups
    /// * `config` - Resolver tuning
    pub fn new(
        auth: Arc<dyn AuthService>,
        profiles: Arc<dyn ProfileStore>,
        config: ResolverConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ResolvedState::Loading);
        Self {
            inner: Arc::new(Inner {
                auth,
                profiles,
                config,
                record: Mutex::new(Record::default()),
                state_tx,
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> ResolvedState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<ResolvedState> {
        self.inner.state_tx.subscribe()
    }

    /// Session the resolver currently knows about
    pub fn session(&self) -> Option<Session> {
        self.inner.record.lock().session.clone()
    }

    /// Profile cached for the current session
    pub fn cached_profile(&self) -> Option<Profile> {
        self.inner.record.lock().profile.clone()
    }

    /// Bootstrap and listen for session changes until the handle is shut down
    ///
    /// The subscription is opened before the startup session check so no
    /// change is missed. Bootstrap and lookup tasks belong to the handle and
    /// are aborted with it. Must be called within a tokio runtime.
    pub fn start(&self) -> ResolverHandle {
        let mut subscription = self.inner.auth.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let mut tasks = JoinSet::new();

        if let Some(committed) = self.commit(Ticket::Supersede, Next::Loading) {
            let resolver = self.clone();
            tasks.spawn(async move { resolver.run_bootstrap(committed.token).await });
        }

        let resolver = self.clone();
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                        if let Err(e) = finished {
                            tracing::warn!(error = %e, "Resolver task ended abnormally");
                        }
                    }
                    change = subscription.recv() => {
                        let Some(change) = change else { break };
                        tracing::info!(
                            event = ?change.event,
                            has_session = change.session.is_some(),
                            "Auth state changed"
                        );
                        // Accept in arrival order; only the lookup runs concurrently.
                        if let Some((token, session)) = resolver.accept_session(change.session) {
                            let resolver = resolver.clone();
                            tasks.spawn(async move {
                                resolver.resolve_profile(token, session).await
                            });
                        }
                    }
                }
            }
            subscription.unsubscribe();
            tasks.shutdown().await;
        });

        ResolverHandle {
            shutdown: Some(shutdown_tx),
            listener,
        }
    }

    /// Run the startup session check
    pub async fn bootstrap(&self) {
        if let Some(committed) = self.commit(Ticket::Supersede, Next::Loading) {
            self.run_bootstrap(committed.token).await;
        }
    }

    /// Re-run the startup session check after a failure
    ///
    /// Does nothing unless the resolver is in the `Error` state.
    pub async fn retry_bootstrap(&self) {
        if !matches!(self.state(), ResolvedState::Error(_)) {
            tracing::debug!(state = self.state().label(), "Ignoring retry outside error state");
            return;
        }
        tracing::info!("Retrying app initialization");
        self.bootstrap().await;
    }

    /// Process a session change notification
    pub async fn handle_session_change(&self, session: Option<Session>) {
        if let Some((token, session)) = self.accept_session(session) {
            self.resolve_profile(token, session).await;
        }
    }

    /// Look the profile up again, e.g. after profile setup or login
    ///
    /// The grace period applies as usual. Does nothing without a session.
    pub async fn notify_profile_complete(&self) {
        match self.commit(Ticket::Supersede, Next::Reresolve) {
            Some(Committed {
                token,
                session: Some(session),
            }) => self.resolve_profile(token, session).await,
            _ => tracing::debug!("Profile completion signalled without a session"),
        }
    }

    /// Sign out and drop back to the auth screens
    ///
    /// On failure the state is left untouched and the error is returned for
    /// display.
    pub async fn sign_out_and_reset(&self) -> Result<(), AuthError> {
        if let Err(e) = self.inner.auth.sign_out().await {
            tracing::error!(error = %e, "Sign-out failed");
            return Err(e);
        }
        self.commit(Ticket::Supersede, Next::SignedOut);
        Ok(())
    }

    async fn run_bootstrap(&self, token: u64) {
        tracing::info!("App starting, checking session");
        match self.inner.auth.get_current_session().await {
            Err(e) => {
                tracing::error!(error = %e, "Error getting initial session");
                self.commit(Ticket::Holds(token), Next::Failed(INIT_FAILURE_MESSAGE.to_string()));
            }
            Ok(None) => {
                tracing::info!("No session found");
                self.commit(Ticket::Holds(token), Next::SignedOut);
            }
            Ok(Some(session)) => {
                tracing::info!(user_id = session.user_id(), "Session found");
                let accepted = self.commit(Ticket::Holds(token), Next::Resolving(session.clone()));
                if accepted.is_some() {
                    self.resolve_profile(token, session).await;
                }
            }
        }
    }

    /// Record a notified session, superseding whatever was in flight
    fn accept_session(&self, session: Option<Session>) -> Option<(u64, Session)> {
        match session {
            None => {
                self.commit(Ticket::Supersede, Next::SignedOut);
                None
            }
            Some(session) => self
                .commit(Ticket::Supersede, Next::Resolving(session.clone()))
                .map(|committed| (committed.token, session)),
        }
    }

    async fn resolve_profile(&self, token: u64, session: Session) {
        tokio::time::sleep(self.inner.config.profile_grace_period).await;

        if !self.is_current(token) {
            tracing::debug!(token, "Resolution superseded before lookup");
            return;
        }

        let user_id = session.user_id().to_string();
        tracing::debug!(%user_id, "Fetching profile");

        // A panicking store must not strand the app in `Loading`.
        let store = Arc::clone(&self.inner.profiles);
        let lookup_id = user_id.clone();
        let lookup = tokio::spawn(async move { store.get_profile(&lookup_id).await }).await;

        let profile = match lookup {
            Ok(Ok(profile)) => Some(profile),
            Ok(Err(StoreError::NotFound(_))) => {
                tracing::info!(%user_id, "No profile found for user");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(%user_id, error = %e, "Error fetching profile");
                None
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "Profile lookup aborted");
                None
            }
        };

        self.commit(Ticket::Holds(token), Next::Resolved { session, profile });
    }

    fn is_current(&self, token: u64) -> bool {
        self.inner.record.lock().generation == token
    }

    /// Single entry point for every state change
    fn commit(&self, ticket: Ticket, next: Next) -> Option<Committed> {
        let mut record = self.inner.record.lock();

        match ticket {
            Ticket::Holds(token) if token != record.generation => {
                tracing::debug!(
                    token,
                    current = record.generation,
                    "Discarding stale result"
                );
                return None;
            }
            Ticket::Holds(_) => {}
            Ticket::Supersede => {
                if matches!(next, Next::Reresolve) && record.session.is_none() {
                    return None;
                }
                record.generation += 1;
            }
        }

        let state = match next {
            Next::Loading => Some(ResolvedState::Loading),
            Next::Failed(message) => {
                record.session = None;
                record.profile = None;
                Some(ResolvedState::Error(message))
            }
            Next::SignedOut => {
                record.session = None;
                record.profile = None;
                Some(ResolvedState::Unauthenticated)
            }
            Next::Resolving(session) => {
                let cached = record
                    .profile
                    .clone()
                    .filter(|profile| profile.id == session.user_id());
                let state = match cached {
                    // Token refresh for the signed-in user: stay on the main app.
                    Some(profile) => ResolvedState::Ready {
                        session: session.clone(),
                        profile,
                    },
                    None => {
                        record.profile = None;
                        ResolvedState::Loading
                    }
                };
                record.session = Some(session);
                Some(state)
            }
            Next::Reresolve => None,
            Next::Resolved { session, profile } => {
                let state = match &profile {
                    Some(profile) => ResolvedState::Ready {
                        session: session.clone(),
                        profile: profile.clone(),
                    },
                    None => ResolvedState::ProfileIncomplete(session.user_id().to_string()),
                };
                record.session = Some(session);
                record.profile = profile;
                Some(state)
            }
        };

        if let Some(state) = state {
            tracing::debug!(state = state.label(), generation = record.generation, "State committed");
            self.inner.state_tx.send_replace(state);
        }

        Some(Committed {
            token: record.generation,
            session: record.session.clone(),
        })
    }
}

/// Running resolver: dropping or shutting it down ends the subscription
/// and aborts any bootstrap or lookup still in flight
#[derive(Debug)]
pub struct ResolverHandle {
    shutdown: Option<oneshot::Sender<()>>,
    listener: JoinHandle<()>,
}

impl ResolverHandle {
    /// Unsubscribe from session changes and wait for the listener and its
    /// tasks to stop
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.listener).await {
            tracing::warn!(error = %e, "Session listener ended abnormally");
        }
    }
}
