//! Auth Service capability and session change notifications
//!
//! The Auth Service issues and destroys sessions. Besides the direct calls,
//! it announces every session change (sign-in, sign-out, token refresh) on a
//! broadcast channel; consumers hold a [`SessionSubscription`] for as long as
//! they want to hear about them and call [`SessionSubscription::unsubscribe`]
//! on teardown.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{AuthError, TransportError};
use crate::models::{Session, SessionChange, UserMetadata};

/// Buffered notifications per subscriber before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Authentication capability consumed by the app
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Current session, restored from the service's own storage if needed
    async fn get_current_session(&self) -> Result<Option<Session>, TransportError>;

    /// Subscribe to session changes from now on
    fn subscribe(&self) -> SessionSubscription;

    /// Sign in with e-mail and password
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Register a new user
    ///
    /// Returns a session only when the service does not require e-mail
    /// confirmation.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<Option<Session>, AuthError>;

    /// Send a 6-digit one-time code to `email`
    async fn sign_in_with_otp(&self, email: &str) -> Result<(), AuthError>;

    /// Exchange a one-time code for a session
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, AuthError>;

    /// Destroy the current session
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Broadcaster of [`SessionChange`] notifications
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionChange>,
}

impl SessionEvents {
    /// Create a broadcaster buffering `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Open a new subscription
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver a change to every live subscription
    pub fn emit(&self, change: SessionChange) {
        tracing::debug!(
            event = ?change.event,
            has_session = change.session.is_some(),
            "Session change"
        );
        // No subscribers is not an error: nobody is listening yet.
        let _ = self.tx.send(change);
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A single live subscription to session changes
#[derive(Debug)]
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Wait for the next change
    ///
    /// Returns `None` once the Auth Service is gone. If the subscriber fell
    /// behind, the missed notifications are skipped and delivery resumes with
    /// the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Session subscriber lagged, skipping notifications");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        tracing::debug!("Session subscription closed");
    }
}
