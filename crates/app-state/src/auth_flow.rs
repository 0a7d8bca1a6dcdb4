//! Sign-in, sign-up and OTP verification flows
//!
//! The flows talk to the Auth Service and, after verification, make sure the
//! new user has a profile row. They never touch the resolver: a successful
//! sign-in is announced on the session change channel, which is what moves
//! the app out of the auth screens.

use std::sync::Arc;

use backend_client::{AuthError, AuthService, ProfileStore, Session, StoreError};
use chrono::Utc;
use thiserror::Error;

use crate::forms::{validate_otp, LoginForm, SignUpForm, ValidationError};

/// Auth flow failure, shown as an alert with [`FlowError::title`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Form rejected before any backend call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Password sign-in rejected
    #[error("{0}")]
    SignIn(AuthError),

    /// Account creation rejected
    #[error("{0}")]
    SignUp(AuthError),

    /// Sending or verifying the one-time code failed
    #[error("{0}")]
    Otp(AuthError),
}

impl FlowError {
    /// Alert title for this failure
    pub fn title(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "Error",
            FlowError::SignIn(_) => "Login Error",
            FlowError::SignUp(_) => "Sign Up Error",
            FlowError::Otp(_) => "OTP Error",
        }
    }
}

/// Result type for auth flows
pub type Result<T> = std::result::Result<T, FlowError>;

/// Sign-up waiting for the e-mailed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    email: String,
    form: SignUpForm,
}

impl PendingVerification {
    /// Address the code was sent to
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Form the account was created from
    pub fn form(&self) -> &SignUpForm {
        &self.form
    }
}

/// Auth screen actions
#[derive(Clone)]
pub struct AuthFlow {
    auth: Arc<dyn AuthService>,
    profiles: Arc<dyn ProfileStore>,
}

impl AuthFlow {
    /// Create the flows over an Auth Service and Profile Store
    pub fn new(auth: Arc<dyn AuthService>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { auth, profiles }
    }

    /// Sign in with e-mail and password
    pub async fn sign_in(&self, form: &LoginForm) -> Result<Session> {
        form.validate()?;
        let email = form.email.trim();

        tracing::info!(%email, "Signing in");
        self.auth
            .sign_in_with_password(email, &form.password)
            .await
            .map_err(|e| {
                tracing::warn!(%email, error = %e, "Sign-in failed");
                FlowError::SignIn(e)
            })
    }

    /// Create an account and send the verification code
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<PendingVerification> {
        form.validate()?;
        let email = form.normalized_email();

        tracing::info!(%email, role = %form.role, "Creating account");
        self.auth
            .sign_up(&email, &form.password, &form.metadata())
            .await
            .map_err(|e| {
                tracing::warn!(%email, error = %e, "Sign-up failed");
                FlowError::SignUp(e)
            })?;

        self.auth.sign_in_with_otp(&email).await.map_err(|e| {
            tracing::warn!(%email, error = %e, "Sending verification code failed");
            FlowError::Otp(e)
        })?;

        Ok(PendingVerification {
            email,
            form: form.clone(),
        })
    }

    /// Send the verification code again
    pub async fn resend_code(&self, pending: &PendingVerification) -> Result<()> {
        self.auth
            .sign_in_with_otp(&pending.email)
            .await
            .map_err(FlowError::Otp)
    }

    /// Verify the e-mailed code and make sure the user has a profile row
    ///
    /// The profile is created from the sign-up form only when the lookup
    /// reports that no row exists. Insert failures are logged and otherwise
    /// ignored; the user then lands on profile setup.
    pub async fn verify_otp(&self, pending: &PendingVerification, code: &str) -> Result<Session> {
        validate_otp(code)?;

        let session = self
            .auth
            .verify_otp(&pending.email, code.trim())
            .await
            .map_err(|e| {
                tracing::warn!(email = %pending.email, error = %e, "Code verification failed");
                FlowError::Otp(e)
            })?;

        let user_id = session.user_id();
        match self.profiles.get_profile(user_id).await {
            Ok(_) => tracing::debug!(%user_id, "Profile already exists"),
            Err(StoreError::NotFound(_)) => {
                let record = pending.form.to_new_profile(user_id, Utc::now());
                match self.profiles.insert_profile(&record).await {
                    Ok(()) => tracing::info!(%user_id, "Profile created"),
                    Err(e) => tracing::error!(%user_id, error = %e, "Profile creation failed"),
                }
            }
            Err(e) => tracing::warn!(%user_id, error = %e, "Profile check failed"),
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backend_client::test_utils::{InMemoryAuth, InMemoryProfiles, OTP_CODE};
    use backend_client::{NewProfile, Profile, Role};
    use mockall::mock;

    mock! {
        Store {}

        #[async_trait]
        impl ProfileStore for Store {
            async fn get_profile(&self, user_id: &str) -> std::result::Result<Profile, StoreError>;
            async fn insert_profile(&self, record: &NewProfile) -> std::result::Result<(), StoreError>;
        }
    }

    fn field_form() -> SignUpForm {
        SignUpForm {
            email: "ravi@cwc.gov.in".to_string(),
            password: "secret".to_string(),
            phone: "+91 98765 43210".to_string(),
            full_name: "Ravi Sharma".to_string(),
            role: Role::FieldPersonnel,
            organization: "Central Water Commission".to_string(),
            location: "Varanasi".to_string(),
            site_id: "CWC-GAN-001".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in() {
        let auth = Arc::new(InMemoryAuth::new());
        auth.register("u1", "a@x.com", "pw");
        let flow = AuthFlow::new(auth.clone(), Arc::new(InMemoryProfiles::new()));

        let session = flow
            .sign_in(&LoginForm::new(" a@x.com ", "pw"))
            .await
            .unwrap();
        assert_eq!(session.user_id(), "u1");

        let err = flow
            .sign_in(&LoginForm::new("a@x.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.title(), "Login Error");
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_invalid_login_makes_no_call() {
        let auth = Arc::new(InMemoryAuth::new());
        let flow = AuthFlow::new(auth.clone(), Arc::new(InMemoryProfiles::new()));

        let err = flow.sign_in(&LoginForm::new("", "")).await.unwrap_err();
        assert_eq!(err.title(), "Error");
        assert_eq!(err.to_string(), "Please enter email and password");
        assert!(auth.calls().is_empty());
    }

    #[tokio::test]
    async fn test_field_personnel_without_site_makes_no_call() {
        let auth = Arc::new(InMemoryAuth::new());
        let flow = AuthFlow::new(auth.clone(), Arc::new(MockStore::new()));
        let form = SignUpForm {
            site_id: String::new(),
            ..field_form()
        };

        let err = flow.sign_up(&form).await.unwrap_err();
        assert_eq!(
            err,
            FlowError::Validation(ValidationError::MissingSiteId)
        );
        assert_eq!(err.to_string(), "Site ID is required for field personnel");
        assert!(auth.calls().is_empty());
        assert_eq!(form.site_id, "");
    }

    #[tokio::test]
    async fn test_sign_up_sends_code() {
        let auth = Arc::new(InMemoryAuth::new());
        let flow = AuthFlow::new(auth.clone(), Arc::new(InMemoryProfiles::new()));

        let pending = flow.sign_up(&field_form()).await.unwrap();

        assert_eq!(pending.email(), "ravi@cwc.gov.in");
        assert_eq!(auth.calls(), vec!["sign_up", "sign_in_with_otp"]);
        let metadata = auth.metadata_for("ravi@cwc.gov.in").unwrap();
        assert_eq!(metadata.role, Some(Role::FieldPersonnel));
        assert_eq!(metadata.site_id.as_deref(), Some("CWC-GAN-001"));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_reported() {
        let auth = Arc::new(InMemoryAuth::new());
        auth.register("u1", "ravi@cwc.gov.in", "pw");
        let flow = AuthFlow::new(auth.clone(), Arc::new(InMemoryProfiles::new()));

        let err = flow.sign_up(&field_form()).await.unwrap_err();
        assert_eq!(err.title(), "Sign Up Error");
        assert!(!auth.calls().contains(&"sign_in_with_otp".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_code_is_rejected_locally() {
        let auth = Arc::new(InMemoryAuth::new());
        let flow = AuthFlow::new(auth.clone(), Arc::new(MockStore::new()));
        let pending = flow.sign_up(&field_form()).await.unwrap();

        let err = flow.verify_otp(&pending, "12345").await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid 6-digit OTP");
        assert!(!auth.calls().contains(&"verify_otp".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_code_is_otp_error() {
        let auth = Arc::new(InMemoryAuth::new());
        let flow = AuthFlow::new(auth.clone(), Arc::new(MockStore::new()));
        let pending = flow.sign_up(&field_form()).await.unwrap();

        let err = flow.verify_otp(&pending, "000000").await.unwrap_err();
        assert_eq!(err.title(), "OTP Error");
    }

    #[tokio::test]
    async fn test_verification_creates_missing_profile() {
        let auth = Arc::new(InMemoryAuth::new());
        let mut store = MockStore::new();
        store
            .expect_get_profile()
            .withf(|user_id| user_id == "user-1")
            .times(1)
            .returning(|_| Err(StoreError::NotFound("no rows".to_string())));
        store
            .expect_insert_profile()
            .withf(|record| {
                record.id == "user-1"
                    && record.full_name == "Ravi Sharma"
                    && record.role == Role::FieldPersonnel
                    && record.organization == "Central Water Commission"
                    && record.location == "Varanasi"
                    && record.site_id.as_deref() == Some("CWC-GAN-001")
                    && record.is_active == Some(true)
                    && record.created_at.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));
        let flow = AuthFlow::new(auth.clone(), Arc::new(store));

        let pending = flow.sign_up(&field_form()).await.unwrap();
        let session = flow.verify_otp(&pending, OTP_CODE).await.unwrap();

        assert_eq!(session.user_id(), "user-1");
    }

    #[tokio::test]
    async fn test_verification_keeps_existing_profile() {
        let auth = Arc::new(InMemoryAuth::new());
        let mut store = MockStore::new();
        store.expect_get_profile().times(1).returning(|id| {
            Ok(backend_client::test_utils::profile_for(id, Role::Public))
        });
        store.expect_insert_profile().never();
        let flow = AuthFlow::new(auth, Arc::new(store));

        let pending = flow.sign_up(&field_form()).await.unwrap();
        flow.verify_otp(&pending, OTP_CODE).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_failure_still_signs_in() {
        let auth = Arc::new(InMemoryAuth::new());
        let mut store = MockStore::new();
        store
            .expect_get_profile()
            .returning(|_| Err(StoreError::NotFound("no rows".to_string())));
        store.expect_insert_profile().times(1).returning(|_| {
            Err(StoreError::Backend {
                code: "42501".to_string(),
                message: "permission denied".to_string(),
            })
        });
        let flow = AuthFlow::new(auth, Arc::new(store));

        let pending = flow.sign_up(&field_form()).await.unwrap();
        assert!(flow.verify_otp(&pending, OTP_CODE).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_error_skips_insert() {
        let auth = Arc::new(InMemoryAuth::new());
        let mut store = MockStore::new();
        store
            .expect_get_profile()
            .returning(|_| Err(StoreError::Transport("timeout".to_string())));
        store.expect_insert_profile().never();
        let flow = AuthFlow::new(auth, Arc::new(store));

        let pending = flow.sign_up(&field_form()).await.unwrap();
        assert!(flow.verify_otp(&pending, OTP_CODE).await.is_ok());
    }

    struct RejectingOtp(InMemoryAuth);

    #[async_trait]
    impl AuthService for RejectingOtp {
        async fn get_current_session(
            &self,
        ) -> std::result::Result<Option<Session>, backend_client::TransportError> {
            self.0.get_current_session().await
        }

        fn subscribe(&self) -> backend_client::SessionSubscription {
            self.0.subscribe()
        }

        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> std::result::Result<Session, AuthError> {
            self.0.sign_in_with_password(email, password).await
        }

        async fn sign_up(
            &self,
            email: &str,
            password: &str,
            metadata: &backend_client::UserMetadata,
        ) -> std::result::Result<Option<Session>, AuthError> {
            self.0.sign_up(email, password, metadata).await
        }

        async fn sign_in_with_otp(&self, _email: &str) -> std::result::Result<(), AuthError> {
            Err(AuthError::with_status(429, "Email rate limit exceeded"))
        }

        async fn verify_otp(
            &self,
            email: &str,
            code: &str,
        ) -> std::result::Result<Session, AuthError> {
            self.0.verify_otp(email, code).await
        }

        async fn sign_out(&self) -> std::result::Result<(), AuthError> {
            self.0.sign_out().await
        }
    }

    #[tokio::test]
    async fn test_code_delivery_failure_is_otp_error() {
        let auth = Arc::new(RejectingOtp(InMemoryAuth::new()));
        let flow = AuthFlow::new(auth, Arc::new(InMemoryProfiles::new()));

        let err = flow.sign_up(&field_form()).await.unwrap_err();
        assert_eq!(err.title(), "OTP Error");
        assert_eq!(err.to_string(), "Email rate limit exceeded");
    }
}
