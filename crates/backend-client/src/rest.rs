//! HTTP implementation of the Auth Service and Profile Store
//!
//! Talks to a Supabase-style hosted backend: the GoTrue auth API under
//! `/auth/v1` and the PostgREST row API under `/rest/v1`. Every request
//! carries the public `apikey` header; authenticated requests use the current
//! session's access token as bearer, anonymous ones the anon key.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response as ReqwestResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthService, SessionEvents, SessionSubscription};
use crate::config::BackendConfig;
use crate::error::{ApiError, AuthError, StoreError, TransportError};
use crate::models::{AuthChangeEvent, NewProfile, Profile, Session, SessionChange, UserMetadata};
use crate::session_store::SessionStore;
use crate::store::ProfileStore;

/// Table holding one profile row per user
pub const PROFILES_TABLE: &str = "profiles";

/// Accept header asking PostgREST for exactly one object
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body shapes returned by GoTrue and PostgREST
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn into_api_error(self, status: u16, raw: &str) -> ApiError {
        let code = self
            .error_code
            .clone()
            .or_else(|| match &self.code {
                Some(serde_json::Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, raw));

        ApiError::new(status, code, message)
    }
}

/// Client for the hosted backend
///
/// # Examples
/// ```no_run
/// use backend_client::{AuthService, BackendConfig, HostedBackend};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let config = BackendConfig::from_env()?;
///     let backend = HostedBackend::new(config)?;
///
///     if let Some(session) = backend.get_current_session().await? {
///         println!("Signed in as {}", session.user_id());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct HostedBackend {
    client: ReqwestClient,
    config: BackendConfig,
    sessions: SessionStore,
    events: SessionEvents,
}

impl HostedBackend {
    /// Create a client from its configuration
    pub fn new(config: BackendConfig) -> Result<Self, TransportError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let sessions = match &config.session_path {
            Some(path) => SessionStore::with_path(path),
            None => SessionStore::in_memory(),
        };

        Ok(Self {
            client,
            config,
            sessions,
            events: SessionEvents::default(),
        })
    }

    /// Backend configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh_session(&self, session: &Session) -> Result<Session, TransportError> {
        let url = format!("{}/token?grant_type=refresh_token", self.config.auth_url());
        let req = self
            .request(Method::POST, &url, None)
            .json(&json!({ "refresh_token": session.refresh_token }));

        let refreshed: Session = self.send(req).await?;
        let refreshed = refreshed.with_expiry_from(Utc::now());
        self.commit_session(AuthChangeEvent::TokenRefreshed, Some(refreshed.clone()))
            .await?;
        Ok(refreshed)
    }

    fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header(
                "Authorization",
                format!("Bearer {}", bearer.unwrap_or(&self.config.anon_key)),
            );

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        req
    }

    async fn execute(&self, req: RequestBuilder) -> Result<ReqwestResponse, TransportError> {
        let response = req
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorBody>(&raw).unwrap_or_default();
        let error = body.into_api_error(status, &raw);
        tracing::debug!(status, code = error.code(), "Backend returned an error");
        Err(TransportError::Api(error))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, TransportError> {
        let response = self.execute(req).await?;
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to read response: {}", e)))?;
        serde_json::from_str(&body)
            .map_err(|e| TransportError::Decode(format!("Failed to parse response: {}", e)))
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), TransportError> {
        self.execute(req).await.map(|_| ())
    }

    async fn commit_session(
        &self,
        event: AuthChangeEvent,
        session: Option<Session>,
    ) -> Result<(), TransportError> {
        self.sessions.save(session.clone()).await?;
        self.events.emit(SessionChange::new(event, session));
        Ok(())
    }

    fn access_token(&self) -> Option<String> {
        self.sessions.current().map(|s| s.access_token)
    }

    /// Access token for row requests, refreshed first if it has expired
    ///
    /// A failed refresh falls back to the stored token; the request then
    /// fails with the backend's own error.
    async fn current_access_token(&self) -> Option<String> {
        match self.get_current_session().await {
            Ok(session) => session.map(|s| s.access_token),
            Err(error) => {
                tracing::warn!(%error, "Could not refresh session for row request");
                self.access_token()
            }
        }
    }

    async fn establish(&self, session: Session) -> Result<Session, AuthError> {
        let session = session.with_expiry_from(Utc::now());
        self.commit_session(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await?;
        tracing::info!(user_id = session.user_id(), "Signed in");
        Ok(session)
    }
}

#[async_trait]
impl AuthService for HostedBackend {
    async fn get_current_session(&self) -> Result<Option<Session>, TransportError> {
        let session = match self.sessions.load().await? {
            Some(session) => session,
            None => return Ok(None),
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        tracing::debug!(user_id = session.user_id(), "Stored session expired, refreshing");
        match self.refresh_session(&session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(TransportError::Api(error)) if !error.is_network_error() => {
                tracing::warn!(%error, "Refresh token rejected, discarding session");
                self.commit_session(AuthChangeEvent::SignedOut, None).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/token?grant_type=password", self.config.auth_url());
        let req = self
            .request(Method::POST, &url, None)
            .json(&json!({ "email": email, "password": password }));

        let session: Session = self.send(req).await?;
        self.establish(session).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<Option<Session>, AuthError> {
        let url = format!("{}/signup", self.config.auth_url());
        let req = self.request(Method::POST, &url, None).json(&json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));

        // Without auto-confirm the backend answers with the bare user.
        let body: serde_json::Value = self.send(req).await?;
        if body.get("access_token").is_none() {
            tracing::info!("Sign-up accepted, confirmation pending");
            return Ok(None);
        }

        let session: Session = serde_json::from_value(body)
            .map_err(|e| AuthError::new(format!("Failed to parse session: {}", e)))?;
        self.establish(session).await.map(Some)
    }

    async fn sign_in_with_otp(&self, email: &str) -> Result<(), AuthError> {
        let url = format!("{}/otp", self.config.auth_url());
        let req = self
            .request(Method::POST, &url, None)
            .json(&json!({ "email": email, "create_user": true }));

        self.send_empty(req).await?;
        tracing::info!("One-time code sent");
        Ok(())
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        let url = format!("{}/verify", self.config.auth_url());
        let req = self
            .request(Method::POST, &url, None)
            .json(&json!({ "type": "email", "email": email, "token": code }));

        let session: Session = self.send(req).await?;
        self.establish(session).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(token) = self.access_token() {
            let url = format!("{}/logout?scope=global", self.config.auth_url());
            let req = self.request(Method::POST, &url, Some(&token));

            match self.send_empty(req).await {
                Ok(()) => {}
                // The token is already dead server-side; still clear it locally.
                Err(TransportError::Api(error)) if matches!(error.status(), 401 | 403 | 404) => {
                    tracing::debug!(%error, "Session already invalid on sign-out");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.commit_session(AuthChangeEvent::SignedOut, None).await?;
        tracing::info!("Signed out");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for HostedBackend {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
        let url = format!("{}/{}", self.config.rest_url(), PROFILES_TABLE);
        let token = self.current_access_token().await;
        let filter = format!("eq.{}", user_id);
        let req = self
            .request(Method::GET, &url, token.as_deref())
            .query(&[("id", filter.as_str()), ("select", "*")])
            .header("Accept", SINGLE_OBJECT);

        Ok(self.send(req).await?)
    }

    async fn insert_profile(&self, record: &NewProfile) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.config.rest_url(), PROFILES_TABLE);
        let token = self.current_access_token().await;
        let req = self
            .request(Method::POST, &url, token.as_deref())
            .header("Prefer", "return=minimal")
            .json(record);

        self.send_empty(req).await?;
        tracing::info!(user_id = %record.id, role = %record.role, "Profile created");
        Ok(())
    }
}
