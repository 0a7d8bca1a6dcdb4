//! Backend connection configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the backend base URL
pub const ENV_URL: &str = "HYDROSNAP_SUPABASE_URL";
/// Environment variable holding the public (anon) API key
pub const ENV_ANON_KEY: &str = "HYDROSNAP_SUPABASE_ANON_KEY";
/// Environment variable holding the session file path
pub const ENV_SESSION_PATH: &str = "HYDROSNAP_SESSION_PATH";
/// Environment variable selecting the app environment
pub const ENV_APP_ENV: &str = "HYDROSNAP_ENV";

/// Deployment environment of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    /// Local development
    #[default]
    Development,
    /// Automated tests
    Test,
    /// Released build
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnvironment::Development),
            "test" => Ok(AppEnvironment::Test),
            "production" | "prod" => Ok(AppEnvironment::Production),
            other => Err(ConfigError::Invalid {
                key: ENV_APP_ENV.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for [`crate::HostedBackend`]
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted backend (e.g. "https://xyz.supabase.co")
    pub url: String,
    /// Public API key sent with every request
    pub anon_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Where to persist the current session; memory only when `None`
    pub session_path: Option<PathBuf>,
    /// Deployment environment
    pub environment: AppEnvironment,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl BackendConfig {
    /// Create a config for a backend URL and anon key
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("HydroSnap/{}", env!("CARGO_PKG_VERSION")),
            session_path: None,
            environment: AppEnvironment::default(),
            default_headers: HashMap::new(),
        }
    }

    /// Load the config from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the config through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let url = get(ENV_URL);
        let anon_key = get(ENV_ANON_KEY);

        let missing: Vec<&str> = [(ENV_URL, &url), (ENV_ANON_KEY, &anon_key)]
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing.join(", ")));
        }

        let environment = match get(ENV_APP_ENV) {
            Some(value) => AppEnvironment::parse(&value)?,
            None => AppEnvironment::default(),
        };

        let mut config = Self::new(url.unwrap_or_default(), anon_key.unwrap_or_default());
        config.environment = environment;
        config.session_path = get(ENV_SESSION_PATH).map(PathBuf::from);
        Ok(config)
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Persist the session to `path`
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    /// Set the environment
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Base URL of the auth endpoints
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }

    /// Base URL of the row endpoints
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }
}
