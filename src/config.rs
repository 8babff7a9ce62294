//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of pooled (CPU/GPU-bound) jobs executing concurrently.
    pub pool_size: usize,
    /// Bounded re-check delay for the scheduler's waits. Wake-ups are
    /// signalled, but every wait re-checks after this delay at the latest.
    pub recheck_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            recheck_delay: Duration::from_millis(100),
        }
    }
}

impl EngineConfig {
    /// Build from environment, falling back to defaults.
    ///
    /// - `WINDOWSCAPE_POOL_SIZE` overrides the worker pool bound.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(n) = std::env::var("WINDOWSCAPE_POOL_SIZE")
            && let Ok(n) = n.parse::<usize>()
            && n > 0
        {
            config.pool_size = n;
        }
        config
    }
}

/// Default pool bound: a small multiple of the available compute units.
fn default_pool_size() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    cores * 2
}

/// Configuration for the outbound network collaborators.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Endpoint that issues presigned upload URLs.
    pub upload_url_endpoint: String,
    /// Endpoint notified after a result has been uploaded.
    pub callback_endpoint: String,
    /// Token sent as `X-AI-Token` on media-exchange calls.
    pub ai_token: SecretString,
    /// Base URL of the model gateway proxy.
    pub gateway_base: String,
    /// Model gateway API key.
    pub gateway_key: SecretString,
    /// Video search endpoint.
    pub search_endpoint: String,
    /// Video search API key.
    pub search_key: SecretString,
    /// Timeout for ordinary collaborator calls.
    pub call_timeout: Duration,
    /// Timeout for storage uploads (larger bodies).
    pub upload_timeout: Duration,
}

impl RemoteConfig {
    /// Build from environment. Endpoints and tokens are required; timeouts
    /// have fixed defaults matching the collaborators' observed behavior.
    pub fn from_env() -> Result<Self, crate::error::ConfigError> {
        Ok(Self {
            upload_url_endpoint: require_env("AI_UPLOAD_URL")?,
            callback_endpoint: require_env("AI_CALLBACK_URL")?,
            ai_token: SecretString::from(require_env("AI_TOKEN")?),
            gateway_base: require_env("MODEL_GATEWAY_URL")?,
            gateway_key: SecretString::from(require_env("MODEL_GATEWAY_KEY")?),
            search_endpoint: std::env::var("VIDEO_SEARCH_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3/search".to_string()),
            search_key: SecretString::from(require_env("VIDEO_SEARCH_KEY")?),
            call_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
        })
    }
}

fn require_env(key: &str) -> Result<String, crate::error::ConfigError> {
    std::env::var(key).map_err(|_| crate::error::ConfigError::MissingEnvVar(key.to_string()))
}
