use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default page size (and `max_initial_results` hint) per request.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client-side timeout hint forcing the service into async mode.
pub const DEFAULT_CLIENT_TIMEOUT_MS: u64 = 1;

/// Server-side execution cap: 30 minutes.
pub const DEFAULT_SERVER_TIMEOUT_MS: u64 = 1_800_000;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

// ── Env helpers ──────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_required(profile: &str, key: &str) -> Result<String, ConfigError> {
    profiled_env_opt(profile, key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn profiled_env_parsed<T: std::str::FromStr>(
    profile: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        None => Ok(None),
    }
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

fn active_profile() -> String {
    env_opt("LAMBDA_PROFILE")
        .map(|s| s.to_uppercase())
        .unwrap_or_default()
}

// ── Errors ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

// ── ServiceConfig ────────────────────────────────────────────────

/// Where the query service lives and how to authenticate against it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base address, e.g. `https://api.usw2a1.rockset.com`.
    pub api_server: String,
    pub api_key: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Retries for transient transport failures (0 = fail fast).
    pub max_retries: u32,
    /// First retry delay; doubled on every further attempt.
    pub retry_backoff: Duration,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_server", &self.api_server)
            .field("api_key", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(api_server: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: 0,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Build config from environment variables.
    ///
    /// Reads `LAMBDA_PROFILE` to determine the profile prefix, so with
    /// `LAMBDA_PROFILE=PROD` the key `PROD_ROCKSET_APIKEY` wins over `ROCKSET_APIKEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_profiled(&active_profile())
    }

    pub fn from_env_profiled(profile: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::new(
            profiled_env_required(profile, "ROCKSET_APISERVER")?,
            profiled_env_required(profile, "ROCKSET_APIKEY")?,
        );
        if let Some(secs) = profiled_env_parsed::<u64>(profile, "LAMBDA_HTTP_TIMEOUT_SECS")? {
            cfg.http_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = profiled_env_parsed(profile, "LAMBDA_MAX_RETRIES")? {
            cfg.max_retries = retries;
        }
        if let Some(ms) = profiled_env_parsed::<u64>(profile, "LAMBDA_RETRY_BACKOFF_MS")? {
            cfg.retry_backoff = Duration::from_millis(ms);
        }
        Ok(cfg)
    }
}

// ── SessionOptions ───────────────────────────────────────────────

/// What to do when the service reports query errors while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryErrorPolicy {
    /// Log the errors and keep polling until the status changes.
    #[default]
    PollThrough,
    /// Fail the session on the first reported error.
    TerminateOnError,
}

/// Tuning knobs for a single query session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub client_timeout_ms: u64,
    pub server_timeout_ms: u64,
    pub error_policy: QueryErrorPolicy,
    /// Client-side cap on time spent waiting for COMPLETED. None = unbounded.
    pub deadline: Option<Duration>,
    /// Walk the cursor chain after completion.
    pub paginate: bool,
    /// Stop the walk after this many pages. None = unbounded.
    pub max_pages: Option<usize>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            client_timeout_ms: DEFAULT_CLIENT_TIMEOUT_MS,
            server_timeout_ms: DEFAULT_SERVER_TIMEOUT_MS,
            error_policy: QueryErrorPolicy::default(),
            deadline: None,
            paginate: true,
            max_pages: None,
        }
    }
}

impl SessionOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_profiled(&active_profile())
    }

    pub fn from_env_profiled(profile: &str) -> Result<Self, ConfigError> {
        let mut opts = Self::default();
        if let Some(ms) = profiled_env_parsed::<u64>(profile, "LAMBDA_POLL_INTERVAL_MS")? {
            opts.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = profiled_env_parsed(profile, "LAMBDA_CLIENT_TIMEOUT_MS")? {
            opts.client_timeout_ms = ms;
        }
        if let Some(ms) = profiled_env_parsed(profile, "LAMBDA_SERVER_TIMEOUT_MS")? {
            opts.server_timeout_ms = ms;
        }
        if profiled_env_bool(profile, "LAMBDA_TERMINATE_ON_QUERY_ERROR", false) {
            opts.error_policy = QueryErrorPolicy::TerminateOnError;
        }
        opts.deadline = profiled_env_parsed::<u64>(profile, "LAMBDA_DEADLINE_SECS")?
            .map(Duration::from_secs);
        opts.paginate = profiled_env_bool(profile, "LAMBDA_PAGINATE", true);
        opts.max_pages = profiled_env_parsed(profile, "LAMBDA_MAX_PAGES")?;
        Ok(opts)
    }
}

/// Page size from `LAMBDA_PAGE_SIZE`, falling back to [`DEFAULT_PAGE_SIZE`].
pub fn page_size_from_env() -> Result<u32, ConfigError> {
    Ok(profiled_env_parsed(&active_profile(), "LAMBDA_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE))
}

// ── Tests ────────────────────────────────────────────────────────
