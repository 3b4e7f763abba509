use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use astrosetu_core::policy;
use astrosetu_worker::worker::WorkerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set for the s3 store")]
    Missing(&'static str),
}

/// Where report records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    S3,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreBackend::Memory),
            "s3" => Ok(StoreBackend::S3),
            other => Err(format!("expected memory or s3, got {other}")),
        }
    }
}

/// Who runs the worker for a freshly started report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// The start request generates before responding.
    Inline,
    /// The start request spawns generation on the runtime and returns.
    Background,
    /// Each status poll of an unsettled report runs the worker.
    OnPoll,
    /// Nothing in this service generates; something calls `/report-worker`.
    External,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Inline => "inline",
            DispatchMode::Background => "background",
            DispatchMode::OnPoll => "on_poll",
            DispatchMode::External => "external",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(DispatchMode::Inline),
            "background" => Ok(DispatchMode::Background),
            "on_poll" => Ok(DispatchMode::OnPoll),
            "external" => Ok(DispatchMode::External),
            other => Err(format!(
                "expected inline, background, on_poll or external, got {other}"
            )),
        }
    }
}

/// Service configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub store: StoreBackend,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub dispatch: DispatchMode,
    pub lease_ttl: Duration,
    pub heartbeat_interval: Duration,
    pub model_id: String,
    pub bind_addr: String,
    /// Set when running inside the Lambda runtime (`AWS_LAMBDA_RUNTIME_API`).
    pub on_lambda: bool,
}

pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-sonnet-4-20250514-v1:0";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unset and empty variables
    /// take their defaults.
    ///
    /// Under Lambda the process is frozen between invocations and every
    /// instance has its own memory, so the defaults there are the S3 store
    /// and `on_poll` dispatch, and the memory store and background dispatch
    /// are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let on_lambda = get("AWS_LAMBDA_RUNTIME_API").is_some();

        let (default_store, default_dispatch) = if on_lambda {
            (StoreBackend::S3, DispatchMode::OnPoll)
        } else {
            (StoreBackend::Memory, DispatchMode::Background)
        };

        let store = parse_or(&get, "ASTROSETU_STORE", default_store)?;
        if on_lambda && store == StoreBackend::Memory {
            return Err(lambda_unsupported("ASTROSETU_STORE", "memory"));
        }
        let bucket = get("ASTROSETU_BUCKET");
        if store == StoreBackend::S3 && bucket.is_none() {
            return Err(ConfigError::Missing("ASTROSETU_BUCKET"));
        }

        let dispatch = parse_or(&get, "ASTROSETU_WORKER_DISPATCH", default_dispatch)?;
        if on_lambda && dispatch == DispatchMode::Background {
            return Err(lambda_unsupported("ASTROSETU_WORKER_DISPATCH", "background"));
        }

        let lease_ttl = secs_or(&get, "ASTROSETU_LEASE_TTL_SECS", policy::LEASE_TTL)?;
        let heartbeat_interval =
            secs_or(&get, "ASTROSETU_HEARTBEAT_SECS", policy::HEARTBEAT_INTERVAL)?;
        if heartbeat_interval >= lease_ttl {
            return Err(ConfigError::Invalid {
                var: "ASTROSETU_HEARTBEAT_SECS",
                value: heartbeat_interval.as_secs().to_string(),
                reason: format!(
                    "must be shorter than the lease TTL of {}s",
                    lease_ttl.as_secs()
                ),
            });
        }

        Ok(Self {
            store,
            bucket,
            region: get("AWS_REGION"),
            dispatch,
            lease_ttl,
            heartbeat_interval,
            model_id: get("BEDROCK_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            bind_addr: get("ASTROSETU_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            on_lambda,
        })
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            lease_ttl: self.lease_ttl,
            heartbeat_interval: self.heartbeat_interval,
            ..WorkerConfig::default()
        }
    }
}

fn lambda_unsupported(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: "not supported under Lambda".to_string(),
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr<Err = String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|reason| ConfigError::Invalid { var, value, reason }),
    }
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(0) => Err(ConfigError::Invalid {
                var,
                value,
                reason: "must be at least 1".to_string(),
            }),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            }),
        },
    }
}
