//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use duet_core::turn::ThreadTag;
use duet_narrator::GeminiConfig;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_NARRATOR_A_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_NARRATOR_B_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_NARRATOR_TIMEOUT_SECS: u64 = 120;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection URL.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Pool size.
    pub database_max_connections: u32,
    /// Credential for both narrators.
    pub gemini_api_key: String,
    /// Gemini API root.
    pub gemini_base_url: String,
    /// Model narrating thread A.
    pub narrator_a_model: String,
    /// Model narrating thread B.
    pub narrator_b_model: String,
    /// Deadline for the joined narrator call.
    pub narrator_timeout: Duration,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, AppError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let timeout_secs: u64 = parsed(&lookup, "NARRATOR_TIMEOUT_SECS", DEFAULT_NARRATOR_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "NARRATOR_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
            database_max_connections: parsed(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            gemini_api_key: required(&lookup, "GEMINI_API_KEY")?,
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| duet_narrator::gemini::DEFAULT_BASE_URL.to_owned()),
            narrator_a_model: lookup("NARRATOR_A_MODEL")
                .unwrap_or_else(|| DEFAULT_NARRATOR_A_MODEL.to_owned()),
            narrator_b_model: lookup("NARRATOR_B_MODEL")
                .unwrap_or_else(|| DEFAULT_NARRATOR_B_MODEL.to_owned()),
            narrator_timeout: Duration::from_secs(timeout_secs),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        })
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if host and port do not form an address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Gemini settings for the narrator of `thread`.
    #[must_use]
    pub fn narrator_config(&self, thread: ThreadTag) -> GeminiConfig {
        let model = match thread {
            ThreadTag::A => &self.narrator_a_model,
            ThreadTag::B => &self.narrator_b_model,
        };
        GeminiConfig {
            base_url: self.gemini_base_url.clone(),
            api_key: self.gemini_api_key.clone(),
            model: model.clone(),
        }
    }
}
