use crate::error::{ApiError, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Args)]
pub struct Config {
    #[command(flatten)]
    pub api: ApiConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub mail: MailConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ApiConfig {
    /// Base URL of the clinic backend; required by every command that calls it
    #[arg(long, env = "CLINIC_API_BASE_URL", default_value = "", hide_default_value = true)]
    pub base_url: String,

    /// Static key sent on login and token refresh
    #[arg(long, env = "CLINIC_API_KEY", default_value = "", hide_default_value = true, hide_env_values = true)]
    pub api_key: String,

    /// Path prefix every endpoint is mounted under
    #[arg(long, env = "CLINIC_API_PREFIX", default_value = "/api_nestjs")]
    pub api_prefix: String,

    /// Platform identifier recorded on bookings
    #[arg(long, env = "CLINIC_PLATFORM_ID", default_value_t = 6)]
    pub platform_id: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "CLINIC_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// # Errors
    /// Returns `Config` naming the first backend setting that is missing.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::Config("CLINIC_API_BASE_URL (--base-url) is not set".into()));
        }
        if self.api_key.is_empty() {
            return Err(ApiError::Config("CLINIC_API_KEY (--api-key) is not set".into()));
        }
        Ok(())
    }

    /// Full URL for an endpoint such as `/patients/123`.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url.trim_end_matches('/'), self.api_prefix, endpoint)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, Args)]
pub struct SessionConfig {
    /// Directory holding the persisted session
    #[arg(long, env = "CLINIC_SESSION_DIR", default_value = ".clinic-agenda")]
    pub session_dir: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct MailConfig {
    /// E-mail verification service URL
    #[arg(long, env = "CLINIC_MAIL_URL")]
    pub mail_url: Option<String>,

    /// Authorization value for the e-mail verification service
    #[arg(long, env = "CLINIC_MAIL_TOKEN", hide_env_values = true)]
    pub mail_token: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "CLINIC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported only when set
    #[arg(long, env = "CLINIC_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}
