use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "a2a-guestbook")]
#[command(about = "Agent-to-agent guestbook with bearer auth and per-key rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8000,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    // Max requests per key inside one window
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // How often the credential set is reloaded, in seconds
    #[arg(long, env = "CREDENTIAL_REFRESH_SECS", default_value_t = 300,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub credential_refresh: u64,

    // Log filter directive, e.g. "info" or "a2a_guestbook=debug"
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    // Emit JSON log lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    // Inline credential payload: '["key1","key2"]'
    #[arg(long, env = "API_KEYS", hide_env_values = true)]
    pub api_keys: Option<String>,

    // File holding the credential payload, re-read on every refresh
    #[arg(long, env = "API_KEYS_FILE")]
    pub api_keys_file: Option<PathBuf>,

    // Secret endpoint returning the credential payload
    #[arg(long, env = "API_KEYS_URL")]
    pub api_keys_url: Option<String>,

    // Bearer token presented to the secret endpoint
    #[arg(long, env = "API_KEYS_TOKEN", hide_env_values = true)]
    pub api_keys_token: Option<String>,
}

/// Where the credential set is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSourceConfig {
    Url { url: String, token: Option<String> },
    File(PathBuf),
    Inline(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no credential source configured: set API_KEYS, API_KEYS_FILE or API_KEYS_URL")]
    NoCredentialSource,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn credential_refresh(&self) -> Duration {
        Duration::from_secs(self.credential_refresh)
    }

    // URL wins over file, file wins over the inline payload
    pub fn credential_source(&self) -> Result<CredentialSourceConfig, ConfigError> {
        if let Some(url) = &self.api_keys_url {
            return Ok(CredentialSourceConfig::Url {
                url: url.clone(),
                token: self.api_keys_token.clone(),
            });
        }
        if let Some(path) = &self.api_keys_file {
            return Ok(CredentialSourceConfig::File(path.clone()));
        }
        match &self.api_keys {
            Some(payload) => Ok(CredentialSourceConfig::Inline(payload.clone())),
            None => Err(ConfigError::NoCredentialSource),
        }
    }
}
