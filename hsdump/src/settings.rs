use std::{env, path::PathBuf, time::Duration};

use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::api::helpscout::{DEFAULT_API_URL, DEFAULT_AUTH_URL, RetryPolicy};
use crate::auth::Credentials;
use crate::cli::Args;
use crate::error::{Error, Result};
use crate::store::DEFAULT_TOKEN_FILE;

/// Values read from `config.toml`. Anything given on the command line or in
/// the environment wins over these.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub api_url: Option<String>,
    pub auth_url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub max_rate_limit_retries: Option<u32>,
    pub default_retry_after_secs: Option<u64>,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

/// `$XDG_CONFIG_HOME`, or `$HOME/.config` when unset.
fn get_xdg_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

pub fn load_settings() -> Result<Settings> {
    let Some(xdg_config) = get_xdg_config_path() else {
        return Ok(Settings::default());
    };

    let config_path = xdg_config.join(CONFIG_FILE_NAME).join("config.toml");
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    debug!("reading settings from {}", config_path.display());

    Config::builder()
        .add_source(File::from(config_path.clone()).required(false))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| {
            Error::Config(format!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            ))
        })
}

/// Everything needed to open a Help Scout session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub api_url: String,
    pub auth_url: String,
    pub token_file: PathBuf,
    pub retry: RetryPolicy,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ClientConfig {
    pub fn resolve(args: &Args, settings: Settings) -> Result<Self> {
        let app_id = non_empty(args.app_id.clone()).or(non_empty(settings.app_id));
        let app_secret = non_empty(args.app_secret.clone()).or(non_empty(settings.app_secret));

        let (Some(app_id), Some(app_secret)) = (app_id, app_secret) else {
            return Err(Error::Config(
                "HELPSCOUT_APP_ID and HELPSCOUT_APP_SECRET are required, \
set them in the environment, a .env file or the config file"
                    .to_string(),
            ));
        };

        let mut retry = RetryPolicy::default();
        match args.max_retries.or(settings.max_rate_limit_retries) {
            Some(0) => retry.max_rate_limit_retries = None,
            Some(max) => retry.max_rate_limit_retries = Some(max),
            None => {}
        }
        if let Some(secs) = settings.default_retry_after_secs {
            retry.default_retry_after = Duration::from_secs(secs);
        }

        let config = Self {
            credentials: Credentials { app_id, app_secret },
            api_url: non_empty(args.api_url.clone())
                .or(non_empty(settings.api_url))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            auth_url: non_empty(args.auth_url.clone())
                .or(non_empty(settings.auth_url))
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_file: args
                .token_file
                .clone()
                .or(settings.token_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            retry,
        };

        debug!("resolved client config: {:?}", config);

        Ok(config)
    }
}
