// src/config.rs

use std::{env, path::PathBuf, time::Duration};

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

const DEFAULT_AUTH_SCHEME: &str = "JWT";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_FILE: &str = ".pixello/session.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST backend, always ending with a slash.
    pub api_url: Url,
    /// Prefix of the `Authorization` header value.
    pub auth_scheme: String,
    pub request_timeout: Duration,
    /// Where the persisted session (access/refresh tokens) lives.
    pub session_file: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let api_url = env::var("PIXELLO_API_URL")
            .map_err(|_| AppError::Config("PIXELLO_API_URL must be set".to_string()))?;
        let api_url = normalize_base_url(&api_url)?;

        let auth_scheme =
            env::var("PIXELLO_AUTH_SCHEME").unwrap_or_else(|_| DEFAULT_AUTH_SCHEME.to_string());

        let request_timeout = match env::var("PIXELLO_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                AppError::Config(format!("PIXELLO_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let session_file = env::var("PIXELLO_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            auth_scheme,
            request_timeout,
            session_file,
            rust_log,
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted.
    pub fn for_base_url(api_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            api_url: normalize_base_url(api_url)?,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            rust_log: "info".to_string(),
        })
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base_url(raw: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
