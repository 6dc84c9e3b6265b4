use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::handler::OutputEncoding;
use crate::http_client::{ClientOptions, RedirectPolicy, DEFAULT_TIMEOUT_SECS};

pub const BACK_URL: &str = "BACK_URL";
pub const TIMEOUT_VAR: &str = "SCAN_TIMEOUT_SECS";
pub const VERIFY_TLS_VAR: &str = "SCAN_VERIFY_TLS";

/// Process configuration, read from the environment after `.env` is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub back_url: Option<String>,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { back_url: None, timeout_secs: DEFAULT_TIMEOUT_SECS, verify_tls: true }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        config.back_url = lookup(BACK_URL).filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", TIMEOUT_VAR),
            }
        }

        if let Some(raw) = lookup(VERIFY_TLS_VAR) {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => config.verify_tls = true,
                "0" | "false" | "no" => config.verify_tls = false,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", VERIFY_TLS_VAR),
            }
        }

        config
    }

    pub fn output_encoding(&self) -> OutputEncoding {
        if self.back_url.is_some() {
            OutputEncoding::Machine
        } else {
            OutputEncoding::Human
        }
    }

    /// Base client options; the runner adds per-invocation headers.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(self.timeout_secs),
            redirect_policy: RedirectPolicy::Follow,
            verify_tls: self.verify_tls,
        }
    }
}
