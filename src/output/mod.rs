pub mod backend;
pub mod terminal;

pub use backend::BackendReporter;
pub use terminal::TerminalReporter;

use async_trait::async_trait;
use serde::Serialize;

use crate::analyze::TestResult;
use crate::config::AppConfig;
use crate::error::{AppError, ErrorSource, ScanError};

/// Verdicts for one method probe, in `--tests` order.
#[derive(Debug, Clone, Serialize)]
pub struct MethodProbe {
    pub method: String,
    pub status: u16,
    pub status_line: String,
    pub final_url: String,
    pub results: Vec<TestResult>,
}

/// Everything one invocation produced, probes in `--httpMethods` order.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub probes: Vec<MethodProbe>,
}

impl ScanReport {
    pub fn new(target: String) -> Self {
        Self { target, probes: Vec::new() }
    }

    pub fn results(&self) -> impl Iterator<Item = &TestResult> {
        self.probes.iter().flat_map(|p| p.results.iter())
    }
}

#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, report: &ScanReport) -> Result<(), ScanError>;
}

/// Backend sink when `BACK_URL` is configured, stdout otherwise.
pub fn reporter_for(config: &AppConfig) -> Result<Box<dyn Reporter>, ScanError> {
    match config.back_url.as_deref() {
        Some(url) => {
            let url = url::Url::parse(url).map_err(|e| {
                AppError::new(501, format!("invalid BACK_URL '{}': {}", url, e), ErrorSource::Reporter, false)
            })?;
            Ok(Box::new(BackendReporter::new(url)?))
        }
        None => Ok(Box::new(TerminalReporter::new())),
    }
}
