use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::{Reporter, ScanReport};
use crate::error::{AppError, ErrorSource, ScanError};

const DELIVERY_FAILED: u16 = 500;

/// Posts the report as JSON to the queue consumer behind `BACK_URL`.
#[derive(Debug, Clone)]
pub struct BackendReporter {
    client: Client,
    url: Url,
}

impl BackendReporter {
    pub fn new(url: Url) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .map_err(|e| delivery_error(&url, e))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn delivery_error(url: &Url, reason: impl std::fmt::Display) -> ScanError {
    AppError::new(
        DELIVERY_FAILED,
        format!("failed to deliver report to {}: {}", url, reason),
        ErrorSource::Reporter,
        true,
    )
    .into()
}

#[async_trait]
impl Reporter for BackendReporter {
    async fn report(&self, report: &ScanReport) -> Result<(), ScanError> {
        tracing::info!(url = %self.url, probes = report.probes.len(), "delivering report to backend");
        let resp = self
            .client
            .post(self.url.clone())
            .json(report)
            .send()
            .await
            .map_err(|e| delivery_error(&self.url, e))?;

        if !resp.status().is_success() {
            return Err(delivery_error(&self.url, format!("status {}", resp.status())));
        }
        Ok(())
    }
}
