use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::io::Write;
use std::panic::AssertUnwindSafe;

use crate::error::{AppError, ExitStatus, ScanError};

/// How failures are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    /// Labelled block between two rule lines.
    Human,
    /// Two-space indented JSON object.
    Machine,
}

const RULE_WIDTH: usize = 60;

/// Failure boundary around a scan. Everything that escapes the job, panics
/// included, is normalised into an [`AppError`] and rendered once.
#[derive(Debug, Clone, Copy)]
pub struct GlobalHandler {
    encoding: OutputEncoding,
}

impl GlobalHandler {
    pub fn new(encoding: OutputEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> OutputEncoding {
        self.encoding
    }

    /// Runs `job`, reporting any failure on stderr. Returns the exit status.
    pub async fn execute<F>(&self, job: F) -> u8
    where
        F: Future<Output = Result<(), ScanError>>,
    {
        self.execute_to(job, &mut std::io::stderr()).await
    }

    pub async fn execute_to<F, W>(&self, job: F, out: &mut W) -> u8
    where
        F: Future<Output = Result<(), ScanError>>,
        W: Write,
    {
        let err = match AssertUnwindSafe(job).catch_unwind().await {
            Ok(Ok(())) => return ExitStatus::SUCCESS,
            Ok(Err(e)) => AppError::from(e),
            Err(payload) => AppError::runtime_fault(describe_panic(payload.as_ref())),
        };

        tracing::debug!(code = err.code, source = %err.origin, retryable = err.retryable, "scan failed");
        if let Err(e) = self.write(&err, out) {
            tracing::error!(error = %e, "failed to write error report");
        }
        ExitStatus::FAILURE
    }

    pub fn render(&self, err: &AppError) -> Result<String, serde_json::Error> {
        match self.encoding {
            OutputEncoding::Human => {
                let rule = "=".repeat(RULE_WIDTH);
                Ok(format!(
                    "{rule}\nERROR SOURCE: {}\nEXIT CODE: {}\nMESSAGE: {}\nRETRYABLE: {}\n{rule}\n",
                    err.origin, err.code, err.message, err.retryable
                ))
            }
            OutputEncoding::Machine => serde_json::to_string_pretty(err).map(|s| s + "\n"),
        }
    }

    fn write<W: Write>(&self, err: &AppError, out: &mut W) -> std::io::Result<()> {
        let rendered = self.render(err).map_err(std::io::Error::other)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
