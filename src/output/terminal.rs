use async_trait::async_trait;
use std::io::Write;

use super::{Reporter, ScanReport};
use crate::error::ScanError;

#[derive(Debug, Default)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }

    /// Plain-text rendering of the report, one block per probed method.
    pub fn render(report: &ScanReport) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!("  Target: {}\n", report.target));
        out.push_str(&"=".repeat(60));
        out.push('\n');

        for probe in &report.probes {
            out.push_str(&format!("\n[>] {} {} ({})\n", probe.method, probe.final_url, probe.status_line));
            for result in &probe.results {
                out.push_str(&format!(
                    "   {} {:<6} {} [{}%]\n",
                    result.threat_level.marker(),
                    result.threat_level.label(),
                    result.name,
                    result.certainty
                ));
                out.push_str(&format!("          {}\n", result.description));
            }
        }
        out
    }
}

#[async_trait]
impl Reporter for TerminalReporter {
    async fn report(&self, report: &ScanReport) -> Result<(), ScanError> {
        let rendered = Self::render(report);
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| ScanError::Internal(anyhow::Error::new(e).context("writing report to stdout")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{TestResult, ThreatLevel};
    use crate::output::MethodProbe;

    #[test]
    fn test_render_keeps_result_order() {
        let report = ScanReport {
            target: "https://example.com/".into(),
            probes: vec![MethodProbe {
                method: "GET".into(),
                status: 200,
                status_line: "HTTP/1.1 200 OK".into(),
                final_url: "https://example.com/".into(),
                results: vec![
                    TestResult::new("HTTPS enforced", 100, ThreatLevel::Informational, "tls"),
                    TestResult::new("HSTS missing", 100, ThreatLevel::Medium, "no header"),
                ],
            }],
        };

        let text = TerminalReporter::render(&report);
        let https = text.find("HTTPS enforced").unwrap();
        let hsts = text.find("HSTS missing").unwrap();
        assert!(https < hsts);
        assert!(text.contains("[>] GET https://example.com/"));
        assert!(text.contains("MEDIUM"));
    }
}
