use reqwest::header::{HeaderName, HeaderValue, REFERER, USER_AGENT};
use reqwest::Method;
use std::ffi::{OsStr, OsString};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::analyze::{TestDescriptor, TestRegistry};
use crate::cli::{CommandParser, Flag, ParameterSchema, ParsedInvocation, DEFAULT_USER_AGENT};
use crate::config::AppConfig;
use crate::error::{ParseError, RunnerError, ScanError};
use crate::handler::{GlobalHandler, OutputEncoding};
use crate::http_client::{ClientOptions, HttpClient, RequestOverrides};
use crate::output::{self, MethodProbe, ScanReport};

/// Turns a parsed invocation into probes and ordered verdicts.
pub struct JobRunner<'r> {
    registry: &'r TestRegistry,
    base_options: ClientOptions,
}

impl<'r> JobRunner<'r> {
    pub fn new(registry: &'r TestRegistry, base_options: ClientOptions) -> Self {
        Self { registry, base_options }
    }

    pub async fn run(&self, invocation: &ParsedInvocation) -> Result<ScanReport, ScanError> {
        let target = resolve_target(invocation)?;
        let user_agent = invocation
            .value(Flag::UserAgent)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(DEFAULT_USER_AGENT);
        let referer = invocation.value(Flag::Referer).filter(|r| !r.is_empty());
        let methods = resolve_methods(invocation)?;
        let tests = self.resolve_tests(invocation)?;

        if let Some(files) = invocation.values(Flag::Files) {
            tracing::warn!(count = files.len(), "--files accepted but not probed");
        }
        if tests.is_empty() {
            tracing::warn!("no tests selected; probing only");
        }

        let mut options = self.base_options.clone();
        options.headers.insert(USER_AGENT, header_value(USER_AGENT, user_agent)?);
        if let Some(referer) = referer {
            options.headers.insert(REFERER, header_value(REFERER, referer)?);
        }
        let client = HttpClient::new(options)?;

        tracing::info!(url = %target, methods = methods.len(), tests = tests.len(), "starting scan");

        let mut report = ScanReport::new(target.to_string());
        for method in methods {
            let response = client.request(method.clone(), &target, &RequestOverrides::default()).await?;

            let mut results = Vec::with_capacity(tests.len());
            for test in &tests {
                let result = test.run(&response);
                if let Some(reason) = result.defect() {
                    return Err(RunnerError::MalformedResult { id: test.id.to_string(), reason }.into());
                }
                tracing::debug!(test = test.id, verdict = %result.name, certainty = result.certainty, "test finished");
                results.push(result);
            }

            report.probes.push(MethodProbe {
                method: method.to_string(),
                status: response.status,
                status_line: response.status_line.clone(),
                final_url: response.final_url.to_string(),
                results,
            });
        }

        tracing::info!(probes = report.probes.len(), "scan complete");
        Ok(report)
    }

    /// Looks every id up before any request goes out.
    fn resolve_tests(&self, invocation: &ParsedInvocation) -> Result<Vec<&'r TestDescriptor>, RunnerError> {
        invocation
            .values(Flag::Tests)
            .unwrap_or_default()
            .iter()
            .map(|id| self.registry.get(id).ok_or_else(|| RunnerError::UnknownTest(id.clone())))
            .collect()
    }
}

fn resolve_target(invocation: &ParsedInvocation) -> Result<Url, RunnerError> {
    let raw = invocation
        .value(Flag::Target)
        .filter(|t| !t.trim().is_empty())
        .ok_or(RunnerError::MissingTarget)?;

    let url = Url::parse(raw).map_err(|e| RunnerError::InvalidTarget {
        target: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RunnerError::InvalidTarget {
            target: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn resolve_methods(invocation: &ParsedInvocation) -> Result<Vec<Method>, ScanError> {
    let Some(names) = invocation.values(Flag::HttpMethods) else {
        return Ok(vec![Method::GET]);
    };
    names
        .iter()
        .map(|name| {
            Method::from_bytes(name.as_bytes())
                .map_err(|e| ScanError::Internal(anyhow::anyhow!("invalid method '{}': {}", name, e)))
        })
        .collect()
}

fn header_value(name: HeaderName, value: &str) -> Result<HeaderValue, RunnerError> {
    HeaderValue::from_str(value).map_err(|_| RunnerError::InvalidHeader {
        name: if name == USER_AGENT { "User-Agent" } else { "Referer" },
        value: value.to_string(),
    })
}

pub const LOG_VAR: &str = "POSTURE_SCAN_LOG";
const DEFAULT_LOG_FILTER: &str = "posture_scan=warn,reqwest=info,hyper=info";

/// Machine consumers parse stderr, so logs stay off there unless asked for.
fn log_filter(encoding: OutputEncoding, configured: Option<&str>) -> EnvFilter {
    if let Some(directives) = configured {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    match encoding {
        OutputEncoding::Human => EnvFilter::new(DEFAULT_LOG_FILTER),
        OutputEncoding::Machine => EnvFilter::new("off"),
    }
}

pub fn log_subscriber<W>(encoding: OutputEncoding, configured: Option<&str>, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(encoding, configured))
        .with_ansi(encoding == OutputEncoding::Human)
        .with_target(false)
        .with_writer(writer)
        .finish()
}

/// Logging goes to stderr so stdout carries only the report.
pub fn init_logging(encoding: OutputEncoding) {
    let configured = std::env::var(LOG_VAR).ok();
    let subscriber = log_subscriber(encoding, configured.as_deref(), std::io::stderr);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn utf8_args<S: AsRef<OsStr>>(args: &[S]) -> Result<Vec<String>, ParseError> {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            arg.to_str()
                .map(str::to_owned)
                .ok_or_else(|| ParseError::NonUtf8Argument(arg.to_string_lossy().into_owned()))
        })
        .collect()
}

/// Parse, probe, test and report, for one invocation.
pub async fn scan<S: AsRef<OsStr>>(args: &[S], config: &AppConfig) -> Result<(), ScanError> {
    let schema = ParameterSchema::standard();
    let registry = TestRegistry::standard();

    let args = utf8_args(args)?;
    let invocation = CommandParser::new(&schema).parse(&args)?;
    let report = JobRunner::new(&registry, config.client_options()).run(&invocation).await?;

    output::reporter_for(config)?.report(&report).await
}

/// Process entry: environment, logging, then the scan inside the failure boundary.
pub async fn run_from_args(args: Vec<OsString>) -> u8 {
    let dotenv = dotenvy::dotenv();
    let config = AppConfig::from_env();
    init_logging(config.output_encoding());
    match &dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => println!("[i] No .env file found, using process environment"),
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    // Panics are reported by the handler; keep the default hook off stderr.
    std::panic::set_hook(Box::new(|info| tracing::error!(%info, "panic")));

    let handler = GlobalHandler::new(config.output_encoding());
    handler.execute(scan(&args, &config)).await
}
