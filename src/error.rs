use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Process exit statuses.
pub struct ExitStatus;

impl ExitStatus {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
}

/// Code reserved for faults nobody classified.
pub const RUNTIME_FAULT_CODE: u16 = 999;

/// Component an [`AppError`] originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Parser,
    HttpClient,
    Runner,
    Reporter,
    Runtime,
}

impl ErrorSource {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorSource::Parser => "Parser",
            ErrorSource::HttpClient => "Http Client",
            ErrorSource::Runner => "Runner",
            ErrorSource::Reporter => "Reporter",
            ErrorSource::Runtime => "Runtime/Critical",
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ErrorSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// The unified application error every failure is normalised into.
///
/// Serializes to the wire shape consumed by upstream orchestrators:
/// `{"Code", "Message", "Source", "IsRetryable"}`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("[{origin}] {code}: {message}")]
pub struct AppError {
    #[serde(rename = "Code")]
    pub code: u16,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Source")]
    pub origin: ErrorSource,
    #[serde(rename = "IsRetryable")]
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: u16, message: impl Into<String>, origin: ErrorSource, retryable: bool) -> Self {
        Self { code, message: message.into(), origin, retryable }
    }

    /// Unexpected runtime fault, always code 999 and never retryable.
    pub fn runtime_fault(description: impl fmt::Display) -> Self {
        Self::new(RUNTIME_FAULT_CODE, format!("Panic: {}", description), ErrorSource::Runtime, false)
    }
}

/// Failure classes produced by the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// DNS, connect, TLS handshake, timeout or request construction.
    Transport,
    /// Response status outside 200..=299.
    Status(u16),
    /// Headers arrived but the body could not be read.
    BodyRead,
    /// Headers or body carry a bot-protection signature.
    BotProtection,
}

impl HttpErrorKind {
    pub fn code(&self) -> u16 {
        match self {
            HttpErrorKind::Transport => 100,
            HttpErrorKind::Status(_) => 101,
            HttpErrorKind::BodyRead => 200,
            HttpErrorKind::BotProtection => 300,
        }
    }
}

/// Statuses worth retrying when a request comes back non-2xx.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Debug, Error)]
#[error("{message} ({url})")]
pub struct HttpError {
    pub url: String,
    pub kind: HttpErrorKind,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub retryable: bool,
}

impl HttpError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>, cause: reqwest::Error) -> Self {
        Self {
            url: url.into(),
            kind: HttpErrorKind::Transport,
            message: message.into(),
            cause: Some(Box::new(cause)),
            retryable: true,
        }
    }

    pub fn body_read(url: impl Into<String>, cause: reqwest::Error) -> Self {
        Self {
            url: url.into(),
            kind: HttpErrorKind::BodyRead,
            message: format!("failed to read response body: {}", cause),
            cause: Some(Box::new(cause)),
            retryable: true,
        }
    }

    pub fn bot_protection(url: impl Into<String>, trigger: &str) -> Self {
        Self {
            url: url.into(),
            kind: HttpErrorKind::BotProtection,
            message: format!("bot protection detected: {}", trigger),
            cause: None,
            retryable: false,
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            kind: HttpErrorKind::Status(status),
            message: format!("unexpected status code {}", status),
            cause: None,
            retryable: RETRYABLE_STATUSES.contains(&status),
        }
    }

    pub fn code(&self) -> u16 {
        self.kind.code()
    }
}

impl From<HttpError> for AppError {
    fn from(err: HttpError) -> Self {
        AppError::new(err.code(), err.message, ErrorSource::HttpClient, err.retryable)
    }
}

/// Argument grammar violations. Codes are stable for machine consumers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected at least 2 arguments, got {0}")]
    TooFewTokens(usize),

    #[error("expected command 'test', got '{0}'")]
    MissingVerb(String),

    #[error("flag {0} requires at least one argument")]
    MissingArguments(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("argument is not valid UTF-8: '{0}'")]
    NonUtf8Argument(String),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("duplicate argument '{value}' for {flag}")]
    DuplicateArgument { flag: String, value: String },

    #[error("flag {flag} takes {expected} argument(s), got {got}")]
    TooManyArguments { flag: String, expected: usize, got: usize },
}

impl ParseError {
    pub fn code(&self) -> u16 {
        match self {
            ParseError::TooFewTokens(_) => 100,
            ParseError::MissingVerb(_) => 201,
            ParseError::MissingArguments(_) => 303,
            ParseError::UnexpectedArgument(_) | ParseError::NonUtf8Argument(_) | ParseError::InvalidValue { .. } => 304,
            ParseError::DuplicateArgument { .. } => 305,
            ParseError::TooManyArguments { .. } => 306,
        }
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::new(err.code(), err.to_string(), ErrorSource::Parser, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("missing required parameter --target")]
    MissingTarget,

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("test '{0}' is not registered")]
    UnknownTest(String),

    #[error("invalid value for {name} header: '{value}'")]
    InvalidHeader { name: &'static str, value: String },

    #[error("test '{id}' returned a malformed result: {reason}")]
    MalformedResult { id: String, reason: String },
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::MissingTarget => AppError::new(400, err.to_string(), ErrorSource::Runner, false),
            RunnerError::InvalidTarget { .. } => AppError::new(401, err.to_string(), ErrorSource::Runner, false),
            RunnerError::UnknownTest(_) => AppError::new(402, err.to_string(), ErrorSource::Runner, false),
            RunnerError::InvalidHeader { .. } => AppError::new(403, err.to_string(), ErrorSource::Runner, false),
            RunnerError::MalformedResult { .. } => {
                AppError::new(RUNTIME_FAULT_CODE, err.to_string(), ErrorSource::Runtime, false)
            }
        }
    }
}

/// Top-level failure, one variant per classification the handler reports.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    App(AppError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<AppError> for ScanError {
    fn from(err: AppError) -> Self {
        ScanError::App(err)
    }
}

impl From<ParseError> for ScanError {
    fn from(err: ParseError) -> Self {
        ScanError::App(err.into())
    }
}

impl From<RunnerError> for ScanError {
    fn from(err: RunnerError) -> Self {
        ScanError::App(err.into())
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::App(app) => app,
            ScanError::Http(http) => http.into(),
            ScanError::Internal(fault) => AppError::runtime_fault(format!("{:#}", fault)),
        }
    }
}
