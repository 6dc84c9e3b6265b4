pub mod bot;
pub mod response;

pub use response::HttpResponse;

use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method};
use std::time::Duration;
use url::Url;

use crate::error::HttpError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    #[default]
    Follow,
    DoNotFollow,
}

/// Options applied to every request the client issues.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub redirect_policy: RedirectPolicy,
    pub verify_tls: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            redirect_policy: RedirectPolicy::Follow,
            verify_tls: true,
        }
    }
}

/// Per-call overrides. Headers here replace same-named defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub redirect_policy: Option<RedirectPolicy>,
    pub verify_tls: Option<bool>,
}

/// Scanner HTTP client: one request in, one classified result out.
#[derive(Debug, Clone)]
pub struct HttpClient {
    options: ClientOptions,
    inner: Client,
}

impl HttpClient {
    pub fn new(options: ClientOptions) -> Result<Self, HttpError> {
        let inner = build_transport(options.timeout, options.redirect_policy, options.verify_tls)
            .map_err(|e| HttpError::transport("", "failed to build HTTP client", e))?;
        Ok(Self { options, inner })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub async fn get(&self, url: &Url) -> Result<HttpResponse, HttpError> {
        self.request(Method::GET, url, &RequestOverrides::default()).await
    }

    /// Issue a single request and classify the outcome.
    ///
    /// Failures are checked in a fixed order: transport, body read, bot
    /// protection, then non-2xx status.
    pub async fn request(&self, method: Method, url: &Url, overrides: &RequestOverrides) -> Result<HttpResponse, HttpError> {
        let transport = self
            .transport_for(overrides)
            .map_err(|e| HttpError::transport(url.as_str(), "failed to build HTTP client", e))?;

        let mut headers = self.options.headers.clone();
        headers.extend(overrides.headers.clone());
        let timeout = overrides.timeout.unwrap_or(self.options.timeout);

        tracing::debug!(method = %method, url = %url, "sending request");
        let resp = transport
            .request(method.clone(), url.clone())
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let message = format!("{}: {}", transport_failure(&e), e);
                HttpError::transport(url.as_str(), message, e)
            })?;

        let status = resp.status();
        let status_line = format!("{:?} {}", resp.version(), status);
        let final_url = resp.url().clone();
        let response_headers = resp.headers().clone();

        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError::body_read(url.as_str(), e))?
            .to_vec();

        if let Some(signal) = bot::detect(&response_headers, &body) {
            tracing::warn!(url = %url, signal = %signal.describe(), "bot protection detected");
            return Err(HttpError::bot_protection(url.as_str(), &signal.describe()));
        }

        if !status.is_success() {
            return Err(HttpError::status(url.as_str(), status.as_u16()));
        }

        tracing::debug!(status = status.as_u16(), final_url = %final_url, bytes = body.len(), "response captured");
        Ok(HttpResponse {
            method,
            request_url: url.clone(),
            final_url,
            status: status.as_u16(),
            status_line,
            headers: response_headers,
            body,
        })
    }

    fn transport_for(&self, overrides: &RequestOverrides) -> Result<Client, reqwest::Error> {
        let redirect = overrides.redirect_policy.unwrap_or(self.options.redirect_policy);
        let verify_tls = overrides.verify_tls.unwrap_or(self.options.verify_tls);
        if redirect == self.options.redirect_policy && verify_tls == self.options.verify_tls {
            return Ok(self.inner.clone());
        }
        build_transport(self.options.timeout, redirect, verify_tls)
    }
}

fn build_transport(timeout: Duration, redirect: RedirectPolicy, verify_tls: bool) -> Result<Client, reqwest::Error> {
    let redirect = match redirect {
        RedirectPolicy::Follow => reqwest::redirect::Policy::limited(MAX_REDIRECTS),
        RedirectPolicy::DoNotFollow => reqwest::redirect::Policy::none(),
    };

    ClientBuilder::new()
        // One target per run, so a small pool is plenty
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))

        // Compression
        .gzip(true)
        .brotli(true)

        // TLS
        .use_rustls_tls()
        .tls_sni(true)
        .https_only(false)
        .danger_accept_invalid_certs(!verify_tls)

        .redirect(redirect)
        .build()
}

fn transport_failure(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_builder() {
        "invalid request"
    } else if e.is_redirect() {
        "redirect limit exceeded"
    } else {
        "request failed"
    }
}
