use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::borrow::Cow;
use url::Url;

/// A fully captured response. Tests read only from this.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub method: Method,
    pub request_url: Url,
    pub final_url: Url,
    pub status: u16,
    pub status_line: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Captured response with no headers and an empty body, for building fixtures.
    pub fn new(method: Method, url: Url, status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        Self {
            method,
            request_url: url.clone(),
            final_url: url,
            status,
            status_line: format!("HTTP/1.1 {} {}", status, reason).trim_end().to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header value; silently skips names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            self.headers.append(n, v);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_final_url(mut self, url: Url) -> Self {
        self.final_url = url;
        self
    }

    /// First value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a multi-valued header such as `Set-Cookie`.
    pub fn header_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.get_all(name).into_iter().filter_map(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive_and_multi_valued() {
        let url = Url::parse("https://example.com/").unwrap();
        let resp = HttpResponse::new(Method::GET, url, 200)
            .with_header("Set-Cookie", "a=1; Secure")
            .with_header("set-cookie", "b=2")
            .with_header("Server", "nginx");

        assert_eq!(resp.header("SERVER"), Some("nginx"));
        assert_eq!(resp.header_all("set-cookie").count(), 2);
        assert_eq!(resp.status_line, "HTTP/1.1 200 OK");
    }
}
