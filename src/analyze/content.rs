use once_cell::sync::Lazy;
use regex::Regex;

use super::{TestDescriptor, TestResult, ThreatLevel};
use crate::http_client::HttpResponse;

// Apache/nginx autoindex, Python http.server, IIS, Jetty/Tomcat listings
static LISTING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<title>\s*index of\s*/",
        r"(?i)<h1>\s*index of\s*/",
        r"(?i)<title>\s*directory listing for\s*/",
        r"(?i)\[to parent directory\]",
        r"(?i)<title>\s*directory:\s*/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub const DIRECTORY_LISTING: TestDescriptor = TestDescriptor {
    id: "listing",
    name: "Directory listing",
    description: "Checks whether the response body is an auto-generated directory index.",
    check: check_directory_listing,
};

pub fn check_directory_listing(resp: &HttpResponse) -> TestResult {
    let body = resp.body_text();
    match LISTING_PATTERNS.iter().find(|re| re.is_match(&body)) {
        Some(re) => TestResult::new(
            "Directory listing enabled",
            90,
            ThreatLevel::High,
            format!("Body matches directory index signature /{}/", re.as_str()),
        ),
        None => TestResult::new(
            "Directory listing not detected",
            80,
            ThreatLevel::Informational,
            "No directory index signature in body",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::fixtures::response;

    #[test]
    fn test_apache_autoindex() {
        let r = response("http://example.com/files/")
            .with_body("<html><head><title>Index of /files</title></head><body><h1>Index of /files</h1></body></html>");
        let result = check_directory_listing(&r);
        assert_eq!(result.name, "Directory listing enabled");
        assert_eq!(result.threat_level, ThreatLevel::High);
    }

    #[test]
    fn test_python_http_server() {
        let r = response("http://example.com/")
            .with_body("<title>Directory listing for /</title>");
        assert_eq!(check_directory_listing(&r).name, "Directory listing enabled");
    }

    #[test]
    fn test_regular_page() {
        let r = response("http://example.com/").with_body("<title>Welcome</title><p>Index of products</p>");
        assert_eq!(check_directory_listing(&r).name, "Directory listing not detected");
    }
}
