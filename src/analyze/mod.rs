pub mod content;
pub mod cookies;
pub mod security_headers;
pub mod transport;

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::http_client::HttpResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Informational,
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ThreatLevel::Informational => "INFO",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            ThreatLevel::Informational => "[*]",
            ThreatLevel::Low => "[·]",
            ThreatLevel::Medium => "[!]",
            ThreatLevel::High => "[!!]",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const MAX_CERTAINTY: u8 = 100;

/// Verdict of one test against one captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub name: String,
    /// Confidence in `[0, 100]` that `name` holds for the target.
    pub certainty: u8,
    pub threat_level: ThreatLevel,
    pub description: String,
}

impl TestResult {
    pub fn new(name: impl Into<String>, certainty: u8, threat_level: ThreatLevel, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            certainty,
            threat_level,
            description: description.into(),
        }
    }

    /// Why this result cannot be reported, if it is malformed.
    pub fn defect(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("empty name".to_string());
        }
        if self.certainty > MAX_CERTAINTY {
            return Some(format!("certainty {} out of range", self.certainty));
        }
        None
    }
}

pub type CheckFn = fn(&HttpResponse) -> TestResult;

/// A named check. `check` must not perform I/O.
#[derive(Clone, Copy)]
pub struct TestDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: CheckFn,
}

impl TestDescriptor {
    pub fn run(&self, response: &HttpResponse) -> TestResult {
        (self.check)(response)
    }
}

impl fmt::Debug for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Lookup from the short id used on `--tests` to its descriptor.
#[derive(Debug, Clone, Default)]
pub struct TestRegistry {
    tests: HashMap<&'static str, TestDescriptor>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in check.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for descriptor in [
            transport::HTTPS,
            security_headers::HSTS,
            security_headers::CSP,
            security_headers::X_FRAME,
            security_headers::REFERRER_POLICY,
            security_headers::XSS_PROTECTION,
            security_headers::PERMISSIONS_POLICY,
            content::DIRECTORY_LISTING,
            transport::OPEN_REDIRECT,
            cookies::SECURE_FLAG,
            cookies::HTTP_ONLY_FLAG,
        ] {
            registry.register(descriptor);
        }
        registry
    }

    /// Adds a descriptor, replacing any previous one with the same id.
    pub fn register(&mut self, descriptor: TestDescriptor) {
        self.tests.insert(descriptor.id, descriptor);
    }

    pub fn get(&self, id: &str) -> Option<&TestDescriptor> {
        self.tests.get(id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.tests.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::http_client::HttpResponse;
    use reqwest::Method;
    use url::Url;

    pub fn response(url: &str) -> HttpResponse {
        HttpResponse::new(Method::GET, Url::parse(url).unwrap(), 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::schema::TEST_IDS;

    #[test]
    fn test_registry_matches_tests_whitelist() {
        let registry = TestRegistry::standard();
        let mut expected: Vec<&str> = TEST_IDS.to_vec();
        expected.sort_unstable();
        assert_eq!(registry.ids(), expected);
    }

    #[test]
    fn test_checks_are_pure() {
        let registry = TestRegistry::standard();
        let resp = fixtures::response("https://example.com/")
            .with_header("Set-Cookie", "sid=1; Secure")
            .with_header("Content-Security-Policy", "default-src 'self'")
            .with_body("<html><title>Home</title></html>");
        for id in registry.ids() {
            let test = registry.get(id).unwrap();
            assert_eq!(test.run(&resp), test.run(&resp), "{} is not deterministic", id);
        }
    }

    #[test]
    fn test_every_result_is_well_formed() {
        let registry = TestRegistry::standard();
        let bare = fixtures::response("http://example.com/");
        for id in registry.ids() {
            let result = registry.get(id).unwrap().run(&bare);
            assert_eq!(result.defect(), None, "{} produced a malformed result", id);
        }
    }

    #[test]
    fn test_defect_detection() {
        let r = TestResult::new("", 50, ThreatLevel::Low, "x");
        assert!(r.defect().is_some());
        let r = TestResult::new("ok", 101, ThreatLevel::Low, "x");
        assert!(r.defect().is_some());
    }

    #[test]
    fn test_https_and_hsts_pass_on_hardened_response() {
        let registry = TestRegistry::standard();
        let resp = fixtures::response("https://example.com/")
            .with_header("Strict-Transport-Security", "max-age=31536000");
        let https = registry.get("https").unwrap().run(&resp);
        let hsts = registry.get("hsts").unwrap().run(&resp);
        assert_eq!(https.name, "HTTPS enforced");
        assert_eq!(hsts.name, "HSTS enabled");
        assert_eq!(https.threat_level, ThreatLevel::Informational);
        assert_eq!(hsts.threat_level, ThreatLevel::Informational);
    }
}
