use super::{TestDescriptor, TestResult, ThreatLevel};
use crate::http_client::HttpResponse;

pub const SECURE_FLAG: TestDescriptor = TestDescriptor {
    id: "fCookies",
    name: "Cookie Secure flag",
    description: "Checks that every cookie set by the response carries the Secure attribute.",
    check: check_secure_flag,
};

pub const HTTP_ONLY_FLAG: TestDescriptor = TestDescriptor {
    id: "fHttpOnly",
    name: "Cookie HttpOnly flag",
    description: "Checks that every cookie set by the response carries the HttpOnly attribute.",
    check: check_http_only_flag,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieFlags {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
}

pub fn parse_set_cookie(header: &str) -> CookieFlags {
    let mut parts = header.split(';');
    let name = parts
        .next()
        .and_then(|pair| pair.split('=').next())
        .unwrap_or("")
        .trim()
        .to_string();

    let mut flags = CookieFlags { name, secure: false, http_only: false };
    for attr in parts {
        let key = attr.split('=').next().unwrap_or("").trim().to_lowercase();
        match key.as_str() {
            "secure" => flags.secure = true,
            "httponly" => flags.http_only = true,
            _ => {}
        }
    }
    flags
}

fn cookies(resp: &HttpResponse) -> Vec<CookieFlags> {
    resp.header_all("set-cookie").map(parse_set_cookie).collect()
}

fn flag_verdict(resp: &HttpResponse, flag: &str, has_flag: fn(&CookieFlags) -> bool) -> TestResult {
    let cookies = cookies(resp);
    if cookies.is_empty() {
        return TestResult::new("No cookies set", 100, ThreatLevel::Informational, "Response sets no cookies");
    }

    let missing: Vec<&str> = cookies
        .iter()
        .filter(|c| !has_flag(c))
        .map(|c| c.name.as_str())
        .collect();

    if missing.is_empty() {
        TestResult::new(
            format!("Cookies flagged {}", flag),
            100,
            ThreatLevel::Informational,
            format!("All {} cookie(s) set {}", cookies.len(), flag),
        )
    } else {
        TestResult::new(
            format!("Cookies without {} flag", flag),
            100,
            ThreatLevel::Medium,
            format!("{} of {} cookie(s) lack {}: {}", missing.len(), cookies.len(), flag, missing.join(", ")),
        )
    }
}

pub fn check_secure_flag(resp: &HttpResponse) -> TestResult {
    flag_verdict(resp, "Secure", |c| c.secure)
}

pub fn check_http_only_flag(resp: &HttpResponse) -> TestResult {
    flag_verdict(resp, "HttpOnly", |c| c.http_only)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::fixtures::response;

    #[test]
    fn test_parse_set_cookie() {
        let c = parse_set_cookie("session=abc; Path=/; Secure; HttpOnly; SameSite=Lax");
        assert_eq!(c, CookieFlags { name: "session".into(), secure: true, http_only: true });

        let c = parse_set_cookie("track=1; path=/; secure");
        assert!(c.secure);
        assert!(!c.http_only);
    }

    #[test]
    fn test_cookie_value_mentioning_flag_is_not_a_flag() {
        let c = parse_set_cookie("pref=Secure; Path=/");
        assert!(!c.secure);
    }

    #[test]
    fn test_no_cookies() {
        let r = response("https://example.com/");
        assert_eq!(check_secure_flag(&r).name, "No cookies set");
        assert_eq!(check_http_only_flag(&r).name, "No cookies set");
    }

    #[test]
    fn test_secure_flag() {
        let r = response("https://example.com/")
            .with_header("Set-Cookie", "a=1; Secure")
            .with_header("Set-Cookie", "b=2; HttpOnly");
        let result = check_secure_flag(&r);
        assert_eq!(result.name, "Cookies without Secure flag");
        assert!(result.description.ends_with(": b"));

        let result = check_http_only_flag(&r);
        assert_eq!(result.name, "Cookies without HttpOnly flag");
        assert!(result.description.ends_with(": a"));
    }

    #[test]
    fn test_all_flagged() {
        let r = response("https://example.com/").with_header("Set-Cookie", "a=1; Secure; HttpOnly");
        assert_eq!(check_secure_flag(&r).name, "Cookies flagged Secure");
        assert_eq!(check_http_only_flag(&r).name, "Cookies flagged HttpOnly");
    }
}
