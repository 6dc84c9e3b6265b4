use once_cell::sync::Lazy;
use regex::Regex;

use super::{TestDescriptor, TestResult, ThreatLevel};
use crate::http_client::HttpResponse;

/// 180 days; shorter HSTS windows are flagged.
pub const HSTS_MIN_MAX_AGE: u64 = 15_552_000;

static MAX_AGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:^|;)\s*max-age\s*=\s*"?(\d+)"?"#).unwrap());

pub const HSTS: TestDescriptor = TestDescriptor {
    id: "hsts",
    name: "HTTP Strict Transport Security",
    description: "Checks that Strict-Transport-Security is set with a long max-age.",
    check: check_hsts,
};

pub const CSP: TestDescriptor = TestDescriptor {
    id: "csp",
    name: "Content Security Policy",
    description: "Checks that a Content-Security-Policy restricts script sources.",
    check: check_csp,
};

pub const X_FRAME: TestDescriptor = TestDescriptor {
    id: "xFrame",
    name: "Clickjacking protection",
    description: "Checks X-Frame-Options or CSP frame-ancestors.",
    check: check_x_frame,
};

pub const REFERRER_POLICY: TestDescriptor = TestDescriptor {
    id: "refererPol",
    name: "Referrer-Policy",
    description: "Checks that Referrer-Policy does not leak full URLs cross-origin.",
    check: check_referrer_policy,
};

pub const XSS_PROTECTION: TestDescriptor = TestDescriptor {
    id: "xxss",
    name: "X-XSS-Protection",
    description: "Checks that the legacy XSS filter is enabled in blocking mode.",
    check: check_xss_protection,
};

pub const PERMISSIONS_POLICY: TestDescriptor = TestDescriptor {
    id: "featurePol",
    name: "Permissions-Policy",
    description: "Checks that browser features are restricted via Permissions-Policy or Feature-Policy.",
    check: check_permissions_policy,
};

pub fn check_hsts(resp: &HttpResponse) -> TestResult {
    let Some(value) = resp.header("strict-transport-security") else {
        return TestResult::new(
            "HSTS missing",
            100,
            ThreatLevel::Medium,
            "Missing HSTS - not enforcing HTTPS",
        );
    };

    let max_age = MAX_AGE
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    match max_age {
        None | Some(0) => TestResult::new(
            "HSTS misconfigured",
            90,
            ThreatLevel::Medium,
            format!("Strict-Transport-Security has no usable max-age: {}", value),
        ),
        Some(age) if age < HSTS_MIN_MAX_AGE => TestResult::new(
            "HSTS max-age too short",
            90,
            ThreatLevel::Low,
            format!("max-age={} is below {} seconds", age, HSTS_MIN_MAX_AGE),
        ),
        Some(age) => {
            let lower = value.to_lowercase();
            let mut extras = Vec::new();
            if lower.contains("includesubdomains") {
                extras.push("includeSubDomains");
            }
            if lower.contains("preload") {
                extras.push("preload");
            }
            let suffix = if extras.is_empty() {
                String::new()
            } else {
                format!(" ({})", extras.join(", "))
            };
            TestResult::new(
                "HSTS enabled",
                100,
                ThreatLevel::Informational,
                format!("max-age={}{}", age, suffix),
            )
        }
    }
}

/// `(directive, sources)` pairs of a policy; directive names lowercased.
fn csp_directives(policy: &str) -> Vec<(String, Vec<&str>)> {
    policy
        .split(';')
        .filter_map(|d| {
            let mut parts = d.split_whitespace();
            let name = parts.next()?.to_lowercase();
            Some((name, parts.collect()))
        })
        .collect()
}

fn csp_directive<'a>(directives: &'a [(String, Vec<&'a str>)], name: &str) -> Option<&'a [&'a str]> {
    directives
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, sources)| sources.as_slice())
}

pub fn check_csp(resp: &HttpResponse) -> TestResult {
    let Some(policy) = resp.header("content-security-policy") else {
        if resp.has_header("content-security-policy-report-only") {
            return TestResult::new(
                "CSP report-only",
                100,
                ThreatLevel::Low,
                "Content-Security-Policy-Report-Only is set but nothing is enforced",
            );
        }
        return TestResult::new(
            "CSP missing",
            100,
            ThreatLevel::Medium,
            "Missing CSP - vulnerable to XSS",
        );
    };

    let directives = csp_directives(policy);
    let Some(scripts) = csp_directive(&directives, "script-src").or_else(|| csp_directive(&directives, "default-src"))
    else {
        return TestResult::new(
            "CSP does not restrict scripts",
            80,
            ThreatLevel::Medium,
            "Neither script-src nor default-src is defined",
        );
    };

    let has_nonce_or_hash = scripts.iter().any(|s| {
        let s = s.to_lowercase();
        s.starts_with("'nonce-") || s.starts_with("'sha256-") || s.starts_with("'sha384-") || s.starts_with("'sha512-")
    });

    let mut issues = Vec::new();
    for source in scripts {
        match source.to_lowercase().as_str() {
            // CSP3 browsers ignore 'unsafe-inline' next to a nonce or hash
            "'unsafe-inline'" if !has_nonce_or_hash => issues.push("'unsafe-inline'".to_string()),
            "'unsafe-eval'" => issues.push("'unsafe-eval'".to_string()),
            "*" | "data:" | "http:" | "https:" => issues.push(source.to_string()),
            _ => {}
        }
    }

    if issues.is_empty() {
        TestResult::new("CSP enabled", 100, ThreatLevel::Informational, policy.to_string())
    } else {
        TestResult::new(
            "CSP allows unsafe sources",
            90,
            ThreatLevel::Medium,
            format!("Script sources permit: {}", issues.join(", ")),
        )
    }
}

pub fn check_x_frame(resp: &HttpResponse) -> TestResult {
    let frame_ancestors = resp.header("content-security-policy").and_then(|policy| {
        csp_directives(policy)
            .into_iter()
            .find(|(n, _)| n == "frame-ancestors")
            .map(|(_, sources)| sources.iter().any(|s| *s == "*"))
    });

    // frame-ancestors supersedes X-Frame-Options where supported
    match frame_ancestors {
        Some(false) => {
            return TestResult::new(
                "Clickjacking protection enabled",
                90,
                ThreatLevel::Informational,
                "Framing restricted by CSP frame-ancestors",
            )
        }
        Some(true) => {
            return TestResult::new(
                "Clickjacking protection missing",
                80,
                ThreatLevel::Medium,
                "CSP frame-ancestors allows any origin",
            )
        }
        None => {}
    }

    let Some(value) = resp.header("x-frame-options") else {
        return TestResult::new(
            "Clickjacking protection missing",
            100,
            ThreatLevel::Medium,
            "Missing X-Frame-Options - vulnerable to clickjacking",
        );
    };

    let normalized = value.trim().to_uppercase();
    if normalized == "DENY" || normalized == "SAMEORIGIN" {
        TestResult::new(
            "Clickjacking protection enabled",
            100,
            ThreatLevel::Informational,
            format!("X-Frame-Options: {}", normalized),
        )
    } else if normalized.starts_with("ALLOW-FROM") {
        TestResult::new(
            "Clickjacking protection deprecated",
            90,
            ThreatLevel::Low,
            "ALLOW-FROM is ignored by modern browsers",
        )
    } else {
        TestResult::new(
            "Clickjacking protection invalid",
            80,
            ThreatLevel::Low,
            format!("Unrecognised X-Frame-Options value: {}", value),
        )
    }
}

const STRICT_REFERRER_POLICIES: [&str; 4] = [
    "no-referrer",
    "same-origin",
    "strict-origin",
    "strict-origin-when-cross-origin",
];

const LEAKY_REFERRER_POLICIES: [&str; 4] = [
    "unsafe-url",
    "origin",
    "origin-when-cross-origin",
    "no-referrer-when-downgrade",
];

pub fn check_referrer_policy(resp: &HttpResponse) -> TestResult {
    let Some(value) = resp.header("referrer-policy") else {
        return TestResult::new(
            "Referrer-Policy missing",
            100,
            ThreatLevel::Low,
            "Missing Referrer-Policy - information leakage possible",
        );
    };

    // Browsers apply the last value they understand
    let effective = value
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| STRICT_REFERRER_POLICIES.contains(&p.as_str()) || LEAKY_REFERRER_POLICIES.contains(&p.as_str()))
        .last();

    match effective {
        Some(policy) if STRICT_REFERRER_POLICIES.contains(&policy.as_str()) => TestResult::new(
            "Referrer-Policy enabled",
            100,
            ThreatLevel::Informational,
            format!("Referrer-Policy: {}", policy),
        ),
        Some(policy) => TestResult::new(
            "Referrer-Policy leaks URLs",
            90,
            ThreatLevel::Low,
            format!("Referrer-Policy '{}' sends referrer data cross-origin", policy),
        ),
        None => TestResult::new(
            "Referrer-Policy invalid",
            80,
            ThreatLevel::Low,
            format!("Unrecognised Referrer-Policy value: {}", value),
        ),
    }
}

pub fn check_xss_protection(resp: &HttpResponse) -> TestResult {
    let Some(value) = resp.header("x-xss-protection") else {
        return TestResult::new(
            "XSS protection missing",
            100,
            ThreatLevel::Low,
            "X-XSS-Protection is not set",
        );
    };

    let normalized = value.replace(' ', "").to_lowercase();
    if normalized == "0" {
        TestResult::new(
            "XSS protection disabled",
            100,
            ThreatLevel::Low,
            "X-XSS-Protection: 0 turns the filter off",
        )
    } else if normalized.starts_with('1') && normalized.contains("mode=block") {
        TestResult::new(
            "XSS protection enabled",
            100,
            ThreatLevel::Informational,
            "X-XSS-Protection: 1; mode=block",
        )
    } else if normalized.starts_with('1') {
        TestResult::new(
            "XSS protection without blocking",
            90,
            ThreatLevel::Low,
            "Filter enabled but sanitises instead of blocking",
        )
    } else {
        TestResult::new(
            "XSS protection invalid",
            70,
            ThreatLevel::Low,
            format!("Unrecognised X-XSS-Protection value: {}", value),
        )
    }
}

pub fn check_permissions_policy(resp: &HttpResponse) -> TestResult {
    if let Some(value) = resp.header("permissions-policy") {
        return TestResult::new(
            "Permissions-Policy enabled",
            100,
            ThreatLevel::Informational,
            value.to_string(),
        );
    }
    if let Some(value) = resp.header("feature-policy") {
        return TestResult::new(
            "Legacy Feature-Policy only",
            90,
            ThreatLevel::Informational,
            format!("Feature-Policy is deprecated in favour of Permissions-Policy: {}", value),
        );
    }
    TestResult::new(
        "Permissions-Policy missing",
        100,
        ThreatLevel::Low,
        "Missing Permissions-Policy - no feature restriction",
    )
}
