use url::Url;

use super::{TestDescriptor, TestResult, ThreatLevel};
use crate::http_client::HttpResponse;

pub const HTTPS: TestDescriptor = TestDescriptor {
    id: "https",
    name: "HTTPS usage",
    description: "Checks that the target is served over TLS after redirects.",
    check: check_https,
};

pub const OPEN_REDIRECT: TestDescriptor = TestDescriptor {
    id: "openRedirect",
    name: "Open redirect",
    description: "Checks whether the target redirects to a host outside its own site.",
    check: check_open_redirect,
};

pub fn check_https(resp: &HttpResponse) -> TestResult {
    if resp.final_url.scheme() == "https" {
        let description = if resp.request_url.scheme() == "http" {
            format!("Plain HTTP upgraded to {}", resp.final_url)
        } else {
            format!("Served over TLS: {}", resp.final_url)
        };
        TestResult::new("HTTPS enforced", 100, ThreatLevel::Informational, description)
    } else {
        TestResult::new(
            "HTTPS not used",
            100,
            ThreatLevel::High,
            format!("Content served in clear text: {}", resp.final_url),
        )
    }
}

fn site_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
}

/// Same host, or one is a subdomain of the other.
fn same_site(a: &Url, b: &Url) -> bool {
    match (site_host(a), site_host(b)) {
        (Some(a), Some(b)) => a == b || a.ends_with(&format!(".{}", b)) || b.ends_with(&format!(".{}", a)),
        _ => false,
    }
}

/// Where the response sends the client: the followed URL, or an unfollowed `Location`.
fn redirect_destination(resp: &HttpResponse) -> Option<Url> {
    if resp.final_url != resp.request_url {
        return Some(resp.final_url.clone());
    }
    if (300..400).contains(&resp.status) {
        return resp
            .header("location")
            .and_then(|loc| resp.request_url.join(loc).ok());
    }
    None
}

pub fn check_open_redirect(resp: &HttpResponse) -> TestResult {
    let Some(destination) = redirect_destination(resp) else {
        return TestResult::new(
            "No open redirect observed",
            70,
            ThreatLevel::Informational,
            "Response was served without redirecting",
        );
    };

    if same_site(&resp.request_url, &destination) {
        return TestResult::new(
            "No open redirect observed",
            70,
            ThreatLevel::Informational,
            format!("Redirect stays on site: {}", destination),
        );
    }

    // Destination echoed from the query string is the classic open redirect shape
    let from_query = resp.request_url.query_pairs().any(|(_, value)| {
        Url::parse(&value)
            .map(|u| u.host_str().is_some() && u.host_str() == destination.host_str())
            .unwrap_or(false)
    });

    let certainty = if from_query { 90 } else { 60 };
    TestResult::new(
        "Redirects to external host",
        certainty,
        ThreatLevel::Medium,
        format!("{} redirected to {}", resp.request_url, destination),
    )
}
