use reqwest::header::HeaderMap;

/// Only this many leading body bytes are scanned for challenge markers.
pub const BODY_SCAN_LIMIT: usize = 64 * 1024;

const CHALLENGE_HEADERS: [&str; 2] = ["cf-ray", "cf-chl-bcode"];

const BODY_MARKERS: [&str; 8] = [
    "cloudflare",
    "captcha",
    "attention required",
    "challenge",
    "verify you are human",
    "security check",
    "ddos protection",
    "access denied",
];

/// Which part of the response tripped the heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotSignal {
    ServerHeader(String),
    ChallengeHeader(&'static str),
    BodyMarker(&'static str),
}

impl BotSignal {
    pub fn describe(&self) -> String {
        match self {
            BotSignal::ServerHeader(server) => format!("Server header '{}'", server),
            BotSignal::ChallengeHeader(name) => format!("{} header present", name.to_uppercase()),
            BotSignal::BodyMarker(marker) => format!("body contains '{}'", marker),
        }
    }
}

/// Checks headers first, then the bounded body prefix.
pub fn detect(headers: &HeaderMap, body: &[u8]) -> Option<BotSignal> {
    if let Some(server) = headers.get(reqwest::header::SERVER).and_then(|v| v.to_str().ok()) {
        if server.to_lowercase().contains("cloudflare") {
            return Some(BotSignal::ServerHeader(server.to_string()));
        }
    }

    if let Some(name) = CHALLENGE_HEADERS.into_iter().find(|h| headers.contains_key(*h)) {
        return Some(BotSignal::ChallengeHeader(name));
    }

    let prefix = &body[..body.len().min(BODY_SCAN_LIMIT)];
    let text = String::from_utf8_lossy(prefix).to_lowercase();
    BODY_MARKERS
        .into_iter()
        .find(|marker| text.contains(marker))
        .map(BotSignal::BodyMarker)
}
