use posture_scan::error::HttpErrorKind;
use posture_scan::http_client::{ClientOptions, HttpClient, RedirectPolicy, RequestOverrides};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

fn client() -> HttpClient {
    HttpClient::new(ClientOptions::default()).unwrap()
}

#[tokio::test]
async fn test_success_captures_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Strict-Transport-Security", "max-age=31536000")
                .append_header("Set-Cookie", "a=1; Secure")
                .append_header("Set-Cookie", "b=2; HttpOnly")
                .set_body_string("<html>hello</html>"),
        )
        .mount(&server)
        .await;

    let resp = client().get(&url(&server, "/")).await.unwrap();
    assert_eq!(resp.status, 200);
    assert!(resp.status_line.ends_with("200 OK"));
    assert_eq!(resp.header("strict-transport-security"), Some("max-age=31536000"));
    assert_eq!(resp.header_all("set-cookie").count(), 2);
    assert_eq!(resp.body_text(), "<html>hello</html>");
}

#[tokio::test]
async fn test_cloudflare_server_is_bot_protection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("Server", "cloudflare"))
        .mount(&server)
        .await;

    let err = client().get(&url(&server, "/")).await.unwrap_err();
    assert_eq!(err.code(), 300);
    assert_eq!(err.kind, HttpErrorKind::BotProtection);
    assert!(!err.retryable);
}

#[tokio::test]
async fn test_cf_ray_header_is_bot_protection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("CF-RAY", "8a1b2c3d4e5f-AMS"))
        .mount(&server)
        .await;

    assert_eq!(client().get(&url(&server, "/")).await.unwrap_err().code(), 300);
}

#[tokio::test]
async fn test_challenge_body_beats_status_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<title>Just a moment...</title> Verify you are human"))
        .mount(&server)
        .await;

    let err = client().get(&url(&server, "/")).await.unwrap_err();
    assert_eq!(err.code(), 300);
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(path("/missing")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
    Mock::given(path("/busy")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

    let err = client().get(&url(&server, "/missing")).await.unwrap_err();
    assert_eq!(err.code(), 101);
    assert_eq!(err.kind, HttpErrorKind::Status(404));
    assert!(!err.retryable);

    let err = client().get(&url(&server, "/busy")).await.unwrap_err();
    assert_eq!(err.code(), 101);
    assert!(err.retryable);
}

#[tokio::test]
async fn test_transport_failure() {
    let closed = Url::parse("http://127.0.0.1:1/").unwrap();

    let err = client().get(&closed).await.unwrap_err();
    assert_eq!(err.code(), 100);
    assert_eq!(err.kind, HttpErrorKind::Transport);
    assert!(err.retryable);
}

#[tokio::test]
async fn test_truncated_body_is_body_read_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        // Promise 100 bytes, deliver 10, hang up
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n0123456789")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let target = Url::parse(&format!("http://{}/", addr)).unwrap();
    let err = client().get(&target).await.unwrap_err();
    assert_eq!(err.code(), 200);
    assert_eq!(err.kind, HttpErrorKind::BodyRead);
    assert!(err.retryable);
}

#[tokio::test]
async fn test_timeout_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let overrides = RequestOverrides {
        timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let err = client().request(Method::GET, &url(&server, "/"), &overrides).await.unwrap_err();
    assert_eq!(err.code(), 100);
    assert!(err.message.starts_with("request timed out"));
}

#[tokio::test]
async fn test_override_headers_replace_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("User-Agent", "Override/2"))
        .and(header("X-Scan", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut defaults = HeaderMap::new();
    defaults.insert(USER_AGENT, HeaderValue::from_static("Scanner/1.0"));
    defaults.insert("x-scan", HeaderValue::from_static("1"));
    let client = HttpClient::new(ClientOptions { headers: defaults, ..Default::default() }).unwrap();

    let mut overrides = RequestOverrides::default();
    overrides.headers.insert(USER_AGENT, HeaderValue::from_static("Override/2"));

    let resp = client.request(Method::GET, &url(&server, "/"), &overrides).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_redirects_followed_by_default() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(path("/new")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let resp = client().get(&url(&server, "/old")).await.unwrap();
    assert_eq!(resp.final_url.path(), "/new");
    assert_eq!(resp.request_url.path(), "/old");
}

#[tokio::test]
async fn test_redirect_override_reports_status() {
    let server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;

    let overrides = RequestOverrides {
        redirect_policy: Some(RedirectPolicy::DoNotFollow),
        ..Default::default()
    };
    let err = client().request(Method::GET, &url(&server, "/old"), &overrides).await.unwrap_err();
    assert_eq!(err.kind, HttpErrorKind::Status(302));
}
