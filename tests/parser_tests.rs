use posture_scan::cli::{CommandParser, Flag, ParameterSchema, Verb};
use posture_scan::error::{ErrorSource, ParseError};
use posture_scan::AppError;

fn parse(argv: &[&str]) -> Result<posture_scan::cli::ParsedInvocation, ParseError> {
    let schema = ParameterSchema::standard();
    CommandParser::new(&schema).parse(argv)
}

fn code(argv: &[&str]) -> u16 {
    let app: AppError = parse(argv).unwrap_err().into();
    assert_eq!(app.origin, ErrorSource::Parser);
    assert!(!app.retryable);
    app.code
}

#[test]
fn test_full_invocation() {
    let inv = parse(&[
        "scanner",
        "test",
        "--target",
        "https://example.com",
        "--referer",
        "https://ref.example",
        "--tests",
        "https",
        "hsts",
        "csp",
        "--httpMethods",
        "GET",
        "OPTIONS",
    ])
    .unwrap();

    assert_eq!(inv.verb(), Verb::Test);
    let flags: Vec<Flag> = inv.parameters().iter().map(|p| p.flag()).collect();
    assert_eq!(flags, vec![Flag::Target, Flag::Referer, Flag::Tests, Flag::HttpMethods]);
    assert_eq!(inv.value(Flag::Target), Some("https://example.com"));
    assert_eq!(inv.values(Flag::Tests).unwrap(), ["https", "hsts", "csp"]);
    assert_eq!(inv.values(Flag::HttpMethods).unwrap(), ["GET", "OPTIONS"]);
    assert!(inv.first(Flag::Files).is_none());
}

#[test]
fn test_error_codes() {
    assert_eq!(code(&["scanner"]), 100);
    assert_eq!(code(&["scanner", "run"]), 201);
    assert_eq!(code(&["scanner", "test", "--target"]), 303);
    assert_eq!(code(&["scanner", "test", "stray"]), 304);
    assert_eq!(code(&["scanner", "test", "--verbose"]), 304);
    assert_eq!(code(&["scanner", "test", "--httpMethods", "FETCH"]), 304);
    assert_eq!(code(&["scanner", "test", "--tests", "csp", "csp"]), 305);
    assert_eq!(code(&["scanner", "test", "--target", "https://a", "https://b"]), 306);
}

#[test]
fn test_optional_flags_fall_back_to_defaults() {
    let inv = parse(&["scanner", "test", "--userAgent", "--referer"]).unwrap();
    assert_eq!(inv.value(Flag::UserAgent), Some("Scanner/1.0"));
    assert_eq!(inv.value(Flag::Referer), Some(""));
}

#[test]
fn test_first_record_wins() {
    let inv = parse(&["scanner", "test", "--target", "https://a", "--target", "https://b"]).unwrap();
    assert_eq!(inv.parameters().len(), 2);
    assert_eq!(inv.value(Flag::Target), Some("https://a"));
}
