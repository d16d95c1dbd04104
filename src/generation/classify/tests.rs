use super::*;

#[test]
fn recognizes_resource_exhausted() {
    let kind = classify("status: RESOURCE_EXHAUSTED, please slow down");
    assert!(matches!(kind, ErrorKind::RateLimited { .. }));
}

#[test]
fn recognizes_http_429() {
    let kind = classify("Gemini API error 429 Too Many Requests: try later");
    assert!(matches!(kind, ErrorKind::RateLimited { .. }));
}

#[test]
fn recognizes_quota_exceeded_case_insensitively() {
    assert!(matches!(
        classify("Quota Exceeded for model"),
        ErrorKind::RateLimited { .. }
    ));
    assert!(matches!(
        classify("quota exceeded"),
        ErrorKind::RateLimited { .. }
    ));
}

#[test]
fn other_errors_are_not_rate_limits() {
    assert_eq!(classify("connection reset by peer"), ErrorKind::Other);
    assert_eq!(classify("invalid API key"), ErrorKind::Other);
    assert_eq!(classify(""), ErrorKind::Other);
}

#[test]
fn extracts_retry_in_prose_delay() {
    let delay = extract_retry_delay("RESOURCE_EXHAUSTED: retry in 53.46271898s");
    let delay = delay.expect("delay should be found");
    assert!((delay.as_secs_f64() - 53.462_718_98).abs() < 1e-6);
}

#[test]
fn extracts_simple_retry_delay() {
    let delay = extract_retry_delay("rate limited, Retry in 5s");
    assert_eq!(delay, Some(Duration::from_secs(5)));
}

#[test]
fn extracts_retry_delay_field() {
    let delay = extract_retry_delay(r#"{"retryDelay": "53s"}"#);
    assert_eq!(delay, Some(Duration::from_secs(53)));
}

#[test]
fn missing_delay_yields_none() {
    assert_eq!(extract_retry_delay("429 Too Many Requests"), None);
    assert_eq!(extract_retry_delay("retry later please"), None);
}

#[test]
fn classification_carries_the_embedded_delay() {
    let kind = classify("429: retry in 5s");
    assert_eq!(
        kind,
        ErrorKind::RateLimited {
            retry_after: Some(Duration::from_secs(5))
        }
    );
}

#[test]
fn operator_delay_overrides_exponential_backoff() {
    // A quota error carrying "retry in 5s" must wait those 5 seconds, not
    // the exponential fallback for that attempt.
    let ErrorKind::RateLimited { retry_after } = classify("quota exceeded, retry in 5s") else {
        panic!("expected a rate-limit classification");
    };
    assert_eq!(
        backoff_delay(retry_after, 0),
        Duration::from_secs(5)
    );
    assert_eq!(
        backoff_delay(retry_after, 4),
        Duration::from_secs(5)
    );
}

#[test]
fn exponential_backoff_doubles_and_caps() {
    assert_eq!(backoff_delay(None, 0), Duration::from_secs(1));
    assert_eq!(backoff_delay(None, 1), Duration::from_secs(2));
    assert_eq!(backoff_delay(None, 3), Duration::from_secs(8));
    assert_eq!(backoff_delay(None, 5), Duration::from_secs(32));
    assert_eq!(backoff_delay(None, 6), Duration::from_secs(60));
    assert_eq!(backoff_delay(None, 40), Duration::from_secs(60));
}
