use hollow::handlers::*;
use hollow_scanner::RateLimit;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_host_and_port() {
    let result = parse_url_line("localhost:8080/app");
    assert_eq!(result, Some("http://localhost:8080/app".to_string()));
}

#[test]
fn test_parse_url_line_trims_whitespace() {
    let result = parse_url_line("  http://example.com/base  ");
    assert_eq!(result, Some("http://example.com/base".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_rate_wins_over_delay() {
    let limit = rate_limit_from(Some(1.0), Some(20.0)).unwrap();
    assert_eq!(limit, RateLimit::Interval(Duration::from_millis(50)));
}

#[test]
fn test_delay_becomes_interval() {
    let limit = rate_limit_from(Some(0.25), None).unwrap();
    assert_eq!(limit, RateLimit::Interval(Duration::from_millis(250)));
}

#[test]
fn test_zero_delay_is_unlimited() {
    assert_eq!(rate_limit_from(Some(0.0), None).unwrap(), RateLimit::Unlimited);
    assert_eq!(rate_limit_from(None, None).unwrap(), RateLimit::Unlimited);
}

#[test]
fn test_bad_pacing_values_are_rejected() {
    assert!(rate_limit_from(Some(-1.0), None).is_err());
    assert!(rate_limit_from(Some(f64::NAN), None).is_err());
    assert!(rate_limit_from(None, Some(0.0)).is_err());
}

#[test]
fn test_oversized_pacing_values_are_rejected() {
    assert!(rate_limit_from(Some(1e30), None).is_err());
    assert!(rate_limit_from(None, Some(1e-300)).is_err());
}

#[test]
fn test_log_level_from_verbosity() {
    assert_eq!(log_level(0), Level::WARN);
    assert_eq!(log_level(1), Level::INFO);
    assert_eq!(log_level(2), Level::DEBUG);
    assert_eq!(log_level(7), Level::TRACE);
}
