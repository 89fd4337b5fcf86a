//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_only_once() {
    // One global subscriber per process; this is the only test here that installs it.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::warn!(collection_id = "c-1", "logging initialized");

    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_credential_never_logged_verbatim() {
    let token = "ghp_0123456789abcdef";
    for field in ["credential", "token", "authorization", "Bearer"] {
        assert_eq!(redact_if_sensitive(field, token), "[REDACTED]");
    }
}

#[test]
fn test_pii_redaction_emails() {
    let redacted = redact_if_sensitive("owner", "user@example.com");

    assert!(redacted.starts_with('u'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/catalog/catalog.db"), "catalog.db");
    assert_eq!(strip_path("D:\\data\\export.json"), "export.json");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}
