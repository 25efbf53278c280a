//! Tests for [`ServiceConfig`] and its sections.

use super::*;

#[test]
fn test_defaults_are_valid() {
    let config = ServiceConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.webhook.path_prefix, "/webhook/meta");
    assert_eq!(config.forwarding.timeout_seconds, 10);
    assert_eq!(config.forwarding.user_agent, "W-Router/1.0");
    assert_eq!(config.cache.ttl(), Duration::from_secs(300));
    assert!(config.routing.table_path.is_none());
}

#[test]
fn test_partial_document_fills_defaults() {
    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "server": {"port": 9000},
        "webhook": {"verify_token": "s3cret"}
    }))
    .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.webhook.verify_token, "s3cret");
    assert_eq!(config.webhook.path_prefix, "/webhook/meta");
}

#[test]
fn test_debug_redacts_verify_token() {
    let mut config = WebhookConfig::default();
    assert!(format!("{:?}", config).contains("<unset>"));

    config.verify_token = "s3cret".to_string();
    let debug = format!("{:?}", config);

    assert!(!debug.contains("s3cret"));
    assert!(debug.contains("<REDACTED>"));
}

#[test]
fn test_zero_timeouts_are_rejected() {
    let mut config = ServiceConfig::default();
    config.forwarding.timeout_seconds = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

    let mut config = ServiceConfig::default();
    config.cache.ttl_seconds = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

    let mut config = ServiceConfig::default();
    config.server.shutdown_timeout_seconds = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_path_prefix_shape_is_checked() {
    for prefix in ["webhook", "/", "/webhook/", ""] {
        let mut config = ServiceConfig::default();
        config.webhook.path_prefix = prefix.to_string();
        assert!(
            config.validate().is_err(),
            "prefix '{}' should be rejected",
            prefix
        );
    }
}

#[test]
fn test_blank_user_agent_is_missing() {
    let mut config = ServiceConfig::default();
    config.forwarding.user_agent = "  ".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { .. })
    ));
}

#[test]
fn test_forwarder_config_conversion() {
    let forwarding = ForwardingConfig {
        timeout_seconds: 3,
        user_agent: "Router-Test".to_string(),
    };

    let converted = forwarding.to_forwarder_config();

    assert_eq!(converted.timeout, Duration::from_secs(3));
    assert_eq!(converted.user_agent, "Router-Test");
}
