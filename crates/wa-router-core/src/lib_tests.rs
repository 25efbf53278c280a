//! Tests for the wa-router-core library module.

use super::*;

#[test]
fn test_vendor_code_validation() {
    assert!(VendorCode::new("acme").is_ok());
    assert!(VendorCode::new("acme_corp-2").is_ok());

    assert!(matches!(
        VendorCode::new(""),
        Err(ValidationError::Required { .. })
    ));
    assert!(matches!(
        VendorCode::new("a".repeat(51)),
        Err(ValidationError::TooLong { .. })
    ));
    assert!(matches!(
        VendorCode::new("acme corp"),
        Err(ValidationError::InvalidCharacters { .. })
    ));
    assert!(matches!(
        VendorCode::new("acme/../x"),
        Err(ValidationError::InvalidCharacters { .. })
    ));
}

#[test]
fn test_codes_accept_mixed_case_and_match_exactly() {
    let upper = VendorCode::new("Acme").unwrap();
    let lower = VendorCode::new("acme").unwrap();

    assert_ne!(upper, lower);
    assert!(EnvironmentCode::new("Prod-EU").is_ok());
}

#[test]
fn test_vendor_code_parses_from_path_segment() {
    let code: VendorCode = "acme".parse().unwrap();
    assert_eq!(code.as_str(), "acme");
    assert_eq!(code.to_string(), "acme");
}

#[test]
fn test_codes_deserialize_with_validation() {
    let code: EnvironmentCode = serde_json::from_str("\"prod\"").unwrap();
    assert_eq!(code.as_str(), "prod");

    let invalid: Result<EnvironmentCode, _> = serde_json::from_str("\"has space\"");
    assert!(invalid.is_err());
}

#[test]
fn test_sender_id_validation() {
    assert!(SenderId::new("15551234567").is_ok());

    assert!(matches!(
        SenderId::new(""),
        Err(ValidationError::Required { .. })
    ));
    assert!(matches!(
        SenderId::new("1".repeat(21)),
        Err(ValidationError::TooLong { .. })
    ));
    assert!(matches!(
        SenderId::new("1555 123"),
        Err(ValidationError::InvalidCharacters { .. })
    ));
}

#[test]
fn test_record_ids_display_their_value() {
    assert_eq!(VendorId::new(7).to_string(), "7");
    assert_eq!(RuleId::new(42).as_u64(), 42);
}

#[test]
fn test_timestamp_arithmetic() {
    let now = Timestamp::now();
    let later = now.add_duration(Duration::from_secs(300));

    assert!(later > now);
    assert_eq!(later.duration_since(now), Duration::from_secs(300));
    assert_eq!(now.duration_since(later), Duration::ZERO);
}

#[test]
fn test_timestamp_saturates_on_overflow() {
    let now = Timestamp::now();
    let far = now.add_duration(Duration::from_secs(u64::MAX));

    assert!(far > now);
}
