//! Tests for service metrics

use super::*;

#[test]
fn test_instances_do_not_collide() {
    let first = ServiceMetrics::new();
    let second = ServiceMetrics::new();

    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[test]
fn test_delivery_outcomes_are_labelled() {
    let metrics = ServiceMetrics::new().unwrap();

    metrics.record_delivery(outcome::FORWARDED);
    metrics.record_delivery(outcome::FORWARDED);
    metrics.record_delivery(outcome::ROUTE_NOT_FOUND);

    let text = metrics.encode().unwrap();
    assert!(text.contains(r#"webhook_deliveries_total{outcome="forwarded"} 2"#));
    assert!(text.contains(r#"webhook_deliveries_total{outcome="route_not_found"} 1"#));
}
