use bot_types::{ActionDefinition, Frequency};

// ── Frequency ─────────────────────────────────────────────────────

#[test]
fn never_triggered_is_always_due() {
    assert!(Frequency::Yearly.is_due(None, 0));
    assert!(Frequency::Unknown.is_due(None, 0));
}

#[test]
fn hourly_requires_more_than_an_hour() {
    let last = 1_000_000;
    assert!(!Frequency::Hourly.is_due(Some(last), last + 3600));
    assert!(Frequency::Hourly.is_due(Some(last), last + 3601));
}

#[test]
fn always_ignores_last_trigger() {
    assert!(Frequency::Always.is_due(Some(100), 100));
}

#[test]
fn unknown_frequency_is_unrestricted() {
    assert!(Frequency::Unknown.is_due(Some(100), 100));
}

#[test]
fn clock_going_backwards_is_not_due() {
    assert!(!Frequency::Minutely.is_due(Some(500), 100));
}

#[test]
fn frequency_parses_backend_strings() {
    let parsed: Frequency = serde_json::from_str("\"half_yearly\"").unwrap();
    assert_eq!(parsed, Frequency::HalfYearly);
    let legacy: Frequency = serde_json::from_str("\"half-yearly\"").unwrap();
    assert_eq!(legacy, Frequency::HalfYearly);
    let misspelt: Frequency = serde_json::from_str("\"minuetly\"").unwrap();
    assert_eq!(misspelt, Frequency::Minutely);
    let unknown: Frequency = serde_json::from_str("\"fortnightly\"").unwrap();
    assert_eq!(unknown, Frequency::Unknown);
}

// ── ActionDefinition ──────────────────────────────────────────────

#[test]
fn definition_parses_backend_list() {
    let json = r#"[{"actionID":"A1","frequency":"daily"},{"actionID":"A2","frequency":"always"}]"#;
    let defs: Vec<ActionDefinition> = serde_json::from_str(json).unwrap();
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].action_id, "A1");
    assert_eq!(defs[0].frequency, Frequency::Daily);
    assert_eq!(defs[0].last_triggered, None);
}
