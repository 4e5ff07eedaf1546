//! Serde roundtrip and JsonSchema validation tests for the model types.

use chrono::{TimeZone, Utc};
use guild_core::{AuditResult, Category, Severity, Target, Violation};
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

roundtrip_and_validate!(
    violation_roundtrip,
    Violation,
    Violation::new(
        Severity::Critical,
        Category::Integrity,
        "process_bypass",
        "Process bypass detected",
        "git push --no-verify",
    )
    .with_location("logs/agent.log:7")
    .with_metadata("execution_id", "exec-1")
    .with_created_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
);

roundtrip_and_validate!(
    audit_result_roundtrip,
    AuditResult,
    AuditResult::new("flow")
        .with_violation(Violation::new(
            Severity::Medium,
            Category::Process,
            "wrong_order",
            "Stages out of order",
            "review before implementation",
        ))
        .with_metric("compliance_score", 90)
        .with_metric("per_stage", serde_json::json!({"intake": 1.0}))
);

roundtrip_and_validate!(
    target_roundtrip,
    Target,
    Target::process_logs(Some("/var/log/agents".into()), Some(12), Some("T-1"))
);

roundtrip_and_validate!(empty_target_roundtrip, Target, Target::empty());
