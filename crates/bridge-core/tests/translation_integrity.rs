//! Data integrity tests for the translation layer: cross-system round
//! trips must preserve critical fields, date semantics, and priority
//! codes, and every conversion must leave exactly one audit entry.

use std::collections::HashMap;

use bridge_core::{
    EntityType, Id, MapperRegistry, TransformationContext, TransformationService, Transformer,
    TranslationStatus,
};
use chrono::DateTime;
use serde_json::{json, Value};
use std::sync::Arc;

/// A test case exercising nested steps, custom fields, attachments,
/// links, unicode and punctuation-heavy content.
fn complex_test_case() -> Value {
    json!({
        "id": "TC-COMPLEX-001",
        "title": "Complex test case with special characters: áéíóú",
        "description": "Test case with <b>HTML</b> formatting and special characters: áéíóú",
        "status": "ACTIVE",
        "priority": "HIGH",
        "folder_path": "/Project/Folder/Subfolder",
        "preconditions": "System is in a clean state\nUser is logged in",
        "owner": "user.name@example.com",
        "custom_fields": {
            "Risk": "Medium",
            "Component": "Authentication",
            "Automation_Status": "Automated",
            "Last_Run_Date": "2025-01-15T14:30:00Z",
            "Test_Data": "user1:password1,user2:password2"
        },
        "tags": ["regression", "authentication", "smoke-test"],
        "steps": [
            {
                "id": "step1",
                "order": 1,
                "action": "Navigate to login page",
                "expected_result": "Login page is displayed",
                "test_data": "N/A"
            },
            {
                "id": "step2",
                "order": 2,
                "action": "Enter 'user@example.com' in the email field",
                "expected_result": "Email is accepted",
                "test_data": "user@example.com"
            },
            {
                "id": "step3",
                "order": 3,
                "action": "Enter valid password with special chars !@#$%^",
                "expected_result": "Password field shows dots for each character",
                "test_data": "Password!@#$%^"
            },
            {
                "id": "step4",
                "order": 4,
                "action": "Click 'Login' button",
                "expected_result": "User is logged in successfully\nDashboard is displayed",
                "test_data": "N/A"
            }
        ],
        "attachments": [
            {
                "id": "att1",
                "filename": "screenshot1.png",
                "file_type": "image/png",
                "size": 25000,
                "description": "Screenshot of login screen"
            },
            {
                "id": "att2",
                "filename": "test_data.json",
                "file_type": "application/json",
                "size": 1500,
                "description": "Test data file with special characters áéíóú"
            }
        ],
        "links": [
            {"type": "requirement", "id": "REQ-001", "description": "User authentication"},
            {"type": "defect", "id": "BUG-123", "description": "Login fails with certain special characters"}
        ],
        "created_at": "2025-01-01T08:00:00Z",
        "updated_at": "2025-01-15T16:45:00Z",
        "version": "2.0"
    })
}

fn transformer() -> Transformer {
    Transformer::new(Arc::new(MapperRegistry::with_builtin()))
}

#[test]
fn cross_system_round_trip_preserves_critical_fields() {
    let t = transformer();
    let original = complex_test_case();

    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();
    let back = t
        .transform("qtest", "zephyr", EntityType::TestCase, &qtest, None)
        .unwrap();

    for field in ["id", "title", "description", "folder_path", "preconditions"] {
        assert_eq!(back[field], original[field], "field {field} not preserved");
    }

    let original_steps = original["steps"].as_array().unwrap();
    let back_steps = back["steps"].as_array().unwrap();
    assert_eq!(back_steps.len(), original_steps.len());
    for (i, (orig, round)) in original_steps.iter().zip(back_steps).enumerate() {
        assert_eq!(round["action"], orig["action"], "step {i} action");
        assert_eq!(
            round["expected_result"], orig["expected_result"],
            "step {i} expected result"
        );
        assert_eq!(round["test_data"], orig["test_data"], "step {i} test data");
    }

    // Custom field values survive both property reshapes.
    let original_fields = original["custom_fields"].as_object().unwrap();
    let back_fields = back["custom_fields"].as_object().unwrap();
    for (name, value) in original_fields {
        assert_eq!(back_fields.get(name), Some(value), "custom field {name}");
    }
}

#[test]
fn unicode_content_survives_every_leg() {
    let t = transformer();
    let original = complex_test_case();

    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();
    assert!(qtest["name"].as_str().unwrap().contains("áéíóú"));
    assert!(qtest["test_steps"][2]["description"]
        .as_str()
        .unwrap()
        .contains("!@#$%^"));

    let back = t
        .transform("qtest", "zephyr", EntityType::TestCase, &qtest, None)
        .unwrap();
    assert!(back["title"].as_str().unwrap().contains("áéíóú"));
    assert!(back["description"].as_str().unwrap().contains("<b>HTML</b>"));
}

#[test]
fn date_semantics_iso_to_millis_and_back_within_one_second() {
    let t = transformer();
    let original = complex_test_case();

    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();
    // 2025-01-01T08:00:00Z as a millisecond epoch.
    assert_eq!(qtest["created_date"], json!(1_735_718_400_000_i64));

    let back = t
        .transform("qtest", "zephyr", EntityType::TestCase, &qtest, None)
        .unwrap();
    let original_instant =
        DateTime::parse_from_rfc3339(original["created_at"].as_str().unwrap()).unwrap();
    let round_instant = DateTime::parse_from_rfc3339(back["created_at"].as_str().unwrap()).unwrap();
    let drift = (round_instant - original_instant).num_seconds().abs();
    assert!(drift <= 1, "created_at drifted by {drift}s");
}

#[test]
fn priority_maps_high_to_one_and_back() {
    let t = transformer();
    let original = complex_test_case();

    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();
    assert_eq!(qtest["priority"], json!(1));

    let back = t
        .transform("qtest", "zephyr", EntityType::TestCase, &qtest, None)
        .unwrap();
    assert_eq!(back["priority"], json!("HIGH"));
}

#[test]
fn medium_priority_maps_to_three() {
    let t = transformer();
    let source = json!({"id": "TC-M", "title": "t", "priority": "MEDIUM"});
    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &source, None)
        .unwrap();
    assert_eq!(qtest["priority"], json!(3));
}

#[test]
fn field_mapping_overrides_rename_properties() {
    let service = TransformationService::with_builtin_mappers();
    let original = complex_test_case();

    let field_mappings = HashMap::from([
        ("Risk".to_string(), "RiskLevel".to_string()),
        ("Component".to_string(), "TestComponent".to_string()),
    ]);
    let qtest = service
        .transform(
            "zephyr",
            "qtest",
            EntityType::TestCase,
            &original,
            Some(Id::new()),
            field_mappings,
            HashMap::new(),
            None,
        )
        .unwrap();

    let properties = qtest["properties"].as_array().unwrap();
    let names: Vec<&str> = properties
        .iter()
        .map(|p| p["field_name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"RiskLevel"));
    assert!(names.contains(&"TestComponent"));
    assert!(!names.contains(&"Risk"));
    assert!(!names.contains(&"Component"));

    let risk = properties
        .iter()
        .find(|p| p["field_name"] == json!("RiskLevel"))
        .unwrap();
    assert_eq!(risk["field_value"], json!("Medium"));
}

#[test]
fn value_mapping_overrides_substitute_values() {
    let service = TransformationService::with_builtin_mappers();
    let original = complex_test_case();

    let value_mappings = HashMap::from([(
        "Automation_Status".to_string(),
        HashMap::from([("Automated".to_string(), json!("YES"))]),
    )]);
    let qtest = service
        .transform(
            "zephyr",
            "qtest",
            EntityType::TestCase,
            &original,
            None,
            HashMap::new(),
            value_mappings,
            None,
        )
        .unwrap();

    let properties = qtest["properties"].as_array().unwrap();
    let status = properties
        .iter()
        .find(|p| p["field_name"] == json!("Automation_Status"))
        .unwrap();
    assert_eq!(status["field_value"], json!("YES"));
}

#[test]
fn every_transform_leaves_exactly_one_audit_entry() {
    let t = transformer();
    let original = complex_test_case();

    t.transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();
    t.transform("zephyr", "qtest", EntityType::TestCase, &original, None)
        .unwrap();

    let translations = t.translations();
    assert_eq!(translations.len(), 1);
    let entry = &translations[0];
    assert_eq!(entry.source_system, "zephyr");
    assert_eq!(entry.target_system, "qtest");
    assert_eq!(entry.source_id, "TC-COMPLEX-001");
    // Fixture status "ACTIVE" is outside the recognized set, so the
    // conversion is lossy and flagged partial.
    assert_eq!(entry.status, TranslationStatus::Partial);
    assert!(entry.messages.iter().any(|m| m.contains("ACTIVE")));
}

#[test]
fn mapper_failure_records_error_entry_and_raises() {
    let t = transformer();
    let source = json!(["not", "an", "object"]);
    let err = t
        .transform("zephyr", "qtest", EntityType::TestCase, &source, None)
        .unwrap_err();
    assert!(err.to_string().contains("failed to transform"));

    let translations = t.translations();
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0].status, TranslationStatus::Error);
    assert_eq!(translations[0].target_id, "failed");
}

#[test]
fn empty_steps_round_trip_without_synthesis() {
    let t = transformer();
    let source = json!({"id": "TC-E", "title": "empty", "steps": []});
    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestCase, &source, None)
        .unwrap();
    assert_eq!(qtest["test_steps"], json!([]));
    let back = t
        .transform("qtest", "zephyr", EntityType::TestCase, &qtest, None)
        .unwrap();
    assert_eq!(back["steps"], json!([]));
}

#[test]
fn step_orders_are_dense_after_mapping() {
    let t = transformer();
    // Steps arrive with no explicit order.
    let source = json!({"id": "TC-D", "title": "t", "steps": [
        {"action": "a", "expected_result": "r"},
        {"action": "b", "expected_result": "r"},
        {"action": "c", "expected_result": "r"},
    ]});
    let entity = t
        .canonical_form("zephyr", EntityType::TestCase, &source, None)
        .unwrap();
    let bridge_core::CanonicalEntity::TestCase(case) = entity else {
        panic!("expected a test case");
    };
    assert!(bridge_core::is_dense_order(
        case.test_steps.iter().map(|s| s.order)
    ));
    assert_eq!(case.test_steps.len(), 3);
}

#[test]
fn step_results_must_reference_steps_of_the_owning_case() {
    let t = transformer();
    let mut context = TransformationContext::new("zephyr", "qtest");
    context.related_step_ids = Some(vec![
        "step1".to_string(),
        "step2".to_string(),
        "step3".to_string(),
        "step4".to_string(),
    ]);

    let execution = json!({
        "id": "EX-DANGLING",
        "testId": "TC-COMPLEX-001",
        "status": "FAILED",
        "stepResults": [
            {"stepId": "step1", "index": 1, "status": "PASSED"},
            {"stepId": "stepX", "index": 2, "status": "FAILED"},
        ],
    });
    // A dangling reference is a schema violation, not a failure: the
    // transform still succeeds but the audit entry goes partial.
    t.transform(
        "zephyr",
        "qtest",
        EntityType::TestExecution,
        &execution,
        Some(&context),
    )
    .unwrap();

    let entry = t
        .translation("zephyr", "qtest", EntityType::TestExecution, "EX-DANGLING")
        .unwrap();
    assert_eq!(entry.status, TranslationStatus::Partial);
    assert!(entry
        .messages
        .iter()
        .any(|m| m.contains("stepId 'stepX' does not reference a step of the test case")));
}

#[test]
fn executions_round_trip_step_results() {
    let t = transformer();
    let source = json!({
        "id": "EX-100",
        "testId": "TC-COMPLEX-001",
        "status": "FAILED",
        "comment": "login broke on step 3",
        "environment": "staging",
        "executedOn": "2025-01-20T10:00:00Z",
        "timeSpentInSeconds": 42.5,
        "stepResults": [
            {"stepId": "step1", "index": 1, "status": "PASSED", "actualResult": "page shown"},
            {"stepId": "step2", "index": 2, "status": "PASSED", "actualResult": "accepted"},
            {"stepId": "step3", "index": 3, "status": "FAILED", "actualResult": "error toast", "comment": "see BUG-123"},
        ],
        "defects": [{"id": "BUG-123"}],
    });

    let qtest = t
        .transform("zephyr", "qtest", EntityType::TestExecution, &source, None)
        .unwrap();
    assert_eq!(qtest["status"]["name"], json!("FAILED"));
    assert_eq!(qtest["test_step_logs"].as_array().unwrap().len(), 3);
    assert_eq!(qtest["test_step_logs"][2]["note"], json!("see BUG-123"));
    assert_eq!(qtest["defects"], json!([{"id": "BUG-123"}]));

    let back = t
        .transform("qtest", "zephyr", EntityType::TestExecution, &qtest, None)
        .unwrap();
    assert_eq!(back["status"], json!("FAILED"));
    assert_eq!(back["comment"], json!("login broke on step 3"));
    assert_eq!(back["stepResults"].as_array().unwrap().len(), 3);
    assert_eq!(back["stepResults"][0]["stepId"], json!("step1"));
}
