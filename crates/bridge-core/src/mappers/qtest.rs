//! qTest mappers.
//!
//! qTest keeps structural fields either top-level or inside a
//! `properties` list of `{field_name, field_value, field_id}` objects;
//! the reader accepts both. The writer emits structural fields top-level
//! (numeric status and priority codes, millisecond timestamps) and uses
//! `properties` for custom fields only.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::canonical::{
    normalize_step_order, Attachment, CanonicalEntity, CustomField, StepResult, Tag, TestCase,
    TestCycle, TestExecution, TestStep, TestSuite, User,
};
use crate::context::TransformationContext;
use crate::mapper::{Mapper, MapperError, MapperRegistry, Result};
use crate::mappers::{
    array_of, as_object, datetime_of, f64_of, non_empty_string, string_of, string_or_empty, u64_of,
};
use crate::types::{EntityType, ExecutionStatus, FieldType, Priority, TestCaseStatus};

pub const SYSTEM_NAME: &str = "qtest";

/// Fields kept first-class on the canonical model and therefore never
/// round-tripped through custom fields.
const STRUCTURAL_FIELDS: [&str; 4] = ["priority", "status", "objective", "precondition"];

/// Register all qTest mappers.
pub fn register(registry: &mut MapperRegistry) {
    registry.register(Arc::new(QTestTestCaseMapper));
    registry.register(Arc::new(QTestTestExecutionMapper));
    registry.register(Arc::new(QTestTestSuiteMapper));
    registry.register(Arc::new(QTestTestCycleMapper));
}

// --- Status and priority tables ---

fn status_to_canonical(s: &str) -> Option<TestCaseStatus> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "unapproved" | "draft" | "4" | "needs work" | "needs update" => {
            Some(TestCaseStatus::Draft)
        }
        "2" | "5" | "ready" | "ready to review" | "ready for review" => Some(TestCaseStatus::Ready),
        "3" | "approved" => Some(TestCaseStatus::Approved),
        "6" | "deprecated" | "obsolete" => Some(TestCaseStatus::Deprecated),
        _ => None,
    }
}

fn status_from_canonical(status: TestCaseStatus) -> u32 {
    match status {
        TestCaseStatus::Draft => 1,
        TestCaseStatus::Ready => 5,
        TestCaseStatus::Approved => 3,
        // qTest has no archive state; both land on deprecated.
        TestCaseStatus::Deprecated | TestCaseStatus::Archived => 6,
    }
}

fn priority_to_canonical(s: &str) -> Option<Priority> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "high" => Some(Priority::High),
        "2" | "critical" | "urgent" => Some(Priority::Critical),
        "3" | "medium" => Some(Priority::Medium),
        "4" | "low" => Some(Priority::Low),
        _ => None,
    }
}

fn priority_from_canonical(priority: Priority) -> u32 {
    match priority {
        Priority::High => 1,
        Priority::Critical => 2,
        Priority::Medium => 3,
        Priority::Low => 4,
    }
}

fn execution_status_to_canonical(s: &str) -> Option<ExecutionStatus> {
    match s.to_ascii_uppercase().as_str() {
        "PASS" | "PASSED" => Some(ExecutionStatus::Passed),
        "FAIL" | "FAILED" => Some(ExecutionStatus::Failed),
        "BLOCK" | "BLOCKED" => Some(ExecutionStatus::Blocked),
        "NOT_EXECUTED" | "UNEXECUTED" => Some(ExecutionStatus::NotExecuted),
        "INCOMPLETE" | "IN_PROGRESS" => Some(ExecutionStatus::InProgress),
        "SKIP" | "SKIPPED" => Some(ExecutionStatus::Skipped),
        _ => None,
    }
}

fn execution_status_from_canonical(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::InProgress => "INCOMPLETE",
        other => other.as_str(),
    }
}

// --- Property helpers ---

fn property_value<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let properties = map.get("properties")?.as_array()?;
    properties
        .iter()
        .filter_map(Value::as_object)
        .find(|prop| {
            prop.get("field_name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|prop| prop.get("field_value"))
}

fn property_string(map: &Map<String, Value>, name: &str) -> Option<String> {
    match property_value(map, name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Structural field read: top-level key first, then the property form.
fn structural_string(map: &Map<String, Value>, key: &str, property: &str) -> Option<String> {
    string_of(map, &[key]).or_else(|| property_string(map, property))
}

// --- Shared fragment parsing ---

fn map_attachment(value: &Value) -> Result<Attachment> {
    let map = as_object(value, "qtest attachment")?;
    Ok(Attachment {
        id: string_or_empty(map, &["id"]),
        file_name: string_or_empty(map, &["name"]),
        file_type: string_of(map, &["content_type"])
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        size: u64_of(map, &["size"]).unwrap_or(0),
        // Filled by the binary store, not here.
        storage_location: String::new(),
        description: string_of(map, &["description"]),
        uploaded_by: string_of(map, &["created_by"]),
        uploaded_at: datetime_of(map, &["created_date"])?,
        ..Attachment::default()
    })
}

fn map_attachments(map: &Map<String, Value>) -> Result<Vec<Attachment>> {
    let Some(arr) = array_of(map, &["attachments"]) else {
        return Ok(Vec::new());
    };
    arr.iter().map(map_attachment).collect()
}

fn attachment_json(attachment: &Attachment) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), json!(attachment.id));
    out.insert("name".to_string(), json!(attachment.file_name));
    out.insert("content_type".to_string(), json!(attachment.file_type));
    out.insert("size".to_string(), json!(attachment.size));
    if !attachment.storage_location.is_empty() {
        out.insert("url".to_string(), json!(attachment.storage_location));
    }
    if let Some(description) = &attachment.description {
        out.insert("description".to_string(), json!(description));
    }
    Value::Object(out)
}

fn map_user_object(map: &Map<String, Value>, key: &str) -> Option<User> {
    match map.get(key) {
        Some(Value::Object(user)) => Some(User {
            id: string_or_empty(user, &["id"]),
            username: string_of(user, &["username"]),
            email: string_of(user, &["email"]),
            display_name: string_of(user, &["display_name"]),
        }),
        Some(Value::String(s)) if !s.is_empty() => Some(User {
            id: s.clone(),
            username: Some(s.clone()),
            email: s.contains('@').then(|| s.clone()),
            display_name: None,
        }),
        _ => None,
    }
}

// --- Test case mapper ---

#[derive(Debug)]
pub struct QTestTestCaseMapper;

impl QTestTestCaseMapper {
    fn map_steps(&self, arr: &[Value]) -> Result<Vec<TestStep>> {
        let mut steps = Vec::with_capacity(arr.len());
        for (i, value) in arr.iter().enumerate() {
            let map = as_object(value, "qtest step")?;
            let data = string_of(map, &["test_data"]);
            let mut step = TestStep {
                id: string_of(map, &["id"]).unwrap_or_else(|| format!("step-{}", i + 1)),
                order: u64_of(map, &["order"]).unwrap_or(0) as u32,
                action: string_or_empty(map, &["description"]),
                expected_result: string_or_empty(map, &["expected_result"]),
                is_data_driven: data.as_deref().is_some_and(|d| !d.is_empty()),
                data,
                ..TestStep::default()
            };
            step.attachments = map_attachments(map)?;
            steps.push(step);
        }
        normalize_step_order(&mut steps);
        Ok(steps)
    }

    fn map_custom_fields(&self, map: &Map<String, Value>) -> Vec<CustomField> {
        let Some(properties) = array_of(map, &["properties"]) else {
            return Vec::new();
        };
        properties
            .iter()
            .filter_map(Value::as_object)
            .filter(|prop| {
                let name = prop.get("field_name").and_then(Value::as_str).unwrap_or("");
                !STRUCTURAL_FIELDS
                    .iter()
                    .any(|s| name.eq_ignore_ascii_case(s))
            })
            .map(|prop| {
                let value = prop.get("field_value").cloned().unwrap_or(Value::Null);
                let mut field = CustomField::new(string_or_empty(prop, &["field_name"]), value);
                field.field_id = non_empty_string(prop, &["field_id"]);
                if let Some(declared) = prop.get("field_type").and_then(Value::as_str) {
                    if let Ok(parsed) =
                        serde_json::from_value::<FieldType>(json!(declared.to_ascii_uppercase()))
                    {
                        field.field_type = parsed;
                    }
                }
                field
            })
            .collect()
    }

    fn status_value(map: &Map<String, Value>) -> Option<String> {
        structural_string(map, "status", "Status")
    }

    fn priority_value(map: &Map<String, Value>) -> Option<String> {
        structural_string(map, "priority", "Priority")
    }
}

impl Mapper for QTestTestCaseMapper {
    fn system_name(&self) -> &str {
        SYSTEM_NAME
    }

    fn entity_type(&self) -> EntityType {
        EntityType::TestCase
    }

    fn to_canonical(
        &self,
        source: &Value,
        _context: &TransformationContext,
    ) -> Result<CanonicalEntity> {
        let map = as_object(source, "qtest test case")?;

        let status = Self::status_value(map)
            .and_then(|s| status_to_canonical(&s))
            .unwrap_or_default();
        let priority = Self::priority_value(map)
            .and_then(|s| priority_to_canonical(&s))
            .unwrap_or_default();

        let description = string_of(map, &["description"]);
        let mut case = TestCase {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["name"]),
            objective: property_string(map, "Objective")
                .or_else(|| description.clone())
                .unwrap_or_default(),
            status,
            priority,
            source_system: Some(SYSTEM_NAME.to_string()),
            external_id: non_empty_string(map, &["pid"]),
            description,
            preconditions: string_of(map, &["precondition"])
                .or_else(|| property_string(map, "Precondition")),
            folder_path: string_of(map, &["path"]).or_else(|| string_of(map, &["parent_id"])),
            created_at: datetime_of(map, &["created_date"])?,
            updated_at: datetime_of(map, &["last_modified_date"])?,
            owner: map_user_object(map, "created_by"),
            updated_by: map_user_object(map, "last_modified_by"),
            version: string_of(map, &["version"]),
            is_latest_version: true,
            ..TestCase::default()
        };

        if let Some(steps) = array_of(map, &["test_steps"]) {
            case.test_steps = self.map_steps(steps)?;
        }
        if let Some(tags) = array_of(map, &["tags"]) {
            case.tags = tags
                .iter()
                .filter_map(Value::as_str)
                .map(|name| Tag {
                    name: name.to_string(),
                    ..Tag::default()
                })
                .collect();
        }
        case.attachments = map_attachments(map)?;
        case.custom_fields = self.map_custom_fields(map);

        Ok(CanonicalEntity::TestCase(case))
    }

    fn from_canonical(
        &self,
        canonical: &CanonicalEntity,
        _context: &TransformationContext,
    ) -> Result<Value> {
        let CanonicalEntity::TestCase(case) = canonical else {
            return Err(MapperError::EntityMismatch {
                expected: EntityType::TestCase,
                actual: canonical.entity_type(),
            });
        };

        let mut out = Map::new();
        if !case.id.is_empty() {
            out.insert("id".to_string(), json!(case.id));
        }
        if let Some(pid) = &case.external_id {
            out.insert("pid".to_string(), json!(pid));
        }
        out.insert("name".to_string(), json!(case.name));
        out.insert(
            "description".to_string(),
            json!(case.description.clone().unwrap_or_default()),
        );
        out.insert(
            "precondition".to_string(),
            json!(case.preconditions.clone().unwrap_or_default()),
        );
        out.insert(
            "status".to_string(),
            json!(status_from_canonical(case.status)),
        );
        out.insert(
            "priority".to_string(),
            json!(priority_from_canonical(case.priority)),
        );
        if let Some(folder) = &case.folder_path {
            out.insert("path".to_string(), json!(folder));
            if let Ok(parent) = folder.parse::<i64>() {
                out.insert("parent_id".to_string(), json!(parent));
            }
        }

        let steps: Vec<Value> = case
            .test_steps
            .iter()
            .map(|step| {
                json!({
                    "id": step.id,
                    "order": step.order,
                    "description": step.action,
                    "expected_result": step.expected_result,
                    "test_data": step.data.clone().unwrap_or_default(),
                })
            })
            .collect();
        out.insert("test_steps".to_string(), Value::Array(steps));

        let properties: Vec<Value> = case
            .custom_fields
            .iter()
            .filter(|field| {
                !STRUCTURAL_FIELDS
                    .iter()
                    .any(|s| field.name.eq_ignore_ascii_case(s))
            })
            .map(|field| {
                let mut prop = Map::new();
                prop.insert("field_name".to_string(), json!(field.name));
                prop.insert("field_value".to_string(), field.value.clone());
                prop.insert("field_type".to_string(), json!(field.field_type.as_str()));
                if let Some(field_id) = &field.field_id {
                    prop.insert("field_id".to_string(), json!(field_id));
                }
                Value::Object(prop)
            })
            .collect();
        out.insert("properties".to_string(), Value::Array(properties));

        if !case.tags.is_empty() {
            let tags: Vec<&str> = case.tags.iter().map(|t| t.name.as_str()).collect();
            out.insert("tags".to_string(), json!(tags));
        }
        if !case.attachments.is_empty() {
            let attachments: Vec<Value> = case.attachments.iter().map(attachment_json).collect();
            out.insert("attachments".to_string(), Value::Array(attachments));
        }
        if let Some(created) = case.created_at {
            out.insert("created_date".to_string(), json!(created.timestamp_millis()));
        }
        if let Some(updated) = case.updated_at {
            out.insert(
                "last_modified_date".to_string(),
                json!(updated.timestamp_millis()),
            );
        }
        if let Some(version) = &case.version {
            out.insert("version".to_string(), json!(version));
        }
        if let Some(owner) = &case.owner {
            out.insert(
                "created_by".to_string(),
                json!({
                    "id": owner.id,
                    "email": owner.email.clone().unwrap_or_default(),
                }),
            );
        }

        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "qtest test case") else {
            return vec!["source payload is not a JSON object".to_string()];
        };
        let CanonicalEntity::TestCase(case) = canonical else {
            return vec![format!(
                "expected a test-case entity, got {}",
                canonical.entity_type()
            )];
        };

        if case.id.is_empty() && map.contains_key("id") {
            messages.push("ID was not properly mapped".to_string());
        }
        if case.name.is_empty() && map.contains_key("name") {
            messages.push("Name was not properly mapped".to_string());
        }
        if let Some(steps) = array_of(map, &["test_steps"]) {
            if steps.len() != case.test_steps.len() {
                messages.push(format!(
                    "step count mismatch: {} in source, {} in target",
                    steps.len(),
                    case.test_steps.len()
                ));
            }
        }
        if let Some(status) = Self::status_value(map) {
            if status_to_canonical(&status).is_none() {
                messages.push(format!("unknown status '{status}' defaulted to DRAFT"));
            }
        }
        if let Some(priority) = Self::priority_value(map) {
            if priority_to_canonical(&priority).is_none() {
                messages.push(format!("unknown priority '{priority}' defaulted to MEDIUM"));
            }
        }
        messages
    }
}

// --- Test execution mapper ---

#[derive(Debug)]
pub struct QTestTestExecutionMapper;

impl QTestTestExecutionMapper {
    /// A qTest execution is a test run plus its log; accept the nested
    /// shape or an already-flattened log.
    fn split_source<'a>(
        source: &'a Map<String, Value>,
    ) -> (&'a Map<String, Value>, &'a Map<String, Value>) {
        let test_run = source
            .get("test_run")
            .and_then(Value::as_object)
            .unwrap_or(source);
        let test_log = source
            .get("test_log")
            .and_then(Value::as_object)
            .or_else(|| test_run.get("latest_test_log").and_then(Value::as_object))
            .unwrap_or(test_run);
        (test_run, test_log)
    }

    fn status_name(map: &Map<String, Value>) -> Option<String> {
        match map.get("status") {
            Some(Value::Object(status)) => string_of(status, &["name"]),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn map_step_results(&self, arr: &[Value]) -> Result<Vec<StepResult>> {
        let mut results = Vec::with_capacity(arr.len());
        for (i, value) in arr.iter().enumerate() {
            let map = as_object(value, "qtest step log")?;
            let mut result = StepResult {
                step_id: string_or_empty(map, &["test_step_id"]),
                sequence: u64_of(map, &["order"]).unwrap_or(i as u64 + 1) as u32,
                status: Self::status_name(map)
                    .and_then(|s| execution_status_to_canonical(&s))
                    .unwrap_or_default(),
                actual_result: string_of(map, &["actual_result"]),
                notes: string_of(map, &["note"]),
                ..StepResult::default()
            };
            result.attachments = map_attachments(map)?;
            results.push(result);
        }
        Ok(results)
    }
}

impl Mapper for QTestTestExecutionMapper {
    fn system_name(&self) -> &str {
        SYSTEM_NAME
    }

    fn entity_type(&self) -> EntityType {
        EntityType::TestExecution
    }

    fn to_canonical(
        &self,
        source: &Value,
        _context: &TransformationContext,
    ) -> Result<CanonicalEntity> {
        let map = as_object(source, "qtest test execution")?;
        let (test_run, test_log) = Self::split_source(map);

        let test_case_id = test_run
            .get("test_case")
            .and_then(Value::as_object)
            .and_then(|c| string_of(c, &["id"]))
            .or_else(|| string_of(test_log, &["test_case_id"]))
            .unwrap_or_default();

        let mut execution = TestExecution {
            id: string_of(test_log, &["id"])
                .or_else(|| string_of(test_run, &["id"]))
                .unwrap_or_default(),
            test_case_id,
            status: Self::status_name(test_log)
                .and_then(|s| execution_status_to_canonical(&s))
                .unwrap_or_default(),
            source_system: Some(SYSTEM_NAME.to_string()),
            environment: property_string(test_log, "Environment"),
            start_time: datetime_of(test_log, &["execution_date"])?,
            execution_time: f64_of(test_log, &["execution_time_seconds"]),
            executed_by: map_user_object(test_log, "executed_by"),
            notes: string_of(test_log, &["note"]),
            test_cycle_id: test_run
                .get("test_cycle")
                .and_then(Value::as_object)
                .and_then(|c| string_of(c, &["id"])),
            ..TestExecution::default()
        };

        if let Some(logs) = array_of(test_log, &["test_step_logs"]) {
            execution.step_results = self.map_step_results(logs)?;
        }
        execution.attachments = map_attachments(test_log)?;
        if let Some(defects) = array_of(test_log, &["defects"]) {
            execution.defects = defects
                .iter()
                .filter_map(|d| match d {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => string_of(o, &["id"]),
                    _ => None,
                })
                .collect();
        }

        Ok(CanonicalEntity::TestExecution(execution))
    }

    fn from_canonical(
        &self,
        canonical: &CanonicalEntity,
        _context: &TransformationContext,
    ) -> Result<Value> {
        let CanonicalEntity::TestExecution(execution) = canonical else {
            return Err(MapperError::EntityMismatch {
                expected: EntityType::TestExecution,
                actual: canonical.entity_type(),
            });
        };

        let mut out = Map::new();
        if !execution.id.is_empty() {
            out.insert("id".to_string(), json!(execution.id));
        }
        out.insert(
            "status".to_string(),
            json!({ "name": execution_status_from_canonical(execution.status) }),
        );
        out.insert(
            "note".to_string(),
            json!(execution.notes.clone().unwrap_or_default()),
        );
        if !execution.test_case_id.is_empty() {
            out.insert("test_case_id".to_string(), json!(execution.test_case_id));
        }

        let mut properties = Vec::new();
        if let Some(environment) = &execution.environment {
            properties.push(json!({
                "field_name": "Environment",
                "field_value": environment,
            }));
        }
        out.insert("properties".to_string(), Value::Array(properties));

        if let Some(start) = execution.start_time {
            out.insert(
                "execution_date".to_string(),
                json!(start.timestamp_millis()),
            );
        }
        if let Some(executed_by) = &execution.executed_by {
            out.insert("executed_by".to_string(), json!(executed_by.id));
        }
        if let Some(duration) = execution.execution_time {
            out.insert("execution_time_seconds".to_string(), json!(duration));
        }
        if !execution.step_results.is_empty() {
            let logs: Vec<Value> = execution
                .step_results
                .iter()
                .map(|result| {
                    json!({
                        "test_step_id": result.step_id,
                        "order": result.sequence,
                        "status": { "name": execution_status_from_canonical(result.status) },
                        "actual_result": result.actual_result.clone().unwrap_or_default(),
                        "note": result.notes.clone().unwrap_or_default(),
                    })
                })
                .collect();
            out.insert("test_step_logs".to_string(), Value::Array(logs));
        }
        if !execution.defects.is_empty() {
            let defects: Vec<Value> = execution
                .defects
                .iter()
                .map(|id| json!({ "id": id }))
                .collect();
            out.insert("defects".to_string(), Value::Array(defects));
        }

        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "qtest test execution") else {
            return vec!["source payload is not a JSON object".to_string()];
        };
        let CanonicalEntity::TestExecution(execution) = canonical else {
            return vec![format!(
                "expected a test-execution entity, got {}",
                canonical.entity_type()
            )];
        };
        let (test_run, test_log) = Self::split_source(map);

        if execution.id.is_empty() && (test_log.contains_key("id") || test_run.contains_key("id")) {
            messages.push("ID was not properly mapped".to_string());
        }
        if execution.test_case_id.is_empty()
            && (test_run.contains_key("test_case") || test_log.contains_key("test_case_id"))
        {
            messages.push("Test case ID was not properly mapped".to_string());
        }
        if let Some(logs) = array_of(test_log, &["test_step_logs"]) {
            if logs.len() != execution.step_results.len() {
                messages.push(format!(
                    "step result count mismatch: {} in source, {} in target",
                    logs.len(),
                    execution.step_results.len()
                ));
            }
        }
        messages
    }
}

// --- Test suite (module) mapper ---

#[derive(Debug)]
pub struct QTestTestSuiteMapper;

impl Mapper for QTestTestSuiteMapper {
    fn system_name(&self) -> &str {
        SYSTEM_NAME
    }

    fn entity_type(&self) -> EntityType {
        EntityType::TestSuite
    }

    fn to_canonical(
        &self,
        source: &Value,
        _context: &TransformationContext,
    ) -> Result<CanonicalEntity> {
        let map = as_object(source, "qtest test suite")?;
        let mut suite = TestSuite {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["name"]),
            source_system: Some(SYSTEM_NAME.to_string()),
            external_id: non_empty_string(map, &["pid"]),
            description: string_of(map, &["description"]),
            parent_id: non_empty_string(map, &["parent_id"]),
            path: string_of(map, &["path"]),
            ..TestSuite::default()
        };
        if let Some(ids) = array_of(map, &["test_case_ids"]) {
            suite.test_case_ids = ids
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
        }
        Ok(CanonicalEntity::TestSuite(suite))
    }

    fn from_canonical(
        &self,
        canonical: &CanonicalEntity,
        _context: &TransformationContext,
    ) -> Result<Value> {
        let CanonicalEntity::TestSuite(suite) = canonical else {
            return Err(MapperError::EntityMismatch {
                expected: EntityType::TestSuite,
                actual: canonical.entity_type(),
            });
        };
        let mut out = Map::new();
        if !suite.id.is_empty() {
            out.insert("id".to_string(), json!(suite.id));
        }
        if let Some(pid) = &suite.external_id {
            out.insert("pid".to_string(), json!(pid));
        }
        out.insert("name".to_string(), json!(suite.name));
        if let Some(description) = &suite.description {
            out.insert("description".to_string(), json!(description));
        }
        if let Some(parent) = &suite.parent_id {
            out.insert("parent_id".to_string(), json!(parent));
        }
        if let Some(path) = &suite.path {
            out.insert("path".to_string(), json!(path));
        }
        out.insert("test_case_ids".to_string(), json!(suite.test_case_ids));
        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "qtest test suite") else {
            return vec!["source payload is not a JSON object".to_string()];
        };
        let CanonicalEntity::TestSuite(suite) = canonical else {
            return vec![format!(
                "expected a test-suite entity, got {}",
                canonical.entity_type()
            )];
        };
        if suite.id.is_empty() && map.contains_key("id") {
            messages.push("ID was not properly mapped".to_string());
        }
        if suite.name.is_empty() && map.contains_key("name") {
            messages.push("Name was not properly mapped".to_string());
        }
        messages
    }
}

// --- Test cycle mapper ---

#[derive(Debug)]
pub struct QTestTestCycleMapper;

impl Mapper for QTestTestCycleMapper {
    fn system_name(&self) -> &str {
        SYSTEM_NAME
    }

    fn entity_type(&self) -> EntityType {
        EntityType::TestCycle
    }

    fn to_canonical(
        &self,
        source: &Value,
        _context: &TransformationContext,
    ) -> Result<CanonicalEntity> {
        let map = as_object(source, "qtest test cycle")?;
        let mut cycle = TestCycle {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["name"]),
            status: string_or_empty(map, &["status"]),
            source_system: Some(SYSTEM_NAME.to_string()),
            external_id: non_empty_string(map, &["pid"]),
            description: string_of(map, &["description"]),
            environment: property_string(map, "Environment"),
            start_date: datetime_of(map, &["start_date"])?,
            end_date: datetime_of(map, &["end_date"])?,
            ..TestCycle::default()
        };
        if let Some(ids) = array_of(map, &["test_case_ids"]) {
            cycle.test_case_ids = ids
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
        }
        if let Some(ids) = array_of(map, &["execution_ids"]) {
            cycle.execution_ids = ids
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
        }
        Ok(CanonicalEntity::TestCycle(cycle))
    }

    fn from_canonical(
        &self,
        canonical: &CanonicalEntity,
        _context: &TransformationContext,
    ) -> Result<Value> {
        let CanonicalEntity::TestCycle(cycle) = canonical else {
            return Err(MapperError::EntityMismatch {
                expected: EntityType::TestCycle,
                actual: canonical.entity_type(),
            });
        };
        let mut out = Map::new();
        if !cycle.id.is_empty() {
            out.insert("id".to_string(), json!(cycle.id));
        }
        if let Some(pid) = &cycle.external_id {
            out.insert("pid".to_string(), json!(pid));
        }
        out.insert("name".to_string(), json!(cycle.name));
        if !cycle.status.is_empty() {
            out.insert("status".to_string(), json!(cycle.status));
        }
        if let Some(description) = &cycle.description {
            out.insert("description".to_string(), json!(description));
        }
        if let Some(start) = cycle.start_date {
            out.insert("start_date".to_string(), json!(start.timestamp_millis()));
        }
        if let Some(end) = cycle.end_date {
            out.insert("end_date".to_string(), json!(end.timestamp_millis()));
        }
        out.insert("test_case_ids".to_string(), json!(cycle.test_case_ids));
        if !cycle.execution_ids.is_empty() {
            out.insert("execution_ids".to_string(), json!(cycle.execution_ids));
        }
        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "qtest test cycle") else {
            return vec!["source payload is not a JSON object".to_string()];
        };
        let CanonicalEntity::TestCycle(cycle) = canonical else {
            return vec![format!(
                "expected a test-cycle entity, got {}",
                canonical.entity_type()
            )];
        };
        if cycle.id.is_empty() && map.contains_key("id") {
            messages.push("ID was not properly mapped".to_string());
        }
        if cycle.name.is_empty() && map.contains_key("name") {
            messages.push("Name was not properly mapped".to_string());
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn context() -> TransformationContext {
        TransformationContext::new("qtest", "zephyr")
    }

    #[test]
    fn priority_codes_are_idempotent_on_the_closed_table() {
        for (code, priority) in [
            ("1", Priority::High),
            ("2", Priority::Critical),
            ("3", Priority::Medium),
            ("4", Priority::Low),
        ] {
            assert_eq!(priority_to_canonical(code), Some(priority));
            assert_eq!(priority_from_canonical(priority).to_string(), code);
        }
        assert_eq!(priority_to_canonical("HIGH"), Some(Priority::High));
        assert_eq!(priority_to_canonical("7"), None);
    }

    #[test]
    fn status_accepts_codes_and_string_forms() {
        assert_eq!(status_to_canonical("3"), Some(TestCaseStatus::Approved));
        assert_eq!(
            status_to_canonical("Ready for Review"),
            Some(TestCaseStatus::Ready)
        );
        assert_eq!(status_to_canonical("obsolete"), Some(TestCaseStatus::Deprecated));
        assert_eq!(status_to_canonical("weird"), None);
        assert_eq!(status_from_canonical(TestCaseStatus::Archived), 6);
    }

    #[test]
    fn structural_properties_are_not_custom_fields() {
        let source = json!({
            "id": 42,
            "name": "Login",
            "properties": [
                {"field_name": "Priority", "field_value": "1"},
                {"field_name": "Status", "field_value": "approved"},
                {"field_name": "Objective", "field_value": "verify login"},
                {"field_name": "Risk", "field_value": "Medium", "field_id": 901},
            ],
        });
        let entity = QTestTestCaseMapper.to_canonical(&source, &context()).unwrap();
        let CanonicalEntity::TestCase(case) = entity else {
            unreachable!()
        };
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.status, TestCaseStatus::Approved);
        assert_eq!(case.objective, "verify login");
        assert_eq!(case.custom_fields.len(), 1);
        assert_eq!(case.custom_fields[0].name, "Risk");
        assert_eq!(case.custom_fields[0].field_id.as_deref(), Some("901"));
    }

    #[test]
    fn emission_puts_structural_fields_top_level() {
        let case = TestCase {
            id: "TC-1".to_string(),
            name: "Login".to_string(),
            priority: Priority::High,
            status: TestCaseStatus::Ready,
            preconditions: Some("logged out".to_string()),
            custom_fields: vec![CustomField::new("Risk", json!("Medium"))],
            ..TestCase::default()
        };
        let emitted = QTestTestCaseMapper
            .from_canonical(&CanonicalEntity::TestCase(case), &context())
            .unwrap();
        assert_eq!(emitted["priority"], json!(1));
        assert_eq!(emitted["status"], json!(5));
        assert_eq!(emitted["precondition"], json!("logged out"));
        let properties = emitted["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0]["field_name"], json!("Risk"));
    }

    #[test]
    fn dates_emit_as_millisecond_epochs() {
        let created: DateTime<Utc> = DateTime::parse_from_rfc3339("2025-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let case = TestCase {
            id: "TC-1".to_string(),
            name: "t".to_string(),
            created_at: Some(created),
            ..TestCase::default()
        };
        let emitted = QTestTestCaseMapper
            .from_canonical(&CanonicalEntity::TestCase(case), &context())
            .unwrap();
        assert_eq!(emitted["created_date"], json!(1_735_718_400_000_i64));
    }

    #[test]
    fn execution_accepts_nested_run_and_log() {
        let source = json!({
            "test_run": {
                "id": 7001,
                "test_case": {"id": 42},
                "test_cycle": {"id": 3},
            },
            "test_log": {
                "id": 9001,
                "status": {"name": "PASSED"},
                "note": "all good",
                "execution_date": 1_735_718_400_000_i64,
                "test_step_logs": [
                    {"test_step_id": "s1", "order": 1, "status": {"name": "PASSED"}},
                ],
            },
        });
        let entity = QTestTestExecutionMapper
            .to_canonical(&source, &context())
            .unwrap();
        let CanonicalEntity::TestExecution(execution) = entity else {
            unreachable!()
        };
        assert_eq!(execution.id, "9001");
        assert_eq!(execution.test_case_id, "42");
        assert_eq!(execution.test_cycle_id.as_deref(), Some("3"));
        assert_eq!(execution.status, ExecutionStatus::Passed);
        assert_eq!(execution.step_results.len(), 1);
    }

    #[test]
    fn in_progress_maps_to_incomplete_and_back() {
        assert_eq!(
            execution_status_to_canonical("INCOMPLETE"),
            Some(ExecutionStatus::InProgress)
        );
        assert_eq!(
            execution_status_from_canonical(ExecutionStatus::InProgress),
            "INCOMPLETE"
        );
    }

    #[test]
    fn suite_round_trips_references() {
        let source = json!({
            "id": 11,
            "pid": "MD-11",
            "name": "Auth module",
            "parent_id": 2,
            "test_case_ids": [42, 43],
        });
        let entity = QTestTestSuiteMapper.to_canonical(&source, &context()).unwrap();
        let emitted = QTestTestSuiteMapper.from_canonical(&entity, &context()).unwrap();
        assert_eq!(emitted["name"], json!("Auth module"));
        assert_eq!(emitted["test_case_ids"], json!(["42", "43"]));
        assert_eq!(emitted["parent_id"], json!("2"));
    }
}
