//! Zephyr Scale mappers.
//!
//! The reader accepts both key spellings Zephyr payloads show up in: the
//! REST one (`folderPath`, `steps[].index`, `customFields`, `createdOn`)
//! and the export one (`folder_path`, `steps[].order`, `custom_fields`,
//! `created_at`). The writer emits the export spelling.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::canonical::{
    normalize_step_order, Attachment, CanonicalEntity, CustomField, Link, StepResult, Tag,
    TestCase, TestCycle, TestExecution, TestStep, TestSuite, User,
};
use crate::context::TransformationContext;
use crate::mapper::{Mapper, MapperError, MapperRegistry, Result};
use crate::mappers::{
    array_of, as_object, datetime_of, f64_of, iso_utc, non_empty_string, string_of,
    string_or_empty, u64_of,
};
use crate::types::{EntityType, ExecutionStatus, Priority, TestCaseStatus};

pub const SYSTEM_NAME: &str = "zephyr";

/// Register all Zephyr Scale mappers.
pub fn register(registry: &mut MapperRegistry) {
    registry.register(Arc::new(ZephyrTestCaseMapper));
    registry.register(Arc::new(ZephyrTestExecutionMapper));
    registry.register(Arc::new(ZephyrTestSuiteMapper));
    registry.register(Arc::new(ZephyrTestCycleMapper));
}

// --- Status and priority tables ---

fn status_to_canonical(s: &str) -> Option<TestCaseStatus> {
    match s.to_ascii_uppercase().as_str() {
        "DRAFT" => Some(TestCaseStatus::Draft),
        "READY" => Some(TestCaseStatus::Ready),
        "APPROVED" => Some(TestCaseStatus::Approved),
        "DEPRECATED" | "OBSOLETE" => Some(TestCaseStatus::Deprecated),
        "ARCHIVED" => Some(TestCaseStatus::Archived),
        _ => None,
    }
}

fn status_from_canonical(status: TestCaseStatus) -> &'static str {
    status.as_str()
}

fn priority_to_canonical(s: &str) -> Option<Priority> {
    match s.to_ascii_uppercase().as_str() {
        "LOW" => Some(Priority::Low),
        "MEDIUM" => Some(Priority::Medium),
        "HIGH" => Some(Priority::High),
        "CRITICAL" | "HIGHEST" => Some(Priority::Critical),
        _ => None,
    }
}

fn priority_from_canonical(priority: Priority) -> &'static str {
    priority.as_str()
}

fn execution_status_to_canonical(s: &str) -> Option<ExecutionStatus> {
    match s.to_ascii_uppercase().as_str() {
        "PASS" | "PASSED" => Some(ExecutionStatus::Passed),
        "FAIL" | "FAILED" => Some(ExecutionStatus::Failed),
        "BLOCK" | "BLOCKED" => Some(ExecutionStatus::Blocked),
        "NOT_EXECUTED" | "UNEXECUTED" => Some(ExecutionStatus::NotExecuted),
        "IN_PROGRESS" => Some(ExecutionStatus::InProgress),
        "SKIP" | "SKIPPED" => Some(ExecutionStatus::Skipped),
        _ => None,
    }
}

fn execution_status_from_canonical(status: ExecutionStatus) -> &'static str {
    status.as_str()
}

// --- Shared fragment parsing ---

fn map_attachment(value: &Value) -> Result<Attachment> {
    let map = as_object(value, "zephyr attachment")?;
    Ok(Attachment {
        id: string_or_empty(map, &["id"]),
        file_name: string_or_empty(map, &["filename", "fileName", "file_name"]),
        file_type: string_of(map, &["file_type", "contentType", "content_type"])
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        size: u64_of(map, &["size", "fileSize", "file_size"]).unwrap_or(0),
        // Filled by the binary store, not here.
        storage_location: String::new(),
        description: string_of(map, &["description", "comment"]),
        uploaded_by: string_of(map, &["created_by", "createdBy"]),
        uploaded_at: datetime_of(map, &["created_at", "createdOn"])?,
        ..Attachment::default()
    })
}

fn map_attachments(map: &Map<String, Value>) -> Result<Vec<Attachment>> {
    let Some(arr) = array_of(map, &["attachments"]) else {
        return Ok(Vec::new());
    };
    arr.iter().map(map_attachment).collect()
}

fn map_user(value: Option<String>) -> Option<User> {
    let s = value.filter(|s| !s.is_empty())?;
    let email = s.contains('@').then(|| s.clone());
    Some(User {
        id: s.clone(),
        username: Some(s),
        email,
        display_name: None,
    })
}

fn attachment_json(attachment: &Attachment) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), json!(attachment.id));
    out.insert("filename".to_string(), json!(attachment.file_name));
    out.insert("file_type".to_string(), json!(attachment.file_type));
    out.insert("size".to_string(), json!(attachment.size));
    if let Some(description) = &attachment.description {
        out.insert("description".to_string(), json!(description));
    }
    if !attachment.storage_location.is_empty() {
        out.insert("url".to_string(), json!(attachment.storage_location));
    }
    Value::Object(out)
}

// --- Test case mapper ---

#[derive(Debug)]
pub struct ZephyrTestCaseMapper;

impl ZephyrTestCaseMapper {
    fn map_steps(&self, arr: &[Value]) -> Result<Vec<TestStep>> {
        let mut steps = Vec::with_capacity(arr.len());
        for (i, value) in arr.iter().enumerate() {
            let map = as_object(value, "zephyr step")?;
            let data = string_of(map, &["test_data", "testData"]);
            let mut step = TestStep {
                id: string_of(map, &["id"]).unwrap_or_else(|| format!("step-{}", i + 1)),
                order: u64_of(map, &["order", "index"]).unwrap_or(0) as u32,
                action: string_or_empty(map, &["action", "description"]),
                expected_result: string_or_empty(map, &["expected_result", "expectedResult"]),
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
        let Some(fields) = map
            .get("custom_fields")
            .or_else(|| map.get("customFields"))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };
        fields
            .iter()
            .map(|(name, value)| CustomField::new(name.clone(), value.clone()))
            .collect()
    }

    fn map_links(&self, map: &Map<String, Value>) -> Vec<Link> {
        let Some(arr) = array_of(map, &["links"]) else {
            return Vec::new();
        };
        arr.iter()
            .filter_map(Value::as_object)
            .map(|link| Link {
                link_type: string_or_empty(link, &["type"]),
                target_id: string_or_empty(link, &["id", "target_id", "targetId"]),
                relationship: string_of(link, &["relationship"]),
                url: string_of(link, &["url"]),
                description: string_of(link, &["description"]),
            })
            .collect()
    }
}

impl Mapper for ZephyrTestCaseMapper {
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
        let map = as_object(source, "zephyr test case")?;

        let status = non_empty_string(map, &["status"])
            .and_then(|s| status_to_canonical(&s))
            .unwrap_or_default();
        let priority = non_empty_string(map, &["priority"])
            .and_then(|s| priority_to_canonical(&s))
            .unwrap_or_default();

        let description = string_of(map, &["description"]);
        let mut case = TestCase {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["title", "name"]),
            objective: string_of(map, &["objective"])
                .or_else(|| description.clone())
                .unwrap_or_default(),
            status,
            priority,
            source_system: Some(SYSTEM_NAME.to_string()),
            external_id: non_empty_string(map, &["key"]),
            description,
            preconditions: string_of(map, &["preconditions", "precondition"]),
            folder_path: string_of(map, &["folder_path", "folderPath"]),
            created_at: datetime_of(map, &["created_at", "createdOn"])?,
            updated_at: datetime_of(map, &["updated_at", "updatedOn"])?,
            owner: map_user(string_of(map, &["owner"])),
            created_by: map_user(string_of(map, &["created_by", "createdBy"])),
            version: string_of(map, &["version"]),
            is_latest_version: true,
            ..TestCase::default()
        };

        if let Some(steps) = array_of(map, &["steps"]) {
            case.test_steps = self.map_steps(steps)?;
        }
        if let Some(tags) = array_of(map, &["tags", "labels"]) {
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
        case.links = self.map_links(map);

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
        if let Some(key) = &case.external_id {
            out.insert("key".to_string(), json!(key));
        }
        out.insert("title".to_string(), json!(case.name));
        out.insert(
            "description".to_string(),
            json!(case.description.clone().unwrap_or_default()),
        );
        if !case.objective.is_empty() {
            out.insert("objective".to_string(), json!(case.objective));
        }
        out.insert(
            "preconditions".to_string(),
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
            out.insert("folder_path".to_string(), json!(folder));
        }

        let steps: Vec<Value> = case
            .test_steps
            .iter()
            .map(|step| {
                json!({
                    "id": step.id,
                    "order": step.order,
                    "action": step.action,
                    "expected_result": step.expected_result,
                    "test_data": step.data.clone().unwrap_or_default(),
                })
            })
            .collect();
        out.insert("steps".to_string(), Value::Array(steps));

        if !case.tags.is_empty() {
            let tags: Vec<&str> = case.tags.iter().map(|t| t.name.as_str()).collect();
            out.insert("tags".to_string(), json!(tags));
        }
        if !case.custom_fields.is_empty() {
            let mut fields = Map::new();
            for field in &case.custom_fields {
                fields.insert(field.name.clone(), field.value.clone());
            }
            out.insert("custom_fields".to_string(), Value::Object(fields));
        }
        if !case.attachments.is_empty() {
            let attachments: Vec<Value> = case.attachments.iter().map(attachment_json).collect();
            out.insert("attachments".to_string(), Value::Array(attachments));
        }
        if !case.links.is_empty() {
            let links: Vec<Value> = case
                .links
                .iter()
                .map(|link| {
                    json!({
                        "type": link.link_type,
                        "id": link.target_id,
                        "description": link.description.clone().unwrap_or_default(),
                    })
                })
                .collect();
            out.insert("links".to_string(), Value::Array(links));
        }
        if let Some(created) = case.created_at {
            out.insert("created_at".to_string(), json!(iso_utc(created)));
        }
        if let Some(updated) = case.updated_at {
            out.insert("updated_at".to_string(), json!(iso_utc(updated)));
        }
        if let Some(version) = &case.version {
            out.insert("version".to_string(), json!(version));
        }
        if let Some(owner) = &case.owner {
            let value = owner.email.clone().unwrap_or_else(|| owner.id.clone());
            out.insert("owner".to_string(), json!(value));
        }

        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "zephyr test case") else {
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
        if case.name.is_empty() && (map.contains_key("title") || map.contains_key("name")) {
            messages.push("Name was not properly mapped".to_string());
        }
        if let Some(steps) = array_of(map, &["steps"]) {
            if steps.len() != case.test_steps.len() {
                messages.push(format!(
                    "step count mismatch: {} in source, {} in target",
                    steps.len(),
                    case.test_steps.len()
                ));
            }
        }
        if let Some(status) = non_empty_string(map, &["status"]) {
            if status_to_canonical(&status).is_none() {
                messages.push(format!("unknown status '{status}' defaulted to DRAFT"));
            }
        }
        if let Some(priority) = non_empty_string(map, &["priority"]) {
            if priority_to_canonical(&priority).is_none() {
                messages.push(format!("unknown priority '{priority}' defaulted to MEDIUM"));
            }
        }
        messages
    }
}

// --- Test execution mapper ---

#[derive(Debug)]
pub struct ZephyrTestExecutionMapper;

impl ZephyrTestExecutionMapper {
    fn map_step_results(&self, arr: &[Value]) -> Result<Vec<StepResult>> {
        let mut results = Vec::with_capacity(arr.len());
        for (i, value) in arr.iter().enumerate() {
            let map = as_object(value, "zephyr step result")?;
            let mut result = StepResult {
                step_id: string_or_empty(map, &["stepId", "step_id"]),
                sequence: u64_of(map, &["index", "sequence"]).unwrap_or(i as u64 + 1) as u32,
                status: non_empty_string(map, &["status"])
                    .and_then(|s| execution_status_to_canonical(&s))
                    .unwrap_or_default(),
                actual_result: string_of(map, &["actualResult", "actual_result"]),
                notes: string_of(map, &["comment", "notes"]),
                ..StepResult::default()
            };
            result.attachments = map_attachments(map)?;
            results.push(result);
        }
        Ok(results)
    }
}

impl Mapper for ZephyrTestExecutionMapper {
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
        let map = as_object(source, "zephyr test execution")?;

        let mut execution = TestExecution {
            id: string_or_empty(map, &["id"]),
            test_case_id: string_or_empty(map, &["testId", "test_case_id"]),
            status: non_empty_string(map, &["status"])
                .and_then(|s| execution_status_to_canonical(&s))
                .unwrap_or_default(),
            source_system: Some(SYSTEM_NAME.to_string()),
            environment: string_of(map, &["environment"]),
            build_version: string_of(map, &["buildVersion", "build_version"]),
            start_time: datetime_of(map, &["executedOn", "executed_on", "start_time"])?,
            execution_time: f64_of(map, &["timeSpentInSeconds", "execution_time"]),
            executed_by: map_user(string_of(map, &["executedBy", "executed_by"])),
            notes: string_of(map, &["comment"]),
            test_cycle_id: non_empty_string(map, &["cycleId", "cycle_id"]),
            ..TestExecution::default()
        };

        if let Some(results) = array_of(map, &["stepResults", "step_results"]) {
            execution.step_results = self.map_step_results(results)?;
        }
        execution.attachments = map_attachments(map)?;
        if let Some(defects) = array_of(map, &["defects"]) {
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
        out.insert("testId".to_string(), json!(execution.test_case_id));
        out.insert(
            "status".to_string(),
            json!(execution_status_from_canonical(execution.status)),
        );
        out.insert(
            "comment".to_string(),
            json!(execution.notes.clone().unwrap_or_default()),
        );
        if let Some(environment) = &execution.environment {
            out.insert("environment".to_string(), json!(environment));
        }
        if let Some(cycle) = &execution.test_cycle_id {
            out.insert("cycleId".to_string(), json!(cycle));
        }
        if let Some(executed_by) = &execution.executed_by {
            out.insert("executedBy".to_string(), json!(executed_by.id));
        }
        if let Some(start) = execution.start_time {
            out.insert("executedOn".to_string(), json!(iso_utc(start)));
        }
        if let Some(duration) = execution.execution_time {
            out.insert("timeSpentInSeconds".to_string(), json!(duration));
        }
        if !execution.step_results.is_empty() {
            let results: Vec<Value> = execution
                .step_results
                .iter()
                .map(|result| {
                    json!({
                        "stepId": result.step_id,
                        "index": result.sequence,
                        "status": execution_status_from_canonical(result.status),
                        "actualResult": result.actual_result.clone().unwrap_or_default(),
                        "comment": result.notes.clone().unwrap_or_default(),
                    })
                })
                .collect();
            out.insert("stepResults".to_string(), Value::Array(results));
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
        let Ok(map) = as_object(source, "zephyr test execution") else {
            return vec!["source payload is not a JSON object".to_string()];
        };
        let CanonicalEntity::TestExecution(execution) = canonical else {
            return vec![format!(
                "expected a test-execution entity, got {}",
                canonical.entity_type()
            )];
        };

        if execution.id.is_empty() && map.contains_key("id") {
            messages.push("ID was not properly mapped".to_string());
        }
        if execution.test_case_id.is_empty()
            && (map.contains_key("testId") || map.contains_key("test_case_id"))
        {
            messages.push("Test case ID was not properly mapped".to_string());
        }
        if let Some(results) = array_of(map, &["stepResults", "step_results"]) {
            if results.len() != execution.step_results.len() {
                messages.push(format!(
                    "step result count mismatch: {} in source, {} in target",
                    results.len(),
                    execution.step_results.len()
                ));
            }
        }
        messages
    }
}

// --- Test suite mapper ---

#[derive(Debug)]
pub struct ZephyrTestSuiteMapper;

impl Mapper for ZephyrTestSuiteMapper {
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
        let map = as_object(source, "zephyr test suite")?;
        let mut suite = TestSuite {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["name"]),
            source_system: Some(SYSTEM_NAME.to_string()),
            description: string_of(map, &["description"]),
            parent_id: non_empty_string(map, &["parentId", "parent_id"]),
            path: string_of(map, &["folderPath", "folder_path", "path"]),
            ..TestSuite::default()
        };
        if let Some(keys) = array_of(map, &["testCaseKeys", "test_case_ids"]) {
            suite.test_case_ids = keys
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
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
        out.insert("name".to_string(), json!(suite.name));
        if let Some(parent) = &suite.parent_id {
            out.insert("parentId".to_string(), json!(parent));
        }
        if let Some(path) = &suite.path {
            out.insert("folderPath".to_string(), json!(path));
        }
        if let Some(description) = &suite.description {
            out.insert("description".to_string(), json!(description));
        }
        out.insert("testCaseKeys".to_string(), json!(suite.test_case_ids));
        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "zephyr test suite") else {
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
pub struct ZephyrTestCycleMapper;

impl Mapper for ZephyrTestCycleMapper {
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
        let map = as_object(source, "zephyr test cycle")?;
        let mut cycle = TestCycle {
            id: string_or_empty(map, &["id"]),
            name: string_or_empty(map, &["name"]),
            status: string_or_empty(map, &["status"]),
            source_system: Some(SYSTEM_NAME.to_string()),
            description: string_of(map, &["description"]),
            environment: string_of(map, &["environment"]),
            build_version: string_of(map, &["buildVersion", "build_version"]),
            start_date: datetime_of(map, &["startDate", "start_date"])?,
            end_date: datetime_of(map, &["endDate", "end_date"])?,
            folder_path: string_of(map, &["folderPath", "folder_path"]),
            owner: map_user(string_of(map, &["owner"])),
            ..TestCycle::default()
        };
        if let Some(keys) = array_of(map, &["testCaseKeys", "test_case_ids"]) {
            cycle.test_case_ids = keys
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        if let Some(ids) = array_of(map, &["executionIds", "execution_ids"]) {
            cycle.execution_ids = ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
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
        out.insert("name".to_string(), json!(cycle.name));
        out.insert("status".to_string(), json!(cycle.status));
        if let Some(description) = &cycle.description {
            out.insert("description".to_string(), json!(description));
        }
        if let Some(environment) = &cycle.environment {
            out.insert("environment".to_string(), json!(environment));
        }
        if let Some(build) = &cycle.build_version {
            out.insert("buildVersion".to_string(), json!(build));
        }
        if let Some(start) = cycle.start_date {
            out.insert("startDate".to_string(), json!(iso_utc(start)));
        }
        if let Some(end) = cycle.end_date {
            out.insert("endDate".to_string(), json!(iso_utc(end)));
        }
        if let Some(folder) = &cycle.folder_path {
            out.insert("folderPath".to_string(), json!(folder));
        }
        if let Some(owner) = &cycle.owner {
            out.insert("owner".to_string(), json!(owner.id));
        }
        out.insert("testCaseKeys".to_string(), json!(cycle.test_case_ids));
        if !cycle.execution_ids.is_empty() {
            out.insert("executionIds".to_string(), json!(cycle.execution_ids));
        }
        Ok(Value::Object(out))
    }

    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String> {
        let mut messages = Vec::new();
        let Ok(map) = as_object(source, "zephyr test cycle") else {
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
