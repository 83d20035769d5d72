//! System-agnostic record types used as the intermediate form during
//! translation between test management systems.
//!
//! Every record carries its source system, an external id, and a free-form
//! `metadata` map for per-system hints that have no first-class field.
//! Field names serialize camelCase to stay wire-compatible with the other
//! language bindings of the canonical model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntityType, ExecutionStatus, FieldType, Priority, TestCaseStatus};

/// Reference to a user in either system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A tag or label attached to a test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A link to another entity, such as a requirement or defect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    /// Link kind, e.g. "requirement", "defect", "test-case".
    pub link_type: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A custom field with its value and declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomField {
    pub name: String,
    pub value: Value,
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub options: Vec<String>,
    pub required: bool,
    pub is_custom: bool,
}

impl CustomField {
    /// Build a field, inferring the type from the value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let field_type = FieldType::infer(&value);
        Self {
            name: name.into(),
            value,
            field_type,
            field_id: None,
            options: Vec::new(),
            required: false,
            is_custom: true,
        }
    }
}

/// File attached to a test case, step, or execution.
///
/// Mappers record metadata only; `storage_location` stays empty until the
/// binary store has uploaded the bytes. `content` is populated only when
/// the store is bypassed and is dropped as soon as the load step completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    /// MIME type.
    pub file_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Opaque URI set by the binary store, never by a mapper.
    pub storage_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    pub metadata: BTreeMap<String, Value>,
}

/// Automation details for a test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Automation {
    pub is_automated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// A single step within a test case. `order` is 1-based and dense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestStep {
    pub id: String,
    pub order: u32,
    pub action: String,
    pub expected_result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub is_data_driven: bool,
    pub attachments: Vec<Attachment>,
    pub custom_fields: Vec<CustomField>,
    pub metadata: BTreeMap<String, Value>,
}

/// Standard representation of a test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub objective: String,
    pub status: TestCaseStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<String>,
    pub test_steps: Vec<TestStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<Tag>,
    pub links: Vec<Link>,
    pub custom_fields: Vec<CustomField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<Automation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub is_latest_version: bool,
    pub metadata: BTreeMap<String, Value>,
}

/// Outcome of executing a single test step. `sequence` is 1-based and
/// dense, and `step_id` must reference a step of the executed test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepResult {
    pub step_id: String,
    pub sequence: u32,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    pub defects: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

/// Record of one execution of a test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestExecution {
    pub id: String,
    pub test_case_id: String,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<User>,
    pub step_results: Vec<StepResult>,
    pub attachments: Vec<Attachment>,
    pub defects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_cycle_id: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub metadata: BTreeMap<String, Value>,
}

/// Group of related test cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub test_case_ids: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}

/// A test execution cycle or test run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCycle {
    pub id: String,
    pub name: String,
    /// Free-form cycle status, e.g. "Open", "Closed", "In Progress".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub test_case_ids: Vec<String>,
    pub execution_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
    pub metadata: BTreeMap<String, Value>,
}

/// The closed set of entities a mapper can produce or consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "kebab-case")]
pub enum CanonicalEntity {
    TestCase(TestCase),
    TestExecution(TestExecution),
    TestSuite(TestSuite),
    TestCycle(TestCycle),
}

impl CanonicalEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::TestCase(_) => EntityType::TestCase,
            Self::TestExecution(_) => EntityType::TestExecution,
            Self::TestSuite(_) => EntityType::TestSuite,
            Self::TestCycle(_) => EntityType::TestCycle,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::TestCase(c) => &c.id,
            Self::TestExecution(e) => &e.id,
            Self::TestSuite(s) => &s.id,
            Self::TestCycle(c) => &c.id,
        }
    }

    /// Custom fields of the entity, where the kind carries any.
    pub fn custom_fields_mut(&mut self) -> Option<&mut Vec<CustomField>> {
        match self {
            Self::TestCase(c) => Some(&mut c.custom_fields),
            Self::TestExecution(e) => Some(&mut e.custom_fields),
            Self::TestSuite(_) | Self::TestCycle(_) => None,
        }
    }
}

/// Assign 1-based positional order to steps that arrived without one,
/// leaving explicit order values untouched.
pub fn normalize_step_order(steps: &mut [TestStep]) {
    for (i, step) in steps.iter_mut().enumerate() {
        if step.order == 0 {
            step.order = i as u32 + 1;
        }
    }
}

/// True when the order values are exactly `1..=N`: no gaps, no
/// duplicates, strictly increasing.
pub fn is_dense_order<I>(orders: I) -> bool
where
    I: IntoIterator<Item = u32>,
{
    let mut expected = 1u32;
    for order in orders {
        if order != expected {
            return false;
        }
        expected += 1;
    }
    true
}

/// Step-result references that do not match any step id of the owning
/// test case. Every `step_id` must name a step of the executed case.
pub fn dangling_step_ids<'a>(execution: &'a TestExecution, step_ids: &[String]) -> Vec<&'a str> {
    execution
        .step_results
        .iter()
        .map(|result| result.step_id.as_str())
        .filter(|id| !id.is_empty() && !step_ids.iter().any(|known| known == id))
        .collect()
}
