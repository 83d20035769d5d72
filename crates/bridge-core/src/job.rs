//! Migration job records: a configured request to move a set of entity
//! types from one system to another, with per-entity mapping overrides.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntityType, Id, JobStatus};

/// Per-entity field renames: entity type → (canonical name → target name).
pub type FieldMappings = HashMap<String, HashMap<String, String>>;

/// Per-entity, per-field value substitutions.
pub type ValueMappings = HashMap<String, HashMap<String, HashMap<String, Value>>>;

/// Everything needed to create a migration job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    pub name: String,
    pub source_system: String,
    pub source_config: Value,
    pub target_system: String,
    pub target_config: Value,
    pub entity_types: Vec<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filters: BTreeMap<String, Value>,
    pub field_mappings: FieldMappings,
    pub value_mappings: ValueMappings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A migration job with its status and progress counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationJob {
    pub id: Id,
    pub name: String,
    pub source_system: String,
    pub source_config: Value,
    pub target_system: String,
    pub target_config: Value,
    pub entity_types: Vec<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filters: BTreeMap<String, Value>,
    pub field_mappings: FieldMappings,
    pub value_mappings: ValueMappings,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_items: u64,
    pub processed_items: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub warning_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MigrationJob {
    pub fn from_spec(spec: JobSpec) -> Self {
        Self {
            id: Id::new(),
            name: spec.name,
            source_system: spec.source_system,
            source_config: spec.source_config,
            target_system: spec.target_system,
            target_config: spec.target_config,
            entity_types: spec.entity_types,
            description: spec.description,
            filters: spec.filters,
            field_mappings: spec.field_mappings,
            value_mappings: spec.value_mappings,
            status: JobStatus::Created,
            start_time: None,
            end_time: None,
            total_items: 0,
            processed_items: 0,
            success_count: 0,
            error_count: 0,
            warning_count: 0,
            created_by: spec.created_by,
            created_at: Utc::now(),
        }
    }

    /// Field renames configured for one entity type.
    pub fn field_mappings_for(&self, entity_type: EntityType) -> HashMap<String, String> {
        self.field_mappings
            .get(entity_type.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Value substitutions configured for one entity type.
    pub fn value_mappings_for(
        &self,
        entity_type: EntityType,
    ) -> HashMap<String, HashMap<String, Value>> {
        self.value_mappings
            .get(entity_type.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_starts_created_with_zeroed_counters() {
        let job = MigrationJob::from_spec(JobSpec {
            name: "demo".to_string(),
            source_system: "zephyr".to_string(),
            target_system: "qtest".to_string(),
            entity_types: vec![EntityType::TestCase],
            ..JobSpec::default()
        });
        assert_eq!(job.status, JobStatus::Created);
        assert_eq!(job.processed_items, 0);
        assert_eq!(job.error_count, 0);
        assert!(job.start_time.is_none());
    }

    #[test]
    fn mappings_are_scoped_per_entity_type() {
        let mut spec = JobSpec {
            name: "demo".to_string(),
            source_system: "zephyr".to_string(),
            target_system: "qtest".to_string(),
            entity_types: vec![EntityType::TestCase],
            ..JobSpec::default()
        };
        spec.field_mappings.insert(
            "test-case".to_string(),
            HashMap::from([("Risk".to_string(), "RiskLevel".to_string())]),
        );
        let job = MigrationJob::from_spec(spec);

        let case_mappings = job.field_mappings_for(EntityType::TestCase);
        assert_eq!(case_mappings.get("Risk"), Some(&"RiskLevel".to_string()));
        assert!(job.field_mappings_for(EntityType::TestSuite).is_empty());
        assert!(job.value_mappings_for(EntityType::TestCase).is_empty());
    }
}
