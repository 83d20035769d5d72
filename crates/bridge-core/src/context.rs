//! Per-transformation context: the systems involved plus job-level
//! field and value mapping overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::CanonicalEntity;
use crate::types::Id;

/// Context threaded through a single transformation.
///
/// `field_mappings` renames custom fields on the canonical form before the
/// target mapper emits them; `value_mappings` substitutes values per field
/// (keyed by the field's original name). Both apply after the source
/// mapper's default mapping. For test-execution transforms,
/// `related_step_ids` carries the step ids of the owning test case so
/// dangling step-result references surface as validation messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformationContext {
    pub source_system: String,
    pub target_system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub field_mappings: HashMap<String, String>,
    pub value_mappings: HashMap<String, HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_step_ids: Option<Vec<String>>,
    pub options: HashMap<String, Value>,
}

impl TransformationContext {
    pub fn new(source_system: impl Into<String>, target_system: impl Into<String>) -> Self {
        Self {
            source_system: source_system.into(),
            target_system: target_system.into(),
            ..Self::default()
        }
    }

    /// Apply value substitutions and then field renames to the custom
    /// fields of the canonical form. Entities without custom fields are
    /// left untouched.
    pub fn apply_overrides(&self, entity: &mut CanonicalEntity) {
        if self.field_mappings.is_empty() && self.value_mappings.is_empty() {
            return;
        }
        let Some(fields) = entity.custom_fields_mut() else {
            return;
        };
        for field in fields.iter_mut() {
            if let Some(substitutions) = self.value_mappings.get(&field.name) {
                let current = match &field.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if let Some(replacement) = substitutions.get(&current) {
                    field.value = replacement.clone();
                }
            }
            if let Some(renamed) = self.field_mappings.get(&field.name) {
                field.name = renamed.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{CustomField, TestCase};
    use serde_json::json;

    fn case_with_fields(fields: Vec<CustomField>) -> CanonicalEntity {
        CanonicalEntity::TestCase(TestCase {
            id: "TC-1".to_string(),
            custom_fields: fields,
            ..TestCase::default()
        })
    }

    #[test]
    fn field_mappings_rename_custom_fields() {
        let mut context = TransformationContext::new("zephyr", "qtest");
        context
            .field_mappings
            .insert("Risk".to_string(), "RiskLevel".to_string());

        let mut entity = case_with_fields(vec![
            CustomField::new("Risk", json!("Medium")),
            CustomField::new("Component", json!("Authentication")),
        ]);
        context.apply_overrides(&mut entity);

        let CanonicalEntity::TestCase(case) = entity else {
            unreachable!()
        };
        assert_eq!(case.custom_fields[0].name, "RiskLevel");
        assert_eq!(case.custom_fields[0].value, json!("Medium"));
        assert_eq!(case.custom_fields[1].name, "Component");
    }

    #[test]
    fn value_mappings_substitute_by_original_field_name() {
        let mut context = TransformationContext::new("zephyr", "qtest");
        context.value_mappings.insert(
            "Risk".to_string(),
            HashMap::from([("Medium".to_string(), json!("M"))]),
        );
        context
            .field_mappings
            .insert("Risk".to_string(), "RiskLevel".to_string());

        let mut entity = case_with_fields(vec![CustomField::new("Risk", json!("Medium"))]);
        context.apply_overrides(&mut entity);

        let CanonicalEntity::TestCase(case) = entity else {
            unreachable!()
        };
        assert_eq!(case.custom_fields[0].name, "RiskLevel");
        assert_eq!(case.custom_fields[0].value, json!("M"));
    }

    #[test]
    fn empty_overrides_leave_entity_unchanged() {
        let context = TransformationContext::new("zephyr", "qtest");
        let mut entity = case_with_fields(vec![CustomField::new("Risk", json!("High"))]);
        let before = entity.clone();
        context.apply_overrides(&mut entity);
        assert_eq!(entity, before);
    }
}
