//! Core transformation pipeline: source dialect → canonical → target
//! dialect, with validation on both legs and an audit entry per call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::canonical::CanonicalEntity;
use crate::context::TransformationContext;
use crate::mapper::{MapperError, MapperRegistry};
use crate::types::{EntityType, Id, TranslationStatus};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no mapper registered for {system}/{entity_type}")]
    MapperNotFound {
        system: String,
        entity_type: EntityType,
    },
    #[error("mapper error: {0}")]
    Mapper(#[from] MapperError),
    #[error("failed to transform {entity_type} {source_id}: {message}")]
    Failed {
        entity_type: EntityType,
        source_id: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Audit record for a single entity translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub source_system: String,
    pub target_system: String,
    pub entity_type: EntityType,
    pub source_id: String,
    pub target_id: String,
    pub status: TranslationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_data: Option<Value>,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_id: Option<Id>,
}

/// Translation entries keyed by
/// `{sourceSystem}:{targetSystem}:{entityType}:{sourceId}`. Re-runs of the
/// same key overwrite in place; insertion order is preserved so readers
/// see entities in processing order.
#[derive(Debug, Default)]
struct TranslationLog {
    entries: HashMap<String, Translation>,
    order: Vec<String>,
}

impl TranslationLog {
    fn record(&mut self, key: String, translation: Translation) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, translation);
    }

    fn snapshot(&self) -> Vec<Translation> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .cloned()
            .collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Transforms test assets between systems using the canonical model as
/// the intermediate form.
///
/// Deterministic for fixed inputs and registry: no ids or timestamps are
/// invented for the target payload. The only lock is around the audit
/// log; writes are one entry per record and readers snapshot.
#[derive(Debug)]
pub struct Transformer {
    registry: Arc<MapperRegistry>,
    log: Mutex<TranslationLog>,
}

impl Transformer {
    pub fn new(registry: Arc<MapperRegistry>) -> Self {
        Self {
            registry,
            log: Mutex::new(TranslationLog::default()),
        }
    }

    pub fn registry(&self) -> &Arc<MapperRegistry> {
        &self.registry
    }

    /// Transform a record from the source dialect into the target dialect.
    ///
    /// Records a Translation regardless of outcome: `success` with no
    /// validation messages, `partial` with any, `error` (target id
    /// `"failed"`) when a mapper errors, in which case the error is also
    /// returned to the caller.
    pub fn transform(
        &self,
        source_system: &str,
        target_system: &str,
        entity_type: EntityType,
        source_data: &Value,
        context: Option<&TransformationContext>,
    ) -> Result<Value> {
        let default_context;
        let context = match context {
            Some(c) => c,
            None => {
                default_context = TransformationContext::new(source_system, target_system);
                &default_context
            }
        };

        let source_id = entity_id(source_data);
        let key = translation_key(source_system, target_system, entity_type, &source_id);

        match self.run_pipeline(source_system, target_system, entity_type, source_data, context) {
            Ok((target_data, messages)) => {
                if !messages.is_empty() {
                    warn!(
                        entity_type = %entity_type,
                        source_id = %source_id,
                        ?messages,
                        "validation issues during transformation"
                    );
                }
                let status = if messages.is_empty() {
                    TranslationStatus::Success
                } else {
                    TranslationStatus::Partial
                };
                self.record(
                    key,
                    Translation {
                        source_system: source_system.to_string(),
                        target_system: target_system.to_string(),
                        entity_type,
                        source_id: source_id.clone(),
                        target_id: entity_id(&target_data),
                        status,
                        timestamp: Utc::now(),
                        source_data: Some(source_data.clone()),
                        target_data: Some(target_data.clone()),
                        messages,
                        migration_id: context.migration_id.clone(),
                    },
                );
                Ok(target_data)
            }
            Err(e) => {
                warn!(
                    entity_type = %entity_type,
                    source_id = %source_id,
                    error = %e,
                    "transformation failed"
                );
                self.record(
                    key,
                    Translation {
                        source_system: source_system.to_string(),
                        target_system: target_system.to_string(),
                        entity_type,
                        source_id: source_id.clone(),
                        target_id: "failed".to_string(),
                        status: TranslationStatus::Error,
                        timestamp: Utc::now(),
                        source_data: Some(source_data.clone()),
                        target_data: None,
                        messages: vec![e.to_string()],
                        migration_id: context.migration_id.clone(),
                    },
                );
                Err(TransformError::Failed {
                    entity_type,
                    source_id,
                    message: e.to_string(),
                })
            }
        }
    }

    /// The first half of the pipeline: source dialect → canonical.
    pub fn canonical_form(
        &self,
        system_name: &str,
        entity_type: EntityType,
        data: &Value,
        context: Option<&TransformationContext>,
    ) -> Result<CanonicalEntity> {
        let mapper = self.registry.get(system_name, entity_type).ok_or_else(|| {
            TransformError::MapperNotFound {
                system: system_name.to_string(),
                entity_type,
            }
        })?;
        let default_context;
        let context = match context {
            Some(c) => c,
            None => {
                default_context = TransformationContext::new(system_name, "canonical");
                &default_context
            }
        };
        Ok(mapper.to_canonical(data, context)?)
    }

    /// The second half of the pipeline: canonical → target dialect.
    pub fn from_canonical_form(
        &self,
        system_name: &str,
        entity_type: EntityType,
        canonical: &CanonicalEntity,
        context: Option<&TransformationContext>,
    ) -> Result<Value> {
        let mapper = self.registry.get(system_name, entity_type).ok_or_else(|| {
            TransformError::MapperNotFound {
                system: system_name.to_string(),
                entity_type,
            }
        })?;
        let default_context;
        let context = match context {
            Some(c) => c,
            None => {
                default_context = TransformationContext::new("canonical", system_name);
                &default_context
            }
        };
        Ok(mapper.from_canonical(canonical, context)?)
    }

    /// Snapshot of all recorded translations, in insertion order.
    pub fn translations(&self) -> Vec<Translation> {
        self.log.lock().expect("translation log poisoned").snapshot()
    }

    /// The recorded translation for one source record, if any.
    pub fn translation(
        &self,
        source_system: &str,
        target_system: &str,
        entity_type: EntityType,
        source_id: &str,
    ) -> Option<Translation> {
        let key = translation_key(source_system, target_system, entity_type, source_id);
        self.log
            .lock()
            .expect("translation log poisoned")
            .entries
            .get(&key)
            .cloned()
    }

    pub fn clear_translations(&self) {
        self.log.lock().expect("translation log poisoned").clear();
    }

    fn run_pipeline(
        &self,
        source_system: &str,
        target_system: &str,
        entity_type: EntityType,
        source_data: &Value,
        context: &TransformationContext,
    ) -> Result<(Value, Vec<String>)> {
        let source_mapper = self.registry.get(source_system, entity_type).ok_or_else(|| {
            TransformError::MapperNotFound {
                system: source_system.to_string(),
                entity_type,
            }
        })?;
        let target_mapper = self.registry.get(target_system, entity_type).ok_or_else(|| {
            TransformError::MapperNotFound {
                system: target_system.to_string(),
                entity_type,
            }
        })?;

        let mut canonical = source_mapper.to_canonical(source_data, context)?;
        context.apply_overrides(&mut canonical);
        let target_data = target_mapper.from_canonical(&canonical, context)?;

        let mut messages = source_mapper.validate_mapping(source_data, &canonical);
        messages.extend(target_mapper.validate_mapping(&target_data, &canonical));
        messages.extend(Self::validate_step_references(&canonical, context));

        Ok((target_data, messages))
    }

    /// Schema check across sibling entities: every step result of an
    /// execution must reference a step of the owning test case. Only
    /// runs when the caller supplied the case's step ids.
    fn validate_step_references(
        canonical: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Vec<String> {
        let (CanonicalEntity::TestExecution(execution), Some(step_ids)) =
            (canonical, &context.related_step_ids)
        else {
            return Vec::new();
        };
        crate::canonical::dangling_step_ids(execution, step_ids)
            .into_iter()
            .map(|id| format!("stepId '{id}' does not reference a step of the test case"))
            .collect()
    }

    fn record(&self, key: String, translation: Translation) {
        self.log
            .lock()
            .expect("translation log poisoned")
            .record(key, translation);
    }
}

/// Best-effort id extraction from a dialect payload.
pub fn entity_id(data: &Value) -> String {
    match data.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

fn translation_key(
    source_system: &str,
    target_system: &str,
    entity_type: EntityType,
    source_id: &str,
) -> String {
    format!("{source_system}:{target_system}:{entity_type}:{source_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transformer() -> Transformer {
        Transformer::new(Arc::new(MapperRegistry::with_builtin()))
    }

    #[test]
    fn transform_records_exactly_one_translation_per_source() {
        let t = transformer();
        let source = json!({"id": "TC-1", "title": "Login", "status": "READY", "priority": "HIGH"});

        t.transform("zephyr", "qtest", EntityType::TestCase, &source, None)
            .unwrap();
        t.transform("zephyr", "qtest", EntityType::TestCase, &source, None)
            .unwrap();

        let translations = t.translations();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].source_id, "TC-1");
        assert_eq!(translations[0].status, TranslationStatus::Success);
    }

    #[test]
    fn unknown_status_yields_partial_translation() {
        let t = transformer();
        let source = json!({"id": "TC-2", "title": "t", "status": "ACTIVE"});
        t.transform("zephyr", "qtest", EntityType::TestCase, &source, None)
            .unwrap();

        let translations = t.translations();
        assert_eq!(translations[0].status, TranslationStatus::Partial);
        assert!(translations[0].messages.iter().any(|m| m.contains("ACTIVE")));
    }

    #[test]
    fn missing_mapper_records_error_translation() {
        let t = transformer();
        let source = json!({"id": "TC-3", "title": "t"});
        let err = t
            .transform("rally", "qtest", EntityType::TestCase, &source, None)
            .unwrap_err();
        assert!(matches!(err, TransformError::Failed { .. }));

        let translations = t.translations();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].status, TranslationStatus::Error);
        assert_eq!(translations[0].target_id, "failed");
        assert!(translations[0].messages[0].contains("rally"));
    }

    #[test]
    fn malformed_payload_records_error_and_keeps_source_id_unknown() {
        let t = transformer();
        let source = json!("not an object");
        let err = t
            .transform("zephyr", "qtest", EntityType::TestCase, &source, None)
            .unwrap_err();
        let TransformError::Failed { source_id, .. } = err else {
            panic!("expected Failed");
        };
        assert_eq!(source_id, "unknown");
        assert_eq!(t.translations()[0].status, TranslationStatus::Error);
    }

    #[test]
    fn canonical_form_exposes_the_intermediate() {
        let t = transformer();
        let source = json!({"id": "TC-4", "title": "Login", "steps": [
            {"order": 1, "action": "a", "expected_result": "b"},
        ]});
        let entity = t
            .canonical_form("zephyr", EntityType::TestCase, &source, None)
            .unwrap();
        assert_eq!(entity.id(), "TC-4");

        let emitted = t
            .from_canonical_form("qtest", EntityType::TestCase, &entity, None)
            .unwrap();
        assert_eq!(emitted["test_steps"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn clear_translations_empties_the_log() {
        let t = transformer();
        let source = json!({"id": "TC-5", "title": "t"});
        t.transform("zephyr", "qtest", EntityType::TestCase, &source, None)
            .unwrap();
        assert_eq!(t.translations().len(), 1);
        t.clear_translations();
        assert!(t.translations().is_empty());
    }

    #[test]
    fn translation_log_preserves_processing_order() {
        let t = transformer();
        for id in ["TC-b", "TC-a", "TC-c"] {
            let source = json!({"id": id, "title": "t"});
            t.transform("zephyr", "qtest", EntityType::TestCase, &source, None)
                .unwrap();
        }
        let ids: Vec<String> = t.translations().into_iter().map(|t| t.source_id).collect();
        assert_eq!(ids, vec!["TC-b", "TC-a", "TC-c"]);
    }
}
