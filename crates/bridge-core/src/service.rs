//! Transformation service: a thin stateful facade over the Transformer
//! that assembles contexts from job-level overrides and owns the job
//! table and the translation audit log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;

use crate::context::TransformationContext;
use crate::job::{JobSpec, MigrationJob};
use crate::mapper::MapperRegistry;
use crate::transformer::{Result, Transformer, Translation};
use crate::types::{EntityType, Id, JobStatus, TranslationStatus};

#[derive(Debug)]
pub struct TransformationService {
    transformer: Transformer,
    jobs: Mutex<HashMap<Id, MigrationJob>>,
}

impl TransformationService {
    pub fn new(registry: Arc<MapperRegistry>) -> Self {
        Self {
            transformer: Transformer::new(registry),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by the built-in Zephyr Scale and qTest mappers.
    pub fn with_builtin_mappers() -> Self {
        Self::new(Arc::new(MapperRegistry::with_builtin()))
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Transform one record, assembling the context from explicit
    /// overrides. For test-execution records, `related_step_ids` names
    /// the steps of the owning test case so dangling step-result
    /// references downgrade the translation to partial.
    pub fn transform(
        &self,
        source_system: &str,
        target_system: &str,
        entity_type: EntityType,
        data: &Value,
        migration_id: Option<Id>,
        field_mappings: HashMap<String, String>,
        value_mappings: HashMap<String, HashMap<String, Value>>,
        related_step_ids: Option<Vec<String>>,
    ) -> Result<Value> {
        let context = TransformationContext {
            source_system: source_system.to_string(),
            target_system: target_system.to_string(),
            migration_id,
            field_mappings,
            value_mappings,
            related_step_ids,
            ..TransformationContext::default()
        };
        self.transformer.transform(
            source_system,
            target_system,
            entity_type,
            data,
            Some(&context),
        )
    }

    /// Transform one record under a job's configured overrides, updating
    /// the job's progress counters.
    pub fn transform_for_job(
        &self,
        job_id: &Id,
        entity_type: EntityType,
        data: &Value,
    ) -> Result<Value> {
        let (source_system, target_system, field_mappings, value_mappings) = {
            let jobs = self.jobs.lock().expect("job table poisoned");
            let Some(job) = jobs.get(job_id) else {
                return Err(crate::transformer::TransformError::Failed {
                    entity_type,
                    source_id: crate::transformer::entity_id(data),
                    message: format!("migration job {job_id} not found"),
                });
            };
            (
                job.source_system.clone(),
                job.target_system.clone(),
                job.field_mappings_for(entity_type),
                job.value_mappings_for(entity_type),
            )
        };

        let result = self.transform(
            &source_system,
            &target_system,
            entity_type,
            data,
            Some(job_id.clone()),
            field_mappings,
            value_mappings,
            None,
        );

        let status = match &result {
            Ok(_) => self
                .transformer
                .translation(
                    &source_system,
                    &target_system,
                    entity_type,
                    &crate::transformer::entity_id(data),
                )
                .map_or(TranslationStatus::Success, |t| t.status),
            Err(_) => TranslationStatus::Error,
        };
        self.record_item(job_id, status);
        result
    }

    pub fn create_migration_job(&self, spec: JobSpec) -> Id {
        let job = MigrationJob::from_spec(spec);
        let id = job.id.clone();
        self.jobs
            .lock()
            .expect("job table poisoned")
            .insert(id.clone(), job);
        id
    }

    pub fn migration_job(&self, id: &Id) -> Option<MigrationJob> {
        self.jobs.lock().expect("job table poisoned").get(id).cloned()
    }

    pub fn set_job_status(&self, id: &Id, status: JobStatus) {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        if let Some(job) = jobs.get_mut(id) {
            job.status = status;
            match status {
                JobStatus::Running if job.start_time.is_none() => {
                    job.start_time = Some(Utc::now());
                }
                JobStatus::Completed | JobStatus::Failed => {
                    job.end_time = Some(Utc::now());
                }
                _ => {}
            }
        }
    }

    pub fn translations(&self) -> Vec<Translation> {
        self.transformer.translations()
    }

    pub fn clear_translations(&self) {
        self.transformer.clear_translations();
    }

    fn record_item(&self, job_id: &Id, status: TranslationStatus) {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        if let Some(job) = jobs.get_mut(job_id) {
            job.processed_items += 1;
            match status {
                TranslationStatus::Success => job.success_count += 1,
                TranslationStatus::Partial => {
                    job.success_count += 1;
                    job.warning_count += 1;
                }
                TranslationStatus::Error => job.error_count += 1,
            }
        }
    }
}
