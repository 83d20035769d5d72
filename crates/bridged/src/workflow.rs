//! Migration workflow engine: a fixed seven-step state machine driving
//! validate → connect → connect → extract → transform → load → verify.
//!
//! Steps run strictly in order against the shared workflow record, so
//! the HTTP layer observes live status. A step failure fails the
//! workflow and leaves later steps PENDING; `start` on a failed
//! workflow resumes, rerunning only PENDING and FAILED steps.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_core::{
    EntityType, StepStatus, TransformationService, Workflow, WorkflowError, WorkflowState,
    WorkflowStep, WORKFLOW_TYPE_MIGRATION,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::adapter::{AdapterError, Session, SystemAdapter};
use crate::adapters::AdapterRegistry;
use crate::registry::WorkflowHandle;
use crate::{AppResult, RECOGNIZED_SYSTEMS};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("{0}")]
    Execution(String),
}

/// The canonical ordered step list for a migration workflow.
pub fn migration_steps() -> Vec<WorkflowStep> {
    [
        "Validate Input",
        "Connect to Source System",
        "Connect to Target System",
        "Extract Test Cases",
        "Transform Test Data",
        "Load Test Cases",
        "Verify Migration",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| WorkflowStep::new(format!("step-{}", i + 1), *name, i as u32 + 1))
    .collect()
}

/// Build a fresh migration workflow record for the given input.
pub fn new_migration_workflow(id: impl Into<String>, input: Value) -> Workflow {
    Workflow::new(id, WORKFLOW_TYPE_MIGRATION, input, migration_steps())
}

/// Executor for one migration workflow. Owns the adapter sessions;
/// they are released on every exit path and reopened lazily when a
/// resume lands past the connect steps.
pub struct MigrationWorkflow {
    handle: Arc<WorkflowHandle>,
    service: Arc<TransformationService>,
    adapters: Arc<AdapterRegistry>,
    source_session: Option<Session>,
    target_session: Option<Session>,
}

impl MigrationWorkflow {
    pub fn new(
        handle: Arc<WorkflowHandle>,
        service: Arc<TransformationService>,
        adapters: Arc<AdapterRegistry>,
    ) -> Self {
        Self {
            handle,
            service,
            adapters,
            source_session: None,
            target_session: None,
        }
    }

    /// Run the workflow to a terminal state. Resume semantics: steps
    /// already COMPLETED are skipped and keep their results; PENDING and
    /// FAILED steps execute. Cancellation is observed at step
    /// boundaries only.
    pub async fn start(&mut self) -> AppResult<Workflow> {
        let (workflow_id, total) = {
            let mut wf = self.handle.workflow.write().await;
            if wf.state == WorkflowState::Completed {
                return Ok(wf.clone());
            }
            wf.transition(WorkflowState::Running)?;
            (wf.id.clone(), wf.steps.len() as u32)
        };
        info!(workflow_id = %workflow_id, "migration workflow running");

        for order in 1..=total {
            if self.handle.cancel.is_cancelled() {
                return self.fail_workflow(&workflow_id, "cancelled").await;
            }

            let (status, name) = {
                let wf = self.handle.workflow.read().await;
                let step = wf.step(order).ok_or(WorkflowError::NoSuchStep(order))?;
                (step.status, step.name.clone())
            };
            if status == StepStatus::Completed {
                continue;
            }

            {
                let mut wf = self.handle.workflow.write().await;
                wf.step_mut(order)
                    .ok_or(WorkflowError::NoSuchStep(order))?
                    .begin()?;
            }
            info!(workflow_id = %workflow_id, step = %name, order, "executing step");

            match self.execute_step(order).await {
                Ok(result) => {
                    let mut wf = self.handle.workflow.write().await;
                    wf.step_mut(order)
                        .ok_or(WorkflowError::NoSuchStep(order))?
                        .complete(result)?;
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(workflow_id = %workflow_id, step = %name, error = %message, "step failed");
                    {
                        let mut wf = self.handle.workflow.write().await;
                        wf.step_mut(order)
                            .ok_or(WorkflowError::NoSuchStep(order))?
                            .fail(&message)?;
                        wf.transition(WorkflowState::Failed)?;
                        wf.error = Some(message);
                    }
                    self.release_sessions();
                    return Ok(self.handle.snapshot().await);
                }
            }
        }

        if self.handle.cancel.is_cancelled() {
            return self.fail_workflow(&workflow_id, "cancelled").await;
        }

        {
            let mut wf = self.handle.workflow.write().await;
            let result = Self::generate_result(&wf);
            wf.result = Some(result);
            wf.transition(WorkflowState::Completed)?;
        }
        self.release_sessions();
        info!(workflow_id = %workflow_id, "migration workflow completed");
        Ok(self.handle.snapshot().await)
    }

    async fn fail_workflow(&mut self, workflow_id: &str, message: &str) -> AppResult<Workflow> {
        warn!(workflow_id = %workflow_id, error = %message, "migration workflow failed");
        {
            let mut wf = self.handle.workflow.write().await;
            wf.transition(WorkflowState::Failed)?;
            wf.error = Some(message.to_string());
        }
        self.release_sessions();
        Ok(self.handle.snapshot().await)
    }

    fn release_sessions(&mut self) {
        self.source_session = None;
        self.target_session = None;
    }

    async fn execute_step(&mut self, order: u32) -> Result<Value, StepError> {
        match order {
            1 => self.validate_input().await,
            2 => self.connect_source().await,
            3 => self.connect_target().await,
            4 => self.extract().await,
            5 => self.transform().await,
            6 => self.load().await,
            7 => self.verify().await,
            _ => Err(StepError::Execution(format!("no step at order {order}"))),
        }
    }

    async fn input(&self) -> Value {
        self.handle.workflow.read().await.input.clone()
    }

    async fn step_result(&self, order: u32) -> Option<Value> {
        self.handle
            .workflow
            .read()
            .await
            .step(order)
            .and_then(|s| s.result.clone())
    }

    // --- Step 1 ---

    async fn validate_input(&self) -> Result<Value, StepError> {
        let input = self.input().await;

        let missing: Vec<&str> = ["sourceSystem", "targetSystem", "projectKey"]
            .into_iter()
            .filter(|field| {
                input
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_none_or(str::is_empty)
            })
            .collect();
        if !missing.is_empty() {
            return Err(StepError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let source = input["sourceSystem"].as_str().unwrap_or_default();
        let target = input["targetSystem"].as_str().unwrap_or_default();
        if !RECOGNIZED_SYSTEMS.contains(&source) {
            return Err(StepError::Validation(format!(
                "invalid source system: {source}"
            )));
        }
        if !RECOGNIZED_SYSTEMS.contains(&target) {
            return Err(StepError::Validation(format!(
                "invalid target system: {target}"
            )));
        }
        if source == target {
            return Err(StepError::Validation(
                "source and target systems cannot be the same".to_string(),
            ));
        }

        Ok(json!({ "valid": true }))
    }

    // --- Steps 2 and 3 ---

    async fn connect_source(&mut self) -> Result<Value, StepError> {
        let input = self.input().await;
        let system = string_field(&input, "sourceSystem");
        let session = self.open_session(&system, &input, "sourceConfig").await?;
        self.source_session = Some(session);
        Ok(json!({ "connected": true, "system": system }))
    }

    async fn connect_target(&mut self) -> Result<Value, StepError> {
        let input = self.input().await;
        let system = string_field(&input, "targetSystem");
        let session = self.open_session(&system, &input, "targetConfig").await?;
        self.target_session = Some(session);
        Ok(json!({ "connected": true, "system": system }))
    }

    async fn open_session(
        &self,
        system: &str,
        input: &Value,
        config_key: &str,
    ) -> Result<Session, StepError> {
        let adapter = self.adapter(system)?;
        let mut config = input
            .get("options")
            .and_then(|o| o.get(config_key))
            .cloned()
            .unwrap_or_else(|| json!({}));
        if let Some(object) = config.as_object_mut() {
            object
                .entry("projectKey")
                .or_insert_with(|| input.get("projectKey").cloned().unwrap_or(Value::Null));
        }
        Ok(adapter.connect(&config).await?)
    }

    fn adapter(&self, system: &str) -> Result<Arc<dyn SystemAdapter>, StepError> {
        self.adapters
            .get(system)
            .ok_or_else(|| StepError::Adapter(AdapterError::UnknownSystem(system.to_string())))
    }

    /// Session for the source side, reconnecting when a resume skipped
    /// the connect step of this run.
    async fn ensure_source_session(&mut self, input: &Value) -> Result<Session, StepError> {
        if let Some(session) = &self.source_session {
            return Ok(session.clone());
        }
        let system = string_field(input, "sourceSystem");
        let session = self.open_session(&system, input, "sourceConfig").await?;
        self.source_session = Some(session.clone());
        Ok(session)
    }

    async fn ensure_target_session(&mut self, input: &Value) -> Result<Session, StepError> {
        if let Some(session) = &self.target_session {
            return Ok(session.clone());
        }
        let system = string_field(input, "targetSystem");
        let session = self.open_session(&system, input, "targetConfig").await?;
        self.target_session = Some(session.clone());
        Ok(session)
    }

    // --- Step 4 ---

    async fn extract(&mut self) -> Result<Value, StepError> {
        let input = self.input().await;
        let session = self.ensure_source_session(&input).await?;
        let adapter = self.adapter(&session.system)?;

        let project_key = string_field(&input, "projectKey");
        let filters = input
            .get("options")
            .and_then(|o| o.get("filters"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let records = adapter
            .list_entities(&session, EntityType::TestCase, &project_key, &filters)
            .await?;
        info!(count = records.len(), project_key = %project_key, "extracted test cases");
        Ok(json!({ "count": records.len(), "testCases": records }))
    }

    // --- Step 5 ---

    async fn transform(&mut self) -> Result<Value, StepError> {
        let input = self.input().await;
        let extract = self
            .step_result(4)
            .await
            .ok_or_else(|| StepError::Execution("no extract result to transform".to_string()))?;
        let records = extract["testCases"].as_array().cloned().unwrap_or_default();

        let source = string_field(&input, "sourceSystem");
        let target = string_field(&input, "targetSystem");
        let field_mappings = mapping_option::<HashMap<String, String>>(&input, "fieldMappings");
        let value_mappings =
            mapping_option::<HashMap<String, HashMap<String, Value>>>(&input, "valueMappings");

        let mut entries = Vec::with_capacity(records.len());
        let mut failed = 0usize;
        for record in &records {
            let source_id = bridge_core::transformer::entity_id(record);
            match self.service.transform(
                &source,
                &target,
                EntityType::TestCase,
                record,
                None,
                field_mappings.clone(),
                value_mappings.clone(),
                None,
            ) {
                Ok(data) => {
                    let status = self
                        .service
                        .transformer()
                        .translation(&source, &target, EntityType::TestCase, &source_id)
                        .map_or("success", |t| t.status.as_str());
                    entries.push(json!({
                        "sourceId": source_id,
                        "status": status,
                        "data": data,
                    }));
                }
                Err(e) => {
                    failed += 1;
                    entries.push(json!({
                        "sourceId": source_id,
                        "status": "error",
                        "error": e.to_string(),
                    }));
                }
            }
        }

        // Per-record errors do not fail the step unless nothing succeeded.
        if !records.is_empty() && failed == records.len() {
            return Err(StepError::Execution(format!(
                "all {failed} records failed to transform"
            )));
        }

        Ok(json!({
            "count": records.len() - failed,
            "failed": failed,
            "records": entries,
        }))
    }

    // --- Step 6 ---

    async fn load(&mut self) -> Result<Value, StepError> {
        let input = self.input().await;
        let transform = self
            .step_result(5)
            .await
            .ok_or_else(|| StepError::Execution("no transform result to load".to_string()))?;
        let session = self.ensure_target_session(&input).await?;
        let adapter = self.adapter(&session.system)?;

        let empty = Vec::new();
        let entries = transform["records"].as_array().unwrap_or(&empty);
        let mut results = Vec::with_capacity(entries.len());
        let mut loaded = 0usize;
        for entry in entries {
            let source_id = entry["sourceId"].clone();
            let Some(data) = entry.get("data") else {
                results.push(json!({
                    "sourceId": source_id,
                    "targetId": Value::Null,
                    "status": "FAILED",
                }));
                continue;
            };
            match adapter
                .create_entity(&session, EntityType::TestCase, data)
                .await
            {
                Ok(target_id) => {
                    loaded += 1;
                    results.push(json!({
                        "sourceId": source_id,
                        "targetId": target_id,
                        "status": "MIGRATED",
                    }));
                }
                Err(e) if e.is_session_failure() => return Err(e.into()),
                Err(e) => {
                    results.push(json!({
                        "sourceId": source_id,
                        "targetId": Value::Null,
                        "status": "FAILED",
                        "error": e.to_string(),
                    }));
                }
            }
        }

        // Attachment bytes would be flushed to the target before this
        // point; in-memory content is dropped with the step.
        info!(loaded, total = entries.len(), "loaded test cases");
        Ok(json!({ "count": loaded, "success": true, "results": results }))
    }

    // --- Step 7 ---

    async fn verify(&mut self) -> Result<Value, StepError> {
        let extract = self.step_result(4).await;
        let transform = self.step_result(5).await;
        let load = self
            .step_result(6)
            .await
            .ok_or_else(|| StepError::Execution("no load result to verify".to_string()))?;

        let expected = extract
            .as_ref()
            .and_then(|r| r["count"].as_u64())
            .unwrap_or(0);
        let migrated = load["count"].as_u64().unwrap_or(0);
        // Transform errors surface as FAILED rows in the load results,
        // so counting those rows covers both phases.
        let empty = Vec::new();
        let failed = load["results"]
            .as_array()
            .unwrap_or(&empty)
            .iter()
            .filter(|r| r["status"] == json!("FAILED"))
            .count() as u64;
        let warnings = transform
            .as_ref()
            .and_then(|r| r["records"].as_array())
            .map_or(0, |records| {
                records
                    .iter()
                    .filter(|r| r["status"] == json!("partial"))
                    .count()
            }) as u64;

        if expected >= 1 && migrated == 0 {
            return Err(StepError::Execution(format!(
                "verification failed: 0 of {expected} records migrated"
            )));
        }

        let mut messages = Vec::new();
        if migrated < expected {
            messages.push(format!(
                "WARNING: migrated {migrated} of {expected} records"
            ));
        }

        Ok(json!({
            "verified": true,
            "count": migrated,
            "verificationDetails": {
                "migrated": migrated,
                "failed": failed,
                "warnings": warnings,
            },
            "messages": messages,
        }))
    }

    /// Final workflow result: the verify summary projected together with
    /// the load step's per-record outcomes.
    fn generate_result(workflow: &Workflow) -> Value {
        let verify = workflow.step(7).and_then(|s| s.result.clone()).unwrap_or_default();
        let load = workflow.step(6).and_then(|s| s.result.clone()).unwrap_or_default();
        json!({
            "sourceSystem": workflow.input["sourceSystem"],
            "targetSystem": workflow.input["targetSystem"],
            "projectKey": workflow.input["projectKey"],
            "migratedCount": verify["count"],
            "success": verify["verified"],
            "migratedTestCases": load["results"],
        })
    }
}

impl std::fmt::Debug for MigrationWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationWorkflow")
            .field("source_session", &self.source_session)
            .field("target_session", &self.target_session)
            .finish_non_exhaustive()
    }
}

fn string_field(input: &Value, field: &str) -> String {
    input
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn mapping_option<T: Default + serde::de::DeserializeOwned>(input: &Value, key: &str) -> T {
    input
        .get("options")
        .and_then(|o| o.get(key))
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{Fault, MemoryAdapter};
    use crate::registry::WorkflowRegistry;

    struct Fixture {
        registry: Arc<WorkflowRegistry>,
        service: Arc<TransformationService>,
        adapters: Arc<AdapterRegistry>,
        zephyr: Arc<MemoryAdapter>,
        qtest: Arc<MemoryAdapter>,
    }

    fn fixture() -> Fixture {
        let zephyr = Arc::new(MemoryAdapter::with_demo_seed("zephyr"));
        let qtest = Arc::new(MemoryAdapter::new("qtest"));
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::clone(&zephyr) as Arc<dyn SystemAdapter>);
        adapters.register(Arc::clone(&qtest) as Arc<dyn SystemAdapter>);
        Fixture {
            registry: Arc::new(WorkflowRegistry::new()),
            service: Arc::new(TransformationService::with_builtin_mappers()),
            adapters: Arc::new(adapters),
            zephyr,
            qtest,
        }
    }

    fn demo_input() -> Value {
        json!({
            "sourceSystem": "zephyr",
            "targetSystem": "qtest",
            "projectKey": "DEMO",
        })
    }

    async fn run(fixture: &Fixture, input: Value) -> (Workflow, Arc<WorkflowHandle>) {
        let handle = fixture
            .registry
            .insert(new_migration_workflow("wf-test", input))
            .await;
        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let workflow = engine.start().await.unwrap();
        (workflow, handle)
    }

    #[tokio::test]
    async fn happy_path_completes_all_seven_steps() {
        let fixture = fixture();
        let (workflow, _) = run(&fixture, demo_input()).await;

        assert_eq!(workflow.state, WorkflowState::Completed);
        assert_eq!(workflow.steps.len(), 7);
        assert!(workflow
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));

        let result = workflow.result.unwrap();
        assert_eq!(result["migratedCount"], json!(3));
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["migratedTestCases"].as_array().unwrap().len(), 3);
        assert_eq!(fixture.qtest.created(EntityType::TestCase).len(), 3);
    }

    #[tokio::test]
    async fn missing_source_system_fails_validation_and_leaves_rest_pending() {
        let fixture = fixture();
        let input = json!({ "targetSystem": "qtest", "projectKey": "DEMO" });
        let (workflow, _) = run(&fixture, input).await;

        assert_eq!(workflow.state, WorkflowState::Failed);
        assert!(workflow.error.as_ref().unwrap().contains("sourceSystem"));
        assert_eq!(workflow.steps[0].status, StepStatus::Failed);
        for step in &workflow.steps[1..] {
            assert_eq!(step.status, StepStatus::Pending);
        }
    }

    #[tokio::test]
    async fn unrecognized_system_fails_validation() {
        let fixture = fixture();
        let input = json!({
            "sourceSystem": "jira",
            "targetSystem": "qtest",
            "projectKey": "DEMO",
        });
        let (workflow, _) = run(&fixture, input).await;
        assert_eq!(workflow.state, WorkflowState::Failed);
        assert!(workflow.error.unwrap().contains("invalid source system"));
    }

    #[tokio::test]
    async fn same_source_and_target_is_rejected() {
        let fixture = fixture();
        let input = json!({
            "sourceSystem": "zephyr",
            "targetSystem": "zephyr",
            "projectKey": "DEMO",
        });
        let (workflow, _) = run(&fixture, input).await;
        assert_eq!(workflow.state, WorkflowState::Failed);
        assert!(workflow.error.unwrap().contains("cannot be the same"));
    }

    #[tokio::test]
    async fn connect_failure_fails_the_workflow_at_step_two() {
        let fixture = fixture();
        fixture
            .zephyr
            .fail_next_connect(Fault::Auth("bad token".to_string()));
        let (workflow, _) = run(&fixture, demo_input()).await;

        assert_eq!(workflow.state, WorkflowState::Failed);
        assert_eq!(workflow.steps[0].status, StepStatus::Completed);
        assert_eq!(workflow.steps[1].status, StepStatus::Failed);
        assert!(workflow.steps[1]
            .error
            .as_ref()
            .unwrap()
            .contains("authentication failed"));
        assert_eq!(workflow.steps[3].status, StepStatus::Pending);
    }

    #[tokio::test]
    async fn extract_failure_then_resume_skips_completed_steps() {
        let fixture = fixture();
        fixture
            .zephyr
            .fail_next_list(Fault::Network("temporary".to_string()));

        let handle = fixture
            .registry
            .insert(new_migration_workflow("wf-resume", demo_input()))
            .await;
        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let first = engine.start().await.unwrap();

        assert_eq!(first.state, WorkflowState::Failed);
        assert_eq!(first.steps[3].status, StepStatus::Failed);
        for step in &first.steps[..3] {
            assert_eq!(step.status, StepStatus::Completed);
        }
        for step in &first.steps[4..] {
            assert_eq!(step.status, StepStatus::Pending);
        }
        let connect_result = first.steps[1].result.clone();

        // Reset the failed step and rerun; the fault is gone.
        handle.workflow.write().await.retry_step(4).unwrap();
        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let second = engine.start().await.unwrap();

        assert_eq!(second.state, WorkflowState::Completed);
        assert!(second
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        // Steps 1-3 were not rerun: their results are untouched.
        assert_eq!(second.steps[1].result, connect_result);
        assert_eq!(second.result.unwrap()["migratedCount"], json!(3));
    }

    #[tokio::test]
    async fn load_session_failure_is_resumable() {
        let fixture = fixture();
        fixture
            .qtest
            .fail_next_create(Fault::Network("connection reset".to_string()));

        let handle = fixture
            .registry
            .insert(new_migration_workflow("wf-load", demo_input()))
            .await;
        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let first = engine.start().await.unwrap();
        assert_eq!(first.state, WorkflowState::Failed);
        assert_eq!(first.steps[5].status, StepStatus::Failed);

        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let second = engine.start().await.unwrap();
        assert_eq!(second.state, WorkflowState::Completed);
        assert_eq!(second.result.unwrap()["migratedCount"], json!(3));
    }

    #[tokio::test]
    async fn transform_fails_only_when_every_record_fails() {
        let fixture = fixture();
        // Excel has an adapter but no registered mapper, so every record
        // errors during transform.
        let excel = Arc::new(MemoryAdapter::new("excel"));
        excel.seed(
            EntityType::TestCase,
            vec![json!({"id": "X-1", "title": "a"}), json!({"id": "X-2", "title": "b"})],
        );
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::clone(&excel) as Arc<dyn SystemAdapter>);
        adapters.register(Arc::new(MemoryAdapter::new("qtest")) as Arc<dyn SystemAdapter>);

        let handle = fixture
            .registry
            .insert(new_migration_workflow(
                "wf-nomapper",
                json!({
                    "sourceSystem": "excel",
                    "targetSystem": "qtest",
                    "projectKey": "DEMO",
                }),
            ))
            .await;
        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::new(adapters),
        );
        let workflow = engine.start().await.unwrap();

        assert_eq!(workflow.state, WorkflowState::Failed);
        assert_eq!(workflow.steps[4].status, StepStatus::Failed);
        assert!(workflow
            .error
            .unwrap()
            .contains("all 2 records failed to transform"));
    }

    #[tokio::test]
    async fn cancellation_before_start_fails_with_cancelled() {
        let fixture = fixture();
        let handle = fixture
            .registry
            .insert(new_migration_workflow("wf-cancel", demo_input()))
            .await;
        handle.cancel.cancel();

        let mut engine = MigrationWorkflow::new(
            Arc::clone(&handle),
            Arc::clone(&fixture.service),
            Arc::clone(&fixture.adapters),
        );
        let workflow = engine.start().await.unwrap();
        assert_eq!(workflow.state, WorkflowState::Failed);
        assert_eq!(workflow.error.as_deref(), Some("cancelled"));
        assert!(workflow
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn field_mapping_options_flow_into_the_target_payload() {
        let fixture = fixture();
        fixture.zephyr.seed(
            EntityType::TestCase,
            vec![json!({
                "id": "TC-1",
                "title": "Login",
                "custom_fields": {"Risk": "Medium"},
            })],
        );
        let input = json!({
            "sourceSystem": "zephyr",
            "targetSystem": "qtest",
            "projectKey": "DEMO",
            "options": { "fieldMappings": {"Risk": "RiskLevel"} },
        });
        let (workflow, _) = run(&fixture, input).await;

        assert_eq!(workflow.state, WorkflowState::Completed);
        let created = fixture.qtest.created(EntityType::TestCase);
        assert_eq!(created.len(), 1);
        let properties = created[0]["properties"].as_array().unwrap();
        assert!(properties
            .iter()
            .any(|p| p["field_name"] == json!("RiskLevel")));
        assert!(!properties.iter().any(|p| p["field_name"] == json!("Risk")));
    }

    #[tokio::test]
    async fn translations_are_audited_per_extracted_record() {
        let fixture = fixture();
        let (workflow, _) = run(&fixture, demo_input()).await;
        assert_eq!(workflow.state, WorkflowState::Completed);

        let translations = fixture.service.translations();
        assert_eq!(translations.len(), 3);
        let ids: Vec<&str> = translations.iter().map(|t| t.source_id.as_str()).collect();
        assert_eq!(ids, vec!["TC-1001", "TC-1002", "TC-1003"]);
    }
}
