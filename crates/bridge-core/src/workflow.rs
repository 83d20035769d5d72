//! Workflow and step records.
//!
//! These serialize in the wire shape the HTTP layer exposes: camelCase
//! keys, ISO-8601 UTC timestamps, optional fields omitted when unset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{StepStatus, WorkflowState};

pub const WORKFLOW_TYPE_MIGRATION: &str = "MIGRATION";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("illegal workflow transition: {from} -> {to}")]
    IllegalTransition { from: WorkflowState, to: WorkflowState },
    #[error("illegal step transition for {step}: {from} -> {to}")]
    IllegalStepTransition {
        step: String,
        from: StepStatus,
        to: StepStatus,
    },
    #[error("no step at order {0}")]
    NoSuchStep(u32),
}

/// A unit of execution within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            order,
            start_time: None,
            end_time: None,
            result: None,
            error: None,
        }
    }

    fn set_status(&mut self, to: StepStatus) -> Result<(), WorkflowError> {
        if !self.status.can_transition(to) {
            return Err(WorkflowError::IllegalStepTransition {
                step: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), WorkflowError> {
        self.set_status(StepStatus::Running)?;
        self.start_time = Some(Utc::now());
        self.end_time = None;
        self.error = None;
        Ok(())
    }

    pub fn complete(&mut self, result: Value) -> Result<(), WorkflowError> {
        self.set_status(StepStatus::Completed)?;
        self.result = Some(result);
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), WorkflowError> {
        self.set_status(StepStatus::Failed)?;
        self.error = Some(error.into());
        self.end_time = Some(Utc::now());
        Ok(())
    }

    /// Reset a failed (or still pending) step so a later `start` reruns
    /// it. Resetting a completed step is an illegal transition; prior
    /// results are preserved by never resetting them.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if self.status == StepStatus::Pending {
            return Ok(());
        }
        self.set_status(StepStatus::Pending)?;
        self.start_time = None;
        self.end_time = None;
        self.result = None;
        self.error = None;
        Ok(())
    }
}

/// A workflow instance: ordered steps plus overall state and result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub state: WorkflowState,
    pub input: Value,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        workflow_type: impl Into<String>,
        input: Value,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_type: workflow_type.into(),
            state: WorkflowState::Created,
            input,
            steps,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn transition(&mut self, to: WorkflowState) -> Result<(), WorkflowError> {
        if !self.state.can_transition(to) {
            return Err(WorkflowError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        match to {
            WorkflowState::Running => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
                self.error = None;
            }
            WorkflowState::Completed | WorkflowState::Failed => {
                self.completed_at = Some(Utc::now());
            }
            WorkflowState::Created => {}
        }
        Ok(())
    }

    pub fn step(&self, order: u32) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    pub fn step_mut(&mut self, order: u32) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.order == order)
    }

    /// Reset one step to PENDING and clear the workflow error, so a
    /// subsequent `start` reruns it under resume semantics.
    pub fn retry_step(&mut self, order: u32) -> Result<(), WorkflowError> {
        let step = self
            .step_mut(order)
            .ok_or(WorkflowError::NoSuchStep(order))?;
        step.reset()?;
        self.error = None;
        Ok(())
    }

    /// Most recent completed step at or before `order`, used to feed a
    /// rerun step its input after a resume.
    pub fn last_completed_before(&self, order: u32) -> Option<&WorkflowStep> {
        self.steps
            .iter()
            .filter(|s| s.order < order && s.status == StepStatus::Completed)
            .max_by_key(|s| s.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow() -> Workflow {
        Workflow::new(
            "wf-1",
            WORKFLOW_TYPE_MIGRATION,
            json!({}),
            vec![
                WorkflowStep::new("step-1", "Validate Input", 1),
                WorkflowStep::new("step-2", "Connect to Source System", 2),
            ],
        )
    }

    #[test]
    fn new_workflow_is_created_with_pending_steps() {
        let wf = workflow();
        assert_eq!(wf.state, WorkflowState::Created);
        assert!(wf.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert!(wf.started_at.is_none());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut wf = workflow();
        assert!(matches!(
            wf.transition(WorkflowState::Completed),
            Err(WorkflowError::IllegalTransition { .. })
        ));
        wf.transition(WorkflowState::Running).unwrap();
        wf.transition(WorkflowState::Completed).unwrap();
        assert!(wf.transition(WorkflowState::Running).is_err());
    }

    #[test]
    fn step_lifecycle_records_timing() {
        let mut step = WorkflowStep::new("step-1", "Validate Input", 1);
        step.begin().unwrap();
        assert!(step.start_time.is_some());
        step.complete(json!({"valid": true})).unwrap();
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.end_time >= step.start_time);
    }

    #[test]
    fn completed_step_cannot_rerun() {
        let mut step = WorkflowStep::new("step-1", "Validate Input", 1);
        step.begin().unwrap();
        step.complete(json!({})).unwrap();
        assert!(step.begin().is_err());
    }

    #[test]
    fn retry_resets_only_the_failed_step() {
        let mut wf = workflow();
        wf.transition(WorkflowState::Running).unwrap();
        wf.step_mut(1).unwrap().begin().unwrap();
        wf.step_mut(1).unwrap().complete(json!({"valid": true})).unwrap();
        wf.step_mut(2).unwrap().begin().unwrap();
        wf.step_mut(2).unwrap().fail("boom").unwrap();
        wf.transition(WorkflowState::Failed).unwrap();
        wf.error = Some("boom".to_string());

        wf.retry_step(2).unwrap();
        assert!(wf.error.is_none());
        assert_eq!(wf.step(2).unwrap().status, StepStatus::Pending);
        // Step 1 keeps its completed result.
        assert_eq!(wf.step(1).unwrap().status, StepStatus::Completed);
        assert!(wf.step(1).unwrap().result.is_some());
    }

    #[test]
    fn last_completed_before_finds_the_feeding_step() {
        let mut wf = workflow();
        wf.step_mut(1).unwrap().begin().unwrap();
        wf.step_mut(1).unwrap().complete(json!({"n": 1})).unwrap();
        let feeder = wf.last_completed_before(2).unwrap();
        assert_eq!(feeder.order, 1);
        assert!(wf.last_completed_before(1).is_none());
    }

    #[test]
    fn serializes_in_wire_shape() {
        let wf = workflow();
        let value = serde_json::to_value(&wf).unwrap();
        assert_eq!(value["type"], json!("MIGRATION"));
        assert_eq!(value["state"], json!("CREATED"));
        assert_eq!(value["steps"][0]["id"], json!("step-1"));
        assert!(value.get("startedAt").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
