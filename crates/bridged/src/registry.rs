//! Process-wide registry of workflows.
//!
//! The only component with observable process-lifetime state: a
//! concurrent map of workflow id to its live record. After creation each
//! record has a single writer, the workflow's own executor task; the
//! HTTP layer only reads snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_core::{Workflow, WorkflowState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Live workflow record plus its cancellation token.
#[derive(Debug)]
pub struct WorkflowHandle {
    pub workflow: RwLock<Workflow>,
    pub cancel: CancellationToken,
}

impl WorkflowHandle {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow: RwLock::new(workflow),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn snapshot(&self) -> Workflow {
        self.workflow.read().await.clone()
    }
}

/// Row in the workflow listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    inner: RwLock<HashMap<String, Arc<WorkflowHandle>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, workflow: Workflow) -> Arc<WorkflowHandle> {
        let id = workflow.id.clone();
        let handle = Arc::new(WorkflowHandle::new(workflow));
        self.inner
            .write()
            .await
            .insert(id, Arc::clone(&handle));
        handle
    }

    pub async fn get(&self, id: &str) -> Option<Arc<WorkflowHandle>> {
        self.inner.read().await.get(id).map(Arc::clone)
    }

    /// Summaries sorted by creation time, newest last.
    pub async fn list(&self) -> Vec<WorkflowSummary> {
        let handles: Vec<Arc<WorkflowHandle>> =
            self.inner.read().await.values().map(Arc::clone).collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let workflow = handle.workflow.read().await;
            summaries.push(WorkflowSummary {
                id: workflow.id.clone(),
                workflow_type: workflow.workflow_type.clone(),
                state: workflow.state,
                created_at: workflow.created_at,
            });
        }
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Signal cancellation; the running step finishes before the
    /// workflow fails. Returns false for unknown ids.
    pub async fn cancel(&self, id: &str) -> bool {
        match self.get(id).await {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{WorkflowStep, WORKFLOW_TYPE_MIGRATION};
    use serde_json::json;

    fn workflow(id: &str) -> Workflow {
        Workflow::new(
            id,
            WORKFLOW_TYPE_MIGRATION,
            json!({}),
            vec![WorkflowStep::new("step-1", "Validate Input", 1)],
        )
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_record() {
        let registry = WorkflowRegistry::new();
        registry.insert(workflow("wf-1")).await;
        let handle = registry.get("wf-1").await.unwrap();
        assert_eq!(handle.snapshot().await.id, "wf-1");
        assert!(registry.get("wf-2").await.is_none());
    }

    #[tokio::test]
    async fn list_reports_state_per_workflow() {
        let registry = WorkflowRegistry::new();
        registry.insert(workflow("wf-1")).await;
        registry.insert(workflow("wf-2")).await;
        let summaries = registry.list().await;
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.state == WorkflowState::Created));
    }

    #[tokio::test]
    async fn cancel_flags_the_token() {
        let registry = WorkflowRegistry::new();
        registry.insert(workflow("wf-1")).await;
        assert!(registry.cancel("wf-1").await);
        assert!(registry.get("wf-1").await.unwrap().cancel.is_cancelled());
        assert!(!registry.cancel("missing").await);
    }
}
