//! Optional persistence hooks.
//!
//! The daemon holds workflow and translation state in memory; a durable
//! store is an external collaborator plugged in through this trait.
//! Every method is best-effort from the engine's point of view.

use async_trait::async_trait;
use bridge_core::{Translation, Workflow};

use crate::AppResult;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn save_workflow(&self, workflow: &Workflow) -> AppResult<()>;
    async fn load_workflow(&self, id: &str) -> AppResult<Option<Workflow>>;
    async fn save_translations(&self, translations: &[Translation]) -> AppResult<()>;
    async fn load_translations(&self) -> AppResult<Vec<Translation>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        workflows: Mutex<HashMap<String, Workflow>>,
        translations: Mutex<Vec<Translation>>,
    }

    #[async_trait]
    impl WorkflowStore for InMemoryStore {
        async fn save_workflow(&self, workflow: &Workflow) -> AppResult<()> {
            self.workflows
                .lock()
                .unwrap()
                .insert(workflow.id.clone(), workflow.clone());
            Ok(())
        }

        async fn load_workflow(&self, id: &str) -> AppResult<Option<Workflow>> {
            Ok(self.workflows.lock().unwrap().get(id).cloned())
        }

        async fn save_translations(&self, translations: &[Translation]) -> AppResult<()> {
            *self.translations.lock().unwrap() = translations.to_vec();
            Ok(())
        }

        async fn load_translations(&self) -> AppResult<Vec<Translation>> {
            Ok(self.translations.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn store_round_trips_a_workflow() {
        let store = InMemoryStore::default();
        let workflow = crate::workflow::new_migration_workflow(
            "wf-store",
            serde_json::json!({"sourceSystem": "zephyr"}),
        );
        store.save_workflow(&workflow).await.unwrap();
        let loaded = store.load_workflow("wf-store").await.unwrap().unwrap();
        assert_eq!(loaded.id, "wf-store");
        assert_eq!(loaded.steps.len(), 7);
        assert!(store.load_workflow("missing").await.unwrap().is_none());
    }
}
