//! Adapter seam between the workflow engine and external test
//! management systems.
//!
//! The core consumes adapters through this trait only; concrete network
//! clients live outside the daemon. Sessions are plain handles owned by
//! one workflow and never shared.

use async_trait::async_trait;
use bridge_core::EntityType;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid adapter config: {0}")]
    Config(String),
    #[error("timed out after {0} seconds")]
    Timeout(u32),
    #[error("no adapter registered for system: {0}")]
    UnknownSystem(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl AdapterError {
    /// Session-level failures abort the running step; record-level ones
    /// mark a single record failed and let the step continue.
    pub fn is_session_failure(&self) -> bool {
        !matches!(self, Self::InvalidRecord(_))
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Open session against one system. Plain data; dropping it releases
/// the connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub system: String,
    pub project_key: String,
    pub token: String,
}

/// What the workflow engine needs from each external system.
///
/// `list_entities` pulls records of one entity type (the adapter handles
/// pagination internally and returns them in source order);
/// `create_entity` pushes one record and returns the created id.
/// Attachment bytes go through `upload_attachment`, which returns the
/// storage location the binary store assigned.
#[async_trait]
pub trait SystemAdapter: Send + Sync {
    fn system_name(&self) -> &str;

    async fn connect(&self, config: &Value) -> Result<Session>;

    async fn list_entities(
        &self,
        session: &Session,
        entity_type: EntityType,
        project_key: &str,
        filters: &Value,
    ) -> Result<Vec<Value>>;

    async fn create_entity(
        &self,
        session: &Session,
        entity_type: EntityType,
        record: &Value,
    ) -> Result<String>;

    async fn upload_attachment(
        &self,
        session: &Session,
        bytes: &[u8],
        metadata: &Value,
    ) -> Result<String>;
}
