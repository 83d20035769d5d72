//! In-memory adapter: canned source records, captured target creates,
//! and fault injection for failure-path and resume tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_core::EntityType;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::{AdapterError, Result, Session, SystemAdapter};

/// A clonable description of a failure to inject on the next matching
/// call. Cleared automatically once raised, so a rerun after the fault
/// is removed succeeds.
#[derive(Debug, Clone)]
pub enum Fault {
    Auth(String),
    Network(String),
    Timeout(u32),
}

impl Fault {
    fn to_error(&self) -> AdapterError {
        match self {
            Self::Auth(message) => AdapterError::Auth(message.clone()),
            Self::Network(message) => AdapterError::Network(message.clone()),
            Self::Timeout(seconds) => AdapterError::Timeout(*seconds),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Seeded source records per entity type.
    records: HashMap<EntityType, Vec<Value>>,
    /// Records captured from `create_entity`, per entity type.
    created: HashMap<EntityType, Vec<Value>>,
    next_session: u64,
    next_attachment: u64,
    connect_fault: Option<Fault>,
    list_fault: Option<Fault>,
    create_fault: Option<Fault>,
}

/// Adapter holding everything in process memory. Stands in for a real
/// system in the daemon's default wiring and in tests.
#[derive(Debug)]
pub struct MemoryAdapter {
    system: String,
    state: Mutex<MemoryState>,
}

impl MemoryAdapter {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Adapter pre-seeded with three demo test cases.
    pub fn with_demo_seed(system: impl Into<String>) -> Self {
        let adapter = Self::new(system);
        adapter.seed(
            EntityType::TestCase,
            vec![
                json!({
                    "id": "TC-1001",
                    "title": "Verify user login",
                    "description": "Test user login functionality",
                    "status": "READY",
                    "priority": "HIGH",
                }),
                json!({
                    "id": "TC-1002",
                    "title": "Verify user logout",
                    "description": "Test user logout functionality",
                    "status": "READY",
                    "priority": "MEDIUM",
                }),
                json!({
                    "id": "TC-1003",
                    "title": "Verify password reset",
                    "description": "Test password reset functionality",
                    "status": "DRAFT",
                    "priority": "LOW",
                }),
            ],
        );
        adapter
    }

    pub fn seed(&self, entity_type: EntityType, records: Vec<Value>) {
        self.state
            .lock()
            .expect("memory adapter poisoned")
            .records
            .insert(entity_type, records);
    }

    /// Records captured on the target side.
    pub fn created(&self, entity_type: EntityType) -> Vec<Value> {
        self.state
            .lock()
            .expect("memory adapter poisoned")
            .created
            .get(&entity_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_next_connect(&self, fault: Fault) {
        self.state.lock().expect("memory adapter poisoned").connect_fault = Some(fault);
    }

    pub fn fail_next_list(&self, fault: Fault) {
        self.state.lock().expect("memory adapter poisoned").list_fault = Some(fault);
    }

    pub fn fail_next_create(&self, fault: Fault) {
        self.state.lock().expect("memory adapter poisoned").create_fault = Some(fault);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock().expect("memory adapter poisoned");
        state.connect_fault = None;
        state.list_fault = None;
        state.create_fault = None;
    }
}

#[async_trait]
impl SystemAdapter for MemoryAdapter {
    fn system_name(&self) -> &str {
        &self.system
    }

    async fn connect(&self, config: &Value) -> Result<Session> {
        let mut state = self.state.lock().expect("memory adapter poisoned");
        if let Some(fault) = state.connect_fault.take() {
            return Err(fault.to_error());
        }
        let project_key = config
            .get("projectKey")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        state.next_session += 1;
        let session = Session {
            system: self.system.clone(),
            project_key,
            token: format!("mem-{}-{}", self.system, state.next_session),
        };
        debug!(system = %self.system, token = %session.token, "opened session");
        Ok(session)
    }

    async fn list_entities(
        &self,
        session: &Session,
        entity_type: EntityType,
        _project_key: &str,
        _filters: &Value,
    ) -> Result<Vec<Value>> {
        let mut state = self.state.lock().expect("memory adapter poisoned");
        if let Some(fault) = state.list_fault.take() {
            return Err(fault.to_error());
        }
        debug!(system = %self.system, token = %session.token, entity = %entity_type, "listing entities");
        Ok(state.records.get(&entity_type).cloned().unwrap_or_default())
    }

    async fn create_entity(
        &self,
        session: &Session,
        entity_type: EntityType,
        record: &Value,
    ) -> Result<String> {
        let mut state = self.state.lock().expect("memory adapter poisoned");
        if let Some(fault) = state.create_fault.take() {
            return Err(fault.to_error());
        }
        if !record.is_object() {
            return Err(AdapterError::InvalidRecord(
                "payload is not a JSON object".to_string(),
            ));
        }
        let created_id = match record.get("id") {
            Some(Value::String(s)) if !s.is_empty() => format!("NEW-{s}"),
            Some(Value::Number(n)) => format!("NEW-{n}"),
            _ => {
                let count = state.created.get(&entity_type).map_or(0, Vec::len);
                format!("NEW-{}-{}", entity_type, count + 1)
            }
        };
        debug!(system = %self.system, token = %session.token, id = %created_id, "created entity");
        state
            .created
            .entry(entity_type)
            .or_default()
            .push(record.clone());
        Ok(created_id)
    }

    async fn upload_attachment(
        &self,
        _session: &Session,
        bytes: &[u8],
        metadata: &Value,
    ) -> Result<String> {
        let mut state = self.state.lock().expect("memory adapter poisoned");
        state.next_attachment += 1;
        let name = metadata
            .get("fileName")
            .and_then(Value::as_str)
            .unwrap_or("attachment");
        Ok(format!(
            "memory://{}/attachments/{}/{name}?bytes={}",
            self.system,
            state.next_attachment,
            bytes.len()
        ))
    }
}
