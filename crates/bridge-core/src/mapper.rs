//! Mapper contract and registry.
//!
//! A mapper converts between one external system's dialect and the
//! canonical model, in both directions. Mappers are pure: no I/O, and
//! deterministic for identical inputs.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::canonical::CanonicalEntity;
use crate::context::TransformationContext;
use crate::types::EntityType;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),
    #[error("mapper for {expected} got a {actual} entity")]
    EntityMismatch {
        expected: EntityType,
        actual: EntityType,
    },
    #[error("invalid value for {field}: {value}")]
    InvalidField { field: String, value: String },
    #[error("unparseable timestamp in {field}: {value}")]
    InvalidTimestamp { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, MapperError>;

/// Bidirectional converter between one system dialect and the canonical
/// model, for a single entity type.
pub trait Mapper: Send + Sync {
    /// System this mapper handles, e.g. "zephyr".
    fn system_name(&self) -> &str;

    /// Entity type this mapper handles.
    fn entity_type(&self) -> EntityType;

    /// Convert a system-specific record into its canonical form.
    fn to_canonical(
        &self,
        source: &Value,
        context: &TransformationContext,
    ) -> Result<CanonicalEntity>;

    /// Convert a canonical record into the system-specific dialect.
    fn from_canonical(
        &self,
        canonical: &CanonicalEntity,
        context: &TransformationContext,
    ) -> Result<Value>;

    /// Report discrepancies between a system record and its canonical
    /// counterpart: missing ids, step-count mismatches, lossy enum
    /// fallbacks. An empty list means the mapping was lossless.
    fn validate_mapping(&self, source: &Value, canonical: &CanonicalEntity) -> Vec<String>;
}

/// Process-wide lookup of mappers by `(system, entity type)`.
///
/// Populated once at startup and shared immutably afterwards, so reads
/// need no locking.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<(String, EntityType), Arc<dyn Mapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in Zephyr Scale and qTest
    /// mappers for every supported entity type.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::mappers::zephyr::register(&mut registry);
        crate::mappers::qtest::register(&mut registry);
        registry
    }

    pub fn register(&mut self, mapper: Arc<dyn Mapper>) {
        let key = (mapper.system_name().to_string(), mapper.entity_type());
        self.mappers.insert(key, mapper);
    }

    pub fn get(&self, system_name: &str, entity_type: EntityType) -> Option<Arc<dyn Mapper>> {
        self.mappers
            .get(&(system_name.to_string(), entity_type))
            .map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .mappers
            .keys()
            .map(|(system, entity)| format!("{system}/{entity}"))
            .collect();
        keys.sort();
        f.debug_struct("MapperRegistry")
            .field("mappers", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_both_systems() {
        let registry = MapperRegistry::with_builtin();
        for system in ["zephyr", "qtest"] {
            for entity in [
                EntityType::TestCase,
                EntityType::TestExecution,
                EntityType::TestSuite,
                EntityType::TestCycle,
            ] {
                assert!(
                    registry.get(system, entity).is_some(),
                    "missing mapper for {system}/{entity}"
                );
            }
        }
    }

    #[test]
    fn unknown_key_returns_none() {
        let registry = MapperRegistry::with_builtin();
        assert!(registry.get("rally", EntityType::TestCase).is_none());
        assert!(registry.get("", EntityType::TestSuite).is_none());
    }
}
