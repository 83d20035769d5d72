//! Adapter implementations and the process-wide adapter registry.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::SystemAdapter;
use crate::RECOGNIZED_SYSTEMS;

/// Lookup of adapters by system name. Built once at startup and shared
/// read-only.
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SystemAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with an in-memory adapter per recognized system, the
    /// Zephyr one seeded with demo test cases.
    pub fn with_memory_defaults() -> Self {
        let mut registry = Self::new();
        for system in RECOGNIZED_SYSTEMS {
            let adapter = if *system == "zephyr" {
                memory::MemoryAdapter::with_demo_seed(*system)
            } else {
                memory::MemoryAdapter::new(*system)
            };
            registry.register(Arc::new(adapter));
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn SystemAdapter>) {
        self.adapters
            .insert(adapter.system_name().to_string(), adapter);
    }

    pub fn get(&self, system: &str) -> Option<Arc<dyn SystemAdapter>> {
        self.adapters.get(system).map(Arc::clone)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_memory_defaults()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut systems: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        systems.sort_unstable();
        f.debug_struct("AdapterRegistry")
            .field("systems", &systems)
            .finish()
    }
}
