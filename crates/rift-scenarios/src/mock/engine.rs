//! MockEngine - mapping registry and request matching.

use super::types::{Mapping, MappingConfig, MappingError};
use crate::request::MockRequest;
use crate::scenario::ScenarioStore;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Mapping plus its insertion sequence, used to order equal priorities.
#[derive(Debug)]
struct Entry {
    sequence: u64,
    mapping: Arc<Mapping>,
}

/// Holds compiled mappings and the scenario store they share.
///
/// Mappings are kept ordered by priority (lower first), then most recently
/// added first, which is the order [`MockEngine::find_match`] tries them in.
#[derive(Debug)]
pub struct MockEngine {
    mappings: RwLock<Vec<Entry>>,
    store: Arc<ScenarioStore>,
    next_sequence: AtomicU64,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_store(Arc::new(ScenarioStore::new()))
    }

    pub fn with_store(store: Arc<ScenarioStore>) -> Self {
        Self {
            mappings: RwLock::new(Vec::new()),
            store,
            next_sequence: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<ScenarioStore> {
        &self.store
    }

    /// Compile and register a mapping. A mapping with the same id is replaced.
    pub fn add_mapping(&self, config: MappingConfig) -> Result<Arc<Mapping>, MappingError> {
        let mapping = Arc::new(Mapping::compile(config)?);
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);

        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|entry| entry.mapping.id() != mapping.id());
        if mappings.len() != before {
            debug!("Replacing mapping {}", mapping.id());
        }

        mappings.push(Entry {
            sequence,
            mapping: Arc::clone(&mapping),
        });
        mappings.sort_by(|a, b| {
            a.mapping
                .priority()
                .cmp(&b.mapping.priority())
                .then(b.sequence.cmp(&a.sequence))
        });

        info!(
            "Added mapping {} (priority {}{})",
            mapping.id(),
            mapping.priority(),
            mapping
                .scenario_name()
                .map(|s| format!(", scenario '{s}'"))
                .unwrap_or_default()
        );
        Ok(mapping)
    }

    /// Remove a mapping by id, returning it if it existed.
    pub fn remove_mapping(&self, id: &str) -> Option<Arc<Mapping>> {
        let mut mappings = self.mappings.write();
        let index = mappings.iter().position(|entry| entry.mapping.id() == id)?;
        Some(mappings.remove(index).mapping)
    }

    pub fn get_mapping(&self, id: &str) -> Option<Arc<Mapping>> {
        self.mappings
            .read()
            .iter()
            .find(|entry| entry.mapping.id() == id)
            .map(|entry| Arc::clone(&entry.mapping))
    }

    /// Mappings in match order.
    pub fn mappings(&self) -> Vec<Arc<Mapping>> {
        self.mappings
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.mapping))
            .collect()
    }

    pub fn reset_mappings(&self) {
        self.mappings.write().clear();
    }

    /// Drop all mappings and all scenario state.
    pub fn reset(&self) {
        self.reset_mappings();
        self.store.clear_all();
    }

    /// First mapping that fires for the request.
    ///
    /// Stops at the first hit, so a request applies at most one transition.
    pub fn find_match(&self, request: &MockRequest) -> Option<Arc<Mapping>> {
        let mappings = self.mappings.read();
        mappings
            .iter()
            .find(|entry| entry.mapping.evaluate(request, &self.store))
            .map(|entry| Arc::clone(&entry.mapping))
    }
}
