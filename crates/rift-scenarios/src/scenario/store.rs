//! In-memory scenario state store.
//!
//! The whole mapping sits behind one `parking_lot::RwLock`. Reads (the common
//! case once instances exist) share the lock; creation and transitions take it
//! exclusively for a single map lookup and string write, so every
//! check-then-write on a (scenario, instance) key is linearizable.

use super::STARTED;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Point-in-time copy of the store: scenario → instance → state.
pub type ScenarioSnapshot = BTreeMap<String, BTreeMap<String, String>>;

/// Process-wide scenario state shared by the mock and admin listeners.
#[derive(Debug, Default)]
pub struct ScenarioStore {
    scenarios: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an instance, creating it as `Started` if absent.
    pub fn get_or_create(&self, scenario: &str, instance: &str) -> String {
        if let Some(state) = self.get(scenario, instance) {
            return state;
        }

        // Re-check under the write lock; a concurrent caller may have won
        let mut scenarios = self.scenarios.write();
        scenarios
            .entry(scenario.to_string())
            .or_default()
            .entry(instance.to_string())
            .or_insert_with(|| STARTED.to_string())
            .clone()
    }

    /// Current state of an instance without creating it.
    pub fn get(&self, scenario: &str, instance: &str) -> Option<String> {
        self.scenarios
            .read()
            .get(scenario)
            .and_then(|instances| instances.get(instance))
            .cloned()
    }

    /// Atomically check and transition an instance.
    ///
    /// With `expected` unset the new state (if any) is applied unconditionally.
    /// Otherwise the current state must equal `expected`, and the check and
    /// the write happen under one exclusive lock. A missing instance counts
    /// as `Started`.
    pub fn compare_and_set(
        &self,
        scenario: &str,
        instance: &str,
        expected: Option<&str>,
        new_state: Option<&str>,
    ) -> bool {
        if expected.is_none() && new_state.is_none() {
            return true;
        }

        let mut scenarios = self.scenarios.write();
        let current = scenarios
            .entry(scenario.to_string())
            .or_default()
            .entry(instance.to_string())
            .or_insert_with(|| STARTED.to_string());

        if let Some(expected) = expected {
            if current.as_str() != expected {
                return false;
            }
        }
        if let Some(new_state) = new_state {
            if current.as_str() != new_state {
                *current = new_state.to_string();
            }
        }
        true
    }

    /// Unconditional write; creates the instance if absent.
    pub fn set(&self, scenario: &str, instance: &str, state: &str) {
        self.scenarios
            .write()
            .entry(scenario.to_string())
            .or_default()
            .insert(instance.to_string(), state.to_string());
    }

    /// Remove one instance. Removing the last instance removes the scenario.
    pub fn delete_instance(&self, scenario: &str, instance: &str) -> bool {
        let mut scenarios = self.scenarios.write();
        let Some(instances) = scenarios.get_mut(scenario) else {
            return false;
        };
        let existed = instances.remove(instance).is_some();
        if instances.is_empty() {
            scenarios.remove(scenario);
        }
        existed
    }

    /// Remove a scenario and all its instances.
    pub fn delete_scenario(&self, scenario: &str) -> bool {
        self.scenarios.write().remove(scenario).is_some()
    }

    pub fn clear_all(&self) {
        self.scenarios.write().clear();
    }

    pub fn snapshot(&self) -> ScenarioSnapshot {
        self.scenarios
            .read()
            .iter()
            .map(|(name, instances)| {
                let instances = instances
                    .iter()
                    .map(|(id, state)| (id.clone(), state.clone()))
                    .collect();
                (name.clone(), instances)
            })
            .collect()
    }

    /// Instances of one scenario; empty if the scenario is unknown.
    pub fn instances(&self, scenario: &str) -> BTreeMap<String, String> {
        self.scenarios
            .read()
            .get(scenario)
            .map(|instances| {
                instances
                    .iter()
                    .map(|(id, state)| (id.clone(), state.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// (scenario count, instance count)
    pub fn counts(&self) -> (usize, usize) {
        let scenarios = self.scenarios.read();
        let instances = scenarios.values().map(HashMap::len).sum();
        (scenarios.len(), instances)
    }
}
