//! State-gated request matching.
//!
//! A mapping fires only when its request pattern matches *and* its scenario
//! instance is in the required state. The state check and the transition are
//! one `compare_and_set` on the store, so of several concurrent requests
//! racing on the same instance exactly one can take a given transition.

use super::resolver::{InstanceIdentification, InstanceSource};
use super::store::ScenarioStore;
use super::{ScenarioError, DEFAULT_INSTANCE};
use crate::metrics;
use crate::predicate::{CompiledRequestSpec, MatchResult};
use crate::request::MockRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scenario fields of a mapping, flattened into the mapping object.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioGateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_identification: Option<InstanceIdentification>,
}

/// Compiled scenario gate.
#[derive(Debug, Clone)]
pub struct ScenarioGate {
    scenario: String,
    required_state: Option<String>,
    new_state: Option<String>,
    instance: InstanceSource,
}

impl ScenarioGate {
    /// Compile the scenario fields. No scenario name means no gate.
    pub fn compile(config: &ScenarioGateConfig) -> Result<Option<Self>, ScenarioError> {
        let Some(scenario) = &config.scenario_name else {
            if config.required_scenario_state.is_some() {
                return Err(ScenarioError::MissingScenarioName("requiredScenarioState"));
            }
            if config.new_scenario_state.is_some() {
                return Err(ScenarioError::MissingScenarioName("newScenarioState"));
            }
            if config.instance_identification.is_some() {
                return Err(ScenarioError::MissingScenarioName("instanceIdentification"));
            }
            return Ok(None);
        };

        Ok(Some(Self {
            scenario: scenario.clone(),
            required_state: config.required_scenario_state.clone(),
            new_state: config.new_scenario_state.clone(),
            instance: InstanceSource::compile(config.instance_identification.as_ref())?,
        }))
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Instance key for a request, falling back to the default instance.
    pub fn instance_key(&self, request: &MockRequest) -> String {
        self.instance
            .resolve(request)
            .unwrap_or_else(|| DEFAULT_INSTANCE.to_string())
    }

    /// Check the required state and apply the transition atomically.
    pub fn apply(&self, request: &MockRequest, store: &ScenarioStore) -> MatchResult {
        let instance = self.instance_key(request);

        // Make sure the instance exists even for check-only gates
        let observed = store.get_or_create(&self.scenario, &instance);

        let fired = store.compare_and_set(
            &self.scenario,
            &instance,
            self.required_state.as_deref(),
            self.new_state.as_deref(),
        );

        if !fired {
            debug!(
                "Scenario '{}' instance '{}' not in required state {:?} (observed '{}')",
                self.scenario, instance, self.required_state, observed
            );
            metrics::record_gate_rejection(&self.scenario);
            return MatchResult::NoMatch;
        }

        if let Some(new_state) = &self.new_state {
            debug!(
                "Scenario '{}' instance '{}' transitioned to '{}'",
                self.scenario, instance, new_state
            );
            metrics::record_transition(&self.scenario);
        }
        MatchResult::Exact
    }
}

/// Request pattern plus optional scenario gate.
#[derive(Debug, Clone)]
pub struct StateGatedMatcher {
    request: CompiledRequestSpec,
    gate: Option<ScenarioGate>,
}

impl StateGatedMatcher {
    pub fn new(request: CompiledRequestSpec, gate: Option<ScenarioGate>) -> Self {
        Self { request, gate }
    }

    pub fn gate(&self) -> Option<&ScenarioGate> {
        self.gate.as_ref()
    }

    /// Decide whether the mapping fires for this request.
    ///
    /// The request pattern is checked first, so requests that do not match
    /// never read or write scenario state.
    pub fn evaluate(&self, request: &MockRequest, store: &ScenarioStore) -> MatchResult {
        let result = self.request.evaluate(request);
        if !result.is_exact() {
            return MatchResult::NoMatch;
        }

        match &self.gate {
            None => result,
            Some(gate) => gate.apply(request, store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::RequestSpec;
    use crate::scenario::STARTED;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn matcher(request: serde_json::Value, gate: serde_json::Value) -> StateGatedMatcher {
        let spec: RequestSpec = serde_json::from_value(request).unwrap();
        let gate: ScenarioGateConfig = serde_json::from_value(gate).unwrap();
        StateGatedMatcher::new(
            CompiledRequestSpec::compile(&spec).unwrap(),
            ScenarioGate::compile(&gate).unwrap(),
        )
    }

    fn fires(matcher: &StateGatedMatcher, request: &MockRequest, store: &ScenarioStore) -> bool {
        matcher.evaluate(request, store).is_exact()
    }

    // =========================================================================
    // Gate configuration
    // =========================================================================

    #[test]
    fn test_no_scenario_name_is_plain_matching() {
        let m = matcher(json!({"urlPath": "/a"}), json!({}));
        let store = ScenarioStore::new();
        assert!(m.gate().is_none());
        assert!(fires(&m, &MockRequest::new("GET", "/a"), &store));
        assert!(!fires(&m, &MockRequest::new("GET", "/b"), &store));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_state_fields_require_scenario_name() {
        let config = ScenarioGateConfig {
            new_scenario_state: Some("TWO".to_string()),
            ..Default::default()
        };
        let err = ScenarioGate::compile(&config).unwrap_err();
        assert!(matches!(err, ScenarioError::MissingScenarioName("newScenarioState")));
    }

    #[test]
    fn test_unknown_instance_source_fails_compile() {
        let config: ScenarioGateConfig = serde_json::from_value(json!({
            "scenarioName": "s",
            "instanceIdentification": {"source": "header", "parameter": "X"}
        }))
        .unwrap();
        assert!(matches!(
            ScenarioGate::compile(&config),
            Err(ScenarioError::UnknownInstanceSource(_))
        ));
    }

    // =========================================================================
    // Gating semantics
    // =========================================================================

    #[test]
    fn test_check_only_gate_creates_instance() {
        let m = matcher(
            json!({"urlPath": "/a"}),
            json!({"scenarioName": "s", "requiredScenarioState": "Started"}),
        );
        let store = ScenarioStore::new();
        assert!(fires(&m, &MockRequest::new("GET", "/a"), &store));
        assert_eq!(store.get("s", DEFAULT_INSTANCE).as_deref(), Some(STARTED));
    }

    #[test]
    fn test_wrong_state_falls_through() {
        let m = matcher(
            json!({"urlPath": "/a"}),
            json!({"scenarioName": "s", "requiredScenarioState": "TWO", "newScenarioState": "THREE"}),
        );
        let store = ScenarioStore::new();
        assert!(!fires(&m, &MockRequest::new("GET", "/a"), &store));
        assert_eq!(store.get("s", DEFAULT_INSTANCE).as_deref(), Some(STARTED));
    }

    #[test]
    fn test_entry_point_always_fires() {
        let m = matcher(
            json!({"urlPath": "/a"}),
            json!({"scenarioName": "s", "newScenarioState": "TWO"}),
        );
        let store = ScenarioStore::new();
        store.set("s", DEFAULT_INSTANCE, "ELSEWHERE");
        assert!(fires(&m, &MockRequest::new("GET", "/a"), &store));
        assert_eq!(store.get("s", DEFAULT_INSTANCE).as_deref(), Some("TWO"));
    }

    #[test]
    fn test_non_matching_request_never_touches_state() {
        let gates = [
            json!({"scenarioName": "s"}),
            json!({"scenarioName": "s", "newScenarioState": "TWO"}),
            json!({"scenarioName": "s", "requiredScenarioState": "Started", "newScenarioState": "TWO"}),
            json!({
                "scenarioName": "s",
                "newScenarioState": "TWO",
                "instanceIdentification": {"source": "cookie", "parameter": "SESSION"}
            }),
        ];
        for gate in gates {
            let m = matcher(json!({"urlPath": "/a", "method": "POST"}), gate);
            let store = ScenarioStore::new();
            let request = MockRequest::new("GET", "/a").with_header("Cookie", "SESSION=1");
            assert!(!fires(&m, &request, &store));
            assert!(store.snapshot().is_empty());
        }
    }

    #[test]
    fn test_two_three_sequence() {
        let step1 = matcher(
            json!({"urlPath": "/step"}),
            json!({
                "scenarioName": "flow",
                "newScenarioState": "TWO",
                "instanceIdentification": {"source": "queryParameter", "parameter": "id"}
            }),
        );
        let step2 = matcher(
            json!({"urlPath": "/step"}),
            json!({
                "scenarioName": "flow",
                "requiredScenarioState": "TWO",
                "newScenarioState": "THREE",
                "instanceIdentification": {"source": "queryParameter", "parameter": "id"}
            }),
        );
        let store = ScenarioStore::new();
        let request = MockRequest::new("GET", "/step?id=1");

        // Most specific first, as the engine orders them
        let first_firing = |store: &ScenarioStore| {
            if fires(&step2, &request, store) {
                2
            } else if fires(&step1, &request, store) {
                1
            } else {
                0
            }
        };

        assert_eq!(first_firing(&store), 1);
        assert_eq!(store.get("flow", "1").as_deref(), Some("TWO"));
        assert_eq!(first_firing(&store), 2);
        assert_eq!(store.get("flow", "1").as_deref(), Some("THREE"));
    }

    #[test]
    fn test_cookie_instances_are_independent() {
        let m = matcher(
            json!({"urlPath": "/cart"}),
            json!({
                "scenarioName": "cart",
                "requiredScenarioState": "Started",
                "newScenarioState": "FILLED",
                "instanceIdentification": {"source": "cookie", "parameter": "SESSION"}
            }),
        );
        let store = ScenarioStore::new();
        let session1 = MockRequest::new("GET", "/cart").with_header("Cookie", "SESSION=1");
        let session2 = MockRequest::new("GET", "/cart").with_header("Cookie", "SESSION=2");

        assert!(fires(&m, &session1, &store));
        assert_eq!(store.get("cart", "1").as_deref(), Some("FILLED"));
        assert_eq!(store.get("cart", "2"), None);

        // Session 1 already moved on; session 2 still starts fresh
        assert!(!fires(&m, &session1, &store));
        assert!(fires(&m, &session2, &store));
        assert_eq!(store.get("cart", "2").as_deref(), Some("FILLED"));
    }

    #[test]
    fn test_default_instance_equivalence() {
        let unconfigured = matcher(
            json!({"urlPath": "/a"}),
            json!({"scenarioName": "s", "requiredScenarioState": "Started", "newScenarioState": "X"}),
        );
        // Resolves to nothing for every request, so the default key is used
        let never_resolves = matcher(
            json!({"urlPath": "/a"}),
            json!({
                "scenarioName": "s",
                "requiredScenarioState": "Started",
                "newScenarioState": "X",
                "instanceIdentification": {"source": "queryParameter", "parameter": "missing"}
            }),
        );

        let requests = [
            MockRequest::new("GET", "/a"),
            MockRequest::new("GET", "/a?other=1"),
            MockRequest::new("GET", "/b"),
            MockRequest::new("GET", "/a"),
        ];

        let store_a = ScenarioStore::new();
        let store_b = ScenarioStore::new();
        for request in &requests {
            assert_eq!(
                unconfigured.evaluate(request, &store_a),
                never_resolves.evaluate(request, &store_b)
            );
            assert_eq!(store_a.snapshot(), store_b.snapshot());
        }
        assert_eq!(store_a.get("s", DEFAULT_INSTANCE).as_deref(), Some("X"));
    }

    #[test]
    fn test_concurrent_requests_fire_transition_once() {
        let m = Arc::new(matcher(
            json!({"urlPath": "/once"}),
            json!({"scenarioName": "once", "requiredScenarioState": "Started", "newScenarioState": "DONE"}),
        ));
        let store = Arc::new(ScenarioStore::new());
        let num_threads = 12;
        let barrier = Arc::new(Barrier::new(num_threads));
        let fired = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let m = Arc::clone(&m);
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let fired = Arc::clone(&fired);
                thread::spawn(move || {
                    let request = MockRequest::new("GET", "/once");
                    barrier.wait();
                    if m.evaluate(&request, &store).is_exact() {
                        fired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("once", DEFAULT_INSTANCE).as_deref(), Some("DONE"));
    }
}
