//! Prometheus metrics for rift-scenarios.
//!
//! Tracks mock request outcomes, scenario transitions and admin activity.
use crate::scenario::ScenarioStore;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};

lazy_static! {
    /// Mock requests by outcome
    pub static ref MOCK_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "rift_scenarios_mock_requests_total",
        "Total number of requests served by the mock listener",
        &["method", "outcome"]  // outcome: matched|unmatched
    )
    .unwrap();

    /// Successful state transitions
    pub static ref SCENARIO_TRANSITIONS_TOTAL: CounterVec = register_counter_vec!(
        "rift_scenarios_transitions_total",
        "Total number of scenario state transitions applied by matched mappings",
        &["scenario"]
    )
    .unwrap();

    /// Requests that matched a mapping's pattern but not its required state
    pub static ref SCENARIO_GATE_REJECTIONS_TOTAL: CounterVec = register_counter_vec!(
        "rift_scenarios_gate_rejections_total",
        "Total number of requests rejected by a scenario state gate",
        &["scenario"]
    )
    .unwrap();

    /// Admin API operations
    pub static ref ADMIN_OPS_TOTAL: CounterVec = register_counter_vec!(
        "rift_scenarios_admin_ops_total",
        "Total number of admin API operations",
        &["operation", "result"]  // result: ok|not_found|bad_request|error
    )
    .unwrap();

    /// Tracked scenarios and instances, refreshed on scrape
    pub static ref SCENARIO_ENTRIES: GaugeVec = register_gauge_vec!(
        "rift_scenarios_tracked",
        "Number of tracked scenario entries",
        &["kind"]  // kind: scenarios|instances
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh the scenario gauges from the store
pub fn update_scenario_gauges(store: &ScenarioStore) {
    let (scenarios, instances) = store.counts();
    SCENARIO_ENTRIES
        .with_label_values(&["scenarios"])
        .set(scenarios as f64);
    SCENARIO_ENTRIES
        .with_label_values(&["instances"])
        .set(instances as f64);
}

/// Helper to record a mock request outcome
pub fn record_mock_request(method: &str, matched: bool) {
    let outcome = if matched { "matched" } else { "unmatched" };
    MOCK_REQUESTS_TOTAL
        .with_label_values(&[method, outcome])
        .inc();
}

/// Helper to record a scenario transition
pub fn record_transition(scenario: &str) {
    SCENARIO_TRANSITIONS_TOTAL
        .with_label_values(&[scenario])
        .inc();
}

/// Helper to record a gate rejection
pub fn record_gate_rejection(scenario: &str) {
    SCENARIO_GATE_REJECTIONS_TOTAL
        .with_label_values(&[scenario])
        .inc();
}

/// Helper to record an admin operation
pub fn record_admin_op(operation: &str, result: &str) {
    ADMIN_OPS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}
