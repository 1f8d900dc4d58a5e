//! Scenario state handlers.
//!
//! Every handler acts directly on the [`ScenarioStore`]; none of them run
//! request matching. Bulk payloads are parsed in full before the store is
//! touched, so a malformed body never leaves a partial update behind.

use crate::admin_api::types::{
    error_response, json_response, ok_empty, BulkDeleteRequest, BulkSetRequest, DeletionOutcome,
    InstanceStateResponse, BULK_DELETE_USAGE, BULK_SET_USAGE,
};
use crate::metrics;
use crate::scenario::ScenarioStore;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// GET /scenarios - All scenarios with their instances
pub fn handle_list(store: &ScenarioStore) -> Response<Full<Bytes>> {
    metrics::record_admin_op("list_scenarios", "ok");
    json_response(StatusCode::OK, &store.snapshot())
}

/// GET /scenarios/:scenario - Instances of one scenario (empty if unknown)
pub fn handle_get(store: &ScenarioStore, scenario: &str) -> Response<Full<Bytes>> {
    metrics::record_admin_op("get_scenario", "ok");
    json_response(StatusCode::OK, &store.instances(scenario))
}

/// GET /scenarios/:scenario/:instance - State of one instance
pub fn handle_get_instance(
    store: &ScenarioStore,
    scenario: &str,
    instance: &str,
) -> Response<Full<Bytes>> {
    match store.get(scenario, instance) {
        Some(state) => {
            metrics::record_admin_op("get_instance", "ok");
            json_response(
                StatusCode::OK,
                &InstanceStateResponse {
                    scenario: scenario.to_string(),
                    instance: instance.to_string(),
                    state,
                },
            )
        }
        None => {
            metrics::record_admin_op("get_instance", "not_found");
            instance_not_found(scenario, instance)
        }
    }
}

/// PUT /scenarios/:scenario/:instance/:state - Set one instance
pub fn handle_set_state(
    store: &ScenarioStore,
    scenario: &str,
    instance: &str,
    state: &str,
) -> Response<Full<Bytes>> {
    store.set(scenario, instance, state);
    info!(
        "Scenario '{}' instance '{}' set to '{}'",
        scenario, instance, state
    );
    metrics::record_admin_op("set_state", "ok");
    ok_empty()
}

/// PUT /scenarios - Set many instances at once
pub fn handle_set_states(store: &ScenarioStore, body: &[u8]) -> Response<Full<Bytes>> {
    let request: BulkSetRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected bulk scenario update: {}", e);
            metrics::record_admin_op("set_states", "bad_request");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid scenario states payload: {e}\n{BULK_SET_USAGE}"),
            );
        }
    };

    let mut updated = 0;
    for (scenario, instances) in &request {
        for (instance, state) in instances {
            store.set(scenario, instance, state);
            updated += 1;
        }
    }
    info!("Bulk scenario update set {} instance(s)", updated);
    metrics::record_admin_op("set_states", "ok");
    ok_empty()
}

/// DELETE /scenarios/:scenario/:instance - Delete one instance
pub fn handle_delete_instance(
    store: &ScenarioStore,
    scenario: &str,
    instance: &str,
) -> Response<Full<Bytes>> {
    if store.delete_instance(scenario, instance) {
        info!("Deleted scenario '{}' instance '{}'", scenario, instance);
        metrics::record_admin_op("delete_instance", "ok");
        ok_empty()
    } else {
        metrics::record_admin_op("delete_instance", "not_found");
        instance_not_found(scenario, instance)
    }
}

/// DELETE /scenarios/:scenario - Delete a scenario and all its instances
pub fn handle_delete_scenario(store: &ScenarioStore, scenario: &str) -> Response<Full<Bytes>> {
    if store.delete_scenario(scenario) {
        info!("Deleted scenario '{}'", scenario);
        metrics::record_admin_op("delete_scenario", "ok");
        ok_empty()
    } else {
        metrics::record_admin_op("delete_scenario", "not_found");
        error_response(
            StatusCode::NOT_FOUND,
            &format!("Scenario '{scenario}' not found"),
        )
    }
}

/// DELETE /scenarios/all - Delete every scenario
pub fn handle_clear(store: &ScenarioStore) -> Response<Full<Bytes>> {
    store.clear_all();
    info!("Deleted all scenarios");
    metrics::record_admin_op("clear_scenarios", "ok");
    ok_empty()
}

/// DELETE /scenarios - Delete several scenarios or instances
///
/// Responds with one entry per named scenario: a flag when the whole
/// scenario was deleted, or a flag per instance when instances were listed.
pub fn handle_delete_bulk(store: &ScenarioStore, body: &[u8]) -> Response<Full<Bytes>> {
    let request: BulkDeleteRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected bulk scenario delete: {}", e);
            metrics::record_admin_op("delete_bulk", "bad_request");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid scenario deletion payload: {e}\n{BULK_DELETE_USAGE}"),
            );
        }
    };

    let mut result: BTreeMap<String, DeletionOutcome> = BTreeMap::new();
    for entry in request.scenarios {
        let outcome = match entry.instances {
            None => DeletionOutcome::Scenario(store.delete_scenario(&entry.name)),
            Some(instances) => DeletionOutcome::Instances(
                instances
                    .into_iter()
                    .map(|instance| {
                        let existed = store.delete_instance(&entry.name, &instance);
                        (instance, existed)
                    })
                    .collect(),
            ),
        };
        result.insert(entry.name, outcome);
    }

    info!("Bulk scenario delete processed {} scenario(s)", result.len());
    metrics::record_admin_op("delete_bulk", "ok");
    json_response(StatusCode::OK, &result)
}

fn instance_not_found(scenario: &str, instance: &str) -> Response<Full<Bytes>> {
    error_response(
        StatusCode::NOT_FOUND,
        &format!("Instance '{instance}' of scenario '{scenario}' not found"),
    )
}
