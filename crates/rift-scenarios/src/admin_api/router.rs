//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{mappings, scenarios, system};
use crate::admin_api::types::{collect_body, error_response, not_found};
use crate::mock::MockEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Parsed route under `/scenarios`
#[derive(Debug, PartialEq)]
enum ScenarioRoute {
    /// GET/PUT/DELETE /scenarios
    Root,
    /// DELETE /scenarios/all
    All,
    /// GET/DELETE /scenarios/:scenario
    Scenario(String),
    /// GET/DELETE /scenarios/:scenario/:instance
    Instance(String, String),
    /// PUT /scenarios/:scenario/:instance/:state
    State(String, String, String),
}

impl ScenarioRoute {
    /// Parse route from decoded path segments after `/scenarios`
    ///
    /// Names are never empty, so `/scenarios//x` routes nowhere.
    fn parse(segments: &[String]) -> Option<Self> {
        if segments.iter().any(String::is_empty) {
            return None;
        }
        match segments {
            [] => Some(ScenarioRoute::Root),
            [all] if all == "all" => Some(ScenarioRoute::All),
            [scenario] => Some(ScenarioRoute::Scenario(scenario.clone())),
            [scenario, instance] => Some(ScenarioRoute::Instance(
                scenario.clone(),
                instance.clone(),
            )),
            [scenario, instance, state] => Some(ScenarioRoute::State(
                scenario.clone(),
                instance.clone(),
                state.clone(),
            )),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Admin API: {} {}", method, path);

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, &e)),
    };

    Ok(route_by_path(&method, &path, &body, &engine))
}

/// Route a buffered admin request
pub(crate) fn route_by_path(
    method: &Method,
    path: &str,
    body: &[u8],
    engine: &MockEngine,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") => return system::handle_health(),
        (&Method::GET, "/metrics") => return system::handle_metrics(engine),
        (&Method::POST, "/reset") => return mappings::handle_reset(engine),
        _ => {}
    }

    let path = path.trim_end_matches('/');

    if path == "/mappings" {
        return match *method {
            Method::GET => mappings::handle_list(engine),
            Method::POST => mappings::handle_add(engine, body),
            Method::DELETE => mappings::handle_delete_all(engine),
            _ => not_found(),
        };
    }

    if let Some(rest) = path.strip_prefix("/mappings/") {
        let id = match decode_segment(rest) {
            Ok(id) => id,
            Err(response) => return response,
        };
        return match *method {
            Method::GET => mappings::handle_get(engine, &id),
            Method::DELETE => mappings::handle_delete(engine, &id),
            _ => not_found(),
        };
    }

    if path == "/scenarios" {
        return route_scenarios(method, &[], body, engine);
    }

    if let Some(rest) = path.strip_prefix("/scenarios/") {
        let segments = match rest
            .split('/')
            .map(decode_segment)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(s) => s,
            Err(response) => return response,
        };
        return route_scenarios(method, &segments, body, engine);
    }

    not_found()
}

/// Route scenario requests
fn route_scenarios(
    method: &Method,
    segments: &[String],
    body: &[u8],
    engine: &MockEngine,
) -> Response<Full<Bytes>> {
    let route = match ScenarioRoute::parse(segments) {
        Some(r) => r,
        None => return not_found(),
    };
    let store = engine.store();

    match (method, route) {
        // /scenarios
        (&Method::GET, ScenarioRoute::Root) => scenarios::handle_list(store),
        (&Method::PUT, ScenarioRoute::Root) => scenarios::handle_set_states(store, body),
        (&Method::DELETE, ScenarioRoute::Root) => scenarios::handle_delete_bulk(store, body),

        // /scenarios/all
        (&Method::DELETE, ScenarioRoute::All) => scenarios::handle_clear(store),
        (&Method::GET, ScenarioRoute::All) => scenarios::handle_get(store, "all"),

        // /scenarios/:scenario
        (&Method::GET, ScenarioRoute::Scenario(scenario)) => {
            scenarios::handle_get(store, &scenario)
        }
        (&Method::DELETE, ScenarioRoute::Scenario(scenario)) => {
            scenarios::handle_delete_scenario(store, &scenario)
        }

        // /scenarios/:scenario/:instance
        (&Method::GET, ScenarioRoute::Instance(scenario, instance)) => {
            scenarios::handle_get_instance(store, &scenario, &instance)
        }
        (&Method::DELETE, ScenarioRoute::Instance(scenario, instance)) => {
            scenarios::handle_delete_instance(store, &scenario, &instance)
        }

        // /scenarios/:scenario/:instance/:state
        (&Method::PUT, ScenarioRoute::State(scenario, instance, state)) => {
            scenarios::handle_set_state(store, &scenario, &instance, &state)
        }

        _ => not_found(),
    }
}

/// Percent-decode one path segment
fn decode_segment(segment: &str) -> Result<String, Response<Full<Bytes>>> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Path segment '{segment}' is not valid UTF-8"),
            )
        })
}
