//! Router construction from the route table.

use crate::api::Endpoint;
use crate::gate::access_gate;
use crate::handlers::{admin, auth, care};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{MethodFilter, MethodRouter, on};
use policy::Method;
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;

/// Build the full axum router: one route per table entry, all behind the
/// access gate.
pub fn build_router(state: AppState) -> Router {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();

    for route in state.routes.routes() {
        let method_router = handler(route.method, route.endpoint.endpoint);
        let path = route.pattern.as_str().to_string();
        let merged = match by_path.remove(&path) {
            Some(existing) => existing.merge(method_router),
            None => method_router,
        };
        by_path.insert(path, merged);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router)
        })
        .layer(middleware::from_fn_with_state(state.clone(), access_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handler(method: Method, endpoint: Endpoint) -> MethodRouter<AppState> {
    let filter = match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Patch => MethodFilter::PATCH,
        Method::Delete => MethodFilter::DELETE,
    };

    match endpoint {
        Endpoint::Register => on(filter, auth::register),
        Endpoint::Login => on(filter, auth::login),
        Endpoint::Logout => on(filter, auth::logout),
        Endpoint::CurrentUser => on(filter, auth::current_user),
        Endpoint::ListMedications => on(filter, care::list_medications),
        Endpoint::CreateMedication => on(filter, care::create_medication),
        Endpoint::DeleteMedication => on(filter, care::delete_medication),
        Endpoint::ListAppointments => on(filter, care::list_appointments),
        Endpoint::CreateAppointment => on(filter, care::create_appointment),
        Endpoint::DeleteAppointment => on(filter, care::delete_appointment),
        Endpoint::TriggerPanic => on(filter, care::trigger_panic),
        Endpoint::ListUsers => on(filter, admin::list_users),
        Endpoint::ToggleBlock => on(filter, admin::toggle_block),
    }
}
