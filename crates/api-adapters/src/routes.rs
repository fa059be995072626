//! Route table of the Authoritative Store.

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::middleware::apply_standard_layers;
use crate::state::AppState;

pub fn poll_routes() -> Router<AppState> {
    Router::new()
        .route("/polls", get(handlers::list_polls).post(handlers::create_poll))
        .route("/polls/{id}", get(handlers::get_poll).post(handlers::cast_vote))
}

/// Poll routes nested under `base_path` (e.g. `/api`), plus `/healthz` and
/// `/metrics` at the root.
pub fn router(state: AppState, base_path: &str, allow_any_origin: bool) -> Router {
    let prefix = base_path.trim_matches('/');
    let api = if prefix.is_empty() {
        poll_routes()
    } else {
        Router::new().nest(&format!("/{prefix}"), poll_routes())
    };

    let app = Router::new()
        .merge(api)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    apply_standard_layers(app, allow_any_origin)
}
