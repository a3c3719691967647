use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers;
use crate::state::AppState;

/// Creates the function router.
///
/// The function exposes a single path: `POST /` answers questions,
/// `OPTIONS /` short-circuits CORS preflight. The handlers attach the CORS
/// headers themselves because every response must carry the identical set
/// regardless of status.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::ask).options(handlers::preflight))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
