//! API route configuration

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::auth::require_role;
use super::handlers::{self, AppState};

/// `/greetings` is guarded by the role check; the login routes exist only
/// when auth is configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let greetings = Router::new()
        .route("/greetings", get(handlers::greet))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_role));

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .merge(greetings);

    if let Some(auth) = &state.auth {
        router = router
            .route("/login", get(handlers::login))
            .route(&auth.callback_path(), get(handlers::callback))
            .route("/logout", get(handlers::logout));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
