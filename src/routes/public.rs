use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The clinic frontend: home page, doctor directory and registration. No authentication
/// required, although signed-in visitors still pass through the access router first.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // The clinic landing page (same template the access router renders).
        .route("/", get(handlers::home))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Sign-up through the identity provider, mirrored into `users` + `user_profiles`.
        .route("/register", post(handlers::register_user))
        // GET /doctors
        .route("/doctors", get(handlers::get_doctors))
        // GET /doctors/{id}
        .route("/doctors/{id}", get(handlers::get_doctor))
}
