use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// The patient area. Wrapped in the auth layer in `create_router`, so every handler here
/// receives a validated `AuthUser`; ownership checks use its id.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // PUT /me/profile-picture
        // Stores the object key produced by a finished presigned upload.
        .route("/me/profile-picture", put(handlers::update_profile_picture))
        // GET /me/bookings
        .route("/me/bookings", get(handlers::get_my_bookings))
        // POST /upload/presigned
        // 10-minute upload URL for the caller's profile picture.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // POST /bookings
        .route("/bookings", post(handlers::create_booking))
        // DELETE /bookings/{id}
        // Owner-only cancel.
        .route("/bookings/{id}", delete(handlers::cancel_booking))
}
