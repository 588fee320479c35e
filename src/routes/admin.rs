use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Management endpoints under `/admin/`. Paths are spelled out in full so the admin root
/// is exactly the `/admin/` the access router redirects superusers to.
///
/// Access control: each handler requires an `AuthUser` with `is_superuser`. Signed-in
/// regular users never reach these handlers; the access router answers them with the
/// home page first.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/
        // Dashboard counters.
        .route("/admin/", get(handlers::get_admin_stats))
        // GET /admin/profiles
        // Profile id, owning username and picture for every user.
        .route("/admin/profiles", get(handlers::get_admin_profiles))
        // GET /admin/bookings
        .route("/admin/bookings", get(handlers::get_admin_bookings))
        // DELETE /admin/bookings/{id}
        .route("/admin/bookings/{id}", delete(handlers::delete_booking_admin))
        // POST /admin/uploads/presigned
        // Upload URL for a doctor picture, keyed under `doctors/`.
        .route(
            "/admin/uploads/presigned",
            post(handlers::get_doctor_picture_upload_url),
        )
        // POST /admin/doctors
        .route("/admin/doctors", post(handlers::create_doctor))
}
