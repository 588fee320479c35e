use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod access;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Route groups (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use access::{AccessDecision, RequestContext, route};
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_doctors, handlers::get_doctor, handlers::register_user,
        handlers::get_me, handlers::update_profile_picture, handlers::get_presigned_url,
        handlers::create_booking, handlers::get_my_bookings, handlers::cancel_booking,
        handlers::get_admin_stats, handlers::get_admin_profiles, handlers::get_admin_bookings,
        handlers::delete_booking_admin, handlers::get_doctor_picture_upload_url,
        handlers::create_doctor
    ),
    components(
        schemas(
            models::User, models::UserProfile, models::Doctor, models::Booking,
            models::RegisterUserRequest, models::CreateBookingRequest, models::CreateDoctorRequest,
            models::UpdateProfilePictureRequest, models::PresignedUrlRequest,
            models::PresignedUrlResponse, models::ProfileResponse, models::ProfileListing,
            models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "clinic-portal", description = "Clinic booking API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable application state: repository, storage and configuration.
/// Cloned per request; the services are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- FromRef implementations so extractors can pull single components ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Requires an `AuthUser` for the authenticated route group. The extractor rejects with
/// 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the route groups, the access router and the observability layers.
///
/// Layer order, outermost first: CORS, request id, tracing, access router, per-group auth.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Superuser checks happen in the admin handlers.
        .merge(admin::admin_routes())
        // Every request, matched or not, goes through the access router.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::restrict_admin_user_in_frontend,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, uri and the generated `x-request-id`, so
/// every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
