use crate::{
    AppState,
    access::home_response,
    auth::{AuthUser, Viewer},
    models::{
        AdminDashboardStats, Booking, CreateBookingRequest, CreateDoctorRequest, Doctor,
        PresignedUrlRequest, PresignedUrlResponse, ProfileListing, ProfileResponse,
        RegisterUserRequest, UpdateProfilePictureRequest, User, UserProfile,
    },
    repository::CreateUserError,
    storage::{self, PictureKind, PictureUpload},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

/// SupabaseAuthResponse
///
/// The part of the Supabase `/auth/v1/signup` response we need: the new user's id.
#[derive(Deserialize)]
struct SupabaseAuthResponse {
    id: Uuid,
}

/// Rejects non-superusers with 403.
fn require_superuser(user: &AuthUser) -> Result<(), StatusCode> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

// --- Public Handlers ---

/// home
///
/// [Public Route] The clinic landing page.
pub async fn home(viewer: Viewer) -> Response {
    home_response(viewer.is_authenticated())
}

/// get_doctors
///
/// [Public Route] The doctor directory, grouped by department.
#[utoipa::path(
    get,
    path = "/doctors",
    responses((status = 200, description = "Doctors", body = [Doctor]))
)]
pub async fn get_doctors(State(state): State<AppState>) -> Json<Vec<Doctor>> {
    Json(state.repo.get_doctors().await)
}

/// get_doctor
///
/// [Public Route] A single doctor.
#[utoipa::path(
    get,
    path = "/doctors/{id}",
    params(("id" = i64, Path, description = "Doctor ID")),
    responses(
        (status = 200, description = "Found", body = Doctor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Doctor>, StatusCode> {
    state
        .repo
        .get_doctor(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// register_user
///
/// [Public Route] Signs the user up with the identity provider (Supabase), then mirrors the
/// account into `users` with an empty profile. The provider's id becomes our primary key.
///
/// Self-registered accounts are never superusers.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 400, description = "Rejected by the identity provider"),
        (status = 409, description = "Username taken"),
        (status = 500, description = "Identity provider or database unavailable")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, StatusCode> {
    if payload.username.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let (Some(supabase_url), Some(supabase_key)) = (
        state.config.supabase_url.as_deref(),
        state.config.supabase_key.as_deref(),
    ) else {
        tracing::error!("registration attempted without SUPABASE_URL/SUPABASE_KEY");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    let response = reqwest::Client::new()
        .post(format!("{}/auth/v1/signup", supabase_url))
        .header("apikey", supabase_key)
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("supabase signup request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !response.status().is_success() {
        // Existing email, weak password, ...
        return Err(StatusCode::BAD_REQUEST);
    }

    let supabase_user = response
        .json::<SupabaseAuthResponse>()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = User {
        id: supabase_user.id,
        username: payload.username,
        email: payload.email,
        is_superuser: false,
    };

    let identity_id = new_user.id;
    match state.repo.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user registered");
            Ok(Json(user))
        }
        // The identity provider account exists from here on; it has no local user to match.
        Err(CreateUserError::Conflict) => {
            tracing::warn!(%identity_id, "orphaned identity: username or id already taken");
            Err(StatusCode::CONFLICT)
        }
        Err(CreateUserError::Unavailable) => {
            tracing::error!(%identity_id, "orphaned identity: local user insert failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's account and profile picture.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, StatusCode> {
    let user = state.repo.get_user(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let profile_picture = state
        .repo
        .get_profile(id)
        .await
        .and_then(|profile| profile.profile_picture);

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        is_superuser: user.is_superuser,
        profile_picture,
    }))
}

/// update_profile_picture
///
/// [Authenticated Route] Points the caller's profile at a picture they uploaded. Only keys
/// under the caller's own `profiles/<id>/` prefix are accepted.
#[utoipa::path(
    put,
    path = "/me/profile-picture",
    request_body = UpdateProfilePictureRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Empty key"),
        (status = 403, description = "Key outside the caller's picture prefix")
    )
)]
pub async fn update_profile_picture(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfilePictureRequest>,
) -> Result<Json<UserProfile>, StatusCode> {
    let key = storage::sanitize_key(&payload.profile_picture_key);
    if key.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !storage::is_profile_picture_of(id, &key) {
        tracing::warn!(user_id = %id, %key, "profile picture key outside own prefix");
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .repo
        .set_profile_picture(id, key)
        .await
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// get_presigned_url
///
/// [Authenticated Route] A 10-minute URL for uploading the caller's profile picture straight
/// to storage. The key is `profiles/<user id>/<uuid>.<ext>`.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image")
    )
)]
pub async fn get_presigned_url(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, StatusCode> {
    presign_picture(&state, PictureKind::Profile, id, &payload).await
}

async fn presign_picture(
    state: &AppState,
    kind: PictureKind,
    user_id: Uuid,
    payload: &PresignedUrlRequest,
) -> Result<Json<PresignedUrlResponse>, StatusCode> {
    let upload = PictureUpload::new(kind, user_id, &payload.filename, &payload.file_type)
        .map_err(|reason| {
            tracing::debug!(%user_id, "upload rejected: {}", reason);
            StatusCode::BAD_REQUEST
        })?;

    let upload_url = state.storage.presign_upload(&upload).await.map_err(|e| {
        tracing::error!(%user_id, key = %upload.key, "storage error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: upload.key,
    }))
}

/// create_booking
///
/// [Authenticated Route] Books an appointment owned by the caller.
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booked", body = Booking),
        (status = 400, description = "Missing patient details"),
        (status = 404, description = "Unknown doctor")
    )
)]
pub async fn create_booking(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), StatusCode> {
    if payload.patient_name.trim().is_empty() || payload.patient_email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    if state.repo.get_doctor(payload.doctor_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let booking = state
        .repo
        .create_booking(payload, id)
        .await
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(booking_id = booking.id, doctor_id = booking.doctor_id, "booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

/// get_my_bookings
///
/// [Authenticated Route] The caller's bookings, newest first.
#[utoipa::path(
    get,
    path = "/me/bookings",
    responses((status = 200, description = "My bookings", body = [Booking]))
)]
pub async fn get_my_bookings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<Booking>> {
    Json(state.repo.get_my_bookings(id).await)
}

/// cancel_booking
///
/// [Authenticated Route] Owner-only cancel. Unknown and foreign bookings both yield 404.
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 204, description = "Cancelled"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn cancel_booking(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> StatusCode {
    if state.repo.delete_booking(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Dashboard counters served at the admin root.
#[utoipa::path(
    get,
    path = "/admin/",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not a superuser")
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    require_superuser(&user)?;
    Ok(Json(state.repo.get_stats().await))
}

/// get_admin_profiles
///
/// [Admin Route] Every profile with its username and picture.
#[utoipa::path(
    get,
    path = "/admin/profiles",
    responses((status = 200, description = "Profiles", body = [ProfileListing]))
)]
pub async fn get_admin_profiles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileListing>>, StatusCode> {
    require_superuser(&user)?;
    Ok(Json(state.repo.list_profiles().await))
}

/// get_admin_bookings
///
/// [Admin Route] Every booking in the system.
#[utoipa::path(
    get,
    path = "/admin/bookings",
    responses((status = 200, description = "Bookings", body = [Booking]))
)]
pub async fn get_admin_bookings(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, StatusCode> {
    require_superuser(&user)?;
    Ok(Json(state.repo.get_all_bookings().await))
}

/// delete_booking_admin
///
/// [Admin Route] Force-deletes any booking.
#[utoipa::path(
    delete,
    path = "/admin/bookings/{id}",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_booking_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    require_superuser(&user)?;
    if state.repo.delete_booking_admin(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// get_doctor_picture_upload_url
///
/// [Admin Route] Like `/upload/presigned`, for doctor pictures under `doctors/`.
#[utoipa::path(
    post,
    path = "/admin/uploads/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image"),
        (status = 403, description = "Not a superuser")
    )
)]
pub async fn get_doctor_picture_upload_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, StatusCode> {
    require_superuser(&user)?;
    presign_picture(&state, PictureKind::Doctor, user.id, &payload).await
}

/// create_doctor
///
/// [Admin Route] Adds a doctor to the directory. `pic_key`, when given, must be a key from
/// `/admin/uploads/presigned`.
#[utoipa::path(
    post,
    path = "/admin/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, description = "Created", body = Doctor),
        (status = 400, description = "Missing name or department, or a foreign picture key")
    )
)]
pub async fn create_doctor(
    user: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Doctor>), StatusCode> {
    require_superuser(&user)?;
    if payload.name.trim().is_empty() || payload.department.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Some(pic_key) = payload.pic_key.take() {
        let pic_key = storage::sanitize_key(&pic_key);
        if !storage::is_doctor_picture(&pic_key) {
            return Err(StatusCode::BAD_REQUEST);
        }
        payload.pic_key = Some(pic_key);
    }

    state
        .repo
        .create_doctor(payload)
        .await
        .map(|doctor| (StatusCode::CREATED, Json(doctor)))
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}
