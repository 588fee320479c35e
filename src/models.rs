use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Schemas (Mapped to Database) ---

/// User
///
/// The local mirror of an identity-provider account, stored in `users`.
/// `is_superuser` is the privilege flag that grants access to the admin area.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    // Primary key, shared with the identity provider's user id.
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
}

/// UserProfile
///
/// One row per user in `user_profiles`. The picture is an object key in the upload bucket.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: Uuid,
    pub profile_picture: Option<String>,
}

/// Doctor
///
/// A practitioner patients can book with.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub department: String,
    // Object key of the doctor's picture, if one was uploaded.
    pub pic: Option<String>,
}

/// Booking
///
/// An appointment request from `bookings`. Owned by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Booking {
    pub id: i64,
    pub user_id: Uuid,
    pub doctor_id: i64,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
    #[ts(type = "string")]
    pub booking_date: NaiveDate,
    #[ts(type = "string")]
    pub booked_on: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input for `POST /register`. The password is only passed through to the identity
/// provider; it is never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// CreateBookingRequest
///
/// Input for `POST /bookings`. The owner is taken from the authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBookingRequest {
    pub doctor_id: i64,
    pub patient_name: String,
    pub patient_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,
    #[ts(type = "string")]
    pub booking_date: NaiveDate,
}

/// CreateDoctorRequest
///
/// Input for `POST /admin/doctors`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_key: Option<String>,
}

/// UpdateProfilePictureRequest
///
/// Input for `PUT /me/profile-picture`, sent after the client finished the presigned upload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfilePictureRequest {
    pub profile_picture_key: String,
}

/// PresignedUrlRequest
///
/// Input for `POST /upload/presigned`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// Original filename, used to derive the object key extension.
    #[schema(example = "avatar.png")]
    pub filename: String,
    /// MIME type the upload is constrained to.
    #[schema(example = "image/png")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// The temporary upload URL and the object key to reference afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

// --- Output Schemas ---

/// ProfileResponse
///
/// Output of `GET /me`: the user joined with their profile row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub profile_picture: Option<String>,
}

/// ProfileListing
///
/// One row of the admin profile listing: profile id, owning username and picture.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ProfileListing {
    pub id: i64,
    pub user: String,
    pub profile_picture: Option<String>,
}

/// AdminDashboardStats
///
/// Output of `GET /admin/`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_profiles: i64,
    pub total_doctors: i64,
    pub total_bookings: i64,
}
