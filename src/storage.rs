//! Picture storage: object keys for profile and doctor pictures, and presigned uploads.
//!
//! Clients never stream file bodies through the API. They ask for a [`PictureUpload`],
//! receive a short-lived signed `PUT` URL, upload straight to the bucket and then store the
//! returned key on their profile (or on a doctor, for superusers).

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;

/// How long a presigned upload URL stays valid.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// Keys of profile pictures live under `profiles/<user id>/`.
pub const PROFILE_PICTURES: &str = "profiles";
/// Keys of doctor pictures live under `doctors/`.
pub const DOCTOR_PICTURES: &str = "doctors";

/// Extensions kept verbatim from the uploaded filename.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "bmp", "heic"];

/// PictureKind
///
/// Who a picture belongs to. Decides the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureKind {
    /// A user's own profile picture.
    Profile,
    /// A doctor's directory picture. Superusers only.
    Doctor,
}

/// PictureUpload
///
/// A validated upload request: the object key the file will land on and the MIME type
/// the signed URL is pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureUpload {
    pub key: String,
    pub content_type: String,
}

impl PictureUpload {
    /// Builds the object key for a new picture.
    ///
    /// Only `image/*` types are accepted (SVG excluded, it can carry scripts). The extension
    /// comes from `filename` when it is a known image extension, otherwise from the MIME
    /// subtype.
    pub fn new(
        kind: PictureKind,
        owner: Uuid,
        filename: &str,
        content_type: &str,
    ) -> Result<Self, String> {
        let content_type = content_type.trim().to_ascii_lowercase();
        let subtype = content_type
            .strip_prefix("image/")
            .filter(|subtype| !subtype.is_empty())
            .ok_or_else(|| format!("not an image type: {content_type:?}"))?;

        if subtype.starts_with("svg") {
            return Err("svg pictures are not accepted".to_string());
        }

        let extension = picture_extension(filename, subtype);
        let key = match kind {
            PictureKind::Profile => {
                format!("{}{}.{}", profile_prefix(owner), Uuid::new_v4(), extension)
            }
            PictureKind::Doctor => format!("{DOCTOR_PICTURES}/{}.{}", Uuid::new_v4(), extension),
        };

        Ok(Self { key, content_type })
    }
}

fn picture_extension(filename: &str, subtype: &str) -> String {
    let from_filename = Path::new(filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));

    from_filename.unwrap_or_else(|| match subtype {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        other if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric()) => {
            other.to_string()
        }
        _ => "img".to_string(),
    })
}

/// The key prefix owned by one user, trailing slash included.
pub fn profile_prefix(user_id: Uuid) -> String {
    format!("{PROFILE_PICTURES}/{user_id}/")
}

/// True when `key` is a single object directly under `user_id`'s profile prefix.
pub fn is_profile_picture_of(user_id: Uuid, key: &str) -> bool {
    key.strip_prefix(&profile_prefix(user_id))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// True when `key` is a single object directly under the doctor picture prefix.
pub fn is_doctor_picture(key: &str) -> bool {
    key.strip_prefix(DOCTOR_PICTURES)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments from an object key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// StorageService
///
/// Signs uploads into the picture bucket. Handlers only see `Arc<dyn StorageService>`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if it is missing. Only called for `Env::Local` (MinIO).
    async fn ensure_bucket_exists(&self);

    /// A signed URL the client can `PUT` `upload` to. The signature covers the content type.
    async fn presign_upload(&self, upload: &PictureUpload) -> Result<String, String>;
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;

/// S3StorageClient
///
/// MinIO locally, Supabase Storage in production. Both need path-style addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket: String,
}

impl S3StorageClient {
    pub fn new(config: &AppConfig) -> Self {
        let credentials = s3::config::Credentials::new(
            &config.s3_key,
            &config.s3_secret,
            None,
            None,
            "clinic-portal",
        );

        let sdk_config = s3::Config::builder()
            .behavior_version_latest()
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .region(s3::config::Region::new(config.s3_region.clone()))
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(sdk_config),
            bucket: config.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => tracing::info!(bucket = %self.bucket, "created picture bucket"),
            Err(e) => tracing::debug!(bucket = %self.bucket, "create_bucket skipped: {}", e),
        }
    }

    async fn presign_upload(&self, upload: &PictureUpload) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&upload.key)
            .content_type(&upload.content_type)
            .presigned(presigning)
            .await
            .map(|request| request.uri().to_string())
            .map_err(|e| e.to_string())
    }
}

/// MockStorageService
///
/// In-memory `StorageService` for tests. Produces deterministic URLs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every call fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_upload(&self, upload: &PictureUpload) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage unavailable".to_string());
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?content-type={}&signature=fake",
            sanitize_key(&upload.key),
            upload.content_type
        ))
    }
}
