#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request},
    response::Response,
};
use chrono::{NaiveDate, Utc};
use clinic_portal::{
    AppConfig, AppState,
    auth::{AuthUser, LOCAL_USER_HEADER},
    models::{
        AdminDashboardStats, Booking, CreateBookingRequest, CreateDoctorRequest, Doctor,
        ProfileListing, User, UserProfile,
    },
    repository::{CreateUserError, Repository},
    storage::MockStorageService,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const SUPERUSER_ID: Uuid = Uuid::from_u128(1);
pub const PATIENT_ID: Uuid = Uuid::from_u128(2);

// --- Mock Repository ---

/// In-memory repository. Writes are recorded so tests can assert on them.
#[derive(Default)]
pub struct MockRepo {
    pub users: Vec<User>,
    pub doctors: Vec<Doctor>,
    pub profiles: Vec<ProfileListing>,
    pub bookings: Mutex<Vec<Booking>>,
    pub stats: AdminDashboardStats,
    pub picture_updates: Mutex<Vec<(Uuid, String)>>,
    /// Number of `get_user` calls.
    pub user_lookups: AtomicUsize,
    /// When true, `create_user` fails like a dropped connection.
    pub fail_writes: bool,
}

impl MockRepo {
    /// One superuser, one patient and one doctor.
    pub fn seeded() -> Self {
        Self {
            users: vec![superuser_record(), patient_record()],
            doctors: vec![doctor(7)],
            profiles: vec![ProfileListing {
                id: 1,
                user: "patient".to_string(),
                profile_picture: Some(format!("profiles/{PATIENT_ID}/a.png")),
            }],
            stats: AdminDashboardStats {
                total_users: 2,
                total_profiles: 1,
                total_doctors: 1,
                total_bookings: 0,
            },
            ..Self::default()
        }
    }

    pub fn with_bookings(self, bookings: Vec<Booking>) -> Self {
        *self.bookings.lock().unwrap() = bookings;
        self
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.users.iter().find(|u| u.id == id).cloned()
    }
    async fn create_user(&self, user: User) -> Result<User, CreateUserError> {
        if self.fail_writes {
            return Err(CreateUserError::Unavailable);
        }
        if self
            .users
            .iter()
            .any(|u| u.id == user.id || u.username == user.username)
        {
            return Err(CreateUserError::Conflict);
        }
        Ok(user)
    }
    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile> {
        self.users.iter().find(|u| u.id == user_id).map(|u| UserProfile {
            id: 1,
            user_id: u.id,
            profile_picture: None,
        })
    }
    async fn set_profile_picture(&self, user_id: Uuid, key: String) -> Option<UserProfile> {
        self.picture_updates
            .lock()
            .unwrap()
            .push((user_id, key.clone()));
        Some(UserProfile {
            id: 1,
            user_id,
            profile_picture: Some(key),
        })
    }
    async fn list_profiles(&self) -> Vec<ProfileListing> {
        self.profiles.clone()
    }
    async fn get_doctors(&self) -> Vec<Doctor> {
        self.doctors.clone()
    }
    async fn get_doctor(&self, id: i64) -> Option<Doctor> {
        self.doctors.iter().find(|d| d.id == id).cloned()
    }
    async fn create_doctor(&self, req: CreateDoctorRequest) -> Option<Doctor> {
        Some(Doctor {
            id: 99,
            name: req.name,
            department: req.department,
            pic: req.pic_key,
        })
    }
    async fn create_booking(&self, req: CreateBookingRequest, user_id: Uuid) -> Option<Booking> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = Booking {
            id: bookings.len() as i64 + 1,
            user_id,
            doctor_id: req.doctor_id,
            patient_name: req.patient_name,
            patient_email: req.patient_email,
            patient_phone: req.patient_phone,
            booking_date: req.booking_date,
            booked_on: Utc::now(),
        };
        bookings.push(booking.clone());
        Some(booking)
    }
    async fn get_my_bookings(&self, user_id: Uuid) -> Vec<Booking> {
        self.bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect()
    }
    async fn get_all_bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }
    async fn delete_booking(&self, id: i64, user_id: Uuid) -> bool {
        let mut bookings = self.bookings.lock().unwrap();
        let before = bookings.len();
        bookings.retain(|b| !(b.id == id && b.user_id == user_id));
        bookings.len() < before
    }
    async fn delete_booking_admin(&self, id: i64) -> bool {
        let mut bookings = self.bookings.lock().unwrap();
        let before = bookings.len();
        bookings.retain(|b| b.id != id);
        bookings.len() < before
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        self.stats.clone()
    }
}

// --- Fixtures ---

pub fn superuser_record() -> User {
    User {
        id: SUPERUSER_ID,
        username: "admin".to_string(),
        email: "admin@clinic.test".to_string(),
        is_superuser: true,
    }
}

pub fn patient_record() -> User {
    User {
        id: PATIENT_ID,
        username: "patient".to_string(),
        email: "patient@clinic.test".to_string(),
        is_superuser: false,
    }
}

pub fn superuser() -> AuthUser {
    superuser_record().into()
}

pub fn patient() -> AuthUser {
    patient_record().into()
}

pub fn doctor(id: i64) -> Doctor {
    Doctor {
        id,
        name: "Dr. Okafor".to_string(),
        department: "Cardiology".to_string(),
        pic: None,
    }
}

pub fn booking(id: i64, user_id: Uuid) -> Booking {
    Booking {
        id,
        user_id,
        doctor_id: 7,
        patient_name: "Ada".to_string(),
        patient_email: "ada@clinic.test".to_string(),
        patient_phone: None,
        booking_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        booked_on: Utc::now(),
    }
}

pub fn test_state(repo: MockRepo) -> AppState {
    AppState {
        repo: Arc::new(repo),
        storage: Arc::new(MockStorageService::new()),
        // Env::Local, so the x-user-id bypass is active.
        config: AppConfig::default(),
    }
}

// --- Request helpers ---

/// Sends one request through a fresh router, optionally signed in via `x-user-id`.
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(LOCAL_USER_HEADER, id.to_string());
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    router.oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
