use crate::models::{
    AdminDashboardStats, Booking, CreateBookingRequest, CreateDoctorRequest, Doctor,
    ProfileListing, User, UserProfile,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract used by handlers and the auth extractor. Handlers only see
/// `Arc<dyn Repository>`, so tests swap in in-memory mocks.
///
/// Driver errors are logged and collapsed into `None` / `false` / empty collections;
/// handlers turn those into status codes.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Profiles ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Inserts the user and its empty profile row.
    async fn create_user(&self, user: User) -> Result<User, CreateUserError>;
    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile>;
    async fn set_profile_picture(&self, user_id: Uuid, key: String) -> Option<UserProfile>;
    // Admin listing: profile id, owning username, picture.
    async fn list_profiles(&self) -> Vec<ProfileListing>;

    // --- Doctors ---
    async fn get_doctors(&self) -> Vec<Doctor>;
    async fn get_doctor(&self, id: i64) -> Option<Doctor>;
    async fn create_doctor(&self, req: CreateDoctorRequest) -> Option<Doctor>;

    // --- Bookings ---
    async fn create_booking(&self, req: CreateBookingRequest, user_id: Uuid) -> Option<Booking>;
    async fn get_my_bookings(&self, user_id: Uuid) -> Vec<Booking>;
    async fn get_all_bookings(&self) -> Vec<Booking>;
    /// Owner-only: deletes only if `user_id` owns the booking.
    async fn delete_booking(&self, id: i64, user_id: Uuid) -> bool;
    /// Admin: deletes any booking.
    async fn delete_booking_admin(&self, id: i64) -> bool;

    async fn get_stats(&self) -> AdminDashboardStats;
}

/// CreateUserError
///
/// Why `create_user` wrote nothing. Registration maps `Conflict` to 409 and anything else
/// to 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserError {
    /// The id or username is already taken.
    Conflict,
    /// The database failed for another reason.
    Unavailable,
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, doctor_id, patient_name, patient_email, patient_phone, booking_date, booked_on";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, is_superuser FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// Inserts the user and its profile in one transaction so a user never exists
    /// without a profile row.
    async fn create_user(&self, user: User) -> Result<User, CreateUserError> {
        let result = async {
            let mut tx = self.pool.begin().await?;

            let created = sqlx::query_as::<_, User>(
                "INSERT INTO users (id, username, email, is_superuser) VALUES ($1, $2, $3, $4) \
                 RETURNING id, username, email, is_superuser",
            )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.is_superuser)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
                .bind(created.id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<User, sqlx::Error>(created)
        }
        .await;

        result.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                tracing::warn!(user_id = %user.id, "create_user conflict: {}", db.message());
                CreateUserError::Conflict
            }
            e => {
                tracing::error!("create_user error: {:?}", e);
                CreateUserError::Unavailable
            }
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> Option<UserProfile> {
        sqlx::query_as::<_, UserProfile>(
            "SELECT id, user_id, profile_picture FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_profile error: {:?}", e);
            None
        })
    }

    /// set_profile_picture
    ///
    /// Upserts so users created outside `/register` still get a profile row.
    async fn set_profile_picture(&self, user_id: Uuid, key: String) -> Option<UserProfile> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, profile_picture) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET profile_picture = EXCLUDED.profile_picture
            RETURNING id, user_id, profile_picture
            "#,
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_profile_picture error: {:?}", e);
            None
        })
    }

    async fn list_profiles(&self) -> Vec<ProfileListing> {
        match sqlx::query_as::<_, ProfileListing>(
            r#"
            SELECT p.id, u.username AS "user", p.profile_picture
            FROM user_profiles p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("list_profiles error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_doctors(&self) -> Vec<Doctor> {
        match sqlx::query_as::<_, Doctor>(
            "SELECT id, name, department, pic FROM doctors ORDER BY department, name",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(doctors) => doctors,
            Err(e) => {
                tracing::error!("get_doctors error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_doctor(&self, id: i64) -> Option<Doctor> {
        sqlx::query_as::<_, Doctor>("SELECT id, name, department, pic FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_doctor error: {:?}", e);
                None
            })
    }

    async fn create_doctor(&self, req: CreateDoctorRequest) -> Option<Doctor> {
        sqlx::query_as::<_, Doctor>(
            "INSERT INTO doctors (name, department, pic) VALUES ($1, $2, $3) \
             RETURNING id, name, department, pic",
        )
        .bind(req.name)
        .bind(req.department)
        .bind(req.pic_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("create_doctor error: {:?}", e))
        .ok()
    }

    async fn create_booking(&self, req: CreateBookingRequest, user_id: Uuid) -> Option<Booking> {
        let query = format!(
            "INSERT INTO bookings (user_id, doctor_id, patient_name, patient_email, patient_phone, booking_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOKING_COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .bind(req.doctor_id)
            .bind(req.patient_name)
            .bind(req.patient_email)
            .bind(req.patient_phone)
            .bind(req.booking_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| tracing::error!("create_booking error: {:?}", e))
            .ok()
    }

    async fn get_my_bookings(&self, user_id: Uuid) -> Vec<Booking> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY booked_on DESC"
        );
        match sqlx::query_as::<_, Booking>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::error!("get_my_bookings error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_all_bookings(&self) -> Vec<Booking> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY booking_date DESC, booked_on DESC"
        );
        match sqlx::query_as::<_, Booking>(&query).fetch_all(&self.pool).await {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::error!("get_all_bookings error: {:?}", e);
                vec![]
            }
        }
    }

    async fn delete_booking(&self, id: i64, user_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_booking error: {:?}", e);
                false
            }
        }
    }

    async fn delete_booking_admin(&self, id: i64) -> bool {
        match sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_booking_admin error: {:?}", e);
                false
            }
        }
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats {
            total_users: count(&self.pool, "SELECT COUNT(*) FROM users").await,
            total_profiles: count(&self.pool, "SELECT COUNT(*) FROM user_profiles").await,
            total_doctors: count(&self.pool, "SELECT COUNT(*) FROM doctors").await,
            total_bookings: count(&self.pool, "SELECT COUNT(*) FROM bookings").await,
        }
    }
}

/// Runs a `COUNT(*)` query, reporting 0 on failure.
async fn count(pool: &PgPool, query: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(query)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("count error ({}): {:?}", query, e);
            0
        })
}
