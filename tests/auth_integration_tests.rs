mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use clinic_portal::{
    AppState,
    auth::{AuthUser, Claims, LOCAL_USER_HEADER, Viewer},
    config::{AppConfig, Env},
    models::User,
    storage::MockStorageService,
};
use common::MockRepo;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(user_id: Uuid, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + 3600) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn repo_with(user: Option<User>) -> MockRepo {
    MockRepo {
        users: user.into_iter().collect(),
        ..MockRepo::default()
    }
}

fn create_app_state(env: Env, repo: MockRepo) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo: Arc::new(repo),
        storage: Arc::new(MockStorageService::new()),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

fn stored_user(id: Uuid, is_superuser: bool) -> User {
    User {
        id,
        username: "someone".to_string(),
        email: "someone@clinic.test".to_string(),
        is_superuser,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(TEST_USER_ID, false))),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.username, "someone");
    assert!(!user.is_superuser);
}

#[tokio::test]
async fn test_superuser_flag_comes_from_repository() {
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(TEST_USER_ID, true))),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(user.is_superuser);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, MockRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(TEST_USER_ID, false))),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, "some-other-secret-value"));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    // Valid token, but the user no longer exists.
    let app_state = create_app_state(Env::Production, repo_with(None));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(Env::Local, repo_with(Some(stored_user(mock_user_id, true))));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static(LOCAL_USER_HEADER),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, mock_user_id);
    assert!(user.is_superuser);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(mock_user_id, true))),
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static(LOCAL_USER_HEADER),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_viewer_is_anonymous_without_credentials() {
    let app_state = create_app_state(Env::Production, MockRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let viewer = Viewer::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(!viewer.is_authenticated());
    assert!(!viewer.is_superuser());
    assert_eq!(viewer.username(), None);
}

#[tokio::test]
async fn test_viewer_is_anonymous_with_invalid_token() {
    let app_state = create_app_state(Env::Production, MockRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, "not-a-jwt");

    let viewer = Viewer::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(!viewer.is_authenticated());
}

#[tokio::test]
async fn test_viewer_carries_superuser_flag() {
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(TEST_USER_ID, true))),
    );
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET));

    let viewer = Viewer::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(viewer.is_authenticated());
    assert!(viewer.is_superuser());
    assert_eq!(viewer.username(), Some("someone"));
}

#[tokio::test]
async fn test_resolved_viewer_is_reused_without_lookup() {
    // The repository is empty, so only the stored viewer can satisfy the extractors.
    let app_state = create_app_state(Env::Production, MockRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts
        .extensions
        .insert(Viewer(Some(stored_user(TEST_USER_ID, true).into())));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    let viewer = Viewer::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert!(viewer.is_superuser());
}

#[tokio::test]
async fn test_resolved_anonymous_viewer_rejects_auth_user() {
    let app_state = create_app_state(
        Env::Production,
        repo_with(Some(stored_user(TEST_USER_ID, false))),
    );
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET));
    parts.extensions.insert(Viewer(None));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}
