//! Shared helpers for tests: a test app over a real pool, seeded members and
//! session cookies.

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use crate::{
    api::models::users::CurrentUser,
    auth::{session, utils::generate_referral_code},
    db::{
        handlers::{Queue, Repository, Settings, Users},
        models::{
            queue::QueueArrivalDBRequest,
            settings::PlacementSettings,
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
    },
    types::QueueItemId,
    AppState, Config,
};

/// Default destination used by the test configuration (note the normalized
/// trailing slash).
pub const TEST_DEFAULT_REDIRECT_URL: &str = "https://app.partner.example/";

pub fn create_test_config() -> Config {
    Config {
        secret_key: Some("test-secret-key-for-jwt".to_string()),
        default_redirect_url: Url::parse(TEST_DEFAULT_REDIRECT_URL).expect("static test URL"),
        ..Default::default()
    }
}

/// Build a test server over the real router and the given pool.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    let state = AppState::builder().db(pool).config(create_test_config()).build();
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Create a member with a unique email and referral code.
pub async fn create_test_user(pool: &PgPool, is_admin: bool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("{}@example.com", Uuid::new_v4()),
            display_name: Some("Test Member".to_string()),
            password_hash: None,
            referral_code: generate_referral_code(),
            referrer_id: None,
            is_admin,
        })
        .await
        .expect("Failed to create test user")
}

/// Create a member that the placement selector considers eligible: flagged as
/// requested and carrying an outbound referral URL.
pub async fn create_eligible_member(pool: &PgPool, is_admin: bool, referral_url: &str) -> UserDBResponse {
    let user = create_test_user(pool, is_admin).await;

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .update(
            user.id,
            &UserUpdateDBRequest {
                referral_url: Some(referral_url.to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to set referral URL")
}

/// Session cookie header for the given member, matching the test config's
/// cookie name and secret.
pub fn auth_cookie(user: &UserDBResponse) -> (HeaderName, HeaderValue) {
    let config = create_test_config();
    let current_user = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        is_admin: user.is_admin,
    };
    let token = session::create_session_token(&current_user, &config).expect("Failed to create session token");

    let cookie = format!("{}={}", config.auth.native.session.cookie_name, token);
    (
        HeaderName::from_static("cookie"),
        HeaderValue::from_str(&cookie).expect("Failed to encode cookie header"),
    )
}

/// Store the placement ratio directly.
pub async fn set_admin_ratio(pool: &PgPool, ratio: f64) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Settings::new(&mut conn)
        .upsert_placement(PlacementSettings { admin_ratio: ratio })
        .await
        .expect("Failed to store placement settings");
}

/// Seed one pending organic arrival and return its id.
pub async fn enqueue_visitor(pool: &PgPool) -> QueueItemId {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Queue::new(&mut conn)
        .insert_arrival(&QueueArrivalDBRequest {
            visitor_id: Uuid::new_v4(),
            source: Some("organic".to_string()),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
        })
        .await
        .expect("Failed to enqueue visitor")
        .id
}
