//! Authentication endpoints: register, login, logout.

use axum::{extract::State, Json};

use crate::{
    api::models::{
        auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse},
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session, utils::generate_referral_code},
    db::{handlers::{Repository, Users}, models::users::UserCreateDBRequest},
    errors::Error,
    AppState,
};

/// Register a new member account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Member registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or unknown referral code"),
        (status = 409, description = "Account already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "Member registration is disabled".to_string(),
        });
    }

    let email = request.email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Validation {
            field: "email",
            message: "Enter a valid email address".to_string(),
        });
    }

    let display_name = request.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(Error::Validation {
            field: "display_name",
            message: "Enter a display name".to_string(),
        });
    }

    let password_config = &state.config.auth.native.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::Validation {
            field: "password",
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::Validation {
            field: "password",
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    if user_repo.get_by_email(&email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // An unknown referral code is a field error; a valid one attributes the
    // signup to the inviting member.
    let referrer_id = match request.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(
            user_repo
                .get_by_referral_code(code)
                .await?
                .ok_or_else(|| Error::Validation {
                    field: "referral_code",
                    message: "Referral code not found".to_string(),
                })?
                .id,
        ),
        None => None,
    };

    // Hash the password on a blocking thread to avoid blocking async runtime
    let raw_password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&raw_password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email,
            display_name: Some(display_name),
            password_hash: Some(password_hash),
            referral_code: generate_referral_code(),
            referrer_id,
            is_admin: false,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let user_response = UserResponse::from(created_user);
    let current_user: CurrentUser = user_response.clone().into();
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo
        .get_by_email(request.email.trim())
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    let password_hash = user.password_hash.clone().ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let raw_password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&raw_password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    user_repo.record_login(user.id).await?;

    let user_response = UserResponse::from(user);
    let current_user: CurrentUser = user_response.clone().into();
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Create expired cookie to clear session
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.auth.native.session.cookie_name
    );

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie,
    })
}

fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;

    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session_config.cookie_name,
        token,
        session_config.timeout.as_secs()
    )
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_creates_member_and_sets_cookie(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "email": "newmember@example.com",
                "password": "a-long-password",
                "display_name": "New Member"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let cookie_header = response.header("set-cookie");
        assert!(cookie_header.to_str().unwrap().contains("salonhub_session="));

        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["email"], "newmember@example.com");
        assert_eq!(body["user"]["contribution_points"], 0);
        // A fresh referral code is minted at signup
        assert_eq!(body["user"]["referral_code"].as_str().unwrap().len(), 8);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_with_unknown_referral_code_fails(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "email": "invited@example.com",
                "password": "a-long-password",
                "display_name": "Invited",
                "referral_code": "NOPE0000"
            }))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["field"], "referral_code");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_attaches_referrer(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let referrer = create_test_user(&pool, false).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "email": "invited@example.com",
                "password": "a-long-password",
                "display_name": "Invited",
                // Codes match case-insensitively
                "referral_code": referrer.referral_code.to_lowercase()
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        let referrer_id = sqlx::query_scalar::<_, Option<uuid::Uuid>>("SELECT referrer_id FROM users WHERE email = $1")
            .bind("invited@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(referrer_id, Some(referrer.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_with_wrong_password_is_unauthorized(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        app.post("/authentication/register")
            .json(&json!({
                "email": "member@example.com",
                "password": "correct-password",
                "display_name": "Member"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = app
            .post("/authentication/login")
            .json(&json!({
                "email": "member@example.com",
                "password": "wrong-password"
            }))
            .await;
        response.assert_status_unauthorized();

        let response = app
            .post("/authentication/login")
            .json(&json!({
                "email": "member@example.com",
                "password": "correct-password"
            }))
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_validates_short_password(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({
                "email": "short@example.com",
                "password": "short",
                "display_name": "Member"
            }))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["field"], "password");
    }
}
