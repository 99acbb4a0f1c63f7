//! API models for authentication endpoints.

use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::UserResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Optional referral code of the inviting member
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Login body plus the session cookie set on the response.
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

/// Registration body plus the session cookie; responds 201.
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

/// Logout body plus the expired cookie that clears the session.
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(e) => {
            tracing::error!("Failed to encode session cookie: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(Json(self.auth_response).into_response(), &self.cookie)
    }
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        with_cookie((StatusCode::CREATED, Json(self.auth_response)).into_response(), &self.cookie)
    }
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(Json(self.auth_response).into_response(), &self.cookie)
    }
}
