//! Request extractors for the authenticated member and for admin-only routes.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
    AppState,
};

/// Extract user from JWT session cookie if present and valid
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but unreadable
fn try_jwt_session_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }))
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                match session::verify_session_token(value, config) {
                    Ok(user) => return Some(Ok(user)),
                    Err(_) => {
                        // Invalid/expired token; expired sessions are expected,
                        // keep scanning in case a valid cookie follows
                        continue;
                    }
                }
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_jwt_session_auth(parts, &state.config) {
            Some(Ok(user)) => Ok(user),
            Some(Err(e)) => Err(e),
            None => {
                trace!("No session credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

/// Extractor for admin-only routes: authenticates the caller and rejects
/// non-admins with 403 before the handler body runs.
pub struct RequiresAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequiresAdmin {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(Error::InsufficientPermissions {
                action: "administer",
                resource: "this resource".to_string(),
            });
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session_token;
    use crate::test_utils::create_test_config;
    use uuid::Uuid;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(axum::http::header::COOKIE, cookie)
            .body(())
            .unwrap();
        let (parts, _body) = request.into_parts();
        parts
    }

    #[test]
    fn test_jwt_cookie_round_trip() {
        let config = create_test_config();
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "member@example.com".to_string(),
            display_name: None,
            is_admin: false,
        };
        let token = create_session_token(&user, &config).unwrap();

        let cookie_name = &config.auth.native.session.cookie_name;
        let parts = parts_with_cookie(&format!("other=1; {cookie_name}={token}"));
        let extracted = try_jwt_session_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[test]
    fn test_missing_cookie_is_none() {
        let config = create_test_config();
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (parts, _body) = request.into_parts();
        assert!(try_jwt_session_auth(&parts, &config).is_none());
    }

    #[test]
    fn test_garbage_token_is_ignored() {
        let config = create_test_config();
        let cookie_name = &config.auth.native.session.cookie_name;
        let parts = parts_with_cookie(&format!("{cookie_name}=garbage"));
        assert!(try_jwt_session_auth(&parts, &config).is_none());
    }
}
