//! The public redirect entry point.
//!
//! `GET /go` resolves an outbound destination for an anonymous visitor: the
//! directly referenced member's URL when a `ref` code is supplied, otherwise
//! the auto-placement selector's pick. Every failure on the way degrades to
//! the configured default destination; a visitor always ends up somewhere.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use url::Url;
use uuid::Uuid;

use crate::{
    api::models::queue::RedirectQuery,
    db::{
        handlers::{Queue, Repository, Users},
        models::queue::QueueArrivalDBRequest,
    },
    placement,
    types::UserId,
    AppState,
};

/// Redirect an inbound visitor to a member's outbound URL
#[utoipa::path(
    get,
    path = "/go",
    tag = "redirect",
    params(RedirectQuery),
    responses(
        (status = 302, description = "Redirect to a member's outbound URL or the default destination"),
    )
)]
#[tracing::instrument(skip_all, fields(has_ref = query.referral_code.is_some()))]
pub async fn follow_redirect(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<RedirectQuery>) -> Response {
    let (visitor_id, minted) = visitor_identity(&headers, &state.config.visitor_cookie_name);

    let explicit_code = query.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let target = match explicit_code {
        Some(code) => explicit_target(&state, code).await,
        None => organic_target(&state, visitor_id, &query).await,
    };

    let destination = target.unwrap_or_else(|| state.config.default_redirect_url.to_string());

    // The visitor-identity cookie goes out either way (30-day expiry),
    // independent of the redirect outcome.
    build_redirect(&state, &destination, minted.then_some(visitor_id))
}

/// Reuse the visitor cookie's UUID when present and well-formed, otherwise
/// mint a fresh one and flag it for Set-Cookie.
fn visitor_identity(headers: &HeaderMap, cookie_name: &str) -> (Uuid, bool) {
    let existing = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == cookie_name).then_some(value)
            })
        })
        .and_then(|value| value.parse::<Uuid>().ok());

    match existing {
        Some(visitor_id) => (visitor_id, false),
        None => (Uuid::new_v4(), true),
    }
}

/// Does the stored member URL carry a scheme we are willing to redirect to?
fn has_recognized_scheme(raw: &str) -> bool {
    matches!(Url::parse(raw), Ok(parsed) if matches!(parsed.scheme(), "http" | "https"))
}

/// Explicit referral: look the member up by code, no queue record.
async fn explicit_target(state: &AppState, code: &str) -> Option<String> {
    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!("Redirect lookup unavailable, using default destination: {e}");
            return None;
        }
    };

    let user = match Users::new(&mut conn).get_by_referral_code(code).await {
        Ok(user) => user?,
        Err(e) => {
            tracing::warn!("Referral code lookup failed, using default destination: {e}");
            return None;
        }
    };

    user.referral_url.filter(|url| has_recognized_scheme(url))
}

/// Organic visit: enqueue the arrival, run the selector, resolve the assigned
/// member's URL. Any failure leaves the visitor on the default destination.
async fn organic_target(state: &AppState, visitor_id: Uuid, query: &RedirectQuery) -> Option<String> {
    let arrival = QueueArrivalDBRequest {
        visitor_id,
        source: Some(query.source.clone().unwrap_or_else(|| "organic".to_string())),
        utm_source: query.utm_source.clone(),
        utm_medium: query.utm_medium.clone(),
        utm_campaign: query.utm_campaign.clone(),
    };

    let queue_id = {
        let mut conn = match state.db.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Queue unavailable, redirecting visitor to default destination: {e}");
                return None;
            }
        };
        match Queue::new(&mut conn).insert_arrival(&arrival).await {
            Ok(item) => item.id,
            Err(e) => {
                tracing::warn!("Queue ingestion failed, redirecting visitor to default destination: {e}");
                return None;
            }
        }
    };

    let assigned = match placement::execute_auto_placement(&state.db, queue_id).await {
        Ok(assigned) => assigned?,
        Err(e) => {
            tracing::warn!("Auto-placement failed, redirecting visitor to default destination: {e}");
            return None;
        }
    };

    resolve_member_url(state, assigned).await
}

async fn resolve_member_url(state: &AppState, user_id: UserId) -> Option<String> {
    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!("Assigned member lookup unavailable: {e}");
            return None;
        }
    };

    let user = match Users::new(&mut conn).get_by_id(user_id).await {
        Ok(user) => user?,
        Err(e) => {
            tracing::warn!("Assigned member lookup failed: {e}");
            return None;
        }
    };

    user.referral_url.filter(|url| has_recognized_scheme(url))
}

fn build_redirect(state: &AppState, destination: &str, set_visitor: Option<Uuid>) -> Response {
    let mut response = (StatusCode::FOUND, [(header::LOCATION, destination.to_string())], "").into_response();

    if let Some(visitor_id) = set_visitor {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            state.config.visitor_cookie_name,
            visitor_id,
            state.config.visitor_cookie_max_age.as_secs()
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Failed to encode visitor cookie: {e}"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::queue::QueueStatus;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[test]
    fn test_scheme_guard() {
        assert!(has_recognized_scheme("https://partner.example/r/abc"));
        assert!(has_recognized_scheme("http://partner.example"));
        assert!(!has_recognized_scheme("javascript:alert(1)"));
        assert!(!has_recognized_scheme("ftp://partner.example"));
        assert!(!has_recognized_scheme("not a url"));
    }

    async fn queue_len(pool: &PgPool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM organic_queue")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explicit_referral_redirects_without_queue_record(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let member = create_eligible_member(&pool, false, "https://partner.example/r/xyz").await;

        // Case-insensitive lookup
        let response = app.get(&format!("/go?ref={}", member.referral_code.to_lowercase())).await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location").to_str().unwrap(), "https://partner.example/r/xyz");
        assert_eq!(queue_len(&pool).await, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_referral_code_falls_back_to_default(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/go?ref=NOPE0000").await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location").to_str().unwrap(), TEST_DEFAULT_REDIRECT_URL);
        assert_eq!(queue_len(&pool).await, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_member_with_bad_scheme_falls_back_to_default(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let member = create_eligible_member(&pool, false, "javascript:alert(1)").await;

        let response = app.get(&format!("/go?ref={}", member.referral_code)).await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location").to_str().unwrap(), TEST_DEFAULT_REDIRECT_URL);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_organic_visit_mints_cookie_and_assigns(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        create_eligible_member(&pool, false, "https://partner.example/r/member").await;
        set_admin_ratio(&pool, 0.0).await;

        let response = app.get("/go?source=newsletter&utm_source=mail").await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location").to_str().unwrap(), "https://partner.example/r/member");

        let cookie = response.header("set-cookie");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.contains("organic_visitor_id="));
        assert!(cookie.contains("Max-Age=2592000"));

        let status = sqlx::query_scalar::<_, QueueStatus>("SELECT status FROM organic_queue LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, QueueStatus::Assigned);

        let source = sqlx::query_scalar::<_, Option<String>>("SELECT source FROM organic_queue LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(source.as_deref(), Some("newsletter"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_organic_visit_without_candidates_stays_pending(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/go").await;

        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location").to_str().unwrap(), TEST_DEFAULT_REDIRECT_URL);

        // The arrival is still recorded and waits for a manual re-trigger
        let status = sqlx::query_scalar::<_, QueueStatus>("SELECT status FROM organic_queue LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, QueueStatus::Pending);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_existing_visitor_cookie_is_reused(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let visitor_id = Uuid::new_v4();

        let response = app
            .get("/go")
            .add_header("cookie", format!("organic_visitor_id={visitor_id}"))
            .await;

        response.assert_status(StatusCode::FOUND);
        // No fresh cookie when one already exists
        assert!(response.maybe_header("set-cookie").is_none());

        let stored = sqlx::query_scalar::<_, Uuid>("SELECT visitor_id FROM organic_queue LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, visitor_id);
    }
}
