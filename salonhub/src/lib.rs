//! # salonhub: a membership community hub
//!
//! `salonhub` is a self-hostable community service: members sign up (optionally
//! via a referral code), ask and answer questions in a Q&A feed, read
//! learning-hub articles, and earn contribution points for qualifying actions.
//! Anonymous referral traffic hits the public `/go` endpoint and is routed to a
//! member's outbound URL, either directly (explicit referral code) or through
//! the weighted auto-placement selector.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the
//! HTTP layer and uses PostgreSQL for all persistence needs. Handlers in
//! [`api`] authenticate the caller through extractors, then talk to the
//! repositories in [`db`]; all shared state lives in PostgreSQL and every read
//! is fresh, so horizontally scaled instances need no coordination beyond the
//! database's own.
//!
//! Two subsystems sit behind the HTTP surface:
//!
//! - [`placement`]: the organic-visitor selector. One transaction locks the
//!   queue row, flips the weighted admin/general coin, picks uniformly within
//!   the pool, and commits the `pending -> assigned` transition together with
//!   the member's downline counter increment.
//! - [`scoring`]: the contribution ledger. Every qualifying community action
//!   appends an audit row and applies an atomic in-database counter increment;
//!   call sites treat it as a best-effort side effect.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use salonhub::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = salonhub::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     salonhub::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod placement;
pub mod scoring;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::{password, utils::generate_referral_code},
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
    types::UserId,
};
use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the salonhub database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent - it will create a new admin user if one doesn't
/// exist, or update the password (and re-assert the admin flag) if the user
/// already exists. It is called during application startup to ensure there's
/// always an admin account available.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd)?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = $1, is_admin = TRUE, updated_at = NOW() WHERE email = $2")
                .bind(password_hash)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            display_name: Some("Administrator".to_string()),
            password_hash,
            referral_code: generate_referral_code(),
            referrer_id: None,
            is_admin: true,
        })
        .await?;

    tx.commit().await?;
    Ok(created_user.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let cors = if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        CorsLayer::new().allow_origin(origins).allow_credentials(cors_config.allow_credentials)
    };

    Ok(cors.expose_headers(vec![axum::http::header::LOCATION]))
}

/// Build the main application router with all endpoints and middleware.
///
/// - Public surface: `/healthz`, the `/go` redirect entry point, signup/login,
///   published articles and the leaderboard
/// - Member API under `/api/v1/*` (session cookie required)
/// - Admin API under `/api/v1/admin/*` (admin flag required)
/// - OpenAPI docs at `/docs`
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .with_state(state.clone());

    let api_routes = Router::new()
        // Member profile and history
        .route("/users/me", get(api::handlers::users::get_me).patch(api::handlers::users::update_me))
        .route("/users/me/stats", get(api::handlers::users::get_my_stats))
        .route("/users/me/contributions", get(api::handlers::users::list_my_contributions))
        .route("/leaderboard", get(api::handlers::users::leaderboard))
        // Q&A feed
        .route("/posts", get(api::handlers::feed::list_posts).post(api::handlers::feed::create_post))
        .route("/posts/{id}", get(api::handlers::feed::get_post))
        .route("/posts/{id}/comments", post(api::handlers::feed::create_comment))
        .route("/posts/{id}/best-answer", post(api::handlers::feed::mark_best_answer))
        .route("/likes", post(api::handlers::feed::toggle_like))
        // Learning hub
        .route("/articles", get(api::handlers::articles::list_articles))
        .route("/articles/{slug}", get(api::handlers::articles::get_article))
        // Notifications
        .route("/notifications", get(api::handlers::notifications::list_notifications))
        .route("/notifications/read-all", post(api::handlers::notifications::mark_all_notifications_read))
        .route("/notifications/{id}/read", post(api::handlers::notifications::mark_notification_read))
        // Settings records
        .route(
            "/settings/placement",
            get(api::handlers::settings::get_placement_settings).put(api::handlers::settings::put_placement_settings),
        )
        .route(
            "/settings/contribution-points",
            get(api::handlers::settings::get_contribution_points).put(api::handlers::settings::put_contribution_points),
        )
        // Admin panel
        .route("/admin/stats", get(api::handlers::queue::admin_stats))
        .route("/admin/queue", get(api::handlers::queue::admin_queue_view))
        .route("/admin/queue/{id}/assign", post(api::handlers::queue::admin_assign_queue_item))
        .route("/admin/users", get(api::handlers::users::admin_list_users))
        .route("/admin/users/{id}", patch(api::handlers::users::admin_update_user))
        .route("/admin/users/{id}/points", post(api::handlers::users::admin_adjust_points))
        .route(
            "/admin/articles",
            get(api::handlers::articles::admin_list_articles).post(api::handlers::articles::admin_create_article),
        )
        .route(
            "/admin/articles/{id}",
            patch(api::handlers::articles::admin_update_article).delete(api::handlers::articles::admin_delete_article),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/go", get(api::handlers::redirect::follow_redirect))
        .with_state(state.clone())
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations and bootstraps the initial admin account
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPool::connect(&config.database_url).await?;
        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("salonhub listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
