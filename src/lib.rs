//! # authctl
//!
//! A user-authentication and API-token service.
//!
//! The service exposes two credential schemes over one HTTP surface:
//!
//! - **Sessions**: password login issues a JWT access/refresh token pair;
//!   browser-style clients present the access token in a `token` header.
//! - **Static API tokens**: long-lived random tokens keyed by username for
//!   machine clients, stored in Postgres and checked header-for-header.
//!
//! ## Architecture
//!
//! ```text
//! api::handlers  --- thin HTTP handlers (axum)
//!     |
//! auth::accounts --- account lifecycle (register/login/refresh/...)
//!     |                auth::session (JWT codec), auth::password (Argon2)
//! db::handlers   --- repositories over &mut PgConnection
//!     |
//! Postgres       --- embedded migrations via sqlx::migrate!
//! ```
//!
//! Route guards live in [`auth::middleware`] and are attached per route
//! group by [`build_router`]. Startup seeds a static admin token for the
//! configured admin username; see [`create_initial_admin_token`].
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::load(&args)?;
//! let app = Application::new(config).await?;
//! app.serve(shutdown_signal()).await?;
//! ```

use anyhow::Context;
use axum::{
    Router, http,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use bon::Builder;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod errors;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::auth::middleware::{service_auth_admin, session_auth, session_auth_admin};
use crate::config::{Config, CorsOrigin};
use crate::crypto::generate_api_token;
use crate::db::handlers::api_tokens::ApiTokens;
use crate::db::models::api_tokens::ApiTokenCreateDBRequest;

/// Shared application state available to handlers and middleware.
#[derive(Clone, Builder)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Application configuration
    pub config: Config,
}

/// Get the authctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Seed a static admin API token for the configured admin username.
///
/// Idempotent: if the username already holds a token, nothing changes. The
/// token value is logged exactly once, at creation; it is not retrievable
/// afterwards.
#[instrument(skip(pool), err)]
pub async fn create_initial_admin_token(admin_username: &str, pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;
    let mut tokens = ApiTokens::new(&mut conn);

    if tokens.get_by_username(admin_username).await?.is_some() {
        info!("Admin API token for '{admin_username}' already exists, skipping");
        return Ok(());
    }

    let request = ApiTokenCreateDBRequest {
        token: generate_api_token(),
        username: admin_username.to_string(),
        description: Some("Initial admin token".to_string()),
        is_admin: true,
        is_moderator: true,
    };

    match tokens.create(&request).await {
        Ok(record) => {
            info!("Created admin API token for '{admin_username}': {}", record.token);
            Ok(())
        }
        // Another instance won the race; the existing token stands
        Err(db::errors::DbError::UniqueViolation { .. }) => Ok(()),
        Err(e) => Err(e).context("failed to create initial admin token"),
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        .allow_headers(vec![
            http::header::CONTENT_TYPE,
            http::HeaderName::from_static("token"),
            http::HeaderName::from_static("username"),
        ])
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
        ]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Build the application router with all endpoints and their guards.
///
/// Route groups and guards:
/// - `/api/auth/login`, `/api/auth/refresh`: open
/// - `/api/auth/me*`: session guard
/// - `/api/auth/admin/*`: session admin guard
/// - `/api/api-tokens/check-api-token`: open
/// - `/api/api-tokens/{create,remove}-api-token`: static-token admin guard
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let open_auth = Router::new()
        .route("/login", post(api::handlers::auth::login))
        .route("/refresh", post(api::handlers::auth::refresh));

    let session_routes = Router::new()
        .route("/me", get(api::handlers::auth::me))
        .route("/me/update", put(api::handlers::auth::update_me))
        .route("/me/delete", delete(api::handlers::auth::delete_me))
        .route_layer(from_fn_with_state(state.clone(), session_auth));

    let admin_routes = Router::new()
        .route("/admin/create", post(api::handlers::users::create_user))
        .route("/admin/list", get(api::handlers::users::list_users))
        .route(
            "/admin/user/{id}",
            get(api::handlers::users::get_user)
                .put(api::handlers::users::update_user)
                .delete(api::handlers::users::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), session_auth_admin));

    let api_token_routes = Router::new()
        .route("/check-api-token", post(api::handlers::api_tokens::check_api_token))
        .merge(
            Router::new()
                .route("/create-api-token", post(api::handlers::api_tokens::create_api_token))
                .route("/remove-api-token", post(api::handlers::api_tokens::remove_api_token))
                .route_layer(from_fn_with_state(state.clone(), service_auth_admin)),
        );

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .nest("/api/auth", open_auth.merge(session_routes).merge(admin_routes))
        .nest("/api/api-tokens", api_token_routes)
        .route("/healthz", get(healthz))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    Ok(router)
}

/// The running application.
///
/// Lifecycle:
/// 1. [`Application::new`] connects to Postgres, runs migrations, seeds the
///    admin API token, and builds the router.
/// 2. [`Application::serve`] binds a TCP listener and handles requests until
///    the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPool::connect(&config.database_url)
            .await
            .context("failed to connect to database")?;
        migrator().run(&pool).await.context("failed to run migrations")?;

        create_initial_admin_token(&config.admin_username, &pool).await?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("authctl listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
