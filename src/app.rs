use std::sync::Arc;

use anyhow::Context;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::{AppConfig, Environment, SecurityConfig};
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::middleware::{exception_boundary, require_auth, AccessPolicy, AuthGate, ErrorBoundary};

/// Shared per-process dependencies, built once in `main` and cloned into handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub db: SqlitePool,
    pub environment: Environment,
}

impl AppState {
    pub fn new(tokens: TokenService, db: SqlitePool, environment: Environment) -> Self {
        Self {
            tokens: Arc::new(tokens),
            db,
            environment,
        }
    }

    fn gate(&self, policy: AccessPolicy) -> AuthGate {
        AuthGate::new(self.tokens.clone(), policy)
    }
}

/// Wire every dependency from configuration. Any failure here is a startup failure.
pub async fn build(config: &AppConfig) -> anyhow::Result<Router> {
    let tokens = TokenService::new(&config.security).context("Invalid token configuration")?;
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("Failed to open database")?;
    DatabaseManager::migrate(&db).await?;

    let state = AppState::new(tokens, db, config.environment);
    Ok(router(state, &config.security))
}

/// Full application router.
///
/// Layers wrap outward in the order they are added, so the exception boundary
/// goes on last: it sees failures from CORS, tracing, the auth gates and every
/// handler.
pub fn router(state: AppState, security: &SecurityConfig) -> Router {
    let boundary = ErrorBoundary::new(state.environment);

    Router::new()
        // Public
        .route("/", get(public::status::root))
        .route("/health", get(public::status::health))
        .merge(buggy_routes(&state))
        // Protected
        .merge(member_routes(&state))
        .merge(admin_routes(&state))
        .with_state(state)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security.cors_origins))
        .layer(from_fn_with_state(boundary, exception_boundary))
}

fn buggy_routes(state: &AppState) -> Router<AppState> {
    use public::buggy;

    Router::new()
        .route(
            "/api/buggy/auth",
            get(protected::buggy::auth)
                .route_layer(from_fn_with_state(state.gate(AccessPolicy::Authenticated), require_auth)),
        )
        .route("/api/buggy/not-found", get(buggy::not_found))
        .route("/api/buggy/bad-request", get(buggy::bad_request))
        .route("/api/buggy/server-error", get(buggy::server_error))
        .route("/api/buggy/panic", get(buggy::panic))
}

fn member_routes(state: &AppState) -> Router<AppState> {
    use protected::members;

    Router::new()
        .route("/api/members", get(members::list))
        .route("/api/members/:id", get(members::get))
        .route_layer(from_fn_with_state(
            state.gate(AccessPolicy::Authenticated),
            require_auth,
        ))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use protected::members;

    Router::new()
        .route("/api/admin/members", post(members::create))
        .route_layer(from_fn_with_state(
            state.gate(AccessPolicy::Role("Admin")),
            require_auth,
        ))
}

/// Allow-list CORS; any header and method from the configured origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
