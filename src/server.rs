//! HTTP Surface
//! Mission: Assemble shared state, routes and the middleware stack

use crate::api::{destinations, feedback, health, metrics, seed, users};
use crate::auth::{
    api as auth_api, auth_middleware, AuthGuard, AuthService, CredentialHasher, TokenIssuer,
    UserStore,
};
use crate::config::AppConfig;
use crate::db::Database;
use crate::destinations::DestinationRepo;
use crate::feedback::{mailer::Mailer, FeedbackService};
use crate::middleware::{rate_limit_middleware, request_logging, RateLimitLayer};
use crate::seeder::SeederService;
use crate::timewarp::TimewarpRepo;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
};
use tracing::warn;

/// Request bodies larger than this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub guard: AuthGuard,
    pub destinations: DestinationRepo,
    pub timewarp: TimewarpRepo,
    pub seeder: SeederService,
    pub feedback: FeedbackService,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: Database,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(&config.jwt_secret));
        let auth = AuthService::new(
            users,
            Arc::new(CredentialHasher::new(config.bcrypt_cost)),
            issuer.clone(),
        );
        let destinations = DestinationRepo::new(db.clone());

        Self {
            auth,
            guard: AuthGuard::new(issuer, config.auth_mode),
            seeder: SeederService::new(destinations.clone()),
            destinations,
            timewarp: TimewarpRepo::new(db),
            feedback: FeedbackService::new(mailer, config.admin_email.clone()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            // A wildcard cannot be combined with credentials
            Ok(value) if value == "*" => {
                warn!("Ignoring wildcard CORS origin");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub fn build_router(state: AppState, config: &AppConfig, limiter: RateLimitLayer) -> Router {
    // Build auth routes (separate router with auth state)
    let auth_router = Router::new()
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login))
        .with_state(state.auth.clone());

    // Protected user routes
    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/create", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/timewarp", get(health::timewarp_records))
        .route("/api/destinations", get(destinations::list_destinations))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/seed", post(seed::seed))
        .route("/metrics", get(metrics::render_metrics))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(auth_router)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors_origins))
}
