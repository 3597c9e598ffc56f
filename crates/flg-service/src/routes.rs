//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{accounts, credits, health, profile};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts and profiles (JWT auth)
/// - `POST /v1/accounts` - Open account (profile and balance)
/// - `GET /v1/profile` - Current user's profile
/// - `PATCH /v1/profile` - Change username or avatar
///
/// ## Credits (JWT auth)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Recent transactions, newest first
/// - `GET /v1/credits/packages` - Package catalogue
/// - `POST /v1/credits/purchase` - Buy an arbitrary amount
/// - `POST /v1/credits/packages/:credits/purchase` - Buy a package
/// - `POST /v1/credits/spend` - Spend credits
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/accounts", post(accounts::open_account))
        .route(
            "/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/packages", get(credits::list_packages))
        .route(
            "/credits/packages/:credits/purchase",
            post(credits::purchase_package),
        )
        .route("/credits/purchase", post(credits::purchase_credits))
        .route("/credits/spend", post(credits::spend_credits))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    with_timeout(router, request_timeout).with_state(state)
}

/// Bound every request by `timeout`.
///
/// An elapsed request answers like a store outage: a spend or purchase may
/// still commit after the client has given up, so the caller must re-read
/// the balance before retrying.
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Unavailable("request timed out".into())
    } else {
        ApiError::Unavailable(err.to_string())
    }
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
