use axum::{
    Router, middleware,
    routing::{MethodRouter, on},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::AuthService;
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod gate;
mod observability;
mod profile;
mod system;
mod types;

pub use error::ApiError;
pub use gate::{Access, Route};
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

fn endpoint(route: Route) -> MethodRouter<Arc<AppState>> {
    let filter = route.method();
    match route {
        Route::Signup => on(filter, auth::signup),
        Route::Login => on(filter, auth::login),
        Route::ForgotPassword => on(filter, auth::forgot_password),
        Route::ResetPassword => on(filter, auth::reset_password),
        Route::Health => on(filter, system::health),
        Route::ShowProfile => on(filter, profile::show),
        Route::UpdateProfile => on(filter, profile::update),
        Route::Logout => on(filter, auth::logout),
        Route::Metrics => on(filter, observability::get_metrics),
    }
}

fn routes_with_access(access: Access) -> Router<Arc<AppState>> {
    Route::with_access(access).fold(Router::new(), |router, route| {
        router.route(route.path(), endpoint(route))
    })
}

async fn method_not_supported() -> ApiError {
    ApiError::MethodNotSupported
}

async fn not_found() -> ApiError {
    ApiError::NotFound("The requested resource was not found.".to_string())
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected_routes = routes_with_access(Access::Protected).route_layer(
        middleware::from_fn_with_state(state.clone(), gate::gate_middleware),
    );

    Router::new()
        .merge(routes_with_access(Access::Public))
        .merge(protected_routes)
        .method_not_allowed_fallback(method_not_supported)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
}
