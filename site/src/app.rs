use archportal::geoip::GeoLookup;
use archportal::{Catalog, MirrorRedirector, MirrorResult, SiteConfig};
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub catalog: Arc<dyn Catalog>,
    pub redirector: Arc<MirrorRedirector>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: SiteConfig,
        catalog: Arc<dyn Catalog>,
        geoip: Arc<dyn GeoLookup>,
    ) -> MirrorResult<Self> {
        let redirector = MirrorRedirector::from_config(&config, catalog.clone(), geoip)?;

        Ok(Self {
            config: Arc::new(config),
            catalog,
            redirector: Arc::new(redirector),
            start_time: Instant::now(),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/download/{*file}", get(handlers::download))
        .route("/mirrors/ajax", get(handlers::mirror_status))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
