//! smellscale-api — REST API for Smell Scale.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/vote` | Submit a vote `{ "value": 1..=10 }` |
//! | GET | `/api/scale` | Current blended scale, base, decayed average and vote count |
//! | GET | `/healthz` | Liveness probe |
//!
//! Every route answers cross-origin requests so a browser frontend served
//! from another origin can call the API.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use smellscale_core::decay::DEFAULT_HALF_LIFE_HOURS;
use smellscale_state::ScaleStore;
use tower_http::cors::CorsLayer;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: ScaleStore,
    /// Half-life applied when computing the decayed vote average.
    pub half_life_hours: f64,
}

impl ApiState {
    pub fn new(store: ScaleStore) -> Self {
        Self {
            store,
            half_life_hours: DEFAULT_HALF_LIFE_HOURS,
        }
    }

    pub fn with_half_life(mut self, half_life_hours: f64) -> Self {
        self.half_life_hours = half_life_hours;
        self
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/vote", post(handlers::submit_vote))
        .route("/api/scale", get(handlers::get_scale))
        .route("/healthz", get(handlers::healthz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
