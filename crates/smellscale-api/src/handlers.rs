//! REST API handlers.
//!
//! Each handler goes through `ScaleStore` and returns JSON. Errors share
//! one shape: `{ "error": "..." }`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use smellscale_core::{ScaleReport, Vote, parse_vote_value};

use crate::ApiState;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

// ── Voting ─────────────────────────────────────────────────────

/// Vote request body. `value` is kept raw so type errors become a
/// validation message instead of a deserializer rejection.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Confirmation returned for an accepted vote.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteAccepted {
    pub message: String,
    pub value: f64,
    /// Total votes stored, including this one.
    pub votes: usize,
}

/// POST /api/vote
pub async fn submit_vote(
    State(state): State<ApiState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "malformed vote body");
            return error_response(&rejection.body_text(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    let value = match parse_vote_value(&req.value) {
        Ok(value) => value,
        Err(e) => {
            debug!(raw = %req.value, error = %e, "vote rejected");
            return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    let now = Utc::now();
    match state.store.update_at(now, |s| {
        s.record_vote(Vote::new(value, now));
        s.votes.len()
    }) {
        Ok(votes) => {
            info!(value, votes, "vote recorded");
            Json(VoteAccepted {
                message: "Vote recorded!".to_string(),
                value,
                votes,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to persist vote");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

// ── Scale ──────────────────────────────────────────────────────

/// GET /api/scale
pub async fn get_scale(State(state): State<ApiState>) -> Json<ScaleReport> {
    let now = Utc::now();
    let current = state.store.load_at(now);
    Json(ScaleReport::compute(&current, state.half_life_hours, now))
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
