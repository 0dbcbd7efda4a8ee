use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use magboard_core::presence::PresenceRecord;
use magboard_core::shapes::Element;
use magboard_core::sync::{ElementsEnvelope, PresenceEnvelope, SaveAck};
use magboard_core::wire::dedupe_by_id;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Query string shared by every campaign endpoint.
#[derive(Debug, Deserialize)]
pub struct CampaignQuery {
    pub campaign: Option<String>,
}

impl CampaignQuery {
    fn require(self) -> ApiResult<String> {
        match self.campaign {
            Some(c) if !c.trim().is_empty() => Ok(c),
            _ => Err(ApiError::CampaignRequired),
        }
    }
}

/// Body of a save. Unlike [`ElementsEnvelope`], an entry that cannot be
/// keyed fails the whole request instead of being skipped.
#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/whiteboard-data", get(load_whiteboard).post(save_whiteboard))
        .route("/api/presence", get(list_presence).post(publish_presence))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Magboard Server - whiteboard data at /api/whiteboard-data?campaign=<name>"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn load_whiteboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CampaignQuery>,
) -> ApiResult<impl IntoResponse> {
    let campaign = query.require()?;
    let elements = state.gateway().fetch_elements(&campaign).await?;
    debug!(campaign = %campaign, count = elements.len(), "Loaded whiteboard");

    let envelope = ElementsEnvelope {
        elements,
        timestamp: Some(state.snapshot_timestamp(&campaign)),
    };
    Ok((
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(envelope),
    ))
}

async fn save_whiteboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CampaignQuery>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<Json<SaveAck>> {
    let campaign = query.require()?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let elements = dedupe_by_id(request.elements);

    let timestamp = state.gateway().save_elements(&campaign, &elements).await?;
    state.record_save(&campaign, timestamp);
    info!(campaign = %campaign, count = elements.len(), timestamp, "Saved whiteboard");

    Ok(Json(SaveAck { ok: true, timestamp }))
}

async fn list_presence(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CampaignQuery>,
) -> ApiResult<Json<PresenceEnvelope>> {
    let campaign = query.require()?;
    Ok(Json(PresenceEnvelope {
        users: state.presence(&campaign),
    }))
}

async fn publish_presence(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CampaignQuery>,
    body: Result<Json<PresenceRecord>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let campaign = query.require()?;
    let Json(record) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    debug!(campaign = %campaign, user = %record.user_id, "Presence heartbeat");
    state.publish_presence(&campaign, record);
    Ok(Json(json!({ "ok": true })))
}
