//! Endpoint handlers for the stub backend.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/ad` | Next scripted ad reply |
//! | `POST` | `/api/impression` | Next scripted impression reply |
//! | `GET` | `/api/click` | Next scripted click reply |
//! | `GET` | `/api/requests` | Every request received so far |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::StubError;
use crate::state::{Endpoint, RecordedRequest, Reply, StubState};

/// `GET /api/ad?siteId=..&tags=..`
pub async fn get_ad(
    State(state): State<Arc<StubState>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, StubError> {
    respond(&state, Endpoint::Ad, query, None).await
}

/// `POST /api/impression`
pub async fn post_impression(
    State(state): State<Arc<StubState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, StubError> {
    respond(&state, Endpoint::Impression, BTreeMap::new(), Some(body)).await
}

/// `GET /api/click?campaignId=..&siteId=..`
pub async fn get_click(
    State(state): State<Arc<StubState>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, StubError> {
    respond(&state, Endpoint::Click, query, None).await
}

/// `GET /api/requests`
pub async fn list_requests(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    Json(state.requests().await)
}

async fn respond(
    state: &StubState,
    endpoint: Endpoint,
    query: BTreeMap<String, String>,
    body: Option<serde_json::Value>,
) -> Result<Response, StubError> {
    let Reply {
        delay,
        status,
        body: reply,
    } = state
        .answer(RecordedRequest {
            endpoint,
            query,
            body,
        })
        .await;

    let status = StatusCode::from_u16(status).map_err(|_invalid| StubError::InvalidStatus(status))?;
    debug!(?endpoint, status = status.as_u16(), delay_ms = delay.as_millis(), "stub reply");
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok((status, Json(reply)).into_response())
}
