use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::services::{self, Suggestions};
use crate::{auth::handlers::json_body, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub ingredients: Vec<String>,
}

pub fn ai_routes() -> Router<AppState> {
    Router::new().route("/ai/suggest", post(suggest))
}

#[instrument(skip(state, payload))]
pub async fn suggest(
    State(state): State<AppState>,
    payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<Suggestions>, AppError> {
    let req = json_body(payload)?;
    let suggestions = services::suggest(
        state.recipes.as_ref(),
        state.completion.as_ref(),
        Duration::from_secs(state.config.ai.timeout_secs),
        &req.ingredients,
    )
    .await?;
    Ok(Json(suggestions))
}
