pub mod client;
mod error;
pub mod handlers;
pub mod services;
mod types;

use crate::state::AppState;
use axum::Router;

pub use client::{CompletionClient, DisabledCompletion, OpenAiClient};
pub use error::UpstreamError;

pub fn router() -> Router<AppState> {
    handlers::ai_routes()
}
