use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::{client::CompletionClient, error::UpstreamError};
use crate::{error::AppError, recipes::repo_types::Recipe, recipes::RecipeRepo};

/// Most database matches returned.
pub const MAX_DB_MATCHES: i64 = 5;
/// Below this many database matches the completion service is asked.
pub const AI_THRESHOLD: usize = 3;
/// Recipe names requested from the completion service.
pub const AI_SUGGESTION_COUNT: usize = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub db_matches: Vec<Recipe>,
    pub ai_matches: Vec<String>,
}

pub fn normalize_ingredients(ingredients: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ingredients.len());
    for i in ingredients {
        let i = i.trim().to_lowercase();
        if !i.is_empty() && !out.contains(&i) {
            out.push(i);
        }
    }
    out
}

pub fn build_prompt(ingredients: &[String]) -> String {
    format!(
        "Suggest {AI_SUGGESTION_COUNT} recipes using these ingredients: {}. Give short names only.",
        ingredients.join(", ")
    )
}

/// One suggestion per non-blank line, trimmed.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Database matches first; the completion service only fills in when they
/// are scarce. Any upstream failure yields an empty `ai_matches`.
pub async fn suggest(
    recipes: &dyn RecipeRepo,
    completion: &dyn CompletionClient,
    timeout: Duration,
    ingredients: &[String],
) -> Result<Suggestions, AppError> {
    let ingredients = normalize_ingredients(ingredients);
    if ingredients.is_empty() {
        return Err(AppError::bad_request("Please provide ingredients"));
    }

    let db_matches = recipes
        .with_any_ingredient(&ingredients, MAX_DB_MATCHES)
        .await?;

    let ai_matches = if db_matches.len() < AI_THRESHOLD {
        match ask_upstream(completion, timeout, &ingredients).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, kind = "upstream_unavailable", "ai suggestion failed; degrading");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    info!(
        db = db_matches.len(),
        ai = ai_matches.len(),
        "suggestions ready"
    );
    Ok(Suggestions {
        db_matches,
        ai_matches,
    })
}

async fn ask_upstream(
    completion: &dyn CompletionClient,
    timeout: Duration,
    ingredients: &[String],
) -> Result<Vec<String>, UpstreamError> {
    let prompt = build_prompt(ingredients);
    let text = tokio::time::timeout(timeout, completion.complete(&prompt))
        .await
        .map_err(|_| UpstreamError::Timeout(timeout.as_secs()))??;
    Ok(parse_suggestions(&text))
}
