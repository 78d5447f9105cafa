use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::{
    dto::{RecipeForm, SearchParams},
    repo_types::Recipe,
    services,
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/favorites", get(list_favorites))
        .route("/recipes/category/:category", get(recipes_by_category))
        .route("/recipes/:id", get(get_recipe).delete(delete_recipe))
        .route(
            "/recipes/:id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/:id", put(update_recipe))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip(state))]
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.list_all().await?))
}

#[instrument(skip(state, params))]
pub async fn search_recipes(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::bad_request(e.body_text()))?;
    let found = services::search(state.recipes.as_ref(), params.query.as_deref()).await?;
    Ok(Json(found))
}

#[instrument(skip(state))]
pub async fn recipes_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.by_category(&category).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, AppError> {
    let id = services::parse_id(&id)?;
    Ok(Json(services::get_by_id(state.recipes.as_ref(), id).await?))
}

/// POST /recipes (multipart: name, ingredients, steps, category, image?)
#[instrument(skip(state, mp))]
pub async fn create_recipe(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, HeaderMap, Json<Recipe>), AppError> {
    let form = RecipeForm::from_multipart(mp?).await?;
    let recipe =
        services::create(state.recipes.as_ref(), state.media.as_ref(), form).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/recipes/{}", recipe.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(recipe)))
}

/// PUT /recipes/:id (multipart, every field optional)
#[instrument(skip(state, mp))]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<Recipe>, AppError> {
    let id = services::parse_id(&id)?;
    let form = RecipeForm::from_multipart(mp?).await?;
    let recipe =
        services::update(state.recipes.as_ref(), state.media.as_ref(), id, form).await?;
    Ok(Json(recipe))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = services::parse_id(&id)?;
    services::delete(state.recipes.as_ref(), id).await?;
    Ok(Json(json!({ "message": "Recipe deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, AppError> {
    let id = services::parse_id(&id)?;
    Ok(Json(
        services::set_favorite(state.recipes.as_ref(), id, user_id, true).await?,
    ))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, AppError> {
    let id = services::parse_id(&id)?;
    Ok(Json(
        services::set_favorite(state.recipes.as_ref(), id, user_id, false).await?,
    ))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.favorites_of(user_id).await?))
}
