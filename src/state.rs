use crate::ai::{CompletionClient, DisabledCompletion, OpenAiClient};
use crate::auth::{repo::PgUserRepo, repo::UserRepo, JwtKeys};
use crate::config::AppConfig;
use crate::media::{LocalDiskStore, MediaStore};
use crate::recipes::{PgRecipeRepo, RecipeRepo};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
    pub media: Arc<dyn MediaStore>,
    pub completion: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let completion: Arc<dyn CompletionClient> = match config.ai.api_key.as_deref() {
            Some(key) => Arc::new(OpenAiClient::new(&config.ai, key)?),
            None => {
                warn!("OPENAI_API_KEY not set; ai suggestions will be empty");
                Arc::new(DisabledCompletion)
            }
        };
        let media = Arc::new(LocalDiskStore::new(&config.uploads)) as Arc<dyn MediaStore>;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgRecipeRepo::new(db)),
            media,
            completion,
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        recipes: Arc<dyn RecipeRepo>,
        media: Arc<dyn MediaStore>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt),
            config: Arc::new(config),
            users,
            recipes,
            media,
            completion,
        }
    }
}
