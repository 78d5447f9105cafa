use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewRecipe, Recipe, RecipePatch, RecipeRow};
use crate::error::AppError;

/// Persistence of recipes. Every write is a single statement, so a record
/// is either fully updated or untouched.
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, AppError>;

    /// `None` when no recipe has this id.
    async fn update(&self, id: Uuid, patch: RecipePatch) -> Result<Option<Recipe>, AppError>;

    /// `false` when no recipe has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, AppError>;

    /// All recipes in insertion order.
    async fn list_all(&self) -> Result<Vec<Recipe>, AppError>;

    /// Case-insensitive substring match on name, category or any ingredient.
    async fn search(&self, term: &str) -> Result<Vec<Recipe>, AppError>;

    /// Case-insensitive exact match on category.
    async fn by_category(&self, category: &str) -> Result<Vec<Recipe>, AppError>;

    /// Recipes containing at least one of the (lower-cased) ingredients.
    async fn with_any_ingredient(
        &self,
        ingredients: &[String],
        limit: i64,
    ) -> Result<Vec<Recipe>, AppError>;

    /// Adds or removes `user_id` from the favorites set; `None` when missing.
    async fn set_favorite(
        &self,
        id: Uuid,
        user_id: Uuid,
        favorite: bool,
    ) -> Result<Option<Recipe>, AppError>;

    async fn favorites_of(&self, user_id: Uuid) -> Result<Vec<Recipe>, AppError>;
}

const COLUMNS: &str = "id, name, ingredients, steps, category, image_url, favorites, created_at";

#[derive(Clone)]
pub struct PgRecipeRepo {
    db: PgPool,
}

impl PgRecipeRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_many(&self, sql: &str, binds: Vec<String>) -> Result<Vec<Recipe>, AppError> {
        let mut q = sqlx::query_as::<_, RecipeRow>(sql);
        for b in binds {
            q = q.bind(b);
        }
        let rows = q.fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }
}

/// Escapes LIKE metacharacters so the term matches literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl RecipeRepo for PgRecipeRepo {
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            INSERT INTO recipes (id, name, ingredients, steps, category, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&recipe.name)
        .bind(&recipe.ingredients)
        .bind(&recipe.steps)
        .bind(recipe.category.as_str())
        .bind(&recipe.image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: Uuid, patch: RecipePatch) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            UPDATE recipes
               SET name        = COALESCE($2, name),
                   ingredients = COALESCE($3, ingredients),
                   steps       = COALESCE($4, steps),
                   category    = COALESCE($5, category),
                   image_url   = COALESCE($6, image_url)
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.ingredients)
        .bind(patch.steps)
        .bind(patch.category.map(|c| c.as_str()))
        .bind(patch.image_url)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn list_all(&self) -> Result<Vec<Recipe>, AppError> {
        self.fetch_many(
            &format!("SELECT {COLUMNS} FROM recipes ORDER BY created_at, id"),
            vec![],
        )
        .await
    }

    async fn search(&self, term: &str) -> Result<Vec<Recipe>, AppError> {
        self.fetch_many(
            &format!(
                r#"
                SELECT {COLUMNS}
                  FROM recipes
                 WHERE name ILIKE $1
                    OR category ILIKE $1
                    OR EXISTS (SELECT 1 FROM unnest(ingredients) AS i WHERE i ILIKE $1)
                 ORDER BY created_at, id
                "#
            ),
            vec![like_pattern(term)],
        )
        .await
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Recipe>, AppError> {
        self.fetch_many(
            &format!(
                "SELECT {COLUMNS} FROM recipes WHERE lower(category) = lower($1) ORDER BY created_at, id"
            ),
            vec![category.trim().to_string()],
        )
        .await
    }

    async fn with_any_ingredient(
        &self,
        ingredients: &[String],
        limit: i64,
    ) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM recipes
             WHERE ingredients && $1
             ORDER BY created_at, id
             LIMIT $2
            "#
        ))
        .bind(ingredients)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn set_favorite(
        &self,
        id: Uuid,
        user_id: Uuid,
        favorite: bool,
    ) -> Result<Option<Recipe>, AppError> {
        let sql = if favorite {
            format!(
                r#"
                UPDATE recipes
                   SET favorites = CASE WHEN $2 = ANY(favorites) THEN favorites
                                        ELSE array_append(favorites, $2) END
                 WHERE id = $1
                RETURNING {COLUMNS}
                "#
            )
        } else {
            format!(
                r#"
                UPDATE recipes
                   SET favorites = array_remove(favorites, $2)
                 WHERE id = $1
                RETURNING {COLUMNS}
                "#
            )
        };
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Recipe::from))
    }

    async fn favorites_of(&self, user_id: Uuid) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {COLUMNS} FROM recipes WHERE $1 = ANY(favorites) ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }
}
