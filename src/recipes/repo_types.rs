use std::fmt;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed set of recipe categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    Snack,
    Dessert,
    Beverage,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Breakfast,
        Category::Lunch,
        Category::Dinner,
        Category::Snack,
        Category::Dessert,
        Category::Beverage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Snack => "Snack",
            Category::Dessert => "Dessert",
            Category::Beverage => "Beverage",
        }
    }

    /// Case-insensitive lookup.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row as stored in `recipes`.
#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub name: String,
    pub ingredients: Vec<String>,
    pub steps: String,
    pub category: String,
    pub image_url: Option<String>,
    pub favorites: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub ingredients: Vec<String>,
    pub steps: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub favorites: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            ingredients: r.ingredients,
            steps: r.steps,
            // the CHECK constraint keeps this in range
            category: Category::parse(&r.category).unwrap_or_default(),
            image_url: r.image_url,
            favorites: r.favorites,
            created_at: r.created_at,
        }
    }
}

/// A validated recipe ready to insert.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub steps: String,
    pub category: Category,
    pub image_url: Option<String>,
}

/// Fields of a partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<String>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the present fields onto `recipe`.
    #[cfg(test)]
    pub fn apply_to(self, recipe: &mut Recipe) {
        if let Some(name) = self.name {
            recipe.name = name;
        }
        if let Some(ingredients) = self.ingredients {
            recipe.ingredients = ingredients;
        }
        if let Some(steps) = self.steps {
            recipe.steps = steps;
        }
        if let Some(category) = self.category {
            recipe.category = category;
        }
        if let Some(image_url) = self.image_url {
            recipe.image_url = Some(image_url);
        }
    }
}
