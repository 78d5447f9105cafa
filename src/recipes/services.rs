use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    dto::{RecipeForm, Upload},
    repo::RecipeRepo,
    repo_types::{Category, NewRecipe, Recipe, RecipePatch},
};
use crate::{error::AppError, media::MediaStore};

/// Splits a comma-separated list into trimmed, lower-cased, non-blank entries.
pub fn parse_ingredients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect()
}

pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request("Invalid recipe id"))
}

fn validate_new(form: &RecipeForm) -> Result<(String, Vec<String>, String, Category), AppError> {
    let name = form
        .name
        .clone()
        .ok_or_else(|| AppError::bad_request("Name is required"))?;
    let ingredients = form
        .ingredients
        .as_deref()
        .map(parse_ingredients)
        .unwrap_or_default();
    if ingredients.is_empty() {
        return Err(AppError::bad_request("At least one ingredient is required"));
    }
    let steps = form
        .steps
        .clone()
        .ok_or_else(|| AppError::bad_request("Steps are required"))?;
    let category = match form.category.as_deref() {
        None => Category::default(),
        Some(raw) => Category::parse(raw).unwrap_or_else(|| {
            debug!(category = raw, "unknown category, using default");
            Category::default()
        }),
    };
    Ok((name, ingredients, steps, category))
}

fn patch_from(form: &RecipeForm) -> Result<RecipePatch, AppError> {
    let ingredients = match form.ingredients.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = parse_ingredients(raw);
            if parsed.is_empty() {
                return Err(AppError::bad_request("At least one ingredient is required"));
            }
            Some(parsed)
        }
    };
    let category = match form.category.as_deref() {
        None => None,
        Some(raw) => Some(
            Category::parse(raw).ok_or_else(|| AppError::bad_request("Unknown category"))?,
        ),
    };
    Ok(RecipePatch {
        name: form.name.clone(),
        ingredients,
        steps: form.steps.clone(),
        category,
        image_url: None,
    })
}

async fn store_image(media: &dyn MediaStore, image: Upload) -> Result<String, AppError> {
    media
        .store(image.body, &image.file_name, image.content_type.as_deref())
        .await
}

/// Removes a just-stored image after the record write did not happen.
async fn discard_image(media: &dyn MediaStore, reference: Option<String>) {
    if let Some(reference) = reference {
        if let Err(e) = media.remove(&reference).await {
            warn!(error = %e, reference = %reference, "failed to discard unused image");
        }
    }
}

pub async fn create(
    recipes: &dyn RecipeRepo,
    media: &dyn MediaStore,
    mut form: RecipeForm,
) -> Result<Recipe, AppError> {
    let (name, ingredients, steps, category) = validate_new(&form)?;

    let image_url = match form.image.take() {
        Some(image) => Some(store_image(media, image).await?),
        None => None,
    };

    let new = NewRecipe {
        name,
        ingredients,
        steps,
        category,
        image_url: image_url.clone(),
    };
    match recipes.insert(new).await {
        Ok(recipe) => {
            info!(recipe_id = %recipe.id, "recipe created");
            Ok(recipe)
        }
        Err(e) => {
            discard_image(media, image_url).await;
            Err(e)
        }
    }
}

/// Partial update: only fields present in the form change. A new image
/// replaces the reference; the previous file is left in place.
pub async fn update(
    recipes: &dyn RecipeRepo,
    media: &dyn MediaStore,
    id: Uuid,
    mut form: RecipeForm,
) -> Result<Recipe, AppError> {
    let mut patch = patch_from(&form)?;

    if let Some(image) = form.image.take() {
        patch.image_url = Some(store_image(media, image).await?);
    }

    if patch.is_empty() {
        return get_by_id(recipes, id).await;
    }

    let image_url = patch.image_url.clone();
    match recipes.update(id, patch).await {
        Ok(Some(recipe)) => {
            info!(recipe_id = %recipe.id, "recipe updated");
            Ok(recipe)
        }
        Ok(None) => {
            discard_image(media, image_url).await;
            Err(AppError::not_found("Recipe not found"))
        }
        Err(e) => {
            discard_image(media, image_url).await;
            Err(e)
        }
    }
}

pub async fn delete(recipes: &dyn RecipeRepo, id: Uuid) -> Result<(), AppError> {
    if !recipes.delete(id).await? {
        return Err(AppError::not_found("Recipe not found"));
    }
    info!(recipe_id = %id, "recipe deleted");
    Ok(())
}

pub async fn get_by_id(recipes: &dyn RecipeRepo, id: Uuid) -> Result<Recipe, AppError> {
    recipes
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))
}

pub async fn search(recipes: &dyn RecipeRepo, term: Option<&str>) -> Result<Vec<Recipe>, AppError> {
    let term = term.map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::bad_request("Please provide a search term"));
    }
    recipes.search(term).await
}

pub async fn set_favorite(
    recipes: &dyn RecipeRepo,
    id: Uuid,
    user_id: Uuid,
    favorite: bool,
) -> Result<Recipe, AppError> {
    recipes
        .set_favorite(id, user_id, favorite)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingMedia, MemoryMedia, MemoryRecipeRepo};
    use bytes::Bytes;

    fn form(name: &str, ingredients: &str, steps: &str, category: Option<&str>) -> RecipeForm {
        RecipeForm {
            name: Some(name.into()),
            ingredients: Some(ingredients.into()),
            steps: Some(steps.into()),
            category: category.map(Into::into),
            image: None,
        }
    }

    fn png() -> Upload {
        Upload {
            body: Bytes::from_static(b"png"),
            file_name: "dish.png".into(),
            content_type: Some("image/png".into()),
        }
    }

    #[test]
    fn ingredients_are_normalized() {
        assert_eq!(
            parse_ingredients(" Egg, FLOUR ,, milk ,"),
            vec!["egg", "flour", "milk"]
        );
        assert!(parse_ingredients(" , ").is_empty());
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("nope"), Err(AppError::BadRequest(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[tokio::test]
    async fn create_validates_and_defaults_category() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();

        let r = create(&repo, &media, form("Toast", "Bread, Butter", "Toast it", None))
            .await
            .unwrap();
        assert_eq!(r.category, Category::Snack);
        assert_eq!(r.ingredients, vec!["bread", "butter"]);
        assert_eq!(r.image_url, None);

        let r = create(&repo, &media, form("Tea", "tea", "Steep", Some("beverage")))
            .await
            .unwrap();
        assert_eq!(r.category, Category::Beverage);

        let r = create(&repo, &media, form("Odd", "x", "y", Some("Brunch")))
            .await
            .unwrap();
        assert_eq!(r.category, Category::Snack);

        let mut missing_name = form("", "x", "y", None);
        missing_name.name = None;
        assert!(matches!(
            create(&repo, &media, missing_name).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            create(&repo, &media, form("Air", " , ", "y", None)).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn create_stores_image_reference() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let mut f = form("Cake", "flour, egg", "Bake", Some("Dessert"));
        f.image = Some(png());

        let r = create(&repo, &media, f).await.unwrap();
        let url = r.image_url.expect("image reference");
        assert!(url.starts_with("/uploads/"));
        assert!(media.contains(&url));
    }

    #[tokio::test]
    async fn create_propagates_storage_error_without_persisting() {
        let repo = MemoryRecipeRepo::default();
        let mut f = form("Cake", "flour", "Bake", None);
        f.image = Some(png());

        let err = create(&repo, &FailingMedia, f).await.unwrap_err();
        assert_eq!(err.kind(), "storage_error");
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let mut f = form("Pancakes", "egg, flour, milk", "Mix and fry", Some("Breakfast"));
        f.image = Some(png());
        let before = create(&repo, &media, f).await.unwrap();

        let after = update(
            &repo,
            &media,
            before.id,
            RecipeForm {
                name: Some("X".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(after.name, "X");
        assert_eq!(after.ingredients, before.ingredients);
        assert_eq!(after.steps, before.steps);
        assert_eq!(after.category, before.category);
        assert_eq!(after.image_url, before.image_url);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn update_replaces_image_and_keeps_old_file() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let mut f = form("Pie", "apple", "Bake", None);
        f.image = Some(png());
        let before = create(&repo, &media, f).await.unwrap();
        let old_url = before.image_url.clone().unwrap();

        let after = update(
            &repo,
            &media,
            before.id,
            RecipeForm {
                image: Some(png()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let new_url = after.image_url.unwrap();
        assert_ne!(new_url, old_url);
        assert!(media.contains(&old_url));
        assert!(media.contains(&new_url));
    }

    #[tokio::test]
    async fn update_rejects_bad_category_and_missing_id() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let r = create(&repo, &media, form("Soup", "leek", "Boil", Some("Dinner")))
            .await
            .unwrap();

        let err = update(
            &repo,
            &media,
            r.id,
            RecipeForm {
                category: Some("Brunch".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(get_by_id(&repo, r.id).await.unwrap().category, Category::Dinner);

        let mut with_image = RecipeForm {
            name: Some("Ghost".into()),
            ..Default::default()
        };
        with_image.image = Some(png());
        let err = update(&repo, &media, Uuid::new_v4(), with_image)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        // the image written for the missing recipe was discarded
        assert_eq!(media.len(), 0);

        let err = update(&repo, &media, Uuid::new_v4(), RecipeForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let r = create(&repo, &media, form("Salad", "lettuce", "Toss", Some("Lunch")))
            .await
            .unwrap();

        assert!(matches!(
            delete(&repo, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        delete(&repo, r.id).await.unwrap();
        assert!(matches!(get_by_id(&repo, r.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(delete(&repo, r.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn search_matches_name_category_or_ingredient() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let eggnog = create(&repo, &media, form("Eggnog", "milk, nutmeg", "Whisk", Some("Beverage")))
            .await
            .unwrap();
        let omelette = create(&repo, &media, form("Omelette", "EGG, cheese", "Fry", Some("Breakfast")))
            .await
            .unwrap();
        let _toast = create(&repo, &media, form("Toast", "bread", "Toast", Some("Breakfast")))
            .await
            .unwrap();
        let _veg = create(&repo, &media, form("Veggie plate", "eggplant", "Slice", Some("Lunch")))
            .await
            .unwrap();

        let found: Vec<String> = search(&repo, Some("EgG"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(found, vec!["Eggnog", "Omelette", "Veggie plate"]);
        assert!(found.contains(&eggnog.name) && found.contains(&omelette.name));

        let by_cat = search(&repo, Some("breakfast")).await.unwrap();
        assert_eq!(by_cat.len(), 2);

        assert!(matches!(search(&repo, None).await, Err(AppError::BadRequest(_))));
        assert!(matches!(search(&repo, Some("  ")).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn favorites_are_idempotent_sets() {
        let repo = MemoryRecipeRepo::default();
        let media = MemoryMedia::default();
        let r = create(&repo, &media, form("Brownie", "cocoa", "Bake", Some("Dessert")))
            .await
            .unwrap();
        let user = Uuid::new_v4();

        set_favorite(&repo, r.id, user, true).await.unwrap();
        let twice = set_favorite(&repo, r.id, user, true).await.unwrap();
        assert_eq!(twice.favorites, vec![user]);
        assert_eq!(repo.favorites_of(user).await.unwrap().len(), 1);

        let removed = set_favorite(&repo, r.id, user, false).await.unwrap();
        assert!(removed.favorites.is_empty());
        assert!(matches!(
            set_favorite(&repo, Uuid::new_v4(), user, true).await,
            Err(AppError::NotFound(_))
        ));
    }
}
