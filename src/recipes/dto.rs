use axum::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// An uploaded image file.
#[derive(Debug)]
pub struct Upload {
    pub body: Bytes,
    pub file_name: String,
    pub content_type: Option<String>,
}

/// Text fields and optional image of a recipe multipart form. Blank text
/// fields count as absent.
#[derive(Debug, Default)]
pub struct RecipeForm {
    pub name: Option<String>,
    /// Comma-separated.
    pub ingredients: Option<String>,
    pub steps: Option<String>,
    pub category: Option<String>,
    pub image: Option<Upload>,
}

impl RecipeForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = RecipeForm::default();
        while let Some(field) = mp.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(str::to_string);
                let body = field.bytes().await?;
                if !body.is_empty() {
                    form.image = Some(Upload {
                        body,
                        file_name,
                        content_type,
                    });
                }
                continue;
            }

            let text = field.text().await?;
            let text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            match name.as_str() {
                "name" => form.name = text,
                "ingredients" => form.ingredients = text,
                "steps" => form.steps = text,
                "category" => form.category = text,
                _ => {}
            }
        }
        Ok(form)
    }
}
