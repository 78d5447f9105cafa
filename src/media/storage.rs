use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::UploadConfig, error::AppError};

/// Where uploaded recipe images go. `store` returns the reference path that
/// is persisted on the recipe and resolved by clients against the API origin.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(
        &self,
        body: Bytes,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, AppError>;

    async fn remove(&self, reference: &str) -> Result<(), AppError>;
}

/// Files under a content root, served statically under `url_prefix`.
#[derive(Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalDiskStore {
    pub fn new(cfg: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&cfg.dir),
            url_prefix: cfg.url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

/// `<unix millis>-<8 hex>-<sanitized original name>`
pub(crate) fn unique_file_name(original_name: &str, content_type: Option<&str>) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let nonce = Uuid::new_v4().simple().to_string();
    let mut base = sanitize(original_name);
    if !base.contains('.') {
        if let Some(ext) = content_type.and_then(ext_from_mime) {
            base = format!("{base}.{ext}");
        }
    }
    format!("{millis}-{}-{base}", &nonce[..8])
}

fn sanitize(name: &str) -> String {
    // drop any directory part a client may send
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.chars().take(100).collect()
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[async_trait]
impl MediaStore for LocalDiskStore {
    async fn store(
        &self,
        body: Bytes,
        original_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))
            .map_err(AppError::Storage)?;

        let file_name = unique_file_name(original_name, content_type);
        let final_path = self.root.join(&file_name);
        let part_path = self.root.join(format!(".{file_name}.part"));

        // write then rename, so a failed write never leaves a half file behind the name
        if let Err(e) = tokio::fs::write(&part_path, &body).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(AppError::Storage(
                anyhow::Error::new(e).context(format!("write {}", part_path.display())),
            ));
        }
        tokio::fs::rename(&part_path, &final_path)
            .await
            .with_context(|| format!("rename into {}", final_path.display()))
            .map_err(AppError::Storage)?;

        debug!(file = %file_name, bytes = body.len(), "image stored");
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    async fn remove(&self, reference: &str) -> Result<(), AppError> {
        let Some(name) = reference
            .strip_prefix(&self.url_prefix)
            .map(|n| n.trim_start_matches('/'))
            .filter(|n| !n.is_empty() && !n.contains(['/', '\\']))
        else {
            warn!(reference, "refusing to remove foreign media reference");
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
