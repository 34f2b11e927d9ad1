use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::Store;
use crate::document::{ContentDefinition, ContentItem};

/// Startup data: type definitions and raw documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub definitions: Vec<ContentDefinition>,
    #[serde(default)]
    pub documents: Vec<ContentItem>,
}

impl Seed {
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
    }

    /// Save every definition and insert documents not already stored.
    /// Returns the number of documents inserted.
    pub async fn apply<S: Store + ?Sized>(&self, store: &S) -> anyhow::Result<usize> {
        for definition in &self.definitions {
            store.save_definition(definition).await?;
        }
        let mut inserted = 0;
        for document in &self.documents {
            if store.get(&document.content_item_id).await?.is_some() {
                continue;
            }
            store.insert(document).await?;
            inserted += 1;
        }
        tracing::info!(
            definitions = self.definitions.len(),
            inserted,
            "seed applied"
        );
        Ok(inserted)
    }
}
