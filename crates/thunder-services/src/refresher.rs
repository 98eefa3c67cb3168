//! Keeps the schema cache in step with committed changes

use async_trait::async_trait;
use thunder_schema::SharedSchemaCache;

use crate::observer::{CommitEffects, CommitObserver};

/// Refetches exactly the cache entries a commit touched.
///
/// Altered tables get their columns invalidated and reloaded; a created table
/// triggers a reload of its schema's table list and then of its columns.
pub struct SchemaRefresher {
    cache: SharedSchemaCache,
}

impl SchemaRefresher {
    pub fn new(cache: SharedSchemaCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CommitObserver for SchemaRefresher {
    #[tracing::instrument(skip(self, effects), fields(touched = effects.touched.len()))]
    async fn after_commit(&self, effects: &CommitEffects) {
        for table in &effects.touched {
            if let Err(err) = self.cache.refresh_table(&table.schema, &table.name).await {
                tracing::warn!(table = %table, error = %err, "failed to refresh table after commit");
            }
        }

        if let Some(table) = &effects.created {
            if let Err(err) = self.cache.refresh_schema(&table.schema).await {
                tracing::warn!(schema = %table.schema, error = %err, "failed to refresh schema after create");
                return;
            }
            if let Err(err) = self
                .cache
                .load_columns_for_table(&table.schema, &table.name)
                .await
            {
                tracing::warn!(table = %table, error = %err, "failed to load columns of new table");
            }
        }
    }
}
