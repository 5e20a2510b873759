//! `KeyValueStore` over the `application_state` table.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::Row;

use super::{SqliteStateRepository, state_sql};
use crate::persistence::{error::PersistenceError, traits::KeyValueStore};

/// Escapes `LIKE` wildcards so that `prefix` matches literally.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("{escaped}%")
}

#[async_trait]
impl KeyValueStore for SqliteStateRepository {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let row = self
            .run(
                "read document",
                sqlx::query(state_sql::SELECT_STATE).bind(key).fetch_optional(self.pool()),
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let text: String =
            row.try_get("value").map_err(|e| PersistenceError::OperationFailed(e.to_string()))?;
        let value = serde_json::from_str(&text)
            .map_err(|e| PersistenceError::SerializationError(format!("{key}: {e}")))?;
        Ok(Some(value))
    }

    #[tracing::instrument(skip(self, value), level = "debug")]
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| PersistenceError::SerializationError(format!("{key}: {e}")))?;

        self.run(
            "write document",
            sqlx::query(state_sql::UPSERT_STATE).bind(key).bind(text).execute(self.pool()),
        )
        .await?;
        tracing::debug!(key, "Document written.");
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        let rows = self
            .run(
                "list documents",
                sqlx::query(state_sql::SELECT_KEYS_LIKE)
                    .bind(like_prefix(prefix))
                    .fetch_all(self.pool()),
            )
            .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("key")
                    .map_err(|e| PersistenceError::OperationFailed(e.to_string()))
            })
            .collect()
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        SqliteStateRepository::flush(self).await
    }
}
