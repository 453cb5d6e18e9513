use leksika_core::model::{HistoryEntry, HistoryId};

use super::SqliteRepository;
use super::mapping::{history_id_from_i64, map_history_row};
use crate::repository::{HistoryRepository, StorageError};

#[async_trait::async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<HistoryId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO history (
                    completed_at, unit_names, correct, total, total_time_secs, avg_time_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(entry.completed_at())
        .bind(entry.unit_names())
        .bind(i64::from(entry.correct()))
        .bind(i64::from(entry.total()))
        .bind(entry.total_time_secs())
        .bind(entry.avg_time_secs())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        history_id_from_i64(res.last_insert_rowid())
    }

    async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, completed_at, unit_names, correct, total,
                    total_time_secs, avg_time_secs
                FROM history
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_history_row(&row)?);
        }
        Ok(out)
    }
}
