use leksika_core::model::{Word, WordId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_word_row, word_id_from_i64};
use crate::repository::{StorageError, WordRepository};

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, source_term, target_term, unit, category, mistake_count
            FROM words
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut words = Vec::with_capacity(rows.len());
        for row in rows {
            words.push(map_word_row(&row)?);
        }
        Ok(words)
    }

    async fn insert_words(&self, words: &[Word]) -> Result<Vec<WordId>, StorageError> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(words.len());
        for word in words {
            let res = sqlx::query(
                r"
                INSERT INTO words (source_term, target_term, unit, category, mistake_count)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(word.source_term())
            .bind(word.target_term())
            .bind(word.unit())
            .bind(word.category())
            .bind(i64::from(word.mistake_count()))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            ids.push(word_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(ids)
    }

    async fn update_mistake_count(&self, id: WordId, count: u32) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE words
            SET mistake_count = MAX(mistake_count, ?2)
            WHERE id = ?1
            ",
        )
        .bind(id_i64("word_id", id.value())?)
        .bind(i64::from(count))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
