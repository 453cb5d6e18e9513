use leksika_core::model::{HistoryEntry, HistoryId, Word, WordId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(i64_to_u64("word_id", v)?))
}

pub(crate) fn history_id_from_i64(v: i64) -> Result<HistoryId, StorageError> {
    Ok(HistoryId::new(i64_to_u64("history_id", v)?))
}

pub(crate) fn map_word_row(row: &sqlx::sqlite::SqliteRow) -> Result<Word, StorageError> {
    Word::from_persisted(
        word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("source_term").map_err(ser)?,
        row.try_get("target_term").map_err(ser)?,
        row.try_get("unit").map_err(ser)?,
        row.try_get("category").map_err(ser)?,
        u32_from_i64(
            "mistake_count",
            row.try_get::<i64, _>("mistake_count").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryEntry, StorageError> {
    HistoryEntry::from_persisted(
        history_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("unit_names").map_err(ser)?,
        u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        row.try_get("total_time_secs").map_err(ser)?,
        row.try_get("avg_time_secs").map_err(ser)?,
    )
    .map_err(ser)
}
