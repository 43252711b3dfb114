//! Turn table rows into batch commands

use super::command::BatchCommand;
use crate::api::constants::headers;
use crate::api::keys::{KeyColumns, extract_key};
use crate::error::{DataverseError, Result};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

/// One POST per row
pub fn create_commands(entity_set: &str, rows: &[Row]) -> Vec<BatchCommand> {
    rows.iter()
        .map(|row| BatchCommand::post(entity_set, Value::Object(row.clone())))
        .collect()
}

/// PATCH without concurrency headers: creates the row when the key is unknown
pub fn upsert_commands(entity_set: &str, rows: &[Row], key: &KeyColumns) -> Result<Vec<BatchCommand>> {
    rows.iter()
        .map(|row| {
            let (data, row_key) = extract_key(row, key)?;
            Ok(BatchCommand::patch(format!("{}({})", entity_set, row_key), Value::Object(data)))
        })
        .collect()
}

/// PATCH with `If-Match: *`, so missing rows fail instead of being created
pub fn update_commands(entity_set: &str, rows: &[Row], key: &KeyColumns) -> Result<Vec<BatchCommand>> {
    Ok(upsert_commands(entity_set, rows, key)?
        .into_iter()
        .map(|cmd| cmd.with_header(headers::IF_MATCH, headers::IF_MATCH_ANY))
        .collect())
}

/// One PUT per row; each row must hold exactly one column besides the key
pub fn single_column_commands(entity_set: &str, rows: &[Row], key: &KeyColumns) -> Result<Vec<BatchCommand>> {
    rows.iter()
        .map(|row| {
            let (data, row_key) = extract_key(row, key)?;
            if data.len() != 1 {
                return Err(DataverseError::validation(format!(
                    "Can only update a single column per row, got {} for ({})",
                    data.len(),
                    row_key
                )));
            }
            BatchCommand::put(format!("{}({})", entity_set, row_key), data)
        })
        .collect()
}

/// DELETE per row id; with a column, only that column's value is cleared
pub fn delete_commands(entity_set: &str, ids: &[String], column: Option<&str>) -> Vec<BatchCommand> {
    ids.iter()
        .map(|id| match column {
            Some(column) => BatchCommand::delete(format!("{}({})/{}", entity_set, id, column)),
            None => BatchCommand::delete(format!("{}({})", entity_set, id)),
        })
        .collect()
}

/// DELETE per row, addressing each row by its key columns
pub fn delete_by_key_commands(entity_set: &str, rows: &[Row], key: &KeyColumns) -> Result<Vec<BatchCommand>> {
    rows.iter()
        .map(|row| {
            let (_, row_key) = extract_key(row, key)?;
            Ok(BatchCommand::delete(format!("{}({})", entity_set, row_key)))
        })
        .collect()
}

/// Split commands into chunks of at most `size`
pub fn chunk(commands: Vec<BatchCommand>, size: usize) -> Vec<Vec<BatchCommand>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(commands.len().div_ceil(size));
    let mut iter = commands.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}
