pub mod metadata;
pub mod rows;

use anyhow::{Context, Result};
use dataverse_api::api::batch::Row;
use dataverse_api::to_rows;
use std::path::Path;

/// Rows from a JSON file holding an object or an array of objects
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(to_rows(value)?)
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
