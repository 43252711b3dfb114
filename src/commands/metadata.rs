use super::print_json;
use anyhow::{Context, Result};
use dataverse_api::DataverseClient;
use dataverse_api::metadata::{AttributeMetadata, define_entity};
use log::info;

/// Create a table with a single primary name column
pub async fn create_entity_command(
    client: &DataverseClient,
    schema_name: &str,
    primary_name: &str,
    display_name: Option<String>,
    solution: Option<&str>,
) -> Result<()> {
    let mut entity = define_entity(schema_name, vec![AttributeMetadata::primary_name(primary_name)])?;
    if let Some(display_name) = display_name {
        entity = entity.with_display_name(display_name);
    }

    let id = client
        .create_entity(&entity, solution)
        .await
        .with_context(|| format!("Failed to create table {}", schema_name))?;
    info!("Created table {} with id {}", schema_name, id);
    println!("{}", id);
    Ok(())
}

pub async fn delete_entity_command(client: &DataverseClient, entity: &str) -> Result<()> {
    client
        .delete_entity(entity)
        .await
        .with_context(|| format!("Failed to delete table {}", entity))?;
    println!("Deleted table {}", entity);
    Ok(())
}

pub async fn languages_command(client: &DataverseClient) -> Result<()> {
    let codes = client
        .get_language_codes()
        .await
        .context("Failed to retrieve available languages")?;
    print_json(&codes)
}
