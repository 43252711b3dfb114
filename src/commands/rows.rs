use super::{print_json, read_rows};
use anyhow::{Context, Result};
use dataverse_api::{DataverseClient, Filter, KeyColumns, Query};
use log::info;
use serde_json::json;
use std::path::Path;

/// Read rows and print them as a JSON array
pub async fn read_command(
    client: &DataverseClient,
    entity: &str,
    select: Vec<String>,
    filter: Option<String>,
    expand: Option<String>,
    top: Option<u32>,
    page_size: Option<u32>,
) -> Result<()> {
    let table = client
        .entity(entity)
        .await
        .with_context(|| format!("Failed to load table {}", entity))?;

    let mut query = Query::new().select(select);
    if let Some(filter) = filter {
        query = query.filter(Filter::Raw(filter));
    }
    if let Some(expand) = expand {
        query = query.expand_raw(expand);
    }
    if let Some(top) = top {
        query = query.top(top);
    }
    if let Some(size) = page_size {
        query = query.page_size(size);
    }

    let rows = table.read(&query).await.context("Read failed")?;
    info!("Read {} rows from {}", rows.len(), entity);
    print_json(&rows)
}

/// Print the entity definition and, with `full`, the validation data
pub async fn schema_command(client: &DataverseClient, entity: &str, full: bool) -> Result<()> {
    let schema = client
        .schema(entity, full)
        .await
        .with_context(|| format!("Failed to fetch schema for {}", entity))?;

    let mut output = json!({
        "logical_name": schema.entity.logical_name,
        "entity_set_name": schema.entity.entity_set_name,
        "primary_id_attribute": schema.entity.primary_id_attribute,
        "primary_name_attribute": schema.entity.primary_name_attribute,
        "primary_image_attribute": schema.entity.primary_image_attribute,
    });

    if full {
        let columns: serde_json::Map<String, serde_json::Value> = schema
            .attributes
            .iter()
            .map(|(name, attr)| {
                (
                    name.clone(),
                    json!({
                        "type": attr.attribute_type,
                        "create": attr.can_create,
                        "update": attr.can_update,
                        "max_length": attr.max_length,
                        "choices": attr.choices,
                    }),
                )
            })
            .collect();
        output["columns"] = columns.into();
        output["alternate_keys"] = json!(schema.altkeys);
        output["relationships"] = json!(schema.relationships.all().collect::<Vec<_>>());
        output["language_code"] = json!(schema.language_code);
    }

    print_json(&output)
}

/// Create rows from a JSON file and print the new ids
pub async fn insert_command(client: &DataverseClient, entity: &str, file: &Path, validate: bool) -> Result<()> {
    let rows = read_rows(file)?;
    let table = if validate {
        client.entity_validated(entity).await?
    } else {
        client.entity(entity).await?
    };

    let ids = table
        .insert(&rows)
        .await
        .with_context(|| format!("Insert into {} failed", entity))?;
    print_json(&ids)
}

/// Upsert rows from a JSON file
pub async fn upsert_command(
    client: &DataverseClient,
    entity: &str,
    file: &Path,
    key: Vec<String>,
    validate: bool,
) -> Result<()> {
    let rows = read_rows(file)?;
    let table = if validate {
        client.entity_validated(entity).await?
    } else {
        client.entity(entity).await?
    };

    let key = (!key.is_empty()).then(|| KeyColumns::alternate(key));
    table
        .upsert(&rows, key)
        .await
        .with_context(|| format!("Upsert into {} failed", entity))?;
    println!("Upserted {} rows into {}", rows.len(), entity);
    Ok(())
}

pub async fn delete_command(client: &DataverseClient, entity: &str, ids: Vec<String>) -> Result<()> {
    let table = client.entity(entity).await?;
    table
        .delete(&ids)
        .await
        .with_context(|| format!("Delete from {} failed", entity))?;
    println!("Deleted {} rows from {}", ids.len(), entity);
    Ok(())
}
