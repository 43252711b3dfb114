use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

mod cli;
mod commands;

use cli::{Cli, Commands};
use dataverse_api::{ClientConfig, DataverseClient, StaticToken};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    info!("Starting dataverse-cli");

    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
    .context("Failed to load configuration")?;
    debug!("Using environment {}", config.environment_url);

    let token = config
        .access_token
        .clone()
        .context("No access token; set DATAVERSE_TOKEN")?;
    let client = DataverseClient::from_config(&config, StaticToken::new(token))
        .context("Failed to create Dataverse client")?;

    match cli.command {
        Commands::Read {
            entity,
            select,
            filter,
            expand,
            top,
            page_size,
        } => commands::rows::read_command(&client, &entity, select, filter, expand, top, page_size).await,
        Commands::Schema { entity, full } => commands::rows::schema_command(&client, &entity, full).await,
        Commands::Insert { entity, file, validate } => {
            commands::rows::insert_command(&client, &entity, &file, validate).await
        }
        Commands::Upsert {
            entity,
            file,
            key,
            validate,
        } => commands::rows::upsert_command(&client, &entity, &file, key, validate).await,
        Commands::Delete { entity, ids } => commands::rows::delete_command(&client, &entity, ids).await,
        Commands::CreateEntity {
            schema_name,
            primary_name,
            display_name,
            solution,
        } => {
            commands::metadata::create_entity_command(
                &client,
                &schema_name,
                &primary_name,
                display_name,
                solution.as_deref(),
            )
            .await
        }
        Commands::DeleteEntity { entity } => commands::metadata::delete_entity_command(&client, &entity).await,
        Commands::Languages => commands::metadata::languages_command(&client).await,
    }
}
