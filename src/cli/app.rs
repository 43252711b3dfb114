use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dataverse-cli")]
#[command(about = "Read and write Microsoft Dataverse tables from the command line")]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read rows from a table and print them as JSON
    Read {
        /// Table logical name, e.g. account
        entity: String,
        /// Columns to return
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,
        /// Raw OData filter expression
        #[arg(short, long)]
        filter: Option<String>,
        /// Raw OData expand expression
        #[arg(short, long)]
        expand: Option<String>,
        /// Maximum number of rows
        #[arg(short, long)]
        top: Option<u32>,
        /// Rows per page
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show the schema of a table
    Schema {
        /// Table logical name
        entity: String,
        /// Include columns, keys and relationships
        #[arg(short, long)]
        full: bool,
    },
    /// Create rows from a JSON file (object or array of objects)
    Insert {
        entity: String,
        file: PathBuf,
        /// Check the payload against the table schema first
        #[arg(long)]
        validate: bool,
    },
    /// Create or update rows from a JSON file
    Upsert {
        entity: String,
        file: PathBuf,
        /// Key columns; found from the schema when omitted and --validate is set
        #[arg(short, long, value_delimiter = ',')]
        key: Vec<String>,
        #[arg(long)]
        validate: bool,
    },
    /// Delete rows by primary id
    Delete {
        entity: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Create a table with a primary name column
    CreateEntity {
        /// Schema name including publisher prefix, e.g. new_Project
        schema_name: String,
        /// Schema name of the primary name column
        #[arg(long)]
        primary_name: String,
        /// Display name; derived from the schema name when omitted
        #[arg(long)]
        display_name: Option<String>,
        /// Unique name of the solution to add the table to
        #[arg(long)]
        solution: Option<String>,
    },
    /// Delete a table and all its data
    DeleteEntity {
        /// Table logical name
        entity: String,
    },
    /// List the language codes provisioned in the environment
    Languages,
}
