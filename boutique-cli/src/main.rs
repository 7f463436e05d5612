//! Boutique CLI - inspect entity listing configuration and dry-run queries.
//!
//! ```bash
//! boutique entities
//! boutique explain product --query "minPrice=100000&colors=red,blue&page=2"
//! boutique query user --data ./fixtures --path /admin/users
//! ```
//!
//! See `boutique --help` for all available commands and options.

mod commands;

use boutique_core::Entity;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::RequestArgs;

#[derive(Parser)]
#[command(name = "boutique", about = "Storefront listing query tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every entity with its filter keys, fields and page sizes
    Entities {
        /// Print the full configuration as JSON
        #[arg(long)]
        json: bool,

        /// Config file (defaults to ./boutique.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the normalized query a request would run
    Explain {
        /// Entity name, singular or plural (product, users, ...)
        entity: Entity,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Run a request against JSON fixtures loaded into memory
    Query {
        entity: Entity,

        /// Directory holding `<collection>.json` arrays (products.json, users.json, ...)
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        request: RequestArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Entities { json, config } => commands::entities::run(config.as_deref(), json),
        Commands::Explain { entity, request } => commands::explain::run(entity, &request),
        Commands::Query { entity, data, request } => commands::query::run(entity, &data, &request).await,
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
