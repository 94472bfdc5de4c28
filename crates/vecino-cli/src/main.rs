//! Operational CLI for poking the geocoding engine by hand.

use anyhow::Context;
use clap::{Parser, Subcommand};
use vecino_picker::{
    fetch_suggestions, PickerConfig, Query, SearchOutcome, SelectionResolver,
};

#[derive(Debug, Parser)]
#[command(name = "vecino")]
#[command(about = "Address suggestion and resolution engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the typeahead aggregation for a query and print the ranked list.
    Suggest { text: String },
    /// Reverse-geocode a coordinate pair through the provider cascade.
    Reverse { lat: f64, lng: f64 },
    /// Run the single-best-result search for a query.
    Search { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = PickerConfig::from_env().context("loading configuration")?;
    eprintln!("{}", config.search_mode_notice());

    let providers = std::sync::Arc::new(
        config
            .build_providers()
            .context("constructing provider clients")?,
    );

    match cli.command {
        Commands::Suggest { text } => {
            let query = Query::parse(&text);
            let suggestions = fetch_suggestions(&providers, &query).await;
            if suggestions.is_empty() {
                eprintln!("no suggestions");
            }
            for candidate in suggestions {
                println!("{}", serde_json::to_string(&candidate)?);
            }
        }
        Commands::Reverse { lat, lng } => {
            let resolver = SelectionResolver::new(providers, None);
            let payload = resolver.select_from_map_click(lat, lng).await;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Search { text } => {
            let resolver = SelectionResolver::new(providers, None);
            let query = Query::parse(&text);
            match resolver.perform_immediate_search(&query).await {
                SearchOutcome::Found(payload) => {
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                SearchOutcome::NoResults => {
                    eprintln!("no results for '{text}'");
                    std::process::exit(1);
                }
                SearchOutcome::Failed => {
                    eprintln!("every provider attempt failed");
                    std::process::exit(2);
                }
                SearchOutcome::AlreadyInFlight => unreachable!("single invocation"),
            }
        }
    }

    Ok(())
}
