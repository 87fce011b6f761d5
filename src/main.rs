use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{error, info};

use itinerai::config::ItineraryConfig;
use itinerai::models::{DistanceToNext, GeoPoint, ItineraryRequest, PlaceCategory};
use itinerai::places::{GooglePlacesClient, PlaceDetailEnricher, PlaceFinder};
use itinerai::routing::{OpenRouteServiceClient, RoutingProvider};
use itinerai::{Collaborators, ItineraryError, ItineraryPlanner, RetryPolicy, logging};

/// Generate day-by-day travel itineraries
#[derive(Parser)]
#[command(name = "itinerai", version, about)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an itinerary and print it as JSON
    Generate {
        /// Destination city or region
        #[arg(short, long)]
        destination: String,

        /// Trip length in days (1-14)
        #[arg(short = 'n', long, default_value_t = 3)]
        days: u32,

        /// Preferred cuisine
        #[arg(short, long, default_value = "Local")]
        food: String,

        /// Override the configured deadline
        #[arg(long)]
        deadline_seconds: Option<u64>,
    },

    /// Search one place category
    Places {
        #[arg(value_enum)]
        category: CategoryArg,

        #[arg(short, long)]
        destination: String,

        /// Narrows restaurant searches
        #[arg(short, long)]
        food: Option<String>,

        /// Fetch details for every result
        #[arg(long)]
        details: bool,
    },

    /// Driving distance between two "lat,lng" coordinates
    Distance { from: GeoPoint, to: GeoPoint },
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Attraction,
    Restaurant,
    Accommodation,
}

impl From<CategoryArg> for PlaceCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Attraction => PlaceCategory::Attraction,
            CategoryArg::Restaurant => PlaceCategory::Restaurant,
            CategoryArg::Accommodation => PlaceCategory::Accommodation,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = ItineraryConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    logging::init(&config.logging, cli.verbose).context("Failed to setup logging")?;
    info!(version = itinerai::VERSION, "itinerai starting");

    match run(cli.command, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            error!(code = err.code(), error = %err, "Command failed");
            eprintln!("{}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(command: Command, config: &ItineraryConfig) -> itinerai::Result<()> {
    let retry = RetryPolicy::from_config(&config.retry);

    match command {
        Command::Generate {
            destination,
            days,
            food,
            deadline_seconds,
        } => {
            let request = ItineraryRequest::new(destination, days, food)?;
            let planner = ItineraryPlanner::new(config, Collaborators::from_config(config)?);

            let itinerary = match deadline_seconds {
                Some(seconds) => {
                    planner
                        .generate_itinerary_with_deadline(&request, Duration::from_secs(seconds))
                        .await?
                }
                None => planner.generate_itinerary(&request).await?,
            };
            print_json(&itinerary)
        }
        Command::Places {
            category,
            destination,
            food,
            details,
        } => {
            let provider = Arc::new(GooglePlacesClient::from_config(&config.places)?);
            let finder = PlaceFinder::new(provider.clone(), retry, config.places.max_results);
            let mut places = finder
                .find(category.into(), &destination, food.as_deref())
                .await;

            if details {
                let enricher =
                    PlaceDetailEnricher::new(provider, retry, config.pipeline.detail_concurrency);
                places = enricher.enrich_places(places).await;
            }
            print_json(&places)
        }
        Command::Distance { from, to } => {
            let routing: Arc<dyn RoutingProvider> =
                Arc::new(OpenRouteServiceClient::from_config(&config.routing)?);
            let provider = routing.as_ref();
            let meters = retry
                .run("route_distance", move || provider.route(from, to))
                .await
                .map_err(|e| ItineraryError::network(format!("Routing failed: {e}")))?;

            print_json(&json!({
                "from": from,
                "to": to,
                "meters": meters,
                "distance": DistanceToNext::Driving { meters }.to_string(),
            }))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> itinerai::Result<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| ItineraryError::internal(format!("Failed to serialize output: {e}")))?;
    println!("{output}");
    Ok(())
}
