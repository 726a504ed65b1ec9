//! Synthetic client generator.
//!
//! Creates (or loads) a client roster, gives every client one or more
//! addresses inside the target city, and writes the joined dataset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use barrio::config::Config;
use barrio::geocode::{NominatimClient, OfflineGeocoder, ReverseGeocoder};
use barrio::geometry::GeometryStore;
use barrio::models::Client;
use barrio::output::{write_json, write_rows};
use barrio::pipeline::{AddressGenerator, FailurePolicy};
use barrio::population::CityData;
use barrio::profile::ClientGenerator;

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Generate synthetic clients with addresses inside a real city")]
struct Args {
    /// Number of clients to generate when no roster is given
    #[arg(short, long, default_value = "20")]
    num_clients: usize,

    /// City key in the population file
    #[arg(long, default_value = "Madrid")]
    city: String,

    /// Output file (.csv, .jsonl/.ndjson or .json)
    #[arg(short, long, default_value = "clients_geo.csv")]
    filename: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population JSON file
    #[arg(long)]
    population: Option<PathBuf>,

    /// District boundary shapefile
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// Attribute holding the district name
    #[arg(long)]
    name_field: Option<String>,

    /// PROJ.4 string of the boundary file's CRS
    #[arg(long)]
    source_crs: Option<String>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Existing client roster (JSON array) instead of generated clients
    #[arg(long)]
    clients: Option<PathBuf>,

    /// Also write the client list as JSON
    #[arg(long)]
    clients_out: Option<PathBuf>,

    /// Also write the address records as JSON
    #[arg(long)]
    addresses_out: Option<PathBuf>,

    /// Nominatim-compatible base URL
    #[arg(long)]
    geocoder_url: Option<String>,

    /// Reverse geocoding requests in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Drop failed rows instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Resolve against the district boundaries only, without network access
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    info!("Barrio client generator");
    let config = load_config(&args)?;

    let city = CityData::load(&config.data.population, &args.city)
        .with_context(|| format!("Failed to load population data for {}", args.city))?;

    let geometry = GeometryStore::load(&config.boundary_source()).with_context(|| {
        format!(
            "Failed to load district boundaries from {}",
            config.data.boundaries.display()
        )
    })?;
    info!("Loaded {} district boundaries", geometry.len());
    let geometry = Arc::new(geometry);

    let seed = args.seed.or(config.run.seed);
    let mut rng = match seed {
        Some(seed) => {
            info!("Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let clients = match &args.clients {
        Some(path) => load_roster(path)?,
        None => ClientGenerator::new(Local::now().date_naive()).generate(args.num_clients, &mut rng),
    };

    let geocoder: Box<dyn ReverseGeocoder> = if args.offline {
        info!("Resolving addresses offline");
        Box::new(
            OfflineGeocoder::new(&geometry)
                .with_region(&config.geocoder.region_state, &config.geocoder.region_country),
        )
    } else {
        let client = NominatimClient::new(&config.nominatim()).context("Failed to create geocoder client")?;
        info!("Resolving addresses via {}", client.endpoint());
        Box::new(client)
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let generator = AddressGenerator::new(city, geometry, config.generator_settings())
        .context("Boundaries do not cover every neighborhood")?
        .with_progress(pb.clone());

    let batch = generator
        .generate(&clients, geocoder.as_ref(), &mut rng)
        .await
        .context("Address generation failed")?;
    pb.finish_and_clear();

    write_rows(&args.filename, &batch.rows)
        .with_context(|| format!("Failed to write {}", args.filename.display()))?;
    if let Some(path) = &args.clients_out {
        write_json(path, &clients).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.addresses_out {
        write_json(path, &batch.records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    for failure in &batch.failures {
        warn!("Dropped: {}", failure.error);
    }
    info!("Summary:");
    info!("  Clients: {}", clients.len());
    info!("  Addresses requested: {}", batch.demanded);
    info!("  Rows written: {}", batch.rows.len());
    info!("  Rows dropped: {}", batch.failures.len());
    info!("  Output: {}", args.filename.display());

    Ok(())
}

/// File values first, then command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(path) = &args.population {
        config.data.population = path.clone();
    }
    if let Some(path) = &args.boundaries {
        config.data.boundaries = path.clone();
    }
    if let Some(field) = &args.name_field {
        config.data.name_field = field.clone();
    }
    if let Some(crs) = &args.source_crs {
        config.data.source_crs = Some(crs.clone());
    }
    if let Some(url) = &args.geocoder_url {
        config.geocoder.base_url = url.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.geocoder.concurrency = concurrency;
    }
    if args.lenient {
        config.run.failure_policy = FailurePolicy::Lenient;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_roster(path: &Path) -> Result<Vec<Client>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read client roster {}", path.display()))?;
    let clients: Vec<Client> = serde_json::from_str(&content)
        .with_context(|| format!("Malformed client roster {}", path.display()))?;
    info!("Loaded {} clients from {}", clients.len(), path.display());
    Ok(clients)
}
