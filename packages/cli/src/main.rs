#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid cell statistics from local Block Group and LODES files.
//!
//! ```text
//! grid_stats_cli stats --lat 42.3601 --lon -71.0589 --block-groups bg.geojson [--lodes ma_wac.csv.gz]
//! grid_stats_cli stats --lat 42.3601 --lon -71.0589 --block-groups bg.geojson --lodes lodes/ --lodes-state ma --format csv
//! grid_stats_cli cell --lat 42.3601 --lon -71.0589 --cell-km 2
//! grid_stats_cli catalog [--catalog acs5.toml] [--batch-size 50]
//! ```
//!
//! Logging is controlled with `RUST_LOG`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use grid_stats_aggregate::VariableCatalog;
use grid_stats_aggregate::catalog::CENSUS_API_VARIABLE_LIMIT;
use grid_stats_engine::{GridStatsRequest, compute, write_csv};
use grid_stats_geometry_models::{DEFAULT_CELL_KM, GeoPoint};
use grid_stats_lodes_models::JobRecord;
use serde::Serialize;

const DEFAULT_LODES_YEAR: u16 = 2022;

#[derive(Parser)]
#[command(
    name = "grid_stats_cli",
    about = "Area-weighted Census statistics for a square grid cell"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full statistics report for a cell
    Stats {
        /// Center latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Center longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Cell side length in kilometers (0.1 to 10)
        #[arg(long, default_value_t = DEFAULT_CELL_KM)]
        cell_km: f64,
        /// `GeoJSON` `FeatureCollection` of Block Groups with attached values
        #[arg(long)]
        block_groups: PathBuf,
        /// LODES WAC file (`.csv` or `.csv.gz`), or a directory of WAC files
        #[arg(long)]
        lodes: Option<PathBuf>,
        /// State abbreviation used to pick the WAC file when `--lodes` is a directory
        #[arg(long)]
        lodes_state: Option<String>,
        /// LODES year used to pick the WAC file when `--lodes` is a directory
        #[arg(long, default_value_t = DEFAULT_LODES_YEAR)]
        lodes_year: u16,
        /// Alternative variable catalog TOML
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Show the cell geometry only
    Cell {
        /// Center latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Center longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Cell side length in kilometers (0.1 to 10)
        #[arg(long, default_value_t = DEFAULT_CELL_KM)]
        cell_km: f64,
    },
    /// List catalog variables and provider request batches
    Catalog {
        /// Alternative variable catalog TOML
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Maximum variables per provider request
        #[arg(long, default_value_t = CENSUS_API_VARIABLE_LIMIT)]
        batch_size: usize,
    },
}

#[derive(Serialize)]
struct CellSummary {
    center: GeoPoint,
    side_km: f64,
    projected_crs: String,
    area_km2: f64,
    boundary: Vec<[f64; 2]>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats {
            lat,
            lon,
            cell_km,
            block_groups,
            lodes,
            lodes_state,
            lodes_year,
            catalog,
            format,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let geojson = std::fs::read_to_string(&block_groups)?;
            let sources = grid_stats_aggregate::sources_from_geojson(&geojson, &catalog)?;
            let jobs = match lodes {
                Some(path) => {
                    let path = resolve_lodes_path(path, lodes_state.as_deref(), lodes_year)?;
                    Some(load_lodes(&path)?)
                }
                None => None,
            };

            let request = GridStatsRequest::new(lat, lon).with_cell_km(cell_km);
            let report = compute(&request, &sources, jobs.as_deref(), &catalog)?;
            match format {
                OutputFormat::Json => print_json(&report, cli.pretty)?,
                OutputFormat::Csv => write_csv(&report, std::io::stdout().lock())?,
            }
        }
        Commands::Cell { lat, lon, cell_km } => {
            let cell = grid_stats_geometry::build_cell(GeoPoint::new(lon, lat), cell_km)?;
            let summary = CellSummary {
                center: cell.center(),
                side_km: cell.side_km(),
                projected_crs: cell.crs().to_string(),
                area_km2: cell.area_km2(),
                boundary: cell.boundary_ring(),
            };
            print_json(&summary, cli.pretty)?;
        }
        Commands::Catalog {
            catalog,
            batch_size,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;

            println!("{:<14} {:<18} METRIC", "VARIABLE", "REDUCTION");
            println!("{}", "-".repeat(72));
            for variable in catalog.variables() {
                println!(
                    "{:<14} {:<18} {}",
                    variable.name,
                    variable.reduction.as_ref(),
                    variable.metric
                );
            }

            let batches = catalog.request_batches(batch_size);
            println!(
                "\n{} variable(s) in {} request batch(es) of up to {batch_size}",
                catalog.len(),
                batches.len()
            );
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<VariableCatalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(VariableCatalog::builtin());
    };
    log::info!("Loading variable catalog from {}", path.display());
    let toml_str = std::fs::read_to_string(path)?;
    Ok(VariableCatalog::from_toml_str(&toml_str)?)
}

fn resolve_lodes_path(
    path: PathBuf,
    state: Option<&str>,
    year: u16,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Ok(path);
    }
    let Some(state) = state else {
        return Err(format!(
            "--lodes {} is a directory; pass --lodes-state to pick a WAC file",
            path.display()
        )
        .into());
    };
    Ok(path.join(grid_stats_lodes::wac::wac_file_name(state, year)))
}

fn load_lodes(path: &Path) -> Result<Vec<JobRecord>, grid_stats_lodes::LodesError> {
    let reader = BufReader::new(File::open(path)?);
    if path.extension().is_some_and(|ext| ext == "gz") {
        grid_stats_lodes::wac::parse_wac_gz(reader)
    } else {
        grid_stats_lodes::wac::parse_wac(reader)
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), serde_json::Error> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
