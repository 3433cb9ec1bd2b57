//! Load catalog rows from JSON, build the index, and run one query.
//!
//! Example:
//!   catalog_query --rows objects.json --ra 10.68 --dec 41.27 -n 5
//!   catalog_query --rows objects.json --digits 1897
//!   catalog_query --rows objects.json --deselect M,NGC --name andromeda
//!   catalog_query --rows objects.json --object-types Gx,PN --ra 83.8 --dec -5.4

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::{CatalogConfig, CatalogFilter, CatalogIndex, CatalogObject, CatalogRow};
use clap::Parser;
use log::info;

/// Command line arguments for catalog queries
#[derive(Parser, Debug)]
#[command(
    name = "Catalog Query",
    about = "Nearest-object and keypad searches over deduplicated catalogs",
    long_about = None
)]
struct Args {
    /// Catalog configuration (JSON). Uses the built-in catalog list when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog rows as a JSON array
    #[arg(short, long)]
    rows: PathBuf,

    /// Catalog codes to exclude from search (comma-separated)
    #[arg(long, value_delimiter = ',')]
    deselect: Vec<String>,

    /// Only index these object types, e.g. Gx,OC (comma-separated)
    #[arg(long, value_delimiter = ',')]
    object_types: Vec<String>,

    /// Right ascension of the query position, degrees
    #[arg(long, requires = "dec")]
    ra: Option<f64>,

    /// Declination of the query position, degrees
    #[arg(long, requires = "ra")]
    dec: Option<f64>,

    /// Number of nearest objects to list (0 lists all)
    #[arg(short, default_value_t = 10)]
    n: usize,

    /// Keypad digit prefix to search for
    #[arg(long)]
    digits: Option<String>,

    /// Case-insensitive name fragment to search for
    #[arg(long)]
    name: Option<String>,
}

fn load_rows(path: &Path) -> Result<Vec<CatalogRow>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open rows file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse rows file {}", path.display()))
}

fn print_object(obj: &CatalogObject, distance_deg: Option<f64>) {
    let distance = distance_deg
        .map(|d| format!("{d:>9.4}°  "))
        .unwrap_or_default();
    println!(
        "{distance}{:<12} {:<24} RA {:>8.3}  Dec {:>+8.3}  {} {}",
        obj.designation(),
        obj.display_name(),
        obj.ra_deg,
        obj.dec_deg,
        obj.object_type,
        obj.constellation
    );
}

fn print_list(title: &str, objects: &[Arc<CatalogObject>]) {
    println!("\n{title} ({} matches)", objects.len());
    for obj in objects {
        print_object(obj, None);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CatalogConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CatalogConfig::default(),
    };
    let index = CatalogIndex::new(config)?;

    let report = index.load_rows(load_rows(&args.rows)?);
    if report.rejected() > 0 {
        println!(
            "Skipped {} rows ({} unknown catalog, {} duplicate, {} invalid)",
            report.rejected(),
            report.unknown_catalog,
            report.duplicate_sequence,
            report.invalid
        );
    }

    for code in &args.deselect {
        index.set_selection(code, false)?;
    }
    if !args.object_types.is_empty() {
        index.set_filter(CatalogFilter::with_object_types(args.object_types.iter().cloned()));
    }

    let build = index.rebuild();
    info!("Index ready in {:?}", build.elapsed);
    println!(
        "Indexed {} objects from {} candidates ({} filtered out, {} duplicates merged, {} without valid position)",
        build.deduplicated,
        build.candidates,
        build.filtered_out,
        build.duplicates_merged,
        build.excluded_coordinates
    );

    if let (Some(ra), Some(dec)) = (args.ra, args.dec) {
        let nearest = index.nearest_with_distance(ra, dec, args.n);
        println!("\nNearest to RA {ra:.3} Dec {dec:+.3} ({} objects)", nearest.len());
        for (obj, distance) in &nearest {
            print_object(obj, Some(*distance));
        }
    }

    if let Some(digits) = &args.digits {
        print_list(&format!("Keypad {digits}"), &index.search_by_digits(digits));
    }

    if let Some(name) = &args.name {
        print_list(&format!("Name \"{name}\""), &index.search_by_name(name));
    }

    Ok(())
}
