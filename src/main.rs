extern crate log;
pub mod crs;
pub mod geofile;
pub mod query;
pub mod repository;
use crate::geofile::document_store::{
    bootstrap, DocumentStore, FileDocumentStore, MemoryDocumentStore,
};
use crate::geofile::feature::FeatureId;
use crate::geofile::geojson::collection_to_json;
use crate::query::nearby::NearbySettings;
use crate::repository::errors::{ErrorKind, RepositoryError};
use crate::repository::feature_repository::{AttractionPatch, FeatureRepository, NewAttraction};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use geojson::{JsonObject, JsonValue};
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Query and edit a GeoJSON catalogue of attractions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,

    /// Apply changes to an in-memory copy of the document and leave the file untouched.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the whole collection.
    List,
    /// Print one attraction.
    Get { id: FeatureId },
    /// Filter by text in NAME or ATTRACTION, and by CATEGORY.
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Attractions within a radius (km) of a point.
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        radius: Option<String>,
    },
    /// Create an attraction from a JSON properties object and an optional GeoJSON geometry.
    Create {
        #[arg(long)]
        properties: String,
        #[arg(long)]
        geometry: Option<String>,
    },
    /// Merge properties into an attraction and optionally replace its geometry.
    Update {
        id: FeatureId,
        #[arg(long)]
        properties: Option<String>,
        #[arg(long)]
        geometry: Option<String>,
    },
    Delete { id: FeatureId },
    /// List the distinct categories.
    Categories,
}

#[derive(Deserialize, Debug)]
struct Config {
    document_path: PathBuf,
    #[serde(flatten)]
    nearby: NearbySettings,
}

fn parse_properties(json: &str) -> anyhow::Result<JsonObject> {
    match serde_json::from_str::<JsonValue>(json).context("Parsing properties")? {
        JsonValue::Object(properties) => Ok(properties),
        other => Err(anyhow!("Properties must be a JSON object, got {}", other)),
    }
}

fn parse_geometry(json: &str) -> anyhow::Result<geojson::Geometry> {
    let value: JsonValue = serde_json::from_str(json).context("Parsing geometry")?;
    Ok(geojson::Geometry::from_json_value(value)?)
}

fn run_command<S: DocumentStore>(
    repository: &FeatureRepository<S>,
    command: Command,
) -> anyhow::Result<JsonValue> {
    log::debug!("Running {:?} against {}", command, repository.store().location());
    let output = match command {
        Command::List => collection_to_json(&repository.get_all()),
        Command::Get { id } => repository.get_by_id(id)?.to_json(),
        Command::Search { query, category } => collection_to_json(
            &repository.search(query.as_deref(), category.as_deref()),
        ),
        Command::Nearby { lat, lng, radius } => collection_to_json(&repository.find_nearby(
            lat.as_deref(),
            lng.as_deref(),
            radius.as_deref(),
        )?),
        Command::Create {
            properties,
            geometry,
        } => {
            let attraction = NewAttraction {
                properties: parse_properties(&properties)?,
                geometry: geometry.as_deref().map(parse_geometry).transpose()?,
            };
            repository.create(attraction)?.to_json()
        }
        Command::Update {
            id,
            properties,
            geometry,
        } => {
            let patch = AttractionPatch {
                properties: properties
                    .as_deref()
                    .map(parse_properties)
                    .transpose()?
                    .unwrap_or_default(),
                geometry: geometry.as_deref().map(parse_geometry).transpose()?,
            };
            repository.update(id, patch)?.to_json()
        }
        Command::Delete { id } => {
            repository.delete(id)?;
            serde_json::json!({ "deleted": id })
        }
        Command::Categories => serde_json::json!({ "categories": repository.list_categories() }),
    };
    Ok(output)
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;
    log::debug!("{:?}", config);

    let file_store = FileDocumentStore::new(&config.document_path);
    let output = if args.dry_run {
        log::info!("Dry run, changes to {:?} are not saved", file_store.path());
        let memory_store = MemoryDocumentStore::copy_of(&file_store);
        let repository = FeatureRepository::with_settings(memory_store, config.nearby);
        run_command(&repository, args.command)?
    } else {
        bootstrap(&file_store)?;
        let repository = FeatureRepository::with_settings(file_store, config.nearby);
        run_command(&repository, args.command)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Process exit code for a failed run: 2 for rejected input, 3 for a missing attraction, 4 for a
/// change that could not be saved, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<RepositoryError>().map(RepositoryError::kind) {
        Some(ErrorKind::Validation) | Some(ErrorKind::BadRequest) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Persistence) => 4,
        None => 1,
    }
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(exit_code(&e))
    }
}
