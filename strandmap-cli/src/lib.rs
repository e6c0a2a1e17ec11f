//! Command-line interface for strandmap's offline inventory tooling.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8;
use clap::{Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use strandmap_core::Inventory;
use strandmap_data::{EntryRecord, ImportCounts, import_geojson, import_schema};

mod error;

pub use error::CliError;

const ARG_DB: &str = "db";
const ARG_FILE: &str = "file";
const ENV_IMPORT_DB: &str = "STRANDMAP_CMDS_IMPORT_DB";
const ENV_IMPORT_FILE: &str = "STRANDMAP_CMDS_IMPORT_FILE";

/// Run the strandmap CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Init(args) => run_init(&args),
        Command::Import(command) => {
            let rendered = run_import(command)?;
            println!("{rendered}");
            Ok(())
        }
        Command::Region(command) => {
            let message = run_region(command)?;
            println!("{message}");
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "strandmap",
    about = "Offline tooling for the strandmap network inventory",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create (or upgrade) an inventory database and seed its catalogs.
    Init(InitArgs),
    /// Import a network description document.
    Import(ImportCommand),
    /// Toggle region membership directly.
    Region(RegionCommand),
}

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser)]
struct InitArgs {
    /// Path of the SQLite inventory database to create.
    #[arg(long = ARG_DB, value_name = "path")]
    db: Utf8PathBuf,
}

#[derive(Debug, Parser)]
struct ImportCommand {
    #[command(subcommand)]
    format: ImportFormat,
}

#[derive(Debug, Subcommand)]
enum ImportFormat {
    /// Import a structured schema document (objects, cables, splices).
    Schema(ImportArgs),
    /// Import a GeoJSON feature collection (points and line strings).
    Geojson(ImportArgs),
}

/// CLI arguments shared by both import formats.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Define the inventory database and the document to import. \
                 Paths can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Describe the database and document for an import"
)]
#[ortho_config(prefix = "STRANDMAP")]
struct ImportArgs {
    /// Path of the SQLite inventory database.
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    db: Option<Utf8PathBuf>,
    /// Path of the document to import.
    #[arg(long = ARG_FILE, value_name = "path")]
    #[serde(default)]
    file: Option<Utf8PathBuf>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportConfig {
    db: Utf8PathBuf,
    file: Utf8PathBuf,
}

impl ImportConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        if self.file.is_file() {
            Ok(())
        } else {
            Err(CliError::MissingSourceFile {
                field: ARG_FILE,
                path: self.file.clone(),
            })
        }
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let db = args.db.ok_or(CliError::MissingArgument {
            field: ARG_DB,
            env: ENV_IMPORT_DB,
        })?;
        let file = args.file.ok_or(CliError::MissingArgument {
            field: ARG_FILE,
            env: ENV_IMPORT_FILE,
        })?;
        Ok(Self { db, file })
    }
}

#[derive(Debug, Parser)]
struct RegionCommand {
    #[command(subcommand)]
    action: RegionAction,
}

#[derive(Debug, Subcommand)]
enum RegionAction {
    /// Attach a network object to a region.
    AttachObject(ObjectMembershipArgs),
    /// Detach a network object from a region.
    DetachObject(ObjectMembershipArgs),
    /// Attach a cable to a region (both endpoints must be members).
    AttachCable(CableMembershipArgs),
    /// Detach a cable from a region.
    DetachCable(CableMembershipArgs),
}

/// Region/object pair addressed by store ids.
#[derive(Debug, Clone, Parser)]
struct ObjectMembershipArgs {
    /// Path of the SQLite inventory database.
    #[arg(long = ARG_DB, value_name = "path")]
    db: Utf8PathBuf,
    /// Region id.
    #[arg(long)]
    region: i64,
    /// Network object (location) id.
    #[arg(long)]
    object: i64,
}

/// Region/cable pair addressed by store ids.
#[derive(Debug, Clone, Parser)]
struct CableMembershipArgs {
    /// Path of the SQLite inventory database.
    #[arg(long = ARG_DB, value_name = "path")]
    db: Utf8PathBuf,
    /// Region id.
    #[arg(long)]
    region: i64,
    /// Cable (link) id.
    #[arg(long)]
    cable: i64,
}

/// Import output in the wire shape callers expect: a status, a message, and
/// the inserted-row counts, plus the per-entry outcome list.
#[derive(Debug, Serialize)]
struct ImportResponse {
    status: &'static str,
    message: &'static str,
    imported: ImportCounts,
    entries: Vec<EntryRecord>,
}

fn run_init(args: &InitArgs) -> Result<(), CliError> {
    open_inventory(&args.db)?;
    println!("initialised inventory database at {}", args.db);
    Ok(())
}

fn run_import(command: ImportCommand) -> Result<String, CliError> {
    let response = match command.format {
        ImportFormat::Schema(args) => {
            let (mut inventory, document) = prepare_import(args)?;
            let report = import_schema(&mut inventory, &document)?;
            ImportResponse {
                status: "success",
                message: "schema imported",
                imported: report.imported,
                entries: report.entries,
            }
        }
        ImportFormat::Geojson(args) => {
            let (mut inventory, document) = prepare_import(args)?;
            let report = import_geojson(&mut inventory, &document)?;
            ImportResponse {
                status: "success",
                message: "GeoJSON imported",
                imported: report.imported,
                entries: report.entries,
            }
        }
    };
    serde_json::to_string_pretty(&response).map_err(CliError::Render)
}

fn prepare_import(args: ImportArgs) -> Result<(Inventory, String), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let document = read_document(&config.file)?;
    let inventory = open_inventory(&config.db)?;
    Ok((inventory, document))
}

fn run_region(command: RegionCommand) -> Result<String, CliError> {
    match command.action {
        RegionAction::AttachObject(args) => {
            let mut inventory = open_inventory(&args.db)?;
            let changed = inventory.attach_location_to_region(args.region, args.object)?;
            Ok(membership_message("object", args.object, "attached to", args.region, changed))
        }
        RegionAction::DetachObject(args) => {
            let mut inventory = open_inventory(&args.db)?;
            let changed = inventory.detach_location_from_region(args.region, args.object)?;
            Ok(membership_message("object", args.object, "detached from", args.region, changed))
        }
        RegionAction::AttachCable(args) => {
            let mut inventory = open_inventory(&args.db)?;
            let changed = inventory.attach_link_to_region(args.region, args.cable)?;
            Ok(membership_message("cable", args.cable, "attached to", args.region, changed))
        }
        RegionAction::DetachCable(args) => {
            let mut inventory = open_inventory(&args.db)?;
            let changed = inventory.detach_link_from_region(args.region, args.cable)?;
            Ok(membership_message("cable", args.cable, "detached from", args.region, changed))
        }
    }
}

fn membership_message(kind: &str, id: i64, verb: &str, region: i64, changed: bool) -> String {
    if changed {
        format!("{kind} {id} {verb} region {region}")
    } else {
        format!("{kind} {id} already {verb} region {region} (no change)")
    }
}

fn read_document(path: &Utf8Path) -> Result<String, CliError> {
    std::fs::read_to_string(path.as_std_path()).map_err(|source| CliError::ReadDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Open the inventory database, creating parent directories and the schema
/// on first use. Initialisation and seeding are idempotent.
fn open_inventory(path: &Utf8Path) -> Result<Inventory, CliError> {
    ensure_parent_dir(path)?;
    let mut inventory = Inventory::open(path.as_std_path())?;
    inventory.initialise()?;
    inventory.seed_reference_data()?;
    Ok(inventory)
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), CliError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let base_dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
        CliError::CreateDbDirectory {
            path: path.to_path_buf(),
            source,
        }
    })?;
    base_dir
        .create_dir_all(relative)
        .map_err(|source| CliError::CreateDbDirectory {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    fn db_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("inventory.db")).expect("utf-8 path")
    }

    #[rstest]
    fn parses_import_schema_arguments() {
        let cli = Cli::try_parse_from([
            "strandmap",
            "import",
            "schema",
            "--db",
            "inventory.db",
            "--file",
            "export.json",
        ])
        .expect("parse");

        let Command::Import(ImportCommand {
            format: ImportFormat::Schema(args),
        }) = cli.command
        else {
            panic!("expected import schema command");
        };
        assert_eq!(args.db.as_deref(), Some(Utf8Path::new("inventory.db")));
        assert_eq!(args.file.as_deref(), Some(Utf8Path::new("export.json")));
    }

    #[rstest]
    fn import_config_requires_both_paths() {
        let args = ImportArgs {
            db: Some("inventory.db".into()),
            file: None,
        };
        let error = ImportConfig::try_from(args).expect_err("missing file should fail");
        assert!(matches!(
            error,
            CliError::MissingArgument { field: "file", .. }
        ));
    }

    #[rstest]
    fn open_inventory_bootstraps_nested_database() {
        let dir = TempDir::new().expect("temp dir");
        let nested = Utf8PathBuf::from_path_buf(dir.path().join("data/nested/inventory.db"))
            .expect("utf-8 path");

        let inventory = open_inventory(&nested).expect("open");

        assert!(nested.is_file());
        assert!(!inventory.cable_types().expect("catalog").is_empty());
    }

    #[rstest]
    fn import_and_membership_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let db = db_path(&dir);
        let document = json!({
            "objects": [
                {"id": 1, "name": "HUB-01", "address": "12 Central Ave"},
                {"id": 2, "name": "CAB-07"},
            ],
            "cables": [
                {"id": 10, "name": "HUB-01/CAB-07",
                 "from_object_id": 1, "to_object_id": 2},
            ],
        })
        .to_string();
        let file = Utf8PathBuf::from_path_buf(dir.path().join("export.json")).expect("utf-8");
        std::fs::write(file.as_std_path(), document).expect("write document");

        let rendered = run_import(ImportCommand {
            format: ImportFormat::Schema(ImportArgs {
                db: Some(db.clone()),
                file: Some(file),
            }),
        })
        .expect("import");
        assert!(rendered.contains("\"objects\": 2"));
        assert!(rendered.contains("\"cables\": 1"));

        let mut inventory = open_inventory(&db).expect("reopen");
        let region = inventory
            .create_region(&strandmap_core::NewRegion {
                name: "Central".into(),
                latitude: 0.0,
                longitude: 0.0,
                display_name: None,
                country: None,
                state: None,
                external_ref: None,
                description: None,
            })
            .expect("region");
        drop(inventory);

        let message = run_region(RegionCommand {
            action: RegionAction::AttachObject(ObjectMembershipArgs {
                db: db.clone(),
                region: region.id,
                object: 1,
            }),
        })
        .expect("attach");
        assert!(message.contains("attached to"));
    }
}
