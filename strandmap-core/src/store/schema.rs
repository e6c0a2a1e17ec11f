//! Schema initialisation and reference-data seeding.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version written to `inventory_schema_version` by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised while initialising or seeding the inventory schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration or seeding step failed.
    #[error("schema step failed: {step}")]
    Migration {
        /// Name of the failing step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database carries a schema version this build does not support.
    #[error("unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the database.
        found: i64,
        /// Version this build writes and reads.
        supported: i64,
    },
}

/// Initialise the inventory schema inside an existing SQLite database.
///
/// Enables foreign keys, creates the entity tables, membership relations,
/// reference catalogs and indexes, and records the schema version. An
/// existing installation must already match [`SCHEMA_VERSION`]; mismatches
/// are rejected so migrations stay explicit.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use strandmap_core::store::SCHEMA_VERSION;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// strandmap_core::store::initialise_schema(&mut conn).expect("create schema");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM inventory_schema_version LIMIT 1", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, SCHEMA_VERSION);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_catalog_tables(&transaction)?;
    create_entity_tables(&transaction)?;
    create_membership_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

/// Seed the cable-type and location-type catalogs.
///
/// Idempotent: rows are keyed by explicit ids and inserted with
/// `INSERT OR IGNORE`, so re-seeding an initialised database changes
/// nothing. The generic optical entry is pinned at id 1 and the `node`
/// location type at id 1, matching the documented degraded fallbacks.
pub fn seed_reference_data(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin seed transaction",
            source,
        })?;

    seed_cable_types(&transaction)?;
    seed_location_types(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit seed transaction",
            source,
        })
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

fn create_catalog_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create cable_types",
        "CREATE TABLE IF NOT EXISTS cable_types (
            cable_type_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            fiber_count INTEGER,
            color TEXT NOT NULL,
            description TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create location_types",
        "CREATE TABLE IF NOT EXISTS location_types (
            location_type_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            emoji TEXT,
            description TEXT
        )",
    )
}

fn create_entity_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create locations",
        "CREATE TABLE IF NOT EXISTS locations (
            location_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            location_type_id INTEGER NOT NULL
                REFERENCES location_types(location_type_id),
            latitude REAL,
            longitude REAL,
            address TEXT,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create links",
        "CREATE TABLE IF NOT EXISTS links (
            link_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            cable_type_id INTEGER NOT NULL REFERENCES cable_types(cable_type_id),
            fiber_count INTEGER,
            from_location_id INTEGER NOT NULL REFERENCES locations(location_id),
            to_location_id INTEGER NOT NULL REFERENCES locations(location_id),
            distance_km REAL,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create splices",
        "CREATE TABLE IF NOT EXISTS splices (
            splice_id INTEGER PRIMARY KEY,
            link_id INTEGER NOT NULL
                REFERENCES links(link_id) ON DELETE CASCADE,
            fiber_number INTEGER NOT NULL,
            peer_link_id INTEGER
                REFERENCES links(link_id) ON DELETE SET NULL,
            peer_fiber INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create regions",
        "CREATE TABLE IF NOT EXISTS regions (
            region_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            display_name TEXT,
            country TEXT,
            state TEXT,
            external_ref INTEGER UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT
        )",
    )
}

fn create_membership_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create region_locations",
        "CREATE TABLE IF NOT EXISTS region_locations (
            region_id INTEGER NOT NULL
                REFERENCES regions(region_id) ON DELETE CASCADE,
            location_id INTEGER NOT NULL
                REFERENCES locations(location_id) ON DELETE CASCADE,
            PRIMARY KEY (region_id, location_id)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create region_links",
        "CREATE TABLE IF NOT EXISTS region_links (
            region_id INTEGER NOT NULL
                REFERENCES regions(region_id) ON DELETE CASCADE,
            link_id INTEGER NOT NULL
                REFERENCES links(link_id) ON DELETE CASCADE,
            PRIMARY KEY (region_id, link_id)
        ) WITHOUT ROWID",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index locations position",
        "CREATE INDEX IF NOT EXISTS idx_locations_position
            ON locations(longitude, latitude)",
    )?;
    run_migration_step(
        transaction,
        "index links route",
        "CREATE INDEX IF NOT EXISTS idx_links_route
            ON links(from_location_id, to_location_id)",
    )?;
    run_migration_step(
        transaction,
        "index splices owner",
        "CREATE INDEX IF NOT EXISTS idx_splices_link ON splices(link_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create inventory_schema_version",
        "CREATE TABLE IF NOT EXISTS inventory_schema_version (
            version INTEGER NOT NULL
        )",
    )?;

    let existing: Option<i64> = transaction
        .query_row("SELECT version FROM inventory_schema_version LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(version) => Err(SchemaError::UnsupportedVersion {
            found: version,
            supported: SCHEMA_VERSION,
        }),
        None => transaction
            .execute(
                "INSERT INTO inventory_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn seed_cable_types(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    // (id, name, fiber_count, color, description); generic optical stays at
    // id 1, the resolver's catalog-empty sentinel.
    const CABLE_TYPES: &[(i64, &str, Option<i64>, &str, &str)] = &[
        (1, "optical", None, "#0087BE", "Generic optical cable"),
        (2, "copper", None, "#B87333", "Generic copper cable"),
        (3, "OS-1", Some(1), "#0000FF", "Optical series, 1 fiber"),
        (4, "OS-2", Some(2), "#FFA500", "Optical series, 2 fibers"),
        (5, "OS-4", Some(4), "#A52A2A", "Optical series, 4 fibers"),
        (6, "OS-8", Some(8), "#800080", "Optical series, 8 fibers"),
        (7, "OS-12", Some(12), "#000000", "Optical series, 12 fibers"),
        (8, "OS-24", Some(24), "#FFFFFF", "Optical series, 24 fibers"),
        (9, "OS-48", Some(48), "#FF0000", "Optical series, 48 fibers"),
        (10, "OS-96", Some(96), "#008000", "Optical series, 96 fibers"),
    ];

    let mut statement = transaction
        .prepare(
            "INSERT OR IGNORE INTO cable_types
                (cable_type_id, name, fiber_count, color, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|source| SchemaError::Migration {
            step: "prepare cable_types seed",
            source,
        })?;
    for row in CABLE_TYPES {
        statement
            .execute(*row)
            .map_err(|source| SchemaError::Migration {
                step: "seed cable_types",
                source,
            })?;
    }
    Ok(())
}

fn seed_location_types(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    // `node` stays at id 1, the importer's hard-coded fallback.
    const LOCATION_TYPES: &[(i64, &str, &str, &str)] = &[
        (1, "node", "Node", "📡"),
        (2, "closure", "Splice closure", "🔌"),
        (3, "cabinet", "Street cabinet", "🗄️"),
        (4, "splitter", "Splitter", "🔀"),
        (5, "subscriber", "Subscriber drop", "🏠"),
        (6, "pole", "Pole", "🗼"),
        (7, "well", "Cable well", "🕳️"),
        (8, "camera", "Camera", "📷"),
        (9, "wifi", "Wi-Fi point", "📶"),
    ];

    let mut statement = transaction
        .prepare(
            "INSERT OR IGNORE INTO location_types
                (location_type_id, name, display_name, emoji)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|source| SchemaError::Migration {
            step: "prepare location_types seed",
            source,
        })?;
    for row in LOCATION_TYPES {
        statement
            .execute(*row)
            .map_err(|source| SchemaError::Migration {
                step: "seed location_types",
                source,
            })?;
    }
    Ok(())
}
