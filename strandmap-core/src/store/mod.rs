//! SQLite-backed persistence for the network inventory.
//!
//! [`Inventory`] owns the connection and the post-insert observer list.
//! Direct creation goes through strict conflict-checked operations; the
//! importers in `strandmap-data` drive the same write machinery through
//! scoped [`WriteTxn`] phases, one transaction per phase.

use std::path::PathBuf;

use thiserror::Error;

use crate::derive::DeriveError;
use crate::entity::{LinkId, LocationId, RegionId};

mod membership;
mod queries;
mod schema;
mod sqlite;

pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema, seed_reference_data};
pub use sqlite::{Inventory, WriteTxn};

pub(crate) use membership::{attach_link, attach_location, endpoints_in_region};

/// Errors returned by inventory store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open inventory database at {path:?}")]
    Open {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// An entity with the same unique name already exists.
    #[error("{kind} named {name:?} already exists")]
    NameConflict {
        /// Entity kind the conflict was detected on.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },
    /// A referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind that was looked up.
        kind: &'static str,
        /// Identifier that failed to resolve.
        id: i64,
    },
    /// A link may join a region only once both endpoints are members.
    #[error("link {link} endpoints are not both members of region {region}")]
    EndpointsOutsideRegion {
        /// Region the attach was requested on.
        region: RegionId,
        /// Link whose endpoints fall outside the region.
        link: LinkId,
    },
    /// The location is still referenced by links and cannot be deleted.
    #[error("location {location} is referenced by {links} link(s)")]
    ReferencedByLinks {
        /// Location the delete was requested on.
        location: LocationId,
        /// Number of links still referencing it.
        links: i64,
    },
    /// A store-level constraint rejected the write.
    #[error("constraint violated: {message}")]
    Constraint {
        /// Constraint description reported by SQLite.
        message: String,
    },
    /// Any other SQLite failure.
    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    /// Wrap a `rusqlite` error, separating constraint violations so callers
    /// can tell a uniqueness race from a transport failure.
    pub(crate) fn from_sqlite(source: rusqlite::Error) -> Self {
        match source {
            rusqlite::Error::SqliteFailure(code, ref message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint {
                    message: message.clone().unwrap_or_else(|| code.to_string()),
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        Self::from_sqlite(source)
    }
}

impl From<DeriveError> for StoreError {
    fn from(source: DeriveError) -> Self {
        match source {
            DeriveError::Sqlite(inner) => Self::from_sqlite(inner),
        }
    }
}
