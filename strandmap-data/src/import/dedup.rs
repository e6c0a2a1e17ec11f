//! Name-based deduplication guard shared by both importers.
//!
//! Imports are expected to overlap with data already in the store and must
//! be safely re-runnable, so a name collision during import means "already
//! present: skip the insert and remap to the existing id". Direct creation
//! keeps the opposite, strict policy and rejects collisions.

use strandmap_core::{StoreError, WriteTxn};

/// Entity kinds addressable by unique name during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedEntity {
    /// Locations, deduplicated before every object/point insert.
    Location,
    /// Links, deduplicated before every cable/line insert.
    Link,
}

/// Single exact-name lookup. `Some(id)` means an equivalent entity already
/// exists and the caller should remap instead of inserting.
pub fn existing_id(
    tx: &WriteTxn<'_>,
    entity: NamedEntity,
    name: &str,
) -> Result<Option<i64>, StoreError> {
    match entity {
        NamedEntity::Location => tx.location_id_by_name(name),
        NamedEntity::Link => tx.link_id_by_name(name),
    }
}
