//! Import report types shared by both document formats.
//!
//! The importers are lenient by default: an entry whose cross-references do
//! not resolve is skipped, not failed. The per-entry outcome list is what
//! lets a caller tell *why* an entry was skipped, since the counts alone
//! cannot distinguish a duplicate from an unresolved reference.

use serde::Serialize;

pub mod dedup;
pub mod geojson;
pub mod schema;

/// Document vocabulary for the entity an entry maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A network object entry (becomes a location).
    Object,
    /// A cable entry (becomes a link).
    Cable,
    /// A fiber-splice entry.
    Splice,
}

/// What happened to one document entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryOutcome {
    /// A new row was inserted.
    Inserted,
    /// An equivalent row already existed; the entry was remapped to it.
    Deduplicated,
    /// A cross-reference did not resolve; the entry was dropped.
    SkippedUnresolved,
    /// The entry's shape did not fit its declared kind; it was dropped.
    Rejected,
}

/// Per-entry audit record emitted alongside the counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    /// Entity kind the entry declared.
    pub kind: EntryKind,
    /// Document-local identifier, when the entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<i64>,
    /// Entry name, when the entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What happened to the entry.
    pub outcome: EntryOutcome,
}

/// Counts of rows actually inserted; deduplicated entries are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportCounts {
    /// Locations inserted.
    pub objects: u64,
    /// Links inserted.
    pub cables: u64,
    /// Splices inserted; absent for formats without splice entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splices: Option<u64>,
}

/// Result of one import call: counts plus the per-entry outcome list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    /// Inserted-row counts.
    pub imported: ImportCounts,
    /// One record per processed entry, in document order.
    pub entries: Vec<EntryRecord>,
}

impl ImportReport {
    fn new(with_splices: bool) -> Self {
        Self {
            imported: ImportCounts {
                splices: with_splices.then_some(0),
                ..ImportCounts::default()
            },
            entries: Vec::new(),
        }
    }

    fn record(
        &mut self,
        kind: EntryKind,
        local_id: Option<i64>,
        name: Option<&str>,
        outcome: EntryOutcome,
    ) {
        self.entries.push(EntryRecord {
            kind,
            local_id,
            name: name.map(Into::into),
            outcome,
        });
    }
}
