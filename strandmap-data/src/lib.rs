//! Document ingestion for the strandmap inventory engine.
//!
//! Responsibilities:
//! - Replay structured schema documents (a previously exported network
//!   description) against an [`Inventory`](strandmap_core::Inventory).
//! - Ingest GeoJSON feature collections whose cross-references are
//!   expressed by coordinate equality instead of explicit ids.
//! - Report a per-entry outcome list alongside the inserted-row counts.
//!
//! Boundaries:
//! - Do not encode domain rules (they live in `strandmap-core`).
//! - One import phase maps onto one store transaction; no state survives a
//!   call apart from what the store committed.

#![forbid(unsafe_code)]

pub mod import;

pub use import::geojson::{GeoImportError, import_geojson};
pub use import::schema::{SchemaImportError, import_schema};
pub use import::{EntryKind, EntryOutcome, EntryRecord, ImportCounts, ImportReport};
