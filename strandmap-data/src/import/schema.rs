//! Structured schema-document importer.
//!
//! Replays a previously exported network description against the store in
//! strict phases: locations, then links, then splices. Each phase commits
//! before the next begins, and identifier maps built by earlier phases
//! resolve the document-local cross-references used by later ones. A
//! failure mid-phase rolls back only that phase; re-running the corrected
//! document converges because of the name-based dedup guard, not because of
//! cross-phase atomicity.

use std::collections::HashMap;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use strandmap_core::catalog::{
    CableTypeQuery, DEFAULT_LOCATION_TYPE, FALLBACK_LOCATION_TYPE_ID, resolve_cable_type,
};
use strandmap_core::entity::{LinkId, LocationId, NewLink, NewLocation, NewSplice};
use strandmap_core::{Inventory, StoreError, WriteTxn};

use super::dedup::{self, NamedEntity};
use super::{EntryKind, EntryOutcome, ImportReport};

/// Errors returned by [`import_schema`].
#[derive(Debug, Error)]
pub enum SchemaImportError {
    /// The document is not valid JSON or has the wrong top-level shape.
    /// Nothing has been committed.
    #[error("malformed import document")]
    Malformed {
        /// Decoding failure reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// One entry could not be decoded. The phase it belongs to has been
    /// rolled back; phases committed earlier stand.
    #[error("invalid {kind} entry at index {index}: {source}")]
    Entry {
        /// Document array the entry came from.
        kind: &'static str,
        /// Zero-based index within that array.
        index: usize,
        /// Decoding failure naming the offending field.
        #[source]
        source: serde_json::Error,
    },
    /// The store failed mid-phase; that phase has been rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    cables: Vec<Value>,
    #[serde(default)]
    fiber_splices: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    id: i64,
    name: String,
    object_type: Option<String>,
    object_type_id: Option<i64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CableEntry {
    id: i64,
    name: String,
    cable_type: Option<String>,
    cable_type_id: Option<i64>,
    fiber_count: Option<i64>,
    from_object_id: i64,
    to_object_id: i64,
    distance_km: Option<f64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpliceEntry {
    cable_id: i64,
    fiber_number: i64,
    splice_to_cable_id: Option<i64>,
    splice_to_fiber: i64,
}

/// Import a structured schema document.
///
/// Entries are decoded lazily, one at a time, so a defective entry aborts
/// only the phase that reached it. Entries whose document-local references
/// do not resolve are skipped and show up in the report as
/// `skipped-unresolved`; name collisions with existing rows are remapped
/// and show up as `deduplicated`.
pub fn import_schema(
    store: &mut Inventory,
    document: &str,
) -> Result<ImportReport, SchemaImportError> {
    let document: SchemaDocument =
        serde_json::from_str(document).map_err(|source| SchemaImportError::Malformed { source })?;
    let mut report = ImportReport::new(true);

    let locations = store.write_phase("import-locations", |tx| {
        import_locations(tx, &document.objects, &mut report)
    })?;

    store.write_phase("import-links", |tx| {
        import_links(tx, &document.cables, &locations, &mut report)
    })?;

    // Read-only remap pass: phase 2 does not capture a local map of its own,
    // so link ids are re-derived by the (name, from, to) route triple.
    let links = store.write_phase("remap-links", |tx| {
        remap_links(tx, &document.cables, &locations)
    })?;

    store.write_phase("import-splices", |tx| {
        import_splices(tx, &document.fiber_splices, &links, &mut report)
    })?;

    info!(
        "schema import complete: {} objects, {} cables, {} splices inserted",
        report.imported.objects,
        report.imported.cables,
        report.imported.splices.unwrap_or(0)
    );
    Ok(report)
}

fn decode_entry<'de, T: Deserialize<'de>>(
    kind: &'static str,
    index: usize,
    value: &'de Value,
) -> Result<T, SchemaImportError> {
    T::deserialize(value).map_err(|source| SchemaImportError::Entry { kind, index, source })
}

fn import_locations(
    tx: &mut WriteTxn<'_>,
    entries: &[Value],
    report: &mut ImportReport,
) -> Result<HashMap<i64, LocationId>, SchemaImportError> {
    let mut locations = HashMap::new();
    for (index, value) in entries.iter().enumerate() {
        let entry: ObjectEntry = decode_entry("object", index, value)?;
        if let Some(existing) = dedup::existing_id(tx, NamedEntity::Location, &entry.name)? {
            locations.insert(entry.id, existing);
            report.record(
                EntryKind::Object,
                Some(entry.id),
                Some(&entry.name),
                EntryOutcome::Deduplicated,
            );
            continue;
        }

        let location_type = match entry.object_type_id {
            Some(id) => id,
            None => {
                let type_name = entry.object_type.as_deref().unwrap_or(DEFAULT_LOCATION_TYPE);
                tx.location_type_id(type_name)?.unwrap_or(FALLBACK_LOCATION_TYPE_ID)
            }
        };
        let location = tx.insert_location(&NewLocation {
            name: entry.name,
            location_type,
            latitude: entry.latitude,
            longitude: entry.longitude,
            address: entry.address,
            description: entry.description,
        })?;
        locations.insert(entry.id, location.id);
        report.imported.objects += 1;
        report.record(
            EntryKind::Object,
            Some(entry.id),
            Some(&location.name),
            EntryOutcome::Inserted,
        );
    }
    Ok(locations)
}

fn import_links(
    tx: &mut WriteTxn<'_>,
    entries: &[Value],
    locations: &HashMap<i64, LocationId>,
    report: &mut ImportReport,
) -> Result<(), SchemaImportError> {
    let catalog = tx.cable_types()?;
    for (index, value) in entries.iter().enumerate() {
        let entry: CableEntry = decode_entry("cable", index, value)?;
        let (Some(&from), Some(&to)) = (
            locations.get(&entry.from_object_id),
            locations.get(&entry.to_object_id),
        ) else {
            warn!("skipping cable {:?}: unresolved endpoint reference", entry.name);
            report.record(
                EntryKind::Cable,
                Some(entry.id),
                Some(&entry.name),
                EntryOutcome::SkippedUnresolved,
            );
            continue;
        };

        if dedup::existing_id(tx, NamedEntity::Link, &entry.name)?.is_some() {
            report.record(
                EntryKind::Cable,
                Some(entry.id),
                Some(&entry.name),
                EntryOutcome::Deduplicated,
            );
            continue;
        }

        let cable_type = resolve_cable_type(
            &catalog,
            &CableTypeQuery {
                hint: entry.cable_type.as_deref(),
                explicit_id: entry.cable_type_id,
                fiber_count: entry.fiber_count,
            },
        );
        let link = tx.insert_link(&NewLink {
            name: entry.name,
            cable_type,
            fiber_count: entry.fiber_count,
            from_location: from,
            to_location: to,
            distance_km: entry.distance_km,
            description: entry.description,
        })?;
        report.imported.cables += 1;
        report.record(
            EntryKind::Cable,
            Some(entry.id),
            Some(&link.name),
            EntryOutcome::Inserted,
        );
    }
    Ok(())
}

fn remap_links(
    tx: &WriteTxn<'_>,
    entries: &[Value],
    locations: &HashMap<i64, LocationId>,
) -> Result<HashMap<i64, LinkId>, SchemaImportError> {
    let mut links = HashMap::new();
    for (index, value) in entries.iter().enumerate() {
        let entry: CableEntry = decode_entry("cable", index, value)?;
        let (Some(&from), Some(&to)) = (
            locations.get(&entry.from_object_id),
            locations.get(&entry.to_object_id),
        ) else {
            continue;
        };
        if let Some(link_id) = tx.link_id_by_route(&entry.name, from, to)? {
            links.insert(entry.id, link_id);
        }
    }
    Ok(links)
}

fn import_splices(
    tx: &mut WriteTxn<'_>,
    entries: &[Value],
    links: &HashMap<i64, LinkId>,
    report: &mut ImportReport,
) -> Result<(), SchemaImportError> {
    for (index, value) in entries.iter().enumerate() {
        let entry: SpliceEntry = decode_entry("fiber_splice", index, value)?;
        let Some(&link) = links.get(&entry.cable_id) else {
            warn!(
                "skipping splice on cable {}: unresolved owning link",
                entry.cable_id
            );
            report.record(
                EntryKind::Splice,
                Some(entry.cable_id),
                None,
                EntryOutcome::SkippedUnresolved,
            );
            continue;
        };

        let peer_link = match entry.splice_to_cable_id {
            None => None,
            Some(peer) => match links.get(&peer) {
                Some(&resolved) => Some(resolved),
                None => {
                    warn!(
                        "skipping splice on cable {}: unresolved peer link {peer}",
                        entry.cable_id
                    );
                    report.record(
                        EntryKind::Splice,
                        Some(entry.cable_id),
                        None,
                        EntryOutcome::SkippedUnresolved,
                    );
                    continue;
                }
            },
        };

        tx.insert_splice(&NewSplice {
            link,
            fiber_number: entry.fiber_number,
            peer_link,
            peer_fiber: entry.splice_to_fiber,
        })?;
        if let Some(splices) = report.imported.splices.as_mut() {
            *splices += 1;
        }
        report.record(
            EntryKind::Splice,
            Some(entry.cable_id),
            None,
            EntryOutcome::Inserted,
        );
    }
    Ok(())
}
