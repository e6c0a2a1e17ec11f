//! GeoJSON feature-collection importer.
//!
//! Point features tagged `network_object` become locations; LineString
//! features tagged `cable` become links whose endpoints are resolved by
//! matching the line's first and last vertex against stored coordinates.
//! Matching is exact floating-point equality with no tolerance: a document
//! whose coordinates were rounded or reformatted upstream will fail to
//! resolve an endpoint, and the feature is dropped with nothing but a
//! `skipped-unresolved` record to show for it.

use geo::Coord;
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use strandmap_core::catalog::{CableTypeQuery, DEFAULT_LOCATION_TYPE, FALLBACK_LOCATION_TYPE_ID, resolve_cable_type};
use strandmap_core::entity::{NewLink, NewLocation};
use strandmap_core::{Inventory, StoreError, WriteTxn};

use super::dedup::{self, NamedEntity};
use super::{EntryKind, EntryOutcome, ImportReport};

/// Feature tag marking a Point feature as a location.
const FEATURE_OBJECT: &str = "network_object";
/// Feature tag marking a LineString feature as a link.
const FEATURE_CABLE: &str = "cable";

/// Errors returned by [`import_geojson`].
#[derive(Debug, Error)]
pub enum GeoImportError {
    /// The document is not valid JSON or has the wrong top-level shape.
    /// Nothing has been committed.
    #[error("malformed GeoJSON document")]
    Malformed {
        /// Decoding failure reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// The root object is not a FeatureCollection.
    #[error("unexpected GeoJSON root type {found:?} (expected \"FeatureCollection\")")]
    UnexpectedRoot {
        /// Value of the root `type` member.
        found: String,
    },
    /// One feature could not be decoded. The pass it belongs to has been
    /// rolled back; a pass committed earlier stands.
    #[error("invalid feature at index {index}: {source}")]
    Feature {
        /// Zero-based index within the `features` array.
        index: usize,
        /// Decoding failure naming the offending member.
        #[source]
        source: serde_json::Error,
    },
    /// The store failed mid-pass; that pass has been rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Value,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point {
        coordinates: Vec<f64>,
    },
    LineString {
        coordinates: Vec<Vec<f64>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct PointProperties {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineProperties {
    name: String,
    cable_type: Option<String>,
    fiber_count: Option<i64>,
    distance_km: Option<f64>,
}

/// Import a GeoJSON feature collection.
///
/// Two passes, each one committed transaction: points first, then lines.
/// Line endpoints may therefore match locations created by the first pass
/// as well as locations that were already in the store.
pub fn import_geojson(
    store: &mut Inventory,
    document: &str,
) -> Result<ImportReport, GeoImportError> {
    let collection: FeatureCollection =
        serde_json::from_str(document).map_err(|source| GeoImportError::Malformed { source })?;
    if collection.kind != "FeatureCollection" {
        return Err(GeoImportError::UnexpectedRoot {
            found: collection.kind,
        });
    }

    let mut report = ImportReport::new(false);

    store.write_phase("import-geo-points", |tx| {
        import_points(tx, &collection.features, &mut report)
    })?;
    store.write_phase("import-geo-lines", |tx| {
        import_lines(tx, &collection.features, &mut report)
    })?;

    Ok(report)
}

fn feature_type(value: &Value) -> Option<&str> {
    value
        .get("properties")
        .and_then(|properties| properties.get("feature_type"))
        .and_then(Value::as_str)
}

fn decode_feature<'de, T: Deserialize<'de>>(
    index: usize,
    value: &'de Value,
) -> Result<T, GeoImportError> {
    T::deserialize(value).map_err(|source| GeoImportError::Feature { index, source })
}

fn point_coordinate(coordinates: &[f64]) -> Option<Coord<f64>> {
    match (coordinates.first(), coordinates.get(1)) {
        (Some(&x), Some(&y)) => Some(Coord { x, y }),
        _ => None,
    }
}

fn import_points(
    tx: &mut WriteTxn<'_>,
    features: &[Value],
    report: &mut ImportReport,
) -> Result<(), GeoImportError> {
    for (index, value) in features.iter().enumerate() {
        if feature_type(value) != Some(FEATURE_OBJECT) {
            continue;
        }
        let feature: Feature = decode_feature(index, value)?;
        let properties: PointProperties = decode_feature(index, &feature.properties)?;

        let Some(Geometry::Point { coordinates }) = feature.geometry else {
            warn!("rejecting feature {index}: {FEATURE_OBJECT} without Point geometry");
            report.record(
                EntryKind::Object,
                Some(properties.id),
                Some(&properties.name),
                EntryOutcome::Rejected,
            );
            continue;
        };
        let Some(position) = point_coordinate(&coordinates) else {
            warn!("rejecting feature {index}: Point with fewer than two ordinates");
            report.record(
                EntryKind::Object,
                Some(properties.id),
                Some(&properties.name),
                EntryOutcome::Rejected,
            );
            continue;
        };

        if dedup::existing_id(tx, NamedEntity::Location, &properties.name)?.is_some() {
            report.record(
                EntryKind::Object,
                Some(properties.id),
                Some(&properties.name),
                EntryOutcome::Deduplicated,
            );
            continue;
        }

        let type_name = properties.location_type.as_deref().unwrap_or(DEFAULT_LOCATION_TYPE);
        let location_type =
            tx.location_type_id(type_name)?.unwrap_or(FALLBACK_LOCATION_TYPE_ID);
        let location = tx.insert_location(&NewLocation {
            name: properties.name,
            location_type,
            latitude: Some(position.y),
            longitude: Some(position.x),
            address: None,
            description: None,
        })?;
        report.imported.objects += 1;
        report.record(
            EntryKind::Object,
            Some(properties.id),
            Some(&location.name),
            EntryOutcome::Inserted,
        );
    }
    Ok(())
}

fn import_lines(
    tx: &mut WriteTxn<'_>,
    features: &[Value],
    report: &mut ImportReport,
) -> Result<(), GeoImportError> {
    let catalog = tx.cable_types()?;
    for (index, value) in features.iter().enumerate() {
        if feature_type(value) != Some(FEATURE_CABLE) {
            continue;
        }
        let feature: Feature = decode_feature(index, value)?;
        let properties: LineProperties = decode_feature(index, &feature.properties)?;

        let vertices = match feature.geometry {
            Some(Geometry::LineString { coordinates }) if coordinates.len() >= 2 => coordinates,
            _ => {
                warn!("rejecting feature {index}: {FEATURE_CABLE} without a two-point LineString");
                report.record(
                    EntryKind::Cable,
                    None,
                    Some(&properties.name),
                    EntryOutcome::Rejected,
                );
                continue;
            }
        };
        let endpoints = match (
            vertices.first().and_then(|v| point_coordinate(v)),
            vertices.last().and_then(|v| point_coordinate(v)),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                warn!("rejecting feature {index}: LineString vertex with fewer than two ordinates");
                report.record(
                    EntryKind::Cable,
                    None,
                    Some(&properties.name),
                    EntryOutcome::Rejected,
                );
                continue;
            }
        };

        let from = tx.location_id_at(endpoints.0.x, endpoints.0.y)?;
        let to = tx.location_id_at(endpoints.1.x, endpoints.1.y)?;
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) if from != to => (from, to),
            _ => {
                warn!(
                    "skipping cable {:?}: endpoints did not resolve to two distinct locations",
                    properties.name
                );
                report.record(
                    EntryKind::Cable,
                    None,
                    Some(&properties.name),
                    EntryOutcome::SkippedUnresolved,
                );
                continue;
            }
        };

        if dedup::existing_id(tx, NamedEntity::Link, &properties.name)?.is_some() {
            report.record(
                EntryKind::Cable,
                None,
                Some(&properties.name),
                EntryOutcome::Deduplicated,
            );
            continue;
        }

        // Fiber-count disambiguation is unavailable in this path; the
        // symbolic hint alone drives resolution.
        let cable_type = resolve_cable_type(
            &catalog,
            &CableTypeQuery {
                hint: properties.cable_type.as_deref(),
                explicit_id: None,
                fiber_count: None,
            },
        );
        let link = tx.insert_link(&NewLink {
            name: properties.name,
            cable_type,
            fiber_count: properties.fiber_count,
            from_location: from,
            to_location: to,
            distance_km: properties.distance_km,
            description: None,
        })?;
        report.imported.cables += 1;
        report.record(
            EntryKind::Cable,
            None,
            Some(&link.name),
            EntryOutcome::Inserted,
        );
    }
    Ok(())
}
