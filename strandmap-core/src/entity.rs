//! Inventory entity records and their insert payloads.
//!
//! Record types mirror the relational rows held by the store; the `New*`
//! types carry the fields a caller supplies when creating a row. Surrogate
//! keys are store-assigned integers, one alias per entity kind. Identifiers
//! that are local to an import document are never stored in these types;
//! the importers translate them through explicit maps first.

use geo::Coord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::catalog::{CableTypeId, LocationTypeId};

/// Store-assigned surrogate key of a [`Location`].
pub type LocationId = i64;
/// Store-assigned surrogate key of a [`Link`].
pub type LinkId = i64;
/// Store-assigned surrogate key of a [`Splice`].
pub type SpliceId = i64;
/// Store-assigned surrogate key of a [`Region`].
pub type RegionId = i64;

/// A physical network site: node, splice closure, street cabinet,
/// subscriber drop, and so on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// Surrogate key.
    pub id: LocationId,
    /// Unique human-readable name.
    pub name: String,
    /// Reference into the location-type catalog.
    pub location_type: LocationTypeId,
    /// WGS84 latitude in degrees, when surveyed.
    pub latitude: Option<f64>,
    /// WGS84 longitude in degrees, when surveyed.
    pub longitude: Option<f64>,
    /// Free-text postal address.
    pub address: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation timestamp (UTC, store-assigned).
    pub created_at: String,
    /// Last-update timestamp, `None` until the row is first updated.
    pub updated_at: Option<String>,
}

impl Location {
    /// The site position as a coordinate (`x = longitude`, `y = latitude`),
    /// available only when both components were recorded.
    #[must_use]
    pub fn position(&self) -> Option<Coord<f64>> {
        match (self.longitude, self.latitude) {
            (Some(x), Some(y)) => Some(Coord { x, y }),
            _ => None,
        }
    }
}

/// Fields supplied when creating a [`Location`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewLocation {
    /// Unique human-readable name.
    pub name: String,
    /// Reference into the location-type catalog.
    pub location_type: LocationTypeId,
    /// WGS84 latitude in degrees.
    pub latitude: Option<f64>,
    /// WGS84 longitude in degrees.
    pub longitude: Option<f64>,
    /// Free-text postal address.
    pub address: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// A cable connecting exactly two [`Location`]s.
///
/// Self-loops (`from_location == to_location`) are permitted; a loop of slack
/// fiber terminating where it started is a real installation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Link {
    /// Surrogate key.
    pub id: LinkId,
    /// Unique human-readable name.
    pub name: String,
    /// Resolved reference into the cable-type catalog.
    pub cable_type: CableTypeId,
    /// Number of fibers carried, when known.
    pub fiber_count: Option<i64>,
    /// Endpoint the cable starts from.
    pub from_location: LocationId,
    /// Endpoint the cable runs to.
    pub to_location: LocationId,
    /// Route length in kilometres.
    pub distance_km: Option<f64>,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation timestamp (UTC, store-assigned).
    pub created_at: String,
    /// Last-update timestamp, `None` until the row is first updated.
    pub updated_at: Option<String>,
}

/// Fields supplied when inserting a [`Link`] whose cable type is already
/// resolved to a catalog id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewLink {
    /// Unique human-readable name.
    pub name: String,
    /// Resolved reference into the cable-type catalog.
    pub cable_type: CableTypeId,
    /// Number of fibers carried.
    pub fiber_count: Option<i64>,
    /// Endpoint the cable starts from.
    pub from_location: LocationId,
    /// Endpoint the cable runs to.
    pub to_location: LocationId,
    /// Route length in kilometres.
    pub distance_km: Option<f64>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Creation request for a [`Link`] whose cable type is still a loose
/// descriptor: a symbolic hint, an explicit catalog id, a fiber count, or
/// any combination. The store resolves it through
/// [`resolve_cable_type`](crate::catalog::resolve_cable_type).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkRequest {
    /// Unique human-readable name.
    pub name: String,
    /// Symbolic cable-type hint, e.g. `"optical"`.
    pub cable_type: Option<String>,
    /// Explicit catalog id; returned verbatim by the resolver when present.
    pub cable_type_id: Option<CableTypeId>,
    /// Number of fibers carried.
    pub fiber_count: Option<i64>,
    /// Endpoint the cable starts from.
    pub from_location: LocationId,
    /// Endpoint the cable runs to.
    pub to_location: LocationId,
    /// Route length in kilometres.
    pub distance_km: Option<f64>,
    /// Free-text description.
    pub description: Option<String>,
}

/// A fusion joining one fiber of a link to one fiber of another (or the
/// same) link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Splice {
    /// Surrogate key.
    pub id: SpliceId,
    /// Owning link.
    pub link: LinkId,
    /// Fiber index on the owning link.
    pub fiber_number: i64,
    /// Peer link, always a store id. `None` models an unterminated fiber end.
    pub peer_link: Option<LinkId>,
    /// Fiber index on the peer link.
    pub peer_fiber: i64,
    /// Creation timestamp (UTC, store-assigned).
    pub created_at: String,
    /// Last-update timestamp, `None` until the row is first updated.
    pub updated_at: Option<String>,
}

/// Fields supplied when creating a [`Splice`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewSplice {
    /// Owning link.
    pub link: LinkId,
    /// Fiber index on the owning link.
    pub fiber_number: i64,
    /// Peer link, already resolved to a store id.
    pub peer_link: Option<LinkId>,
    /// Fiber index on the peer link.
    pub peer_fiber: i64,
}

/// A named geographic grouping of locations and links.
///
/// `updated_at` advances whenever the region's membership changes, not only
/// when the region row itself is edited.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    /// Surrogate key.
    pub id: RegionId,
    /// Unique name, matched against location addresses during derivation.
    pub name: String,
    /// Centroid latitude in degrees.
    pub latitude: f64,
    /// Centroid longitude in degrees.
    pub longitude: f64,
    /// Presentation name.
    pub display_name: Option<String>,
    /// Country, when geocoded upstream.
    pub country: Option<String>,
    /// State or province, when geocoded upstream.
    pub state: Option<String>,
    /// Identifier in an external gazetteer, unique when present.
    pub external_ref: Option<i64>,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation timestamp (UTC, store-assigned).
    pub created_at: String,
    /// Advances on every membership change.
    pub updated_at: Option<String>,
}

/// Fields supplied when creating a [`Region`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewRegion {
    /// Unique name.
    pub name: String,
    /// Centroid latitude in degrees.
    pub latitude: f64,
    /// Centroid longitude in degrees.
    pub longitude: f64,
    /// Presentation name.
    pub display_name: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Identifier in an external gazetteer.
    pub external_ref: Option<i64>,
    /// Free-text description.
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bare_location() -> Location {
        Location {
            id: 1,
            name: "HUB-01".into(),
            location_type: 1,
            latitude: None,
            longitude: None,
            address: None,
            description: None,
            created_at: "2026-01-01 00:00:00".into(),
            updated_at: None,
        }
    }

    #[rstest]
    fn position_requires_both_components() {
        let mut location = bare_location();
        assert_eq!(location.position(), None);

        location.latitude = Some(51.5);
        assert_eq!(location.position(), None);

        location.longitude = Some(-0.1);
        assert_eq!(location.position(), Some(Coord { x: -0.1, y: 51.5 }));
    }
}
