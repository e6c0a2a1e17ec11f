//! SQLite-backed inventory store.

use std::fmt;
use std::path::Path;

use log::debug;
use rusqlite::{Connection, Transaction, params};

use super::{SchemaError, StoreError, membership, queries, schema};
use crate::catalog::{CableType, CableTypeQuery, LocationType, LocationTypeId, resolve_cable_type};
use crate::derive::{self, CreationObserver, RegionAutoAttach};
use crate::entity::{
    Link, LinkId, LinkRequest, Location, LocationId, NewLink, NewLocation, NewRegion, NewSplice,
    Region, RegionId, Splice, SpliceId,
};

/// SQLite-backed inventory of locations, links, splices, and regions.
///
/// Direct creation operations enforce the strict conflict policy (a name
/// collision is an error); the importers in `strandmap-data` run the lenient
/// merge policy on top of [`Inventory::write_phase`]. Post-insert observers
/// derive region membership after every durable location or link creation,
/// whichever path produced it.
pub struct Inventory {
    connection: Connection,
    observers: Vec<Box<dyn CreationObserver>>,
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Inventory {
    /// Open an inventory database on disk, enabling foreign keys.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(connection)
    }

    /// Open a throwaway in-memory inventory.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(StoreError::from_sqlite)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(StoreError::from_sqlite)?;
        Ok(Self {
            connection,
            observers: vec![Box::new(RegionAutoAttach)],
        })
    }

    /// Create the schema if missing and verify its version.
    pub fn initialise(&mut self) -> Result<(), SchemaError> {
        schema::initialise_schema(&mut self.connection)
    }

    /// Seed the cable-type and location-type catalogs (idempotent).
    pub fn seed_reference_data(&mut self) -> Result<(), SchemaError> {
        schema::seed_reference_data(&mut self.connection)
    }

    /// Append a post-insert observer to the derivation list.
    pub fn add_observer(&mut self, observer: Box<dyn CreationObserver>) {
        self.observers.push(observer);
    }

    /// Run one write phase: a single transaction that commits when the
    /// closure succeeds and rolls back when it fails.
    ///
    /// Importers map one import phase onto one call, so a mid-phase failure
    /// discards only that phase while earlier committed phases stand.
    pub fn write_phase<T, E, F>(&mut self, label: &'static str, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
    {
        let Self {
            connection,
            observers,
        } = self;
        let tx = connection
            .transaction()
            .map_err(|source| E::from(StoreError::from_sqlite(source)))?;
        let mut phase = WriteTxn {
            tx,
            observers: observers.as_slice(),
        };
        match f(&mut phase) {
            Ok(value) => {
                phase
                    .tx
                    .commit()
                    .map_err(|source| E::from(StoreError::from_sqlite(source)))?;
                debug!("committed {label} phase");
                Ok(value)
            }
            Err(error) => {
                debug!("rolled back {label} phase");
                Err(error)
            }
        }
    }

    // ------------------------------------------------------------------
    // Locations

    /// Create a location, rejecting duplicate names.
    pub fn create_location(&mut self, new: &NewLocation) -> Result<Location, StoreError> {
        self.write_phase("create-location", |tx| {
            if tx.location_id_by_name(&new.name)?.is_some() {
                return Err(StoreError::NameConflict {
                    kind: "location",
                    name: new.name.clone(),
                });
            }
            tx.insert_location(new)
        })
    }

    /// Fetch a location by id.
    pub fn location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        queries::location(&self.connection, id)
    }

    /// List all locations in id order.
    pub fn locations(&self) -> Result<Vec<Location>, StoreError> {
        queries::list_locations(&self.connection)
    }

    /// Update a location in place and re-run membership derivation.
    pub fn update_location(
        &mut self,
        id: LocationId,
        new: &NewLocation,
    ) -> Result<Location, StoreError> {
        self.write_phase("update-location", |tx| {
            tx.require_location(id)?;
            tx.tx
                .execute(
                    "UPDATE locations
                     SET name = ?1, location_type_id = ?2, latitude = ?3, longitude = ?4,
                         address = ?5, description = ?6, updated_at = CURRENT_TIMESTAMP
                     WHERE location_id = ?7",
                    params![
                        new.name,
                        new.location_type,
                        new.latitude,
                        new.longitude,
                        new.address,
                        new.description,
                        id
                    ],
                )
                .map_err(StoreError::from_sqlite)?;
            let location = queries::location(&tx.tx, id)?
                .ok_or(StoreError::NotFound { kind: "location", id })?;
            derive::notify_location_created(tx.observers, &tx.tx, &location);
            Ok(location)
        })
    }

    /// Delete a location. Fails while links still reference it; membership
    /// rows cascade.
    pub fn delete_location(&mut self, id: LocationId) -> Result<(), StoreError> {
        self.write_phase("delete-location", |tx| {
            tx.require_location(id)?;
            let links = queries::link_count_referencing(&tx.tx, id)?;
            if links > 0 {
                return Err(StoreError::ReferencedByLinks { location: id, links });
            }
            tx.tx
                .execute("DELETE FROM locations WHERE location_id = ?1", params![id])
                .map(|_| ())
                .map_err(StoreError::from_sqlite)
        })
    }

    // ------------------------------------------------------------------
    // Links

    /// Create a link, resolving its cable type from the request's loose
    /// descriptor and rejecting duplicate names.
    pub fn create_link(&mut self, request: &LinkRequest) -> Result<Link, StoreError> {
        self.write_phase("create-link", |tx| {
            if tx.link_id_by_name(&request.name)?.is_some() {
                return Err(StoreError::NameConflict {
                    kind: "link",
                    name: request.name.clone(),
                });
            }
            tx.require_location(request.from_location)?;
            tx.require_location(request.to_location)?;
            let new = resolve_link_request(tx, request)?;
            tx.insert_link(&new)
        })
    }

    /// Fetch a link by id.
    pub fn link(&self, id: LinkId) -> Result<Option<Link>, StoreError> {
        queries::link(&self.connection, id)
    }

    /// List all links in id order.
    pub fn links(&self) -> Result<Vec<Link>, StoreError> {
        queries::list_links(&self.connection)
    }

    /// Update a link in place, re-resolving its cable type and re-running
    /// membership derivation.
    pub fn update_link(&mut self, id: LinkId, request: &LinkRequest) -> Result<Link, StoreError> {
        self.write_phase("update-link", |tx| {
            tx.require_link(id)?;
            tx.require_location(request.from_location)?;
            tx.require_location(request.to_location)?;
            let new = resolve_link_request(tx, request)?;
            tx.tx
                .execute(
                    "UPDATE links
                     SET name = ?1, cable_type_id = ?2, fiber_count = ?3,
                         from_location_id = ?4, to_location_id = ?5, distance_km = ?6,
                         description = ?7, updated_at = CURRENT_TIMESTAMP
                     WHERE link_id = ?8",
                    params![
                        new.name,
                        new.cable_type,
                        new.fiber_count,
                        new.from_location,
                        new.to_location,
                        new.distance_km,
                        new.description,
                        id
                    ],
                )
                .map_err(StoreError::from_sqlite)?;
            let link =
                queries::link(&tx.tx, id)?.ok_or(StoreError::NotFound { kind: "link", id })?;
            derive::notify_link_created(tx.observers, &tx.tx, &link);
            Ok(link)
        })
    }

    /// Delete a link. Owned splices cascade, peer references null out, and
    /// membership rows cascade.
    pub fn delete_link(&mut self, id: LinkId) -> Result<(), StoreError> {
        self.write_phase("delete-link", |tx| {
            tx.require_link(id)?;
            tx.tx
                .execute("DELETE FROM links WHERE link_id = ?1", params![id])
                .map(|_| ())
                .map_err(StoreError::from_sqlite)
        })
    }

    // ------------------------------------------------------------------
    // Splices

    /// Create a splice. The owning link must exist; so must the peer link
    /// when one is given.
    pub fn create_splice(&mut self, new: &NewSplice) -> Result<Splice, StoreError> {
        self.write_phase("create-splice", |tx| {
            tx.require_link(new.link)?;
            if let Some(peer) = new.peer_link {
                tx.require_link(peer)?;
            }
            tx.insert_splice(new)
        })
    }

    /// Fetch a splice by id.
    pub fn splice(&self, id: SpliceId) -> Result<Option<Splice>, StoreError> {
        queries::splice(&self.connection, id)
    }

    /// List splices, optionally restricted to one owning link.
    pub fn splices(&self, link: Option<LinkId>) -> Result<Vec<Splice>, StoreError> {
        queries::list_splices(&self.connection, link)
    }

    /// Update a splice in place.
    pub fn update_splice(&mut self, id: SpliceId, new: &NewSplice) -> Result<Splice, StoreError> {
        self.write_phase("update-splice", |tx| {
            tx.require_splice(id)?;
            tx.require_link(new.link)?;
            if let Some(peer) = new.peer_link {
                tx.require_link(peer)?;
            }
            tx.tx
                .execute(
                    "UPDATE splices
                     SET link_id = ?1, fiber_number = ?2, peer_link_id = ?3, peer_fiber = ?4,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE splice_id = ?5",
                    params![new.link, new.fiber_number, new.peer_link, new.peer_fiber, id],
                )
                .map_err(StoreError::from_sqlite)?;
            queries::splice(&tx.tx, id)?.ok_or(StoreError::NotFound { kind: "splice", id })
        })
    }

    /// Delete a splice.
    pub fn delete_splice(&mut self, id: SpliceId) -> Result<(), StoreError> {
        self.write_phase("delete-splice", |tx| {
            tx.require_splice(id)?;
            tx.tx
                .execute("DELETE FROM splices WHERE splice_id = ?1", params![id])
                .map(|_| ())
                .map_err(StoreError::from_sqlite)
        })
    }

    // ------------------------------------------------------------------
    // Regions and membership

    /// Create a region, or return the existing region of the same name.
    ///
    /// Regions are lenient on purpose: importing tools re-submit the same
    /// region freely and expect to converge on one row.
    pub fn create_region(&mut self, new: &NewRegion) -> Result<Region, StoreError> {
        self.write_phase("create-region", |tx| {
            if let Some(id) = queries::region_id_by_name(&tx.tx, &new.name)? {
                return queries::region(&tx.tx, id)?
                    .ok_or(StoreError::NotFound { kind: "region", id });
            }
            tx.insert_region(new)
        })
    }

    /// Fetch a region by id.
    pub fn region(&self, id: RegionId) -> Result<Option<Region>, StoreError> {
        queries::region(&self.connection, id)
    }

    /// List all regions in id order.
    pub fn regions(&self) -> Result<Vec<Region>, StoreError> {
        queries::list_regions(&self.connection)
    }

    /// Update a region's own fields (membership is managed separately).
    pub fn update_region(&mut self, id: RegionId, new: &NewRegion) -> Result<Region, StoreError> {
        self.write_phase("update-region", |tx| {
            tx.require_region(id)?;
            tx.tx
                .execute(
                    "UPDATE regions
                     SET name = ?1, latitude = ?2, longitude = ?3, display_name = ?4,
                         country = ?5, state = ?6, external_ref = ?7, description = ?8,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE region_id = ?9",
                    params![
                        new.name,
                        new.latitude,
                        new.longitude,
                        new.display_name,
                        new.country,
                        new.state,
                        new.external_ref,
                        new.description,
                        id
                    ],
                )
                .map_err(StoreError::from_sqlite)?;
            queries::region(&tx.tx, id)?.ok_or(StoreError::NotFound { kind: "region", id })
        })
    }

    /// Delete a region; its membership rows cascade.
    pub fn delete_region(&mut self, id: RegionId) -> Result<(), StoreError> {
        self.write_phase("delete-region", |tx| {
            tx.require_region(id)?;
            tx.tx
                .execute("DELETE FROM regions WHERE region_id = ?1", params![id])
                .map(|_| ())
                .map_err(StoreError::from_sqlite)
        })
    }

    /// Locations belonging to a region, in id order.
    pub fn region_locations(&self, id: RegionId) -> Result<Vec<Location>, StoreError> {
        queries::region_locations(&self.connection, id)
    }

    /// Links belonging to a region, in id order.
    pub fn region_links(&self, id: RegionId) -> Result<Vec<Link>, StoreError> {
        queries::region_links(&self.connection, id)
    }

    /// Attach a location to a region. Returns whether membership changed.
    pub fn attach_location_to_region(
        &mut self,
        region: RegionId,
        location: LocationId,
    ) -> Result<bool, StoreError> {
        self.write_phase("attach-location", |tx| {
            tx.require_region(region)?;
            tx.require_location(location)?;
            membership::attach_location(&tx.tx, region, location).map_err(StoreError::from_sqlite)
        })
    }

    /// Detach a location from a region. Returns whether membership changed.
    pub fn detach_location_from_region(
        &mut self,
        region: RegionId,
        location: LocationId,
    ) -> Result<bool, StoreError> {
        self.write_phase("detach-location", |tx| {
            tx.require_region(region)?;
            tx.require_location(location)?;
            membership::detach_location(&tx.tx, region, location).map_err(StoreError::from_sqlite)
        })
    }

    /// Attach a link to a region, enforcing the containment invariant: both
    /// endpoints must already be members.
    pub fn attach_link_to_region(
        &mut self,
        region: RegionId,
        link: LinkId,
    ) -> Result<bool, StoreError> {
        self.write_phase("attach-link", |tx| {
            tx.require_region(region)?;
            let record =
                queries::link(&tx.tx, link)?.ok_or(StoreError::NotFound { kind: "link", id: link })?;
            let contained = membership::endpoints_in_region(
                &tx.tx,
                region,
                record.from_location,
                record.to_location,
            )
            .map_err(StoreError::from_sqlite)?;
            if !contained {
                return Err(StoreError::EndpointsOutsideRegion { region, link });
            }
            membership::attach_link(&tx.tx, region, link).map_err(StoreError::from_sqlite)
        })
    }

    /// Detach a link from a region. Returns whether membership changed.
    pub fn detach_link_from_region(
        &mut self,
        region: RegionId,
        link: LinkId,
    ) -> Result<bool, StoreError> {
        self.write_phase("detach-link", |tx| {
            tx.require_region(region)?;
            tx.require_link(link)?;
            membership::detach_link(&tx.tx, region, link).map_err(StoreError::from_sqlite)
        })
    }

    /// Re-run membership derivation for one location, surfacing failures.
    pub fn refresh_location_regions(&mut self, id: LocationId) -> Result<(), StoreError> {
        self.write_phase("refresh-location-regions", |tx| {
            let location = queries::location(&tx.tx, id)?
                .ok_or(StoreError::NotFound { kind: "location", id })?;
            for observer in tx.observers {
                observer
                    .location_created(&tx.tx, &location)
                    .map_err(StoreError::from)?;
            }
            Ok(())
        })
    }

    /// Re-run membership derivation for one link, surfacing failures.
    pub fn refresh_link_regions(&mut self, id: LinkId) -> Result<(), StoreError> {
        self.write_phase("refresh-link-regions", |tx| {
            let link =
                queries::link(&tx.tx, id)?.ok_or(StoreError::NotFound { kind: "link", id })?;
            for observer in tx.observers {
                observer.link_created(&tx.tx, &link).map_err(StoreError::from)?;
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Reference catalogs

    /// The cable-type catalog in id order.
    pub fn cable_types(&self) -> Result<Vec<CableType>, StoreError> {
        queries::cable_types(&self.connection)
    }

    /// The location-type catalog in id order.
    pub fn location_types(&self) -> Result<Vec<LocationType>, StoreError> {
        queries::location_types(&self.connection)
    }
}

/// One open write phase: a transaction plus the observer list notified
/// after each durable insert.
pub struct WriteTxn<'a> {
    tx: Transaction<'a>,
    observers: &'a [Box<dyn CreationObserver>],
}

impl WriteTxn<'_> {
    /// Insert a location row and notify the observers.
    pub fn insert_location(&mut self, new: &NewLocation) -> Result<Location, StoreError> {
        self.tx
            .execute(
                "INSERT INTO locations
                    (name, location_type_id, latitude, longitude, address, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.name,
                    new.location_type,
                    new.latitude,
                    new.longitude,
                    new.address,
                    new.description
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        let id = self.tx.last_insert_rowid();
        let location =
            queries::location(&self.tx, id)?.ok_or(StoreError::NotFound { kind: "location", id })?;
        derive::notify_location_created(self.observers, &self.tx, &location);
        Ok(location)
    }

    /// Insert a link row (cable type already resolved) and notify the
    /// observers.
    pub fn insert_link(&mut self, new: &NewLink) -> Result<Link, StoreError> {
        self.tx
            .execute(
                "INSERT INTO links
                    (name, cable_type_id, fiber_count, from_location_id, to_location_id,
                     distance_km, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.name,
                    new.cable_type,
                    new.fiber_count,
                    new.from_location,
                    new.to_location,
                    new.distance_km,
                    new.description
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        let id = self.tx.last_insert_rowid();
        let link =
            queries::link(&self.tx, id)?.ok_or(StoreError::NotFound { kind: "link", id })?;
        derive::notify_link_created(self.observers, &self.tx, &link);
        Ok(link)
    }

    /// Insert a splice row. Peer ids must already be store ids.
    pub fn insert_splice(&mut self, new: &NewSplice) -> Result<Splice, StoreError> {
        self.tx
            .execute(
                "INSERT INTO splices (link_id, fiber_number, peer_link_id, peer_fiber)
                 VALUES (?1, ?2, ?3, ?4)",
                params![new.link, new.fiber_number, new.peer_link, new.peer_fiber],
            )
            .map_err(StoreError::from_sqlite)?;
        let id = self.tx.last_insert_rowid();
        queries::splice(&self.tx, id)?.ok_or(StoreError::NotFound { kind: "splice", id })
    }

    /// Insert a region row.
    pub fn insert_region(&mut self, new: &NewRegion) -> Result<Region, StoreError> {
        self.tx
            .execute(
                "INSERT INTO regions
                    (name, latitude, longitude, display_name, country, state, external_ref,
                     description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new.name,
                    new.latitude,
                    new.longitude,
                    new.display_name,
                    new.country,
                    new.state,
                    new.external_ref,
                    new.description
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        let id = self.tx.last_insert_rowid();
        queries::region(&self.tx, id)?.ok_or(StoreError::NotFound { kind: "region", id })
    }

    /// Exact-name lookup for a location.
    pub fn location_id_by_name(&self, name: &str) -> Result<Option<LocationId>, StoreError> {
        queries::location_id_by_name(&self.tx, name)
    }

    /// Exact-name lookup for a link.
    pub fn link_id_by_name(&self, name: &str) -> Result<Option<LinkId>, StoreError> {
        queries::link_id_by_name(&self.tx, name)
    }

    /// Lookup of a link by its `(name, from, to)` route triple.
    pub fn link_id_by_route(
        &self,
        name: &str,
        from: LocationId,
        to: LocationId,
    ) -> Result<Option<LinkId>, StoreError> {
        queries::link_id_by_route(&self.tx, name, from, to)
    }

    /// Exact-coordinate lookup for a location (no tolerance).
    pub fn location_id_at(
        &self,
        longitude: f64,
        latitude: f64,
    ) -> Result<Option<LocationId>, StoreError> {
        queries::location_id_at(&self.tx, longitude, latitude)
    }

    /// Symbolic-name lookup in the location-type catalog.
    pub fn location_type_id(&self, name: &str) -> Result<Option<LocationTypeId>, StoreError> {
        queries::location_type_id(&self.tx, name)
    }

    /// The cable-type catalog in id order.
    pub fn cable_types(&self) -> Result<Vec<CableType>, StoreError> {
        queries::cable_types(&self.tx)
    }

    fn require_location(&self, id: LocationId) -> Result<(), StoreError> {
        queries::location(&self.tx, id)?
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "location", id })
    }

    fn require_link(&self, id: LinkId) -> Result<(), StoreError> {
        queries::link(&self.tx, id)?
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "link", id })
    }

    fn require_splice(&self, id: SpliceId) -> Result<(), StoreError> {
        queries::splice(&self.tx, id)?
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "splice", id })
    }

    fn require_region(&self, id: RegionId) -> Result<(), StoreError> {
        queries::region(&self.tx, id)?
            .map(|_| ())
            .ok_or(StoreError::NotFound { kind: "region", id })
    }
}

fn resolve_link_request(
    tx: &WriteTxn<'_>,
    request: &LinkRequest,
) -> Result<NewLink, StoreError> {
    let catalog = tx.cable_types()?;
    let cable_type = resolve_cable_type(
        &catalog,
        &CableTypeQuery {
            hint: request.cable_type.as_deref(),
            explicit_id: request.cable_type_id,
            fiber_count: request.fiber_count,
        },
    );
    Ok(NewLink {
        name: request.name.clone(),
        cable_type,
        fiber_count: request.fiber_count,
        from_location: request.from_location,
        to_location: request.to_location,
        distance_km: request.distance_km,
        description: request.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn inventory() -> Inventory {
        let mut inventory = Inventory::open_in_memory().expect("open in-memory store");
        inventory.initialise().expect("initialise schema");
        inventory.seed_reference_data().expect("seed reference data");
        inventory
    }

    fn new_location(name: &str) -> NewLocation {
        NewLocation {
            name: name.into(),
            location_type: 1,
            latitude: None,
            longitude: None,
            address: None,
            description: None,
        }
    }

    fn new_region(name: &str) -> NewRegion {
        NewRegion {
            name: name.into(),
            latitude: 50.45,
            longitude: 30.52,
            display_name: None,
            country: None,
            state: None,
            external_ref: None,
            description: None,
        }
    }

    fn link_request(name: &str, from: LocationId, to: LocationId) -> LinkRequest {
        LinkRequest {
            name: name.into(),
            cable_type: Some("optical".into()),
            from_location: from,
            to_location: to,
            ..LinkRequest::default()
        }
    }

    #[rstest]
    fn create_location_assigns_id_and_created_at(mut inventory: Inventory) {
        let location = inventory
            .create_location(&new_location("HUB-01"))
            .expect("create location");

        assert!(location.id > 0);
        assert!(!location.created_at.is_empty());
        assert_eq!(location.updated_at, None);
    }

    #[rstest]
    fn create_location_rejects_duplicate_name(mut inventory: Inventory) {
        inventory
            .create_location(&new_location("HUB-01"))
            .expect("first create");

        let error = inventory
            .create_location(&new_location("HUB-01"))
            .expect_err("duplicate should fail");
        assert!(matches!(
            error,
            StoreError::NameConflict { kind: "location", .. }
        ));
    }

    #[rstest]
    fn store_enforces_name_uniqueness_when_guard_is_bypassed(mut inventory: Inventory) {
        // Two racing imports can both pass the dedup check before either
        // commits; the UNIQUE constraint is the backstop that keeps the
        // second insert from landing.
        let error = inventory
            .write_phase("race", |tx| -> Result<(), StoreError> {
                tx.insert_location(&new_location("HUB-01"))?;
                tx.insert_location(&new_location("HUB-01"))?;
                Ok(())
            })
            .expect_err("second insert should hit the constraint");

        assert!(matches!(error, StoreError::Constraint { .. }));
        assert_eq!(inventory.locations().expect("list").len(), 0, "phase rolled back");
    }

    #[rstest]
    fn create_link_resolves_cable_type_from_hint(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");

        let mut request = link_request("A-B", a.id, b.id);
        request.fiber_count = Some(12);
        let link = inventory.create_link(&request).expect("create link");

        // Seeded OS-12 row.
        assert_eq!(link.cable_type, 7);
        assert_eq!(link.fiber_count, Some(12));
    }

    #[rstest]
    fn create_link_requires_existing_endpoints(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");

        let error = inventory
            .create_link(&link_request("A-void", a.id, 999))
            .expect_err("missing endpoint should fail");
        assert!(matches!(error, StoreError::NotFound { kind: "location", id: 999 }));
    }

    #[rstest]
    fn create_link_allows_self_loop(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");

        let link = inventory
            .create_link(&link_request("loop", a.id, a.id))
            .expect("self-loop link");
        assert_eq!(link.from_location, link.to_location);
    }

    #[rstest]
    fn create_link_rejects_duplicate_name(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");
        inventory
            .create_link(&link_request("A-B", a.id, b.id))
            .expect("first create");

        let error = inventory
            .create_link(&link_request("A-B", b.id, a.id))
            .expect_err("duplicate name should fail");
        assert!(matches!(error, StoreError::NameConflict { kind: "link", .. }));
    }

    #[rstest]
    fn create_splice_requires_owning_link(mut inventory: Inventory) {
        let error = inventory
            .create_splice(&NewSplice {
                link: 42,
                fiber_number: 1,
                peer_link: None,
                peer_fiber: 1,
            })
            .expect_err("missing owner should fail");
        assert!(matches!(error, StoreError::NotFound { kind: "link", id: 42 }));
    }

    #[rstest]
    fn create_splice_accepts_missing_peer(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let link = inventory
            .create_link(&link_request("loop", a.id, a.id))
            .expect("link");

        let splice = inventory
            .create_splice(&NewSplice {
                link: link.id,
                fiber_number: 3,
                peer_link: None,
                peer_fiber: 0,
            })
            .expect("unterminated splice");
        assert_eq!(splice.peer_link, None);
    }

    #[rstest]
    fn create_region_returns_existing_row_for_duplicate_name(mut inventory: Inventory) {
        let first = inventory.create_region(&new_region("Central")).expect("first");
        let second = inventory.create_region(&new_region("Central")).expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(inventory.regions().expect("list").len(), 1);
    }

    #[rstest]
    fn attach_location_advances_region_updated_at(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let location = inventory.create_location(&new_location("HUB-01")).expect("location");
        assert_eq!(region.updated_at, None);

        let changed = inventory
            .attach_location_to_region(region.id, location.id)
            .expect("attach");

        assert!(changed);
        let region = inventory.region(region.id).expect("get").expect("exists");
        assert!(region.updated_at.is_some());
    }

    #[rstest]
    fn attach_location_twice_is_a_noop(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let location = inventory.create_location(&new_location("HUB-01")).expect("location");

        assert!(inventory.attach_location_to_region(region.id, location.id).expect("first"));
        assert!(!inventory.attach_location_to_region(region.id, location.id).expect("second"));
        assert_eq!(inventory.region_locations(region.id).expect("members").len(), 1);
    }

    #[rstest]
    fn attach_link_enforces_containment(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");
        let link = inventory.create_link(&link_request("A-B", a.id, b.id)).expect("link");

        inventory.attach_location_to_region(region.id, a.id).expect("attach a");
        let error = inventory
            .attach_link_to_region(region.id, link.id)
            .expect_err("one endpoint outside should fail");
        assert!(matches!(error, StoreError::EndpointsOutsideRegion { .. }));

        inventory.attach_location_to_region(region.id, b.id).expect("attach b");
        assert!(inventory.attach_link_to_region(region.id, link.id).expect("attach link"));
    }

    #[rstest]
    fn detach_reports_whether_membership_changed(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let location = inventory.create_location(&new_location("HUB-01")).expect("location");
        inventory.attach_location_to_region(region.id, location.id).expect("attach");

        assert!(inventory.detach_location_from_region(region.id, location.id).expect("first"));
        assert!(!inventory.detach_location_from_region(region.id, location.id).expect("second"));
    }

    #[rstest]
    fn delete_region_cascades_membership_rows(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let location = inventory.create_location(&new_location("HUB-01")).expect("location");
        inventory.attach_location_to_region(region.id, location.id).expect("attach");

        inventory.delete_region(region.id).expect("delete region");

        assert!(inventory.location(location.id).expect("get").is_some());
        assert_eq!(inventory.regions().expect("list").len(), 0);
    }

    #[rstest]
    fn delete_location_rejected_while_linked(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");
        inventory.create_link(&link_request("A-B", a.id, b.id)).expect("link");

        let error = inventory.delete_location(a.id).expect_err("linked delete should fail");
        assert!(matches!(error, StoreError::ReferencedByLinks { links: 1, .. }));
    }

    #[rstest]
    fn delete_link_cascades_splices_and_nulls_peers(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");
        let owner = inventory.create_link(&link_request("A-B", a.id, b.id)).expect("owner");
        let peer = inventory.create_link(&link_request("B-A", b.id, a.id)).expect("peer");
        let splice = inventory
            .create_splice(&NewSplice {
                link: owner.id,
                fiber_number: 1,
                peer_link: Some(peer.id),
                peer_fiber: 2,
            })
            .expect("splice");

        inventory.delete_link(peer.id).expect("delete peer");
        let reread = inventory.splice(splice.id).expect("get").expect("still there");
        assert_eq!(reread.peer_link, None);

        inventory.delete_link(owner.id).expect("delete owner");
        assert!(inventory.splice(splice.id).expect("get").is_none());
    }

    #[rstest]
    fn update_location_rederives_membership(mut inventory: Inventory) {
        let region = inventory.create_region(&new_region("Central")).expect("region");
        let location = inventory.create_location(&new_location("HUB-01")).expect("location");
        assert_eq!(inventory.region_locations(region.id).expect("members").len(), 0);

        let mut updated = new_location("HUB-01");
        updated.address = Some("12 Central Ave".into());
        let location = inventory.update_location(location.id, &updated).expect("update");

        assert!(location.updated_at.is_some());
        let members = inventory.region_locations(region.id).expect("members");
        assert_eq!(members.len(), 1);
    }

    #[rstest]
    fn reopened_database_retains_rows() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let db_path = dir.path().join("inventory.db");
        {
            let mut inventory = Inventory::open(&db_path).expect("open on disk");
            inventory.initialise().expect("initialise schema");
            inventory.seed_reference_data().expect("seed reference data");
            inventory.create_location(&new_location("HUB-01")).expect("create");
        }

        let inventory = Inventory::open(&db_path).expect("reopen");
        let locations = inventory.locations().expect("list");
        assert_eq!(locations.first().map(|l| l.name.as_str()), Some("HUB-01"));
    }

    #[rstest]
    fn update_link_re_resolves_cable_type(mut inventory: Inventory) {
        let a = inventory.create_location(&new_location("A")).expect("a");
        let b = inventory.create_location(&new_location("B")).expect("b");
        let link = inventory.create_link(&link_request("A-B", a.id, b.id)).expect("link");
        assert_eq!(link.cable_type, 1);

        let mut request = link_request("A-B", a.id, b.id);
        request.fiber_count = Some(24);
        let link = inventory.update_link(link.id, &request).expect("update");

        // Seeded OS-24 row.
        assert_eq!(link.cable_type, 8);
    }
}
