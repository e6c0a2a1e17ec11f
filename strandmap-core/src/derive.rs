//! Region-membership derivation.
//!
//! Observers run right after a location or link row is durably written,
//! inside the same transaction as the triggering insert. A failing observer
//! is caught and logged; it never fails the creation. Explicit re-derivation
//! (the store's `refresh_*` operations) runs the same observers but surfaces
//! their errors, since there the derivation *is* the requested operation.

use log::warn;
use rusqlite::Connection;
use thiserror::Error;

use crate::entity::{Link, Location, RegionId};
use crate::store::{attach_link, attach_location, endpoints_in_region};

/// Errors raised while deriving region membership.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// Membership rows could not be read or written.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Hook invoked after a location or link has been durably created.
///
/// Implementations must be idempotent: an entity passes through the
/// observer list again whenever it is updated or explicitly re-derived.
pub trait CreationObserver {
    /// Called after a location row is written.
    fn location_created(&self, conn: &Connection, location: &Location) -> Result<(), DeriveError>;

    /// Called after a link row is written.
    fn link_created(&self, conn: &Connection, link: &Link) -> Result<(), DeriveError>;
}

/// The stock observer: attaches new entities to regions.
///
/// Locations attach to the first region (ascending region id) whose name is
/// a case-insensitive substring of the location's address. Links attach to
/// every region that already contains both endpoints.
pub struct RegionAutoAttach;

impl CreationObserver for RegionAutoAttach {
    fn location_created(&self, conn: &Connection, location: &Location) -> Result<(), DeriveError> {
        let Some(address) = location.address.as_deref() else {
            return Ok(());
        };
        let haystack = address.to_lowercase();
        for (region_id, name) in regions_by_id(conn)? {
            if haystack.contains(&name.to_lowercase()) {
                attach_location(conn, region_id, location.id)?;
                // First match wins; later regions are not considered.
                break;
            }
        }
        Ok(())
    }

    fn link_created(&self, conn: &Connection, link: &Link) -> Result<(), DeriveError> {
        for (region_id, _name) in regions_by_id(conn)? {
            if endpoints_in_region(conn, region_id, link.from_location, link.to_location)? {
                attach_link(conn, region_id, link.id)?;
            }
        }
        Ok(())
    }
}

fn regions_by_id(conn: &Connection) -> Result<Vec<(RegionId, String)>, rusqlite::Error> {
    let mut statement = conn.prepare("SELECT region_id, name FROM regions ORDER BY region_id")?;
    let rows = statement.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// Run every observer's location hook, catching and logging failures.
pub(crate) fn notify_location_created(
    observers: &[Box<dyn CreationObserver>],
    conn: &Connection,
    location: &Location,
) {
    for observer in observers {
        if let Err(err) = observer.location_created(conn, location) {
            warn!("region derivation failed for location {}: {err}", location.id);
        }
    }
}

/// Run every observer's link hook, catching and logging failures.
pub(crate) fn notify_link_created(
    observers: &[Box<dyn CreationObserver>],
    conn: &Connection,
    link: &Link,
) {
    for observer in observers {
        if let Err(err) = observer.link_created(conn, link) {
            warn!("region derivation failed for link {}: {err}", link.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    use crate::entity::{LinkRequest, LocationId, NewLocation, NewRegion};
    use crate::store::Inventory;

    #[fixture]
    fn inventory() -> Inventory {
        let mut inventory = Inventory::open_in_memory().expect("open in-memory store");
        inventory.initialise().expect("initialise schema");
        inventory.seed_reference_data().expect("seed reference data");
        inventory
    }

    fn location_at(name: &str, address: Option<&str>) -> NewLocation {
        NewLocation {
            name: name.into(),
            location_type: 1,
            latitude: None,
            longitude: None,
            address: address.map(Into::into),
            description: None,
        }
    }

    fn region_named(name: &str) -> NewRegion {
        NewRegion {
            name: name.into(),
            latitude: 48.0,
            longitude: 37.0,
            display_name: None,
            country: None,
            state: None,
            external_ref: None,
            description: None,
        }
    }

    fn link_between(name: &str, from: LocationId, to: LocationId) -> LinkRequest {
        LinkRequest {
            name: name.into(),
            cable_type: Some("optical".into()),
            from_location: from,
            to_location: to,
            ..LinkRequest::default()
        }
    }

    #[rstest]
    fn location_attaches_to_region_named_in_address(mut inventory: Inventory) {
        let central = inventory.create_region(&region_named("Central")).expect("region");

        let location = inventory
            .create_location(&location_at("HUB-01", Some("12 Central Ave")))
            .expect("location");

        let members = inventory.region_locations(central.id).expect("members");
        assert_eq!(members.len(), 1);
        assert_eq!(members.first().map(|m| m.id), Some(location.id));
    }

    #[rstest]
    fn address_match_is_case_insensitive(mut inventory: Inventory) {
        let central = inventory.create_region(&region_named("Central")).expect("region");

        inventory
            .create_location(&location_at("HUB-01", Some("12 CENTRAL AVE")))
            .expect("location");

        assert_eq!(inventory.region_locations(central.id).expect("members").len(), 1);
    }

    #[rstest]
    fn near_miss_region_name_does_not_match(mut inventory: Inventory) {
        let central = inventory.create_region(&region_named("Central")).expect("central");
        let centralia = inventory.create_region(&region_named("Centralia")).expect("centralia");

        inventory
            .create_location(&location_at("HUB-01", Some("12 Central Ave")))
            .expect("location");

        assert_eq!(inventory.region_locations(central.id).expect("central").len(), 1);
        assert_eq!(inventory.region_locations(centralia.id).expect("centralia").len(), 0);
    }

    #[rstest]
    fn first_matching_region_wins_when_both_names_are_substrings(mut inventory: Inventory) {
        let central = inventory.create_region(&region_named("Central")).expect("central");
        let centralia = inventory.create_region(&region_named("Centralia")).expect("centralia");

        // "Centralia Yard" contains both "Central" and "Centralia"; the
        // region with the lower id is visited first.
        inventory
            .create_location(&location_at("HUB-01", Some("Centralia Yard")))
            .expect("location");

        assert_eq!(inventory.region_locations(central.id).expect("central").len(), 1);
        assert_eq!(inventory.region_locations(centralia.id).expect("centralia").len(), 0);
    }

    #[rstest]
    fn location_without_address_is_not_attached(mut inventory: Inventory) {
        let central = inventory.create_region(&region_named("Central")).expect("region");

        inventory.create_location(&location_at("HUB-01", None)).expect("location");

        assert_eq!(inventory.region_locations(central.id).expect("members").len(), 0);
    }

    #[rstest]
    fn link_attaches_only_when_both_endpoints_are_members(mut inventory: Inventory) {
        let region = inventory.create_region(&region_named("Central")).expect("region");
        let a = inventory.create_location(&location_at("A", None)).expect("a");
        let b = inventory.create_location(&location_at("B", None)).expect("b");
        inventory.attach_location_to_region(region.id, a.id).expect("attach a");

        let link = inventory.create_link(&link_between("A-B", a.id, b.id)).expect("link");
        assert_eq!(inventory.region_links(region.id).expect("links").len(), 0);

        inventory.attach_location_to_region(region.id, b.id).expect("attach b");
        inventory.refresh_link_regions(link.id).expect("re-derive");
        assert_eq!(inventory.region_links(region.id).expect("links").len(), 1);
    }

    #[rstest]
    fn link_attaches_to_every_containing_region(mut inventory: Inventory) {
        let north = inventory.create_region(&region_named("North")).expect("north");
        let metro = inventory.create_region(&region_named("Metro")).expect("metro");
        let a = inventory.create_location(&location_at("A", None)).expect("a");
        let b = inventory.create_location(&location_at("B", None)).expect("b");
        for region in [north.id, metro.id] {
            inventory.attach_location_to_region(region, a.id).expect("attach a");
            inventory.attach_location_to_region(region, b.id).expect("attach b");
        }

        inventory.create_link(&link_between("A-B", a.id, b.id)).expect("link");

        assert_eq!(inventory.region_links(north.id).expect("north links").len(), 1);
        assert_eq!(inventory.region_links(metro.id).expect("metro links").len(), 1);
    }

    #[rstest]
    fn rederiving_an_attached_link_is_a_noop(mut inventory: Inventory) {
        let region = inventory.create_region(&region_named("Central")).expect("region");
        let a = inventory.create_location(&location_at("A", None)).expect("a");
        let b = inventory.create_location(&location_at("B", None)).expect("b");
        inventory.attach_location_to_region(region.id, a.id).expect("attach a");
        inventory.attach_location_to_region(region.id, b.id).expect("attach b");
        let link = inventory.create_link(&link_between("A-B", a.id, b.id)).expect("link");

        inventory.refresh_link_regions(link.id).expect("first re-derive");
        inventory.refresh_link_regions(link.id).expect("second re-derive");

        assert_eq!(inventory.region_links(region.id).expect("links").len(), 1);
    }

    struct FailingObserver;

    impl CreationObserver for FailingObserver {
        fn location_created(
            &self,
            _conn: &Connection,
            _location: &Location,
        ) -> Result<(), DeriveError> {
            Err(DeriveError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        fn link_created(&self, _conn: &Connection, _link: &Link) -> Result<(), DeriveError> {
            Err(DeriveError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[rstest]
    fn failing_observer_does_not_fail_the_creation(mut inventory: Inventory) {
        inventory.add_observer(Box::new(FailingObserver));

        let location = inventory
            .create_location(&location_at("HUB-01", Some("12 Central Ave")))
            .expect("creation survives observer failure");

        assert!(inventory.location(location.id).expect("get").is_some());
    }
}
