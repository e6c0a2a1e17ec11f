//! Row mapping and point lookups shared by the store and its write phases.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::StoreError;
use crate::catalog::{CableType, LocationType, LocationTypeId};
use crate::entity::{Link, LinkId, Location, LocationId, Region, RegionId, Splice, SpliceId};

const LOCATION_COLUMNS: &str = "location_id, name, location_type_id, latitude, longitude, \
                                address, description, created_at, updated_at";
const LINK_COLUMNS: &str = "link_id, name, cable_type_id, fiber_count, from_location_id, \
                            to_location_id, distance_km, description, created_at, updated_at";
const SPLICE_COLUMNS: &str =
    "splice_id, link_id, fiber_number, peer_link_id, peer_fiber, created_at, updated_at";
const REGION_COLUMNS: &str = "region_id, name, latitude, longitude, display_name, country, \
                              state, external_ref, description, created_at, updated_at";

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        location_type: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        address: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        name: row.get(1)?,
        cable_type: row.get(2)?,
        fiber_count: row.get(3)?,
        from_location: row.get(4)?,
        to_location: row.get(5)?,
        distance_km: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn splice_from_row(row: &Row<'_>) -> rusqlite::Result<Splice> {
    Ok(Splice {
        id: row.get(0)?,
        link: row.get(1)?,
        fiber_number: row.get(2)?,
        peer_link: row.get(3)?,
        peer_fiber: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn region_from_row(row: &Row<'_>) -> rusqlite::Result<Region> {
    Ok(Region {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        display_name: row.get(4)?,
        country: row.get(5)?,
        state: row.get(6)?,
        external_ref: row.get(7)?,
        description: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn location(
    conn: &Connection,
    id: LocationId,
) -> Result<Option<Location>, StoreError> {
    conn.query_row(
        &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE location_id = ?1"),
        params![id],
        location_from_row,
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn link(conn: &Connection, id: LinkId) -> Result<Option<Link>, StoreError> {
    conn.query_row(
        &format!("SELECT {LINK_COLUMNS} FROM links WHERE link_id = ?1"),
        params![id],
        link_from_row,
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn splice(conn: &Connection, id: SpliceId) -> Result<Option<Splice>, StoreError> {
    conn.query_row(
        &format!("SELECT {SPLICE_COLUMNS} FROM splices WHERE splice_id = ?1"),
        params![id],
        splice_from_row,
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn region(conn: &Connection, id: RegionId) -> Result<Option<Region>, StoreError> {
    conn.query_row(
        &format!("SELECT {REGION_COLUMNS} FROM regions WHERE region_id = ?1"),
        params![id],
        region_from_row,
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn location_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<LocationId>, StoreError> {
    conn.query_row("SELECT location_id FROM locations WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn link_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<LinkId>, StoreError> {
    conn.query_row("SELECT link_id FROM links WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
        .map_err(StoreError::from_sqlite)
}

pub(crate) fn region_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<RegionId>, StoreError> {
    conn.query_row("SELECT region_id FROM regions WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
    .map_err(StoreError::from_sqlite)
}

/// Look a link up by its `(name, from, to)` route triple.
pub(crate) fn link_id_by_route(
    conn: &Connection,
    name: &str,
    from: LocationId,
    to: LocationId,
) -> Result<Option<LinkId>, StoreError> {
    conn.query_row(
        "SELECT link_id FROM links
         WHERE name = ?1 AND from_location_id = ?2 AND to_location_id = ?3",
        params![name, from, to],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

/// Look a location up by its exact stored coordinates.
///
/// Comparison is exact floating-point equality with no tolerance; a
/// coordinate that has been rounded or reformatted upstream will not match.
pub(crate) fn location_id_at(
    conn: &Connection,
    longitude: f64,
    latitude: f64,
) -> Result<Option<LocationId>, StoreError> {
    conn.query_row(
        "SELECT location_id FROM locations
         WHERE longitude = ?1 AND latitude = ?2
         ORDER BY location_id LIMIT 1",
        params![longitude, latitude],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn location_type_id(
    conn: &Connection,
    name: &str,
) -> Result<Option<LocationTypeId>, StoreError> {
    conn.query_row(
        "SELECT location_type_id FROM location_types WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from_sqlite)
}

pub(crate) fn cable_types(conn: &Connection) -> Result<Vec<CableType>, StoreError> {
    let mut statement = conn
        .prepare(
            "SELECT cable_type_id, name, fiber_count, color, description
             FROM cable_types ORDER BY cable_type_id",
        )
        .map_err(StoreError::from_sqlite)?;
    let rows = statement
        .query_map([], |row| {
            Ok(CableType {
                id: row.get(0)?,
                name: row.get(1)?,
                fiber_count: row.get(2)?,
                color: row.get(3)?,
                description: row.get(4)?,
            })
        })
        .map_err(StoreError::from_sqlite)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
}

pub(crate) fn location_types(conn: &Connection) -> Result<Vec<LocationType>, StoreError> {
    let mut statement = conn
        .prepare(
            "SELECT location_type_id, name, display_name, emoji, description
             FROM location_types ORDER BY location_type_id",
        )
        .map_err(StoreError::from_sqlite)?;
    let rows = statement
        .query_map([], |row| {
            Ok(LocationType {
                id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                emoji: row.get(3)?,
                description: row.get(4)?,
            })
        })
        .map_err(StoreError::from_sqlite)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
}

pub(crate) fn list_locations(conn: &Connection) -> Result<Vec<Location>, StoreError> {
    collect(conn, &format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY location_id"), location_from_row)
}

pub(crate) fn list_links(conn: &Connection) -> Result<Vec<Link>, StoreError> {
    collect(conn, &format!("SELECT {LINK_COLUMNS} FROM links ORDER BY link_id"), link_from_row)
}

pub(crate) fn list_regions(conn: &Connection) -> Result<Vec<Region>, StoreError> {
    collect(conn, &format!("SELECT {REGION_COLUMNS} FROM regions ORDER BY region_id"), region_from_row)
}

pub(crate) fn list_splices(
    conn: &Connection,
    link_filter: Option<LinkId>,
) -> Result<Vec<Splice>, StoreError> {
    match link_filter {
        Some(link_id) => {
            let mut statement = conn
                .prepare(&format!(
                    "SELECT {SPLICE_COLUMNS} FROM splices WHERE link_id = ?1 ORDER BY splice_id"
                ))
                .map_err(StoreError::from_sqlite)?;
            let rows = statement
                .query_map(params![link_id], splice_from_row)
                .map_err(StoreError::from_sqlite)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
        }
        None => collect(
            conn,
            &format!("SELECT {SPLICE_COLUMNS} FROM splices ORDER BY splice_id"),
            splice_from_row,
        ),
    }
}

pub(crate) fn region_locations(
    conn: &Connection,
    region_id: RegionId,
) -> Result<Vec<Location>, StoreError> {
    let mut statement = conn
        .prepare(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations
             INNER JOIN region_locations USING (location_id)
             WHERE region_id = ?1
             ORDER BY location_id"
        ))
        .map_err(StoreError::from_sqlite)?;
    let rows = statement
        .query_map(params![region_id], location_from_row)
        .map_err(StoreError::from_sqlite)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
}

pub(crate) fn region_links(
    conn: &Connection,
    region_id: RegionId,
) -> Result<Vec<Link>, StoreError> {
    let mut statement = conn
        .prepare(&format!(
            "SELECT {LINK_COLUMNS} FROM links
             INNER JOIN region_links USING (link_id)
             WHERE region_id = ?1
             ORDER BY link_id"
        ))
        .map_err(StoreError::from_sqlite)?;
    let rows = statement
        .query_map(params![region_id], link_from_row)
        .map_err(StoreError::from_sqlite)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
}

pub(crate) fn link_count_referencing(
    conn: &Connection,
    location_id: LocationId,
) -> Result<i64, StoreError> {
    conn.query_row(
        "SELECT COUNT(*) FROM links WHERE from_location_id = ?1 OR to_location_id = ?1",
        params![location_id],
        |row| row.get(0),
    )
    .map_err(StoreError::from_sqlite)
}

fn collect<T>(
    conn: &Connection,
    sql: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, StoreError> {
    let mut statement = conn.prepare(sql).map_err(StoreError::from_sqlite)?;
    let rows = statement.query_map([], map).map_err(StoreError::from_sqlite)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from_sqlite)
}
