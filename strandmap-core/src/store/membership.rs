//! Region membership relation maintenance.
//!
//! Attach and detach are insert-if-absent / delete-if-present; whenever the
//! relation actually changes, the owning region's `updated_at` advances in
//! the same transaction.

use rusqlite::{Connection, params};

use crate::entity::{LinkId, LocationId, RegionId};

/// Attach a location to a region. Returns whether a row was inserted.
pub(crate) fn attach_location(
    conn: &Connection,
    region: RegionId,
    location: LocationId,
) -> Result<bool, rusqlite::Error> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO region_locations (region_id, location_id) VALUES (?1, ?2)",
        params![region, location],
    )?;
    if inserted > 0 {
        touch_region(conn, region)?;
    }
    Ok(inserted > 0)
}

/// Attach a link to a region. Returns whether a row was inserted.
///
/// Containment is not checked here; callers verify it first via
/// [`endpoints_in_region`].
pub(crate) fn attach_link(
    conn: &Connection,
    region: RegionId,
    link: LinkId,
) -> Result<bool, rusqlite::Error> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO region_links (region_id, link_id) VALUES (?1, ?2)",
        params![region, link],
    )?;
    if inserted > 0 {
        touch_region(conn, region)?;
    }
    Ok(inserted > 0)
}

/// Detach a location from a region. Returns whether a row was removed.
pub(crate) fn detach_location(
    conn: &Connection,
    region: RegionId,
    location: LocationId,
) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute(
        "DELETE FROM region_locations WHERE region_id = ?1 AND location_id = ?2",
        params![region, location],
    )?;
    if removed > 0 {
        touch_region(conn, region)?;
    }
    Ok(removed > 0)
}

/// Detach a link from a region. Returns whether a row was removed.
pub(crate) fn detach_link(
    conn: &Connection,
    region: RegionId,
    link: LinkId,
) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute(
        "DELETE FROM region_links WHERE region_id = ?1 AND link_id = ?2",
        params![region, link],
    )?;
    if removed > 0 {
        touch_region(conn, region)?;
    }
    Ok(removed > 0)
}

/// Whether both endpoints of a link are already members of the region.
///
/// A self-loop has a single distinct endpoint; one membership row then
/// satisfies containment.
pub(crate) fn endpoints_in_region(
    conn: &Connection,
    region: RegionId,
    from: LocationId,
    to: LocationId,
) -> Result<bool, rusqlite::Error> {
    let required: i64 = if from == to { 1 } else { 2 };
    let members: i64 = conn.query_row(
        "SELECT COUNT(*) FROM region_locations
         WHERE region_id = ?1 AND location_id IN (?2, ?3)",
        params![region, from, to],
        |row| row.get(0),
    )?;
    Ok(members >= required)
}

fn touch_region(conn: &Connection, region: RegionId) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE regions SET updated_at = CURRENT_TIMESTAMP WHERE region_id = ?1",
        params![region],
    )
    .map(|_| ())
}
