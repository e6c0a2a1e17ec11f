//! Core domain types and persistence for the strandmap inventory engine.
//!
//! The crate models a fiber/cable network: [`Location`]s, the [`Link`]s
//! (cables) connecting them, per-fiber [`Splice`] records, and geographic
//! [`Region`]s that group locations and links. The SQLite-backed
//! [`Inventory`] store and the region-membership deriver live behind the
//! `store-sqlite` feature.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod entity;

#[cfg(feature = "store-sqlite")]
pub mod derive;
#[cfg(feature = "store-sqlite")]
pub mod store;

pub use catalog::{
    CableType, CableTypeId, CableTypeQuery, DEFAULT_LOCATION_TYPE, FALLBACK_LOCATION_TYPE_ID,
    GENERIC_COPPER, GENERIC_OPTICAL, LocationType, LocationTypeId, OPTICAL_SERIES_PREFIX,
    SENTINEL_CABLE_TYPE_ID, resolve_cable_type,
};
pub use entity::{
    Link, LinkId, LinkRequest, Location, LocationId, NewLink, NewLocation, NewRegion, NewSplice,
    Region, RegionId, Splice, SpliceId,
};

#[cfg(feature = "store-sqlite")]
pub use derive::{CreationObserver, DeriveError, RegionAutoAttach};
#[cfg(feature = "store-sqlite")]
pub use store::{Inventory, SCHEMA_VERSION, SchemaError, StoreError, WriteTxn};
