//! Facade crate for the strandmap network inventory engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite-backed
//! inventory store behind feature flags. The importers for structured schema
//! documents and GeoJSON feature collections live in `strandmap-data`.

#![forbid(unsafe_code)]

pub use strandmap_core::{
    CableType, CableTypeQuery, Link, LinkRequest, Location, LocationType, NewLink, NewLocation,
    NewRegion, NewSplice, Region, Splice, resolve_cable_type,
};

#[cfg(feature = "store-sqlite")]
pub use strandmap_core::{
    CreationObserver, DeriveError, Inventory, RegionAutoAttach, SchemaError, StoreError,
};
