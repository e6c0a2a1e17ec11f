//! Reference catalogs and cable-type resolution.
//!
//! The two catalogs are read-mostly reference data seeded at database
//! initialisation: cable types (with an optional fiber-count tag used for
//! disambiguation) and location types. [`resolve_cable_type`] turns a loose
//! type descriptor into exactly one catalog id through an ordered decision
//! table, so the fallback chain can be audited rule by rule.

use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Key into the cable-type catalog.
pub type CableTypeId = i64;
/// Key into the location-type catalog.
pub type LocationTypeId = i64;

/// Symbolic name of the generic optical catalog entry.
pub const GENERIC_OPTICAL: &str = "optical";
/// Symbolic name of the generic copper catalog entry.
pub const GENERIC_COPPER: &str = "copper";
/// Naming prefix reserved for the fiber-count-tagged optical series.
pub const OPTICAL_SERIES_PREFIX: &str = "OS-";
/// Degraded fallback returned when the catalog holds no rows at all.
///
/// Callers receive a usable id either way; an empty catalog is a deployment
/// fault and is logged when this sentinel is handed out.
pub const SENTINEL_CABLE_TYPE_ID: CableTypeId = 1;

/// Symbolic name of the default location type.
pub const DEFAULT_LOCATION_TYPE: &str = "node";
/// Location-type id assumed when the catalog lookup finds nothing.
pub const FALLBACK_LOCATION_TYPE_ID: LocationTypeId = 1;

/// A cable-type catalog row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableType {
    /// Surrogate key.
    pub id: CableTypeId,
    /// Symbolic name, unique within the catalog.
    pub name: String,
    /// Fiber-count tag; `None` on generic entries.
    pub fiber_count: Option<i64>,
    /// Display colour as a hex string.
    pub color: String,
    /// Free-text description.
    pub description: Option<String>,
}

/// A location-type catalog row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocationType {
    /// Surrogate key.
    pub id: LocationTypeId,
    /// Symbolic name, unique within the catalog.
    pub name: String,
    /// Presentation name.
    pub display_name: String,
    /// Map marker glyph.
    pub emoji: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// A loosely-specified cable-type descriptor awaiting resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CableTypeQuery<'a> {
    /// Symbolic hint, e.g. `"optical"` or an exact catalog name.
    pub hint: Option<&'a str>,
    /// Explicit catalog id; wins over every other field.
    pub explicit_id: Option<CableTypeId>,
    /// Fiber count used to select a series entry for optical hints.
    pub fiber_count: Option<i64>,
}

type Rule = fn(&[CableType], &CableTypeQuery<'_>) -> Option<CableTypeId>;

/// Ordered decision table; the first rule to produce an id wins.
const RESOLUTION_RULES: &[Rule] = &[
    explicit_id,
    optical_series_by_fiber_count,
    generic_optical_for_optical_hint,
    generic_copper_for_copper_hint,
    exact_name_match,
];

/// Resolve a loose cable-type descriptor to exactly one catalog id.
///
/// Never fails: when no rule matches, the generic optical entry is used,
/// then the first catalog row, then [`SENTINEL_CABLE_TYPE_ID`]. Both
/// degraded fallbacks are logged.
///
/// # Examples
///
/// ```
/// use strandmap_core::catalog::{CableType, CableTypeQuery, resolve_cable_type};
///
/// let catalog = vec![CableType {
///     id: 4,
///     name: "optical".into(),
///     fiber_count: None,
///     color: "#0087BE".into(),
///     description: None,
/// }];
/// let query = CableTypeQuery { hint: Some("optical"), ..CableTypeQuery::default() };
/// assert_eq!(resolve_cable_type(&catalog, &query), 4);
/// ```
#[must_use]
pub fn resolve_cable_type(catalog: &[CableType], query: &CableTypeQuery<'_>) -> CableTypeId {
    for rule in RESOLUTION_RULES {
        if let Some(id) = rule(catalog, query) {
            return id;
        }
    }
    fallback(catalog)
}

/// Rule 1: an explicit id is returned verbatim, with no existence check;
/// catalog validity is the caller's responsibility.
fn explicit_id(_catalog: &[CableType], query: &CableTypeQuery<'_>) -> Option<CableTypeId> {
    query.explicit_id
}

/// Rule 2: a fiber count selects the optical-series entry tagged with that
/// count, unless a non-optical hint says otherwise.
fn optical_series_by_fiber_count(
    catalog: &[CableType],
    query: &CableTypeQuery<'_>,
) -> Option<CableTypeId> {
    if query.hint.is_some() && !hint_is(query, GENERIC_OPTICAL) {
        return None;
    }
    let fiber_count = query.fiber_count?;
    catalog
        .iter()
        .find(|entry| {
            entry.fiber_count == Some(fiber_count) && entry.name.starts_with(OPTICAL_SERIES_PREFIX)
        })
        .map(|entry| entry.id)
}

/// Rule 3: an `"optical"` hint without a usable series match falls back to
/// the generic optical entry.
fn generic_optical_for_optical_hint(
    catalog: &[CableType],
    query: &CableTypeQuery<'_>,
) -> Option<CableTypeId> {
    hint_is(query, GENERIC_OPTICAL)
        .then(|| entry_by_name(catalog, GENERIC_OPTICAL))
        .flatten()
}

/// Rule 4: a `"copper"` hint resolves to the generic copper entry.
fn generic_copper_for_copper_hint(
    catalog: &[CableType],
    query: &CableTypeQuery<'_>,
) -> Option<CableTypeId> {
    hint_is(query, GENERIC_COPPER)
        .then(|| entry_by_name(catalog, GENERIC_COPPER))
        .flatten()
}

/// Rule 5: any other hint is treated as a case-insensitive exact name.
fn exact_name_match(catalog: &[CableType], query: &CableTypeQuery<'_>) -> Option<CableTypeId> {
    query.hint.and_then(|hint| entry_by_name(catalog, hint))
}

fn hint_is(query: &CableTypeQuery<'_>, name: &str) -> bool {
    query.hint.is_some_and(|hint| hint.eq_ignore_ascii_case(name))
}

fn entry_by_name(catalog: &[CableType], name: &str) -> Option<CableTypeId> {
    catalog
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
        .map(|entry| entry.id)
}

fn fallback(catalog: &[CableType]) -> CableTypeId {
    if let Some(id) = entry_by_name(catalog, GENERIC_OPTICAL) {
        return id;
    }
    if let Some(first) = catalog.first() {
        warn!(
            "cable-type catalog has no generic {GENERIC_OPTICAL:?} entry; using first row {}",
            first.id
        );
        return first.id;
    }
    warn!("cable-type catalog is empty; handing out sentinel id {SENTINEL_CABLE_TYPE_ID}");
    SENTINEL_CABLE_TYPE_ID
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn entry(id: CableTypeId, name: &str, fiber_count: Option<i64>) -> CableType {
        CableType {
            id,
            name: name.into(),
            fiber_count,
            color: "#000000".into(),
            description: None,
        }
    }

    #[fixture]
    fn catalog() -> Vec<CableType> {
        vec![
            entry(1, GENERIC_OPTICAL, None),
            entry(2, GENERIC_COPPER, None),
            entry(3, "OS-4", Some(4)),
            entry(4, "OS-12", Some(12)),
            entry(5, "OS-24", Some(24)),
        ]
    }

    fn resolve(
        catalog: &[CableType],
        hint: Option<&str>,
        explicit_id: Option<CableTypeId>,
        fiber_count: Option<i64>,
    ) -> CableTypeId {
        resolve_cable_type(
            catalog,
            &CableTypeQuery {
                hint,
                explicit_id,
                fiber_count,
            },
        )
    }

    #[rstest]
    fn explicit_id_wins_unconditionally(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("copper"), Some(7), Some(12)), 7);
    }

    #[rstest]
    fn optical_hint_with_tagged_fiber_count_selects_series_entry(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("optical"), None, Some(12)), 4);
        assert_eq!(resolve(&catalog, Some("OPTICAL"), None, Some(24)), 5);
    }

    #[rstest]
    fn optical_hint_with_untagged_fiber_count_uses_generic_entry(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("optical"), None, Some(999)), 1);
    }

    #[rstest]
    fn optical_hint_without_fiber_count_uses_generic_entry(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("optical"), None, None), 1);
    }

    #[rstest]
    fn copper_hint_uses_generic_copper_entry(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("copper"), None, None), 2);
    }

    #[rstest]
    #[case("os-24", 5)]
    #[case("OS-4", 3)]
    fn other_hints_match_names_case_insensitively(
        catalog: Vec<CableType>,
        #[case] hint: &str,
        #[case] expected: CableTypeId,
    ) {
        assert_eq!(resolve(&catalog, Some(hint), None, None), expected);
    }

    #[rstest]
    fn unknown_hint_falls_back_to_generic_optical(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("coaxial"), None, None), 1);
    }

    #[rstest]
    fn no_descriptor_falls_back_to_generic_optical(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, None, None, None), 1);
    }

    #[rstest]
    fn missing_generic_entry_falls_back_to_first_row() {
        let catalog = vec![entry(9, "OS-4", Some(4)), entry(10, "OS-12", Some(12))];
        assert_eq!(resolve(&catalog, None, None, None), 9);
    }

    #[rstest]
    fn empty_catalog_hands_out_sentinel() {
        assert_eq!(resolve(&[], None, None, None), SENTINEL_CABLE_TYPE_ID);
    }

    #[rstest]
    fn bare_fiber_count_selects_series_entry(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, None, None, Some(12)), 4);
    }

    #[rstest]
    fn bare_untagged_fiber_count_falls_back_to_generic_optical(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, None, None, Some(999)), 1);
    }

    #[rstest]
    fn non_optical_hint_ignores_fiber_count(catalog: Vec<CableType>) {
        assert_eq!(resolve(&catalog, Some("copper"), None, Some(12)), 2);
    }
}
