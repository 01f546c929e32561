//! The version resolution engine
//!
//! Given the release history, the set of versions a route actually supports,
//! and the version a client asked for, pick the revision to execute. The
//! policy is "nearest supported version at or below the request": new
//! revisions apply forward in time, and older clients keep getting the last
//! revision that existed when their version was current.
//!
//! Two modes exist. [`lexicographic`] handles identifiers that are history
//! entries (plus a forward-compatible clamp for identifiers newer than the
//! history knows about). [`date_aware`] additionally accepts arbitrary
//! calendar dates that fall *between* history entries, locating the nearest
//! lower release by binary search before applying the same backward scan.

use crate::version::{Version, VersionHistory};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Exact-match and nearest-lower resolution over history positions.
///
/// 1. A requested version the route supports is returned as-is.
/// 2. A requested version that is a history entry resolves to the newest
///    supported version at an earlier position, if any.
/// 3. A requested version unknown to the history resolves as if the newest
///    history entry had been requested (forward-compatible clamp).
///
/// Returns `None` when no supported revision exists at or below the request.
pub fn lexicographic(
    history: &VersionHistory,
    available: &HashSet<Version>,
    requested: &Version,
) -> Option<Version> {
    if let Some(resolved) = resolve_known(history, available, requested) {
        return Some(resolved);
    }
    if history.contains(requested) || history.is_empty() {
        return None;
    }
    scan_down(history, available, history.len() - 1)
}

/// Date-mode resolution: like [`lexicographic`], but a requested value that
/// is not a history entry is parsed as a date and snapped to the nearest
/// strictly-lower release date before the backward scan.
///
/// `parse` is the caller's date parser (the date-aware version extractor
/// carries one). A request that fails to parse, or that predates every
/// release, resolves to `None`.
pub fn date_aware(
    history: &VersionHistory,
    available: &HashSet<Version>,
    requested: &Version,
    parse: &dyn Fn(&str) -> Option<NaiveDate>,
) -> Option<Version> {
    if let Some(resolved) = resolve_known(history, available, requested) {
        return Some(resolved);
    }
    if history.contains(requested) {
        // Known entry with nothing at or below it; the date search would
        // walk the same positions again.
        return None;
    }

    let requested_date = parse(requested.as_str())?;
    let dated: Vec<(NaiveDate, usize)> = history
        .iter()
        .enumerate()
        .filter_map(|(idx, version)| parse(version.as_str()).map(|date| (date, idx)))
        .collect();

    let below = nearest_below(&dated, requested_date)?;
    scan_down(history, available, dated[below].1)
}

/// Steps shared by both modes: exact membership hit, then a backward scan
/// from the position just before the requested history entry. Yields nothing
/// when the requested version is not a history entry.
fn resolve_known(
    history: &VersionHistory,
    available: &HashSet<Version>,
    requested: &Version,
) -> Option<Version> {
    if available.contains(requested) {
        return Some(requested.clone());
    }
    match history.position(requested)? {
        0 => None,
        position => scan_down(history, available, position - 1),
    }
}

/// Walk from `from` toward the oldest entry, returning the first version the
/// route supports.
fn scan_down(
    history: &VersionHistory,
    available: &HashSet<Version>,
    from: usize,
) -> Option<Version> {
    (0..=from)
        .rev()
        .map(|idx| &history.as_slice()[idx])
        .find(|version| available.contains(*version))
        .cloned()
}

/// Index of the rightmost entry whose date is strictly below `target`.
///
/// `dated` must be sorted ascending by date, which history construction
/// guarantees. O(log n).
fn nearest_below(dated: &[(NaiveDate, usize)], target: NaiveDate) -> Option<usize> {
    match dated.partition_point(|(date, _)| *date < target) {
        0 => None,
        count => Some(count - 1),
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Reference implementation for [`nearest_below`]: plain linear scan.
    fn nearest_below_linear(dated: &[(NaiveDate, usize)], target: NaiveDate) -> Option<usize> {
        let mut best = None;
        for (idx, (date, _)) in dated.iter().enumerate() {
            if *date < target {
                best = Some(idx);
            }
        }
        best
    }

    fn sorted_dates() -> impl Strategy<Value = Vec<NaiveDate>> {
        prop::collection::btree_set(0i64..20_000, 0..40).prop_map(|days| {
            days.into_iter()
                .filter_map(|offset| {
                    NaiveDate::from_ymd_opt(1970, 1, 1)
                        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(offset as u64)))
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// The binary search must agree with a linear scan on any sorted
        /// date array and any probe date.
        #[test]
        fn binary_search_matches_linear_scan(
            dates in sorted_dates(),
            probe_offset in 0i64..20_000,
        ) {
            let dated: Vec<(NaiveDate, usize)> = dates
                .iter()
                .enumerate()
                .map(|(idx, date)| (*date, idx))
                .collect();
            let probe = NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(probe_offset as u64))
                .unwrap();

            prop_assert_eq!(
                nearest_below(&dated, probe),
                nearest_below_linear(&dated, probe)
            );
        }

        /// Exact-match property: any supported version resolves to itself.
        #[test]
        fn supported_versions_resolve_to_themselves(
            picks in prop::collection::vec(any::<bool>(), 12),
            requested_idx in 0usize..12,
        ) {
            let entries: Vec<String> = (1..=12)
                .map(|month| format!("2023-{month:02}-01"))
                .collect();
            let history = VersionHistory::dated(entries.clone()).unwrap();
            let available: HashSet<Version> = entries
                .iter()
                .zip(&picks)
                .filter(|(_, picked)| **picked)
                .map(|(entry, _)| Version::from(entry.as_str()))
                .collect();

            let requested = Version::from(entries[requested_idx].as_str());
            if available.contains(&requested) {
                prop_assert_eq!(
                    lexicographic(&history, &available, &requested),
                    Some(requested)
                );
            }
        }

        /// Nearest-lower property: resolution lands on the newest supported
        /// entry at or below the request, or nothing.
        #[test]
        fn resolution_is_nearest_lower(
            picks in prop::collection::vec(any::<bool>(), 12),
            requested_idx in 0usize..12,
        ) {
            let entries: Vec<String> = (1..=12)
                .map(|month| format!("2023-{month:02}-01"))
                .collect();
            let history = VersionHistory::dated(entries.clone()).unwrap();
            let available: HashSet<Version> = entries
                .iter()
                .zip(&picks)
                .filter(|(_, picked)| **picked)
                .map(|(entry, _)| Version::from(entry.as_str()))
                .collect();

            let requested = Version::from(entries[requested_idx].as_str());
            let expected = (0..=requested_idx)
                .rev()
                .map(|idx| Version::from(entries[idx].as_str()))
                .find(|candidate| available.contains(candidate));

            prop_assert_eq!(
                lexicographic(&history, &available, &requested),
                expected
            );
        }
    }
}
