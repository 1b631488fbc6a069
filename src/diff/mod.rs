//! Drift between a materialized dotenv file and the declared environment.

mod render;

pub use render::render;

use std::collections::BTreeMap;

/// Stands in for every value when only names are compared.
pub const NOT_RETRIEVED: &str = "(value not retrieved)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeValue {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub added: BTreeMap<String, String>,
    pub removed: BTreeMap<String, String>,
    pub changed: BTreeMap<String, ChangeValue>,
}

impl Diff {
    /// True when any bucket is non-empty.
    pub fn is_changed(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty())
    }
}

/// Compare `old` (the file on disk) against `new` (the declared state).
/// With `name_only`, every value is replaced by [`NOT_RETRIEVED`] first, so
/// only added and removed names can be reported.
pub fn compute_diff(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
    name_only: bool,
) -> Diff {
    if name_only {
        return diff_maps(&scrub(old.keys()), &scrub(new.keys()));
    }
    diff_maps(old, new)
}

/// Name-only drift between declared variable names and a dotenv map. Needs
/// no resolved values, so no backend is contacted.
pub fn compute_name_diff<'a>(
    old: &BTreeMap<String, String>,
    declared: impl IntoIterator<Item = &'a String>,
) -> Diff {
    diff_maps(&scrub(old.keys()), &scrub(declared))
}

fn scrub<'a>(names: impl IntoIterator<Item = &'a String>) -> BTreeMap<String, String> {
    names
        .into_iter()
        .map(|name| (name.clone(), NOT_RETRIEVED.to_string()))
        .collect()
}

fn diff_maps(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Diff {
    let mut diff = Diff::default();

    for (name, old_value) in old {
        match new.get(name) {
            None => {
                diff.removed.insert(name.clone(), old_value.clone());
            }
            Some(new_value) if new_value != old_value => {
                diff.changed.insert(
                    name.clone(),
                    ChangeValue {
                        old: old_value.clone(),
                        new: new_value.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (name, new_value) in new {
        if !old.contains_key(name) {
            diff.added.insert(name.clone(), new_value.clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_maps_have_no_drift() {
        let diff = compute_diff(&BTreeMap::new(), &BTreeMap::new(), false);
        assert_eq!(diff, Diff::default());
        assert!(!diff.is_changed());
    }

    #[test]
    fn test_added_removed_changed() {
        let diff = compute_diff(
            &map(&[("A", "1"), ("B", "2")]),
            &map(&[("A", "2"), ("C", "3")]),
            false,
        );
        assert_eq!(diff.added, map(&[("C", "3")]));
        assert_eq!(diff.removed, map(&[("B", "2")]));
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(
            diff.changed["A"],
            ChangeValue {
                old: "1".to_string(),
                new: "2".to_string()
            }
        );
        assert!(diff.is_changed());
    }

    #[test]
    fn test_equal_entries_are_not_reported() {
        let diff = compute_diff(&map(&[("A", "1")]), &map(&[("A", "1"), ("B", "2")]), false);
        assert!(diff.removed.is_empty());
        assert!(diff.changed.is_empty());
        assert_eq!(diff.added, map(&[("B", "2")]));
    }

    #[test]
    fn test_name_only_ignores_values() {
        let old = map(&[
            ("NOT_CHANGED", "same"),
            ("REMOVED", "gone"),
            ("VALUE_CHANGED", "before"),
        ]);
        let new = map(&[
            ("NOT_CHANGED", "same"),
            ("NEW_DEFINED", "fresh"),
            ("VALUE_CHANGED", "after"),
        ]);

        let diff = compute_diff(&old, &new, true);
        assert_eq!(diff.added, map(&[("NEW_DEFINED", NOT_RETRIEVED)]));
        assert_eq!(diff.removed, map(&[("REMOVED", NOT_RETRIEVED)]));
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn test_name_diff_from_declared_names() {
        let old = map(&[("KEEP", "1"), ("STALE", "2")]);
        let declared = ["KEEP".to_string(), "NEW".to_string()];

        let diff = compute_name_diff(&old, declared.iter());
        assert_eq!(diff.added.keys().collect::<Vec<_>>(), vec!["NEW"]);
        assert_eq!(diff.removed.keys().collect::<Vec<_>>(), vec!["STALE"]);
        assert!(diff.changed.is_empty());
    }
}
