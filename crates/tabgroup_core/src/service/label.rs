//! Secondary labels for tabs sharing a display name.
//!
//! # Responsibility
//! - Group tabs by display name (final path segment).
//! - For each colliding name, keep only the path segments that tell the
//!   members apart.
//!
//! # Invariants
//! - Tabs with a unique display name get no secondary label.
//! - Identical full paths count once.
//! - Distinct colliding paths always produce distinct labels.

use crate::input::tab::display_name;
use std::collections::{BTreeSet, HashMap};

/// Computes secondary labels keyed by tab id.
///
/// `entries` yields `(tab_id, path)` pairs. Only tabs that need a secondary
/// label appear in the result.
pub fn disambiguate<'a, I>(entries: I, separator: &str) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut by_name: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
    for (tab_id, path) in entries {
        by_name
            .entry(display_name(path))
            .or_default()
            .push((tab_id, path));
    }

    let mut labels = HashMap::new();
    for members in by_name.values() {
        let distinct = members
            .iter()
            .map(|(_, path)| *path)
            .collect::<BTreeSet<_>>();
        if distinct.len() < 2 {
            continue;
        }

        let mut sequences = distinct.iter().map(|path| segments(path)).collect::<Vec<_>>();
        let prefix = common_prefix_len(&mut sequences);
        let suffix = common_dir_suffix_len(&sequences, prefix);

        for (tab_id, path) in members {
            let own = segments(path);
            let end = own.len().saturating_sub(1 + suffix);
            if end <= prefix {
                continue;
            }
            labels.insert(tab_id.to_string(), own[prefix..end].join(separator));
        }
    }
    labels
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Number of leading segments shared by every sequence, never including a
/// final segment.
///
/// Sorting by length bounds the prefix with the shortest and longest members
/// before one confirming pass over the rest.
fn common_prefix_len(sequences: &mut [Vec<&str>]) -> usize {
    sequences.sort_by_key(Vec::len);
    let (Some(shortest), Some(longest)) = (sequences.first(), sequences.last()) else {
        return 0;
    };

    let limit = shortest.len().saturating_sub(1);
    let mut bound = shortest
        .iter()
        .zip(longest.iter())
        .take(limit)
        .take_while(|(left, right)| left == right)
        .count();

    for sequence in sequences.iter() {
        while bound > 0 && sequence[..bound] != shortest[..bound] {
            bound -= 1;
        }
    }
    bound
}

/// Number of directory segments directly above the name shared by every
/// sequence, not reaching into the common prefix.
fn common_dir_suffix_len(sequences: &[Vec<&str>], prefix: usize) -> usize {
    let Some(room) = sequences
        .iter()
        .map(|sequence| sequence.len().saturating_sub(1 + prefix))
        .min()
    else {
        return 0;
    };
    let Some(first) = sequences.first() else {
        return 0;
    };

    let mut shared = 0;
    while shared < room {
        let segment = first[first.len() - 2 - shared];
        let all_match = sequences
            .iter()
            .all(|sequence| sequence[sequence.len() - 2 - shared] == segment);
        if !all_match {
            break;
        }
        shared += 1;
    }
    shared
}

#[cfg(test)]
mod tests {
    use super::{common_prefix_len, disambiguate, segments};

    #[test]
    fn shared_parent_directory_is_stripped() {
        let labels = disambiguate([("1", "a/x/f.txt"), ("2", "b/x/f.txt")], "/");
        assert_eq!(labels.get("1").map(String::as_str), Some("a"));
        assert_eq!(labels.get("2").map(String::as_str), Some("b"));
    }

    #[test]
    fn common_prefix_is_stripped() {
        let labels = disambiguate(
            [
                ("1", "/home/me/project/src/mod.rs"),
                ("2", "/home/me/project/tests/mod.rs"),
            ],
            "/",
        );
        assert_eq!(labels["1"], "src");
        assert_eq!(labels["2"], "tests");
    }

    #[test]
    fn unique_names_and_identical_paths_get_no_label() {
        let labels = disambiguate(
            [("1", "/a/one.rs"), ("2", "/b/two.rs"), ("3", "/c/same.rs"), ("4", "/c/same.rs")],
            "/",
        );
        assert!(labels.is_empty());
    }

    #[test]
    fn nested_member_gets_label_and_shallow_member_does_not() {
        let labels = disambiguate([("1", "/a/f.txt"), ("2", "/a/b/f.txt")], "/");
        assert!(!labels.contains_key("1"));
        assert_eq!(labels["2"], "b");
    }

    #[test]
    fn labels_join_with_separator_and_scope_per_name() {
        let labels = disambiguate(
            [
                ("1", "/w/a/b/lib.rs"),
                ("2", "/w/c/d/lib.rs"),
                ("3", "/w/a/b/main.rs"),
            ],
            "\\",
        );
        assert_eq!(labels["1"], "a\\b");
        assert_eq!(labels["2"], "c\\d");
        assert!(!labels.contains_key("3"));
    }

    #[test]
    fn prefix_is_confirmed_against_every_member() {
        let mut sequences = vec![
            segments("/r/a/f"),
            segments("/r/b/c/f"),
            segments("/r/a/q/w/f"),
        ];
        assert_eq!(common_prefix_len(&mut sequences), 1);
    }
}
