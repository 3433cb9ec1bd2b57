//! Keypad digit prefix search over display names.
//!
//! Every display name is reduced to a digit string through the
//! [`KeypadLayout`]. The (digit string, object) pairs are kept sorted, so all
//! keys sharing a prefix form one contiguous run found by binary search.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::keypad::KeypadLayout;
use crate::object::CatalogObject;

/// Immutable digit-prefix index.
#[derive(Debug, Default)]
pub struct TextIndex {
    objects: Vec<Arc<CatalogObject>>,
    /// (digit string, position in `objects`), sorted
    entries: Vec<(String, usize)>,
}

impl TextIndex {
    /// Index every display name of every object.
    ///
    /// Names that reduce to an empty digit string are skipped.
    pub fn build(objects: &[Arc<CatalogObject>], keypad: &KeypadLayout) -> Self {
        let mut entries: Vec<(String, usize)> = objects
            .iter()
            .enumerate()
            .flat_map(|(i, obj)| {
                obj.names
                    .iter()
                    .map(move |name| keypad.encode(name))
                    .filter(|digits| !digits.is_empty())
                    .map(move |digits| (digits, i))
            })
            .collect();
        entries.sort_unstable();
        entries.dedup();

        Self {
            objects: objects.to_vec(),
            entries,
        }
    }

    /// Number of indexed (digit string, object) pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Objects with at least one name whose digit string starts with `digits`.
    ///
    /// Each object appears once, in index order. An empty query matches
    /// nothing.
    pub fn search(&self, digits: &str) -> Vec<Arc<CatalogObject>> {
        if digits.is_empty() {
            return Vec::new();
        }

        let start = self
            .entries
            .partition_point(|(key, _)| key.as_str() < digits);
        let run = self.entries[start..].partition_point(|(key, _)| key.starts_with(digits));

        let matched: BTreeSet<usize> = self.entries[start..start + run]
            .iter()
            .map(|&(_, i)| i)
            .collect();

        matched
            .into_iter()
            .map(|i| Arc::clone(&self.objects[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectId, Sequence};

    fn obj(code: &str, seq: u64, names: &[&str]) -> Arc<CatalogObject> {
        Arc::new(CatalogObject {
            catalog_code: code.to_string(),
            sequence: Sequence::Number(seq),
            ra_deg: 0.0,
            dec_deg: 0.0,
            object_id: ObjectId::new(format!("{code}{seq}")),
            names: names.iter().map(|n| n.to_string()).collect(),
            object_type: String::new(),
            constellation: String::new(),
        })
    }

    fn corpus() -> Vec<Arc<CatalogObject>> {
        vec![
            obj("Str", 1, &["Vega"]),
            obj("M", 31, &["M31", "Andromeda"]),
            obj("Str", 2, &["Polaris"]),
        ]
    }

    fn names(objs: &[Arc<CatalogObject>]) -> Vec<String> {
        objs.iter().map(|o| o.display_name()).collect()
    }

    #[test]
    fn test_vega_by_digits() {
        let index = TextIndex::build(&corpus(), &KeypadLayout::device());
        assert_eq!(names(&index.search("1897")), vec!["Vega"]);
    }

    #[test]
    fn test_digits_pass_through() {
        let index = TextIndex::build(&corpus(), &KeypadLayout::device());
        assert_eq!(names(&index.search("531")), vec!["M31"]);
    }

    #[test]
    fn test_no_match() {
        let index = TextIndex::build(&corpus(), &KeypadLayout::device());
        assert!(index.search("9999").is_empty());
    }

    #[test]
    fn test_prefix_matches_second_name() {
        let index = TextIndex::build(&corpus(), &KeypadLayout::device());
        // "And" -> 758
        assert_eq!(names(&index.search("758")), vec!["M31"]);
    }

    #[test]
    fn test_object_reported_once_when_several_names_match() {
        let objects = vec![obj("NGC", 7000, &["North America", "North America Nebula"])];
        let index = TextIndex::build(&objects, &KeypadLayout::device());
        assert_eq!(index.search("5").len(), 1);
    }

    #[test]
    fn test_results_in_index_order() {
        let objects = vec![
            obj("M", 2, &["Mno"]),
            obj("M", 1, &["Mnp"]),
            obj("M", 3, &["Mn"]),
        ];
        let index = TextIndex::build(&objects, &KeypadLayout::device());
        let seqs: Vec<_> = index.search("55").iter().map(|o| o.sequence.clone()).collect();
        assert_eq!(
            seqs,
            vec![Sequence::Number(2), Sequence::Number(1), Sequence::Number(3)]
        );
    }

    #[test]
    fn test_empty_query_and_empty_index() {
        let index = TextIndex::build(&corpus(), &KeypadLayout::device());
        assert!(index.search("").is_empty());

        let empty = TextIndex::build(&[], &KeypadLayout::device());
        assert!(empty.is_empty());
        assert!(empty.search("1").is_empty());
    }

    #[test]
    fn test_alternate_layout() {
        // Telephone-style: v on 8, e on 3, g on 4, a on 2
        let mut groups = std::collections::BTreeMap::new();
        for (k, v) in [
            ("2", "abc"),
            ("3", "def"),
            ("4", "ghi"),
            ("5", "jkl"),
            ("6", "mno"),
            ("7", "pqrs"),
            ("8", "tuv"),
            ("9", "wxyz"),
            ("1", "'-+/"),
        ] {
            groups.insert(k.to_string(), v.to_string());
        }
        let phone = KeypadLayout::from_groups(groups).unwrap();
        let index = TextIndex::build(&corpus(), &phone);
        assert_eq!(names(&index.search("8342")), vec!["Vega"]);
        assert!(index.search("1897").is_empty());
    }
}
