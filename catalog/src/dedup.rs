//! Merge catalog entries that describe the same physical object.
//!
//! Many deep-sky objects appear in several catalogs (M 31 is also NGC 224).
//! [`deduplicate`] keeps one representative per [`ObjectId`], chosen by a
//! configurable [`Precedence`] table.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::object::{CatalogObject, ObjectId};

/// Dedup priority per catalog code. Codes absent from the table score 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precedence {
    scores: BTreeMap<String, i32>,
}

impl Precedence {
    pub fn new(scores: BTreeMap<String, i32>) -> Self {
        Self { scores }
    }

    pub fn score(&self, catalog_code: &str) -> i32 {
        self.scores.get(catalog_code).copied().unwrap_or(0)
    }
}

impl<S: Into<String>> FromIterator<(S, i32)> for Precedence {
    fn from_iter<I: IntoIterator<Item = (S, i32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Keep one object per `object_id`.
///
/// The first object seen for an id survives unless a later one has a
/// strictly higher precedence score; equal scores never displace the
/// incumbent. Survivors keep the position of the first entry seen for
/// their id, so the output order is stable for a given input order.
///
/// Running this on its own output returns the same list.
pub fn deduplicate(
    objects: &[Arc<CatalogObject>],
    precedence: &Precedence,
) -> Vec<Arc<CatalogObject>> {
    let mut slot_for_id: HashMap<&ObjectId, usize> = HashMap::with_capacity(objects.len());
    let mut survivors: Vec<(Arc<CatalogObject>, i32)> = Vec::with_capacity(objects.len());

    for obj in objects {
        let score = precedence.score(&obj.catalog_code);
        match slot_for_id.get(&obj.object_id) {
            None => {
                slot_for_id.insert(&obj.object_id, survivors.len());
                survivors.push((Arc::clone(obj), score));
            }
            Some(&slot) => {
                if score > survivors[slot].1 {
                    survivors[slot] = (Arc::clone(obj), score);
                }
            }
        }
    }

    survivors.into_iter().map(|(obj, _)| obj).collect()
}
