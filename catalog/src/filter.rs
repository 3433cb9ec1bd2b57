//! Object filter applied to selected catalogs before deduplication.
//!
//! Catalog selection decides which catalogs take part in search; the filter
//! narrows their members further. Objects that fail it are left out of the
//! next snapshot, so they vanish from both nearest and digit search.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::object::CatalogObject;

/// Criteria an object must meet to be indexed.
///
/// The default filter lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// Accepted object types (e.g. "Gx", "OC"). `None` accepts any type;
    /// an empty set accepts none.
    #[serde(default)]
    pub object_types: Option<BTreeSet<String>>,
}

impl CatalogFilter {
    /// Filter accepting only the listed object types.
    pub fn with_object_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_types: Some(types.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.object_types.is_none()
    }

    /// Whether `obj` passes every criterion.
    pub fn matches(&self, obj: &CatalogObject) -> bool {
        self.object_types
            .as_ref()
            .map_or(true, |types| types.contains(&obj.object_type))
    }

    /// Keep the objects that pass, preserving order.
    pub fn apply(&self, mut objects: Vec<Arc<CatalogObject>>) -> Vec<Arc<CatalogObject>> {
        if !self.is_unrestricted() {
            objects.retain(|obj| self.matches(obj));
        }
        objects
    }
}
