//! Catalog selection, precedence and keypad configuration.
//!
//! Replaces module-level defaults with one explicit value handed to
//! [`crate::CatalogIndex::new`]. Stored as JSON so the configuration
//! collaborator can persist the user's catalog selection.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dedup::Precedence;
use crate::error::{CatalogError, CatalogResult};
use crate::filter::CatalogFilter;
use crate::keypad::KeypadLayout;

/// A known catalog and whether it participates in search by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

impl CatalogDefinition {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            selected: true,
        }
    }
}

/// Everything the catalog engine needs besides the catalog rows themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Known catalogs, in the order their objects are fed to deduplication
    pub catalogs: Vec<CatalogDefinition>,
    /// Dedup precedence per catalog code; unlisted codes score 0
    #[serde(default)]
    pub precedence: BTreeMap<String, i32>,
    #[serde(default)]
    pub keypad: KeypadLayout,
    /// Initial object filter; everything passes by default
    #[serde(default)]
    pub filter: CatalogFilter,
}

impl Default for CatalogConfig {
    /// The catalogs shipped with the device, all selected, Messier over NGC.
    fn default() -> Self {
        let catalogs = [
            ("M", "Messier"),
            ("NGC", "New General Catalogue"),
            ("IC", "Index Catalogue"),
            ("C", "Caldwell"),
            ("Col", "Collinder"),
            ("H", "Herschel 400"),
            ("Abl", "Abell Planetary Nebulae"),
            ("Sh2", "Sharpless HII regions"),
            ("TLK", "TLK 90 variable stars"),
            ("SaA", "RASC Saguaro Astronomy Club double stars"),
            ("Str", "Named stars"),
            ("EGC", "Extragalactic globular clusters"),
            ("RDS", "RASC double stars"),
            ("B", "Barnard dark nebulae"),
            ("Ta2", "Taurus 2"),
            ("WDS", "Washington Double Star catalog"),
            ("PL", "Planets"),
        ]
        .into_iter()
        .map(|(code, desc)| CatalogDefinition::new(code, desc))
        .collect();

        let precedence = [("M".to_string(), 2), ("NGC".to_string(), 1)]
            .into_iter()
            .collect();

        Self {
            catalogs,
            precedence,
            keypad: KeypadLayout::device(),
            filter: CatalogFilter::default(),
        }
    }
}

impl CatalogConfig {
    /// Check catalog codes are unique and every precedence entry names a
    /// declared catalog. Keypad validity is enforced when it is deserialized.
    ///
    /// # Errors
    /// [`CatalogError::DuplicateCatalog`] or [`CatalogError::UnknownCatalog`].
    pub fn validate(&self) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for def in &self.catalogs {
            if !seen.insert(def.code.as_str()) {
                return Err(CatalogError::DuplicateCatalog(def.code.clone()));
            }
        }

        for code in self.precedence.keys() {
            if !seen.contains(code.as_str()) {
                return Err(CatalogError::UnknownCatalog(code.clone()));
            }
        }

        Ok(())
    }

    /// Precedence table for the deduplicator.
    pub fn precedence(&self) -> Precedence {
        Precedence::new(self.precedence.clone())
    }

    /// Codes selected by default.
    pub fn selected_codes(&self) -> Vec<&str> {
        self.catalogs
            .iter()
            .filter(|def| def.selected)
            .map(|def| def.code.as_str())
            .collect()
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> CatalogResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate.
    pub fn load_from_file(path: &Path) -> CatalogResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
