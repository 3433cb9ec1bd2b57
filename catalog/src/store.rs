//! Per-catalog object storage and selection flags.
//!
//! The only query served here is the free-text name search, which sees every
//! catalog. The store keeps catalogs in declaration order so that the objects
//! handed to deduplication arrive in a stable order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::CatalogDefinition;
use crate::error::{CatalogError, CatalogResult};
use crate::object::{CatalogObject, CatalogRow, Sequence};

/// A named group of objects sharing one catalog code.
#[derive(Debug, Clone)]
pub struct Catalog {
    code: String,
    description: String,
    selected: bool,
    /// Members sorted by sequence
    objects: Vec<Arc<CatalogObject>>,
}

impl Catalog {
    pub fn new(code: impl Into<String>, description: impl Into<String>, selected: bool) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            selected,
            objects: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Current members, ordered by sequence.
    pub fn objects(&self) -> &[Arc<CatalogObject>] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up a member by its sequence.
    pub fn get(&self, sequence: &Sequence) -> Option<&Arc<CatalogObject>> {
        self.objects
            .binary_search_by(|o| o.sequence.cmp(sequence))
            .ok()
            .map(|i| &self.objects[i])
    }

    fn replace_objects(&mut self, mut objects: Vec<Arc<CatalogObject>>) {
        objects.sort_by(|a, b| a.sequence.cmp(&b.sequence));
        self.objects = objects;
    }
}

/// Outcome of [`CatalogStore::load_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows accepted into a catalog
    pub loaded: usize,
    /// Rows naming a catalog that is not declared
    pub unknown_catalog: usize,
    /// Rows repeating an earlier `(catalog_code, sequence)`
    pub duplicate_sequence: usize,
    /// Rows failing ingestion checks
    pub invalid: usize,
}

impl LoadReport {
    pub fn rejected(&self) -> usize {
        self.unknown_catalog + self.duplicate_sequence + self.invalid
    }
}

/// All declared catalogs, keyed by code.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    catalogs: Vec<Catalog>,
    position: HashMap<String, usize>,
}

impl CatalogStore {
    /// Create empty catalogs for every definition.
    ///
    /// # Errors
    /// [`CatalogError::DuplicateCatalog`] if a code is declared twice.
    pub fn new(definitions: &[CatalogDefinition]) -> CatalogResult<Self> {
        let mut store = Self::default();
        for def in definitions {
            store.add(Catalog::new(&def.code, &def.description, def.selected))?;
        }
        Ok(store)
    }

    /// Register an additional catalog.
    pub fn add(&mut self, catalog: Catalog) -> CatalogResult<()> {
        if self.position.contains_key(catalog.code()) {
            return Err(CatalogError::DuplicateCatalog(catalog.code().to_string()));
        }
        self.position
            .insert(catalog.code().to_string(), self.catalogs.len());
        self.catalogs.push(catalog);
        Ok(())
    }

    /// Replace every catalog's members with the given rows.
    ///
    /// Catalogs with no rows end up empty. Rows for undeclared catalogs,
    /// repeated sequences, and rows failing [`CatalogObject::from_row`] are
    /// skipped and counted in the returned report.
    pub fn load_rows(&mut self, rows: impl IntoIterator<Item = CatalogRow>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut members: Vec<Vec<Arc<CatalogObject>>> = vec![Vec::new(); self.catalogs.len()];
        let mut seen: HashSet<(String, Sequence)> = HashSet::new();

        for row in rows {
            let obj = match CatalogObject::from_row(row) {
                Ok(obj) => obj,
                Err(e) => {
                    warn!("Skipping row: {e}");
                    report.invalid += 1;
                    continue;
                }
            };

            let Some(&pos) = self.position.get(&obj.catalog_code) else {
                debug!("Skipping {}: catalog not declared", obj.designation());
                report.unknown_catalog += 1;
                continue;
            };

            if !seen.insert((obj.catalog_code.clone(), obj.sequence.clone())) {
                warn!("Duplicate sequence {} ignored", obj.designation());
                report.duplicate_sequence += 1;
                continue;
            }

            members[pos].push(Arc::new(obj));
            report.loaded += 1;
        }

        for (catalog, objects) in self.catalogs.iter_mut().zip(members) {
            catalog.replace_objects(objects);
        }

        if report.unknown_catalog > 0 {
            warn!(
                "{} rows referenced undeclared catalogs",
                report.unknown_catalog
            );
        }
        report
    }

    /// Update a catalog's selection flag.
    ///
    /// Returns whether the flag changed.
    pub fn set_selected(&mut self, code: &str, selected: bool) -> CatalogResult<bool> {
        let catalog = self
            .get_mut(code)
            .ok_or_else(|| CatalogError::UnknownCatalog(code.to_string()))?;
        let changed = catalog.is_selected() != selected;
        catalog.set_selected(selected);
        Ok(changed)
    }

    pub fn select_all(&mut self) {
        self.catalogs.iter_mut().for_each(|c| c.set_selected(true));
    }

    pub fn select_none(&mut self) {
        self.catalogs.iter_mut().for_each(|c| c.set_selected(false));
    }

    pub fn get(&self, code: &str) -> Option<&Catalog> {
        self.position.get(code).map(|&i| &self.catalogs[i])
    }

    fn get_mut(&mut self, code: &str) -> Option<&mut Catalog> {
        self.position.get(code).map(|&i| &mut self.catalogs[i])
    }

    pub fn get_object(&self, code: &str, sequence: &Sequence) -> Option<&Arc<CatalogObject>> {
        self.get(code)?.get(sequence)
    }

    pub fn catalogs(&self) -> impl Iterator<Item = &Catalog> {
        self.catalogs.iter()
    }

    pub fn codes(&self, only_selected: bool) -> Vec<&str> {
        self.catalogs
            .iter()
            .filter(|c| !only_selected || c.is_selected())
            .map(Catalog::code)
            .collect()
    }

    /// Objects of selected catalogs, in catalog declaration order.
    pub fn selected_objects(&self) -> Vec<Arc<CatalogObject>> {
        self.catalogs
            .iter()
            .filter(|c| c.is_selected())
            .flat_map(|c| c.objects().iter().cloned())
            .collect()
    }

    /// Total objects across all catalogs, selected or not.
    pub fn object_count(&self) -> usize {
        self.catalogs.iter().map(Catalog::len).sum()
    }

    /// Objects with a display name containing `text`, ignoring case.
    ///
    /// Looks through every catalog regardless of selection, without
    /// deduplication, so an object listed in two catalogs is returned once
    /// per catalog. Blank text matches nothing.
    pub fn search_by_name(&self, text: &str) -> Vec<Arc<CatalogObject>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.catalogs
            .iter()
            .flat_map(|c| c.objects().iter())
            .filter(|obj| {
                obj.names
                    .iter()
                    .any(|name| name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<CatalogDefinition> {
        vec![
            CatalogDefinition::new("M", "Messier"),
            CatalogDefinition::new("NGC", "New General Catalogue"),
        ]
    }

    fn row(code: &str, seq: u64, object_id: &str) -> CatalogRow {
        CatalogRow {
            catalog_code: code.to_string(),
            sequence: Sequence::Number(seq),
            ra_deg: 0.0,
            dec_deg: 0.0,
            object_id: object_id.to_string(),
            names: vec![],
            object_type: String::new(),
            constellation: String::new(),
        }
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let mut defs = definitions();
        defs.push(CatalogDefinition::new("M", "dup"));
        assert!(matches!(
            CatalogStore::new(&defs),
            Err(CatalogError::DuplicateCatalog(_))
        ));
    }

    #[test]
    fn test_load_rows_sorts_and_reports() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        let report = store.load_rows(vec![
            row("M", 31, "224"),
            row("M", 1, "1952"),
            row("NGC", 224, "224"),
            row("XYZ", 1, "9"),
            row("M", 31, "dup"),
            row(" ", 5, "5"),
        ]);

        assert_eq!(report.loaded, 3);
        assert_eq!(report.unknown_catalog, 1);
        assert_eq!(report.duplicate_sequence, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.rejected(), 3);

        let m = store.get("M").unwrap();
        let seqs: Vec<_> = m.objects().iter().map(|o| o.sequence.clone()).collect();
        assert_eq!(seqs, vec![Sequence::Number(1), Sequence::Number(31)]);
        assert_eq!(store.object_count(), 3);
    }

    #[test]
    fn test_reload_replaces_wholesale() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        store.load_rows(vec![row("M", 1, "a"), row("NGC", 2, "b")]);
        store.load_rows(vec![row("M", 3, "c")]);

        assert_eq!(store.get("M").unwrap().len(), 1);
        assert!(store.get("NGC").unwrap().is_empty());
        assert!(store.get_object("M", &Sequence::Number(1)).is_none());
        assert!(store.get_object("M", &Sequence::Number(3)).is_some());
    }

    #[test]
    fn test_selection() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        store.load_rows(vec![row("M", 1, "a"), row("NGC", 2, "b")]);

        assert!(store.set_selected("NGC", false).unwrap());
        assert!(!store.set_selected("NGC", false).unwrap());
        assert_eq!(store.codes(true), vec!["M"]);
        assert_eq!(store.codes(false), vec!["M", "NGC"]);
        assert_eq!(store.selected_objects().len(), 1);

        store.select_none();
        assert!(store.selected_objects().is_empty());
        store.select_all();
        assert_eq!(store.selected_objects().len(), 2);
    }

    #[test]
    fn test_search_by_name_ignores_selection() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        let mut m31 = row("M", 31, "224");
        m31.names = vec!["Andromeda Galaxy".to_string()];
        let mut ngc224 = row("NGC", 224, "224");
        ngc224.names = vec!["NGC 224".to_string(), "andromeda".to_string()];
        store.load_rows(vec![ngc224, m31, row("M", 1, "1952")]);
        store.set_selected("M", false).unwrap();

        let found: Vec<_> = store
            .search_by_name("ANDROMEDA")
            .iter()
            .map(|o| o.designation())
            .collect();
        assert_eq!(found, vec!["M 31", "NGC 224"]);
        assert!(store.search_by_name("  ").is_empty());
    }

    #[test]
    fn test_unknown_selection_code() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        assert!(matches!(
            store.set_selected("Q", true),
            Err(CatalogError::UnknownCatalog(_))
        ));
    }

    #[test]
    fn test_selected_objects_follow_declaration_order() {
        let mut store = CatalogStore::new(&definitions()).unwrap();
        store.load_rows(vec![row("NGC", 224, "224"), row("M", 31, "224")]);
        let codes: Vec<_> = store
            .selected_objects()
            .iter()
            .map(|o| o.catalog_code.clone())
            .collect();
        assert_eq!(codes, vec!["M", "NGC"]);
    }
}
