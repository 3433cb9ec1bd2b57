//! The catalog facade: selection state, rebuilds, and the query surface.
//!
//! Readers query an immutable [`IndexSnapshot`] published through an
//! `ArcSwapOption`. A rebuild filters and deduplicates the selected catalogs,
//! builds the spatial and text indices in parallel, and swaps the new
//! snapshot in. A query in flight keeps the `Arc` it loaded, so it always
//! sees one complete snapshot and never blocks on a rebuild.
//!
//! Selection, filter and row changes bump a data generation while the writer
//! lock is held, so the generation a rebuild reads always describes the data
//! it reads. A snapshot records that generation; publishing never replaces a
//! snapshot with one built from older data, so when two rebuilds overlap the
//! newer request wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use log::{debug, info};

use crate::config::CatalogConfig;
use crate::dedup::{deduplicate, Precedence};
use crate::error::CatalogResult;
use crate::filter::CatalogFilter;
use crate::keypad::KeypadLayout;
use crate::object::{CatalogObject, CatalogRow, Sequence};
use crate::spatial::SpatialIndex;
use crate::store::{CatalogStore, LoadReport};
use crate::text::TextIndex;

/// Summary of one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Data generation the snapshot reflects
    pub generation: u64,
    /// Objects from selected catalogs that passed the filter
    pub candidates: usize,
    /// Objects from selected catalogs rejected by the filter
    pub filtered_out: usize,
    /// Objects remaining after deduplication
    pub deduplicated: usize,
    /// Entries folded into another catalog's representative
    pub duplicates_merged: usize,
    /// Objects left out of the spatial index for invalid coordinates
    pub excluded_coordinates: usize,
    pub elapsed: Duration,
}

/// One consistent pair of indices over a deduplicated object set.
#[derive(Debug)]
pub struct IndexSnapshot {
    objects: Vec<Arc<CatalogObject>>,
    spatial: SpatialIndex,
    text: TextIndex,
    report: BuildReport,
}

impl IndexSnapshot {
    fn build(
        selected: Vec<Arc<CatalogObject>>,
        filter: &CatalogFilter,
        precedence: &Precedence,
        keypad: &KeypadLayout,
        generation: u64,
    ) -> Self {
        let start = Instant::now();
        let selected_count = selected.len();
        let objects = filter.apply(selected);
        let deduplicated = deduplicate(&objects, precedence);

        let (spatial, text) = rayon::join(
            || SpatialIndex::build(&deduplicated),
            || TextIndex::build(&deduplicated, keypad),
        );

        let report = BuildReport {
            generation,
            candidates: objects.len(),
            filtered_out: selected_count - objects.len(),
            deduplicated: deduplicated.len(),
            duplicates_merged: objects.len() - deduplicated.len(),
            excluded_coordinates: spatial.excluded(),
            elapsed: start.elapsed(),
        };

        Self {
            objects: deduplicated,
            spatial,
            text,
            report,
        }
    }

    /// Deduplicated objects, in catalog declaration order.
    pub fn objects(&self) -> &[Arc<CatalogObject>] {
        &self.objects
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn generation(&self) -> u64 {
        self.report.generation
    }

    /// See [`SpatialIndex::query`].
    pub fn nearest(&self, ra_deg: f64, dec_deg: f64, n: usize) -> Vec<Arc<CatalogObject>> {
        self.spatial.query(ra_deg, dec_deg, n)
    }

    /// See [`SpatialIndex::query_with_distance`].
    pub fn nearest_with_distance(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        n: usize,
    ) -> Vec<(Arc<CatalogObject>, f64)> {
        self.spatial.query_with_distance(ra_deg, dec_deg, n)
    }

    /// See [`TextIndex::search`].
    pub fn search_by_digits(&self, digits: &str) -> Vec<Arc<CatalogObject>> {
        self.text.search(digits)
    }
}

/// State touched only by writers.
#[derive(Debug)]
struct WriterState {
    store: CatalogStore,
    filter: CatalogFilter,
    precedence: Precedence,
    keypad: KeypadLayout,
}

/// Owns the catalogs, their selection, and the published index snapshot.
///
/// All methods take `&self`; share it between the UI, the solver, and a
/// [`crate::RebuildWorker`] through an `Arc`.
#[derive(Debug)]
pub struct CatalogIndex {
    writer: Mutex<WriterState>,
    /// Serializes the compare-and-publish step of concurrent rebuilds
    publish: Mutex<()>,
    snapshot: ArcSwapOption<IndexSnapshot>,
    data_generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CatalogIndex {
    /// Create an unbuilt index with empty catalogs.
    ///
    /// # Errors
    /// Configuration errors from [`CatalogConfig::validate`].
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        config.validate()?;
        let store = CatalogStore::new(&config.catalogs)?;
        let precedence = config.precedence();

        Ok(Self {
            writer: Mutex::new(WriterState {
                store,
                filter: config.filter,
                precedence,
                keypad: config.keypad,
            }),
            publish: Mutex::new(()),
            snapshot: ArcSwapOption::empty(),
            data_generation: AtomicU64::new(0),
        })
    }

    /// Bump the data generation. Borrowing the writer state ties the bump
    /// to the lock scope of the change it records.
    fn mark_stale(&self, _writer: &WriterState) -> u64 {
        self.data_generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Replace all catalog contents. Indices go stale until the next rebuild.
    pub fn load_rows(&self, rows: impl IntoIterator<Item = CatalogRow>) -> LoadReport {
        let report = {
            let mut writer = lock(&self.writer);
            let report = writer.store.load_rows(rows);
            self.mark_stale(&writer);
            report
        };
        info!(
            "Loaded {} catalog rows ({} rejected)",
            report.loaded,
            report.rejected()
        );
        report
    }

    /// Include or exclude a catalog from search.
    ///
    /// The change is visible to queries after the next completed rebuild.
    ///
    /// # Errors
    /// [`crate::CatalogError::UnknownCatalog`] if `catalog_code` is not declared.
    pub fn set_selection(&self, catalog_code: &str, selected: bool) -> CatalogResult<()> {
        let mut writer = lock(&self.writer);
        if writer.store.set_selected(catalog_code, selected)? {
            let generation = self.mark_stale(&writer);
            debug!("Catalog {catalog_code} selected={selected} (generation {generation})");
        }
        Ok(())
    }

    pub fn select_all(&self) {
        let mut writer = lock(&self.writer);
        writer.store.select_all();
        self.mark_stale(&writer);
    }

    pub fn select_none(&self) {
        let mut writer = lock(&self.writer);
        writer.store.select_none();
        self.mark_stale(&writer);
    }

    /// Replace the object filter. Like selection, it takes effect at the
    /// next completed rebuild.
    pub fn set_filter(&self, filter: CatalogFilter) {
        let mut writer = lock(&self.writer);
        if writer.filter != filter {
            writer.filter = filter;
            let generation = self.mark_stale(&writer);
            debug!("Object filter changed (generation {generation})");
        }
    }

    pub fn filter(&self) -> CatalogFilter {
        lock(&self.writer).filter.clone()
    }

    /// Catalog codes, optionally only those currently selected.
    pub fn catalog_codes(&self, only_selected: bool) -> Vec<String> {
        lock(&self.writer)
            .store
            .codes(only_selected)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Look up one object by designation, selected or not.
    pub fn get_object(&self, catalog_code: &str, sequence: &Sequence) -> Option<Arc<CatalogObject>> {
        lock(&self.writer)
            .store
            .get_object(catalog_code, sequence)
            .cloned()
    }

    /// Build fresh indices from the selected catalogs and publish them.
    ///
    /// Returns the report of the snapshot built by this call. If a rebuild
    /// over newer data published first, this snapshot is discarded.
    pub fn rebuild(&self) -> BuildReport {
        let (objects, filter, precedence, keypad, generation) = {
            let writer = lock(&self.writer);
            (
                writer.store.selected_objects(),
                writer.filter.clone(),
                writer.precedence.clone(),
                writer.keypad.clone(),
                self.data_generation.load(Ordering::Acquire),
            )
        };

        let snapshot = Arc::new(IndexSnapshot::build(
            objects,
            &filter,
            &precedence,
            &keypad,
            generation,
        ));
        let report = snapshot.report().clone();

        if self.publish(snapshot) {
            info!(
                "Rebuilt catalog index: {} objects from {} candidates ({} filtered, {} merged, {} excluded) in {:?}",
                report.deduplicated,
                report.candidates,
                report.filtered_out,
                report.duplicates_merged,
                report.excluded_coordinates,
                report.elapsed
            );
        } else {
            debug!("Discarding index built from generation {generation}");
        }

        report
    }

    /// Swap in `snapshot` unless the published one reflects newer data.
    fn publish(&self, snapshot: Arc<IndexSnapshot>) -> bool {
        let _guard = lock(&self.publish);
        let newer_published = self
            .snapshot
            .load_full()
            .is_some_and(|current| current.generation() > snapshot.generation());
        if !newer_published {
            self.snapshot.store(Some(snapshot));
        }
        !newer_published
    }

    /// True once any rebuild has published a snapshot.
    pub fn is_built(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// True if the published snapshot predates the latest change.
    pub fn is_stale(&self) -> bool {
        let current = self.data_generation.load(Ordering::Acquire);
        self.snapshot
            .load_full()
            .map_or(true, |s| s.generation() < current)
    }

    /// Generation of the most recent selection or data change.
    pub fn data_generation(&self) -> u64 {
        self.data_generation.load(Ordering::Acquire)
    }

    /// The currently published snapshot, for several consistent queries.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.load_full()
    }

    /// Number of objects in the published snapshot.
    pub fn object_count(&self) -> usize {
        self.snapshot().map_or(0, |s| s.objects().len())
    }

    /// The `n` nearest objects to (`ra_deg`, `dec_deg`); `n == 0` means all.
    ///
    /// Empty before the first rebuild.
    pub fn nearest(&self, ra_deg: f64, dec_deg: f64, n: usize) -> Vec<Arc<CatalogObject>> {
        self.snapshot()
            .map(|s| s.nearest(ra_deg, dec_deg, n))
            .unwrap_or_default()
    }

    /// [`CatalogIndex::nearest`] paired with separations in degrees.
    pub fn nearest_with_distance(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        n: usize,
    ) -> Vec<(Arc<CatalogObject>, f64)> {
        self.snapshot()
            .map(|s| s.nearest_with_distance(ra_deg, dec_deg, n))
            .unwrap_or_default()
    }

    /// Objects with a name whose keypad digit string starts with `digits`.
    ///
    /// Empty before the first rebuild.
    pub fn search_by_digits(&self, digits: &str) -> Vec<Arc<CatalogObject>> {
        self.snapshot()
            .map(|s| s.search_by_digits(digits))
            .unwrap_or_default()
    }

    /// Case-insensitive substring search over display names.
    ///
    /// Unlike the indexed queries this reads the loaded catalogs directly:
    /// it covers deselected catalogs, ignores the filter, skips
    /// deduplication, and needs no rebuild. See
    /// [`CatalogStore::search_by_name`].
    pub fn search_by_name(&self, text: &str) -> Vec<Arc<CatalogObject>> {
        lock(&self.writer).store.search_by_name(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogDefinition;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn config() -> CatalogConfig {
        CatalogConfig {
            catalogs: vec![
                CatalogDefinition::new("M", "Messier"),
                CatalogDefinition::new("NGC", "New General Catalogue"),
                CatalogDefinition::new("Str", "Named stars"),
            ],
            precedence: BTreeMap::from([("M".to_string(), 2), ("NGC".to_string(), 1)]),
            keypad: KeypadLayout::device(),
            filter: CatalogFilter::default(),
        }
    }

    fn row(code: &str, seq: u64, id: &str, ra: f64, dec: f64, names: &[&str]) -> CatalogRow {
        CatalogRow {
            catalog_code: code.to_string(),
            sequence: Sequence::Number(seq),
            ra_deg: ra,
            dec_deg: dec,
            object_id: id.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            object_type: String::new(),
            constellation: String::new(),
        }
    }

    fn rows() -> Vec<CatalogRow> {
        let mut rows = vec![
            row("NGC", 224, "224", 10.68, 41.27, &["NGC 224", "Andromeda"]),
            row("M", 31, "224", 10.68, 41.27, &["M31", "Andromeda"]),
            row("NGC", 7000, "7000", 314.7, 44.3, &["North America"]),
            row("Str", 1, "vega", 279.23, 38.78, &["Vega"]),
            row("Str", 2, "polaris", 37.95, 89.26, &["Polaris"]),
        ];
        for (r, object_type) in rows.iter_mut().zip(["Gx", "Gx", "Nb", "*", "*"]) {
            r.object_type = object_type.to_string();
        }
        rows
    }

    fn designations(objs: &[Arc<CatalogObject>]) -> Vec<String> {
        objs.iter().map(|o| o.designation()).collect()
    }

    #[test]
    fn test_unbuilt_queries_are_empty() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        assert!(!index.is_built());
        assert!(index.is_stale());
        assert!(index.nearest(0.0, 0.0, 5).is_empty());
        assert!(index.search_by_digits("1897").is_empty());
        assert_eq!(index.object_count(), 0);
    }

    #[test]
    fn test_rebuild_dedups_and_reports() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        let report = index.rebuild();

        assert!(index.is_built());
        assert!(!index.is_stale());
        assert_eq!(report.candidates, 5);
        assert_eq!(report.filtered_out, 0);
        assert_eq!(report.deduplicated, 4);
        assert_eq!(report.duplicates_merged, 1);
        assert_eq!(report.excluded_coordinates, 0);

        // "And" on the keypad
        let andromeda = index.search_by_digits("758");
        assert_eq!(designations(&andromeda), vec!["M 31"]);
    }

    #[test]
    fn test_selection_change_needs_rebuild() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();
        assert_eq!(index.search_by_digits("1897").len(), 1);

        index.set_selection("Str", false).unwrap();
        assert!(index.is_stale());
        // Old snapshot still served until the rebuild completes
        assert_eq!(index.search_by_digits("1897").len(), 1);

        index.rebuild();
        assert!(index.search_by_digits("1897").is_empty());
        assert!(index
            .nearest(0.0, 0.0, 0)
            .iter()
            .all(|o| o.catalog_code != "Str"));
    }

    #[test]
    fn test_deselecting_precedent_catalog_exposes_other_entry() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.set_selection("M", false).unwrap();
        index.rebuild();

        let andromeda = index.search_by_digits("758");
        assert_eq!(designations(&andromeda), vec!["NGC 224"]);
    }

    #[test]
    fn test_name_search_sees_deselected_catalogs() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        // Served straight from the loaded catalogs, before any rebuild
        assert_eq!(designations(&index.search_by_name("vega")), vec!["Str 1"]);

        index.set_selection("Str", false).unwrap();
        index.rebuild();
        assert!(index.search_by_digits("1897").is_empty());
        assert_eq!(designations(&index.search_by_name("vega")), vec!["Str 1"]);
        // No deduplication: both Andromeda entries are listed
        assert_eq!(
            designations(&index.search_by_name("andromeda")),
            vec!["M 31", "NGC 224"]
        );
    }

    #[test]
    fn test_filtered_type_leaves_indexed_queries() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();
        assert_eq!(designations(&index.search_by_digits("1897")), vec!["Str 1"]);

        index.set_filter(CatalogFilter::with_object_types(["Gx", "Nb"]));
        assert!(index.is_stale());
        assert_eq!(index.search_by_digits("1897").len(), 1);

        let report = index.rebuild();
        assert_eq!(report.filtered_out, 2);
        assert_eq!(report.candidates, 3);
        assert!(index.search_by_digits("1897").is_empty());
        assert!(index
            .nearest(0.0, 0.0, 0)
            .iter()
            .all(|o| o.object_type != "*"));
        assert_eq!(designations(&index.nearest(279.0, 38.8, 1)), vec!["NGC 7000"]);
        assert_eq!(designations(&index.search_by_name("vega")), vec!["Str 1"]);

        // Same filter again is not a change
        index.set_filter(CatalogFilter::with_object_types(["Nb", "Gx"]));
        assert!(!index.is_stale());

        index.set_filter(CatalogFilter::default());
        index.rebuild();
        assert_eq!(index.object_count(), 4);
    }

    #[test]
    fn test_snapshot_contents_match_their_generation() {
        let index = Arc::new(CatalogIndex::new(config()).unwrap());
        // Generation 1 with Str selected; each toggle below adds one, so Str
        // is selected exactly when the generation is odd.
        index.load_rows(rows());
        let stop = Arc::new(AtomicBool::new(false));

        let rebuilders: Vec<_> = (0..2)
            .map(|_| {
                let index = Arc::clone(&index);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        index.rebuild();
                        if let Some(snapshot) = index.snapshot() {
                            let has_stars = snapshot
                                .objects()
                                .iter()
                                .any(|o| o.catalog_code == "Str");
                            assert_eq!(
                                has_stars,
                                snapshot.generation() % 2 == 1,
                                "generation {}",
                                snapshot.generation()
                            );
                        }
                    }
                })
            })
            .collect();

        for i in 0..300 {
            index.set_selection("Str", i % 2 == 1).unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        for rebuilder in rebuilders {
            rebuilder.join().unwrap();
        }

        index.rebuild();
        let snapshot = index.snapshot().unwrap();
        assert_eq!(snapshot.generation(), 301);
        assert!(snapshot.objects().iter().any(|o| o.catalog_code == "Str"));
    }

    #[test]
    fn test_unknown_selection_code() {
        let index = CatalogIndex::new(config()).unwrap();
        assert!(index.set_selection("XX", true).is_err());
        assert_eq!(index.data_generation(), 0);
    }

    #[test]
    fn test_unchanged_selection_does_not_go_stale() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();
        index.set_selection("M", true).unwrap();
        assert!(!index.is_stale());
    }

    #[test]
    fn test_snapshot_survives_rebuild() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();
        let before = index.snapshot().unwrap();

        index.select_none();
        index.rebuild();

        assert_eq!(before.objects().len(), 4);
        assert_eq!(index.object_count(), 0);
        assert!(index.nearest(10.0, 40.0, 3).is_empty());
    }

    #[test]
    fn test_older_build_never_replaces_newer() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();
        let generation = index.data_generation();

        let late = Arc::new(IndexSnapshot::build(
            Vec::new(),
            &CatalogFilter::default(),
            &Precedence::default(),
            &KeypadLayout::device(),
            generation - 1,
        ));
        assert!(!index.publish(late));
        assert_eq!(index.object_count(), 4);

        let same = Arc::new(IndexSnapshot::build(
            Vec::new(),
            &CatalogFilter::default(),
            &Precedence::default(),
            &KeypadLayout::device(),
            generation,
        ));
        assert!(index.publish(same));
        assert_eq!(index.object_count(), 0);
    }

    #[test]
    fn test_nearest_with_distance() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.rebuild();

        let result = index.nearest_with_distance(279.0, 38.8, 2);
        assert_eq!(result[0].0.display_name(), "Vega");
        assert!(result[0].1 < 0.5);
        assert!(result[0].1 <= result[1].1);
    }

    #[test]
    fn test_get_object_ignores_selection() {
        let index = CatalogIndex::new(config()).unwrap();
        index.load_rows(rows());
        index.set_selection("NGC", false).unwrap();
        let obj = index.get_object("NGC", &Sequence::Number(7000)).unwrap();
        assert_eq!(obj.display_name(), "North America");
        assert_eq!(index.catalog_codes(true), vec!["M", "Str"]);
    }
}
