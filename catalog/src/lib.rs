//! Catalog matching and search engine for a plate-solving telescope finder.
//!
//! Holds a deduplicated, cross-referenced registry of objects drawn from
//! several overlapping catalogs and answers two live queries: which objects
//! are nearest a sky position, and which objects match a keypad digit
//! sequence typed by the observer.
//!
//! # Data flow
//!
//! ```text
//! CatalogRow ─▶ CatalogStore ─(selection, filter)─▶ deduplicate
//!                                                     │
//!                               ┌─────────────────────┴───────┐
//!                               ▼                             ▼
//!                         SpatialIndex                   TextIndex
//!                               └──────────▶ IndexSnapshot ◀──┘
//!                                                 │ (atomic swap)
//!                                            CatalogIndex
//! ```
//!
//! # Example
//!
//! ```
//! use catalog::{CatalogConfig, CatalogIndex, CatalogRow, Sequence};
//!
//! let index = CatalogIndex::new(CatalogConfig::default()).unwrap();
//! index.load_rows(vec![CatalogRow {
//!     catalog_code: "Str".to_string(),
//!     sequence: Sequence::Number(1),
//!     ra_deg: 279.23,
//!     dec_deg: 38.78,
//!     object_id: "vega".to_string(),
//!     names: vec!["Vega".to_string()],
//!     object_type: "*".to_string(),
//!     constellation: "Lyr".to_string(),
//! }]);
//! index.rebuild();
//!
//! assert_eq!(index.search_by_digits("1897")[0].display_name(), "Vega");
//! assert_eq!(index.nearest(280.0, 40.0, 1).len(), 1);
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod index;
pub mod keypad;
pub mod nearby;
pub mod object;
pub mod rebuild;
pub mod spatial;
pub mod store;
pub mod text;

pub use config::{CatalogConfig, CatalogDefinition};
pub use dedup::{deduplicate, Precedence};
pub use error::{CatalogError, CatalogResult};
pub use filter::CatalogFilter;
pub use index::{BuildReport, CatalogIndex, IndexSnapshot};
pub use keypad::KeypadLayout;
pub use nearby::NearbyRefresh;
pub use object::{CatalogObject, CatalogRow, ObjectId, Sequence};
pub use rebuild::RebuildWorker;
pub use spatial::{angular_separation_deg, SpatialIndex};
pub use store::{Catalog, CatalogStore, LoadReport};
pub use text::TextIndex;
