//! Catalog object records and their typed ingestion from raw rows.
//!
//! A [`CatalogObject`] is identified by `(catalog_code, sequence)` and carries
//! an [`ObjectId`] shared by every catalog entry describing the same physical
//! object. Objects are immutable once ingested and are shared as
//! `Arc<CatalogObject>` between the store and the index snapshots.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Position of an object within its catalog, e.g. the `31` in "M 31".
///
/// Most catalogs number their entries; a few use free-form labels. Numbers
/// order before labels so mixed catalogs still sort deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sequence {
    Number(u64),
    Label(String),
}

impl Ord for Sequence {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Sequence::Number(a), Sequence::Number(b)) => a.cmp(b),
            (Sequence::Number(_), Sequence::Label(_)) => Ordering::Less,
            (Sequence::Label(_), Sequence::Number(_)) => Ordering::Greater,
            (Sequence::Label(a), Sequence::Label(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Sequence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Number(n) => write!(f, "{n}"),
            Sequence::Label(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for Sequence {
    fn from(n: u64) -> Self {
        Sequence::Number(n)
    }
}

impl From<&str> for Sequence {
    fn from(s: &str) -> Self {
        Sequence::Label(s.to_string())
    }
}

/// Cross-catalog identity grouping entries that describe one physical object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Prefix reserved for ids minted for rows that arrive without one.
    const VIRTUAL_PREFIX: char = '~';

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint an id for an object that has no cross-catalog identity.
    ///
    /// Virtual ids embed the catalog code and sequence so they never
    /// collide with each other. Supplied ids may not use the reserved
    /// prefix; [`CatalogObject::from_row`] rejects them.
    pub fn virtual_for(catalog_code: &str, sequence: &Sequence) -> Self {
        Self(format!("{}{catalog_code}:{sequence}", Self::VIRTUAL_PREFIX))
    }

    pub fn is_virtual(&self) -> bool {
        self.0.starts_with(Self::VIRTUAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw catalog row as supplied by persistent storage.
///
/// `object_type`, `constellation` and `names` may be absent; every other
/// field is required and rejected by serde when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub catalog_code: String,
    pub sequence: Sequence,
    pub ra_deg: f64,
    pub dec_deg: f64,
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub constellation: String,
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogObject {
    pub catalog_code: String,
    pub sequence: Sequence,
    /// Right ascension, degrees (J2000)
    pub ra_deg: f64,
    /// Declination, degrees (J2000)
    pub dec_deg: f64,
    pub object_id: ObjectId,
    /// Display names, most preferred first
    pub names: Vec<String>,
    pub object_type: String,
    pub constellation: String,
}

impl CatalogObject {
    /// Build an object from a raw row.
    ///
    /// Blank names are dropped and an empty `object_id` is replaced by a
    /// virtual one. Coordinates are not checked here; invalid positions are
    /// excluded later, when the spatial index is built.
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidRow`] if the catalog code is blank, a
    /// label sequence is empty, or a supplied object id starts with the
    /// prefix reserved for virtual ids.
    pub fn from_row(row: CatalogRow) -> CatalogResult<Self> {
        let catalog_code = row.catalog_code.trim().to_string();
        if catalog_code.is_empty() {
            return Err(CatalogError::InvalidRow {
                catalog_code: row.catalog_code,
                sequence: row.sequence.to_string(),
                reason: "blank catalog code".to_string(),
            });
        }
        if matches!(&row.sequence, Sequence::Label(s) if s.trim().is_empty()) {
            return Err(CatalogError::InvalidRow {
                catalog_code,
                sequence: row.sequence.to_string(),
                reason: "blank sequence label".to_string(),
            });
        }

        let object_id = match row.object_id.trim() {
            "" => ObjectId::virtual_for(&catalog_code, &row.sequence),
            id if id.starts_with(ObjectId::VIRTUAL_PREFIX) => {
                return Err(CatalogError::InvalidRow {
                    catalog_code,
                    sequence: row.sequence.to_string(),
                    reason: format!("object id {id:?} uses the reserved virtual prefix"),
                });
            }
            id => ObjectId::new(id),
        };

        let names = row
            .names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        Ok(Self {
            catalog_code,
            sequence: row.sequence,
            ra_deg: row.ra_deg,
            dec_deg: row.dec_deg,
            object_id,
            names,
            object_type: row.object_type,
            constellation: row.constellation,
        })
    }

    /// True if RA is finite and in [0, 360) and Dec is finite and in [-90, 90].
    pub fn has_valid_position(&self) -> bool {
        self.ra_deg.is_finite()
            && self.dec_deg.is_finite()
            && (0.0..360.0).contains(&self.ra_deg)
            && (-90.0..=90.0).contains(&self.dec_deg)
    }

    /// Catalog designation such as "M 31" or "NGC 224".
    pub fn designation(&self) -> String {
        format!("{} {}", self.catalog_code, self.sequence)
    }

    /// First display name, falling back to the designation.
    pub fn display_name(&self) -> String {
        self.names
            .first()
            .cloned()
            .unwrap_or_else(|| self.designation())
    }
}

impl fmt::Display for CatalogObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) RA={:.4} Dec={:.4}",
            self.designation(),
            self.names.join(", "),
            self.ra_deg,
            self.dec_deg
        )
    }
}
