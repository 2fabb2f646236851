//! # Retrieval configuration
//!
//! This module defines [`RetrievalConfig`], the **single configuration object** threaded
//! through a retrieval, together with the small enumerations it is made of:
//!
//! - [`Backend`] – which of the two interchangeable store readers serves the call,
//! - [`IndexingBase`] – how caller-supplied object row numbers are interpreted,
//! - [`FixedPointGroup`] – integer-encoded array fields and their decoding constants.
//!
//! ## Defaults
//!
//! ```rust
//! use fieldio::config::{Backend, IndexingBase, RetrievalConfig};
//!
//! let config = RetrievalConfig::default();
//! assert_eq!(config.backend, Backend::Projected);
//! assert_eq!(config.indexing, IndexingBase::File);
//! assert!(config.simplify);
//! assert_eq!(config.candidate_rank, 1);
//! ```
//!
//! Custom values go through the builder:
//!
//! ```rust
//! use fieldio::config::{Backend, IndexingBase, RetrievalConfig};
//!
//! let config = RetrievalConfig::builder()
//!     .backend("sliced".parse().unwrap())
//!     .indexing(IndexingBase::Zero)
//!     .simplify(false)
//!     .build();
//! assert_eq!(config.backend, Backend::Sliced);
//! ```
//!
//! ## Names accepted from strings
//!
//! | Type             | Accepted names                            |
//! |------------------|-------------------------------------------|
//! | [`Backend`]      | `projected`, `exact` / `sliced`, `slice`  |
//! | [`IndexingBase`] | `file`, `fits` / `zero`, `python`         |
//!
//! Any other name is a fatal [`FieldIoError`].
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{CENTROID_SCALE, DEFAULT_CANDIDATE_RANK},
    fieldio_errors::FieldIoError,
};

/// The two interchangeable store readers.
///
/// Both return identical results for any valid input; they differ only in how much of each
/// Parquet file they decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Decodes only the selected rows (row selection pushed into the Parquet reader) and
    /// gathers exact exposure positions.
    Projected,
    /// Streams every row, keeps the selected ones and trims an exposure-contiguous slice.
    Sliced,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Projected
    }
}

impl FromStr for Backend {
    type Err = FieldIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "projected" | "exact" => Ok(Backend::Projected),
            "sliced" | "slice" => Ok(Backend::Sliced),
            _ => Err(FieldIoError::UnknownBackend(s.to_string())),
        }
    }
}

impl TryFrom<&str> for Backend {
    type Error = FieldIoError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Projected => write!(f, "projected"),
            Backend::Sliced => write!(f, "sliced"),
        }
    }
}

/// Convention used for caller-supplied object row numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingBase {
    /// Rows count from 1, as in the survey's file convention.
    File,
    /// Rows count from 0.
    Zero,
}

impl Default for IndexingBase {
    fn default() -> Self {
        IndexingBase::File
    }
}

impl IndexingBase {
    /// Convert a caller row number into a 0-based row.
    ///
    /// Return
    /// ------
    /// * `None` when the row has no 0-based counterpart (negative or not representable);
    ///   checking the upper bound is left to the resolver, which knows the catalog length.
    pub fn to_zero_based(&self, row: i64) -> Option<usize> {
        let row = match self {
            IndexingBase::File => row.checked_sub(1)?,
            IndexingBase::Zero => row,
        };
        usize::try_from(row).ok()
    }
}

impl FromStr for IndexingBase {
    type Err = FieldIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "fits" => Ok(IndexingBase::File),
            "zero" | "python" => Ok(IndexingBase::Zero),
            _ => Err(FieldIoError::UnknownIndexingBase(s.to_string())),
        }
    }
}

/// A group of array fields stored as integers.
///
/// The physical value is `raw / scale + zero_point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPointGroup {
    pub name: String,
    pub fields: Vec<String>,
    pub scale: f64,
    pub zero_point: f64,
}

impl FixedPointGroup {
    pub fn new(name: &str, fields: &[&str], scale: f64, zero_point: f64) -> Self {
        FixedPointGroup {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            scale,
            zero_point,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    #[inline]
    pub fn decode(&self, raw: f64) -> f64 {
        raw / self.scale + self.zero_point
    }
}

/// Configuration of one retrieval.
///
/// Fields
/// -----------------
/// * `backend` – store reader serving the call.
/// * `indexing` – convention of object row numbers.
/// * `simplify` – drop a length-1 object dimension from the result.
/// * `candidate_rank` – rank treated as the canonical candidate detection.
/// * `fixed_point` – integer-encoded array field groups.
/// * `quiet` – suppress per-item warnings (results and diagnostics are unchanged).
/// * `set_nan` – turn zero samples of float-stored arrays into NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub backend: Backend,
    pub indexing: IndexingBase,
    pub simplify: bool,
    pub candidate_rank: i64,
    pub fixed_point: Vec<FixedPointGroup>,
    pub quiet: bool,
    pub set_nan: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            backend: Backend::default(),
            indexing: IndexingBase::default(),
            simplify: true,
            candidate_rank: DEFAULT_CANDIDATE_RANK,
            fixed_point: vec![
                FixedPointGroup::new("centroid_position", &["CCDX", "CCDY"], CENTROID_SCALE, 0.0),
                FixedPointGroup::new(
                    "centroid_offset",
                    &["CENTDX", "CENTDY", "CENTDX_ERR", "CENTDY_ERR"],
                    CENTROID_SCALE,
                    0.0,
                ),
            ],
            quiet: false,
            set_nan: false,
        }
    }
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::new()
    }

    /// Fixed-point group a field belongs to, if any. The first declared group wins.
    pub fn fixed_point_for(&self, field: &str) -> Option<&FixedPointGroup> {
        self.fixed_point.iter().find(|g| g.contains(field))
    }
}

/// Builder for [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
        }
    }

    pub fn backend(mut self, v: Backend) -> Self {
        self.config.backend = v;
        self
    }
    pub fn indexing(mut self, v: IndexingBase) -> Self {
        self.config.indexing = v;
        self
    }
    pub fn simplify(mut self, v: bool) -> Self {
        self.config.simplify = v;
        self
    }
    pub fn candidate_rank(mut self, v: i64) -> Self {
        self.config.candidate_rank = v;
        self
    }
    pub fn quiet(mut self, v: bool) -> Self {
        self.config.quiet = v;
        self
    }
    pub fn set_nan(mut self, v: bool) -> Self {
        self.config.set_nan = v;
        self
    }

    /// Replace every fixed-point group.
    pub fn fixed_point(mut self, groups: Vec<FixedPointGroup>) -> Self {
        self.config.fixed_point = groups;
        self
    }

    /// Add one group; it takes precedence over the groups already declared.
    pub fn with_fixed_point(mut self, group: FixedPointGroup) -> Self {
        self.config.fixed_point.insert(0, group);
        self
    }

    pub fn build(self) -> RetrievalConfig {
        self.config
    }
}
