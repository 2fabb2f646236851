//! # Constants and type definitions for fieldio
//!
//! This module centralizes the **physical store layout**, the **reserved column names**, and
//! the **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - File names making up each store directory
//! - Column names the resolver relies on (object identifier, exposure date, batch id, rank)
//! - Identifier formatting rules
//! - Type aliases for identifiers and index lists

use ahash::RandomState;
use std::collections::HashMap;

// -------------------------------------------------------------------------------------------------
// Store layout
// -------------------------------------------------------------------------------------------------

/// Per-object catalog table of the primary and candidate stores.
pub const CATALOGUE_FILE: &str = "catalogue.parquet";

/// Per-exposure metadata table of the primary store.
pub const IMAGELIST_FILE: &str = "imagelist.parquet";

/// Candidate detections table of the candidate store.
pub const CANDIDATES_FILE: &str = "candidates.parquet";

/// Sub-directory holding one Parquet file per named (objects × exposures) array.
pub const ARRAYS_DIR: &str = "arrays";

/// Extension of every store file.
pub const PARQUET_EXT: &str = "parquet";

/// Name of the single list column of an array file.
pub const ARRAY_VALUES_COLUMN: &str = "values";

// -------------------------------------------------------------------------------------------------
// Reserved column names
// -------------------------------------------------------------------------------------------------

/// Object identifier column (catalogs and candidate table).
pub const OBJ_ID: &str = "OBJ_ID";

/// Observation date column of the exposure metadata table.
pub const DATE_OBS: &str = "DATE-OBS";

/// Exposure-batch identifier column of the exposure metadata table.
pub const ACTIONID: &str = "ACTIONID";

/// Heliocentric time array used to match day numbers.
pub const HJD: &str = "HJD";

/// Rank column of the candidate table.
pub const RANK: &str = "RANK";

/// Canonical candidate rank.
pub const DEFAULT_CANDIDATE_RANK: i64 = 1;

// -------------------------------------------------------------------------------------------------
// Identifier formatting
// -------------------------------------------------------------------------------------------------

/// Width of a canonical object identifier, zero-padded on the left.
pub const OBJ_ID_WIDTH: usize = 6;

/// Default scale of the integer-encoded centroid fields.
pub const CENTROID_SCALE: f64 = 1024.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Canonical object identifier (zero-padded text).
pub type ObjectId = String;

/// Row index into the object dimension.
pub type ObjectRow = usize;

/// Row index into the exposure dimension.
pub type ExposureRow = usize;

/// Exposure-batch identifier.
pub type ActionId = i64;
/// Inclusive run of batch ids; a single id is a one-element span.
pub type ActionIdSpan = std::ops::RangeInclusive<ActionId>;

/// Whole heliocentric day number.
pub type HjdDay = i64;

/// Hash map with the `ahash` hasher, used for identifier and value lookups.
pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
