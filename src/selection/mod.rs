//! # Selection: which objects and which exposures
//!
//! A caller describes a selection with loosely-typed values ([`SelectorValue`]): a single
//! identifier, a list, a row number, a date string, a list file, and so on. This module turns
//! those raw inputs into **tagged selectors** once, at the boundary, so that no downstream code
//! re-inspects the raw input shape.
//!
//! ## Pipeline
//! -----------------
//! ```text
//! ObjectQuery ─validate─► ObjectSelector ─SelectionResolver─► ResolvedObjects
//! TimeQuery   ─validate─► TimeSelector   ─SelectionResolver─► exposure rows
//! ```
//!
//! * [`ObjectQuery`] / [`TimeQuery`] hold **at most one** kind of input per axis; supplying
//!   several kinds is a fatal [`FieldIoError::ConflictingSelectors`]. Supplying none selects
//!   every object / every exposure.
//! * [`ObjectSelector`] / [`TimeSelector`] are the canonical tagged forms.
//! * [`resolver::SelectionResolver`] maps selectors to index lists through read-only lookups
//!   into the primary store ([`resolver::IndexLookup`]).
//!
//! ## Example
//! -----------------
//! ```rust
//! use fieldio::selection::{ObjectQuery, ObjectSelector, SelectorValue, TimeQuery, TimeSelector};
//!
//! let objects = ObjectQuery::by_id(vec![46, 11]).into_selector().unwrap();
//! assert_eq!(objects, ObjectSelector::ById(vec!["000046".into(), "000011".into()]));
//!
//! let time = TimeQuery::by_action_id("108583:108585").into_selector().unwrap();
//! assert_eq!(time, TimeSelector::ByActionId(vec![108583..=108585]));
//!
//! let conflict = ObjectQuery {
//!     obj_id: Some(SelectorValue::Int(46)),
//!     obj_row: Some(SelectorValue::Int(1)),
//!     candidates: false,
//! };
//! assert!(conflict.into_selector().is_err());
//! ```
pub mod parse;
pub mod resolver;

use std::ops::{Range, RangeInclusive};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use crate::{
    constants::{ActionIdSpan, HjdDay, ObjectId},
    fieldio_errors::FieldIoError,
    time::ObsDate,
};

/// A loosely-typed selector value as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<SelectorValue>),
    /// Path of a text file with one value per line.
    File(Utf8PathBuf),
}

impl SelectorValue {
    pub fn file<P: AsRef<Utf8Path>>(path: P) -> Self {
        SelectorValue::File(path.as_ref().to_path_buf())
    }
}

impl From<i64> for SelectorValue {
    fn from(v: i64) -> Self {
        SelectorValue::Int(v)
    }
}

impl From<i32> for SelectorValue {
    fn from(v: i32) -> Self {
        SelectorValue::Int(v as i64)
    }
}

impl From<u32> for SelectorValue {
    fn from(v: u32) -> Self {
        SelectorValue::Int(v as i64)
    }
}

impl From<usize> for SelectorValue {
    fn from(v: usize) -> Self {
        SelectorValue::Int(v as i64)
    }
}

impl From<f64> for SelectorValue {
    fn from(v: f64) -> Self {
        SelectorValue::Float(v)
    }
}

impl From<&str> for SelectorValue {
    fn from(v: &str) -> Self {
        SelectorValue::Text(v.to_string())
    }
}

impl From<String> for SelectorValue {
    fn from(v: String) -> Self {
        SelectorValue::Text(v)
    }
}

impl<T: Into<SelectorValue>> From<Vec<T>> for SelectorValue {
    fn from(v: Vec<T>) -> Self {
        SelectorValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Range<i64>> for SelectorValue {
    fn from(r: Range<i64>) -> Self {
        SelectorValue::List(r.map(SelectorValue::Int).collect())
    }
}

impl From<RangeInclusive<i64>> for SelectorValue {
    fn from(r: RangeInclusive<i64>) -> Self {
        SelectorValue::List(r.map(SelectorValue::Int).collect())
    }
}

/// Canonical object-axis selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectSelector {
    All,
    /// Zero-padded identifiers, in request order.
    ById(Vec<ObjectId>),
    /// Row numbers in the caller's indexing convention.
    ByRow(Vec<i64>),
    /// Every object holding a detection of the canonical candidate rank.
    Candidates,
}

/// Canonical time-axis selection.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSelector {
    All,
    /// 0-based exposure rows, used as given.
    ByIndex(Vec<i64>),
    ByDate(Vec<ObsDate>),
    ByHjd(Vec<HjdDay>),
    /// Inclusive batch-id spans, left unexpanded.
    ByActionId(Vec<ActionIdSpan>),
}

fn check_single_kind(axis: &'static str, supplied: &[(&str, bool)]) -> Result<(), FieldIoError> {
    let kinds: Vec<&str> = supplied
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();
    if kinds.len() > 1 {
        return Err(FieldIoError::ConflictingSelectors {
            axis,
            kinds: kinds.iter().join(", "),
        });
    }
    Ok(())
}

/// Raw object-axis inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectQuery {
    pub obj_id: Option<SelectorValue>,
    pub obj_row: Option<SelectorValue>,
    pub candidates: bool,
}

impl ObjectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id<V: Into<SelectorValue>>(value: V) -> Self {
        ObjectQuery {
            obj_id: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn by_row<V: Into<SelectorValue>>(value: V) -> Self {
        ObjectQuery {
            obj_row: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn candidates() -> Self {
        ObjectQuery {
            candidates: true,
            ..Default::default()
        }
    }

    /// Check that at most one kind of input is supplied. Performs no I/O.
    pub fn validate(&self) -> Result<(), FieldIoError> {
        check_single_kind(
            "object",
            &[
                ("obj_id", self.obj_id.is_some()),
                ("obj_row", self.obj_row.is_some()),
                ("candidates", self.candidates),
            ],
        )
    }

    /// Convert into the canonical selector, reading list files if any.
    pub fn into_selector(self) -> Result<ObjectSelector, FieldIoError> {
        self.validate()?;
        if self.candidates {
            return Ok(ObjectSelector::Candidates);
        }
        match (self.obj_id, self.obj_row) {
            (Some(ids), _) => Ok(ObjectSelector::ById(parse::to_object_ids(ids)?)),
            (None, Some(rows)) => Ok(ObjectSelector::ByRow(parse::to_integers("object", rows)?)),
            (None, None) => Ok(ObjectSelector::All),
        }
    }
}

/// Raw time-axis inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeQuery {
    pub index: Option<SelectorValue>,
    pub date: Option<SelectorValue>,
    pub hjd: Option<SelectorValue>,
    pub action_id: Option<SelectorValue>,
}

impl TimeQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_index<V: Into<SelectorValue>>(value: V) -> Self {
        TimeQuery {
            index: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn by_date<V: Into<SelectorValue>>(value: V) -> Self {
        TimeQuery {
            date: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn by_hjd<V: Into<SelectorValue>>(value: V) -> Self {
        TimeQuery {
            hjd: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn by_action_id<V: Into<SelectorValue>>(value: V) -> Self {
        TimeQuery {
            action_id: Some(value.into()),
            ..Default::default()
        }
    }

    /// Check that at most one kind of input is supplied. Performs no I/O.
    pub fn validate(&self) -> Result<(), FieldIoError> {
        check_single_kind(
            "time",
            &[
                ("time_index", self.index.is_some()),
                ("time_date", self.date.is_some()),
                ("time_hjd", self.hjd.is_some()),
                ("time_actionid", self.action_id.is_some()),
            ],
        )
    }

    /// Convert into the canonical selector, reading list files if any.
    pub fn into_selector(self) -> Result<TimeSelector, FieldIoError> {
        self.validate()?;
        if let Some(index) = self.index {
            return Ok(TimeSelector::ByIndex(parse::to_integers("time", index)?));
        }
        if let Some(date) = self.date {
            return Ok(TimeSelector::ByDate(parse::to_dates(date)?));
        }
        if let Some(hjd) = self.hjd {
            return Ok(TimeSelector::ByHjd(parse::to_integers("time", hjd)?));
        }
        if let Some(action_id) = self.action_id {
            return Ok(TimeSelector::ByActionId(
                parse::to_spans("time", action_id)?
                    .into_iter()
                    .unique()
                    .collect(),
            ));
        }
        Ok(TimeSelector::All)
    }
}
