//! # Result records
//!
//! A retrieval produces a [`ResultRecord`]: a mapping from field name to a [`FieldArray`].
//!
//! ## Data model
//! -----------------
//! * [`FieldData`] – a flat, typed column of values (`f64`, `i64` or text).
//! * [`FieldArray`] – a [`FieldData`] together with its labelled dimensions, stored row-major:
//!   - `[Object]` for per-object catalog fields,
//!   - `[Exposure]` for per-exposure metadata fields,
//!   - `[Object, Exposure]` for per-object-per-exposure arrays,
//!   - `[]` (scalar) or `[Exposure]` once a length-1 object axis has been simplified away.
//!
//! Labelling each dimension with its [`Axis`] is what makes simplification idempotent: only an
//! `Object` dimension of length 1 is ever removed.
//!
//! ## Submodules
//! -----------------
//! * [`assembler`] – merges per-store contributions with a fixed precedence.
//! * [`normalizer`] – simplification and completeness diagnostics.
pub mod assembler;
pub mod normalizer;

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// Kind of the values held by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    Text,
}

/// Flat typed values of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl FieldData {
    pub fn empty(kind: ValueKind) -> Self {
        Self::with_capacity(kind, 0)
    }

    pub fn with_capacity(kind: ValueKind, capacity: usize) -> Self {
        match kind {
            ValueKind::Float => FieldData::Float(Vec::with_capacity(capacity)),
            ValueKind::Int => FieldData::Int(Vec::with_capacity(capacity)),
            ValueKind::Text => FieldData::Text(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldData::Float(_) => ValueKind::Float,
            FieldData::Int(_) => ValueKind::Int,
            FieldData::Text(_) => ValueKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldData::Float(v) => v.len(),
            FieldData::Int(v) => v.len(),
            FieldData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            FieldData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            FieldData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            FieldData::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Values at `indices`, in that order.
    ///
    /// Panics if an index is out of bounds; callers only pass positions they built themselves.
    pub fn gather(&self, indices: &[usize]) -> FieldData {
        match self {
            FieldData::Float(v) => FieldData::Float(indices.iter().map(|&i| v[i]).collect()),
            FieldData::Int(v) => FieldData::Int(indices.iter().map(|&i| v[i]).collect()),
            FieldData::Text(v) => FieldData::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Values at `indices`, with the zero of the kind (`0.0`, `0`, empty text) for `None`.
    pub fn gather_or_zero(&self, indices: &[Option<usize>]) -> FieldData {
        match self {
            FieldData::Float(v) => {
                FieldData::Float(indices.iter().map(|i| i.map_or(0.0, |i| v[i])).collect())
            }
            FieldData::Int(v) => {
                FieldData::Int(indices.iter().map(|i| i.map_or(0, |i| v[i])).collect())
            }
            FieldData::Text(v) => FieldData::Text(
                indices
                    .iter()
                    .map(|i| i.map_or_else(String::new, |i| v[i].clone()))
                    .collect(),
            ),
        }
    }

    /// Append `other`; kinds must match, mismatches are ignored.
    pub fn extend(&mut self, other: FieldData) {
        match (self, other) {
            (FieldData::Float(a), FieldData::Float(b)) => a.extend(b),
            (FieldData::Int(a), FieldData::Int(b)) => a.extend(b),
            (FieldData::Text(a), FieldData::Text(b)) => a.extend(b),
            _ => {}
        }
    }

    /// Float view of numeric values; text is returned unchanged.
    pub fn into_float(self) -> FieldData {
        match self {
            FieldData::Int(v) => FieldData::Float(v.into_iter().map(|x| x as f64).collect()),
            other => other,
        }
    }

    /// Bitwise equality: floats are compared by bit pattern so that NaN equals NaN.
    pub fn same_bits(&self, other: &FieldData) -> bool {
        match (self, other) {
            (FieldData::Float(a), FieldData::Float(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (a, b) => a == b,
        }
    }
}

/// Semantic label of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Object,
    Exposure,
}

/// A field value with labelled dimensions, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    dims: SmallVec<[(Axis, usize); 2]>,
    data: FieldData,
}

impl FieldArray {
    /// Per-object values, shape `(objects,)`.
    pub fn per_object(data: FieldData) -> Self {
        let n = data.len();
        FieldArray {
            dims: SmallVec::from_slice(&[(Axis::Object, n)]),
            data,
        }
    }

    /// Per-exposure values, shape `(exposures,)`.
    pub fn per_exposure(data: FieldData) -> Self {
        let n = data.len();
        FieldArray {
            dims: SmallVec::from_slice(&[(Axis::Exposure, n)]),
            data,
        }
    }

    /// Per-object-per-exposure values, shape `(objects, exposures)`, row-major.
    ///
    /// Panics if `data.len() != n_objects * n_exposures`.
    pub fn per_object_exposure(n_objects: usize, n_exposures: usize, data: FieldData) -> Self {
        assert_eq!(
            data.len(),
            n_objects * n_exposures,
            "data length does not match the (objects, exposures) shape"
        );
        FieldArray {
            dims: SmallVec::from_slice(&[(Axis::Object, n_objects), (Axis::Exposure, n_exposures)]),
            data,
        }
    }

    pub fn dims(&self) -> &[(Axis, usize)] {
        &self.dims
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|(_, n)| *n).collect()
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn into_data(self) -> FieldData {
        self.data
    }

    /// Length of the object dimension, if the field has one.
    pub fn n_objects(&self) -> Option<usize> {
        self.dims
            .iter()
            .find(|(axis, _)| *axis == Axis::Object)
            .map(|(_, n)| *n)
    }

    /// Remove an object dimension of length 1. No-op otherwise.
    pub fn drop_unit_object_axis(&mut self) {
        self.dims.retain(|(axis, n)| !(*axis == Axis::Object && *n == 1));
    }

    /// Values of one object of a per-object-per-exposure array.
    pub fn object_row(&self, object: usize) -> Option<FieldData> {
        match self.dims.as_slice() {
            [(Axis::Object, n_obj), (Axis::Exposure, n_exp)] if object < *n_obj => {
                let start = object * n_exp;
                let positions: Vec<usize> = (start..start + n_exp).collect();
                Some(self.data.gather(&positions))
            }
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        self.data.as_float()
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        self.data.as_int()
    }

    pub fn as_text(&self) -> Option<&[String]> {
        self.data.as_text()
    }

    /// Same dimensions and bitwise-identical values.
    pub fn same_bits(&self, other: &FieldArray) -> bool {
        self.dims == other.dims && self.data.same_bits(&other.data)
    }
}

/// Field name → array, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRecord {
    fields: BTreeMap<String, FieldArray>,
}

impl ResultRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldArray> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Insert unless the field is already present. Returns `true` when inserted.
    pub fn insert_first(&mut self, field: &str, array: FieldArray) -> bool {
        if self.fields.contains_key(field) {
            return false;
        }
        self.fields.insert(field.to_string(), array);
        true
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldArray)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldArray)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Same keys and bitwise-identical arrays.
    pub fn same_bits(&self, other: &ResultRecord) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(k, v)| other.fields.get(k).is_some_and(|w| v.same_bits(w)))
    }
}

#[cfg(test)]
mod record_test {
    use super::*;

    #[test]
    fn test_gather_or_zero() {
        let data = FieldData::Float(vec![1.5, 2.5]);
        assert_eq!(
            data.gather_or_zero(&[None, Some(1), Some(0)]),
            FieldData::Float(vec![0.0, 2.5, 1.5])
        );
        let data = FieldData::Int(vec![7]);
        assert_eq!(data.gather_or_zero(&[None]), FieldData::Int(vec![0]));
    }

    #[test]
    fn test_same_bits_nan() {
        let a = FieldData::Float(vec![f64::NAN, 1.0]);
        let b = FieldData::Float(vec![f64::NAN, 1.0]);
        assert_ne!(a, b);
        assert!(a.same_bits(&b));
        assert!(!a.same_bits(&FieldData::Float(vec![f64::NAN])));
    }

    #[test]
    fn test_drop_unit_object_axis() {
        let mut array = FieldArray::per_object_exposure(1, 3, FieldData::Int(vec![1, 2, 3]));
        array.drop_unit_object_axis();
        assert_eq!(array.dims(), &[(Axis::Exposure, 3)]);

        let mut array = FieldArray::per_exposure(FieldData::Int(vec![4]));
        array.drop_unit_object_axis();
        assert_eq!(array.shape(), vec![1]);

        let mut array = FieldArray::per_object(FieldData::Text(vec!["000046".into()]));
        array.drop_unit_object_axis();
        assert!(array.is_scalar());
        assert_eq!(array.n_objects(), None);
    }

    #[test]
    fn test_object_row() {
        let array =
            FieldArray::per_object_exposure(2, 2, FieldData::Float(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(array.object_row(1), Some(FieldData::Float(vec![3.0, 4.0])));
        assert_eq!(array.object_row(2), None);
    }

    #[test]
    fn test_insert_first() {
        let mut record = ResultRecord::new();
        assert!(record.insert_first("RA", FieldArray::per_object(FieldData::Float(vec![1.0]))));
        assert!(!record.insert_first("RA", FieldArray::per_object(FieldData::Float(vec![2.0]))));
        assert_eq!(record.get("RA").unwrap().as_float(), Some(&[1.0][..]));
    }
}
