use thiserror::Error;

use crate::selection::parse::SelectorParseError;

#[derive(Error, Debug)]
pub enum FieldIoError {
    #[error("Conflicting {axis} selectors: only one of [{kinds}] may be supplied")]
    ConflictingSelectors { axis: &'static str, kinds: String },

    #[error("Unrecognized {axis} selector value: {value}")]
    UnrecognizedSelector { axis: &'static str, value: String },

    #[error("Malformed range '{0}': expected exactly one ':' between two bounds")]
    MalformedRange(String),

    #[error("Unknown reader backend: {0}")]
    UnknownBackend(String),

    #[error("Unknown indexing convention: {0}")]
    UnknownIndexingBase(String),

    #[error("No exposure matches heliocentric day {0}")]
    HjdNotFound(i64),

    #[error("Row index {index} is outside the {axis} dimension of length {len}")]
    InvalidRowIndex {
        axis: &'static str,
        index: i64,
        len: usize,
    },

    #[error("Error while parsing a selector: {0}")]
    SelectorParse(#[from] SelectorParseError),

    #[error("Unsupported column type for field {field}: {datatype}")]
    UnsupportedColumnType { field: String, datatype: String },

    #[error("Column {column} is missing from {path}")]
    MissingColumn { column: String, path: String },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to read selector list file: {0}")]
    ListFileError(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),
}

impl PartialEq for FieldIoError {
    fn eq(&self, other: &Self) -> bool {
        use FieldIoError::*;
        match (self, other) {
            (
                ConflictingSelectors { axis: a, kinds: k },
                ConflictingSelectors { axis: b, kinds: l },
            ) => a == b && k == l,
            (
                UnrecognizedSelector { axis: a, value: v },
                UnrecognizedSelector { axis: b, value: w },
            ) => a == b && v == w,
            (MalformedRange(a), MalformedRange(b)) => a == b,
            (UnknownBackend(a), UnknownBackend(b)) => a == b,
            (UnknownIndexingBase(a), UnknownIndexingBase(b)) => a == b,
            (HjdNotFound(a), HjdNotFound(b)) => a == b,
            (
                InvalidRowIndex {
                    axis: a,
                    index: i,
                    len: n,
                },
                InvalidRowIndex {
                    axis: b,
                    index: j,
                    len: m,
                },
            ) => a == b && i == j && n == m,
            (SelectorParse(a), SelectorParse(b)) => a == b,
            (
                UnsupportedColumnType {
                    field: a,
                    datatype: d,
                },
                UnsupportedColumnType {
                    field: b,
                    datatype: e,
                },
            ) => a == b && d == e,
            (MissingColumn { column: a, path: p }, MissingColumn { column: b, path: q }) => {
                a == b && p == q
            }

            // Wrapped foreign errors: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (ListFileError(_), ListFileError(_)) => true,
            (ParquetError(_), ParquetError(_)) => true,
            (ArrowError(_), ArrowError(_)) => true,

            _ => false,
        }
    }
}
