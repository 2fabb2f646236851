//! Output normalization: dimension simplification and completeness checks.
use std::fmt;

use tracing::warn;

use super::ResultRecord;

/// Non-blocking report attached to a retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A requested field found in none of the stores.
    MissingField(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingField(name) => {
                write!(f, "requested field {name} was not found in any store")
            }
        }
    }
}

/// Remove the object dimension of every field where it has length 1.
///
/// Only dimensions labelled as the object axis are touched, so applying this twice gives the
/// same record as applying it once, and a length-1 exposure axis is kept.
pub fn simplify(mut record: ResultRecord) -> ResultRecord {
    for (_, array) in record.iter_mut() {
        array.drop_unit_object_axis();
    }
    record
}

/// One diagnostic per requested field absent from `record`, in request order.
///
/// Arguments
/// ---------
/// * `record`: the assembled record
/// * `requested`: field names asked for by the caller
/// * `quiet`: suppress the per-field warning
///
/// Return
/// ------
/// * the diagnostics; a missing field never fails the call
pub fn check_completeness<S: AsRef<str>>(
    record: &ResultRecord,
    requested: &[S],
    quiet: bool,
) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for name in requested.iter().map(AsRef::as_ref) {
        if record.contains(name) {
            continue;
        }
        let diagnostic = Diagnostic::MissingField(name.to_string());
        if diagnostics.contains(&diagnostic) {
            continue;
        }
        if !quiet {
            warn!(field = name, "requested field not found in any store");
        }
        diagnostics.push(diagnostic);
    }
    diagnostics
}

#[cfg(test)]
mod normalizer_test {
    use super::*;
    use crate::record::{Axis, FieldArray, FieldData};

    fn single_object_record() -> ResultRecord {
        let mut record = ResultRecord::new();
        record.insert_first(
            "OBJ_ID",
            FieldArray::per_object(FieldData::Text(vec!["000046".into()])),
        );
        record.insert_first(
            "HJD",
            FieldArray::per_exposure(FieldData::Float(vec![700.1, 700.2])),
        );
        record.insert_first(
            "FLUX",
            FieldArray::per_object_exposure(1, 2, FieldData::Float(vec![1.0, 2.0])),
        );
        record
    }

    #[test]
    fn test_simplify_single_object() {
        let record = simplify(single_object_record());
        assert!(record.get("OBJ_ID").unwrap().is_scalar());
        assert_eq!(record.get("HJD").unwrap().dims(), &[(Axis::Exposure, 2)]);
        assert_eq!(record.get("FLUX").unwrap().dims(), &[(Axis::Exposure, 2)]);
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let once = simplify(single_object_record());
        let twice = simplify(once.clone());
        assert_eq!(once, twice);

        let mut record = ResultRecord::new();
        record.insert_first(
            "FLUX",
            FieldArray::per_object_exposure(2, 1, FieldData::Float(vec![1.0, 2.0])),
        );
        let once = simplify(record.clone());
        assert_eq!(once, record);
        assert_eq!(simplify(once.clone()), once);
    }

    #[test]
    fn test_check_completeness() {
        let record = single_object_record();
        let diagnostics =
            check_completeness(&record, &["FLUX", "PERIOD", "OBJ_ID", "PERIOD", "X"], true);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::MissingField("PERIOD".into()),
                Diagnostic::MissingField("X".into())
            ]
        );
        assert!(check_completeness::<&str>(&record, &[], false).is_empty());
    }
}
