//! # Parquet helpers shared by both store readers
//!
//! ## Overview
//! -----------------
//! Everything that does **not** depend on the reading strategy lives here:
//! - opening a file and resolving column names to a [`ProjectionMask`],
//! - mapping Arrow data types to [`ValueKind`]s,
//! - converting Arrow arrays into [`FieldData`],
//! - streaming whole columns of small tables (exposure metadata, candidate table).
//!
//! ## Value conversion
//! -----------------
//! | Arrow type                              | Kind    | Null becomes |
//! |-----------------------------------------|---------|--------------|
//! | `Float32`, `Float64`                    | `Float` | `NaN`        |
//! | `Int8..Int64`, `UInt8..UInt64`, `Boolean` | `Int` | `0`          |
//! | `Utf8`, `LargeUtf8`                     | `Text`  | `""`         |
//! | `List<T>`, `LargeList<T>`               | kind of `T` | row filled with the null value |
//!
//! Any other type is a fatal [`FieldIoError::UnsupportedColumnType`].
use std::fs::File;

use arrow_array::{cast::AsArray, types::*, Array, ArrayRef, RecordBatch};
use arrow_schema::DataType;
use camino::Utf8Path;
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};

use crate::{
    fieldio_errors::FieldIoError,
    record::{FieldData, ValueKind},
};

pub(crate) type FileReaderBuilder = ParquetRecordBatchReaderBuilder<File>;

/// Open a Parquet file and read its metadata.
pub(crate) fn open(path: &Utf8Path) -> Result<FileReaderBuilder, FieldIoError> {
    let file = File::open(path)?;
    Ok(ParquetRecordBatchReaderBuilder::try_new(file)?)
}

/// Number of rows recorded in the file footer.
pub(crate) fn row_count(builder: &FileReaderBuilder) -> usize {
    builder.metadata().file_metadata().num_rows().max(0) as usize
}

/// Top-level column names with their value kind. Columns of unsupported types are skipped.
pub(crate) fn column_kinds(path: &Utf8Path) -> Result<Vec<(String, ValueKind)>, FieldIoError> {
    let builder = open(path)?;
    Ok(builder
        .schema()
        .fields()
        .iter()
        .filter_map(|f| Some((f.name().clone(), value_kind(f.data_type())?)))
        .collect())
}

/// Projection on the named top-level columns, failing on the first absent one.
pub(crate) fn projection(
    builder: &FileReaderBuilder,
    path: &Utf8Path,
    columns: &[&str],
) -> Result<ProjectionMask, FieldIoError> {
    let schema = builder.schema();
    let roots = columns
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| FieldIoError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_string(),
                })
        })
        .collect::<Result<Vec<usize>, _>>()?;
    Ok(ProjectionMask::roots(builder.parquet_schema(), roots))
}

/// Kind of the values a column of this type converts to.
pub(crate) fn value_kind(datatype: &DataType) -> Option<ValueKind> {
    match datatype {
        DataType::Float32 | DataType::Float64 => Some(ValueKind::Float),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Boolean => Some(ValueKind::Int),
        DataType::Utf8 | DataType::LargeUtf8 => Some(ValueKind::Text),
        DataType::List(inner) | DataType::LargeList(inner) => value_kind(inner.data_type()),
        _ => None,
    }
}

/// `n` null values of the given kind.
pub(crate) fn null_fill(kind: ValueKind, n: usize) -> FieldData {
    match kind {
        ValueKind::Float => FieldData::Float(vec![f64::NAN; n]),
        ValueKind::Int => FieldData::Int(vec![0; n]),
        ValueKind::Text => FieldData::Text(vec![String::new(); n]),
    }
}

fn unsupported(field: &str, datatype: &DataType) -> FieldIoError {
    FieldIoError::UnsupportedColumnType {
        field: field.to_string(),
        datatype: datatype.to_string(),
    }
}

fn floats<T>(array: &dyn Array) -> Vec<f64>
where
    T: ArrowPrimitiveType,
    T::Native: Into<f64>,
{
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(f64::NAN, Into::into))
        .collect()
}

fn ints<T>(array: &dyn Array) -> Vec<i64>
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map_or(0, Into::into))
        .collect()
}

/// Convert a flat Arrow array into [`FieldData`].
///
/// Arguments
/// ---------
/// * `array`: a primitive, boolean or string array
/// * `field`: field name, used in error messages
///
/// Return
/// ------
/// * the converted values, nulls replaced by the null value of the kind
pub(crate) fn to_field_data(array: &dyn Array, field: &str) -> Result<FieldData, FieldIoError> {
    let data = match array.data_type() {
        DataType::Float64 => FieldData::Float(floats::<Float64Type>(array)),
        DataType::Float32 => FieldData::Float(floats::<Float32Type>(array)),
        DataType::Int64 => FieldData::Int(ints::<Int64Type>(array)),
        DataType::Int32 => FieldData::Int(ints::<Int32Type>(array)),
        DataType::Int16 => FieldData::Int(ints::<Int16Type>(array)),
        DataType::Int8 => FieldData::Int(ints::<Int8Type>(array)),
        DataType::UInt32 => FieldData::Int(ints::<UInt32Type>(array)),
        DataType::UInt16 => FieldData::Int(ints::<UInt16Type>(array)),
        DataType::UInt8 => FieldData::Int(ints::<UInt8Type>(array)),
        DataType::UInt64 => FieldData::Int(
            array
                .as_primitive::<UInt64Type>()
                .iter()
                .map(|v| v.map_or(0, |v| v as i64))
                .collect(),
        ),
        DataType::Boolean => FieldData::Int(
            array
                .as_boolean()
                .iter()
                .map(|v| v.map_or(0, i64::from))
                .collect(),
        ),
        DataType::Utf8 => FieldData::Text(
            array
                .as_string::<i32>()
                .iter()
                .map(|v| v.unwrap_or_default().to_string())
                .collect(),
        ),
        DataType::LargeUtf8 => FieldData::Text(
            array
                .as_string::<i64>()
                .iter()
                .map(|v| v.unwrap_or_default().to_string())
                .collect(),
        ),
        other => return Err(unsupported(field, other)),
    };
    Ok(data)
}

/// Element `row` of a list column: the exposure values of one object.
///
/// A null row yields `None`; the caller fills it with null values.
pub(crate) fn list_row(
    column: &ArrayRef,
    row: usize,
    field: &str,
) -> Result<Option<ArrayRef>, FieldIoError> {
    if column.is_null(row) {
        return Ok(None);
    }
    match column.data_type() {
        DataType::List(_) => Ok(Some(column.as_list::<i32>().value(row))),
        DataType::LargeList(_) => Ok(Some(column.as_list::<i64>().value(row))),
        other => Err(unsupported(field, other)),
    }
}

/// Kind of the elements of an array file's list column.
pub(crate) fn list_kind(
    builder: &FileReaderBuilder,
    column: &str,
    path: &Utf8Path,
) -> Result<ValueKind, FieldIoError> {
    let schema = builder.schema();
    let field = schema
        .field_with_name(column)
        .map_err(|_| FieldIoError::MissingColumn {
            column: column.to_string(),
            path: path.to_string(),
        })?;
    match field.data_type() {
        DataType::List(inner) | DataType::LargeList(inner) => value_kind(inner.data_type())
            .ok_or_else(|| unsupported(column, field.data_type())),
        other => Err(unsupported(column, other)),
    }
}

/// Column `name` of a record batch.
pub(crate) fn batch_column<'b>(
    batch: &'b RecordBatch,
    name: &str,
    path: &Utf8Path,
) -> Result<&'b ArrayRef, FieldIoError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| FieldIoError::MissingColumn {
            column: name.to_string(),
            path: path.to_string(),
        })
}

/// Kind of a flat column.
pub(crate) fn column_kind(
    builder: &FileReaderBuilder,
    path: &Utf8Path,
    name: &str,
) -> Result<ValueKind, FieldIoError> {
    let schema = builder.schema();
    let field = schema
        .field_with_name(name)
        .map_err(|_| FieldIoError::MissingColumn {
            column: name.to_string(),
            path: path.to_string(),
        })?;
    value_kind(field.data_type()).ok_or_else(|| unsupported(name, field.data_type()))
}

/// Stream every row of the named flat columns.
///
/// Return
/// ------
/// * one [`FieldData`] per requested column, in request order
pub(crate) fn read_columns(
    path: &Utf8Path,
    columns: &[&str],
) -> Result<Vec<FieldData>, FieldIoError> {
    let builder = open(path)?;
    let mask = projection(&builder, path, columns)?;
    let mut out = columns
        .iter()
        .map(|name| column_kind(&builder, path, name).map(FieldData::empty))
        .collect::<Result<Vec<_>, _>>()?;

    let reader = builder.with_projection(mask).build()?;
    for maybe_batch in reader {
        let batch = maybe_batch?;
        for (name, data) in columns.iter().zip(out.iter_mut()) {
            data.extend(to_field_data(batch_column(&batch, name, path)?, name)?);
        }
    }
    Ok(out)
}

/// Values of the first row of a list column, `None` when the file has no rows or the row is null.
pub(crate) fn first_list_row(
    path: &Utf8Path,
    column: &str,
) -> Result<Option<FieldData>, FieldIoError> {
    let builder = open(path)?;
    let mask = projection(&builder, path, &[column])?;
    let mut reader = builder.with_projection(mask).with_batch_size(1).build()?;

    let Some(maybe_batch) = reader.next() else {
        return Ok(None);
    };
    let batch = maybe_batch?;
    if batch.num_rows() == 0 {
        return Ok(None);
    }
    match list_row(batch_column(&batch, column, path)?, 0, column)? {
        Some(values) => Ok(Some(to_field_data(values.as_ref(), column)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod parquet_io_test {
    use std::sync::Arc;

    use arrow_array::{BooleanArray, Float32Array, Int16Array, StringArray};
    use arrow_schema::Field;

    use super::*;

    #[test]
    fn test_value_kind() {
        assert_eq!(value_kind(&DataType::Int16), Some(ValueKind::Int));
        assert_eq!(value_kind(&DataType::LargeUtf8), Some(ValueKind::Text));
        let list = DataType::List(Arc::new(Field::new("item", DataType::Float32, true)));
        assert_eq!(value_kind(&list), Some(ValueKind::Float));
        assert_eq!(value_kind(&DataType::Date32), None);
    }

    #[test]
    fn test_to_field_data_nulls() {
        let floats = Float32Array::from(vec![Some(1.5), None]);
        match to_field_data(&floats, "FLUX").unwrap() {
            FieldData::Float(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
            }
            other => panic!("unexpected {other:?}"),
        }

        let ints = Int16Array::from(vec![Some(-3), None]);
        assert_eq!(to_field_data(&ints, "FLAGS").unwrap(), FieldData::Int(vec![-3, 0]));

        let bools = BooleanArray::from(vec![Some(true), Some(false), None]);
        assert_eq!(to_field_data(&bools, "B").unwrap(), FieldData::Int(vec![1, 0, 0]));

        let text = StringArray::from(vec![Some("000046"), None]);
        assert_eq!(
            to_field_data(&text, "OBJ_ID").unwrap(),
            FieldData::Text(vec!["000046".into(), String::new()])
        );
    }

    #[test]
    fn test_unsupported_type() {
        let dates = arrow_array::Date32Array::from(vec![1]);
        assert!(matches!(
            to_field_data(&dates, "D"),
            Err(FieldIoError::UnsupportedColumnType { field, .. }) if field == "D"
        ));
    }
}
