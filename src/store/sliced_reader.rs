//! # Sliced reader
//!
//! Streams every record batch of a file (columns projected, rows not), keeps the selected
//! rows and, for array files, cuts the exposure-contiguous window `[min..=max]` of the
//! selection out of each kept row before trimming it to the exact exposures.
//!
//! This trades decoding unselected rows for a single sequential scan, which pays off when most
//! of the objects are selected.
use std::collections::HashSet;

use ahash::RandomState;
use camino::Utf8Path;

use crate::{
    constants::{FastHashMap, ObjectRow, ARRAY_VALUES_COLUMN},
    fieldio_errors::FieldIoError,
    record::FieldData,
};

use super::{parquet_io, StoreReader};

/// Reader scanning whole files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlicedReader;

fn check_rows(rows: &[usize], len: usize, axis: &'static str) -> Result<(), FieldIoError> {
    match rows.iter().max() {
        Some(&last) if last >= len => Err(FieldIoError::InvalidRowIndex {
            axis,
            index: last as i64,
            len,
        }),
        _ => Ok(()),
    }
}

impl StoreReader for SlicedReader {
    fn read_table(
        &self,
        path: &Utf8Path,
        columns: &[&str],
        rows: &[usize],
    ) -> Result<Vec<FieldData>, FieldIoError> {
        let full = parquet_io::read_columns(path, columns)?;
        let len = full.first().map_or(0, FieldData::len);
        check_rows(rows, len, "table")?;
        Ok(full.iter().map(|data| data.gather(rows)).collect())
    }

    fn read_array(
        &self,
        path: &Utf8Path,
        rows: &[usize],
        exposures: &[usize],
    ) -> Result<FieldData, FieldIoError> {
        let field = path.file_stem().unwrap_or(path.as_str());
        let builder = parquet_io::open(path)?;
        let kind = parquet_io::list_kind(&builder, ARRAY_VALUES_COLUMN, path)?;
        check_rows(rows, parquet_io::row_count(&builder), "object")?;

        let (Some(&first), Some(&last)) = (exposures.iter().min(), exposures.iter().max()) else {
            return Ok(FieldData::empty(kind));
        };
        let width = last - first + 1;
        let in_window: Vec<usize> = exposures.iter().map(|e| e - first).collect();

        let mask = parquet_io::projection(&builder, path, &[ARRAY_VALUES_COLUMN])?;
        let reader = builder.with_projection(mask).build()?;

        let wanted: HashSet<ObjectRow, RandomState> = rows.iter().copied().collect();
        let mut kept: FastHashMap<ObjectRow, FieldData> =
            FastHashMap::with_capacity_and_hasher(wanted.len(), RandomState::default());

        let mut offset = 0;
        for maybe_batch in reader {
            let batch = maybe_batch?;
            let column = parquet_io::batch_column(&batch, ARRAY_VALUES_COLUMN, path)?;
            for i in 0..batch.num_rows() {
                let row = offset + i;
                if !wanted.contains(&row) {
                    continue;
                }
                let values = match parquet_io::list_row(column, i, field)? {
                    Some(values) => {
                        if last >= values.len() {
                            return Err(FieldIoError::InvalidRowIndex {
                                axis: "time",
                                index: last as i64,
                                len: values.len(),
                            });
                        }
                        let window = values.slice(first, width);
                        parquet_io::to_field_data(window.as_ref(), field)?.gather(&in_window)
                    }
                    None => parquet_io::null_fill(kind, exposures.len()),
                };
                kept.insert(row, values);
            }
            offset += batch.num_rows();
        }

        let mut block = FieldData::with_capacity(kind, rows.len() * exposures.len());
        for row in rows {
            if let Some(values) = kept.get(row) {
                block.extend(values.clone());
            }
        }
        Ok(block)
    }
}
