//! # Projected reader
//!
//! Pushes the object selection into the Parquet reader: the selected rows are turned into a
//! [`RowSelection`] of consecutive runs and the requested columns into a projection mask, so
//! only those rows and columns are decoded. Within each decoded array row the exact exposure
//! positions are gathered.
//!
//! Rows are decoded in file order and reordered to the requested order afterwards.
use std::ops::Range;

use camino::Utf8Path;
use parquet::arrow::arrow_reader::RowSelection;

use crate::{
    constants::ARRAY_VALUES_COLUMN,
    fieldio_errors::FieldIoError,
    record::FieldData,
};

use super::{
    parquet_io::{self, FileReaderBuilder},
    StoreReader,
};

/// Reader decoding only the selected rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectedReader;

/// Sorted, deduplicated copy of `rows`.
fn sorted_unique(rows: &[usize]) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Runs of consecutive values of a sorted, deduplicated slice.
fn consecutive_runs(sorted: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for &row in sorted {
        match runs.last_mut() {
            Some(run) if run.end == row => run.end += 1,
            _ => runs.push(row..row + 1),
        }
    }
    runs
}

/// Position of every requested row within the decoded, sorted rows.
fn positions_in(sorted: &[usize], rows: &[usize]) -> Vec<usize> {
    rows.iter()
        .map(|r| sorted.partition_point(|s| s < r))
        .collect()
}

fn check_rows(sorted: &[usize], len: usize, axis: &'static str) -> Result<(), FieldIoError> {
    match sorted.last() {
        Some(&last) if last >= len => Err(FieldIoError::InvalidRowIndex {
            axis,
            index: last as i64,
            len,
        }),
        _ => Ok(()),
    }
}

/// Builder restricted to the runs of `sorted`.
fn select_rows(
    builder: FileReaderBuilder,
    sorted: &[usize],
    axis: &'static str,
) -> Result<FileReaderBuilder, FieldIoError> {
    let total = parquet_io::row_count(&builder);
    check_rows(sorted, total, axis)?;
    let selection =
        RowSelection::from_consecutive_ranges(consecutive_runs(sorted).into_iter(), total);
    Ok(builder.with_row_selection(selection))
}

impl StoreReader for ProjectedReader {
    fn read_table(
        &self,
        path: &Utf8Path,
        columns: &[&str],
        rows: &[usize],
    ) -> Result<Vec<FieldData>, FieldIoError> {
        let sorted = sorted_unique(rows);
        let builder = parquet_io::open(path)?;
        let mask = parquet_io::projection(&builder, path, columns)?;
        let mut decoded = columns
            .iter()
            .map(|name| {
                parquet_io::column_kind(&builder, path, name)
                    .map(|kind| FieldData::with_capacity(kind, sorted.len()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reader = select_rows(builder, &sorted, "table")?
            .with_projection(mask)
            .build()?;
        for maybe_batch in reader {
            let batch = maybe_batch?;
            for (name, data) in columns.iter().zip(decoded.iter_mut()) {
                let column = parquet_io::batch_column(&batch, name, path)?;
                data.extend(parquet_io::to_field_data(column.as_ref(), name)?);
            }
        }

        let positions = positions_in(&sorted, rows);
        Ok(decoded.iter().map(|data| data.gather(&positions)).collect())
    }

    fn read_array(
        &self,
        path: &Utf8Path,
        rows: &[usize],
        exposures: &[usize],
    ) -> Result<FieldData, FieldIoError> {
        let field = path.file_stem().unwrap_or(path.as_str());
        let sorted = sorted_unique(rows);
        let builder = parquet_io::open(path)?;
        let kind = parquet_io::list_kind(&builder, ARRAY_VALUES_COLUMN, path)?;
        let mask = parquet_io::projection(&builder, path, &[ARRAY_VALUES_COLUMN])?;
        let last_exposure = exposures.iter().max().copied();

        let reader = select_rows(builder, &sorted, "object")?
            .with_projection(mask)
            .build()?;

        let mut per_row: Vec<FieldData> = Vec::with_capacity(sorted.len());
        for maybe_batch in reader {
            let batch = maybe_batch?;
            let column = parquet_io::batch_column(&batch, ARRAY_VALUES_COLUMN, path)?;
            for i in 0..batch.num_rows() {
                let values = match parquet_io::list_row(column, i, field)? {
                    Some(values) => {
                        if let Some(last) = last_exposure.filter(|&last| last >= values.len()) {
                            return Err(FieldIoError::InvalidRowIndex {
                                axis: "time",
                                index: last as i64,
                                len: values.len(),
                            });
                        }
                        parquet_io::to_field_data(values.as_ref(), field)?.gather(exposures)
                    }
                    None => parquet_io::null_fill(kind, exposures.len()),
                };
                per_row.push(values);
            }
        }

        let mut block = FieldData::with_capacity(kind, rows.len() * exposures.len());
        for pos in positions_in(&sorted, rows) {
            if let Some(values) = per_row.get(pos) {
                block.extend(values.clone());
            }
        }
        Ok(block)
    }
}

#[cfg(test)]
mod projected_reader_test {
    use super::*;

    #[test]
    fn test_consecutive_runs() {
        assert_eq!(consecutive_runs(&[]), Vec::<Range<usize>>::new());
        assert_eq!(consecutive_runs(&[0, 1, 2, 5, 7, 8]), vec![0..3, 5..6, 7..9]);
    }

    #[test]
    fn test_positions_in() {
        let rows = [8, 2, 5];
        let sorted = sorted_unique(&rows);
        assert_eq!(sorted, vec![2, 5, 8]);
        assert_eq!(positions_in(&sorted, &rows), vec![2, 0, 1]);
    }

    #[test]
    fn test_check_rows() {
        assert!(check_rows(&[0, 4], 5, "object").is_ok());
        assert_eq!(
            check_rows(&[0, 5], 5, "object"),
            Err(FieldIoError::InvalidRowIndex {
                axis: "object",
                index: 5,
                len: 5
            })
        );
    }
}
