//! [`IndexLookup`] over the Parquet files of a field's stores.
use camino::Utf8Path;
use tracing::{debug, warn};

use crate::{
    constants::{
        ActionId, HjdDay, ObjectId, ACTIONID, ARRAY_VALUES_COLUMN, CANDIDATES_FILE,
        CATALOGUE_FILE, DATE_OBS, HJD, IMAGELIST_FILE, OBJ_ID, RANK,
    },
    fieldio_errors::FieldIoError,
    record::FieldData,
    selection::{parse::parse_date_prefix, resolver::IndexLookup},
    time::{hjd_day, ObsDate},
};

use super::{array_path, integers_from, object_ids_from, parquet_io, StoreLocations};

/// Read-only lookups into the primary and candidate stores.
///
/// A missing file yields an empty lookup and a warning, so an absent primary store resolves to
/// an empty selection instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct ParquetIndex<'a> {
    locations: &'a StoreLocations,
    quiet: bool,
}

impl<'a> ParquetIndex<'a> {
    pub fn new(locations: &'a StoreLocations, quiet: bool) -> Self {
        ParquetIndex { locations, quiet }
    }

    /// Whether `path` exists; warns when it does not.
    fn present(&self, path: &Utf8Path) -> bool {
        let exists = path.is_file();
        if !exists && !self.quiet {
            warn!(%path, "store file not found, lookup is empty");
        }
        exists
    }

    /// Every row of a single flat column, `None` when the file is missing.
    fn column(&self, path: &Utf8Path, name: &str) -> Result<Option<FieldData>, FieldIoError> {
        if !self.present(path) {
            return Ok(None);
        }
        Ok(parquet_io::read_columns(path, &[name])?.into_iter().next())
    }
}

impl IndexLookup for ParquetIndex<'_> {
    fn object_ids(&self) -> Result<Vec<ObjectId>, FieldIoError> {
        let path = self.locations.primary.join(CATALOGUE_FILE);
        let ids = self
            .column(&path, OBJ_ID)?
            .map(object_ids_from)
            .unwrap_or_default();
        debug!(n_objects = ids.len(), "catalog identifiers loaded");
        Ok(ids)
    }

    fn exposure_count(&self) -> Result<usize, FieldIoError> {
        let path = self.locations.primary.join(IMAGELIST_FILE);
        if !self.present(&path) {
            return Ok(0);
        }
        Ok(parquet_io::row_count(&parquet_io::open(&path)?))
    }

    fn exposure_dates(&self) -> Result<Vec<Option<ObsDate>>, FieldIoError> {
        let path = self.locations.primary.join(IMAGELIST_FILE);
        let dates = match self.column(&path, DATE_OBS)? {
            Some(FieldData::Text(v)) => v.iter().map(|s| parse_date_prefix(s)).collect(),
            Some(FieldData::Int(v)) => v
                .iter()
                .map(|d| parse_date_prefix(&d.to_string()))
                .collect(),
            Some(FieldData::Float(v)) => vec![None; v.len()],
            None => Vec::new(),
        };
        Ok(dates)
    }

    fn exposure_action_ids(&self) -> Result<Vec<ActionId>, FieldIoError> {
        let path = self.locations.primary.join(IMAGELIST_FILE);
        Ok(self
            .column(&path, ACTIONID)?
            .map(integers_from)
            .unwrap_or_default())
    }

    /// Heliocentric days of the first object; every object shares the exposure times.
    fn exposure_hjd_days(&self) -> Result<Vec<HjdDay>, FieldIoError> {
        let path = array_path(&self.locations.primary, HJD);
        if !self.present(&path) {
            return Ok(Vec::new());
        }
        let days = match parquet_io::first_list_row(&path, ARRAY_VALUES_COLUMN)? {
            Some(FieldData::Float(v)) => v.into_iter().map(hjd_day).collect(),
            Some(FieldData::Int(v)) => v,
            Some(FieldData::Text(_)) | None => Vec::new(),
        };
        Ok(days)
    }

    fn candidate_object_ids(&self, rank: i64) -> Result<Vec<ObjectId>, FieldIoError> {
        let path = self.locations.candidate.join(CANDIDATES_FILE);
        if !self.present(&path) {
            return Ok(Vec::new());
        }
        let mut columns = parquet_io::read_columns(&path, &[OBJ_ID, RANK])?.into_iter();
        let (Some(ids), Some(ranks)) = (columns.next(), columns.next()) else {
            return Ok(Vec::new());
        };
        Ok(object_ids_from(ids)
            .into_iter()
            .zip(integers_from(ranks))
            .filter(|(_, r)| *r == rank)
            .map(|(id, _)| id)
            .collect())
    }
}
