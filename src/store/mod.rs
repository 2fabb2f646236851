//! # Field stores and the readers that serve them
//!
//! A field (sky region) observed during one campaign is kept in three **stores**, each a
//! directory of Parquet files:
//!
//! | Store       | Files                                                        |
//! |-------------|--------------------------------------------------------------|
//! | primary     | `catalogue.parquet`, `imagelist.parquet`, `arrays/<NAME>.parquet` |
//! | detrend     | `arrays/<NAME>.parquet`                                      |
//! | candidate   | `catalogue.parquet`, `candidates.parquet`                    |
//!
//! An array file holds one row per object and a single list column `values` with one element
//! per exposure, so every array shares the object order of the primary catalogue and the
//! exposure order of the primary exposure table.
//!
//! ## Reading
//! -----------------
//! [`StoreReader`] is the capability both backends implement. A backend only knows how to pull
//! selected rows out of a flat table and a selected block out of an array file; the traversal
//! of the stores, zero-to-NaN replacement, fixed-point decoding and the candidate join are
//! provided once, by [`StoreReader::read`], so the backends cannot drift apart.
//!
//! [`FieldReader`] selects the backend once per call from a [`Backend`] value.
//!
//! ## Failure policy
//! -----------------
//! * A field present in no store is simply absent from the contributions.
//! * A missing store directory or table file contributes nothing and emits a warning.
//! * A file that exists but cannot be decoded is fatal.
//!
//! ## Candidate table
//! -----------------
//! The candidate table is not served by a backend. It is keyed by identifier rather than by
//! object row, so [`StoreReader::read`] always reads the requested columns of the whole table
//! and joins them on the selected identifiers.
pub mod lookup;
pub(crate) mod parquet_io;
pub mod projected_reader;
pub mod sliced_reader;

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    config::{Backend, FixedPointGroup, RetrievalConfig},
    constants::{
        FastHashMap, ObjectId, ARRAYS_DIR, ARRAY_VALUES_COLUMN, CANDIDATES_FILE, CATALOGUE_FILE,
        IMAGELIST_FILE, OBJ_ID, PARQUET_EXT, RANK,
    },
    fieldio_errors::FieldIoError,
    record::{FieldArray, FieldData},
    selection::{parse::pad_object_id, resolver::ResolvedSelection},
};

use self::{projected_reader::ProjectedReader, sliced_reader::SlicedReader};

/// Directories of the three stores of one field and campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocations {
    pub primary: Utf8PathBuf,
    pub detrend: Utf8PathBuf,
    pub candidate: Utf8PathBuf,
}

impl StoreLocations {
    pub fn new(
        primary: impl Into<Utf8PathBuf>,
        detrend: impl Into<Utf8PathBuf>,
        candidate: impl Into<Utf8PathBuf>,
    ) -> Self {
        StoreLocations {
            primary: primary.into(),
            detrend: detrend.into(),
            candidate: candidate.into(),
        }
    }

    /// `<root>/<field>_<campaign>/{primary,detrend,candidate}`.
    pub fn under_root(root: &Utf8Path, field: &str, campaign: &str) -> Self {
        let base = root.join(format!("{field}_{campaign}"));
        StoreLocations {
            primary: base.join("primary"),
            detrend: base.join("detrend"),
            candidate: base.join("candidate"),
        }
    }
}

/// One table of one store. The declaration order is the lookup precedence of field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreTable {
    PrimaryCatalogue,
    PrimaryImagelist,
    PrimaryArrays,
    DetrendArrays,
    CandidateCatalogue,
    CandidateTable,
}

impl StoreTable {
    pub const ALL: [StoreTable; 6] = [
        StoreTable::PrimaryCatalogue,
        StoreTable::PrimaryImagelist,
        StoreTable::PrimaryArrays,
        StoreTable::DetrendArrays,
        StoreTable::CandidateCatalogue,
        StoreTable::CandidateTable,
    ];
}

/// Arrays read from each store table.
pub type StoreContributions = BTreeMap<StoreTable, BTreeMap<String, FieldArray>>;

/// Capability shared by the two backends.
pub trait StoreReader {
    /// Read `columns` of a flat table at `rows`, in the order of `rows`.
    ///
    /// Return
    /// ------
    /// * one [`FieldData`] per column, in the order of `columns`
    fn read_table(
        &self,
        path: &Utf8Path,
        columns: &[&str],
        rows: &[usize],
    ) -> Result<Vec<FieldData>, FieldIoError>;

    /// Read the `rows × exposures` block of an array file, row-major, in the given orders.
    fn read_array(
        &self,
        path: &Utf8Path,
        rows: &[usize],
        exposures: &[usize],
    ) -> Result<FieldData, FieldIoError>;

    /// Read every requested field from the stores.
    ///
    /// Tables are visited in precedence order and a name is looked up only until a table
    /// supplies it, so each name comes from exactly one table. `OBJ_ID` is never read: the
    /// record takes it from the resolved canonical identifiers.
    ///
    /// Arguments
    /// ---------
    /// * `locations`: store directories
    /// * `selection`: resolved object rows and identifiers, and exposure rows
    /// * `fields`: requested field names
    /// * `config`: fixed-point groups, candidate rank and warning policy
    ///
    /// Return
    /// ------
    /// * the arrays contributed by each table
    fn read(
        &self,
        locations: &StoreLocations,
        selection: &ResolvedSelection,
        fields: &[String],
        config: &RetrievalConfig,
    ) -> Result<StoreContributions, FieldIoError> {
        let mut pending: Vec<&str> = fields
            .iter()
            .map(String::as_str)
            .filter(|f| *f != OBJ_ID)
            .unique()
            .collect();
        let mut contributions = StoreContributions::new();

        for table in StoreTable::ALL {
            if pending.is_empty() {
                break;
            }
            let arrays = match table {
                StoreTable::PrimaryCatalogue => read_flat_table(
                    self,
                    &locations.primary.join(CATALOGUE_FILE),
                    &pending,
                    &selection.objects.rows,
                    FieldArray::per_object,
                    config.quiet,
                )?,
                StoreTable::PrimaryImagelist => read_flat_table(
                    self,
                    &locations.primary.join(IMAGELIST_FILE),
                    &pending,
                    &selection.exposures,
                    FieldArray::per_exposure,
                    config.quiet,
                )?,
                StoreTable::PrimaryArrays => {
                    read_arrays(self, &locations.primary, &pending, selection, config)?
                }
                StoreTable::DetrendArrays => {
                    read_arrays(self, &locations.detrend, &pending, selection, config)?
                }
                StoreTable::CandidateCatalogue => read_flat_table(
                    self,
                    &locations.candidate.join(CATALOGUE_FILE),
                    &pending,
                    &selection.objects.rows,
                    FieldArray::per_object,
                    config.quiet,
                )?,
                StoreTable::CandidateTable => read_candidates(
                    &locations.candidate.join(CANDIDATES_FILE),
                    &pending,
                    &selection.objects.ids,
                    config,
                )?,
            };

            if !arrays.is_empty() {
                debug!(table = ?table, n_fields = arrays.len(), "store table read");
                pending.retain(|f| !arrays.contains_key(*f));
                contributions.insert(table, arrays);
            }
        }
        Ok(contributions)
    }
}

/// The backend selected for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldReader {
    Projected(ProjectedReader),
    Sliced(SlicedReader),
}

impl FieldReader {
    pub fn new(backend: Backend) -> Self {
        match backend {
            Backend::Projected => FieldReader::Projected(ProjectedReader),
            Backend::Sliced => FieldReader::Sliced(SlicedReader),
        }
    }
}

impl StoreReader for FieldReader {
    fn read_table(
        &self,
        path: &Utf8Path,
        columns: &[&str],
        rows: &[usize],
    ) -> Result<Vec<FieldData>, FieldIoError> {
        match self {
            FieldReader::Projected(reader) => reader.read_table(path, columns, rows),
            FieldReader::Sliced(reader) => reader.read_table(path, columns, rows),
        }
    }

    fn read_array(
        &self,
        path: &Utf8Path,
        rows: &[usize],
        exposures: &[usize],
    ) -> Result<FieldData, FieldIoError> {
        match self {
            FieldReader::Projected(reader) => reader.read_array(path, rows, exposures),
            FieldReader::Sliced(reader) => reader.read_array(path, rows, exposures),
        }
    }
}

fn warn_missing(path: &Utf8Path, quiet: bool) {
    if !quiet {
        warn!(%path, "store file not found, nothing read from it");
    }
}

/// Path of the array file of `field` inside a store directory.
pub fn array_path(store: &Utf8Path, field: &str) -> Utf8PathBuf {
    store.join(ARRAYS_DIR).join(format!("{field}.{PARQUET_EXT}"))
}

/// Canonical identifiers from an identifier column of any kind.
pub(crate) fn object_ids_from(data: FieldData) -> Vec<ObjectId> {
    match data {
        FieldData::Text(v) => v.iter().map(|id| pad_object_id(id)).collect(),
        FieldData::Int(v) => v.iter().map(|id| pad_object_id(&id.to_string())).collect(),
        FieldData::Float(v) => v
            .iter()
            .map(|id| pad_object_id(&(*id as i64).to_string()))
            .collect(),
    }
}

/// Integer values of a numeric column; text that does not parse becomes 0.
pub(crate) fn integers_from(data: FieldData) -> Vec<i64> {
    match data {
        FieldData::Int(v) => v,
        FieldData::Float(v) => v.into_iter().map(|x| x as i64).collect(),
        FieldData::Text(v) => v.iter().map(|s| s.trim().parse().unwrap_or(0)).collect(),
    }
}

/// Replace zero samples of float data with NaN; other kinds are returned unchanged.
pub(crate) fn zero_to_nan(data: FieldData) -> FieldData {
    match data {
        FieldData::Float(v) => FieldData::Float(
            v.into_iter()
                .map(|x| if x == 0.0 { f64::NAN } else { x })
                .collect(),
        ),
        other => other,
    }
}

/// Apply a fixed-point decoding, if the field belongs to a group.
pub(crate) fn decode_fixed_point(group: Option<&FixedPointGroup>, data: FieldData) -> FieldData {
    let Some(group) = group else {
        return data;
    };
    match data.into_float() {
        FieldData::Float(v) => {
            FieldData::Float(v.into_iter().map(|raw| group.decode(raw)).collect())
        }
        text => text,
    }
}

fn read_flat_table<R, W>(
    reader: &R,
    path: &Utf8Path,
    pending: &[&str],
    rows: &[usize],
    wrap: W,
    quiet: bool,
) -> Result<BTreeMap<String, FieldArray>, FieldIoError>
where
    R: StoreReader + ?Sized,
    W: Fn(FieldData) -> FieldArray,
{
    if !path.is_file() {
        warn_missing(path, quiet);
        return Ok(BTreeMap::new());
    }
    let kinds: FastHashMap<String, _> = parquet_io::column_kinds(path)?.into_iter().collect();
    let columns: Vec<&str> = pending
        .iter()
        .copied()
        .filter(|f| kinds.contains_key(*f))
        .collect();
    if columns.is_empty() {
        return Ok(BTreeMap::new());
    }

    let data = if rows.is_empty() {
        columns
            .iter()
            .filter_map(|c| kinds.get(*c).map(|kind| FieldData::empty(*kind)))
            .collect()
    } else {
        reader.read_table(path, &columns, rows)?
    };

    Ok(columns
        .into_iter()
        .zip(data)
        .map(|(name, data)| (name.to_string(), wrap(data)))
        .collect())
}

fn read_arrays<R: StoreReader + ?Sized>(
    reader: &R,
    store: &Utf8Path,
    pending: &[&str],
    selection: &ResolvedSelection,
    config: &RetrievalConfig,
) -> Result<BTreeMap<String, FieldArray>, FieldIoError> {
    if !store.is_dir() {
        warn_missing(store, config.quiet);
        return Ok(BTreeMap::new());
    }
    let rows = &selection.objects.rows;
    let exposures = &selection.exposures;

    let mut arrays = BTreeMap::new();
    for &field in pending {
        let path = array_path(store, field);
        if !path.is_file() {
            continue;
        }
        let data = if rows.is_empty() || exposures.is_empty() {
            let builder = parquet_io::open(&path)?;
            let kind = parquet_io::list_kind(&builder, ARRAY_VALUES_COLUMN, &path)?;
            FieldData::empty(kind)
        } else {
            reader.read_array(&path, rows, exposures)?
        };
        // before decoding, so integer-stored arrays keep their zeros
        let data = if config.set_nan { zero_to_nan(data) } else { data };
        let data = decode_fixed_point(config.fixed_point_for(field), data);
        arrays.insert(
            field.to_string(),
            FieldArray::per_object_exposure(rows.len(), exposures.len(), data),
        );
    }
    Ok(arrays)
}

/// Join the candidate table on the selected identifiers.
///
/// Only rows of the canonical rank take part; the first such row of an identifier wins. A
/// selected object without one gets the zero value of every requested column.
fn read_candidates(
    path: &Utf8Path,
    pending: &[&str],
    object_ids: &[ObjectId],
    config: &RetrievalConfig,
) -> Result<BTreeMap<String, FieldArray>, FieldIoError> {
    if !path.is_file() {
        warn_missing(path, config.quiet);
        return Ok(BTreeMap::new());
    }
    let kinds: FastHashMap<String, _> = parquet_io::column_kinds(path)?.into_iter().collect();
    let columns: Vec<&str> = pending
        .iter()
        .copied()
        .filter(|f| kinds.contains_key(*f))
        .collect();
    if columns.is_empty() {
        return Ok(BTreeMap::new());
    }
    if object_ids.is_empty() {
        return Ok(columns
            .into_iter()
            .filter_map(|c| {
                let kind = kinds.get(c)?;
                Some((c.to_string(), FieldArray::per_object(FieldData::empty(*kind))))
            })
            .collect());
    }

    let mut wanted = vec![OBJ_ID, RANK];
    wanted.extend_from_slice(&columns);
    let mut data = parquet_io::read_columns(path, &wanted)?.into_iter();
    let (Some(ids), Some(ranks)) = (data.next(), data.next()) else {
        return Ok(BTreeMap::new());
    };

    let mut row_of: FastHashMap<ObjectId, usize> = FastHashMap::default();
    for (row, (id, rank)) in object_ids_from(ids)
        .into_iter()
        .zip(integers_from(ranks))
        .enumerate()
    {
        if rank == config.candidate_rank {
            row_of.entry(id).or_insert(row);
        }
    }
    let positions: Vec<Option<usize>> = object_ids
        .iter()
        .map(|id| row_of.get(id).copied())
        .collect();
    debug!(
        n_matched = positions.iter().flatten().count(),
        n_objects = object_ids.len(),
        "candidate table joined"
    );

    Ok(columns
        .into_iter()
        .zip(data)
        .map(|(name, values)| {
            (
                name.to_string(),
                FieldArray::per_object(values.gather_or_zero(&positions)),
            )
        })
        .collect())
}

#[cfg(test)]
mod store_test {
    use super::*;

    #[test]
    fn test_under_root() {
        let locations = StoreLocations::under_root(Utf8Path::new("/data"), "NG0304-1115", "802");
        assert_eq!(locations.primary, "/data/NG0304-1115_802/primary");
        assert_eq!(locations.detrend, "/data/NG0304-1115_802/detrend");
        assert_eq!(locations.candidate, "/data/NG0304-1115_802/candidate");
    }

    #[test]
    fn test_array_path() {
        assert_eq!(
            array_path(Utf8Path::new("/data/primary"), "FLUX"),
            "/data/primary/arrays/FLUX.parquet"
        );
    }

    #[test]
    fn test_object_ids_from() {
        assert_eq!(
            object_ids_from(FieldData::Int(vec![46, 123456])),
            vec!["000046".to_string(), "123456".to_string()]
        );
        assert_eq!(
            object_ids_from(FieldData::Text(vec!["11".into()])),
            vec!["000011".to_string()]
        );
    }

    #[test]
    fn test_zero_to_nan() {
        let data = zero_to_nan(FieldData::Float(vec![0.0, -0.0, 2.5, f64::NAN]));
        let v = data.as_float().unwrap();
        assert!(v[0].is_nan() && v[1].is_nan() && v[3].is_nan());
        assert_eq!(v[2], 2.5);
        assert_eq!(zero_to_nan(FieldData::Int(vec![0, 1])), FieldData::Int(vec![0, 1]));
    }

    #[test]
    fn test_decode_fixed_point() {
        let group = FixedPointGroup::new("centroid_position", &["CCDX"], 1024.0, 0.5);
        assert_eq!(
            decode_fixed_point(Some(&group), FieldData::Int(vec![1024, -512])),
            FieldData::Float(vec![1.5, 0.0])
        );
        assert_eq!(
            decode_fixed_point(None, FieldData::Int(vec![1024])),
            FieldData::Int(vec![1024])
        );
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(
            FieldReader::new(Backend::Sliced),
            FieldReader::Sliced(SlicedReader)
        );
        assert_eq!(
            FieldReader::new(Backend::Projected),
            FieldReader::Projected(ProjectedReader)
        );
    }
}
