#![allow(dead_code)]

use std::{fs::File, sync::Arc};

use arrow_array::{
    types::{Float32Type, Float64Type, Int16Type, Int32Type},
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, ListArray, RecordBatch,
    StringArray,
};
use camino::{Utf8Path, Utf8PathBuf};
use fieldio::store::StoreLocations;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};
use tempfile::TempDir;

pub const FIELD: &str = "NG0304-1115";
pub const CAMPAIGN: &str = "802";

pub const OBJ_IDS: [&str; 5] = ["000002", "000011", "000046", "000049", "000054"];
pub const N_EXPOSURES: usize = 6;

pub const DATES: [&str; N_EXPOSURES] = [
    "2015-11-04T00:10:00",
    "2015-11-04T00:20:00",
    "2015-11-15T01:00:00",
    "2015-11-15T01:10:00",
    "not-a-date",
    "2015-11-27T03:00:00",
];
pub const ACTION_IDS: [i64; N_EXPOSURES] = [108583, 108583, 108590, 108590, 108600, 109754];
pub const HJD: [f64; N_EXPOSURES] = [7330.1, 7330.4, 7341.2, 7341.3, 7342.6, 7353.9];

/// Object row whose FLUX has a null element.
pub const NULL_FLUX_AT: (usize, usize) = (3, 2);
/// Object row whose SKYBKG row is null.
pub const NULL_SKYBKG_ROW: usize = 3;

pub fn flux(obj: usize, exp: usize) -> f64 {
    1000.0 + 100.0 * obj as f64 + exp as f64
}

pub fn ccdx_raw(obj: usize, exp: usize) -> i32 {
    (obj as i32 + 1) * 1024 + exp as i32 * 512
}

pub fn ccdx(obj: usize, exp: usize) -> f64 {
    obj as f64 + 1.0 + exp as f64 * 0.5
}

pub fn centdx_raw(exp: usize) -> i16 {
    exp as i16 * 256 - 512
}

pub fn centdx(exp: usize) -> f64 {
    exp as f64 * 0.25 - 0.5
}

/// A synthetic field written under a temporary directory.
pub struct SyntheticField {
    pub dir: TempDir,
    pub root: Utf8PathBuf,
    pub locations: StoreLocations,
}

fn col<A: Array + 'static>(array: A) -> ArrayRef {
    Arc::new(array)
}

fn write_parquet(path: &Utf8Path, columns: Vec<(&str, ArrayRef)>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let batch = RecordBatch::try_from_iter(columns).unwrap();
    // Small row groups so that row selections cross group boundaries.
    let props = WriterProperties::builder()
        .set_max_row_group_size(2)
        .build();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn array_file(store: &Utf8Path, name: &str, values: ListArray) {
    let path = store.join("arrays").join(format!("{name}.parquet"));
    write_parquet(&path, vec![("values", col(values))]);
}

fn float_list(f: impl Fn(usize, usize) -> Option<f64>) -> ListArray {
    ListArray::from_iter_primitive::<Float64Type, _, _>(
        (0..OBJ_IDS.len()).map(|obj| {
            Some(
                (0..N_EXPOSURES)
                    .map(|exp| f(obj, exp))
                    .collect::<Vec<_>>(),
            )
        }),
    )
}

fn write_primary(store: &Utf8Path) {
    let n = OBJ_IDS.len();
    write_parquet(
        &store.join("catalogue.parquet"),
        vec![
            ("OBJ_ID", col(StringArray::from(OBJ_IDS.to_vec()))),
            (
                "RA",
                col(Float64Array::from_iter_values((0..n).map(|i| 10.0 + i as f64))),
            ),
            (
                "DEC",
                col(Float64Array::from_iter_values((0..n).map(|i| -20.0 - i as f64))),
            ),
            (
                "MAG",
                col(Float32Array::from_iter_values((0..n).map(|i| 12.5 + i as f32))),
            ),
            ("NPTS", col(Int32Array::from(vec![N_EXPOSURES as i32; n]))),
        ],
    );

    write_parquet(
        &store.join("imagelist.parquet"),
        vec![
            ("DATE-OBS", col(StringArray::from(DATES.to_vec()))),
            ("ACTIONID", col(Int64Array::from(ACTION_IDS.to_vec()))),
            (
                "AIRMASS",
                col(Float64Array::from_iter_values(
                    (0..N_EXPOSURES).map(|e| 1.0 + 0.125 * e as f64),
                )),
            ),
        ],
    );

    array_file(
        store,
        "HJD",
        float_list(|obj, exp| Some(HJD[exp] + obj as f64 * 1e-5)),
    );
    array_file(
        store,
        "FLUX",
        float_list(|obj, exp| {
            if (obj, exp) == NULL_FLUX_AT {
                None
            } else {
                Some(flux(obj, exp))
            }
        }),
    );
    array_file(
        store,
        "SKYBKG",
        ListArray::from_iter_primitive::<Float64Type, _, _>((0..n).map(|obj| {
            if obj == NULL_SKYBKG_ROW {
                None
            } else {
                Some((0..N_EXPOSURES).map(|exp| Some(10.0 + exp as f64)).collect::<Vec<_>>())
            }
        })),
    );
    array_file(
        store,
        "FLAGS",
        ListArray::from_iter_primitive::<Int32Type, _, _>((0..n).map(|obj| {
            Some(
                (0..N_EXPOSURES)
                    .map(|exp| Some(obj as i32 * 10 + exp as i32))
                    .collect::<Vec<_>>(),
            )
        })),
    );
    array_file(
        store,
        "CCDX",
        ListArray::from_iter_primitive::<Int32Type, _, _>((0..n).map(|obj| {
            Some(
                (0..N_EXPOSURES)
                    .map(|exp| Some(ccdx_raw(obj, exp)))
                    .collect::<Vec<_>>(),
            )
        })),
    );
    array_file(
        store,
        "CENTDX",
        ListArray::from_iter_primitive::<Int16Type, _, _>((0..n).map(|_| {
            Some(
                (0..N_EXPOSURES)
                    .map(|exp| Some(centdx_raw(exp)))
                    .collect::<Vec<_>>(),
            )
        })),
    );
}

fn write_detrend(store: &Utf8Path) {
    array_file(store, "FLUX", float_list(|_, _| Some(-1.0)));
    array_file(
        store,
        "SYSREM_FLUX3",
        ListArray::from_iter_primitive::<Float32Type, _, _>((0..OBJ_IDS.len()).map(|obj| {
            Some(
                (0..N_EXPOSURES)
                    .map(|exp| Some(0.5 * flux(obj, exp) as f32))
                    .collect::<Vec<_>>(),
            )
        })),
    );
}

pub struct CandidateRow {
    pub obj_id: &'static str,
    pub rank: i32,
    pub period: f64,
    pub name: &'static str,
}

const fn candidate(
    obj_id: &'static str,
    rank: i32,
    period: f64,
    name: &'static str,
) -> CandidateRow {
    CandidateRow {
        obj_id,
        rank,
        period,
        name,
    }
}

/// The second rank-1 row of 000046 must never be picked.
pub const CANDIDATES: [CandidateRow; 5] = [
    candidate("000046", 1, 1.5, "NOI-101"),
    candidate("000046", 2, 3.0, "NOI-102"),
    candidate("000054", 2, 4.0, "NOI-103"),
    candidate("000002", 1, 2.25, "NOI-104"),
    candidate("000046", 1, 9.9, "NOI-105"),
];

fn write_candidate(store: &Utf8Path) {
    let n = OBJ_IDS.len();
    write_parquet(
        &store.join("catalogue.parquet"),
        vec![
            ("OBJ_ID", col(StringArray::from(OBJ_IDS.to_vec()))),
            ("RA", col(Float64Array::from(vec![99.0; n]))),
            (
                "RMS",
                col(Float64Array::from_iter_values((0..n).map(|i| 0.25 * (i + 1) as f64))),
            ),
        ],
    );
    write_parquet(
        &store.join("candidates.parquet"),
        vec![
            (
                "OBJ_ID",
                col(StringArray::from_iter_values(CANDIDATES.iter().map(|c| c.obj_id))),
            ),
            (
                "RANK",
                col(Int32Array::from_iter_values(CANDIDATES.iter().map(|c| c.rank))),
            ),
            (
                "PERIOD",
                col(Float64Array::from_iter_values(CANDIDATES.iter().map(|c| c.period))),
            ),
            (
                "CANDIDATE_NAME",
                col(StringArray::from_iter_values(CANDIDATES.iter().map(|c| c.name))),
            ),
        ],
    );
}

/// Write the three stores of a synthetic field under `<tmp>/<FIELD>_<CAMPAIGN>/`.
pub fn synthetic_field() -> SyntheticField {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
    let locations = StoreLocations::under_root(&root, FIELD, CAMPAIGN);

    write_primary(&locations.primary);
    write_detrend(&locations.detrend);
    write_candidate(&locations.candidate);

    SyntheticField {
        dir,
        root,
        locations,
    }
}

/// Add a float array to the primary store.
pub fn write_float_array(
    field: &SyntheticField,
    name: &str,
    f: impl Fn(usize, usize) -> Option<f64>,
) {
    array_file(&field.locations.primary, name, float_list(f));
}

/// Replace the primary catalogue with one whose `OBJ_ID` column holds unpadded integers.
pub fn write_integer_id_catalogue(field: &SyntheticField) {
    let ids = OBJ_IDS.iter().map(|id| id.parse::<i64>().unwrap());
    write_parquet(
        &field.locations.primary.join("catalogue.parquet"),
        vec![
            ("OBJ_ID", col(Int64Array::from_iter_values(ids))),
            (
                "RA",
                col(Float64Array::from_iter_values(
                    (0..OBJ_IDS.len()).map(|i| 10.0 + i as f64),
                )),
            ),
        ],
    );
}

/// Write a list file with one value per line.
pub fn list_file(field: &SyntheticField, name: &str, lines: &[&str]) -> Utf8PathBuf {
    let path = field.root.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}
