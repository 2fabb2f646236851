//! # Selection resolver
//!
//! Turns an [`ObjectSelector`] and a [`TimeSelector`] into canonical index lists.
//!
//! The resolver performs no I/O of its own: every cross-reference goes through the
//! [`IndexLookup`] capability, implemented over Parquet files by
//! [`ParquetIndex`](crate::store::lookup::ParquetIndex) and by in-memory tables in tests.
//! Each lookup is called at most once per resolution, and only when the selector needs it.
//!
//! ## Ordering
//! -----------------
//! * Objects come back in **request order** (`ById`, `ByRow`) with duplicates dropped, or in
//!   **catalog order** (`All`, `Candidates`).
//! * Exposures selected by index come back **as given**; exposures selected by value (date,
//!   heliocentric day, batch id) come back in ascending exposure order.
//!
//! ## Failure policy
//! -----------------
//! | Condition                                 | Outcome                         |
//! |-------------------------------------------|---------------------------------|
//! | identifier absent from the catalog        | warning, identifier omitted     |
//! | row outside the catalog                   | fatal `InvalidRowIndex`         |
//! | exposure index outside the exposure axis  | fatal `InvalidRowIndex`         |
//! | date without exposures                    | warning, date omitted           |
//! | heliocentric day without exposures        | fatal `HjdNotFound`             |
//! | batch id without exposures                | warning, batch id omitted       |
use std::collections::HashSet;

use ahash::RandomState;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    config::IndexingBase,
    constants::{ActionId, ActionIdSpan, ExposureRow, FastHashMap, HjdDay, ObjectId, ObjectRow},
    fieldio_errors::FieldIoError,
    time::ObsDate,
};

use super::{ObjectSelector, TimeSelector};

/// Read-only lookups into the primary and candidate stores needed to resolve selectors.
pub trait IndexLookup {
    /// Identifiers of every object, in catalog order.
    fn object_ids(&self) -> Result<Vec<ObjectId>, FieldIoError>;

    /// Number of exposures.
    fn exposure_count(&self) -> Result<usize, FieldIoError>;

    /// Observation date of every exposure; `None` when the stored value cannot be read as a date.
    fn exposure_dates(&self) -> Result<Vec<Option<ObsDate>>, FieldIoError>;

    /// Exposure-batch identifier of every exposure.
    fn exposure_action_ids(&self) -> Result<Vec<ActionId>, FieldIoError>;

    /// Whole heliocentric day of every exposure.
    fn exposure_hjd_days(&self) -> Result<Vec<HjdDay>, FieldIoError>;

    /// Identifiers holding at least one candidate detection of the given rank.
    fn candidate_object_ids(&self, rank: i64) -> Result<Vec<ObjectId>, FieldIoError>;
}

/// Resolved object axis: parallel rows and identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedObjects {
    pub rows: Vec<ObjectRow>,
    pub ids: Vec<ObjectId>,
}

impl ResolvedObjects {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Both resolved axes of a retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub objects: ResolvedObjects,
    pub exposures: Vec<ExposureRow>,
}

pub struct SelectionResolver<'a, L: IndexLookup> {
    lookup: &'a L,
    candidate_rank: i64,
    quiet: bool,
}

impl<'a, L: IndexLookup> SelectionResolver<'a, L> {
    pub fn new(lookup: &'a L, candidate_rank: i64, quiet: bool) -> Self {
        SelectionResolver {
            lookup,
            candidate_rank,
            quiet,
        }
    }

    /// Resolve the object axis.
    ///
    /// Arguments
    /// ---------
    /// * `selector`: canonical object selector
    /// * `indexing`: convention of `ByRow` row numbers
    ///
    /// Return
    /// ------
    /// * rows into the object dimension and the parallel canonical identifiers
    pub fn resolve_objects(
        &self,
        selector: &ObjectSelector,
        indexing: IndexingBase,
    ) -> Result<ResolvedObjects, FieldIoError> {
        let catalog = self.lookup.object_ids()?;

        let resolved = match selector {
            ObjectSelector::All => ResolvedObjects {
                rows: (0..catalog.len()).collect(),
                ids: catalog,
            },
            ObjectSelector::ById(ids) => {
                let row_of: FastHashMap<&str, ObjectRow> = catalog
                    .iter()
                    .enumerate()
                    .map(|(row, id)| (id.as_str(), row))
                    .collect();

                let mut resolved = ResolvedObjects::default();
                for id in ids.iter().unique() {
                    match row_of.get(id.as_str()) {
                        Some(&row) => {
                            resolved.rows.push(row);
                            resolved.ids.push(id.clone());
                        }
                        None if !self.quiet => {
                            warn!(obj_id = %id, "object identifier not found in catalog, skipped")
                        }
                        None => {}
                    }
                }
                resolved
            }
            ObjectSelector::ByRow(rows) => {
                let mut resolved = ResolvedObjects::default();
                for &raw in rows.iter().unique() {
                    let Some(row) = indexing
                        .to_zero_based(raw)
                        .filter(|row| *row < catalog.len())
                    else {
                        return Err(FieldIoError::InvalidRowIndex {
                            axis: "object",
                            index: raw,
                            len: catalog.len(),
                        });
                    };
                    resolved.rows.push(row);
                    resolved.ids.push(catalog[row].clone());
                }
                resolved
            }
            ObjectSelector::Candidates => {
                let with_candidate: HashSet<ObjectId, RandomState> = self
                    .lookup
                    .candidate_object_ids(self.candidate_rank)?
                    .into_iter()
                    .collect();
                let (rows, ids) = catalog
                    .into_iter()
                    .enumerate()
                    .filter(|(_, id)| with_candidate.contains(id))
                    .unzip();
                ResolvedObjects { rows, ids }
            }
        };

        debug!(n_objects = resolved.len(), "object selection resolved");
        Ok(resolved)
    }

    /// Resolve the time axis into exposure rows.
    pub fn resolve_time(&self, selector: &TimeSelector) -> Result<Vec<ExposureRow>, FieldIoError> {
        let rows = match selector {
            TimeSelector::All => (0..self.lookup.exposure_count()?).collect(),
            TimeSelector::ByIndex(indices) => {
                let n = self.lookup.exposure_count()?;
                indices
                    .iter()
                    .map(|&i| {
                        usize::try_from(i)
                            .ok()
                            .filter(|row| *row < n)
                            .ok_or(FieldIoError::InvalidRowIndex {
                                axis: "time",
                                index: i,
                                len: n,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            TimeSelector::ByDate(dates) => {
                let per_exposure = self.lookup.exposure_dates()?;
                self.match_values(dates, &per_exposure, |date| {
                    if !self.quiet {
                        warn!(date = %date, "no exposure on this date, skipped");
                    }
                    Ok(())
                })?
            }
            TimeSelector::ByHjd(days) => {
                let per_exposure: Vec<Option<HjdDay>> = self
                    .lookup
                    .exposure_hjd_days()?
                    .into_iter()
                    .map(Some)
                    .collect();
                self.match_values(days, &per_exposure, |day| {
                    Err(FieldIoError::HjdNotFound(*day))
                })?
            }
            TimeSelector::ByActionId(spans) => {
                let per_exposure = self.lookup.exposure_action_ids()?;
                self.match_spans(spans, &per_exposure)?
            }
        };

        debug!(n_exposures = rows.len(), "time selection resolved");
        Ok(rows)
    }

    /// Rows whose batch id falls in one of `spans`, ascending.
    ///
    /// One-element spans go through a hash lookup; wider spans are intersected with the
    /// exposure table, so their cost never depends on their width.
    fn match_spans(
        &self,
        spans: &[ActionIdSpan],
        per_exposure: &[ActionId],
    ) -> Result<Vec<ExposureRow>, FieldIoError> {
        let (singles, ranges): (Vec<_>, Vec<_>) =
            spans.iter().partition(|span| span.start() == span.end());

        let wanted: Vec<ActionId> = singles.iter().map(|span| *span.start()).collect();
        let known: Vec<Option<ActionId>> = per_exposure.iter().copied().map(Some).collect();
        let mut rows = self.match_values(&wanted, &known, |action_id| {
            if !self.quiet {
                warn!(action_id, "no exposure with this action id, skipped");
            }
            Ok(())
        })?;

        for span in ranges {
            let before = rows.len();
            rows.extend(
                per_exposure
                    .iter()
                    .positions(|action_id| span.contains(action_id)),
            );
            if rows.len() == before && !self.quiet {
                warn!(
                    start = span.start(),
                    end = span.end(),
                    "no exposure in this action id range, skipped"
                );
            }
        }
        rows.sort_unstable();
        rows.dedup();
        Ok(rows)
    }

    /// Rows whose value is among `wanted`, ascending; `on_unmatched` decides the fate of a
    /// wanted value without any matching exposure.
    fn match_values<T, F>(
        &self,
        wanted: &[T],
        per_exposure: &[Option<T>],
        mut on_unmatched: F,
    ) -> Result<Vec<ExposureRow>, FieldIoError>
    where
        T: std::hash::Hash + Eq,
        F: FnMut(&T) -> Result<(), FieldIoError>,
    {
        let mut rows_of: FastHashMap<&T, Vec<ExposureRow>> =
            FastHashMap::with_capacity_and_hasher(per_exposure.len(), RandomState::default());
        for (row, value) in per_exposure.iter().enumerate() {
            if let Some(value) = value {
                rows_of.entry(value).or_default().push(row);
            }
        }

        let mut rows = Vec::new();
        for value in wanted {
            match rows_of.get(value) {
                Some(matched) => rows.extend_from_slice(matched),
                None => on_unmatched(value)?,
            }
        }
        rows.sort_unstable();
        rows.dedup();
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod resolver_test {
    use super::*;

    /// In-memory field with five objects and six exposures over three nights.
    pub(crate) struct MemoryIndex {
        pub ids: Vec<ObjectId>,
        pub dates: Vec<Option<ObsDate>>,
        pub action_ids: Vec<ActionId>,
        pub hjd_days: Vec<HjdDay>,
        pub candidates: Vec<(ObjectId, i64)>,
    }

    impl Default for MemoryIndex {
        fn default() -> Self {
            let d = |day| Some(ObsDate::new(2015, 11, day).unwrap());
            MemoryIndex {
                ids: ["000002", "000011", "000046", "000049", "000054"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                dates: vec![d(4), d(4), d(15), d(15), None, d(27)],
                action_ids: vec![108583, 108583, 108590, 108590, 108600, 109754],
                hjd_days: vec![700, 700, 701, 701, 702, 703],
                candidates: vec![
                    ("000046".into(), 1),
                    ("000046".into(), 2),
                    ("000054".into(), 2),
                    ("000002".into(), 1),
                ],
            }
        }
    }

    impl IndexLookup for MemoryIndex {
        fn object_ids(&self) -> Result<Vec<ObjectId>, FieldIoError> {
            Ok(self.ids.clone())
        }
        fn exposure_count(&self) -> Result<usize, FieldIoError> {
            Ok(self.dates.len())
        }
        fn exposure_dates(&self) -> Result<Vec<Option<ObsDate>>, FieldIoError> {
            Ok(self.dates.clone())
        }
        fn exposure_action_ids(&self) -> Result<Vec<ActionId>, FieldIoError> {
            Ok(self.action_ids.clone())
        }
        fn exposure_hjd_days(&self) -> Result<Vec<HjdDay>, FieldIoError> {
            Ok(self.hjd_days.clone())
        }
        fn candidate_object_ids(&self, rank: i64) -> Result<Vec<ObjectId>, FieldIoError> {
            Ok(self
                .candidates
                .iter()
                .filter(|(_, r)| *r == rank)
                .map(|(id, _)| id.clone())
                .collect())
        }
    }

    fn ids(list: &[&str]) -> Vec<ObjectId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_all_objects() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        let resolved = resolver
            .resolve_objects(&ObjectSelector::All, IndexingBase::File)
            .unwrap();
        assert_eq!(resolved.rows, vec![0, 1, 2, 3, 4]);
        assert_eq!(resolved.ids, index.ids);
    }

    #[test]
    fn test_resolve_ids_skips_unknown() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        let resolved = resolver
            .resolve_objects(
                &ObjectSelector::ById(ids(&["000054", "001337", "000011", "000054"])),
                IndexingBase::File,
            )
            .unwrap();
        assert_eq!(resolved.rows, vec![4, 1]);
        assert_eq!(resolved.ids, ids(&["000054", "000011"]));
    }

    #[test]
    fn test_ids_and_rows_agree() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        let by_id = resolver
            .resolve_objects(
                &ObjectSelector::ById(ids(&["000046", "000002"])),
                IndexingBase::File,
            )
            .unwrap();
        let by_file_row = resolver
            .resolve_objects(&ObjectSelector::ByRow(vec![3, 1]), IndexingBase::File)
            .unwrap();
        let by_zero_row = resolver
            .resolve_objects(&ObjectSelector::ByRow(vec![2, 0]), IndexingBase::Zero)
            .unwrap();
        assert_eq!(by_id, by_file_row);
        assert_eq!(by_id, by_zero_row);
    }

    #[test]
    fn test_rows_out_of_range() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        assert_eq!(
            resolver.resolve_objects(&ObjectSelector::ByRow(vec![0]), IndexingBase::File),
            Err(FieldIoError::InvalidRowIndex {
                axis: "object",
                index: 0,
                len: 5
            })
        );
        assert!(resolver
            .resolve_objects(&ObjectSelector::ByRow(vec![5]), IndexingBase::Zero)
            .is_err());
    }

    #[test]
    fn test_extreme_rows_are_invalid() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        for indexing in [IndexingBase::File, IndexingBase::Zero] {
            for raw in [i64::MIN, i64::MAX] {
                assert_eq!(
                    resolver.resolve_objects(&ObjectSelector::ByRow(vec![raw]), indexing),
                    Err(FieldIoError::InvalidRowIndex {
                        axis: "object",
                        index: raw,
                        len: 5
                    })
                );
            }
        }
        assert_eq!(
            resolver.resolve_time(&TimeSelector::ByIndex(vec![i64::MIN])),
            Err(FieldIoError::InvalidRowIndex {
                axis: "time",
                index: i64::MIN,
                len: 6
            })
        );
    }

    #[test]
    fn test_resolve_candidates() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        let resolved = resolver
            .resolve_objects(&ObjectSelector::Candidates, IndexingBase::File)
            .unwrap();
        assert_eq!(resolved.ids, ids(&["000002", "000046"]));

        let resolver = SelectionResolver::new(&index, 2, true);
        let resolved = resolver
            .resolve_objects(&ObjectSelector::Candidates, IndexingBase::File)
            .unwrap();
        assert_eq!(resolved.rows, vec![2, 4]);
    }

    #[test]
    fn test_resolve_time_by_index() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        assert_eq!(resolver.resolve_time(&TimeSelector::All).unwrap(), (0..6).collect::<Vec<_>>());
        assert_eq!(
            resolver.resolve_time(&TimeSelector::ByIndex(vec![5, 0])).unwrap(),
            vec![5, 0]
        );
        assert!(resolver.resolve_time(&TimeSelector::ByIndex(vec![6])).is_err());
        assert!(resolver.resolve_time(&TimeSelector::ByIndex(vec![-1])).is_err());
    }

    #[test]
    fn test_resolve_time_by_date() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        let dates = vec![
            ObsDate::new(2015, 11, 27).unwrap(),
            ObsDate::new(2015, 11, 4).unwrap(),
            ObsDate::new(2017, 1, 1).unwrap(),
        ];
        assert_eq!(
            resolver.resolve_time(&TimeSelector::ByDate(dates)).unwrap(),
            vec![0, 1, 5]
        );
    }

    #[test]
    fn test_resolve_time_by_hjd_is_strict() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        assert_eq!(
            resolver.resolve_time(&TimeSelector::ByHjd(vec![702, 700])).unwrap(),
            vec![0, 1, 4]
        );
        assert_eq!(
            resolver.resolve_time(&TimeSelector::ByHjd(vec![700, 699])),
            Err(FieldIoError::HjdNotFound(699))
        );
    }

    #[test]
    fn test_resolve_time_by_action_id() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        assert_eq!(
            resolver
                .resolve_time(&TimeSelector::ByActionId(vec![
                    109754..=109754,
                    108583..=108583,
                    1..=1
                ]))
                .unwrap(),
            vec![0, 1, 5]
        );
        assert_eq!(
            resolver
                .resolve_time(&TimeSelector::ByActionId(vec![108583..=108600]))
                .unwrap(),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_wide_action_id_span() {
        let index = MemoryIndex::default();
        let resolver = SelectionResolver::new(&index, 1, true);
        assert_eq!(
            resolver
                .resolve_time(&TimeSelector::ByActionId(vec![0..=i64::MAX]))
                .unwrap(),
            (0..6).collect::<Vec<_>>()
        );
        assert_eq!(
            resolver
                .resolve_time(&TimeSelector::ByActionId(vec![
                    i64::MIN..=0,
                    108590..=108590
                ]))
                .unwrap(),
            vec![2, 3]
        );
    }
}
