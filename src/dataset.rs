//! # Field dataset: the retrieval entry point
//!
//! [`FieldDataset`] ties a field name and campaign to the directories of its three stores and
//! runs a retrieval through the whole pipeline:
//!
//! ```text
//! ObjectQuery / TimeQuery ─► SelectionResolver ─► StoreReader (backend)
//!     ─► assemble ─► simplify ─► check_completeness
//! ```
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use fieldio::{
//!     config::RetrievalConfig,
//!     dataset::FieldDataset,
//!     selection::{ObjectQuery, TimeQuery},
//!     store::StoreLocations,
//! };
//!
//! let locations = StoreLocations::under_root(Utf8Path::new("/data/ngts"), "NG0304-1115", "802");
//! let dataset = FieldDataset::new("NG0304-1115", "802", locations);
//!
//! let retrieval = dataset
//!     .retrieve(
//!         &["OBJ_ID", "HJD", "FLUX"],
//!         ObjectQuery::by_id(46),
//!         TimeQuery::by_date("20151104:20151115"),
//!         &RetrievalConfig::default(),
//!     )
//!     .unwrap();
//!
//! let flux = retrieval.record.get("FLUX").unwrap();
//! println!("{:?} {:?}", flux.shape(), retrieval.diagnostics);
//! ```
//!
//! ## Errors
//! -----------------
//! Selector conflicts are detected before any file is opened. The caller receives either a
//! (possibly partial) [`Retrieval`] or a fatal [`FieldIoError`], never both.
use tracing::{info, info_span, warn};

use crate::{
    config::RetrievalConfig,
    fieldio_errors::FieldIoError,
    record::{
        assembler::assemble,
        normalizer::{check_completeness, simplify, Diagnostic},
        ResultRecord,
    },
    selection::{
        resolver::{ResolvedSelection, SelectionResolver},
        ObjectQuery, TimeQuery,
    },
    store::{lookup::ParquetIndex, FieldReader, StoreLocations, StoreReader},
};

/// Outcome of a successful retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub record: ResultRecord,
    /// Requested fields that no store holds.
    pub diagnostics: Vec<Diagnostic>,
}

/// The stores of one field observed during one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDataset {
    pub field: String,
    pub campaign: String,
    pub locations: StoreLocations,
}

impl FieldDataset {
    pub fn new(field: &str, campaign: &str, locations: StoreLocations) -> Self {
        FieldDataset {
            field: field.to_string(),
            campaign: campaign.to_string(),
            locations,
        }
    }

    /// Retrieve the requested fields for the selected objects and exposures.
    ///
    /// Arguments
    /// ---------
    /// * `fields`: field names, looked up in the stores in precedence order
    /// * `objects`: object-axis selection; none supplied selects every object
    /// * `time`: time-axis selection; none supplied selects every exposure
    /// * `config`: backend, indexing convention, simplification and decoding settings
    ///
    /// Return
    /// ------
    /// * the record (always holding `OBJ_ID`) and the completeness diagnostics
    pub fn retrieve<S: AsRef<str>>(
        &self,
        fields: &[S],
        objects: ObjectQuery,
        time: TimeQuery,
        config: &RetrievalConfig,
    ) -> Result<Retrieval, FieldIoError> {
        let span = info_span!(
            "retrieve",
            field = %self.field,
            campaign = %self.campaign,
            backend = %config.backend
        );
        let _entered = span.enter();

        objects.validate()?;
        time.validate()?;
        let object_selector = objects.into_selector()?;
        let time_selector = time.into_selector()?;

        let index = ParquetIndex::new(&self.locations, config.quiet);
        let resolver = SelectionResolver::new(&index, config.candidate_rank, config.quiet);
        let selection = ResolvedSelection {
            objects: resolver.resolve_objects(&object_selector, config.indexing)?,
            exposures: resolver.resolve_time(&time_selector)?,
        };
        if selection.objects.is_empty() && !config.quiet {
            warn!("no object left after selection, returning empty arrays");
        }

        let requested: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let contributions =
            FieldReader::new(config.backend).read(&self.locations, &selection, &requested, config)?;

        let mut record = assemble(contributions, &selection.objects.ids);
        if config.simplify {
            record = simplify(record);
        }
        let diagnostics = check_completeness(&record, &requested, config.quiet);

        info!(
            n_objects = selection.objects.len(),
            n_exposures = selection.exposures.len(),
            n_fields = record.len(),
            n_missing = diagnostics.len(),
            "retrieval complete"
        );
        Ok(Retrieval {
            record,
            diagnostics,
        })
    }
}

/// Retrieve fields of `field`/`campaign` from stores at `locations`.
///
/// Shorthand for [`FieldDataset::new`] followed by [`FieldDataset::retrieve`].
pub fn retrieve<S: AsRef<str>>(
    field: &str,
    campaign: &str,
    locations: StoreLocations,
    fields: &[S],
    objects: ObjectQuery,
    time: TimeQuery,
    config: &RetrievalConfig,
) -> Result<Retrieval, FieldIoError> {
    FieldDataset::new(field, campaign, locations).retrieve(fields, objects, time, config)
}
