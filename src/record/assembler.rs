//! Merge per-store contributions into one [`ResultRecord`].
//!
//! Every field name resolves to exactly one store table. Tables are visited in the order of
//! [`StoreTable`], and the first table holding a name wins; later occurrences are dropped
//! without merging.
use tracing::debug;

use crate::{
    constants::{ObjectId, OBJ_ID},
    store::{StoreContributions, StoreTable},
};

use super::{FieldArray, FieldData, ResultRecord};

/// Assemble a record from the contributions of every store table.
///
/// Arguments
/// ---------
/// * `contributions`: arrays read from each store table, keyed by table
/// * `object_ids`: canonical identifiers of the selected objects, in selection order
///
/// Return
/// ------
/// * the assembled record; `OBJ_ID` always holds `object_ids`, whatever a store table supplied
pub fn assemble(contributions: StoreContributions, object_ids: &[ObjectId]) -> ResultRecord {
    let mut record = ResultRecord::new();
    record.insert_first(
        OBJ_ID,
        FieldArray::per_object(FieldData::Text(object_ids.to_vec())),
    );

    // BTreeMap iteration follows the StoreTable ordering
    for (table, arrays) in contributions {
        for (field, array) in arrays {
            if !record.insert_first(&field, array) {
                debug!(%field, table = ?table, "field shadowed by a higher-precedence table");
            }
        }
    }
    record
}
