pub mod config;
pub mod constants;
pub mod dataset;
pub mod fieldio_errors;
pub mod record;
pub mod selection;
pub mod store;
pub mod time;

pub use config::{Backend, IndexingBase, RetrievalConfig};
pub use dataset::{retrieve, FieldDataset, Retrieval};
pub use fieldio_errors::FieldIoError;
pub use record::{FieldArray, FieldData, ResultRecord};
pub use selection::{ObjectQuery, SelectorValue, TimeQuery};
pub use store::StoreLocations;
