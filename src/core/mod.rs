pub mod categorical;
pub mod coerce;
pub mod date;
pub mod filter;
pub mod import;
pub mod issue;
pub mod pivot;
pub mod report;
pub mod row;
pub mod service;

pub use crate::domain::model::{AllowedSets, Record};
pub use crate::domain::ports::{MasterDataSource, PersistSink, RecordSource, Storage};
pub use crate::utils::error::Result;
