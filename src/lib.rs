pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FileRecordSource, HttpBackend, JsonLinesSink, LocalStorage, StaticMasterData};
pub use config::DashboardConfig;
pub use core::filter::{FilterEngine, FilterSpec};
pub use core::import::BulkImportValidator;
pub use core::pivot::{AxisOrder, PivotAggregator};
pub use core::report::{PivotReport, ReportFormat, ReportWriter};
pub use core::service::DashboardService;
pub use domain::model::{AllowedSets, CommitOutcome, ImportSummary, PivotResult, Record};
pub use domain::schema::EntityKind;
pub use utils::error::{OpsError, Result};
