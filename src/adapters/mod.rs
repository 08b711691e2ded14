pub mod file;
pub mod http;
pub mod storage;

pub use file::{parse_rows, FileRecordSource, JsonLinesSink, StaticMasterData};
pub use http::HttpBackend;
pub use storage::LocalStorage;
