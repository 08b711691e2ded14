use crate::domain::model::{AllowedSets, Record};
use crate::domain::ports::{MasterDataSource, PersistSink, RecordSource, Storage};
use crate::domain::schema::EntityKind;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// 標題轉欄位鍵：`Closing Status` → `closing_status`
fn header_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

fn parse_delimited(data: &[u8], delimiter: u8) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(header_key).collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(Record::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.clone(), Value::String(value.to_string()))),
        ));
    }
    Ok(records)
}

fn parse_json_lines(data: &[u8]) -> Result<Vec<Record>> {
    let text = String::from_utf8_lossy(data);
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<Record>(line).map_err(OpsError::from))
        .collect()
}

/// 依副檔名解析上傳檔 (csv / tsv / json 陣列 / jsonl)。
///
/// 試算表格式第一列為標題，資料列的值一律保留為字串。
pub fn parse_rows(name: &str, data: &[u8]) -> Result<Vec<Record>> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => parse_delimited(data, b','),
        Some("tsv") => parse_delimited(data, b'\t'),
        Some("json") => Ok(serde_json::from_slice(data)?),
        Some("jsonl") => parse_json_lines(data),
        _ => Err(OpsError::InvalidConfigValueError {
            field: "input".to_string(),
            value: name.to_string(),
            reason: "Unsupported file type. Valid types: csv, tsv, json, jsonl".to_string(),
        }),
    }
}

/// 以檔案作為資料來源，每種實體對應一個檔案
pub struct FileRecordSource<S: Storage> {
    storage: S,
    files: HashMap<EntityKind, String>,
}

impl<S: Storage> FileRecordSource<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            files: HashMap::new(),
        }
    }

    pub fn with_file(mut self, entity: EntityKind, path: impl Into<String>) -> Self {
        self.files.insert(entity, path.into());
        self
    }
}

#[async_trait]
impl<S: Storage> RecordSource for FileRecordSource<S> {
    async fn fetch_records(&self, entity: EntityKind) -> Result<Vec<Record>> {
        let path = self
            .files
            .get(&entity)
            .ok_or_else(|| OpsError::MissingConfigError {
                field: format!("source.files.{}", entity),
            })?;

        tracing::debug!("Reading {} records from {}", entity, path);
        let data = self.storage.read_file(path).await?;
        let mut records = parse_rows(path, &data)?;

        // 沒有列索引的資料以檔案內位置 (從 1 開始) 補上
        for (index, record) in records.iter_mut().enumerate() {
            if record.row_index().is_none() {
                record.set(Record::ROW_INDEX_KEY, index as u64 + 1);
            }
        }

        tracing::info!("📥 Loaded {} {} records from {}", records.len(), entity, path);
        Ok(records)
    }
}

/// 設定檔中的固定主資料
#[derive(Debug, Clone, Default)]
pub struct StaticMasterData {
    allowed: AllowedSets,
}

impl StaticMasterData {
    pub fn new(allowed: AllowedSets) -> Self {
        Self { allowed }
    }
}

#[async_trait]
impl MasterDataSource for StaticMasterData {
    async fn fetch_allowed_sets(&self) -> Result<AllowedSets> {
        Ok(self.allowed.clone())
    }
}

/// 每種實體附加寫入 `{dir}/{entity}.jsonl`，一列一筆
pub struct JsonLinesSink {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, entity: EntityKind) -> PathBuf {
        self.dir.join(format!("{}.jsonl", entity))
    }

    async fn append(&self, entity: EntityKind, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(entity))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

#[async_trait]
impl PersistSink for JsonLinesSink {
    async fn persist_record(&self, entity: EntityKind, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.append(entity, &line)
            .await
            .map_err(|e| OpsError::persistence(format!("{}: {}", self.path_for(entity).display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_csv_with_label_headers() {
        let data = "Date,Closing Status, CS \n01/01/2026,Closed,Rina\n,,\n";
        let records = parse_rows("upload.CSV", data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("closing_status").as_deref(), Some("Closed"));
        assert_eq!(records[0].text("cs").as_deref(), Some("Rina"));
        assert_eq!(records[0].get("date"), Some(&json!("01/01/2026")));
        assert!(records[1].is_blank("date"));
    }

    #[test]
    fn test_parse_json_and_jsonl() {
        let records = parse_rows("rows.json", br#"[{"sku": "A-1", "stock_total": 5}]"#).unwrap();
        assert_eq!(records[0].get("stock_total"), Some(&json!(5)));

        let records = parse_rows("rows.jsonl", b"{\"sku\": \"A-1\"}\n\n{\"sku\": \"A-2\"}\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_rejects_unknown_extension() {
        let err = parse_rows("rows.xlsx", b"").unwrap_err();
        assert!(matches!(err, OpsError::InvalidConfigValueError { .. }));
    }

    #[tokio::test]
    async fn test_file_source_stamps_row_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stock.tsv"), "SKU\tProduct Name\nA-1\tKabel\nA-2\tCharger\n").unwrap();

        let source = FileRecordSource::new(LocalStorage::new(dir.path())).with_file(EntityKind::Stock, "stock.tsv");
        let records = source.fetch_records(EntityKind::Stock).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].row_index(), Some(2));
        assert_eq!(records[1].text("product_name").as_deref(), Some("Charger"));
    }

    #[tokio::test]
    async fn test_file_source_without_mapping_is_config_error() {
        let dir = TempDir::new().unwrap();
        let source = FileRecordSource::new(LocalStorage::new(dir.path()));
        let err = source.fetch_records(EntityKind::Warranty).await.unwrap_err();
        assert!(matches!(err, OpsError::MissingConfigError { ref field } if field == "source.files.warranty"));
    }

    #[tokio::test]
    async fn test_jsonl_sink_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("committed"));

        sink.persist_record(EntityKind::Stock, &Record::from_pairs([("sku", "A-1")]))
            .await
            .unwrap();
        sink.persist_record(EntityKind::Stock, &Record::from_pairs([("sku", "A-2")]))
            .await
            .unwrap();

        let data = std::fs::read(sink.path_for(EntityKind::Stock)).unwrap();
        let records = parse_rows("stock.jsonl", &data).unwrap();
        let skus: Vec<String> = records.iter().filter_map(|r| r.text("sku")).collect();
        assert_eq!(skus, vec!["A-1", "A-2"]);
    }
}
