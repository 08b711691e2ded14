use crate::domain::model::PivotResult;
use crate::domain::ports::Storage;
use crate::utils::error::{OpsError, Result};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;
use zip::write::{SimpleFileOptions, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Tsv,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Tsv => "tsv",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "tsv" => Ok(ReportFormat::Tsv),
            "json" => Ok(ReportFormat::Json),
            other => Err(OpsError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: csv, tsv, json".to_string(),
            }),
        }
    }
}

/// 樞紐報表 (分析頁、門市分析、保固報表的匯出內容)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotReport {
    pub title: String,
    pub row_label: String,
    pub column_label: String,
    pub pivot: PivotResult,
}

impl PivotReport {
    /// 表格形式：標題列、各資料列 (含列總計)、最後一列為欄總計
    pub fn table(&self) -> Vec<Vec<String>> {
        let pivot = &self.pivot;
        let mut rows = Vec::with_capacity(pivot.row_keys.len() + 2);

        let mut header = vec![format!("{} \\ {}", self.row_label, self.column_label)];
        header.extend(pivot.column_keys.iter().cloned());
        header.push("Total".to_string());
        rows.push(header);

        for row_key in &pivot.row_keys {
            let mut row = vec![row_key.clone()];
            row.extend(
                pivot
                    .column_keys
                    .iter()
                    .map(|c| pivot.cell(row_key, c).to_string()),
            );
            row.push(pivot.row_totals.get(row_key).copied().unwrap_or(0).to_string());
            rows.push(row);
        }

        let mut footer = vec!["Total".to_string()];
        footer.extend(
            pivot
                .column_keys
                .iter()
                .map(|c| pivot.column_totals.get(c).copied().unwrap_or(0).to_string()),
        );
        footer.push(pivot.grand_total.to_string());
        rows.push(footer);

        rows
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Csv => self.render_delimited(b','),
            ReportFormat::Tsv => self.render_delimited(b'\t'),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    fn render_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        for row in self.table() {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| OpsError::IoError(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// 透過 Storage 寫出報表；有設定 bundle 名稱時打包成單一 ZIP
pub struct ReportWriter<S: Storage> {
    storage: S,
    formats: Vec<ReportFormat>,
    bundle_name: Option<String>,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S, formats: Vec<ReportFormat>) -> Self {
        Self {
            storage,
            formats,
            bundle_name: None,
        }
    }

    pub fn with_bundle(mut self, bundle_name: impl Into<String>) -> Self {
        self.bundle_name = Some(bundle_name.into());
        self
    }

    /// 回傳寫出的檔案名稱
    pub async fn write(&self, base_name: &str, report: &PivotReport) -> Result<Vec<String>> {
        let mut files = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let name = format!("{}.{}", base_name, format.extension());
            files.push((name, report.render(*format)?));
        }

        match &self.bundle_name {
            Some(bundle) => {
                let zip_data = {
                    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                    for (name, content) in &files {
                        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                        zip.write_all(content.as_bytes())?;
                    }
                    zip.finish()?.into_inner()
                };

                tracing::debug!("Writing report bundle {} ({} bytes)", bundle, zip_data.len());
                self.storage.write_file(bundle, &zip_data).await?;
                Ok(vec![bundle.clone()])
            }
            None => {
                for (name, content) in &files {
                    tracing::debug!("Writing report file {}", name);
                    self.storage.write_file(name, content.as_bytes()).await?;
                }
                Ok(files.into_iter().map(|(name, _)| name).collect())
            }
        }
    }
}
