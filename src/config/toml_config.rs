use crate::core::import::{DEFAULT_HEADER_ROWS, DEFAULT_PREVIEW_LIMIT};
use crate::core::report::ReportFormat;
use crate::domain::model::AllowedSets;
use crate::domain::schema::EntityKind;
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

const RECORD_FILE_EXTENSIONS: &[&str] = &["csv", "tsv", "json", "jsonl"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    /// 欄位名稱 → 允許值
    #[serde(default)]
    pub master_data: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// 實體名稱 → 檔案 (相對於 base_path)
    #[serde(default)]
    pub files: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    #[serde(default = "default_sink_path")]
    pub sink_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// 設定後所有格式打包成單一 ZIP
    pub bundle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_base_path() -> String {
    ".".to_string()
}

fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}

fn default_header_rows() -> usize {
    DEFAULT_HEADER_ROWS
}

fn default_sink_path() -> String {
    "./committed".to_string()
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            endpoint: None,
            timeout_seconds: None,
            base_path: default_base_path(),
            files: HashMap::new(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
            header_rows: default_header_rows(),
            sink_path: default_sink_path(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            formats: default_formats(),
            bundle: None,
        }
    }
}

impl DashboardConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| OpsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.source
                .timeout_seconds
                .unwrap_or(crate::adapters::http::DEFAULT_TIMEOUT_SECONDS),
        )
    }

    pub fn endpoint(&self) -> Result<&str> {
        self.source
            .endpoint
            .as_deref()
            .ok_or_else(|| OpsError::MissingConfigError {
                field: "source.endpoint".to_string(),
            })
    }

    pub fn allowed_sets(&self) -> AllowedSets {
        AllowedSets::from(self.master_data.clone())
    }

    pub fn entity_files(&self) -> Result<Vec<(EntityKind, String)>> {
        self.source
            .files
            .iter()
            .map(|(name, file)| name.parse::<EntityKind>().map(|entity| (entity, file.clone())))
            .collect()
    }

    pub fn output_formats(&self) -> Result<Vec<ReportFormat>> {
        self.output.formats.iter().map(|f| f.parse()).collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        match self.source.kind {
            SourceKind::Http => {
                validation::validate_url("source.endpoint", self.endpoint()?)?;
            }
            SourceKind::File => {
                validation::validate_path("source.base_path", &self.source.base_path)?;
                for (entity, file) in self.entity_files()? {
                    validation::validate_file_extension(
                        &format!("source.files.{}", entity),
                        &file,
                        RECORD_FILE_EXTENSIONS,
                    )?;
                }
                validation::validate_path("import.sink_path", &self.import.sink_path)?;
            }
        }

        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout as usize, 1)?;
        }

        for (field, values) in &self.master_data {
            for value in values {
                validation::validate_non_empty_string(&format!("master_data.{}", field), value)?;
            }
        }

        validation::validate_positive_number("import.preview_limit", self.import.preview_limit, 1)?;

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_one_of("output.formats", &self.output.formats, &["csv", "tsv", "json"])?;
        if let Some(bundle) = &self.output.bundle {
            validation::validate_file_extension("output.bundle", bundle, &["zip"])?;
        }

        Ok(())
    }
}

impl Validate for DashboardConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_file_source_config() {
        let toml_content = r#"
[source]
kind = "file"
base_path = "./data"

[source.files]
chat-log = "chat_log.csv"
stock = "stock.json"

[master_data]
channel = ["Shopee", "TikTok"]
closing_status = ["Closed", "Pending"]

[import]
preview_limit = 5

[output]
path = "./reports"
formats = ["csv", "json"]
bundle = "pivot.zip"
"#;

        let config = DashboardConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.import.preview_limit, 5);
        assert_eq!(config.import.header_rows, 1);
        assert!(config.allowed_sets().get("channel").unwrap().contains("TikTok"));
        assert_eq!(
            config.output_formats().unwrap(),
            vec![ReportFormat::Csv, ReportFormat::Json]
        );

        let mut files = config.entity_files().unwrap();
        files.sort_by_key(|(entity, _)| entity.as_str());
        assert_eq!(files[0], (EntityKind::ChatLog, "chat_log.csv".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config.import.preview_limit, 10);
        assert_eq!(config.output.formats, vec!["csv"]);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OPSBOARD_TEST_ENDPOINT", "https://sheets.example.com/api");

        let toml_content = r#"
[source]
kind = "http"
endpoint = "${OPSBOARD_TEST_ENDPOINT}"
timeout_seconds = 10
"#;

        let config = DashboardConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.endpoint().unwrap(), "https://sheets.example.com/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());

        std::env::remove_var("OPSBOARD_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let http_without_endpoint = DashboardConfig::from_toml_str("[source]\nkind = \"http\"\n").unwrap();
        assert!(matches!(
            http_without_endpoint.validate(),
            Err(OpsError::MissingConfigError { .. })
        ));

        let bad_url = DashboardConfig::from_toml_str("[source]\nkind = \"http\"\nendpoint = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let bad_format = DashboardConfig::from_toml_str("[output]\nformats = [\"xlsx\"]\n").unwrap();
        assert!(bad_format.validate().is_err());

        let unknown_entity = DashboardConfig::from_toml_str("[source.files]\norders = \"orders.csv\"\n").unwrap();
        assert!(matches!(
            unknown_entity.validate(),
            Err(OpsError::UnknownEntity { .. })
        ));

        let bad_extension = DashboardConfig::from_toml_str("[source.files]\nstock = \"stock.xlsx\"\n").unwrap();
        assert!(bad_extension.validate().is_err());
    }

    #[test]
    fn test_unknown_source_kind_fails_to_parse() {
        assert!(DashboardConfig::from_toml_str("[source]\nkind = \"ftp\"\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[monitoring]
enabled = true
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = DashboardConfig::from_file(temp_file.path()).unwrap();
        assert!(config.monitoring_enabled());
    }
}
