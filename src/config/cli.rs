use crate::core::filter::FilterSpec;
use crate::core::pivot::AxisOrder;
use crate::domain::schema::EntityKind;
use crate::utils::error::{OpsError, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "opsboard")]
#[command(about = "Pivot reports and validated bulk imports for customer-service data")]
pub struct Cli {
    /// TOML 配置檔；未提供時使用預設值
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 驗證上傳檔並輸出預覽摘要，不寫入任何資料
    Preview(ImportArgs),
    /// 零錯誤時逐列寫入，否則輸出完整錯誤清單
    Commit(CommitArgs),
    /// 產生樞紐報表
    Pivot(PivotArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    #[arg(long)]
    pub entity: EntityKind,

    /// csv / tsv / json / jsonl
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct CommitArgs {
    #[command(flatten)]
    pub import: ImportArgs,

    /// 覆寫 import.sink_path (僅 file 來源)
    #[arg(long)]
    pub sink: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OrderArg {
    #[default]
    Natural,
    Chronological,
}

impl From<OrderArg> for AxisOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Natural => AxisOrder::Natural,
            OrderArg::Chronological => AxisOrder::Chronological,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PivotArgs {
    #[arg(long)]
    pub entity: EntityKind,

    /// 列軸欄位
    #[arg(long)]
    pub rows: String,

    /// 欄軸欄位
    #[arg(long)]
    pub cols: String,

    #[arg(long)]
    pub date_from: Option<String>,

    #[arg(long)]
    pub date_to: Option<String>,

    /// 完全比對條件，格式 field=value，可重複
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub conditions: Vec<String>,

    #[arg(long, value_enum, default_value_t = OrderArg::Natural)]
    pub order: OrderArg,

    /// 報表檔名 (不含副檔名)
    #[arg(long, default_value = "pivot")]
    pub output_name: String,
}

impl PivotArgs {
    /// 轉成與查詢參數相同的格式，再交給 FilterSpec 解析
    pub fn filter_spec(&self) -> Result<FilterSpec> {
        let mut params = HashMap::new();
        if let Some(from) = &self.date_from {
            params.insert("dateFrom".to_string(), from.clone());
        }
        if let Some(to) = &self.date_to {
            params.insert("dateTo".to_string(), to.clone());
        }
        if let Some(date_field) = self.entity.date_field() {
            params.insert("dateField".to_string(), date_field.key.to_string());
        }

        for condition in &self.conditions {
            let (field, value) = condition
                .split_once('=')
                .ok_or_else(|| OpsError::InvalidConfigValueError {
                    field: "where".to_string(),
                    value: condition.clone(),
                    reason: "Expected FIELD=VALUE".to_string(),
                })?;
            params.insert(field.trim().to_string(), value.trim().to_string());
        }

        FilterSpec::from_params(&params)
    }
}
