use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// 單筆資料列：欄位名稱 → 值 (字串 / 數字 / 布林)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    /// 來源端提供的穩定列索引，不屬於任何實體欄位
    pub const ROW_INDEX_KEY: &'static str = "row_index";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// 以字串形式讀取欄位，前後空白會被去除；空值回傳 None
    pub fn text(&self, key: &str) -> Option<String> {
        let text = match self.data.get(key)? {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(true) => "TRUE".to_string(),
            serde_json::Value::Bool(false) => "FALSE".to_string(),
            other => other.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn is_blank(&self, key: &str) -> bool {
        self.text(key).is_none()
    }

    pub fn row_index(&self) -> Option<u64> {
        self.data.get(Self::ROW_INDEX_KEY).and_then(|v| v.as_u64())
    }
}

/// 主資料：欄位名稱 → 允許值集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedSets {
    sets: HashMap<String, HashSet<String>>,
}

impl AllowedSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, field: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets
            .insert(field.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn with<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(field, values);
        self
    }

    pub fn get(&self, field: &str) -> Option<&HashSet<String>> {
        self.sets.get(field)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for AllowedSets {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self {
            sets: map
                .into_iter()
                .map(|(field, values)| (field, values.into_iter().collect()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Error,
}

/// 單列驗證結果；`status == Error` 若且唯若 `errors` 非空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub row_number: usize,
    pub status: RowStatus,
    pub normalized_fields: Record,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.status == RowStatus::Valid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub preview_rows: Vec<ValidationOutcome>,
    pub has_errors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row_number: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub success_count: usize,
    pub fail_count: usize,
    pub failures: Vec<RowFailure>,
}

/// 匯入提交結果：驗證閘門未通過時不寫入任何資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommitOutcome {
    Rejected(ImportSummary),
    Committed(CommitReport),
}

impl CommitOutcome {
    pub fn errors(&self) -> &[String] {
        match self {
            CommitOutcome::Rejected(summary) => &summary.errors,
            CommitOutcome::Committed(_) => &[],
        }
    }
}

/// 二維樞紐計數表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResult {
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub matrix: BTreeMap<String, BTreeMap<String, u64>>,
    pub row_totals: BTreeMap<String, u64>,
    pub column_totals: BTreeMap<String, u64>,
    pub grand_total: u64,
}

impl PivotResult {
    pub fn cell(&self, row_key: &str, column_key: &str) -> u64 {
        self.matrix
            .get(row_key)
            .and_then(|row| row.get(column_key))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    /// 檢查列總計、欄總計與總計是否一致
    pub fn is_reconciled(&self) -> bool {
        let rows_ok = self.row_keys.iter().all(|r| {
            let sum: u64 = self.column_keys.iter().map(|c| self.cell(r, c)).sum();
            self.row_totals.get(r).copied() == Some(sum)
        });
        let cols_ok = self.column_keys.iter().all(|c| {
            let sum: u64 = self.row_keys.iter().map(|r| self.cell(r, c)).sum();
            self.column_totals.get(c).copied() == Some(sum)
        });
        let row_sum: u64 = self.row_totals.values().sum();
        let col_sum: u64 = self.column_totals.values().sum();
        rows_ok && cols_ok && row_sum == self.grand_total && col_sum == self.grand_total
    }
}
