use crate::core::date::{CanonicalDate, DateNormalizer};
use crate::domain::model::Record;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 單一篩選條件
pub trait RecordFilter: Send + Sync {
    fn matches(&self, record: &Record) -> bool;
}

/// 日期區間 (含上下界)；日期無法解析的紀錄一律不符合
#[derive(Debug, Clone)]
pub struct DateRange {
    pub field: String,
    pub from: Option<CanonicalDate>,
    pub to: Option<CanonicalDate>,
}

impl RecordFilter for DateRange {
    fn matches(&self, record: &Record) -> bool {
        let Some(date) = record
            .get(&self.field)
            .and_then(|v| DateNormalizer::normalize_value(v).ok())
        else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// 欄位值完全相等
#[derive(Debug, Clone)]
pub struct ExactMatch {
    pub field: String,
    pub value: String,
}

impl RecordFilter for ExactMatch {
    fn matches(&self, record: &Record) -> bool {
        record.text(&self.field).as_deref() == Some(self.value.as_str())
    }
}

/// 篩選設定，所有條件以 AND 組合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub date_from: Option<CanonicalDate>,
    #[serde(default)]
    pub date_to: Option<CanonicalDate>,
    #[serde(default)]
    pub exact_match_fields: BTreeMap<String, String>,
    #[serde(default = "default_date_field")]
    pub date_field: String,
}

fn default_date_field() -> String {
    "date".to_string()
}

impl FilterSpec {
    pub fn new() -> Self {
        Self {
            date_field: default_date_field(),
            ..Default::default()
        }
    }

    pub fn date_from(mut self, date: CanonicalDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: CanonicalDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn exact(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.exact_match_fields.insert(field.into(), value.into());
        self
    }

    /// 由查詢參數建立：`dateFrom` / `dateTo` 為日期界線，其餘為完全比對
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let mut spec = Self::new();
        for (key, value) in params {
            let value = value.trim();
            match key.as_str() {
                "dateFrom" if !value.is_empty() => spec.date_from = Some(CanonicalDate::parse(value)?),
                "dateTo" if !value.is_empty() => spec.date_to = Some(CanonicalDate::parse(value)?),
                "dateFrom" | "dateTo" => {}
                "dateField" if !value.is_empty() => spec.date_field = value.to_string(),
                _ => {
                    spec.exact_match_fields.insert(key.clone(), value.to_string());
                }
            }
        }
        Ok(spec)
    }

    /// 轉成篩選器清單；值為 "all" 或空字串的欄位不產生條件
    pub fn filters(&self) -> Vec<Box<dyn RecordFilter>> {
        let mut filters: Vec<Box<dyn RecordFilter>> = Vec::new();

        if self.date_from.is_some() || self.date_to.is_some() {
            filters.push(Box::new(DateRange {
                field: self.date_field.clone(),
                from: self.date_from,
                to: self.date_to,
            }));
        }

        for (field, value) in &self.exact_match_fields {
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("all") {
                continue;
            }
            filters.push(Box::new(ExactMatch {
                field: field.clone(),
                value: value.to_string(),
            }));
        }

        filters
    }
}

pub struct FilterEngine;

impl FilterEngine {
    /// 每個條件各自過濾一次
    pub fn apply(records: Vec<Record>, spec: &FilterSpec) -> Vec<Record> {
        spec.filters().iter().fold(records, |remaining, filter| {
            remaining.into_iter().filter(|r| filter.matches(r)).collect()
        })
    }
}
