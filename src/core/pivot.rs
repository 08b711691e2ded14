use crate::core::date::DateNormalizer;
use crate::domain::model::{PivotResult, Record};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// 軸標籤排序方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisOrder {
    /// 數字標籤依數值排序並排在前面，其餘依字典序
    #[default]
    Natural,
    /// 可解析為日期的標籤依日期排序並排在前面，其餘同 Natural
    Chronological,
}

#[derive(Debug, Clone, Copy)]
enum AxisKey<'a> {
    Numeric(f64),
    Lexical(&'a str),
}

impl<'a> AxisKey<'a> {
    fn of(label: &'a str) -> Self {
        match label.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => AxisKey::Numeric(n),
            _ => AxisKey::Lexical(label),
        }
    }
}

/// 數字與數字比數值，其餘比字典序；數字標籤一律在文字標籤之前，維持全序
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    match (AxisKey::of(a), AxisKey::of(b)) {
        (AxisKey::Numeric(x), AxisKey::Numeric(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (AxisKey::Numeric(_), AxisKey::Lexical(_)) => Ordering::Less,
        (AxisKey::Lexical(_), AxisKey::Numeric(_)) => Ordering::Greater,
        (AxisKey::Lexical(x), AxisKey::Lexical(y)) => x.cmp(y),
    }
}

fn compare_chronological(a: &str, b: &str) -> Ordering {
    match (DateNormalizer::normalize_str(a), DateNormalizer::normalize_str(b)) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => compare_labels(a, b),
    }
}

impl AxisOrder {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            AxisOrder::Natural => compare_labels(a, b),
            AxisOrder::Chronological => compare_chronological(a, b),
        }
    }

    fn sort(&self, keys: BTreeSet<String>) -> Vec<String> {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort_by(|a, b| self.compare(a, b));
        keys
    }
}

/// 二維樞紐計數
#[derive(Debug, Clone, Copy, Default)]
pub struct PivotAggregator {
    row_order: AxisOrder,
    column_order: AxisOrder,
}

impl PivotAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_order(mut self, order: AxisOrder) -> Self {
        self.row_order = order;
        self
    }

    pub fn with_column_order(mut self, order: AxisOrder) -> Self {
        self.column_order = order;
        self
    }

    /// 依 (列鍵, 欄鍵) 計數。任一鍵為空的紀錄完全不計入。
    pub fn build<T, R, C>(&self, records: &[T], row_key: R, column_key: C) -> PivotResult
    where
        R: Fn(&T) -> Option<String>,
        C: Fn(&T) -> Option<String>,
    {
        let non_empty = |key: Option<String>| key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());

        let pairs: Vec<(String, String)> = records
            .iter()
            .filter_map(|record| Some((non_empty(row_key(record))?, non_empty(column_key(record))?)))
            .collect();

        let row_keys = self
            .row_order
            .sort(pairs.iter().map(|(r, _)| r.clone()).collect());
        let column_keys = self
            .column_order
            .sort(pairs.iter().map(|(_, c)| c.clone()).collect());

        // 每個 (列, 欄) 組合都先填 0
        let mut matrix: BTreeMap<String, BTreeMap<String, u64>> = row_keys
            .iter()
            .map(|r| (r.clone(), column_keys.iter().map(|c| (c.clone(), 0)).collect()))
            .collect();

        for (r, c) in &pairs {
            if let Some(cell) = matrix.get_mut(r).and_then(|row| row.get_mut(c)) {
                *cell += 1;
            }
        }

        // 總計一律在矩陣完成後加總
        let row_totals: BTreeMap<String, u64> = matrix
            .iter()
            .map(|(r, row)| (r.clone(), row.values().sum()))
            .collect();
        let column_totals: BTreeMap<String, u64> = column_keys
            .iter()
            .map(|c| {
                let total = matrix.values().filter_map(|row| row.get(c)).sum();
                (c.clone(), total)
            })
            .collect();
        let grand_total = row_totals.values().sum();

        PivotResult {
            row_keys,
            column_keys,
            matrix,
            row_totals,
            column_totals,
            grand_total,
        }
    }

    /// 以兩個欄位名稱為軸的常見用法
    pub fn build_by_fields(&self, records: &[Record], row_field: &str, column_field: &str) -> PivotResult {
        self.build(records, |r| r.text(row_field), |r| r.text(column_field))
    }

    /// 同 `build_by_fields`，但日期欄位先正規化成 `DD Mon YYYY` 再當作軸鍵，
    /// 同一天的不同輸入格式會落在同一列
    pub fn build_by_fields_with_date(
        &self,
        records: &[Record],
        row_field: &str,
        column_field: &str,
        date_field: Option<&str>,
    ) -> PivotResult {
        self.build(
            records,
            |r| axis_label(r, row_field, date_field),
            |r| axis_label(r, column_field, date_field),
        )
    }
}

/// 無法解析的日期沿用原始文字
fn axis_label(record: &Record, field: &str, date_field: Option<&str>) -> Option<String> {
    if date_field == Some(field) {
        if let Some(date) = record
            .get(field)
            .and_then(|v| DateNormalizer::normalize_value(v).ok())
        {
            return Some(date.to_string());
        }
    }
    record.text(field)
}
