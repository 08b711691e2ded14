use crate::core::issue::RowIssue;
use crate::domain::model::Record;

const TRUTHY: &[&str] = &["true", "1", "yes", "ya"];
const FALSY: &[&str] = &["false", "0", "no", "tidak"];

/// 所有布林旗標 (問卷、權限欄位) 共用的轉換規則；無法判斷時回傳 None
pub fn coerce_flag(value: &str) -> Option<bool> {
    let lowered = value.trim().to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// 匯入用：空值維持空字串，其餘轉成 `TRUE` / `FALSE`
pub fn normalize_boolean(label: &str, value: Option<&str>) -> Result<&'static str, RowIssue> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(""),
        Some(v) => match coerce_flag(v) {
            Some(true) => Ok("TRUE"),
            Some(false) => Ok("FALSE"),
            None => Err(RowIssue::BooleanCoercion {
                label: label.to_string(),
            }),
        },
    }
}

/// 使用者資料列上的權限欄位
#[derive(Debug, Clone, Copy)]
pub struct PermissionFlags<'a> {
    record: &'a Record,
}

impl<'a> PermissionFlags<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// 欄位缺漏或無法辨識時視為沒有權限
    pub fn allows(&self, flag: &str) -> bool {
        self.record
            .text(flag)
            .and_then(|v| coerce_flag(&v))
            .unwrap_or(false)
    }

    pub fn granted<'f>(&self, flags: &[&'f str]) -> Vec<&'f str> {
        flags.iter().copied().filter(|f| self.allows(f)).collect()
    }
}
