//! 日期正規化：把各種日期表示法轉成標準顯示格式 `DD Mon YYYY`。
//!
//! 支援的輸入：
//! - chrono 原生日期 (`NaiveDate` / `NaiveDateTime`)
//! - 試算表序號 (以 1899-12-30 為第 0 天)
//! - `DD/MM/YYYY`、`DD-MM-YYYY`
//! - `YYYY-MM-DD` (可帶時間)
//! - 已是標準格式的 `DD Mon YYYY` (直接沿用)
//! - 其他常見的英文日期寫法

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2} [A-Z][a-z]{2} \d{4}$").expect("canonical date regex"));
static DAY_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("day-first date regex")
});
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ].*)?$").expect("iso date regex")
});
// 五位數序號約為 1927 到 2173 年，較短的純數字字串 (例如 "2026") 不視為序號
static SERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:\.\d+)?$").expect("serial date regex"));

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d-%b-%Y",
    "%d.%m.%Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// 試算表最大序號 (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("date is empty")]
    Empty,
    #[error("unrecognized date '{0}'")]
    Invalid(String),
}

/// 標準化後的日期，可排序、可比較，顯示為 `DD Mon YYYY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalDate(NaiveDate);

impl CanonicalDate {
    pub const FORMAT: &'static str = "%d %b %Y";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn parse(input: &str) -> Result<Self, DateParseError> {
        DateNormalizer::normalize_str(input)
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl From<NaiveDate> for CanonicalDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<NaiveDateTime> for CanonicalDate {
    fn from(datetime: NaiveDateTime) -> Self {
        Self(datetime.date())
    }
}

impl Serialize for CanonicalDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CanonicalDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CanonicalDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub struct DateNormalizer;

impl DateNormalizer {
    /// 依值的型別決定解析方式：數字視為試算表序號，字串走文字解析
    pub fn normalize_value(value: &serde_json::Value) -> Result<CanonicalDate, DateParseError> {
        match value {
            serde_json::Value::Null => Err(DateParseError::Empty),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(serial) => Self::from_serial(serial),
                None => Err(DateParseError::Invalid(n.to_string())),
            },
            serde_json::Value::String(s) => Self::normalize_str(s),
            other => Err(DateParseError::Invalid(other.to_string())),
        }
    }

    pub fn normalize_str(input: &str) -> Result<CanonicalDate, DateParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DateParseError::Empty);
        }
        let invalid = || DateParseError::Invalid(input.to_string());

        // 外觀已是標準格式仍重新解析，不存在的日期 (如 31 Feb) 刻意視為無效
        if CANONICAL_RE.is_match(input) {
            return NaiveDate::parse_from_str(input, CanonicalDate::FORMAT)
                .map(CanonicalDate)
                .map_err(|_| invalid());
        }

        if let Some(caps) = DAY_FIRST_RE.captures(input) {
            return ymd(&caps[3], &caps[2], &caps[1]).ok_or_else(invalid);
        }

        if let Some(caps) = ISO_RE.captures(input) {
            return ymd(&caps[1], &caps[2], &caps[3]).ok_or_else(invalid);
        }

        if SERIAL_RE.is_match(input) {
            let serial: f64 = input.parse().map_err(|_| invalid())?;
            return Self::from_serial(serial);
        }

        Self::parse_general(input).ok_or_else(invalid)
    }

    /// 試算表日期序號：第 N 天 = 1899-12-30 + N 天，小數部分 (時間) 忽略
    pub fn from_serial(serial: f64) -> Result<CanonicalDate, DateParseError> {
        if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
            return Err(DateParseError::Invalid(serial.to_string()));
        }

        NaiveDate::from_ymd_opt(1899, 12, 30)
            .zip(TimeDelta::try_days(serial.floor() as i64))
            .and_then(|(epoch, offset)| epoch.checked_add_signed(offset))
            .map(CanonicalDate)
            .ok_or_else(|| DateParseError::Invalid(serial.to_string()))
    }

    fn parse_general(input: &str) -> Option<CanonicalDate> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(CanonicalDate(dt.date_naive()));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
            return Some(CanonicalDate(dt.date_naive()));
        }

        FALLBACK_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
            .map(CanonicalDate::from)
            .or_else(|| {
                FALLBACK_DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                    .map(CanonicalDate)
            })
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<CanonicalDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        .map(CanonicalDate)
}
