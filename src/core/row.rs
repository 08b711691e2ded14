use crate::core::categorical;
use crate::core::coerce::normalize_boolean;
use crate::core::date::{DateNormalizer, DateParseError};
use crate::core::issue::{RowIssue, RowWarning};
use crate::domain::model::{AllowedSets, Record, RowStatus, ValidationOutcome};
use crate::domain::schema::{EntityKind, FieldKind, FieldSpec};
use serde_json::Value;

/// 單列正規化：日期、必填、主資料、布林與數值欄位檢查。
///
/// 純函式，不做任何 I/O；問題依偵測順序累積在 `errors`。
#[derive(Debug, Clone, Copy)]
pub struct RowNormalizer {
    entity: EntityKind,
}

impl RowNormalizer {
    pub fn new(entity: EntityKind) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    /// 所有已知欄位皆為空時，該列應整列略過
    pub fn is_empty_row(&self, raw: &Record) -> bool {
        self.entity.fields().iter().all(|f| raw.is_blank(f.key))
    }

    /// 回傳 None 表示空白列 (不計入任何統計)
    pub fn normalize(
        &self,
        row_number: usize,
        raw: &Record,
        allowed: &AllowedSets,
    ) -> Option<ValidationOutcome> {
        if self.is_empty_row(raw) {
            return None;
        }

        let mut normalized = Record::new();
        let mut issues: Vec<RowIssue> = Vec::new();
        let mut warnings: Vec<RowWarning> = Vec::new();
        let fields = self.entity.fields();

        for spec in fields.iter().filter(|f| f.kind == FieldKind::Date) {
            let (value, issue) = normalize_date(spec, raw);
            normalized.set(spec.key, value);
            issues.extend(issue);
        }

        for spec in fields.iter().filter(|f| f.required && f.kind != FieldKind::Date) {
            if raw.is_blank(spec.key) {
                issues.push(RowIssue::RequiredFieldMissing {
                    label: spec.label.to_string(),
                });
            }
        }

        // 主資料有提供允許集合的欄位都要檢查，不限 Categorical
        for spec in fields.iter().filter(|f| f.kind != FieldKind::Date) {
            let Some(set) = allowed.get(spec.key) else {
                continue;
            };
            let value = raw.text(spec.key).unwrap_or_default();
            let field_name = spec.label.to_lowercase();
            if let Err(issue) = categorical::validate(&field_name, &value, Some(set)) {
                issues.push(issue);
            }
        }

        for spec in fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Text | FieldKind::Categorical))
        {
            normalized.set(spec.key, raw.text(spec.key).unwrap_or_default());
        }

        for spec in fields.iter().filter(|f| f.kind == FieldKind::Boolean) {
            let raw_value = raw.text(spec.key);
            match normalize_boolean(spec.label, raw_value.as_deref()) {
                Ok(value) => normalized.set(spec.key, value),
                Err(issue) => {
                    issues.push(issue);
                    normalized.set(spec.key, "");
                }
            }
        }

        for spec in fields.iter().filter(|f| f.kind == FieldKind::Numeric) {
            match parse_number(raw, spec.key) {
                Ok(Some(n)) => normalized.set(spec.key, number_value(n)),
                Ok(None) => normalized.set(spec.key, ""),
                Err(()) => {
                    issues.push(RowIssue::NotNumeric {
                        label: spec.label.to_string(),
                    });
                    normalized.set(spec.key, "");
                }
            }
        }

        self.reconcile(raw, &mut normalized, &mut warnings);

        let errors: Vec<String> = issues.iter().map(ToString::to_string).collect();
        let status = if errors.is_empty() {
            RowStatus::Valid
        } else {
            RowStatus::Error
        };

        Some(ValidationOutcome {
            row_number,
            status,
            normalized_fields: normalized,
            errors,
            warnings: warnings.iter().map(ToString::to_string).collect(),
        })
    }

    /// 推導欄位與輸入值衝突時，以推導值為準並留下提示
    fn reconcile(&self, raw: &Record, normalized: &mut Record, warnings: &mut Vec<RowWarning>) {
        for rule in self.entity.derivations() {
            let (Ok(Some(minuend)), Ok(Some(subtrahend))) =
                (parse_number(raw, rule.minuend), parse_number(raw, rule.subtrahend))
            else {
                continue;
            };
            let derived = minuend - subtrahend;
            let label = self.entity.label_for(rule.target);

            match parse_number(raw, rule.target) {
                Ok(None) => warnings.push(RowWarning::DerivedValueFilled {
                    label,
                    value: derived,
                }),
                Ok(Some(given)) if (given - derived).abs() > f64::EPSILON => {
                    warnings.push(RowWarning::DerivedValueAdjusted {
                        label,
                        from: given,
                        to: derived,
                    })
                }
                // 一致，或本身已是格式錯誤
                _ => continue,
            }
            normalized.set(rule.target, number_value(derived));
        }
    }
}

fn normalize_date(spec: &FieldSpec, raw: &Record) -> (Value, Option<RowIssue>) {
    let parsed = match raw.get(spec.key) {
        Some(value) => DateNormalizer::normalize_value(value),
        None => Err(DateParseError::Empty),
    };

    match parsed {
        Ok(date) => (Value::String(date.to_string()), None),
        Err(DateParseError::Empty) => {
            let issue = spec.required.then_some(RowIssue::DateMissing);
            (Value::String(String::new()), issue)
        }
        // 顯示時沿用原始輸入
        Err(DateParseError::Invalid(_)) => (
            Value::String(raw.text(spec.key).unwrap_or_default()),
            Some(RowIssue::DateInvalid),
        ),
    }
}

/// Ok(None) 為空值，Err(()) 為非數字
fn parse_number(raw: &Record, key: &str) -> Result<Option<f64>, ()> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(_) => match raw.text(key) {
            None => Ok(None),
            Some(text) => text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or(()),
        },
        None => Ok(None),
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat_master() -> AllowedSets {
        AllowedSets::new()
            .with("shift", ["Pagi", "Siang", "Malam"])
            .with("cs", ["Ani", "Budi"])
            .with("channel", ["Shopee", "TikTok", "WhatsApp"])
            .with("closing_status", ["Closing", "Not Closing"])
            .with("intention", ["Refund", "Question", "Complaint"])
    }

    fn valid_chat_row() -> Record {
        Record::from_pairs([
            ("date", json!("03/02/2026")),
            ("shift", json!("Pagi")),
            ("cs", json!("Ani")),
            ("channel", json!("Shopee")),
            ("intention", json!("Refund")),
            ("closing_status", json!("Closing")),
            ("survey", json!("ya")),
        ])
    }

    #[test]
    fn test_valid_chat_row_is_normalized() {
        let normalizer = RowNormalizer::new(EntityKind::ChatLog);
        let outcome = normalizer.normalize(2, &valid_chat_row(), &chat_master()).unwrap();

        assert_eq!(outcome.status, RowStatus::Valid);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.row_number, 2);
        assert_eq!(outcome.normalized_fields.text("date").as_deref(), Some("03 Feb 2026"));
        assert_eq!(outcome.normalized_fields.text("survey").as_deref(), Some("TRUE"));
        assert_eq!(outcome.normalized_fields.get("notes"), Some(&json!("")));
    }

    #[test]
    fn test_partially_filled_row_reports_every_problem_in_order() {
        let raw = Record::from_pairs([
            ("date", json!("32/13/2026")),
            ("shift", json!("")),
            ("cs", json!("Ani")),
        ]);
        let normalizer = RowNormalizer::new(EntityKind::ChatLog);
        let outcome = normalizer.normalize(2, &raw, &AllowedSets::new()).unwrap();

        assert_eq!(outcome.status, RowStatus::Error);
        assert_eq!(
            outcome.errors,
            vec![
                "Invalid date format",
                "Shift is required",
                "Channel is required",
                "Closing Status is required",
            ]
        );
        assert_eq!(outcome.normalized_fields.text("date").as_deref(), Some("32/13/2026"));
    }

    #[test]
    fn test_missing_date_is_required_error() {
        let mut raw = valid_chat_row();
        raw.data.remove("date");
        let outcome = RowNormalizer::new(EntityKind::ChatLog)
            .normalize(3, &raw, &chat_master())
            .unwrap();
        assert_eq!(outcome.errors, vec!["Date is required"]);
    }

    #[test]
    fn test_all_empty_row_is_skipped() {
        let raw = Record::from_pairs([
            ("date", json!("")),
            ("shift", json!("")),
            ("cs", json!("   ")),
            ("channel", serde_json::Value::Null),
            ("unrelated_column", json!("ignored")),
        ]);
        assert!(RowNormalizer::new(EntityKind::ChatLog)
            .normalize(2, &raw, &chat_master())
            .is_none());
    }

    #[test]
    fn test_unknown_categorical_and_boolean_values() {
        let mut raw = valid_chat_row();
        raw.set("channel", "Lazada");
        raw.set("intention", "refund");
        raw.set("survey", "maybe");

        let outcome = RowNormalizer::new(EntityKind::ChatLog)
            .normalize(5, &raw, &chat_master())
            .unwrap();

        assert_eq!(
            outcome.errors,
            vec![
                "Invalid channel \"Lazada\"",
                "Invalid intention \"refund\"",
                "Survey must be TRUE/FALSE",
            ]
        );
        assert_eq!(outcome.normalized_fields.get("survey"), Some(&json!("")));
    }

    #[test]
    fn test_allowed_set_applies_to_text_field() {
        let raw = Record::from_pairs([
            ("date", json!("05/01/2026")),
            ("customer_name", json!("Sari")),
            ("product_name", json!("Unknown Gadget")),
            ("status", json!("Open")),
        ]);
        let allowed = AllowedSets::new().with("product_name", ["Kabel Data"]);

        let outcome = RowNormalizer::new(EntityKind::Warranty)
            .normalize(4, &raw, &allowed)
            .unwrap();

        assert_eq!(outcome.status, RowStatus::Error);
        assert_eq!(outcome.errors, vec!["Invalid product name \"Unknown Gadget\""]);
        assert_eq!(
            outcome.normalized_fields.text("product_name").as_deref(),
            Some("Unknown Gadget")
        );

        let mut known = raw.clone();
        known.set("product_name", "Kabel Data");
        let outcome = RowNormalizer::new(EntityKind::Warranty)
            .normalize(4, &known, &allowed)
            .unwrap();
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed_before_allowed_set_check() {
        let mut raw = valid_chat_row();
        raw.set("channel", " Shopee ");
        raw.set("shift", "pagi");

        let outcome = RowNormalizer::new(EntityKind::ChatLog)
            .normalize(2, &raw, &chat_master())
            .unwrap();

        assert_eq!(outcome.errors, vec!["Invalid shift \"pagi\""]);
        assert_eq!(outcome.normalized_fields.text("channel").as_deref(), Some("Shopee"));
        assert_eq!(outcome.normalized_fields.get("channel"), Some(&json!("Shopee")));
    }

    #[test]
    fn test_serial_date_from_spreadsheet_number() {
        let mut raw = valid_chat_row();
        raw.set("date", 46023);
        let outcome = RowNormalizer::new(EntityKind::ChatLog)
            .normalize(2, &raw, &chat_master())
            .unwrap();
        assert_eq!(outcome.normalized_fields.text("date").as_deref(), Some("01 Jan 2026"));
    }

    #[test]
    fn test_stock_required_and_numeric_fields() {
        let raw = Record::from_pairs([
            ("sku", json!("")),
            ("product_name", json!("Kabel Data")),
            ("stock_total", json!("ten")),
        ]);
        let outcome = RowNormalizer::new(EntityKind::Stock)
            .normalize(2, &raw, &AllowedSets::new())
            .unwrap();

        assert_eq!(outcome.errors, vec!["SKU is required", "Stock Total must be a number"]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_stock_available_is_reconciled() {
        let conflicting = Record::from_pairs([
            ("sku", json!("KD-01")),
            ("product_name", json!("Kabel Data")),
            ("stock_total", json!("12")),
            ("stock_reserved", json!(5)),
            ("stock_available", json!("9")),
        ]);
        let normalizer = RowNormalizer::new(EntityKind::Stock);
        let outcome = normalizer
            .normalize(2, &conflicting, &AllowedSets::new())
            .unwrap();

        assert!(outcome.is_valid());
        assert_eq!(outcome.normalized_fields.get("stock_available"), Some(&json!(7)));
        assert_eq!(outcome.warnings, vec!["Stock Available adjusted from 9 to 7"]);

        let mut missing = conflicting.clone();
        missing.data.remove("stock_available");
        let outcome = normalizer.normalize(3, &missing, &AllowedSets::new()).unwrap();
        assert_eq!(outcome.normalized_fields.get("stock_available"), Some(&json!(7)));
        assert_eq!(outcome.warnings, vec!["Stock Available derived as 7"]);
    }

    #[test]
    fn test_consistent_stock_has_no_warning() {
        let raw = Record::from_pairs([
            ("sku", json!("KD-01")),
            ("product_name", json!("Kabel Data")),
            ("stock_total", json!(12)),
            ("stock_reserved", json!(2)),
            ("stock_available", json!(10)),
            ("active", json!("1")),
        ]);
        let outcome = RowNormalizer::new(EntityKind::Stock)
            .normalize(2, &raw, &AllowedSets::new())
            .unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.normalized_fields.get("active"), Some(&json!("TRUE")));
    }
}
