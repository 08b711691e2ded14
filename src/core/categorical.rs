use crate::core::issue::RowIssue;
use std::collections::HashSet;

/// 檢查值是否屬於允許集合。
///
/// 只有在值非空且允許集合存在、非空時才檢查；沒有主資料的欄位不受限制。
/// 比對是完全相等，不做大小寫轉換。前後空白已由 `Record::text` 去除，
/// 這裡不再處理。
pub fn validate(field: &str, value: &str, allowed: Option<&HashSet<String>>) -> Result<(), RowIssue> {
    match allowed {
        Some(set) if !value.is_empty() && !set.is_empty() && !set.contains(value) => {
            Err(RowIssue::InvalidCategory {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> HashSet<String> {
        ["Shopee", "TikTok"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_member_value_passes() {
        assert!(validate("channel", "Shopee", Some(&channels())).is_ok());
    }

    #[test]
    fn test_comparison_is_exact() {
        let err = validate("channel", "shopee", Some(&channels())).unwrap_err();
        assert_eq!(err.to_string(), "Invalid channel \"shopee\"");
        assert!(validate("channel", "Shopee ", Some(&channels())).is_err());
    }

    #[test]
    fn test_missing_or_empty_sets_are_permissive() {
        assert!(validate("channel", "Lazada", None).is_ok());
        assert!(validate("channel", "Lazada", Some(&HashSet::new())).is_ok());
        assert!(validate("channel", "", Some(&channels())).is_ok());
    }
}
