use thiserror::Error;

/// 單列驗證問題；Display 文字即為回傳給使用者的訊息
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("Date is required")]
    DateMissing,

    #[error("Invalid date format")]
    DateInvalid,

    #[error("{label} is required")]
    RequiredFieldMissing { label: String },

    #[error("Invalid {field} \"{value}\"")]
    InvalidCategory { field: String, value: String },

    #[error("{label} must be TRUE/FALSE")]
    BooleanCoercion { label: String },

    #[error("{label} must be a number")]
    NotNumeric { label: String },
}

/// 不影響列狀態的提示
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowWarning {
    #[error("{label} adjusted from {from} to {to}")]
    DerivedValueAdjusted { label: String, from: f64, to: f64 },

    #[error("{label} derived as {value}")]
    DerivedValueFilled { label: String, value: f64 },
}

/// 批次訊息前綴，例如 `Row 2: Shift is required`
pub fn row_message(row_number: usize, message: &str) -> String {
    format!("Row {}: {}", row_number, message)
}
