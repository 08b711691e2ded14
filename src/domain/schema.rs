use crate::utils::error::OpsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Text,
    /// 值必須屬於主資料中的允許集合 (若有提供)
    Categorical,
    Boolean,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        required,
    }
}

/// 數值欄位推導規則：`target = minuend - subtrahend`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivation {
    pub target: &'static str,
    pub minuend: &'static str,
    pub subtrahend: &'static str,
}

const STOCK_DERIVATIONS: &[Derivation] = &[Derivation {
    target: "stock_available",
    minuend: "stock_total",
    subtrahend: "stock_reserved",
}];

const CHAT_LOG_FIELDS: &[FieldSpec] = &[
    field("date", "Date", FieldKind::Date, true),
    field("shift", "Shift", FieldKind::Categorical, true),
    field("cs", "CS", FieldKind::Categorical, true),
    field("channel", "Channel", FieldKind::Categorical, true),
    field("customer_name", "Customer Name", FieldKind::Text, false),
    field("order_number", "Order Number", FieldKind::Text, false),
    field("intention", "Intention", FieldKind::Categorical, false),
    field("store", "Store", FieldKind::Categorical, false),
    field("closing_status", "Closing Status", FieldKind::Categorical, true),
    field("survey", "Survey", FieldKind::Boolean, false),
    field("notes", "Notes", FieldKind::Text, false),
];

const STOCK_FIELDS: &[FieldSpec] = &[
    field("sku", "SKU", FieldKind::Text, true),
    field("product_name", "Product Name", FieldKind::Text, true),
    field("category", "Category", FieldKind::Categorical, false),
    field("stock_total", "Stock Total", FieldKind::Numeric, false),
    field("stock_reserved", "Stock Reserved", FieldKind::Numeric, false),
    field("stock_available", "Stock Available", FieldKind::Numeric, false),
    field("active", "Active", FieldKind::Boolean, false),
];

const WARRANTY_FIELDS: &[FieldSpec] = &[
    field("date", "Date", FieldKind::Date, true),
    field("customer_name", "Customer Name", FieldKind::Text, true),
    field("product_name", "Product Name", FieldKind::Text, true),
    field("serial_number", "Serial Number", FieldKind::Text, false),
    field("store", "Store", FieldKind::Categorical, false),
    field("status", "Status", FieldKind::Categorical, true),
    field("notes", "Notes", FieldKind::Text, false),
];

/// 可匯入 / 可分析的實體類型，每種類型有固定的欄位形狀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    ChatLog,
    Stock,
    Warranty,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::ChatLog, EntityKind::Stock, EntityKind::Warranty];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ChatLog => "chat-log",
            EntityKind::Stock => "stock",
            EntityKind::Warranty => "warranty",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            EntityKind::ChatLog => CHAT_LOG_FIELDS,
            EntityKind::Stock => STOCK_FIELDS,
            EntityKind::Warranty => WARRANTY_FIELDS,
        }
    }

    pub fn derivations(&self) -> &'static [Derivation] {
        match self {
            EntityKind::Stock => STOCK_DERIVATIONS,
            EntityKind::ChatLog | EntityKind::Warranty => &[],
        }
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.key == key)
    }

    pub fn date_field(&self) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.kind == FieldKind::Date)
    }

    /// 樞紐表標題用的欄位顯示名稱，未知欄位直接使用鍵名
    pub fn label_for(&self, key: &str) -> String {
        self.field(key)
            .map(|f| f.label.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "chat-log" | "chatlog" | "chat" => Ok(EntityKind::ChatLog),
            "stock" => Ok(EntityKind::Stock),
            "warranty" => Ok(EntityKind::Warranty),
            _ => Err(OpsError::UnknownEntity {
                name: s.to_string(),
            }),
        }
    }
}
