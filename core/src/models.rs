//! Records exchanged with the finance backend. They mirror its JSON shape and are
//! passed through without validation; only money fields are coerced to numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(format!("unknown transaction type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

/// One slice of the per-category expense breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category_id: String,
    pub category_name: String,
    #[serde(default)]
    pub category_color: String,
    // The backend spells this field `amout`.
    #[serde(
        rename = "amout",
        alias = "amount",
        default,
        deserialize_with = "lenient_number"
    )]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(deserialize_with = "lenient_number")]
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub category_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<Category>,
}

/// Query parameters for `GET /transactions`. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
}

impl TransactionFilter {
    pub fn for_period(month: u32, year: i32) -> Self {
        Self {
            month: Some(month),
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_expenses: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_incomes: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub balance: f64,
    #[serde(default)]
    pub expenses_by_category: Vec<CategorySummary>,
}

/// One bar of the multi-month income/expense history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyItem {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub expense: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub income: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub history: Vec<MonthlyItem>,
}

/// Body of `POST /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub description: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub category_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// Accept numbers, numeric strings and nulls; anything unparseable becomes zero.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(value) => value,
        RawNumber::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        RawNumber::Other(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}
