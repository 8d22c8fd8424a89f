use crate::calendar::MonthCursor;
use crate::error::ApiError;
use crate::format::format_percent;
use crate::gateway::ApiGateway;
use crate::models::{CategorySummary, MonthlyItem, Transaction, TransactionSummary, TransactionType};
use crate::services::{transaction_history, transaction_summary};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const UNCATEGORIZED: &str = "Uncategorized";
const UNCATEGORIZED_COLOR: &str = "#94a3b8";

/// One slice of the expenses-by-category chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSlice {
    pub category_name: String,
    pub amount: f64,
    pub fill: String,
    /// Fraction of the month's expenses, between 0 and 1.
    pub share: f64,
}

impl ExpenseSlice {
    pub fn label(&self) -> String {
        slice_label(Some(&self.category_name), self.share)
    }
}

/// Everything the dashboard shows for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub period: MonthCursor,
    pub summary: TransactionSummary,
    pub history: Vec<MonthlyItem>,
}

impl DashboardView {
    pub fn empty(period: MonthCursor) -> Self {
        Self {
            period,
            summary: TransactionSummary::default(),
            history: Vec::new(),
        }
    }

    /// Fetch the month's summary and the income/expense history concurrently.
    pub async fn load(gateway: &ApiGateway, period: MonthCursor) -> Result<Self, ApiError> {
        let (summary, history) = tokio::try_join!(
            transaction_summary(gateway, period),
            transaction_history(gateway, period, None)
        )?;
        Ok(Self {
            period,
            summary,
            history,
        })
    }

    pub fn expense_slices(&self) -> Vec<ExpenseSlice> {
        expense_slices(&self.summary.expenses_by_category)
    }

    pub fn balance_is_positive(&self) -> bool {
        self.summary.balance > 0.0
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }
}

pub fn expense_slices(by_category: &[CategorySummary]) -> Vec<ExpenseSlice> {
    let total: f64 = by_category.iter().map(|item| coerce(item.amount)).sum();
    by_category
        .iter()
        .map(|item| {
            let amount = coerce(item.amount);
            let name = item.category_name.trim();
            ExpenseSlice {
                category_name: if name.is_empty() {
                    UNCATEGORIZED.to_string()
                } else {
                    name.to_string()
                },
                amount,
                fill: item.category_color.clone(),
                share: if total > 0.0 { amount / total } else { 0.0 },
            }
        })
        .collect()
}

/// `"<name>: <pct>%"`, naming unnamed slices "Uncategorized".
pub fn slice_label(name: Option<&str>, share: f64) -> String {
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(UNCATEGORIZED);
    format!("{name}: {}", format_percent(share))
}

/// Aggregate a month of transactions into the summary shape the backend returns.
///
/// Expense categories are ordered largest first; ties keep name order.
pub fn summarize(transactions: &[Transaction]) -> TransactionSummary {
    let mut total_expenses = 0.0;
    let mut total_incomes = 0.0;
    let mut by_category: Vec<CategorySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for transaction in transactions {
        let amount = coerce(transaction.amount);
        match transaction.kind {
            TransactionType::Income => total_incomes += amount,
            TransactionType::Expense => {
                total_expenses += amount;
                let slot = *index
                    .entry(transaction.category_id.as_str())
                    .or_insert_with(|| {
                        let (name, color) = transaction
                            .category
                            .as_ref()
                            .map(|c| (c.name.clone(), c.color.clone()))
                            .unwrap_or_else(|| {
                                (UNCATEGORIZED.to_string(), UNCATEGORIZED_COLOR.to_string())
                            });
                        by_category.push(CategorySummary {
                            category_id: transaction.category_id.clone(),
                            category_name: name,
                            category_color: color,
                            amount: 0.0,
                            percentage: 0.0,
                        });
                        by_category.len() - 1
                    });
                by_category[slot].amount += amount;
            }
        }
    }

    for item in &mut by_category {
        item.percentage = if total_expenses > 0.0 {
            item.amount / total_expenses * 100.0
        } else {
            0.0
        };
    }
    by_category.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });

    TransactionSummary {
        total_expenses,
        total_incomes,
        balance: total_incomes - total_expenses,
        expenses_by_category: by_category,
    }
}

fn coerce(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
