use crate::calendar::MonthCursor;
use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{
    CreateTransaction, HistoryEnvelope, MonthlyItem, Transaction, TransactionFilter,
    TransactionSummary,
};
use serde::Serialize;

#[derive(Serialize)]
struct PeriodQuery {
    month: u32,
    year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    months: Option<u32>,
}

impl PeriodQuery {
    fn new(period: MonthCursor, months: Option<u32>) -> Self {
        Self {
            month: period.month(),
            year: period.year(),
            months,
        }
    }
}

/// `GET /transactions` with optional month/year/category/type filters.
#[tracing::instrument(skip(gateway))]
pub async fn list_transactions(
    gateway: &ApiGateway,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, ApiError> {
    let transactions: Vec<Transaction> =
        gateway.get_json_with(&["transactions"], filter).await?;
    tracing::debug!(count = transactions.len(), "transactions loaded");
    Ok(transactions)
}

/// `GET /transactions/summary` for one month.
#[tracing::instrument(skip(gateway, period), fields(period = %period))]
pub async fn transaction_summary(
    gateway: &ApiGateway,
    period: MonthCursor,
) -> Result<TransactionSummary, ApiError> {
    gateway
        .get_json_with(
            &["transactions", "summary"],
            &PeriodQuery::new(period, None),
        )
        .await
}

/// `GET /transactions/historical`, ending at `period`. The backend picks the window
/// length when `months` is `None`.
#[tracing::instrument(skip(gateway, period), fields(period = %period))]
pub async fn transaction_history(
    gateway: &ApiGateway,
    period: MonthCursor,
    months: Option<u32>,
) -> Result<Vec<MonthlyItem>, ApiError> {
    let envelope: HistoryEnvelope = gateway
        .get_json_with(
            &["transactions", "historical"],
            &PeriodQuery::new(period, months),
        )
        .await?;
    Ok(envelope.history)
}

/// `POST /transactions`
#[tracing::instrument(skip(gateway, transaction), fields(kind = %transaction.kind))]
pub async fn create_transaction(
    gateway: &ApiGateway,
    transaction: &CreateTransaction,
) -> Result<Transaction, ApiError> {
    let created: Transaction = gateway.post_json(&["transactions"], transaction).await?;
    tracing::info!(id = %created.id, "transaction created");
    Ok(created)
}

/// `DELETE /transactions/{id}`
#[tracing::instrument(skip(gateway))]
pub async fn delete_transaction(gateway: &ApiGateway, id: &str) -> Result<(), ApiError> {
    gateway.delete(&["transactions", id]).await?;
    tracing::info!(%id, "transaction deleted");
    Ok(())
}
