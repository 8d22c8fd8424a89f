use crate::calendar::MonthCursor;
use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{Transaction, TransactionFilter};
use crate::services::{delete_transaction, list_transactions};
use tracing::warn;

pub const LOAD_FAILED_MESSAGE: &str = "Could not load transactions, please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// State behind the transaction list: the month's rows plus a locally filtered view.
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    period: MonthCursor,
    transactions: Vec<Transaction>,
    visible: Vec<Transaction>,
    search: String,
    category: Option<String>,
    deleting: Option<String>,
    status: LoadStatus,
}

impl TransactionLedger {
    pub fn new(period: MonthCursor) -> Self {
        Self {
            period,
            transactions: Vec::new(),
            visible: Vec::new(),
            search: String::new(),
            category: None,
            deleting: None,
            status: LoadStatus::Idle,
        }
    }

    pub fn period(&self) -> MonthCursor {
        self.period
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            LoadStatus::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Every row fetched for the period.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Rows matching the current search.
    pub fn visible(&self) -> &[Transaction] {
        &self.visible
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.as_deref() == Some(id)
    }

    /// Change the period. Returns `true` when the rows need to be fetched again.
    pub fn set_period(&mut self, period: MonthCursor) -> bool {
        if period == self.period {
            return false;
        }
        self.period = period;
        self.status = LoadStatus::Idle;
        true
    }

    pub fn next_month(&mut self) -> bool {
        self.set_period(self.period.next())
    }

    pub fn previous_month(&mut self) -> bool {
        self.set_period(self.period.previous())
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Restrict fetches to one category. Returns `true` when the rows need to be
    /// fetched again.
    pub fn set_category(&mut self, category: Option<String>) -> bool {
        if category == self.category {
            return false;
        }
        self.category = category;
        true
    }

    /// Fetch the period's rows. On failure the inline message is recorded and the
    /// error is returned so the caller can offer a retry.
    pub async fn refresh(&mut self, gateway: &ApiGateway) -> Result<(), ApiError> {
        self.status = LoadStatus::Loading;
        let mut filter = TransactionFilter::for_period(self.period.month(), self.period.year());
        if let Some(category) = &self.category {
            filter = filter.with_category(category.clone());
        }
        match list_transactions(gateway, &filter).await {
            Ok(transactions) => {
                self.replace(transactions);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, period = %self.period, "failed to load transactions");
                self.status = LoadStatus::Failed(LOAD_FAILED_MESSAGE.to_string());
                Err(err)
            }
        }
    }

    /// Install freshly fetched rows and re-apply the current search.
    pub fn replace(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
        self.status = LoadStatus::Loaded;
        self.apply_search();
    }

    /// Case-insensitive match on the description. Rows without one never match a
    /// non-empty search.
    pub fn search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.apply_search();
    }

    fn apply_search(&mut self) {
        let needle = self.search.to_uppercase();
        self.visible = self
            .transactions
            .iter()
            .filter(|transaction| {
                needle.is_empty()
                    || transaction
                        .description
                        .as_deref()
                        .is_some_and(|text| text.to_uppercase().contains(&needle))
            })
            .cloned()
            .collect();
    }

    /// Delete on the server, then drop the row locally without re-fetching.
    pub async fn delete(&mut self, gateway: &ApiGateway, id: &str) -> Result<(), ApiError> {
        self.deleting = Some(id.to_string());
        let result = delete_transaction(gateway, id).await;
        self.deleting = None;
        match result {
            Ok(()) => {
                self.remove_local(id);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, %id, "failed to delete transaction");
                Err(err)
            }
        }
    }

    /// Remove a row from both the fetched and the visible sets.
    pub fn remove_local(&mut self, id: &str) -> bool {
        let before = self.visible.len();
        self.visible.retain(|transaction| transaction.id != id);
        self.transactions.retain(|transaction| transaction.id != id);
        self.visible.len() != before
    }
}
