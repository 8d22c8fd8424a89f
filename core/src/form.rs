use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{Category, CreateTransaction, Transaction, TransactionType};
use crate::services::create_transaction;
use chrono::{NaiveDate, TimeZone, Utc};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("All fields must be filled in")]
    Incomplete,
    #[error("Enter a positive amount")]
    NonPositiveAmount,
    #[error("`{0}` is not a valid amount")]
    InvalidAmount(String),
    #[error("`{0}` is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("`{0}` is not a category for this transaction type")]
    CategoryMismatch(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FormError {
    #[error(transparent)]
    Invalid(#[from] DraftError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Raw input of the "new transaction" form, kept as text until submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub kind: TransactionType,
    pub description: String,
    pub amount: String,
    pub date: String,
    pub category_id: String,
}

impl Default for TransactionDraft {
    fn default() -> Self {
        Self::new(TransactionType::Expense)
    }
}

impl TransactionDraft {
    pub fn new(kind: TransactionType) -> Self {
        Self {
            kind,
            description: String::new(),
            amount: String::new(),
            date: String::new(),
            category_id: String::new(),
        }
    }

    /// Switch between expense and income, dropping a category of the other kind.
    pub fn set_kind(&mut self, kind: TransactionType, categories: &[Category]) {
        self.kind = kind;
        let still_valid = categories
            .iter()
            .any(|category| category.id == self.category_id && category.kind == kind);
        if !still_valid {
            self.category_id.clear();
        }
    }

    pub fn categories_for<'a>(&self, categories: &'a [Category]) -> Vec<&'a Category> {
        categories
            .iter()
            .filter(|category| category.kind == self.kind)
            .collect()
    }

    /// Check the draft and build the request body. The date is pinned to noon UTC so
    /// it lands on the same calendar day in every timezone the backend might use.
    pub fn validate(&self) -> Result<CreateTransaction, DraftError> {
        let description = self.description.trim();
        let amount_text = self.amount.trim();
        let date_text = self.date.trim();
        let category_id = self.category_id.trim();
        if description.is_empty()
            || amount_text.is_empty()
            || date_text.is_empty()
            || category_id.is_empty()
        {
            return Err(DraftError::Incomplete);
        }

        let amount = amount_text
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| DraftError::InvalidAmount(amount_text.to_string()))?;
        if amount == 0.0 {
            return Err(DraftError::Incomplete);
        }
        if amount < 0.0 {
            return Err(DraftError::NonPositiveAmount);
        }

        let day = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
            .map_err(|_| DraftError::InvalidDate(date_text.to_string()))?;
        let noon = day
            .and_hms_opt(12, 0, 0)
            .ok_or_else(|| DraftError::InvalidDate(date_text.to_string()))?;

        Ok(CreateTransaction {
            description: description.to_string(),
            amount,
            date: Utc.from_utc_datetime(&noon),
            category_id: category_id.to_string(),
            kind: self.kind,
        })
    }

    /// Validate, then also require the category to be one offered for the draft's type.
    pub fn validate_against(
        &self,
        categories: &[Category],
    ) -> Result<CreateTransaction, DraftError> {
        let body = self.validate()?;
        let offered = self
            .categories_for(categories)
            .iter()
            .any(|category| category.id == body.category_id);
        if !offered {
            return Err(DraftError::CategoryMismatch(body.category_id));
        }
        Ok(body)
    }

    /// Post the draft. `categories` is the list the category was picked from.
    pub async fn submit(
        &self,
        gateway: &ApiGateway,
        categories: &[Category],
    ) -> Result<Transaction, FormError> {
        let body = self.validate_against(categories)?;
        Ok(create_transaction(gateway, &body).await?)
    }
}
