use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{Category, TransactionType};

/// `GET /categories`
#[tracing::instrument(skip(gateway))]
pub async fn list_categories(gateway: &ApiGateway) -> Result<Vec<Category>, ApiError> {
    let categories: Vec<Category> = gateway.get_json(&["categories"]).await?;
    tracing::debug!(count = categories.len(), "categories loaded");
    Ok(categories)
}

/// Categories usable for a transaction of `kind`.
pub fn categories_of(categories: &[Category], kind: TransactionType) -> Vec<&Category> {
    categories
        .iter()
        .filter(|category| category.kind == kind)
        .collect()
}
