//! Typed wrappers for the finance backend endpoints. Authentication is handled by
//! the gateway's interceptors, so nothing here touches tokens.

pub mod categories;
pub mod transactions;

pub use categories::list_categories;
pub use transactions::{
    create_transaction, delete_transaction, list_transactions, transaction_history,
    transaction_summary,
};
