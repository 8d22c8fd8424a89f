pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod format;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod oauth;
pub mod services;
pub mod session;
pub mod telemetry;

pub use calendar::MonthCursor;
pub use config::{ApiSettings, ClientSettings, ConfigError, IdentitySettings};
pub use dashboard::DashboardView;
pub use error::{ApiError, IdentityError, SessionError};
pub use form::{DraftError, FormError, TransactionDraft};
pub use gateway::{ApiGateway, BearerAuth, RequestInterceptor};
pub use identity::{AuthEvent, Identity, IdentityProvider, LocalIdentityProvider};
pub use ledger::TransactionLedger;
pub use models::{
    Category, CategorySummary, CreateTransaction, MonthlyItem, Transaction, TransactionFilter,
    TransactionSummary, TransactionType,
};
pub use oauth::OAuthRefreshProvider;
pub use session::{SessionPhase, SessionState, SessionStore, SessionSubscription};
