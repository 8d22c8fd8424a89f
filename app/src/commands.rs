use crate::cli::{Command, PeriodArgs, TransactionsCommand};
use crate::render;
use anyhow::{anyhow, bail, Context, Result};
use pocketbook_core::services::{self, categories::categories_of};
use pocketbook_core::{
    ApiError, ApiGateway, ClientSettings, DashboardView, FormError, MonthCursor, SessionState,
    SessionStore, SessionSubscription, TransactionDraft, TransactionLedger,
};
use tracing::{debug, info};

/// A signed-in session plus the gateway that authenticates with it.
pub struct Session {
    store: SessionStore,
    gateway: ApiGateway,
    _subscription: SessionSubscription,
}

impl Session {
    /// Subscribe to the configured provider, sign in and wait for its notification.
    pub async fn connect(settings: &ClientSettings) -> Result<Self> {
        debug!(uid = %settings.identity.profile().uid, "connecting session");
        let provider = settings.identity.build_provider();
        let store = SessionStore::new(provider.clone());

        let mut changes = store.changes();
        let subscription = store.subscribe()?;
        // The provider replays its current identity on subscribe; let it land first.
        changes
            .changed()
            .await
            .context("session store closed before the first notification")?;

        if store.identity().is_none() {
            store.sign_in().await;
        }
        let state = store.settled().await;
        if let Some(error) = state.error {
            bail!("Sign-in failed: {error}");
        }
        let identity = state
            .identity
            .ok_or_else(|| anyhow!("Sign-in did not produce an identity"))?;
        info!(uid = %identity.uid, "session established");

        let gateway = ApiGateway::with_session(&settings.api, provider).map_err(api_error)?;
        Ok(Self {
            store,
            gateway,
            _subscription: subscription,
        })
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    /// Ask the provider to end the session and wait for its notification.
    pub async fn sign_out(&self) -> Result<SessionState> {
        self.store.sign_out().await;
        let mut changes = self.store.changes();
        let state = changes
            .wait_for(|state| state.identity.is_none() || state.error.is_some())
            .await
            .context("session store closed while signing out")?
            .clone();
        if let Some(error) = &state.error {
            bail!("Sign-out failed: {error}");
        }
        Ok(state)
    }
}

/// Run one command and return the text to print.
pub async fn run(command: Command, settings: &ClientSettings) -> Result<String> {
    run_at(command, settings, MonthCursor::current()).await
}

/// As [`run`], resolving omitted periods against `today`.
pub async fn run_at(
    command: Command,
    settings: &ClientSettings,
    today: MonthCursor,
) -> Result<String> {
    let session = Session::connect(settings).await?;
    let gateway = session.gateway();

    match command {
        Command::Whoami => Ok(render::session(&session.state())),
        Command::Signout => {
            let before = session.state();
            session.sign_out().await?;
            let label = before
                .identity
                .as_ref()
                .map(|identity| identity.label().to_string())
                .unwrap_or_default();
            Ok(format!("Signed out {label}"))
        }
        Command::Dashboard(period) => {
            let period = period.resolve(today)?;
            let view = DashboardView::load(gateway, period)
                .await
                .map_err(api_error)?;
            Ok(render::dashboard(&view))
        }
        Command::Transactions(TransactionsCommand::List {
            period,
            search,
            category,
        }) => list_transactions(gateway, period, search, category, today).await,
        Command::Transactions(TransactionsCommand::Add {
            kind,
            description,
            amount,
            date,
            category,
        }) => {
            let draft = TransactionDraft {
                kind,
                description,
                amount,
                date,
                category_id: category,
            };
            let categories = services::list_categories(gateway)
                .await
                .map_err(api_error)?;
            let created = draft
                .submit(gateway, &categories)
                .await
                .map_err(|err| match err {
                    FormError::Invalid(err) => anyhow!(err.to_string()),
                    FormError::Api(err) => api_error(err),
                })?;
            Ok(format!("Created {}", render::transaction_row(&created)))
        }
        Command::Transactions(TransactionsCommand::Delete { id }) => {
            services::delete_transaction(gateway, &id)
                .await
                .map_err(api_error)?;
            Ok(format!("Deleted transaction {id}"))
        }
        Command::Categories { kind } => {
            let all = services::list_categories(gateway)
                .await
                .map_err(api_error)?;
            let shown = match kind {
                Some(kind) => categories_of(&all, kind),
                None => all.iter().collect(),
            };
            Ok(render::categories(&shown))
        }
    }
}

async fn list_transactions(
    gateway: &ApiGateway,
    period: PeriodArgs,
    search: Option<String>,
    category: Option<String>,
    today: MonthCursor,
) -> Result<String> {
    let mut ledger = TransactionLedger::new(period.resolve(today)?);
    ledger.set_category(category);
    ledger.refresh(gateway).await.map_err(api_error)?;
    if let Some(search) = search {
        ledger.search(search);
    }
    debug!(
        fetched = ledger.transactions().len(),
        visible = ledger.visible().len(),
        "transactions listed"
    );
    Ok(render::ledger(&ledger))
}

fn api_error(err: ApiError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
