use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pocketbook_core::{telemetry, ApiGateway, ClientSettings, SessionPhase, SessionStore};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use std::fs;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Pocketbook")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Offline smoke check: load a config, sign in locally, authorize a request.
    Smoke,
}

const SMOKE_CONFIG: &str = r#"
api:
  url: http://127.0.0.1:3333/api
  timeout_ms: 1000
identity:
  provider: local
  uid: smoke-user
  display_name: Smoke
  token: smoke-token
"#;

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("pocketbook.yaml");
    fs::write(&config_path, SMOKE_CONFIG)?;
    let settings = ClientSettings::load(Some(&config_path))
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;

    runtime.block_on(async {
        let provider = settings.identity.build_provider();
        let store = SessionStore::new(provider.clone());
        let _subscription = store.subscribe()?;
        store.sign_in().await;
        let mut changes = store.changes();
        let state = changes
            .wait_for(|state| state.identity.is_some() || state.error.is_some())
            .await
            .context("session store closed")?
            .clone();
        if state.phase() != SessionPhase::Authenticated {
            bail!("sign-in did not complete: {:?}", state.error);
        }

        let gateway = ApiGateway::with_session(&settings.api, provider)?;
        let request = gateway
            .prepare(gateway.request(Method::GET, &["transactions"])?)
            .await?;
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if header != "Bearer smoke-token" {
            bail!("unexpected authorization header `{header}`");
        }

        info!(url = %request.url(), "smoke test request authorized");
        Ok::<(), anyhow::Error>(())
    })
}
