use clap::Parser;
use pocketbook::{run, Cli};
use pocketbook_core::{telemetry, ClientSettings};
use tokio::runtime::Runtime;

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(telemetry::env_filter_or("warn"))?;

    let cli = Cli::parse();
    let settings = ClientSettings::load(cli.config.as_deref())
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;

    let runtime = Runtime::new()?;
    let output = runtime.block_on(run(cli.command, &settings))?;
    println!("{output}");

    Ok(())
}
