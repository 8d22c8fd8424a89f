pub mod cli;
pub mod commands;
pub mod render;

pub use cli::{Cli, Command, PeriodArgs, TransactionsCommand};
pub use commands::{run, run_at, Session};
