use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "coupon",
    about = "Coupon Ledger: issue, validate and redeem coupons on a transactional ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file (defaults to ./coupon.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger state file, overriding the configured path
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new ledger with range pointers and sample data
    Init(InitArgs),
    /// Run a contract function in one transaction
    Invoke(InvokeArgs),
    /// Show the change history of a key
    History(HistoryArgs),
    /// List every live entry in the ledger
    Dump(DumpArgs),
    /// List contract functions and their arguments
    Functions,
}

#[derive(Args)]
pub struct InitArgs {
    /// Write range pointers only
    #[arg(long)]
    pub no_seed: bool,
    /// Replace an existing state file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub key: String,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Include range pointer entries
    #[arg(long)]
    pub pointers: bool,
}
