use std::path::PathBuf;

use anyhow::bail;
use colored::Colorize;
use coupon_contract::{Contract, ContractConfig, Function};
use coupon_ledger::InMemoryLedger;
use coupon_store::{render_record, HistoryEntry};
use coupon_types::EntityKind;
use serde_json::Value;

use crate::cli::*;
use crate::config::CliConfig;
use crate::state;

/// Resolved settings for one run: file config with flag overrides applied.
struct Session {
    state_path: PathBuf,
    contract: ContractConfig,
    format: OutputFormat,
}

impl Session {
    fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let config = CliConfig::load(cli.config.as_deref())?;
        Ok(Self {
            state_path: cli.state.clone().unwrap_or(config.state_path),
            contract: config.contract,
            format: cli.format,
        })
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = Session::resolve(&cli)?;
    match cli.command {
        Command::Init(args) => cmd_init(&session, args),
        Command::Invoke(args) => cmd_invoke(&session, args),
        Command::History(args) => cmd_history(&session, args),
        Command::Dump(args) => cmd_dump(&session, args),
        Command::Functions => cmd_functions(),
    }
}

fn cmd_init(session: &Session, args: InitArgs) -> anyhow::Result<()> {
    if session.state_path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to replace it",
            session.state_path.display()
        );
    }
    let config = ContractConfig {
        seed_on_init: session.contract.seed_on_init && !args.no_seed,
        ..session.contract.clone()
    };
    let seeded = config.seed_on_init;
    let ledger = InMemoryLedger::new();
    let receipt = Contract::new(config).init(&ledger)?;
    state::save(&session.state_path, &ledger)?;

    println!(
        "{} Initialized coupon ledger in {}",
        "✓".green().bold(),
        session.state_path.display().to_string().bold()
    );
    println!("  Entries: {}", receipt.writes);
    println!(
        "  Sample data: {}",
        if seeded { "seeded".green() } else { "none".dimmed() }
    );
    Ok(())
}

fn cmd_invoke(session: &Session, args: InvokeArgs) -> anyhow::Result<()> {
    let function: Function = args.function.parse()?;
    let ledger = state::load(&session.state_path)?;
    let contract = Contract::new(session.contract.clone());
    let submission = contract.submit(&ledger, function.name(), &args.args)?;
    if !function.is_query() {
        state::save(&session.state_path, &ledger)?;
    }

    match session.format {
        OutputFormat::Json => println!("{}", String::from_utf8_lossy(&submission.payload)),
        OutputFormat::Text => {
            if !function.is_query() {
                println!(
                    "{} {} committed at height {}",
                    "✓".green().bold(),
                    function.name().bold(),
                    submission.receipt.height
                );
            }
            if !submission.payload.is_empty() {
                println!("{}", pretty(&submission.payload));
            }
        }
    }
    Ok(())
}

fn cmd_history(session: &Session, args: HistoryArgs) -> anyhow::Result<()> {
    let ledger = state::load(&session.state_path)?;
    let contract = Contract::new(session.contract.clone());
    let submission = contract.submit(
        &ledger,
        Function::QueryHistoryByKey.name(),
        std::slice::from_ref(&args.key),
    )?;
    if session.format == OutputFormat::Json {
        println!("{}", String::from_utf8_lossy(&submission.payload));
        return Ok(());
    }

    let entries: Vec<HistoryEntry> = serde_json::from_slice(&submission.payload)?;
    if entries.is_empty() {
        println!("No history for {}.", args.key.yellow());
        return Ok(());
    }
    for entry in &entries {
        print_history_entry(entry);
    }
    Ok(())
}

fn cmd_dump(session: &Session, args: DumpArgs) -> anyhow::Result<()> {
    let ledger = state::load(&session.state_path)?;
    let snapshot = ledger.snapshot()?;
    let entries: Vec<(&str, &[u8])> = snapshot
        .entries()
        .filter(|(key, _)| args.pointers || !EntityKind::is_pointer_key(key))
        .collect();

    match session.format {
        OutputFormat::Json => {
            let rows: serde_json::Map<String, Value> = entries
                .iter()
                .map(|(key, value)| (key.to_string(), render_record(value)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            println!(
                "Ledger at height {}, {} entries",
                snapshot.height().to_string().bold(),
                entries.len()
            );
            for (key, value) in entries {
                println!("{}  {}", key.yellow(), render_record(value));
            }
        }
    }
    Ok(())
}

fn cmd_functions() -> anyhow::Result<()> {
    for function in Function::ALL {
        let params: Vec<String> = function
            .params()
            .iter()
            .map(|p| format!("<{p}>"))
            .collect();
        let kind = if function.is_query() { "query" } else { "invoke" };
        println!("{:<24} {:<6} {}", function.name().bold(), kind.dimmed(), params.join(" "));
    }
    Ok(())
}

/// Pretty JSON when the payload is JSON, the raw text otherwise.
fn pretty(payload: &[u8]) -> String {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}

fn print_history_entry(entry: &HistoryEntry) {
    let marker = if entry.is_delete {
        "delete".red()
    } else {
        "write".green()
    };
    println!("{}  {}  {}", entry.timestamp.dimmed(), marker, entry.tx_id.yellow());
    if let Some(value) = &entry.value {
        println!("    {value}");
    }
}
