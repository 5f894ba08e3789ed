use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use label_match::audit::run_audit;
use label_match::console::Console;
use label_match::interrupt::{install_ctrl_c_handler, FAREWELL};
use label_match::progress::{format_duration, set_log_only};
use label_match::protocol::ProtocolKind;
use label_match::safety::validate_output_path;
use label_match::session::{parse_species_name, Session};
use label_match::sqlite_store::SqliteStore;
use label_match::store::RecordStore;

#[derive(Parser)]
#[command(name = "label-match")]
#[command(about = "Find specimen records that duplicate image labels and resolve them one by one")]
struct Args {
    /// SQLite specimen database
    #[arg(env = "LABEL_MATCH_DB")]
    database: PathBuf,

    /// How each match is decided: numbered menu or yes/no questions
    #[arg(long, value_enum, default_value_t = ProtocolKind::Menu)]
    protocol: ProtocolKind,

    /// Examine a single species ("Genus epithet") instead of showing the menu
    #[arg(long)]
    species: Option<String>,

    /// Report duplicates without prompting or changing anything
    #[arg(long)]
    audit: bool,

    /// Write session statistics (or the audit report) to this JSON file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and log progress lines instead (tail-friendly)
    #[arg(long)]
    log_only: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "label_match=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn audit(args: &Args, store: &SqliteStore) -> Result<()> {
    let only = match &args.species {
        Some(name) => {
            let (genus, epithet) = parse_species_name(name)?;
            let species = store
                .find_species(genus, epithet)?
                .with_context(|| format!("Species {} not found in database", name.trim()))?;
            Some(species)
        }
        None => None,
    };

    let report = run_audit(store, only.as_ref())?;
    println!("{}", report);

    if let Some(path) = &args.stats {
        report
            .write_json(path)
            .context("Failed to write audit report")?;
        println!("Report written to {:?}", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    set_log_only(args.log_only);

    if let Some(path) = &args.stats {
        validate_output_path(path, "json", &args.database)?;
    }
    if !args.database.exists() {
        bail!("Database {:?} does not exist", args.database);
    }

    let start = Instant::now();
    info!(database = ?args.database, "opening specimen database");
    let mut store = SqliteStore::open(&args.database).context("Failed to open specimen database")?;

    install_ctrl_c_handler()?;

    if args.audit {
        return audit(&args, &store);
    }

    let mut session = Session::new(&mut store, args.protocol, Console::stdio());
    let result = match &args.species {
        Some(name) => session.run_named_species(name).map(|_| ()),
        None => session.run(),
    };
    match result {
        Ok(()) => {}
        Err(err) if err.is_interrupt() => println!("\n{}", FAREWELL),
        Err(err) => return Err(err).context("Session aborted"),
    }

    let stats = session.stats().clone();
    println!("\n{}", stats);
    println!("  Elapsed: {}", format_duration(start.elapsed()));

    if let Some(path) = &args.stats {
        let json = serde_json::to_string_pretty(&stats)?;
        std::fs::write(path, json).context("Failed to write session stats")?;
        println!("Stats written to {:?}", path);
    }

    Ok(())
}
