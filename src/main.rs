mod btree;
mod cursor;
mod diagnostics;
mod errors;
mod node;
mod pager;
mod page;
mod repl;
mod row;
mod statement;
mod table;

use clap::Parser;
use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use errors::Error;
use table::Table;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mysqlite", version = VERSION, about = "Tiny key-ordered table store.")]
struct Cli {
    /// Path to the single-file database.
    #[arg(long, default_value = "sqlite.db")]
    db: String,

    /// Path to the log file.
    #[arg(long, default_value = "mysqlite.log")]
    log_file: String,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
        .expect("failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose))),
        )
        .init();

    match run(&cli.db) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::Interrupted => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: &str) -> Result<(), Error> {
    let table = Table::open(db_path)?;
    let stdin = io::stdin();
    repl::run(table, stdin.lock(), io::stdout())
}
