//! Command line inspection of BUFR/CREX variable tables.
//!
//! Prints the table search path, dumps or queries tables, and runs unit
//! conversions through the same code used by the library.

mod report;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bufr_tables::tabledir::DEFAULT_TABLE_DIR;
use bufr_tables::{convert_units, Dialect, Tabledir, Vartable};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use report::{format_details, format_line, to_yaml, EntryRow};

#[derive(Parser, Debug)]
#[command(name = "table-info")]
#[command(about = "Inspect BUFR/CREX variable tables")]
struct Args {
    /// Table directory to search before the default one (repeatable)
    #[arg(long = "tables-dir", env = "WREPORT_TABLES")]
    tables_dir: Vec<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the table directories in search order
    Paths,

    /// List every entry of a table
    Dump {
        /// Read the CREX columns instead of the BUFR ones
        #[arg(long)]
        crex: bool,

        /// Print YAML instead of one line per entry
        #[arg(long)]
        yaml: bool,

        /// Table name (file stem) or path
        table: String,
    },

    /// Describe entries by code or alias
    Lookup {
        /// Read the CREX columns instead of the BUFR ones
        #[arg(long)]
        crex: bool,

        /// Table name (file stem) or path
        table: String,

        /// Codes (B12101) or aliases (t)
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Convert a value between two units
    Convert {
        from: String,
        to: String,
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Directories given on the command line go between the extra tables
/// directory and the compiled-in default.
fn build_tabledir(dirs: &[PathBuf]) -> Tabledir {
    if dirs.is_empty() {
        return Tabledir::with_default_directories();
    }

    let mut tabledir = Tabledir::new();
    if let Ok(extra) = env::var("WREPORT_EXTRA_TABLES") {
        tabledir.add_directory(extra);
    }
    for dir in dirs {
        tabledir.add_directory(dir);
    }
    tabledir.add_directory(DEFAULT_TABLE_DIR);
    tabledir
}

/// Load a table given as a path to a file, or as a name to look up.
fn open_table(tabledir: &Tabledir, table: &str, crex: bool) -> Result<Arc<Vartable>> {
    let dialect = if crex { Dialect::Crex } else { Dialect::Bufr };
    let path = Path::new(table);

    let loaded = if path.is_file() {
        debug!(path = ?path, dialect = %dialect, "Loading table file");
        Vartable::load(path, dialect)
    } else {
        Vartable::get_by_name_in(tabledir, table, dialect)
    };
    loaded.with_context(|| format!("Cannot open table {}", table))
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let tabledir = build_tabledir(&args.tables_dir);

    match args.command {
        Command::Paths => {
            for dir in tabledir.directories() {
                println!("{}", dir.display());
            }
        }
        Command::Dump { crex, yaml, table } => {
            let table = open_table(&tabledir, &table, crex)?;
            if yaml {
                let rows: Vec<EntryRow> = table.iter().map(|info| EntryRow::from(&**info)).collect();
                print!("{}", to_yaml(&rows)?);
            } else {
                println!("# {} ({}, {} entries)", table.path().display(), table.dialect(), table.len());
                for info in table.iter() {
                    println!("{}", format_line(info));
                }
            }
        }
        Command::Lookup { crex, table, names } => {
            let table = open_table(&tabledir, &table, crex)?;
            for name in &names {
                let info = table.lookup(name)?;
                print!("{}", format_details(&info));
            }
        }
        Command::Convert { from, to, value } => {
            let converted = convert_units(&from, &to, value)?;
            println!("{}", converted);
        }
    }

    Ok(())
}
