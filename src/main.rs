//! Thicket - search indexing and snippet highlighting
//!
//! CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use thicket::config::Config;
use thicket::error::exit_codes;
use thicket::storage::FileBlobStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// Thicket - search indexing and snippet highlighting
#[derive(Parser)]
#[command(name = "thicket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert documents from a JSON file (one object or an array)
    Index {
        /// Path to the JSON document file
        file: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Remove a document by id
    Delete {
        /// Document id
        id: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Search indexed documents
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Maximum number of results (at most 25)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("thicket error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { file, json, quiet } => run_index(&file, json, quiet),
        Commands::Delete { id, json, quiet } => run_delete(&id, json, quiet),
        Commands::Search {
            query,
            json,
            quiet,
            limit,
        } => run_search(&query, json, quiet, limit),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

/// Print formatted output unless it is empty.
fn emit(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_index(file: &Path, json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use thicket::cli::index_cmd::{IndexCommand, IndexOptions};

    let config = Config::load();
    let store = FileBlobStore::from_config(&config)?;

    let mut cmd = IndexCommand::new(store, config);
    let options = IndexOptions { json, quiet };

    let output = cmd.run(file);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_delete(id: &str, json: bool, quiet: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use thicket::cli::delete::{DeleteCommand, DeleteOptions};

    let config = Config::load();
    let store = FileBlobStore::from_config(&config)?;

    let mut cmd = DeleteCommand::new(store, config);
    let options = DeleteOptions { json, quiet };

    let output = cmd.run(id);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_search(
    query: &str,
    json: bool,
    quiet: bool,
    limit: Option<usize>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use thicket::cli::search::{SearchCommand, SearchOptions};

    let config = Config::load();
    let store = FileBlobStore::from_config(&config)?;

    let mut cmd = SearchCommand::new(store, config);
    let options = SearchOptions { json, quiet, limit };

    let output = cmd.run(query, &options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
