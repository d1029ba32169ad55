//! # Cardsmith CLI
//!
//! Command-line host for the card layout editor core.
//!
//! ## Usage
//!
//! ```bash
//! cardsmith --template badge.json validate
//! cardsmith catalog --out-dir templates/
//! cardsmith --set name="Sam Lee" resolve
//! cardsmith --batch staff.json --row 2 resolve
//! cardsmith --background paper.jpg preview --out sheet.png
//! cardsmith layout --rows 5 --cols 2
//! cardsmith --page Letter preview --out sheet.png --card card.png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved configuration handed to the commands
//! - `commands::run` - Loads the editor state and executes one command
//! - `init_tracing` - `tracing-subscriber` setup shared with the tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod commands;

use std::path::PathBuf;

use card_core::PageSize;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for cardsmith.
#[derive(Debug, Clone, Parser)]
#[command(name = "cardsmith")]
#[command(about = "Card template layout, data binding and print-sheet tooling")]
#[command(version)]
pub struct CliArgs {
    /// Template file; the first built-in template when absent
    #[arg(long, global = true, env = "CARDSMITH_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Page used for sheet commands (A4, A3, Letter)
    #[arg(long, global = true, env = "CARDSMITH_PAGE", default_value = "A4")]
    pub page: String,

    /// Data record file: a JSON object of field name to value
    #[arg(long, global = true)]
    pub record: Option<PathBuf>,

    /// Batch rows file: a JSON array of records
    #[arg(long, global = true)]
    pub batch: Option<PathBuf>,

    /// Zero-based batch row to use as the active record
    #[arg(long, global = true, requires = "batch")]
    pub row: Option<usize>,

    /// Background image file, embedded into the template as a data URI
    #[arg(long, global = true)]
    pub background: Option<PathBuf>,

    /// Set one record field, as `field=value` (repeatable)
    #[arg(long = "set", global = true, value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Parse the template and print a summary
    Validate,
    /// Print the built-in templates as template files
    Catalog {
        /// Write one file per template into this directory instead
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print every element's bound properties resolved against the record
    Resolve,
    /// Print sheet tile positions for the template's card size
    Layout(SheetArgs),
    /// Render the card and compose a sheet preview PNG
    Preview {
        /// Sheet preview output path
        #[arg(long, short)]
        out: PathBuf,

        /// Also write the single card snapshot here
        #[arg(long)]
        card: Option<PathBuf>,

        /// Sheet layout
        #[command(flatten)]
        sheet: SheetArgs,
    },
}

/// Sheet form fields, taken as raw text like the editor form.
///
/// Non-numeric input counts as zero.
#[derive(Debug, Clone, Args)]
pub struct SheetArgs {
    /// Rows of cards
    #[arg(long, default_value = "4")]
    pub rows: String,

    /// Columns of cards
    #[arg(long, default_value = "2")]
    pub cols: String,

    /// Gap between cards in pixels
    #[arg(long, default_value = "30")]
    pub spacing: String,

    /// Page margin in pixels
    #[arg(long, default_value = "30")]
    pub margin: String,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected field=value, got {raw:?}"))
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Template file to load.
    pub template: Option<PathBuf>,
    /// Page for sheet commands.
    pub page: PageSize,
    /// Data record file.
    pub record: Option<PathBuf>,
    /// Batch rows file.
    pub batch: Option<PathBuf>,
    /// Batch row activated after the record file.
    pub row: Option<usize>,
    /// Background image file.
    pub background: Option<PathBuf>,
    /// Field overrides applied after the record file and batch row.
    pub overrides: Vec<(String, String)>,
    /// Command to run.
    pub command: Command,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            template: args.template,
            page: PageSize::from_name(&args.page),
            record: args.record,
            batch: args.batch,
            row: args.row,
            background: args.background,
            overrides: args.set,
            command: args.command,
        }
    }
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,card_core=debug,card_renderer=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,card_core=debug,card_renderer=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("name=Sam Lee"),
            Ok(("name".to_string(), "Sam Lee".to_string()))
        );
        assert_eq!(
            parse_assignment("qrPayload=a=b"),
            Ok(("qrPayload".to_string(), "a=b".to_string()))
        );
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_args_into_config() {
        let args = CliArgs::parse_from([
            "cardsmith",
            "--page",
            "Letter",
            "--set",
            "role=Staff",
            "layout",
            "--rows",
            "3",
        ]);
        let config = CliConfig::from(args);
        assert_eq!(config.page, PageSize::Letter);
        assert_eq!(config.overrides, vec![("role".to_string(), "Staff".to_string())]);
        match config.command {
            Command::Layout(sheet) => {
                assert_eq!(sheet.rows, "3");
                assert_eq!(sheet.cols, "2");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_batch_row_requires_batch_file() {
        assert!(CliArgs::try_parse_from(["cardsmith", "--row", "1", "resolve"]).is_err());

        let args = CliArgs::parse_from([
            "cardsmith",
            "--batch",
            "staff.json",
            "--row",
            "1",
            "--background",
            "paper.png",
            "resolve",
        ]);
        let config = CliConfig::from(args);
        assert_eq!(config.batch, Some(PathBuf::from("staff.json")));
        assert_eq!(config.row, Some(1));
        assert_eq!(config.background, Some(PathBuf::from("paper.png")));
    }

    #[test]
    fn test_unknown_page_falls_back_to_a4() {
        let args = CliArgs::parse_from(["cardsmith", "--page", "B5", "validate"]);
        assert_eq!(CliConfig::from(args).page, PageSize::A4);
    }
}
