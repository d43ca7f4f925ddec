//! Salesboard CLI - Command-line interface for salesboard
//!
//! Commands:
//! - update: Convert the sales workbook into the dashboard feed
//! - deploy: Convert, then commit and push the feed
//! - sheets: List the sheets of a workbook
//! - dump: Write a sheet's raw rows as JSON
//! - config: Print the default configuration

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use salesboard::encoder::encode_raw_rows;
use salesboard::loader;
use salesboard::publish::GitPublisher;
use salesboard::{
    ReportConfig, ReportError, ReportOutcome, ReportProcessor, SheetSelection, DEFAULT_OUTPUT,
    DEFAULT_PAGE, DEFAULT_SOURCE, SALESBOARD_VERSION,
};

/// Salesboard - sales workbook to dashboard feed converter
#[derive(Parser)]
#[command(name = "salesboard")]
#[command(version = SALESBOARD_VERSION)]
#[command(about = "Convert a sales workbook into the dashboard JSON feed", long_about = None)]
struct Cli {
    /// Log pipeline details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the sales workbook into the dashboard feed
    Update(ConvertArgs),

    /// Convert, then commit and push the feed and dashboard page
    Deploy {
        #[command(flatten)]
        convert: ConvertArgs,

        /// Dashboard page committed with the feed
        #[arg(long, default_value = DEFAULT_PAGE)]
        page: PathBuf,

        /// Repository directory
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Commit without pushing
        #[arg(long)]
        no_push: bool,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook path
        #[arg(default_value = DEFAULT_SOURCE)]
        source: PathBuf,
    },

    /// Write a sheet's raw rows as JSON records
    Dump {
        /// Workbook path
        #[arg(default_value = DEFAULT_SOURCE)]
        source: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Sheet to dump (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Row (0-based) holding the column names
        #[arg(long)]
        header_row: Option<usize>,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Args)]
struct ConvertArgs {
    /// Workbook path
    #[arg(default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Feed output path
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Sheet to convert (defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Read every sheet before converting the selected one
    #[arg(long)]
    all_sheets: bool,

    /// Row (0-based) holding the column names
    #[arg(long)]
    header_row: Option<usize>,

    /// Configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "salesboard=debug" } else { "salesboard=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), SalesCliError> {
    match cli.command {
        Commands::Update(args) => cmd_update(&args).map(|_| ()),

        Commands::Deploy {
            convert,
            page,
            repo,
            no_push,
        } => cmd_deploy(&convert, page, &repo, no_push),

        Commands::Sheets { source } => cmd_sheets(&source),

        Commands::Dump {
            source,
            output,
            sheet,
            header_row,
            config,
        } => cmd_dump(&source, &output, sheet, header_row, config.as_deref()),

        Commands::Config => {
            println!("{}", ReportConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, header_row: Option<usize>) -> Result<ReportConfig, SalesCliError> {
    let mut config = match path {
        Some(path) => ReportConfig::from_json(&fs::read_to_string(path)?)?,
        None => ReportConfig::default(),
    };
    if let Some(row) = header_row {
        config.header_row = row;
    }
    Ok(config)
}

fn cmd_update(args: &ConvertArgs) -> Result<ReportOutcome, SalesCliError> {
    let config = load_config(args.config.as_deref(), args.header_row)?;
    let processor = ReportProcessor::new(config);
    let selection = SheetSelection::from_name(args.sheet.clone());

    let outcome = processor.convert(&args.source, &args.output, &selection, args.all_sheets)?;

    println!(
        "Updated {} with {} sellers from sheet '{}':",
        args.output.display(),
        outcome.report.sellers().len(),
        outcome.sheet_name
    );
    for seller in outcome.report.sellers() {
        println!("  - {}", seller.name);
    }
    if !outcome.cell_failures.is_empty() {
        println!(
            "{} cells could not be read as numbers and were set to 0",
            outcome.cell_failures.len()
        );
    }

    Ok(outcome)
}

fn cmd_deploy(
    convert: &ConvertArgs,
    page: PathBuf,
    repo: &Path,
    no_push: bool,
) -> Result<(), SalesCliError> {
    cmd_update(convert)?;

    let mut publisher = GitPublisher::new(repo, vec![convert.output.clone(), page]);
    if no_push {
        publisher = publisher.without_push();
    }

    let summary = publisher.publish()?;
    if summary.committed {
        println!("Committed: {}", summary.message);
    } else {
        println!("No changes to commit");
    }
    if summary.pushed {
        println!("Pushed to remote");
    }
    Ok(())
}

fn cmd_sheets(source: &Path) -> Result<(), SalesCliError> {
    for name in loader::sheet_names(source)? {
        println!("{name}");
    }
    Ok(())
}

fn cmd_dump(
    source: &Path,
    output: &Path,
    sheet: Option<String>,
    header_row: Option<usize>,
    config: Option<&Path>,
) -> Result<(), SalesCliError> {
    let config = load_config(config, header_row)?;
    let workbook = ReportProcessor::new(config).loader().load_all(source)?;
    let table = workbook.select(&SheetSelection::from_name(sheet))?;
    let json = serde_json::to_string_pretty(&encode_raw_rows(table))?;

    if output.to_string_lossy() == "-" {
        println!("{json}");
    } else {
        fs::write(output, json)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum SalesCliError {
    Io(io::Error),
    Report(ReportError),
    Json(serde_json::Error),
}

impl From<io::Error> for SalesCliError {
    fn from(e: io::Error) -> Self {
        SalesCliError::Io(e)
    }
}

impl From<ReportError> for SalesCliError {
    fn from(e: ReportError) -> Self {
        SalesCliError::Report(e)
    }
}

impl From<serde_json::Error> for SalesCliError {
    fn from(e: serde_json::Error) -> Self {
        SalesCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SalesCliError> for CliError {
    fn from(e: SalesCliError) -> Self {
        match e {
            SalesCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SalesCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            SalesCliError::Report(e) => {
                let (code, hint) = match &e {
                    ReportError::SourceNotFound(_) => (
                        "SOURCE_NOT_FOUND",
                        Some("Place the workbook in this folder or pass its path"),
                    ),
                    ReportError::SchemaMismatch { .. } => (
                        "SCHEMA_MISMATCH",
                        Some("Column names must be on the header row (--header-row)"),
                    ),
                    ReportError::SheetNotFound { .. } => {
                        ("SHEET_NOT_FOUND", Some("Run 'salesboard sheets' to list sheets"))
                    }
                    ReportError::EmptySheet(_) => ("EMPTY_SHEET", None),
                    ReportError::Workbook(_) => {
                        ("WORKBOOK_ERROR", Some("Ensure the file is an xlsx, xls or ods workbook"))
                    }
                    ReportError::WriteError { .. } => {
                        ("WRITE_ERROR", Some("Check that the output folder exists and is writable"))
                    }
                    ReportError::Json(_) => ("JSON_ERROR", None),
                    ReportError::Config(_) => {
                        ("CONFIG_ERROR", Some("Run 'salesboard config' for a valid template"))
                    }
                    ReportError::Publish { .. } => (
                        "PUBLISH_ERROR",
                        Some("Check git user.name/user.email, the remote and credentials"),
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}
