mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use excel_checker::{ConfigError, DiffError, LimitBehavior, LoadError};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EXCEL_CHECKER_LOG";

#[derive(Parser)]
#[command(name = "excel-checker")]
#[command(about = "Compare Excel workbooks cell by cell and show differences")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Compare two workbooks")]
    Diff(DiffArgs),
    #[command(about = "Show information about a workbook")]
    Info {
        #[arg(help = "Path to the workbook (.xlsx, .xlsm or .csv)")]
        path: String,
    },
}

#[derive(clap::Args)]
pub struct DiffArgs {
    #[arg(help = "Path to the old/base workbook")]
    pub old: String,
    #[arg(help = "Path to the new/changed workbook")]
    pub new: String,
    #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
    pub format: OutputFormat,
    #[arg(long, help = "Use fastest preset (smaller alignment bound, positional fallback)")]
    pub fast: bool,
    #[arg(long, help = "Use most precise preset (stricter similarity, larger bound)")]
    pub precise: bool,
    #[arg(long, value_name = "FILE", help = "Read a JSON diff configuration; flags override it")]
    pub config: Option<String>,
    #[arg(long, help = "Key columns (comma-separated letters or zero-based numbers, e.g. A,C)")]
    pub keys: Option<String>,
    #[arg(long, value_name = "F", help = "Row/column similarity threshold in [0, 1]")]
    pub similarity: Option<f64>,
    #[arg(long, value_name = "N", help = "Largest alignment table allowed (rows x rows)")]
    pub max_align_cells: Option<u64>,
    #[arg(long, value_enum, help = "What to do when a sheet exceeds the alignment bound")]
    pub on_limit: Option<LimitArg>,
    #[arg(long = "skip-sheet", value_name = "NAME", help = "Ignore sheets whose names contain this text (repeatable)")]
    pub skip_sheets: Vec<String>,
    #[arg(long = "skip-cell", value_name = "REGEX", help = "Treat text cells starting with a match of this pattern as empty (repeatable)")]
    pub skip_cells: Vec<String>,
    #[arg(long, help = "Ignore whitespace and full-width differences in text")]
    pub normalize_text: bool,
    #[arg(long, value_name = "NAME", requires = "against_sheet", help = "Sheet of OLD to compare")]
    pub sheet: Option<String>,
    #[arg(long, value_name = "NAME", requires = "sheet", help = "Sheet of NEW to compare against --sheet")]
    pub against_sheet: Option<String>,
    #[arg(long, short, help = "Quiet mode: only show summary")]
    pub quiet: bool,
    #[arg(long, short, help = "Verbose mode: show additional details")]
    pub verbose: bool,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    Text,
    Json,
    Jsonl,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug)]
pub enum LimitArg {
    Error,
    Positional,
    Keyed,
}

impl From<LimitArg> for LimitBehavior {
    fn from(arg: LimitArg) -> Self {
        match arg {
            LimitArg::Error => LimitBehavior::ReturnError,
            LimitArg::Positional => LimitBehavior::FallbackToPositional,
            LimitArg::Keyed => LimitBehavior::FallbackToKeyed,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::run(&args),
        Commands::Info { path } => commands::info::run(&path),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_user_error(err) {
        ExitCode::from(2)
    } else {
        ExitCode::from(3)
    }
}

/// Bad input the user can fix. Anything else, such as a failed write to
/// stdout, is reported as internal.
fn is_user_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(diff_err) = cause.downcast_ref::<DiffError>() {
            return !matches!(diff_err, DiffError::SinkError { .. });
        }
        cause.is::<LoadError>()
            || cause.is::<ConfigError>()
            || cause.is::<commands::diff::UsageError>()
    })
}
