// tabdiff CLI - reconcile two tabular files by key

mod compare;
mod exit_codes;
mod mapping;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabdiff_config::ConfigError;
use tabdiff_io::IoError;
use tabdiff_recon::{ColumnPair, OutputFormat, ReconError, ReconMode, UnionOrder};

use exit_codes::{
    EXIT_ABORTED, EXIT_INVALID_MAPPING, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};
use mapping::MappingCommands;

/// Environment variable holding the log filter (`tracing-subscriber` syntax).
const LOG_ENV: &str = "TABDIFF_LOG";

#[derive(Parser)]
#[command(name = "tabdiff")]
#[command(about = "Reconcile two CSV/XLSX files by key: field diffs or numeric deltas")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Debug logging on stderr (overridden by TABDIFF_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two files under a column mapping
    #[command(after_help = "\
Examples:
  tabdiff compare a.csv b.csv --key id --map qty=quantity
  tabdiff compare a.csv b.xlsx --key-a sku --key-b item --map qty=quantity --map price
  tabdiff compare a.csv b.csv --key id --map qty --mode delta --out json
  tabdiff compare a.csv b.csv --mode subtract --out xlsx --output result.xlsx
  tabdiff compare a.csv b.csv            # reuses the last saved mapping

Exit codes:
  0  no differences (delta/subtract: unless --strict-exit)
  1  differences found
  2  usage error    3  I/O error    4  invalid mapping
  5  parse error    6  aborted (--timeout)")]
    Compare {
        /// Dataset A (.csv or .xlsx)
        a: PathBuf,

        /// Dataset B (.csv or .xlsx)
        b: PathBuf,

        /// Primary key column, same name on both sides
        #[arg(long, value_name = "COL")]
        key: Option<String>,

        /// Primary key column of A (overrides --key)
        #[arg(long, value_name = "COL")]
        key_a: Option<String>,

        /// Primary key column of B (overrides --key)
        #[arg(long, value_name = "COL")]
        key_b: Option<String>,

        /// Column mapping entry, A=B or a name present on both sides. Repeatable.
        /// Omit to reuse the saved mapping.
        #[arg(long = "map", value_name = "A=B")]
        map: Vec<ColumnPair>,

        /// Reconciliation mode
        #[arg(long, value_enum, default_value = "structural")]
        mode: ModeArg,

        /// Key order of delta results
        #[arg(long, value_enum, default_value = "sorted")]
        order: OrderArg,

        /// Do not remember this mapping for later runs
        #[arg(long)]
        no_save: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run a reconciliation job from a TOML file
    #[command(after_help = "\
Examples:
  tabdiff run inventory.toml
  tabdiff run inventory.toml --out json --output result.json

Relative file paths in the job are resolved against the job file's directory.")]
    Run {
        /// Path to the job file
        job: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List the columns of a file available for mapping
    #[command(after_help = "\
Examples:
  tabdiff columns a.csv
  tabdiff columns a.csv --exclude id --filter amo
  tabdiff columns b.xlsx --json")]
    Columns {
        /// File to inspect (.csv or .xlsx)
        file: PathBuf,

        /// Column to leave out (usually the primary key)
        #[arg(long, value_name = "COL")]
        exclude: Option<String>,

        /// Case-insensitive substring filter
        #[arg(long, value_name = "TERM", default_value = "")]
        filter: String,

        /// Print a JSON array instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Show or clear the saved mapping
    #[command(subcommand)]
    Mapping(MappingCommands),
}

/// Output and execution flags shared by `compare` and `run`.
#[derive(Args)]
struct RunArgs {
    /// Output format (default: table, or inferred from --output)
    #[arg(long, alias = "format", value_enum)]
    out: Option<OutArg>,

    /// Output file (default: stdout). Required for xlsx.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Rows shown by the table preview (default from settings)
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Exit 1 when delta or subtract results show any difference
    #[arg(long)]
    strict_exit: bool,

    /// Quiet mode - suppress stderr summary and progress
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Field-level mismatches, one row per differing mapped column
    Structural,
    /// Numeric A - B per mapped column, one row per key
    Delta,
    /// A - B of the first mapped column, A keys only
    Subtract,
}

impl From<ModeArg> for ReconMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Structural => ReconMode::Structural,
            ModeArg::Delta => ReconMode::Delta,
            ModeArg::Subtract => ReconMode::Subtract,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    /// Numeric keys by value, then text keys
    Sorted,
    /// A keys in file order, then B-only keys
    FirstSeen,
}

impl From<OrderArg> for UnionOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Sorted => UnionOrder::Sorted,
            OrderArg::FirstSeen => UnionOrder::FirstSeen,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutArg {
    Table,
    Json,
    Csv,
    Xlsx,
}

impl From<OutArg> for OutputFormat {
    fn from(out: OutArg) -> Self {
        match out {
            OutArg::Table => OutputFormat::Table,
            OutArg::Json => OutputFormat::Json,
            OutArg::Csv => OutputFormat::Csv,
            OutArg::Xlsx => OutputFormat::Xlsx,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
        "\ncontract_version(json): 1",
    )
}

/// Install the stderr log sink. `log` records from the library crates are
/// bridged through `tracing-log`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: tabdiff <command> [options]");
            eprintln!("       tabdiff --help for more information");
            Ok(())
        }
        Some(Commands::Compare {
            a,
            b,
            key,
            key_a,
            key_b,
            map,
            mode,
            order,
            no_save,
            run,
        }) => compare::cmd_compare(compare::CompareArgs {
            a,
            b,
            key_a: key_a.or_else(|| key.clone()),
            key_b: key_b.or(key),
            mapping: map,
            mode: mode.into(),
            order: order.into(),
            save: !no_save,
            run: run.into(),
        }),
        Some(Commands::Run { job, run }) => compare::cmd_run(job, run.into()),
        Some(Commands::Columns { file, exclude, filter, json }) => {
            mapping::cmd_columns(file, exclude, filter, json)
        }
        Some(Commands::Mapping(command)) => mapping::cmd_mapping(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

impl From<RunArgs> for compare::RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            format: args.out.map(OutputFormat::from),
            output: args.output,
            preview: args.preview,
            timeout: args.timeout.map(std::time::Duration::from_secs),
            strict_exit: args.strict_exit,
            quiet: args.quiet,
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Exit with `code` and nothing printed.
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Map an engine or job error to its exit code.
    pub fn recon(err: ReconError) -> Self {
        let message = err.to_string();
        match err {
            ReconError::ConfigParse(_) => Self::parse(message),
            ReconError::InvalidColumnPair(_) => {
                Self::args(message).with_hint("use --map COL_A=COL_B")
            }
            ReconError::UnknownColumn { side, .. } => {
                Self { code: EXIT_INVALID_MAPPING, message, hint: None }.with_hint(format!(
                    "run `tabdiff columns` on file {} to list its columns",
                    side
                ))
            }
            ReconError::ConfigValidation(_) | ReconError::MappedPrimaryKey { .. } => {
                Self { code: EXIT_INVALID_MAPPING, message, hint: None }
            }
            ReconError::Aborted { .. } => Self { code: EXIT_ABORTED, message, hint: None }
                .with_hint("raise --timeout; no output was written"),
        }
    }

    /// Map a load or export error to its exit code.
    pub fn file(err: IoError) -> Self {
        let message = err.to_string();
        match err {
            IoError::UnsupportedFormat { .. } => {
                Self::args(message).with_hint("only .csv and .xlsx files are accepted")
            }
            IoError::TooLarge { .. } => {
                Self::io(message).with_hint("raise \"file.maxBytes\" in settings.json")
            }
            IoError::Csv { .. } | IoError::Xlsx { .. } => Self::parse(message),
            IoError::Read { .. } | IoError::Write { .. } => Self::io(message),
        }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::io(err.to_string())
    }
}
