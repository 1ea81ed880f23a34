//! `tabdiff compare` and `tabdiff run`: load both files, validate the
//! mapping against their headers, reconcile on a worker thread, emit.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tabdiff_config::{MappingStore, SavedMapping, Settings};
use tabdiff_recon::config::OutputConfig;
use tabdiff_recon::{
    CancelToken, ColumnPair, Dataset, OutputFormat, ReconConfig, ReconMode, ReconReport,
    ReconRequest, ResultTable, RunHooks, UnionOrder,
};

use crate::exit_codes::{EXIT_DIFFERENCES, EXIT_INTERNAL};
use crate::util::render_table;
use crate::CliError;

/// How long the host waits on the progress channel before rechecking the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct CompareArgs {
    pub a: PathBuf,
    pub b: PathBuf,
    pub key_a: Option<String>,
    pub key_b: Option<String>,
    pub mapping: Vec<ColumnPair>,
    pub mode: ReconMode,
    pub order: UnionOrder,
    pub save: bool,
    pub run: RunOptions,
}

#[derive(Debug, Default)]
pub struct RunOptions {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub preview: Option<usize>,
    pub timeout: Option<Duration>,
    pub strict_exit: bool,
    pub quiet: bool,
}

/// Where and how the report goes.
#[derive(Debug, PartialEq)]
struct Target {
    format: OutputFormat,
    path: Option<PathBuf>,
    preview: Option<usize>,
}

struct Loaded {
    a: Dataset,
    b: Dataset,
    settings: Settings,
}

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let (key_a, key_b, mapping) = if args.mapping.is_empty() {
        let store = MappingStore::open().map_err(CliError::config)?;
        let saved = store
            .load()
            .map_err(CliError::config)?
            .ok_or_else(|| {
                CliError::args("no column mapping given and none saved")
                    .with_hint("pass --map COL_A=COL_B (it is remembered for later runs)")
            })?;
        debug!("using saved mapping from {}", store.path().display());
        (
            args.key_a.unwrap_or(saved.primary_key_a),
            args.key_b.unwrap_or(saved.primary_key_b),
            saved.mapping,
        )
    } else {
        (
            args.key_a.unwrap_or_default(),
            args.key_b.unwrap_or_default(),
            args.mapping,
        )
    };

    let mut config = ReconConfig::from_parts(args.a, args.b, key_a, key_b, mapping);
    config.mode = args.mode;
    config.order = args.order;

    if let Err(e) = config.validate() {
        let missing_key =
            config.sources.a.key.trim().is_empty() || config.sources.b.key.trim().is_empty();
        let err = CliError::recon(e);
        return Err(if missing_key {
            err.with_hint("pass --key, or --key-a and --key-b")
        } else {
            err
        });
    }

    let target = resolve_target(&args.run, &config.output)?;
    let loaded = load_inputs(&config)?;
    if args.save {
        save_mapping(&config);
    }
    reconcile(&config, loaded, &target, &args.run)
}

pub fn cmd_run(job: PathBuf, opts: RunOptions) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&job)
        .map_err(|e| CliError::io(format!("cannot read job {}: {e}", job.display())))?;
    let mut config = ReconConfig::from_toml(&text).map_err(CliError::recon)?;

    // Resolve file paths relative to the job file's directory
    let base_dir = job.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);

    let target = resolve_target(&opts, &config.output)?;
    let loaded = load_inputs(&config)?;
    reconcile(&config, loaded, &target, &opts)
}

/// Flags win over the job's `[output]` table; the format falls back to
/// the output file's extension, then to the table preview.
fn resolve_target(opts: &RunOptions, output: &OutputConfig) -> Result<Target, CliError> {
    let path = opts.output.clone().or_else(|| output.path.clone());
    let format = opts
        .format
        .or(output.format)
        .or_else(|| path.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or_default();

    if format.is_binary() && path.is_none() {
        return Err(CliError::args(format!("{} output cannot be written to stdout", format))
            .with_hint("pass --output FILE"));
    }

    Ok(Target {
        format,
        path,
        preview: opts.preview.or(output.preview),
    })
}

pub(crate) fn load_settings() -> Settings {
    match tabdiff_config::config_dir() {
        Ok(dir) => Settings::load_from(&dir),
        Err(e) => {
            warn!("{}; using default settings", e);
            Settings::default()
        }
    }
}

fn load_inputs(config: &ReconConfig) -> Result<Loaded, CliError> {
    let settings = load_settings();
    let a = tabdiff_io::load(&config.sources.a.file, settings.max_file_bytes)
        .map_err(CliError::file)?;
    let b = tabdiff_io::load(&config.sources.b.file, settings.max_file_bytes)
        .map_err(CliError::file)?;
    debug!("loaded {} rows from A, {} rows from B", a.len(), b.len());

    config
        .check_headers(&a.headers, &b.headers)
        .map_err(CliError::recon)?;
    Ok(Loaded { a, b, settings })
}

/// Remember a validated mapping. Failure only costs the convenience.
fn save_mapping(config: &ReconConfig) {
    let saved = SavedMapping {
        primary_key_a: config.sources.a.key.clone(),
        primary_key_b: config.sources.b.key.clone(),
        mapping: config.mapping.clone(),
    };
    if let Err(e) = MappingStore::open().and_then(|store| store.save(&saved)) {
        warn!("could not save mapping: {}", e);
    }
}

fn reconcile(
    config: &ReconConfig,
    loaded: Loaded,
    target: &Target,
    opts: &RunOptions,
) -> Result<(), CliError> {
    let Loaded { a, b, settings } = loaded;
    let stderr_tty = atty::is(atty::Stream::Stderr);
    let show_progress = !opts.quiet && settings.progress && stderr_tty;

    let token = CancelToken::new();
    let report = run_in_background(
        config.to_request(),
        a,
        b,
        &token,
        opts.timeout,
        show_progress,
    )?;

    emit(&report, target, settings.preview_rows, opts.quiet)?;
    if !opts.quiet {
        print_summary(&report);
    }

    let differs = match report.meta.mode {
        ReconMode::Structural => report.has_differences(),
        ReconMode::Delta | ReconMode::Subtract => opts.strict_exit && report.has_differences(),
    };
    if differs {
        return Err(CliError::silent(EXIT_DIFFERENCES));
    }
    Ok(())
}

/// Run the engine on a worker thread. Progress arrives over a channel;
/// `token` is cancelled once `timeout` elapses.
fn run_in_background(
    request: ReconRequest,
    a: Dataset,
    b: Dataset,
    token: &CancelToken,
    timeout: Option<Duration>,
    show_progress: bool,
) -> Result<ReconReport, CliError> {
    let (tx, rx) = mpsc::channel::<u8>();
    let worker_token = token.clone();
    let worker = thread::spawn(move || {
        let mut hooks = RunHooks::new()
            .on_progress(move |pct| {
                // The host may have stopped listening; the run goes on
                let _ = tx.send(pct);
            })
            .with_cancel(worker_token);
        tabdiff_recon::run(&request, &a, &b, &mut hooks)
    });

    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(pct) => {
                if show_progress {
                    draw_progress(pct);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if !token.is_cancelled() && deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("timeout reached; cancelling reconciliation");
            token.cancel();
        }
    }
    if show_progress {
        eprintln!();
    }

    let outcome = worker.join().map_err(|_| CliError {
        code: EXIT_INTERNAL,
        message: "reconciliation worker panicked".to_string(),
        hint: None,
    })?;
    outcome.into_result().map_err(CliError::recon)
}

fn draw_progress(pct: u8) {
    let mut stderr = io::stderr();
    let _ = write!(stderr, "\rreconciling {:>3}%", pct);
    let _ = stderr.flush();
}

fn emit(
    report: &ReconReport,
    target: &Target,
    default_preview: usize,
    quiet: bool,
) -> Result<(), CliError> {
    if let Some(path) = &target.path {
        tabdiff_io::export(report, target.format, path).map_err(CliError::file)?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
        return Ok(());
    }

    let bytes = match target.format {
        OutputFormat::Table => {
            let table = ResultTable::from_report(report);
            let rows = target.preview.unwrap_or(default_preview);
            if table.len() > rows && !quiet {
                eprintln!("showing {} of {} rows", rows, table.len());
            }
            render_table(&table.head(rows)).into_bytes()
        }
        OutputFormat::Json => tabdiff_io::json::to_bytes(report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?,
        OutputFormat::Csv => tabdiff_io::csv::to_bytes(&ResultTable::from_report(report))
            .map_err(|e| CliError::io(format!("CSV serialization error: {e}")))?,
        OutputFormat::Xlsx => {
            return Err(CliError::args("xlsx output cannot be written to stdout"));
        }
    };

    io::stdout()
        .write_all(&bytes)
        .map_err(|e| CliError::io(format!("cannot write to stdout: {e}")))
}

fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    eprintln!(
        "{}: {} rows in A, {} rows in B",
        report.meta.mode, s.rows_a, s.rows_b
    );
    eprintln!(
        "  keys:        {} ({} matched, {} only in A, {} only in B)",
        s.keys_walked, s.matched, s.only_a, s.only_b
    );
    eprintln!(
        "  differences: {} keys, {} result rows",
        s.keys_with_differences, s.result_rows
    );
}
