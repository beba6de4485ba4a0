//! CLI entrypoint for the gnl harness.
//!
//! With no arguments, runs the full suite from the current directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use gnl_harness::cases::suite_cases;
use gnl_harness::structured_log::{LogEmitter, default_run_id};
use gnl_harness::{CaseInput, CaseTable, HarnessConfig, HarnessError, SuiteRunner, TestCase};
use gnl_toolchain::MemcheckClassifier;

/// Build-matrix and leak-audit harness for a get_next_line library.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Rebuilds get_next_line per BUFFER_SIZE and audits each run under valgrind")]
struct Cli {
    #[command(flatten)]
    options: Options,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the suite (default).
    Run,
    /// Print the case list without running it.
    List {
        /// Print as a JSON case table instead of one line per case.
        #[arg(long)]
        json: bool,
    },
    /// Print the synthesized driver source.
    Driver,
}

#[derive(Debug, Args)]
struct Options {
    /// Directory holding get_next_line.c, get_next_line_utils.c and the header.
    #[arg(long, global = true)]
    library_dir: Option<PathBuf>,
    /// Directory holding the fixture files.
    #[arg(long, global = true)]
    fixture_dir: Option<PathBuf>,
    /// Directory receiving test_main.c, gnl_test and valgrind_output.txt.
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,
    /// C compiler program.
    #[arg(long, global = true)]
    cc: Option<String>,
    /// Memory auditor program.
    #[arg(long, global = true)]
    valgrind: Option<String>,
    /// Wall-clock bound for each audited execution.
    #[arg(long, global = true)]
    timeout_secs: Option<f64>,
    /// BUFFER_SIZE for cases that do not set one.
    #[arg(long, global = true, allow_negative_numbers = true)]
    default_buffer_size: Option<i64>,
    /// JSON case table replacing the standard cases.
    #[arg(long, global = true)]
    cases: Option<PathBuf>,
    /// Keep only cases whose name contains this text.
    #[arg(long, global = true)]
    only: Option<String>,
    /// Skip the BUFFER_SIZE sweep.
    #[arg(long, global = true)]
    no_sweep: bool,
    /// Structured JSONL log output path.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    /// Machine-readable suite report output path.
    #[arg(long, global = true)]
    report_json: Option<PathBuf>,
}

impl Options {
    fn apply(&self, mut config: HarnessConfig) -> Result<HarnessConfig, HarnessError> {
        if let Some(dir) = &self.library_dir {
            config.library_dir.clone_from(dir);
        }
        if let Some(dir) = &self.fixture_dir {
            config.fixture_dir.clone_from(dir);
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir.clone_from(dir);
        }
        if let Some(cc) = &self.cc {
            config.cc.clone_from(cc);
        }
        if let Some(valgrind) = &self.valgrind {
            config.valgrind.clone_from(valgrind);
        }
        if let Some(secs) = self.timeout_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(HarnessError::Config(format!(
                    "--timeout-secs must be a positive number, got {secs}"
                )));
            }
            config.timeout = Duration::from_secs_f64(secs);
        }
        if let Some(size) = self.default_buffer_size {
            config.default_buffer_size = size;
        }
        Ok(config)
    }

    fn cases(&self, config: &HarnessConfig) -> Result<Vec<TestCase>, HarnessError> {
        let table = self
            .cases
            .as_deref()
            .map(CaseTable::from_file)
            .transpose()?
            .map(|table| table.cases);
        Ok(suite_cases(
            config,
            table,
            !self.no_sweep,
            self.only.as_deref(),
        ))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("! {err}");
            if matches!(err, HarnessError::Precondition(_)) {
                eprintln!(
                    "Install valgrind ('apt-get install valgrind' on Linux) to run the leak checks."
                );
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), HarnessError> {
    let config = cli.options.apply(HarnessConfig::from_env())?;
    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => run_suite(&cli.options, &config),
        Command::List { json } => list_cases(&cli.options.cases(&config)?, *json),
        Command::Driver => {
            print!("{}", config.driver().render());
            Ok(())
        }
    }
}

fn run_suite(options: &Options, config: &HarnessConfig) -> Result<(), HarnessError> {
    if !config.work_dir.is_dir() {
        return Err(HarnessError::Config(format!(
            "work directory '{}' does not exist",
            config.work_dir.display()
        )));
    }
    let cases = options.cases(config)?;

    let mut runner = SuiteRunner::new(
        config.compiler(),
        config.sandbox(),
        MemcheckClassifier,
        config,
    );
    if let Some(path) = &options.log {
        let log = LogEmitter::to_file(path, "gnl", &default_run_id())
            .map_err(|err| io_error("failed to create structured log", path, err))?;
        runner = runner.with_log(log);
    }

    let version = runner.check_preconditions()?;
    eprintln!("Using {version}");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = runner.run(&cases, &mut out).map_err(|source| HarnessError::Io {
        context: "failed to write progress".to_string(),
        source,
    })?;
    let _ = out.flush();

    if let Some(path) = &options.report_json {
        let json = report
            .to_json()
            .map_err(|err| io_error("failed to encode report", path, err.into()))?;
        std::fs::write(path, json).map_err(|err| io_error("failed to write report", path, err))?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn list_cases(cases: &[TestCase], json: bool) -> Result<(), HarnessError> {
    if json {
        let table = CaseTable::new(cases.to_vec());
        let text = table
            .to_json()
            .map_err(|err| HarnessError::Config(format!("failed to encode case table: {err}")))?;
        println!("{text}");
        return Ok(());
    }
    for case in cases {
        let size = case
            .buffer_size
            .map_or_else(|| "default".to_string(), |n| n.to_string());
        let input = match &case.input {
            CaseInput::Fixture { path } => path.display().to_string(),
            CaseInput::Stdin { payload } => format!("stdin ({} bytes)", payload.len()),
            CaseInput::RevokedFixture { path } => {
                format!("{} (permissions revoked)", path.display())
            }
        };
        println!("{}\tBUFFER_SIZE={size}\t{input}", case.name);
    }
    Ok(())
}

fn io_error(action: &str, path: &Path, source: std::io::Error) -> HarnessError {
    HarnessError::Io {
        context: format!("{action} '{}'", path.display()),
        source,
    }
}
