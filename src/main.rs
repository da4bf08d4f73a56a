//! mdu - parallel disk usage calculator.
//!
//! Usage:
//!   mdu [PATH]...             Print allocated 512-byte blocks per path
//!   mdu -j 8 [PATH]...        Use 8 worker threads per path
//!   mdu --format json PATH    Emit one JSON report per path
//!   mdu --help                Show help

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use mdu_scan::{DiskUsage, DiskUsageScanner};

const PROGRAM: &str = "mdu";

#[derive(Parser)]
#[command(
    name = "mdu",
    version,
    about = "Summarize disk usage of each PATH, in parallel",
    long_about = "mdu reports the storage allocated to each PATH and everything beneath it,\n\
                  as a count of 512-byte blocks, using a pool of worker threads per path."
)]
struct Cli {
    /// Number of worker threads per path (at least 1)
    #[arg(short = 'j', long = "jobs", default_value = "1", value_parser = parse_jobs)]
    jobs: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log traversal details to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Paths to measure (defaults to the current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let scanner = DiskUsageScanner::new().with_warning_handler(|warning| {
        let line = diagnostic_line(warning.kind.action(), &warning.path, &warning.message);
        // Nowhere left to report a failing stderr.
        let _ = io::stderr().lock().write_all(&line);
    });

    let mut unencodable = false;
    let status = scanner.scan_all(&cli.paths, cli.jobs, |usage| {
        unencodable |= !report(usage, cli.format)?;
        Ok::<_, color_eyre::Report>(())
    })?;

    Ok(if status.is_success() && !unencodable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print one path's result. Returns `false` if the report could not be
/// encoded in the requested format.
fn report(usage: &DiskUsage, format: OutputFormat) -> Result<bool> {
    let line = match format {
        OutputFormat::Text => result_line(usage),
        OutputFormat::Json => match serde_json::to_string(usage) {
            Ok(json) => format!("{json}\n").into_bytes(),
            Err(err) => {
                let reason = err.to_string();
                let line = diagnostic_line("cannot encode report for", &usage.path, &reason);
                io::stderr().lock().write_all(&line)?;
                return Ok(false);
            }
        },
    };
    io::stdout().lock().write_all(&line)?;
    Ok(true)
}

/// `<blocks>\t<path as given>\n`
fn result_line(usage: &DiskUsage) -> Vec<u8> {
    let mut line = format!("{}\t", usage.blocks()).into_bytes();
    line.extend_from_slice(&path_bytes(&usage.path));
    line.push(b'\n');
    line
}

/// `mdu: <action> '<path>': <reason>\n`
fn diagnostic_line(action: &str, path: &Path, reason: &str) -> Vec<u8> {
    let mut line = format!("{PROGRAM}: {action} '").into_bytes();
    line.extend_from_slice(&path_bytes(path));
    line.extend_from_slice(format!("': {reason}\n").as_bytes());
    line
}

/// The path's bytes exactly as the OS handed them over.
#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path.display().to_string().into_bytes())
}

/// Parse the `-j` worker count.
fn parse_jobs(s: &str) -> std::result::Result<usize, String> {
    match s.trim().parse::<i64>() {
        Ok(n) if n >= 1 => usize::try_from(n).map_err(|e| e.to_string()),
        Ok(_) => Err(format!("Invalid number of threads: {s}")),
        Err(e) => Err(format!("Invalid number of threads: {s} ({e})")),
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins unless `-v` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mdu=debug,mdu_scan=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
