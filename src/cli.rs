// Command-line front end for the DVPL converter.
//
// Thin layer over `batch::process` and `codec::inspect`: parses arguments,
// sets up logging, renders per-file results and an optional JSON summary.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::batch::{self, BatchReport, Direction, FileOutcome, ProcessConfig};
use crate::codec::decoder;
use crate::codec::encoder::EncodeOptions;
use crate::format::{DVPL_SUFFIX, FOOTER_SIZE, MAGIC};

const DEFAULT_PATH: &str = ".";

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// DVPL container converter.
#[derive(Parser, Debug)]
#[command(
    name = "dvpl",
    version,
    about = "Convert files to and from DVPL containers",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output a JSON summary to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Pack files into `.dvpl` containers.
    Compress(CompressArgs),
    /// Unpack `.dvpl` containers.
    Decompress(ConvertArgs),
    /// Print the footer of a DVPL file.
    Info(InfoArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// File or directory to process (default: current directory).
    #[arg(long, value_hint = ValueHint::AnyPath, conflicts_with = "path_pos")]
    path: Option<PathBuf>,

    /// Keep source files after conversion.
    #[arg(short = 'k', long = "keep-originals")]
    keep_originals: bool,

    /// Check/compute only (do not write or delete anything).
    #[arg(long = "check-only")]
    check_only: bool,

    /// File or directory (positional form).
    #[arg(value_hint = ValueHint::AnyPath)]
    path_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompressArgs {
    #[command(flatten)]
    convert: ConvertArgs,

    /// Fail a file when the compressor errors instead of storing it raw.
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// DVPL input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Info,
    Config,
}

struct Options {
    command: Command,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    keep_originals: bool,
    check_only: bool,
    strict: bool,
    path: PathBuf,
}

fn resolve_options(cli: Cli) -> Options {
    let quiet = cli.quiet;
    let verbose = cli.verbose.min(2);
    let json_output = cli.json_output;

    let convert = |command: Command, args: ConvertArgs, strict: bool| Options {
        command,
        quiet,
        verbose,
        json_output,
        keep_originals: args.keep_originals,
        check_only: args.check_only,
        strict,
        path: args
            .path
            .or(args.path_pos)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH)),
    };

    match cli.command {
        Cmd::Compress(args) => convert(Command::Compress, args.convert, args.strict),
        Cmd::Decompress(args) => convert(Command::Decompress, args, false),
        Cmd::Info(args) => Options {
            command: Command::Info,
            quiet,
            verbose,
            json_output,
            keep_originals: false,
            check_only: false,
            strict: false,
            path: args.input,
        },
        Cmd::Config => Options {
            command: Command::Config,
            quiet,
            verbose,
            json_output,
            keep_originals: false,
            check_only: false,
            strict: false,
            path: PathBuf::from(DEFAULT_PATH),
        },
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("dvpl".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn build_process_config(opts: &Options) -> Option<ProcessConfig> {
    let direction = match opts.command {
        Command::Compress => Direction::Compress,
        Command::Decompress => Direction::Decompress,
        Command::Info | Command::Config => return None,
    };
    let encode = if opts.strict {
        EncodeOptions::strict()
    } else {
        EncodeOptions::default()
    };
    Some(
        ProcessConfig::new(direction)
            .keep_originals(opts.keep_originals)
            .check_only(opts.check_only)
            .encode_options(encode),
    )
}

/// Default log filter for the requested verbosity.
///
/// Per-file results are printed from the report, so library log lines stay
/// hidden unless asked for. `RUST_LOG` still takes precedence.
fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("dvpl version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("FOOTER_SIZE={FOOTER_SIZE}");
    eprintln!("MAGIC={}", String::from_utf8_lossy(&MAGIC));
    eprintln!("SUFFIX={DVPL_SUFFIX}");
    eprintln!("BLOCK_COMPRESSOR=lz4");

    0
}

// ---------------------------------------------------------------------------
// Convert commands (compress, decompress)
// ---------------------------------------------------------------------------

fn cmd_convert(opts: &Options, config: &ProcessConfig) -> i32 {
    let report = match batch::process(&opts.path, config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("dvpl: {e}");
            return 1;
        }
    };

    if !opts.quiet {
        print_report(&report);
    }

    if opts.json_output {
        eprintln!("{:#}", report_json(&opts.path, &report));
    }

    // Per-file failures do not fail the run; only the summary reflects them.
    0
}

fn print_report(report: &BatchReport) {
    let direction = report.direction();
    for entry in report.entries() {
        let path = entry.path.display();
        match &entry.outcome {
            FileOutcome::Converted {
                output,
                source_removed,
                ..
            } => {
                let kept = if *source_removed { "" } else { " (original kept)" };
                println!("{path} {} into {}{kept}", direction.done(), output.display());
            }
            FileOutcome::Checked {
                input_size,
                output_size,
            } => println!("{path} ok ({input_size} -> {output_size} bytes)"),
            FileOutcome::Skipped => println!("ignoring {path}"),
            FileOutcome::Failed(e) => eprintln!("dvpl: {e}"),
        }
    }

    let status = if report.is_clean() { "FINISHED" } else { "FINISHED WITH ERRORS" };
    eprintln!(
        "{} {status}: {} processed, {} skipped, {} failed",
        direction.as_str().to_uppercase(),
        report.processed_count(),
        report.skipped_count(),
        report.failed_count()
    );
}

fn report_json(root: &Path, report: &BatchReport) -> serde_json::Value {
    let files: Vec<serde_json::Value> = report
        .entries()
        .iter()
        .map(|entry| {
            let path = entry.path.display().to_string();
            match &entry.outcome {
                FileOutcome::Converted {
                    output,
                    input_size,
                    output_size,
                    source_removed,
                    output_sha256,
                } => serde_json::json!({
                    "path": path,
                    "status": "converted",
                    "output": output.display().to_string(),
                    "input_size": input_size,
                    "output_size": output_size,
                    "source_removed": source_removed,
                    "output_sha256": output_sha256.as_ref().map(hex),
                }),
                FileOutcome::Checked {
                    input_size,
                    output_size,
                } => serde_json::json!({
                    "path": path,
                    "status": "checked",
                    "input_size": input_size,
                    "output_size": output_size,
                }),
                FileOutcome::Skipped => serde_json::json!({
                    "path": path,
                    "status": "skipped",
                }),
                FileOutcome::Failed(e) => serde_json::json!({
                    "path": path,
                    "status": "failed",
                    "error": e.to_string(),
                }),
            }
        })
        .collect();

    serde_json::json!({
        "command": report.direction().as_str(),
        "path": root.display().to_string(),
        "processed": report.processed_count(),
        "skipped": report.skipped_count(),
        "failed": report.failed_count(),
        "files": files,
    })
}

fn hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn cmd_info(opts: &Options) -> i32 {
    let data = match std::fs::read(&opts.path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("dvpl: {}: {e}", opts.path.display());
            return 1;
        }
    };

    let footer = match decoder::inspect(&data) {
        Ok(footer) => footer,
        Err(e) => {
            eprintln!("dvpl: {}: {e}", opts.path.display());
            return 1;
        }
    };

    let storage = footer
        .storage()
        .map(|kind| kind.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let integrity = match decoder::decode(&data) {
        Ok(_) => "ok".to_string(),
        Err(e) => e.to_string(),
    };
    let ratio = if footer.original_size == 0 {
        1.0
    } else {
        f64::from(footer.compressed_size) / f64::from(footer.original_size)
    };

    if opts.json_output {
        let json = serde_json::json!({
            "command": "info",
            "path": opts.path.display().to_string(),
            "original_size": footer.original_size,
            "compressed_size": footer.compressed_size,
            "crc32": format!("{:08x}", footer.crc32),
            "type": footer.kind,
            "storage": storage,
            "integrity": integrity,
        });
        eprintln!("{json:#}");
    }

    if !opts.quiet {
        println!("File:                 {}", opts.path.display());
        println!("File size:            {}", data.len());
        println!("Original size:        {}", footer.original_size);
        println!("Stored size:          {}", footer.compressed_size);
        println!("CRC-32:               {:08x}", footer.crc32);
        println!("Type:                 {} ({storage})", footer.kind);
        println!("Ratio:                {ratio:.3}");
        println!("Integrity:            {integrity}");
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Compress | Command::Decompress => match build_process_config(&opts) {
            Some(config) => cmd_convert(&opts, &config),
            None => 1,
        },
        Command::Info => cmd_info(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
