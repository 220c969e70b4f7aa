//! CSV Combiner CLI
//!
//! Command-line tool for merging every CSV file in a folder into one file,
//! tagging each row with the file it came from.

mod prompt;

use clap::{Args, Parser, Subcommand};
use combiner_core::{
    check_header_line, combine_directory, discover_files, ensure_output_free, lands_in_dir,
    list_subfolders, read_preview, resolve_selection, unique_output_path, CombineOptions,
    CombineOutcome, CombineReport, ColumnSpec, HeaderConfig, DEFAULT_PREVIEW_LINES,
};
use prompt::Prompter;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE: &str = "CSV-Files";

const EXIT_OK: i32 = 0;
const EXIT_NO_FILES: i32 = 2;
const EXIT_ALL_FAILED: i32 = 3;
const EXIT_STOPPED: i32 = 4;

#[derive(Parser)]
#[command(name = "csv-combiner")]
#[command(about = "Combine a folder of CSV files into one", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine the CSV files of one folder (asks for anything not given)
    Combine(CombineArgs),

    /// List candidate folders under the base folder
    Folders {
        /// Folder holding one sub-folder per data set
        #[arg(short, long, default_value = DEFAULT_BASE)]
        base: PathBuf,
    },

    /// Show the first raw lines of a file
    Preview {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Number of lines to show
        #[arg(short, long, default_value_t = DEFAULT_PREVIEW_LINES)]
        lines: usize,
    },
}

#[derive(Args)]
struct CombineArgs {
    /// Folder holding one sub-folder per data set; created if missing
    #[arg(short, long, default_value = DEFAULT_BASE)]
    base: PathBuf,

    /// Name of the sub-folder of the base folder to combine
    #[arg(short, long, conflicts_with = "dir")]
    folder: Option<String>,

    /// Combine this directory instead of a sub-folder of the base folder
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// 1-based line holding column names, 0 for none
    #[arg(long)]
    header_line: Option<usize>,

    /// Column selection, e.g. "1-3,5", "all" or "none"
    #[arg(short, long, conflicts_with = "names")]
    columns: Option<String>,

    /// Comma-separated column names to keep, in order
    #[arg(long)]
    names: Option<String>,

    /// Output file path (default: <base>/<folder>-combined.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> combiner_core::Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Combine(args) => cmd_combine(args),
        Commands::Folders { base } => cmd_folders(&base),
        Commands::Preview { file, lines } => cmd_preview(&file, lines),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn,combiner_core=info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_folders(base: &Path) -> combiner_core::Result<i32> {
    if !base.is_dir() {
        println!("Base folder {} does not exist.", base.display());
        return Ok(EXIT_STOPPED);
    }

    let options = CombineOptions::default();
    let folders = list_subfolders(base)?;
    println!("Folders in {} ({}):", base.display(), folders.len());
    for (i, folder) in folders.iter().enumerate() {
        let csv_count = discover_files(folder, &options.extension)?.len();
        println!("  {}. {} ({} CSV files)", i + 1, folder_name(folder), csv_count);
    }

    Ok(EXIT_OK)
}

fn cmd_preview(file: &Path, lines: usize) -> combiner_core::Result<i32> {
    let preview = read_preview(file, lines)?;
    let stdout = io::stdout();
    let mut prompter = Prompter::new(io::empty(), stdout.lock());
    prompter.show_preview(&folder_name(file), &preview)?;
    Ok(EXIT_OK)
}

fn cmd_combine(args: CombineArgs) -> combiner_core::Result<i32> {
    println!("CSV File Combiner");
    println!("=================");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());
    combine_with(&args, &mut prompter)
}

/// Run one combine, asking through `prompter` for anything `args` leaves open
fn combine_with<R: BufRead, W: Write>(
    args: &CombineArgs,
    prompter: &mut Prompter<R, W>,
) -> combiner_core::Result<i32> {
    let Some((folder, output_dir)) = locate_folder(args, prompter)? else {
        return Ok(EXIT_STOPPED);
    };

    let output = match &args.output {
        Some(path) => {
            ensure_output_free(path)?;
            path.clone()
        }
        None => unique_output_path(&output_dir, &folder_name(&folder)),
    };
    if lands_in_dir(&output, &folder) {
        println!(
            "Output {} is inside the input folder {}; choose a path outside it.",
            output.display(),
            folder.display()
        );
        return Ok(EXIT_STOPPED);
    }

    // Header line, chosen against a preview of the first file
    let options = CombineOptions::default();
    let files = discover_files(&folder, &options.extension)?;
    let Some(first) = files.first() else {
        println!("No CSV files found in {}", folder.display());
        return Ok(EXIT_NO_FILES);
    };

    let preview = read_preview(first, options.preview_lines)?;
    if preview.is_empty() {
        println!("{} is empty, nothing to preview.", first.display());
        return Ok(EXIT_STOPPED);
    }

    let header = match args.header_line {
        Some(line) => match check_header_line(line, preview.len()) {
            Ok(config) => config,
            Err(reason) => {
                println!("--header-line {}: {}", line, reason);
                return Ok(EXIT_STOPPED);
            }
        },
        None => {
            prompter.show_preview(&folder_name(first), &preview)?;
            match prompter.header_line(preview.len())? {
                Some(line) => HeaderConfig::from_line_number(line),
                None => return Ok(cancelled()),
            }
        }
    };
    let options = CombineOptions { header, ..options };

    let outcome = combine_directory(&folder, &output, &options, |columns| {
        if let Some(names) = &args.names {
            return Some(ColumnSpec::names(
                names.split(',').map(str::trim).filter(|n| !n.is_empty()),
            ));
        }
        if let Some(selection) = &args.columns {
            return match resolve_selection(selection, columns) {
                Ok(spec) => Some(spec),
                Err(reason) => {
                    println!("--columns {}: {}", selection, reason);
                    None
                }
            };
        }
        match prompter.column_selection(columns) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!(error = %e, "failed to read column selection");
                None
            }
        }
    })?;

    report_outcome(&outcome, args.json)
}

/// Find the folder to combine and the directory its output goes to
///
/// `None` means the run stops here; the reason has been printed.
fn locate_folder<R: BufRead, W: Write>(
    args: &CombineArgs,
    prompter: &mut Prompter<R, W>,
) -> combiner_core::Result<Option<(PathBuf, PathBuf)>> {
    if let Some(dir) = &args.dir {
        // Resolve `.` and `..` so the folder has a real name and a parent
        let Ok(dir) = fs::canonicalize(dir) else {
            println!("Folder {} not found.", dir.display());
            return Ok(None);
        };
        let output_dir = dir.parent().unwrap_or(&dir).to_path_buf();
        return Ok(Some((dir, output_dir)));
    }

    ensure_base_folder(&args.base)?;

    if let Some(name) = &args.folder {
        let folder = args.base.join(name);
        if !folder.is_dir() {
            println!("Folder {} not found.", folder.display());
            return Ok(None);
        }
        return Ok(Some((folder, args.base.clone())));
    }

    let folders = list_subfolders(&args.base)?;
    if folders.is_empty() {
        println!(
            "No subfolders found in {}. Please create at least one subfolder with CSV files.",
            args.base.display()
        );
        return Ok(None);
    }

    match prompter.choose_folder(&folders)? {
        Some(folder) => Ok(Some((folder, args.base.clone()))),
        None => {
            cancelled();
            Ok(None)
        }
    }
}

fn exit_code(outcome: &CombineOutcome) -> i32 {
    match outcome {
        CombineOutcome::NoFiles { .. } => EXIT_NO_FILES,
        CombineOutcome::AllFilesFailed { .. } => EXIT_ALL_FAILED,
        CombineOutcome::Cancelled => EXIT_STOPPED,
        CombineOutcome::Combined(_) => EXIT_OK,
    }
}

fn report_outcome(outcome: &CombineOutcome, json: bool) -> combiner_core::Result<i32> {
    match outcome {
        CombineOutcome::NoFiles { dir } => {
            println!("No CSV files found in {}", dir.display());
        }
        CombineOutcome::AllFilesFailed { failures } => {
            println!("\nNo files were successfully processed:");
            for failure in failures {
                println!("  {}: {}", failure.path.display(), failure.reason);
            }
            println!("\nOperation failed. Please check the errors above.");
        }
        CombineOutcome::Cancelled => println!("\nOperation cancelled."),
        CombineOutcome::Combined(report) if json => println!("{}", report.to_json()?),
        CombineOutcome::Combined(report) => print_summary(report),
    }
    Ok(exit_code(outcome))
}

fn print_summary(report: &CombineReport) {
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }

    if !report.failures.is_empty() {
        println!("\nSkipped {} file(s):", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.path.display(), failure.reason);
        }
    }

    println!(
        "\nCombined {} files into {}",
        report.files_combined,
        report.output.display()
    );
    println!("  {} columns: {}", report.columns.len(), report.columns.join(", "));
    println!("  {} rows", report.rows);
    if report.skipped_rows > 0 {
        println!("  {} malformed rows skipped", report.skipped_rows);
    }
    println!("\nOperation completed successfully!");
}

fn ensure_base_folder(base: &Path) -> combiner_core::Result<()> {
    if !base.exists() {
        fs::create_dir_all(base)?;
        println!("Created folder: {}", base.display());
    }
    Ok(())
}

fn cancelled() -> i32 {
    println!("\nOperation cancelled.");
    EXIT_STOPPED
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
