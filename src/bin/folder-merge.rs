//! Folder Merge CLI tool
//!
//! A command-line tool that merges the PDFs or JPGs of every guides/reports folder in a tree.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folder_merge::config::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_TOTAL_MB};
use folder_merge::merge::FolderOutcome;
use folder_merge::{DispatchPolicy, MergeConfig, MergeSelector, WalkSummary};

/// Folder Merge - merge the PDFs or JPGs of guides/reports folders
#[derive(Parser)]
#[command(name = "folder-merge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge every guides/reports/tiss-guides folder under a tree
    folder-merge run /data/patients

    # Show what would be merged without touching anything
    folder-merge run /data/patients --dry-run

    # Merge a single folder, skipping it if it holds more than 500 MB
    folder-merge folder /data/patients/ana/reports --max-total-mb 500

    # Check a produced PDF
    folder-merge info /data/patients/ana/reports/merged.pdf")]
struct Cli {
    /// Show per-file decisions
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find and merge every mergeable folder below a root directory
    Run {
        /// Directory tree to scan
        root: PathBuf,

        #[command(flatten)]
        options: MergeArgs,
    },

    /// Merge one folder directly, whatever its name
    Folder {
        /// Folder holding the PDFs or JPGs
        dir: PathBuf,

        #[command(flatten)]
        options: MergeArgs,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Skip folders whose candidate files exceed this many MB
    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL_MB)]
    max_total_mb: f64,

    /// Seconds to pause after a skipped or failed folder
    #[arg(long, default_value_t = 3)]
    backoff_secs: u64,

    /// How to choose between PDF and JPG merging: census or last-seen
    #[arg(long, default_value = "census", value_parser = parse_dispatch)]
    dispatch: DispatchPolicy,

    /// JPEG quality of the stitched image (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Log what would be merged without deleting or writing files
    #[arg(long)]
    dry_run: bool,
}

impl MergeArgs {
    fn into_config(self) -> MergeConfig {
        MergeConfig {
            max_total_mb: self.max_total_mb,
            backoff: Duration::from_secs(self.backoff_secs),
            dispatch: self.dispatch,
            dry_run: self.dry_run,
            jpeg_quality: self.quality,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run { root, options } => cmd_run(root, options.into_config()),
        Commands::Folder { dir, options } => cmd_folder(dir, options.into_config()),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the fmt subscriber; RUST_LOG overrides the flags
fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "warn,folder_merge=debug"
    } else if quiet {
        "warn"
    } else {
        "warn,folder_merge=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Walk a tree and merge every mergeable folder
fn cmd_run(root: PathBuf, config: MergeConfig) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Cannot open root directory {}", root.display()))?;
    let dry_run = config.dry_run;

    eprintln!("Scanning {}...", root.display());
    let summary = folder_merge::run(&root, config)?;
    print_summary(&summary, dry_run);

    Ok(())
}

/// Merge a single folder
fn cmd_folder(dir: PathBuf, config: MergeConfig) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    let dir = dir.canonicalize()?;

    let selector = MergeSelector::new(config);
    let report = selector
        .process_folder(&dir)
        .with_context(|| format!("Folder {} was not merged", dir.display()))?;

    match &report.outcome {
        FolderOutcome::Empty => println!("No PDF or JPG files in {}", dir.display()),
        FolderOutcome::Planned { kind, files, total_bytes } => {
            println!("Would merge {} {} files ({} bytes):", files.len(), kind, total_bytes);
            for file in files {
                println!("  {}", display_name(file));
            }
        }
        FolderOutcome::Processed { attempts, .. } => {
            for attempt in attempts {
                match &attempt.result {
                    Ok(_) => println!("Created: {}", attempt.path.display()),
                    Err(e) => println!("Failed:  {} ({})", attempt.path.display(), e),
                }
            }
        }
    }

    if !report.is_success() {
        bail!("Some outputs could not be created in {}", dir.display());
    }
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let summary = folder_merge::pdf::summarize(&input)?;

    println!("File: {}", input.display());
    println!("Version: {}", summary.version);
    println!("Pages: {}", summary.page_count);
    println!("Image pages: {}", summary.image_pages);

    Ok(())
}

fn print_summary(summary: &WalkSummary, dry_run: bool) {
    println!("Mergeable folders: {}", summary.targets);
    if dry_run {
        println!("  planned:  {}", summary.planned);
    } else {
        println!("  merged:   {}", summary.merged);
    }
    println!("  empty:    {}", summary.empty);
    println!("  skipped:  {}", summary.skipped);
    println!("  failed:   {}", summary.failed);
    if summary.traversal_errors > 0 {
        println!("Unreadable directories: {}", summary.traversal_errors);
    }
}

fn parse_dispatch(s: &str) -> std::result::Result<DispatchPolicy, String> {
    s.parse::<DispatchPolicy>().map_err(|e| e.to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
