//! bundlewalk - Capture a content directory into pages, page bundles and section bundles.
//!
//! Usage:
//!   bundlewalk capture [DIR]                    Full capture summary
//!   bundlewalk capture [DIR] --changed PATH     Full capture, then re-capture PATH
//!   bundlewalk --help                           Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use itertools::Itertools;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bundlewalk_capture::{
    CaptureConfig, CaptureStats, Capturer, CollectingHandler, ContentChangeMap, ContentClassifier,
    HandlerChain,
};

#[derive(Parser)]
#[command(
    name = "bundlewalk",
    version,
    about = "Concurrent content-directory walker",
    long_about = "bundlewalk walks a content directory and sorts its files into \
                  independent pages, page bundles (index.*) and section bundles (_index.*)."
)]
struct Cli {
    /// Log debug output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a content directory and report what was found
    Capture {
        /// Content directory
        #[arg(default_value = "content")]
        dir: PathBuf,

        /// Default content language
        #[arg(long, default_value = "en")]
        default_lang: String,

        /// Additional content language (repeatable)
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Glob pattern to ignore (repeatable)
        #[arg(short, long = "ignore")]
        ignore: Vec<String>,

        /// Directory workers (0 = auto)
        #[arg(short, long, default_value = "0")]
        workers: usize,

        /// Changed path to re-capture after the full pass (repeatable)
        #[arg(short, long = "changed")]
        changed: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Capture {
            dir,
            default_lang,
            languages,
            ignore,
            workers,
            changed,
            format,
        } => {
            let config = CaptureConfig::builder()
                .content_dir(dir.canonicalize().context("Invalid content directory")?)
                .default_content_language(default_lang)
                .languages(languages)
                .ignore_patterns(ignore)
                .workers(workers)
                .build()
                .context("Invalid capture configuration")?;
            run_capture(&config, &changed, format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run a full capture, then an optional partial one, and report the results.
fn run_capture(config: &CaptureConfig, changed: &[PathBuf], format: OutputFormat) -> Result<()> {
    eprintln!("Capturing {}...", config.content_dir.display());

    let changes = Arc::new(ContentChangeMap::new(Arc::new(ContentClassifier)));
    let collector = Arc::new(CollectingHandler::new());
    let chain = HandlerChain::new()
        .with(changes.clone())
        .with(collector.clone());

    let capturer = Capturer::new(config, chain)
        .context("Cannot set up capture")?
        .with_change_tracker(changes);
    let stats = capturer.capture().context("Capture failed")?;
    report(&config.content_dir, "Full capture", &collector, &stats, format)?;

    if changed.is_empty() {
        return Ok(());
    }

    let changed: Vec<PathBuf> = changed
        .iter()
        .map(|p| absolute(&config.content_dir, p))
        .collect();
    collector.clear();
    let stats = capturer
        .capture_partial(&changed)
        .context("Partial capture failed")?;
    report(&config.content_dir, "Partial capture", &collector, &stats, format)
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn report(
    base: &Path,
    title: &str,
    collector: &CollectingHandler,
    stats: &CaptureStats,
    format: OutputFormat,
) -> Result<()> {
    let summary = collector.summary();

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" {title} - {}", base.display());
            println!(
                " {} pages, {} page bundles, {} section bundles, {} files",
                summary.singles, summary.leaf_bundles, summary.branch_bundles, summary.copy_files
            );
            println!(
                " {} directories in {:.2}s ({} peak workers, {} inline)",
                stats.dirs_read,
                stats.duration.as_secs_f64(),
                stats.peak_workers,
                stats.sync_fallbacks
            );
            println!("{}", "─".repeat(60));

            for bundle in collector.bundles() {
                let dir = bundle.dir().map(|d| relative(base, d)).unwrap_or_default();
                println!(
                    " {:<8} {:<40} [{}]",
                    bundle.kind(),
                    truncate(&dir, 40),
                    bundle.languages().sorted().join(", ")
                );
                for (lang, dir) in bundle.iter().sorted_by_key(|(lang, _)| *lang) {
                    println!(
                        "   {lang}: {} + {} resources",
                        dir.header.file_name().unwrap_or_default(),
                        dir.resources.len()
                    );
                }
            }

            for single in collector.singles() {
                println!(" {:<8} {}", "page", relative(base, &single.path));
            }
            for file in collector.copy_files() {
                println!(" {:<8} {}", "file", relative(base, &file));
            }

            if stats.cyclic_skipped > 0 {
                println!();
                println!("{} symlinked directories skipped", stats.cyclic_skipped);
            }
        }
        OutputFormat::Json => {
            let out = json!({
                "title": title,
                "summary": summary,
                "stats": stats,
                "bundles": collector.bundles().iter().map(|b| b.as_ref()).collect_vec(),
                "singles": collector.singles(),
                "copy_files": collector.copy_files(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Truncate a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
