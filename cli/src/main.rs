//! pageflow CLI - layout analysis and reading order for page content

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pageflow::model::OutlineItem;
use pageflow::render::{self, AnalysisStats};
use pageflow::{
    AnalyzedDocument, CleanupOptions, CleanupPreset, Engine, EngineOptions, JsonFormat,
    PageSelection, RawDocument,
};

#[derive(Parser)]
#[command(name = "pageflow")]
#[command(version)]
#[command(about = "Reconstruct reading order and structure from positioned page content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a page file and write the structured result as JSON
    Analyze {
        /// Input page file (JSON interchange format)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Compact JSON output (no pretty printing)
        #[arg(long)]
        compact: bool,

        /// Include bounding boxes and font statistics
        #[arg(long)]
        detailed: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Worker threads for the page pass (1 runs sequentially)
        #[arg(long, value_name = "N", env = "PAGEFLOW_WORKERS")]
        workers: Option<usize>,

        /// Also run the model-based table detector
        #[arg(long)]
        ml_tables: bool,

        /// Seconds before a table detector is abandoned (0 disables the limit)
        #[arg(long, value_name = "SECS")]
        table_timeout: Option<u64>,

        /// Text cleanup preset
        #[arg(long, value_enum)]
        cleanup: Option<CleanupLevel>,
    },

    /// Extract plain text in reading order
    Text {
        /// Input page file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Text cleanup preset
        #[arg(long, value_enum)]
        cleanup: Option<CleanupLevel>,
    },

    /// Print the heading outline
    Outline {
        /// Input page file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Show content statistics and page failures
    Info {
        /// Input page file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum CleanupLevel {
    /// Compatibility normalisation only
    Minimal,
    /// Normalisation, bullet standardisation and character filtering
    Standard,
}

impl From<CleanupLevel> for CleanupPreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            compact,
            detailed,
            pages,
            workers,
            ml_tables,
            table_timeout,
            cleanup,
        } => {
            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            build_options(pages.as_deref(), cleanup).and_then(|options| {
                let mut options = options
                    .with_detailed(detailed)
                    .with_ml_tables(ml_tables);
                if let Some(workers) = workers {
                    options = options.with_workers(workers);
                }
                if let Some(secs) = table_timeout {
                    options = options
                        .with_table_timeout((secs > 0).then(|| Duration::from_secs(secs)));
                }
                cmd_analyze(&input, output.as_deref(), format, options)
            })
        }
        Commands::Text {
            input,
            output,
            pages,
            cleanup,
        } => build_options(pages.as_deref(), cleanup)
            .and_then(|options| cmd_text(&input, output.as_deref(), options)),
        Commands::Outline { input } => cmd_outline(&input),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_options(
    pages: Option<&str>,
    cleanup: Option<CleanupLevel>,
) -> Result<EngineOptions, Box<dyn std::error::Error>> {
    let mut options = EngineOptions::new();
    if let Some(p) = pages {
        options = options.with_pages(PageSelection::parse(p)?);
    }
    if let Some(level) = cleanup {
        options = options.with_cleanup(CleanupOptions::from_preset(level.into()));
    }
    Ok(options)
}

/// Load and analyze a page file behind a spinner.
fn analyze(
    input: &Path,
    options: EngineOptions,
) -> Result<AnalyzedDocument, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading pages...");
    let source = RawDocument::from_path(input)?;

    pb.set_message(format!("Analyzing {} pages...", source.pages.len()));
    let result = Engine::new(options).analyze(&source);
    pb.finish_and_clear();

    let doc = result?;
    for failure in &doc.failures {
        log::warn!("page {} skipped: {}", failure.page + 1, failure.error);
    }
    Ok(doc)
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    format: JsonFormat,
    options: EngineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = analyze(input, options)?;
    let json = render::to_json(&doc, format)?;
    write_output(output, &json)
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    options: EngineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = analyze(input, options)?;
    let text = render::to_text(&doc)?;
    write_output(output, &text)
}

fn cmd_outline(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = analyze(input, EngineOptions::new())?;
    let outline = doc.outline();

    if outline.is_empty() {
        println!("{}", "No headings found".yellow());
        return Ok(());
    }

    for line in outline_lines(&outline.items, "") {
        println!("{}", line);
    }
    Ok(())
}

/// Render outline items as an indented tree, one line per heading.
fn outline_lines(items: &[OutlineItem], prefix: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == items.len();
        let branch = if last { "└─" } else { "├─" };
        lines.push(format!(
            "{}{} {} {} {}",
            prefix,
            branch.dimmed(),
            item.number.cyan(),
            item.title,
            format!("(p. {})", item.page).dimmed()
        ));
        let child_prefix = format!("{}{}", prefix, if last { "   " } else { "│  " });
        lines.extend(outline_lines(&item.children, &child_prefix));
    }
    lines
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = analyze(input, EngineOptions::new())?;
    let stats = AnalysisStats::from_document(&doc);

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!("{}: {}", "Workers".bold(), doc.profile.workers);
    println!("{}: {} ms", "Elapsed".bold(), doc.profile.elapsed_ms());
    println!(
        "{}: {:.1} pt",
        "Body size".bold(),
        doc.font_statistics.body_size
    );

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Blocks".bold(), stats.block_count);
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Lists".bold(), stats.list_count);
    println!("{}: {}", "List items".bold(), stats.list_item_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Images".bold(), stats.image_count);
    println!("{}: {}", "Asides".bold(), stats.aside_count);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Characters".bold(), stats.char_count);

    if doc.has_failures() {
        println!();
        println!("{}", "Page Failures".red().bold());
        println!("{}", "─".repeat(40).dimmed());
        for failure in &doc.failures {
            println!("{} {}: {}", "Page".bold(), failure.page + 1, failure.error);
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pageflow".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout analysis and reading-order reconstruction");
    println!();
    println!("License: MIT");
}
