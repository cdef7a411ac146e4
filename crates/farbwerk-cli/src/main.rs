// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Farbwerk command line.
//
// Entry point. Initialises logging, loads the configuration, and dispatches
// to one subcommand. Failures are printed in plain English and mapped to an
// exit code by severity.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use farbwerk_core::config::default_config_path;
use farbwerk_core::error::{FarbwerkError, Result};
use farbwerk_core::human_errors::{Severity, humanize_error};
use farbwerk_core::{AppConfig, schemes};
use farbwerk_document::{
    CancelToken, ConversionEvent, ConversionJob, LayoutExtractor, PdfSession, SourceDocument, is_valid_pdf,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farbwerk")]
#[command(version)]
#[command(about = "Recolour PDF documents for comfortable reading", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/farbwerk/config.json)
    #[arg(long, global = true, value_name = "FILE", env = "FARBWERK_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available colour schemes
    Schemes {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Save it to the configuration file
        #[arg(long)]
        write: bool,
    },

    /// Check whether a file opens as a PDF
    Check {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Recolour a PDF into a new file
    Convert {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <stem>_converted.pdf beside the input)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Colour scheme id, e.g. "Dark Mode"
        #[arg(short, long)]
        scheme: Option<String>,
    },

    /// Render one page to PNG
    Preview {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Resolution (defaults to the configured preview DPI)
        #[arg(long)]
        dpi: Option<u32>,

        /// Output file (defaults to <stem>_page<N>.png beside the input)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Print a page's extracted text layout as JSON
    Layout {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load_or_default(&config_path);

    match run(cli.command, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            let human = humanize_error(&err);
            eprintln!("Error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            exit_code(human.severity)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(severity: Severity) -> ExitCode {
    match severity {
        Severity::Permanent => ExitCode::from(1),
        Severity::ActionRequired => ExitCode::from(2),
        Severity::Cancelled => ExitCode::from(130),
    }
}

async fn run(command: Commands, config: AppConfig, config_path: &Path) -> Result<()> {
    match command {
        Commands::Schemes { json } => list_schemes(json),
        Commands::Config { write } => show_config(&config, config_path, write),
        Commands::Check { input } => check(&input),
        Commands::Convert {
            input,
            output,
            scheme,
        } => convert(&config, input, output, scheme).await,
        Commands::Preview {
            input,
            page,
            dpi,
            out,
        } => preview(config, &input, page, dpi, out),
        Commands::Layout { input, page } => layout(&input, page),
    }
}

// -- Commands ----------------------------------------------------------------

fn list_schemes(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(schemes::all())?);
        return Ok(());
    }
    for scheme in schemes::all() {
        println!(
            "{:<14} {} on {}  {}",
            scheme.id, scheme.text_hex, scheme.background_hex, scheme.description
        );
    }
    Ok(())
}

fn show_config(config: &AppConfig, path: &Path, write: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if write {
        config.save(path)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn check(input: &Path) -> Result<()> {
    if !is_valid_pdf(input) {
        return Err(FarbwerkError::InvalidDocument(format!(
            "{} is not a readable PDF",
            input.display()
        )));
    }
    let document = SourceDocument::open(input)?;
    println!("{}: PDF, {} pages", input.display(), document.page_count());
    Ok(())
}

async fn convert(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    scheme: Option<String>,
) -> Result<()> {
    let scheme_id = scheme.unwrap_or_else(|| config.default_scheme.clone());
    // Reject an unknown scheme before touching the input.
    schemes::require_scheme(&scheme_id)?;
    let output = output.unwrap_or_else(|| config.output_path_for(&input));

    let cancel = CancelToken::new();
    let mut handle = ConversionJob::new(&input, &scheme_id, &output)
        .with_text_font(config.text_font)
        .with_cancel_token(cancel.clone())
        .spawn();

    loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else { break };
                report_progress(&event);
                if event.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, cancelling");
                cancel.cancel();
            }
        }
    }

    let report = handle.wait().await?;
    println!(
        "Wrote {} ({} pages, scheme '{}', {} ms)",
        output.display(),
        report.pages,
        report.scheme_id,
        report.elapsed_ms()
    );
    if report.lines_fallen_back > 0 {
        println!(
            "  {} lines drawn span by span, {} spans skipped",
            report.lines_fallen_back, report.spans_skipped
        );
    }
    println!("  sha256 {}", report.output_sha256);
    Ok(())
}

fn report_progress(event: &ConversionEvent) {
    match event {
        ConversionEvent::Started { total_pages, .. } => {
            eprintln!("Converting {total_pages} pages");
        }
        ConversionEvent::PageDone {
            page, total_pages, ..
        } => {
            eprintln!("  page {page}/{total_pages}");
        }
        // Outcome is reported from the job result.
        ConversionEvent::Finished { .. }
        | ConversionEvent::Failed { .. }
        | ConversionEvent::Cancelled { .. } => {}
    }
}

fn preview(
    config: AppConfig,
    input: &Path,
    page: usize,
    dpi: Option<u32>,
    out: Option<PathBuf>,
) -> Result<()> {
    let index = page_index(page)?;
    let mut session = PdfSession::new(config);
    let pages = session.open(input)?;

    let png = session.preview(index, dpi)?.ok_or_else(|| {
        FarbwerkError::Preview(format!("page {page} does not exist (document has {pages})"))
    })?;
    let out = out.unwrap_or_else(|| preview_path_for(input, page));
    std::fs::write(&out, png)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn layout(input: &Path, page: usize) -> Result<()> {
    let index = page_index(page)?;
    let document = SourceDocument::open(input)?;
    let layout = LayoutExtractor::new().extract(&document, index)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

// -- Helpers -----------------------------------------------------------------

/// 1-based page number from the command line to a 0-based index.
fn page_index(page: usize) -> Result<usize> {
    page.checked_sub(1)
        .ok_or_else(|| FarbwerkError::Config("page numbers start at 1".into()))
}

fn preview_path_for(input: &Path, page: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    input.with_file_name(format!("{stem}_page{page}.png"))
}
