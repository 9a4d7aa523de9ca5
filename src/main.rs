use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, error, info};
use serde::Serialize;
use simplelog::{Config, LevelFilter, WriteLogger};

use docpreload::panic_handler::initialize_panic_handler;
use docpreload::preload::{
    ClientBox, DefaultFetcher, DocumentGeometry, FixedContainer, HostViewer, PreloadManager,
    PreloadOutcome, PreloadRequest, PreloadState, PreloadView, ScaledDimensions,
};
use docpreload::settings::load_settings;

#[derive(Parser)]
#[command(
    name = "docpreload",
    about = "Fetch a document preload, size it for a viewport and print the placeholder layout"
)]
struct Cli {
    /// Primary preload image (URL or path)
    primary: String,

    /// Paged preload URL containing the page token
    #[arg(long)]
    paged_template: Option<String>,

    /// Number of pages in the document
    #[arg(long, default_value = "1")]
    pages: u32,

    /// Viewport client width in pixels
    #[arg(long, default_value = "1024")]
    width: u32,

    /// Viewport client height in pixels
    #[arg(long, default_value = "768")]
    height: u32,

    /// Settings file (YAML); defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "docpreload.log")]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Host for runs without a real viewer behind the preload
struct HeadlessHost;

impl HostViewer for HeadlessHost {
    fn is_document_already_loaded(&self) -> bool {
        false
    }

    fn init_thumbnails(&mut self) {
        info!("All preload pages processed");
    }

    fn set_document_scroll_top(&mut self, scroll_top: u32) {
        debug!("Headless host ignoring scroll restore to {scroll_top}");
    }
}

#[derive(Serialize)]
struct Report<'a> {
    outcome: &'static str,
    state: PreloadState,
    geometry: Option<DocumentGeometry>,
    dimensions: Option<ScaledDimensions>,
    load_ms: Option<u128>,
    view: Option<&'a PreloadView>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: LevelFilter = cli
        .log_level
        .parse()
        .map_err(|_| anyhow!("Invalid log level: {}", cli.log_level))?;
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file {:?}", cli.log_file))?,
    )?;
    initialize_panic_handler();

    info!("Starting docpreload for {}", cli.primary);

    let settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    let fetcher = DefaultFetcher::new().context("Failed to build HTTP client")?;
    let mut manager = PreloadManager::with_settings(fetcher, HeadlessHost, settings);

    let mut request = PreloadRequest::new(cli.primary.clone(), cli.pages);
    if let Some(template) = cli.paged_template {
        request = request.with_paged_template(template);
    }
    let container = FixedContainer(ClientBox::new(cli.width, cli.height));

    let outcome = match manager.show_preload(request, container).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Preload failed: {e}");
            return Err(e).context("Preload failed");
        }
    };

    let report = Report {
        outcome: match outcome {
            PreloadOutcome::Showing { .. } => "showing",
            PreloadOutcome::DocumentAlreadyLoaded => "document_already_loaded",
            PreloadOutcome::Discarded => "discarded",
        },
        state: manager.state(),
        geometry: manager.geometry(),
        dimensions: manager.dimensions(),
        load_ms: manager.load_elapsed().map(|d| d.as_millis()),
        view: manager.view(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    manager.cleanup_preload();
    info!("Shutting down docpreload");
    Ok(())
}
