mod app;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vecset_explorer::ExplorerConfig;

use app::{DataSource, LaunchOptions};

const DEFAULT_LOG_FILTER: &str = "vecset_explorer=info";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON vector file: `{"element": [..]}` or `[{"element": .., "vector": [..]}]`.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many clustered vectors instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Element to start exploring from; defaults to the first element.
    #[arg(long)]
    root: Option<String>,

    #[arg(long)]
    max_nodes: Option<usize>,

    #[arg(long)]
    initial_nodes: Option<usize>,

    /// JSON file overriding explorer defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preference file; preferences are kept in memory when omitted.
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// tracing filter directive, e.g. `vecset_explorer=debug`.
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn explorer_config(&self) -> Result<ExplorerConfig> {
        let mut config = match &self.config {
            Some(path) => ExplorerConfig::load(path)?,
            None => ExplorerConfig::default(),
        };
        if let Some(max_nodes) = self.max_nodes {
            config.max_nodes = max_nodes;
        }
        if let Some(initial_nodes) = self.initial_nodes {
            config.initial_nodes = initial_nodes;
        }
        Ok(config)
    }

    fn data_source(&self) -> DataSource {
        match (&self.data, self.synthetic) {
            (Some(path), _) => DataSource::File(path.clone()),
            (None, count) => DataSource::Synthetic {
                count: count.unwrap_or(500),
                dim: 32,
                clusters: 8,
                seed: 42,
            },
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let options = LaunchOptions {
        source: args.data_source(),
        root: args.root.clone(),
        config: args.explorer_config().context("invalid explorer configuration")?,
        prefs_path: args.prefs.clone(),
    };

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "vecset-explorer",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::ExplorerApp::new(cc, options)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to run the explorer window: {error}"))
}
