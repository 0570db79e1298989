use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context, Pos2};
use tracing::{info, warn};

use vecset_explorer::explorer::{GraphExplorer, MemoryScene, NodeId};
use vecset_explorer::prefs::{JsonFilePreferences, MemoryPreferences, PreferenceStore, Preferences};
use vecset_explorer::{ExplorerConfig, VectorIndex};

mod graph;
mod render_utils;
mod ui;

#[derive(Clone, Debug)]
pub enum DataSource {
    File(PathBuf),
    Synthetic {
        count: usize,
        dim: usize,
        clusters: usize,
        seed: u64,
    },
}

impl DataSource {
    fn load(&self) -> Result<VectorIndex> {
        match self {
            Self::File(path) => VectorIndex::load(path),
            Self::Synthetic {
                count,
                dim,
                clusters,
                seed,
            } => VectorIndex::synthetic(*count, *dim, *clusters, *seed),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Synthetic { count, dim, .. } => format!("synthetic ({count} × {dim})"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub source: DataSource,
    pub root: Option<String>,
    pub config: ExplorerConfig,
    pub prefs_path: Option<PathBuf>,
}

pub struct ExplorerApp {
    options: LaunchOptions,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Arc<VectorIndex>, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    explorer: GraphExplorer<MemoryScene>,
    index: Arc<VectorIndex>,
    source_label: String,
    root_input: String,
    search: String,
    search_hits: Vec<NodeId>,
    preferences: Preferences,
    preference_store: Box<dyn PreferenceStore>,
    pointer: PointerTracker,
}

/// Last pointer state seen over the canvas, so only changes become events.
#[derive(Default)]
struct PointerTracker {
    position: Option<Pos2>,
    inside: bool,
}

impl ExplorerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let state = Self::start_load(&options.source);
        Self { options, state }
    }

    fn spawn_load(source: DataSource) -> Receiver<Result<Arc<VectorIndex>, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source
                .load()
                .map(Arc::new)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: &DataSource) -> AppState {
        info!(source = %source.describe(), "loading vector set");
        AppState::Loading {
            rx: Self::spawn_load(source.clone()),
        }
    }

    fn open_preferences(options: &LaunchOptions) -> Box<dyn PreferenceStore> {
        match &options.prefs_path {
            Some(path) => match JsonFilePreferences::open(path.clone()) {
                Ok(store) => Box::new(store),
                Err(error) => {
                    warn!(%error, "preferences unavailable; using in-memory defaults");
                    Box::new(MemoryPreferences::default())
                }
            },
            None => Box::new(MemoryPreferences::default()),
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(index) => AppState::Ready(Box::new(ViewModel::new(
                            index,
                            &self.options,
                            Self::open_preferences(&self.options),
                        ))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading vector set...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the vector set");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.options.source));
                    }
                });
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
