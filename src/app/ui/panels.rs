use std::sync::Arc;
use std::time::Instant;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText};
use tracing::warn;

use vecset_explorer::VectorIndex;
use vecset_explorer::explorer::{GraphExplorer, MemoryScene, StatusLevel};
use vecset_explorer::prefs::{PreferenceStore, Preferences};
use vecset_explorer::util::short_element;

use super::super::{LaunchOptions, PointerTracker, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(
        index: Arc<VectorIndex>,
        options: &LaunchOptions,
        preference_store: Box<dyn PreferenceStore>,
    ) -> Self {
        let preferences = Preferences::load(preference_store.as_ref());
        let mut explorer = GraphExplorer::new(
            options.config.clone(),
            index.clone(),
            MemoryScene::new(),
        );
        explorer.preselect_layout(preferences.layout);
        explorer.set_lines_visible(preferences.show_lines);

        let root = options
            .root
            .clone()
            .or_else(|| index.elements().next().map(str::to_owned))
            .unwrap_or_default();

        let mut model = Self {
            explorer,
            index,
            source_label: options.source.describe(),
            root_input: root.clone(),
            search: String::new(),
            search_hits: Vec::new(),
            preferences,
            preference_store,
            pointer: PointerTracker::default(),
        };
        model.start_exploring(&root);
        model
    }

    pub(in crate::app) fn start_exploring(&mut self, element: &str) {
        let vector = self.index.embedding(element.trim()).map(<[f32]>::to_vec);
        if vector.is_none() {
            warn!(element, "root element has no stored vector");
        }
        let _ = self.explorer.start(element, vector);
        self.search_hits.clear();
    }

    pub(in crate::app) fn save_preferences(&mut self) {
        if let Err(error) = self.preferences.save(self.preference_store.as_mut()) {
            warn!(%error, "failed to save preferences");
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("vecset-explorer");
                    ui.separator();
                    ui.label(format!("source: {}", self.source_label));
                    ui.label(format!("vectors: {} × {}", self.index.len(), self.index.dim()));
                    if let Some(root) = self.explorer.root().and_then(|id| self.explorer.store().node(id)) {
                        ui.label(format!("root: {}", short_element(&root.element)));
                    }
                    ui.label(format!(
                        "nodes: {} / {}",
                        self.explorer.store().len(),
                        self.explorer.config().max_nodes
                    ));
                    ui.label(format!("shown: {}", self.explorer.store().visible_count()));
                    if self.explorer.is_busy() {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.explorer.layout_kind().label());
                    });
                });
                self.draw_status_banner(ui);
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui, Instant::now()));
    }

    fn draw_status_banner(&mut self, ui: &mut egui::Ui) {
        let Some(status) = self.explorer.status().cloned() else {
            return;
        };
        let color = match status.level {
            StatusLevel::Notice => Color32::from_rgb(246, 206, 104),
            StatusLevel::Error => Color32::from_rgb(241, 106, 94),
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(status.message).color(color));
            if ui.small_button("Dismiss").clicked() {
                self.explorer.dismiss_status();
            }
        });
    }
}
