use std::time::Instant;

use eframe::egui::{self, RichText, Ui};

use vecset_explorer::explorer::{LayoutKind, SwitchOutcome, search_nodes};
use vecset_explorer::prefs::ColorScheme;
use vecset_explorer::util::{format_similarity, short_element};

use super::super::ViewModel;

const SEARCH_ROWS: usize = 12;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Explorer Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Root element")
            .on_hover_text("Exploration restarts from this element.");
        let root_response = ui.text_edit_singleline(&mut self.root_input);
        let submitted =
            root_response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
        ui.horizontal(|ui| {
            if ui.button("Explore").clicked() || submitted {
                let root = self.root_input.clone();
                self.start_exploring(&root);
            }
            if ui
                .button("Reset")
                .on_hover_text("Clear the graph and rerun the initial expansion.")
                .clicked()
            {
                let _ = self.explorer.reset();
                self.search_hits.clear();
            }
        });

        ui.separator();
        ui.label(RichText::new("Layout").strong());
        ui.horizontal_wrapped(|ui| {
            for kind in LayoutKind::ALL {
                let selected = self.explorer.layout_kind() == kind;
                if ui.selectable_label(selected, kind.label()).clicked() {
                    self.switch_layout(kind);
                }
            }
        });
        let selected = self.explorer.selected();
        let recenter = ui.add_enabled(selected.is_some(), egui::Button::new("Recenter on selection"));
        if recenter
            .on_hover_text("Re-anchor radial and projection layouts on the selected node.")
            .clicked()
            && let Some(node) = selected
        {
            self.explorer.recenter(node);
        }

        ui.separator();
        ui.label(RichText::new("Display").strong());
        let mut show_lines = self.preferences.show_lines;
        if ui.checkbox(&mut show_lines, "Show lines").changed() {
            self.preferences.show_lines = show_lines;
            self.explorer.set_lines_visible(show_lines);
            self.save_preferences();
        }

        ui.label("Color nodes by");
        ui.horizontal_wrapped(|ui| {
            for scheme in ColorScheme::ALL {
                if ui
                    .selectable_label(self.preferences.color_scheme == scheme, scheme.label())
                    .clicked()
                    && self.preferences.color_scheme != scheme
                {
                    self.preferences.color_scheme = scheme;
                    self.save_preferences();
                }
            }
        });

        ui.separator();
        ui.label("Search shown elements")
            .on_hover_text("Fuzzy-highlight matching nodes; click a hit to focus it.");
        ui.text_edit_singleline(&mut self.search);
        // The graph keeps growing underneath, so hits are recomputed every frame.
        self.search_hits = search_nodes(self.explorer.store(), &self.search);

        if !self.search.trim().is_empty() {
            ui.small(format!("{} matches", self.search_hits.len()));
            let mut focus = None;
            for id in self.search_hits.iter().take(SEARCH_ROWS) {
                let Some(node) = self.explorer.store().node(*id) else {
                    continue;
                };
                let label = format!(
                    "{}  ({})",
                    short_element(&node.element),
                    format_similarity(node.similarity)
                );
                if ui.link(label).on_hover_text(node.element.as_str()).clicked() {
                    focus = Some(*id);
                }
            }
            if let Some(id) = focus {
                self.explorer.focus(id);
            }
        }
    }

    fn switch_layout(&mut self, kind: LayoutKind) {
        if let Ok(SwitchOutcome::Applied) = self.explorer.set_layout(kind, Instant::now()) {
            self.preferences.layout = kind;
            self.save_preferences();
        }
    }
}
