use eframe::egui::{self, RichText, Ui};

use vecset_explorer::explorer::{ExpansionState, NodeId};
use vecset_explorer::util::{format_similarity, short_element};

use super::super::ViewModel;

const NEIGHBOR_ROWS: usize = 24;

impl ViewModel {
    /// Node shown on the info card: the selection while pinned, otherwise the
    /// hovered node falling back to the selection.
    fn card_node(&self) -> Option<NodeId> {
        if self.preferences.card_pinned {
            self.explorer.selected()
        } else {
            self.explorer.hovered().or(self.explorer.selected())
        }
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Info Card");
            let mut pinned = self.preferences.card_pinned;
            if ui
                .toggle_value(&mut pinned, "📌")
                .on_hover_text("Keep the card on the selected node while hovering others.")
                .changed()
            {
                self.preferences.card_pinned = pinned;
                self.save_preferences();
            }
        });
        ui.add_space(6.0);

        let Some(id) = self.card_node() else {
            ui.label("Hover or click a node in the graph.");
            return;
        };
        let Some(node) = self.explorer.store().node(id) else {
            ui.label("Selected node no longer exists in the graph.");
            return;
        };

        let element = node.element.clone();
        let similarity = node.similarity;
        let dim = node.vector.as_ref().map(Vec::len);
        let expansion = node.expansion;
        let depth = node.depth;
        let parent = node
            .parent
            .and_then(|parent| self.explorer.store().node(parent))
            .map(|parent| parent.element.clone());
        let mut neighbors = self
            .explorer
            .store()
            .incident_edges(id)
            .iter()
            .filter_map(|edge| self.explorer.store().edge(*edge))
            .map(|edge| (edge.other(id), edge.strength))
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));

        ui.label(RichText::new(short_element(&element)).strong());
        ui.small(element.as_str());
        ui.add_space(6.0);

        ui.label(format!("Similarity to parent: {}", format_similarity(similarity)));
        ui.label(format!(
            "Vector: {}",
            dim.map_or_else(|| "not loaded".to_owned(), |dim| format!("{dim} dimensions"))
        ));
        ui.label(format!("Expansion: {}", expansion.label()));
        ui.label(format!("Depth from root: {depth}"));
        if let Some(parent) = &parent {
            ui.label(format!("Parent: {}", short_element(parent)));
        }
        if self.explorer.is_fetching(id) {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("fetching neighbors");
            });
        }

        ui.horizontal_wrapped(|ui| {
            match expansion {
                ExpansionState::NotExpanded | ExpansionState::Collapsed => {
                    if ui.button("Expand").clicked() {
                        let _ = self.explorer.expand(id);
                    }
                }
                ExpansionState::Expanded => {
                    if ui.button("Collapse").clicked() {
                        self.explorer.collapse(id);
                    }
                }
            }
            if ui
                .button("Refresh")
                .on_hover_text("Fetch again, possibly finding more neighbors.")
                .clicked()
            {
                let _ = self.explorer.refresh(id);
            }
            if ui.button("Recenter").clicked() {
                self.explorer.recenter(id);
            }
        });

        ui.separator();
        ui.label(RichText::new(format!("Neighbors ({})", neighbors.len())).strong());
        if neighbors.is_empty() {
            ui.label("No neighbors in the graph yet.");
            return;
        }

        let mut focus = None;
        egui::ScrollArea::vertical()
            .id_salt("card_neighbors_scroll")
            .max_height(360.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (neighbor, strength) in neighbors.iter().take(NEIGHBOR_ROWS) {
                    let Some(node) = self.explorer.store().node(*neighbor) else {
                        continue;
                    };
                    let mut label = format!("{}  ({strength:.3})", short_element(&node.element));
                    if !node.visible {
                        label.push_str("  [hidden]");
                    }
                    if ui.link(label).on_hover_text(node.element.as_str()).clicked() {
                        focus = Some(*neighbor);
                    }
                }
            });
        if let Some(neighbor) = focus {
            self.explorer.focus(neighbor);
        }
    }
}
