use std::time::Instant;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};

use vecset_explorer::prefs::ColorScheme;
use vecset_explorer::util::{format_similarity, short_element};

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, circle_visible, depth_color, dim_color, draw_background, expansion_color,
    line_color, line_visible, similarity_color,
};

const NODE_RADIUS: f32 = 6.0;
const ROOT_RADIUS: f32 = 9.0;
/// Pixels per world unit above which every label is drawn.
const LABEL_ZOOM: f32 = 1.3;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui, now: Instant) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.explorer.set_viewport(rect.size());

        for event in self.collect_pointer_events(ui, rect) {
            self.explorer.handle_pointer(event, now);
        }

        let animating = self.explorer.frame();
        if animating || self.explorer.is_busy() {
            ui.ctx().request_repaint();
        }

        let painter = ui.painter_at(rect);
        let camera = *self.explorer.camera();
        draw_background(&painter, rect, &camera);

        let to_screen = |world: egui::Vec2| rect.min + camera.world_to_screen(world).to_vec2();
        let store = self.explorer.store();
        let highlight = self.explorer.highlight();
        let searching = !self.search_hits.is_empty();

        let scene = self.explorer.scene();
        for line in scene.lines.values() {
            let (Some(from), Some(to)) = (
                scene.point_position(line.from),
                scene.point_position(line.to),
            ) else {
                continue;
            };
            let (start, end) = (to_screen(from), to_screen(to));
            if !line_visible(rect, start, end) {
                continue;
            }
            let mut color = line_color(line.strength);
            let touches_highlight = highlight.is_some_and(|highlight| {
                [line.from, line.to].into_iter().any(|handle| {
                    self.explorer
                        .node_for_point(handle)
                        .is_some_and(|node| node == highlight.node)
                })
            });
            if touches_highlight {
                color = blend_color(color, Color32::from_rgb(246, 206, 104), 0.7);
            } else if highlight.is_some() {
                color = dim_color(color, 0.35);
            }
            painter.line_segment([start, end], Stroke::new(1.0 + line.strength, color));
        }

        let max_depth = store
            .nodes()
            .iter()
            .filter(|node| node.visible)
            .map(|node| node.depth)
            .max()
            .unwrap_or(0);
        let pulse = (ui.input(|input| input.time) * 4.0).sin() as f32 * 0.5 + 0.5;
        let zoom_scale = (1.0 / camera.units_per_pixel().max(f32::EPSILON)).clamp(0.6, 1.6);
        let selected = self.explorer.selected();
        let root = self.explorer.root();

        for id in store.node_ids() {
            let Some(node) = store.node(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let position = to_screen(node.position);
            let base = if Some(id) == root { ROOT_RADIUS } else { NODE_RADIUS };
            let radius = base * zoom_scale;
            if !circle_visible(rect, position, radius + 4.0) {
                continue;
            }

            let mut fill = match self.preferences.color_scheme {
                ColorScheme::Similarity => similarity_color(node.similarity),
                ColorScheme::Depth => depth_color(node.depth, max_depth),
                ColorScheme::Expansion => expansion_color(node.expansion),
            };
            let emphasized = highlight.is_none_or(|highlight| highlight.contains(id))
                && (!searching || self.search_hits.contains(&id));
            if !emphasized {
                fill = dim_color(fill, 0.4);
            }
            painter.circle_filled(position, radius, fill);

            if self.explorer.is_fetching(id) {
                let ring = radius + 3.0 + pulse * 4.0;
                painter.circle_stroke(
                    position,
                    ring,
                    Stroke::new(1.5, Color32::from_rgba_unmultiplied(255, 255, 255, 160)),
                );
            }
            if searching && self.search_hits.contains(&id) {
                painter.circle_stroke(
                    position,
                    radius + 2.0,
                    Stroke::new(1.5, Color32::from_rgb(120, 220, 160)),
                );
            }
            if Some(id) == selected {
                painter.circle_stroke(position, radius + 2.5, Stroke::new(2.0, Color32::WHITE));
            }

            if Some(id) == root || Some(id) == selected || zoom_scale >= LABEL_ZOOM {
                painter.text(
                    position + vec2(radius + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    short_element(&node.element),
                    FontId::proportional(12.0),
                    dim_color(Color32::from_rgb(225, 230, 238), if emphasized { 1.0 } else { 0.5 }),
                );
            }
        }

        self.draw_tooltip(ui, rect);
    }

    fn draw_tooltip(&self, ui: &Ui, rect: egui::Rect) {
        let (Some(anchor), Some(id)) = (self.explorer.tooltip(), self.explorer.hovered()) else {
            return;
        };
        let Some(node) = self.explorer.store().node(id) else {
            return;
        };
        let text = format!(
            "{}\nsimilarity: {}\n{}",
            node.element,
            format_similarity(node.similarity),
            node.expansion.label()
        );
        let painter = ui.painter_at(rect);
        let galley = painter.layout_no_wrap(
            text,
            FontId::proportional(12.0),
            Color32::from_rgb(235, 238, 244),
        );
        let mut origin = rect.min + anchor.to_vec2() + vec2(14.0, 14.0);
        let size = galley.size() + vec2(12.0, 8.0);
        if origin.x + size.x > rect.right() {
            origin.x -= size.x + 28.0;
        }
        if origin.y + size.y > rect.bottom() {
            origin.y -= size.y + 28.0;
        }
        let frame = egui::Rect::from_min_size(origin, size);
        painter.rect_filled(frame, 4.0, Color32::from_rgba_unmultiplied(28, 33, 41, 235));
        painter.galley(origin + vec2(6.0, 4.0), galley, Color32::WHITE);
    }
}
