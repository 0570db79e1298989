use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use vecset_explorer::explorer::{Camera, ExpansionState};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;
    let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)) as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Dark backdrop with a world-anchored grid that follows pan and zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let pixels_per_unit = 1.0 / camera.units_per_pixel().max(f32::EPSILON);
    let mut step = 50.0 * pixels_per_unit;
    while step < 24.0 {
        step *= 2.0;
    }
    while step > 96.0 {
        step *= 0.5;
    }
    let origin = rect.min + camera.world_to_screen(eframe::egui::Vec2::ZERO).to_vec2();
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Bounding-box test only; a few off-screen diagonals get drawn anyway.
pub(super) fn line_visible(rect: Rect, start: Pos2, end: Pos2) -> bool {
    Rect::from_two_pos(start, end).intersects(rect)
}

/// Cool blue for weak links up to warm orange for near-duplicates. The root
/// has no similarity and gets its own color.
pub(super) fn similarity_color(similarity: Option<f32>) -> Color32 {
    let Some(similarity) = similarity else {
        return Color32::from_rgb(245, 245, 245);
    };
    let t = similarity.clamp(0.0, 1.0);
    Color32::from_rgb(
        (55.0 + (190.0 * t)) as u8,
        (150.0 - (40.0 * t)) as u8,
        (215.0 - (155.0 * t)) as u8,
    )
}

pub(super) fn depth_color(depth: usize, max_depth: usize) -> Color32 {
    const PALETTE: [Color32; 6] = [
        Color32::from_rgb(245, 245, 245),
        Color32::from_rgb(106, 190, 255),
        Color32::from_rgb(120, 220, 160),
        Color32::from_rgb(246, 206, 104),
        Color32::from_rgb(241, 140, 94),
        Color32::from_rgb(200, 120, 230),
    ];
    if max_depth < PALETTE.len() {
        return PALETTE[depth.min(PALETTE.len() - 1)];
    }
    let t = depth as f32 / max_depth.max(1) as f32;
    blend_color(PALETTE[1], PALETTE[4], t)
}

pub(super) fn expansion_color(state: ExpansionState) -> Color32 {
    match state {
        ExpansionState::NotExpanded => Color32::from_rgb(140, 150, 165),
        ExpansionState::Expanded => Color32::from_rgb(106, 190, 255),
        ExpansionState::Collapsed => Color32::from_rgb(246, 206, 104),
    }
}

pub(super) fn line_color(strength: f32) -> Color32 {
    let alpha = (40.0 + (strength.clamp(0.0, 1.0) * 130.0)) as u8;
    Color32::from_rgba_unmultiplied(150, 165, 185, alpha)
}
