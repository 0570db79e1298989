use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::{Vec2, vec2};

const LABEL_MAX_CHARS: usize = 28;

pub fn short_element(element: &str) -> String {
    if element.chars().count() <= LABEL_MAX_CHARS {
        return element.to_owned();
    }

    let mut label = element.chars().take(LABEL_MAX_CHARS - 1).collect::<String>();
    label.push('…');
    label
}

pub fn format_similarity(similarity: Option<f32>) -> String {
    match similarity {
        Some(value) => format!("{value:.4}"),
        None => "-".to_owned(),
    }
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Unit direction derived from the element hash, so a node spawns on the same
/// side of its parent every time the graph is rebuilt.
pub fn stable_direction(id: &str, salt: usize) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    let direction = vec2(jx, jy);
    if direction.length_sq() <= 0.0001 {
        let angle = ((salt as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin())
    } else {
        direction.normalized()
    }
}
