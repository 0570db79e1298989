use eframe::egui::{Vec2, vec2};

use super::super::store::GraphStore;

pub(super) fn grid_targets(store: &GraphStore, spacing: f32) -> Vec<Option<Vec2>> {
    let mut targets = vec![None; store.len()];
    let visible = store
        .node_ids()
        .filter(|id| store.nodes()[id.0].visible)
        .collect::<Vec<_>>();
    if visible.is_empty() {
        return targets;
    }

    let side = (visible.len() as f32).sqrt().ceil() as usize;
    let half = (side.saturating_sub(1)) as f32 * spacing * 0.5;
    for (slot, id) in visible.into_iter().enumerate() {
        let column = slot % side;
        let row = slot / side;
        targets[id.0] = Some(vec2(column as f32 * spacing - half, half - row as f32 * spacing));
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_square_and_centred() {
        let mut store = GraphStore::new();
        for index in 0..9 {
            store.add_node(&format!("n{index}"), None, None);
        }
        let targets = grid_targets(&store, 10.0).into_iter().flatten().collect::<Vec<_>>();
        assert_eq!(targets.len(), 9);
        assert_eq!(targets[0], vec2(-10.0, 10.0));
        assert_eq!(targets[4], Vec2::ZERO);
        assert_eq!(targets[8], vec2(10.0, -10.0));
    }

    #[test]
    fn partial_last_row() {
        let mut store = GraphStore::new();
        for index in 0..5 {
            store.add_node(&format!("n{index}"), None, None);
        }
        let targets = grid_targets(&store, 10.0);
        // ceil(sqrt(5)) = 3 columns.
        assert_eq!(targets[3], Some(vec2(-10.0, 0.0)));
        assert_eq!(targets[4], Some(vec2(0.0, 0.0)));
    }
}
