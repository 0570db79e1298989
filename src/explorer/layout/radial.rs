use std::collections::VecDeque;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::super::store::{GraphStore, NodeId};

/// Hop distance from `root` for every visible node reachable through visible
/// nodes.
pub(super) fn hop_levels(store: &GraphStore, root: NodeId) -> Vec<Option<usize>> {
    let mut levels = vec![None; store.len()];
    if store.node(root).is_none_or(|node| !node.visible) {
        return levels;
    }

    let mut queue = VecDeque::from([root]);
    levels[root.0] = Some(0);
    while let Some(current) = queue.pop_front() {
        let level = levels[current.0].unwrap_or(0);
        for next in store.neighbors(current) {
            if levels[next.0].is_none() && store.nodes()[next.0].visible {
                levels[next.0] = Some(level + 1);
                queue.push_back(next);
            }
        }
    }
    levels
}

pub(super) fn radial_targets(
    store: &GraphStore,
    root: Option<NodeId>,
    radius_step: f32,
) -> Vec<Option<Vec2>> {
    let mut targets = vec![None; store.len()];
    let root = root
        .filter(|root| store.node(*root).is_some_and(|node| node.visible))
        .or_else(|| store.node_ids().find(|id| store.nodes()[id.0].visible));
    let Some(root) = root else {
        return targets;
    };

    let levels = hop_levels(store, root);
    let deepest = levels.iter().flatten().copied().max().unwrap_or(0);

    let mut rings: Vec<Vec<NodeId>> = vec![Vec::new(); deepest + 2];
    for id in bfs_order(store, root, &levels) {
        if let Some(level) = levels[id.0] {
            rings[level].push(id);
        }
    }
    // Visible nodes cut off from the root share one extra outer ring.
    for id in store.node_ids() {
        if store.nodes()[id.0].visible && levels[id.0].is_none() {
            rings[deepest + 1].push(id);
        }
    }

    for (level, ring) in rings.iter().enumerate() {
        if level == 0 {
            for id in ring {
                targets[id.0] = Some(Vec2::ZERO);
            }
            continue;
        }

        let radius = level as f32 * radius_step;
        let offset = level as f32 * 0.35;
        for (slot, id) in ring.iter().enumerate() {
            let angle = offset + TAU * slot as f32 / ring.len() as f32;
            targets[id.0] = Some(vec2(angle.cos(), angle.sin()) * radius);
        }
    }
    targets
}

/// Visit order that keeps siblings next to each other on their ring.
fn bfs_order(store: &GraphStore, root: NodeId, levels: &[Option<usize>]) -> Vec<NodeId> {
    let mut seen = vec![false; store.len()];
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    seen[root.0] = true;

    while let Some(current) = queue.pop_front() {
        order.push(current);
        let level = levels[current.0];
        for next in store.neighbors(current) {
            if !seen[next.0] && levels[next.0].is_some() && levels[next.0] > level {
                seen[next.0] = true;
                queue.push_back(next);
            }
        }
    }
    order
}
