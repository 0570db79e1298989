use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) strength: f32,
    pub(super) min_distance: f32,
    pub(super) theta: f32,
}

fn fallback_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

/// Inverse-square push of `point_b` on `point_a`, scaled by `mass`.
fn repulsion_between(
    point_a: Vec2,
    point_b: Vec2,
    mass: f32,
    params: RepulsionParams,
    fallback: Vec2,
) -> Vec2 {
    let delta = point_a - point_b;
    let distance = delta.length();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        fallback
    };
    let clamped = distance.max(params.min_distance);
    direction * (params.strength * mass / (clamped * clamped))
}

pub(super) fn accumulate_pairwise_repulsion(
    positions: &[Vec2],
    params: RepulsionParams,
    forces: &mut [Vec2],
) {
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let push = repulsion_between(
                positions[i],
                positions[j],
                1.0,
                params,
                fallback_direction(i, j),
            );
            forces[i] += push;
            forces[j] -= push;
        }
    }
}

pub(super) fn accumulate_barnes_hut_repulsion(
    cell: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: RepulsionParams,
    force: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }
    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other != index {
                *force += repulsion_between(
                    point,
                    positions[other],
                    1.0,
                    params,
                    fallback_direction(index, other),
                );
            }
        }
        return;
    }

    let distance = (point - cell.center_of_mass).length().max(0.0001);
    let far_enough = !cell.bounds.contains(point)
        && (cell.bounds.half_extent * 2.0 / distance) < params.theta;
    if far_enough {
        *force += repulsion_between(
            point,
            cell.center_of_mass,
            cell.mass,
            params,
            fallback_direction(index, 0),
        );
        return;
    }

    for child in cell.children.iter().flatten() {
        accumulate_barnes_hut_repulsion(child, index, positions, params, force);
    }
}
