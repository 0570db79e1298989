mod forces;
mod quadtree;

use eframe::egui::Vec2;

use crate::config::PhysicsConfig;

use super::store::GraphStore;
use forces::{RepulsionParams, accumulate_barnes_hut_repulsion, accumulate_pairwise_repulsion};
use quadtree::QuadNode;

#[derive(Default)]
struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    active: Vec<usize>,
    slot_by_node: Vec<Option<usize>>,
}

/// Spring-electrical simulation over the visible part of the graph.
pub struct ForceSimulator {
    config: PhysicsConfig,
    scratch: PhysicsScratch,
}

impl ForceSimulator {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Runs the configured number of sub-steps. Returns whether anything is
    /// still moving.
    pub fn step_frame(&mut self, store: &mut GraphStore) -> bool {
        let mut moving = false;
        for _ in 0..self.config.iterations.max(1) {
            moving = self.step(store);
        }
        moving
    }

    fn step(&mut self, store: &mut GraphStore) -> bool {
        let config = self.config;
        let scratch = &mut self.scratch;

        scratch.active.clear();
        scratch.positions.clear();
        scratch.slot_by_node.clear();
        scratch.slot_by_node.resize(store.len(), None);
        for (index, node) in store.nodes().iter().enumerate() {
            if node.visible {
                scratch.slot_by_node[index] = Some(scratch.active.len());
                scratch.active.push(index);
                scratch.positions.push(node.position);
            }
        }

        let count = scratch.active.len();
        if count < 2 {
            return false;
        }
        scratch.forces.clear();
        scratch.forces.resize(count, Vec2::ZERO);

        let nodes = store.nodes_mut();
        for &index in &scratch.active {
            nodes[index].velocity *= config.damping;
        }

        let params = RepulsionParams {
            strength: config.repulsion,
            min_distance: config.min_distance.max(0.01),
            theta: config.barnes_hut_theta,
        };
        if count > config.barnes_hut_threshold {
            if let Some(tree) = QuadNode::build(&scratch.positions) {
                for (slot, force) in scratch.forces.iter_mut().enumerate() {
                    accumulate_barnes_hut_repulsion(&tree, slot, &scratch.positions, params, force);
                }
            }
        } else {
            accumulate_pairwise_repulsion(&scratch.positions, params, &mut scratch.forces);
        }

        // Springs act between shown endpoints even when lines are toggled off.
        for edge in store.edges() {
            let (Some(from), Some(to)) = (
                scratch.slot_by_node[edge.source.0],
                scratch.slot_by_node[edge.target.0],
            ) else {
                continue;
            };

            let delta = scratch.positions[to] - scratch.positions[from];
            let distance = delta.length();
            if distance <= 0.0001 {
                continue;
            }
            let direction = delta / distance;
            let pull = (distance - config.rest_length) * config.spring * edge.strength;

            scratch.forces[from] += direction * pull;
            scratch.forces[to] -= direction * pull;
        }

        let max_speed_sq = config.max_speed * config.max_speed;
        let mut moving = false;
        let nodes = store.nodes_mut();
        for (slot, &index) in scratch.active.iter().enumerate() {
            let node = &mut nodes[index];
            let mut velocity = node.velocity + scratch.forces[slot] * config.time_step;
            let speed_sq = velocity.length_sq();
            if speed_sq > max_speed_sq {
                velocity *= config.max_speed / speed_sq.sqrt();
            }
            if !velocity.x.is_finite() || !velocity.y.is_finite() {
                velocity = Vec2::ZERO;
            }

            node.velocity = velocity;
            node.position += velocity * config.time_step;
            if velocity.length_sq() > 0.0001 {
                moving = true;
            }
        }

        moving
    }
}
