use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    pub max_nodes: usize,
    pub initial_nodes: usize,
    /// Connect freshly fetched neighbors that already exist with a plain
    /// (non parent-child) edge instead of skipping them.
    pub link_existing: bool,
    pub debounce_ms: u64,
    pub double_click_ms: u64,
    pub drag_threshold: f32,
    pub physics: PhysicsConfig,
    pub layout: LayoutConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_nodes: 200,
            initial_nodes: 40,
            link_existing: false,
            debounce_ms: 500,
            double_click_ms: 300,
            drag_threshold: 4.0,
            physics: PhysicsConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub iterations: usize,
    pub damping: f32,
    pub repulsion: f32,
    pub spring: f32,
    pub rest_length: f32,
    pub time_step: f32,
    /// Smallest distance used in the inverse-square law.
    pub min_distance: f32,
    pub max_speed: f32,
    /// Node count above which repulsion switches to the Barnes-Hut quadtree.
    pub barnes_hut_threshold: usize,
    pub barnes_hut_theta: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            damping: 0.9,
            repulsion: 9_000.0,
            spring: 0.04,
            rest_length: 70.0,
            time_step: 0.1,
            min_distance: 4.0,
            max_speed: 240.0,
            barnes_hut_threshold: 400,
            barnes_hut_theta: 0.72,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub radius_step: f32,
    pub grid_spacing: f32,
    /// Fraction of the remaining distance covered per frame by the animated
    /// radial and grid layouts.
    pub smoothing: f32,
    pub projection: ProjectionConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius_step: 120.0,
            grid_spacing: 80.0,
            smoothing: 0.12,
            projection: ProjectionConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProjectionConfig {
    pub base_scale: f32,
    pub min_scale: f32,
    pub log_growth: f32,
    pub umap_neighbors: usize,
    pub umap_epochs: usize,
    pub umap_min_dist: f32,
    pub seed: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            base_scale: 220.0,
            min_scale: 180.0,
            log_growth: 0.35,
            umap_neighbors: 15,
            umap_epochs: 200,
            umap_min_dist: 0.1,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ExplorerConfig =
            serde_json::from_str(r#"{ "max_nodes": 12, "physics": { "iterations": 3 } }"#)
                .expect("valid config");
        assert_eq!(config.max_nodes, 12);
        assert_eq!(config.physics.iterations, 3);
        assert_eq!(config.physics.damping, PhysicsConfig::default().damping);
        assert_eq!(config.initial_nodes, ExplorerConfig::default().initial_nodes);
    }

    #[test]
    fn load_reports_missing_file() {
        let error = ExplorerConfig::load(Path::new("/nonexistent/explorer.json"))
            .expect_err("missing file");
        assert!(error.to_string().contains("failed to read config file"));
    }
}
