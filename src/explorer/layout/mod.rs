mod grid;
mod projection;
mod radial;

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::Vec2;
use tracing::{debug, info, warn};

use crate::config::{ExplorerConfig, LayoutConfig};
use crate::error::{ExplorerError, ProjectionError};

use super::physics::ForceSimulator;
use super::store::{GraphStore, NodeId};
use projection::{ProjectionResult, collect_vectors, spawn_projection};

pub use projection::{ProjectionMethod, normalize, projection_scale};

const SNAP_DISTANCE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayoutKind {
    #[default]
    Force,
    Radial,
    Grid,
    Pca,
    Umap,
}

impl LayoutKind {
    pub const ALL: [Self; 5] = [Self::Force, Self::Radial, Self::Grid, Self::Pca, Self::Umap];

    pub fn label(self) -> &'static str {
        match self {
            Self::Force => "Force",
            Self::Radial => "Radial",
            Self::Grid => "Grid",
            Self::Pca => "PCA",
            Self::Umap => "UMAP",
        }
    }

    /// Stable identifier used in preference files.
    pub fn key(self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Radial => "radial",
            Self::Grid => "grid",
            Self::Pca => "pca",
            Self::Umap => "umap",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn projection(self) -> Option<ProjectionMethod> {
        match self {
            Self::Pca => Some(ProjectionMethod::Pca),
            Self::Umap => Some(ProjectionMethod::Umap),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied,
    /// Dropped because the previous switch was too recent.
    Debounced,
}

struct PendingProjection {
    method: ProjectionMethod,
    nodes: Vec<NodeId>,
    receiver: Receiver<ProjectionResult>,
}

/// Owns the active layout strategy and whatever state it needs between
/// frames: lerp targets for radial/grid and the in-flight projection.
pub struct LayoutManager {
    config: LayoutConfig,
    debounce: Duration,
    active: LayoutKind,
    last_switch: Option<Instant>,
    root: Option<NodeId>,
    targets: Vec<Option<Vec2>>,
    pending: Option<PendingProjection>,
}

impl LayoutManager {
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            config: config.layout.clone(),
            debounce: config.debounce(),
            active: LayoutKind::Force,
            last_switch: None,
            root: None,
            targets: Vec::new(),
            pending: None,
        }
    }

    pub fn active(&self) -> LayoutKind {
        self.active
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Selects `kind` without applying it or touching the debounce clock.
    /// Used to restore a saved layout before any graph exists.
    pub fn preselect(&mut self, kind: LayoutKind) {
        self.active = kind;
    }

    pub fn is_projecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops every piece of per-graph state; the active kind survives.
    pub fn reset(&mut self) {
        self.root = None;
        self.targets.clear();
        self.last_switch = None;
        if self.pending.take().is_some() {
            debug!("in-flight projection abandoned by reset");
        }
    }

    pub fn switch_to(
        &mut self,
        kind: LayoutKind,
        now: Instant,
        store: &GraphStore,
    ) -> Result<SwitchOutcome, ExplorerError> {
        if let Some(last) = self.last_switch
            && now.saturating_duration_since(last) < self.debounce
        {
            debug!(requested = kind.label(), active = self.active.label(), "layout switch debounced");
            return Ok(SwitchOutcome::Debounced);
        }

        // The running projection keeps the layout it was started for.
        if kind.projection().is_some() && self.pending.is_some() {
            debug!(
                requested = kind.label(),
                active = self.active.label(),
                "projection busy; switch ignored"
            );
            return Err(ExplorerError::Busy("projection"));
        }

        let previous = (self.active, self.last_switch);
        self.last_switch = Some(now);
        self.active = kind;
        if kind.projection().is_none() && self.pending.take().is_some() {
            debug!(layout = kind.label(), "in-flight projection abandoned by layout switch");
        }
        if let Err(error) = self.apply(store) {
            (self.active, self.last_switch) = previous;
            warn!(requested = kind.label(), restored = self.active.label(), "layout switch failed");
            return Err(error);
        }
        info!(layout = kind.label(), "layout switched");
        Ok(SwitchOutcome::Applied)
    }

    /// Recomputes the active strategy's targets (or starts a projection).
    pub fn apply(&mut self, store: &GraphStore) -> Result<(), ExplorerError> {
        match self.active {
            LayoutKind::Force => self.targets.clear(),
            LayoutKind::Radial => {
                self.targets = radial::radial_targets(store, self.root, self.config.radius_step);
            }
            LayoutKind::Grid => {
                self.targets = grid::grid_targets(store, self.config.grid_spacing);
            }
            LayoutKind::Pca | LayoutKind::Umap => {
                if let Some(method) = self.active.projection() {
                    self.start_projection(store, method)?;
                }
            }
        }
        Ok(())
    }

    /// Keeps animated targets in step with a graph that grew or changed
    /// visibility. Projections are left alone; they apply once.
    pub fn graph_changed(&mut self, store: &GraphStore) {
        match self.active {
            LayoutKind::Radial => {
                self.targets = radial::radial_targets(store, self.root, self.config.radius_step);
            }
            LayoutKind::Grid => {
                self.targets = grid::grid_targets(store, self.config.grid_spacing);
            }
            _ => {}
        }
    }

    fn start_projection(
        &mut self,
        store: &GraphStore,
        method: ProjectionMethod,
    ) -> Result<(), ExplorerError> {
        if self.pending.is_some() {
            debug!(?method, "projection already running; request ignored");
            return Err(ExplorerError::Busy("projection"));
        }

        let (nodes, vectors) = collect_vectors(store);
        if vectors.len() < 2 {
            warn!(?method, found = vectors.len(), "not enough vectors to project");
            return Err(ProjectionError::NotEnoughVectors {
                found: vectors.len(),
            }
            .into());
        }

        info!(?method, nodes = nodes.len(), "projection started");
        let receiver = spawn_projection(method, vectors, self.config.projection.clone());
        self.pending = Some(PendingProjection {
            method,
            nodes,
            receiver,
        });
        Ok(())
    }

    /// Advances the active layout by one frame. Returns whether any position
    /// changed.
    pub fn frame(
        &mut self,
        store: &mut GraphStore,
        simulator: &mut ForceSimulator,
        physics_suspended: bool,
    ) -> bool {
        match self.active {
            LayoutKind::Force if !physics_suspended => simulator.step_frame(store),
            LayoutKind::Radial | LayoutKind::Grid => self.animate(store),
            _ => false,
        }
    }

    fn animate(&mut self, store: &mut GraphStore) -> bool {
        let smoothing = self.config.smoothing.clamp(0.01, 1.0);
        let mut moved = false;
        for (node, target) in store.nodes_mut().iter_mut().zip(&self.targets) {
            let Some(target) = target else {
                continue;
            };
            if !node.visible {
                continue;
            }

            let delta = *target - node.position;
            if delta == Vec2::ZERO {
                continue;
            }
            node.velocity = Vec2::ZERO;
            if delta.length() <= SNAP_DISTANCE {
                node.position = *target;
            } else {
                node.position += delta * smoothing;
            }
            moved = true;
        }
        moved
    }

    /// Applies a finished projection. `Some(Ok(n))` reports how many nodes
    /// were placed.
    pub fn poll_projection(
        &mut self,
        store: &mut GraphStore,
        aspect: f32,
    ) -> Option<Result<usize, ExplorerError>> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ProjectionError::Disconnected),
        };
        let pending = self.pending.take()?;

        let coords = match result {
            Ok(coords) => coords,
            Err(error) => {
                warn!(method = ?pending.method, %error, "projection failed");
                return Some(Err(error.into()));
            }
        };
        if self.active.projection() != Some(pending.method) {
            debug!(method = ?pending.method, "projection result discarded; layout changed");
            return Some(Ok(0));
        }

        let scale = projection_scale(coords.len(), &self.config.projection);
        let placed = normalize(&coords, aspect, scale);
        for (id, position) in pending.nodes.iter().zip(placed) {
            if let Some(node) = store.node_mut(*id) {
                node.position = position;
                node.velocity = Vec2::ZERO;
            }
        }
        info!(method = ?pending.method, nodes = pending.nodes.len(), scale, "projection applied");
        Some(Ok(pending.nodes.len()))
    }

    /// Blocks until the in-flight projection lands or `timeout` passes.
    pub fn wait_projection(
        &mut self,
        store: &mut GraphStore,
        aspect: f32,
        timeout: Duration,
    ) -> Option<Result<usize, ExplorerError>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(result) = self.poll_projection(store, aspect) {
                return Some(result);
            }
            if self.pending.is_none() || Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Re-anchors the layout on `root`: radial rings are rebuilt around it and
    /// a projection is translated so it sits at the origin.
    pub fn recenter(&mut self, store: &mut GraphStore, root: NodeId) {
        if store.node(root).is_none() {
            return;
        }
        self.root = Some(root);

        match self.active {
            LayoutKind::Radial => {
                self.targets = radial::radial_targets(store, self.root, self.config.radius_step);
            }
            LayoutKind::Pca | LayoutKind::Umap => {
                let offset = store.nodes()[root.0].position;
                for node in store.nodes_mut() {
                    node.position -= offset;
                }
                debug!(root = root.0, "projection re-anchored");
            }
            LayoutKind::Force | LayoutKind::Grid => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use eframe::egui::vec2;

    use super::*;
    use crate::config::PhysicsConfig;

    const WAIT: Duration = Duration::from_secs(10);

    fn manager() -> LayoutManager {
        LayoutManager::new(&ExplorerConfig::default())
    }

    fn store_with_vectors(count: usize) -> GraphStore {
        let mut store = GraphStore::new();
        let root = store.add_node("n0", Some(vec![1.0, 0.0, 0.0]), None);
        for index in 1..count {
            let angle = index as f32;
            let vector = vec![angle.cos(), angle.sin(), index as f32 * 0.1];
            let child = store.add_node(&format!("n{index}"), Some(vector), root);
            if let (Some(root), Some(child)) = (root, child) {
                store.add_edge(root, child, 0.5);
            }
        }
        store
    }

    #[test]
    fn keys_round_trip_through_preferences() {
        for kind in LayoutKind::ALL {
            assert_eq!(LayoutKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(LayoutKind::from_key("spiral"), None);
    }

    #[test]
    fn rapid_second_switch_is_debounced() {
        let store = store_with_vectors(3);
        let mut layout = manager();
        let start = Instant::now();

        assert_eq!(
            layout.switch_to(LayoutKind::Radial, start, &store).expect("switch"),
            SwitchOutcome::Applied
        );
        assert_eq!(
            layout
                .switch_to(LayoutKind::Grid, start + Duration::from_millis(100), &store)
                .expect("switch"),
            SwitchOutcome::Debounced
        );
        assert_eq!(layout.active(), LayoutKind::Radial);

        assert_eq!(
            layout
                .switch_to(LayoutKind::Grid, start + Duration::from_millis(600), &store)
                .expect("switch"),
            SwitchOutcome::Applied
        );
        assert_eq!(layout.active(), LayoutKind::Grid);
    }

    #[test]
    fn radial_animation_converges_on_targets() {
        let mut store = store_with_vectors(5);
        let mut layout = manager();
        let mut simulator = ForceSimulator::new(PhysicsConfig::default());
        layout
            .switch_to(LayoutKind::Radial, Instant::now(), &store)
            .expect("switch");

        for _ in 0..200 {
            layout.frame(&mut store, &mut simulator, false);
        }
        assert_eq!(store.nodes()[0].position, Vec2::ZERO);
        for node in &store.nodes()[1..] {
            assert_relative_eq!(node.position.length(), 120.0, epsilon = 1e-3);
        }
        assert!(!layout.frame(&mut store, &mut simulator, false));
    }

    #[test]
    fn force_layout_pauses_while_suspended() {
        let mut store = store_with_vectors(3);
        let mut layout = manager();
        let mut simulator = ForceSimulator::new(PhysicsConfig::default());
        let before = store.nodes().iter().map(|node| node.position).collect::<Vec<_>>();

        assert!(!layout.frame(&mut store, &mut simulator, true));
        let after = store.nodes().iter().map(|node| node.position).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn single_vector_projection_fails_without_moving_anything() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", Some(vec![1.0, 2.0]), None);
        store.add_node("b", None, a);
        if let Some(node) = store.node_mut(NodeId(1)) {
            node.position = vec2(13.0, 7.0);
        }

        let mut layout = manager();
        let error = layout
            .switch_to(LayoutKind::Pca, Instant::now(), &store)
            .expect_err("one vector");
        assert!(matches!(
            error,
            ExplorerError::ProjectionFailure(ProjectionError::NotEnoughVectors { found: 1 })
        ));
        assert!(!layout.is_projecting());
        assert_eq!(store.nodes()[1].position, vec2(13.0, 7.0));
    }

    #[test]
    fn projection_lands_inside_scaled_box() {
        let mut store = store_with_vectors(12);
        let mut layout = manager();
        layout
            .switch_to(LayoutKind::Pca, Instant::now(), &store)
            .expect("switch");
        assert!(layout.is_projecting());

        let placed = layout
            .wait_projection(&mut store, 1.6, WAIT)
            .expect("finished")
            .expect("projected");
        assert_eq!(placed, 12);
        assert!(!layout.is_projecting());

        let scale = projection_scale(12, &ExplorerConfig::default().layout.projection);
        for node in store.nodes() {
            assert!(node.position.x.abs() <= scale + 1e-3);
            assert!(node.position.y.abs() <= scale / 1.6 + 1e-3);
        }
    }

    #[test]
    fn second_projection_request_is_ignored_while_running() {
        let store = store_with_vectors(6);
        let mut layout = manager();
        layout
            .switch_to(LayoutKind::Umap, Instant::now(), &store)
            .expect("switch");
        let error = layout.apply(&store).expect_err("busy");
        assert!(error.is_notice());
    }

    #[test]
    fn recenter_translates_projection() {
        let mut store = store_with_vectors(6);
        let mut layout = manager();
        layout
            .switch_to(LayoutKind::Pca, Instant::now(), &store)
            .expect("switch");
        layout
            .wait_projection(&mut store, 1.0, WAIT)
            .expect("finished")
            .expect("projected");

        let before = store.nodes()[4].position - store.nodes()[2].position;
        layout.recenter(&mut store, NodeId(2));
        assert_eq!(store.nodes()[2].position, Vec2::ZERO);
        let after = store.nodes()[4].position - store.nodes()[2].position;
        assert_relative_eq!(before.x, after.x, epsilon = 1e-3);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-3);
    }

    #[test]
    fn reset_abandons_pending_projection() {
        let store = store_with_vectors(6);
        let mut layout = manager();
        layout
            .switch_to(LayoutKind::Pca, Instant::now(), &store)
            .expect("switch");
        layout.reset();
        assert!(!layout.is_projecting());
        assert_eq!(layout.active(), LayoutKind::Pca);
    }

    #[test]
    fn projection_switch_while_running_keeps_the_first_projection() {
        let mut store = store_with_vectors(40);
        let mut layout = manager();
        let start = Instant::now();
        let before = store.nodes().iter().map(|node| node.position).collect::<Vec<_>>();

        layout
            .switch_to(LayoutKind::Umap, start, &store)
            .expect("umap");
        let error = layout
            .switch_to(LayoutKind::Pca, start + Duration::from_millis(600), &store)
            .expect_err("busy");
        assert!(matches!(error, ExplorerError::Busy(_)));
        assert_eq!(layout.active(), LayoutKind::Umap);

        let placed = layout
            .wait_projection(&mut store, 1.0, Duration::from_secs(60))
            .expect("finished")
            .expect("projected");
        assert_eq!(placed, 40);
        assert!(!layout.is_projecting());
        let after = store.nodes().iter().map(|node| node.position).collect::<Vec<_>>();
        assert_ne!(before, after);

        // The ignored request did not consume the debounce window.
        assert_eq!(
            layout
                .switch_to(LayoutKind::Pca, start + Duration::from_millis(700), &store)
                .expect("pca"),
            SwitchOutcome::Applied
        );
    }

    #[test]
    fn leaving_a_projection_abandons_it() {
        let mut store = store_with_vectors(6);
        let mut layout = manager();
        let start = Instant::now();
        layout.switch_to(LayoutKind::Pca, start, &store).expect("pca");
        layout
            .switch_to(LayoutKind::Grid, start + Duration::from_millis(600), &store)
            .expect("grid");
        assert!(!layout.is_projecting());
        assert!(layout.wait_projection(&mut store, 1.0, Duration::from_millis(20)).is_none());
    }

    #[test]
    fn failed_projection_switch_restores_previous_layout() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", Some(vec![1.0, 2.0]), None);
        store.add_node("b", None, a);

        let mut layout = manager();
        let start = Instant::now();
        layout.switch_to(LayoutKind::Radial, start, &store).expect("radial");
        layout
            .switch_to(LayoutKind::Umap, start + Duration::from_millis(600), &store)
            .expect_err("one vector");
        assert_eq!(layout.active(), LayoutKind::Radial);

        // The failed attempt did not restart the debounce clock.
        assert_eq!(
            layout
                .switch_to(LayoutKind::Grid, start + Duration::from_millis(700), &store)
                .expect("grid"),
            SwitchOutcome::Applied
        );
    }
}
