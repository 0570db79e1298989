pub mod camera;
pub mod expand;
pub mod fetch;
pub mod interaction;
pub mod layout;
pub mod physics;
pub mod scene;
pub mod search;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::Pos2;
use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::error::ExplorerError;

pub use camera::Camera;
pub use expand::{AppliedExpansion, ExpandOutcome, ExpansionEngine, ExpansionEvent, FetchPurpose};
pub use fetch::{Neighbor, NeighborFetcher};
pub use interaction::{InteractionController, InteractionEvent, PointerEvent};
pub use layout::{LayoutKind, LayoutManager, SwitchOutcome};
pub use physics::ForceSimulator;
pub use scene::{LineHandle, MemoryScene, PointHandle, Scene};
pub use search::search_nodes;
pub use store::{Edge, EdgeId, ExpansionState, GraphStore, Node, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Notice,
    Error,
}

/// Dismissible message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    fn from_error(error: &ExplorerError) -> Self {
        let level = if error.is_notice() {
            StatusLevel::Notice
        } else {
            StatusLevel::Error
        };
        Self {
            level,
            message: error.to_string(),
        }
    }
}

/// Hovered node plus its direct neighbors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub node: NodeId,
    pub neighbors: Vec<NodeId>,
}

impl Highlight {
    pub fn contains(&self, id: NodeId) -> bool {
        self.node == id || self.neighbors.contains(&id)
    }
}

/// Owns every explorer component and keeps the scene in step with the graph.
pub struct GraphExplorer<S: Scene> {
    config: ExplorerConfig,
    store: GraphStore,
    engine: ExpansionEngine,
    layout: LayoutManager,
    simulator: ForceSimulator,
    camera: Camera,
    interaction: InteractionController,
    scene: S,
    node_by_point: HashMap<PointHandle, NodeId>,
    root: Option<(String, Option<Vec<f32>>)>,
    selected: Option<NodeId>,
    highlight: Option<Highlight>,
    tooltip: Option<Pos2>,
    status: Option<Status>,
    lines_visible: bool,
}

impl<S: Scene> GraphExplorer<S> {
    pub fn new(config: ExplorerConfig, fetcher: Arc<dyn NeighborFetcher>, scene: S) -> Self {
        Self {
            engine: ExpansionEngine::new(fetcher, &config),
            layout: LayoutManager::new(&config),
            simulator: ForceSimulator::new(config.physics),
            interaction: InteractionController::new(&config),
            camera: Camera::default(),
            store: GraphStore::new(),
            scene,
            node_by_point: HashMap::new(),
            root: None,
            selected: None,
            highlight: None,
            tooltip: None,
            status: None,
            lines_visible: true,
            config,
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.layout.active()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.layout.root()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.interaction.hovered()
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// Screen position for the hover tooltip.
    pub fn tooltip(&self) -> Option<Pos2> {
        self.tooltip
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn dismiss_status(&mut self) {
        self.status = None;
    }

    pub fn lines_visible(&self) -> bool {
        self.lines_visible
    }

    pub fn is_busy(&self) -> bool {
        self.engine.is_busy() || self.layout.is_projecting()
    }

    pub fn is_auto_expanding(&self) -> bool {
        self.engine.is_auto_expanding()
    }

    pub fn is_fetching(&self, node: NodeId) -> bool {
        self.engine.pending_node() == Some(node)
    }

    pub fn node_for_point(&self, handle: PointHandle) -> Option<NodeId> {
        self.node_by_point.get(&handle).copied()
    }

    fn report(&mut self, error: &ExplorerError) {
        if error.is_notice() {
            info!(%error, "explorer notice");
        } else {
            warn!(%error, "explorer error");
        }
        self.status = Some(Status::from_error(error));
    }

    /// Seeds the graph with `element` and starts the initial auto-expansion.
    pub fn start(
        &mut self,
        element: &str,
        vector: Option<Vec<f32>>,
    ) -> Result<NodeId, ExplorerError> {
        let element = element.trim();
        if element.is_empty() {
            let error = ExplorerError::InvalidInput("root element is empty".to_owned());
            self.report(&error);
            return Err(error);
        }

        self.clear();
        let vector = vector.filter(|vector| !vector.is_empty());
        self.root = Some((element.to_owned(), vector.clone()));
        let Some(root) = self.store.add_node(element, vector, None) else {
            let error = ExplorerError::InvalidInput(format!("cannot create root '{element}'"));
            self.report(&error);
            return Err(error);
        };
        self.layout.set_root(Some(root));
        self.sync_scene();

        info!(%element, target = self.config.initial_nodes, "exploration started");
        if let Err(error) =
            self.engine
                .start_auto_expansion(&mut self.store, root, self.config.initial_nodes)
        {
            self.report(&error);
            return Err(error);
        }
        Ok(root)
    }

    /// Clears the graph and rebuilds it from the same root element.
    pub fn reset(&mut self) -> Result<Option<NodeId>, ExplorerError> {
        info!("explorer reset");
        match self.root.clone() {
            Some((element, vector)) => self.start(&element, vector).map(Some),
            None => {
                self.clear();
                Ok(None)
            }
        }
    }

    fn clear(&mut self) {
        for edge in self.store.edges_mut() {
            if let Some(line) = edge.line.take() {
                self.scene.remove_line(line);
            }
        }
        for node in self.store.nodes_mut() {
            if let Some(point) = node.point.take() {
                self.scene.remove_point(point);
            }
        }
        self.node_by_point.clear();
        self.store.reset();
        self.engine.reset();
        self.layout.reset();
        self.interaction.reset();
        self.camera.auto_fit = true;
        self.selected = None;
        self.highlight = None;
        self.tooltip = None;
        self.status = None;
    }

    /// Per-frame update: applies finished background work, advances the
    /// active layout, mirrors the graph into the scene and refits the camera.
    /// Returns whether anything may still change on the next frame.
    pub fn frame(&mut self) -> bool {
        let events = self.engine.poll(&mut self.store);
        self.process_expansion_events(events);

        if let Some(result) = self.layout.poll_projection(&mut self.store, self.camera.aspect()) {
            self.process_projection(result);
        }

        let moved = self.layout.frame(
            &mut self.store,
            &mut self.simulator,
            self.engine.is_auto_expanding(),
        );
        self.sync_scene();
        self.refit_camera();

        moved || self.is_busy()
    }

    /// Drives background work to completion on the calling thread. Returns
    /// false if `timeout` elapsed first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let events = self.engine.wait_idle(&mut self.store, remaining);
            self.process_expansion_events(events);

            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Some(result) =
                self.layout
                    .wait_projection(&mut self.store, self.camera.aspect(), remaining)
            {
                self.process_projection(result);
            }
            self.sync_scene();

            if !self.is_busy() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    fn process_expansion_events(&mut self, events: Vec<ExpansionEvent>) {
        for event in events {
            match event {
                ExpansionEvent::Applied { purpose, expansion } => {
                    if expansion.budget_hit {
                        self.report(&ExplorerError::BudgetExceeded {
                            max_nodes: self.engine.max_nodes(),
                        });
                    }
                    if purpose != FetchPurpose::Auto && !expansion.added_nodes.is_empty() {
                        self.store.refresh_edge_visibility(self.lines_visible);
                        self.layout.graph_changed(&self.store);
                    }
                }
                ExpansionEvent::Failed { error, .. } => self.report(&error),
                ExpansionEvent::AutoExpansionFinished { nodes } => {
                    debug!(nodes, "applying layout after auto-expansion");
                    self.store.refresh_edge_visibility(self.lines_visible);
                    if let Err(error) = self.layout.apply(&self.store) {
                        self.report(&error);
                    }
                }
            }
        }
    }

    fn process_projection(&mut self, result: Result<usize, ExplorerError>) {
        match result {
            Ok(_) => self.camera.auto_fit = true,
            Err(error) => self.report(&error),
        }
    }

    fn refit_camera(&mut self) {
        if self.camera.auto_fit
            && let Some(bounds) = self.store.bounding_box()
        {
            self.camera.fit_to(bounds, self.config.layout.smoothing);
        }
        self.scene.set_camera_extent(&self.camera);
    }

    /// Mirrors node visibility and positions into scene points, then edge
    /// visibility into scene lines.
    fn sync_scene(&mut self) {
        self.store.refresh_edge_visibility(self.lines_visible);

        for index in 0..self.store.len() {
            let id = NodeId(index);
            let node = &mut self.store.nodes_mut()[index];
            match (node.visible, node.point) {
                (true, None) => {
                    let handle = self.scene.add_point(node.position);
                    node.point = Some(handle);
                    self.node_by_point.insert(handle, id);
                }
                (true, Some(handle)) => self.scene.move_point(handle, node.position),
                (false, Some(handle)) => {
                    self.scene.remove_point(handle);
                    self.node_by_point.remove(&handle);
                    node.point = None;
                }
                (false, None) => {}
            }
        }

        for index in 0..self.store.edge_count() {
            let edge = &self.store.edges()[index];
            let endpoints = (
                self.store.nodes()[edge.source.0].point,
                self.store.nodes()[edge.target.0].point,
            );
            let strength = edge.strength;
            let shown = edge.visible;
            let line = edge.line;

            match (shown, endpoints, line) {
                (true, (Some(from), Some(to)), None) => {
                    let handle = self.scene.add_line(from, to, strength);
                    self.store.edges_mut()[index].line = Some(handle);
                }
                (false, _, Some(handle)) | (true, (None, _) | (_, None), Some(handle)) => {
                    self.scene.remove_line(handle);
                    self.store.edges_mut()[index].line = None;
                }
                _ => {}
            }
        }
    }

    pub fn set_viewport(&mut self, size: eframe::egui::Vec2) {
        self.camera.set_viewport(size);
        self.scene.set_camera_extent(&self.camera);
    }

    pub fn set_lines_visible(&mut self, visible: bool) {
        self.lines_visible = visible;
        self.sync_scene();
    }

    /// Restores a layout choice; it takes effect once the initial
    /// auto-expansion finishes.
    pub fn preselect_layout(&mut self, kind: LayoutKind) {
        self.layout.preselect(kind);
    }

    pub fn set_layout(
        &mut self,
        kind: LayoutKind,
        now: Instant,
    ) -> Result<SwitchOutcome, ExplorerError> {
        match self.layout.switch_to(kind, now, &self.store) {
            Ok(outcome) => {
                if outcome == SwitchOutcome::Applied {
                    self.camera.auto_fit = true;
                }
                Ok(outcome)
            }
            Err(error) => {
                self.report(&error);
                Err(error)
            }
        }
    }

    /// Re-anchors radial and projection layouts on `node`.
    pub fn recenter(&mut self, node: NodeId) {
        self.layout.recenter(&mut self.store, node);
        self.camera.auto_fit = true;
        self.sync_scene();
    }

    pub fn select(&mut self, node: Option<NodeId>) {
        self.selected = node.filter(|id| self.store.node(*id).is_some_and(|node| node.visible));
    }

    /// Selects `node` and centres the camera on it.
    pub fn focus(&mut self, node: NodeId) {
        let Some(position) = self.store.node(node).filter(|node| node.visible).map(|node| node.position)
        else {
            return;
        };
        self.selected = Some(node);
        self.camera.center = position;
        self.camera.auto_fit = false;
        self.scene.set_camera_extent(&self.camera);
    }

    pub fn expand(&mut self, node: NodeId) -> Result<ExpandOutcome, ExplorerError> {
        match self.engine.expand(&mut self.store, node) {
            Ok(outcome) => {
                if let ExpandOutcome::Reopened(shown) = &outcome {
                    debug!(node = node.0, shown = shown.len(), "reopened without fetch");
                    self.layout.graph_changed(&self.store);
                    self.sync_scene();
                }
                Ok(outcome)
            }
            Err(error) => {
                self.report(&error);
                Err(error)
            }
        }
    }

    pub fn refresh(&mut self, node: NodeId) -> Result<(), ExplorerError> {
        let result = self.engine.refresh(&mut self.store, node);
        match &result {
            Ok(()) => self.sync_scene(),
            Err(error) => self.report(error),
        }
        result
    }

    pub fn collapse(&mut self, node: NodeId) -> Vec<NodeId> {
        let hidden = ExpansionEngine::collapse(&mut self.store, node);
        if hidden.is_empty() {
            return hidden;
        }
        if self.selected.is_some_and(|selected| hidden.contains(&selected)) {
            self.selected = None;
        }
        if self
            .highlight
            .as_ref()
            .is_some_and(|highlight| hidden.contains(&highlight.node))
        {
            self.highlight = None;
            self.tooltip = None;
        }
        self.layout.graph_changed(&self.store);
        self.sync_scene();
        hidden
    }

    /// Collapses an expanded node and reopens a collapsed one.
    pub fn toggle_collapse(&mut self, node: NodeId) -> Result<(), ExplorerError> {
        match self.store.node(node).map(|entry| entry.expansion) {
            Some(ExpansionState::Expanded) => {
                self.collapse(node);
                Ok(())
            }
            Some(ExpansionState::Collapsed) => self.expand(node).map(|_| ()),
            Some(ExpansionState::NotExpanded) => Ok(()),
            None => {
                let error = ExplorerError::InvalidInput(format!("unknown node {}", node.0));
                self.report(&error);
                Err(error)
            }
        }
    }

    fn highlight_for(&self, node: NodeId) -> Highlight {
        let mut neighbors = self
            .store
            .neighbors(node)
            .filter(|id| self.store.nodes()[id.0].visible)
            .collect::<Vec<_>>();
        neighbors.sort();
        neighbors.dedup();
        Highlight { node, neighbors }
    }

    fn pick(&self, pos: Pos2) -> Option<NodeId> {
        self.scene
            .pick(pos)
            .and_then(|handle| self.node_for_point(handle))
            .filter(|id| self.store.nodes()[id.0].visible)
    }

    /// Feeds one pointer event through the interaction state machine and acts
    /// on the resulting intents.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Vec<InteractionEvent> {
        let (picked, pointer) = match event {
            PointerEvent::Move { pos }
            | PointerEvent::Down { pos, .. }
            | PointerEvent::Up { pos, .. } => (self.pick(pos), Some(pos)),
            PointerEvent::Wheel { .. } => (self.interaction.hovered(), None),
            PointerEvent::Leave => (None, None),
        };

        let intents = self.interaction.handle(event, picked, now);
        for intent in &intents {
            match *intent {
                InteractionEvent::HoverEnter(node) => {
                    self.highlight = Some(self.highlight_for(node));
                    self.tooltip = pointer;
                }
                InteractionEvent::HoverLeave(node) => {
                    if self.highlight.as_ref().is_some_and(|highlight| highlight.node == node) {
                        self.highlight = None;
                        self.tooltip = None;
                    }
                }
                InteractionEvent::Click(node) => {
                    self.selected = Some(node);
                    let expanded = self
                        .store
                        .node(node)
                        .is_some_and(|entry| entry.expansion == ExpansionState::Expanded);
                    if !expanded {
                        let _ = self.expand(node);
                    }
                }
                InteractionEvent::DoubleClick(node) => {
                    self.selected = Some(node);
                    let _ = self.refresh(node);
                }
                InteractionEvent::SecondaryClick(node) => {
                    let _ = self.toggle_collapse(node);
                }
                InteractionEvent::ClickEmpty => self.selected = None,
                InteractionEvent::Pan(delta) => {
                    self.camera.pan_by_pixels(delta);
                }
                InteractionEvent::Zoom(delta) => {
                    self.camera.zoom_by_wheel(delta);
                }
            }
        }

        if self.highlight.is_some()
            && let PointerEvent::Move { pos } = event
        {
            self.tooltip = Some(pos);
        }
        self.scene.set_camera_extent(&self.camera);
        intents
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{PointerButton, vec2};

    use super::*;
    use crate::error::FetchError;

    const WAIT: Duration = Duration::from_secs(5);

    fn star_fetcher() -> Arc<dyn NeighborFetcher> {
        Arc::new(|element: &str, count: usize| -> Result<Vec<Neighbor>, FetchError> {
            let neighbors = match element {
                "hub" => vec![
                    Neighbor::new("left", 0.9),
                    Neighbor::new("right", 0.8),
                ],
                _ => Vec::new(),
            };
            Ok(neighbors.into_iter().take(count).collect())
        })
    }

    fn explorer() -> GraphExplorer<MemoryScene> {
        let config = ExplorerConfig {
            initial_nodes: 1,
            ..ExplorerConfig::default()
        };
        GraphExplorer::new(config, star_fetcher(), MemoryScene::new())
    }

    #[test]
    fn scene_mirrors_visible_graph() {
        let mut explorer = explorer();
        let root = explorer.start("hub", None).expect("start");
        assert!(explorer.wait_idle(WAIT));
        assert_eq!(explorer.scene().points.len(), 1);

        explorer.expand(root).expect("expand");
        assert!(explorer.wait_idle(WAIT));
        assert_eq!(explorer.scene().points.len(), 3);
        assert_eq!(explorer.scene().lines.len(), 2);

        explorer.set_lines_visible(false);
        assert!(explorer.scene().lines.is_empty());
        explorer.set_lines_visible(true);
        assert_eq!(explorer.scene().lines.len(), 2);

        explorer.collapse(root);
        assert_eq!(explorer.scene().points.len(), 1);
        assert!(explorer.scene().lines.is_empty());
    }

    #[test]
    fn empty_root_is_rejected_with_error_status() {
        let mut explorer = explorer();
        assert!(matches!(explorer.start("  ", None), Err(ExplorerError::InvalidInput(_))));
        assert_eq!(explorer.status().map(|status| status.level), Some(StatusLevel::Error));
        explorer.dismiss_status();
        assert!(explorer.status().is_none());
    }

    #[test]
    fn clicking_a_point_expands_and_hover_highlights() {
        let mut explorer = explorer();
        explorer.set_viewport(vec2(400.0, 400.0));
        explorer.start("hub", None).expect("start");
        assert!(explorer.wait_idle(WAIT));
        explorer.frame();

        let screen = explorer.camera().world_to_screen(explorer.store().nodes()[0].position);
        let now = Instant::now();
        let events = explorer.handle_pointer(PointerEvent::Move { pos: screen }, now);
        assert_eq!(events, vec![InteractionEvent::HoverEnter(NodeId(0))]);
        assert_eq!(explorer.tooltip(), Some(screen));

        let button = PointerButton::Primary;
        explorer.handle_pointer(PointerEvent::Down { pos: screen, button }, now);
        explorer.handle_pointer(PointerEvent::Up { pos: screen, button }, now);
        assert_eq!(explorer.selected(), Some(NodeId(0)));
        assert!(explorer.wait_idle(WAIT));
        assert_eq!(explorer.store().len(), 3);

        let highlight = explorer.highlight_for(NodeId(0));
        assert_eq!(highlight.neighbors, vec![NodeId(1), NodeId(2)]);
    }

    #[test]
    fn manual_zoom_turns_off_auto_fit_until_layout_switch() {
        let mut explorer = explorer();
        explorer.start("hub", None).expect("start");
        assert!(explorer.wait_idle(WAIT));

        explorer.handle_pointer(PointerEvent::Wheel { delta: 120.0 }, Instant::now());
        assert!(!explorer.camera().auto_fit);

        explorer
            .set_layout(LayoutKind::Grid, Instant::now())
            .expect("switch");
        assert!(explorer.camera().auto_fit);
    }

    #[test]
    fn double_click_on_expanded_node_fetches_again() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let fetcher: Arc<dyn NeighborFetcher> =
            Arc::new(move |element: &str, count: usize| -> Result<Vec<Neighbor>, FetchError> {
                counter.fetch_add(1, Ordering::SeqCst);
                let neighbors = match element {
                    "hub" => vec![Neighbor::new("left", 0.9), Neighbor::new("right", 0.8)],
                    _ => Vec::new(),
                };
                Ok(neighbors.into_iter().take(count).collect())
            });
        let config = ExplorerConfig {
            initial_nodes: 3,
            ..ExplorerConfig::default()
        };
        let mut explorer = GraphExplorer::new(config, fetcher, MemoryScene::new());
        explorer.set_viewport(vec2(400.0, 400.0));
        let root = explorer.start("hub", None).expect("start");
        assert!(explorer.wait_idle(WAIT));
        explorer.frame();
        assert_eq!(explorer.store().nodes()[root.0].expansion, ExpansionState::Expanded);
        let before = fetches.load(Ordering::SeqCst);

        let screen = explorer.camera().world_to_screen(explorer.store().nodes()[root.0].position);
        let now = Instant::now();
        let button = PointerButton::Primary;
        let mut intents = Vec::new();
        for _ in 0..2 {
            intents.extend(explorer.handle_pointer(PointerEvent::Down { pos: screen, button }, now));
            intents.extend(explorer.handle_pointer(PointerEvent::Up { pos: screen, button }, now));
        }
        assert!(intents.contains(&InteractionEvent::Click(root)));
        assert!(intents.contains(&InteractionEvent::DoubleClick(root)));

        assert!(explorer.wait_idle(WAIT));
        assert_eq!(fetches.load(Ordering::SeqCst), before + 1);
        assert_eq!(explorer.store().len(), 3);
        assert_eq!(explorer.selected(), Some(root));
    }

    #[test]
    fn toggling_an_unknown_node_reports_an_error() {
        let mut explorer = explorer();
        explorer.start("hub", None).expect("start");
        assert!(explorer.wait_idle(WAIT));

        let result = explorer.toggle_collapse(NodeId(99));
        assert!(matches!(result, Err(ExplorerError::InvalidInput(_))));
        assert_eq!(explorer.status().map(|status| status.level), Some(StatusLevel::Error));
    }
}
