use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, FetchError};
use crate::util::stable_direction;

use super::fetch::{FetchResult, Neighbor, NeighborFetcher, spawn_fetch};
use super::store::{EdgeId, ExpansionState, GraphStore, NodeId};

const SPAWN_DISTANCE: f32 = 36.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPurpose {
    Auto,
    Expand,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
    Fetching,
    /// A collapsed node was reopened from already known children.
    Reopened(Vec<NodeId>),
    AlreadyExpanded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedExpansion {
    pub node: Option<NodeId>,
    pub added_nodes: Vec<NodeId>,
    pub added_edges: Vec<EdgeId>,
    pub skipped_existing: usize,
    pub skipped_invalid: usize,
    pub budget_hit: bool,
}

#[derive(Debug)]
pub enum ExpansionEvent {
    Applied {
        purpose: FetchPurpose,
        expansion: AppliedExpansion,
    },
    Failed {
        node: NodeId,
        error: ExplorerError,
    },
    AutoExpansionFinished {
        nodes: usize,
    },
}

struct PendingFetch {
    node: NodeId,
    element: String,
    purpose: FetchPurpose,
    requested: usize,
    generation: u64,
    rx: Receiver<FetchResult>,
}

struct AutoExpansion {
    target: usize,
    queue: VecDeque<NodeId>,
    requested: HashMap<NodeId, usize>,
    /// Nodes whose last fetch returned everything that was asked for, so a
    /// larger request may still turn up unseen neighbors.
    saturated: HashSet<NodeId>,
}

/// Turns neighbor lists into graph mutations under the node budget.
pub struct ExpansionEngine {
    fetcher: Arc<dyn NeighborFetcher>,
    max_nodes: usize,
    link_existing: bool,
    generation: u64,
    pending: Option<PendingFetch>,
    auto: Option<AutoExpansion>,
    events: Vec<ExpansionEvent>,
}

impl ExpansionEngine {
    pub fn new(fetcher: Arc<dyn NeighborFetcher>, config: &ExplorerConfig) -> Self {
        Self {
            fetcher,
            max_nodes: config.max_nodes.max(1),
            link_existing: config.link_existing,
            generation: 0,
            pending: None,
            auto: None,
            events: Vec::new(),
        }
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_auto_expanding(&self) -> bool {
        self.auto.is_some()
    }

    pub fn pending_node(&self) -> Option<NodeId> {
        self.pending.as_ref().map(|pending| pending.node)
    }

    /// Forgets in-flight work. A result that still arrives for an older
    /// generation is dropped instead of being applied to the new graph.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
        self.auto = None;
        self.events.clear();
    }

    pub fn start_auto_expansion(
        &mut self,
        store: &mut GraphStore,
        root: NodeId,
        target: usize,
    ) -> Result<(), ExplorerError> {
        if store.node(root).is_none() {
            return Err(ExplorerError::InvalidInput(format!("unknown root node {}", root.0)));
        }
        if self.pending.is_some() {
            return Err(ExplorerError::Busy("neighbor fetch"));
        }

        let target = target.clamp(1, self.max_nodes);
        info!(root = %store.nodes()[root.0].element, target, "starting auto-expansion");
        self.auto = Some(AutoExpansion {
            target,
            queue: VecDeque::from([root]),
            requested: HashMap::new(),
            saturated: HashSet::new(),
        });
        self.advance_auto(store);
        Ok(())
    }

    pub fn expand(
        &mut self,
        store: &mut GraphStore,
        node: NodeId,
    ) -> Result<ExpandOutcome, ExplorerError> {
        let Some(state) = store.node(node).map(|entry| entry.expansion) else {
            return Err(ExplorerError::InvalidInput(format!("unknown node {}", node.0)));
        };

        match state {
            ExpansionState::Expanded => Ok(ExpandOutcome::AlreadyExpanded),
            ExpansionState::Collapsed => Ok(ExpandOutcome::Reopened(Self::reopen(store, node))),
            ExpansionState::NotExpanded => {
                if self.pending.is_some() {
                    return Err(ExplorerError::Busy("neighbor fetch"));
                }
                let budget = self.remaining_budget(store)?;
                self.request(store, node, FetchPurpose::Expand, budget);
                Ok(ExpandOutcome::Fetching)
            }
        }
    }

    /// Fetches again even when the node is already expanded, asking for enough
    /// neighbors to possibly reach past the ones already shown.
    pub fn refresh(&mut self, store: &mut GraphStore, node: NodeId) -> Result<(), ExplorerError> {
        let Some(state) = store.node(node).map(|entry| entry.expansion) else {
            return Err(ExplorerError::InvalidInput(format!("unknown node {}", node.0)));
        };
        if self.pending.is_some() {
            return Err(ExplorerError::Busy("neighbor fetch"));
        }
        let budget = self.remaining_budget(store)?;

        if state == ExpansionState::Collapsed {
            Self::reopen(store, node);
        }
        let known = store.node(node).map_or(0, |entry| entry.children.len());
        self.request(store, node, FetchPurpose::Refresh, known + budget);
        Ok(())
    }

    /// Hides the node's subtree. Returns the nodes that became invisible.
    pub fn collapse(store: &mut GraphStore, node: NodeId) -> Vec<NodeId> {
        let Some(entry) = store.node_mut(node) else {
            return Vec::new();
        };
        if entry.expansion != ExpansionState::Expanded {
            return Vec::new();
        }
        entry.expansion = ExpansionState::Collapsed;
        entry.cascade_collapsed = false;

        let mut hidden = Vec::new();
        let mut stack = entry.children.clone();
        while let Some(child) = stack.pop() {
            let Some(child_entry) = store.node_mut(child) else {
                continue;
            };
            if child_entry.visible {
                child_entry.visible = false;
                hidden.push(child);
            }
            if child_entry.expansion == ExpansionState::Expanded {
                child_entry.expansion = ExpansionState::Collapsed;
                child_entry.cascade_collapsed = true;
                stack.extend(child_entry.children.iter().copied());
            }
        }

        debug!(node = node.0, hidden = hidden.len(), "collapsed node");
        hidden
    }

    /// Shows the node's children again without fetching. Children that were
    /// collapsed only because of this node's collapse are reopened as well.
    pub fn reopen(store: &mut GraphStore, node: NodeId) -> Vec<NodeId> {
        let mut shown = Vec::new();
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            let Some(entry) = store.node_mut(current) else {
                continue;
            };
            entry.expansion = ExpansionState::Expanded;
            entry.cascade_collapsed = false;
            let children = entry.children.clone();

            for child in children {
                let Some(child_entry) = store.node_mut(child) else {
                    continue;
                };
                if !child_entry.visible {
                    child_entry.visible = true;
                    shown.push(child);
                }
                if child_entry.expansion == ExpansionState::Collapsed
                    && child_entry.cascade_collapsed
                {
                    stack.push(child);
                }
            }
        }

        debug!(node = node.0, shown = shown.len(), "reopened node");
        shown
    }

    pub fn poll(&mut self, store: &mut GraphStore) -> Vec<ExpansionEvent> {
        if let Some(result) = self.receive(None) {
            self.complete(store, result);
        }
        std::mem::take(&mut self.events)
    }

    /// Blocks until no fetch is in flight or `timeout` elapses, applying every
    /// result on the calling thread.
    pub fn wait_idle(&mut self, store: &mut GraphStore, timeout: Duration) -> Vec<ExpansionEvent> {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            match self.receive(Some(deadline)) {
                Some(result) => self.complete(store, result),
                None => break,
            }
        }
        std::mem::take(&mut self.events)
    }

    fn remaining_budget(&self, store: &GraphStore) -> Result<usize, ExplorerError> {
        let budget = self.max_nodes.saturating_sub(store.len());
        if budget == 0 {
            info!(max_nodes = self.max_nodes, "node budget reached");
            return Err(ExplorerError::BudgetExceeded {
                max_nodes: self.max_nodes,
            });
        }
        Ok(budget)
    }

    fn request(&mut self, store: &GraphStore, node: NodeId, purpose: FetchPurpose, count: usize) {
        let element = store.nodes()[node.0].element.clone();
        debug!(%element, count, ?purpose, "requesting neighbors");
        let rx = spawn_fetch(Arc::clone(&self.fetcher), element.clone(), count);
        self.pending = Some(PendingFetch {
            node,
            element,
            purpose,
            requested: count,
            generation: self.generation,
            rx,
        });
    }

    fn receive(&self, deadline: Option<Instant>) -> Option<FetchResult> {
        let pending = self.pending.as_ref()?;
        match deadline {
            None => match pending.rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(FetchError::Disconnected)),
            },
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match pending.rx.recv_timeout(remaining) {
                    Ok(result) => Some(result),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Err(FetchError::Disconnected)),
                }
            }
        }
    }

    fn complete(&mut self, store: &mut GraphStore, result: FetchResult) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.generation != self.generation {
            debug!(element = %pending.element, "discarding neighbors fetched for a previous graph");
            return;
        }

        match result {
            Ok(neighbors) => {
                let returned = neighbors.len();
                let expansion = self.apply_neighbors(store, &pending, neighbors);
                debug!(
                    element = %pending.element,
                    added = expansion.added_nodes.len(),
                    skipped = expansion.skipped_existing,
                    "applied neighbors"
                );

                if pending.purpose == FetchPurpose::Auto
                    && let Some(auto) = self.auto.as_mut()
                {
                    auto.queue.extend(expansion.added_nodes.iter().copied());
                    if returned >= pending.requested {
                        auto.saturated.insert(pending.node);
                    }
                }

                self.events.push(ExpansionEvent::Applied {
                    purpose: pending.purpose,
                    expansion,
                });
            }
            Err(source) => {
                warn!(element = %pending.element, error = %source, "neighbor fetch failed");
                self.events.push(ExpansionEvent::Failed {
                    node: pending.node,
                    error: ExplorerError::FetchFailure {
                        element: pending.element.clone(),
                        source,
                    },
                });
            }
        }

        if self.auto.is_some() {
            self.advance_auto(store);
        }
    }

    fn apply_neighbors(
        &mut self,
        store: &mut GraphStore,
        pending: &PendingFetch,
        mut neighbors: Vec<Neighbor>,
    ) -> AppliedExpansion {
        let mut expansion = AppliedExpansion {
            node: Some(pending.node),
            ..AppliedExpansion::default()
        };
        let Some(origin) = store.node(pending.node) else {
            return expansion;
        };
        let origin_position = origin.position;
        let origin_shown = origin.visible && origin.expansion != ExpansionState::Collapsed;

        let limit = match (&self.auto, pending.purpose) {
            (Some(auto), FetchPurpose::Auto) => auto.target.min(self.max_nodes),
            _ => self.max_nodes,
        };

        neighbors.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        for neighbor in neighbors {
            if neighbor.element.is_empty() || !neighbor.similarity.is_finite() {
                warn!(origin = %pending.element, "skipping invalid neighbor entry");
                expansion.skipped_invalid += 1;
                continue;
            }
            if neighbor.element == pending.element {
                continue;
            }

            if let Some(existing) = store.find_by_element(&neighbor.element) {
                if self.link_existing
                    && let Some(edge) = store.add_edge(pending.node, existing, neighbor.similarity)
                {
                    expansion.added_edges.push(edge);
                }
                expansion.skipped_existing += 1;
                continue;
            }

            if store.len() >= limit {
                expansion.budget_hit = store.len() >= self.max_nodes;
                break;
            }

            let vector = neighbor.vector.filter(|vector| !vector.is_empty());
            let Some(child) = store.add_node(&neighbor.element, vector, Some(pending.node)) else {
                continue;
            };
            let salt = child.0;
            if let Some(entry) = store.node_mut(child) {
                entry.similarity = Some(neighbor.similarity);
                entry.position =
                    origin_position + stable_direction(&neighbor.element, salt) * SPAWN_DISTANCE;
                entry.visible = origin_shown;
            }
            if let Some(edge) = store.add_edge(pending.node, child, neighbor.similarity) {
                expansion.added_edges.push(edge);
            }
            expansion.added_nodes.push(child);
        }

        if let Some(entry) = store.node_mut(pending.node) {
            match entry.expansion {
                ExpansionState::NotExpanded if entry.visible => {
                    entry.expansion = ExpansionState::Expanded;
                }
                ExpansionState::NotExpanded => {
                    // An ancestor was collapsed while the fetch was in flight.
                    entry.expansion = ExpansionState::Collapsed;
                    entry.cascade_collapsed = true;
                }
                ExpansionState::Expanded | ExpansionState::Collapsed => {}
            }
        }

        if expansion.budget_hit {
            info!(max_nodes = self.max_nodes, "node budget reached during expansion");
        }
        expansion
    }

    fn advance_auto(&mut self, store: &mut GraphStore) {
        loop {
            let Some(auto) = self.auto.as_mut() else {
                return;
            };

            if store.len() >= auto.target {
                self.finish_auto(store);
                return;
            }
            let remaining = auto.target - store.len();

            if let Some(node) = auto.queue.pop_front() {
                let expandable = store
                    .node(node)
                    .is_some_and(|entry| entry.expansion == ExpansionState::NotExpanded);
                if !expandable {
                    continue;
                }
                auto.requested.insert(node, remaining);
                self.request(store, node, FetchPurpose::Auto, remaining);
                return;
            }

            let candidate = auto
                .saturated
                .iter()
                .copied()
                .max_by(|a, b| {
                    let score = |id: &NodeId| {
                        store
                            .node(*id)
                            .and_then(|entry| entry.similarity)
                            .unwrap_or(f32::NEG_INFINITY)
                    };
                    score(a).total_cmp(&score(b)).then_with(|| b.cmp(a))
                });
            let Some(candidate) = candidate else {
                self.finish_auto(store);
                return;
            };

            auto.saturated.remove(&candidate);
            let count = auto.requested.get(&candidate).copied().unwrap_or(0) + remaining;
            auto.requested.insert(candidate, count);
            debug!(node = candidate.0, count, "deepening most similar node");
            self.request(store, candidate, FetchPurpose::Auto, count);
            return;
        }
    }

    fn finish_auto(&mut self, store: &GraphStore) {
        if self.auto.take().is_some() {
            info!(nodes = store.len(), "auto-expansion finished");
            self.events.push(ExpansionEvent::AutoExpansionFinished { nodes: store.len() });
        }
    }
}
