use std::collections::HashMap;

use eframe::egui::{Rect, Vec2, pos2};

use super::scene::{LineHandle, PointHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionState {
    NotExpanded,
    Expanded,
    Collapsed,
}

impl ExpansionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotExpanded => "not expanded",
            Self::Expanded => "expanded",
            Self::Collapsed => "collapsed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub element: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub vector: Option<Vec<f32>>,
    pub similarity: Option<f32>,
    pub expansion: ExpansionState,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visible: bool,
    /// Set when an ancestor's collapse cascaded into this node, so reopening
    /// the ancestor restores it.
    pub cascade_collapsed: bool,
    pub depth: usize,
    pub point: Option<PointHandle>,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub parent_child: bool,
    pub strength: f32,
    pub visible: bool,
    pub line: Option<LineHandle>,
}

impl Edge {
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Node and edge arena. Ids are indices and stay valid until [`GraphStore::reset`].
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index_by_element: HashMap<String, NodeId>,
    edge_by_pair: HashMap<(NodeId, NodeId), EdgeId>,
    adjacency: Vec<Vec<EdgeId>>,
}

fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_node(
        &mut self,
        element: &str,
        vector: Option<Vec<f32>>,
        parent: Option<NodeId>,
    ) -> Option<NodeId> {
        if self.index_by_element.contains_key(element) {
            return None;
        }
        let parent = parent.filter(|parent| parent.0 < self.nodes.len());

        let id = NodeId(self.nodes.len());
        let (position, depth) = match parent {
            Some(parent) => {
                let parent_node = &self.nodes[parent.0];
                (parent_node.position, parent_node.depth + 1)
            }
            None => (Vec2::ZERO, 0),
        };

        self.nodes.push(Node {
            element: element.to_owned(),
            position,
            velocity: Vec2::ZERO,
            vector,
            similarity: None,
            expansion: ExpansionState::NotExpanded,
            parent,
            children: Vec::new(),
            visible: true,
            cascade_collapsed: false,
            depth,
            point: None,
        });
        self.adjacency.push(Vec::new());
        self.index_by_element.insert(element.to_owned(), id);

        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }

        Some(id)
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId, strength: f32) -> Option<EdgeId> {
        if a == b || a.0 >= self.nodes.len() || b.0 >= self.nodes.len() {
            return None;
        }

        let key = pair_key(a, b);
        if self.edge_by_pair.contains_key(&key) {
            return None;
        }

        let parent_child = self.nodes[b.0].parent == Some(a);
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            source: a,
            target: b,
            parent_child,
            strength,
            visible: self.nodes[a.0].visible && self.nodes[b.0].visible,
            line: None,
        });
        self.edge_by_pair.insert(key, id);
        self.adjacency[a.0].push(id);
        self.adjacency[b.0].push(id);
        Some(id)
    }

    pub fn find_by_element(&self, element: &str) -> Option<NodeId> {
        self.index_by_element.get(element).copied()
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.edge_by_pair.get(&pair_key(a, b)).copied()
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.index_by_element.clear();
        self.edge_by_pair.clear();
        self.adjacency.clear();
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn incident_edges(&self, id: NodeId) -> &[EdgeId] {
        self.adjacency.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incident_edges(id)
            .iter()
            .map(move |edge| self.edges[edge.0].other(id))
    }

    pub fn visible_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.visible).count()
    }

    pub fn visible_edge_count(&self) -> usize {
        self.edges.iter().filter(|edge| edge.visible).count()
    }

    /// Recomputes edge visibility from endpoint visibility and the line toggle.
    pub fn refresh_edge_visibility(&mut self, lines_visible: bool) {
        for edge in &mut self.edges {
            edge.visible = lines_visible
                && self.nodes[edge.source.0].visible
                && self.nodes[edge.target.0].visible;
        }
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        let mut visible = self.nodes.iter().filter(|node| node.visible).peekable();
        visible.peek()?;

        let mut min = pos2(f32::INFINITY, f32::INFINITY);
        let mut max = pos2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for node in visible {
            min.x = min.x.min(node.position.x);
            min.y = min.y.min(node.position.y);
            max.x = max.x.max(node.position.x);
            max.y = max.y.max(node.position.y);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }
        Some(Rect::from_min_max(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_elements_are_rejected() {
        let mut store = GraphStore::new();
        let root = store.add_node("a", None, None).expect("root");
        assert!(store.add_node("a", None, Some(root)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn child_links_back_to_parent() {
        let mut store = GraphStore::new();
        let root = store.add_node("a", None, None).expect("root");
        let child = store.add_node("b", Some(vec![1.0]), Some(root)).expect("child");

        assert_eq!(store.node(child).and_then(|node| node.parent), Some(root));
        assert_eq!(store.node(root).map(|node| node.children.clone()), Some(vec![child]));
        assert_eq!(store.node(child).map(|node| node.depth), Some(1));
        assert_eq!(store.find_by_element("b"), Some(child));
    }

    #[test]
    fn edges_are_unique_per_unordered_pair() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", None, None).expect("a");
        let b = store.add_node("b", None, Some(a)).expect("b");

        let edge = store.add_edge(a, b, 0.9).expect("edge");
        assert!(store.add_edge(b, a, 0.5).is_none());
        assert!(store.add_edge(a, a, 1.0).is_none());
        assert!(store.add_edge(a, NodeId(9), 1.0).is_none());
        assert_eq!(store.edge_count(), 1);
        assert!(store.edge(edge).is_some_and(|edge| edge.parent_child));
        assert_eq!(store.edge_between(b, a), Some(edge));
        assert_eq!(store.neighbors(a).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn edge_visibility_follows_endpoints_and_toggle() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", None, None).expect("a");
        let b = store.add_node("b", None, Some(a)).expect("b");
        store.add_edge(a, b, 0.7);

        store.refresh_edge_visibility(true);
        assert_eq!(store.visible_edge_count(), 1);

        if let Some(node) = store.node_mut(b) {
            node.visible = false;
        }
        store.refresh_edge_visibility(true);
        assert_eq!(store.visible_edge_count(), 0);

        if let Some(node) = store.node_mut(b) {
            node.visible = true;
        }
        store.refresh_edge_visibility(false);
        assert_eq!(store.visible_edge_count(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = GraphStore::new();
        let a = store.add_node("a", None, None).expect("a");
        let b = store.add_node("b", None, Some(a)).expect("b");
        store.add_edge(a, b, 0.7);

        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.edge_count(), 0);
        assert!(store.find_by_element("a").is_none());
        assert!(store.add_node("a", None, None).is_some());
    }
}
