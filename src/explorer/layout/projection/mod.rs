mod normalize;
mod pca;
mod umap;

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::{debug, warn};

use crate::config::ProjectionConfig;
use crate::error::ProjectionError;
use crate::explorer::store::{GraphStore, NodeId};

pub use normalize::{normalize, projection_scale};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMethod {
    Pca,
    Umap,
}

impl ProjectionMethod {
    pub fn run(
        self,
        vectors: &[Vec<f32>],
        config: &ProjectionConfig,
    ) -> Result<Vec<[f32; 2]>, ProjectionError> {
        match self {
            Self::Pca => pca::project(vectors),
            Self::Umap => umap::project(vectors, config),
        }
    }
}

pub(super) type ProjectionResult = Result<Vec<[f32; 2]>, ProjectionError>;

/// Nodes with a usable vector: non-empty, finite and of the most common
/// dimension among candidates.
pub(super) fn collect_vectors(store: &GraphStore) -> (Vec<NodeId>, Vec<Vec<f32>>) {
    let candidates = store
        .node_ids()
        .filter_map(|id| {
            let vector = store.nodes()[id.0].vector.as_ref()?;
            (!vector.is_empty() && vector.iter().all(|value| value.is_finite()))
                .then_some((id, vector))
        })
        .collect::<Vec<_>>();

    let mut dims: HashMap<usize, usize> = HashMap::new();
    for (_, vector) in &candidates {
        *dims.entry(vector.len()).or_default() += 1;
    }
    let Some(dim) = dims
        .into_iter()
        .max_by_key(|(dim, count)| (*count, *dim))
        .map(|(dim, _)| dim)
    else {
        return (Vec::new(), Vec::new());
    };

    let mut ids = Vec::new();
    let mut vectors = Vec::new();
    for (id, vector) in candidates {
        if vector.len() == dim {
            ids.push(id);
            vectors.push(vector.clone());
        } else {
            warn!(
                element = %store.nodes()[id.0].element,
                dim = vector.len(),
                expected = dim,
                "skipping vector with mismatched dimension"
            );
        }
    }
    (ids, vectors)
}

pub(super) fn spawn_projection(
    method: ProjectionMethod,
    vectors: Vec<Vec<f32>>,
    config: ProjectionConfig,
) -> Receiver<ProjectionResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = method.run(&vectors, &config);
        if tx.send(result).is_err() {
            debug!(?method, "projection result dropped; receiver gone");
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_vectors_are_excluded() {
        let mut store = GraphStore::new();
        store.add_node("a", Some(vec![1.0, 0.0]), None);
        store.add_node("b", Some(vec![0.0, 1.0]), None);
        store.add_node("c", Some(vec![0.0, 1.0, 2.0]), None);
        store.add_node("d", Some(vec![f32::NAN, 1.0]), None);
        store.add_node("e", Some(Vec::new()), None);
        store.add_node("f", None, None);

        let (ids, vectors) = collect_vectors(&store);
        assert_eq!(ids, vec![NodeId(0), NodeId(1)]);
        assert_eq!(vectors.len(), 2);
    }
}
