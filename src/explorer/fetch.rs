use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::debug;

use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub element: String,
    pub similarity: f32,
    pub vector: Option<Vec<f32>>,
}

impl Neighbor {
    pub fn new(element: impl Into<String>, similarity: f32) -> Self {
        Self {
            element: element.into(),
            similarity,
            vector: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// Source of ranked neighbor lists. `count` does not include the queried
/// element itself. Implementations must be free of side effects so a call can
/// be repeated safely.
pub trait NeighborFetcher: Send + Sync + 'static {
    fn fetch_neighbors(&self, element: &str, count: usize) -> Result<Vec<Neighbor>, FetchError>;
}

impl<F> NeighborFetcher for F
where
    F: Fn(&str, usize) -> Result<Vec<Neighbor>, FetchError> + Send + Sync + 'static,
{
    fn fetch_neighbors(&self, element: &str, count: usize) -> Result<Vec<Neighbor>, FetchError> {
        self(element, count)
    }
}

pub(super) type FetchResult = Result<Vec<Neighbor>, FetchError>;

pub(super) fn spawn_fetch(
    fetcher: Arc<dyn NeighborFetcher>,
    element: String,
    count: usize,
) -> Receiver<FetchResult> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = fetcher.fetch_neighbors(&element, count);
        if tx.send(result).is_err() {
            debug!(%element, "neighbor fetch finished after its receiver was dropped");
        }
    });

    rx
}
