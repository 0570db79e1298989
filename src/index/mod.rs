//! In-memory vector set answering nearest-neighbor queries by brute force.

mod load;
mod synthetic;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use tracing::info;

use crate::error::FetchError;
use crate::explorer::{Neighbor, NeighborFetcher};

#[derive(Debug)]
pub struct VectorIndex {
    elements: Vec<String>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    by_element: HashMap<String, usize>,
    dim: usize,
    epsilon: Option<f32>,
    with_vectors: bool,
}

impl VectorIndex {
    pub fn from_entries(entries: Vec<(String, Vec<f32>)>) -> Result<Self> {
        let Some(dim) = entries.first().map(|(_, vector)| vector.len()) else {
            bail!("vector set is empty");
        };
        if dim == 0 {
            bail!("vectors must not be empty");
        }

        let mut index = Self {
            elements: Vec::with_capacity(entries.len()),
            vectors: Vec::with_capacity(entries.len()),
            norms: Vec::with_capacity(entries.len()),
            by_element: HashMap::with_capacity(entries.len()),
            dim,
            epsilon: None,
            with_vectors: true,
        };

        for (element, vector) in entries {
            if element.is_empty() {
                bail!("vector set contains an empty element name");
            }
            if vector.len() != dim {
                bail!(
                    "vector of '{element}' has dimension {}, expected {dim}",
                    vector.len()
                );
            }
            if vector.iter().any(|value| !value.is_finite()) {
                bail!("vector of '{element}' contains non-finite values");
            }
            if index.by_element.contains_key(&element) {
                bail!("element '{element}' appears more than once");
            }

            index.by_element.insert(element.clone(), index.elements.len());
            index
                .norms
                .push(vector.iter().map(|value| value * value).sum::<f32>().sqrt());
            index.elements.push(element);
            index.vectors.push(vector);
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let index = Self::from_entries(load::read_vector_file(path)?)?;
        info!(path = %path.display(), len = index.len(), dim = index.dim, "vector set loaded");
        Ok(index)
    }

    pub fn synthetic(count: usize, dim: usize, clusters: usize, seed: u64) -> Result<Self> {
        if count == 0 {
            return Err(anyhow!("synthetic vector set needs at least one element"));
        }
        let index = Self::from_entries(synthetic::clustered_vectors(count, dim, clusters, seed))?;
        info!(len = index.len(), dim = index.dim, clusters, seed, "synthetic vector set generated");
        Ok(index)
    }

    /// Maximum cosine distance (0..2) of a returned neighbor.
    pub fn with_epsilon(mut self, epsilon: Option<f32>) -> Self {
        self.epsilon = epsilon.filter(|value| value.is_finite());
        self
    }

    /// Whether neighbors carry their vectors.
    pub fn with_vectors(mut self, with_vectors: bool) -> Self {
        self.with_vectors = with_vectors;
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(String::as_str)
    }

    pub fn embedding(&self, element: &str) -> Option<&[f32]> {
        self.by_element
            .get(element)
            .map(|index| self.vectors[*index].as_slice())
    }

    fn cosine_distance(&self, a: usize, b: usize) -> f32 {
        let denominator = self.norms[a] * self.norms[b];
        if denominator <= f32::EPSILON {
            return 1.0;
        }
        let dot = self.vectors[a]
            .iter()
            .zip(&self.vectors[b])
            .map(|(a, b)| a * b)
            .sum::<f32>();
        (1.0 - dot / denominator).clamp(0.0, 2.0)
    }

    /// Up to `count` closest elements, excluding `element` itself, most
    /// similar first.
    pub fn nearest(&self, element: &str, count: usize) -> Result<Vec<Neighbor>, FetchError> {
        let query = *self
            .by_element
            .get(element)
            .ok_or_else(|| FetchError::UnknownElement(element.to_owned()))?;

        let mut ranked = (0..self.len())
            .filter(|candidate| *candidate != query)
            .map(|candidate| (candidate, self.cosine_distance(query, candidate)))
            .filter(|(_, distance)| self.epsilon.is_none_or(|epsilon| *distance <= epsilon))
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(count);

        Ok(ranked
            .into_iter()
            .map(|(candidate, distance)| {
                let neighbor = Neighbor::new(self.elements[candidate].clone(), 1.0 - distance / 2.0);
                if self.with_vectors {
                    neighbor.with_vector(self.vectors[candidate].clone())
                } else {
                    neighbor
                }
            })
            .collect())
    }
}

impl NeighborFetcher for VectorIndex {
    fn fetch_neighbors(&self, element: &str, count: usize) -> Result<Vec<Neighbor>, FetchError> {
        self.nearest(element, count)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn index() -> VectorIndex {
        VectorIndex::from_entries(vec![
            ("a".to_owned(), vec![1.0, 0.0]),
            ("b".to_owned(), vec![0.9, 0.1]),
            ("c".to_owned(), vec![0.0, 1.0]),
            ("d".to_owned(), vec![-1.0, 0.0]),
        ])
        .expect("index")
    }

    #[test]
    fn nearest_excludes_self_and_ranks_by_similarity() {
        let neighbors = index().nearest("a", 10).expect("query");
        let names = neighbors.iter().map(|n| n.element.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "c", "d"]);

        assert_relative_eq!(neighbors[1].similarity, 0.5, epsilon = 1e-6);
        assert_relative_eq!(neighbors[2].similarity, 0.0, epsilon = 1e-6);
        assert!(neighbors[0].vector.is_some());
    }

    #[test]
    fn count_epsilon_and_vector_switch() {
        let index = index().with_epsilon(Some(1.0)).with_vectors(false);
        let neighbors = index.nearest("a", 10).expect("query");
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|neighbor| neighbor.vector.is_none()));
        assert_eq!(index.nearest("a", 1).expect("query").len(), 1);
    }

    #[test]
    fn unknown_element_is_a_fetch_error() {
        assert_eq!(
            index().nearest("zzz", 3),
            Err(FetchError::UnknownElement("zzz".to_owned()))
        );
    }

    #[test]
    fn inconsistent_dimensions_are_rejected() {
        let error = VectorIndex::from_entries(vec![
            ("a".to_owned(), vec![1.0, 0.0]),
            ("b".to_owned(), vec![1.0]),
        ])
        .expect_err("mixed dims");
        assert!(error.to_string().contains("dimension 1"));
        assert!(VectorIndex::from_entries(Vec::new()).is_err());
    }

    #[test]
    fn synthetic_index_answers_queries() {
        let index = VectorIndex::synthetic(60, 8, 4, 3).expect("synthetic");
        assert_eq!(index.len(), 60);
        assert_eq!(index.dim(), 8);
        let first = index.elements().next().expect("element").to_owned();
        assert_eq!(index.embedding(&first).map(<[f32]>::len), Some(8));
        assert_eq!(index.nearest(&first, 5).expect("query").len(), 5);
    }
}
