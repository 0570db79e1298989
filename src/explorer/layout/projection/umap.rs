//! Compact UMAP: fuzzy k-nearest-neighbor graph in the input space, laid out
//! in 2D by stochastic gradient descent with negative sampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ProjectionConfig;
use crate::error::ProjectionError;

use super::pca;

const NEGATIVE_SAMPLES: usize = 5;
const GRADIENT_CLIP: f64 = 4.0;
const INIT_SPREAD: f64 = 10.0;
const SIGMA_SEARCH_STEPS: usize = 64;

struct FuzzyEdge {
    from: usize,
    to: usize,
    weight: f64,
}

pub fn project(
    vectors: &[Vec<f32>],
    config: &ProjectionConfig,
) -> Result<Vec<[f32; 2]>, ProjectionError> {
    let count = vectors.len();
    if count < 2 {
        return Err(ProjectionError::NotEnoughVectors { found: count });
    }

    let rows = unit_rows(vectors);
    let neighbors = config.umap_neighbors.clamp(1, count - 1);
    let edges = fuzzy_graph(&rows, neighbors);
    let (a, b) = fit_curve(f64::from(config.umap_min_dist));

    let mut embedding = initial_embedding(vectors)?;
    optimize(&mut embedding, &edges, a, b, config);

    let coords = embedding
        .iter()
        .map(|[x, y]| [*x as f32, *y as f32])
        .collect::<Vec<_>>();
    if coords.iter().flatten().any(|value| !value.is_finite()) {
        return Err(ProjectionError::NonFinite);
    }
    Ok(coords)
}

/// L2-normalised copies so euclidean distance orders pairs like cosine
/// distance does.
fn unit_rows(vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    vectors
        .iter()
        .map(|vector| {
            let norm = vector
                .iter()
                .map(|value| f64::from(*value) * f64::from(*value))
                .sum::<f64>()
                .sqrt();
            let norm = if norm > f64::EPSILON { norm } else { 1.0 };
            vector.iter().map(|value| f64::from(*value) / norm).collect()
        })
        .collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

fn fuzzy_graph(rows: &[Vec<f64>], neighbors: usize) -> Vec<FuzzyEdge> {
    let count = rows.len();
    let target = (neighbors as f64).log2().max(f64::EPSILON);
    let mut weights = vec![vec![0.0f64; count]; count];

    for (index, row) in rows.iter().enumerate() {
        let mut nearest = rows
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(other, candidate)| (other, distance(row, candidate)))
            .collect::<Vec<_>>();
        nearest.sort_by(|a, b| a.1.total_cmp(&b.1));
        nearest.truncate(neighbors);

        let rho = nearest
            .iter()
            .map(|(_, distance)| *distance)
            .find(|distance| *distance > 0.0)
            .unwrap_or(0.0);
        let sigma = find_sigma(&nearest, rho, target);

        for (other, distance) in nearest {
            weights[index][other] = (-(distance - rho).max(0.0) / sigma).exp();
        }
    }

    let mut edges = Vec::new();
    for from in 0..count {
        for to in (from + 1)..count {
            let forward = weights[from][to];
            let backward = weights[to][from];
            let weight = forward + backward - forward * backward;
            if weight > 0.0 {
                edges.push(FuzzyEdge { from, to, weight });
            }
        }
    }
    edges
}

/// Binary search for the bandwidth whose membership strengths sum to
/// `log2(k)`.
fn find_sigma(nearest: &[(usize, f64)], rho: f64, target: f64) -> f64 {
    let mut low = 0.0;
    let mut high = f64::INFINITY;
    let mut sigma = 1.0;

    for _ in 0..SIGMA_SEARCH_STEPS {
        let total = nearest
            .iter()
            .map(|(_, distance)| (-(distance - rho).max(0.0) / sigma).exp())
            .sum::<f64>();
        if (total - target).abs() < 1e-5 {
            break;
        }
        if total > target {
            high = sigma;
            sigma = (low + high) * 0.5;
        } else {
            low = sigma;
            sigma = if high.is_finite() {
                (low + high) * 0.5
            } else {
                sigma * 2.0
            };
        }
    }
    sigma.max(1e-3)
}

/// Fits `1 / (1 + a d^2b)` to the target membership curve for `min_dist`.
fn fit_curve(min_dist: f64) -> (f64, f64) {
    let samples = (1..=300).map(|step| step as f64 * 0.01).collect::<Vec<_>>();
    let target = samples
        .iter()
        .map(|x| {
            if *x < min_dist {
                1.0
            } else {
                (-(x - min_dist)).exp()
            }
        })
        .collect::<Vec<_>>();

    let mut best = (1.577, 0.895);
    let mut best_error = f64::INFINITY;
    for a_step in 0..=60 {
        let a = 0.3 + a_step as f64 * 0.05;
        for b_step in 0..=40 {
            let b = 0.5 + b_step as f64 * 0.025;
            let error = samples
                .iter()
                .zip(&target)
                .map(|(x, target)| {
                    let curve = 1.0 / (1.0 + a * x.powf(2.0 * b));
                    (curve - target) * (curve - target)
                })
                .sum::<f64>();
            if error < best_error {
                best_error = error;
                best = (a, b);
            }
        }
    }
    best
}

fn initial_embedding(vectors: &[Vec<f32>]) -> Result<Vec<[f64; 2]>, ProjectionError> {
    let coords = pca::project(vectors)?;
    let spread = coords
        .iter()
        .flatten()
        .map(|value| f64::from(value.abs()))
        .fold(0.0, f64::max);
    let factor = if spread > f64::EPSILON {
        INIT_SPREAD / spread
    } else {
        1.0
    };

    // Identical inputs would otherwise start on top of each other.
    Ok(coords
        .iter()
        .enumerate()
        .map(|(index, [x, y])| {
            let jitter = index as f64 * 0.001;
            [f64::from(*x) * factor + jitter, f64::from(*y) * factor - jitter]
        })
        .collect())
}

fn optimize(embedding: &mut [[f64; 2]], edges: &[FuzzyEdge], a: f64, b: f64, config: &ProjectionConfig) {
    let Some(max_weight) = edges.iter().map(|edge| edge.weight).reduce(f64::max) else {
        return;
    };
    let epochs = config.umap_epochs.max(1);
    let period = edges
        .iter()
        .map(|edge| max_weight / edge.weight)
        .collect::<Vec<_>>();
    let mut next_sample = period.clone();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let count = embedding.len();

    for epoch in 0..epochs {
        let alpha = 1.0 - epoch as f64 / epochs as f64;
        for (slot, edge) in edges.iter().enumerate() {
            if next_sample[slot] > (epoch + 1) as f64 {
                continue;
            }
            next_sample[slot] += period[slot];

            let (from, to) = (edge.from, edge.to);
            let delta = [
                embedding[from][0] - embedding[to][0],
                embedding[from][1] - embedding[to][1],
            ];
            let dist_sq = delta[0] * delta[0] + delta[1] * delta[1];
            if dist_sq > 0.0 {
                let coefficient = -2.0 * a * b * dist_sq.powf(b - 1.0)
                    / (1.0 + a * dist_sq.powf(b));
                for axis in 0..2 {
                    let gradient = clip(coefficient * delta[axis]) * alpha;
                    embedding[from][axis] += gradient;
                    embedding[to][axis] -= gradient;
                }
            }

            for _ in 0..NEGATIVE_SAMPLES {
                let other = rng.gen_range(0..count);
                if other == from {
                    continue;
                }
                let delta = [
                    embedding[from][0] - embedding[other][0],
                    embedding[from][1] - embedding[other][1],
                ];
                let dist_sq = delta[0] * delta[0] + delta[1] * delta[1];
                for axis in 0..2 {
                    let gradient = if dist_sq > 0.0 {
                        let coefficient =
                            2.0 * b / ((0.001 + dist_sq) * (1.0 + a * dist_sq.powf(b)));
                        clip(coefficient * delta[axis])
                    } else {
                        GRADIENT_CLIP
                    };
                    embedding[from][axis] += gradient * alpha;
                }
            }
        }
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters() -> Vec<Vec<f32>> {
        let mut vectors = Vec::new();
        for index in 0..8 {
            let wobble = index as f32 * 0.01;
            vectors.push(vec![1.0, wobble, 0.0, 0.0]);
            vectors.push(vec![0.0, 0.0, 1.0, wobble]);
        }
        vectors
    }

    fn spread(points: &[[f32; 2]]) -> f32 {
        let mut total = 0.0;
        for (index, a) in points.iter().enumerate() {
            for b in &points[index + 1..] {
                total += ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
            }
        }
        total
    }

    #[test]
    fn curve_fit_matches_reference_constants() {
        let (a, b) = fit_curve(0.1);
        assert!((a - 1.577).abs() < 0.2, "a = {a}");
        assert!((b - 0.895).abs() < 0.06, "b = {b}");
    }

    #[test]
    fn clusters_stay_apart() {
        let vectors = clusters();
        let coords = project(&vectors, &ProjectionConfig::default()).expect("projection");
        assert_eq!(coords.len(), vectors.len());

        let even = coords.iter().step_by(2).copied().collect::<Vec<_>>();
        let odd = coords.iter().skip(1).step_by(2).copied().collect::<Vec<_>>();
        let within = spread(&even) / 28.0 + spread(&odd) / 28.0;

        let mut across = 0.0;
        for a in &even {
            for b in &odd {
                across += ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
            }
        }
        let across = across / 64.0;
        assert!(across > within, "across {across} within {within}");
    }

    #[test]
    fn seeded_runs_are_deterministic() {
        let vectors = clusters();
        let config = ProjectionConfig::default();
        assert_eq!(
            project(&vectors, &config).expect("first"),
            project(&vectors, &config).expect("second")
        );
    }

    #[test]
    fn two_vectors_are_enough() {
        let coords = project(&[vec![1.0, 0.0], vec![0.0, 1.0]], &ProjectionConfig::default())
            .expect("projection");
        assert!(coords.iter().flatten().all(|value| value.is_finite()));
    }
}
