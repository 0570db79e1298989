use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CLUSTER_SPREAD: f32 = 0.35;

/// Gaussian-ish blobs around random centres; element names encode the
/// cluster (`c03-0042`).
pub(super) fn clustered_vectors(
    count: usize,
    dim: usize,
    clusters: usize,
    seed: u64,
) -> Vec<(String, Vec<f32>)> {
    let dim = dim.max(2);
    let clusters = clusters.clamp(1, count.max(1));
    let mut rng = StdRng::seed_from_u64(seed);

    let centers = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    (0..count)
        .map(|index| {
            let cluster = index % clusters;
            let vector = centers[cluster]
                .iter()
                .map(|center| {
                    // Sum of uniforms keeps the noise centred and bounded.
                    let noise = (0..3).map(|_| rng.gen_range(-1.0f32..1.0)).sum::<f32>() / 3.0;
                    center + noise * CLUSTER_SPREAD
                })
                .collect();
            (format!("c{cluster:02}-{index:04}"), vector)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_vectors() {
        assert_eq!(clustered_vectors(20, 8, 3, 7), clustered_vectors(20, 8, 3, 7));
        assert_ne!(clustered_vectors(20, 8, 3, 7), clustered_vectors(20, 8, 3, 8));
    }

    #[test]
    fn names_and_dimensions() {
        let vectors = clustered_vectors(10, 4, 2, 1);
        assert_eq!(vectors.len(), 10);
        assert_eq!(vectors[3].0, "c01-0003");
        assert!(vectors.iter().all(|(_, vector)| vector.len() == 4));
    }
}
