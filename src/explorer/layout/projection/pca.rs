use crate::error::ProjectionError;

const POWER_ITERATIONS: usize = 96;

/// Projects onto the two leading principal components.
///
/// Components come from power iteration on `Xᵀ X` without materialising the
/// covariance matrix, so wide vectors stay cheap.
pub fn project(vectors: &[Vec<f32>]) -> Result<Vec<[f32; 2]>, ProjectionError> {
    if vectors.len() < 2 {
        return Err(ProjectionError::NotEnoughVectors {
            found: vectors.len(),
        });
    }

    let centered = center(vectors);
    let dim = centered[0].len();
    let first = leading_component(&centered, dim, None);
    let second = leading_component(&centered, dim, Some(&first));

    let coords = centered
        .iter()
        .map(|row| [dot(row, &first) as f32, dot(row, &second) as f32])
        .collect::<Vec<_>>();
    if coords.iter().flatten().any(|value| !value.is_finite()) {
        return Err(ProjectionError::NonFinite);
    }
    Ok(coords)
}

pub(super) fn center(vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let dim = vectors[0].len();
    let mut mean = vec![0.0f64; dim];
    for vector in vectors {
        for (slot, value) in mean.iter_mut().zip(vector) {
            *slot += f64::from(*value);
        }
    }
    let count = vectors.len() as f64;
    for slot in &mut mean {
        *slot /= count;
    }

    vectors
        .iter()
        .map(|vector| {
            vector
                .iter()
                .zip(&mean)
                .map(|(value, mean)| f64::from(*value) - mean)
                .collect()
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

fn normalize_in_place(vector: &mut [f64]) -> bool {
    let norm = dot(vector, vector).sqrt();
    if norm <= f64::EPSILON || !norm.is_finite() {
        return false;
    }
    for value in vector {
        *value /= norm;
    }
    true
}

fn leading_component(rows: &[Vec<f64>], dim: usize, deflate: Option<&[f64]>) -> Vec<f64> {
    let mut component = (0..dim)
        .map(|index| 1.0 + (index as f64 * 0.618_034).fract())
        .collect::<Vec<_>>();
    if let Some(previous) = deflate {
        remove_projection(&mut component, previous);
    }
    if !normalize_in_place(&mut component) {
        return vec![0.0; dim];
    }

    for _ in 0..POWER_ITERATIONS {
        let mut next = vec![0.0f64; dim];
        for row in rows {
            let weight = dot(row, &component);
            for (slot, value) in next.iter_mut().zip(row) {
                *slot += weight * value;
            }
        }
        if let Some(previous) = deflate {
            remove_projection(&mut next, previous);
        }
        // Zero variance along every remaining direction.
        if !normalize_in_place(&mut next) {
            return vec![0.0; dim];
        }
        component = next;
    }
    component
}

fn remove_projection(vector: &mut [f64], direction: &[f64]) {
    let overlap = dot(vector, direction);
    for (slot, value) in vector.iter_mut().zip(direction) {
        *slot -= overlap * value;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn first_axis_follows_largest_spread() {
        let vectors = vec![
            vec![-10.0, 0.0, 0.5],
            vec![10.0, 0.0, -0.5],
            vec![0.0, 1.0, 0.0],
            vec![0.0, -1.0, 0.0],
        ];
        let coords = project(&vectors).expect("projection");

        assert_relative_eq!(coords[0][0].abs(), 10.0, epsilon = 0.1);
        assert_relative_eq!(coords[2][0], 0.0, epsilon = 0.1);
        assert_relative_eq!(coords[2][1].abs(), 1.0, epsilon = 0.1);
    }

    #[test]
    fn single_vector_is_rejected() {
        assert_eq!(
            project(&[vec![1.0, 2.0]]),
            Err(ProjectionError::NotEnoughVectors { found: 1 })
        );
    }

    #[test]
    fn identical_vectors_project_to_origin() {
        let coords = project(&[vec![1.0, 1.0], vec![1.0, 1.0]]).expect("projection");
        assert_eq!(coords, vec![[0.0, 0.0], [0.0, 0.0]]);
    }
}
