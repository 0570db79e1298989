use eframe::egui::{Vec2, vec2};

use crate::config::ProjectionConfig;

/// Half-extent of the projection box, growing logarithmically with the
/// number of projected points.
pub fn projection_scale(count: usize, config: &ProjectionConfig) -> f32 {
    let growth = 1.0 + config.log_growth * (count.max(1) as f32).ln();
    (config.base_scale * growth).max(config.min_scale)
}

/// Centres `points` on the midpoint of their range and scales them uniformly
/// into a box of the given aspect ratio whose half-extents never exceed
/// `scale`.
pub fn normalize(points: &[[f32; 2]], aspect: f32, scale: f32) -> Vec<Vec2> {
    if points.is_empty() {
        return Vec::new();
    }

    let (min, max) = points.iter().fold(
        (
            vec2(f32::INFINITY, f32::INFINITY),
            vec2(f32::NEG_INFINITY, f32::NEG_INFINITY),
        ),
        |(min, max), [x, y]| (min.min(vec2(*x, *y)), max.max(vec2(*x, *y))),
    );
    let mid = (min + max) * 0.5;
    let half_range = (max - min) * 0.5;

    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let half_box = if aspect >= 1.0 {
        vec2(scale, scale / aspect)
    } else {
        vec2(scale * aspect, scale)
    };

    let mut factor = f32::INFINITY;
    if half_range.x > f32::EPSILON {
        factor = factor.min(half_box.x / half_range.x);
    }
    if half_range.y > f32::EPSILON {
        factor = factor.min(half_box.y / half_range.y);
    }
    if !factor.is_finite() {
        factor = 0.0;
    }

    points
        .iter()
        .map(|[x, y]| (vec2(*x, *y) - mid) * factor)
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn scale_has_a_floor_and_grows_with_count() {
        let config = ProjectionConfig::default();
        assert_relative_eq!(projection_scale(1, &config), config.base_scale);
        assert!(projection_scale(1000, &config) > projection_scale(10, &config));

        let tiny = ProjectionConfig {
            base_scale: 10.0,
            min_scale: 50.0,
            ..ProjectionConfig::default()
        };
        assert_relative_eq!(projection_scale(2, &tiny), 50.0);
    }

    #[test]
    fn output_stays_inside_the_box() {
        let points = [[3.0, 100.0], [-7.0, 2.0], [40.0, -60.0], [0.5, 0.5]];
        for aspect in [0.5, 1.0, 1.6, 3.0] {
            let scale = 200.0;
            let normalized = normalize(&points, aspect, scale);
            for point in &normalized {
                assert!(point.x.abs() <= scale + 1e-3);
                assert!(point.y.abs() <= scale + 1e-3);
            }
            let max_x = normalized.iter().map(|p| p.x.abs()).fold(0.0, f32::max);
            let max_y = normalized.iter().map(|p| p.y.abs()).fold(0.0, f32::max);
            // One axis touches its bound.
            let touches_x = (max_x - scale.min(scale * aspect)).abs() < 1e-2;
            let touches_y = (max_y - scale.min(scale / aspect)).abs() < 1e-2;
            assert!(touches_x || touches_y, "aspect {aspect}: {max_x} {max_y}");
        }
    }

    #[test]
    fn relative_structure_is_kept() {
        let points = [[0.0, 0.0], [2.0, 0.0], [4.0, 0.0]];
        let normalized = normalize(&points, 1.0, 100.0);
        assert_relative_eq!(normalized[0].x, -100.0);
        assert_relative_eq!(normalized[1].x, 0.0);
        assert_relative_eq!(normalized[2].x, 100.0);
        assert!(normalized.iter().all(|point| point.y == 0.0));
    }

    #[test]
    fn identical_points_collapse_to_origin() {
        let normalized = normalize(&[[5.0, 5.0], [5.0, 5.0]], 1.0, 100.0);
        assert_eq!(normalized, vec![Vec2::ZERO, Vec2::ZERO]);
    }
}
