use eframe::egui::{Pos2, Rect, Vec2, vec2};

const MIN_EXTENT: f32 = 20.0;
const MAX_EXTENT: f32 = 60_000.0;
const FIT_PADDING: f32 = 1.25;
const ZOOM_SENSITIVITY: f32 = 0.0018;

/// 2D camera: `center` is the world point under the viewport centre and
/// `extent` the world height that fits in the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub center: Vec2,
    pub extent: f32,
    pub viewport: Vec2,
    /// Cleared by manual pan/zoom, set again on reset or layout switch.
    pub auto_fit: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            extent: 800.0,
            viewport: vec2(1280.0, 800.0),
            auto_fit: true,
        }
    }
}

impl Camera {
    pub fn units_per_pixel(&self) -> f32 {
        self.extent / self.viewport.y.max(1.0)
    }

    pub fn aspect(&self) -> f32 {
        if self.viewport.y <= f32::EPSILON {
            1.0
        } else {
            (self.viewport.x / self.viewport.y).max(f32::EPSILON)
        }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        let offset = (world - self.center) / self.units_per_pixel();
        (self.viewport * 0.5 + vec2(offset.x, -offset.y)).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        let offset = screen.to_vec2() - self.viewport * 0.5;
        self.center + vec2(offset.x, -offset.y) * self.units_per_pixel()
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        if size.x > 0.0 && size.y > 0.0 {
            self.viewport = size;
        }
    }

    /// Scales the extent by a factor derived from the wheel delta, clamped per
    /// event; the anchor is always the viewport centre.
    pub fn zoom_by_wheel(&mut self, wheel_delta: f32) -> f32 {
        let factor = (1.0 - (wheel_delta * ZOOM_SENSITIVITY)).clamp(0.85, 1.15);
        self.extent = (self.extent * factor).clamp(MIN_EXTENT, MAX_EXTENT);
        self.auto_fit = false;
        factor
    }

    /// Moves the camera opposite to a pointer drag so the content follows the
    /// pointer.
    pub fn pan_by_pixels(&mut self, pixel_delta: Vec2) -> Vec2 {
        let world_delta = vec2(-pixel_delta.x, pixel_delta.y) * self.units_per_pixel();
        self.center += world_delta;
        self.auto_fit = false;
        world_delta
    }

    /// Moves toward framing `bounds`; `smoothing` of 1.0 jumps immediately.
    pub fn fit_to(&mut self, bounds: Rect, smoothing: f32) {
        let smoothing = smoothing.clamp(0.0, 1.0);
        let size = bounds.size();
        let needed_height = size.y.max(size.x / self.aspect());
        let target_extent = (needed_height * FIT_PADDING).clamp(MIN_EXTENT, MAX_EXTENT);
        let target_center = bounds.center().to_vec2();

        self.center += (target_center - self.center) * smoothing;
        self.extent += (target_extent - self.extent) * smoothing;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn screen_world_round_trip() {
        let camera = Camera {
            center: vec2(30.0, -12.0),
            extent: 400.0,
            viewport: vec2(800.0, 400.0),
            auto_fit: true,
        };
        let screen = camera.world_to_screen(vec2(50.0, 10.0));
        let world = camera.screen_to_world(screen);
        assert_relative_eq!(world.x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(world.y, 10.0, epsilon = 1e-3);
        assert_eq!(camera.world_to_screen(camera.center), pos2(400.0, 200.0));
    }

    #[test]
    fn zoom_is_multiplicative_and_clamped_per_event() {
        let mut camera = Camera::default();
        let before = camera.extent;
        let factor = camera.zoom_by_wheel(10_000.0);
        assert_relative_eq!(factor, 0.85);
        assert_relative_eq!(camera.extent, before * 0.85);
        assert!(!camera.auto_fit);

        let factor = camera.zoom_by_wheel(-10_000.0);
        assert_relative_eq!(factor, 1.15);
    }

    #[test]
    fn pan_moves_against_pointer() {
        let mut camera = Camera {
            extent: 200.0,
            viewport: vec2(400.0, 200.0),
            ..Camera::default()
        };
        let delta = camera.pan_by_pixels(vec2(10.0, 0.0));
        assert_relative_eq!(delta.x, -10.0);
        assert_relative_eq!(camera.center.x, -10.0);
    }

    #[test]
    fn fit_frames_bounds() {
        let mut camera = Camera {
            viewport: vec2(200.0, 100.0),
            ..Camera::default()
        };
        camera.fit_to(Rect::from_min_max(pos2(-100.0, -10.0), pos2(100.0, 10.0)), 1.0);
        assert_relative_eq!(camera.center.x, 0.0);
        assert_relative_eq!(camera.extent, 100.0 * FIT_PADDING);
    }
}
