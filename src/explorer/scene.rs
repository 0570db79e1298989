//! Boundary to the drawing surface.
//!
//! The explorer only ever writes to a [`Scene`]; nothing it reads back is used
//! for layout decisions except [`Scene::pick`].

use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2};

use super::camera::Camera;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineHandle(pub u64);

pub trait Scene {
    fn add_point(&mut self, position: Vec2) -> PointHandle;
    fn remove_point(&mut self, handle: PointHandle);
    fn move_point(&mut self, handle: PointHandle, position: Vec2);
    fn add_line(&mut self, from: PointHandle, to: PointHandle, strength: f32) -> LineHandle;
    fn remove_line(&mut self, handle: LineHandle);
    fn set_camera_extent(&mut self, camera: &Camera);
    /// Topmost point under a viewport-relative screen position.
    fn pick(&self, screen: Pos2) -> Option<PointHandle>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenePoint {
    pub position: Vec2,
    /// Insertion order; later points draw on top.
    pub order: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLine {
    pub from: PointHandle,
    pub to: PointHandle,
    pub strength: f32,
}

/// Retained point/line lists with a picking radius in pixels. Used headless
/// and as the backing store of the egui canvas.
#[derive(Debug)]
pub struct MemoryScene {
    pub points: HashMap<PointHandle, ScenePoint>,
    pub lines: HashMap<LineHandle, SceneLine>,
    pub camera: Camera,
    pub pick_radius: f32,
    next_handle: u64,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self {
            points: HashMap::new(),
            lines: HashMap::new(),
            camera: Camera::default(),
            pick_radius: 9.0,
            next_handle: 1,
        }
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    pub fn point_position(&self, handle: PointHandle) -> Option<Vec2> {
        self.points.get(&handle).map(|point| point.position)
    }
}

impl Scene for MemoryScene {
    fn add_point(&mut self, position: Vec2) -> PointHandle {
        let order = self.next();
        let handle = PointHandle(order);
        self.points.insert(handle, ScenePoint { position, order });
        handle
    }

    fn remove_point(&mut self, handle: PointHandle) {
        self.points.remove(&handle);
    }

    fn move_point(&mut self, handle: PointHandle, position: Vec2) {
        if let Some(point) = self.points.get_mut(&handle) {
            point.position = position;
        }
    }

    fn add_line(&mut self, from: PointHandle, to: PointHandle, strength: f32) -> LineHandle {
        let handle = LineHandle(self.next());
        self.lines.insert(handle, SceneLine { from, to, strength });
        handle
    }

    fn remove_line(&mut self, handle: LineHandle) {
        self.lines.remove(&handle);
    }

    fn set_camera_extent(&mut self, camera: &Camera) {
        self.camera = *camera;
    }

    fn pick(&self, screen: Pos2) -> Option<PointHandle> {
        self.points
            .iter()
            .filter_map(|(handle, point)| {
                let distance = self.camera.world_to_screen(point.position).distance(screen);
                (distance <= self.pick_radius).then_some((*handle, point.order))
            })
            .max_by_key(|(_, order)| *order)
            .map(|(handle, _)| handle)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    #[test]
    fn pick_prefers_topmost_point() {
        let mut scene = MemoryScene::new();
        scene.set_camera_extent(&Camera {
            center: Vec2::ZERO,
            extent: 100.0,
            viewport: vec2(100.0, 100.0),
            auto_fit: true,
        });
        let below = scene.add_point(vec2(0.0, 0.0));
        let above = scene.add_point(vec2(1.0, 0.0));
        assert_eq!(scene.pick(Pos2::new(50.0, 50.0)), Some(above));

        scene.remove_point(above);
        assert_eq!(scene.pick(Pos2::new(50.0, 50.0)), Some(below));
        assert_eq!(scene.pick(Pos2::new(5.0, 5.0)), None);
    }
}
