use std::time::{Duration, Instant};

use eframe::egui::{PointerButton, Pos2, Vec2};

use crate::config::ExplorerConfig;

use super::store::NodeId;

/// Raw pointer input, in viewport-relative screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Move { pos: Pos2 },
    Down { pos: Pos2, button: PointerButton },
    Up { pos: Pos2, button: PointerButton },
    Wheel { delta: f32 },
    Leave,
}

/// User intent derived from pointer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionEvent {
    HoverEnter(NodeId),
    HoverLeave(NodeId),
    Click(NodeId),
    DoubleClick(NodeId),
    SecondaryClick(NodeId),
    ClickEmpty,
    /// Pointer drag in pixels.
    Pan(Vec2),
    Zoom(f32),
}

#[derive(Clone, Copy, Debug)]
struct Press {
    origin: Pos2,
    node: Option<NodeId>,
    button: PointerButton,
    dragged: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct PanState {
    dragging: bool,
    last: Option<Pos2>,
}

/// Pointer state machine. The caller resolves what lies under the pointer
/// and passes it in with every event.
#[derive(Debug)]
pub struct InteractionController {
    drag_threshold: f32,
    double_click: Duration,
    hovered: Option<NodeId>,
    press: Option<Press>,
    pan: PanState,
    last_click: Option<(NodeId, Instant)>,
}

impl InteractionController {
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            drag_threshold: config.drag_threshold.max(0.0),
            double_click: config.double_click_window(),
            hovered: None,
            press: None,
            pan: PanState::default(),
            last_click: None,
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn is_panning(&self) -> bool {
        self.pan.dragging
    }

    pub fn reset(&mut self) {
        self.hovered = None;
        self.press = None;
        self.pan = PanState::default();
        self.last_click = None;
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        picked: Option<NodeId>,
        now: Instant,
    ) -> Vec<InteractionEvent> {
        let mut out = Vec::new();
        match event {
            PointerEvent::Move { pos } => {
                if let Some(press) = &mut self.press
                    && press.origin.distance(pos) > self.drag_threshold
                {
                    press.dragged = true;
                }
                if self.pan.dragging {
                    if let Some(last) = self.pan.last {
                        let delta = pos - last;
                        if delta != Vec2::ZERO {
                            out.push(InteractionEvent::Pan(delta));
                        }
                    }
                    self.pan.last = Some(pos);
                } else {
                    self.update_hover(picked, &mut out);
                }
            }
            PointerEvent::Down { pos, button } => {
                self.press = Some(Press {
                    origin: pos,
                    node: picked,
                    button,
                    dragged: false,
                });
                if picked.is_none() {
                    self.pan = PanState {
                        dragging: true,
                        last: Some(pos),
                    };
                }
            }
            PointerEvent::Up { pos, button } => {
                self.pan = PanState::default();
                let Some(press) = self.press.take() else {
                    return out;
                };
                let dragged = press.dragged || press.origin.distance(pos) > self.drag_threshold;
                if dragged || press.button != button {
                    self.update_hover(picked, &mut out);
                    return out;
                }

                match (press.node, picked, button) {
                    (Some(pressed), Some(released), PointerButton::Primary)
                        if pressed == released =>
                    {
                        out.push(self.primary_click(pressed, now));
                    }
                    (Some(pressed), Some(released), PointerButton::Secondary)
                        if pressed == released =>
                    {
                        out.push(InteractionEvent::SecondaryClick(pressed));
                    }
                    (None, None, PointerButton::Primary) => out.push(InteractionEvent::ClickEmpty),
                    _ => {}
                }
                self.update_hover(picked, &mut out);
            }
            PointerEvent::Wheel { delta } => {
                if delta != 0.0 {
                    out.push(InteractionEvent::Zoom(delta));
                }
            }
            PointerEvent::Leave => {
                self.press = None;
                self.pan = PanState::default();
                self.update_hover(None, &mut out);
            }
        }
        out
    }

    fn primary_click(&mut self, node: NodeId, now: Instant) -> InteractionEvent {
        if let Some((previous, at)) = self.last_click
            && previous == node
            && now.saturating_duration_since(at) <= self.double_click
        {
            self.last_click = None;
            return InteractionEvent::DoubleClick(node);
        }
        self.last_click = Some((node, now));
        InteractionEvent::Click(node)
    }

    fn update_hover(&mut self, picked: Option<NodeId>, out: &mut Vec<InteractionEvent>) {
        if self.hovered == picked {
            return;
        }
        if let Some(previous) = self.hovered {
            out.push(InteractionEvent::HoverLeave(previous));
        }
        if let Some(next) = picked {
            out.push(InteractionEvent::HoverEnter(next));
        }
        self.hovered = picked;
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    const A: NodeId = NodeId(0);
    const B: NodeId = NodeId(1);

    fn controller() -> InteractionController {
        InteractionController::new(&ExplorerConfig::default())
    }

    fn click(
        controller: &mut InteractionController,
        node: Option<NodeId>,
        button: PointerButton,
        now: Instant,
    ) -> Vec<InteractionEvent> {
        let pos = pos2(10.0, 10.0);
        let mut events = controller.handle(PointerEvent::Down { pos, button }, node, now);
        events.extend(controller.handle(PointerEvent::Up { pos, button }, node, now));
        events
    }

    #[test]
    fn hover_emits_enter_and_leave_on_change() {
        let mut controller = controller();
        let now = Instant::now();
        let pos = pos2(1.0, 1.0);

        assert_eq!(
            controller.handle(PointerEvent::Move { pos }, Some(A), now),
            vec![InteractionEvent::HoverEnter(A)]
        );
        assert!(controller.handle(PointerEvent::Move { pos }, Some(A), now).is_empty());
        assert_eq!(
            controller.handle(PointerEvent::Move { pos }, Some(B), now),
            vec![InteractionEvent::HoverLeave(A), InteractionEvent::HoverEnter(B)]
        );
        assert_eq!(
            controller.handle(PointerEvent::Leave, None, now),
            vec![InteractionEvent::HoverLeave(B)]
        );
    }

    #[test]
    fn second_click_within_window_is_a_double_click() {
        let mut controller = controller();
        let start = Instant::now();

        let first = click(&mut controller, Some(A), PointerButton::Primary, start);
        assert!(first.contains(&InteractionEvent::Click(A)));

        let second = click(
            &mut controller,
            Some(A),
            PointerButton::Primary,
            start + Duration::from_millis(200),
        );
        assert!(second.contains(&InteractionEvent::DoubleClick(A)));
        assert!(!second.contains(&InteractionEvent::Click(A)));
    }

    #[test]
    fn slow_or_different_second_click_is_single() {
        let mut controller = controller();
        let start = Instant::now();

        click(&mut controller, Some(A), PointerButton::Primary, start);
        let late = click(
            &mut controller,
            Some(A),
            PointerButton::Primary,
            start + Duration::from_millis(400),
        );
        assert!(late.contains(&InteractionEvent::Click(A)));

        let other = click(
            &mut controller,
            Some(B),
            PointerButton::Primary,
            start + Duration::from_millis(450),
        );
        assert!(other.contains(&InteractionEvent::Click(B)));
    }

    #[test]
    fn drag_on_empty_space_pans_and_suppresses_click() {
        let mut controller = controller();
        let now = Instant::now();
        let button = PointerButton::Primary;

        controller.handle(PointerEvent::Down { pos: pos2(0.0, 0.0), button }, None, now);
        assert!(controller.is_panning());
        let events = controller.handle(PointerEvent::Move { pos: pos2(12.0, -3.0) }, None, now);
        assert_eq!(events, vec![InteractionEvent::Pan(vec2(12.0, -3.0))]);

        let events = controller.handle(PointerEvent::Up { pos: pos2(12.0, -3.0), button }, None, now);
        assert!(!events.contains(&InteractionEvent::ClickEmpty));
        assert!(!controller.is_panning());
    }

    #[test]
    fn press_on_node_does_not_pan() {
        let mut controller = controller();
        let now = Instant::now();
        let button = PointerButton::Primary;

        controller.handle(PointerEvent::Down { pos: pos2(0.0, 0.0), button }, Some(A), now);
        assert!(!controller.is_panning());
        let events = controller.handle(PointerEvent::Move { pos: pos2(30.0, 0.0) }, Some(A), now);
        assert!(!events.iter().any(|event| matches!(event, InteractionEvent::Pan(_))));

        let events = controller.handle(PointerEvent::Up { pos: pos2(30.0, 0.0), button }, Some(A), now);
        assert!(!events.contains(&InteractionEvent::Click(A)));
    }

    #[test]
    fn empty_click_and_secondary_click() {
        let mut controller = controller();
        let now = Instant::now();
        assert!(click(&mut controller, None, PointerButton::Primary, now)
            .contains(&InteractionEvent::ClickEmpty));
        assert!(click(&mut controller, Some(B), PointerButton::Secondary, now)
            .contains(&InteractionEvent::SecondaryClick(B)));
    }

    #[test]
    fn wheel_becomes_zoom() {
        let mut controller = controller();
        assert_eq!(
            controller.handle(PointerEvent::Wheel { delta: -40.0 }, None, Instant::now()),
            vec![InteractionEvent::Zoom(-40.0)]
        );
    }
}
