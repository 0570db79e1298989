use eframe::egui::{PointerButton, Rect, Ui};

use vecset_explorer::explorer::PointerEvent;

use super::super::ViewModel;

const BUTTONS: [PointerButton; 2] = [PointerButton::Primary, PointerButton::Secondary];

impl ViewModel {
    /// Translates this frame's egui input over `rect` into canvas-relative
    /// pointer events. A drag that leaves the canvas keeps reporting until
    /// the button is released.
    pub(in crate::app) fn collect_pointer_events(&mut self, ui: &Ui, rect: Rect) -> Vec<PointerEvent> {
        let (hover, pressed, released, any_down, scroll) = ui.input(|input| {
            let pointer = &input.pointer;
            (
                pointer.hover_pos(),
                BUTTONS.map(|button| pointer.button_pressed(button)),
                BUTTONS.map(|button| pointer.button_released(button)),
                pointer.any_down(),
                input.raw_scroll_delta.y,
            )
        });

        let mut events = Vec::new();
        let inside = hover.is_some_and(|pos| rect.contains(pos));
        let tracking = inside || (self.pointer.inside && any_down);

        if let Some(pos) = hover.filter(|_| tracking) {
            let local = (pos - rect.min).to_pos2();
            if self.pointer.position != Some(local) {
                events.push(PointerEvent::Move { pos: local });
                self.pointer.position = Some(local);
            }
            self.pointer.inside = true;

            for (button, pressed) in BUTTONS.into_iter().zip(pressed) {
                if pressed && inside {
                    events.push(PointerEvent::Down { pos: local, button });
                }
            }
            for (button, released) in BUTTONS.into_iter().zip(released) {
                if released {
                    events.push(PointerEvent::Up { pos: local, button });
                }
            }
            if inside && scroll.abs() > f32::EPSILON {
                events.push(PointerEvent::Wheel { delta: scroll });
            }
        } else if self.pointer.inside {
            events.push(PointerEvent::Leave);
            self.pointer.inside = false;
            self.pointer.position = None;
        }

        events
    }
}
