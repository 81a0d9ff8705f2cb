// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/view/gesture_layer.rs
//
// Transparent layer above the page that turns touch and mouse input into
// page turns, pinch zoom and resize notifications.

use cosmic::{
    Element, Renderer,
    iced::{
        Length, Point, Rectangle, Size,
        advanced::{
            Clipboard, Layout, Shell, Widget,
            layout::{Limits, Node},
            widget::{Tree, tree},
        },
        event::{Event, Status},
        mouse::{self, Button, Cursor},
        touch,
    },
};

use crate::app::AppMessage;
use crate::domain::gesture::{Gesture, GestureTracker, MOUSE_FINGER};

/// Per-widget state that outlives view rebuilds.
#[derive(Debug, Default)]
struct State {
    tracker: GestureTracker,
    size: Option<Size>,
}

pub struct GestureLayer {
    pinch_enabled: bool,
    cursor_hidden: bool,
    swipe_threshold: f32,
}

impl GestureLayer {
    pub fn new(pinch_enabled: bool, cursor_hidden: bool, swipe_threshold: f32) -> Self {
        Self {
            pinch_enabled,
            cursor_hidden,
            swipe_threshold,
        }
    }
}

impl Widget<AppMessage, cosmic::Theme, Renderer> for GestureLayer {
    fn tag(&self) -> tree::Tag {
        tree::Tag::of::<State>()
    }

    fn state(&self) -> tree::State {
        tree::State::new(State::default())
    }

    fn size(&self) -> Size<Length> {
        Size::new(Length::Fill, Length::Fill)
    }

    fn layout(&self, _tree: &mut Tree, _renderer: &Renderer, limits: &Limits) -> Node {
        Node::new(limits.max())
    }

    fn draw(
        &self,
        _tree: &Tree,
        _renderer: &mut Renderer,
        _theme: &cosmic::Theme,
        _style: &cosmic::iced::advanced::renderer::Style,
        _layout: Layout<'_>,
        _cursor: Cursor,
        _viewport: &Rectangle,
    ) {
    }

    fn on_event(
        &mut self,
        tree: &mut Tree,
        event: Event,
        layout: Layout<'_>,
        cursor: Cursor,
        _renderer: &Renderer,
        _clipboard: &mut dyn Clipboard,
        shell: &mut Shell<'_, AppMessage>,
        _viewport: &Rectangle,
    ) -> Status {
        let state = tree.state.downcast_mut::<State>();
        let bounds = layout.bounds();
        state.tracker.set_threshold(self.swipe_threshold);

        if state.size != Some(bounds.size()) {
            state.size = Some(bounds.size());
            shell.publish(AppMessage::ViewerResized {
                width: bounds.width,
                height: bounds.height,
            });
        }

        let relative = |p: Point| (p.x - bounds.x, p.y - bounds.y);

        let gesture = match event {
            Event::Touch(touch::Event::FingerPressed { id, position }) => {
                if !bounds.contains(position) {
                    return Status::Ignored;
                }
                state.tracker.press(id.0, relative(position));
                return Status::Captured;
            }
            Event::Touch(touch::Event::FingerMoved { id, position }) => {
                state.tracker.moved(id.0, relative(position))
            }
            Event::Touch(touch::Event::FingerLifted { id, position }) => {
                state.tracker.lift(id.0, relative(position), bounds.width)
            }
            Event::Touch(touch::Event::FingerLost { id, .. }) => {
                state.tracker.cancel(id.0);
                None
            }
            Event::Mouse(mouse::Event::ButtonPressed(Button::Left)) => {
                let Some(pos) = cursor.position_over(bounds) else {
                    return Status::Ignored;
                };
                state.tracker.press(MOUSE_FINGER, relative(pos));
                return Status::Captured;
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if !state.tracker.is_tracking(MOUSE_FINGER) {
                    return Status::Ignored;
                }
                state.tracker.moved(MOUSE_FINGER, relative(position))
            }
            Event::Mouse(mouse::Event::ButtonReleased(Button::Left)) => {
                if !state.tracker.is_tracking(MOUSE_FINGER) {
                    return Status::Ignored;
                }
                match cursor.position() {
                    Some(pos) => state.tracker.lift(MOUSE_FINGER, relative(pos), bounds.width),
                    None => {
                        state.tracker.cancel(MOUSE_FINGER);
                        None
                    }
                }
            }
            _ => return Status::Ignored,
        };

        match gesture {
            Some(Gesture::Swipe(direction)) => shell.publish(AppMessage::Swipe(direction)),
            Some(Gesture::Pinch {
                scale,
                center_delta,
            }) if self.pinch_enabled => shell.publish(AppMessage::Pinch {
                scale,
                dx: center_delta.0,
                dy: center_delta.1,
            }),
            _ => {}
        }
        Status::Captured
    }

    fn mouse_interaction(
        &self,
        _tree: &Tree,
        layout: Layout<'_>,
        cursor: Cursor,
        _viewport: &Rectangle,
        _renderer: &Renderer,
    ) -> mouse::Interaction {
        if self.cursor_hidden && cursor.is_over(layout.bounds()) {
            mouse::Interaction::Hidden
        } else {
            mouse::Interaction::None
        }
    }
}

impl<'a> From<GestureLayer> for Element<'a, AppMessage> {
    fn from(widget: GestureLayer) -> Self {
        Element::new(widget)
    }
}

pub fn gesture_layer<'a>(
    pinch_enabled: bool,
    cursor_hidden: bool,
    swipe_threshold: f32,
) -> Element<'a, AppMessage> {
    GestureLayer::new(pinch_enabled, cursor_hidden, swipe_threshold).into()
}
