// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/message.rs
//
// Application messages: events, user actions, and internal signals.

use crate::domain::gesture::SwipeDirection;

#[derive(Debug, Clone)]
pub enum AppMessage {
    // Navigation.
    NextPage,
    PrevPage,
    Swipe(SwipeDirection),

    // Display.
    ToggleInvert,
    ToggleTrim,
    LessOpaque,
    MoreOpaque,
    ToggleCursor,

    // View / zoom.
    Pinch {
        scale: f64,
        dx: f64,
        dy: f64,
    },
    ViewerResized {
        width: f32,
        height: f32,
    },

    // Background work.
    Prefetched {
        page: usize,
        result: Result<(), String>,
    },
    SourceChanged,

    // Window.
    Quit,
    QuitWithoutHistory,
    CloseRequested,
}
