// SPDX-License-Identifier: GPL-3.0-or-later
// src/config.rs
//
// Global configuration for the application with cosmic-config support.

use cosmic::cosmic_config::{self, CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry};

/// Global configuration for the application.
#[derive(Debug, Clone, CosmicConfigEntry, PartialEq)]
#[version = 1]
pub struct AppConfig {
    /// Whether PDF pages start inverted when there is no history.
    pub default_invert: bool,
    /// Whether PDF pages start trimmed when there is no history.
    pub default_trim: bool,
    /// Background opacity for inverted PDF pages when there is no history.
    pub default_opacity: u8,
    /// Opacity change per key press.
    pub opacity_step: u8,
    /// Cached pages kept before the current one.
    pub cache_keep_before: usize,
    /// Cached pages kept after the current one.
    pub cache_keep_after: usize,
    /// Extra rows kept above and below a trimmed page (in downscaled pixels).
    pub trim_vmargin: u32,
    /// Extra columns kept left and right of a trimmed page (in downscaled pixels).
    pub trim_hmargin: u32,
    /// Horizontal travel, as a fraction of the viewer width, that turns a page.
    pub swipe_threshold: f32,
    /// Hide the mouse cursor when a window opens.
    pub hide_cursor_on_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_invert: false,
            default_trim: false,
            default_opacity: 255,
            opacity_step: 5,
            cache_keep_before: 5,
            cache_keep_after: 5,
            trim_vmargin: 20,
            trim_hmargin: 10,
            swipe_threshold: 0.1,
            hide_cursor_on_start: true,
        }
    }
}
