// SPDX-License-Identifier: GPL-3.0-or-later
// src/constant.rs
//
// Application constants that should not be changed by the user.

use std::time::Duration;

/// Application name shown in window titles.
pub const APP_NAME: &str = "CuteView";

/// Directory name below the XDG data and cache directories.
pub const APP_DIR: &str = "cuteview";

/// History file name inside the data directory.
pub const HISTORY_FILE: &str = "history.toml";

/// Lowest background opacity.
pub const MIN_OPACITY: u8 = 0;

/// Highest background opacity (fully opaque).
pub const MAX_OPACITY: u8 = 255;

/// Upper bound for the zoomed image size in either direction.
pub const MAX_VIEWPORT_DIM: u32 = 10_000;

/// Minimum pixmap size for SVG rendering (prevents 0x0 images).
pub const MIN_PIXMAP_SIZE: u32 = 1;

/// Quiet time after the last write before the open PDF is read again.
pub const SOURCE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Pages are shrunk by this divisor before border detection.
pub const TRIM_DOWNSCALE: u32 = 4;

/// Background for inverted pages; alpha comes from the opacity setting.
pub const DARK_BACKGROUND: (u8, u8, u8) = (34, 34, 34);

/// Background for regular pages.
pub const LIGHT_BACKGROUND: (u8, u8, u8) = (238, 238, 238);

/// Image extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "gif", "bmp", "webp", "svg", "svgz"];

/// Extensions rendered through resvg instead of the raster decoders.
pub const VECTOR_EXTENSIONS: &[&str] = &["svg", "svgz"];
