// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/model.rs
//
// Application state.

use image::DynamicImage;

use crate::app::document::{ImageHandle, Mode, Pages, create_image_handle};
use crate::config::AppConfig;
use crate::constant::MAX_OPACITY;
use crate::domain::trim;
use crate::domain::viewport::{self, ZoomPan};

pub struct AppModel {
    // Document.
    pub pages: Option<Pages>,
    /// Current page as delivered by the page model.
    pub pixmap: Option<DynamicImage>,
    /// What the viewer shows: the pixmap after trim, fit, zoom and mask.
    pub handle: Option<ImageHandle>,

    // View.
    pub zoom: ZoomPan,
    pub viewer_size: (u32, u32),

    // UI state.
    pub cursor_hidden: bool,
    pub write_history_on_close: bool,
    pub error: Option<String>,
}

impl AppModel {
    pub fn new(pages: Option<Pages>, config: &AppConfig) -> Self {
        Self {
            pages,
            pixmap: None,
            handle: None,
            zoom: ZoomPan::default(),
            viewer_size: (0, 0),
            cursor_hidden: config.hide_cursor_on_start,
            write_history_on_close: true,
            error: None,
        }
    }

    pub fn set_error<S: Into<String>>(&mut self, msg: S) {
        self.error = Some(msg.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Resolution pages are fetched at.
    pub fn longdim(&self) -> u32 {
        viewport::long_dimension(self.viewer_size)
    }

    pub fn mode(&self) -> Option<Mode> {
        self.pages.as_ref().map(Pages::mode)
    }

    /// Store a freshly fetched page, or the reason there is none.
    pub fn set_pixmap(&mut self, result: anyhow::Result<DynamicImage>) {
        match result {
            Ok(pixmap) => {
                self.pixmap = Some(pixmap);
                self.clear_error();
            }
            Err(e) => {
                log::error!("{e:#}");
                self.pixmap = None;
                self.set_error(format!("{e:#}"));
            }
        }
    }

    /// Rebuild the displayed bitmap from the pixmap.
    pub fn redraw(&mut self, config: &AppConfig) {
        self.handle = self.compose(config).as_ref().map(create_image_handle);
    }

    fn compose(&mut self, config: &AppConfig) -> Option<DynamicImage> {
        let pages = self.pages.as_ref()?;
        let pixmap = self.pixmap.as_ref()?;
        let label = self.viewer_size;
        if label.0 == 0 || label.1 == 0 {
            return None;
        }

        match pages.mode() {
            Mode::Images => self.zoom.window(label)?.render(pixmap),
            Mode::Pdf => {
                let fitted = pages
                    .trim()
                    .then(|| trim::trim_page(pixmap, config.trim_vmargin, config.trim_hmargin))
                    .flatten()
                    .map(|trimmed| viewport::fit_image(&trimmed, label))
                    .unwrap_or_else(|| viewport::fit_image(pixmap, label));

                if pages.invert() && pages.opacity() < MAX_OPACITY {
                    let mut rgba = fitted.to_rgba8();
                    if trim::heuristic_mask(&mut rgba) {
                        return Some(DynamicImage::ImageRgba8(rgba));
                    }
                }
                Some(fitted)
            }
        }
    }
}
