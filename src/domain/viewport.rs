// SPDX-License-Identifier: GPL-3.0-or-later
// src/domain/viewport.rs
//
// Fit, zoom and pan math for the page viewer.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::region::CropRegion;
use crate::constant::MAX_VIEWPORT_DIM;

/// Largest size with the aspect ratio of `size` that fits into `bounds`.
pub fn fit_size(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (w, h) = (u64::from(size.0.max(1)), u64::from(size.1.max(1)));
    let (bw, bh) = (u64::from(bounds.0), u64::from(bounds.1));
    let rw = bh * w / h;
    let (fw, fh) = if rw <= bw { (rw, bh) } else { (bw, bw * h / w) };
    ((fw as u32).max(1), (fh as u32).max(1))
}

/// Scale `img` to fit into `bounds` keeping the aspect ratio.
pub fn fit_image(img: &DynamicImage, bounds: (u32, u32)) -> DynamicImage {
    let (w, h) = fit_size(img.dimensions(), bounds);
    img.resize_exact(w, h, FilterType::Triangle)
}

/// Longest side of the viewer, the resolution pages are rendered at.
pub fn long_dimension(label: (u32, u32)) -> u32 {
    label.0.max(label.1)
}

/// Zoom factor and pan offset of the image viewer.
///
/// Pan offsets are in viewer pixels at zoom 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPan {
    pub factor: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomPan {
    fn default() -> Self {
        Self {
            factor: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// The part of the zoomed image that is visible in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageWindow {
    /// Box the image is fitted into.
    pub zoomed: (u32, u32),
    /// Top-left corner of the visible part inside the zoomed box.
    pub offset: (u32, u32),
    /// Viewer size.
    pub label: (u32, u32),
}

impl ZoomPan {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply one pinch step.
    ///
    /// The scale factor is rounded to one decimal; the pan follows half the
    /// movement of the pinch center in the opposite direction.
    pub fn pinch(&mut self, scale_factor: f64, center_delta: (f64, f64)) {
        self.factor *= (scale_factor * 10.0).round() / 10.0;
        self.x -= 0.5 * center_delta.0;
        self.y -= 0.5 * center_delta.1;
    }

    /// Compute the visible window for a viewer of size `label`.
    ///
    /// The zoom factor is normalized to what can actually be shown: never
    /// below 1 and never beyond [`MAX_VIEWPORT_DIM`] pixels.
    pub fn window(&mut self, label: (u32, u32)) -> Option<ImageWindow> {
        let (lw, lh) = label;
        if lw == 0 || lh == 0 {
            return None;
        }
        let zoom = self.factor.max(1.0);
        let iw = ((zoom * f64::from(lw)) as u32).min(MAX_VIEWPORT_DIM);
        let ih = ((zoom * f64::from(lh)) as u32).min(MAX_VIEWPORT_DIM);
        self.factor = (f64::from(iw) / f64::from(lw)).max(f64::from(ih) / f64::from(lh));

        let clamp = |pan: f64, inner: u32, outer: u32| {
            let limit = i64::from(inner) - i64::from(outer);
            ((pan * self.factor) as i64).min(limit).max(0) as u32
        };
        Some(ImageWindow {
            zoomed: (iw, ih),
            offset: (clamp(self.x, iw, lw), clamp(self.y, ih, lh)),
            label,
        })
    }
}

impl ImageWindow {
    /// Source region of an image of `size` that ends up visible, and the
    /// size it is shown at.
    pub fn visible_source(&self, size: (u32, u32)) -> Option<(CropRegion, (u32, u32))> {
        let (sw, sh) = fit_size(size, self.zoomed);
        let (ox, oy) = self.offset;
        let right = (ox + self.label.0).min(sw);
        let bottom = (oy + self.label.1).min(sh);
        if ox >= right || oy >= bottom {
            return None;
        }
        let shown = (right - ox, bottom - oy);

        let sx = f64::from(size.0) / f64::from(sw);
        let sy = f64::from(size.1) / f64::from(sh);
        let region = CropRegion::new(
            (f64::from(ox) * sx) as u32,
            (f64::from(oy) * sy) as u32,
            ((f64::from(shown.0) * sx).round() as u32).max(1),
            ((f64::from(shown.1) * sy).round() as u32).max(1),
        )
        .clamp_to(size.0, size.1);
        region.is_valid().then_some((region, shown))
    }

    /// Produce the bitmap shown in the viewer.
    pub fn render(&self, img: &DynamicImage) -> Option<DynamicImage> {
        let (region, (w, h)) = self.visible_source(img.dimensions())?;
        let visible = img.crop_imm(region.x, region.y, region.width, region.height);
        Some(visible.resize_exact(w, h, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_size_keeps_aspect_ratio() {
        assert_eq!(fit_size((200, 100), (100, 100)), (100, 50));
        assert_eq!(fit_size((100, 200), (100, 100)), (50, 100));
        assert_eq!(fit_size((10, 10), (300, 200)), (200, 200));
    }

    #[test]
    fn long_dimension_picks_the_larger_side() {
        assert_eq!(long_dimension((640, 480)), 640);
        assert_eq!(long_dimension((480, 640)), 640);
    }

    #[test]
    fn window_at_default_zoom_shows_everything() {
        let mut zoom = ZoomPan::default();
        let window = zoom.window((100, 50)).unwrap();

        assert_eq!(window.zoomed, (100, 50));
        assert_eq!(window.offset, (0, 0));
        assert_eq!(zoom.factor, 1.0);
    }

    #[test]
    fn zoom_below_one_is_normalized() {
        let mut zoom = ZoomPan {
            factor: 0.5,
            ..ZoomPan::default()
        };
        zoom.window((100, 50)).unwrap();

        assert_eq!(zoom.factor, 1.0);
    }

    #[test]
    fn pan_is_scaled_and_clamped() {
        let mut zoom = ZoomPan {
            factor: 2.5,
            x: 10.0,
            y: 4.0,
        };
        let window = zoom.window((100, 50)).unwrap();
        assert_eq!(window.zoomed, (250, 125));
        assert_eq!(window.offset, (25, 10));

        let mut far = ZoomPan {
            factor: 2.5,
            x: 1000.0,
            y: -30.0,
        };
        let window = far.window((100, 50)).unwrap();
        assert_eq!(window.offset, (150, 0));
    }

    #[test]
    fn zoom_is_capped() {
        let mut zoom = ZoomPan {
            factor: 500.0,
            ..ZoomPan::default()
        };
        let window = zoom.window((100, 50)).unwrap();

        assert_eq!(window.zoomed, (MAX_VIEWPORT_DIM, MAX_VIEWPORT_DIM));
        assert_eq!(zoom.factor, 200.0);
    }

    #[test]
    fn empty_viewer_has_no_window() {
        assert!(ZoomPan::default().window((0, 10)).is_none());
    }

    #[test]
    fn pinch_rounds_the_scale_factor() {
        let mut zoom = ZoomPan::default();
        zoom.pinch(1.04, (10.0, -4.0));
        assert_eq!(zoom.factor, 1.0);
        assert_eq!((zoom.x, zoom.y), (-5.0, 2.0));

        zoom.pinch(1.46, (0.0, 0.0));
        assert!((zoom.factor - 1.5).abs() < 1e-9);
    }

    #[test]
    fn visible_source_maps_back_to_image_pixels() {
        // 200x100 image in a 100x50 viewer zoomed by 2: the zoomed image is
        // 200x100, exactly the source, and the right half is visible.
        let window = ImageWindow {
            zoomed: (200, 100),
            offset: (100, 50),
            label: (100, 50),
        };
        let (region, shown) = window.visible_source((200, 100)).unwrap();

        assert_eq!(region.as_tuple(), (100, 50, 100, 50));
        assert_eq!(shown, (100, 50));
    }

    #[test]
    fn narrow_images_show_only_their_width() {
        let window = ImageWindow {
            zoomed: (100, 100),
            offset: (0, 0),
            label: (100, 100),
        };
        let img = DynamicImage::new_rgba8(50, 100);
        let shown = window.render(&img).unwrap();

        assert_eq!(shown.dimensions(), (50, 100));
    }
}
