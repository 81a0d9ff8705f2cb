// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/vector.rs
//
// Vector images (SVG, SVGZ) rasterized with resvg.

use std::path::Path;

use anyhow::anyhow;
use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia::{self, Pixmap};
use resvg::usvg::{Options, Tree};

use crate::constant::MIN_PIXMAP_SIZE;

/// Rasterize an SVG so that its long side is `longdim` pixels.
///
/// Compressed SVGZ data is detected by `usvg` itself.
pub fn load(path: &Path, longdim: u32) -> anyhow::Result<DynamicImage> {
    let data = std::fs::read(path)?;
    let document = Tree::from_data(&data, &Options::default())?;

    let size = document.size();
    let native = size.width().max(size.height());
    let scale = if native > 0.0 {
        longdim.max(MIN_PIXMAP_SIZE) as f32 / native
    } else {
        1.0
    };

    let width = ((size.width() * scale).ceil() as u32).max(MIN_PIXMAP_SIZE);
    let height = ((size.height() * scale).ceil() as u32).max(MIN_PIXMAP_SIZE);
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| anyhow!("Failed to create pixmap"))?;

    let ts = tiny_skia::Transform::from_scale(scale, scale);
    resvg::render(&document, ts, &mut pixmap.as_mut());

    pixmap_to_dynamic_image(&pixmap)
}

/// Convert a tiny_skia Pixmap to a DynamicImage.
fn pixmap_to_dynamic_image(pixmap: &Pixmap) -> anyhow::Result<DynamicImage> {
    let width = pixmap.width();
    let height = pixmap.height();

    // tiny_skia uses premultiplied alpha, we need to unpremultiply for image crate
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for pixel in pixmap.pixels() {
        let a = pixel.alpha();
        if a == 0 {
            pixels.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            let r = (pixel.red() as u16 * 255 / a as u16) as u8;
            let g = (pixel.green() as u16 * 255 / a as u16) as u8;
            let b = (pixel.blue() as u16 * 255 / a as u16) as u8;
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }

    let rgba_image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Pixmap data does not match {width}x{height}"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}

#[cfg(test)]
mod tests {
    use image::GenericImageView;

    use super::*;

    #[test]
    fn long_side_matches_the_request() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shape.svg");
        std::fs::write(
            &path,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
                <rect width="200" height="100" fill="#336699"/>
            </svg>"##,
        )
        .unwrap();

        let img = load(&path, 800).unwrap();
        assert_eq!(img.dimensions(), (800, 400));
    }
}
