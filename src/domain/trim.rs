// SPDX-License-Identifier: GPL-3.0-or-later
// src/domain/trim.rs
//
// Uniform border detection for trimming scanned pages, and the corner-color
// flood fill that turns page backgrounds transparent.

use std::collections::VecDeque;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use super::region::CropRegion;
use crate::constant::TRIM_DOWNSCALE;

/// Bounding box of the page content, every component divided by the image width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRatio {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRatio {
    /// Map the ratio onto an image of `width` x `height` pixels.
    ///
    /// All components were divided by the width of the measured image, so a
    /// single factor scales them back. Values are truncated.
    pub fn to_region(&self, width: u32, height: u32) -> CropRegion {
        let scale = f64::from(width);
        let px = |v: f64| (v * scale).max(0.0) as u32;
        CropRegion::new(px(self.x), px(self.y), px(self.width), px(self.height))
            .clamp_to(width, height)
    }
}

/// Shared color of the four corner pixels.
///
/// Returns `None` for empty images or when any corner differs.
pub fn corner_color(img: &RgbaImage) -> Option<Rgba<u8>> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let color = *img.get_pixel(0, 0);
    let corners = [(0, h - 1), (w - 1, h - 1), (w - 1, 0)];
    corners
        .iter()
        .all(|&(x, y)| *img.get_pixel(x, y) == color)
        .then_some(color)
}

/// Walk `lines` while `uniform` holds and return the last uniform index.
fn last_uniform(
    lines: impl Iterator<Item = i64>,
    default: i64,
    uniform: impl Fn(i64) -> bool,
) -> i64 {
    let mut last = default;
    for line in lines {
        if !uniform(line) {
            break;
        }
        last = line;
    }
    last
}

/// Detect the border of `img` that has the corner color.
///
/// Rows are scanned from the top and bottom edges towards the middle, then
/// columns from the left and right edges, limited to the rows between the
/// detected top and bottom borders. The box is widened by `vmargin` rows and
/// `hmargin` columns without leaving the image.
pub fn bounding_rect_ratio(img: &RgbaImage, vmargin: u32, hmargin: u32) -> Option<BoundingRatio> {
    let color = corner_color(img)?;
    let (w, h) = (i64::from(img.width()), i64::from(img.height()));
    let at = |x: i64, y: i64| *img.get_pixel(x as u32, y as u32) == color;

    let top = last_uniform(0..h / 2, -1, |y| (0..w).all(|x| at(x, y)));
    let bottom = last_uniform((h / 2 + 1..h).rev(), h, |y| (0..w).all(|x| at(x, y)));
    let left = last_uniform(0..w / 2, -1, |x| (top + 1..bottom).all(|y| at(x, y)));
    let right = last_uniform((w / 2 + 1..w).rev(), w, |x| (top + 1..bottom).all(|y| at(x, y)));

    let (vmargin, hmargin) = (i64::from(vmargin), i64::from(hmargin));
    let top = (top - vmargin).max(-1);
    let bottom = (bottom + vmargin).min(h);
    let left = (left - hmargin).max(-1);
    let right = (right + hmargin).min(w);

    let x = left + 1;
    let y = top + 1;
    let width = w as f64;
    Some(BoundingRatio {
        x: x as f64 / width,
        y: y as f64 / width,
        width: (right - x) as f64 / width,
        height: (bottom - y) as f64 / width,
    })
}

/// Crop a rendered page to its content.
///
/// Detection runs on a copy shrunk by [`TRIM_DOWNSCALE`]; margins are given in
/// pixels of that copy. Returns `None` when the corners disagree.
pub fn trim_page(page: &DynamicImage, vmargin: u32, hmargin: u32) -> Option<DynamicImage> {
    let (w, h) = page.dimensions();
    let small = page
        .resize(
            (w / TRIM_DOWNSCALE).max(1),
            (h / TRIM_DOWNSCALE).max(1),
            FilterType::Triangle,
        )
        .to_rgba8();
    let ratio = bounding_rect_ratio(&small, vmargin, hmargin)?;
    let region = ratio.to_region(w, h);
    region
        .is_valid()
        .then(|| page.crop_imm(region.x, region.y, region.width, region.height))
}

/// Make the background transparent.
///
/// Pixels of the corner color that are reachable from the image edges through
/// 4-connected neighbours of the same color get zero alpha. Returns `false`
/// and leaves the image alone when the corners disagree.
pub fn heuristic_mask(img: &mut RgbaImage) -> bool {
    let Some(color) = corner_color(img) else {
        return false;
    };
    let (w, h) = img.dimensions();
    let mut seen = vec![false; w as usize * h as usize];
    let mut queue = VecDeque::new();

    let edges = (0..w)
        .flat_map(|x| [(x, 0), (x, h - 1)])
        .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
    for (x, y) in edges {
        queue.push_back((x, y));
    }

    while let Some((x, y)) = queue.pop_front() {
        let idx = y as usize * w as usize + x as usize;
        if seen[idx] || *img.get_pixel(x, y) != color {
            continue;
        }
        seen[idx] = true;
        img.get_pixel_mut(x, y).0[3] = 0;

        if x > 0 {
            queue.push_back((x - 1, y));
        }
        if x + 1 < w {
            queue.push_back((x + 1, y));
        }
        if y > 0 {
            queue.push_back((x, y - 1));
        }
        if y + 1 < h {
            queue.push_back((x, y + 1));
        }
    }
    true
}
