// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/document/raster.rs
//
// Raster images (PNG, JPEG, WebP, PNM, ...) decoded with the image crate.

use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, ImageReader};

/// Decode a raster image and apply its EXIF orientation.
///
/// The format is guessed from the content, so rendered pages with a
/// misleading extension decode as well.
pub fn load(path: &Path) -> anyhow::Result<DynamicImage> {
    let image = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()?;

    #[cfg(feature = "exif")]
    let image = match read_orientation(path) {
        Some(orientation) => apply_orientation(image, orientation),
        None => image,
    };

    Ok(image)
}

/// EXIF orientation tag (1-8) of an image file, if present.
#[cfg(feature = "exif")]
fn read_orientation(path: &Path) -> Option<u32> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0)
}

/// Turn the image upright according to an EXIF orientation value.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    /// 3x2 image with a red top-left pixel.
    fn marked() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, RED);
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn orientation_six_rotates_clockwise() {
        let rotated = apply_orientation(marked(), 6);
        assert_eq!(rotated.dimensions(), (2, 3));
        assert_eq!(rotated.get_pixel(1, 0), RED);
    }

    #[test]
    fn orientation_five_transposes() {
        let transposed = apply_orientation(marked(), 5);
        assert_eq!(transposed.dimensions(), (2, 3));
        assert_eq!(transposed.get_pixel(0, 0), RED);
    }

    #[test]
    fn unknown_orientation_is_identity() {
        let img = apply_orientation(marked(), 1);
        assert_eq!(img.get_pixel(0, 0), RED);
        assert_eq!(apply_orientation(marked(), 42).dimensions(), (3, 2));
    }

    #[test]
    fn decodes_by_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page.ppm");
        marked().to_rgb8().save_with_format(&path, image::ImageFormat::Png).unwrap();

        let img = load(&path).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("here.png"));
    }
}
