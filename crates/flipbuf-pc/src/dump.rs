use std::path::Path;

use flipbuf_core::Surface;
use flipbuf_hal::Pixel;
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::SimError;

/// Expand an RGB565 pixel to 8 bits per channel, replicating the high bits
/// into the low ones so full-scale values stay full-scale.
pub fn rgb565_to_rgb8(p: Pixel) -> [u8; 3] {
    let r = ((p >> 11) & 0x1F) as u8;
    let g = ((p >> 5) & 0x3F) as u8;
    let b = (p & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

pub fn surface_to_image(surface: &Surface<'_>) -> RgbImage {
    RgbImage::from_fn(u32::from(surface.width()), u32::from(surface.height()), |x, y| {
        Rgb(rgb565_to_rgb8(surface.pixel(x as u16, y as u16)))
    })
}

pub fn write_png(surface: &Surface<'_>, path: &Path) -> Result<(), SimError> {
    surface_to_image(surface)
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| SimError::Image {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipbuf_core::rgb565;

    #[test]
    fn full_scale_channels_expand_to_255() {
        assert_eq!(rgb565_to_rgb8(rgb565(255, 255, 255)), [255, 255, 255]);
        assert_eq!(rgb565_to_rgb8(rgb565(255, 0, 0)), [255, 0, 0]);
        assert_eq!(rgb565_to_rgb8(0), [0, 0, 0]);
    }

    #[test]
    fn image_matches_surface_size() {
        let mut buf = vec![rgb565(0, 0, 255); 6 * 4];
        let surface = Surface::new(&mut buf, 6, 4).unwrap();
        let img = surface_to_image(&surface);
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.get_pixel(5, 3).0, [0, 0, 255]);
    }
}
