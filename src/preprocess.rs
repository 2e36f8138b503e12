//! Subtitle band cropping and binarization.
//!
//! Before OCR, each sampled frame is cut down to the horizontal band where
//! subtitles are drawn. Binarization then forces every pixel to pure black
//! or pure white, assuming light text on a darker background. Dropping the
//! anti-aliased edge pixels keeps the OCR engine's glyph segmentation
//! stable from one frame to the next.

use image::{DynamicImage, GenericImageView, GrayImage, Luma, imageops};

use crate::configuration::SubtitleRegion;

/// Channel average at or above which a pixel becomes white.
pub const BINARIZE_THRESHOLD: u8 = 128;

/// Crop the subtitle band out of `frame`.
///
/// The band spans the full frame width and always has the height given by
/// [`SubtitleRegion::pixel_band`]. Rows that fall below the frame are
/// black.
pub fn crop_region(frame: &DynamicImage, region: SubtitleRegion) -> DynamicImage {
    let (width, height) = frame.dimensions();
    let (y, band_height) = region.pixel_band(height);
    let visible = band_height.min(height - y);
    if visible == band_height {
        return frame.crop_imm(0, y, width, band_height);
    }

    let mut band = DynamicImage::new(width, band_height, frame.color());
    if visible > 0 {
        imageops::replace(&mut band, &frame.crop_imm(0, y, width, visible), 0, 0);
    }
    band
}

/// Hard black/white threshold on the average of the three colour channels.
///
/// A pixel whose `(r + g + b) / 3` is at least [`BINARIZE_THRESHOLD`]
/// becomes 255, every other pixel becomes 0. Alpha is ignored.
pub fn binarize(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let threshold = u16::from(BINARIZE_THRESHOLD) * 3;

    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        if sum >= threshold { Luma([255]) } else { Luma([0]) }
    })
}

/// Produce the bitmap handed to OCR for one tick.
///
/// With `enabled == false` the cropped band is returned untouched.
pub fn preprocess(frame: &DynamicImage, region: SubtitleRegion, enabled: bool) -> DynamicImage {
    let band = crop_region(frame, region);
    if enabled {
        DynamicImage::ImageLuma8(binarize(&band))
    } else {
        band
    }
}
