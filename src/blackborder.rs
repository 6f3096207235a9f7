//! Black-border detection.
//!
//! Letterboxed or pillarboxed video carries inactive borders that would
//! drag the mapped LED colors toward black. The detector scans inward from
//! the image edges for the first row and column holding content above a
//! brightness threshold and reports the crop to sample instead.

use crate::color::Rgb;
use crate::image::ImageView;

/// Content rectangle of an image after border removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Crop {
    /// The full image, no borders removed.
    pub const fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Threshold-based border scanner.
#[derive(Debug, Clone, Copy)]
pub struct BorderDetector {
    threshold: u8,
}

impl Default for BorderDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl BorderDetector {
    /// Channels at or below this count as border black.
    pub const DEFAULT_THRESHOLD: u8 = 8;

    pub const fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    fn is_content(&self, color: Rgb) -> bool {
        color.r > self.threshold || color.g > self.threshold || color.b > self.threshold
    }

    fn row_has_content(&self, image: &ImageView<'_>, y: usize) -> bool {
        (0..image.width()).any(|x| self.is_content(image.pixel(x, y)))
    }

    fn column_has_content(&self, image: &ImageView<'_>, x: usize) -> bool {
        (0..image.height()).any(|y| self.is_content(image.pixel(x, y)))
    }

    /// Detect the content crop of `image`.
    ///
    /// Borders are assumed symmetric, as produced by letter- and
    /// pillarboxing. An all-black frame yields the full image so the
    /// mapping never collapses to an empty region.
    pub fn detect(&self, image: &ImageView<'_>) -> Crop {
        let width = image.width();
        let height = image.height();

        let top = (0..height / 2).find(|&y| self.row_has_content(image, y));
        let Some(top) = top else {
            return Crop::full(width, height);
        };
        let left = (0..width / 2)
            .find(|&x| self.column_has_content(image, x))
            .unwrap_or(0);

        Crop {
            x: left,
            y: top,
            width: width - 2 * left,
            height: height - 2 * top,
        }
    }
}
