//! Image payloads for capture-driven input channels.

use heapless::Vec;

use crate::color::{BLACK, Rgb};

/// A borrowed 2D image, row-major.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    width: usize,
    height: usize,
    pixels: &'a [Rgb],
}

impl<'a> ImageView<'a> {
    /// Create a view over `pixels`.
    ///
    /// Returns `None` unless `pixels.len() == width * height` and the
    /// image is non-empty.
    pub fn new(width: usize, height: usize, pixels: &'a [Rgb]) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn pixels(&self) -> &'a [Rgb] {
        self.pixels
    }

    /// Pixel at (x, y). Out-of-bounds coordinates read as black.
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        if x >= self.width || y >= self.height {
            return BLACK;
        }
        self.pixels[y * self.width + x]
    }
}

/// An owned image copy, stored inside a muxer channel.
#[derive(Debug, Clone, Default)]
pub struct ImageFrame<const MAX_PIXELS: usize> {
    width: usize,
    height: usize,
    pixels: Vec<Rgb, MAX_PIXELS>,
}

impl<const MAX_PIXELS: usize> ImageFrame<MAX_PIXELS> {
    /// Copy a view into an owned frame.
    ///
    /// Returns `None` when the image does not fit into `MAX_PIXELS`.
    pub fn from_view(view: &ImageView<'_>) -> Option<Self> {
        let pixels = Vec::from_slice(view.pixels()).ok()?;
        Some(Self {
            width: view.width(),
            height: view.height(),
            pixels,
        })
    }

    pub fn as_view(&self) -> Option<ImageView<'_>> {
        ImageView::new(self.width, self.height, &self.pixels)
    }
}
