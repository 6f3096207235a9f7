//! Maps captured 2D images onto the LED geometry.
//!
//! Each LED descriptor covers a fractional rectangle of the image; the
//! processor turns that into concrete pixel regions for the current image
//! size (minus detected black borders) and reduces every region to one
//! color. Region tables are cached per image shape and rebuilt lazily, so
//! a layout change only invalidates the cache.

use heapless::Vec;

use crate::blackborder::{BorderDetector, Crop};
use crate::color::Rgb;
use crate::geometry::Led;
use crate::image::ImageView;

const MAPPING_NAME_MULTICOLOR: &str = "multicolor_mean";
const MAPPING_NAME_UNICOLOR: &str = "unicolor_mean";

/// Strategy reducing image pixels to LED colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingType {
    /// Average the pixels of each LED's own region.
    #[default]
    MulticolorMean,
    /// Average the whole image and assign it to every LED.
    UnicolorMean,
}

impl MappingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MulticolorMean => MAPPING_NAME_MULTICOLOR,
            Self::UnicolorMean => MAPPING_NAME_UNICOLOR,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            MAPPING_NAME_MULTICOLOR => Some(Self::MulticolorMean),
            MAPPING_NAME_UNICOLOR => Some(Self::UnicolorMean),
            _ => None,
        }
    }
}

/// Image processing failure; the frame is dropped, not the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Output length does not match the LED count, or the image is empty.
    GeometryMismatch,
}

/// Pixel-coordinate region of one LED, for one cached image shape.
#[derive(Debug, Clone, Copy)]
struct Region {
    x_min: usize,
    x_max: usize,
    y_min: usize,
    y_max: usize,
}

#[derive(Debug, Clone, Copy)]
struct Fraction {
    h_min: f32,
    h_max: f32,
    v_min: f32,
    v_max: f32,
}

/// The image-to-LED mapper.
pub struct ImageProcessor<const MAX_LEDS: usize> {
    fractions: Vec<Fraction, MAX_LEDS>,
    user_mapping: MappingType,
    hard_mapping: Option<MappingType>,
    blackborder_disabled: bool,
    detector: BorderDetector,
    regions: Vec<Region, MAX_LEDS>,
    /// Image shape and crop the region table was built for.
    cached_shape: Option<(usize, usize, Crop)>,
}

impl<const MAX_LEDS: usize> ImageProcessor<MAX_LEDS> {
    pub fn new(leds: &[Led]) -> Self {
        let mut processor = Self {
            fractions: Vec::new(),
            user_mapping: MappingType::default(),
            hard_mapping: None,
            blackborder_disabled: false,
            detector: BorderDetector::default(),
            regions: Vec::new(),
            cached_shape: None,
        };
        processor.set_led_string(leds);
        processor
    }

    /// Adopt a new LED geometry. Cheap: only copies fractions and
    /// invalidates the region cache.
    pub fn set_led_string(&mut self, leds: &[Led]) {
        self.fractions.clear();
        for led in leds {
            let fraction = Fraction {
                h_min: led.h_min,
                h_max: led.h_max,
                v_min: led.v_min,
                v_max: led.v_max,
            };
            if self.fractions.push(fraction).is_err() {
                break;
            }
        }
        self.cached_shape = None;
    }

    /// Mapping selected through settings.
    pub fn set_mapping_type(&mut self, mapping: MappingType) {
        self.user_mapping = mapping;
    }

    /// Force a strategy regardless of settings, `None` to lift the
    /// override. Used while an effect is the visible source so sampling
    /// stays consistent.
    pub fn set_hard_mapping_type(&mut self, mapping: Option<MappingType>) {
        self.hard_mapping = mapping;
    }

    pub fn mapping_type(&self) -> MappingType {
        self.hard_mapping.unwrap_or(self.user_mapping)
    }

    pub const fn user_mapping_type(&self) -> MappingType {
        self.user_mapping
    }

    /// Skip border detection entirely, independent of the mapping type.
    pub fn set_blackborder_detect_disabled(&mut self, disabled: bool) {
        self.blackborder_disabled = disabled;
    }

    /// Reduce `image` to one color per LED, in geometry order.
    pub fn process(&mut self, image: &ImageView<'_>, out: &mut [Rgb]) -> Result<(), ProcessError> {
        if out.len() != self.fractions.len() {
            return Err(ProcessError::GeometryMismatch);
        }

        let crop = if self.blackborder_disabled {
            Crop::full(image.width(), image.height())
        } else {
            self.detector.detect(image)
        };
        self.rebuild_regions(image, crop);

        match self.mapping_type() {
            MappingType::MulticolorMean => {
                for (region, led) in self.regions.iter().zip(out.iter_mut()) {
                    *led = mean_of(image, *region);
                }
            }
            MappingType::UnicolorMean => {
                let mean = mean_of(
                    image,
                    Region {
                        x_min: crop.x,
                        x_max: crop.x + crop.width,
                        y_min: crop.y,
                        y_max: crop.y + crop.height,
                    },
                );
                out.fill(mean);
            }
        }
        Ok(())
    }

    fn rebuild_regions(&mut self, image: &ImageView<'_>, crop: Crop) {
        let shape = (image.width(), image.height(), crop);
        if self.cached_shape == Some(shape) {
            return;
        }

        self.regions.clear();
        for fraction in &self.fractions {
            let region = region_for(fraction, crop);
            if self.regions.push(region).is_err() {
                break;
            }
        }
        self.cached_shape = Some(shape);
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn region_for(fraction: &Fraction, crop: Crop) -> Region {
    let x_min = crop.x + libm::floorf(fraction.h_min * crop.width as f32) as usize;
    let x_max = crop.x + libm::ceilf(fraction.h_max * crop.width as f32) as usize;
    let y_min = crop.y + libm::floorf(fraction.v_min * crop.height as f32) as usize;
    let y_max = crop.y + libm::ceilf(fraction.v_max * crop.height as f32) as usize;

    // Every region samples at least one pixel.
    Region {
        x_min,
        x_max: x_max.max(x_min + 1).min(crop.x + crop.width.max(1)),
        y_min,
        y_max: y_max.max(y_min + 1).min(crop.y + crop.height.max(1)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mean_of(image: &ImageView<'_>, region: Region) -> Rgb {
    let mut sum_r: u32 = 0;
    let mut sum_g: u32 = 0;
    let mut sum_b: u32 = 0;
    let mut count: u32 = 0;

    for y in region.y_min..region.y_max {
        for x in region.x_min..region.x_max {
            let pixel = image.pixel(x, y);
            sum_r += u32::from(pixel.r);
            sum_g += u32::from(pixel.g);
            sum_b += u32::from(pixel.b);
            count += 1;
        }
    }

    if count == 0 {
        return crate::color::BLACK;
    }
    Rgb::new(
        (sum_r / count) as u8,
        (sum_g / count) as u8,
        (sum_b / count) as u8,
    )
}
