//! LED geometry derived from layout configuration.
//!
//! Each LED covers a fractional rectangle of the capture image and carries
//! the byte order its position on the strip requires. The geometry is
//! rebuilt whenever the layout or the device byte order changes.

use heapless::Vec;

use crate::color::ColorOrder;
use crate::config::LedSpec;

/// One LED of the installation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Led {
    /// Horizontal image region, fractions of the width in [0, 1].
    pub h_min: f32,
    pub h_max: f32,
    /// Vertical image region, fractions of the height in [0, 1].
    pub v_min: f32,
    pub v_max: f32,
    /// Channel order expected by this LED.
    pub order: ColorOrder,
}

/// Ordered LED descriptors, at most `MAX_LEDS` of them.
pub type LedString<const MAX_LEDS: usize> = Vec<Led, MAX_LEDS>;

#[inline]
fn clamp_fraction(v: f32) -> f32 {
    if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    }
}

/// Build the LED string from parsed layout specs.
///
/// Fractions are clamped to [0, 1]; LEDs without an explicit order inherit
/// the device-wide default. Specs beyond `MAX_LEDS` are dropped.
pub fn build_led_string<const MAX_LEDS: usize>(
    specs: &[LedSpec],
    default_order: ColorOrder,
) -> LedString<MAX_LEDS> {
    let mut leds = LedString::new();
    for spec in specs {
        let led = Led {
            h_min: clamp_fraction(spec.h_min),
            h_max: clamp_fraction(spec.h_max),
            v_min: clamp_fraction(spec.v_min),
            v_max: clamp_fraction(spec.v_max),
            order: spec.order.unwrap_or(default_order),
        };
        if leds.push(led).is_err() {
            break;
        }
    }
    leds
}
