//! Per-LED color calibration.
//!
//! Calibration profiles carry gamma, whitepoint and backlight parameters;
//! LEDs are assigned to a profile by index, with an optional default
//! profile covering the rest. Gamma is precomputed into per-channel
//! lookup tables when a profile is built, so `apply` is table lookups and
//! integer scaling only.

use heapless::Vec;

use crate::config::AdjustmentSpec;
use crate::color::Rgb;
use crate::math8::scale8;
use crate::muxer::{Name, name_from};

const GAMMA_IDENTITY_EPSILON: f32 = 1e-3;

fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if libm::fabsf(gamma - 1.0) < GAMMA_IDENTITY_EPSILON {
        for (i, entry) in lut.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *entry = i as u8;
            }
        }
        return lut;
    }
    for (i, entry) in lut.iter_mut().enumerate() {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        {
            let normalized = i as f32 / 255.0;
            *entry = (libm::powf(normalized, gamma) * 255.0 + 0.5) as u8;
        }
    }
    lut
}

#[derive(Clone)]
struct Profile {
    id: Name,
    white: Rgb,
    gamma: [[u8; 256]; 3],
    backlight_threshold: u8,
    backlight_colored: bool,
}

impl Profile {
    fn from_spec(spec: &AdjustmentSpec<'_>) -> Self {
        Self {
            id: name_from(spec.id),
            white: spec.white,
            gamma: [
                gamma_lut(spec.gamma[0]),
                gamma_lut(spec.gamma[1]),
                gamma_lut(spec.gamma[2]),
            ],
            backlight_threshold: spec.backlight_threshold,
            backlight_colored: spec.backlight_colored,
        }
    }

    fn adjust(&self, color: &mut Rgb, backlight_enabled: bool) {
        color.r = scale8(self.gamma[0][color.r as usize], self.white.r);
        color.g = scale8(self.gamma[1][color.g as usize], self.white.g);
        color.b = scale8(self.gamma[2][color.b as usize], self.white.b);

        if !backlight_enabled || self.backlight_threshold == 0 {
            return;
        }
        let floor = self.backlight_threshold;
        if self.backlight_colored {
            color.r = color.r.max(floor);
            color.g = color.g.max(floor);
            color.b = color.b.max(floor);
        } else if color.r < floor && color.g < floor && color.b < floor {
            color.r = floor;
            color.g = floor;
            color.b = floor;
        }
    }
}

/// Maximum number of distinct calibration profiles.
pub const MAX_PROFILES: usize = 8;

/// The per-LED calibration table.
///
/// `rebuild` constructs a complete replacement and swaps it in a single
/// assignment, so `apply` never observes a half-built table.
pub struct ColorAdjustment<const MAX_LEDS: usize> {
    profiles: Vec<Profile, MAX_PROFILES>,
    /// Profile index per LED; `None` falls back to the default profile.
    led_map: Vec<Option<u8>, MAX_LEDS>,
    default_profile: Option<u8>,
    backlight_enabled: bool,
}

impl<const MAX_LEDS: usize> ColorAdjustment<MAX_LEDS> {
    pub fn new(specs: &[AdjustmentSpec<'_>], led_count: usize) -> Self {
        let mut adjustment = Self {
            profiles: Vec::new(),
            led_map: Vec::new(),
            default_profile: None,
            backlight_enabled: true,
        };
        adjustment.populate(specs, led_count);
        adjustment
    }

    /// Replace the whole table for a new color config or LED layout.
    pub fn rebuild(&mut self, specs: &[AdjustmentSpec<'_>], led_count: usize) {
        let mut fresh = Self::new(specs, led_count);
        fresh.backlight_enabled = self.backlight_enabled;
        *self = fresh;
    }

    fn populate(&mut self, specs: &[AdjustmentSpec<'_>], led_count: usize) {
        let led_count = led_count.min(MAX_LEDS);
        for _ in 0..led_count {
            let _ = self.led_map.push(None);
        }

        for spec in specs {
            if self.profiles.is_full() {
                break;
            }
            #[allow(clippy::cast_possible_truncation)]
            let profile_idx = self.profiles.len() as u8;
            let _ = self.profiles.push(Profile::from_spec(spec));

            if spec.leds.is_empty() {
                // A profile without explicit LEDs is the global default.
                if self.default_profile.is_none() {
                    self.default_profile = Some(profile_idx);
                }
            } else {
                for &led in spec.leds {
                    if let Some(slot) = self.led_map.get_mut(led as usize) {
                        *slot = Some(profile_idx);
                    }
                }
            }
        }
    }

    /// False when any LED has neither a specific nor a default profile.
    ///
    /// Non-fatal: uncovered LEDs pass through unadjusted.
    pub fn verify(&self) -> bool {
        self.default_profile.is_some() || self.led_map.iter().all(Option::is_some)
    }

    /// Suppress the backlight floor, e.g. while a literal color or an
    /// effect is visible.
    pub fn set_backlight_enabled(&mut self, enabled: bool) {
        self.backlight_enabled = enabled;
    }

    pub const fn backlight_enabled(&self) -> bool {
        self.backlight_enabled
    }

    /// Profile identifiers, in registration order.
    pub fn adjustment_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.profiles.iter().map(|profile| profile.id.as_str())
    }

    /// Calibrate `buffer` in place, one entry per LED in geometry order.
    pub fn apply(&self, buffer: &mut [Rgb]) {
        for (i, color) in buffer.iter_mut().enumerate() {
            let profile_idx = self
                .led_map
                .get(i)
                .copied()
                .flatten()
                .or(self.default_profile);
            let Some(profile_idx) = profile_idx else {
                continue;
            };
            self.profiles[profile_idx as usize].adjust(color, self.backlight_enabled);
        }
    }
}
