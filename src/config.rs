//! Already-parsed configuration objects.
//!
//! The core never reads or writes storage; an external settings collaborator
//! parses its configuration format and hands these structs to the pipeline's
//! `handle_*` methods.

use embassy_time::Duration;

use crate::color::{ColorOrder, Rgb};
use crate::smoothing::SmoothingConfig;

/// One LED of the layout configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedSpec {
    /// Horizontal image region, fractions of the width.
    pub h_min: f32,
    pub h_max: f32,
    /// Vertical image region, fractions of the height.
    pub v_min: f32,
    pub v_max: f32,
    /// Per-LED byte order; `None` inherits the device order.
    pub order: Option<ColorOrder>,
}

impl LedSpec {
    /// A LED covering the whole image with the device byte order.
    pub const fn full_frame() -> Self {
        Self {
            h_min: 0.0,
            h_max: 1.0,
            v_min: 0.0,
            v_max: 1.0,
            order: None,
        }
    }
}

/// Device-level configuration the core cares about.
///
/// Transport-specific fields stay with the device collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Physical LED count; logical LEDs beyond it are padded black.
    /// `None` means the logical count.
    pub hardware_led_count: Option<usize>,
    /// Default byte order for LEDs without their own.
    pub color_order: ColorOrder,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hardware_led_count: None,
            color_order: ColorOrder::Rgb,
        }
    }
}

/// One calibration profile of the color configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentSpec<'a> {
    /// Profile identifier, echoed in diagnostics.
    pub id: &'a str,
    /// Whitepoint per channel, 255 = unchanged.
    pub white: Rgb,
    /// Gamma per channel, 1.0 = unchanged.
    pub gamma: [f32; 3],
    /// Minimum brightness floor, 0 = none.
    pub backlight_threshold: u8,
    /// Keep channel ratios when applying the floor.
    pub backlight_colored: bool,
    /// LED indices this profile calibrates; empty = default profile
    /// covering every LED without a specific entry.
    pub leds: &'a [u16],
}

impl AdjustmentSpec<'_> {
    /// Identity calibration for every LED.
    pub const fn identity() -> Self {
        Self {
            id: "default",
            white: Rgb::new(255, 255, 255),
            gamma: [1.0; 3],
            backlight_threshold: 0,
            backlight_colored: false,
            leds: &[],
        }
    }
}

/// The parsed color section: a set of calibration profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConfig<'a> {
    pub adjustments: &'a [AdjustmentSpec<'a>],
}

/// The parsed smoothing section: enablement plus the base profile
/// (config id 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingSettings {
    pub enabled: bool,
    pub config: SmoothingConfig,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            config: SmoothingConfig::new(Duration::from_millis(200), 50.0, 0),
        }
    }
}
