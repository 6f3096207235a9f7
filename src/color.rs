//! Color type, byte-order mapping and blending.

use smart_leds::RGB8;

use crate::math8::blend8;

pub type Rgb = RGB8;

/// All channels off. Used for padding and for the no-source frame.
pub const BLACK: Rgb = Rgb::new(0, 0, 0);

const ORDER_NAME_RGB: &str = "rgb";
const ORDER_NAME_BGR: &str = "bgr";
const ORDER_NAME_RBG: &str = "rbg";
const ORDER_NAME_GRB: &str = "grb";
const ORDER_NAME_GBR: &str = "gbr";
const ORDER_NAME_BRG: &str = "brg";

/// Per-LED channel byte order expected by the strip hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Bgr,
    Rbg,
    Grb,
    Gbr,
    Brg,
}

impl ColorOrder {
    /// Rearrange the channels of `color` into this wire order.
    ///
    /// `Rgb` is the identity; the other five are the fixed permutations
    /// of red/green/blue.
    pub const fn apply(self, color: &mut Rgb) {
        let Rgb { r, g, b } = *color;
        let (r, g, b) = match self {
            Self::Rgb => (r, g, b),
            Self::Bgr => (b, g, r),
            Self::Rbg => (r, b, g),
            Self::Grb => (g, r, b),
            Self::Gbr => (g, b, r),
            Self::Brg => (b, r, g),
        };
        color.r = r;
        color.g = g;
        color.b = b;
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => ORDER_NAME_RGB,
            Self::Bgr => ORDER_NAME_BGR,
            Self::Rbg => ORDER_NAME_RBG,
            Self::Grb => ORDER_NAME_GRB,
            Self::Gbr => ORDER_NAME_GBR,
            Self::Brg => ORDER_NAME_BRG,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            ORDER_NAME_RGB => Some(Self::Rgb),
            ORDER_NAME_BGR => Some(Self::Bgr),
            ORDER_NAME_RBG => Some(Self::Rbg),
            ORDER_NAME_GRB => Some(Self::Grb),
            ORDER_NAME_GBR => Some(Self::Gbr),
            ORDER_NAME_BRG => Some(Self::Brg),
            _ => None,
        }
    }
}

/// Blend two colors channel-wise, `amount_of_b` 0-255.
pub const fn blend_colors(a: Rgb, b: Rgb, amount_of_b: u8) -> Rgb {
    Rgb::new(
        blend8(a.r, b.r, amount_of_b),
        blend8(a.g, b.g, amount_of_b),
        blend8(a.b, b.b, amount_of_b),
    )
}
