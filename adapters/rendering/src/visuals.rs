//! Palette and animation curves shared by rendering backends.

use std::{f32::consts::PI, time::Duration};

use crate::Color;

/// Floor and window background.
pub const BACKGROUND: Color = Color::from_rgb_u8(0xF5, 0xF2, 0xEE);
/// Backdrop line color at the centre of the floor.
pub const GRID_LINE_CENTER: Color = Color::from_rgb_u8(0xDF, 0xDB, 0xD6);
/// Backdrop line color at the fade-out distance.
pub const GRID_LINE_EDGE: Color = Color::from_rgb_u8(0xF5, 0xF2, 0xEE);
/// Number of backdrop lines drawn on each side of the origin.
pub const BACKDROP_HALF_EXTENT: i32 = 60;

/// Color used for faulted indicators and wave rings.
pub const FAULT: Color = Color::from_rgb_u8(0x99, 0x1B, 0x1B);
/// Indicator color agents start with.
pub const INDICATOR_INITIAL: Color = Color::from_rgb_u8(0x34, 0xD3, 0x99);
/// Rate at which healthy indicators approach their hue each frame.
pub const INDICATOR_BLEND_RATE: f32 = 0.1;
/// Rate at which faulted indicators approach [`FAULT`] each frame.
pub const FAULT_BLEND_RATE: f32 = 0.2;
/// Saturation of healthy indicator colors.
pub const INDICATOR_SATURATION: f32 = 0.65;
/// Lightness of healthy indicator colors.
pub const INDICATOR_LIGHTNESS: f32 = 0.55;

/// Chassis colors drawn from the outside in.
pub const AGENT_BASE: Color = Color::from_rgb_u8(0xD1, 0xD5, 0xDB);
/// Top plate of the chassis.
pub const AGENT_TOP: Color = Color::from_rgb_u8(0xE5, 0xE7, 0xEB);
/// Dome carrying the status light.
pub const AGENT_DOME: Color = Color::from_rgb_u8(0x9C, 0xA3, 0xAF);
/// Wheels at the chassis corners.
pub const AGENT_WHEEL: Color = Color::from_rgb_u8(0x4B, 0x55, 0x63);
/// Stripe marking the front of the chassis.
pub const AGENT_STRIPE: Color = Color::from_rgb_u8(0x37, 0x41, 0x51);

/// Highlight drawn under the hovered cell.
pub const HOVER: Color = Color::from_rgb_u8(0x0A, 0x0A, 0x0A).with_alpha(0.07);
/// Fraction of a cell covered by the hover highlight.
pub const HOVER_SIZE: f32 = 0.92;
/// Status overlay text.
pub const STATUS_TEXT: Color = Color::from_rgb_u8(0x0A, 0x0A, 0x0A).with_alpha(0.3);

/// Peak fraction of a cell covered by a ring.
pub const RING_SCALE: f32 = 0.92;
/// Peak opacity of a ring.
pub const RING_OPACITY: f32 = 0.45;

/// Hue of the `index`-th of `count` agents.
#[must_use]
pub fn agent_hue(index: usize, count: usize) -> f32 {
    if count == 0 {
        return 0.55;
    }
    0.55 + (index as f32 / count as f32) * 0.15
}

/// Healthy indicator color of the `index`-th of `count` agents.
#[must_use]
pub fn agent_color(index: usize, count: usize) -> Color {
    Color::from_hsl(
        agent_hue(index, count),
        INDICATOR_SATURATION,
        INDICATOR_LIGHTNESS,
    )
}

/// Bell-shaped intensity of a ring of the given age, or `None` once expired.
#[must_use]
pub fn ring_pulse(age: Duration, lifetime: Duration) -> Option<f32> {
    if lifetime.is_zero() || age > lifetime {
        return None;
    }
    let normalized = age.as_secs_f32() / lifetime.as_secs_f32();
    Some((normalized * PI).sin())
}

/// Color of the backdrop line `offset` lines away from the origin.
#[must_use]
pub fn backdrop_line_color(offset: i32) -> Color {
    let distance = offset.unsigned_abs() as f32 / BACKDROP_HALF_EXTENT as f32;
    GRID_LINE_CENTER.lerp(GRID_LINE_EDGE, distance * distance)
}

/// Per-agent indicator colors that ease toward their targets frame by frame.
#[derive(Clone, Debug, Default)]
pub struct IndicatorBlender {
    colors: Vec<Color>,
}

impl IndicatorBlender {
    /// Creates an empty blender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the indicator of the `index`-th of `count` agents by one frame.
    pub fn blend(&mut self, index: usize, count: usize, faulted: bool) -> Color {
        if self.colors.len() < count {
            self.colors.resize(count, INDICATOR_INITIAL);
        }
        let (target, rate) = if faulted {
            (FAULT, FAULT_BLEND_RATE)
        } else {
            (agent_color(index, count), INDICATOR_BLEND_RATE)
        };

        match self.colors.get_mut(index) {
            Some(color) => {
                *color = color.lerp(target, rate);
                *color
            }
            None => target,
        }
    }
}
