//! Deterministic display colors.
//!
//! Both acquisition paths color series through [`color_for`], so a table
//! import and a live extraction of the same recording render identically.

/// RGB triple, one byte per channel.
pub type Rgb = [u8; 3];

/// Color for derived midpoint joints.
pub const NEUTRAL_GRAY: Rgb = [128, 128, 128];

/// Golden-angle hue step in degrees.
const GOLDEN_ANGLE_DEG: f64 = 137.508;

/// Display color for a landmark index.
///
/// Hue rotates by the golden angle per index; saturation cycles over three
/// steps and value over two, so neighbouring indices stay distinguishable.
pub fn color_for(index: usize) -> Rgb {
    let hue = (index as f64 * GOLDEN_ANGLE_DEG) % 360.0;
    let saturation = 70.0 + (index % 3) as f64 * 10.0;
    let value = 80.0 + (index % 2) as f64 * 20.0;

    hsv_to_rgb(hue / 360.0, saturation / 100.0, value / 100.0)
}

/// Convert HSV (all components in `[0, 1]`) to 8-bit RGB.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let c = v * s;
    let x = c * (1.0 - (((h * 6.0) % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 1.0 / 6.0 {
        (c, x, 0.0)
    } else if h < 2.0 / 6.0 {
        (x, c, 0.0)
    } else if h < 3.0 / 6.0 {
        (0.0, c, x)
    } else if h < 4.0 / 6.0 {
        (0.0, x, c)
    } else if h < 5.0 / 6.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [to_channel(r + m), to_channel(g + m), to_channel(b + m)]
}

fn to_channel(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}
