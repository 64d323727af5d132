/// Convert an RGB color to HSV.
///
/// # Arguments
///
/// * `rgb` - The color as 8-bit R, G, B channels.
///
/// # Returns
///
/// The HSV color with every channel in the range [0, 1]:
///
/// * H: The hue, a fraction of a full turn (0-360 degrees).
/// * S: The saturation.
/// * V: The value.
///
/// # Example
///
/// ```
/// use tabletop_features::color::hsv_from_rgb;
///
/// let hsv = hsv_from_rgb([0, 0, 255]);
/// assert!((hsv[0] - 2.0 / 3.0).abs() < 1e-9);
/// assert_eq!(hsv[1], 1.0);
/// assert_eq!(hsv[2], 1.0);
/// ```
pub fn hsv_from_rgb(rgb: [u8; 3]) -> [f64; 3] {
    // normalize the input to the range [0, 1]
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    // ensure h is in the range [0, 360)
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max == 0.0 { 0.0 } else { delta / max };

    [h / 360.0, s, max]
}
