/// Cubic approximation of a gaussian, `h` in units of half the light radius.
///
/// C1-continuous, 1 at `h = 0`, and exactly 0 from `h = 2` (the radius) on.
#[inline]
pub fn cubic_gaussian(h: f32) -> f32 {
    if h < 1.0 {
        0.25 * (2.0 - h).powi(3) - (1.0 - h).powi(3)
    } else if h < 2.0 {
        0.25 * (2.0 - h).powi(3)
    } else {
        0.0
    }
}
