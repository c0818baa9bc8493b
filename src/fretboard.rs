//! Surface geometry: pixel rows to strings, normalized columns to frets.

use crate::types::*;

/// Vertical distance between adjacent strings on the surface.
pub const STRING_SPACING_PX: f64 = 40.0;
/// y of the top string.
pub const TOP_OFFSET_PX: f64 = 40.0;
/// The usable horizontal span of the surface, as normalized x.
/// Outside it the board saturates at the nut or the last fret.
pub const USABLE_SPAN: (f64, f64) = (0.1, 0.9);

/// Nearest string row for a y coordinate, clamped to the board. NaN → 0.
pub fn string_index_for_y(y: f64) -> usize {
    if y.is_nan() {
        return 0;
    }
    let raw = ((y - TOP_OFFSET_PX) / STRING_SPACING_PX).round();
    raw.clamp(0.0, (STRING_COUNT - 1) as f64) as usize
}

pub fn string_for_y(y: f64) -> GuitarString {
    GuitarString::from_index(string_index_for_y(y))
}

/// Fret for a normalized x in [0, 1]. Absent or NaN → open string.
pub fn fret_for_normalized_x(x: Option<f64>) -> u8 {
    let x = match x {
        Some(x) if !x.is_nan() => x,
        _ => return 0,
    };
    let (lo, hi) = USABLE_SPAN;
    let t = (x.clamp(lo, hi) - lo) / (hi - lo);
    (t * MAX_FRET as f64).round().clamp(0.0, MAX_FRET as f64) as u8
}

/// y at the centre of a string row. Inverse of `string_index_for_y`.
pub fn string_center_y(string: GuitarString) -> f64 {
    TOP_OFFSET_PX + string.index() as f64 * STRING_SPACING_PX
}

/// Normalized x that maps back to `fret`. Inverse of `fret_for_normalized_x`.
pub fn normalized_x_for_fret(fret: u8) -> f64 {
    let (lo, hi) = USABLE_SPAN;
    lo + (fret.min(MAX_FRET) as f64 / MAX_FRET as f64) * (hi - lo)
}
