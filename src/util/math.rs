//! Numeric helpers shared by the filters and the detectors.

/// Rounds to the nearest integer (half away from zero) and clamps to `u8`.
pub(crate) fn round_u8(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Distance from `p` to the segment `a`-`b`.
pub(crate) fn point_segment_distance(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return ((p[0] - a[0]).powi(2) + (p[1] - a[1]).powi(2)).sqrt();
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    let qx = a[0] + t * dx;
    let qy = a[1] + t * dy;
    ((p[0] - qx).powi(2) + (p[1] - qy).powi(2)).sqrt()
}
