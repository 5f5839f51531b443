//! Response curve and device sample mapping

/// Span of the virtual device's unsigned axis
pub const DEVICE_RANGE: u32 = 0x8000;
/// Largest sample the device accepts (full right)
pub const SAMPLE_MAX: u16 = 0x8000;
/// Sample for a centered axis
pub const SAMPLE_CENTER: u16 = 0x4000;

/// Apply the response curve
///
/// `output = sign(value) * |value| ^ (100 / linearity)`. Linearity 100 is the
/// identity, below 100 is more sensitive near center, above 100 less.
pub fn apply_curve(value: f64, linearity: u32) -> f64 {
    let exponent = 100.0 / f64::from(linearity.max(1));
    value.signum() * value.abs().powf(exponent)
}

/// Map a curve output in `[-1, 1]` onto the device range
pub fn to_sample(output: f64) -> u16 {
    let scaled = (output.clamp(-1.0, 1.0) + 1.0) * (f64::from(DEVICE_RANGE) / 2.0);
    scaled.round() as u16
}

/// Points of the curve over `[-1, 1]` for plotting
pub fn curve_points(linearity: u32, count: usize) -> Vec<(f64, f64)> {
    if count < 2 {
        return Vec::new();
    }
    let step = 2.0 / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let x = -1.0 + step * i as f64;
            (x, apply_curve(x, linearity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity() {
        for v in [-1.0, -0.37, 0.0, 0.5, 1.0] {
            assert!((apply_curve(v, 100) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_convex_curve() {
        let out = apply_curve(0.5, 200);
        assert!((out - 0.5f64.sqrt()).abs() < 1e-9);
        assert!((apply_curve(-0.5, 200) + 0.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_concave_curve() {
        assert!((apply_curve(0.5, 50) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_sample_endpoints() {
        assert_eq!(to_sample(-1.0), 0);
        assert_eq!(to_sample(0.0), SAMPLE_CENTER);
        assert_eq!(to_sample(1.0), SAMPLE_MAX);
        assert_eq!(to_sample(3.0), SAMPLE_MAX);
    }

    #[test]
    fn test_sample_rounds() {
        // 0.1 * 0x4000 = 1638.4
        assert_eq!(to_sample(0.1), SAMPLE_CENTER + 1638);
    }

    #[test]
    fn test_curve_points_span() {
        let points = curve_points(100, 21);
        assert_eq!(points.len(), 21);
        assert!((points[0].0 + 1.0).abs() < 1e-12);
        assert!((points[20].0 - 1.0).abs() < 1e-12);
        assert!(points[10].1.abs() < 1e-12);
    }
}
