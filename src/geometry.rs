//! Planar geometry over landmark points
//!
//! Depth (`z`) is never used: it is unreliable from a single camera.

use crate::landmark::Landmark;

/// Interior angle at `b` formed by rays `b→a` and `b→c`, in `[0, 180]` degrees
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = (radians * 180.0 / std::f32::consts::PI).abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Planar Euclidean distance in normalized units
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Angle of the segment `a→b` away from vertical, in `[0, 90]` degrees
pub fn inclination(a: &Landmark, b: &Landmark) -> f32 {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    dx.atan2(dy).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y)
    }

    #[test]
    fn test_straight_line_is_180() {
        let a = angle(&p(0.0, 0.0), &p(0.5, 0.0), &p(1.0, 0.0));
        assert!((a - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_right_angle() {
        let a = angle(&p(0.0, 0.0), &p(0.0, 0.5), &p(0.5, 0.5));
        assert!((a - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_reflex_angle_is_reflected() {
        // Rays at +170 and -170 degrees: raw difference 340, interior 20
        let a = angle(&p(-1.0, 0.1763), &p(0.0, 0.0), &p(-1.0, -0.1763));
        assert!((a - 20.0).abs() < 0.05);
        let b = angle(&p(-1.0, -0.1763), &p(0.0, 0.0), &p(-1.0, 0.1763));
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_distance_ignores_depth() {
        let mut a = p(0.0, 0.0);
        let mut b = p(0.3, 0.4);
        a.z = -3.0;
        b.z = 7.0;
        assert!((distance(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_inclination() {
        assert!(inclination(&p(0.5, 0.9), &p(0.5, 0.1)).abs() < 0.01);
        assert!((inclination(&p(0.1, 0.5), &p(0.9, 0.5)) - 90.0).abs() < 0.01);
        assert!((inclination(&p(0.0, 0.0), &p(0.3, 0.3)) - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_input_does_not_panic() {
        let a = angle(&p(0.2, 0.2), &p(0.2, 0.2), &p(0.2, 0.2));
        assert!(a.is_finite());
        assert_eq!(inclination(&p(0.2, 0.2), &p(0.2, 0.2)), 0.0);
    }
}
