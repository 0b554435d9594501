/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Default tolerance for classifying a vertex as lying on a cutting plane.
pub const TOLERANCE: f64 = 1e-11;

/// Signed volume of the tetrahedron `(a, b, c, d)`, positive when `b - a`,
/// `c - a`, `d - a` form a right-handed frame.
#[must_use]
pub fn tetrahedron_volume(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a))) / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_tetrahedron_volume() {
        let v = tetrahedron_volume(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert!((v - 1.0 / 6.0).abs() < 1e-15);
    }

    #[test]
    fn swapped_tetrahedron_is_negative() {
        let v = tetrahedron_volume(
            &Point3::origin(),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert!(v < 0.0);
    }
}
