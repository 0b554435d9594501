use std::collections::HashMap;

use crate::math::{Point3, Vector3};

use super::VertexId;

/// Position of a vertex relative to a cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Strictly inside the retained half-space.
    Inside,
    /// Strictly outside; the vertex will be removed.
    Outside,
    /// Within tolerance of the plane.
    On,
}

/// Classifies vertices against the plane `{v : v·n = rsq / 2}`.
///
/// Classifications within `tolerance` of the plane are memoized per vertex, so
/// a marginal vertex keeps the answer it got the first time for as long as
/// this classifier lives. One classifier is created per plane cut.
#[derive(Debug)]
pub struct PlaneClassifier {
    normal: Vector3,
    offset: f64,
    tolerance: f64,
    marginal: HashMap<VertexId, (Side, f64)>,
}

impl PlaneClassifier {
    /// Records the plane with normal `normal` through the point at squared
    /// distance `rsq` along it, measured from the cell center.
    #[must_use]
    pub fn new(normal: Vector3, rsq: f64, tolerance: f64) -> Self {
        Self {
            normal,
            offset: 0.5 * rsq,
            tolerance,
            marginal: HashMap::new(),
        }
    }

    /// Evaluates the plane equation at `point`. Positive values lie outside.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Classifies `vertex` at `point`, returning the side and the evaluated
    /// plane equation.
    pub fn classify(&mut self, vertex: VertexId, point: &Point3) -> (Side, f64) {
        if let Some(&cached) = self.marginal.get(&vertex) {
            return cached;
        }
        let u = self.signed_distance(point);
        if u > self.tolerance {
            (Side::Outside, u)
        } else if u < -self.tolerance {
            (Side::Inside, u)
        } else {
            self.marginal.insert(vertex, (Side::On, u));
            (Side::On, u)
        }
    }

    /// Number of marginal vertices seen so far.
    #[must_use]
    pub fn marginal_count(&self) -> usize {
        self.marginal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn classifies_three_sides() {
        let mut keys = SlotMap::<VertexId, ()>::with_key();
        let (a, b, c) = (keys.insert(()), keys.insert(()), keys.insert(()));
        let mut sure = PlaneClassifier::new(Vector3::new(1.0, 0.0, 0.0), 1.0, 1e-9);

        assert_eq!(sure.classify(a, &Point3::new(0.0, 0.0, 0.0)).0, Side::Inside);
        assert_eq!(sure.classify(b, &Point3::new(1.0, 0.0, 0.0)).0, Side::Outside);
        assert_eq!(sure.classify(c, &Point3::new(0.5, 3.0, 0.0)).0, Side::On);
        assert_eq!(sure.marginal_count(), 1);
    }

    #[test]
    fn marginal_answer_is_replayed() {
        let mut keys = SlotMap::<VertexId, ()>::with_key();
        let v = keys.insert(());
        let mut sure = PlaneClassifier::new(Vector3::new(0.0, 0.0, 2.0), 4.0, 1e-9);

        let (side, u) = sure.classify(v, &Point3::new(0.0, 0.0, 1.0));
        assert_eq!(side, Side::On);
        // The same vertex queried with a drifted position keeps its answer.
        let (again, u_again) = sure.classify(v, &Point3::new(0.0, 0.0, 1.1));
        assert_eq!(again, Side::On);
        assert!((u - u_again).abs() < f64::EPSILON);
    }

    #[test]
    fn scale_of_normal_sets_offset() {
        let sure = PlaneClassifier::new(Vector3::new(2.0, 0.0, 0.0), 4.0, 1e-9);
        // Plane 2x = 2, so x = 1 is on it.
        assert!(sure.signed_distance(&Point3::new(1.0, 0.0, 0.0)).abs() < 1e-15);
        assert!(sure.signed_distance(&Point3::new(2.0, 0.0, 0.0)) > 0.0);
    }
}
