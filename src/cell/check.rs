use std::collections::HashSet;

use crate::error::CellError;

use super::provenance::Provenance;
use super::Cell;

impl<P: Provenance> Cell<P> {
    /// Verifies the adjacency invariants: every vertex has order at least
    /// three, every edge is listed by both ends, and every back-reference
    /// points at the slot that points back.
    ///
    /// Intended as a test oracle; a successful cut never breaks these.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidTopology`] describing the first violation.
    pub fn check_relations(&self) -> Result<(), CellError> {
        let index = self.vertex_indices();
        for (v, data) in &self.vertices {
            if data.order() < 3 {
                return Err(CellError::InvalidTopology(format!(
                    "vertex {} has order {}",
                    index[v],
                    data.order()
                )));
            }
            for (j, (&w, &k)) in self.edges(v).iter().zip(self.back_refs(v)).enumerate() {
                if w == v {
                    return Err(CellError::InvalidTopology(format!(
                        "vertex {} lists itself",
                        index[v]
                    )));
                }
                if !self.vertices.contains_key(w) {
                    return Err(CellError::InvalidTopology(format!(
                        "vertex {} slot {j} points to a removed vertex",
                        index[v]
                    )));
                }
                if k >= self.order(w) || self.edge(w, k) != v || self.back_ref(w, k) != j {
                    return Err(CellError::InvalidTopology(format!(
                        "edge from vertex {} slot {j} to vertex {} slot {k} is not reciprocal",
                        index[v], index[w]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Verifies that no vertex lists the same neighbor twice and that no two
    /// vertices share a position.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidTopology`] for a repeated neighbor and
    /// [`CellError::DuplicateVertex`] for coincident vertices.
    pub fn check_duplicates(&self) -> Result<(), CellError> {
        let index = self.vertex_indices();
        for v in self.vertices.keys() {
            let mut seen = HashSet::new();
            if let Some(w) = self.edges(v).iter().find(|&&w| !seen.insert(w)) {
                return Err(CellError::InvalidTopology(format!(
                    "vertex {} lists vertex {} twice",
                    index[v], index[*w]
                )));
            }
        }
        let tolerance = self.config.tolerance;
        let points: Vec<_> = self.vertices.values().map(|d| d.point).collect();
        for (first, p) in points.iter().enumerate() {
            for (second, q) in points.iter().enumerate().skip(first + 1) {
                if (p - q).norm() <= tolerance {
                    return Err(CellError::DuplicateVertex {
                        first,
                        second,
                        x: p.x,
                        y: p.y,
                        z: p.z,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::cell::VoronoiCell;
    use crate::error::CellError;
    use crate::math::Vector3;

    fn cube() -> VoronoiCell {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        cell
    }

    #[test]
    fn broken_back_reference_is_reported() {
        let mut cell = cube();
        let v = cell.vertex_ids().next().unwrap();
        let k = cell.back_ref(v, 0);
        cell.set_back_ref(v, 0, (k + 1) % 3);
        let err = cell.check_relations().unwrap_err();
        assert!(matches!(err, CellError::InvalidTopology(_)));
    }

    #[test]
    fn one_sided_edge_is_reported() {
        let mut cell = cube();
        let v = cell.vertex_ids().next().unwrap();
        let far = cell
            .vertex_ids()
            .find(|&w| w != v && !cell.edges(v).contains(&w))
            .unwrap();
        let mut links = cell.links(v);
        links[0].0 = far;
        cell.set_links(v, &links).unwrap();
        assert!(cell.check_relations().is_err());
    }

    #[test]
    fn repeated_neighbor_is_reported() {
        let mut cell = cube();
        let v = cell.vertex_ids().next().unwrap();
        let mut links = cell.links(v);
        links[1] = links[0];
        cell.set_links(v, &links).unwrap();
        let err = cell.check_duplicates().unwrap_err();
        assert!(matches!(err, CellError::InvalidTopology(_)));
    }

    #[test]
    fn coincident_vertices_are_reported() {
        let mut cell = cube();
        let ids: Vec<_> = cell.vertex_ids().collect();
        let target = cell.point(ids[0]);
        cell.vertices[ids[7]].point = target;
        let err = cell.check_duplicates().unwrap_err();
        assert!(matches!(err, CellError::DuplicateVertex { first: 0, second: 7, .. }));
    }

    #[test]
    fn cut_cells_pass_both_checks() {
        let mut cell = cube();
        for normal in [
            Vector3::new(1.0, 2.0, 0.5),
            Vector3::new(-1.0, 0.3, 0.9),
            Vector3::new(0.2, -1.0, -1.0),
        ] {
            cell.plane(normal, 1.5).unwrap();
            cell.check_relations().unwrap();
            cell.check_duplicates().unwrap();
        }
    }
}
