use std::collections::{BTreeMap, HashSet};

use slotmap::SecondaryMap;

use crate::math::Point3;

use super::provenance::Provenance;
use super::{Cell, VertexId};

/// One face of a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// The face's vertices in walking order (clockwise seen from outside).
    pub vertices: Vec<VertexId>,
    /// Identifier of the particle that generated the face, on
    /// neighbor-tracking cells.
    pub neighbor: Option<i32>,
}

impl Facet {
    /// Number of vertices (and edges) of the face.
    #[must_use]
    pub fn order(&self) -> usize {
        self.vertices.len()
    }
}

impl<P: Provenance> Cell<P> {
    /// Walks every face once, returning for each the `(vertex, slot)` pairs
    /// leaving along it.
    pub(crate) fn face_slots(&self) -> Vec<Vec<(VertexId, usize)>> {
        let mut visited = HashSet::new();
        let mut faces = Vec::new();
        for start in self.vertices.keys() {
            for j in 0..self.order(start) {
                if visited.contains(&(start, j)) {
                    continue;
                }
                let mut face = Vec::new();
                let (mut v, mut slot) = (start, j);
                while visited.insert((v, slot)) {
                    face.push((v, slot));
                    let next = self.edge(v, slot);
                    let back = self.back_ref(v, slot);
                    slot = (back + 1) % self.order(next);
                    v = next;
                }
                faces.push(face);
            }
        }
        faces
    }

    pub(crate) fn face_centroid(&self, face: &[VertexId]) -> Point3 {
        let sum = face
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, &v| acc + self.point(v).coords);
        #[allow(clippy::cast_precision_loss)]
        let n = face.len().max(1) as f64;
        Point3::from(sum / n)
    }

    /// Dense indices `0..vertex_count()` in arena iteration order, used by the
    /// text outputs.
    pub(crate) fn vertex_indices(&self) -> SecondaryMap<VertexId, usize> {
        self.vertices
            .keys()
            .enumerate()
            .map(|(i, v)| (v, i))
            .collect()
    }

    /// Enumerates the faces of the cell.
    #[must_use]
    pub fn facets(&self) -> Vec<Facet> {
        self.face_slots()
            .into_iter()
            .map(|face| {
                let neighbor = face
                    .first()
                    .and_then(|&(v, j)| P::id(self.slot_tags(v)[j]));
                Facet {
                    vertices: face.into_iter().map(|(v, _)| v).collect(),
                    neighbor,
                }
            })
            .collect()
    }

    /// Histogram of face orders: number of faces with each vertex count.
    #[must_use]
    pub fn facet_statistics(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for face in self.face_slots() {
            *histogram.entry(face.len()).or_insert(0) += 1;
        }
        histogram
    }

    /// Every edge once, as a pair of vertex handles.
    #[must_use]
    pub fn edge_pairs(&self) -> Vec<(VertexId, VertexId)> {
        let indices = self.vertex_indices();
        let mut edges = Vec::new();
        for v in self.vertices.keys() {
            for &w in self.edges(v) {
                if indices[v] < indices[w] {
                    edges.push((v, w));
                }
            }
        }
        edges
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.keys().map(|v| self.order(v)).sum::<usize>() / 2
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.face_slots().len()
    }

    /// `V - E + F`, equal to two for every valid cell.
    #[must_use]
    pub fn euler_characteristic(&self) -> i64 {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        count(self.vertex_count()) - count(self.edge_count()) + count(self.face_count())
    }

    /// Volume of the cell.
    ///
    /// Each face is fan-triangulated and joined to the vertex centroid; the
    /// signed tetrahedron volumes are summed.
    #[must_use]
    pub fn volume(&self) -> f64 {
        if self.vertices.is_empty() {
            return 0.0;
        }
        let keys: Vec<VertexId> = self.vertices.keys().collect();
        let center = self.face_centroid(&keys);
        let mut signed_volume = 0.0;
        for face in self.face_slots() {
            let Some(&(first, _)) = face.first() else {
                continue;
            };
            let p0 = self.point(first);
            for pair in face[1..].windows(2) {
                let p1 = self.point(pair[0].0);
                let p2 = self.point(pair[1].0);
                signed_volume += crate::math::tetrahedron_volume(&center, &p0, &p1, &p2);
            }
        }
        signed_volume.abs()
    }

    /// Largest squared distance from the cell's generating point to a vertex.
    ///
    /// Particles further away than twice the square root of this value cannot
    /// cut the cell.
    #[must_use]
    pub fn max_radius_squared(&self) -> f64 {
        self.vertices
            .values()
            .map(|d| d.point.coords.norm_squared())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::cell::{NeighborCell, VoronoiCell};
    use crate::math::Vector3;

    #[test]
    fn box_statistics() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        let stats = cell.facet_statistics();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&4], 6);
        assert_eq!(cell.edge_pairs().len(), 12);
        assert_eq!(cell.euler_characteristic(), 2);
        assert!((cell.max_radius_squared() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn corner_cut_statistics() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert!(cell.plane(Vector3::new(1.0, 1.0, 1.0), 4.0).unwrap());
        let stats = cell.facet_statistics();
        // Three squares become pentagons; the corner becomes a triangle.
        assert_eq!(stats.get(&3), Some(&1));
        assert_eq!(stats.get(&4), Some(&3));
        assert_eq!(stats.get(&5), Some(&3));
        assert_eq!(cell.face_count(), 7);
        // The removed corner is the tetrahedron with legs of length one.
        assert!((cell.volume() - (8.0 - 1.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn facets_report_no_neighbor_without_tracking() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert!(cell.facets().iter().all(|f| f.neighbor.is_none()));

        let mut tracked = NeighborCell::new();
        tracked.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert!(tracked.facets().iter().all(|f| f.neighbor.is_some()));
    }

    #[test]
    fn facets_walk_clockwise_from_outside() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        for facet in cell.facets() {
            let p: Vec<_> = facet.vertices.iter().map(|&v| cell.point(v)).collect();
            let normal = (p[1] - p[0]).cross(&(p[2] - p[1]));
            let outward = cell.face_centroid(&facet.vertices).coords;
            assert!(normal.dot(&outward) < 0.0);
        }
    }
}
