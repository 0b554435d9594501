//! A single convex cell, built by cutting a seed polyhedron with half-spaces.
//!
//! Vertices live in a generational arena and reference each other through
//! stable [`VertexId`] handles. The neighbor list of every vertex is ordered
//! counter-clockwise as seen from outside the cell, and each list entry keeps
//! a back-reference to the slot that points back at it, so an edge can be
//! found from either end in constant time.
//!
//! Faces are implicit: leaving vertex `v` through slot `j`, arriving at `w`
//! through its slot `k`, the walk continues through slot `k + 1` of `w`. The
//! face walked this way from slot `j` is "the face of slot `j`"; it lies in
//! the wedge between slots `j - 1` and `j` of `v`.

mod check;
pub mod classify;
mod collapse;
mod config;
mod cut;
mod neighbor;
mod output;
pub mod provenance;
mod query;
mod store;

pub use classify::{PlaneClassifier, Side};
pub use config::CellConfig;
pub use provenance::{Neighbors, Plain, Provenance};
pub use query::Facet;
pub use store::{VertexData, VertexId};

use slotmap::SlotMap;

use crate::error::CellError;
use crate::math::{Point3, Vector3};

use store::OrderPool;

/// Box face identifiers in the order x min, x max, y min, y max, z min, z max.
pub const BOX_FACE_IDS: [i32; 6] = [-1, -2, -3, -4, -5, -6];

/// A convex cell without face provenance.
pub type VoronoiCell = Cell<Plain>;

/// A convex cell that records which particle generated each face.
pub type NeighborCell = Cell<Neighbors>;

/// A closed convex polyhedron stored as a vertex adjacency graph.
#[derive(Debug, Clone)]
pub struct Cell<P: Provenance = Plain> {
    vertices: SlotMap<VertexId, VertexData>,
    pools: Vec<OrderPool<P::Tag>>,
    vertex_capacity: usize,
    seed: Option<VertexId>,
    config: CellConfig,
}

impl<P: Provenance> Default for Cell<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Provenance> Cell<P> {
    /// Creates an empty cell with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CellConfig::default())
    }

    /// Creates an empty cell with custom parameters.
    #[must_use]
    pub fn with_config(config: CellConfig) -> Self {
        let mut cell = Self {
            vertices: SlotMap::with_capacity_and_key(config.initial_vertices.max(1)),
            pools: Vec::new(),
            vertex_capacity: 0,
            seed: None,
            config,
        };
        cell.reset();
        cell
    }

    /// The parameters this cell was created with.
    #[must_use]
    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    /// Initializes the cell as the axis-aligned box
    /// `[xmin, xmax] × [ymin, ymax] × [zmin, zmax]`.
    ///
    /// Faces are labelled with [`BOX_FACE_IDS`].
    ///
    /// # Errors
    ///
    /// Returns an error if any bound is not finite or a range is empty.
    pub fn init_box(
        &mut self,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
        zmin: f64,
        zmax: f64,
    ) -> Result<(), CellError> {
        for (axis, lo, hi) in [("x", xmin, xmax), ("y", ymin, ymax), ("z", zmin, zmax)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(CellError::InvalidBounds(format!(
                    "{axis} range [{lo}, {hi}] is empty or not finite"
                )));
            }
        }
        let points = [
            Point3::new(xmin, ymin, zmin),
            Point3::new(xmax, ymin, zmin),
            Point3::new(xmin, ymax, zmin),
            Point3::new(xmax, ymax, zmin),
            Point3::new(xmin, ymin, zmax),
            Point3::new(xmax, ymin, zmax),
            Point3::new(xmin, ymax, zmax),
            Point3::new(xmax, ymax, zmax),
        ];
        let adjacency: [&[usize]; 8] = [
            &[1, 4, 2],
            &[3, 5, 0],
            &[0, 6, 3],
            &[2, 7, 1],
            &[6, 0, 5],
            &[4, 1, 7],
            &[7, 2, 4],
            &[5, 3, 6],
        ];
        self.build(&points, &adjacency)?;

        let center = Point3::new(0.5 * (xmin + xmax), 0.5 * (ymin + ymax), 0.5 * (zmin + zmax));
        let half = Vector3::new(0.5 * (xmax - xmin), 0.5 * (ymax - ymin), 0.5 * (zmax - zmin));
        self.label_faces(|cell, face| {
            let offset = (cell.face_centroid(face) - center).component_div(&half);
            let axis = offset.iamax();
            BOX_FACE_IDS[2 * axis + usize::from(offset[axis] > 0.0)]
        });
        Ok(())
    }

    /// Initializes the cell as the octahedron with vertices at distance
    /// `length` along each coordinate axis.
    ///
    /// Faces are labelled `-1` to `-8` by octant.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is not a positive finite number.
    pub fn init_octahedron(&mut self, length: f64) -> Result<(), CellError> {
        if !(length.is_finite() && length > 0.0) {
            return Err(CellError::InvalidBounds(format!(
                "octahedron size {length} must be positive"
            )));
        }
        let points = [
            Point3::new(-length, 0.0, 0.0),
            Point3::new(length, 0.0, 0.0),
            Point3::new(0.0, -length, 0.0),
            Point3::new(0.0, length, 0.0),
            Point3::new(0.0, 0.0, -length),
            Point3::new(0.0, 0.0, length),
        ];
        let adjacency: [&[usize]; 6] = [
            &[2, 5, 3, 4],
            &[2, 4, 3, 5],
            &[0, 4, 1, 5],
            &[0, 5, 1, 4],
            &[0, 3, 1, 2],
            &[0, 2, 1, 3],
        ];
        self.build(&points, &adjacency)?;
        self.label_faces(|cell, face| {
            let c = cell.face_centroid(face);
            let octant = usize::from(c.x > 0.0) + 2 * usize::from(c.y > 0.0) + 4 * usize::from(c.z > 0.0);
            -1 - i32::try_from(octant).unwrap_or(0)
        });
        Ok(())
    }

    /// Initializes the cell as the tetrahedron with the given corners.
    ///
    /// The face opposite corner `i` is labelled `-(i + 1)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the corners are not finite or are coplanar.
    pub fn init_tetrahedron(&mut self, corners: [Point3; 4]) -> Result<(), CellError> {
        if corners.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(CellError::InvalidBounds("tetrahedron corner is not finite".into()));
        }
        let [a, b, c, d] = corners;
        let orientation = crate::math::tetrahedron_volume(&a, &b, &c, &d);
        let scale = [b - a, c - a, d - a]
            .iter()
            .map(Vector3::norm)
            .fold(0.0, f64::max);
        if orientation.abs() <= self.config.tolerance * scale.powi(3).max(1.0) {
            return Err(CellError::Degenerate("tetrahedron corners are coplanar".into()));
        }
        // The fixed adjacency below assumes a positively oriented corner order.
        let order = if orientation > 0.0 { [0, 1, 2, 3] } else { [0, 1, 3, 2] };
        let points = order.map(|i| corners[i]);
        let adjacency: [&[usize]; 4] = [&[1, 3, 2], &[0, 2, 3], &[0, 3, 1], &[0, 1, 2]];
        self.build(&points, &adjacency)?;
        self.label_faces(|cell, face| {
            let opposite = (0..4)
                .find(|&i| !face.iter().any(|&v| cell.point(v) == corners[i]))
                .unwrap_or(0);
            -1 - i32::try_from(opposite).unwrap_or(0)
        });
        Ok(())
    }

    /// Replaces the cell with the given vertices and neighbor index lists.
    fn build(&mut self, points: &[Point3], adjacency: &[&[usize]]) -> Result<(), CellError> {
        self.reset();
        let mut ids = Vec::with_capacity(points.len());
        for (point, neighbors) in points.iter().zip(adjacency) {
            let placeholder = vec![(VertexId::default(), P::Tag::default()); neighbors.len()];
            ids.push(self.add_vertex(*point, &placeholder)?);
        }
        for (&v, neighbors) in ids.iter().zip(adjacency) {
            let links: Vec<_> = neighbors
                .iter()
                .map(|&k| (ids[k], P::Tag::default()))
                .collect();
            self.set_links(v, &links)?;
        }
        self.relink(&ids)?;
        self.seed = ids.first().copied();
        Ok(())
    }

    /// Stamps every slot of every face with the identifier chosen by `label`.
    fn label_faces(&mut self, label: impl Fn(&Self, &[VertexId]) -> i32) {
        for face in self.face_slots() {
            let vertices: Vec<VertexId> = face.iter().map(|&(v, _)| v).collect();
            let tag = P::tag(label(self, &vertices));
            for &(v, j) in &face {
                self.set_tag(v, j, tag);
            }
        }
    }

    /// Cuts the cell by the half-space `{v : v·normal ≤ rs / 2}`.
    ///
    /// On a neighbor-tracking cell the new face is labelled `0`.
    ///
    /// Returns `Ok(false)` when the plane misses the cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cut removes the whole cell, exceeds the memory
    /// limits or meets an inconsistent configuration.
    pub fn plane(&mut self, normal: Vector3, rs: f64) -> Result<bool, CellError> {
        self.cut(normal, rs, P::Tag::default())
    }

    /// Cuts the cell by the bisecting plane between the cell's point and the
    /// point at `offset`.
    ///
    /// # Errors
    ///
    /// See [`plane`](Self::plane).
    pub fn plane_bisector(&mut self, offset: Vector3) -> Result<bool, CellError> {
        self.plane(offset, offset.norm_squared())
    }

    /// Handles of all live vertices.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys()
    }

    /// Number of vertices of the cell.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the vertex data, or `None` if the handle is not live.
    #[must_use]
    pub fn vertex(&self, v: VertexId) -> Option<&VertexData> {
        self.vertices.get(v)
    }

    /// Returns the neighbors of a vertex in counter-clockwise order, or `None`
    /// if the handle is not live.
    #[must_use]
    pub fn neighbors_of(&self, v: VertexId) -> Option<&[VertexId]> {
        self.vertices.contains_key(v).then(|| self.edges(v))
    }

    /// Vertex positions relative to the cell's generating point.
    #[must_use]
    pub fn vertex_positions(&self) -> Vec<Point3> {
        self.vertices.values().map(|d| d.point).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn box_is_wired() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 2.0, -1.0, 1.0, 0.0, 1.0).unwrap();
        assert_eq!(cell.vertex_count(), 8);
        assert_eq!(cell.edge_count(), 12);
        assert_eq!(cell.face_count(), 6);
        cell.check_relations().unwrap();
        cell.check_duplicates().unwrap();
        assert!((cell.volume() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn octahedron_is_wired() {
        let mut cell = VoronoiCell::new();
        cell.init_octahedron(2.0).unwrap();
        assert_eq!(cell.vertex_count(), 6);
        assert_eq!(cell.edge_count(), 12);
        assert_eq!(cell.face_count(), 8);
        cell.check_relations().unwrap();
        // 4/3 * l^3
        assert!((cell.volume() - 32.0 / 3.0).abs() < 1e-12);
        assert!((cell.max_radius_squared() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn tetrahedron_accepts_either_orientation() {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let mut flipped = corners;
        flipped.swap(1, 2);
        for corners in [corners, flipped] {
            let mut cell = NeighborCell::new();
            cell.init_tetrahedron(corners).unwrap();
            assert_eq!(cell.face_count(), 4);
            cell.check_relations().unwrap();
            cell.check_facets().unwrap();
            assert!((cell.volume() - 1.0 / 6.0).abs() < 1e-12);
            let mut ids = cell.neighbors();
            ids.sort_unstable();
            assert_eq!(ids, vec![-4, -3, -2, -1]);
        }
    }

    #[test]
    fn coplanar_tetrahedron_is_rejected() {
        let mut cell = VoronoiCell::new();
        let err = cell
            .init_tetrahedron([
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ])
            .unwrap_err();
        assert!(matches!(err, CellError::Degenerate(_)));
    }

    #[test]
    fn empty_box_is_rejected() {
        let mut cell = VoronoiCell::new();
        let err = cell.init_box(1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap_err();
        assert!(matches!(err, CellError::InvalidBounds(_)));
    }

    #[test]
    fn box_faces_carry_wall_ids() {
        let mut cell = NeighborCell::new();
        cell.init_box(-1.0, 1.0, -2.0, 2.0, -3.0, 3.0).unwrap();
        cell.check_facets().unwrap();
        for facet in cell.facets() {
            let centroid = facet
                .vertices
                .iter()
                .map(|&v| cell.point(v).coords)
                .sum::<Vector3>()
                / 4.0;
            let expected = match facet.neighbor {
                Some(-1) => Vector3::new(-1.0, 0.0, 0.0),
                Some(-2) => Vector3::new(1.0, 0.0, 0.0),
                Some(-3) => Vector3::new(0.0, -2.0, 0.0),
                Some(-4) => Vector3::new(0.0, 2.0, 0.0),
                Some(-5) => Vector3::new(0.0, 0.0, -3.0),
                Some(-6) => Vector3::new(0.0, 0.0, 3.0),
                other => panic!("unexpected face id {other:?}"),
            };
            assert!((centroid - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn reinitializing_discards_previous_cell() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        cell.plane(Vector3::new(1.0, 1.0, 1.0), 4.0).unwrap();
        cell.init_octahedron(1.0).unwrap();
        assert_eq!(cell.vertex_count(), 6);
        cell.check_relations().unwrap();
    }
}
