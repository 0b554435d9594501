use std::io::{self, Write};

use crate::error::CellError;
use crate::math::Vector3;

use super::provenance::Neighbors;
use super::{Cell, VertexId};

impl Cell<Neighbors> {
    /// Cuts the cell like [`plane`](Cell::plane), labelling the new face with
    /// the generating particle `id`.
    ///
    /// # Errors
    ///
    /// See [`plane`](Cell::plane).
    pub fn nplane(&mut self, normal: Vector3, rs: f64, id: i32) -> Result<bool, CellError> {
        self.cut(normal, rs, id)
    }

    /// Cuts the cell by the bisecting plane towards the particle `id` at
    /// `offset`, labelling the new face with `id`.
    ///
    /// # Errors
    ///
    /// See [`plane`](Cell::plane).
    pub fn nplane_bisector(&mut self, offset: Vector3, id: i32) -> Result<bool, CellError> {
        self.nplane(offset, offset.norm_squared(), id)
    }

    /// One identifier per face, in [`facets`](Cell::facets) order.
    #[must_use]
    pub fn neighbors(&self) -> Vec<i32> {
        self.face_slots()
            .iter()
            .filter_map(|face| face.first().map(|&(v, j)| self.slot_tags(v)[j]))
            .collect()
    }

    /// Identifiers of the faces of each slot of `v`, or `None` if the handle
    /// is not live.
    #[must_use]
    pub fn neighbor_ids(&self, v: VertexId) -> Option<&[i32]> {
        self.vertices.contains_key(v).then(|| self.slot_tags(v))
    }

    /// Writes the face identifiers on one space-separated line.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_neighbors<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let ids: Vec<String> = self.neighbors().iter().map(ToString::to_string).collect();
        writeln!(w, "{}", ids.join(" "))
    }

    /// Verifies that every slot around each face carries the same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidTopology`] naming the first face found with
    /// mixed identifiers.
    pub fn check_facets(&self) -> Result<(), CellError> {
        for face in self.face_slots() {
            let Some(&(v, j)) = face.first() else {
                continue;
            };
            let expected = self.slot_tags(v)[j];
            if let Some(&(u, k)) = face.iter().find(|&&(u, k)| self.slot_tags(u)[k] != expected) {
                return Err(CellError::InvalidTopology(format!(
                    "face labelled {expected} has a slot labelled {}",
                    self.slot_tags(u)[k]
                )));
            }
        }
        Ok(())
    }
}
