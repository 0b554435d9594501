//! Text serialization of a cell.
//!
//! Every writer takes the cell's generating point as `center` and offsets the
//! stored relative positions by it.

use std::io::{self, Write};

use crate::math::Point3;

use super::provenance::Provenance;
use super::Cell;

impl<P: Provenance> Cell<P> {
    /// Writes the cell as gnuplot line data: one block per face, listing its
    /// vertices and closing on the first, followed by a blank line.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_gnuplot<W: Write>(&self, w: &mut W, center: &Point3) -> io::Result<()> {
        for facet in self.facets() {
            let closing = facet.vertices.first().copied();
            for v in facet.vertices.iter().copied().chain(closing) {
                let p = center + self.point(v).coords;
                writeln!(w, "{} {} {}", p.x, p.y, p.z)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Writes the cell's skeleton as POV-Ray spheres at the vertices and
    /// cylinders along the edges, both of radius `r`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_pov<W: Write>(&self, w: &mut W, center: &Point3) -> io::Result<()> {
        for data in self.vertices.values() {
            let p = center + data.point.coords;
            writeln!(w, "sphere{{<{},{},{}>,r}}", p.x, p.y, p.z)?;
        }
        for (a, b) in self.edge_pairs() {
            let p = center + self.point(a).coords;
            let q = center + self.point(b).coords;
            writeln!(
                w,
                "cylinder{{<{},{},{}>,<{},{},{}>,r}}",
                p.x, p.y, p.z, q.x, q.y, q.z
            )?;
        }
        Ok(())
    }

    /// Writes the cell as a POV-Ray `mesh2` with fan-triangulated faces.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_pov_mesh<W: Write>(&self, w: &mut W, center: &Point3) -> io::Result<()> {
        let index = self.vertex_indices();
        writeln!(w, "mesh2 {{")?;
        writeln!(w, "vertex_vectors {{")?;
        writeln!(w, "{}", self.vertices.len())?;
        for data in self.vertices.values() {
            let p = center + data.point.coords;
            writeln!(w, ",<{},{},{}>", p.x, p.y, p.z)?;
        }
        writeln!(w, "}}")?;

        let faces = self.facets();
        let triangles: usize = faces.iter().map(|f| f.order().saturating_sub(2)).sum();
        writeln!(w, "face_indices {{")?;
        writeln!(w, "{triangles}")?;
        for facet in &faces {
            let Some((&first, rest)) = facet.vertices.split_first() else {
                continue;
            };
            for pair in rest.windows(2) {
                writeln!(w, ",<{},{},{}>", index[first], index[pair[0]], index[pair[1]])?;
            }
        }
        writeln!(w, "}}")?;
        writeln!(w, "inside_vector <0,0,1>")?;
        writeln!(w, "}}")
    }

    /// Writes the vertex index cycle of every face on one line, as
    /// `(a,b,c) (d,e,f,g) ...`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_facets<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let index = self.vertex_indices();
        let faces: Vec<String> = self
            .facets()
            .iter()
            .map(|facet| {
                let ids: Vec<String> = facet.vertices.iter().map(|&v| index[v].to_string()).collect();
                format!("({})", ids.join(","))
            })
            .collect();
        writeln!(w, "{}", faces.join(" "))
    }

    /// Writes the face-order histogram, one `order count` line per order.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_facet_statistics<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (order, count) in self.facet_statistics() {
            writeln!(w, "{order} {count}")?;
        }
        Ok(())
    }
}
