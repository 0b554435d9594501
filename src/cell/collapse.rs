use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::CellError;
use crate::math::{Point3, Vector3};

use super::cut::dedupe_links;
use super::provenance::Provenance;
use super::{Cell, VertexId};

impl<P: Provenance> Cell<P> {
    /// Contracts every edge between two of `candidates` shorter than the merge
    /// tolerance, until none is left. Each merged vertex sits at the centroid
    /// of the original positions of every candidate folded into it, including
    /// those removed while the neighborhood settles.
    pub(crate) fn merge_close_vertices(&mut self, candidates: &[VertexId]) -> Result<(), CellError> {
        let limit = self.config.merge_tolerance * self.config.merge_tolerance;
        let members: HashSet<VertexId> = candidates.iter().copied().collect();
        let mut clusters: HashMap<VertexId, (Vector3, u32)> = candidates
            .iter()
            .filter(|&&v| self.vertices.contains_key(v))
            .map(|&v| (v, (self.point(v).coords, 1)))
            .collect();
        loop {
            let close = candidates
                .iter()
                .filter(|&&u| self.vertices.contains_key(u))
                .find_map(|&u| {
                    self.edges(u)
                        .iter()
                        .find(|&&w| {
                            w != u
                                && members.contains(&w)
                                && (self.point(u) - self.point(w)).norm_squared() < limit
                        })
                        .map(|&w| (u, w))
                });
            let Some((keep, drop)) = close else {
                return Ok(());
            };
            let (dropped_sum, dropped_count) = clusters
                .remove(&drop)
                .unwrap_or((self.point(drop).coords, 1));
            let merged = clusters.entry(keep).or_insert((self.point(keep).coords, 1));
            merged.0 += dropped_sum;
            merged.1 += dropped_count;
            let target = Point3::from(merged.0 / f64::from(merged.1));
            self.contract_edge(keep, drop, target)?;

            let mut folded = (Vector3::zeros(), 0);
            clusters.retain(|&v, &mut (sum, count)| {
                let alive = self.vertices.contains_key(v);
                if !alive {
                    folded.0 += sum;
                    folded.1 += count;
                }
                alive
            });
            if folded.1 > 0 {
                if let Some(merged) = clusters.get_mut(&keep) {
                    merged.0 += folded.0;
                    merged.1 += folded.1;
                    self.vertices[keep].point = Point3::from(merged.0 / f64::from(merged.1));
                }
            }
        }
    }

    /// Merges `drop` into `keep`, splicing the neighbor list of `drop` into
    /// the slot of `keep` that pointed at it, and moves `keep` to `target`.
    fn contract_edge(&mut self, keep: VertexId, drop: VertexId, target: Point3) -> Result<(), CellError> {
        let Some(i) = self.edges(keep).iter().position(|&w| w == drop) else {
            return Err(CellError::InvalidTopology(
                "contracted vertices are not adjacent".into(),
            ));
        };
        let j = self.back_ref(keep, i);
        let kept = self.links(keep);
        let dropped = self.links(drop);
        let n = dropped.len();

        let mut merged = Vec::with_capacity(kept.len() + n - 2);
        merged.extend_from_slice(&kept[..i]);
        merged.extend((1..n).map(|step| dropped[(j + step) % n]));
        merged.extend_from_slice(&kept[i + 1..]);

        let mut affected = vec![keep];
        for step in 1..n {
            let slot = (j + step) % n;
            let z = dropped[slot].0;
            let at = self.back_ref(drop, slot);
            let mut links = self.links(z);
            links[at].0 = keep;
            self.set_links(z, &links)?;
            affected.push(z);
        }

        self.vertices[keep].point = target;
        self.set_links(keep, &merged)?;
        self.remove_vertex(drop);
        trace!(order = merged.len(), "merged coincident vertices");
        self.settle(affected)
    }

    /// Removes consecutive duplicate neighbors from the given vertices,
    /// collapses any that drop below order three, and rebuilds the
    /// back-references of what is left.
    pub(crate) fn settle(&mut self, mut aux: Vec<VertexId>) -> Result<(), CellError> {
        for &v in &aux {
            self.dedupe_vertex(v)?;
        }
        let mut touched = Vec::new();
        while let Some(v) = aux.pop() {
            if !self.vertices.contains_key(v) {
                continue;
            }
            self.dedupe_vertex(v)?;
            match self.order(v) {
                1 => aux.extend(self.collapse_order1(v)?),
                2 => {
                    let (a, b) = self.collapse_order2(v)?;
                    aux.extend([a, b]);
                }
                _ => touched.push(v),
            }
        }
        for &v in &touched {
            if !self.vertices.contains_key(v) {
                continue;
            }
            let edges = self.edges(v);
            let distinct: HashSet<&VertexId> = edges.iter().collect();
            if distinct.len() != edges.len() {
                return Err(CellError::Degenerate(
                    "merged vertex reaches the same neighbor through two faces".into(),
                ));
            }
        }
        self.relink(&touched)
    }

    fn dedupe_vertex(&mut self, v: VertexId) -> Result<(), CellError> {
        if !self.vertices.contains_key(v) {
            return Ok(());
        }
        let mut links = self.links(v);
        if dedupe_links(&mut links) {
            self.set_links(v, &links)?;
        }
        Ok(())
    }

    /// Removes a vertex of order one from the list of its only neighbor,
    /// returning that neighbor if it survives.
    pub(crate) fn collapse_order1(&mut self, v: VertexId) -> Result<Option<VertexId>, CellError> {
        let a = self.edge(v, 0);
        self.remove_vertex(v);
        let mut links = self.links(a);
        if let Some(at) = links.iter().position(|&(w, _)| w == v) {
            links.remove(at);
        }
        if links.is_empty() {
            self.remove_vertex(a);
            trace!("collapsed isolated edge");
            return Ok(None);
        }
        self.set_links(a, &links)?;
        trace!(order = links.len(), "collapsed order-one vertex");
        Ok(Some(a))
    }

    /// Replaces a vertex of order two by a direct edge between its two
    /// neighbors, returning them.
    pub(crate) fn collapse_order2(&mut self, v: VertexId) -> Result<(VertexId, VertexId), CellError> {
        let (a, b) = (self.edge(v, 0), self.edge(v, 1));
        self.remove_vertex(v);
        for (end, other) in [(a, b), (b, a)] {
            let mut links = self.links(end);
            if let Some(at) = links.iter().position(|&(w, _)| w == v) {
                links[at].0 = other;
            }
            dedupe_links(&mut links);
            self.set_links(end, &links)?;
        }
        trace!("collapsed order-two vertex");
        Ok((a, b))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cell::VoronoiCell;

    /// A triangular prism with one edge split by an extra vertex.
    fn split_prism() -> (VoronoiCell, VertexId) {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert!(cell.plane(nalgebra::Vector3::new(1.0, 1.0, 0.0), 0.0).unwrap());
        let (u, w) = cell.edge_pairs()[0];
        let mid = Point3::from((cell.point(u).coords + cell.point(w).coords) * 0.5);
        let m = cell.add_vertex(mid, &[(u, ()), (w, ())]).unwrap();
        for (end, other) in [(u, w), (w, u)] {
            let mut links = cell.links(end);
            let at = links.iter().position(|&(x, _)| x == other).unwrap();
            links[at].0 = m;
            cell.set_links(end, &links).unwrap();
        }
        cell.relink(&[u, w, m]).unwrap();
        (cell, m)
    }

    #[test]
    fn order_two_vertex_is_removed() {
        let (mut cell, m) = split_prism();
        assert_eq!(cell.vertex_count(), 7);
        cell.settle(vec![m]).unwrap();
        assert_eq!(cell.vertex_count(), 6);
        assert_eq!(cell.edge_count(), 9);
        cell.check_relations().unwrap();
        assert!((cell.volume() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn order_one_vertex_is_removed() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        let a = cell.vertex_ids().next().unwrap();
        let tip = cell.add_vertex(Point3::new(-2.0, -2.0, -2.0), &[(a, ())]).unwrap();
        let mut links = cell.links(a);
        links.insert(1, (tip, ()));
        cell.set_links(a, &links).unwrap();
        cell.relink(&[a, tip]).unwrap();

        cell.settle(vec![tip]).unwrap();
        assert_eq!(cell.vertex_count(), 8);
        assert_eq!(cell.order(a), 3);
        cell.check_relations().unwrap();
        assert_eq!(cell.euler_characteristic(), 2);
    }

    #[test]
    fn contracting_a_triangle_edge_keeps_the_cell_closed() {
        let mut cell = VoronoiCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        assert!(cell.plane(nalgebra::Vector3::new(1.0, 1.0, 1.0), 4.0).unwrap());
        let triangle: Vec<VertexId> = cell
            .vertex_ids()
            .filter(|&v| (cell.point(v).coords.sum() - 2.0).abs() < 1e-12)
            .collect();
        assert_eq!(triangle.len(), 3);
        let mid = Point3::from((cell.point(triangle[0]).coords + cell.point(triangle[1]).coords) * 0.5);
        cell.contract_edge(triangle[0], triangle[1], mid).unwrap();
        // The triangle degenerates into a single vertex of order three.
        assert_eq!(cell.vertex_count(), 8);
        assert_eq!(cell.face_count(), 6);
        cell.check_relations().unwrap();
    }
}
