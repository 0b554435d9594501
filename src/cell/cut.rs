use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::CellError;
use crate::math::Vector3;

use super::classify::{PlaneClassifier, Side};
use super::provenance::Provenance;
use super::store::Link;
use super::{Cell, VertexId};

/// An edge crossing the cutting plane, named by its kept endpoint and the
/// slot of that endpoint pointing at the removed one.
type Crossing = (VertexId, usize);

impl<P: Provenance> Cell<P> {
    /// Cuts the cell by `{v : v·normal ≤ rs / 2}`, stamping the new face with
    /// `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plane is invalid, the cut empties the cell,
    /// memory limits are exceeded or the cut meets an inconsistent frontier.
    pub(crate) fn cut(&mut self, normal: Vector3, rs: f64, tag: P::Tag) -> Result<bool, CellError> {
        if !(normal.iter().all(|c| c.is_finite()) && rs.is_finite()) {
            return Err(CellError::InvalidPlane("coefficients must be finite".into()));
        }
        if normal.norm_squared() <= 0.0 {
            return Err(CellError::InvalidPlane("normal has zero length".into()));
        }
        if self.vertices.is_empty() {
            return Err(CellError::EmptyCell);
        }

        let mut sure = PlaneClassifier::new(normal, rs, self.config.tolerance);
        let Some(seed) = self.find_outside(&mut sure) else {
            return Ok(false);
        };

        // Flood the region to remove; it is connected because the cell is convex.
        let mut outside = HashSet::from([seed]);
        let mut delete_stack = vec![seed];
        let mut next = 0;
        while next < delete_stack.len() {
            let v = delete_stack[next];
            next += 1;
            for j in 0..self.order(v) {
                let w = self.edge(v, j);
                if !outside.contains(&w) && sure.classify(w, &self.point(w)).0 == Side::Outside {
                    outside.insert(w);
                    delete_stack.push(w);
                }
            }
        }
        if delete_stack.len() == self.vertices.len() {
            return Err(CellError::EmptyCell);
        }

        let mut crossings: Vec<Crossing> = Vec::new();
        for &o in &delete_stack {
            for j in 0..self.order(o) {
                let a = self.edge(o, j);
                if !outside.contains(&a) {
                    crossings.push((a, self.back_ref(o, j)));
                }
            }
        }
        let mut frontier = Vec::new();
        let mut sides = HashMap::new();
        for &(a, _) in &crossings {
            if !sides.contains_key(&a) {
                sides.insert(a, sure.classify(a, &self.point(a)));
                frontier.push(a);
            }
        }
        if !sides.values().any(|&(side, _)| side == Side::Inside) {
            let any_inside = self.vertices.iter().any(|(v, data)| {
                !outside.contains(&v) && sure.classify(v, &data.point).0 == Side::Inside
            });
            if !any_inside {
                return Err(CellError::EmptyCell);
            }
        }

        let (entry_of, exit_of) = self.pair_crossings(&crossings, &outside)?;

        // One frontier point per crossing: the kept end itself when it lies on
        // the plane, otherwise a new vertex on the edge.
        let mut point_of: HashMap<Crossing, VertexId> = HashMap::with_capacity(crossings.len());
        let mut created = Vec::new();
        for &(a, s) in &crossings {
            let (side, ua) = sides[&a];
            let point = if side == Side::On {
                a
            } else {
                let o = self.edge(a, s);
                let (_, uo) = sure.classify(o, &self.point(o));
                let (pa, po) = (self.point(a), self.point(o));
                let position = pa + (po - pa) * (ua / (ua - uo));
                let v = self.add_vertex(position, &[(a, tag); 3])?;
                created.push(v);
                v
            };
            point_of.insert((a, s), point);
        }

        // New vertices: the kept end, then the next and previous points of the
        // new face. Their faces are the two faces of the crossed edge and the
        // new face.
        for &(a, s) in &crossings {
            if sides[&a].0 != Side::Inside {
                continue;
            }
            let tags = self.slot_tags(a);
            let (exit_face, entry_face) = (tags[s], tags[(s + 1) % tags.len()]);
            let y = point_of[&entry_of[&(a, s)]];
            let x = point_of[&exit_of[&(a, s)]];
            let mut links = vec![(a, entry_face), (y, exit_face), (x, tag)];
            dedupe_links(&mut links);
            self.set_links(point_of[&(a, s)], &links)?;
        }

        let mut rewired = Vec::with_capacity(frontier.len());
        for &a in &frontier {
            let old = self.links(a);
            let links = if sides[&a].0 == Side::Inside {
                old.iter()
                    .enumerate()
                    .map(|(s, &(w, t))| {
                        if outside.contains(&w) {
                            (point_of[&(a, s)], t)
                        } else {
                            (w, t)
                        }
                    })
                    .collect()
            } else {
                self.rewire_on_plane(a, &old, &outside, &point_of, &entry_of, &exit_of, tag)?
            };
            rewired.push((a, links));
        }
        for (a, links) in &rewired {
            self.set_links(*a, links)?;
        }

        let mut touched = frontier.clone();
        touched.extend(&created);
        self.relink(&touched)?;
        for &o in &delete_stack {
            self.remove_vertex(o);
        }

        let low: Vec<VertexId> = touched
            .iter()
            .copied()
            .filter(|&v| self.vertices.contains_key(v) && self.order(v) < 3)
            .collect();
        self.settle(low)?;

        let mut face: Vec<VertexId> = frontier
            .iter()
            .copied()
            .filter(|v| sides[v].0 == Side::On)
            .collect();
        face.extend(&created);
        self.merge_close_vertices(&face)?;

        if self.vertices.len() < 4 {
            return Err(CellError::EmptyCell);
        }
        self.seed = face
            .iter()
            .copied()
            .find(|&v| self.vertices.contains_key(v));
        trace!(
            removed = delete_stack.len(),
            created = created.len(),
            marginal = sure.marginal_count(),
            vertices = self.vertices.len(),
            "plane cut"
        );
        Ok(true)
    }

    /// Climbs the plane equation from the seed vertex until an outside vertex
    /// is found, or a maximum that is not outside proves there is none.
    fn find_outside(&self, sure: &mut PlaneClassifier) -> Option<VertexId> {
        let start = self
            .seed
            .filter(|&v| self.vertices.contains_key(v))
            .or_else(|| self.vertices.keys().next())?;
        let (mut v, (mut side, mut u)) = (start, sure.classify(start, &self.point(start)));
        loop {
            if side == Side::Outside {
                return Some(v);
            }
            let mut best: Option<(VertexId, Side, f64)> = None;
            for &w in self.edges(v) {
                let (sw, uw) = sure.classify(w, &self.point(w));
                if sw == Side::Outside {
                    return Some(w);
                }
                if uw > best.map_or(u, |(_, _, bu)| bu) {
                    best = Some((w, sw, uw));
                }
            }
            (v, side, u) = best?;
        }
    }

    /// Walks every face leaving the kept region through a crossing until it
    /// comes back, pairing each exit crossing with the entry crossing of the
    /// same face.
    #[allow(clippy::type_complexity)]
    fn pair_crossings(
        &self,
        crossings: &[Crossing],
        outside: &HashSet<VertexId>,
    ) -> Result<(HashMap<Crossing, Crossing>, HashMap<Crossing, Crossing>), CellError> {
        let limit: usize = outside.iter().map(|&o| self.order(o)).sum();
        let mut entry_of = HashMap::with_capacity(crossings.len());
        let mut exit_of = HashMap::with_capacity(crossings.len());
        for &(a, s) in crossings {
            let mut v = self.edge(a, s);
            let mut arrive = self.back_ref(a, s);
            let mut steps = 0;
            let entry = loop {
                let slot = (arrive + 1) % self.order(v);
                let w = self.edge(v, slot);
                let back = self.back_ref(v, slot);
                if !outside.contains(&w) {
                    break (w, back);
                }
                (v, arrive) = (w, back);
                steps += 1;
                if steps > limit {
                    return Err(CellError::Degenerate(
                        "face walk never left the cut region".into(),
                    ));
                }
            };
            entry_of.insert((a, s), entry);
            if exit_of.insert(entry, (a, s)).is_some() {
                return Err(CellError::Degenerate(
                    "two faces re-enter the cell through the same edge".into(),
                ));
            }
        }
        Ok((entry_of, exit_of))
    }

    /// New neighbor list of a kept vertex lying on the plane: its run of
    /// removed neighbors is replaced by its two neighbors along the new face.
    #[allow(clippy::too_many_arguments)]
    fn rewire_on_plane(
        &self,
        a: VertexId,
        old: &[Link<P::Tag>],
        outside: &HashSet<VertexId>,
        point_of: &HashMap<Crossing, VertexId>,
        entry_of: &HashMap<Crossing, Crossing>,
        exit_of: &HashMap<Crossing, Crossing>,
        tag: P::Tag,
    ) -> Result<Vec<Link<P::Tag>>, CellError> {
        let k = old.len();
        let is_out = |s: usize| outside.contains(&old[s % k].0);
        let Some(start) = (0..k).find(|&s| !is_out(s)) else {
            return Err(CellError::Degenerate(
                "vertex on the plane lost all of its neighbors".into(),
            ));
        };
        let mut links = Vec::with_capacity(k + 1);
        let mut runs = 0;
        for step in 0..k {
            let s = (start + step) % k;
            let (w, t) = old[s];
            if !is_out(s) {
                links.push((w, t));
                continue;
            }
            if !is_out(s + k - 1) {
                runs += 1;
                links.push((point_of[&entry_of[&(a, s)]], t));
            }
            if !is_out(s + 1) {
                links.push((point_of[&exit_of[&(a, s)]], tag));
            }
        }
        if runs > 1 {
            return Err(CellError::Degenerate(
                "vertex on the plane touches the cut region twice".into(),
            ));
        }
        dedupe_links(&mut links);
        Ok(links)
    }
}

/// Removes cyclically consecutive entries pointing at the same vertex, keeping
/// the first of each pair. The wedge between such entries is a collapsed face.
pub(crate) fn dedupe_links<T>(links: &mut Vec<Link<T>>) -> bool {
    let mut changed = false;
    loop {
        let n = links.len();
        if n < 2 {
            break;
        }
        let Some(i) = (0..n).find(|&i| links[i].0 == links[(i + 1) % n].0) else {
            break;
        };
        links.remove((i + 1) % n);
        changed = true;
    }
    changed
}
