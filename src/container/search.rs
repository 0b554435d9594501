use tracing::{debug, trace};

use crate::cell::{Cell, Provenance};
use crate::error::CellError;
use crate::math::Vector3;

use super::{Container, Particle};

/// Parameters of the expanding-shell neighbor search.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Scales the distance a shell is assumed to cover when deciding that no
    /// further particle can cut the cell. Values below one search further.
    pub stop_factor: f64,
    /// Upper bound on the number of shells visited, if any.
    pub max_shells: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stop_factor: 1.0,
            max_shells: None,
        }
    }
}

impl SearchConfig {
    /// Sets the stopping-distance factor.
    #[must_use]
    pub fn with_stop_factor(mut self, stop_factor: f64) -> Self {
        self.stop_factor = stop_factor;
        self
    }

    /// Caps the number of shells visited.
    #[must_use]
    pub fn with_max_shells(mut self, max_shells: usize) -> Self {
        self.max_shells = Some(max_shells);
        self
    }
}

impl Container {
    /// Computes the Voronoi cell of `particle` into `cell`, relative to the
    /// particle's position.
    ///
    /// The cell starts as the domain box (half a period along periodic axes)
    /// and is cut by the radical plane of every particle in concentric
    /// shells of blocks around the particle's block, periodic images
    /// included. For particles without radii this is the bisecting plane.
    /// The search stops after a shell that cut nothing once no unvisited
    /// particle can place its plane within the cell's radius, when a walled
    /// grid is exhausted, or after [`SearchConfig::max_shells`] shells.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by the cell.
    pub fn compute_cell<P: Provenance>(
        &self,
        cell: &mut Cell<P>,
        particle: &Particle,
    ) -> Result<(), CellError> {
        let origin = particle.position;
        let mut lo = [0.0; 3];
        let mut hi = [0.0; 3];
        for axis in 0..3 {
            if self.periodic[axis] {
                let half = 0.5 * (self.max[axis] - self.min[axis]);
                (lo[axis], hi[axis]) = (-half, half);
            } else {
                (lo[axis], hi[axis]) = (self.min[axis] - origin[axis], self.max[axis] - origin[axis]);
            }
        }
        cell.init_box(lo[0], hi[0], lo[1], hi[1], lo[2], hi[2])?;

        let home = self.block_of(&origin);
        let width = self.block_size.min();
        let own_power = particle.radius * particle.radius;
        let deficit = (self.max_radius * self.max_radius - own_power).max(0.0);
        let mut total_cuts = 0;
        let mut shell = 0;
        loop {
            let mut cuts = 0;
            let mut visited = 0;
            for offset in shell_offsets(shell) {
                let Some((block, shift)) = self.resolve_block(home, offset) else {
                    continue;
                };
                visited += 1;
                for other in &self.blocks[self.block_index(block)] {
                    let normal: Vector3 = other.position + shift - origin;
                    if other == particle && normal.norm_squared() <= 0.0 {
                        continue;
                    }
                    let rs = normal.norm_squared() + own_power - other.radius * other.radius;
                    if cell.cut(normal, rs, P::tag(other.id))? {
                        cuts += 1;
                    }
                }
            }
            total_cuts += cuts;
            trace!(id = particle.id, shell, visited, cuts, "searched shell");

            // Unvisited particles lie at least `distance` away; the nearest
            // plane any of them can produce is `reach` from the origin.
            #[allow(clippy::cast_precision_loss)]
            let distance = shell as f64 * width * self.search.stop_factor;
            let reach = if distance > 0.0 {
                (distance * distance - deficit) / (2.0 * distance)
            } else {
                0.0
            };
            let converged =
                cuts == 0 && reach > 0.0 && reach * reach > cell.max_radius_squared();
            let capped = self.search.max_shells.is_some_and(|m| shell + 1 >= m);
            if visited == 0 || converged || capped {
                break;
            }
            shell += 1;
        }
        debug!(
            id = particle.id,
            shells = shell + 1,
            cuts = total_cuts,
            vertices = cell.vertex_count(),
            "computed cell"
        );
        Ok(())
    }

    /// Maps an offset from `home` to a stored block and the shift to apply to
    /// its particles, or `None` if it lies beyond a wall.
    fn resolve_block(&self, home: [usize; 3], offset: [isize; 3]) -> Option<([usize; 3], Vector3)> {
        let mut block = [0; 3];
        let mut shift = Vector3::zeros();
        for axis in 0..3 {
            let n = isize::try_from(self.grid[axis]).ok()?;
            let raw = isize::try_from(home[axis]).ok()? + offset[axis];
            if self.periodic[axis] {
                #[allow(clippy::cast_precision_loss)]
                let period = raw.div_euclid(n) as f64;
                shift[axis] = period * (self.max[axis] - self.min[axis]);
                block[axis] = usize::try_from(raw.rem_euclid(n)).ok()?;
            } else if (0..n).contains(&raw) {
                block[axis] = usize::try_from(raw).ok()?;
            } else {
                return None;
            }
        }
        Some((block, shift))
    }
}

/// Block offsets at Chebyshev distance exactly `shell` from the origin.
fn shell_offsets(shell: usize) -> impl Iterator<Item = [isize; 3]> {
    let s = isize::try_from(shell).unwrap_or(isize::MAX);
    (-s..=s).flat_map(move |i| {
        (-s..=s).flat_map(move |j| {
            (-s..=s)
                .filter(move |&k| i.abs() == s || j.abs() == s || k.abs() == s)
                .map(move |k| [i, j, k])
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cell::{NeighborCell, VoronoiCell};
    use crate::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn shells_have_the_expected_sizes() {
        assert_eq!(shell_offsets(0).count(), 1);
        assert_eq!(shell_offsets(1).count(), 26);
        assert_eq!(shell_offsets(2).count(), 125 - 27);
        assert!(shell_offsets(2).all(|o| o.iter().map(|c| c.abs()).max() == Some(2)));
    }

    #[test]
    fn walls_stop_the_search() {
        let con = Container::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0), [2; 3], [false; 3]).unwrap();
        assert!(con.resolve_block([0, 0, 0], [-1, 0, 0]).is_none());
        let (block, shift) = con.resolve_block([0, 0, 0], [1, 1, 1]).unwrap();
        assert_eq!(block, [1, 1, 1]);
        assert_eq!(shift, Vector3::zeros());
    }

    #[test]
    fn periodic_offsets_wrap_with_a_shift() {
        let con = Container::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0), [2; 3], [true; 3]).unwrap();
        let (block, shift) = con.resolve_block([0, 1, 0], [-1, 1, 0]).unwrap();
        assert_eq!(block, [1, 0, 0]);
        assert_relative_eq!(shift.x, -2.0);
        assert_relative_eq!(shift.y, 2.0);
        assert_relative_eq!(shift.z, 0.0);
    }

    #[test]
    fn lattice_cells_are_cubes() {
        let mut con = Container::new(Point3::origin(), Point3::new(3.0, 3.0, 3.0), [3; 3], [true; 3]).unwrap();
        let mut id = 0;
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    #[allow(clippy::cast_precision_loss)]
                    let p = Point3::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5);
                    con.put(id, p).unwrap();
                    id += 1;
                }
            }
        }
        let mut cell = NeighborCell::new();
        let centre = *con.particles().nth(13).unwrap();
        con.compute_cell(&mut cell, &centre).unwrap();
        assert_relative_eq!(cell.volume(), 1.0, epsilon = 1e-12);
        assert_eq!(cell.face_count(), 6);
        assert!(cell.neighbors().iter().all(|&n| n >= 0));
    }

    #[test]
    fn max_shells_caps_the_search() {
        let mut con = Container::new(Point3::origin(), Point3::new(4.0, 1.0, 1.0), [4, 1, 1], [false; 3])
            .unwrap()
            .with_search_config(SearchConfig::default().with_max_shells(1));
        con.put(0, Point3::new(0.5, 0.5, 0.5)).unwrap();
        con.put(1, Point3::new(2.5, 0.5, 0.5)).unwrap();
        let mut cell = VoronoiCell::new();
        let first = *con.particles().next().unwrap();
        con.compute_cell(&mut cell, &first).unwrap();
        // Only the home block was searched, so the cell is still the whole box.
        assert_relative_eq!(cell.volume(), 4.0, epsilon = 1e-12);
    }
}
