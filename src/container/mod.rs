//! A block-grid particle container that computes the Voronoi cell of each
//! particle by cutting a box with the bisecting planes of its neighbors.
//!
//! Particles may carry a radius. When any radius is non-zero the cells are
//! those of the radical (Laguerre) tessellation: the plane between two
//! particles is shifted towards the smaller one so that both have equal power
//! distance on it.

mod search;

pub use search::SearchConfig;

use std::io::{BufRead, Write};

use tracing::{debug, error};

use crate::cell::{Cell, CellConfig, NeighborCell, Provenance, VoronoiCell};
use crate::error::ContainerError;
use crate::math::{Point3, Vector3};

/// A particle stored in a container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Caller-chosen identifier, reported as the neighbor id of the faces
    /// this particle generates.
    pub id: i32,
    /// Position inside the container domain.
    pub position: Point3,
    /// Weight of the radical tessellation; zero for plain Voronoi cells.
    pub radius: f64,
}

/// Rectangular domain split into a grid of blocks, each holding the particles
/// inside it.
#[derive(Debug, Clone)]
pub struct Container {
    min: Point3,
    max: Point3,
    grid: [usize; 3],
    periodic: [bool; 3],
    block_size: Vector3,
    blocks: Vec<Vec<Particle>>,
    max_radius: f64,
    cell_config: CellConfig,
    search: SearchConfig,
}

impl Container {
    /// Creates an empty container over `[min, max]` with `grid` blocks along
    /// each axis. Axes flagged in `periodic` wrap around.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidGeometry`] if the domain is empty or
    /// not finite, or a grid dimension is zero.
    pub fn new(
        min: Point3,
        max: Point3,
        grid: [usize; 3],
        periodic: [bool; 3],
    ) -> Result<Self, ContainerError> {
        for axis in 0..3 {
            if !(min[axis].is_finite() && max[axis].is_finite() && min[axis] < max[axis]) {
                return Err(ContainerError::InvalidGeometry(format!(
                    "axis {axis} range [{}, {}] is empty or not finite",
                    min[axis], max[axis]
                )));
            }
            if grid[axis] == 0 {
                return Err(ContainerError::InvalidGeometry(format!(
                    "axis {axis} has no blocks"
                )));
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let block_size = (max - min).component_div(&Vector3::new(
            grid[0] as f64,
            grid[1] as f64,
            grid[2] as f64,
        ));
        Ok(Self {
            min,
            max,
            grid,
            periodic,
            block_size,
            blocks: vec![Vec::new(); grid[0] * grid[1] * grid[2]],
            max_radius: 0.0,
            cell_config: CellConfig::default(),
            search: SearchConfig::default(),
        })
    }

    /// Sets the parameters of the cells computed by this container.
    #[must_use]
    pub fn with_cell_config(mut self, config: CellConfig) -> Self {
        self.cell_config = config;
        self
    }

    /// Sets the neighbor search parameters.
    #[must_use]
    pub fn with_search_config(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Lower corner of the domain.
    #[must_use]
    pub fn min(&self) -> Point3 {
        self.min
    }

    /// Upper corner of the domain.
    #[must_use]
    pub fn max(&self) -> Point3 {
        self.max
    }

    /// Volume of the domain.
    #[must_use]
    pub fn domain_volume(&self) -> f64 {
        (self.max - self.min).product()
    }

    /// Largest particle radius stored so far.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Number of stored particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Whether the container holds no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Vec::is_empty)
    }

    /// All particles, block by block.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.blocks.iter().flatten()
    }

    /// Inserts a particle with zero radius. Coordinates along periodic axes
    /// are wrapped into the domain.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OutOfBounds`] if the position lies outside
    /// the domain along a non-periodic axis or is not finite.
    pub fn put(&mut self, id: i32, position: Point3) -> Result<(), ContainerError> {
        self.put_with_radius(id, position, 0.0)
    }

    /// Inserts a particle carrying a radical-tessellation radius.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRadius`] for a negative or non-finite
    /// radius, and the errors of [`put`](Self::put).
    pub fn put_with_radius(
        &mut self,
        id: i32,
        position: Point3,
        radius: f64,
    ) -> Result<(), ContainerError> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(ContainerError::InvalidRadius { id, radius });
        }
        let out_of_bounds = || ContainerError::OutOfBounds {
            id,
            x: position.x,
            y: position.y,
            z: position.z,
        };
        let mut wrapped = position;
        for axis in 0..3 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            let mut x = position[axis];
            if !x.is_finite() {
                return Err(out_of_bounds());
            }
            if self.periodic[axis] {
                x = lo + (x - lo).rem_euclid(hi - lo);
            } else if x < lo || x > hi {
                return Err(out_of_bounds());
            }
            wrapped[axis] = x;
        }
        let index = self.block_index(self.block_of(&wrapped));
        self.blocks[index].push(Particle {
            id,
            position: wrapped,
            radius,
        });
        self.max_radius = self.max_radius.max(radius);
        Ok(())
    }

    /// Reads whitespace-separated `id x y z` or `id x y z r` lines, skipping
    /// blank lines and lines starting with `#`. Returns the number of
    /// particles inserted.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Parse`] for a malformed line, and the errors
    /// of [`put`](Self::put) and the reader.
    pub fn import<R: BufRead>(&mut self, reader: R) -> Result<usize, ContainerError> {
        let mut count = 0;
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_error = |message: String| ContainerError::Parse {
                line: number + 1,
                message,
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (id, coords_text, radius_text) = match fields[..] {
                [id, x, y, z] => (id, [x, y, z], None),
                [id, x, y, z, r] => (id, [x, y, z], Some(r)),
                _ => {
                    return Err(parse_error(format!(
                        "expected 4 or 5 fields, found {}",
                        fields.len()
                    )))
                }
            };
            let id: i32 = id
                .parse()
                .map_err(|e| parse_error(format!("particle id {id:?}: {e}")))?;
            let mut coords = [0.0; 3];
            for (value, text) in coords.iter_mut().zip(coords_text) {
                *value = text
                    .parse()
                    .map_err(|e| parse_error(format!("coordinate {text:?}: {e}")))?;
            }
            let radius = match radius_text {
                Some(text) => text
                    .parse()
                    .map_err(|e| parse_error(format!("radius {text:?}: {e}")))?,
                None => 0.0,
            };
            self.put_with_radius(id, Point3::from(coords), radius)?;
            count += 1;
        }
        debug!(count, "imported particles");
        Ok(count)
    }

    /// Writes every particle as an `id x y z` line, with the radius appended
    /// when any particle has one.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_particles<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        for p in self.particles() {
            write!(w, "{} {} {} {}", p.id, p.position.x, p.position.y, p.position.z)?;
            if self.is_radical() {
                write!(w, " {}", p.radius)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Writes every particle as a POV-Ray sphere preceded by a `// id <id>`
    /// comment. The sphere radius is the particle's own radius, or the POV-Ray
    /// variable `r` when no particle has one.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_particles_pov<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        for p in self.particles() {
            let (x, y, z) = (p.position.x, p.position.y, p.position.z);
            writeln!(w, "// id {}", p.id)?;
            if self.is_radical() {
                writeln!(w, "sphere{{<{x},{y},{z}>,{}}}", p.radius)?;
            } else {
                writeln!(w, "sphere{{<{x},{y},{z}>,r}}")?;
            }
        }
        Ok(())
    }

    /// Writes the outline of the domain box in gnuplot format, one closed
    /// loop per side.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_domain_gnuplot<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        self.domain_cell()?.write_gnuplot(w, &Point3::origin())?;
        Ok(())
    }

    /// Writes the domain box as POV-Ray spheres at its corners and cylinders
    /// along its edges.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_domain_pov<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        self.domain_cell()?.write_pov(w, &Point3::origin())?;
        Ok(())
    }

    /// Computes the volume of every particle's cell, as `(id, volume)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Cell`] for the first particle whose cell
    /// could not be computed.
    pub fn cell_volumes(&self) -> Result<Vec<(i32, f64)>, ContainerError> {
        let mut cell = VoronoiCell::with_config(self.cell_config);
        self.particles()
            .map(|p| {
                self.cell_for(&mut cell, p)?;
                Ok((p.id, cell.volume()))
            })
            .collect()
    }

    /// Computes the cell volumes on the rayon thread pool, one cell per
    /// worker task.
    ///
    /// # Errors
    ///
    /// See [`cell_volumes`](Self::cell_volumes).
    #[cfg(feature = "rayon")]
    pub fn par_cell_volumes(&self) -> Result<Vec<(i32, f64)>, ContainerError> {
        use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};

        let particles: Vec<&Particle> = self.particles().collect();
        particles
            .par_iter()
            .map_init(
                || VoronoiCell::with_config(self.cell_config),
                |cell, p| {
                    self.cell_for(cell, p)?;
                    Ok((p.id, cell.volume()))
                },
            )
            .collect()
    }

    /// Sum of all cell volumes. Equals the domain volume when every cell is
    /// computed correctly.
    ///
    /// # Errors
    ///
    /// See [`cell_volumes`](Self::cell_volumes).
    pub fn sum_cell_volumes(&self) -> Result<f64, ContainerError> {
        Ok(self.cell_volumes()?.iter().map(|&(_, v)| v).sum())
    }

    /// Writes every cell in gnuplot format, positioned at its particle.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Cell`] for a failed cell and propagates I/O
    /// errors.
    pub fn write_cells_gnuplot<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        let mut cell = VoronoiCell::with_config(self.cell_config);
        for p in self.particles() {
            self.cell_for(&mut cell, p)?;
            cell.write_gnuplot(w, &p.position)?;
        }
        Ok(())
    }

    /// Writes every cell as POV-Ray spheres and cylinders, each preceded by a
    /// `// cell <id>` comment.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Cell`] for a failed cell and propagates I/O
    /// errors.
    pub fn write_cells_pov<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        let mut cell = VoronoiCell::with_config(self.cell_config);
        for p in self.particles() {
            self.cell_for(&mut cell, p)?;
            writeln!(w, "// cell {}", p.id)?;
            cell.write_pov(w, &p.position)?;
        }
        Ok(())
    }

    /// Writes one line per particle: its id followed by the ids of the
    /// particles (or negative walls) sharing a face with its cell.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Cell`] for a failed cell and propagates I/O
    /// errors.
    pub fn write_neighbors<W: Write>(&self, w: &mut W) -> Result<(), ContainerError> {
        let mut cell = NeighborCell::with_config(self.cell_config);
        for p in self.particles() {
            self.cell_for(&mut cell, p)?;
            write!(w, "{} ", p.id)?;
            cell.write_neighbors(w)?;
        }
        Ok(())
    }

    fn is_radical(&self) -> bool {
        self.max_radius > 0.0
    }

    fn domain_cell(&self) -> Result<VoronoiCell, ContainerError> {
        let mut cell = VoronoiCell::new();
        let (lo, hi) = (self.min, self.max);
        cell.init_box(lo.x, hi.x, lo.y, hi.y, lo.z, hi.z)
            .map_err(|e| ContainerError::InvalidGeometry(e.to_string()))?;
        Ok(cell)
    }

    fn cell_for<P: Provenance>(&self, cell: &mut Cell<P>, p: &Particle) -> Result<(), ContainerError> {
        self.compute_cell(cell, p).map_err(|source| {
            error!(id = p.id, %source, "cell computation failed");
            ContainerError::Cell { id: p.id, source }
        })
    }

    fn block_index(&self, [i, j, k]: [usize; 3]) -> usize {
        i + self.grid[0] * (j + self.grid[1] * k)
    }

    fn block_of(&self, position: &Point3) -> [usize; 3] {
        let mut block = [0; 3];
        for (axis, b) in block.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = ((position[axis] - self.min[axis]) / self.block_size[axis])
                .floor()
                .max(0.0) as usize;
            *b = index.min(self.grid[axis] - 1);
        }
        block
    }
}
