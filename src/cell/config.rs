use crate::math::TOLERANCE;

/// Parameters controlling numerical robustness and memory growth of a cell.
#[derive(Debug, Clone, Copy)]
pub struct CellConfig {
    /// Distance of the plane equation below which a vertex counts as lying on
    /// the cutting plane.
    pub tolerance: f64,
    /// New-face vertices closer than this are merged into one.
    pub merge_tolerance: f64,
    /// Initial vertex capacity.
    pub initial_vertices: usize,
    /// Initial size of the order-pool table.
    pub initial_order: usize,
    /// Initial record capacity of the order-three pool.
    pub initial_order3_records: usize,
    /// Initial record capacity of every other pool.
    pub initial_pool_records: usize,
    /// Hard limit on the number of vertices.
    pub max_vertices: usize,
    /// Hard limit on the order of a single vertex.
    pub max_order: usize,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            tolerance: TOLERANCE,
            merge_tolerance: TOLERANCE,
            initial_vertices: 256,
            initial_order: 64,
            initial_order3_records: 256,
            initial_pool_records: 8,
            max_vertices: 16_777_216,
            max_order: 2048,
        }
    }
}

impl CellConfig {
    /// Sets the on-plane tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the distance below which new-face vertices are merged.
    #[must_use]
    pub fn with_merge_tolerance(mut self, merge_tolerance: f64) -> Self {
        self.merge_tolerance = merge_tolerance;
        self
    }

    /// Sets the initial vertex capacity and pool table size.
    #[must_use]
    pub fn with_initial_capacity(mut self, vertices: usize, order: usize) -> Self {
        self.initial_vertices = vertices.max(1);
        self.initial_order = order.max(3);
        self
    }

    /// Sets the hard limits on vertex count and vertex order.
    #[must_use]
    pub fn with_limits(mut self, max_vertices: usize, max_order: usize) -> Self {
        self.max_vertices = max_vertices;
        self.max_order = max_order;
        self
    }
}
