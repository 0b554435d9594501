pub mod cell;
pub mod container;
pub mod error;
pub mod math;

pub use cell::{Cell, CellConfig, Facet, NeighborCell, VertexId, VoronoiCell};
pub use container::{Container, Particle, SearchConfig};
pub use error::{CellError, ContainerError, FacetsError, Result};
