use thiserror::Error;

/// Top-level error type for the facets crate.
#[derive(Debug, Error)]
pub enum FacetsError {
    #[error(transparent)]
    Cell(#[from] CellError),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Errors raised while building or cutting a single cell.
///
/// Every variant except the two oracle failures is fatal for the cell: its
/// contents are unspecified afterwards and it must be re-initialized.
#[derive(Debug, Error)]
pub enum CellError {
    #[error("plane cut removed the whole cell")]
    EmptyCell,

    #[error("vertex storage would exceed the limit of {limit} vertices")]
    VertexLimit { limit: usize },

    #[error("vertex order {order} exceeds the limit of {limit}")]
    OrderLimit { order: usize, limit: usize },

    #[error("invalid cutting plane: {0}")]
    InvalidPlane(String),

    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("degenerate configuration: {0}")]
    Degenerate(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("vertices {first} and {second} share the position ({x}, {y}, {z})")]
    DuplicateVertex {
        first: usize,
        second: usize,
        x: f64,
        y: f64,
        z: f64,
    },
}

/// Errors raised by the particle container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("invalid container geometry: {0}")]
    InvalidGeometry(String),

    #[error("particle {id} at ({x}, {y}, {z}) lies outside the container")]
    OutOfBounds { id: i32, x: f64, y: f64, z: f64 },

    #[error("particle {id} has invalid radius {radius}")]
    InvalidRadius { id: i32, radius: f64 },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("cell computation failed for particle {id}")]
    Cell {
        id: i32,
        #[source]
        source: CellError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for results using [`FacetsError`].
pub type Result<T> = std::result::Result<T, FacetsError>;
