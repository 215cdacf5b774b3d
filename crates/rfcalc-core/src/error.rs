//! Unified error types for the rfcalc workspace.
//!
//! [`RfError`] is the single error surface at API boundaries: schematic
//! topology failures, numerical failures, bad caller input, cooperative
//! cancellation, and the usual I/O and parse wrappers. Domain code returns
//! the narrow kinds ([`TopologyError`], [`NumericalError`]) and callers
//! widen with `?`.

use thiserror::Error;

/// Unified error type for all rfcalc operations.
#[derive(Error, Debug)]
pub enum RfError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Bad caller input (ranges, counts, frequencies)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The schematic does not describe a simulatable network
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Linear algebra failure
    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),

    /// A long-running engine observed its cancellation flag
    #[error("operation cancelled")]
    Cancelled,

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using RfError.
pub type RfResult<T> = Result<T, RfError>;

/// Reasons the spatial netlister can reject a schematic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    #[error("no port in circuit")]
    NoPort,
    #[error("too many ports: {0} (at most 4 supported)")]
    TooManyPorts(usize),
    #[error("no ground in circuit")]
    NoGround,
    #[error("ground is not connected")]
    GroundNotConnected,
    #[error("port {0} is not connected")]
    PortNotConnected(u8),
    #[error("duplicate port number {0}")]
    DuplicatePortNumber(u8),
}

/// Linear-algebra failures surfaced by the solver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericalError {
    #[error("singular matrix")]
    SingularMatrix,
    #[error("non-finite result")]
    NonFiniteResult,
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for RfError {
    fn from(err: anyhow::Error) -> Self {
        RfError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for RfError {
    fn from(s: String) -> Self {
        RfError::Other(s)
    }
}

impl From<&str> for RfError {
    fn from(s: &str) -> Self {
        RfError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for RfError {
    fn from(err: serde_json::Error) -> Self {
        RfError::Parse(err.to_string())
    }
}
