//! Error types for adapt-core.

use thiserror::Error;

/// Result type alias for adapt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for result reduction.
///
/// Variants fall in two groups. Parse and consistency failures
/// (`MetadataNotFound`, `RunCountNotFound`, `VoxelCountMismatch`,
/// `NoMatchingVoxel`, ...) mean the run cannot be trusted and abort it.
/// Statistical degeneracies (see [`Error::is_degenerate`]) only make one
/// metric unavailable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The histogram export has no fixed-axis header line.
    #[error("{origin}: no line starting with \"#axis fixed\" (expected \"#axis fixed <bins> <min> <max>\")")]
    MetadataNotFound { origin: String },

    /// The macro has no run-count directive with an integer argument.
    #[error("{origin}: no \"/run/beamOn <count>\" directive with an integer argument")]
    RunCountNotFound { origin: String },

    /// Histogram header values are present but unusable.
    #[error("invalid histogram metadata: {0}")]
    InvalidMetadata(String),

    /// A ratio was requested with a zero denominator.
    #[error("division by zero while computing {quantity}")]
    DivisionByZero { quantity: &'static str },

    /// Efficiency uncertainty is undefined when nothing was detected.
    #[error("efficiency uncertainty undefined: {detected} detected events")]
    UndefinedUncertainty { detected: u64 },

    /// History-by-history variance needs at least two detected events.
    #[error("insufficient samples for variance: {detected} detected events (need at least 2)")]
    InsufficientSamples { detected: u64 },

    /// The detected count is too small for the recorded event totals.
    #[error("negative variance estimate: {detected} detected events for {events} events with deposits")]
    InconsistentEventCount { detected: u64, events: usize },

    /// The voxel table length does not match the declared mesh.
    #[error("voxel count mismatch: mesh declares {expected} voxels, table has {actual} rows")]
    VoxelCountMismatch { expected: usize, actual: usize },

    /// A voxel table value has no exact match in the axis values.
    #[error("row {row}: {axis} value {value} has no matching voxel")]
    NoMatchingVoxel {
        axis: &'static str,
        value: f64,
        row: usize,
    },

    /// The dense grid would exceed the memory ceiling.
    #[error("grid of {cells} voxels needs {requested_bytes} bytes, ceiling is {ceiling_bytes} bytes")]
    GridTooLarge {
        cells: usize,
        requested_bytes: usize,
        ceiling_bytes: usize,
    },

    /// A layer index outside the reconstructed stack.
    #[error("layer {index} out of range ({layers} layers)")]
    LayerOutOfRange { index: usize, layers: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Returns true for statistical degeneracies that make a single metric
    /// unavailable without invalidating the rest of the run.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            Self::DivisionByZero { .. }
                | Self::UndefinedUncertainty { .. }
                | Self::InsufficientSamples { .. }
                | Self::InconsistentEventCount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_classification() {
        assert!(Error::InsufficientSamples { detected: 1 }.is_degenerate());
        assert!(Error::UndefinedUncertainty { detected: 0 }.is_degenerate());
        assert!(!Error::VoxelCountMismatch {
            expected: 8,
            actual: 7
        }
        .is_degenerate());
        assert!(!Error::MetadataNotFound {
            origin: "h1.csv".into()
        }
        .is_degenerate());
    }

    #[test]
    fn test_messages_name_origin() {
        let err = Error::RunCountNotFound {
            origin: "ADAPT.mac".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ADAPT.mac"));
        assert!(msg.contains("/run/beamOn"));
    }

    #[test]
    fn test_metadata_message_names_accepted_form() {
        let msg = Error::MetadataNotFound {
            origin: "h1.csv".into(),
        }
        .to_string();
        assert!(msg.contains("\"#axis fixed <bins> <min> <max>\""));
        assert!(!msg.contains("<label>"));
    }
}
