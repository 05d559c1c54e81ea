//! adapt-core: Core types and statistics for simulation result reduction.
//!
//! This crate provides the data model shared by the readers and the
//! reconstruction algorithms: histogram metadata and trimmed spectra,
//! detection efficiency, per-event aggregation with the history-by-history
//! variance estimator, and the run/mesh configuration read from macros.
//!

pub mod efficiency;
pub mod error;
pub mod events;
pub mod geometry;
pub mod hit;
pub mod spectrum;
pub mod summary;

pub use efficiency::EfficiencyEstimate;
pub use error::{Error, Result};
pub use events::{EventEnergy, EventStatistics, EventTotals};
pub use geometry::{
    voxels_for_extent, voxels_for_span, CylinderBins, RunConfig, ScoringMesh, Shape, VoxelDims,
    DEFAULT_PHI_BINS, DEFAULT_VOXEL_PITCH,
};
pub use hit::{HitBounds, HitRecord, Position};
pub use spectrum::{
    linspace, BinCenters, EnergySpectrum, HistogramExport, HistogramMetadata, RawSpectrum,
};
pub use summary::AnalysisSummary;
