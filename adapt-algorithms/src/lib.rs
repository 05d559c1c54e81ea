//! adapt-algorithms: Spectral broadening and voxel grid reconstruction.
//!
//! This crate provides:
//! - **Gaussian broadening** of trimmed spectra (detector resolution)
//! - **Box reconstruction** of flat voxel dumps under a configurable scan order
//! - **Cylinder reconstruction** of explicitly indexed `(z, phi, r)` dumps
//! - A shape-independent [`Reconstructor`] over both
//!
#![warn(missing_docs)]

mod box_grid;
mod broadening;
mod cylinder;
pub mod flattening;
mod limits;
mod polar;
mod reconstruction;

pub use box_grid::{BoxGrid, BoxReconstructor};
pub use broadening::{GaussianBroadening, DEFAULT_FWHM, FWHM_TO_SIGMA};
pub use cylinder::{CylinderGrid, CylinderReconstructor, CylinderSample, DEFAULT_MASKED_RINGS};
pub use flattening::{Axis, FlatteningConvention};
pub use limits::{GridLimits, DEFAULT_MAX_GRID_BYTES};
pub use polar::PolarMesh;
pub use reconstruction::{EnergyGrid, GridReconstruction, Reconstructor, VoxelTable};
