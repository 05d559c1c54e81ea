//! Run configuration and scoring-mesh geometry.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Voxel pitch used by the macro generator when it derives bin counts.
pub const DEFAULT_VOXEL_PITCH: f64 = 0.01;

/// Azimuthal bins the macro generator uses for cylindrical meshes.
pub const DEFAULT_PHI_BINS: usize = 360;

/// Scoring mesh shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Rectangular box mesh.
    Box,
    /// Cylindrical (R, Z, Phi) mesh.
    Cylinder,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Box => write!(f, "box"),
            Self::Cylinder => write!(f, "cylinder"),
        }
    }
}

/// Voxel counts of a box mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelDims {
    /// Voxels along X.
    pub nx: usize,
    /// Voxels along Y.
    pub ny: usize,
    /// Voxels along Z.
    pub nz: usize,
}

impl VoxelDims {
    /// Creates new voxel dimensions.
    #[must_use]
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Total voxel count, or `None` on overflow.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)?.checked_mul(self.nz)
    }
}

/// Bin counts of a cylindrical mesh, in macro order (R, Z, Phi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CylinderBins {
    /// Radial bins.
    pub r: usize,
    /// Axial bins.
    pub z: usize,
    /// Azimuthal bins.
    pub phi: usize,
}

impl CylinderBins {
    /// Total voxel count, or `None` on overflow.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.r.checked_mul(self.z)?.checked_mul(self.phi)
    }
}

/// Number of voxels covering a full `span` at the given pitch.
///
/// # Errors
/// Returns [`Error::ConfigError`] for non-positive or non-finite inputs.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn voxels_for_span(span: f64, pitch: f64) -> Result<usize> {
    if !(span.is_finite() && span > 0.0) {
        return Err(Error::ConfigError(format!("extent must be positive, got {span}")));
    }
    if !(pitch.is_finite() && pitch > 0.0) {
        return Err(Error::ConfigError(format!("voxel pitch must be positive, got {pitch}")));
    }
    let count = (span / pitch).round();
    if count < 1.0 || count > usize::MAX as f64 {
        return Err(Error::ConfigError(format!(
            "extent {span} at pitch {pitch} gives {count} voxels"
        )));
    }
    Ok(count as usize)
}

/// Number of voxels spanning `2 * half_extent` at the given pitch.
///
/// # Errors
/// Returns [`Error::ConfigError`] for non-positive or non-finite inputs.
pub fn voxels_for_extent(half_extent: f64, pitch: f64) -> Result<usize> {
    voxels_for_span(2.0 * half_extent, pitch)
}

/// Command-based scoring mesh declared in the macro.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScoringMesh {
    /// Box mesh with half extents (x, y, z) and voxel counts.
    Box {
        /// Half extents along x, y, z.
        half_extents: [f64; 3],
        /// Voxel counts.
        voxels: VoxelDims,
    },
    /// Cylinder mesh with radius, half length and bins.
    Cylinder {
        /// Outer radius.
        radius: f64,
        /// Half length along the cylinder axis.
        half_length: f64,
        /// Bin counts.
        bins: CylinderBins,
    },
}

impl ScoringMesh {
    /// Builds a box mesh, recomputing voxel counts from the extents at `pitch`.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for invalid extents or pitch.
    pub fn box_from_extents(half_extents: [f64; 3], pitch: f64) -> Result<Self> {
        let voxels = VoxelDims::new(
            voxels_for_extent(half_extents[0], pitch)?,
            voxels_for_extent(half_extents[1], pitch)?,
            voxels_for_extent(half_extents[2], pitch)?,
        );
        Ok(Self::Box {
            half_extents,
            voxels,
        })
    }

    /// Builds a cylinder mesh, recomputing R and Z bins at `pitch`.
    ///
    /// Radial bins cover `radius`, axial bins the full length, and the
    /// azimuth uses [`DEFAULT_PHI_BINS`].
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for invalid extents or pitch.
    pub fn cylinder_from_extents(radius: f64, half_length: f64, pitch: f64) -> Result<Self> {
        let bins = CylinderBins {
            r: voxels_for_span(radius, pitch)?,
            z: voxels_for_extent(half_length, pitch)?,
            phi: DEFAULT_PHI_BINS,
        };
        Ok(Self::Cylinder {
            radius,
            half_length,
            bins,
        })
    }

    /// Shape of the mesh.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Box { .. } => Shape::Box,
            Self::Cylinder { .. } => Shape::Cylinder,
        }
    }

    /// Total voxel count, or `None` on overflow.
    #[must_use]
    pub fn voxel_count(&self) -> Option<usize> {
        match self {
            Self::Box { voxels, .. } => voxels.total(),
            Self::Cylinder { bins, .. } => bins.total(),
        }
    }
}

/// Parameters of one simulation run, read from its macro.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunConfig {
    /// Number of simulated primaries.
    pub simulated_events: u64,
    /// Scoring mesh, if the macro declares one.
    pub mesh: Option<ScoringMesh>,
}

impl RunConfig {
    /// Creates a run config without a mesh.
    #[must_use]
    pub fn new(simulated_events: u64) -> Self {
        Self {
            simulated_events,
            mesh: None,
        }
    }

    /// Sets the scoring mesh.
    #[must_use]
    pub fn with_mesh(mut self, mesh: ScoringMesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Box voxel counts, or a configuration error if the mesh is not a box.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] when no box mesh is declared.
    pub fn box_voxels(&self) -> Result<VoxelDims> {
        match self.mesh {
            Some(ScoringMesh::Box { voxels, .. }) => Ok(voxels),
            Some(ScoringMesh::Cylinder { .. }) => Err(Error::ConfigError(
                "macro declares a cylinder mesh, box voxel counts requested".into(),
            )),
            None => Err(Error::ConfigError("macro declares no scoring mesh".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxels_for_extent() {
        // 5 mm half extent, full 10 mm at 0.01 pitch
        assert_eq!(voxels_for_extent(5.0, 0.01).unwrap(), 1000);
        assert_eq!(voxels_for_extent(0.5, 0.5).unwrap(), 2);
        assert!(voxels_for_extent(0.0, 0.01).is_err());
        assert!(voxels_for_extent(1.0, 0.0).is_err());
        assert!(voxels_for_extent(0.001, 1.0).is_err());
        assert_eq!(voxels_for_span(0.2, 0.01).unwrap(), 20);
    }

    #[test]
    fn test_box_from_extents() {
        let mesh = ScoringMesh::box_from_extents([0.5, 0.25, 0.05], 0.01).unwrap();
        assert_eq!(mesh.shape(), Shape::Box);
        assert_eq!(mesh.voxel_count(), Some(100 * 50 * 10));
    }

    #[test]
    fn test_cylinder_from_extents() {
        let mesh = ScoringMesh::cylinder_from_extents(0.2, 0.5, 0.01).unwrap();
        match mesh {
            ScoringMesh::Cylinder { bins, .. } => {
                assert_eq!(bins.r, 20);
                assert_eq!(bins.z, 100);
                assert_eq!(bins.phi, DEFAULT_PHI_BINS);
            }
            ScoringMesh::Box { .. } => panic!("expected cylinder"),
        }
    }

    #[test]
    fn test_voxel_total_overflow() {
        let dims = VoxelDims::new(usize::MAX, 2, 1);
        assert_eq!(dims.total(), None);
    }

    #[test]
    fn test_run_config_box_voxels() {
        let config = RunConfig::new(1000);
        assert!(config.box_voxels().is_err());
        let config = config.with_mesh(ScoringMesh::Box {
            half_extents: [1.0, 1.0, 1.0],
            voxels: VoxelDims::new(2, 3, 4),
        });
        assert_eq!(config.box_voxels().unwrap(), VoxelDims::new(2, 3, 4));
    }
}
