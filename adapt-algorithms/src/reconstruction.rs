//! Shape-independent reconstruction entry point.

use crate::box_grid::{BoxGrid, BoxReconstructor};
use crate::cylinder::{CylinderGrid, CylinderReconstructor, CylinderSample};
use crate::flattening::FlatteningConvention;
use crate::limits::GridLimits;
use adapt_core::{Error, Result, RunConfig, ScoringMesh, Shape};

/// Trait for voxel grid reconstruction.
///
/// Each mesh topology turns its own table type into its own grid type
/// using the run's configuration.
pub trait GridReconstruction: Send + Sync {
    /// Table rows consumed by the reconstruction.
    type Table: ?Sized;
    /// Reconstructed grid.
    type Grid;

    /// Returns the name of the reconstruction.
    fn name(&self) -> &'static str;

    /// Rebuilds a grid from `table` for the mesh declared in `config`.
    ///
    /// # Errors
    /// Returns an error if the table does not match the declared mesh.
    fn reconstruct_grid(&self, table: &Self::Table, config: &RunConfig) -> Result<Self::Grid>;
}

impl GridReconstruction for BoxReconstructor {
    type Table = [f64];
    type Grid = BoxGrid;

    fn name(&self) -> &'static str {
        "Box"
    }

    fn reconstruct_grid(&self, table: &[f64], config: &RunConfig) -> Result<BoxGrid> {
        self.reconstruct(table, config.box_voxels()?)
    }
}

impl GridReconstruction for CylinderReconstructor {
    type Table = [CylinderSample];
    type Grid = CylinderGrid;

    fn name(&self) -> &'static str {
        "Cylinder"
    }

    fn reconstruct_grid(&self, table: &[CylinderSample], config: &RunConfig) -> Result<CylinderGrid> {
        let grid = self.reconstruct(table)?;
        if let Some(ScoringMesh::Cylinder { bins, .. }) = config.mesh {
            let (nr, nphi) = grid.layer_shape();
            if (nr, nphi, grid.layer_count()) != (bins.r, bins.phi, bins.z) {
                log::warn!(
                    "cylinder dump has {}x{}x{} (R x Phi x Z) voxels, macro declares {}x{}x{}; using the dump",
                    nr,
                    nphi,
                    grid.layer_count(),
                    bins.r,
                    bins.phi,
                    bins.z
                );
            }
        }
        Ok(grid)
    }
}

/// A voxel table of either topology.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelTable {
    /// Flat energy column of a box dump, in scan order.
    Box(Vec<f64>),
    /// Explicitly indexed cylinder rows.
    Cylinder(Vec<CylinderSample>),
}

impl VoxelTable {
    /// Shape this table belongs to.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Box(_) => Shape::Box,
            Self::Cylinder(_) => Shape::Cylinder,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Box(values) => values.len(),
            Self::Cylinder(rows) => rows.len(),
        }
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A reconstructed energy grid of either topology.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnergyGrid {
    /// Dense box grid.
    Box(BoxGrid),
    /// Per-layer cylinder matrices.
    Cylinder(CylinderGrid),
}

impl EnergyGrid {
    /// Shape of the grid.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Box(_) => Shape::Box,
            Self::Cylinder(_) => Shape::Cylinder,
        }
    }

    /// Minimum and maximum voxel value.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Box(grid) => grid.value_range(),
            Self::Cylinder(grid) => grid.value_range(),
        }
    }
}

/// Reconstruction dispatch over the supported mesh shapes.
#[derive(Clone, Debug)]
pub enum Reconstructor {
    /// Box mesh reconstruction.
    Box(BoxReconstructor),
    /// Cylinder mesh reconstruction.
    Cylinder(CylinderReconstructor),
}

impl Reconstructor {
    /// Default reconstructor for `shape`.
    #[must_use]
    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Box => Self::Box(BoxReconstructor::default()),
            Shape::Cylinder => Self::Cylinder(CylinderReconstructor::default()),
        }
    }

    /// Default reconstructor for the mesh declared in `config`.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the macro declares no mesh.
    pub fn for_config(config: &RunConfig) -> Result<Self> {
        config
            .mesh
            .map(|mesh| Self::for_shape(mesh.shape()))
            .ok_or_else(|| Error::ConfigError("macro declares no scoring mesh".into()))
    }

    /// Set the flattening convention (box only).
    #[must_use]
    pub fn with_convention(self, convention: FlatteningConvention) -> Self {
        match self {
            Self::Box(recon) => Self::Box(BoxReconstructor { convention, ..recon }),
            other @ Self::Cylinder(_) => other,
        }
    }

    /// Set the allocation ceiling.
    #[must_use]
    pub fn with_limits(self, limits: GridLimits) -> Self {
        match self {
            Self::Box(recon) => Self::Box(recon.with_limits(limits)),
            Self::Cylinder(recon) => Self::Cylinder(recon.with_limits(limits)),
        }
    }

    /// Shape handled by this reconstructor.
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Box(_) => Shape::Box,
            Self::Cylinder(_) => Shape::Cylinder,
        }
    }

    /// Name of the underlying reconstruction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Box(recon) => recon.name(),
            Self::Cylinder(recon) => recon.name(),
        }
    }

    /// Rebuilds a grid from `table`.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the table topology differs from the
    /// reconstructor's, otherwise whatever the variant reports.
    pub fn reconstruct(&self, table: &VoxelTable, config: &RunConfig) -> Result<EnergyGrid> {
        match (self, table) {
            (Self::Box(recon), VoxelTable::Box(values)) => {
                recon.reconstruct_grid(values, config).map(EnergyGrid::Box)
            }
            (Self::Cylinder(recon), VoxelTable::Cylinder(rows)) => {
                recon.reconstruct_grid(rows, config).map(EnergyGrid::Cylinder)
            }
            _ => Err(Error::ConfigError(format!(
                "{} table given to {} reconstruction",
                table.shape(),
                self.shape()
            ))),
        }
    }
}
