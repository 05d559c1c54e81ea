//! Box mesh reconstruction.
//!
//! Reshapes the flat energy column of a box dump into a dense,
//! image-oriented grid `[row][col][layer]`, where rows are Y (inverted by
//! the default convention), columns are X and layers are Z.

use crate::flattening::FlatteningConvention;
use crate::limits::GridLimits;
use adapt_core::{Error, Result, VoxelDims};
use ndarray::{Array3, ArrayView2, Axis as NdAxis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense energy grid reconstructed from a box mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoxGrid {
    dims: VoxelDims,
    data: Array3<f64>,
}

impl BoxGrid {
    /// Mesh dimensions.
    #[must_use]
    pub fn dims(&self) -> VoxelDims {
        self.dims
    }

    /// Grid storage, shape `(ny, nx, nz)`.
    #[must_use]
    pub fn as_array(&self) -> &Array3<f64> {
        &self.data
    }

    /// Consumes the grid, returning its storage.
    #[must_use]
    pub fn into_array(self) -> Array3<f64> {
        self.data
    }

    /// Value at image position `(row, col, layer)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize, layer: usize) -> Option<f64> {
        self.data.get([row, col, layer]).copied()
    }

    /// The `(row, col)` image of layer `z`.
    ///
    /// # Errors
    /// Returns [`Error::LayerOutOfRange`] if `z >= nz`.
    pub fn layer(&self, z: usize) -> Result<ArrayView2<'_, f64>> {
        if z >= self.dims.nz {
            return Err(Error::LayerOutOfRange {
                index: z,
                layers: self.dims.nz,
            });
        }
        Ok(self.data.index_axis(NdAxis(2), z))
    }

    /// Minimum and maximum voxel value, or `None` for an empty grid.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        value_range(self.data.iter().copied())
    }

    /// Sum over all voxels.
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.data.sum()
    }
}

pub(crate) fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Reconstructs dense grids from box dumps.
#[derive(Clone, Debug, Default)]
pub struct BoxReconstructor {
    /// Scan order of the dump.
    pub convention: FlatteningConvention,
    /// Allocation ceiling.
    pub limits: GridLimits,
}

impl BoxReconstructor {
    /// Create with a custom flattening convention.
    #[must_use]
    pub fn new(convention: FlatteningConvention) -> Self {
        Self {
            convention,
            limits: GridLimits::default(),
        }
    }

    /// Set the allocation ceiling.
    #[must_use]
    pub fn with_limits(mut self, limits: GridLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rebuilds the grid from the flat energy column.
    ///
    /// # Errors
    /// - [`Error::ConfigError`] for an invalid convention or a zero dimension.
    /// - [`Error::VoxelCountMismatch`] if `values.len() != nx * ny * nz`.
    /// - [`Error::GridTooLarge`] if the grid exceeds the ceiling.
    pub fn reconstruct(&self, values: &[f64], dims: VoxelDims) -> Result<BoxGrid> {
        if !self.convention.is_valid() {
            return Err(Error::ConfigError(format!(
                "scan order {:?} must name each axis once",
                self.convention.scan_order
            )));
        }
        if dims.nx == 0 || dims.ny == 0 || dims.nz == 0 {
            return Err(Error::ConfigError(format!(
                "box mesh has a zero dimension: {}x{}x{}",
                dims.nx, dims.ny, dims.nz
            )));
        }
        let expected = dims.total().ok_or(Error::GridTooLarge {
            cells: usize::MAX,
            requested_bytes: usize::MAX,
            ceiling_bytes: self.limits.max_bytes,
        })?;
        if values.len() != expected {
            return Err(Error::VoxelCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        self.limits.check(expected)?;

        let mut data = Array3::<f64>::zeros((dims.ny, dims.nx, dims.nz));
        for z in 0..dims.nz {
            for y in 0..dims.ny {
                let row = self.convention.image_row(dims, y);
                for x in 0..dims.nx {
                    data[[row, x, z]] = values[self.convention.flat_index(dims, x, y, z)];
                }
            }
        }
        log::debug!(
            "reconstructed box grid {}x{}x{} from {} voxels",
            dims.nx,
            dims.ny,
            dims.nz,
            expected
        );
        Ok(BoxGrid { dims, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flattening::Axis;

    /// Encodes `(x, y, z)` as `100x + 10y + z` in dump order.
    fn encoded_table(dims: VoxelDims) -> Vec<f64> {
        let mut table = Vec::new();
        for x in 0..dims.nx {
            for y in 0..dims.ny {
                for z in 0..dims.nz {
                    table.push((100 * x + 10 * y + z) as f64);
                }
            }
        }
        table
    }

    #[test]
    fn test_two_cubed_round_trip_with_row_inversion() {
        let dims = VoxelDims::new(2, 2, 2);
        let grid = BoxReconstructor::default()
            .reconstruct(&encoded_table(dims), dims)
            .unwrap();
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    let expected = (100 * x + 10 * y + z) as f64;
                    // scan row y lands on image row 1 - y
                    assert_eq!(grid.get(1 - y, x, z), Some(expected));
                }
            }
        }
        // explicit: bottom scan row (y = 0) is the top image row
        assert_eq!(grid.get(1, 0, 0), Some(0.0));
        assert_eq!(grid.get(0, 0, 0), Some(10.0));
        assert_eq!(grid.get(0, 1, 1), Some(111.0));
    }

    #[test]
    fn test_non_square_mesh() {
        let dims = VoxelDims::new(3, 2, 4);
        let grid = BoxReconstructor::default()
            .reconstruct(&encoded_table(dims), dims)
            .unwrap();
        assert_eq!(grid.as_array().shape(), &[2, 3, 4]);
        assert_eq!(grid.get(0, 2, 3), Some(213.0));
        assert_eq!(grid.get(1, 2, 3), Some(203.0));
    }

    #[test]
    fn test_without_inversion() {
        let dims = VoxelDims::new(2, 2, 1);
        let recon = BoxReconstructor::new(FlatteningConvention::default().with_invert_rows(false));
        let grid = recon.reconstruct(&encoded_table(dims), dims).unwrap();
        assert_eq!(grid.get(0, 1, 0), Some(100.0));
        assert_eq!(grid.get(1, 1, 0), Some(110.0));
    }

    #[test]
    fn test_alternate_scan_order() {
        let dims = VoxelDims::new(2, 2, 2);
        // dump with Z slowest, X fastest
        let mut table = Vec::new();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    table.push((100 * x + 10 * y + z) as f64);
                }
            }
        }
        let recon = BoxReconstructor::new(
            FlatteningConvention::new([Axis::Z, Axis::Y, Axis::X]).with_invert_rows(true),
        );
        let grid = recon.reconstruct(&table, dims).unwrap();
        assert_eq!(grid.get(0, 1, 1), Some(111.0));
        assert_eq!(grid.get(1, 1, 0), Some(100.0));
    }

    #[test]
    fn test_count_mismatch() {
        let dims = VoxelDims::new(2, 2, 2);
        let err = BoxReconstructor::default()
            .reconstruct(&[0.0; 7], dims)
            .unwrap_err();
        assert_eq!(
            err,
            Error::VoxelCountMismatch {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_memory_ceiling() {
        let dims = VoxelDims::new(2, 2, 2);
        let err = BoxReconstructor::default()
            .with_limits(GridLimits::new(32))
            .reconstruct(&[0.0; 8], dims)
            .unwrap_err();
        assert!(matches!(err, Error::GridTooLarge { cells: 8, .. }));
    }

    #[test]
    fn test_layer_and_range() {
        let dims = VoxelDims::new(2, 2, 2);
        let grid = BoxReconstructor::default()
            .reconstruct(&encoded_table(dims), dims)
            .unwrap();
        assert_eq!(grid.value_range(), Some((0.0, 111.0)));
        assert_eq!(grid.layer(1).unwrap()[[0, 0]], 11.0);
        assert!(grid.layer(2).is_err());
        assert!((grid.total_energy() - 444.0).abs() < 1e-12);
    }
}
