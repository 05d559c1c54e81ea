//! Scan-order conventions for flat voxel tables.
//!
//! A box mesh dump enumerates voxels in a fixed nesting order. The default
//! convention is X slowest, then Y, then Z fastest, so the entry for
//! `(x, y, z)` sits at `x * ny * nz + y * nz + z`: for a fixed `(y, z)` the
//! X column starts at offset `y * nz + z` with stride `ny * nz`.
//!
//! The dump frame is mirrored in Y relative to the physical detector view,
//! so the default convention also inverts rows on reconstruction.

use adapt_core::VoxelDims;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mesh axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    fn extent(self, dims: VoxelDims) -> usize {
        match self {
            Self::X => dims.nx,
            Self::Y => dims.ny,
            Self::Z => dims.nz,
        }
    }

    fn pick(self, x: usize, y: usize, z: usize) -> usize {
        match self {
            Self::X => x,
            Self::Y => y,
            Self::Z => z,
        }
    }
}

/// How a flat box table maps onto `(x, y, z)` and onto image rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatteningConvention {
    /// Axes from slowest- to fastest-varying in the table.
    pub scan_order: [Axis; 3],
    /// Write scan row `y` to image row `ny - 1 - y`.
    pub invert_rows: bool,
}

impl Default for FlatteningConvention {
    fn default() -> Self {
        Self {
            scan_order: [Axis::X, Axis::Y, Axis::Z],
            invert_rows: true,
        }
    }
}

impl FlatteningConvention {
    /// Creates a convention with the given scan order and no row inversion.
    #[must_use]
    pub fn new(scan_order: [Axis; 3]) -> Self {
        Self {
            scan_order,
            invert_rows: false,
        }
    }

    /// Set whether rows are inverted.
    #[must_use]
    pub fn with_invert_rows(mut self, invert: bool) -> Self {
        self.invert_rows = invert;
        self
    }

    /// Returns true if every axis appears exactly once in the scan order.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [Axis::X, Axis::Y, Axis::Z]
            .iter()
            .all(|axis| self.scan_order.iter().filter(|a| *a == axis).count() == 1)
    }

    /// Table stride of each axis `(x, y, z)`.
    #[must_use]
    pub fn strides(&self, dims: VoxelDims) -> (usize, usize, usize) {
        let [_, mid, fast] = self.scan_order;
        let stride = |axis: Axis| {
            if axis == fast {
                1
            } else if axis == mid {
                fast.extent(dims)
            } else {
                fast.extent(dims) * mid.extent(dims)
            }
        };
        (stride(Axis::X), stride(Axis::Y), stride(Axis::Z))
    }

    /// Table offset of voxel `(x, y, z)`.
    #[must_use]
    pub fn flat_index(&self, dims: VoxelDims, x: usize, y: usize, z: usize) -> usize {
        let [slow, mid, fast] = self.scan_order;
        let fast_n = fast.extent(dims);
        let mid_n = mid.extent(dims);
        (slow.pick(x, y, z) * mid_n + mid.pick(x, y, z)) * fast_n + fast.pick(x, y, z)
    }

    /// Offset of the first entry of the X column at `(y, z)`.
    #[must_use]
    pub fn column_offset(&self, dims: VoxelDims, y: usize, z: usize) -> usize {
        self.flat_index(dims, 0, y, z)
    }

    /// Image row that scan row `y` is written to.
    #[must_use]
    pub fn image_row(&self, dims: VoxelDims, y: usize) -> usize {
        if self.invert_rows {
            dims.ny - 1 - y
        } else {
            y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_dump_order() {
        let dims = VoxelDims::new(4, 3, 5);
        let conv = FlatteningConvention::default();
        let mut expected = 0;
        for x in 0..4 {
            for y in 0..3 {
                for z in 0..5 {
                    assert_eq!(conv.flat_index(dims, x, y, z), expected);
                    expected += 1;
                }
            }
        }
        assert_eq!(conv.strides(dims), (15, 5, 1));
        assert_eq!(conv.column_offset(dims, 2, 3), 2 * 5 + 3);
    }

    #[test]
    fn test_alternate_order() {
        let dims = VoxelDims::new(4, 3, 5);
        let conv = FlatteningConvention::new([Axis::Z, Axis::Y, Axis::X]);
        assert_eq!(conv.flat_index(dims, 1, 0, 0), 1);
        assert_eq!(conv.flat_index(dims, 0, 1, 0), 4);
        assert_eq!(conv.flat_index(dims, 0, 0, 1), 12);
        assert_eq!(conv.strides(dims), (1, 4, 12));
        assert_eq!(conv.image_row(dims, 0), 0);
    }

    #[test]
    fn test_row_inversion() {
        let dims = VoxelDims::new(2, 3, 1);
        let conv = FlatteningConvention::default();
        assert_eq!(conv.image_row(dims, 0), 2);
        assert_eq!(conv.image_row(dims, 2), 0);
    }

    #[test]
    fn test_validity() {
        assert!(FlatteningConvention::default().is_valid());
        assert!(!FlatteningConvention::new([Axis::X, Axis::X, Axis::Z]).is_valid());
    }
}
