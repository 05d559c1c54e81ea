//! Cylindrical mesh reconstruction.
//!
//! Cylinder dumps carry explicit `(z, phi, r)` indices per row, so no scan
//! order is assumed. The sorted unique values of each index column define
//! the grid; every row is placed by exact lookup into those sets. One
//! `R x Phi` matrix is built per Z layer, in ascending Z order.

use crate::box_grid::value_range;
use crate::limits::GridLimits;
use crate::polar::PolarMesh;
use adapt_core::{Error, Result};
use ndarray::{s, Array2, Array3, Axis as NdAxis};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Innermost radial rings zeroed when a single layer is displayed.
pub const DEFAULT_MASKED_RINGS: usize = 2;

/// One row of a cylindrical dump.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CylinderSample {
    /// Axial index.
    pub z: f64,
    /// Azimuthal index.
    pub phi: f64,
    /// Radial index.
    pub r: f64,
    /// Scored energy.
    pub energy: f64,
}

impl CylinderSample {
    /// Creates a new sample.
    #[must_use]
    pub fn new(z: f64, phi: f64, r: f64, energy: f64) -> Self {
        Self { z, phi, r, energy }
    }
}

/// Sorted, de-duplicated values of one index column.
fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    sorted
}

/// Exact-match position of `value` in `axis_values`.
fn position(axis_values: &[f64], value: f64, axis: &'static str, row: usize) -> Result<usize> {
    axis_values
        .binary_search_by(|probe| probe.total_cmp(&value))
        .map_err(|_| Error::NoMatchingVoxel { axis, value, row })
}

/// Per-layer `R x Phi` energy matrices of a cylindrical mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CylinderGrid {
    /// Unique Z values, ascending; one per layer.
    pub z_values: Vec<f64>,
    /// Unique Phi values, ascending; one per matrix column.
    pub phi_values: Vec<f64>,
    /// Unique R values, ascending; one per matrix row.
    pub r_values: Vec<f64>,
    layers: Vec<Array2<f64>>,
}

impl CylinderGrid {
    /// Number of Z layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Matrix shape `(nr, nphi)` shared by all layers.
    #[must_use]
    pub fn layer_shape(&self) -> (usize, usize) {
        (self.r_values.len(), self.phi_values.len())
    }

    /// Layer `index` in ascending Z order.
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&Array2<f64>> {
        self.layers.get(index)
    }

    /// Iterates over the layers in ascending Z order.
    pub fn layers(&self) -> impl Iterator<Item = &Array2<f64>> {
        self.layers.iter()
    }

    /// Stacks the layers into one `(nr, nphi, nz)` array.
    #[must_use]
    pub fn stacked(&self) -> Array3<f64> {
        let (nr, nphi) = self.layer_shape();
        let mut out = Array3::<f64>::zeros((nr, nphi, self.layers.len()));
        for (k, layer) in self.layers.iter().enumerate() {
            out.index_axis_mut(NdAxis(2), k).assign(layer);
        }
        out
    }

    /// Copy of layer `index` for display, with the innermost
    /// `masked_rings` radial rows set to zero.
    ///
    /// # Errors
    /// Returns [`Error::LayerOutOfRange`] if `index` is not a layer.
    pub fn display_layer(&self, index: usize, masked_rings: usize) -> Result<Array2<f64>> {
        let mut layer = self
            .layers
            .get(index)
            .cloned()
            .ok_or(Error::LayerOutOfRange {
                index,
                layers: self.layers.len(),
            })?;
        let rings = masked_rings.min(layer.nrows());
        layer.slice_mut(s![..rings, ..]).fill(0.0);
        Ok(layer)
    }

    /// Polar-to-Cartesian mesh for rendering a layer.
    #[must_use]
    pub fn polar_mesh(&self) -> PolarMesh {
        let max_r = self.r_values.last().copied().unwrap_or(0.0);
        PolarMesh::new(max_r, self.r_values.len(), self.phi_values.len())
    }

    /// Minimum and maximum voxel value, or `None` for an empty grid.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        value_range(self.layers.iter().flat_map(|l| l.iter().copied()))
    }
}

/// Reconstructs per-layer matrices from cylinder dumps.
#[derive(Clone, Debug)]
pub struct CylinderReconstructor {
    /// Whether to build layers in parallel.
    pub parallel: bool,
    /// Allocation ceiling for the layer stack.
    pub limits: GridLimits,
}

impl Default for CylinderReconstructor {
    fn default() -> Self {
        Self {
            parallel: true,
            limits: GridLimits::default(),
        }
    }
}

impl CylinderReconstructor {
    /// Set whether to use parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the allocation ceiling.
    #[must_use]
    pub fn with_limits(mut self, limits: GridLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builds the layer stack. Grid dimensions come from the table itself.
    ///
    /// # Errors
    /// - [`Error::NoMatchingVoxel`] if a row's index has no exact match in
    ///   the unique-value sets.
    /// - [`Error::GridTooLarge`] if the unique values span more cells than
    ///   the ceiling allows.
    pub fn reconstruct(&self, samples: &[CylinderSample]) -> Result<CylinderGrid> {
        let z_values = unique_sorted(samples.iter().map(|s| s.z));
        let phi_values = unique_sorted(samples.iter().map(|s| s.phi));
        let r_values = unique_sorted(samples.iter().map(|s| s.r));

        // the stack size grows with the product of unique values, not the row count
        let cells = z_values
            .len()
            .checked_mul(r_values.len())
            .and_then(|n| n.checked_mul(phi_values.len()))
            .ok_or(Error::GridTooLarge {
                cells: usize::MAX,
                requested_bytes: usize::MAX,
                ceiling_bytes: self.limits.max_bytes,
            })?;
        self.limits.check(cells)?;

        let mut rows_by_layer: Vec<Vec<usize>> = vec![Vec::new(); z_values.len()];
        for (row, sample) in samples.iter().enumerate() {
            rows_by_layer[position(&z_values, sample.z, "z", row)?].push(row);
        }

        let shape = (r_values.len(), phi_values.len());
        let build = |rows: &Vec<usize>| -> Result<Array2<f64>> {
            let mut matrix = Array2::<f64>::zeros(shape);
            for &row in rows {
                let sample = &samples[row];
                let r = position(&r_values, sample.r, "r", row)?;
                let phi = position(&phi_values, sample.phi, "phi", row)?;
                matrix[[r, phi]] = sample.energy;
            }
            Ok(matrix)
        };
        let layers = if self.parallel {
            rows_by_layer.par_iter().map(build).collect::<Result<Vec<_>>>()?
        } else {
            rows_by_layer.iter().map(build).collect::<Result<Vec<_>>>()?
        };

        log::debug!(
            "reconstructed {} cylinder layers of {}x{} (R x Phi) from {} rows",
            layers.len(),
            shape.0,
            shape.1,
            samples.len()
        );
        Ok(CylinderGrid {
            z_values,
            phi_values,
            r_values,
            layers,
        })
    }
}
