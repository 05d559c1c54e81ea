//! Polar-to-Cartesian mesh for cylindrical layers.

use adapt_core::linspace;
use ndarray::Array2;
use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cartesian coordinates of a polar sampling grid.
///
/// `x` and `y` have shape `(ntheta, nr)`, so `x[[k, j]] = r[j] * cos(theta[k])`.
/// A layer matrix indexed `[r, phi]` lines up with the transposed mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolarMesh {
    /// Radii, `nr` samples from 0 to the outer radius.
    pub r: Vec<f64>,
    /// Angles, `ntheta` samples from 0 to 2π.
    pub theta: Vec<f64>,
    /// Cartesian X.
    pub x: Array2<f64>,
    /// Cartesian Y.
    pub y: Array2<f64>,
}

impl PolarMesh {
    /// Builds the mesh for `nr` radial and `ntheta` angular samples.
    #[must_use]
    pub fn new(max_radius: f64, nr: usize, ntheta: usize) -> Self {
        let r = linspace(0.0, max_radius, nr);
        let theta = linspace(0.0, TAU, ntheta);
        let x = Array2::from_shape_fn((ntheta, nr), |(k, j)| r[j] * theta[k].cos());
        let y = Array2::from_shape_fn((ntheta, nr), |(k, j)| r[j] * theta[k].sin());
        Self { r, theta, x, y }
    }

    /// Cartesian point of radial sample `ring` at angular sample `sector`.
    #[must_use]
    pub fn point(&self, ring: usize, sector: usize) -> Option<(f64, f64)> {
        Some((
            *self.x.get([sector, ring])?,
            *self.y.get([sector, ring])?,
        ))
    }
}
