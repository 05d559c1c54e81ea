//! Gaussian broadening of energy spectra.
//!
//! Simulates finite detector energy resolution by replacing every bin with
//! a Gaussian of the configured FWHM, evaluated on the same bin-center grid:
//!
//! `broadened[i] = sum_j counts[j] * exp(-((E_j - E_i) / sigma)^2)`
//!
//! The cost is `O(bins^2)`; evaluation points are independent and are
//! spread over the rayon pool when `parallel` is set.

use adapt_core::spectrum::{BinCenters, EnergySpectrum};
use adapt_core::{Error, Result};
use rayon::prelude::*;

/// Gaussian FWHM-to-sigma conversion factor.
pub const FWHM_TO_SIGMA: f64 = 2.355;

/// Default resolution (MeV FWHM) of the reference scintillator.
pub const DEFAULT_FWHM: f64 = 0.13;

/// Gaussian broadening configuration.
#[derive(Clone, Debug)]
pub struct GaussianBroadening {
    fwhm: f64,
    /// Whether to evaluate points in parallel.
    pub parallel: bool,
}

impl Default for GaussianBroadening {
    fn default() -> Self {
        Self {
            fwhm: DEFAULT_FWHM,
            parallel: true,
        }
    }
}

impl GaussianBroadening {
    /// Creates a broadening with the given FWHM (energy units).
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] unless `fwhm` is finite and positive.
    pub fn new(fwhm: f64) -> Result<Self> {
        if !(fwhm.is_finite() && fwhm > 0.0) {
            return Err(Error::ConfigError(format!(
                "FWHM must be finite and positive, got {fwhm}"
            )));
        }
        Ok(Self {
            fwhm,
            ..Self::default()
        })
    }

    /// Set whether to use parallel evaluation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Configured FWHM.
    #[must_use]
    pub fn fwhm(&self) -> f64 {
        self.fwhm
    }

    /// Gaussian sigma derived from the FWHM.
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.fwhm / FWHM_TO_SIGMA
    }

    /// Broadens `counts` sampled at `energies`, evaluating on the same grid.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the slices differ in length.
    pub fn broaden(&self, counts: &[f64], energies: &[f64]) -> Result<Vec<f64>> {
        if counts.len() != energies.len() {
            return Err(Error::ConfigError(format!(
                "{} counts for {} energies",
                counts.len(),
                energies.len()
            )));
        }
        let sigma = self.sigma();
        let point = |ei: f64| -> f64 {
            counts
                .iter()
                .zip(energies)
                .map(|(&c, &ej)| c * (-((ej - ei) / sigma).powi(2)).exp())
                .sum()
        };
        let broadened = if self.parallel {
            energies.par_iter().map(|&ei| point(ei)).collect()
        } else {
            energies.iter().map(|&ei| point(ei)).collect()
        };
        Ok(broadened)
    }

    /// Broadens a trimmed spectrum on its bin centers.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if spectrum and centers differ in length.
    pub fn broaden_spectrum(
        &self,
        spectrum: &EnergySpectrum,
        centers: &BinCenters,
    ) -> Result<Vec<f64>> {
        log::debug!(
            "broadening {} bins with FWHM {} (sigma {:.6})",
            spectrum.len(),
            self.fwhm,
            self.sigma()
        );
        self.broaden(&spectrum.as_f64(), centers.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapt_core::HistogramMetadata;
    use approx::assert_relative_eq;

    fn grid(n: usize) -> Vec<f64> {
        HistogramMetadata::new(n, 0.0, 1.0)
            .unwrap()
            .bin_centers()
            .0
    }

    #[test]
    fn test_invalid_fwhm() {
        assert!(GaussianBroadening::new(0.0).is_err());
        assert!(GaussianBroadening::new(-0.1).is_err());
        assert!(GaussianBroadening::new(f64::NAN).is_err());
        assert_relative_eq!(GaussianBroadening::new(0.2355).unwrap().sigma(), 0.1);
    }

    #[test]
    fn test_zero_spectrum_stays_zero() {
        let energies = grid(50);
        let out = GaussianBroadening::default()
            .broaden(&vec![0.0; 50], &energies)
            .unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_input() {
        let out = GaussianBroadening::default().broaden(&[], &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_linear_in_counts() {
        let energies = grid(64);
        let counts: Vec<f64> = (0..64).map(|i| f64::from((i * 7) % 13)).collect();
        let scaled: Vec<f64> = counts.iter().map(|c| 2.5 * c).collect();
        let b = GaussianBroadening::default();
        let base = b.broaden(&counts, &energies).unwrap();
        let out = b.broaden(&scaled, &energies).unwrap();
        for (o, e) in out.iter().zip(&base) {
            assert_relative_eq!(*o, 2.5 * e, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_single_line_shape() {
        let energies = grid(101);
        let mut counts = vec![0.0; 101];
        counts[50] = 10.0;
        let b = GaussianBroadening::new(0.1).unwrap();
        let out = b.broaden(&counts, &energies).unwrap();
        assert_relative_eq!(out[50], 10.0);
        let sigma = b.sigma();
        let d = energies[60] - energies[50];
        assert_relative_eq!(out[60], 10.0 * (-(d / sigma).powi(2)).exp(), max_relative = 1e-12);
        assert_relative_eq!(out[40], out[60], max_relative = 1e-9);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let energies = grid(200);
        let counts: Vec<f64> = (0..200).map(|i| f64::from(i % 17)).collect();
        let par = GaussianBroadening::default().broaden(&counts, &energies).unwrap();
        let seq = GaussianBroadening::default()
            .with_parallel(false)
            .broaden(&counts, &energies)
            .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(GaussianBroadening::default().broaden(&[1.0], &[]).is_err());
    }
}
