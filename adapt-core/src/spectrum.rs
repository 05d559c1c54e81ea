//! Energy histogram types and the spectrum builder.
//!
//! A histogram export carries `bin_count + 2` raw slots: underflow, the
//! `bin_count` usable bins, overflow. [`EnergySpectrum::from_raw`] trims the
//! flow slots and zeroes the first usable bin, which only collects events
//! that never interacted in the detector.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Returns `num` evenly spaced samples over `[start, stop]`, endpoints included.
///
/// A single sample yields `[start]`; zero samples yield an empty vector.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Axis description of a fixed-binning energy histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramMetadata {
    /// Number of usable bins (excluding underflow/overflow).
    pub bin_count: usize,
    /// Lower edge of the first bin.
    pub energy_min: f64,
    /// Upper edge of the last bin.
    pub energy_max: f64,
}

impl HistogramMetadata {
    /// Creates validated histogram metadata.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMetadata`] if `bin_count` is zero, a bound is
    /// not finite, or `energy_min >= energy_max`.
    pub fn new(bin_count: usize, energy_min: f64, energy_max: f64) -> Result<Self> {
        if bin_count == 0 {
            return Err(Error::InvalidMetadata("bin count must be at least 1".into()));
        }
        if !energy_min.is_finite() || !energy_max.is_finite() {
            return Err(Error::InvalidMetadata(format!(
                "non-finite energy range [{energy_min}, {energy_max}]"
            )));
        }
        if energy_min >= energy_max {
            return Err(Error::InvalidMetadata(format!(
                "energy_min {energy_min} must be below energy_max {energy_max}"
            )));
        }
        Ok(Self {
            bin_count,
            energy_min,
            energy_max,
        })
    }

    /// Width of a single bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_width(&self) -> f64 {
        (self.energy_max - self.energy_min) / self.bin_count as f64
    }

    /// The `bin_count + 1` equally spaced bin edges.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_edges(&self) -> Vec<f64> {
        let width = self.energy_max - self.energy_min;
        (0..=self.bin_count)
            .map(|i| self.energy_min + i as f64 * width / self.bin_count as f64)
            .collect()
    }

    /// Midpoints of consecutive bin edges.
    #[must_use]
    pub fn bin_centers(&self) -> BinCenters {
        self.centers_for(self.bin_count)
    }

    /// Centers of the first `count` bins on this axis.
    ///
    /// Counts above `bin_count` continue past `energy_max` at the same bin
    /// width, so an export with extra slots still gets one center per bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centers_for(&self, count: usize) -> BinCenters {
        let width = self.energy_max - self.energy_min;
        let edge = |i: usize| self.energy_min + i as f64 * width / self.bin_count as f64;
        BinCenters((0..count).map(|i| (edge(i) + edge(i + 1)) / 2.0).collect())
    }

    /// Number of raw slots an export of this histogram carries.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.bin_count + 2
    }
}

/// Bin-center energies, strictly increasing, one per usable bin.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinCenters(pub Vec<f64>);

impl BinCenters {
    /// Returns the centers as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of centers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no centers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw per-slot counts as exported, including underflow and overflow.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawSpectrum(pub Vec<u64>);

impl RawSpectrum {
    /// Number of raw slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no slots were read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Usable bin counts after trimming.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnergySpectrum {
    /// Counts per usable bin.
    pub counts: Vec<u64>,
}

impl EnergySpectrum {
    /// Drops the underflow and overflow slots and zeroes the first usable bin.
    ///
    /// Fewer than two raw slots produce an empty spectrum.
    #[must_use]
    pub fn from_raw(raw: &RawSpectrum) -> Self {
        let mut counts = if raw.0.len() < 2 {
            Vec::new()
        } else {
            raw.0[1..raw.0.len() - 1].to_vec()
        };
        if let Some(first) = counts.first_mut() {
            *first = 0;
        }
        Self { counts }
    }

    /// Number of usable bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if the spectrum has no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum over all bins: the number of detected events.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0, |acc, &c| acc.saturating_add(c))
    }

    /// Counts as floating-point values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| c as f64).collect()
    }

    /// Poisson error per bin, `sqrt(count)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_errors(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| (c as f64).sqrt()).collect()
    }

    /// Index and count of the most populated bin.
    #[must_use]
    pub fn peak(&self) -> Option<(usize, u64)> {
        self.counts
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(i, c)| (c, std::cmp::Reverse(i)))
    }
}

/// A parsed histogram export: axis metadata plus raw slot counts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramExport {
    /// Axis description from the header.
    pub metadata: HistogramMetadata,
    /// Raw counts including underflow and overflow.
    pub raw: RawSpectrum,
}

impl HistogramExport {
    /// Returns true if the raw slot count matches `bin_count + 2`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.raw.len() == self.metadata.raw_len()
    }

    /// Builds the trimmed spectrum and one bin center per trimmed bin.
    ///
    /// Both always have the same length, even when the export carries more
    /// or fewer slots than the header declares.
    #[must_use]
    pub fn build(&self) -> (EnergySpectrum, BinCenters) {
        let spectrum = EnergySpectrum::from_raw(&self.raw);
        let centers = self.metadata.centers_for(spectrum.len());
        (spectrum, centers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_metadata_validation() {
        assert!(HistogramMetadata::new(0, 0.0, 1.0).is_err());
        assert!(HistogramMetadata::new(10, 1.0, 1.0).is_err());
        assert!(HistogramMetadata::new(10, 2.0, 1.0).is_err());
        assert!(HistogramMetadata::new(10, f64::NAN, 1.0).is_err());
        assert!(HistogramMetadata::new(10, 0.0, 1.0).is_ok());
    }

    #[test]
    fn test_bin_centers_length_and_order() {
        for bins in [1, 2, 7, 100, 10_000] {
            let meta = HistogramMetadata::new(bins, -0.5, 10.0).unwrap();
            let centers = meta.bin_centers();
            assert_eq!(centers.len(), bins);
            assert!(centers.as_slice().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_bin_centers_values() {
        let meta = HistogramMetadata::new(4, 0.0, 1.0).unwrap();
        let centers = meta.bin_centers();
        let expected = [0.125, 0.375, 0.625, 0.875];
        for (c, e) in centers.as_slice().iter().zip(expected) {
            assert_relative_eq!(*c, e, epsilon = 1e-12);
        }
        assert_relative_eq!(meta.bin_width(), 0.25);
        assert_eq!(meta.bin_edges().len(), 5);
    }

    #[test]
    fn test_trim_forces_first_bin_to_zero() {
        let raw = RawSpectrum(vec![99, 42, 5, 6, 7, 13]);
        let spectrum = EnergySpectrum::from_raw(&raw);
        assert_eq!(spectrum.counts, vec![0, 5, 6, 7]);
        assert_eq!(spectrum.total(), 18);
    }

    #[test]
    fn test_trim_short_inputs() {
        assert!(EnergySpectrum::from_raw(&RawSpectrum(vec![])).is_empty());
        assert!(EnergySpectrum::from_raw(&RawSpectrum(vec![3])).is_empty());
        assert!(EnergySpectrum::from_raw(&RawSpectrum(vec![3, 4])).is_empty());
        assert_eq!(
            EnergySpectrum::from_raw(&RawSpectrum(vec![3, 4, 5])).counts,
            vec![0]
        );
    }

    #[test]
    fn test_bin_errors_and_peak() {
        let spectrum = EnergySpectrum {
            counts: vec![0, 4, 9, 9, 1],
        };
        assert_eq!(spectrum.bin_errors(), vec![0.0, 2.0, 3.0, 3.0, 1.0]);
        assert_eq!(spectrum.peak(), Some((2, 9)));
        assert_eq!(EnergySpectrum::default().peak(), None);
    }

    #[test]
    fn test_linspace() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        let samples = linspace(0.0, std::f64::consts::TAU, 360);
        assert_relative_eq!(*samples.last().unwrap(), std::f64::consts::TAU);
    }

    #[test]
    fn test_export_build() {
        let export = HistogramExport {
            metadata: HistogramMetadata::new(3, 0.0, 3.0).unwrap(),
            raw: RawSpectrum(vec![1, 2, 3, 4, 5]),
        };
        assert!(export.is_complete());
        let (spectrum, centers) = export.build();
        assert_eq!(spectrum.len(), centers.len());
        assert_eq!(spectrum.counts, vec![0, 3, 4]);
    }

    #[test]
    fn test_build_aligns_centers_with_spectrum() {
        let metadata = HistogramMetadata::new(2, 0.0, 1.0).unwrap();
        let header_only = HistogramExport {
            metadata,
            raw: RawSpectrum(vec![]),
        };
        let (spectrum, centers) = header_only.build();
        assert!(spectrum.is_empty());
        assert!(centers.is_empty());

        let long = HistogramExport {
            metadata,
            raw: RawSpectrum(vec![1, 2, 3, 4, 5, 6]),
        };
        assert!(!long.is_complete());
        let (spectrum, centers) = long.build();
        assert_eq!(spectrum.len(), 4);
        assert_eq!(centers.len(), 4);
        let expected = [0.25, 0.75, 1.25, 1.75];
        for (c, e) in centers.as_slice().iter().zip(expected) {
            assert_relative_eq!(*c, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_total_saturates() {
        let spectrum = EnergySpectrum {
            counts: vec![u64::MAX, 5],
        };
        assert_eq!(spectrum.total(), u64::MAX);
    }
}
