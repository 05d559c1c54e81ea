//! Detection efficiency from simulated and detected event counts.

use crate::spectrum::EnergySpectrum;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Detection efficiency of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EfficiencyEstimate {
    /// Number of simulated primaries (N).
    pub simulated_events: u64,
    /// Number of events that deposited energy in range (D).
    pub detected_events: u64,
    /// D / N.
    pub efficiency: f64,
}

impl EfficiencyEstimate {
    /// Computes the efficiency from the simulated count and a trimmed spectrum.
    ///
    /// # Errors
    /// Returns [`Error::DivisionByZero`] if `simulated_events` is zero.
    pub fn from_spectrum(simulated_events: u64, spectrum: &EnergySpectrum) -> Result<Self> {
        Self::new(simulated_events, spectrum.total())
    }

    /// Computes the efficiency from raw counts.
    ///
    /// # Errors
    /// Returns [`Error::DivisionByZero`] if `simulated_events` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(simulated_events: u64, detected_events: u64) -> Result<Self> {
        if simulated_events == 0 {
            return Err(Error::DivisionByZero {
                quantity: "detection efficiency",
            });
        }
        Ok(Self {
            simulated_events,
            detected_events,
            efficiency: detected_events as f64 / simulated_events as f64,
        })
    }

    /// Efficiency in percent.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.efficiency * 100.0
    }

    /// Statistical uncertainty in percent: `100 * eff * sqrt(1/D + 1/N)`.
    ///
    /// # Errors
    /// Returns [`Error::UndefinedUncertainty`] if nothing was detected.
    #[allow(clippy::cast_precision_loss)]
    pub fn uncertainty_percent(&self) -> Result<f64> {
        if self.detected_events == 0 {
            return Err(Error::UndefinedUncertainty {
                detected: self.detected_events,
            });
        }
        let d = self.detected_events as f64;
        let n = self.simulated_events as f64;
        Ok(100.0 * self.efficiency * (1.0 / d + 1.0 / n).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quarter_efficiency() {
        let spectrum = EnergySpectrum {
            counts: vec![0, 100, 100, 50],
        };
        let est = EfficiencyEstimate::from_spectrum(1000, &spectrum).unwrap();
        assert_eq!(est.detected_events, 250);
        assert_relative_eq!(est.percent(), 25.0, epsilon = 1e-12);

        let expected = 100.0 * 0.25 * (1.0_f64 / 250.0 + 1.0 / 1000.0).sqrt();
        assert_relative_eq!(est.uncertainty_percent().unwrap(), expected, epsilon = 1e-9);
        assert_relative_eq!(est.uncertainty_percent().unwrap(), 1.767_766_952_966_369, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_simulated_is_reported() {
        let err = EfficiencyEstimate::new(0, 5).unwrap_err();
        assert!(matches!(err, Error::DivisionByZero { .. }));
    }

    #[test]
    fn test_zero_detected_uncertainty_undefined() {
        let est = EfficiencyEstimate::new(1000, 0).unwrap();
        assert_eq!(est.efficiency, 0.0);
        assert!(matches!(
            est.uncertainty_percent(),
            Err(Error::UndefinedUncertainty { detected: 0 })
        ));
    }
}
