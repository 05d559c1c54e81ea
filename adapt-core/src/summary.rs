//! Human-readable results block.

use crate::efficiency::EfficiencyEstimate;
use crate::events::EventStatistics;
use crate::Result;
use std::fmt;

/// Results of one reduction, ready for display.
///
/// Each metric carries its own outcome, so a degenerate efficiency or
/// variance is shown as unavailable while the other lines still print.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    /// Number of simulated primaries.
    pub simulated_events: u64,
    /// Number of detected events.
    pub detected_events: u64,
    /// Efficiency of the run, or why it is undefined.
    pub efficiency: Result<EfficiencyEstimate>,
    /// History-by-history statistics, when a hit table was analysed.
    pub events: Option<EventStatistics>,
}

impl AnalysisSummary {
    /// Creates a summary from the simulated and detected counts.
    #[must_use]
    pub fn new(simulated_events: u64, detected_events: u64) -> Self {
        Self {
            simulated_events,
            detected_events,
            efficiency: EfficiencyEstimate::new(simulated_events, detected_events),
            events: None,
        }
    }

    /// Creates a summary from an existing estimate.
    #[must_use]
    pub fn from_estimate(efficiency: EfficiencyEstimate) -> Self {
        Self {
            simulated_events: efficiency.simulated_events,
            detected_events: efficiency.detected_events,
            efficiency: Ok(efficiency),
            events: None,
        }
    }

    /// Attaches event statistics.
    #[must_use]
    pub fn with_events(mut self, events: EventStatistics) -> Self {
        self.events = Some(events);
        self
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Events simulated:        {}", self.simulated_events)?;
        writeln!(f, "  Events in the detector:  {}", self.detected_events)?;
        match &self.efficiency {
            Ok(eff) => match eff.uncertainty_percent() {
                Ok(sigma) => writeln!(
                    f,
                    "  Detector efficiency:     {:.4} %  ±  {:.4} %",
                    eff.percent(),
                    sigma
                )?,
                Err(err) => writeln!(
                    f,
                    "  Detector efficiency:     {:.4} %  ±  undefined ({err})",
                    eff.percent()
                )?,
            },
            Err(err) => writeln!(f, "  Detector efficiency:     undefined ({err})")?,
        }
        if let Some(events) = &self.events {
            writeln!(f, "  Events with deposits:    {}", events.unique_events)?;
            match events.mean_energy {
                Some(mean) => writeln!(f, "  Mean energy per event:   {mean:.4} MeV")?,
                None => writeln!(f, "  Mean energy per event:   unavailable (no deposits)")?,
            }
            match &events.sigma {
                Ok(sigma) => writeln!(f, "  Energy sigma (HbH):      {sigma:.4} MeV")?,
                Err(err) => writeln!(f, "  Energy sigma (HbH):      unavailable ({err})")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTotals;
    use crate::hit::HitRecord;

    #[test]
    fn test_four_decimal_formatting() {
        let text = AnalysisSummary::new(1000, 250).to_string();
        assert!(text.contains("Events simulated:        1000"));
        assert!(text.contains("Events in the detector:  250"));
        assert!(text.contains("25.0000 %  ±  1.7678 %"));
    }

    #[test]
    fn test_undefined_uncertainty_is_not_nan() {
        let eff = EfficiencyEstimate::new(1000, 0).unwrap();
        let text = AnalysisSummary::from_estimate(eff).to_string();
        assert!(text.contains("0.0000 %  ±  undefined"));
        assert!(!text.contains("NaN"));
        assert!(!text.contains("inf"));
    }

    #[test]
    fn test_zero_simulated_events() {
        let summary = AnalysisSummary::new(0, 0);
        assert!(summary.efficiency.is_err());
        let text = summary.to_string();
        assert!(text.contains("Events simulated:        0"));
        assert!(text.contains("Detector efficiency:     undefined (division by zero"));
    }

    #[test]
    fn test_event_block() {
        let hits = [
            HitRecord::new(0, 0.0, 0.0, 0.0, 1.0),
            HitRecord::new(1, 0.0, 0.0, 0.0, 3.0),
        ];
        let stats = EventTotals::aggregate(&hits).statistics(1);
        let text = AnalysisSummary::new(10, 1).with_events(stats).to_string();
        assert!(text.contains("Events with deposits:    2"));
        assert!(text.contains("Mean energy per event:   2.0000 MeV"));
        assert!(text.contains("Energy sigma (HbH):      unavailable"));
    }
}
