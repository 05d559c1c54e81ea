//! Per-interaction hit records from the simulation ntuple.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of an interaction (detector frame, mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One energy-depositing interaction. Many records may share an event id.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRecord {
    /// Simulated event (history) the interaction belongs to.
    pub event_id: i64,
    /// Interaction position.
    pub position: Position,
    /// Deposited energy (MeV).
    pub energy: f64,
}

impl HitRecord {
    /// Creates a new hit record.
    #[inline]
    #[must_use]
    pub fn new(event_id: i64, x: f64, y: f64, z: f64, energy: f64) -> Self {
        Self {
            event_id,
            position: Position::new(x, y, z),
            energy,
        }
    }
}

/// Axis-aligned bounds of a set of hits, used for plot ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitBounds {
    /// Component-wise minimum.
    pub min: Position,
    /// Component-wise maximum.
    pub max: Position,
}

impl HitBounds {
    /// Computes the bounds of `hits`, or `None` if there are none.
    #[must_use]
    pub fn of(hits: &[HitRecord]) -> Option<Self> {
        let first = hits.first()?.position;
        let init = Self {
            min: first,
            max: first,
        };
        Some(hits.iter().fold(init, |acc, hit| {
            let p = hit.position;
            Self {
                min: Position::new(acc.min.x.min(p.x), acc.min.y.min(p.y), acc.min.z.min(p.z)),
                max: Position::new(acc.max.x.max(p.x), acc.max.y.max(p.y), acc.max.z.max(p.z)),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_record() {
        let hit = HitRecord::new(7, 1.0, -2.0, 3.5, 0.662);
        assert_eq!(hit.event_id, 7);
        assert!((hit.position.y + 2.0).abs() < f64::EPSILON);
        assert!((hit.energy - 0.662).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds() {
        assert!(HitBounds::of(&[]).is_none());
        let hits = [
            HitRecord::new(0, 1.0, 5.0, -1.0, 0.1),
            HitRecord::new(0, -3.0, 2.0, 4.0, 0.2),
            HitRecord::new(1, 0.0, 9.0, 0.0, 0.3),
        ];
        let bounds = HitBounds::of(&hits).unwrap();
        assert_eq!(bounds.min, Position::new(-3.0, 2.0, -1.0));
        assert_eq!(bounds.max, Position::new(1.0, 9.0, 4.0));
    }
}
