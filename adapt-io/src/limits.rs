//! Memory ceiling for dense grid reconstruction.

use crate::Result;
use adapt_algorithms::{GridLimits, DEFAULT_MAX_GRID_BYTES};
use adapt_core::Error as CoreError;
use sysinfo::System;

/// How the dense-grid memory ceiling is chosen.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryCeiling {
    /// Fraction of available system memory to allow (0.0 < fraction <= 1.0).
    pub memory_fraction: f64,
    /// Explicit ceiling override (bytes). If set, `memory_fraction` is ignored.
    pub max_bytes: Option<usize>,
}

impl Default for MemoryCeiling {
    fn default() -> Self {
        Self {
            memory_fraction: 0.5,
            max_bytes: None,
        }
    }
}

impl MemoryCeiling {
    /// Set the fraction of available system memory to allow.
    #[must_use]
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = fraction;
        self
    }

    /// Set an explicit ceiling in bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    /// Bytes a dense grid may occupy on this machine.
    ///
    /// An explicit `max_bytes` wins. Otherwise the ceiling is
    /// `memory_fraction` of the memory that is free right now. A host that
    /// reports no free memory falls back to [`DEFAULT_MAX_GRID_BYTES`].
    ///
    /// # Errors
    /// Returns a configuration error if `memory_fraction` is outside `(0, 1]`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn resolve_bytes(&self) -> Result<usize> {
        if let Some(bytes) = self.max_bytes {
            return Ok(bytes);
        }
        let fraction = self.memory_fraction;
        if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
            return Err(CoreError::ConfigError(format!(
                "grid memory share {fraction} is not a fraction of free memory in (0, 1]"
            ))
            .into());
        }
        let free = free_memory_bytes();
        if free == 0 {
            log::warn!(
                "free memory unknown, capping dense grids at {DEFAULT_MAX_GRID_BYTES} bytes"
            );
            return Ok(DEFAULT_MAX_GRID_BYTES);
        }
        let share = (free as f64 * fraction) as u64;
        Ok(usize::try_from(share).unwrap_or(usize::MAX))
    }

    /// Resolve into grid limits.
    ///
    /// # Errors
    /// See [`Self::resolve_bytes`].
    pub fn resolve(&self) -> Result<GridLimits> {
        let bytes = self.resolve_bytes()?;
        log::debug!("dense grid ceiling: {bytes} bytes");
        Ok(GridLimits::new(bytes))
    }
}

fn free_memory_bytes() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.available_memory()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_bytes() {
        let limits = MemoryCeiling::default().with_max_bytes(1024).resolve().unwrap();
        assert_eq!(limits.max_bytes, 1024);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(MemoryCeiling::default()
            .with_memory_fraction(0.0)
            .resolve_bytes()
            .is_err());
        assert!(MemoryCeiling::default()
            .with_memory_fraction(1.5)
            .resolve_bytes()
            .is_err());
    }

    #[test]
    fn test_fraction_of_free_memory() {
        let half = MemoryCeiling::default().resolve_bytes().unwrap();
        assert!(half > 0);
        assert!(MemoryCeiling::default()
            .with_memory_fraction(f64::NAN)
            .resolve_bytes()
            .is_err());
    }
}
