//! Memory ceiling for dense voxel grids.

use adapt_core::{Error, Result};
use std::mem::size_of;

/// Default ceiling for a dense grid allocation (4 GiB).
pub const DEFAULT_MAX_GRID_BYTES: usize = 4 << 30;

/// Upper bound on the memory a reconstructed grid may allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLimits {
    /// Maximum bytes for the cell storage.
    pub max_bytes: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_GRID_BYTES,
        }
    }
}

impl GridLimits {
    /// Creates limits with an explicit byte ceiling.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// No practical limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_bytes: usize::MAX,
        }
    }

    /// Checks that `cells` `f64` values fit under the ceiling.
    ///
    /// # Errors
    /// Returns [`Error::GridTooLarge`] if they do not (or the size overflows).
    pub fn check(&self, cells: usize) -> Result<usize> {
        let requested = cells.checked_mul(size_of::<f64>()).ok_or(Error::GridTooLarge {
            cells,
            requested_bytes: usize::MAX,
            ceiling_bytes: self.max_bytes,
        })?;
        if requested > self.max_bytes {
            return Err(Error::GridTooLarge {
                cells,
                requested_bytes: requested,
                ceiling_bytes: self.max_bytes,
            });
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check() {
        let limits = GridLimits::new(64);
        assert_eq!(limits.check(8).unwrap(), 64);
        assert!(matches!(limits.check(9), Err(Error::GridTooLarge { cells: 9, .. })));
        assert!(GridLimits::unbounded().check(usize::MAX).is_err());
    }
}
