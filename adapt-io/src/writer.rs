//! CSV writers for reduction results.

use crate::Result;
use adapt_algorithms::{BoxGrid, CylinderGrid};
use adapt_core::{BinCenters, Error as CoreError, EnergySpectrum, EventTotals};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writer for reduction results.
///
/// Writes spectra, event totals and reconstructed grids as CSV with a
/// header row.
pub struct ResultsWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl ResultsWriter<File> {
    /// Creates a writer for a new file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> ResultsWriter<W> {
    /// Wraps an existing sink.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes `energy,counts,error` rows, plus `broadened` when given.
    ///
    /// # Errors
    /// Returns an error if the lengths differ or the write fails.
    pub fn write_spectrum(
        &mut self,
        spectrum: &EnergySpectrum,
        centers: &BinCenters,
        broadened: Option<&[f64]>,
    ) -> Result<()> {
        if centers.len() != spectrum.len() || broadened.is_some_and(|b| b.len() != spectrum.len()) {
            return Err(CoreError::ConfigError(format!(
                "spectrum has {} bins, centers {}, broadened {:?}",
                spectrum.len(),
                centers.len(),
                broadened.map(<[f64]>::len)
            ))
            .into());
        }
        let errors = spectrum.bin_errors();
        match broadened {
            Some(broadened) => {
                self.writer
                    .write_record(["energy", "counts", "error", "broadened"])?;
                for (i, &count) in spectrum.counts.iter().enumerate() {
                    self.writer
                        .serialize((centers.0[i], count, errors[i], broadened[i]))?;
                }
            }
            None => {
                self.writer.write_record(["energy", "counts", "error"])?;
                for (i, &count) in spectrum.counts.iter().enumerate() {
                    self.writer.serialize((centers.0[i], count, errors[i]))?;
                }
            }
        }
        self.flush()
    }

    /// Writes `event_id,energy` rows in ascending event order.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_event_totals(&mut self, totals: &EventTotals) -> Result<()> {
        self.writer.write_record(["event_id", "energy"])?;
        for event in totals.iter() {
            self.writer.serialize((event.event_id, event.energy))?;
        }
        self.flush()
    }

    /// Writes every voxel as `row,col,layer,energy`.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_box_grid(&mut self, grid: &BoxGrid) -> Result<()> {
        self.writer.write_record(["row", "col", "layer", "energy"])?;
        for ((row, col, layer), &energy) in grid.as_array().indexed_iter() {
            self.writer.serialize((row, col, layer, energy))?;
        }
        self.flush()
    }

    /// Writes one display layer as `r_index,phi_index,x,y,energy`, with
    /// Cartesian coordinates from the polar mesh.
    ///
    /// # Errors
    /// Returns [`CoreError::LayerOutOfRange`] for a bad index, or an error
    /// if the write fails.
    pub fn write_cylinder_layer(
        &mut self,
        grid: &CylinderGrid,
        layer: usize,
        masked_rings: usize,
    ) -> Result<()> {
        let values = grid.display_layer(layer, masked_rings)?;
        let mesh = grid.polar_mesh();
        self.writer
            .write_record(["r_index", "phi_index", "x", "y", "energy"])?;
        for ((ring, sector), &energy) in values.indexed_iter() {
            let (x, y) = mesh.point(ring, sector).unwrap_or((f64::NAN, f64::NAN));
            self.writer.serialize((ring, sector, x, y, energy))?;
        }
        self.flush()
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
