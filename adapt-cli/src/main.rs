//! adapt CLI - Command-line interface for simulation result reduction.
//!
//! Reduces the exports of one simulation run (energy histogram, run macro,
//! hit ntuple, voxel dumps) into a spectrum, an efficiency estimate and a
//! reconstructed energy-deposition grid.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use adapt_algorithms::{
    CylinderGrid, EnergyGrid, FlatteningConvention, GaussianBroadening, DEFAULT_FWHM,
    DEFAULT_MASKED_RINGS,
};
use adapt_core::{BinCenters, EnergySpectrum, EventTotals, Shape};
use adapt_io::pipeline::{analyze_events, reconstruct_grid};
use adapt_io::{
    analyze, read_histogram, read_macro, AnalysisReport, AnalysisRequest, HitTableLayout,
    MacroLayout, MacroOptions, MemoryCeiling, ResultsWriter, VoxelTableLayout,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    AdaptIo(#[from] adapt_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] adapt_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scoring mesh shape selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    /// Rectangular box mesh
    Box,
    /// Cylindrical (R, Z, Phi) mesh
    Cylinder,
}

impl From<ShapeArg> for Shape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Box => Shape::Box,
            ShapeArg::Cylinder => Shape::Cylinder,
        }
    }
}

/// Simulation result reduction.
#[derive(Parser)]
#[command(name = "adapt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How to read the run macro and voxel dump.
#[derive(Args, Clone)]
struct MeshArgs {
    /// Voxel dump shape (defaults to the shape the macro declares)
    #[arg(long, value_enum)]
    shape: Option<ShapeArg>,

    /// Read mesh extents and bins from fixed macro lines 22 and 23
    #[arg(long)]
    legacy_macro: bool,

    /// Cylinder layer to write (defaults to the middle layer)
    #[arg(long)]
    layer: Option<usize>,

    /// Innermost radial rings zeroed in the written cylinder layer
    #[arg(long, default_value_t = DEFAULT_MASKED_RINGS)]
    masked_rings: usize,

    /// Memory ceiling for the reconstructed grid (bytes)
    #[arg(long)]
    max_grid_bytes: Option<usize>,
}

impl MeshArgs {
    fn macro_options(&self) -> MacroOptions {
        let layout = if self.legacy_macro {
            MacroLayout::legacy(self.shape.map_or(Shape::Box, Shape::from))
        } else {
            MacroLayout::Keyed
        };
        MacroOptions::default().with_layout(layout)
    }

    fn memory(&self) -> MemoryCeiling {
        match self.max_grid_bytes {
            Some(bytes) => MemoryCeiling::default().with_max_bytes(bytes),
            None => MemoryCeiling::default(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce one run: spectrum, efficiency, event statistics and grid
    Analyze {
        /// Energy histogram export
        #[arg(long)]
        histogram: PathBuf,

        /// Run macro
        #[arg(long = "macro")]
        macro_file: PathBuf,

        /// Hit ntuple export
        #[arg(long)]
        hits: Option<PathBuf>,

        /// Voxel dump
        #[arg(long)]
        voxels: Option<PathBuf>,

        /// Broaden the spectrum with this FWHM (MeV)
        #[arg(long)]
        fwhm: Option<f64>,

        /// Write the reconstructed grid to this CSV file
        #[arg(long)]
        grid_output: Option<PathBuf>,

        #[command(flatten)]
        mesh: MeshArgs,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the trimmed (and optionally broadened) spectrum as CSV
    Spectrum {
        /// Energy histogram export
        #[arg(long)]
        histogram: PathBuf,

        /// Broaden the spectrum with this FWHM (MeV)
        #[arg(long, num_args = 0..=1, default_missing_value = "0.13")]
        fwhm: Option<f64>,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reconstruct a voxel dump and write it as CSV
    Grid {
        /// Run macro
        #[arg(long = "macro")]
        macro_file: PathBuf,

        /// Voxel dump
        #[arg(long)]
        voxels: PathBuf,

        #[command(flatten)]
        mesh: MeshArgs,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Per-event energy totals and history-by-history statistics
    Events {
        /// Hit ntuple export
        #[arg(long)]
        hits: PathBuf,

        /// Energy histogram export (detected-event count)
        #[arg(long)]
        histogram: PathBuf,

        /// Header lines before the first hit
        #[arg(long, default_value_t = adapt_io::table::DEFAULT_HIT_HEADER_ROWS)]
        header_rows: usize,

        /// Write per-event totals to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information about a histogram export and run macro
    Info {
        /// Energy histogram export
        #[arg(long)]
        histogram: PathBuf,

        /// Run macro
        #[arg(long = "macro")]
        macro_file: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn default_layer(grid: &CylinderGrid, layer: Option<usize>) -> usize {
    layer.unwrap_or(grid.layer_count() / 2)
}

/// Bin, center energy and count of the most populated bin.
fn spectrum_peak(spectrum: &EnergySpectrum, centers: &BinCenters) -> Option<(usize, f64, u64)> {
    let (bin, count) = spectrum.peak()?;
    centers.as_slice().get(bin).map(|&energy| (bin, energy, count))
}

fn write_grid(path: &Path, grid: &EnergyGrid, mesh: &MeshArgs) -> Result<()> {
    let mut writer = ResultsWriter::create(path)?;
    match grid {
        EnergyGrid::Box(grid) => writer.write_box_grid(grid)?,
        EnergyGrid::Cylinder(grid) => {
            writer.write_cylinder_layer(grid, default_layer(grid, mesh.layer), mesh.masked_rings)?;
        }
    }
    log::info!("grid written to {}", path.display());
    Ok(())
}

fn report_json(report: &AnalysisReport) -> serde_json::Value {
    let efficiency = match &report.efficiency {
        Ok(eff) => json!({
            "efficiency": eff.efficiency,
            "percent": eff.percent(),
            "uncertainty_percent": eff.uncertainty_percent().ok(),
            "uncertainty_error": eff.uncertainty_percent().err().map(|e| e.to_string()),
        }),
        Err(err) => json!({ "error": err.to_string() }),
    };
    let events = report.events.as_ref().map(|events| {
        let stats = &events.statistics;
        json!({
            "unique_events": stats.unique_events,
            "detected_events": stats.detected_events,
            "mean_energy": stats.mean_energy,
            "sigma": stats.sigma.as_ref().ok(),
            "sigma_error": stats.sigma.as_ref().err().map(ToString::to_string),
            "bounds": events.bounds,
        })
    });
    let grid = report.grid.as_ref().map(|grid| {
        let shape: Vec<usize> = match grid {
            EnergyGrid::Box(grid) => grid.as_array().shape().to_vec(),
            EnergyGrid::Cylinder(grid) => grid.stacked().shape().to_vec(),
        };
        json!({
            "shape": grid.shape(),
            "dims": shape,
            "value_range": grid.value_range(),
        })
    });
    json!({
        "metadata": report.metadata,
        "run": report.run,
        "simulated_events": report.run.simulated_events,
        "detected_events": report.detected_events(),
        "efficiency": efficiency,
        "spectrum": {
            "centers": report.centers,
            "counts": report.spectrum.counts,
            "broadened": report.broadened,
        },
        "events": events,
        "grid": grid,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            histogram,
            macro_file,
            hits,
            voxels,
            fwhm,
            grid_output,
            mesh,
            json,
        } => {
            let mut request = AnalysisRequest::new(histogram, macro_file)
                .with_macro_options(mesh.macro_options())
                .with_memory(mesh.memory());
            if let Some(path) = hits {
                request = request.with_hits(path);
            }
            if let Some(path) = voxels {
                request = request.with_voxels(path);
            }
            if let Some(fwhm) = fwhm {
                request = request.with_broadening(GaussianBroadening::new(fwhm)?);
            }
            if let Some(shape) = mesh.shape {
                request = request.with_shape(shape.into());
            }

            let report = analyze(&request)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                println!("Results for {}", request.histogram.display());
                print!("{}", report.summary());
                if let Some((_, energy, count)) = spectrum_peak(&report.spectrum, &report.centers) {
                    println!(
                        "  Spectrum peak:           {:.4} MeV ({} counts)",
                        energy, count
                    );
                }
                match &report.grid {
                    Some(EnergyGrid::Box(grid)) => {
                        let dims = grid.dims();
                        println!(
                            "  Box grid:                {} x {} x {} voxels, total {:.4} MeV",
                            dims.nx,
                            dims.ny,
                            dims.nz,
                            grid.total_energy()
                        );
                    }
                    Some(EnergyGrid::Cylinder(grid)) => {
                        let (nr, nphi) = grid.layer_shape();
                        println!(
                            "  Cylinder grid:           {} layers of {} x {} (R x Phi)",
                            grid.layer_count(),
                            nr,
                            nphi
                        );
                    }
                    None => {}
                }
            }

            if let (Some(path), Some(grid)) = (grid_output, &report.grid) {
                write_grid(&path, grid, &mesh)?;
            }
        }

        Commands::Spectrum {
            histogram,
            fwhm,
            output,
        } => {
            let export = read_histogram(&histogram)?;
            let (spectrum, centers) = export.build();
            let broadened = match fwhm {
                Some(fwhm) => {
                    Some(GaussianBroadening::new(fwhm)?.broaden_spectrum(&spectrum, &centers)?)
                }
                None => None,
            };
            let mut writer = ResultsWriter::create(&output)?;
            writer.write_spectrum(&spectrum, &centers, broadened.as_deref())?;
            println!(
                "Wrote {} bins ({} counts) to {}",
                spectrum.len(),
                spectrum.total(),
                output.display()
            );
            if broadened.is_some() {
                log::info!(
                    "broadened with FWHM {} MeV",
                    fwhm.unwrap_or(DEFAULT_FWHM)
                );
            }
        }

        Commands::Grid {
            macro_file,
            voxels,
            mesh,
            output,
        } => {
            let run = read_macro(&macro_file, &mesh.macro_options())?;
            let grid = reconstruct_grid(
                &voxels,
                &run,
                mesh.shape.map(Shape::from),
                &VoxelTableLayout::default(),
                FlatteningConvention::default(),
                &mesh.memory(),
            )?;
            write_grid(&output, &grid, &mesh)?;
            match grid.value_range() {
                Some((lo, hi)) => println!(
                    "Wrote {} grid to {} (values {:.4} .. {:.4})",
                    grid.shape(),
                    output.display(),
                    lo,
                    hi
                ),
                None => println!("Wrote empty {} grid to {}", grid.shape(), output.display()),
            }
        }

        Commands::Events {
            hits,
            histogram,
            header_rows,
            output,
        } => {
            let export = read_histogram(&histogram)?;
            let (spectrum, _) = export.build();
            let layout = HitTableLayout::default().with_header_rows(header_rows);
            let report = analyze_events(&hits, &layout, spectrum.total())?;
            let stats = &report.statistics;

            println!("Events with deposits:  {}", stats.unique_events);
            println!("Detected events:       {}", stats.detected_events);
            match stats.mean_energy {
                Some(mean) => println!("Mean energy per event: {:.4} MeV", mean),
                None => println!("Mean energy per event: unavailable (no deposits)"),
            }
            match &stats.sigma {
                Ok(sigma) => println!("Energy sigma (HbH):    {:.4} MeV", sigma),
                Err(err) => println!("Energy sigma (HbH):    unavailable ({})", err),
            }
            if let Some(bounds) = report.bounds {
                println!(
                    "Hit extent:            x {:.3}..{:.3}, y {:.3}..{:.3}, z {:.3}..{:.3}",
                    bounds.min.x, bounds.max.x, bounds.min.y, bounds.max.y, bounds.min.z, bounds.max.z
                );
            }
            if let Some(path) = output {
                let totals: &EventTotals = &report.totals;
                ResultsWriter::create(&path)?.write_event_totals(totals)?;
                println!("Wrote {} event totals to {}", totals.len(), path.display());
            }
        }

        Commands::Info {
            histogram,
            macro_file,
        } => {
            let export = read_histogram(&histogram)?;
            let meta = export.metadata;
            println!("File: {}", histogram.display());
            println!(
                "Axis: {} bins over [{}, {}] (width {:.4})",
                meta.bin_count,
                meta.energy_min,
                meta.energy_max,
                meta.bin_width()
            );
            println!(
                "Raw slots: {} (expected {})",
                export.raw.len(),
                meta.raw_len()
            );
            let (spectrum, centers) = export.build();
            println!("Detected events: {}", spectrum.total());
            if let Some((bin, energy, count)) = spectrum_peak(&spectrum, &centers) {
                println!("Peak: bin {} at {:.4} MeV ({} counts)", bin, energy, count);
            }

            if let Some(path) = macro_file {
                let run = read_macro(&path, &MacroOptions::default())?;
                println!("Macro: {}", path.display());
                println!("Simulated events: {}", run.simulated_events);
                match run.mesh {
                    Some(mesh) => println!(
                        "Mesh: {} ({} voxels)",
                        mesh.shape(),
                        mesh.voxel_count()
                            .map_or_else(|| "overflow".to_string(), |n| n.to_string())
                    ),
                    None => println!("Mesh: none declared"),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapt_core::{HistogramExport, HistogramMetadata, RawSpectrum};

    #[test]
    fn test_peak_of_overlong_export() {
        let export = HistogramExport {
            metadata: HistogramMetadata::new(2, 0.0, 1.0).unwrap(),
            raw: RawSpectrum(vec![1, 2, 3, 4, 9, 5]),
        };
        let (spectrum, centers) = export.build();
        let (bin, energy, count) = spectrum_peak(&spectrum, &centers).unwrap();
        assert_eq!((bin, count), (3, 9));
        assert!((energy - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_peak_with_missing_center() {
        let spectrum = EnergySpectrum {
            counts: vec![0, 1, 7],
        };
        assert_eq!(spectrum_peak(&spectrum, &BinCenters(vec![0.5])), None);
        assert_eq!(spectrum_peak(&EnergySpectrum::default(), &BinCenters(vec![])), None);
    }
}
