//! End-to-end reduction of one simulation result set.
//!
//! Inputs are parsed first (histogram header, run macro) so malformed
//! artifacts abort before any computation. Statistical degeneracies stay
//! local to the metric they affect.

use crate::histogram::read_histogram;
use crate::limits::MemoryCeiling;
use crate::macro_file::{read_macro, MacroOptions};
use crate::table::{read_hit_table, read_voxel_table, HitTableLayout, VoxelTableLayout};
use crate::Result;
use adapt_algorithms::{EnergyGrid, FlatteningConvention, GaussianBroadening, Reconstructor};
use adapt_core::{
    AnalysisSummary, BinCenters, EfficiencyEstimate, EnergySpectrum, Error as CoreError,
    EventStatistics, EventTotals, HistogramMetadata, HitBounds, RunConfig, Shape,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Input files and options of one reduction.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    /// Energy histogram export.
    pub histogram: PathBuf,
    /// Run macro.
    pub macro_file: PathBuf,
    /// Optional hit ntuple for event statistics.
    pub hits: Option<PathBuf>,
    /// Optional voxel dump for grid reconstruction.
    pub voxels: Option<PathBuf>,
    /// Broadening to apply to the spectrum, if any.
    pub broadening: Option<GaussianBroadening>,
    /// How to read the macro.
    pub macro_options: MacroOptions,
    /// Voxel dump shape; defaults to the shape the macro declares.
    pub shape: Option<Shape>,
    /// Hit ntuple columns.
    pub hit_layout: HitTableLayout,
    /// Voxel dump columns.
    pub voxel_layout: VoxelTableLayout,
    /// Box dump scan order.
    pub convention: FlatteningConvention,
    /// Dense grid memory ceiling.
    pub memory: MemoryCeiling,
}

impl AnalysisRequest {
    /// Creates a request for the histogram and macro of one run.
    pub fn new(histogram: impl Into<PathBuf>, macro_file: impl Into<PathBuf>) -> Self {
        Self {
            histogram: histogram.into(),
            macro_file: macro_file.into(),
            hits: None,
            voxels: None,
            broadening: None,
            macro_options: MacroOptions::default(),
            shape: None,
            hit_layout: HitTableLayout::default(),
            voxel_layout: VoxelTableLayout::default(),
            convention: FlatteningConvention::default(),
            memory: MemoryCeiling::default(),
        }
    }

    /// Analyse a hit ntuple as well.
    #[must_use]
    pub fn with_hits(mut self, path: impl Into<PathBuf>) -> Self {
        self.hits = Some(path.into());
        self
    }

    /// Reconstruct a voxel dump as well.
    #[must_use]
    pub fn with_voxels(mut self, path: impl Into<PathBuf>) -> Self {
        self.voxels = Some(path.into());
        self
    }

    /// Broaden the spectrum.
    #[must_use]
    pub fn with_broadening(mut self, broadening: GaussianBroadening) -> Self {
        self.broadening = Some(broadening);
        self
    }

    /// Set the macro options.
    #[must_use]
    pub fn with_macro_options(mut self, options: MacroOptions) -> Self {
        self.macro_options = options;
        self
    }

    /// Override the voxel dump shape.
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Set the hit ntuple layout.
    #[must_use]
    pub fn with_hit_layout(mut self, layout: HitTableLayout) -> Self {
        self.hit_layout = layout;
        self
    }

    /// Set the voxel dump layout.
    #[must_use]
    pub fn with_voxel_layout(mut self, layout: VoxelTableLayout) -> Self {
        self.voxel_layout = layout;
        self
    }

    /// Set the box scan order.
    #[must_use]
    pub fn with_convention(mut self, convention: FlatteningConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Set the dense grid memory ceiling.
    #[must_use]
    pub fn with_memory(mut self, memory: MemoryCeiling) -> Self {
        self.memory = memory;
        self
    }
}

/// Event-level results from a hit ntuple.
#[derive(Clone, Debug, PartialEq)]
pub struct EventReport {
    /// Per-event totals.
    pub totals: EventTotals,
    /// Mean and history-by-history sigma.
    pub statistics: EventStatistics,
    /// Spatial extent of the hits.
    pub bounds: Option<HitBounds>,
}

/// Everything one reduction produced.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    /// Histogram axis.
    pub metadata: HistogramMetadata,
    /// Run parameters from the macro.
    pub run: RunConfig,
    /// Trimmed spectrum.
    pub spectrum: EnergySpectrum,
    /// Bin centers of the spectrum.
    pub centers: BinCenters,
    /// Broadened spectrum, when requested.
    pub broadened: Option<Vec<f64>>,
    /// Efficiency, or why it is undefined.
    pub efficiency: adapt_core::Result<EfficiencyEstimate>,
    /// Event results, when a hit ntuple was given.
    pub events: Option<EventReport>,
    /// Reconstructed grid, when a voxel dump was given.
    pub grid: Option<EnergyGrid>,
}

impl AnalysisReport {
    /// Detected-event count (spectrum total).
    #[must_use]
    pub fn detected_events(&self) -> u64 {
        self.spectrum.total()
    }

    /// Text summary of the scalar results.
    #[must_use]
    pub fn summary(&self) -> AnalysisSummary {
        let summary = AnalysisSummary::new(self.run.simulated_events, self.detected_events());
        match &self.events {
            Some(events) => summary.with_events(events.statistics.clone()),
            None => summary,
        }
    }
}

/// Aggregates a hit ntuple against the detected count.
///
/// # Errors
/// Returns an error if the ntuple cannot be read.
pub fn analyze_events(path: &Path, layout: &HitTableLayout, detected: u64) -> Result<EventReport> {
    let hits = read_hit_table(path, layout)?;
    let totals = EventTotals::aggregate(&hits);
    let statistics = totals.statistics(detected);
    if let Err(err) = &statistics.sigma {
        log::warn!("{}: history-by-history sigma unavailable: {err}", path.display());
    }
    Ok(EventReport {
        bounds: HitBounds::of(&hits),
        totals,
        statistics,
    })
}

/// Reads and reconstructs a voxel dump for the mesh in `run`.
///
/// # Errors
/// Returns an error if the dump cannot be read, no shape is known, or the
/// dump does not match the mesh.
pub fn reconstruct_grid(
    path: &Path,
    run: &RunConfig,
    shape: Option<Shape>,
    layout: &VoxelTableLayout,
    convention: FlatteningConvention,
    memory: &MemoryCeiling,
) -> Result<EnergyGrid> {
    let shape = shape
        .or_else(|| run.mesh.map(|mesh| mesh.shape()))
        .ok_or_else(|| CoreError::ConfigError("no mesh shape declared or requested".into()))?;
    let table = read_voxel_table(path, shape, layout)?;
    let reconstructor = Reconstructor::for_shape(shape)
        .with_convention(convention)
        .with_limits(memory.resolve()?);
    let grid = reconstructor.reconstruct(&table, run)?;
    log::info!(
        "{}: {} grid reconstructed from {} rows",
        path.display(),
        reconstructor.name(),
        table.len()
    );
    Ok(grid)
}

/// Runs one reduction.
///
/// # Errors
/// Fails on unreadable or malformed inputs and on voxel dumps that do not
/// match the declared mesh. Degenerate statistics are reported inside the
/// returned [`AnalysisReport`] instead.
pub fn analyze(request: &AnalysisRequest) -> Result<AnalysisReport> {
    let export = read_histogram(&request.histogram)?;
    let run = read_macro(&request.macro_file, &request.macro_options)?;

    let (spectrum, centers) = export.build();
    let efficiency = EfficiencyEstimate::from_spectrum(run.simulated_events, &spectrum);
    log::info!(
        "{}: {} detected of {} simulated",
        request.histogram.display(),
        spectrum.total(),
        run.simulated_events
    );

    let broadened = request
        .broadening
        .as_ref()
        .map(|b| b.broaden_spectrum(&spectrum, &centers))
        .transpose()?;

    let events = request
        .hits
        .as_deref()
        .map(|path| analyze_events(path, &request.hit_layout, spectrum.total()))
        .transpose()?;

    let grid = request
        .voxels
        .as_deref()
        .map(|path| {
            reconstruct_grid(
                path,
                &run,
                request.shape,
                &request.voxel_layout,
                request.convention,
                &request.memory,
            )
        })
        .transpose()?;

    Ok(AnalysisReport {
        metadata: export.metadata,
        run,
        spectrum,
        centers,
        broadened,
        efficiency,
        events,
        grid,
    })
}

/// Runs independent reductions in parallel.
///
/// Results are returned in request order; one failure does not affect the others.
pub fn analyze_many(requests: &[AnalysisRequest]) -> Vec<Result<AnalysisReport>> {
    requests.par_iter().map(analyze).collect()
}
