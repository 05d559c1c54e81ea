//! Run macro parsing.
//!
//! The macro that drove a simulation carries the run count
//! (`/run/beamOn N`) and the command-based scoring mesh:
//!
//! ```text
//! /score/create/boxMesh             DetScoringVolume
//! /score/mesh/boxSize               5.00 5.00 1.00 mm
//! /score/mesh/nBin                  1000 1000 200
//! ```
//!
//! or, for a cylinder, `/score/create/cylinderMesh`,
//! `/score/mesh/cylinderSize <radius> <half length> mm` and
//! `/score/mesh/nBin <R> <Z> <Phi>`.
//!
//! [`MacroLayout::Keyed`] finds these by directive name. The
//! [`MacroLayout::FixedLines`] layout reads extents and bin counts from fixed
//! line positions instead, for macros whose exact layout is known.

use crate::reader::MappedFileReader;
use crate::{Error, Result};
use adapt_core::{
    CylinderBins, RunConfig, ScoringMesh, Shape, VoxelDims, DEFAULT_VOXEL_PITCH,
};
use std::path::Path;

const RUN_COUNT_DIRECTIVE: &str = "/run/beamOn";
const BOX_MESH: &str = "/score/create/boxMesh";
const CYLINDER_MESH: &str = "/score/create/cylinderMesh";
const BOX_SIZE: &str = "/score/mesh/boxSize";
const CYLINDER_SIZE: &str = "/score/mesh/cylinderSize";
const BIN_COUNTS: &str = "/score/mesh/nBin";

/// Zero-based line holding the mesh extents in generated macros.
pub const LEGACY_EXTENTS_LINE: usize = 21;
/// Zero-based line holding the mesh bin counts in generated macros.
pub const LEGACY_BINS_LINE: usize = 22;

/// How mesh parameters are located in a macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MacroLayout {
    /// Scan for directives by name.
    #[default]
    Keyed,
    /// Read extents and bin counts from fixed zero-based line indices.
    FixedLines {
        /// Line holding the extents.
        extents_line: usize,
        /// Line holding the bin counts.
        bins_line: usize,
        /// Mesh shape, which fixed lines cannot reveal.
        shape: Shape,
    },
}

impl MacroLayout {
    /// Fixed-line layout of generated macros for `shape`.
    #[must_use]
    pub fn legacy(shape: Shape) -> Self {
        Self::FixedLines {
            extents_line: LEGACY_EXTENTS_LINE,
            bins_line: LEGACY_BINS_LINE,
            shape,
        }
    }
}

/// Settings for reading a run macro.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacroOptions {
    /// Where mesh parameters are found.
    pub layout: MacroLayout,
    /// Pitch used to derive voxel counts when the macro declares none.
    pub voxel_pitch: f64,
}

impl Default for MacroOptions {
    fn default() -> Self {
        Self {
            layout: MacroLayout::Keyed,
            voxel_pitch: DEFAULT_VOXEL_PITCH,
        }
    }
}

impl MacroOptions {
    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: MacroLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the pitch used to derive voxel counts.
    #[must_use]
    pub fn with_voxel_pitch(mut self, pitch: f64) -> Self {
        self.voxel_pitch = pitch;
        self
    }
}

/// Strips a trailing `#` comment; returns `None` for blank or comment lines.
fn directive_text(line: &str) -> Option<&str> {
    let code = line.split('#').next().unwrap_or("").trim();
    (!code.is_empty()).then_some(code)
}

/// First word made only of ASCII digits, with word boundaries on both sides.
fn first_integer_word(line: &str) -> Option<&str> {
    line.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()))
}

/// Extracts the number of simulated primaries.
///
/// The first active line containing `/run/beamOn` is used; its first
/// standalone integer is the count.
///
/// # Errors
/// - [`adapt_core::Error::RunCountNotFound`] if no such line or integer exists.
/// - [`Error::InvalidFormat`] if the integer does not fit in `u64`.
pub fn parse_run_count(text: &str, origin: &str) -> Result<u64> {
    let not_found = || adapt_core::Error::RunCountNotFound {
        origin: origin.to_string(),
    };
    let (idx, line) = text
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| directive_text(line).map(|code| (idx, code)))
        .find(|(_, code)| code.contains(RUN_COUNT_DIRECTIVE))
        .ok_or_else(not_found)?;
    let word = first_integer_word(line).ok_or_else(not_found)?;
    word.parse::<u64>()
        .map_err(|e| Error::format(origin, idx + 1, format!("run count {word:?}: {e}")))
}

/// Parses `count` floats following the directive name.
fn float_args(args: &[&str], count: usize, origin: &str, line: usize) -> Result<Vec<f64>> {
    if args.len() < count {
        return Err(Error::format(
            origin,
            line,
            format!("expected {count} numeric arguments, found {}", args.len()),
        ));
    }
    args[..count]
        .iter()
        .map(|arg| {
            arg.parse::<f64>()
                .map_err(|e| Error::format(origin, line, format!("argument {arg:?}: {e}")))
        })
        .collect()
}

/// Converts a parsed numeric token to a bin count.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bin_count(value: f64, origin: &str, line: usize) -> Result<usize> {
    if !(value.is_finite() && value >= 1.0 && value <= usize::MAX as f64) {
        return Err(Error::format(
            origin,
            line,
            format!("bin count {value} is not a positive integer"),
        ));
    }
    Ok(value.trunc() as usize)
}

fn bins_from(values: &[f64], origin: &str, line: usize) -> Result<[usize; 3]> {
    Ok([
        bin_count(values[0], origin, line)?,
        bin_count(values[1], origin, line)?,
        bin_count(values[2], origin, line)?,
    ])
}

fn build_mesh(
    shape: Shape,
    extents: &[f64],
    bins: Option<[usize; 3]>,
    pitch: f64,
) -> Result<ScoringMesh> {
    let mesh = match (shape, bins) {
        (Shape::Box, Some([nx, ny, nz])) => ScoringMesh::Box {
            half_extents: [extents[0], extents[1], extents[2]],
            voxels: VoxelDims::new(nx, ny, nz),
        },
        (Shape::Box, None) => {
            ScoringMesh::box_from_extents([extents[0], extents[1], extents[2]], pitch)?
        }
        (Shape::Cylinder, Some([r, z, phi])) => ScoringMesh::Cylinder {
            radius: extents[0],
            half_length: extents[1],
            bins: CylinderBins { r, z, phi },
        },
        (Shape::Cylinder, None) => ScoringMesh::cylinder_from_extents(extents[0], extents[1], pitch)?,
    };
    Ok(mesh)
}

/// Finds the first run of `count` consecutive numeric tokens.
fn numeric_run(line: &str, count: usize) -> Option<Vec<f64>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(count).find_map(|window| {
        window
            .iter()
            .map(|t| {
                if t.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
                    t.parse::<f64>().ok()
                } else {
                    None
                }
            })
            .collect::<Option<Vec<f64>>>()
    })
}

fn fixed_line_mesh(
    lines: &[&str],
    extents_line: usize,
    bins_line: usize,
    shape: Shape,
    origin: &str,
    pitch: f64,
) -> Result<ScoringMesh> {
    let arity = match shape {
        Shape::Box => 3,
        Shape::Cylinder => 2,
    };
    let line_at = |idx: usize| {
        lines.get(idx).copied().ok_or_else(|| {
            Error::format(
                origin,
                idx + 1,
                format!("macro has only {} lines", lines.len()),
            )
        })
    };
    let extents = numeric_run(line_at(extents_line)?, arity).ok_or_else(|| {
        Error::format(
            origin,
            extents_line + 1,
            format!("expected {arity} numeric mesh extents"),
        )
    })?;
    let bins = numeric_run(line_at(bins_line)?, 3).ok_or_else(|| {
        Error::format(origin, bins_line + 1, "expected 3 numeric bin counts")
    })?;
    let bins = bins_from(&bins, origin, bins_line + 1)?;
    build_mesh(shape, &extents, Some(bins), pitch)
}

#[derive(Default)]
struct KeyedMesh {
    shape: Option<Shape>,
    box_size: Option<Vec<f64>>,
    cylinder_size: Option<Vec<f64>>,
    bins: Option<[usize; 3]>,
}

fn keyed_mesh(lines: &[&str], origin: &str, pitch: f64) -> Result<Option<ScoringMesh>> {
    let mut found = KeyedMesh::default();
    for (idx, raw) in lines.iter().enumerate() {
        let Some(code) = directive_text(raw) else {
            continue;
        };
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let (directive, args) = match tokens.split_first() {
            Some((first, rest)) => (*first, rest),
            None => continue,
        };
        let line = idx + 1;
        match directive {
            BOX_MESH if found.shape.is_none() => found.shape = Some(Shape::Box),
            CYLINDER_MESH if found.shape.is_none() => found.shape = Some(Shape::Cylinder),
            BOX_SIZE if found.box_size.is_none() => {
                found.box_size = Some(float_args(args, 3, origin, line)?);
            }
            CYLINDER_SIZE if found.cylinder_size.is_none() => {
                found.cylinder_size = Some(float_args(args, 2, origin, line)?);
            }
            BIN_COUNTS if found.bins.is_none() => {
                found.bins = Some(bins_from(&float_args(args, 3, origin, line)?, origin, line)?);
            }
            _ => {}
        }
    }

    let Some(shape) = found.shape else {
        return Ok(None);
    };
    let extents = match shape {
        Shape::Box => found.box_size,
        Shape::Cylinder => found.cylinder_size,
    };
    let Some(extents) = extents else {
        return Err(adapt_core::Error::ConfigError(format!(
            "{origin}: {shape} mesh declared without a size directive"
        ))
        .into());
    };
    if found.bins.is_none() {
        log::debug!("{origin}: no {BIN_COUNTS}, deriving voxel counts at pitch {pitch}");
    }
    build_mesh(shape, &extents, found.bins, pitch).map(Some)
}

/// Parses a run macro into a [`RunConfig`].
///
/// # Errors
/// - [`adapt_core::Error::RunCountNotFound`] without a usable `/run/beamOn`.
/// - [`Error::InvalidFormat`] for malformed mesh directives or fixed lines.
/// - [`adapt_core::Error::ConfigError`] for a mesh without extents.
pub fn parse_macro(text: &str, origin: &str, options: &MacroOptions) -> Result<RunConfig> {
    let simulated_events = parse_run_count(text, origin)?;
    let lines: Vec<&str> = text.lines().collect();
    let mesh = match options.layout {
        MacroLayout::Keyed => keyed_mesh(&lines, origin, options.voxel_pitch)?,
        MacroLayout::FixedLines {
            extents_line,
            bins_line,
            shape,
        } => Some(fixed_line_mesh(
            &lines,
            extents_line,
            bins_line,
            shape,
            origin,
            options.voxel_pitch,
        )?),
    };
    log::debug!("{origin}: {simulated_events} simulated events, mesh {mesh:?}");
    let config = RunConfig::new(simulated_events);
    Ok(match mesh {
        Some(mesh) => config.with_mesh(mesh),
        None => config,
    })
}

/// Reads and parses a run macro file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn read_macro<P: AsRef<Path>>(path: P, options: &MacroOptions) -> Result<RunConfig> {
    let reader = MappedFileReader::open(path)?;
    parse_macro(&reader.text(), &reader.origin(), options)
}
