//! Delimited-table readers for hit ntuples and voxel dumps.
//!
//! Column positions are never inferred: every reader takes a layout naming
//! the rows to skip and the zero-based column of each field.

use crate::reader::{skip_lines, MappedFileReader};
use crate::{Error, Result};
use adapt_algorithms::{CylinderSample, VoxelTable};
use adapt_core::{HitRecord, Shape};
use std::path::Path;

/// Header lines of a hit ntuple export.
pub const DEFAULT_HIT_HEADER_ROWS: usize = 9;

/// Column layout of a hit ntuple export.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitTableLayout {
    /// Lines skipped before the first record.
    pub header_rows: usize,
    /// Column of the event identifier.
    pub event_column: usize,
    /// Columns of x, y and z.
    pub position_columns: [usize; 3],
    /// Column of the deposited energy.
    pub energy_column: usize,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for HitTableLayout {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HIT_HEADER_ROWS,
            event_column: 0,
            position_columns: [1, 2, 3],
            energy_column: 4,
            delimiter: b',',
        }
    }
}

impl HitTableLayout {
    /// Set the number of header lines.
    #[must_use]
    pub fn with_header_rows(mut self, rows: usize) -> Self {
        self.header_rows = rows;
        self
    }

    /// Set the event identifier column.
    #[must_use]
    pub fn with_event_column(mut self, column: usize) -> Self {
        self.event_column = column;
        self
    }

    /// Set the x, y and z columns.
    #[must_use]
    pub fn with_position_columns(mut self, columns: [usize; 3]) -> Self {
        self.position_columns = columns;
        self
    }

    /// Set the energy column.
    #[must_use]
    pub fn with_energy_column(mut self, column: usize) -> Self {
        self.energy_column = column;
        self
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Column layout of a voxel dump.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoxelTableLayout {
    /// Lines skipped before the first record.
    pub header_rows: usize,
    /// Column of the scored quantity in box dumps.
    pub box_value_column: usize,
    /// Columns of the z, phi and r indices in cylinder dumps.
    pub cylinder_index_columns: [usize; 3],
    /// Column of the scored quantity in cylinder dumps.
    pub cylinder_value_column: usize,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for VoxelTableLayout {
    fn default() -> Self {
        Self {
            header_rows: 1,
            box_value_column: 3,
            cylinder_index_columns: [0, 1, 2],
            cylinder_value_column: 3,
            delimiter: b',',
        }
    }
}

impl VoxelTableLayout {
    /// Set the number of header lines.
    #[must_use]
    pub fn with_header_rows(mut self, rows: usize) -> Self {
        self.header_rows = rows;
        self
    }

    /// Set the box value column.
    #[must_use]
    pub fn with_box_value_column(mut self, column: usize) -> Self {
        self.box_value_column = column;
        self
    }

    /// Set the cylinder index columns (z, phi, r) and value column.
    #[must_use]
    pub fn with_cylinder_columns(mut self, indices: [usize; 3], value: usize) -> Self {
        self.cylinder_index_columns = indices;
        self.cylinder_value_column = value;
        self
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Record reader over `bytes` after the header lines.
fn records(bytes: &[u8], header_rows: usize, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(skip_lines(bytes, header_rows))
}

/// Parses field `column` of a record as `T`.
fn field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    column: usize,
    name: &str,
    origin: &str,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let line = record
        .position()
        .map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));
    let raw = record.get(column).ok_or_else(|| {
        Error::format(
            origin,
            line,
            format!("no column {column} for {name} ({} fields)", record.len()),
        )
    })?;
    raw.parse::<T>()
        .map_err(|e| Error::format(origin, line, format!("{name} {raw:?}: {e}")))
}

/// Parses hit records from an ntuple export.
///
/// Line numbers in errors count from the first line after the header.
///
/// # Errors
/// Returns [`Error::Csv`] for malformed records and
/// [`Error::InvalidFormat`] for missing or non-numeric fields.
pub fn parse_hit_table(bytes: &[u8], origin: &str, layout: &HitTableLayout) -> Result<Vec<HitRecord>> {
    let mut reader = records(bytes, layout.header_rows, layout.delimiter);
    let [cx, cy, cz] = layout.position_columns;
    let mut hits = Vec::new();
    for record in reader.records() {
        let record = record?;
        hits.push(HitRecord::new(
            field(&record, layout.event_column, "event id", origin)?,
            field(&record, cx, "x", origin)?,
            field(&record, cy, "y", origin)?,
            field(&record, cz, "z", origin)?,
            field(&record, layout.energy_column, "energy", origin)?,
        ));
    }
    log::debug!("{origin}: {} hits", hits.len());
    Ok(hits)
}

/// Parses the scored-value column of a box dump, in file order.
///
/// # Errors
/// Returns an error for malformed records or non-numeric values.
pub fn parse_box_table(bytes: &[u8], origin: &str, layout: &VoxelTableLayout) -> Result<Vec<f64>> {
    let mut reader = records(bytes, layout.header_rows, layout.delimiter);
    let mut values = Vec::new();
    for record in reader.records() {
        values.push(field(&record?, layout.box_value_column, "value", origin)?);
    }
    log::debug!("{origin}: {} box voxels", values.len());
    Ok(values)
}

/// Parses the indexed rows of a cylinder dump.
///
/// # Errors
/// Returns an error for malformed records or non-numeric values.
pub fn parse_cylinder_table(
    bytes: &[u8],
    origin: &str,
    layout: &VoxelTableLayout,
) -> Result<Vec<CylinderSample>> {
    let mut reader = records(bytes, layout.header_rows, layout.delimiter);
    let [cz, cphi, cr] = layout.cylinder_index_columns;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(CylinderSample::new(
            field(&record, cz, "z index", origin)?,
            field(&record, cphi, "phi index", origin)?,
            field(&record, cr, "r index", origin)?,
            field(&record, layout.cylinder_value_column, "value", origin)?,
        ));
    }
    log::debug!("{origin}: {} cylinder voxels", rows.len());
    Ok(rows)
}

/// Parses a voxel dump of the given shape.
///
/// # Errors
/// Returns an error for malformed records or non-numeric values.
pub fn parse_voxel_table(
    bytes: &[u8],
    origin: &str,
    shape: Shape,
    layout: &VoxelTableLayout,
) -> Result<VoxelTable> {
    Ok(match shape {
        Shape::Box => VoxelTable::Box(parse_box_table(bytes, origin, layout)?),
        Shape::Cylinder => VoxelTable::Cylinder(parse_cylinder_table(bytes, origin, layout)?),
    })
}

/// Reads a hit ntuple export.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn read_hit_table<P: AsRef<Path>>(path: P, layout: &HitTableLayout) -> Result<Vec<HitRecord>> {
    let reader = MappedFileReader::open(path)?;
    parse_hit_table(reader.as_bytes(), &reader.origin(), layout)
}

/// Reads a voxel dump of the given shape.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn read_voxel_table<P: AsRef<Path>>(
    path: P,
    shape: Shape,
    layout: &VoxelTableLayout,
) -> Result<VoxelTable> {
    let reader = MappedFileReader::open(path)?;
    parse_voxel_table(reader.as_bytes(), &reader.origin(), shape, layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NTUPLE: &str = "#class tools::wcsv::ntuple
#title Photons
#separator 44
#vector_separator 59
#column int iEvent
#column double PosX
#column double PosY
#column double PosZ
#column double Energy
0,1.5,-2.0,0.25,0.1
0,1.0,-1.0,0.5,0.2
3,0.0,0.0,0.0,0.662
";

    #[test]
    fn test_hit_table() {
        let hits = parse_hit_table(NTUPLE.as_bytes(), "nt.csv", &HitTableLayout::default()).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].event_id, 0);
        assert_eq!(hits[0].position.y, -2.0);
        assert_eq!(hits[2].event_id, 3);
        assert_eq!(hits[2].energy, 0.662);
    }

    #[test]
    fn test_hit_table_custom_columns() {
        let text = "energy;event;x;y;z\n0.5;7;1;2;3\n";
        let layout = HitTableLayout::default()
            .with_header_rows(1)
            .with_delimiter(b';')
            .with_event_column(1)
            .with_position_columns([2, 3, 4])
            .with_energy_column(0);
        let hits = parse_hit_table(text.as_bytes(), "nt.csv", &layout).unwrap();
        assert_eq!(hits, vec![HitRecord::new(7, 1.0, 2.0, 3.0, 0.5)]);
    }

    #[test]
    fn test_hit_table_missing_column() {
        let text = "1,2,3\n";
        let layout = HitTableLayout::default().with_header_rows(0);
        let err = parse_hit_table(text.as_bytes(), "nt.csv", &layout).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_box_table() {
        let text = "# mesh name: DetScoringVolume\n# primitive scorer: EnergyDep\n# iX, iY, iZ, total(value) [MeV], total(val^2), entry\n0,0,0,1.5,2.25,1\n0,0,1,0,0,0\n";
        let layout = VoxelTableLayout::default();
        let values = parse_box_table(text.as_bytes(), "dump.csv", &layout).unwrap();
        assert_eq!(values, vec![1.5, 0.0]);
    }

    #[test]
    fn test_cylinder_table() {
        let text = "iZ,iPhi,iR,value\n0,0,0,1.0\n0,1,0,2.5\n";
        let table =
            parse_voxel_table(text.as_bytes(), "cyl.csv", Shape::Cylinder, &VoxelTableLayout::default())
                .unwrap();
        assert_eq!(
            table,
            VoxelTable::Cylinder(vec![
                CylinderSample::new(0.0, 0.0, 0.0, 1.0),
                CylinderSample::new(0.0, 1.0, 0.0, 2.5),
            ])
        );
    }

    #[test]
    fn test_non_numeric_value() {
        let text = "h\n0,0,0,abc\n";
        let err = parse_box_table(text.as_bytes(), "dump.csv", &VoxelTableLayout::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }
}
