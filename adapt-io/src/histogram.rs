//! Histogram export parsing.
//!
//! The export starts with `#`-prefixed metadata, one of which is the axis
//! line `#axis fixed <bins> <min> <max>`. A column-title line follows, then
//! one row per raw slot whose first comma-separated field is the entry count:
//!
//! ```text
//! #class tools::histo::h1d
//! #title Energy Deposit
//! #dimension 1
//! #axis fixed 1000 0 3
//! #annotation axis_x.title Energy [MeV]
//! #bin_number 1002
//! entries,Sw,Sw2,Sxw0,Sx2w0
//! 0,0,0,0,0
//! ```

use crate::reader::MappedFileReader;
use crate::{Error, Result};
use adapt_core::{HistogramExport, HistogramMetadata, RawSpectrum};
use std::path::Path;

/// Marker that opens the axis description line.
pub const AXIS_MARKER: &str = "#axis fixed";

/// Parses the axis line. Tokens 2..=4 (whitespace-split) are bins, min, max.
fn parse_axis_line(line: &str, origin: &str, line_no: usize) -> Result<HistogramMetadata> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return Err(Error::format(
            origin,
            line_no,
            format!("axis line has {} tokens, expected at least 5", tokens.len()),
        ));
    }
    let bin_count = tokens[2].parse::<usize>().map_err(|e| {
        Error::format(origin, line_no, format!("bin count {:?}: {e}", tokens[2]))
    })?;
    let energy_min = tokens[3].parse::<f64>().map_err(|e| {
        Error::format(origin, line_no, format!("energy min {:?}: {e}", tokens[3]))
    })?;
    let energy_max = tokens[4].parse::<f64>().map_err(|e| {
        Error::format(origin, line_no, format!("energy max {:?}: {e}", tokens[4]))
    })?;
    Ok(HistogramMetadata::new(bin_count, energy_min, energy_max)?)
}

/// Locates the axis line and returns the histogram metadata.
///
/// # Errors
/// - [`adapt_core::Error::MetadataNotFound`] if no line starts with the marker.
/// - [`Error::InvalidFormat`] if its numeric fields do not parse.
/// - [`adapt_core::Error::InvalidMetadata`] if the values are unusable.
pub fn parse_histogram_metadata(text: &str, origin: &str) -> Result<HistogramMetadata> {
    let (idx, line) = text
        .lines()
        .enumerate()
        .find(|(_, line)| line.starts_with(AXIS_MARKER))
        .ok_or_else(|| adapt_core::Error::MetadataNotFound {
            origin: origin.to_string(),
        })?;
    parse_axis_line(line, origin, idx + 1)
}

/// Parses a full histogram export.
///
/// A raw slot count different from `bin_count + 2` is logged, not rejected.
///
/// # Errors
/// Everything [`parse_histogram_metadata`] reports, plus
/// [`Error::InvalidFormat`] for a data line whose first field is not a count.
pub fn parse_histogram_export(text: &str, origin: &str) -> Result<HistogramExport> {
    let metadata = parse_histogram_metadata(text, origin)?;

    let mut counts = Vec::with_capacity(metadata.raw_len());
    let mut title_seen = false;
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let field = line.split(',').next().unwrap_or("").trim();
        match field.parse::<u64>() {
            Ok(count) => counts.push(count),
            Err(_) if !title_seen && counts.is_empty() => {
                log::debug!("{origin}: skipping column titles {line:?}");
                title_seen = true;
            }
            Err(e) => {
                return Err(Error::format(
                    origin,
                    idx + 1,
                    format!("entry count {field:?}: {e}"),
                ))
            }
        }
    }

    let export = HistogramExport {
        metadata,
        raw: RawSpectrum(counts),
    };
    if export.is_complete() {
        log::debug!(
            "{origin}: {} bins over [{}, {}]",
            metadata.bin_count,
            metadata.energy_min,
            metadata.energy_max
        );
    } else {
        log::warn!(
            "{origin}: {} raw slots, header declares {} bins (+2 flow slots)",
            export.raw.len(),
            metadata.bin_count
        );
    }
    Ok(export)
}

/// Reads and parses a histogram export file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn read_histogram<P: AsRef<Path>>(path: P) -> Result<HistogramExport> {
    let reader = MappedFileReader::open(path)?;
    parse_histogram_export(&reader.text(), &reader.origin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "#class tools::histo::h1d
#title Energy Deposit
#dimension 1
#axis fixed 4 0 2
#annotation axis_x.title Energy [MeV]
#bin_number 6
entries,Sw,Sw2,Sxw0,Sx2w0
3,0,0,0,0
7,7,7,1.75,0.4375
2,2,2,1.5,1.125
5,5,5,6.25,7.8125
1,1,1,1.75,3.0625
9,0,0,0,0
";

    #[test]
    fn test_parse_export() {
        let export = parse_histogram_export(EXPORT, "h1.csv").unwrap();
        assert_eq!(export.metadata.bin_count, 4);
        assert_eq!(export.metadata.energy_min, 0.0);
        assert_eq!(export.metadata.energy_max, 2.0);
        assert_eq!(export.raw.0, vec![3, 7, 2, 5, 1, 9]);
        assert!(export.is_complete());

        let (spectrum, centers) = export.build();
        assert_eq!(spectrum.counts, vec![0, 2, 5, 1]);
        assert_eq!(centers.0, vec![0.25, 0.75, 1.25, 1.75]);
    }

    #[test]
    fn test_fractional_range() {
        let meta =
            parse_histogram_metadata("#axis fixed 100 0.5 3.5\n", "h1.csv").unwrap();
        assert_eq!(meta.bin_count, 100);
        assert_eq!(meta.energy_min, 0.5);
    }

    #[test]
    fn test_missing_axis_line() {
        let err = parse_histogram_export("#title x\n1\n2\n", "h1.csv").unwrap_err();
        assert!(matches!(
            err,
            Error::Core(adapt_core::Error::MetadataNotFound { ref origin }) if origin == "h1.csv"
        ));
    }

    #[test]
    fn test_invalid_axis_values() {
        let err = parse_histogram_metadata("#axis fixed ten 0 1\n", "h1.csv").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 1, .. }));
        let err = parse_histogram_metadata("#axis fixed 10 2 1\n", "h1.csv").unwrap_err();
        assert!(matches!(
            err,
            Error::Core(adapt_core::Error::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_bad_data_line() {
        let text = "#axis fixed 2 0 1\nentries\n1\nnope\n";
        let err = parse_histogram_export(text, "h1.csv").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { line: 4, .. }));
    }

    #[test]
    fn test_short_export_is_kept() {
        let export = parse_histogram_export("#axis fixed 5 0 1\n4\n4\n4\n", "h1.csv").unwrap();
        assert!(!export.is_complete());
        assert_eq!(export.raw.len(), 3);
    }
}
