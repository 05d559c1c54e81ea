//! adapt-io: Readers, writers and the reduction pipeline.
//!
//! This crate reads the artifacts of a simulation run (histogram export,
//! run macro, hit ntuple, voxel dumps) through memory-mapped files, writes
//! reduction results as CSV, and chains everything in [`analyze`].
//!

mod error;
pub mod histogram;
mod limits;
pub mod macro_file;
pub mod pipeline;
mod reader;
pub mod table;
mod writer;

pub use error::{Error, Result};
pub use histogram::{parse_histogram_export, parse_histogram_metadata, read_histogram};
pub use limits::MemoryCeiling;
pub use macro_file::{parse_macro, parse_run_count, read_macro, MacroLayout, MacroOptions};
pub use pipeline::{analyze, analyze_many, AnalysisReport, AnalysisRequest, EventReport};
pub use reader::MappedFileReader;
pub use table::{
    parse_hit_table, parse_voxel_table, read_hit_table, read_voxel_table, HitTableLayout,
    VoxelTableLayout,
};
pub use writer::ResultsWriter;
