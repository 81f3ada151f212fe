//! IO utilities for loading KOI tables.

pub mod koi_csv;

pub use koi_csv::{read_koi_csv, read_koi_csv_from_reader, KoiReaderConfig};
