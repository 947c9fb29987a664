//! Output module for reporting on the index
//!
//! This module handles loading per-site statistics from storage and
//! rendering them for the command line.

pub mod stats;

pub use stats::{
    load_statistics, print_statistics, DetailedStatisticsItem, IndexStatistics, TotalStatistics,
};
