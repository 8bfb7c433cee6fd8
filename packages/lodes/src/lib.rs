#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LODES workplace job statistics for grid cells.
//!
//! Parses cached WAC flat files into [`JobRecord`]s and sums the jobs
//! located in the Block Groups that intersect a cell. No spatial work
//! happens here: the Block Group set comes from the areal weighting step.
//!
//! [`JobRecord`]: grid_stats_lodes_models::JobRecord

pub mod filter;
pub mod wac;

pub use filter::filter_and_sum;

use thiserror::Error;

/// Errors that can occur while reading LODES files.
#[derive(Debug, Error)]
pub enum LodesError {
    /// CSV decoding failed at the I/O level.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading or decompressing the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A block identifier could not be normalized to 15 digits.
    #[error("Invalid block id: {block_id}")]
    InvalidBlockId {
        /// The raw `w_geocode` value.
        block_id: String,
    },
}
