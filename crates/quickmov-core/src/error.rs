//! Error types for quickmov

use thiserror::Error;

/// Main error type for demuxer operations
#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Corrupt data at offset {offset}: {message}")]
    CorruptData { offset: u64, message: String },

    #[error("Invalid box size {size} at offset {offset}")]
    InvalidBoxSize { offset: u64, size: u64 },

    #[error("Missing required box: {0}")]
    MissingRequiredBox(&'static str),

    #[error("Invalid sample table: {0}")]
    InvalidSampleTable(String),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Seek error: {0}")]
    SeekError(String),

    #[error("Sample not found at index {0}")]
    SampleNotFound(usize),

    #[error("Stream not found: {0}")]
    StreamNotFound(u32),

    #[error("Invalid demuxer state: {0}")]
    InvalidState(&'static str),
}

pub type Result<T> = std::result::Result<T, DemuxError>;

/// Comprehensive test suite with Arrange-Act-Assert pattern
#[allow(
    unused_imports,
    unused_variables,
    unused_mut,
    dead_code,
    unused_comparisons,
    unused_must_use,
    unreachable_code,
    unused_parens,
    unused_assignments
)]
