//! Non-fatal parse deviations
//!
//! The demuxer keeps parsing through recoverable problems (unknown boxes,
//! truncated tables, odd sizes) and records each one here. Warnings are
//! retrievable after `init()` so callers can decide whether a file is
//! trustworthy; every emission is also mirrored to `tracing::warn!`.

use serde::Serialize;
use std::fmt;

/// Classification of a recoverable deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    /// A box type outside the known set; payload kept opaque
    UnknownBox,
    /// A codec fourcc with no canonical mapping; passed through raw
    UnknownCodec,
    /// A child box whose declared extent crosses its parent's end
    OversizedChild,
    /// A sample table shorter than its declared entry count
    TruncatedTable,
    /// Sample counts disagree between tables; trimmed to the shortest
    InconsistentSampleCount,
    /// A sample's byte range falls outside the media-data box
    SampleOutOfMediaData,
    /// A box size that is legal but suspicious (e.g. zero-length payload)
    OddBoxSize,
    /// A trak that could not be decoded into a usable stream
    SkippedTrack,
}

impl WarningKind {
    /// Short name used in log lines and text output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnknownBox => "unknown-box",
            Self::UnknownCodec => "unknown-codec",
            Self::OversizedChild => "oversized-child",
            Self::TruncatedTable => "truncated-table",
            Self::InconsistentSampleCount => "inconsistent-sample-count",
            Self::SampleOutOfMediaData => "sample-out-of-media-data",
            Self::OddBoxSize => "odd-box-size",
            Self::SkippedTrack => "skipped-track",
        }
    }
}

/// One recoverable deviation observed while parsing.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    /// Absolute file offset of the offending structure, when known
    pub offset: Option<u64>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: None,
        }
    }

    pub fn at_offset(kind: WarningKind, offset: u64, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(
                f,
                "[{}] {} (offset {})",
                self.kind.name(),
                self.message,
                offset
            ),
            None => write!(f, "[{}] {}", self.kind.name(), self.message),
        }
    }
}

/// Record a warning: push onto the sink and mirror to the log.
pub fn emit(sink: &mut Vec<Warning>, warning: Warning) {
    tracing::warn!(kind = warning.kind.name(), "{}", warning);
    sink.push(warning);
}
