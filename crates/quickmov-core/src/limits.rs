//! Resource limits for untrusted input
//!
//! Declared entry counts in a hostile file can request enormous
//! allocations before a single real entry is read. These limits cap what
//! the parsers will accept; everything is sized for real-world movie files
//! with generous headroom.

use crate::{DemuxError, Result};

/// Maximum nesting depth of the box tree
///
/// moov/trak/mdia/minf/stbl is 5 levels; no legitimate file approaches 16.
pub const MAX_BOX_DEPTH: usize = 16;

/// Maximum declared entry count in any one sample table
///
/// 10 million entries covers days of 60 fps video.
pub const MAX_TABLE_ENTRIES: u32 = 10_000_000;

/// Maximum number of samples in the merged index
///
/// Bounds the flat per-file allocation after all tracks are combined.
pub const MAX_TOTAL_SAMPLES: usize = 4_000_000;

/// Maximum number of trak boxes considered
pub const MAX_TRACKS: usize = 64;

/// Validate a declared table entry count before allocating for it.
pub fn validate_entry_count(count: u32, table: &'static str) -> Result<()> {
    if count > MAX_TABLE_ENTRIES {
        return Err(DemuxError::InvalidSampleTable(format!(
            "{} declares {} entries, limit is {}",
            table, count, MAX_TABLE_ENTRIES
        )));
    }
    Ok(())
}

/// Validate a running total of expanded samples.
pub fn validate_total_samples(total: usize) -> Result<()> {
    if total > MAX_TOTAL_SAMPLES {
        return Err(DemuxError::InvalidSampleTable(format!(
            "total sample count {} exceeds limit {}",
            total, MAX_TOTAL_SAMPLES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_count_within_limit_passes() {
        assert!(validate_entry_count(1000, "stsz").is_ok());
        assert!(validate_entry_count(MAX_TABLE_ENTRIES, "stsz").is_ok());
    }

    #[test]
    fn entry_count_over_limit_names_the_table() {
        let err = validate_entry_count(MAX_TABLE_ENTRIES + 1, "stco").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("stco"));
        assert!(matches!(err, DemuxError::InvalidSampleTable(_)));
    }

    #[test]
    fn total_samples_over_limit_rejected() {
        assert!(validate_total_samples(MAX_TOTAL_SAMPLES).is_ok());
        assert!(validate_total_samples(MAX_TOTAL_SAMPLES + 1).is_err());
    }
}
