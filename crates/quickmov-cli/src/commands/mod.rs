//! CLI command implementations

use anyhow::{Context, Result};
use memmap2::Mmap;
use quickmov_demux::{DemuxOptions, Mp4Demuxer};
use std::fs::File;
use std::path::Path;

pub mod info;
pub mod samples;
pub mod seek;

/// Map the file and run the demuxer over the mapping.
pub(crate) fn open_demuxer(path: &Path) -> Result<Mp4Demuxer<Mmap>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    // Safety: the mapping is read-only and lives as long as the demuxer
    let data = unsafe { Mmap::map(&file) }
        .with_context(|| format!("cannot map {}", path.display()))?;

    let mut demuxer = Mp4Demuxer::open(data, DemuxOptions::default());
    demuxer
        .init()
        .with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(demuxer)
}
