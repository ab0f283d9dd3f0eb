//! quickmov-demux: MOV/QuickTime/MP4 container demuxer
//!
//! Parses an ISO Base Media File Format (ISO/IEC 14496-12) byte buffer,
//! decodes the per-track sample tables, and exposes an ordered cursor of
//! encoded media samples with timing and keyframe flags, plus
//! nearest-prior-keyframe seeking. Decoding is somebody else's job: the
//! demuxer hands out configured, zero-copy slices of encoded data.
//!
//! # Scope
//!
//! - Box/atom tree over the full 14496-12 grammar (32-bit and 64-bit sizes)
//! - `mvhd`/`mdhd`/`hdlr`/`stsd` track and media headers
//! - `stsz`/`stz2`, `stco`/`co64`, `stsc`, `stts`, `stss` sample tables
//! - Codec fourcc to canonical codec-string mapping (video + audio)
//! - Merged, time-ordered sample index with per-stream filtering
//!
//! Fragmented MP4 (`moof` runs), edit lists and encrypted tracks are out of
//! scope; the boxes are still recognised when walking the tree.
//!
//! # Example
//!
//! ```no_run
//! use quickmov_demux::{DemuxOptions, Mp4Demuxer};
//! use std::fs;
//!
//! let data = fs::read("movie.mp4").unwrap();
//! let mut demuxer = Mp4Demuxer::open(data, DemuxOptions::default());
//! demuxer.init().unwrap();
//!
//! demuxer.seek(5_000_000).unwrap(); // 5 s, lands on the prior keyframe
//! while let Some(sample) = demuxer.next_sample() {
//!     let bytes = demuxer.sample_data(&sample).unwrap();
//!     println!("stream {} ts {}us {} bytes", sample.stream_id, sample.timestamp_us, bytes.len());
//! }
//! ```

pub mod boxes;
pub mod codec;
pub mod demuxer;
pub mod perf;
pub mod sample_table;
pub mod stream;

// Re-export main types and functions
pub use boxes::{BoxHeader, MovBox};
pub use demuxer::{DemuxOptions, FileType, MovieInfo, Mp4Demuxer, StreamBitRate, StreamFrameRate};
pub use sample_table::{Sample, SampleTable};
pub use stream::{AudioParams, StreamContext, StreamKind, VideoParams};
