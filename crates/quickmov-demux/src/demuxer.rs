//! The demuxer facade
//!
//! [`Mp4Demuxer`] ties the box tree, stream descriptors and sample tables
//! together behind a small lifecycle: `open` → `init` → cursor/seek/info
//! calls → `close`. The buffer parameter is generic so callers can hand in
//! a borrowed `&[u8]`, an owned `Vec<u8>` or a memory mapping; sample data
//! always comes back as a non-owning slice of that buffer.

use crate::boxes::{self, MovBox, FTYP, MDAT, MOOV, MVHD, STBL, TRAK};
use crate::perf::ParseTimings;
use crate::sample_table::{self, div_round_half_even, ticks_to_micros, Sample, SampleTable};
use crate::stream::{self, StreamContext, StreamKind};
use quickmov_core::limits::{validate_total_samples, MAX_TRACKS};
use quickmov_core::warning::emit;
use quickmov_core::{ByteReader, DemuxError, FourCc, Result, Warning, WarningKind};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// What the caller wants out of the file.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DemuxOptions {
    pub enable_video: bool,
    pub enable_audio: bool,
    /// Log parse phases and stream summaries at debug level
    pub debug: bool,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            enable_video: true,
            enable_audio: true,
            debug: false,
        }
    }
}

/// Decoded `ftyp` box.
#[derive(Debug, Clone, Serialize)]
pub struct FileType {
    pub major_brand: FourCc,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCc>,
}

/// Snapshot of the movie-level facts, returned by [`Mp4Demuxer::info`].
#[derive(Debug, Clone, Serialize)]
pub struct MovieInfo {
    /// Movie duration in movie-timescale ticks
    pub duration: u64,
    /// Movie timescale in ticks per second
    pub time_scale: u32,
    /// Movie duration converted to microseconds
    pub duration_us: i64,
    /// Total entries in the merged sample index
    pub sample_count: usize,
    pub ftyp: Option<FileType>,
    pub streams: Vec<StreamContext>,
}

/// Frame-rate projection for one video stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamFrameRate {
    pub stream_id: u32,
    /// Exact rate; only present for constant-rate streams
    pub frame_rate: Option<f32>,
    pub avg_frame_rate: Option<f32>,
    pub is_constant: bool,
}

/// Bit-rate projection for one stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamBitRate {
    pub stream_id: u32,
    pub bit_rate: Option<u32>,
    pub avg_bit_rate: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unparsed,
    Initialised,
    Closed,
}

/// Everything `init()` produces in one pass.
struct ParsedMovie {
    ftyp: Option<FileType>,
    time_scale: u32,
    duration: u64,
    streams: Vec<StreamContext>,
    tables: HashMap<u32, SampleTable>,
    mdat_offset: u64,
    mdat_size: u64,
    samples: Vec<Sample>,
}

/// Pull-style MOV/MP4 demuxer over an in-memory buffer.
///
/// Not thread-safe: the cursor is plain mutable state. The buffer must
/// stay untouched for the demuxer's lifetime; all returned sample slices
/// alias it.
#[derive(Debug)]
pub struct Mp4Demuxer<B: AsRef<[u8]>> {
    data: B,
    options: DemuxOptions,
    state: State,
    ftyp: Option<FileType>,
    time_scale: u32,
    duration: u64,
    streams: Vec<StreamContext>,
    tables: HashMap<u32, SampleTable>,
    mdat_offset: u64,
    mdat_size: u64,
    samples: Vec<Sample>,
    cursor: usize,
    warnings: Vec<Warning>,
    timings: ParseTimings,
}

impl Mp4Demuxer<Vec<u8>> {
    /// Convenience constructor that reads and owns a whole file.
    pub fn open_file(path: impl AsRef<Path>, options: DemuxOptions) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::open(data, options))
    }
}

impl<B: AsRef<[u8]>> Mp4Demuxer<B> {
    /// Wrap a buffer. Nothing is parsed until [`init`](Self::init).
    pub fn open(data: B, options: DemuxOptions) -> Self {
        Self {
            data,
            options,
            state: State::Unparsed,
            ftyp: None,
            time_scale: 0,
            duration: 0,
            streams: Vec::new(),
            tables: HashMap::new(),
            mdat_offset: 0,
            mdat_size: 0,
            samples: Vec::new(),
            cursor: 0,
            warnings: Vec::new(),
            timings: ParseTimings::new(),
        }
    }

    /// Parse the container and build the merged sample index.
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            State::Unparsed => {}
            State::Initialised => {
                return Err(DemuxError::InvalidState("init() called twice"));
            }
            State::Closed => return Err(DemuxError::InvalidState("demuxer is closed")),
        }

        let mut warnings = Vec::new();
        let mut timings = ParseTimings::new();
        let parsed = Self::parse(self.data.as_ref(), self.options, &mut warnings, &mut timings);

        // Warnings and timings survive a failed init: they explain it.
        self.warnings = warnings;
        self.timings = timings;
        let parsed = parsed?;

        self.ftyp = parsed.ftyp;
        self.time_scale = parsed.time_scale;
        self.duration = parsed.duration;
        self.streams = parsed.streams;
        self.tables = parsed.tables;
        self.mdat_offset = parsed.mdat_offset;
        self.mdat_size = parsed.mdat_size;
        self.samples = parsed.samples;
        self.cursor = 0;
        self.state = State::Initialised;

        if self.options.debug {
            self.timings.log();
            tracing::debug!(
                streams = self.streams.len(),
                samples = self.samples.len(),
                warnings = self.warnings.len(),
                "demuxer initialised"
            );
        }
        Ok(())
    }

    fn parse(
        data: &[u8],
        options: DemuxOptions,
        warnings: &mut Vec<Warning>,
        timings: &mut ParseTimings,
    ) -> Result<ParsedMovie> {
        if data.is_empty() {
            return Err(DemuxError::InvalidFileFormat("empty input buffer".to_string()));
        }

        let started = Instant::now();
        let tree = boxes::parse_boxes(data, warnings)?;
        timings.record("parse_boxes", started);

        let moov = boxes::find(&tree, MOOV).ok_or(DemuxError::MissingRequiredBox("moov"))?;

        // A file without ftyp is still a valid movie
        let ftyp = match tree.iter().find(|b| b.box_type() == FTYP) {
            Some(node) => Some(parse_ftyp(data, node)?),
            None => None,
        };

        let mvhd =
            boxes::find(moov.children(), MVHD).ok_or(DemuxError::MissingRequiredBox("mvhd"))?;
        let (time_scale, duration) = parse_mvhd(data, mvhd)?;

        let mdat = tree.iter().find(|node| node.box_type() == MDAT);
        let (mdat_offset, mdat_size) = match mdat {
            Some(node) => (node.header().payload_offset(), node.header().payload_len()),
            None => (0, 0),
        };
        let mdat_end = mdat.map(|node| node.header().payload_offset() + node.header().payload_len());

        let started = Instant::now();
        let mut traks = boxes::find_all(moov.children(), TRAK);
        if traks.len() > MAX_TRACKS {
            emit(
                warnings,
                Warning::new(
                    WarningKind::SkippedTrack,
                    format!("{} traks declared, only the first {} kept", traks.len(), MAX_TRACKS),
                ),
            );
            traks.truncate(MAX_TRACKS);
        }

        let mut kept: Vec<(StreamContext, &MovBox)> = Vec::new();
        let mut advertised_video = 0usize;
        let mut advertised_audio = 0usize;
        for (index, trak) in traks.iter().copied().enumerate() {
            let id = index as u32;
            let context = match stream::parse_track(trak, data, id, warnings) {
                Ok(Some(context)) => context,
                Ok(None) => continue,
                Err(err) => {
                    emit(
                        warnings,
                        Warning::new(
                            WarningKind::SkippedTrack,
                            format!("track {}: {}", id, err),
                        ),
                    );
                    continue;
                }
            };
            let enabled = match context.kind {
                StreamKind::Video => {
                    advertised_video += 1;
                    options.enable_video
                }
                StreamKind::Audio => {
                    advertised_audio += 1;
                    options.enable_audio
                }
            };
            if !enabled {
                tracing::debug!(track = id, kind = ?context.kind, "track disabled by options");
                continue;
            }
            kept.push((context, trak));
        }
        timings.record("parse_streams", started);

        let started = Instant::now();
        let mut streams = Vec::with_capacity(kept.len());
        let mut tables = HashMap::new();
        let mut samples: Vec<Sample> = Vec::new();
        let mut video_samples = 0usize;
        let mut audio_samples = 0usize;
        for (mut context, trak) in kept {
            let Some(stbl) = boxes::find(trak.children(), STBL) else {
                emit(
                    warnings,
                    Warning::new(
                        WarningKind::SkippedTrack,
                        format!("track {}: no sample table", context.id),
                    ),
                );
                continue;
            };

            let table = sample_table::decode_sample_table(stbl, data, warnings)?;
            let track_samples =
                sample_table::build_samples(&table, context.id, context.time_scale, mdat_end, warnings)?;

            if let Some(video) = context.video.as_mut() {
                if let Some(rate) = stream::derive_frame_rate(&table.time_to_sample, context.time_scale)
                {
                    video.frame_rate = rate.constant;
                    video.avg_frame_rate = Some(rate.average);
                }
            }

            let total_bytes: u64 = track_samples.iter().map(|s| s.size as u64).sum();
            context.avg_bit_rate = average_bit_rate(total_bytes, context.duration, context.time_scale);
            // Nothing in the container states a nominal rate, so the
            // measured average stands in for it.
            context.bit_rate = context.avg_bit_rate;

            match context.kind {
                StreamKind::Video => video_samples += track_samples.len(),
                StreamKind::Audio => audio_samples += track_samples.len(),
            }
            samples.extend_from_slice(&track_samples);
            tables.insert(context.id, table);
            streams.push(context);
        }
        validate_total_samples(samples.len())?;
        timings.record("build_index", started);

        if options.enable_video && advertised_video > 0 && video_samples == 0 {
            return Err(DemuxError::InvalidSampleTable(
                "moov advertises video tracks but their tables yield no samples".to_string(),
            ));
        }
        if options.enable_audio && advertised_audio > 0 && audio_samples == 0 {
            return Err(DemuxError::InvalidSampleTable(
                "moov advertises audio tracks but their tables yield no samples".to_string(),
            ));
        }

        let started = Instant::now();
        // Stable sort: equal timestamps keep stream id order, then the
        // original per-track order
        samples.sort_by_key(|sample| (sample.timestamp_us, sample.stream_id));
        timings.record("sort_samples", started);

        Ok(ParsedMovie {
            ftyp,
            time_scale,
            duration,
            streams,
            tables,
            mdat_offset,
            mdat_size,
            samples,
        })
    }

    /// Drop the sample index and bar further use. Idempotent.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.samples = Vec::new();
        self.tables = HashMap::new();
        self.streams = Vec::new();
        self.cursor = 0;
        self.state = State::Closed;
    }

    fn require_init(&self) -> Result<()> {
        match self.state {
            State::Initialised => Ok(()),
            State::Unparsed => Err(DemuxError::InvalidState("init() has not been called")),
            State::Closed => Err(DemuxError::InvalidState("demuxer is closed")),
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Next sample in merged timestamp order, or `None` at the end.
    pub fn next_sample(&mut self) -> Option<Sample> {
        if self.state != State::Initialised {
            return None;
        }
        let sample = self.samples.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(sample)
    }

    /// The encoded bytes of a sample, as a view into the buffer.
    pub fn sample_data(&self, sample: &Sample) -> Result<&[u8]> {
        self.require_init()?;
        let data = self.data.as_ref();
        let start = sample.file_offset as usize;
        let end = start
            .checked_add(sample.size as usize)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| DemuxError::CorruptData {
                offset: sample.file_offset,
                message: format!(
                    "sample range {}..{} outside buffer of {} bytes",
                    sample.file_offset,
                    sample.file_offset + sample.size as u64,
                    data.len()
                ),
            })?;
        Ok(&data[start..end])
    }

    /// Move the cursor to the nearest keyframe at or before `target_us`.
    ///
    /// Clamps out-of-range targets; a target before the first keyframe
    /// lands on the first sample. Never fails on an initialised demuxer.
    pub fn seek(&mut self, target_us: i64) -> Result<()> {
        self.require_init()?;
        if self.samples.is_empty() {
            return Ok(());
        }
        let mut cursor = 0;
        for (index, sample) in self.samples.iter().enumerate() {
            if sample.timestamp_us > target_us {
                break;
            }
            if sample.keyframe {
                cursor = index;
            }
        }
        self.cursor = cursor;
        Ok(())
    }

    /// Rewind the cursor to the first sample.
    pub fn reset(&mut self) -> Result<()> {
        self.require_init()?;
        self.cursor = 0;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Info
    // ------------------------------------------------------------------

    pub fn info(&self) -> Result<MovieInfo> {
        self.require_init()?;
        Ok(MovieInfo {
            duration: self.duration,
            time_scale: self.time_scale,
            duration_us: ticks_to_micros(self.duration, self.time_scale),
            sample_count: self.samples.len(),
            ftyp: self.ftyp.clone(),
            streams: self.streams.clone(),
        })
    }

    /// Frame-rate figures for every video stream.
    pub fn frame_rate_info(&self) -> Result<Vec<StreamFrameRate>> {
        self.require_init()?;
        Ok(self
            .streams
            .iter()
            .filter_map(|context| {
                context.video.as_ref().map(|video| StreamFrameRate {
                    stream_id: context.id,
                    frame_rate: video.frame_rate,
                    avg_frame_rate: video.avg_frame_rate,
                    is_constant: video.frame_rate.is_some(),
                })
            })
            .collect())
    }

    /// Bit-rate figures for every stream.
    pub fn bit_rate_info(&self) -> Result<Vec<StreamBitRate>> {
        self.require_init()?;
        Ok(self
            .streams
            .iter()
            .map(|context| StreamBitRate {
                stream_id: context.id,
                bit_rate: context.bit_rate,
                avg_bit_rate: context.avg_bit_rate,
            })
            .collect())
    }

    /// Non-fatal deviations collected so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Phase timings from the last `init()`.
    pub fn timings(&self) -> &ParseTimings {
        &self.timings
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Random access into the merged index.
    pub fn sample_at(&self, index: usize) -> Result<Sample> {
        self.require_init()?;
        self.samples
            .get(index)
            .copied()
            .ok_or(DemuxError::SampleNotFound(index))
    }

    /// Stream descriptor by id.
    pub fn stream(&self, stream_id: u32) -> Result<&StreamContext> {
        self.require_init()?;
        self.streams
            .iter()
            .find(|context| context.id == stream_id)
            .ok_or(DemuxError::StreamNotFound(stream_id))
    }

    /// Raw sample tables of a stream, as decoded.
    pub fn sample_table(&self, stream_id: u32) -> Result<&SampleTable> {
        self.require_init()?;
        self.tables
            .get(&stream_id)
            .ok_or(DemuxError::StreamNotFound(stream_id))
    }

    /// Codec configuration bytes for a stream, verbatim from `stsd`.
    pub fn extra_data(&self, stream_id: u32) -> Result<Option<&[u8]>> {
        let context = self.stream(stream_id)?;
        Ok(context
            .extra_data
            .as_ref()
            .map(|range| &self.data.as_ref()[range.clone()]))
    }

    /// Start of the media-data payload.
    pub fn mdat_offset(&self) -> u64 {
        self.mdat_offset
    }

    /// Length of the media-data payload.
    pub fn mdat_size(&self) -> u64 {
        self.mdat_size
    }
}

/// `ftyp`: brand bookkeeping.
fn parse_ftyp(data: &[u8], node: &MovBox) -> Result<FileType> {
    let payload = node
        .payload()
        .ok_or(DemuxError::MissingRequiredBox("ftyp"))?;
    let mut reader = ByteReader::new(data);
    reader.seek(payload.start as u64)?;
    let mut reader = reader.sub_reader(payload.len())?;

    let major_brand = reader.read_fourcc()?;
    let minor_version = reader.read_u32()?;
    let mut compatible_brands = Vec::new();
    while reader.remaining() >= 4 {
        compatible_brands.push(reader.read_fourcc()?);
    }
    Ok(FileType {
        major_brand,
        minor_version,
        compatible_brands,
    })
}

/// `mvhd`: movie timescale and duration, v0 or v1.
fn parse_mvhd(data: &[u8], node: &MovBox) -> Result<(u32, u64)> {
    let payload = node
        .payload()
        .ok_or(DemuxError::MissingRequiredBox("mvhd"))?;
    let mut reader = ByteReader::new(data);
    reader.seek(payload.start as u64)?;
    let mut reader = reader.sub_reader(payload.len())?;

    let version = reader.read_u8()?;
    reader.skip(3)?; // flags
    if version == 1 {
        reader.skip(16)?; // creation + modification
        let time_scale = reader.read_u32()?;
        let duration = reader.read_u64()?;
        Ok((time_scale, duration))
    } else {
        reader.skip(8)?;
        let time_scale = reader.read_u32()?;
        let duration = reader.read_u32()? as u64;
        Ok((time_scale, duration))
    }
}

/// Average bit rate over the whole track, rounded half to even.
fn average_bit_rate(total_bytes: u64, duration_ticks: u64, time_scale: u32) -> Option<u32> {
    if duration_ticks == 0 || time_scale == 0 || total_bytes == 0 {
        return None;
    }
    let bits = total_bytes as u128 * 8 * time_scale as u128;
    let rate = div_round_half_even(bits, duration_ticks as u128);
    Some(rate.min(u32::MAX as u128) as u32)
}
