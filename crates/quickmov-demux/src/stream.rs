//! Per-track stream descriptors
//!
//! One `trak` box describes one elementary stream. This module decodes the
//! media header (`mdhd`), the handler (`hdlr`, which decides video vs
//! audio) and the first sample-description entry (`stsd`), producing a
//! [`StreamContext`]. Tracks with other handler types (hint, subtitle,
//! metadata) are skipped.

use crate::boxes::{self, MovBox, HDLR, MDHD, MDIA, MINF, STBL, STSD};
use crate::codec;
use crate::sample_table::TimeToSample;
use quickmov_core::{ByteReader, DemuxError, FourCc, Result, Warning};
use serde::Serialize;
use std::ops::Range;

/// Media kind of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Video-only attributes from the sample description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub depth: u16,
    /// Compressor name from the legacy QuickTime Pascal-string field
    pub compressor: Option<String>,
    /// Exact rate when every stts delta agrees
    pub frame_rate: Option<f32>,
    pub avg_frame_rate: Option<f32>,
}

/// Audio-only attributes from the sample description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    /// Decoded from the 16.16 fixed-point field
    pub sample_rate: f32,
    pub channels: u16,
    pub bit_depth: u16,
}

/// Everything known about one demuxable track.
///
/// Timestamps are media-timeline values: edit lists (`elst`) are not
/// applied, so a file using one will present shifted relative to the raw
/// media times reported here.
#[derive(Debug, Clone, Serialize)]
pub struct StreamContext {
    /// File-order index of the trak
    pub id: u32,
    pub kind: StreamKind,
    /// Raw sample-entry fourcc from stsd
    pub codec_fourcc: FourCc,
    /// Canonical codec string for decoder configuration
    pub codec: String,
    /// Ticks per second of this track's timeline
    pub time_scale: u32,
    /// Track duration in ticks
    pub duration: u64,
    /// Codec-specific configuration bytes, verbatim from the sample entry
    #[serde(skip)]
    pub extra_data: Option<Range<usize>>,
    pub video: Option<VideoParams>,
    pub audio: Option<AudioParams>,
    /// Nominal bit rate in bits per second
    pub bit_rate: Option<u32>,
    /// Measured average bit rate in bits per second
    pub avg_bit_rate: Option<u32>,
}

impl StreamContext {
    pub fn is_video(&self) -> bool {
        self.kind == StreamKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == StreamKind::Audio
    }
}

fn payload_reader<'a>(data: &'a [u8], payload: &Range<usize>) -> Result<ByteReader<'a>> {
    let mut reader = ByteReader::new(data);
    reader.seek(payload.start as u64)?;
    reader.sub_reader(payload.len())
}

/// Decode a trak into a stream descriptor.
///
/// Returns `Ok(None)` for tracks the demuxer does not handle (non-AV
/// handlers, missing sample description).
pub fn parse_track(
    trak: &MovBox,
    data: &[u8],
    id: u32,
    warnings: &mut Vec<Warning>,
) -> Result<Option<StreamContext>> {
    let mdia = match boxes::find_path(trak.children(), &[MDIA]) {
        Some(mdia) => mdia,
        None => {
            tracing::debug!(track = id, "trak without mdia skipped");
            return Ok(None);
        }
    };

    let mdhd = boxes::find_path(mdia.children(), &[MDHD])
        .ok_or(DemuxError::MissingRequiredBox("mdhd"))?;
    let (time_scale, duration) = parse_mdhd(data, mdhd)?;

    let Some(hdlr) = boxes::find_path(mdia.children(), &[HDLR]) else {
        tracing::debug!(track = id, "trak without hdlr skipped");
        return Ok(None);
    };
    let kind = match parse_hdlr(data, hdlr)? {
        subtype if subtype == *b"vide" => StreamKind::Video,
        subtype if subtype == *b"soun" => StreamKind::Audio,
        subtype => {
            tracing::debug!(track = id, handler = %subtype, "non-AV track skipped");
            return Ok(None);
        }
    };

    let Some(stsd) = boxes::find_path(mdia.children(), &[MINF, STBL, STSD]) else {
        tracing::debug!(track = id, "trak without stsd skipped");
        return Ok(None);
    };

    let mut context = parse_stsd(data, stsd, kind, id, warnings)?;
    context.time_scale = time_scale;
    context.duration = duration;
    Ok(Some(context))
}

/// `mdhd`: media time scale and duration, v0 (32-bit) or v1 (64-bit).
fn parse_mdhd(data: &[u8], mdhd: &MovBox) -> Result<(u32, u64)> {
    let payload = mdhd
        .payload()
        .ok_or(DemuxError::MissingRequiredBox("mdhd"))?;
    let mut reader = payload_reader(data, payload)?;

    let version = reader.read_u8()?;
    reader.skip(3)?; // flags
    if version == 1 {
        reader.skip(16)?; // creation + modification (64-bit)
        let time_scale = reader.read_u32()?;
        let duration = reader.read_u64()?;
        Ok((time_scale, duration))
    } else {
        reader.skip(8)?; // creation + modification (32-bit)
        let time_scale = reader.read_u32()?;
        let duration = reader.read_u32()? as u64;
        Ok((time_scale, duration))
    }
}

/// `hdlr`: returns the component subtype that classifies the track.
fn parse_hdlr(data: &[u8], hdlr: &MovBox) -> Result<FourCc> {
    let payload = hdlr
        .payload()
        .ok_or(DemuxError::MissingRequiredBox("hdlr"))?;
    let mut reader = payload_reader(data, payload)?;

    reader.skip(4)?; // version + flags
    reader.skip(4)?; // pre_defined / component type
    reader.read_fourcc()
}

/// `stsd`: first sample-description entry only.
fn parse_stsd(
    data: &[u8],
    stsd: &MovBox,
    kind: StreamKind,
    id: u32,
    warnings: &mut Vec<Warning>,
) -> Result<StreamContext> {
    let payload = stsd
        .payload()
        .ok_or(DemuxError::MissingRequiredBox("stsd"))?;
    let mut reader = payload_reader(data, payload)?;

    reader.skip(4)?; // version + flags
    let entry_count = reader.read_u32()?;
    if entry_count == 0 {
        return Err(DemuxError::InvalidFileFormat(format!(
            "track {}: stsd declares no sample descriptions",
            id
        )));
    }

    let entry_size = reader.read_u32()? as usize;
    let codec_fourcc = reader.read_fourcc()?;
    if entry_size < 16 {
        return Err(DemuxError::InvalidBoxSize {
            offset: reader.file_position() - 8,
            size: entry_size as u64,
        });
    }
    // Scope the rest of the entry: entry_size covers the 8 bytes already read
    let mut entry = reader.sub_reader(entry_size - 8)?;

    entry.skip(6)?; // reserved
    let _data_reference_index = entry.read_u16()?;

    let codec = codec::canonical(kind, codec_fourcc, warnings);

    match kind {
        StreamKind::Video => {
            entry.skip(16)?; // pre_defined, reserved, pre_defined[3]
            let width = entry.read_u16()? as u32;
            let height = entry.read_u16()? as u32;
            entry.skip(4)?; // horizresolution 16.16
            entry.skip(4)?; // vertresolution 16.16
            entry.skip(4)?; // reserved
            entry.skip(2)?; // frame_count
            let compressor = read_compressor_name(&mut entry)?;
            let depth = entry.read_u16()?;
            entry.skip(2)?; // pre_defined

            let extra_data = remaining_range(&entry);
            Ok(StreamContext {
                id,
                kind,
                codec_fourcc,
                codec,
                time_scale: 0,
                duration: 0,
                extra_data,
                video: Some(VideoParams {
                    width,
                    height,
                    depth,
                    compressor,
                    frame_rate: None,
                    avg_frame_rate: None,
                }),
                audio: None,
                bit_rate: None,
                avg_bit_rate: None,
            })
        }
        StreamKind::Audio => {
            entry.skip(8)?; // version, revision, vendor
            let channels = entry.read_u16()?;
            let bit_depth = entry.read_u16()?;
            let _compression_id = entry.read_i16()?;
            let _packet_size = entry.read_u16()?;
            let sample_rate = entry.read_fixed16_16()? as f32;

            let extra_data = remaining_range(&entry);
            Ok(StreamContext {
                id,
                kind,
                codec_fourcc,
                codec,
                time_scale: 0,
                duration: 0,
                extra_data,
                video: None,
                audio: Some(AudioParams {
                    sample_rate,
                    channels,
                    bit_depth,
                }),
                bit_rate: None,
                avg_bit_rate: None,
            })
        }
    }
}

/// Legacy QuickTime compressor name: 1 length byte + 31 bytes of padding.
fn read_compressor_name(entry: &mut ByteReader<'_>) -> Result<Option<String>> {
    let len = entry.read_u8()? as usize;
    let field = entry.read_bytes(31)?;
    if len == 0 || len > 31 {
        return Ok(None);
    }
    let name: String = field[..len]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
        .collect();
    Ok(Some(name))
}

/// Byte range of whatever the reader has not consumed, as file offsets.
fn remaining_range(reader: &ByteReader<'_>) -> Option<Range<usize>> {
    if reader.is_empty() {
        return None;
    }
    let start = reader.file_position() as usize;
    Some(start..start + reader.remaining())
}

/// Frame rates derived from the time-to-sample table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameRate {
    /// Exact rate; present only when the stream is constant-rate
    pub constant: Option<f32>,
    pub average: f32,
}

/// Derive frame rates per the stts contents.
///
/// Constant rate exists iff every delta agrees; the average always comes
/// from totals. Both round to 3 decimals. Degenerate tables (no entries,
/// zero total duration) yield `None`.
pub fn derive_frame_rate(entries: &[TimeToSample], time_scale: u32) -> Option<FrameRate> {
    if entries.is_empty() || time_scale == 0 {
        return None;
    }
    let total_samples: u64 = entries.iter().map(|e| e.count as u64).sum();
    let total_ticks: u64 = entries
        .iter()
        .map(|e| e.count as u64 * e.delta as u64)
        .sum();
    if total_samples == 0 || total_ticks == 0 {
        return None;
    }

    let average = round3(total_samples as f64 * time_scale as f64 / total_ticks as f64);

    let first_delta = entries[0].delta;
    let constant = if first_delta > 0 && entries.iter().all(|e| e.delta == first_delta) {
        Some(round3(time_scale as f64 / first_delta as f64))
    } else {
        None
    };

    Some(FrameRate { constant, average })
}

fn round3(value: f64) -> f32 {
    ((value * 1000.0).round() / 1000.0) as f32
}
