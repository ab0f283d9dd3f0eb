//! Sample-table decoding and flat index construction
//!
//! A track's `stbl` spreads the information about one sample across five
//! tables: sizes (`stsz`/`stz2`), chunk offsets (`stco`/`co64`), the
//! sample-to-chunk map (`stsc`), decode-time deltas (`stts`) and the
//! optional sync-sample list (`stss`). [`decode_sample_table`] parses each
//! table independently; [`build_samples`] walks them in lockstep to
//! materialise one flat, time-ordered [`Sample`] record per sample.

use crate::boxes::{MovBox, CO64, STCO, STSC, STSS, STSZ, STTS, STZ2};
use quickmov_core::limits::{validate_entry_count, validate_total_samples};
use quickmov_core::warning::emit;
use quickmov_core::{ByteReader, DemuxError, Result, Warning, WarningKind};
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;

/// One `stsc` run: chunks `first_chunk..` (1-based) each hold
/// `samples_per_chunk` samples described by `desc_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub desc_index: u32,
}

/// One `stts` run: `count` consecutive samples each lasting `delta` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSample {
    pub count: u32,
    pub delta: u32,
}

/// Raw per-track sample tables, decoded but not yet cross-referenced.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub sizes: Vec<u32>,
    pub chunk_offsets: Vec<u64>,
    pub sample_to_chunk: Vec<SampleToChunk>,
    pub time_to_sample: Vec<TimeToSample>,
    /// 1-based sample numbers that are sync samples; `None` means every
    /// sample is a keyframe
    pub sync_samples: Option<Vec<u32>>,
}

impl SampleTable {
    /// Number of samples the size table accounts for.
    pub fn sample_count(&self) -> usize {
        self.sizes.len()
    }
}

/// One entry of the flat sample index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Track the sample belongs to (file order of the trak)
    pub stream_id: u32,
    /// Absolute byte offset of the encoded data
    pub file_offset: u64,
    /// Encoded size in bytes
    pub size: u32,
    /// Decode timestamp in microseconds
    pub timestamp_us: i64,
    /// Duration in microseconds
    pub duration_us: u32,
    /// Whether the sample is decodable without prior samples
    pub keyframe: bool,
}

/// Convert stream-time ticks to microseconds, rounding half to even.
///
/// Kept in integer arithmetic end to end; the only rounding happens here
/// so timestamps and durations cannot drift apart.
pub fn ticks_to_micros(ticks: u64, time_scale: u32) -> i64 {
    if time_scale == 0 {
        return 0;
    }
    div_round_half_even(ticks as u128 * 1_000_000, time_scale as u128) as i64
}

/// Integer division rounding half to even, shared by every derived figure.
pub(crate) fn div_round_half_even(n: u128, d: u128) -> u128 {
    let q = n / d;
    let r = n % d;
    match (r * 2).cmp(&d) {
        Ordering::Less => q,
        Ordering::Greater => q + 1,
        Ordering::Equal => {
            if q % 2 == 0 {
                q
            } else {
                q + 1
            }
        }
    }
}

/// Scope a reader to a leaf payload within the file buffer.
fn payload_reader<'a>(data: &'a [u8], payload: &Range<usize>) -> Result<ByteReader<'a>> {
    let mut reader = ByteReader::new(data);
    reader.seek(payload.start as u64)?;
    reader.sub_reader(payload.len())
}

/// Read the 1-byte version + 3-byte flags prefix every sample table carries.
fn read_fullbox_header(reader: &mut ByteReader<'_>) -> Result<(u8, u32)> {
    let version = reader.read_u8()?;
    let flags = reader.read_u24()?;
    Ok((version, flags))
}

/// Decode all sample tables under one `stbl` box.
pub fn decode_sample_table(
    stbl: &MovBox,
    data: &[u8],
    warnings: &mut Vec<Warning>,
) -> Result<SampleTable> {
    let mut table = SampleTable::default();

    for child in stbl.children() {
        let Some(payload) = child.payload() else {
            continue;
        };
        let mut reader = payload_reader(data, payload)?;

        let box_type = child.box_type();
        if box_type == STSZ {
            table.sizes = parse_stsz(&mut reader, warnings)?;
        } else if box_type == STZ2 {
            table.sizes = parse_stz2(&mut reader, warnings)?;
        } else if box_type == STCO {
            table.chunk_offsets = parse_chunk_offsets(&mut reader, false, warnings)?;
        } else if box_type == CO64 {
            table.chunk_offsets = parse_chunk_offsets(&mut reader, true, warnings)?;
        } else if box_type == STSC {
            table.sample_to_chunk = parse_stsc(&mut reader, warnings)?;
        } else if box_type == STTS {
            table.time_to_sample = parse_stts(&mut reader, warnings)?;
        } else if box_type == STSS {
            table.sync_samples = Some(parse_stss(&mut reader, warnings)?);
        }
    }

    Ok(table)
}

/// `stsz`: uniform size or one 32-bit size per sample.
fn parse_stsz(reader: &mut ByteReader<'_>, warnings: &mut Vec<Warning>) -> Result<Vec<u32>> {
    read_fullbox_header(reader)?;
    let uniform_size = reader.read_u32()?;
    let count = reader.read_u32()?;
    validate_entry_count(count, "stsz")?;

    if uniform_size != 0 {
        return Ok(vec![uniform_size; count as usize]);
    }

    let mut sizes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match reader.read_u32() {
            Ok(size) => sizes.push(size),
            Err(_) => {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::TruncatedTable,
                        reader.file_position(),
                        format!("stsz ends after {} of {} entries", sizes.len(), count),
                    ),
                );
                break;
            }
        }
    }
    Ok(sizes)
}

/// `stz2`: packed sample sizes with 4-, 8- or 16-bit fields.
fn parse_stz2(reader: &mut ByteReader<'_>, warnings: &mut Vec<Warning>) -> Result<Vec<u32>> {
    read_fullbox_header(reader)?;
    reader.skip(3)?; // reserved
    let field_size = reader.read_u8()?;
    let count = reader.read_u32()?;
    validate_entry_count(count, "stz2")?;

    let mut sizes = Vec::with_capacity(count as usize);
    let truncated = |sizes: &Vec<u32>, reader: &ByteReader<'_>, warnings: &mut Vec<Warning>| {
        emit(
            warnings,
            Warning::at_offset(
                WarningKind::TruncatedTable,
                reader.file_position(),
                format!("stz2 ends after {} of {} entries", sizes.len(), count),
            ),
        );
    };

    match field_size {
        4 => {
            // Two samples per byte, high nibble first
            let mut remaining = count as usize;
            while remaining > 0 {
                let Ok(byte) = reader.read_u8() else {
                    truncated(&sizes, reader, warnings);
                    break;
                };
                sizes.push((byte >> 4) as u32);
                remaining -= 1;
                if remaining > 0 {
                    sizes.push((byte & 0x0F) as u32);
                    remaining -= 1;
                }
            }
        }
        8 => {
            for _ in 0..count {
                let Ok(size) = reader.read_u8() else {
                    truncated(&sizes, reader, warnings);
                    break;
                };
                sizes.push(size as u32);
            }
        }
        16 => {
            for _ in 0..count {
                let Ok(size) = reader.read_u16() else {
                    truncated(&sizes, reader, warnings);
                    break;
                };
                sizes.push(size as u32);
            }
        }
        other => {
            return Err(DemuxError::InvalidSampleTable(format!(
                "stz2 field size {} is not 4, 8 or 16",
                other
            )));
        }
    }
    Ok(sizes)
}

/// `stco` (32-bit) / `co64` (64-bit): absolute chunk start offsets.
fn parse_chunk_offsets(
    reader: &mut ByteReader<'_>,
    wide: bool,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<u64>> {
    read_fullbox_header(reader)?;
    let count = reader.read_u32()?;
    validate_entry_count(count, if wide { "co64" } else { "stco" })?;

    let mut offsets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = if wide {
            reader.read_u64()
        } else {
            reader.read_u32().map(u64::from)
        };
        match offset {
            Ok(offset) => offsets.push(offset),
            Err(_) => {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::TruncatedTable,
                        reader.file_position(),
                        format!(
                            "{} ends after {} of {} entries",
                            if wide { "co64" } else { "stco" },
                            offsets.len(),
                            count
                        ),
                    ),
                );
                break;
            }
        }
    }
    Ok(offsets)
}

/// `stsc`: sample-to-chunk runs.
fn parse_stsc(reader: &mut ByteReader<'_>, warnings: &mut Vec<Warning>) -> Result<Vec<SampleToChunk>> {
    read_fullbox_header(reader)?;
    let count = reader.read_u32()?;
    validate_entry_count(count, "stsc")?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let first_chunk = reader.read_u32();
        let samples_per_chunk = reader.read_u32();
        let desc_index = reader.read_u32();
        match (first_chunk, samples_per_chunk, desc_index) {
            (Ok(first_chunk), Ok(samples_per_chunk), Ok(desc_index)) => {
                entries.push(SampleToChunk {
                    first_chunk,
                    samples_per_chunk,
                    desc_index,
                });
            }
            _ => {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::TruncatedTable,
                        reader.file_position(),
                        format!("stsc ends after {} of {} entries", entries.len(), count),
                    ),
                );
                break;
            }
        }
    }
    Ok(entries)
}

/// `stts`: decode-time deltas as (count, delta) runs.
fn parse_stts(reader: &mut ByteReader<'_>, warnings: &mut Vec<Warning>) -> Result<Vec<TimeToSample>> {
    read_fullbox_header(reader)?;
    let count = reader.read_u32()?;
    validate_entry_count(count, "stts")?;

    let mut entries = Vec::with_capacity(count as usize);
    let mut total: usize = 0;
    for _ in 0..count {
        let sample_count = reader.read_u32();
        let delta = reader.read_u32();
        match (sample_count, delta) {
            (Ok(sample_count), Ok(delta)) => {
                total = total.saturating_add(sample_count as usize);
                validate_total_samples(total)?;
                entries.push(TimeToSample {
                    count: sample_count,
                    delta,
                });
            }
            _ => {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::TruncatedTable,
                        reader.file_position(),
                        format!("stts ends after {} of {} entries", entries.len(), count),
                    ),
                );
                break;
            }
        }
    }
    Ok(entries)
}

/// `stss`: 1-based sync-sample numbers. Kept 1-based as stored.
fn parse_stss(reader: &mut ByteReader<'_>, warnings: &mut Vec<Warning>) -> Result<Vec<u32>> {
    read_fullbox_header(reader)?;
    let count = reader.read_u32()?;
    validate_entry_count(count, "stss")?;

    let mut numbers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match reader.read_u32() {
            Ok(number) => numbers.push(number),
            Err(_) => {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::TruncatedTable,
                        reader.file_position(),
                        format!("stss ends after {} of {} entries", numbers.len(), count),
                    ),
                );
                break;
            }
        }
    }
    Ok(numbers)
}

/// Tracks the running `stts` position while walking samples in order.
struct TickAccumulator<'t> {
    entries: &'t [TimeToSample],
    entry_index: usize,
    remaining_in_entry: u32,
    ticks: u64,
    exhausted: bool,
}

impl<'t> TickAccumulator<'t> {
    fn new(entries: &'t [TimeToSample]) -> Self {
        let mut acc = Self {
            entries,
            entry_index: 0,
            remaining_in_entry: 0,
            ticks: 0,
            exhausted: entries.is_empty(),
        };
        if let Some(first) = entries.first() {
            acc.remaining_in_entry = first.count;
        }
        acc
    }

    /// DTS of the next sample plus its delta, advancing the cursor.
    fn next(&mut self) -> Option<(u64, u32)> {
        while self.remaining_in_entry == 0 {
            self.entry_index += 1;
            match self.entries.get(self.entry_index) {
                Some(entry) => self.remaining_in_entry = entry.count,
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        }
        if self.exhausted {
            return None;
        }
        let delta = self.entries[self.entry_index].delta;
        let dts = self.ticks;
        self.ticks += delta as u64;
        self.remaining_in_entry -= 1;
        Some((dts, delta))
    }
}

/// Materialise the flat sample index for one track.
///
/// `mdat_end` is the end of the media-data payload when known; chunks that
/// reach past it keep their samples but are flagged.
pub fn build_samples(
    table: &SampleTable,
    stream_id: u32,
    time_scale: u32,
    mdat_end: Option<u64>,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Sample>> {
    validate_total_samples(table.sizes.len())?;

    if table.time_to_sample.is_empty() && !table.sizes.is_empty() {
        emit(
            warnings,
            Warning::new(
                WarningKind::TruncatedTable,
                format!("stream {}: no stts entries, timestamps default to zero", stream_id),
            ),
        );
    }

    let mut samples = Vec::with_capacity(table.sizes.len());
    let mut ticks = TickAccumulator::new(&table.time_to_sample);
    let mut stsc_index = 0usize;
    let mut sample_index = 0usize; // 0-based global sample number
    let mut clamped = false;
    let mut timing_ran_out = false;

    'chunks: for (chunk_index, &chunk_offset) in table.chunk_offsets.iter().enumerate() {
        // Advance to the stsc run covering this chunk (first_chunk is 1-based)
        while stsc_index + 1 < table.sample_to_chunk.len()
            && table.sample_to_chunk[stsc_index + 1].first_chunk as usize <= chunk_index + 1
        {
            stsc_index += 1;
        }
        let samples_in_chunk = table
            .sample_to_chunk
            .get(stsc_index)
            .map(|entry| entry.samples_per_chunk)
            .unwrap_or(0);

        let mut offset = chunk_offset;
        let mut chunk_bytes: u64 = 0;

        for _ in 0..samples_in_chunk {
            if sample_index >= table.sizes.len() {
                if !clamped {
                    clamped = true;
                    emit(
                        warnings,
                        Warning::new(
                            WarningKind::InconsistentSampleCount,
                            format!(
                                "stream {}: stsc implies more samples than stsz holds ({}), index truncated",
                                stream_id,
                                table.sizes.len()
                            ),
                        ),
                    );
                }
                break 'chunks;
            }

            let size = table.sizes[sample_index];
            let (dts_ticks, delta) = match ticks.next() {
                Some(timing) => timing,
                None => {
                    if !table.time_to_sample.is_empty() && !timing_ran_out {
                        timing_ran_out = true;
                        emit(
                            warnings,
                            Warning::new(
                                WarningKind::InconsistentSampleCount,
                                format!(
                                    "stream {}: stts covers {} samples, stsz holds {}, index truncated",
                                    stream_id, sample_index, table.sizes.len()
                                ),
                            ),
                        );
                        break 'chunks;
                    }
                    (0, 0)
                }
            };

            if size == 0 {
                emit(
                    warnings,
                    Warning::new(
                        WarningKind::InconsistentSampleCount,
                        format!("stream {}: zero-size sample {} skipped", stream_id, sample_index + 1),
                    ),
                );
                sample_index += 1;
                continue;
            }

            let keyframe = match &table.sync_samples {
                // stss numbers samples from 1
                Some(numbers) => numbers.contains(&(sample_index as u32 + 1)),
                None => true,
            };

            samples.push(Sample {
                stream_id,
                file_offset: offset,
                size,
                timestamp_us: ticks_to_micros(dts_ticks, time_scale),
                duration_us: ticks_to_micros(delta as u64, time_scale) as u32,
                keyframe,
            });

            offset += size as u64;
            chunk_bytes += size as u64;
            sample_index += 1;
        }

        if let Some(mdat_end) = mdat_end {
            if chunk_bytes > 0 && chunk_offset + chunk_bytes > mdat_end {
                emit(
                    warnings,
                    Warning::at_offset(
                        WarningKind::SampleOutOfMediaData,
                        chunk_offset,
                        format!(
                            "stream {}: chunk {} ends at {} beyond media data end {}",
                            stream_id,
                            chunk_index + 1,
                            chunk_offset + chunk_bytes,
                            mdat_end
                        ),
                    ),
                );
            }
        }
    }

    Ok(samples)
}
