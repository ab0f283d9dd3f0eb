//! Malformed-input and option-handling tests for the demuxer
//!
//! Everything here feeds the demuxer deliberately damaged or unusual
//! files and checks the fatal-vs-recoverable split: hard failures only for
//! unusable movies, warnings plus best-effort output for everything else.

use quickmov_core::{DemuxError, WarningKind};
use quickmov_demux::{DemuxOptions, Mp4Demuxer, Sample};

// ============================================================================
// Fixture builders
// ============================================================================

fn boxx(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(payload);
    out
}

fn full_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut inner = vec![0u8; 4];
    inner.extend_from_slice(payload);
    boxx(box_type, &inner)
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}

fn u32s(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn mvhd(time_scale: u32, duration: u32) -> Vec<u8> {
    full_box(b"mvhd", &u32s(&[0, 0, time_scale, duration]))
}

fn mdhd(time_scale: u32, duration: u32) -> Vec<u8> {
    full_box(b"mdhd", &u32s(&[0, 0, time_scale, duration]))
}

fn hdlr(subtype: &[u8; 4]) -> Vec<u8> {
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(subtype);
    full_box(b"hdlr", &payload)
}

fn stts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = (entries.len() as u32).to_be_bytes().to_vec();
    for (count, delta) in entries {
        payload.extend_from_slice(&count.to_be_bytes());
        payload.extend_from_slice(&delta.to_be_bytes());
    }
    full_box(b"stts", &payload)
}

fn stsc(entries: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut payload = (entries.len() as u32).to_be_bytes().to_vec();
    for (first_chunk, samples_per_chunk, desc_index) in entries {
        payload.extend_from_slice(&first_chunk.to_be_bytes());
        payload.extend_from_slice(&samples_per_chunk.to_be_bytes());
        payload.extend_from_slice(&desc_index.to_be_bytes());
    }
    full_box(b"stsc", &payload)
}

fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut payload = 0u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
    payload.extend_from_slice(&u32s(sizes));
    full_box(b"stsz", &payload)
}

/// stsz that declares more entries than it carries.
fn truncated_stsz(declared: u32, sizes: &[u32]) -> Vec<u8> {
    let mut payload = 0u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&declared.to_be_bytes());
    payload.extend_from_slice(&u32s(sizes));
    full_box(b"stsz", &payload)
}

fn stz2(field_size: u8, count: u32, packed: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8, 0, 0]; // reserved
    payload.push(field_size);
    payload.extend_from_slice(&count.to_be_bytes());
    payload.extend_from_slice(packed);
    full_box(b"stz2", &payload)
}

fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut payload = (offsets.len() as u32).to_be_bytes().to_vec();
    payload.extend_from_slice(&u32s(offsets));
    full_box(b"stco", &payload)
}

/// Minimal sample entry that still parses as a VisualSampleEntry.
fn stsd_video(fourcc: &[u8; 4]) -> Vec<u8> {
    let mut entry = Vec::new();
    entry.extend_from_slice(&[0u8; 6]);
    entry.extend_from_slice(&1u16.to_be_bytes());
    entry.extend_from_slice(&[0u8; 16]);
    entry.extend_from_slice(&64u16.to_be_bytes()); // width
    entry.extend_from_slice(&64u16.to_be_bytes()); // height
    entry.extend_from_slice(&[0u8; 12]); // resolutions + reserved
    entry.extend_from_slice(&1u16.to_be_bytes()); // frame_count
    entry.extend_from_slice(&[0u8; 32]); // compressor
    entry.extend_from_slice(&24u16.to_be_bytes());
    entry.extend_from_slice(&(-1i16).to_be_bytes());

    let mut body = Vec::new();
    body.extend_from_slice(&((8 + entry.len()) as u32).to_be_bytes());
    body.extend_from_slice(fourcc);
    body.extend_from_slice(&entry);

    let mut payload = 1u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&body);
    full_box(b"stsd", &payload)
}

fn video_trak(stbl_children: &[Vec<u8>]) -> Vec<u8> {
    let stbl = boxx(b"stbl", &concat(stbl_children));
    let minf = boxx(b"minf", &stbl);
    let mdia = boxx(b"mdia", &concat(&[mdhd(600, 1200), hdlr(b"vide"), minf]));
    boxx(b"trak", &mdia)
}

fn movie(traks: &[Vec<u8>], mdat_len: usize) -> Vec<u8> {
    let mut parts = vec![mvhd(600, 1200)];
    parts.extend_from_slice(traks);
    let mut file = boxx(b"moov", &concat(&parts));
    file.extend_from_slice(&boxx(b"mdat", &vec![0xBB; mdat_len]));
    file
}

fn default_stbl() -> Vec<Vec<u8>> {
    vec![
        stsd_video(b"avc1"),
        stts(&[(4, 300)]),
        stsc(&[(1, 4, 1)]),
        stsz(&[10, 10, 10, 10]),
        stco(&[0]),
    ]
}

fn init_ok(data: Vec<u8>) -> Mp4Demuxer<Vec<u8>> {
    let mut demuxer = Mp4Demuxer::open(data, DemuxOptions::default());
    demuxer.init().expect("init");
    demuxer
}

fn has_warning(demuxer: &Mp4Demuxer<Vec<u8>>, kind: WarningKind) -> bool {
    demuxer.warnings().iter().any(|w| w.kind == kind)
}

// ============================================================================
// Truncated and inconsistent sample tables
// ============================================================================

#[test]
fn test_truncated_stsz_keeps_prefix() {
    let mut stbl = default_stbl();
    stbl[3] = truncated_stsz(4, &[10, 10]); // declares 4, carries 2
    let demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert_eq!(demuxer.sample_count(), 2);
    assert!(has_warning(&demuxer, WarningKind::TruncatedTable));
}

#[test]
fn test_stsc_overrun_clamps_to_size_table() {
    let mut stbl = default_stbl();
    stbl[2] = stsc(&[(1, 100, 1)]); // implies 100 samples per chunk
    let demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert_eq!(demuxer.sample_count(), 4);
    assert!(has_warning(&demuxer, WarningKind::InconsistentSampleCount));
}

#[test]
fn test_short_stts_trims_sample_index() {
    let mut stbl = default_stbl();
    stbl[1] = stts(&[(2, 300)]); // covers 2 of 4 samples
    let demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert_eq!(demuxer.sample_count(), 2);
    assert!(has_warning(&demuxer, WarningKind::InconsistentSampleCount));
}

#[test]
fn test_missing_stts_defaults_timestamps_to_zero() {
    let stbl = vec![
        stsd_video(b"avc1"),
        stsc(&[(1, 4, 1)]),
        stsz(&[10, 10, 10, 10]),
        stco(&[0]),
    ];
    let mut demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert!(has_warning(&demuxer, WarningKind::TruncatedTable));
    let samples: Vec<Sample> = std::iter::from_fn(|| demuxer.next_sample()).collect();
    assert_eq!(samples.len(), 4);
    assert!(samples.iter().all(|s| s.timestamp_us == 0));
}

#[test]
fn test_stz2_eight_bit_sizes() {
    let mut stbl = default_stbl();
    stbl[3] = stz2(8, 4, &[10, 20, 30, 40]);
    let mut demuxer = init_ok(movie(&[video_trak(&stbl)], 128));

    let sizes: Vec<u32> = std::iter::from_fn(|| demuxer.next_sample())
        .map(|s| s.size)
        .collect();
    assert_eq!(sizes, vec![10, 20, 30, 40]);
}

#[test]
fn test_zero_size_samples_are_skipped() {
    let mut stbl = default_stbl();
    stbl[3] = stsz(&[10, 0, 10, 10]);
    let demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert_eq!(demuxer.sample_count(), 3);
    assert!(has_warning(&demuxer, WarningKind::InconsistentSampleCount));
}

// ============================================================================
// Fatal table failures
// ============================================================================

#[test]
fn test_video_track_with_empty_tables_is_fatal() {
    let stbl = vec![
        stsd_video(b"avc1"),
        stts(&[]),
        stsc(&[]),
        stsz(&[]),
        stco(&[]),
    ];
    let mut demuxer = Mp4Demuxer::open(movie(&[video_trak(&stbl)], 64), DemuxOptions::default());

    let err = demuxer.init().unwrap_err();
    assert!(matches!(err, DemuxError::InvalidSampleTable(_)));
}

#[test]
fn test_disabled_kind_is_not_required_to_yield_samples() {
    let stbl = vec![
        stsd_video(b"avc1"),
        stts(&[]),
        stsc(&[]),
        stsz(&[]),
        stco(&[]),
    ];
    let options = DemuxOptions {
        enable_video: false,
        ..Default::default()
    };
    let mut demuxer = Mp4Demuxer::open(movie(&[video_trak(&stbl)], 64), options);

    // The only track is filtered out, so its empty tables are not fatal
    demuxer.init().expect("init");
    assert_eq!(demuxer.sample_count(), 0);
}

// ============================================================================
// Box-level damage
// ============================================================================

#[test]
fn test_oversized_child_keeps_parsed_siblings() {
    // moov = mvhd + valid trak + a trailing box that claims to be larger
    // than the bytes that remain
    let mut oversized = Vec::new();
    oversized.extend_from_slice(&4096u32.to_be_bytes());
    oversized.extend_from_slice(b"udta");

    let mut moov_payload = concat(&[mvhd(600, 1200), video_trak(&default_stbl())]);
    moov_payload.extend_from_slice(&oversized);
    let mut data = boxx(b"moov", &moov_payload);
    data.extend_from_slice(&boxx(b"mdat", &[0u8; 64]));

    let demuxer = init_ok(data);
    assert_eq!(demuxer.sample_count(), 4);
    assert!(has_warning(&demuxer, WarningKind::OversizedChild));
}

#[test]
fn test_unknown_top_level_boxes_are_ignored() {
    let mut data = boxx(b"wide", &[]);
    data.extend_from_slice(&boxx(b"skip", &[0xCC; 12]));
    data.extend_from_slice(&movie(&[video_trak(&default_stbl())], 64));

    let demuxer = init_ok(data);
    assert_eq!(demuxer.sample_count(), 4);
}

#[test]
fn test_uuid_box_payload_stays_opaque() {
    let mut uuid_payload = vec![0x42u8; 16]; // extended type
    uuid_payload.extend_from_slice(&[0xDD; 8]);
    let mut data = boxx(b"uuid", &uuid_payload);
    data.extend_from_slice(&movie(&[video_trak(&default_stbl())], 64));

    let demuxer = init_ok(data);
    assert_eq!(demuxer.sample_count(), 4);
}

#[test]
fn test_mdat_with_64_bit_size() {
    let moov = boxx(
        b"moov",
        &concat(&[mvhd(600, 1200), video_trak(&default_stbl())]),
    );
    let mut data = moov;
    let mdat_payload = [0xEE; 32];
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&(16 + mdat_payload.len() as u64).to_be_bytes());
    let mdat_offset = data.len() as u64;
    data.extend_from_slice(&mdat_payload);

    let demuxer = init_ok(data);
    assert_eq!(demuxer.mdat_offset(), mdat_offset);
    assert_eq!(demuxer.mdat_size(), 32);
}

// ============================================================================
// Codec handling
// ============================================================================

#[test]
fn test_unknown_codec_passes_through_with_warning() {
    let mut stbl = default_stbl();
    stbl[0] = stsd_video(b"zzzz");
    let demuxer = init_ok(movie(&[video_trak(&stbl)], 64));

    assert_eq!(demuxer.stream(0).unwrap().codec, "zzzz");
    assert!(has_warning(&demuxer, WarningKind::UnknownCodec));
}

// ============================================================================
// Track filtering and non-AV tracks
// ============================================================================

#[test]
fn test_non_av_handler_tracks_are_skipped() {
    let stbl = default_stbl();
    let timecode_trak = {
        let inner = boxx(b"stbl", &concat(&stbl));
        let minf = boxx(b"minf", &inner);
        let mdia = boxx(b"mdia", &concat(&[mdhd(600, 1200), hdlr(b"tmcd"), minf]));
        boxx(b"trak", &mdia)
    };
    let demuxer = init_ok(movie(&[video_trak(&stbl), timecode_trak], 64));

    let info = demuxer.info().unwrap();
    assert_eq!(info.streams.len(), 1);
    assert_eq!(info.streams[0].id, 0);
}

#[test]
fn test_trak_without_mdhd_is_skipped_with_warning() {
    let broken_trak = {
        let inner = boxx(b"stbl", &concat(&default_stbl()));
        let minf = boxx(b"minf", &inner);
        let mdia = boxx(b"mdia", &concat(&[hdlr(b"vide"), minf]));
        boxx(b"trak", &mdia)
    };
    let demuxer = init_ok(movie(&[video_trak(&default_stbl()), broken_trak], 64));

    assert_eq!(demuxer.info().unwrap().streams.len(), 1);
    assert!(has_warning(&demuxer, WarningKind::SkippedTrack));
}

// ============================================================================
// Out-of-bounds sample data
// ============================================================================

#[test]
fn test_sample_data_rejects_out_of_buffer_ranges() {
    let demuxer = init_ok(movie(&[video_trak(&default_stbl())], 64));

    let forged = Sample {
        stream_id: 0,
        file_offset: u64::MAX - 4,
        size: 100,
        timestamp_us: 0,
        duration_us: 0,
        keyframe: true,
    };
    assert!(matches!(
        demuxer.sample_data(&forged),
        Err(DemuxError::CorruptData { .. })
    ));
}

// ============================================================================
// Files without ftyp
// ============================================================================

#[test]
fn test_movie_without_ftyp_still_parses() {
    let demuxer = init_ok(movie(&[video_trak(&default_stbl())], 64));
    let info = demuxer.info().unwrap();
    assert!(info.ftyp.is_none());
    assert_eq!(info.sample_count, 4);
}
