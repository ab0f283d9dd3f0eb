//! Codec fourcc to canonical codec-string mapping
//!
//! Downstream decoders are configured with a canonical codec string, not
//! the raw sample-entry fourcc. The tables below cover the codecs that
//! actually show up in MOV/MP4 files; anything unknown passes through as
//! the raw fourcc with a warning so playback can still be attempted.

use crate::stream::StreamKind;
use quickmov_core::warning::emit;
use quickmov_core::{FourCc, Warning, WarningKind};

/// Canonical string for a video sample-entry fourcc.
pub fn canonical_video(fourcc: FourCc) -> Option<&'static str> {
    match fourcc.to_ascii_lowercase().as_bytes() {
        b"avc1" | b"avc3" => Some("avc1"),
        b"hev1" => Some("hev1"),
        b"hvc1" => Some("hvc1"),
        b"vp08" => Some("vp8"),
        b"vp09" => Some("vp9"),
        b"av01" => Some("av01"),
        b"mp4v" => Some("mp4v.20.9"),
        b"mjpa" | b"mjpb" | b"mjpg" => Some("mjpeg"),
        // ProRes family: 422 HQ/standard/LT/proxy and 4444
        b"apch" | b"apcn" | b"apcs" | b"apco" | b"ap4h" => Some("prores"),
        _ => None,
    }
}

/// Canonical string for an audio sample-entry fourcc.
pub fn canonical_audio(fourcc: FourCc) -> Option<&'static str> {
    match fourcc.to_ascii_lowercase().as_bytes() {
        b"mp4a" => Some("mp4a.40.2"),
        b"opus" => Some("opus"),
        b".mp3" | b"mp3 " => Some("mp3"),
        b"flac" => Some("flac"),
        b"vorb" => Some("vorbis"),
        // Uncompressed PCM in its QuickTime spellings
        b"lpcm" | b"sowt" | b"twos" => Some("pcm-s16"),
        b"in24" => Some("pcm-s24"),
        b"in32" => Some("pcm-s32"),
        b"fl32" => Some("pcm-f32"),
        b"fl64" => Some("pcm-f64"),
        _ => None,
    }
}

/// Resolve the canonical string for a stream, warning on unknown codes.
pub fn canonical(kind: StreamKind, fourcc: FourCc, warnings: &mut Vec<Warning>) -> String {
    let mapped = match kind {
        StreamKind::Video => canonical_video(fourcc),
        StreamKind::Audio => canonical_audio(fourcc),
    };
    match mapped {
        Some(canonical) => canonical.to_string(),
        None => {
            emit(
                warnings,
                Warning::new(
                    WarningKind::UnknownCodec,
                    format!("no canonical mapping for '{}', passing through", fourcc),
                ),
            );
            fourcc.display_string()
        }
    }
}
