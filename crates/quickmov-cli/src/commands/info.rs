//! Show container, stream, frame-rate and bit-rate information

use anyhow::Result;
use quickmov_core::Warning;
use quickmov_demux::{MovieInfo, StreamBitRate, StreamFrameRate};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct InfoReport {
    movie: MovieInfo,
    frame_rates: Vec<StreamFrameRate>,
    bit_rates: Vec<StreamBitRate>,
    warnings: Vec<Warning>,
}

pub fn run(file_path: PathBuf, format: &str) -> Result<()> {
    let demuxer = super::open_demuxer(&file_path)?;

    let report = InfoReport {
        movie: demuxer.info()?,
        frame_rates: demuxer.frame_rate_info()?,
        bit_rates: demuxer.bit_rate_info()?,
        warnings: demuxer.warnings().to_vec(),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", file_path.display());
    if let Some(ftyp) = &report.movie.ftyp {
        println!(
            "Brand: {} (minor {}, compatible: {})",
            ftyp.major_brand,
            ftyp.minor_version,
            ftyp.compatible_brands
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!(
        "Duration: {:.3} s ({} ticks at {}/s)",
        report.movie.duration_us as f64 / 1_000_000.0,
        report.movie.duration,
        report.movie.time_scale
    );
    println!("Samples: {}", report.movie.sample_count);

    for stream in &report.movie.streams {
        match (&stream.video, &stream.audio) {
            (Some(video), _) => {
                println!(
                    "Stream {}: video {} ({}) {}x{} depth {}",
                    stream.id, stream.codec, stream.codec_fourcc, video.width, video.height, video.depth
                );
            }
            (_, Some(audio)) => {
                println!(
                    "Stream {}: audio {} ({}) {} Hz, {} ch, {} bit",
                    stream.id,
                    stream.codec,
                    stream.codec_fourcc,
                    audio.sample_rate,
                    audio.channels,
                    audio.bit_depth
                );
            }
            _ => {}
        }
    }

    for rate in &report.frame_rates {
        match rate.frame_rate {
            Some(fps) => println!("Stream {}: {} fps (constant)", rate.stream_id, fps),
            None => println!(
                "Stream {}: ~{} fps (variable)",
                rate.stream_id,
                rate.avg_frame_rate.unwrap_or(0.0)
            ),
        }
    }
    for rate in &report.bit_rates {
        if let Some(bps) = rate.avg_bit_rate {
            println!("Stream {}: {} bit/s average", rate.stream_id, bps);
        }
    }

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }

    Ok(())
}
