//! List the merged sample index

use anyhow::Result;
use std::path::PathBuf;

pub fn run(file_path: PathBuf, limit: usize, stream: Option<u32>, format: &str) -> Result<()> {
    let mut demuxer = super::open_demuxer(&file_path)?;

    let mut listed = Vec::new();
    while let Some(sample) = demuxer.next_sample() {
        if let Some(stream_id) = stream {
            if sample.stream_id != stream_id {
                continue;
            }
        }
        listed.push(sample);
        if listed.len() >= limit {
            break;
        }
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    println!(
        "{:>6} {:>8} {:>12} {:>10} {:>12} {:>9}  key",
        "stream", "size", "offset", "dur(us)", "ts(us)", "index"
    );
    for (index, sample) in listed.iter().enumerate() {
        println!(
            "{:>6} {:>8} {:>12} {:>10} {:>12} {:>9}  {}",
            sample.stream_id,
            sample.size,
            sample.file_offset,
            sample.duration_us,
            sample.timestamp_us,
            index,
            if sample.keyframe { "*" } else { "" }
        );
    }
    if listed.len() == limit {
        println!("... (limit {} reached)", limit);
    }

    Ok(())
}
