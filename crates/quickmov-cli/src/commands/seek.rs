//! Seek to a timestamp and show where the cursor lands

use anyhow::Result;
use std::path::PathBuf;

pub fn run(file_path: PathBuf, target_us: i64) -> Result<()> {
    let mut demuxer = super::open_demuxer(&file_path)?;

    demuxer.seek(target_us)?;
    match demuxer.next_sample() {
        Some(sample) => {
            println!(
                "seek({} us) -> stream {} ts {} us, {} bytes at offset {}{}",
                target_us,
                sample.stream_id,
                sample.timestamp_us,
                sample.size,
                sample.file_offset,
                if sample.keyframe { " (keyframe)" } else { "" }
            );
        }
        None => println!("seek({} us) -> empty sample index", target_us),
    }

    Ok(())
}
