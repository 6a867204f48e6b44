use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Bucket width (seconds) used for the textual send/ack/drop summary.
const BUCKET_WIDTH: f64 = 1.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize a wire-format trace file")]
struct Args {
    /// Trace file written by `transfer --trace-out`.
    #[arg(long)]
    file: PathBuf,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sent: u64,
    dropped: u64,
    acked: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("reading trace file {}", args.file.display()))?;

    let mut buckets: Vec<Bucket> = Vec::new();
    let mut max_seq_seen = 0u64;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            anyhow::bail!("line {}: expected 4 whitespace-separated fields, got {}", line_no + 1, fields.len());
        }
        let time: f64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: invalid time", line_no + 1))?;
        let sequence: u64 = fields[1]
            .parse()
            .with_context(|| format!("line {}: invalid sequence", line_no + 1))?;
        let dropped: u8 = fields[2]
            .parse()
            .with_context(|| format!("line {}: invalid dropped flag", line_no + 1))?;
        let acked: u8 = fields[3]
            .parse()
            .with_context(|| format!("line {}: invalid ack flag", line_no + 1))?;

        max_seq_seen = max_seq_seen.max(sequence);
        let bucket_idx = (time / BUCKET_WIDTH).floor() as usize;
        if bucket_idx >= buckets.len() {
            buckets.resize(bucket_idx + 1, Bucket::default());
        }
        let bucket = &mut buckets[bucket_idx];
        if dropped == 1 {
            bucket.dropped += 1;
        } else if acked == 1 {
            bucket.acked += 1;
        } else {
            bucket.sent += 1;
        }
    }

    println!("# trace summary: {}", args.file.display());
    println!("# bucket width: {BUCKET_WIDTH}s, highest sequence observed: {max_seq_seen}");
    println!("{:>8} {:>8} {:>8} {:>8}", "time", "sent", "dropped", "acked");
    for (idx, bucket) in buckets.iter().enumerate() {
        let t = idx as f64 * BUCKET_WIDTH;
        println!(
            "{:>8.1} {:>8} {:>8} {:>8}",
            t, bucket.sent, bucket.dropped, bucket.acked
        );
    }

    Ok(())
}
