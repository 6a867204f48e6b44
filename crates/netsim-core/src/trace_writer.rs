use std::io::Write;

use anyhow::{Context, Result};

/// Writes the wire-format trace consumed by the plotting tool:
/// whitespace-separated `<time> <sequence> <dropped> <ack>` records, one
/// per line. `dropped=1` marks a sequence lost on the wire, `ack=1` marks
/// an ACK observed by the sender, and `dropped=0 ack=0` marks a data
/// segment transmitted.
pub struct TraceWriter<W: Write> {
    out: W,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn record_sent(&mut self, time: f64, sequence: u64) -> Result<()> {
        self.write_record(time, sequence, false, false)
    }

    pub fn record_dropped(&mut self, time: f64, sequence: u64) -> Result<()> {
        self.write_record(time, sequence, true, false)
    }

    pub fn record_ack(&mut self, time: f64, ack_number: u64) -> Result<()> {
        self.write_record(time, ack_number, false, true)
    }

    fn write_record(&mut self, time: f64, sequence: u64, dropped: bool, ack: bool) -> Result<()> {
        writeln!(
            self.out,
            "{} {} {} {}",
            time,
            sequence,
            dropped as u8,
            ack as u8
        )
        .context("writing trace record")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flushing trace output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_render_in_wire_order() {
        let mut buf = Vec::new();
        {
            let mut w = TraceWriter::new(&mut buf);
            w.record_sent(0.0, 0).unwrap();
            w.record_dropped(0.5, 1000).unwrap();
            w.record_ack(0.6, 1000).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["0 0 0 0", "0.5 1000 1 0", "0.6 1000 0 1"]);
    }
}
