use std::collections::BTreeMap;

use crate::error::BufferError;

/// A monotonically growing byte stream with three offsets: `base` (bytes
/// already ACKed), `next` (bytes already sent, not yet ACKed), and
/// whatever has been `put` beyond `next` but not yet sent. Holds the full
/// stream in memory for the simulation's lifetime, matching the core
/// spec's buffer model for scenario-scale transfers.
#[derive(Debug, Default)]
pub struct SendBuffer {
    base: u64,
    next: u64,
    data: Vec<u8>,
}

impl SendBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Returns up to `mss` unsent bytes and their starting absolute
    /// sequence number, advancing `next`. `None` if nothing is available.
    pub fn get(&mut self, mss: usize) -> Option<(Vec<u8>, u64)> {
        let available = self.available();
        if available == 0 {
            return None;
        }
        let take = available.min(mss as u64) as usize;
        let start = self.next as usize;
        let chunk = self.data[start..start + take].to_vec();
        let seq = self.next;
        self.next += take as u64;
        Some((chunk, seq))
    }

    /// Discards bytes at or below `ack_number` by raising `base`. A no-op
    /// for a stale/duplicate ack (`ack_number < base`); fatal if the
    /// caller claims to ack bytes never sent (`ack_number > next`).
    pub fn slide(&mut self, ack_number: u64) -> Result<(), BufferError> {
        if ack_number > self.next {
            return Err(BufferError::SlideBeyondNext {
                ack_number,
                next: self.next,
            });
        }
        if ack_number > self.base {
            self.base = ack_number;
        }
        Ok(())
    }

    /// Bytes appended but not yet sent.
    pub fn available(&self) -> u64 {
        self.data.len() as u64 - self.next
    }

    /// Bytes sent but not yet cumulatively ACKed.
    pub fn outstanding(&self) -> u64 {
        self.next - self.base
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns up to `mss` bytes starting at `base` and rewinds `next` to
    /// `base`, so the ordinary emission loop will naturally replay
    /// everything after the lost segment on its next pass.
    pub fn resend(&mut self, mss: usize) -> Result<(Vec<u8>, u64), BufferError> {
        if self.outstanding() == 0 {
            return Err(BufferError::ResendWithNothingOutstanding);
        }
        let take = self.outstanding().min(mss as u64) as usize;
        let start = self.base as usize;
        let chunk = self.data[start..start + take].to_vec();
        let seq = self.base;
        self.next = self.base;
        Ok((chunk, seq))
    }
}

/// Accepts `(bytes, absolute_sequence)` fragments and reassembles the
/// in-order prefix of the sender's stream. Out-of-order fragments are
/// retained until the gap closes; duplicate or overlapping fragments are
/// tolerated idempotently.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    head: u64,
    fragments: BTreeMap<u64, Vec<u8>>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fragment. Bytes entirely at or below the in-order head are
    /// dropped silently (already delivered); a fragment that partially
    /// overlaps the head is trimmed to its new-data suffix before being
    /// stored.
    pub fn put(&mut self, bytes: &[u8], sequence: u64) {
        if bytes.is_empty() {
            return;
        }
        let end = sequence + bytes.len() as u64;
        if end <= self.head {
            return;
        }
        let (start, data) = if sequence < self.head {
            let trim = (self.head - sequence) as usize;
            (self.head, bytes[trim..].to_vec())
        } else {
            (sequence, bytes.to_vec())
        };
        self.fragments.entry(start).or_insert(data);
    }

    /// Returns the maximal contiguous prefix starting at the current
    /// in-order head, and advances the head past it. Returns an empty
    /// chunk if no new in-order data is available.
    pub fn get(&mut self) -> (Vec<u8>, u64) {
        let mut out = Vec::new();
        while let Some(data) = self.fragments.remove(&self.head) {
            self.head += data.len() as u64;
            out.extend_from_slice(&data);
        }
        (out, self.head)
    }

    pub fn head(&self) -> u64 {
        self.head
    }
}
