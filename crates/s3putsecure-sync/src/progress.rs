//! Per-upload transfer rate
//!
//! A [`TransferRate`] lives for exactly one upload attempt. Each sample
//! computes the rate from the bytes sent since the previous sample and the
//! wall-clock time between them; samples arriving with no elapsed time keep
//! the previous rate.

use std::time::Instant;

use s3putsecure_core::domain::newtypes::LogicalKey;
use s3putsecure_core::domain::record::ProgressSnapshot;

/// Rolling rate state for one upload
#[derive(Debug, Clone)]
pub struct TransferRate {
    key: LogicalKey,
    last_bytes: u64,
    last_sample: Instant,
    rate: f64,
}

impl TransferRate {
    /// Starts tracking an upload of `key` now
    pub fn new(key: LogicalKey) -> Self {
        Self::starting_at(key, Instant::now())
    }

    /// Starts tracking an upload of `key` at `start`
    pub fn starting_at(key: LogicalKey, start: Instant) -> Self {
        Self {
            key,
            last_bytes: 0,
            last_sample: start,
            rate: 0.0,
        }
    }

    /// Records progress now
    pub fn sample(&mut self, bytes_done: u64, total_bytes: u64) -> ProgressSnapshot {
        self.sample_at(bytes_done, total_bytes, Instant::now())
    }

    /// Records progress observed at `now`
    pub fn sample_at(&mut self, bytes_done: u64, total_bytes: u64, now: Instant) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.last_sample).as_secs_f64();
        if elapsed > 0.0 {
            self.rate = bytes_done.saturating_sub(self.last_bytes) as f64 / elapsed;
            self.last_bytes = bytes_done;
            self.last_sample = now;
        }

        ProgressSnapshot {
            key: self.key.clone(),
            bytes_done,
            total_bytes,
            percent: percent(bytes_done, total_bytes),
            rate_bytes_per_sec: self.rate,
        }
    }

    /// Most recent rate in bytes per second
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Completion in percent, clamped to 100; an empty transfer is complete
pub fn percent(bytes_done: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 100;
    }
    let pct = (u128::from(bytes_done) * 100 / u128::from(total_bytes)).min(100);
    pct as u8
}
