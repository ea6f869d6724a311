//! Statistik channel - lock-free counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter untuk aktivitas channel
#[derive(Debug, Default)]
pub struct ChannelStats {
    writes: AtomicU64,
    bytes_written: AtomicU64,
    bytes_overwritten: AtomicU64,
    truncated_writes: AtomicU64,
    bytes_read: AtomicU64,
    wakeups: AtomicU64,
    copy_faults: AtomicU64,
}

/// Snapshot counter pada satu titik waktu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub writes: u64,
    pub bytes_written: u64,
    pub bytes_overwritten: u64,
    pub truncated_writes: u64,
    pub bytes_read: u64,
    pub wakeups: u64,
    pub copy_faults: u64,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub(crate) fn record_write(&self, accepted: usize, overwritten: usize, truncated: bool) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(accepted as u64, Ordering::Relaxed);
        if overwritten > 0 {
            self.bytes_overwritten
                .fetch_add(overwritten as u64, Ordering::Relaxed);
        }
        if truncated {
            self.truncated_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub(crate) fn record_read(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_fault(&self) {
        self.copy_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_overwritten: self.bytes_overwritten.load(Ordering::Relaxed),
            truncated_writes: self.truncated_writes.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            copy_faults: self.copy_faults.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "writes={} in={}B overwritten={}B truncated={} out={}B wakeups={} faults={}",
            self.writes,
            self.bytes_written,
            self.bytes_overwritten,
            self.truncated_writes,
            self.bytes_read,
            self.wakeups,
            self.copy_faults
        )
    }
}
