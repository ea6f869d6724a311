//! Log Channel - byte stream di atas `CircularLogBuffer`
//!
//! Banyak producer, banyak consumer, satu ring:
//! - Producer tidak pernah block. Ring penuh = byte tertua dibuang.
//! - Consumer block di `read` sampai ada data, atau langsung
//!   `WouldBlock` untuk mode non-blocking.
//!
//! Semua mutasi ring terjadi di bawah satu `Mutex`. `Condvar` dipakai
//! untuk transisi kosong -> ada data, dan kondisi kosong selalu dicek
//! ulang setelah bangun (consumer lain bisa drain lebih dulu).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::ring_buffer::CircularLogBuffer;
use super::sink::ByteSink;
use super::staging::StagingBuffer;
use super::stats::ChannelStats;
use crate::config::ChannelConfig;
use crate::error::{ConfigError, ReadError};

/// Apa yang terjadi pada byte yang sudah diambil saat copy ke consumer gagal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainPolicy {
    /// Byte di-pop satu per satu lalu di-copy. Fault = byte yang sudah
    /// di-pop hilang untuk semua reader.
    #[default]
    Destructive,
    /// Copy dulu dari run yang tersedia, read cursor hanya maju sebanyak
    /// byte yang terkonfirmasi. Fault tidak menghilangkan data.
    PeekCommit,
}

/// Token pembatalan untuk reader yang sedang menunggu.
///
/// Dinaikkan lewat `LogChannel::interrupt`. Token yang sudah naik
/// di-consume oleh read yang dibatalkannya.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

/// Cara reader menunggu saat ring kosong
#[derive(Debug, Clone, Copy)]
enum Wait {
    NonBlocking,
    Forever,
    Until(Instant),
}

impl Wait {
    fn from_flag(non_blocking: bool) -> Self {
        if non_blocking {
            Wait::NonBlocking
        } else {
            Wait::Forever
        }
    }

    fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline),
            None => Wait::Forever,
        }
    }
}

/// State yang dilindungi mutex
struct State {
    ring: CircularLogBuffer,
    // Naik setiap interrupt_all; reader yang menunggu sejak epoch lama dibatalkan
    epoch: u64,
}

/// Bounded lossy log channel.
///
/// Dibuat sekali lalu di-share (biasanya lewat `Arc`) ke endpoint
/// producer dan consumer.
pub struct LogChannel {
    state: Mutex<State>,
    readable: Condvar,
    staging: Mutex<StagingBuffer>,
    staging_limit: usize,
    policy: DrainPolicy,
    stats: ChannelStats,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(super::DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogChannel")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl LogChannel {
    /// Channel dengan `capacity` slot dan `DrainPolicy::Destructive`.
    ///
    /// # Panics
    /// Panic jika `capacity < 2`
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, DrainPolicy::default())
    }

    /// # Panics
    /// Panic jika `capacity < 2`
    pub fn with_policy(capacity: usize, policy: DrainPolicy) -> Self {
        let ring = CircularLogBuffer::new(capacity);

        Self {
            state: Mutex::new(State { ring, epoch: 0 }),
            readable: Condvar::new(),
            staging: Mutex::new(StagingBuffer::new(capacity)),
            staging_limit: capacity,
            policy,
            stats: ChannelStats::new(),
        }
    }

    /// Channel dari konfigurasi yang sudah divalidasi
    pub fn from_config(config: &ChannelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_policy(config.capacity, config.drain))
    }

    /// Tulis byte ke channel. Tidak pernah block.
    ///
    /// Input lebih panjang dari staging limit dipotong. Semua waiter
    /// selalu dibangunkan, termasuk untuk write kosong.
    ///
    /// Returns jumlah byte yang di-enqueue (setelah truncation), bukan
    /// jumlah yang masih tersimpan setelah overwrite.
    pub fn write(&self, data: &[u8]) -> usize {
        let take = data.len().min(self.staging_limit);
        self.enqueue(&data[..take], take < data.len())
    }

    /// Format lalu tulis, seperti printf ke log.
    ///
    /// Argumen diformat ke staging buffer milik channel, jadi `Display`
    /// impl di dalam `args` tidak boleh menulis ke channel yang sama.
    pub fn print(&self, args: fmt::Arguments<'_>) -> usize {
        let mut staging = self.staging.lock();
        staging.reset();
        staging.format(args);
        let truncated = staging.is_truncated();
        self.enqueue(staging.as_bytes(), truncated)
    }

    fn enqueue(&self, bytes: &[u8], truncated: bool) -> usize {
        let mut overwritten = 0;
        {
            let mut state = self.state.lock();
            for &b in bytes {
                if state.ring.put_byte(b) {
                    overwritten += 1;
                }
            }
        }

        self.readable.notify_all();
        self.stats.record_write(bytes.len(), overwritten, truncated);

        if overwritten > 0 {
            debug!(overwritten, "log ring full, oldest bytes discarded");
        }
        if truncated {
            trace!(limit = self.staging_limit, "write truncated to staging limit");
        }

        bytes.len()
    }

    /// Baca paling banyak `max_bytes`.
    ///
    /// Blocking: menunggu sampai ada data, lalu drain yang tersedia
    /// (tidak menunggu sampai `max_bytes` terpenuhi).
    /// Non-blocking: `WouldBlock` jika kosong.
    pub fn read(&self, max_bytes: usize, non_blocking: bool) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(max_bytes.min(self.capacity()));
        self.read_inner(&mut out, max_bytes, Wait::from_flag(non_blocking), None)?;
        Ok(out)
    }

    /// Seperti `read`, tapi wait bisa dibatalkan lewat `interrupt`
    pub fn read_interruptible(
        &self,
        max_bytes: usize,
        non_blocking: bool,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(max_bytes.min(self.capacity()));
        self.read_inner(
            &mut out,
            max_bytes,
            Wait::from_flag(non_blocking),
            Some(interrupt),
        )?;
        Ok(out)
    }

    /// Blocking read dengan batas waktu. `TimedOut` jika tidak ada data.
    pub fn read_timeout(&self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(max_bytes.min(self.capacity()));
        self.read_inner(&mut out, max_bytes, Wait::after(timeout), None)?;
        Ok(out)
    }

    /// Gabungan `read_timeout` dan `read_interruptible`
    pub fn read_interruptible_timeout(
        &self,
        max_bytes: usize,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(max_bytes.min(self.capacity()));
        self.read_inner(&mut out, max_bytes, Wait::after(timeout), Some(interrupt))?;
        Ok(out)
    }

    /// Bentuk umum read ke sembarang `ByteSink`.
    ///
    /// Returns jumlah byte yang terkirim ke `sink`.
    pub fn read_into<S: ByteSink + ?Sized>(
        &self,
        sink: &mut S,
        max_bytes: usize,
        non_blocking: bool,
        interrupt: Option<&Interrupt>,
    ) -> Result<usize, ReadError> {
        self.read_inner(sink, max_bytes, Wait::from_flag(non_blocking), interrupt)
    }

    fn read_inner<S: ByteSink + ?Sized>(
        &self,
        sink: &mut S,
        max_bytes: usize,
        wait: Wait,
        interrupt: Option<&Interrupt>,
    ) -> Result<usize, ReadError> {
        let mut state = self.state.lock();

        if state.ring.is_empty() && matches!(wait, Wait::NonBlocking) {
            return Err(ReadError::WouldBlock);
        }

        let epoch = state.epoch;
        while state.ring.is_empty() {
            if interrupt.map_or(false, Interrupt::take) || state.epoch != epoch {
                debug!("blocked log reader interrupted");
                return Err(ReadError::Interrupted);
            }

            match wait {
                Wait::Until(deadline) => {
                    let result = self.readable.wait_until(&mut state, deadline);
                    if result.timed_out() && state.ring.is_empty() {
                        return Err(ReadError::TimedOut);
                    }
                }
                _ => self.readable.wait(&mut state),
            }

            self.stats.record_wakeup();
        }

        let result = match self.policy {
            DrainPolicy::Destructive => drain_destructive(&mut state.ring, sink, max_bytes),
            DrainPolicy::PeekCommit => drain_peek_commit(&mut state.ring, sink, max_bytes),
        };
        drop(state);

        match result {
            Ok(n) => {
                self.stats.record_read(n);
                Ok(n)
            }
            Err(delivered) => {
                self.stats.record_read(delivered);
                self.stats.record_fault();
                warn!(delivered, policy = ?self.policy, "copy to log reader failed");
                Err(ReadError::CopyFault { delivered })
            }
        }
    }

    /// Batalkan wait milik pemegang `interrupt`.
    ///
    /// Jika reader tidak sedang menunggu, token tetap naik dan
    /// membatalkan wait berikutnya.
    pub fn interrupt(&self, interrupt: &Interrupt) {
        {
            let _state = self.state.lock();
            interrupt.raised.store(true, Ordering::Release);
        }
        self.readable.notify_all();
    }

    /// Batalkan semua reader yang sedang menunggu (mis. saat shutdown)
    pub fn interrupt_all(&self) {
        {
            let mut state = self.state.lock();
            state.epoch = state.epoch.wrapping_add(1);
        }
        self.readable.notify_all();
    }

    /// Byte yang belum dibaca
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    /// Jumlah slot ring (usable = capacity - 1)
    pub fn capacity(&self) -> usize {
        self.staging_limit
    }

    pub fn policy(&self) -> DrainPolicy {
        self.policy
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }
}

/// Pop lalu copy. Err berisi jumlah byte yang sempat terkirim.
fn drain_destructive<S: ByteSink + ?Sized>(
    ring: &mut CircularLogBuffer,
    sink: &mut S,
    max_bytes: usize,
) -> Result<usize, usize> {
    let mut delivered = 0;
    while delivered < max_bytes {
        let Some(byte) = ring.get_byte() else {
            break;
        };
        // Byte sudah keluar dari ring, tidak bisa dikembalikan
        if sink.put(byte).is_err() {
            return Err(delivered);
        }
        delivered += 1;
    }
    Ok(delivered)
}

/// Copy dari run yang tersedia, commit hanya yang terkonfirmasi
fn drain_peek_commit<S: ByteSink + ?Sized>(
    ring: &mut CircularLogBuffer,
    sink: &mut S,
    max_bytes: usize,
) -> Result<usize, usize> {
    let mut delivered = 0;
    let mut faulted = false;
    {
        let (head, tail) = ring.as_slices();
        for &byte in head.iter().chain(tail).take(max_bytes) {
            if sink.put(byte).is_err() {
                faulted = true;
                break;
            }
            delivered += 1;
        }
    }
    ring.consume(delivered);

    if faulted {
        Err(delivered)
    } else {
        Ok(delivered)
    }
}
