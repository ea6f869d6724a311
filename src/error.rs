//! Error types untuk log channel
//!
//! Hanya kondisi yang butuh keputusan caller yang menyeberang batas
//! komponen. Overwrite dan truncation adalah policy, bukan error.

use std::io;

use thiserror::Error;

/// Kegagalan satu langkah copy ke consumer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("byte delivery to consumer failed")]
pub struct SinkFault;

/// Hasil gagal dari `LogChannel::read*`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Non-blocking read pada buffer kosong
    #[error("log channel is empty")]
    WouldBlock,

    /// Wait dibatalkan dari luar, tidak ada byte yang di-consume
    #[error("read interrupted while waiting for data")]
    Interrupted,

    /// Tidak ada data sebelum deadline
    #[error("timed out waiting for data")]
    TimedOut,

    /// Copy ke consumer gagal di tengah drain
    #[error("copy to consumer failed after {delivered} bytes")]
    CopyFault { delivered: usize },
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        let kind = match err {
            ReadError::WouldBlock => io::ErrorKind::WouldBlock,
            ReadError::Interrupted => io::ErrorKind::Interrupted,
            ReadError::TimedOut => io::ErrorKind::TimedOut,
            ReadError::CopyFault { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Error saat memuat atau memvalidasi konfigurasi
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid channel capacity {0}: must be at least 2")]
    InvalidCapacity(usize),

    #[error("invalid read chunk size {0}: must be at least 1")]
    InvalidReadChunk(usize),

    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
