//! Staging buffer untuk producer: format printf-style dengan batas tetap
//!
//! Output yang melewati batas dipotong diam-diam. Truncation bukan error.

use std::fmt;

/// Pre-allocated staging buffer dengan limit tetap
pub struct StagingBuffer {
    buffer: Box<[u8]>,
    len: usize,
    truncated: bool,
}

impl StagingBuffer {
    /// Membuat staging buffer dengan `limit` byte
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: vec![0u8; limit].into_boxed_slice(),
            len: 0,
            truncated: false,
        }
    }

    /// Reset untuk reuse
    #[inline(always)]
    pub fn reset(&mut self) {
        self.len = 0;
        self.truncated = false;
    }

    /// Salin `data`, potong di limit. Returns jumlah byte yang diterima.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let room = self.buffer.len() - self.len;
        let take = data.len().min(room);
        self.buffer[self.len..self.len + take].copy_from_slice(&data[..take]);
        self.len += take;
        if take < data.len() {
            self.truncated = true;
        }
        take
    }

    /// Format `args` ke buffer
    pub fn format(&mut self, args: fmt::Arguments<'_>) -> &[u8] {
        // write_str kita tidak pernah gagal
        let _ = fmt::write(self, args);
        self.as_bytes()
    }

    /// Byte yang sudah di-stage
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Apakah ada output yang dibuang karena limit
    #[inline(always)]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Write for StagingBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Channel membawa byte stream, boundary UTF-8 tidak dijaga
        self.push(s.as_bytes());
        Ok(())
    }
}
