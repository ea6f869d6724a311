//! Tujuan copy byte ke consumer
//!
//! Setiap byte yang keluar dari ring dikirim lewat `ByteSink::put`.
//! Langkah ini boleh gagal (mis. buffer tujuan tidak valid), dan
//! channel memutuskan apa yang terjadi pada byte yang sudah diambil.

use crate::error::SinkFault;

/// Consumer-side destination untuk byte dari channel
pub trait ByteSink {
    /// Kirim satu byte ke consumer
    fn put(&mut self, byte: u8) -> Result<(), SinkFault>;
}

impl ByteSink for Vec<u8> {
    #[inline(always)]
    fn put(&mut self, byte: u8) -> Result<(), SinkFault> {
        self.push(byte);
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    #[inline(always)]
    fn put(&mut self, byte: u8) -> Result<(), SinkFault> {
        (**self).put(byte)
    }
}

/// Sink di atas slice milik caller.
///
/// Menulis melewati akhir slice adalah fault, sama seperti copy ke
/// buffer user yang terlalu kecil.
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    /// Jumlah byte yang sudah ditulis
    pub fn filled(&self) -> usize {
        self.filled
    }
}

impl ByteSink for SliceSink<'_> {
    #[inline(always)]
    fn put(&mut self, byte: u8) -> Result<(), SinkFault> {
        let slot = self.buf.get_mut(self.filled).ok_or(SinkFault)?;
        *slot = byte;
        self.filled += 1;
        Ok(())
    }
}
