//! Circular Log Buffer - byte ring dengan overwrite-on-full
//!
//! Dua cursor saja (write & read), satu slot dikorbankan supaya
//! kondisi penuh dan kosong bisa dibedakan:
//! - kosong: `write == read`
//! - penuh:  `(write + 1) % capacity == read`
//!
//! Tidak thread-safe. Sinkronisasi adalah tanggung jawab `LogChannel`.

/// Kapasitas default (termasuk satu slot pemisah)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Kapasitas minimum agar penuh dan kosong tidak ambigu
pub const MIN_CAPACITY: usize = 2;

/// Fixed-size byte ring dengan kebijakan buang-yang-tertua saat penuh.
///
/// Storage dialokasikan sekali saat konstruksi, tidak ada alokasi
/// setelah itu.
pub struct CircularLogBuffer {
    storage: Box<[u8]>,
    write_cursor: usize,
    read_cursor: usize,
}

impl Default for CircularLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for CircularLogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircularLogBuffer")
            .field("capacity", &self.capacity())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("len", &self.len())
            .finish()
    }
}

impl CircularLogBuffer {
    /// Membuat buffer baru dengan `capacity` slot.
    ///
    /// Byte yang bisa disimpan sekaligus adalah `capacity - 1`.
    ///
    /// # Panics
    /// Panic jika `capacity < 2`
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= MIN_CAPACITY,
            "capacity must be at least {}",
            MIN_CAPACITY
        );

        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            write_cursor: 0,
            read_cursor: 0,
        }
    }

    #[inline(always)]
    fn next(&self, cursor: usize) -> usize {
        (cursor + 1) % self.storage.len()
    }

    /// Cek apakah buffer kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.write_cursor == self.read_cursor
    }

    /// Cek apakah buffer penuh (put berikutnya akan membuang satu byte)
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.next(self.write_cursor) == self.read_cursor
    }

    /// Tulis satu byte. Tidak pernah gagal.
    ///
    /// Jika penuh, byte tertua yang belum dibaca dibuang dulu.
    /// Returns `true` jika ada byte yang dibuang.
    #[inline(always)]
    pub fn put_byte(&mut self, byte: u8) -> bool {
        let discarded = self.is_full();
        if discarded {
            self.read_cursor = self.next(self.read_cursor);
        }

        self.storage[self.write_cursor] = byte;
        self.write_cursor = self.next(self.write_cursor);

        discarded
    }

    /// Ambil satu byte. `None` jika kosong (tanpa side effect).
    #[inline(always)]
    pub fn get_byte(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let byte = self.storage[self.read_cursor];
        self.read_cursor = self.next(self.read_cursor);

        Some(byte)
    }

    /// Jumlah byte yang belum dibaca
    #[inline(always)]
    pub fn len(&self) -> usize {
        let cap = self.storage.len();
        (self.write_cursor + cap - self.read_cursor) % cap
    }

    /// Jumlah slot storage, termasuk slot pemisah
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Byte maksimum yang bisa ditahan sebelum overwrite
    #[inline(always)]
    pub fn usable_capacity(&self) -> usize {
        self.storage.len() - 1
    }

    /// Byte yang belum dibaca sebagai (paling banyak) dua run kontigu,
    /// berurutan sesuai cursor. Tidak mengubah state.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.write_cursor >= self.read_cursor {
            (
                &self.storage[self.read_cursor..self.write_cursor],
                &self.storage[..0],
            )
        } else {
            (
                &self.storage[self.read_cursor..],
                &self.storage[..self.write_cursor],
            )
        }
    }

    /// Majukan read cursor sebanyak `n` byte (dibatasi `len()`).
    ///
    /// Returns jumlah byte yang benar-benar di-consume.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.len());
        self.read_cursor = (self.read_cursor + n) % self.storage.len();
        n
    }
}
