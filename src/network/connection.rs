//! Endpoint connection handling
//!
//! - `ProducerConnection`: koneksi non-blocking di event loop mio.
//!   Satu koneksi adalah satu byte stream: teks berakhir di NUL pertama
//!   pada stream, bukan per chunk TCP.
//! - `serve_reader`: satu thread per consumer, blocking read dari
//!   channel lalu forward ke socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use mio::net::TcpStream as MioTcpStream;
use tracing::{debug, trace};

use crate::core::{Interrupt, LogChannel};
use crate::error::ReadError;

/// Buffer size - cukup untuk satu write penuh ke ring default
const READ_BUFFER_SIZE: usize = 4 * 1024;

/// Berapa lama menunggu byte mode dari consumer
const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Consumer yang tidak membaca selama ini dianggap mati
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval cek hangup consumer saat channel idle (mode follow)
const HANGUP_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Byte mode pertama dari consumer: drain lalu tutup
pub const MODE_NON_BLOCKING: u8 = b'N';
/// Byte mode pertama dari consumer: follow (blocking)
pub const MODE_FOLLOW: u8 = b'F';

/// Koneksi producer dengan pre-allocated read buffer
pub struct ProducerConnection {
    stream: MioTcpStream,
    addr: SocketAddr,
    read_buffer: Box<[u8]>,
    bytes_received: u64,
    /// NUL sudah terlihat, sisa stream dibuang
    text_ended: bool,
}

impl ProducerConnection {
    pub fn new(stream: MioTcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            read_buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            bytes_received: 0,
            text_ended: false,
        }
    }

    /// Baca semua yang tersedia dan tulis ke channel.
    ///
    /// Teks dipecah per staging limit sebelum `write`, jadi isi channel
    /// tidak bergantung pada segmentasi TCP.
    ///
    /// Returns jumlah byte yang di-enqueue, atau `ConnectionReset` saat
    /// peer menutup koneksi.
    pub fn pump(&mut self, channel: &LogChannel) -> io::Result<usize> {
        let mut enqueued = 0;

        loop {
            match self.stream.read(&mut self.read_buffer) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "Connection closed",
                    ));
                }
                Ok(n) => {
                    self.bytes_received += n as u64;
                    trace!(peer = %self.addr, n, "producer chunk");
                    if self.text_ended {
                        continue;
                    }

                    let (text, ended) = split_text(&self.read_buffer[..n]);
                    self.text_ended = ended;
                    for piece in text.chunks(channel.capacity()) {
                        enqueued += channel.write(piece);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(enqueued),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Underlying stream untuk registrasi poll
    pub fn stream_mut(&mut self) -> &mut MioTcpStream {
        &mut self.stream
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

/// Potong `chunk` di NUL pertama. `true` jika NUL ditemukan.
#[inline(always)]
fn split_text(chunk: &[u8]) -> (&[u8], bool) {
    match chunk.iter().position(|&b| b == 0) {
        Some(end) => (&chunk[..end], true),
        None => (chunk, false),
    }
}

/// Cek non-blocking apakah consumer sudah menutup koneksi.
///
/// Byte yang dikirim consumer setelah handshake dibuang.
fn peer_closed(stream: &mut TcpStream) -> io::Result<bool> {
    let mut scratch = [0u8; 64];
    stream.set_nonblocking(true)?;
    let closed = loop {
        match stream.read(&mut scratch) {
            Ok(0) => break true,
            Ok(_) => continue,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break false,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break true,
        }
    };
    stream.set_nonblocking(false)?;
    Ok(closed)
}

/// Layani satu consumer sampai koneksi putus, drain selesai, atau
/// `interrupt` dinaikkan.
///
/// Byte pertama dari consumer memilih mode (`MODE_NON_BLOCKING` atau
/// follow). Tanpa byte mode dalam `HANDSHAKE_TIMEOUT`, mode follow.
/// Di mode follow, consumer yang hangup terdeteksi dalam
/// `HANGUP_CHECK_INTERVAL` walaupun channel idle.
pub fn serve_reader(
    channel: Arc<LogChannel>,
    mut stream: TcpStream,
    read_chunk: usize,
    interrupt: Interrupt,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

    let mut mode = [0u8; 1];
    let non_blocking = match stream.read(&mut mode) {
        Ok(0) => return Ok(()),
        Ok(_) => mode[0] == MODE_NON_BLOCKING,
        Err(ref e)
            if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
        {
            false
        }
        Err(e) => return Err(e),
    };
    stream.set_read_timeout(None)?;

    let mut sent = 0u64;
    let result = loop {
        let read = if non_blocking {
            channel.read_interruptible(read_chunk, true, &interrupt)
        } else {
            channel.read_interruptible_timeout(read_chunk, HANGUP_CHECK_INTERVAL, &interrupt)
        };

        match read {
            Ok(bytes) => {
                if let Err(e) = stream.write_all(&bytes) {
                    break Err(e);
                }
                sent += bytes.len() as u64;
            }
            Err(ReadError::TimedOut) => match peer_closed(&mut stream) {
                Ok(false) => continue,
                Ok(true) => break Ok(()),
                Err(e) => break Err(e),
            },
            // Drain selesai (non-blocking) atau server shutdown
            Err(ReadError::WouldBlock) | Err(ReadError::Interrupted) => break Ok(()),
            Err(e) => break Err(e.into()),
        }
    };

    debug!(sent, non_blocking, "log reader finished");
    stream.shutdown(Shutdown::Both).ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_text_stops_at_nul() {
        assert_eq!(split_text(b"abc\0def"), (&b"abc"[..], true));
        assert_eq!(split_text(b"abc"), (&b"abc"[..], false));
        assert_eq!(split_text(b"\0abc"), (&b""[..], true));
    }

    #[test]
    fn test_follow_reader_ends_when_consumer_hangs_up() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let channel = Arc::new(LogChannel::new(64));

        let mut client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        client.write_all(&[MODE_FOLLOW]).unwrap();

        let (tx, rx) = mpsc::channel();
        let reader_channel = Arc::clone(&channel);
        thread::spawn(move || {
            let result = serve_reader(reader_channel, server_side, 16, Interrupt::new());
            tx.send(result.is_ok()).ok();
        });

        thread::sleep(Duration::from_millis(50));
        drop(client);

        // Tidak ada write ke channel, reader tetap harus selesai
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        assert!(channel.is_empty());
    }
}
