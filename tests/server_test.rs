//! End-to-end: producer -> write port -> channel -> read port -> consumer

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use logring::network::{Server, MODE_FOLLOW, MODE_NON_BLOCKING};
use logring::{LogChannel, ServerConfig};

struct TestServer {
    channel: Arc<LogChannel>,
    write_addr: SocketAddr,
    read_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    fn start(capacity: usize) -> Self {
        let config = ServerConfig {
            write_addr: "127.0.0.1:0".to_string(),
            read_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let channel = Arc::new(LogChannel::new(capacity));
        let mut server = Server::bind(&config, Arc::clone(&channel)).unwrap();
        let write_addr = server.write_addr().unwrap();
        let read_addr = server.read_addr().unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || server.run(&flag).unwrap());

        Self {
            channel,
            write_addr,
            read_addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn produce(&self, data: &[u8]) {
        let mut stream = TcpStream::connect(self.write_addr).unwrap();
        stream.write_all(data).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();
    }

    /// Satu koneksi producer, tiap bagian dikirim sebagai write TCP terpisah
    fn produce_in_parts(&self, parts: &[&[u8]]) {
        let mut stream = TcpStream::connect(self.write_addr).unwrap();
        stream.set_nodelay(true).unwrap();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                thread::sleep(Duration::from_millis(50));
            }
            stream.write_all(part).unwrap();
        }
        stream.shutdown(Shutdown::Write).unwrap();
    }

    fn wait_for_written(&self, bytes: u64) {
        let start = Instant::now();
        while self.channel.stats().snapshot().bytes_written < bytes {
            assert!(start.elapsed() < Duration::from_secs(5), "producer data never arrived");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn wait_for_len(&self, len: usize) {
        let start = Instant::now();
        while self.channel.len() < len {
            assert!(start.elapsed() < Duration::from_secs(5), "producer data never arrived");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn consumer(&self, mode: u8) -> TcpStream {
        let mut stream = TcpStream::connect(self.read_addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(&[mode]).unwrap();
        stream
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

#[test]
fn test_dump_mode_drains_current_contents() {
    let server = TestServer::start(64);
    server.produce(b"hello log");
    server.wait_for_len(9);

    let mut consumer = server.consumer(MODE_NON_BLOCKING);
    let mut out = Vec::new();
    consumer.read_to_end(&mut out).unwrap();

    assert_eq!(out, b"hello log");
    assert!(server.channel.is_empty());
}

#[test]
fn test_dump_mode_on_empty_channel_closes_immediately() {
    let server = TestServer::start(64);

    let mut consumer = server.consumer(MODE_NON_BLOCKING);
    let mut out = Vec::new();
    consumer.read_to_end(&mut out).unwrap();

    assert!(out.is_empty());
}

#[test]
fn test_follow_mode_receives_later_writes() {
    let server = TestServer::start(64);
    let mut consumer = server.consumer(MODE_FOLLOW);

    // Beri waktu thread reader untuk mulai menunggu
    thread::sleep(Duration::from_millis(50));
    server.produce(b"hi");

    let mut buf = [0u8; 2];
    consumer.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hi");
}

#[test]
fn test_producer_text_stops_at_nul_and_overwrites_oldest() {
    let server = TestServer::start(8);
    server.produce(b"ABCDEFG");
    server.wait_for_len(7);
    server.produce(b"H\0ignored");

    server.wait_for_written(8);

    let mut consumer = server.consumer(MODE_NON_BLOCKING);
    let mut out = Vec::new();
    consumer.read_to_end(&mut out).unwrap();

    assert_eq!(out, b"BCDEFGH");
}

#[test]
fn test_shutdown_releases_blocked_followers() {
    let mut server = TestServer::start(64);
    let mut consumer = server.consumer(MODE_FOLLOW);
    thread::sleep(Duration::from_millis(50));

    server.shutdown.store(true, Ordering::Release);
    server.handle.take().unwrap().join().unwrap();

    // Reader thread dibatalkan dan socket ditutup
    let mut out = Vec::new();
    consumer.read_to_end(&mut out).unwrap();
    assert!(out.is_empty());
}

/// Isi channel setelah satu producer mengirim `parts` lalu menutup koneksi
fn channel_after_stream(capacity: usize, parts: &[&[u8]], text_len: u64) -> Vec<u8> {
    let server = TestServer::start(capacity);
    server.produce_in_parts(parts);
    server.wait_for_written(text_len);

    // Sisa stream (kalau ada yang bocor) sempat diproses
    thread::sleep(Duration::from_millis(100));
    assert_eq!(server.channel.stats().snapshot().bytes_written, text_len);
    server.channel.read(64, true).unwrap()
}

#[test]
fn test_nul_ends_text_for_whole_connection() {
    let one = channel_after_stream(64, &[&b"AB\0CD"[..]], 2);
    let two = channel_after_stream(64, &[&b"AB\0"[..], &b"CD"[..]], 2);
    let split_at_nul = channel_after_stream(64, &[&b"AB"[..], &b"\0CD"[..]], 2);

    assert_eq!(one, b"AB");
    assert_eq!(two, one);
    assert_eq!(split_at_nul, one);
}

#[test]
fn test_producer_stream_independent_of_segmentation() {
    let one = channel_after_stream(8, &[&b"123456789"[..]], 9);
    let two = channel_after_stream(8, &[&b"12345"[..], &b"6789"[..]], 9);

    // Ring menahan capacity - 1 byte terakhir dari stream
    assert_eq!(one, b"3456789");
    assert_eq!(two, one);
}
