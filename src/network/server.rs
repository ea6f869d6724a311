//! Log server dengan event-driven I/O
//!
//! - Write port: semua producer di-multiplex lewat mio di satu thread.
//! - Read port: setiap consumer dapat thread sendiri, karena read
//!   dari channel bisa block.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mio::net::TcpListener as MioTcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};

use super::connection::{serve_reader, ProducerConnection};
use crate::config::ServerConfig;
use crate::core::{Interrupt, LogChannel};

const WRITE_TOKEN: Token = Token(0);
const READ_TOKEN: Token = Token(1);
const FIRST_PRODUCER_TOKEN: usize = 2;
const MAX_PRODUCERS: usize = 1024;
const EVENTS_CAPACITY: usize = 1024;

/// Poll timeout, menentukan seberapa cepat shutdown flag terlihat
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Thread consumer yang sedang berjalan
struct ReaderHandle {
    interrupt: Interrupt,
    thread: JoinHandle<()>,
}

/// Log server
///
/// Channel di-inject dari luar, server hanya adapter tipis.
pub struct Server {
    poll: Poll,
    write_listener: MioTcpListener,
    read_listener: MioTcpListener,
    producers: HashMap<Token, ProducerConnection>,
    readers: Vec<ReaderHandle>,
    next_token: usize,
    next_reader_id: u64,
    channel: Arc<LogChannel>,
    config: ServerConfig,
}

impl Server {
    /// Bind kedua port dan daftarkan ke poll
    pub fn bind(config: &ServerConfig, channel: Arc<LogChannel>) -> io::Result<Self> {
        let poll = Poll::new()?;

        let mut write_listener = bind_listener(&config.write_addr)?;
        let mut read_listener = bind_listener(&config.read_addr)?;

        poll.registry()
            .register(&mut write_listener, WRITE_TOKEN, Interest::READABLE)?;
        poll.registry()
            .register(&mut read_listener, READ_TOKEN, Interest::READABLE)?;

        Ok(Self {
            poll,
            write_listener,
            read_listener,
            producers: HashMap::with_capacity(MAX_PRODUCERS),
            readers: Vec::new(),
            next_token: FIRST_PRODUCER_TOKEN,
            next_reader_id: 0,
            channel,
            config: config.clone(),
        })
    }

    pub fn write_addr(&self) -> io::Result<SocketAddr> {
        self.write_listener.local_addr()
    }

    pub fn read_addr(&self) -> io::Result<SocketAddr> {
        self.read_listener.local_addr()
    }

    /// Jalankan event loop sampai `shutdown` bernilai true.
    ///
    /// Saat berhenti, termasuk karena error, semua consumer yang
    /// menunggu dibatalkan dan thread-nya di-join.
    pub fn run(&mut self, shutdown: &AtomicBool) -> io::Result<()> {
        let result = self.run_loop(shutdown);
        if let Err(ref e) = result {
            error!(error = %e, "log server event loop failed");
        }

        self.stop_readers();
        info!(stats = %self.channel.stats().snapshot(), "log server stopped");
        result
    }

    fn run_loop(&mut self, shutdown: &AtomicBool) -> io::Result<()> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        let stats_interval = Duration::from_secs(self.config.stats_interval_secs);
        let mut last_stats = Instant::now();

        info!(
            write = %self.write_addr()?,
            read = %self.read_addr()?,
            capacity = self.channel.capacity(),
            policy = ?self.channel.policy(),
            "log server listening"
        );

        while !shutdown.load(Ordering::Acquire) {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                // Signal datang saat poll, cek flag lagi
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            for event in events.iter() {
                match event.token() {
                    WRITE_TOKEN => self.accept_producers(),
                    READ_TOKEN => self.accept_readers(),
                    token => self.handle_producer(token),
                }
            }

            self.reap_readers();

            if !stats_interval.is_zero() && last_stats.elapsed() >= stats_interval {
                info!(stats = %self.channel.stats().snapshot(), "log channel stats");
                last_stats = Instant::now();
            }
        }

        Ok(())
    }

    fn accept_producers(&mut self) {
        loop {
            match self.write_listener.accept() {
                Ok((stream, addr)) => {
                    if self.producers.len() >= MAX_PRODUCERS {
                        warn!(%addr, "max producers reached, rejecting");
                        continue;
                    }

                    let token = Token(self.next_token);
                    self.next_token += 1;

                    let mut conn = ProducerConnection::new(stream, addr);
                    let registered =
                        self.poll
                            .registry()
                            .register(conn.stream_mut(), token, Interest::READABLE);
                    if let Err(e) = registered {
                        warn!(%addr, error = %e, "failed to register producer");
                        continue;
                    }

                    self.producers.insert(token, conn);
                    debug!(%addr, ?token, "producer connected");
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if is_transient_accept_error(e) => continue,
                Err(e) => {
                    warn!(error = %e, "accept on write port failed");
                    break;
                }
            }
        }
    }

    fn accept_readers(&mut self) {
        loop {
            match self.read_listener.accept() {
                Ok((stream, addr)) => {
                    let stream = std::net::TcpStream::from(stream);
                    let interrupt = Interrupt::new();
                    let channel = Arc::clone(&self.channel);
                    let read_chunk = self.config.read_chunk;
                    let token = interrupt.clone();

                    let id = self.next_reader_id;
                    self.next_reader_id += 1;

                    let spawned = thread::Builder::new()
                        .name(format!("logring-reader-{}", id))
                        .spawn(move || {
                            if let Err(e) = serve_reader(channel, stream, read_chunk, token) {
                                debug!(%addr, error = %e, "log reader closed with error");
                            }
                        });

                    match spawned {
                        Ok(thread) => {
                            self.readers.push(ReaderHandle { interrupt, thread });
                            debug!(%addr, id, "reader connected");
                        }
                        Err(e) => warn!(%addr, error = %e, "failed to spawn log reader"),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if is_transient_accept_error(e) => continue,
                Err(e) => {
                    warn!(error = %e, "accept on read port failed");
                    break;
                }
            }
        }
    }

    fn handle_producer(&mut self, token: Token) {
        let conn = match self.producers.get_mut(&token) {
            Some(c) => c,
            None => return,
        };

        match conn.pump(&self.channel) {
            Ok(_) => {}
            Err(e) => {
                if e.kind() != io::ErrorKind::ConnectionReset {
                    warn!(peer = %conn.addr(), error = %e, "producer read error");
                }
                if let Some(mut conn) = self.producers.remove(&token) {
                    self.poll.registry().deregister(conn.stream_mut()).ok();
                    debug!(
                        peer = %conn.addr(),
                        received = conn.bytes_received(),
                        "producer disconnected"
                    );
                }
            }
        }
    }

    /// Buang handle thread consumer yang sudah selesai
    fn reap_readers(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = self
            .readers
            .drain(..)
            .partition(|r| r.thread.is_finished());
        self.readers = running;

        for reader in done {
            reader.thread.join().ok();
        }
    }

    fn stop_readers(&mut self) {
        for reader in &self.readers {
            self.channel.interrupt(&reader.interrupt);
        }
        for reader in self.readers.drain(..) {
            reader.thread.join().ok();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop_readers();
    }
}

/// Error accept yang hanya mengenai satu koneksi, listener tetap sehat
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

fn bind_listener(addr: &str) -> io::Result<MioTcpListener> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    Ok(MioTcpListener::from_std(listener))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig {
            write_addr: "127.0.0.1:0".to_string(),
            read_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_drop_releases_followers_without_run() {
        let channel = Arc::new(LogChannel::new(64));
        let mut server = Server::bind(&local_config(), Arc::clone(&channel)).unwrap();

        let mut consumer = TcpStream::connect(server.read_addr().unwrap()).unwrap();
        consumer
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        consumer.write_all(&[crate::network::MODE_FOLLOW]).unwrap();

        let start = Instant::now();
        while server.readers.is_empty() {
            assert!(start.elapsed() < Duration::from_secs(5), "reader never accepted");
            server.accept_readers();
            thread::sleep(Duration::from_millis(2));
        }
        thread::sleep(Duration::from_millis(50));

        // Event loop tidak pernah jalan (misal gagal di tengah), drop tetap
        // membatalkan dan join thread reader
        drop(server);

        let mut out = Vec::new();
        consumer.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(Arc::strong_count(&channel), 1);
    }

    #[test]
    fn test_transient_accept_errors() {
        let aborted = io::Error::from(io::ErrorKind::ConnectionAborted);
        let other = io::Error::from(io::ErrorKind::PermissionDenied);

        assert!(is_transient_accept_error(&aborted));
        assert!(!is_transient_accept_error(&other));
    }
}
