//! logring - Bounded In-Memory Log Channel
//!
//! Arsitektur:
//! - Circular byte ring dengan overwrite-on-full (lossy, tanpa backpressure)
//! - Blocking / non-blocking reads lewat Mutex + Condvar
//! - Endpoint TCP tipis untuk producer dan consumer
//!
//! ```
//! use logring::core::LogChannel;
//!
//! let chan = LogChannel::new(8);
//! chan.write(b"ABCDEFG");
//! chan.write(b"H"); // ring penuh, 'A' dibuang
//!
//! assert_eq!(chan.read(10, false).unwrap(), b"BCDEFGH");
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod network;

pub use crate::config::{ChannelConfig, LogConfig, ServerConfig};
pub use crate::core::{DrainPolicy, Interrupt, LogChannel};
pub use crate::error::{ConfigError, ReadError, SinkFault};

/// Format lalu tulis ke channel, seperti `printf` ke log.
///
/// Returns jumlah byte yang di-enqueue (setelah truncation).
///
/// ```
/// use logring::{logprint, LogChannel};
///
/// let chan = LogChannel::new(64);
/// logprint!(chan, "seq={} status={}", 1, "ok");
/// assert_eq!(chan.read(64, true).unwrap(), b"seq=1 status=ok");
/// ```
#[macro_export]
macro_rules! logprint {
    ($chan:expr, $($arg:tt)*) => {
        $chan.print(::core::format_args!($($arg)*))
    };
}
