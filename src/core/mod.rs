//! Core module: bounded lossy log channel
//!
//! Prinsip desain:
//! - Bounded: storage dialokasikan sekali, tidak pernah tumbuh
//! - Lossy: ring penuh = byte tertua dibuang, producer tidak pernah block
//! - Blocking reads: consumer tidur di Condvar sampai ada data

mod channel;
mod ring_buffer;
mod sink;
mod staging;
mod stats;

pub use channel::{DrainPolicy, Interrupt, LogChannel};
pub use ring_buffer::{CircularLogBuffer, DEFAULT_CAPACITY, MIN_CAPACITY};
pub use sink::{ByteSink, SliceSink};
pub use staging::StagingBuffer;
pub use stats::{ChannelStats, StatsSnapshot};
