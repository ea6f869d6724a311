//! Network Layer: TCP endpoint untuk log channel
//!
//! Menggunakan mio untuk producer (non-blocking multiplexing) dan
//! thread per consumer untuk blocking read.
//!
//! Tidak ada framing: kedua arah adalah byte stream mentah. Satu-satunya
//! protokol adalah byte mode pertama dari consumer.

mod connection;
mod server;

pub use connection::{serve_reader, ProducerConnection, MODE_FOLLOW, MODE_NON_BLOCKING};
pub use server::Server;
