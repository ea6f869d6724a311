//! logring Client - producer dan consumer untuk logring_server
//!
//! # Usage
//!
//! ```text
//! logring_client write "hello world"      # kirim argumen ke write port
//! echo hi | logring_client write          # kirim stdin
//! logring_client tail                     # follow log (blocking)
//! logring_client dump                     # ambil isi log sekarang lalu keluar
//! ```
//!
//! # Options
//!
//! - `--write-addr ADDR` - Producer address (default: 127.0.0.1:9998)
//! - `--read-addr ADDR` - Consumer address (default: 127.0.0.1:9999)

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;

use logring::network::{MODE_FOLLOW, MODE_NON_BLOCKING};

enum Command {
    Write(Option<String>),
    Tail,
    Dump,
}

struct ClientConfig {
    write_addr: String,
    read_addr: String,
    command: Command,
}

fn print_help() {
    println!("logring Client\n");
    println!("Usage: logring_client [OPTIONS] <write [MSG] | tail | dump>\n");
    println!("Options:");
    println!("  --write-addr <ADDR>  Producer address (default: 127.0.0.1:9998)");
    println!("  --read-addr <ADDR>   Consumer address (default: 127.0.0.1:9999)");
    println!("  -h, --help           Show this help");
}

fn parse_args() -> Result<ClientConfig, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut write_addr = "127.0.0.1:9998".to_string();
    let mut read_addr = "127.0.0.1:9999".to_string();
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--write-addr" => {
                write_addr = args.get(i + 1).ok_or("--write-addr needs a value")?.clone();
                i += 1;
            }
            "--read-addr" => {
                read_addr = args.get(i + 1).ok_or("--read-addr needs a value")?.clone();
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("write") => Command::Write(
            positional
                .get(1..)
                .filter(|rest| !rest.is_empty())
                .map(|rest| rest.join(" ")),
        ),
        Some("tail") => Command::Tail,
        Some("dump") => Command::Dump,
        Some(other) => return Err(format!("unknown command: {}", other)),
        None => return Err("missing command (write | tail | dump)".to_string()),
    };

    Ok(ClientConfig {
        write_addr,
        read_addr,
        command,
    })
}

fn run_write(addr: &str, message: Option<String>) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;

    match message {
        Some(msg) => stream.write_all(msg.as_bytes())?,
        None => {
            io::copy(&mut io::stdin().lock(), &mut stream)?;
        }
    }

    stream.shutdown(Shutdown::Write)
}

fn run_read(addr: &str, mode: u8) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(&[mode])?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut stream, &mut out)?;
    out.flush()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            print_help();
            process::exit(2);
        }
    };

    let result = match config.command {
        Command::Write(msg) => run_write(&config.write_addr, msg),
        Command::Tail => run_read(&config.read_addr, MODE_FOLLOW),
        Command::Dump => run_read(&config.read_addr, MODE_NON_BLOCKING),
    };

    if let Err(e) = result {
        error!(error = %e, "client error");
        process::exit(1);
    }
}
