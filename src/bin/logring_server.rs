//! logring Server Binary
//!
//! Satu log channel di memori, dua port TCP:
//! - write port: semua byte dari producer masuk ke channel
//! - read port:  consumer membaca channel (follow atau drain sekali)
//!
//! Usage:
//!   cargo run --release --bin logring_server -- [OPTIONS]

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logring::config::LogConfig;
use logring::core::{DrainPolicy, LogChannel};
use logring::network::Server;

/// Di-set oleh signal handler, dibaca oleh event loop
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    // Hanya operasi async-signal-safe di sini
    SHUTDOWN.store(true, Ordering::Release);
}

#[cfg(unix)]
fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn print_help() {
    println!("logring Server - bounded in-memory log channel\n");
    println!("Usage: logring_server [OPTIONS]\n");
    println!("Options:");
    println!("  -c, --config <FILE>   TOML config file (loaded before other flags)");
    println!("  -w, --write <ADDR>    Producer address (default: 127.0.0.1:9998)");
    println!("  -r, --read <ADDR>     Consumer address (default: 127.0.0.1:9999)");
    println!("      --capacity <N>    Ring slots, usable = N - 1 (default: 1024)");
    println!("      --drain <POLICY>  destructive | peek-commit (default: destructive)");
    println!("      --chunk <N>       Max bytes per consumer read (default: 1024)");
    println!("      --stats <SECS>    Log stats every SECS seconds (default: off)");
    println!("  -h, --help            Show this help");
}

fn parse_args() -> Result<LogConfig, String> {
    let args: Vec<String> = std::env::args().collect();

    // --config dulu supaya flag lain bisa override isi file
    let mut config = match args
        .iter()
        .position(|a| a == "--config" || a == "-c")
        .and_then(|i| args.get(i + 1))
    {
        Some(path) => LogConfig::load(path).map_err(|e| e.to_string())?,
        None => LogConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => i += 1,
            "--write" | "-w" => {
                if let Some(v) = value {
                    config.server.write_addr = v.clone();
                    i += 1;
                }
            }
            "--read" | "-r" => {
                if let Some(v) = value {
                    config.server.read_addr = v.clone();
                    i += 1;
                }
            }
            "--capacity" => {
                if let Some(v) = value {
                    config.channel.capacity = v
                        .parse()
                        .map_err(|_| format!("invalid --capacity: {}", v))?;
                    i += 1;
                }
            }
            "--drain" => {
                if let Some(v) = value {
                    config.channel.drain = match v.as_str() {
                        "destructive" => DrainPolicy::Destructive,
                        "peek-commit" => DrainPolicy::PeekCommit,
                        other => return Err(format!("invalid --drain: {}", other)),
                    };
                    i += 1;
                }
            }
            "--chunk" => {
                if let Some(v) = value {
                    config.server.read_chunk =
                        v.parse().map_err(|_| format!("invalid --chunk: {}", v))?;
                    i += 1;
                }
            }
            "--stats" => {
                if let Some(v) = value {
                    config.server.stats_interval_secs =
                        v.parse().map_err(|_| format!("invalid --stats: {}", v))?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let channel = match LogChannel::from_config(&config.channel) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    install_signal_handlers();

    let result = Server::bind(&config.server, channel).and_then(|mut server| server.run(&SHUTDOWN));
    if let Err(e) = result {
        error!(error = %e, "server error");
        process::exit(1);
    }

    info!("bye");
}
