//! scm-receiver: rtl_tcp-driven daemon that decodes Standard Consumption
//! Messages from the 900 MHz ISM band.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use scm_core::config::{Config, DEFAULT_CENTER_FREQ, DEFAULT_SERVER_ADDR, SAMPLE_RATE};

mod overlap;
mod receiver;
mod sinks;
mod tuner;

use overlap::OverlappedSource;
use receiver::ReceiverLoop;
use sinks::{CaptureSink, LogSink};
use tuner::TunerClient;

type DynWrite = Box<dyn Write + Send>;

#[derive(Parser)]
#[command(name = "scm-receiver", version, about = "SCM receiver daemon")]
struct Cli {
    /// Tuner server endpoint (rtl_tcp protocol).
    #[arg(long, default_value = DEFAULT_SERVER_ADDR)]
    addr: String,

    /// Destination for decoded records and diagnostics; stdout if absent.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Destination for raw I/Q captures around each decoded packet; no
    /// captures are written if absent.
    #[arg(long)]
    sample_file: Option<PathBuf>,

    /// Tuner center frequency, in Hz.
    #[arg(long, default_value_t = DEFAULT_CENTER_FREQ)]
    freq: u32,

    /// Wall-clock run time in seconds; 0 means unbounded.
    #[arg(long, default_value_t = 0)]
    duration: u64,
}

fn main() {
    let cli = Cli::parse();
    let config = Config {
        server_addr: cli.addr.clone(),
        center_freq: cli.freq,
        duration: if cli.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(cli.duration))
        },
    };

    if let Err(e) = run(cli, config) {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: Config) -> scm_core::types::Result<()> {
    let tuner = TunerClient::connect(&config.server_addr, SAMPLE_RATE, config.center_freq)?;
    let source = OverlappedSource::spawn(tuner);

    let log_writer: DynWrite = match &cli.log_file {
        Some(path) => Box::new(
            File::create(path).unwrap_or_else(|e| {
                eprintln!("fatal: opening log file {}: {e}", path.display());
                std::process::exit(1);
            }),
        ),
        None => Box::new(io::stdout()),
    };
    let log = LogSink::new(log_writer);

    let capture = match &cli.sample_file {
        Some(path) => {
            let writer: DynWrite = Box::new(File::create(path).unwrap_or_else(|e| {
                eprintln!("fatal: opening sample file {}: {e}", path.display());
                std::process::exit(1);
            }));
            Some(CaptureSink::new(writer))
        }
        None => None,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_cancel.store(true, Ordering::Relaxed);
    })
    .expect("installing Ctrl-C handler");

    let mut loop_ = ReceiverLoop::new(
        source,
        log,
        capture,
        io::stderr(),
        cancel,
        config.duration,
    );
    loop_.run()
}
