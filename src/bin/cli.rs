//! norkv CLI
//!
//! Interactive front end: collects key/value pairs, stores them on a
//! file-backed flash image and prints the replayed log on exit.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use norkv::{shell, Config, FileFlash, FlashDevice, MapStore};
use tracing_subscriber::{fmt, EnvFilter};

/// norkv CLI
#[derive(Parser, Debug)]
#[command(name = "norkv-cli")]
#[command(about = "Key-value map on a simulated NOR flash image")]
#[command(version)]
struct Args {
    /// Flash image file (created erased if missing)
    #[arg(short, long, default_value = "./norkv_flash.bin")]
    flash: PathBuf,

    /// Chip-erase the image before opening
    #[arg(long)]
    erase: bool,

    /// Cap the log at this many records
    #[arg(short = 'n', long)]
    max_records: Option<u32>,
}

fn main() {
    // Logs go to stderr so they don't interleave with prompts
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> norkv::Result<()> {
    let mut builder = Config::builder().flash_path(&args.flash);
    if let Some(max) = args.max_records {
        builder = builder.max_records(max);
    }
    let config = builder.build();

    tracing::info!("norkv v{}", norkv::VERSION);
    tracing::info!("Flash image: {}", config.flash_path.display());

    let mut device = FileFlash::new(&config.flash_path, config.geometry);
    if args.erase {
        device.init()?;
        device.chip_erase()?;
        tracing::info!("Flash image erased");
    }

    let mut store = MapStore::open(device, &config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let summary = shell::run(&mut store, stdin.lock(), &mut stdout)?;
    tracing::info!(added = summary.added, stored = summary.stored, "session finished");

    store.close()?;
    println!("Memory released. Exiting.");

    Ok(())
}
