//! dirdisk CLI - Serve a host directory as an MSX-DOS floppy.
//!
//! Usage:
//!   dirdisk [--sync MODE] [--boot dos1|dos2] [--config FILE] <command>
//!
//! Examples:
//!   dirdisk ls games/                         # Show the disk directory
//!   dirdisk export games/ games.dsk           # Write a raw 720KB image
//!   dirdisk import games.dsk unpacked/        # Unpack an image into a directory
//!   dirdisk watch games/ --cache games.json   # Keep re-scanning until Ctrl-C

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{info, LevelFilter, Log, Metadata, Record};

use dirdisk_core::geometry::CLUSTER_SIZE;
use dirdisk_core::{
    load_snapshot, read_image, save_snapshot, write_image, BootSectorKind, DirAsDisk,
    DiskConfig, ScanReport, SyncMode, NUM_SECTORS, SECTOR_SIZE,
};

/// MSX directory-as-disk tool
#[derive(Parser, Debug)]
#[command(name = "dirdisk")]
#[command(about = "Present a host directory as an MSX FAT12 floppy")]
struct Args {
    /// Enable engine tracing
    #[arg(short, long, global = true)]
    trace: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sync mode: readonly, cached-write, no-delete or full
    #[arg(long, global = true)]
    sync: Option<SyncMode>,

    /// Boot sector dialect: dos1 or dos2
    #[arg(long, global = true)]
    boot: Option<BootSectorKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the directory as MSX-DOS sees it
    Ls { dir: PathBuf },
    /// Write the synthesized disk to a raw image file
    Export { dir: PathBuf, image: PathBuf },
    /// Replay a raw image into an empty directory
    Import { image: PathBuf, dir: PathBuf },
    /// Re-scan the directory periodically until Ctrl-C
    Watch {
        dir: PathBuf,
        /// Re-scan interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Snapshot file restored at start and saved on exit
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

/// Logger writing `[LEVEL] message` lines to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(trace: bool) {
    let level = if trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

fn load_config(args: &Args) -> Result<DiskConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => DiskConfig::load(path)?,
        None => DiskConfig::default(),
    };
    if let Some(mode) = args.sync {
        config.sync_mode = mode;
    }
    if let Some(kind) = args.boot {
        config.boot_sector = kind;
    }
    Ok(config)
}

fn list(dir: &Path, config: DiskConfig) -> Result<(), Box<dyn Error>> {
    let disk = DirAsDisk::open(dir, config)?;
    println!(
        "{:>4}  {:<12}  {:<24}  {:>8}  {:>5}  {:>8}",
        "SLOT", "NAME", "HOST FILE", "SIZE", "START", "CLUSTERS"
    );
    for (slot, entry) in disk.entries().iter().enumerate() {
        if !entry.in_use() {
            continue;
        }
        println!(
            "{:>4}  {:<12}  {:<24}  {:>8}  {:>5}  {:>8}",
            slot,
            entry.short_name,
            entry.host_name,
            entry.image.size(),
            entry.image.start_cluster(),
            disk.chain(slot).len()
        );
    }
    println!(
        "{} bytes free ({} sync)",
        disk.free_clusters() * CLUSTER_SIZE,
        disk.sync_mode()
    );
    Ok(())
}

fn export(dir: &Path, image: &Path, config: DiskConfig) -> Result<(), Box<dyn Error>> {
    let mut disk = DirAsDisk::open(dir, config)?;
    let bytes = read_image(&mut disk);
    std::fs::write(image, &bytes)?;
    eprintln!("Wrote {} ({} bytes)", image.display(), bytes.len());
    Ok(())
}

fn import(image: &Path, dir: &Path, config: DiskConfig) -> Result<(), Box<dyn Error>> {
    if config.sync_mode == SyncMode::ReadOnly {
        return Err("cannot import with a read-only sync mode".into());
    }
    let bytes = std::fs::read(image)?;
    let expected = NUM_SECTORS as usize * SECTOR_SIZE;
    if bytes.len() != expected {
        return Err(format!(
            "{} is {} bytes, expected a {} byte image",
            image.display(),
            bytes.len(),
            expected
        )
        .into());
    }
    std::fs::create_dir_all(dir)?;
    if std::fs::read_dir(dir)?.next().is_some() {
        return Err(format!("{} is not empty", dir.display()).into());
    }

    let mut disk = DirAsDisk::open(dir, config)?;
    write_image(&mut disk, &bytes);
    for entry in disk.entries().iter().filter(|e| e.in_use()) {
        println!("{:<12}  {:>8} bytes", entry.host_name, entry.known_size);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    for name in &report.added {
        println!("+ {}", name);
    }
    for name in &report.updated {
        println!("~ {}", name);
    }
    for name in &report.removed {
        println!("- {}", name);
    }
}

async fn watch(
    dir: &Path,
    config: DiskConfig,
    interval_ms: u64,
    cache: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut disk = DirAsDisk::open(dir, config)?;
    if let Some(path) = cache.as_deref().filter(|p| p.exists()) {
        disk.restore(&load_snapshot(path)?)?;
        info!("restored {}", path.display());
        print_report(&disk.rescan());
    }
    eprintln!("Watching {} (Ctrl-C to stop)", dir.display());

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                break;
            }
            _ = ticker.tick() => {
                // Host I/O is blocking; keep it off the runtime threads
                let (returned, report) = tokio::task::spawn_blocking(move || {
                    let report = disk.rescan();
                    (disk, report)
                })
                .await?;
                disk = returned;
                print_report(&report);
            }
        }
    }

    if let Some(path) = &cache {
        save_snapshot(path, &disk.snapshot())?;
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.trace);
    let config = load_config(&args)?;

    match args.command {
        Command::Ls { dir } => list(&dir, config),
        Command::Export { dir, image } => export(&dir, &image, config),
        Command::Import { image, dir } => import(&image, &dir, config),
        Command::Watch {
            dir,
            interval_ms,
            cache,
        } => watch(&dir, config, interval_ms, cache).await,
    }
}
