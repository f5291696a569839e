//! watchdump — copy activity files off a TomTom GPS watch over USB.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use watchdump_core::config::{parse_number, WatchdumpConfig};
use watchdump_core::{FailurePolicy, FileFilter, Watch};

mod storage;
mod usb;

use storage::DirectorySink;
use usb::{UsbRuntime, UsbWatch};

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct Options {
    vendor_id:  Option<u16>,
    product_id: Option<u16>,
    all:        bool,
    list:       bool,
    keep_going: bool,
    out:        Option<PathBuf>,
    config:     Option<PathBuf>,
    help:       bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--vid" => {
                i += 1;
                let v = args.get(i).context("--vid requires a value")?;
                opts.vendor_id = Some(parse_number(v).context("--vid must be a 16-bit number")?);
            }
            "--pid" => {
                i += 1;
                let v = args.get(i).context("--pid requires a value")?;
                opts.product_id = Some(parse_number(v).context("--pid must be a 16-bit number")?);
            }
            "--out" => {
                i += 1;
                opts.out = Some(args.get(i).context("--out requires a directory")?.into());
            }
            "--config" => {
                i += 1;
                opts.config = Some(args.get(i).context("--config requires a path")?.into());
            }
            "--all"                   => opts.all = true,
            "--list"                  => opts.list = true,
            "--keep-going"            => opts.keep_going = true,
            "help" | "--help" | "-h"  => opts.help = true,
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }
    Ok(opts)
}

fn print_usage() {
    println!("Usage: watchdump [options]");
    println!();
    println!("Copies activity files from the watch into the output directory.");
    println!();
    println!("Options:");
    println!("  --vid <id>        USB vendor id (default: 0x1390)");
    println!("  --pid <id>        USB product id (default: 0x7474)");
    println!("  --all             Extract every file, not just activity tracks");
    println!("  --list            List the files on the watch and exit");
    println!("  --keep-going      Continue with the next file after a failed read");
    println!("  --out <dir>       Output directory (default: .)");
    println!("  --config <path>   Config file (default: ~/.config/watchdump/config.toml)");
}

fn apply_options(config: &mut WatchdumpConfig, opts: &Options) {
    if let Some(v) = opts.vendor_id {
        config.device.vendor_id = v;
    }
    if let Some(p) = opts.product_id {
        config.device.product_id = p;
    }
    if let Some(out) = &opts.out {
        config.output.directory = out.clone();
    }
    config.output.all_files |= opts.all;
    config.output.keep_going |= opts.keep_going;
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_list(watch: &mut Watch<UsbWatch>) -> Result<()> {
    let files = watch.list_files().context("failed to read the file directory")?;

    println!("═══════════════════════════════════════");
    println!("  Files on watch ({})", files.len());
    println!("═══════════════════════════════════════");
    for f in &files {
        let kind = if f.is_track() { "track" } else { "" };
        println!("  {:08X}  {:>8} bytes  {}", f.id(), f.length(), kind);
    }
    Ok(())
}

fn cmd_extract(watch: &mut Watch<UsbWatch>, config: &WatchdumpConfig) -> Result<()> {
    let filter = if config.output.all_files { FileFilter::All } else { FileFilter::TracksOnly };
    let policy = if config.output.keep_going { FailurePolicy::Continue } else { FailurePolicy::Abort };

    let mut sink = DirectorySink::new(&config.output.directory)?;
    let outcome = watch.extract(filter, policy, &mut sink);

    // Whatever was written before a failure is still worth a manifest.
    let manifest = sink.write_manifest()?;
    let summary = outcome?;

    for entry in sink.entries() {
        println!("  {}  {}", entry.id, entry.name);
    }
    println!("Extracted {} files to {}", summary.extracted.len(), sink.root().display());
    println!("Skipped   {} files", summary.skipped);
    println!("Manifest  {}", manifest.display());
    for failure in &summary.failed {
        eprintln!("Failed    {failure}");
    }
    if !summary.failed.is_empty() {
        bail!("{} files could not be read", summary.failed.len());
    }
    Ok(())
}

fn run(usb: &UsbRuntime, config: &WatchdumpConfig, list: bool) -> Result<()> {
    let device = UsbWatch::open(
        usb,
        config.device.vendor_id,
        config.device.product_id,
        config.device.interface,
    )
    .context("failed to access the watch")?;

    if let Some(product) = device.product() {
        tracing::info!(product = %product, "device");
    }
    if let Some(serial) = device.serial_number() {
        tracing::info!(serial = %serial, "serial number");
    }

    let mut watch = Watch::with_config(device, &config.protocol);
    if list {
        cmd_list(&mut watch)
    } else {
        cmd_extract(&mut watch, config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{e:#}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };
    if opts.help {
        print_usage();
        return Ok(());
    }

    let mut config = match &opts.config {
        Some(path) => WatchdumpConfig::load_from(path)?,
        None => {
            if let Err(e) = WatchdumpConfig::write_default_if_missing() {
                tracing::debug!(error = %e, "could not write default config");
            }
            WatchdumpConfig::load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to load config, using defaults");
                WatchdumpConfig::default()
            })
        }
    };
    apply_options(&mut config, &opts);

    let usb = UsbRuntime::init()?;
    let result = run(&usb, &config, opts.list);
    usb.shutdown();
    result
}
