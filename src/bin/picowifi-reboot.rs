//! Reboots a PicoWifi device into its USB bootloader, as an alternative to
//! replugging it with the BOOTSEL button held down.

use clap::Parser;
use clap_num::maybe_hex;
use eyre::{Result, WrapErr};
use picowifi::{reboot, RebootOutcome, PICOWIFI_PID, PICOWIFI_VID};
use rusb::Context;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// USB vendor ID of the device.
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = PICOWIFI_VID)]
    vid: u16,
    /// USB product ID of the device.
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = PICOWIFI_PID)]
    pid: u16,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ctx = Context::new().wrap_err("Could not initialize libusb")?;

    match reboot(&ctx, args.vid, args.pid)? {
        RebootOutcome::Acknowledged => tracing::info!("device is rebooting into bootloader"),
        RebootOutcome::Unacknowledged(e) => {
            tracing::info!(error = %e, "device dropped off the bus, it should be in bootloader mode")
        }
    }
    Ok(())
}
