//! Talks to a running PicoWifi device over its vendor interface.

use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use eyre::{Result, WrapErr};
use picowifi::{
    AuthType, FieldPolicy, PicoWifiConnection, RebootOutcome, WifiCredentials, PICOWIFI_PID,
    PICOWIFI_VID,
};
use rusb::Context;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// USB vendor ID of the device.
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = PICOWIFI_VID)]
    vid: u16,
    /// USB product ID of the device.
    #[arg(long, value_parser = maybe_hex::<u16>, default_value_t = PICOWIFI_PID)]
    pid: u16,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show link state, signal strength and rate.
    Status,
    /// Join a network without touching the credentials in flash.
    Connect {
        #[arg(long)]
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long, value_enum, default_value_t = Auth::Wpa2)]
        auth: Auth,
    },
    /// Reboot into the USB bootloader.
    Reboot,
}

#[derive(Clone, Copy, ValueEnum)]
enum Auth {
    Open,
    Wpa,
    Wpa2,
    Mixed,
}

impl From<Auth> for AuthType {
    fn from(a: Auth) -> Self {
        match a {
            Auth::Open => AuthType::Open,
            Auth::Wpa => AuthType::WpaTkipPsk,
            Auth::Wpa2 => AuthType::Wpa2AesPsk,
            Auth::Mixed => AuthType::Wpa2MixedPsk,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ctx = Context::new().wrap_err("Could not initialize libusb")?;
    let mut conn = PicoWifiConnection::open(&ctx, args.vid, args.pid)?;

    match args.command {
        Command::Status => {
            let status = conn.status()?;
            println!("link up: {}", status.link_up());
            println!("status:  {:?}", status.link_status());
            println!("rssi:    {} dBm", status.rssi());
            println!("rate:    {}", status.rate());
        }
        Command::Connect {
            ssid,
            password,
            auth,
        } => {
            let creds = WifiCredentials::new(&ssid, &password, FieldPolicy::Reject)?
                .with_auth(auth.into());
            conn.configure(&creds)?;
            tracing::info!(ssid = %creds.ssid(), "connect request sent");
        }
        Command::Reboot => {
            match conn.reboot_to_bootloader()? {
                RebootOutcome::Acknowledged => tracing::info!("device is rebooting into bootloader"),
                RebootOutcome::Unacknowledged(e) => {
                    tracing::info!(error = %e, "device dropped off the bus, it should be in bootloader mode")
                }
            }
        }
    }
    Ok(())
}
