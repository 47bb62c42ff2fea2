//! Stores WiFi credentials in a UF2 file for a PicoWifi device.
//!
//! Copy the resulting file onto the device while it is in BOOTSEL mode.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr};
use picowifi::uf2::Uf2Block;
use picowifi::{write_uf2, FieldPolicy, WifiCredentials};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path where the UF2 file will be written to.
    #[arg(short, long, default_value = "wificred.uf2")]
    output: PathBuf,
    /// Network name. Prompted for when missing.
    #[arg(long)]
    ssid: Option<String>,
    /// Network passphrase. Prompted for when missing.
    #[arg(long)]
    password: Option<String>,
    /// Fail on SSIDs or passwords longer than 64 bytes instead of truncating.
    #[arg(long)]
    strict: bool,
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    // keep spaces, they are valid in SSIDs and passphrases
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let ssid = match args.ssid {
        Some(s) => s,
        None => prompt("WIFI SSID")?,
    };
    let password = match args.password {
        Some(p) => p,
        None => prompt("WIFI Password")?,
    };

    let policy = if args.strict {
        FieldPolicy::Reject
    } else {
        FieldPolicy::Truncate
    };
    let creds = WifiCredentials::new(&ssid, &password, policy)?;
    let block = Uf2Block::from_credentials(&creds)?.to_bytes()?;

    write_uf2(&args.output, &block)
        .wrap_err_with(|| format!("Could not create '{}'", args.output.display()))?;
    tracing::info!(ssid = %creds.ssid(), path = %args.output.display(), "credentials written");
    Ok(())
}
