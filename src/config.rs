use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use anyhow::{Context, Result};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The address the server binds to. Its IP is recorded as the
    /// server-side address of every session created through it.
    pub bind_addr: SocketAddr,
    /// Directory holding `public.pem` / `private.pem`.
    pub keys_dir: PathBuf,
    /// RSA modulus size used when generating a fresh keypair.
    pub rsa_key_bits: usize,
    /// Seconds of inactivity before an Active session is demoted to Idle.
    pub idle_threshold_secs: u64,
    /// Seconds between idle-reaper passes.
    pub reaper_interval_secs: u64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            keys_dir: env::var("KEYS_DIR")
                .unwrap_or_else(|_| "keys".to_string())
                .into(),
            rsa_key_bits: env::var("RSA_KEY_BITS")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .context("Invalid RSA_KEY_BITS")?,
            idle_threshold_secs: env::var("IDLE_THRESHOLD_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid IDLE_THRESHOLD_SECS")?,
            reaper_interval_secs: env::var("REAPER_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid REAPER_INTERVAL_SECS")?,
        })
    }
}
