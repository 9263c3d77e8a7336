//! Commands enum.

use clap::{Args, Subcommand};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a download against the simulated engine and print its events
    Simulate(SimulateArgs),

    /// Show size and MIME type of a local file (path or file:// URI)
    FileInfo {
        /// File path or file:// URI
        path: String,
    },

    /// Print the tracker version
    Version,
}

/// Arguments of the `simulate` command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Download ID
    #[arg(long, default_value = "demo")]
    pub id: String,

    /// Source URL
    #[arg(long, default_value = "https://downloads.example.com/demo.bin")]
    pub url: String,

    /// Destination, relative to the downloads directory
    #[arg(long = "dest", default_value = "demo.bin")]
    pub destination: String,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Only transfer over Wi-Fi
    #[arg(long)]
    pub wifi_only: bool,

    /// Simulated file size in bytes
    #[arg(long, default_value_t = 4 * 1024 * 1024)]
    pub size: u64,

    /// Simulated rate in bytes per second
    #[arg(long, default_value_t = 1024 * 1024)]
    pub rate: u64,

    /// Time spent pending before the transfer starts (milliseconds)
    #[arg(long, default_value_t = 500)]
    pub start_delay_ms: u64,

    /// Fail halfway with this reason code (e.g. insufficient-space)
    #[arg(long)]
    pub fail: Option<String>,

    /// Stop the download after this many milliseconds
    #[arg(long)]
    pub stop_after_ms: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}
