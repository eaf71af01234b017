use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:4221";
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Settings fixed at server construction and shared read-only with every handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    /// Root for `/files/<name>`. File routes answer 500 without it.
    pub directory: Option<PathBuf>,
    /// Size of the single read each connection gets. Longer requests are truncated.
    pub read_buffer_size: usize,
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            directory: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tcp-http-server", about = "A small HTTP/1.1 server over raw TCP")]
pub struct Cli {
    /// Directory served and written by /files/<name>
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Bytes read from each connection before parsing
    #[arg(long, default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,

    /// How long shutdown waits for in-flight connections, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub grace_period_ms: u64,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            address: cli.address,
            directory: cli.directory,
            read_buffer_size: cli.read_buffer_size.max(1),
            grace_period: Duration::from_millis(cli.grace_period_ms),
        }
    }
}
