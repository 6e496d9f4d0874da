//! Command line interface.

use clap::Parser;
use config::Overrides;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "freshcve",
    version,
    about = "Fetches CVE feeds from remote sources and serves the merged snapshot",
    long_about = "Periodically fetches vulnerability records from every configured source, \
                  merges them into one deduplicated snapshot and serves it over HTTP.\n\nRun \
                  `freshcve --print-config > freshcve.toml` for a starting configuration."
)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON, chosen by extension)
    #[arg(short, long, value_name = "FILE", required_unless_present = "print_config")]
    pub config: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Load, validate and resolve the configuration, then exit
    #[arg(long)]
    pub check: bool,

    /// Listen address
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Listen port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Persisted snapshot file
    #[arg(long, value_name = "PATH")]
    pub cache_path: Option<PathBuf>
}

impl Cli {
    /// Settings given on the command line, applied over file and environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            address: self.address.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            cache_path: self.cache_path.clone(),
            ..Overrides::default()
        }
    }
}
