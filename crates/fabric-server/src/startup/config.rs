//! Builds the server configuration from file, environment and command line
//!
//! Later sources win: `conf/fabric.yml` (or `--config`), then `FABRIC_*`
//! environment variables, then command-line flags.

use clap::Parser;
use config::{Config, Environment, File};

use fabric_common::config::{
    DATASET_EXECUTOR_ADDRESS, DATASET_EXECUTOR_PORT, DATASET_EXECUTOR_THREADS, LOGGING_DIR,
    LOGGING_LEVEL,
};
use fabric_common::{Configuration, FabricError};

pub const DEFAULT_CONFIG_FILE: &str = "conf/fabric.yml";

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "fabric-server", about = "Dataset operation executor service")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,
    /// Bind address of the executor service
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,
    /// Port of the executor service; 0 picks a free port
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Worker threads of the executor service
    #[arg(short = 't', long = "threads")]
    pub threads: Option<u16>,
    #[arg(long = "log-dir", env = "FABRIC_LOG_DIR")]
    pub log_dir: Option<String>,
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

pub fn load_configuration(cli: &Cli) -> Result<Configuration, FabricError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(&cli.config).required(false))
        .add_source(
            Environment::with_prefix("FABRIC")
                .separator("_")
                .try_parsing(true),
        );

    if let Some(address) = &cli.address {
        builder = builder.set_override(DATASET_EXECUTOR_ADDRESS, address.as_str())?;
    }
    if let Some(port) = cli.port {
        builder = builder.set_override(DATASET_EXECUTOR_PORT, i64::from(port))?;
    }
    if let Some(threads) = cli.threads {
        builder = builder.set_override(DATASET_EXECUTOR_THREADS, i64::from(threads))?;
    }
    if let Some(log_dir) = &cli.log_dir {
        builder = builder.set_override(LOGGING_DIR, log_dir.as_str())?;
    }
    if let Some(log_level) = &cli.log_level {
        builder = builder.set_override(LOGGING_LEVEL, log_level.as_str())?;
    }

    Ok(Configuration::new(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("fabric-server").chain(args.iter().copied()))
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let configuration = load_configuration(&cli(&["--config", "/nonexistent/fabric.yml"])).unwrap();
        assert_eq!(configuration.executor_port(), 15165);
        assert_eq!(configuration.executor_threads(), 20);
    }

    #[test]
    fn test_file_and_flags() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "dataset:\n  executor:\n    port: 18000\n    threads: 4\n  namespace: team"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let configuration = load_configuration(&cli(&["--config", &path])).unwrap();
        assert_eq!(configuration.executor_port(), 18000);
        assert_eq!(configuration.executor_threads(), 4);
        assert_eq!(configuration.dataset_namespace(), "team");

        let configuration =
            load_configuration(&cli(&["--config", &path, "--port", "0", "--threads", "2"])).unwrap();
        assert_eq!(configuration.executor_port(), 0);
        assert_eq!(configuration.executor_threads(), 2);
    }
}
