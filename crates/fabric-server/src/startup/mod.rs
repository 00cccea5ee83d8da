//! Process startup: configuration loading, logging and shutdown signalling

pub mod config;
pub mod logging;
pub mod shutdown;

pub use config::{Cli, load_configuration};
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{ShutdownSignal, listen_for_os_signals};
