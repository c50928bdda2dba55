//! # xshim Common
//!
//! Configuration, error types, and logging setup shared by the xshim crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ShimConfig, WindowConfig};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
