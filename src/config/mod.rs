//! Configuration management module

pub mod env;
pub mod model;
pub mod parser;

pub use env::EnvManager;
pub use model::Config;
pub use parser::{display_config_summary, load_config, ConfigOverrides, ConfigParser};
