pub mod config;
pub mod error;
pub mod types;

pub use config::{SiteConfig, load_site_config, parse_site_toml};
pub use error::{Error, Result};
pub use types::*;
