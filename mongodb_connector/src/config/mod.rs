mod config_error;
mod connector_config;
mod connector_config_builder;

pub use config_error::*;
pub use connector_config::*;
pub use connector_config_builder::*;
