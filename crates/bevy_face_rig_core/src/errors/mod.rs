mod catalog_error;
mod config_error;

pub use catalog_error::*;
pub use config_error::*;
