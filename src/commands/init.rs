//! Init command - write a starter config file.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

pub fn handle_init(path: Option<PathBuf>, overwrite: bool) -> Result<()> {
    let config_path = Config::generate_config_file(path, overwrite)?;
    println!("Config file generated at: {}", config_path.display());
    Ok(())
}
