use std::{fs::File, io::BufReader};

use log::info;

use crate::{
    error::ConfigError,
    parser::{parse_config, Config},
};

/// The YARC control word layout and its rules.
pub const YARC: &str = include_str!("../config/yarc.ucfg");

/// Reads the configuration at `path`, or the built-in YARC layout.
pub fn load(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
            parse_config(BufReader::new(file))?
        }
        None => parse_config(YARC.as_bytes())?,
    };
    info!(
        "{} controls, {} fields, {} arrows, {} rules",
        config.controls.len(),
        config.fields.len(),
        config.arrows.len(),
        config.rules.len()
    );
    Ok(config)
}
