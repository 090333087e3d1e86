use std::path::Path;

use gpfolio_core::config::{AppConfig, LoadOptions};
use gpfolio_core::load_taxonomy;

use super::CommandResult;

/// Parses the taxonomy from `source`, else the configured source path, else
/// the built-in framework. Config errors only matter when no source is given.
pub fn run(source: Option<&Path>) -> CommandResult {
    let configured = match source {
        Some(path) => Some(path.to_path_buf()),
        None => match AppConfig::load(LoadOptions::default()) {
            Ok(config) => config.capabilities.source_path,
            Err(error) => {
                return CommandResult::failure("capabilities", "config_validation", error.to_string(), 2)
            }
        },
    };

    match load_taxonomy(configured.as_deref()) {
        Ok(taxonomy) => CommandResult::document("capabilities", &taxonomy),
        Err(error) => CommandResult::failure("capabilities", "taxonomy", error.to_string(), 2),
    }
}
