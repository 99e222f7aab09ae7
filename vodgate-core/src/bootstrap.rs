//! Configuration loading

use anyhow::Result;

use crate::Config;

/// Load configuration from a config file and the environment
///
/// Config file search order:
/// 1. `explicit` (from the command line)
/// 2. `VODGATE_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. Fall back to environment variables only
///
/// Runs before logging is initialised, so progress goes to stderr.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    if let Some(path) = explicit {
        if !std::path::Path::new(path).exists() {
            return Err(anyhow::anyhow!("Config file {path} does not exist"));
        }
    }

    let config_path = explicit
        .map(str::to_string)
        .or_else(|| {
            std::env::var("VODGATE_CONFIG_PATH")
                .ok()
                .filter(|p| std::path::Path::new(p).exists())
        })
        .or_else(|| {
            let cwd = "config.yaml";
            std::path::Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = match config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}
