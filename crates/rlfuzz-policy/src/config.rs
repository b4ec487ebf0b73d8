//! TOML loading for `TrainingConfig`.

use std::path::Path;

use tracing::debug;

use rlfuzz_contracts::{
    config::TrainingConfig,
    error::{FuzzError, FuzzResult},
};

/// Parse `s` as TOML and validate the result.
///
/// Returns `FuzzError::ConfigError` if the TOML is malformed, names an
/// unknown type for a known field, or yields values `validate` rejects.
pub fn from_toml_str(s: &str) -> FuzzResult<TrainingConfig> {
    let config: TrainingConfig = toml::from_str(s).map_err(|e| FuzzError::ConfigError {
        reason: format!("failed to parse training TOML: {}", e),
    })?;
    config.validate()?;
    debug!(
        episodes = config.episodes,
        step_limit = config.step_limit,
        seed = config.seed,
        "training config loaded"
    );
    Ok(config)
}

/// Read the file at `path` and parse it as training configuration.
pub fn from_file(path: &Path) -> FuzzResult<TrainingConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| FuzzError::ConfigError {
        reason: format!("failed to read config file '{}': {}", path.display(), e),
    })?;
    from_toml_str(&contents)
}
