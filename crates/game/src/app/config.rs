use std::env;
use std::fs;
use std::path::Path;

use rhythm_engine::{builtin_levels, builtin_tracks, Catalog, LevelConfig, TrackProfile, TuningConfig};
use serde::Deserialize;
use tracing::{info, warn};

pub(crate) const CONFIG_ENV_VAR: &str = "MOONWALK_CONFIG";
pub(crate) const TARGET_FPS_ENV_VAR: &str = "MOONWALK_TARGET_FPS";
pub(crate) const DEFAULT_TARGET_FPS: u32 = 60;
pub(crate) const DEFAULT_ADMIN_ACCESS_CODE: &str = "moonwalk";

pub(crate) type ConfigResult<T> = Result<T, String>;

/// Optional JSON file overriding tuning and the built-in catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) tuning: TuningConfig,
    pub(crate) levels: Option<Vec<LevelConfig>>,
    pub(crate) tracks: Option<Vec<TrackProfile>>,
    pub(crate) start_level_id: Option<u32>,
    pub(crate) start_track_id: Option<String>,
    pub(crate) admin_access_code: Option<String>,
}

impl GameConfig {
    /// Custom levels and tracks replace the built-in tables independently.
    pub(crate) fn build_catalog(&self) -> ConfigResult<Catalog> {
        let levels = self.levels.clone().unwrap_or_else(builtin_levels);
        let tracks = self.tracks.clone().unwrap_or_else(builtin_tracks);
        Catalog::from_parts(levels, tracks).map_err(|error| format!("invalid catalog: {error}"))
    }

    pub(crate) fn validated_tuning(&self) -> ConfigResult<TuningConfig> {
        self.tuning
            .validate()
            .map_err(|error| format!("invalid tuning: {error}"))?;
        Ok(self.tuning.clone())
    }

    pub(crate) fn admin_access_code(&self) -> &str {
        self.admin_access_code
            .as_deref()
            .unwrap_or(DEFAULT_ADMIN_ACCESS_CODE)
    }
}

pub(crate) fn load_game_config_from_env() -> ConfigResult<GameConfig> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(path) => load_game_config(Path::new(&path)),
        Err(env::VarError::NotPresent) => {
            info!("config_defaults");
            Ok(GameConfig::default())
        }
        Err(error) => Err(format!("read env var {CONFIG_ENV_VAR}: {error}")),
    }
}

pub(crate) fn load_game_config(path: &Path) -> ConfigResult<GameConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    let config = parse_game_config_json(&raw)?;
    info!(
        path = %path.display(),
        custom_levels = config.levels.as_ref().map_or(0, Vec::len),
        custom_tracks = config.tracks.as_ref().map_or(0, Vec::len),
        "config_loaded"
    );
    Ok(config)
}

pub(crate) fn parse_game_config_json(raw: &str) -> ConfigResult<GameConfig> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}

pub(crate) fn resolve_target_fps() -> u32 {
    match env::var(TARGET_FPS_ENV_VAR) {
        Ok(value) => parse_target_fps(&value).unwrap_or_else(|| {
            warn!(
                env_var = TARGET_FPS_ENV_VAR,
                value = value.as_str(),
                "invalid target fps env var value; falling back to default"
            );
            DEFAULT_TARGET_FPS
        }),
        Err(env::VarError::NotPresent) => DEFAULT_TARGET_FPS,
        Err(error) => {
            warn!(
                env_var = TARGET_FPS_ENV_VAR,
                error = %error,
                "unable to read target fps env var; falling back to default"
            );
            DEFAULT_TARGET_FPS
        }
    }
}

fn parse_target_fps(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|fps| (1..=1000).contains(fps))
}
