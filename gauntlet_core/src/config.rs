use crate::compile::Preset;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CompileSettings {
    #[serde(default)]
    pub preset: Preset,
    /// Hash-cache file location; defaults to the home-directory cache when
    /// absent.
    pub cache_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ProfileSettings {
    #[serde(default = "default_profile_runs")]
    pub run_count: usize,
    #[serde(default)]
    pub persist_input: bool,
}

fn default_profile_runs() -> usize {
    1
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            run_count: default_profile_runs(),
            persist_input: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StressSettings {
    #[serde(default = "default_stress_runs")]
    pub run_count: usize,
    #[serde(default = "default_persist_input")]
    pub persist_input: bool,
}

fn default_stress_runs() -> usize {
    100
}

fn default_persist_input() -> bool {
    true
}

impl Default for StressSettings {
    fn default() -> Self {
        Self {
            run_count: default_stress_runs(),
            persist_input: default_persist_input(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GauntletConfig {
    #[serde(default)]
    pub compile: CompileSettings,
    #[serde(default)]
    pub profile: ProfileSettings,
    #[serde(default)]
    pub stress: StressSettings,
}

impl GauntletConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: GauntletConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}
