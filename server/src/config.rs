//! Service configuration.
//!
//! Read from YAML, by default `~/.visage/server/config.yaml`. Every field has
//! a default, so an absent default file yields a working configuration.
//! Path fields may reference environment variables as `${NAME}`.
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8000
//! temp_dir: ${HOME}/.cache/visage
//! infer_timeout_secs: 60
//! engine:
//!   backend: auto
//!   library: /opt/a2f/lib/libaudio2face.so
//!   model_path: /opt/a2f/models/Audio2Face-3D-v3.0/model.json
//! bringup:
//!   device: 0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use visage_engine::EngineConfig;
use visage_native::BringUpConfig;

use crate::error::ConfigError;

/// Directory under the home directory holding visage state.
pub const BASE_DIR: &str = ".visage";
/// Application directory under [`BASE_DIR`].
pub const APP_NAME: &str = "server";
pub const CONFIG_FILE: &str = "config.yaml";

/// `~/.visage/server/config.yaml`, or `None` without a home directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(BASE_DIR).join(APP_NAME).join(CONFIG_FILE))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Scratch directory for uploads and processed audio.
    pub temp_dir: PathBuf,

    /// Upload extensions accepted by `/process-audio`, lowercase, no dot.
    pub accepted_extensions: Vec<String>,

    pub max_upload_bytes: usize,

    /// Limit on a single inference call.
    pub infer_timeout_secs: u64,

    /// Libraries that must load for the service to be healthy.
    pub required_libraries: Vec<String>,

    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_level: String,

    pub engine: EngineConfig,
    pub bringup: BringUpConfig,

    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            temp_dir: PathBuf::from("./temp"),
            accepted_extensions: ["wav", "mp3", "ogg", "flac"].map(String::from).to_vec(),
            max_upload_bytes: 50 * 1024 * 1024,
            infer_timeout_secs: 120,
            required_libraries: vec!["libstdc++.so.6".into()],
            log_level: "info".into(),
            engine: EngineConfig::default(),
            bringup: BringUpConfig::default(),
            source: None,
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        let mut config = match path {
            Some(path) => {
                let mut config = Self::from_file(&path)?;
                config.source = Some(path);
                config
            }
            None => Self::default(),
        };
        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Where the configuration came from, for the startup log.
    pub fn source_description(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "built-in defaults".to_string(),
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    fn expand_paths(&mut self) -> Result<(), ConfigError> {
        for path in [
            &mut self.temp_dir,
            &mut self.engine.library,
            &mut self.engine.model_path,
        ] {
            let expanded = expand_env(&path.to_string_lossy())?;
            *path = PathBuf::from(expanded);
        }
        Ok(())
    }

    /// Rejects values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accepted_extensions.is_empty() {
            return Err(ConfigError::Invalid("accepted_extensions is empty".into()));
        }
        if self.infer_timeout_secs == 0 {
            return Err(ConfigError::Invalid("infer_timeout_secs must be positive".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".into()));
        }
        if self.engine.fps.is_nan() || self.engine.fps <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.fps must be positive, got {}",
                self.engine.fps
            )));
        }
        if self.engine.blendshape_count == 0 {
            return Err(ConfigError::Invalid("engine.blendshape_count must be positive".into()));
        }
        Ok(())
    }

    /// `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when `extension` (without dot, any case) is accepted.
    pub fn accepts(&self, extension: &str) -> bool {
        self.accepted_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Replaces `${NAME}` with the value of the environment variable `NAME`.
pub fn expand_env(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::Invalid(format!("unterminated ${{ in {input:?}")))?;
        let name = &after[..end];
        let value = std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
