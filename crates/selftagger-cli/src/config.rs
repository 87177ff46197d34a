//! Runtime configuration.
//!
//! Read from the JSON file named by `SELFTAGGER_CONFIG` (default
//! `config.json`), then secrets are overlaid from the environment. Every
//! problem is reported here, before the first attempt runs.

use std::path::{Path, PathBuf};

use selftagger_core::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SOURCE_URL};
use selftagger_http::{ArchiveConfig, NoteRouterConfig, VisionConfig, DEFAULT_VISION_ENDPOINT};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "SELFTAGGER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const VISION_API_KEY_ENV: &str = "SELFTAGGER_VISION_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "SELFTAGGER_GITHUB_TOKEN";
pub const NOTE_ROUTER_TOKEN_ENV: &str = "SELFTAGGER_NOTE_ROUTER_TOKEN";
pub const DEFAULT_SCRATCH_DIR: &str = "scratch";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no annotation API key; set vision.api_key or SELFTAGGER_VISION_API_KEY")]
    MissingApiKey,

    #[error("scratch directory {} does not exist", .0.display())]
    ScratchDirMissing(PathBuf),

    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("archive target has no token; set archive.token or SELFTAGGER_GITHUB_TOKEN")]
    MissingArchiveToken,

    #[error("live mode needs at least one publish target (archive or note_router)")]
    NoTargets,
}

/// Annotation settings as written in the file; the key may come from the
/// environment instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionSection {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_url: String,
    pub max_attempts: u32,
    pub scratch_dir: PathBuf,
    pub vision: VisionSection,
    pub archive: Option<ArchiveConfig>,
    pub note_router: Option<NoteRouterConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            vision: VisionSection::default(),
            archive: None,
            note_router: None,
        }
    }
}

impl Config {
    /// Load, overlay the process environment and validate.
    pub fn load(dry: bool) -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        // The default file is optional; a path someone named must exist.
        let mut config = if explicit.is_none() && !path.exists() {
            Config::default()
        } else {
            Config::from_file(&path)?
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate(dry)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Overlay secrets from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(VISION_API_KEY_ENV) {
            self.vision.api_key = Some(key);
        }
        if let (Some(archive), Some(token)) = (self.archive.as_mut(), lookup(GITHUB_TOKEN_ENV)) {
            archive.token = token;
        }
        if let (Some(router), Some(token)) =
            (self.note_router.as_mut(), lookup(NOTE_ROUTER_TOKEN_ENV))
        {
            router.token = Some(token);
        }
    }

    pub fn validate(&self, dry: bool) -> Result<(), ConfigError> {
        if self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if dry {
            if !self.scratch_dir.is_dir() {
                return Err(ConfigError::ScratchDirMissing(self.scratch_dir.clone()));
            }
            return Ok(());
        }
        if let Some(archive) = &self.archive {
            if archive.token.is_empty() {
                return Err(ConfigError::MissingArchiveToken);
            }
        }
        if self.archive.is_none() && self.note_router.is_none() {
            return Err(ConfigError::NoTargets);
        }
        Ok(())
    }

    fn api_key(&self) -> Option<&str> {
        self.vision.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Annotation client settings; `None` until an API key is known.
    pub fn vision_config(&self) -> Option<VisionConfig> {
        self.api_key()
            .map(|key| VisionConfig::new(key).with_endpoint(&self.vision.endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_object() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.scratch_dir, PathBuf::from("scratch"));
        assert_eq!(config.vision.endpoint, DEFAULT_VISION_ENDPOINT);
        assert!(config.archive.is_none());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let config = Config::from_json("{}").unwrap();
        assert!(matches!(config.validate(true), Err(ConfigError::MissingApiKey)));

        let blank = Config::from_json(r#"{"vision": {"api_key": "  "}}"#).unwrap();
        assert!(matches!(blank.validate(true), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = Config::from_json(
            r#"{
                "archive": {"owner": "stevedores-org", "repo": "tagged"},
                "note_router": {"url": "https://notes.example/post"}
            }"#,
        )
        .unwrap();
        config.apply_overrides(env(&[
            (VISION_API_KEY_ENV, "vision-key"),
            (GITHUB_TOKEN_ENV, "gh-token"),
            (NOTE_ROUTER_TOKEN_ENV, "router-token"),
        ]));

        assert_eq!(config.vision.api_key.as_deref(), Some("vision-key"));
        assert_eq!(config.archive.as_ref().unwrap().token, "gh-token");
        assert_eq!(
            config.note_router.as_ref().unwrap().token.as_deref(),
            Some("router-token")
        );
        config.validate(false).unwrap();
    }

    #[test]
    fn test_rehearsal_needs_no_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_json(r#"{"vision": {"api_key": "k"}}"#).unwrap();
        config.scratch_dir = dir.path().to_path_buf();
        config.validate(true).unwrap();
        assert!(matches!(config.validate(false), Err(ConfigError::NoTargets)));
    }

    #[test]
    fn test_rehearsal_requires_existing_scratch_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::from_json(r#"{"vision": {"api_key": "k"}}"#).unwrap();
        config.scratch_dir = dir.path().join("missing");

        match config.validate(true) {
            Err(ConfigError::ScratchDirMissing(path)) => assert!(path.ends_with("missing")),
            other => panic!("expected missing scratch dir, got {other:?}"),
        }

        // A file where the directory should be is no better.
        let file = dir.path().join("scratch");
        std::fs::write(&file, b"").unwrap();
        config.scratch_dir = file;
        assert!(matches!(
            config.validate(true),
            Err(ConfigError::ScratchDirMissing(_))
        ));
    }

    #[test]
    fn test_archive_without_token_rejected_in_live_mode() {
        let config = Config::from_json(
            r#"{"vision": {"api_key": "k"}, "archive": {"owner": "o", "repo": "r"}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(false),
            Err(ConfigError::MissingArchiveToken)
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = Config::from_json(r#"{"vision": {"api_key": "k"}, "max_attempts": 0}"#).unwrap();
        assert!(matches!(config.validate(true), Err(ConfigError::InvalidMaxAttempts)));
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_vision_config_uses_custom_endpoint() {
        let config = Config::from_json(
            r#"{"vision": {"api_key": "k", "endpoint": "http://localhost:9000/annotate"}}"#,
        )
        .unwrap();
        let vision = config.vision_config().unwrap();
        assert_eq!(vision.endpoint, "http://localhost:9000/annotate");
        assert_eq!(vision.api_key, "k");
    }
}
