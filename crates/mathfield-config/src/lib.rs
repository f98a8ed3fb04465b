use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// User settings for the editor. Unset fields fall back to the engine's
/// defaults.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replaces the built-in list of function names (`sin`, `cos`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_functions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_fraction: Option<bool>,
    /// Where the terminal front end writes its log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.log_path = config
            .log_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/mathfield");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/mathfield/config.toml"));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
smart_fraction = false
known_functions = ["sin", "sinh"]
"#,
        )
        .unwrap();

        assert_eq!(config.smart_fraction, Some(false));
        assert_eq!(
            config.known_functions,
            Some(vec!["sin".to_string(), "sinh".to_string()])
        );
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn test_unknown_type_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "history_limit = \"lots\"").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_log_path_with_env_var_in_toml() {
        unsafe {
            env::set_var("MATHFIELD_TEST_LOGS", "/custom/logs");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "log_path = \"$MATHFIELD_TEST_LOGS/mathfield.log\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(
            config.log_path,
            Some(PathBuf::from("/custom/logs/mathfield.log"))
        );

        unsafe {
            env::remove_var("MATHFIELD_TEST_LOGS");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            known_functions: Some(vec!["sin".to_string()]),
            history_limit: Some(10),
            smart_fraction: Some(false),
            log_path: Some(PathBuf::from("/tmp/mathfield.log")),
        };

        test_config.save_to_path(&config_file).unwrap();
        assert!(config_file.exists(), "Config file should exist");

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(loaded_config, test_config);
    }
}
