use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::QLearningConfig;
use crate::error::ConfigError;
use crate::training::trainer::TrainerConfig;

/// Options for checkpoint conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Also export module buffers (batch-norm running statistics and the like).
    pub include_buffers: bool,
    /// Number of parameter names shown in conversion reports.
    pub sample_keys: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            include_buffers: false,
            sample_keys: 5,
        }
    }
}

#[derive(Deserialize)]
struct ConvertSection {
    #[serde(default)]
    convert: ConvertConfig,
}

impl ConvertConfig {
    /// Read only the `[convert]` section of a TOML config file, falling back
    /// to defaults if the file does not exist. Other sections are not parsed
    /// or validated.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let section: ConvertSection = toml::from_str(&read_config(path)?)?;
        Ok(section.convert)
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub qlearning: QLearningConfig,
    pub training: TrainerConfig,
    pub convert: ConvertConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(&read_config(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.qlearning;
        if !(q.learning_rate > 0.0 && q.learning_rate <= 1.0) {
            return Err(ConfigError::Validation(
                "qlearning.learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&q.discount_factor) {
            return Err(ConfigError::Validation(
                "qlearning.discount_factor must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&q.exploration_rate) {
            return Err(ConfigError::Validation(
                "qlearning.exploration_rate must be in [0, 1]".into(),
            ));
        }

        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.max_steps_per_episode == 0 {
            return Err(ConfigError::Validation(
                "training.max_steps_per_episode must be > 0".into(),
            ));
        }
        if self.training.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }
        if self.training.metrics_window == 0 {
            return Err(ConfigError::Validation(
                "training.metrics_window must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[qlearning]
learning_rate = 0.25
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.qlearning.learning_rate - 0.25).abs() < 1e-12);
        // Other fields should be defaults
        assert!((config.qlearning.discount_factor - 0.95).abs() < 1e-12);
        assert!((config.qlearning.exploration_rate - 0.1).abs() < 1e-12);
        assert_eq!(config.training.num_episodes, 1_000);
        assert_eq!(config.convert.sample_keys, 5);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert_eq!(
            config.qlearning.learning_rate,
            default.qlearning.learning_rate
        );
        assert_eq!(config.training.num_episodes, default.training.num_episodes);
        assert_eq!(config.training.table_path, default.training.table_path);
        assert!(!config.convert.include_buffers);
    }

    #[test]
    fn test_validation_rejects_zero_episodes() {
        let mut config = AppConfig::default();
        config.training.num_episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_max_steps() {
        let mut config = AppConfig::default();
        config.training.max_steps_per_episode = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_log_interval() {
        let mut config = AppConfig::default();
        config.training.log_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_metrics_window() {
        let mut config = AppConfig::default();
        config.training.metrics_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_checkpoint_interval_is_allowed() {
        let mut config = AppConfig::default();
        config.training.checkpoint_interval = 0;
        config.validate().expect("0 disables periodic saves");
    }

    #[test]
    fn test_validation_rejects_learning_rate_out_of_range() {
        let mut config = AppConfig::default();
        config.qlearning.learning_rate = 0.0;
        assert!(config.validate().is_err());
        config.qlearning.learning_rate = -0.1;
        assert!(config.validate().is_err());
        config.qlearning.learning_rate = 1.5;
        assert!(config.validate().is_err());
        config.qlearning.learning_rate = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.qlearning.discount_factor = 1.5;
        assert!(config.validate().is_err());
        config.qlearning.discount_factor = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_exploration_rate_out_of_range() {
        let mut config = AppConfig::default();
        config.qlearning.exploration_rate = -0.1;
        assert!(config.validate().is_err());
        config.qlearning.exploration_rate = 1.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_nan_learning_rate() {
        let mut config = AppConfig::default();
        config.qlearning.learning_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.num_episodes, 1_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
num_episodes = 500
table_path = "tables/gomoku.mpk"

[convert]
include_buffers = true
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.num_episodes, 500);
        assert_eq!(
            config.training.table_path.as_deref(),
            Some(Path::new("tables/gomoku.mpk"))
        );
        assert!(config.convert.include_buffers);
        // Others are defaults
        assert!((config.qlearning.learning_rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[qlearning]\nexploration_rate = 2.0\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got: {err}");
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[training\nnum_episodes = ").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)), "got: {err}");
    }

    #[test]
    fn test_convert_section_ignores_invalid_training() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[training]\nlog_interval = 0\nnum_episodes = \"many\"\n\n[convert]\nsample_keys = 2\n",
        )
        .unwrap();

        assert!(AppConfig::load(&path).is_err());
        let convert = ConvertConfig::load_or_default(&path).unwrap();
        assert_eq!(convert.sample_keys, 2);
        assert!(!convert.include_buffers);
    }

    #[test]
    fn test_convert_section_missing_file_uses_defaults() {
        let convert = ConvertConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(convert.sample_keys, 5);
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config.training.table_path, AppConfig::default().training.table_path);
    }
}
