use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "migrant.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrantConfig {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub taxonomies: Vec<TaxonomyConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaxonomyConfig {
    pub name: String,
    #[serde(default = "default_hierarchical")]
    pub hierarchical: bool,
}

fn default_hierarchical() -> bool {
    true
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Missing(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O error: {}", err),
            ConfigError::Toml(err) => write!(f, "config parse error: {}", err),
            ConfigError::Missing(path) => write!(f, "config file '{}' does not exist", path),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

impl MigrantConfig {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: MigrantConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file at the default path means "no config"; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if explicit {
                return Err(ConfigError::Missing(path.display().to_string()));
            }
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::parse(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for taxonomy in &self.taxonomies {
            if taxonomy.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "taxonomy names cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MigrantConfig};

    #[test]
    fn parses_full_config() {
        let config = MigrantConfig::parse(
            r#"
db = "site.sqlite"
delimiter = ";"
strict = true

[[taxonomies]]
name = "location"

[[taxonomies]]
name = "post_tag"
hierarchical = false
"#,
        )
        .expect("config should parse");
        assert_eq!(config.db.as_deref(), Some("site.sqlite"));
        assert_eq!(config.delimiter.as_deref(), Some(";"));
        assert!(config.strict);
        assert_eq!(config.taxonomies.len(), 2);
        assert!(config.taxonomies[0].hierarchical);
        assert!(!config.taxonomies[1].hierarchical);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = MigrantConfig::parse("").expect("empty config should parse");
        assert_eq!(config, MigrantConfig::default());
    }

    #[test]
    fn rejects_unknown_keys_and_blank_taxonomies() {
        assert!(matches!(
            MigrantConfig::parse("colour = \"blue\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MigrantConfig::parse("[[taxonomies]]\nname = \" \"\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let path = std::env::temp_dir().join(format!("migrant-{}.toml", uuid::Uuid::now_v7()));
        assert_eq!(
            MigrantConfig::load(&path, false).expect("default path may be absent"),
            MigrantConfig::default()
        );
        assert!(matches!(
            MigrantConfig::load(&path, true),
            Err(ConfigError::Missing(_))
        ));
    }
}
