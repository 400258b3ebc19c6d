//! Run configuration: compile/order options, connection settings and the
//! optional YAML config file the CLI reads.

use crate::compiler::DEFAULT_SCHEMA;
use crate::error::{MdSchemaError, Result};
use crate::ordering::OrderingStrategy;
use crate::types::TypeVocabulary;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_ENGINE: &str = "postgresql";
pub const DEFAULT_HOST: &str = "openenergy-platform.org";

/// Everything the compile and order steps need, passed in explicitly.
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub vocabulary: TypeVocabulary,
    pub default_schema: String,
    pub ordering: OrderingStrategy,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        ProvisionOptions {
            vocabulary: TypeVocabulary::builtin(),
            default_schema: DEFAULT_SCHEMA.to_string(),
            ordering: OrderingStrategy::default(),
        }
    }
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    Sqlite,
}

impl FromStr for Engine {
    type Err = MdSchemaError;

    /// Accepts a bare engine or `engine+driver` (the driver part is ignored).
    fn from_str(s: &str) -> Result<Self> {
        let base = s.split('+').next().unwrap_or_default().to_lowercase();
        match base.as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Engine::Postgres),
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            _ => Err(MdSchemaError::Config(format!(
                "Unsupported engine: {s}. Supported: postgresql, sqlite"
            ))),
        }
    }
}

/// Where to connect. For sqlite, `database` is the file path (`:memory:` or
/// none for an in-memory database) and the host is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub engine: String,
    pub host: String,
    pub port: Option<u16>,
    pub database: Option<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            engine: DEFAULT_ENGINE.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: None,
            database: None,
        }
    }
}

impl ConnectionSettings {
    pub fn engine_kind(&self) -> Result<Engine> {
        self.engine.parse()
    }
}

/// Optional YAML configuration file. Every key may be overridden on the
/// command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub ordering: Option<OrderingStrategy>,
    /// Path to a YAML type vocabulary, relative to the config file.
    #[serde(default)]
    pub types: Option<PathBuf>,
    /// Use only the vocabulary file, without the builtin types.
    #[serde(default)]
    pub replace_builtin_types: bool,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        if let (Some(types), Some(dir)) = (&config.types, path.parent()) {
            if types.is_relative() {
                config.types = Some(dir.join(types));
            }
        }
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ConfigFile = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

/// The builtin vocabulary, extended (or replaced) by a vocabulary file.
pub fn build_vocabulary(types_file: Option<&Path>, replace_builtin: bool) -> Result<TypeVocabulary> {
    match types_file {
        Some(path) => {
            let custom = TypeVocabulary::load(path)?;
            if replace_builtin {
                return Ok(custom);
            }
            let mut vocabulary = TypeVocabulary::builtin();
            vocabulary.extend(custom);
            Ok(vocabulary)
        }
        None if replace_builtin => Err(MdSchemaError::Config(
            "replace_builtin_types requires a types file".into(),
        )),
        None => Ok(TypeVocabulary::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_engine_from_str() {
        assert_eq!("postgresql".parse::<Engine>().unwrap(), Engine::Postgres);
        assert_eq!("postgresql+oedialect".parse::<Engine>().unwrap(), Engine::Postgres);
        assert_eq!("SQLite".parse::<Engine>().unwrap(), Engine::Sqlite);
        assert!(matches!(
            "mssql".parse::<Engine>().unwrap_err(),
            MdSchemaError::Config(_)
        ));
    }

    #[test]
    fn test_default_settings() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.engine_kind().unwrap(), Engine::Postgres);
        assert_eq!(settings.host, "openenergy-platform.org");

        let options = ProvisionOptions::default();
        assert_eq!(options.default_schema, "public");
        assert_eq!(options.ordering, OrderingStrategy::ForeignKeyCount);
    }

    #[test]
    fn test_config_file_parse() {
        let config = ConfigFile::from_yaml_str(
            r#"
engine: sqlite
database: data/oep.db
default_schema: model_draft
ordering: topological
types: types.yaml
"#,
        )
        .unwrap();
        assert_eq!(config.engine.as_deref(), Some("sqlite"));
        assert_eq!(config.database.as_deref(), Some("data/oep.db"));
        assert_eq!(config.default_schema.as_deref(), Some("model_draft"));
        assert_eq!(config.ordering, Some(OrderingStrategy::Topological));
        assert_eq!(config.types, Some(PathBuf::from("types.yaml")));
        assert!(!config.replace_builtin_types);
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        assert!(ConfigFile::from_yaml_str("hots: localhost").is_err());
    }

    #[test]
    fn test_config_file_resolves_types_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdschema.yaml");
        std::fs::write(&path, "types: vocab.yaml\n").unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.types, Some(dir.path().join("vocab.yaml")));
    }

    #[test]
    fn test_build_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.yaml");
        std::fs::write(&path, "money: { numeric: { precision: 12, scale: 2 } }\n").unwrap();

        let merged = build_vocabulary(Some(&path), false).unwrap();
        assert!(merged.resolve("integer").is_some());
        assert!(matches!(merged.resolve("money"), Some(ColumnType::Numeric { .. })));

        let replaced = build_vocabulary(Some(&path), true).unwrap();
        assert!(replaced.resolve("integer").is_none());
        assert_eq!(replaced.len(), 1);

        assert_eq!(build_vocabulary(None, false).unwrap(), TypeVocabulary::builtin());
        assert!(build_vocabulary(None, true).is_err());
    }
}
