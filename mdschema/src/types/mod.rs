//! Column types and the metadata type vocabulary.
//!
//! Metadata files name field types with free-form strings (`"bigint"`,
//! `"geometry(point)"`, ...). A [`TypeVocabulary`] maps those names to a
//! concrete [`ColumnType`]. The vocabulary is plain data handed to the
//! compiler; nothing here is global.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A concrete column type, independent of the SQL dialect it is rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[serde(rename = "smallint")]
    SmallInt,
    Integer,
    #[serde(rename = "bigint")]
    BigInt,
    Real,
    DoublePrecision,
    Numeric {
        #[serde(default)]
        precision: Option<u32>,
        #[serde(default)]
        scale: Option<u32>,
    },
    Text,
    Varchar {
        #[serde(default)]
        length: Option<u32>,
    },
    Boolean,
    Date,
    Time,
    Timestamp,
    #[serde(rename = "timestamptz")]
    TimestampTz,
    Interval,
    Json,
    Jsonb,
    Uuid,
    Bytea,
    Geometry {
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        srid: Option<i32>,
    },
    Geography {
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        srid: Option<i32>,
    },
    Array(Box<ColumnType>),
}

impl ColumnType {
    /// Whether the type needs the spatial extension.
    pub fn is_spatial(&self) -> bool {
        match self {
            ColumnType::Geometry { .. } | ColumnType::Geography { .. } => true,
            ColumnType::Array(inner) => inner.is_spatial(),
            _ => false,
        }
    }

    fn geometry(kind: &str) -> Self {
        ColumnType::Geometry {
            kind: Some(kind.to_string()),
            srid: None,
        }
    }
}

/// Maps metadata type names to column types.
///
/// Names are matched case-insensitively, ignoring surrounding whitespace and
/// runs of inner whitespace (`"Double  Precision"` finds `"double precision"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeVocabulary {
    types: BTreeMap<String, ColumnType>,
}

impl TypeVocabulary {
    /// An empty vocabulary; every lookup fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default postgres-flavored vocabulary.
    pub fn builtin() -> Self {
        use ColumnType::*;

        let mut vocab = Self::empty();
        let scalars: &[(&str, ColumnType)] = &[
            ("smallint", SmallInt),
            ("int2", SmallInt),
            ("integer", Integer),
            ("int", Integer),
            ("int4", Integer),
            ("serial", Integer),
            ("bigint", BigInt),
            ("int8", BigInt),
            ("bigserial", BigInt),
            ("real", Real),
            ("float4", Real),
            ("float", DoublePrecision),
            ("float8", DoublePrecision),
            ("double precision", DoublePrecision),
            ("number", DoublePrecision),
            ("decimal", Numeric { precision: None, scale: None }),
            ("numeric", Numeric { precision: None, scale: None }),
            ("text", Text),
            ("string", Text),
            ("varchar", Varchar { length: None }),
            ("character varying", Varchar { length: None }),
            ("boolean", Boolean),
            ("bool", Boolean),
            ("date", Date),
            ("time", Time),
            ("timestamp", Timestamp),
            ("datetime", Timestamp),
            ("timestamp without time zone", Timestamp),
            ("timestamp with time zone", TimestampTz),
            ("timestamptz", TimestampTz),
            ("interval", Interval),
            ("json", Json),
            ("object", Json),
            ("jsonb", Jsonb),
            ("uuid", Uuid),
            ("bytea", Bytea),
            ("geometry", Geometry { kind: None, srid: None }),
            ("geography", Geography { kind: None, srid: None }),
        ];
        for (name, column_type) in scalars {
            vocab.insert(name, column_type.clone());
        }

        for kind in [
            "point",
            "linestring",
            "polygon",
            "multipoint",
            "multilinestring",
            "multipolygon",
        ] {
            vocab.insert(&format!("geometry({kind})"), ColumnType::geometry(&kind.to_uppercase()));
        }

        for (name, inner) in [
            ("text[]", Text),
            ("string[]", Text),
            ("integer[]", Integer),
            ("int[]", Integer),
            ("bigint[]", BigInt),
            ("float[]", DoublePrecision),
            ("double precision[]", DoublePrecision),
            ("decimal[]", Numeric { precision: None, scale: None }),
            ("boolean[]", Boolean),
            ("array", Text),
        ] {
            vocab.insert(name, Array(Box::new(inner)));
        }

        vocab
    }

    /// Parse a YAML mapping of `type name -> column type`.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, ColumnType> = serde_yaml::from_str(content)?;
        let mut vocab = Self::empty();
        for (name, column_type) in raw {
            vocab.insert(&name, column_type);
        }
        Ok(vocab)
    }

    /// Load a YAML vocabulary file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Add or replace a type name.
    pub fn insert(&mut self, name: &str, column_type: ColumnType) {
        self.types.insert(normalize(name), column_type);
    }

    /// Merge `other` into this vocabulary; names in `other` win.
    pub fn extend(&mut self, other: TypeVocabulary) {
        self.types.extend(other.types);
    }

    pub fn resolve(&self, type_name: &str) -> Option<&ColumnType> {
        self.types.get(&normalize(type_name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolves_common_names() {
        let vocab = TypeVocabulary::builtin();
        assert_eq!(vocab.resolve("bigint"), Some(&ColumnType::BigInt));
        assert_eq!(vocab.resolve("int"), Some(&ColumnType::Integer));
        assert_eq!(vocab.resolve("text"), Some(&ColumnType::Text));
        assert_eq!(vocab.resolve("float"), Some(&ColumnType::DoublePrecision));
        assert_eq!(
            vocab.resolve("geometry(multipolygon)"),
            Some(&ColumnType::Geometry {
                kind: Some("MULTIPOLYGON".into()),
                srid: None
            })
        );
        assert_eq!(
            vocab.resolve("text[]"),
            Some(&ColumnType::Array(Box::new(ColumnType::Text)))
        );
    }

    #[test]
    fn test_lookup_ignores_case_and_spacing() {
        let vocab = TypeVocabulary::builtin();
        assert_eq!(
            vocab.resolve("  Double   PRECISION "),
            Some(&ColumnType::DoublePrecision)
        );
    }

    #[test]
    fn test_unknown_name() {
        let vocab = TypeVocabulary::builtin();
        assert!(vocab.resolve("money").is_none());
        assert!(TypeVocabulary::empty().resolve("integer").is_none());
    }

    #[test]
    fn test_is_spatial() {
        assert!(ColumnType::Geometry { kind: None, srid: None }.is_spatial());
        assert!(ColumnType::Geography { kind: None, srid: Some(4326) }.is_spatial());
        assert!(ColumnType::Array(Box::new(ColumnType::Geometry { kind: None, srid: None }))
            .is_spatial());
        assert!(!ColumnType::Text.is_spatial());
    }

    #[test]
    fn test_from_yaml() {
        let vocab = TypeVocabulary::from_yaml_str(
            r#"
money: { numeric: { precision: 12, scale: 2 } }
code: { varchar: { length: 8 } }
flag: boolean
"Location": { geometry: { kind: POINT, srid: 4326 } }
tags: { array: text }
"#,
        )
        .unwrap();

        assert_eq!(vocab.len(), 5);
        assert_eq!(
            vocab.resolve("money"),
            Some(&ColumnType::Numeric {
                precision: Some(12),
                scale: Some(2)
            })
        );
        assert_eq!(vocab.resolve("code"), Some(&ColumnType::Varchar { length: Some(8) }));
        assert_eq!(vocab.resolve("FLAG"), Some(&ColumnType::Boolean));
        assert_eq!(
            vocab.resolve("location"),
            Some(&ColumnType::Geometry {
                kind: Some("POINT".into()),
                srid: Some(4326)
            })
        );
        assert_eq!(
            vocab.resolve("tags"),
            Some(&ColumnType::Array(Box::new(ColumnType::Text)))
        );
    }

    #[test]
    fn test_from_yaml_rejects_unknown_column_type() {
        assert!(TypeVocabulary::from_yaml_str("thing: hyperloglog").is_err());
    }

    #[test]
    fn test_extend_overrides_builtin() {
        let mut vocab = TypeVocabulary::builtin();
        let before = vocab.len();
        vocab.extend(TypeVocabulary::from_yaml_str("float: real\nmoney: { numeric: {} }").unwrap());
        assert_eq!(vocab.resolve("float"), Some(&ColumnType::Real));
        assert_eq!(vocab.len(), before + 1);
    }
}
