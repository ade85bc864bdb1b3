//! TOML parser for resource tree files.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use trellis::{AttachDef, Kind, TypeDef};

use crate::ConfigError;

/// Parsed tree file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Name of the root node type
    pub root: String,
    /// Type definitions, ordered by name
    types: Vec<TypeDef>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTreeConfig {
    /// Root node type name
    root: String,
    /// Node types keyed by name
    #[serde(default)]
    types: BTreeMap<String, RawType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    #[serde(default)]
    kind: Kind,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    attach: Vec<RawAttach>,
    /// Default type of data-backed children
    child: Option<String>,
    extends: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAttach {
    name: String,
    #[serde(rename = "type")]
    child: String,
    #[serde(default)]
    aliases: Vec<String>,
}

impl TreeConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawTreeConfig = toml::from_str(content)?;

        let types: Vec<TypeDef> = raw
            .types
            .into_iter()
            .map(|(name, raw)| TypeDef {
                name,
                kind: raw.kind,
                requires: raw.requires,
                attach: raw
                    .attach
                    .into_iter()
                    .map(|a| AttachDef::new(a.name, a.child).with_aliases(a.aliases))
                    .collect(),
                child: raw.child,
                extends: raw.extends,
            })
            .collect();

        Self::validate(&raw.root, &types)?;

        Ok(Self {
            root: raw.root,
            types,
        })
    }

    /// All type definitions.
    pub fn definitions(&self) -> &[TypeDef] {
        &self.types
    }

    /// Get type count.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Checks that only need the file itself: names are non-empty and every
    /// referenced type is declared. Structural rules (terminal shape, alias
    /// collisions, inheritance cycles) are left to the schema builder.
    fn validate(root: &str, types: &[TypeDef]) -> Result<(), ConfigError> {
        let declared: HashSet<&str> = types.iter().map(|t| t.name.as_str()).collect();

        if root.is_empty() {
            return Err(ConfigError::Validation("root type name is empty".into()));
        }
        if !declared.contains(root) {
            return Err(ConfigError::Validation(format!(
                "root type '{}' is not declared under [types]",
                root
            )));
        }

        for def in types {
            if def.name.is_empty() {
                return Err(ConfigError::Validation("empty type name".into()));
            }
            for key in &def.requires {
                if key.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "type '{}' requires an empty key",
                        def.name
                    )));
                }
            }
            for reference in def.references() {
                if !declared.contains(reference) {
                    return Err(ConfigError::Validation(format!(
                        "type '{}' refers to undeclared type '{}'",
                        def.name, reference
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY: &str = r#"
root = "Root"

[types.Root]
requires = ["request"]
attach = [{ name = "users", type = "Users" }]

[types.Users]
child = "User"

[types.User]
requires = ["user"]
attach = [{ name = "gallery", type = "Gallery", aliases = ["images"] }]

[types.Gallery]
kind = "terminal"
"#;

    #[test]
    fn parse_gallery_tree() {
        let config = TreeConfig::from_str(GALLERY).unwrap();

        assert_eq!(config.root, "Root");
        assert_eq!(config.len(), 4);

        // BTreeMap order
        let names: Vec<_> = config.definitions().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Gallery", "Root", "User", "Users"]);

        let user = &config.definitions()[2];
        assert_eq!(user.kind, Kind::Branch);
        assert_eq!(user.requires, vec!["user"]);
        assert_eq!(user.attach[0].name, "gallery");
        assert_eq!(user.attach[0].child, "Gallery");
        assert_eq!(user.attach[0].aliases, vec!["images"]);

        assert_eq!(config.definitions()[0].kind, Kind::Terminal);
        assert_eq!(config.definitions()[3].child.as_deref(), Some("User"));
    }

    #[test]
    fn kind_defaults_to_branch() {
        let config = TreeConfig::from_str("root = \"A\"\n[types.A]\n").unwrap();
        assert_eq!(config.definitions()[0].kind, Kind::Branch);
        assert!(config.definitions()[0].attach.is_empty());
    }

    #[test]
    fn rejects_missing_root_key() {
        let err = TreeConfig::from_str("[types.A]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_undeclared_root() {
        let err = TreeConfig::from_str("root = \"B\"\n[types.A]\n").unwrap_err();
        assert!(err.to_string().contains("'B' is not declared"));
    }

    #[test]
    fn rejects_unknown_reference() {
        let cases = [
            "[types.A]\nattach = [{ name = \"x\", type = \"X\" }]",
            "[types.A]\nchild = \"X\"",
            "[types.A]\nextends = \"X\"",
        ];

        for case in cases {
            let toml = format!("root = \"A\"\n{}\n", case);
            let err = TreeConfig::from_str(&toml).unwrap_err();
            assert!(
                err.to_string().contains("undeclared type 'X'"),
                "Should reject: {}",
                case
            );
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let cases = [
            "root = \"A\"\nmodule = \"x\"\n[types.A]\n",
            "root = \"A\"\n[types.A]\nloader = \"users\"\n",
            "root = \"A\"\n[types.A]\nattach = [{ name = \"x\", type = \"A\", alias = \"y\" }]\n",
        ];

        for case in cases {
            assert!(
                matches!(TreeConfig::from_str(case), Err(ConfigError::Parse(_))),
                "Should reject: {}",
                case
            );
        }
    }

    #[test]
    fn rejects_invalid_kind() {
        let err = TreeConfig::from_str("root = \"A\"\n[types.A]\nkind = \"leaf\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_required_key() {
        let err = TreeConfig::from_str("root = \"A\"\n[types.A]\nrequires = [\"\"]\n").unwrap_err();
        assert!(err.to_string().contains("empty key"));
    }
}
