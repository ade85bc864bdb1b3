//! Plain-data tree definitions.
//!
//! A `TypeDef` table describes node types by name. It is what the
//! `resource_tree!` macro and the TOML loader produce, and what
//! [`SchemaBuilder::from_definitions`](crate::SchemaBuilder::from_definitions)
//! consumes. Loaders are not data; they are bound on the builder afterwards.

use serde::{Deserialize, Serialize};

/// Branch or terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Branch,
    Terminal,
}

/// One static attachment: `name` (and `aliases`) → node type `child`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachDef {
    pub name: String,
    pub child: String,
    pub aliases: Vec<String>,
}

impl AttachDef {
    pub fn new(name: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            child: child.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<S: Into<String>>(mut self, aliases: impl IntoIterator<Item = S>) -> Self {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }
}

/// Definition of a node type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub kind: Kind,
    /// Context keys every instance must carry.
    pub requires: Vec<String>,
    pub attach: Vec<AttachDef>,
    /// Default node type for data-backed children.
    pub child: Option<String>,
    /// Type whose attachments this one inherits.
    pub extends: Option<String>,
}

impl TypeDef {
    pub fn branch(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Branch)
    }

    pub fn terminal(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Terminal)
    }

    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            requires: Vec::new(),
            attach: Vec::new(),
            child: None,
            extends: None,
        }
    }

    pub fn requires<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.requires.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn attach(mut self, name: impl Into<String>, child: impl Into<String>) -> Self {
        self.attach.push(AttachDef::new(name, child));
        self
    }

    pub fn attach_aliased<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        child: impl Into<String>,
        aliases: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attach
            .push(AttachDef::new(name, child).with_aliases(aliases));
        self
    }

    pub fn child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    /// Every type name this definition refers to.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.attach
            .iter()
            .map(|a| a.child.as_str())
            .chain(self.child.as_deref())
            .chain(self.extends.as_deref())
    }
}
