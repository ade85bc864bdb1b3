//! TOML tree files for trellis.
//!
//! A tree file declares node types, their required context keys, static
//! attachments, dynamic child types and inheritance. Loaders are code, so
//! they are bound on the returned builder by type name.
//!
//! ```toml
//! root = "Root"
//!
//! [types.Root]
//! requires = ["request"]
//! attach = [{ name = "users", type = "Users" }]
//!
//! [types.Users]
//! child = "User"
//!
//! [types.User]
//! requires = ["user"]
//! attach = [{ name = "gallery", type = "Gallery", aliases = ["images"] }]
//!
//! [types.Gallery]
//! kind = "terminal"
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut builder = trellis_config::load("tree.toml")?;
//! builder.bind_loader_named("Users", load_user)?;
//! let schema = builder.build()?;
//! ```

mod toml_parser;

pub use toml_parser::TreeConfig;

use std::path::{Path, PathBuf};

use thiserror::Error;
use trellis::{DeclarationError, SchemaBuilder};

/// Main entry point: read a tree file and apply it to a fresh builder.
///
/// # Errors
///
/// Returns an error if:
/// - the file cannot be read or is not valid TOML for a tree file
/// - it refers to undeclared types
/// - the declaration itself is rejected (see [`DeclarationError`])
pub fn load(path: impl AsRef<Path>) -> Result<SchemaBuilder, ConfigError> {
    TreeConfig::from_file(path)?.into_builder()
}

impl TreeConfig {
    /// Apply every definition to a fresh [`SchemaBuilder`].
    pub fn into_builder(self) -> Result<SchemaBuilder, ConfigError> {
        Ok(SchemaBuilder::from_definitions(self.definitions(), &self.root)?)
    }
}

/// Errors that can occur while loading a tree file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}
