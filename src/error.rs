//! Error taxonomy.
//!
//! - [`DeclarationError`]: raised while a tree is being declared, never during
//!   resolution.
//! - [`ConstructionError`]: a node was constructed without an attribute its
//!   type requires.
//! - [`ResolveError`]: anything that aborts a resolution. A loader's
//!   "no such child" signal is not an error; it becomes
//!   [`Outcome::NotFound`](crate::Outcome::NotFound).

use thiserror::Error;

/// Boxed error returned by loaders for unexpected failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("node type name must not be empty")]
    EmptyTypeName,

    #[error("cannot declare more than {limit} node types")]
    TooManyTypes { limit: usize },

    #[error("node type '{name}' is declared more than once")]
    DuplicateType { name: String },

    #[error("node type '{name}' is not declared")]
    UnknownType { name: String },

    #[error("node type handle for '{name}' was issued by a different builder")]
    ForeignType { name: String },

    #[error("empty segment name attached to '{owner}'")]
    EmptyName { owner: String },

    #[error("segment name '{name}' is already attached to '{owner}'")]
    DuplicateName { owner: String, name: String },

    #[error("terminal node type '{owner}' cannot have '{name}' attached")]
    TerminalCannotAttach { owner: String, name: String },

    #[error("terminal node type '{owner}' cannot load children")]
    TerminalCannotLoad { owner: String },

    #[error("'{name}' cannot take part in attachment inheritance: terminal node types have no attachments")]
    TerminalInheritance { name: String },

    #[error("'{owner}' has a loader but no dynamic child type")]
    LoaderWithoutChild { owner: String },

    #[error("'{owner}' declares a dynamic child type but no loader was bound")]
    ChildWithoutLoader { owner: String },

    #[error("'{owner}' already has a loader")]
    DuplicateLoader { owner: String },

    #[error("no root node type designated")]
    MissingRoot,

    #[error("root node type is already set to '{name}'")]
    RootAlreadySet { name: String },

    #[error("root node type '{name}' is terminal")]
    RootIsTerminal { name: String },

    #[error("attachment inheritance of '{name}' forms a cycle")]
    InheritanceCycle { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("node type '{node_type}' is missing required attribute(s): {}", missing.join(", "))]
    MissingAttributes {
        node_type: String,
        missing: Vec<String>,
    },

    #[error("loader of '{parent}' chose a node type that belongs to another schema")]
    ForeignChildType { parent: String },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The loader failed for a reason other than "no such child".
    #[error("lookup of segment '{segment}' failed")]
    Load {
        segment: String,
        #[source]
        source: BoxError,
    },

    #[error("node of type '{node_type}' does not belong to this schema")]
    ForeignNode { node_type: String },
}
