//! Dynamic lookup of data-backed children.
//!
//! A branch type may bind a [`Loader`]. The resolver calls it only when the
//! segment matched no static attachment. The loader answers with one of:
//!
//! - `Ok(Loaded)`: the child exists; its context (and optionally its type)
//! - `Err(LoadError::NotFound)`: no such child, an ordinary miss
//! - `Err(LoadError::Failed(_))`: anything else; aborts the resolution

use thiserror::Error;

use crate::context::Context;
use crate::error::BoxError;
use crate::node::Node;
use crate::schema::TypeKey;

/// Data-backed child lookup for one branch type.
///
/// Implementations may block (e.g. query a store). They must not assume
/// anything about retries; a failure is handed to the caller unchanged.
pub trait Loader: Send + Sync {
    /// Look up the child of `parent` named `segment`.
    fn load(&self, parent: &Node, segment: &str) -> Result<Loaded, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&Node, &str) -> Result<Loaded, LoadError> + Send + Sync,
{
    fn load(&self, parent: &Node, segment: &str) -> Result<Loaded, LoadError> {
        self(parent, segment)
    }
}

/// A successful lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Loaded {
    child: Option<TypeKey>,
    context: Context,
}

impl Loaded {
    /// Child of the branch's declared dynamic child type.
    pub fn new(context: impl Into<Context>) -> Self {
        Self {
            child: None,
            context: context.into(),
        }
    }

    /// Child of an explicitly chosen type, overriding the declared default.
    pub fn with_type(child: TypeKey, context: impl Into<Context>) -> Self {
        Self {
            child: Some(child),
            context: context.into(),
        }
    }

    #[inline]
    pub fn child(&self) -> Option<TypeKey> {
        self.child
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn into_parts(self) -> (Option<TypeKey>, Context) {
        (self.child, self.context)
    }
}

impl From<Context> for Loaded {
    fn from(context: Context) -> Self {
        Self::new(context)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    /// No child by that name. Expected; becomes a not-found outcome.
    #[error("no such child")]
    NotFound,

    /// Unexpected failure (store unavailable, decode error, ...).
    #[error(transparent)]
    Failed(BoxError),
}

impl LoadError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
