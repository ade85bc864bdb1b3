//! Attachment registry: static segment names and aliases to child node types.
//!
//! One registry belongs to each branch node *type*; every instance of that
//! type shares it. Registries are filled while the schema is declared and are
//! read-only once the schema is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::DeclarationError;
use crate::schema::TypeKey;

/// Predicate over the owning node's context deciding whether an attachment
/// is present for that node.
pub type Guard = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// A declared static child.
#[derive(Clone)]
pub struct Attachment {
    name: String,
    aliases: Vec<String>,
    child: TypeKey,
    guard: Option<Guard>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, child: TypeKey) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            child,
            guard: None,
        }
    }

    pub fn with_aliases<S: Into<String>>(mut self, aliases: impl IntoIterator<Item = S>) -> Self {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_guard(mut self, guard: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Primary (canonical) name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[inline]
    pub fn child(&self) -> TypeKey {
        self.child
    }

    /// Primary name followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }

    #[inline]
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Whether this attachment exists for a node carrying `context`.
    #[inline]
    pub fn admits(&self, context: &Context) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(context))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("child", &self.child)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Name → attachment table of one branch type.
///
/// Lookup is a single hash probe over primary names and aliases together.
#[derive(Clone, Debug, Default)]
pub struct AttachmentRegistry {
    entries: Vec<Attachment>,
    index: HashMap<String, usize>,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attachment on behalf of the type named `owner`.
    ///
    /// # Errors
    ///
    /// - `EmptyName` if the primary name or an alias is empty
    /// - `DuplicateName` if any of its names is already claimed, or repeated
    ///   within the attachment itself
    ///
    /// Nothing is registered when an error is returned.
    pub fn declare(&mut self, owner: &str, attachment: Attachment) -> Result<(), DeclarationError> {
        let mut claimed: Vec<&str> = Vec::with_capacity(1 + attachment.aliases.len());
        for name in attachment.names() {
            if name.is_empty() {
                return Err(DeclarationError::EmptyName {
                    owner: owner.to_string(),
                });
            }
            if self.index.contains_key(name) || claimed.contains(&name) {
                return Err(DeclarationError::DuplicateName {
                    owner: owner.to_string(),
                    name: name.to_string(),
                });
            }
            claimed.push(name);
        }

        let idx = self.entries.len();
        for name in attachment.names() {
            self.index.insert(name.to_string(), idx);
        }
        self.entries.push(attachment);
        Ok(())
    }

    /// Segment → attachment, matching primary names and aliases alike.
    #[inline]
    pub fn resolve_name(&self, segment: &str) -> Option<&Attachment> {
        self.index.get(segment).map(|&i| &self.entries[i])
    }

    #[inline]
    pub fn contains(&self, segment: &str) -> bool {
        self.index.contains_key(segment)
    }

    /// Number of attachments (not names).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.entries.iter()
    }

    /// Every claimed name, primary and alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|k| k.as_str())
    }

    /// Copy in `base`'s attachments for every name not already claimed here.
    ///
    /// Names claimed locally shadow the inherited entry; the inherited entry
    /// stays reachable through whichever of its names remain free.
    pub(crate) fn inherit(&mut self, base: &AttachmentRegistry) {
        for attachment in &base.entries {
            let free: Vec<&str> = attachment
                .names()
                .filter(|name| !self.index.contains_key(*name))
                .collect();
            if free.is_empty() {
                continue;
            }
            let idx = self.entries.len();
            for name in free {
                self.index.insert(name.to_string(), idx);
            }
            self.entries.push(attachment.clone());
        }
    }
}
