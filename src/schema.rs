//! The frozen set of node types, and the builder that declares it.
//!
//! Declaration happens once, at startup:
//!
//! ```text
//! SchemaBuilder::new()
//!     .branch / .terminal      declare node types, get TypeKey handles
//!     .require                 required context keys per type
//!     .attach / _aliased / _guarded
//!     .dynamic                 default dynamic child type + loader
//!     .extends                 inherit another type's attachments
//!     .set_root
//!     .build()  ──▶ Arc<Schema>
//! ```
//!
//! A built `Schema` is immutable and `Send + Sync`; any number of resolutions
//! may run against it concurrently.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::definition::{Kind, TypeDef};
use crate::error::{ConstructionError, DeclarationError, ResolveError};
use crate::loader::Loader;
use crate::node::Node;
use crate::registry::{Attachment, AttachmentRegistry};
use crate::resolver::{self, Outcome};

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a node type, issued by a [`SchemaBuilder`].
///
/// Handles carry the id of the builder that issued them, so a handle from one
/// schema is never mistaken for a type of another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    schema: u64,
    index: u32,
}

impl TypeKey {
    pub(crate) const fn new(schema: u64, index: u32) -> Self {
        Self { schema, index }
    }

    #[inline]
    fn index(self) -> usize {
        self.index as usize
    }
}

// =============================================================================
// Node types
// =============================================================================

/// Branch or terminal, with the branch-only lookup capabilities.
#[derive(Debug)]
pub enum Shape {
    Branch(BranchType),
    Terminal,
}

/// Lookup capabilities of a branch type.
#[derive(Debug, Default)]
pub struct BranchType {
    attachments: AttachmentRegistry,
    dynamic: Option<DynamicChild>,
}

/// Default dynamic child type and the loader producing its context.
#[derive(Clone)]
pub struct DynamicChild {
    child: TypeKey,
    loader: Arc<dyn Loader>,
}

impl DynamicChild {
    #[inline]
    pub fn child(&self) -> TypeKey {
        self.child
    }

    #[inline]
    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }
}

impl fmt::Debug for DynamicChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicChild")
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

impl BranchType {
    /// Static lookup: primary name or alias, exact and case-sensitive.
    #[inline]
    pub fn lookup_static(&self, segment: &str) -> Option<&Attachment> {
        self.attachments.resolve_name(segment)
    }

    /// The dynamic-lookup capability, if this branch has one.
    #[inline]
    pub fn dynamic(&self) -> Option<&DynamicChild> {
        self.dynamic.as_ref()
    }

    #[inline]
    pub fn attachments(&self) -> &AttachmentRegistry {
        &self.attachments
    }
}

/// A declared node type.
#[derive(Debug)]
pub struct NodeType {
    key: TypeKey,
    name: Arc<str>,
    requires: Vec<String>,
    shape: Shape,
}

impl NodeType {
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[inline]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        match self.shape {
            Shape::Branch(_) => Kind::Branch,
            Shape::Terminal => Kind::Terminal,
        }
    }

    #[inline]
    pub fn as_branch(&self) -> Option<&BranchType> {
        match &self.shape {
            Shape::Branch(branch) => Some(branch),
            Shape::Terminal => None,
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Frozen tree declaration.
#[derive(Debug)]
pub struct Schema {
    id: u64,
    types: Vec<NodeType>,
    by_name: HashMap<String, TypeKey>,
    root: TypeKey,
}

impl Schema {
    /// Node type for a handle issued while declaring this schema.
    #[inline]
    pub fn node_type(&self, key: TypeKey) -> Option<&NodeType> {
        if key.schema != self.id {
            return None;
        }
        self.types.get(key.index())
    }

    #[inline]
    pub fn type_key(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    pub fn type_named(&self, name: &str) -> Option<&NodeType> {
        self.type_key(name).and_then(|key| self.node_type(key))
    }

    pub fn root_type(&self) -> &NodeType {
        &self.types[self.root.index()]
    }

    /// All node types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Instantiate the root with its ambient context (e.g. the request).
    ///
    /// Every descendant inherits `ambient`.
    pub fn root(&self, ambient: Context) -> Result<Arc<Node>, ConstructionError> {
        Node::construct(self.root_type(), None, None, &ambient)
    }

    /// Walk `segments` down from `root`.
    ///
    /// An empty sequence resolves to `root` itself. Segments are opaque; no
    /// normalization is applied.
    pub fn resolve<I, S>(&self, root: &Arc<Node>, segments: I) -> Result<Outcome, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        resolver::resolve(self, root, segments)
    }

    /// Split `path` on `/`, drop empty pieces, and [`resolve`](Self::resolve).
    pub fn resolve_path(&self, root: &Arc<Node>, path: &str) -> Result<Outcome, ResolveError> {
        self.resolve(root, path.split('/').filter(|s| !s.is_empty()))
    }
}

// =============================================================================
// Builder
// =============================================================================

struct PendingType {
    key: TypeKey,
    name: Arc<str>,
    kind: Kind,
    requires: Vec<String>,
    attachments: AttachmentRegistry,
    child: Option<TypeKey>,
    loader: Option<Arc<dyn Loader>>,
    extends: Option<TypeKey>,
}

/// Declaration-time API.
///
/// Every declaring call validates immediately and returns a
/// [`DeclarationError`] instead of registering anything invalid.
pub struct SchemaBuilder {
    id: u64,
    types: Vec<PendingType>,
    by_name: HashMap<String, TypeKey>,
    root: Option<TypeKey>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("id", &self.id)
            .field("types", &self.types.iter().map(|t| &*t.name).collect::<Vec<_>>())
            .field("root", &self.root)
            .finish()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed),
            types: Vec::new(),
            by_name: HashMap::new(),
            root: None,
        }
    }

    /// Build a declaration from a definition table (from `resource_tree!` or a
    /// TOML tree file). Loaders still have to be bound with
    /// [`bind_loader`](Self::bind_loader) before [`build`](Self::build).
    pub fn from_definitions(defs: &[TypeDef], root: &str) -> Result<Self, DeclarationError> {
        let mut builder = Self::new();

        // 1. Types first, so definitions may refer to each other in any order
        for def in defs {
            builder.declare_type(&def.name, def.kind)?;
        }

        // 2. Everything that refers to types
        for def in defs {
            let owner = builder.require_key(&def.name)?;
            builder.require(owner, def.requires.iter().cloned())?;
            for attach in &def.attach {
                let child = builder.require_key(&attach.child)?;
                builder.attach_aliased(owner, attach.name.clone(), child, attach.aliases.iter().cloned())?;
            }
            if let Some(child) = &def.child {
                let child = builder.require_key(child)?;
                builder.set_child(owner, child)?;
            }
            if let Some(base) = &def.extends {
                let base = builder.require_key(base)?;
                builder.extends(owner, base)?;
            }
        }

        let root = builder.require_key(root)?;
        builder.set_root(root)?;
        Ok(builder)
    }

    /// Declare a branch node type.
    pub fn branch(&mut self, name: impl Into<String>) -> Result<TypeKey, DeclarationError> {
        self.declare_type(&name.into(), Kind::Branch)
    }

    /// Declare a terminal node type.
    pub fn terminal(&mut self, name: impl Into<String>) -> Result<TypeKey, DeclarationError> {
        self.declare_type(&name.into(), Kind::Terminal)
    }

    /// Handle of an already declared type.
    #[inline]
    pub fn type_key(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    /// Context keys every instance of `node_type` must carry.
    pub fn require<S: Into<String>>(
        &mut self,
        node_type: TypeKey,
        keys: impl IntoIterator<Item = S>,
    ) -> Result<(), DeclarationError> {
        let pending = self.pending_mut(node_type)?;
        for key in keys {
            let key = key.into();
            if !pending.requires.contains(&key) {
                pending.requires.push(key);
            }
        }
        Ok(())
    }

    /// Attach `child` to `owner` under `name`.
    pub fn attach(
        &mut self,
        owner: TypeKey,
        name: impl Into<String>,
        child: TypeKey,
    ) -> Result<(), DeclarationError> {
        self.declare_attachment(owner, Attachment::new(name, child))
    }

    /// Attach `child` to `owner` under `name` and every alias.
    pub fn attach_aliased<S: Into<String>>(
        &mut self,
        owner: TypeKey,
        name: impl Into<String>,
        child: TypeKey,
        aliases: impl IntoIterator<Item = S>,
    ) -> Result<(), DeclarationError> {
        self.declare_attachment(owner, Attachment::new(name, child).with_aliases(aliases))
    }

    /// Attach `child` to `owner`, present only for owner nodes whose context
    /// satisfies `guard`.
    ///
    /// A rejected guard is a miss. It does not fall through to the loader.
    pub fn attach_guarded<S, G>(
        &mut self,
        owner: TypeKey,
        name: impl Into<String>,
        child: TypeKey,
        aliases: impl IntoIterator<Item = S>,
        guard: G,
    ) -> Result<(), DeclarationError>
    where
        S: Into<String>,
        G: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.declare_attachment(
            owner,
            Attachment::new(name, child)
                .with_aliases(aliases)
                .with_guard(guard),
        )
    }

    /// Give `owner` data-backed children of type `child`, looked up by `loader`.
    pub fn dynamic(
        &mut self,
        owner: TypeKey,
        child: TypeKey,
        loader: impl Loader + 'static,
    ) -> Result<(), DeclarationError> {
        self.set_child(owner, child)?;
        self.bind_loader(owner, loader)
    }

    /// Declare the default dynamic child type of `owner`.
    pub fn set_child(&mut self, owner: TypeKey, child: TypeKey) -> Result<(), DeclarationError> {
        self.check_key(child)?;
        let pending = self.pending_mut(owner)?;
        if pending.kind == Kind::Terminal {
            return Err(DeclarationError::TerminalCannotLoad {
                owner: pending.name.to_string(),
            });
        }
        pending.child = Some(child);
        Ok(())
    }

    /// Bind the loader of `owner`. At most one per type.
    pub fn bind_loader(
        &mut self,
        owner: TypeKey,
        loader: impl Loader + 'static,
    ) -> Result<(), DeclarationError> {
        let pending = self.pending_mut(owner)?;
        if pending.kind == Kind::Terminal {
            return Err(DeclarationError::TerminalCannotLoad {
                owner: pending.name.to_string(),
            });
        }
        if pending.loader.is_some() {
            return Err(DeclarationError::DuplicateLoader {
                owner: pending.name.to_string(),
            });
        }
        pending.loader = Some(Arc::new(loader));
        Ok(())
    }

    /// [`bind_loader`](Self::bind_loader) by type name.
    pub fn bind_loader_named(
        &mut self,
        owner: &str,
        loader: impl Loader + 'static,
    ) -> Result<(), DeclarationError> {
        let owner = self.require_key(owner)?;
        self.bind_loader(owner, loader)
    }

    /// `node_type` inherits the attachments of `base` (transitively).
    /// Its own attachments override inherited ones with the same name.
    ///
    /// Dynamic lookup is inherited too: a type that declares neither a child
    /// type nor a loader uses those of the nearest base that does.
    pub fn extends(&mut self, node_type: TypeKey, base: TypeKey) -> Result<(), DeclarationError> {
        let base_pending = self.pending(base)?;
        if base_pending.kind == Kind::Terminal {
            return Err(DeclarationError::TerminalInheritance {
                name: base_pending.name.to_string(),
            });
        }
        let pending = self.pending_mut(node_type)?;
        if pending.kind == Kind::Terminal {
            return Err(DeclarationError::TerminalInheritance {
                name: pending.name.to_string(),
            });
        }
        pending.extends = Some(base);
        Ok(())
    }

    /// Designate the root type. Must be a branch; may be set once.
    pub fn set_root(&mut self, root: TypeKey) -> Result<(), DeclarationError> {
        let pending = self.pending(root)?;
        if pending.kind == Kind::Terminal {
            return Err(DeclarationError::RootIsTerminal {
                name: pending.name.to_string(),
            });
        }
        if let Some(existing) = self.root {
            return Err(DeclarationError::RootAlreadySet {
                name: self.types[existing.index()].name.to_string(),
            });
        }
        self.root = Some(root);
        Ok(())
    }

    /// Validate, flatten inheritance, and freeze.
    ///
    /// # Errors
    ///
    /// - `MissingRoot` if no root was designated
    /// - `LoaderWithoutChild` / `ChildWithoutLoader` for half-declared
    ///   dynamic lookup
    /// - `InheritanceCycle` if `extends` chains loop
    pub fn build(self) -> Result<Arc<Schema>, DeclarationError> {
        let root = self.root.ok_or(DeclarationError::MissingRoot)?;

        for pending in &self.types {
            match (&pending.child, &pending.loader) {
                (None, Some(_)) => {
                    return Err(DeclarationError::LoaderWithoutChild {
                        owner: pending.name.to_string(),
                    });
                }
                (Some(_), None) => {
                    return Err(DeclarationError::ChildWithoutLoader {
                        owner: pending.name.to_string(),
                    });
                }
                _ => {}
            }
        }

        let mut registries = Vec::with_capacity(self.types.len());
        for idx in 0..self.types.len() {
            registries.push(self.flattened_registry(idx)?);
        }
        // Chains are known to be acyclic past this point
        let dynamics: Vec<Option<DynamicChild>> =
            (0..self.types.len()).map(|idx| self.inherited_dynamic(idx)).collect();

        let types: Vec<NodeType> = self
            .types
            .into_iter()
            .zip(registries.into_iter().zip(dynamics))
            .map(|(pending, (attachments, dynamic))| {
                let shape = match pending.kind {
                    Kind::Terminal => Shape::Terminal,
                    Kind::Branch => Shape::Branch(BranchType { attachments, dynamic }),
                };
                NodeType {
                    key: pending.key,
                    name: pending.name,
                    requires: pending.requires,
                    shape,
                }
            })
            .collect();

        debug!(
            schema = self.id,
            types = types.len(),
            root = %types[root.index()].name,
            "schema built"
        );

        Ok(Arc::new(Schema {
            id: self.id,
            types,
            by_name: self.by_name,
            root,
        }))
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    fn declare_type(&mut self, name: &str, kind: Kind) -> Result<TypeKey, DeclarationError> {
        if name.is_empty() {
            return Err(DeclarationError::EmptyTypeName);
        }
        if self.by_name.contains_key(name) {
            return Err(DeclarationError::DuplicateType {
                name: name.to_string(),
            });
        }
        let key = TypeKey::new(self.id, next_index(self.types.len())?);
        self.types.push(PendingType {
            key,
            name: Arc::from(name),
            kind,
            requires: Vec::new(),
            attachments: AttachmentRegistry::new(),
            child: None,
            loader: None,
            extends: None,
        });
        self.by_name.insert(name.to_string(), key);
        Ok(key)
    }

    fn declare_attachment(
        &mut self,
        owner: TypeKey,
        attachment: Attachment,
    ) -> Result<(), DeclarationError> {
        self.check_key(attachment.child())?;
        let pending = self.pending_mut(owner)?;
        if pending.kind == Kind::Terminal {
            return Err(DeclarationError::TerminalCannotAttach {
                owner: pending.name.to_string(),
                name: attachment.name().to_string(),
            });
        }
        let owner_name = Arc::clone(&pending.name);
        pending.attachments.declare(&owner_name, attachment)
    }

    fn require_key(&self, name: &str) -> Result<TypeKey, DeclarationError> {
        self.type_key(name).ok_or_else(|| DeclarationError::UnknownType {
            name: name.to_string(),
        })
    }

    fn check_key(&self, key: TypeKey) -> Result<(), DeclarationError> {
        self.pending(key).map(|_| ())
    }

    fn pending(&self, key: TypeKey) -> Result<&PendingType, DeclarationError> {
        if key.schema != self.id {
            return Err(DeclarationError::ForeignType {
                name: format!("#{}", key.index),
            });
        }
        self.types
            .get(key.index())
            .ok_or_else(|| DeclarationError::UnknownType {
                name: format!("#{}", key.index),
            })
    }

    fn pending_mut(&mut self, key: TypeKey) -> Result<&mut PendingType, DeclarationError> {
        self.pending(key)?;
        Ok(&mut self.types[key.index()])
    }

    /// Own attachments plus everything inherited along the `extends` chain.
    fn flattened_registry(&self, idx: usize) -> Result<AttachmentRegistry, DeclarationError> {
        let start = &self.types[idx];
        let mut registry = start.attachments.clone();
        let mut seen = HashSet::from([idx]);
        let mut base = start.extends;

        while let Some(key) = base {
            if !seen.insert(key.index()) {
                return Err(DeclarationError::InheritanceCycle {
                    name: start.name.to_string(),
                });
            }
            let pending = &self.types[key.index()];
            registry.inherit(&pending.attachments);
            base = pending.extends;
        }
        Ok(registry)
    }

    /// Own dynamic lookup, else the nearest base's. Requires an acyclic chain.
    fn inherited_dynamic(&self, idx: usize) -> Option<DynamicChild> {
        let mut current = &self.types[idx];
        loop {
            if let (Some(child), Some(loader)) = (current.child, &current.loader) {
                return Some(DynamicChild {
                    child,
                    loader: Arc::clone(loader),
                });
            }
            current = &self.types[current.extends?.index()];
        }
    }
}

/// Index for the next declared type; type handles hold a `u32` index.
fn next_index(len: usize) -> Result<u32, DeclarationError> {
    u32::try_from(len).map_err(|_| DeclarationError::TooManyTypes { limit: u32::MAX as usize })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadError, Loaded};

    fn not_found(_: &Node, _: &str) -> Result<Loaded, LoadError> {
        Err(LoadError::NotFound)
    }

    #[test]
    fn build_minimal() {
        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        builder.set_root(root).unwrap();
        let schema = builder.build().unwrap();

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.root_type().name(), "Root");
        assert_eq!(schema.type_key("Root"), Some(root));
        assert!(schema.node_type(root).unwrap().as_branch().is_some());
    }

    #[test]
    fn rejects_duplicate_and_empty_type_names() {
        let mut builder = SchemaBuilder::new();
        builder.branch("Root").unwrap();
        assert_eq!(
            builder.terminal("Root").unwrap_err(),
            DeclarationError::DuplicateType { name: "Root".into() }
        );
        assert_eq!(builder.branch("").unwrap_err(), DeclarationError::EmptyTypeName);
    }

    #[test]
    fn rejects_missing_root() {
        let mut builder = SchemaBuilder::new();
        builder.branch("Root").unwrap();
        assert_eq!(builder.build().unwrap_err(), DeclarationError::MissingRoot);
    }

    #[test]
    fn rejects_terminal_root_and_second_root() {
        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        let other = builder.branch("Other").unwrap();
        let leaf = builder.terminal("Leaf").unwrap();

        assert!(matches!(
            builder.set_root(leaf),
            Err(DeclarationError::RootIsTerminal { .. })
        ));
        builder.set_root(root).unwrap();
        assert_eq!(
            builder.set_root(other).unwrap_err(),
            DeclarationError::RootAlreadySet { name: "Root".into() }
        );
    }

    #[test]
    fn terminal_cannot_attach_or_load() {
        let mut builder = SchemaBuilder::new();
        let leaf = builder.terminal("Leaf").unwrap();
        let other = builder.terminal("Other").unwrap();

        assert!(matches!(
            builder.attach(leaf, "x", other),
            Err(DeclarationError::TerminalCannotAttach { .. })
        ));
        assert!(matches!(
            builder.dynamic(leaf, other, not_found),
            Err(DeclarationError::TerminalCannotLoad { .. })
        ));
    }

    #[test]
    fn rejects_foreign_handles() {
        let mut first = SchemaBuilder::new();
        let foreign = first.branch("Elsewhere").unwrap();

        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();

        assert!(matches!(
            builder.attach(root, "x", foreign),
            Err(DeclarationError::ForeignType { .. })
        ));
        assert!(matches!(
            builder.set_root(foreign),
            Err(DeclarationError::ForeignType { .. })
        ));
    }

    #[test]
    fn duplicate_attachment_name_is_error() {
        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        let a = builder.terminal("A").unwrap();
        let b = builder.terminal("B").unwrap();

        builder.attach_aliased(root, "gallery", a, ["images"]).unwrap();
        assert_eq!(
            builder.attach(root, "images", b).unwrap_err(),
            DeclarationError::DuplicateName {
                owner: "Root".into(),
                name: "images".into()
            }
        );
    }

    #[test]
    fn loader_and_child_must_come_together() {
        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        builder.bind_loader(root, not_found).unwrap();
        builder.set_root(root).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            DeclarationError::LoaderWithoutChild { owner: "Root".into() }
        );

        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        let item = builder.terminal("Item").unwrap();
        builder.set_child(root, item).unwrap();
        builder.set_root(root).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            DeclarationError::ChildWithoutLoader { owner: "Root".into() }
        );
    }

    #[test]
    fn one_loader_per_type() {
        let mut builder = SchemaBuilder::new();
        let root = builder.branch("Root").unwrap();
        let item = builder.terminal("Item").unwrap();
        builder.dynamic(root, item, not_found).unwrap();
        assert!(matches!(
            builder.bind_loader(root, not_found),
            Err(DeclarationError::DuplicateLoader { .. })
        ));
    }

    #[test]
    fn inheritance_flattens_and_overrides() {
        let mut builder = SchemaBuilder::new();
        let base = builder.branch("BaseBranch").unwrap();
        let colored = builder.branch("ColoredBranch").unwrap();
        let diamond = builder.branch("DiamondBranch").unwrap();
        let base_node = builder.terminal("BaseNode").unwrap();
        let colored_node = builder.terminal("ColoredNode").unwrap();
        let diamond_node = builder.terminal("DiamondNode").unwrap();

        builder.attach(base, "shared", base_node).unwrap();
        builder.attach(base, "local", base_node).unwrap();
        builder.attach(colored, "local", colored_node).unwrap();
        builder.attach(colored, "sub_only", colored_node).unwrap();
        builder.attach(diamond, "local", diamond_node).unwrap();
        builder.extends(colored, base).unwrap();
        builder.extends(diamond, colored).unwrap();
        builder.set_root(base).unwrap();

        let schema = builder.build().unwrap();
        let child_of = |owner: TypeKey, name: &str| {
            schema
                .node_type(owner)
                .and_then(NodeType::as_branch)
                .and_then(|b| b.lookup_static(name))
                .map(Attachment::child)
        };

        assert_eq!(child_of(base, "shared"), Some(base_node));
        assert_eq!(child_of(colored, "shared"), Some(base_node));
        assert_eq!(child_of(diamond, "shared"), Some(base_node));

        assert_eq!(child_of(base, "local"), Some(base_node));
        assert_eq!(child_of(colored, "local"), Some(colored_node));
        assert_eq!(child_of(diamond, "local"), Some(diamond_node));

        assert_eq!(child_of(base, "sub_only"), None);
        assert_eq!(child_of(diamond, "sub_only"), Some(colored_node));
    }

    #[test]
    fn inheritance_cycle_is_error() {
        let mut builder = SchemaBuilder::new();
        let a = builder.branch("A").unwrap();
        let b = builder.branch("B").unwrap();
        builder.extends(a, b).unwrap();
        builder.extends(b, a).unwrap();
        builder.set_root(a).unwrap();
        assert!(matches!(
            builder.build(),
            Err(DeclarationError::InheritanceCycle { .. })
        ));
    }

    #[test]
    fn terminal_inheritance_is_error() {
        let mut builder = SchemaBuilder::new();
        let a = builder.branch("A").unwrap();
        let leaf = builder.terminal("Leaf").unwrap();
        assert!(matches!(
            builder.extends(a, leaf),
            Err(DeclarationError::TerminalInheritance { .. })
        ));
        assert!(matches!(
            builder.extends(leaf, a),
            Err(DeclarationError::TerminalInheritance { .. })
        ));
    }

    #[test]
    fn from_definitions_any_order() {
        let defs = [
            TypeDef::branch("User")
                .requires(["user"])
                .attach_aliased("gallery", "Gallery", ["images"]),
            TypeDef::terminal("Gallery"),
            TypeDef::branch("Users").child("User"),
            TypeDef::branch("Root").attach("users", "Users"),
        ];

        let mut builder = SchemaBuilder::from_definitions(&defs, "Root").unwrap();
        builder.bind_loader_named("Users", not_found).unwrap();
        let schema = builder.build().unwrap();

        assert_eq!(schema.root_type().name(), "Root");
        let user = schema.type_named("User").unwrap();
        assert_eq!(user.requires(), ["user".to_string()]);
        let gallery = schema.type_key("Gallery").unwrap();
        assert_eq!(
            user.as_branch().unwrap().lookup_static("images").unwrap().child(),
            gallery
        );
        let users = schema.type_named("Users").unwrap().as_branch().unwrap();
        assert_eq!(users.dynamic().unwrap().child(), schema.type_key("User").unwrap());
    }

    #[test]
    fn from_definitions_unknown_reference() {
        let defs = [TypeDef::branch("Root").attach("users", "Users")];
        assert_eq!(
            SchemaBuilder::from_definitions(&defs, "Root").unwrap_err(),
            DeclarationError::UnknownType { name: "Users".into() }
        );
        assert_eq!(
            SchemaBuilder::from_definitions(&[TypeDef::branch("A")], "Root").unwrap_err(),
            DeclarationError::UnknownType { name: "Root".into() }
        );
    }

    #[test]
    fn inheritance_carries_dynamic_lookup() {
        let mut builder = SchemaBuilder::new();
        let base = builder.branch("Collection").unwrap();
        let tagged = builder.branch("TaggedCollection").unwrap();
        let own = builder.branch("OwnCollection").unwrap();
        let item = builder.terminal("Item").unwrap();
        let special = builder.terminal("Special").unwrap();

        builder.dynamic(base, item, not_found).unwrap();
        builder.dynamic(own, special, not_found).unwrap();
        builder.extends(tagged, base).unwrap();
        builder.extends(own, base).unwrap();
        builder.set_root(tagged).unwrap();
        let schema = builder.build().unwrap();

        let child_of = |key: TypeKey| {
            schema
                .node_type(key)
                .and_then(NodeType::as_branch)
                .and_then(BranchType::dynamic)
                .map(DynamicChild::child)
        };
        assert_eq!(child_of(base), Some(item));
        assert_eq!(child_of(tagged), Some(item));
        assert_eq!(child_of(own), Some(special));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn type_index_overflow_is_error() {
        assert_eq!(next_index(7).unwrap(), 7);
        assert_eq!(next_index(u32::MAX as usize).unwrap(), u32::MAX);
        assert_eq!(
            next_index(u32::MAX as usize + 1).unwrap_err(),
            DeclarationError::TooManyTypes { limit: u32::MAX as usize }
        );
    }

    #[test]
    fn schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
        assert_send_sync::<Node>();
    }
}
