//! Node instances.
//!
//! A node is created once, by the resolver (or [`Schema::root`]), and never
//! changes afterwards. It keeps a weak reference to its parent; the
//! [`Trail`](crate::Trail) of the resolution that produced it owns the chain.
//!
//! [`Schema::root`]: crate::Schema::root

use std::sync::{Arc, Weak};

use crate::context::{Context, Value};
use crate::definition::Kind;
use crate::error::ConstructionError;
use crate::schema::{NodeType, TypeKey};

#[derive(Debug)]
pub struct Node {
    /// Segment this node was reached by; `None` for the root.
    name: Option<String>,
    node_type: TypeKey,
    type_name: Arc<str>,
    kind: Kind,
    parent: Option<Weak<Node>>,
    context: Context,
    depth: usize,
}

impl Node {
    /// Construct a node of `node_type` below `parent`.
    ///
    /// The context is `parent.context` merged with `extra` (extra wins). Every
    /// attribute `node_type` requires must be present afterwards.
    pub(crate) fn construct(
        node_type: &NodeType,
        parent: Option<&Arc<Node>>,
        name: Option<String>,
        extra: &Context,
    ) -> Result<Arc<Node>, ConstructionError> {
        let context = match parent {
            Some(parent) => parent.context.merged(extra),
            None => extra.clone(),
        };

        let missing = context.missing(node_type.requires());
        if !missing.is_empty() {
            return Err(ConstructionError::MissingAttributes {
                node_type: node_type.name().to_string(),
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        Ok(Arc::new(Node {
            name,
            node_type: node_type.key(),
            type_name: node_type.shared_name(),
            kind: node_type.kind(),
            parent: parent.map(Arc::downgrade),
            depth: parent.map_or(0, |p| p.depth + 1),
            context,
        }))
    }

    /// The literal segment this node was reached by (an alias stays an alias).
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.node_type
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub fn is_branch(&self) -> bool {
        self.kind == Kind::Branch
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind == Kind::Terminal
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Shorthand for `self.context().get(key)`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Distance from the root (root = 0).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The parent node, if it is still alive.
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// This node followed by its ancestors, up to the root.
    pub fn lineage(self: &Arc<Self>) -> Lineage {
        Lineage {
            next: Some(Arc::clone(self)),
        }
    }

    /// Topmost ancestor still alive. Parents are weak; the [`Trail`](crate::Trail)
    /// a node was resolved in keeps its whole lineage alive.
    pub fn root(self: &Arc<Self>) -> Arc<Node> {
        self.lineage().last().unwrap_or_else(|| Arc::clone(self))
    }

    /// Nearest node in the lineage (self included) of the named type.
    pub fn find_ancestor_by_type(self: &Arc<Self>, type_name: &str) -> Option<Arc<Node>> {
        self.lineage().find(|node| node.type_name() == type_name)
    }

    /// Nearest node in the lineage (self included) reached by `name`;
    /// `None` selects the root.
    pub fn find_ancestor_by_name(self: &Arc<Self>, name: Option<&str>) -> Option<Arc<Node>> {
        self.lineage().find(|node| node.name() == name)
    }
}

/// Iterator from a node up to the root.
#[derive(Debug, Clone)]
pub struct Lineage {
    next: Option<Arc<Node>>,
}

impl Iterator for Lineage {
    type Item = Arc<Node>;

    fn next(&mut self) -> Option<Arc<Node>> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
