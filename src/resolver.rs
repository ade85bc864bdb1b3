//! Walk a segment sequence down from the root.
//!
//! ```text
//! (current = root, remaining = segments)
//!   remaining empty            → Resolved(current)
//!   current is terminal        → NotFound(current, next, Terminal)
//!   static match, guard passes → child(current, segment, {})
//!   static match, guard fails  → NotFound(current, segment, Guarded)
//!   loader: Ok(loaded)         → child(current, segment, loaded.context)
//!   loader: NotFound / none    → NotFound(current, segment, NoSuchChild)
//!   loader: Failed(e)          → Err(ResolveError::Load)
//! ```
//!
//! Nothing here writes to shared state; the schema is only read.

use std::sync::Arc;

use tracing::{debug, debug_span, trace, warn};

use crate::context::Context;
use crate::error::{ConstructionError, ResolveError};
use crate::loader::LoadError;
use crate::node::Node;
use crate::schema::{Schema, Shape};

/// Why a segment could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Miss {
    /// Neither an attachment nor the loader knows the segment.
    NoSuchChild,
    /// The attachment exists but its guard rejected the current node.
    Guarded,
    /// The current node is terminal and segments remain.
    Terminal,
}

/// The chain of nodes visited, root first.
///
/// Owns every node on the way; the weak parent links of those nodes stay
/// valid for as long as the trail is alive.
#[derive(Clone, Debug)]
pub struct Trail {
    root: Arc<Node>,
    descendants: Vec<Arc<Node>>,
}

impl Trail {
    fn new(root: Arc<Node>) -> Self {
        Self {
            root,
            descendants: Vec::new(),
        }
    }

    fn push(&mut self, node: Arc<Node>) {
        self.descendants.push(node);
    }

    /// Deepest node reached.
    #[inline]
    pub fn node(&self) -> &Arc<Node> {
        self.descendants.last().unwrap_or(&self.root)
    }

    #[inline]
    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// Root first, deepest node last.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<Node>> {
        std::iter::once(&self.root).chain(self.descendants.iter())
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        1 + self.descendants.len()
    }

    /// Always false; a trail holds at least the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Segments consumed to reach the deepest node.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.descendants.iter().filter_map(|node| node.name())
    }
}

/// Result of a resolution.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Every segment was consumed.
    Resolved(Trail),
    /// `segment` could not be resolved below `trail.node()`.
    NotFound {
        trail: Trail,
        segment: String,
        miss: Miss,
    },
}

impl Outcome {
    /// Resolved node, or the deepest node reached before the miss.
    #[inline]
    pub fn node(&self) -> &Arc<Node> {
        self.trail().node()
    }

    #[inline]
    pub fn trail(&self) -> &Trail {
        match self {
            Outcome::Resolved(trail) | Outcome::NotFound { trail, .. } => trail,
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    /// The failing segment, if any.
    pub fn segment(&self) -> Option<&str> {
        match self {
            Outcome::Resolved(_) => None,
            Outcome::NotFound { segment, .. } => Some(segment),
        }
    }

    pub fn miss(&self) -> Option<Miss> {
        match self {
            Outcome::Resolved(_) => None,
            Outcome::NotFound { miss, .. } => Some(*miss),
        }
    }

    /// The trail, resolved or not. Keep it (not just `node()`) for as long as
    /// lineage queries are needed: it is what keeps the ancestors alive.
    pub fn into_trail(self) -> Trail {
        match self {
            Outcome::Resolved(trail) | Outcome::NotFound { trail, .. } => trail,
        }
    }

    /// The resolved trail; `None` for not-found.
    pub fn into_resolved(self) -> Option<Trail> {
        match self {
            Outcome::Resolved(trail) => Some(trail),
            Outcome::NotFound { .. } => None,
        }
    }
}

pub(crate) fn resolve<I, S>(
    schema: &Schema,
    root: &Arc<Node>,
    segments: I,
) -> Result<Outcome, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut remaining = segments.into_iter();
    let mut trail = Trail::new(Arc::clone(root));

    let span = debug_span!("resolve", root = root.type_name());
    let _guard = span.enter();

    loop {
        // 1. Exhausted
        let Some(segment) = remaining.next() else {
            trace!(depth = trail.len() - 1, "resolved");
            return Ok(Outcome::Resolved(trail));
        };
        let segment = segment.as_ref();
        let current = Arc::clone(trail.node());

        let node_type = schema
            .node_type(current.type_key())
            .ok_or_else(|| ResolveError::ForeignNode {
                node_type: current.type_name().to_string(),
            })?;

        // 2. Terminal short-circuit
        let branch = match node_type.shape() {
            Shape::Terminal => {
                debug!(node = current.type_name(), segment, "segments remain past terminal");
                return Ok(not_found(trail, segment, Miss::Terminal));
            }
            Shape::Branch(branch) => branch,
        };

        // 3. Static attachments
        if let Some(attachment) = branch.lookup_static(segment) {
            if !attachment.admits(current.context()) {
                debug!(node = current.type_name(), segment, "attachment guard rejected");
                return Ok(not_found(trail, segment, Miss::Guarded));
            }
            let child_type = schema
                .node_type(attachment.child())
                .ok_or_else(|| ConstructionError::ForeignChildType {
                    parent: current.type_name().to_string(),
                })?;
            trace!(segment, child = child_type.name(), "static");
            let child = Node::construct(child_type, Some(&current), Some(segment.to_string()), &Context::new())?;
            trail.push(child);
            continue;
        }

        // 4. Dynamic lookup
        let Some(dynamic) = branch.dynamic() else {
            debug!(node = current.type_name(), segment, "no such child");
            return Ok(not_found(trail, segment, Miss::NoSuchChild));
        };

        match dynamic.loader().load(&current, segment) {
            Ok(loaded) => {
                let (chosen, extra) = loaded.into_parts();
                let child_type = schema
                    .node_type(chosen.unwrap_or(dynamic.child()))
                    .ok_or_else(|| ConstructionError::ForeignChildType {
                        parent: current.type_name().to_string(),
                    })?;
                trace!(segment, child = child_type.name(), "dynamic");
                let child = Node::construct(child_type, Some(&current), Some(segment.to_string()), &extra)?;
                trail.push(child);
            }
            Err(LoadError::NotFound) => {
                debug!(node = current.type_name(), segment, "loader found no such child");
                return Ok(not_found(trail, segment, Miss::NoSuchChild));
            }
            Err(LoadError::Failed(source)) => {
                warn!(node = current.type_name(), segment, error = %source, "loader failed");
                return Err(ResolveError::Load {
                    segment: segment.to_string(),
                    source,
                });
            }
        }
    }
}

fn not_found(trail: Trail, segment: &str, miss: Miss) -> Outcome {
    Outcome::NotFound {
        trail,
        segment: segment.to_string(),
        miss,
    }
}
