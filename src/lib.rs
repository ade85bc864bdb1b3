//! # Resource-tree traversal (trellis)
//!
//! Resolves an ordered sequence of path segments into a node of a resource
//! tree. Parts of the tree are declared up front (fixed child names and their
//! aliases); other parts are data-backed and resolved at lookup time by a
//! caller-supplied [`Loader`].
//!
//! ## Design
//!
//! ```text
//!   SchemaBuilder ──build()──▶ Schema (frozen, Send + Sync)
//!                                │
//!   ambient Context ──root()────▶ Node(root)
//!                                │
//!   ["users", "7", "gallery"] ──resolve()──▶ Outcome::Resolved(Trail)
//!                                          └▶ Outcome::NotFound { trail, segment, miss }
//! ```
//!
//! Every step consults the current node type's attachment registry first and
//! only then its loader, so a declared name always shadows a data-backed key.
//!
//! ```ignore
//! use trellis::{Context, LoadError, Loaded, SchemaBuilder};
//! use serde_json::json;
//!
//! let mut builder = SchemaBuilder::new();
//! let root = builder.branch("Root")?;
//! let users = builder.branch("Users")?;
//! let user = builder.branch("User")?;
//! let gallery = builder.terminal("Gallery")?;
//!
//! builder.attach(root, "users", users)?;
//! builder.attach_aliased(user, "gallery", gallery, ["images"])?;
//! builder.dynamic(users, user, |_: &trellis::Node, id: &str| match id {
//!     "7" => Ok(Loaded::new(Context::new().with("user", json!({ "id": 7 })))),
//!     _ => Err(LoadError::NotFound),
//! })?;
//! builder.set_root(root)?;
//!
//! let schema = builder.build()?;
//! let root = schema.root(Context::new().with("request", "GET /"))?;
//! let outcome = schema.resolve(&root, ["users", "7", "images"])?;
//! assert_eq!(outcome.node().name(), Some("images"));
//! ```

extern crate self as trellis;

pub mod context;
pub mod definition;
pub mod error;
pub mod loader;
pub mod node;
pub mod registry;
pub mod resolver;
pub mod schema;

pub use context::{Context, Value};
pub use definition::{AttachDef, Kind, TypeDef};
pub use error::{BoxError, ConstructionError, DeclarationError, ResolveError};
pub use loader::{LoadError, Loaded, Loader};
pub use node::{Lineage, Node};
pub use registry::{Attachment, AttachmentRegistry};
pub use resolver::{Miss, Outcome, Trail};
pub use schema::{BranchType, DynamicChild, NodeType, Schema, SchemaBuilder, Shape, TypeKey};
pub use trellis_macro::resource_tree;
