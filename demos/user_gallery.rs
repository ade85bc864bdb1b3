//! Data-backed lookups with the builder API.
//!
//! This example shows how to:
//! - Declare node types and attachments on a `SchemaBuilder`
//! - Back a branch with a loader that looks users up in a store
//! - Read attributes accumulated along the path
//! - Handle a store failure as an error, not a miss

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use trellis::*;

#[derive(Debug, Error)]
#[error("user store is down")]
struct StoreDown;

/// In-memory user store. Id "0" is reserved to simulate an outage.
struct UserStore {
    users: HashMap<&'static str, Value>,
}

impl Loader for UserStore {
    fn load(&self, _parent: &Node, segment: &str) -> Result<Loaded, LoadError> {
        if segment == "0" {
            return Err(LoadError::failed(StoreDown));
        }
        let user = self.users.get(segment).ok_or(LoadError::NotFound)?;
        Ok(Loaded::new(Context::new().with("user", user.clone())))
    }
}

fn build_schema() -> Result<Arc<Schema>, DeclarationError> {
    let store = UserStore {
        users: HashMap::from([
            ("7", json!({ "id": 7, "name": "Ada" })),
            ("8", json!({ "id": 8, "name": "Linus" })),
        ]),
    };

    let mut builder = SchemaBuilder::new();
    let root = builder.branch("Root")?;
    let users = builder.branch("Users")?;
    let user = builder.branch("User")?;
    let gallery = builder.terminal("Gallery")?;

    builder.require(root, ["request"])?;
    builder.require(user, ["user"])?;
    builder.attach(root, "users", users)?;
    builder.dynamic(users, user, store)?;
    builder.attach_aliased(user, "gallery", gallery, ["images", "photos"])?;
    builder.set_root(root)?;
    builder.build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let schema = build_schema()?;

    println!("=== User Gallery ===\n");

    for path in ["/users/7/gallery", "/users/8/photos", "/users/9/gallery", "/users/0/gallery"] {
        let root = schema.root(Context::new().with("request", json!({ "path": path })))?;
        match schema.resolve_path(&root, path) {
            Ok(Outcome::Resolved(trail)) => {
                let node = trail.node();
                println!(
                    "{path:<20} -> {} of {} (depth {})",
                    node.type_name(),
                    node.context()["user"]["name"],
                    node.depth()
                );
            }
            Ok(Outcome::NotFound { trail, segment, miss }) => {
                println!(
                    "{path:<20} -> no '{segment}' under {} ({miss:?})",
                    trail.node().type_name()
                );
            }
            Err(err) => {
                let cause = std::error::Error::source(&err).map(ToString::to_string);
                println!("{path:<20} -> error: {err} ({})", cause.unwrap_or_default());
            }
        }
    }

    Ok(())
}
