//! Multiple dynamic child types and guarded attachments.
//!
//! This example shows how to:
//! - Let a loader pick the node type of each child
//! - Attach children only for nodes whose context passes a guard
//! - Walk the lineage and read typed attributes

use serde::Deserialize;
use serde_json::json;
use trellis::*;

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
    role: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut builder = SchemaBuilder::new();
    let root = builder.branch("Root")?;
    let people = builder.branch("People")?;
    let person = builder.terminal("Person")?;
    let admin = builder.branch("Admin")?;
    let console = builder.terminal("Console")?;

    builder.attach(root, "people", people)?;
    builder.dynamic(people, person, move |_: &Node, id: &str| {
        let (name, role) = match id {
            "alice" => ("Alice", "Developer"),
            "eve" => ("Eve", "Systems admin"),
            "daniel" => ("Daniel", "Database admin"),
            _ => return Err(LoadError::NotFound),
        };
        let context = Context::new().with("person", json!({ "name": name, "role": role }));
        if role.ends_with("admin") {
            Ok(Loaded::with_type(admin, context))
        } else {
            Ok(Loaded::new(context))
        }
    })?;
    builder.attach_guarded(admin, "servers", console, ["hosts"], |ctx: &Context| {
        ctx.get("person").and_then(|p| p.get("role")) == Some(&json!("Systems admin"))
    })?;
    builder.set_root(root)?;
    let schema = builder.build()?;

    println!("=== People Directory ===\n");

    let root = schema.root(Context::new())?;
    for path in ["people/alice", "people/eve/servers", "people/eve/hosts", "people/daniel/servers"] {
        let outcome = schema.resolve_path(&root, path)?;
        let node = outcome.node();
        let lineage: Vec<_> = node.lineage().map(|n| n.type_name().to_string()).collect();

        match outcome.miss() {
            None => println!("{path:<24} -> {}", lineage.join(" < ")),
            Some(miss) => println!("{path:<24} -> {miss:?} at {}", lineage.join(" < ")),
        }

        if let Some(found) = node.find_ancestor_by_name(path.split('/').nth(1)) {
            if let Some(Ok(person)) = found.context().get_as::<Person>("person") {
                println!("{:<24}    {} ({})", "", person.name, person.role);
            }
        }
    }

    Ok(())
}
