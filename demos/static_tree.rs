//! A tree with no data-backed lookups.
//!
//! This example shows how to:
//! - Declare a tree with `resource_tree!`
//! - Reach the same node through a name and an alias
//! - Tell a missing child apart from segments left over past a terminal

use trellis::*;

resource_tree! {
    pub mod Site {
        root Home {
            about | "about-us" => About;
            docs => Docs;
        }

        Docs {
            guide => Page;
            reference | api => Page;
        }

        terminal About;
        terminal Page;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let schema = Site::builder()?.build()?;
    let root = schema.root(Context::new())?;

    println!("=== Static Tree ===\n");
    println!("{} node types, root '{}'\n", Site::TYPE_COUNT, Site::ROOT);

    for path in ["/about", "/about-us", "/docs/api", "/docs/missing", "/docs/guide/chapter-2"] {
        let outcome = schema.resolve_path(&root, path)?;
        let walked: Vec<_> = outcome.trail().segments().collect();
        match &outcome {
            Outcome::Resolved(trail) => {
                println!("{path:<24} -> {} {:?}", trail.node().type_name(), walked);
            }
            Outcome::NotFound { segment, miss, .. } => {
                println!(
                    "{path:<24} -> stopped at {} before '{segment}' ({miss:?})",
                    outcome.node().type_name()
                );
            }
        }
    }

    Ok(())
}
