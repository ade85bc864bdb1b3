//! Integration tests for trellis-config.

use serde_json::json;
use std::fs;
use tempfile::TempDir;
use trellis::{Context, DeclarationError, LoadError, Loaded, Miss, Node};
use trellis_config::{load, ConfigError, TreeConfig};

const GALLERY: &str = r#"
root = "Root"

[types.Root]
requires = ["request"]
attach = [{ name = "users", type = "Users" }]

[types.Users]
child = "User"

[types.User]
requires = ["user"]
extends = "Profile"
attach = [{ name = "gallery", type = "Gallery", aliases = ["images"] }]

[types.Profile]
attach = [
    { name = "gallery", type = "Settings" },
    { name = "settings", type = "Settings", aliases = ["prefs"] },
]

[types.Gallery]
kind = "terminal"

[types.Settings]
kind = "terminal"
"#;

/// Create a temp directory with tree.toml
fn setup_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("tree.toml");
    fs::write(&config_path, content).unwrap();
    (dir, config_path)
}

fn load_user(_: &Node, id: &str) -> Result<Loaded, LoadError> {
    match id.parse::<u32>() {
        Ok(id) if id < 100 => Ok(Loaded::new(Context::new().with("user", json!({ "id": id })))),
        _ => Err(LoadError::NotFound),
    }
}

#[test]
fn file_builds_working_schema() {
    let (_dir, config_path) = setup_config(GALLERY);

    let mut builder = load(&config_path).unwrap();
    builder.bind_loader_named("Users", load_user).unwrap();
    let schema = builder.build().unwrap();

    assert_eq!(schema.root_type().name(), "Root");
    assert_eq!(schema.len(), 6);

    let root = schema.root(Context::new().with("request", "GET /")).unwrap();

    let outcome = schema.resolve_path(&root, "/users/7/images").unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.node().type_name(), "Gallery");
    assert_eq!(outcome.node().get("user"), Some(&json!({ "id": 7 })));

    let outcome = schema.resolve_path(&root, "/users/100").unwrap();
    assert_eq!(outcome.miss(), Some(Miss::NoSuchChild));
    assert_eq!(outcome.segment(), Some("100"));
}

#[test]
fn inherited_attachments_apply() {
    let (_dir, config_path) = setup_config(GALLERY);

    let mut builder = load(&config_path).unwrap();
    builder.bind_loader_named("Users", load_user).unwrap();
    let schema = builder.build().unwrap();
    let root = schema.root(Context::new().with("request", "GET /")).unwrap();

    // Inherited from Profile, alias included
    let outcome = schema.resolve_path(&root, "/users/7/prefs").unwrap();
    assert_eq!(outcome.node().type_name(), "Settings");

    // User's own "gallery" wins over Profile's
    let outcome = schema.resolve_path(&root, "/users/7/gallery").unwrap();
    assert_eq!(outcome.node().type_name(), "Gallery");
}

#[test]
fn unbound_loader_fails_build() {
    let (_dir, config_path) = setup_config(GALLERY);

    let err = load(&config_path).unwrap().build().unwrap_err();
    assert_eq!(
        err,
        DeclarationError::ChildWithoutLoader {
            owner: "Users".into()
        }
    );
}

#[test]
fn binding_unknown_type_fails() {
    let (_dir, config_path) = setup_config(GALLERY);

    let mut builder = load(&config_path).unwrap();
    let err = builder.bind_loader_named("Nope", load_user).unwrap_err();
    assert_eq!(err, DeclarationError::UnknownType { name: "Nope".into() });
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match load(&path).unwrap_err() {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("Expected Io, got: {:?}", other),
    }
}

#[test]
fn terminal_with_attachments_is_declaration_error() {
    let (_dir, config_path) = setup_config(
        r#"
root = "Root"

[types.Root]

[types.Leaf]
kind = "terminal"
attach = [{ name = "x", type = "Root" }]
"#,
    );

    let err = load(&config_path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Declaration(DeclarationError::TerminalCannotAttach { .. })
    ));
}

#[test]
fn alias_collision_is_declaration_error() {
    let (_dir, config_path) = setup_config(
        r#"
root = "Root"

[types.Root]
attach = [
    { name = "gallery", type = "Leaf", aliases = ["images"] },
    { name = "images", type = "Leaf" },
]

[types.Leaf]
kind = "terminal"
"#,
    );

    match load(&config_path).unwrap_err() {
        ConfigError::Declaration(DeclarationError::DuplicateName { owner, name }) => {
            assert_eq!(owner, "Root");
            assert_eq!(name, "images");
        }
        other => panic!("Expected DuplicateName, got: {:?}", other),
    }
}

#[test]
fn inheritance_cycle_fails_build() {
    let (_dir, config_path) = setup_config(
        r#"
root = "A"

[types.A]
extends = "B"

[types.B]
extends = "A"
"#,
    );

    let err = load(&config_path).unwrap().build().unwrap_err();
    assert!(matches!(err, DeclarationError::InheritanceCycle { .. }));
}

#[test]
fn terminal_root_is_rejected() {
    let err = TreeConfig::from_str("root = \"A\"\n[types.A]\nkind = \"terminal\"\n")
        .unwrap()
        .into_builder()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Declaration(DeclarationError::RootIsTerminal { .. })
    ));
}

#[test]
fn editing_file_changes_tree() {
    let (_dir, config_path) = setup_config(
        r#"
root = "Root"

[types.Root]
attach = [{ name = "about", type = "Page" }]

[types.Page]
kind = "terminal"
"#,
    );

    let schema = load(&config_path).unwrap().build().unwrap();
    let root = schema.root(Context::new()).unwrap();
    assert!(schema.resolve_path(&root, "about").unwrap().is_resolved());
    assert!(!schema.resolve_path(&root, "contact").unwrap().is_resolved());

    fs::write(
        &config_path,
        r#"
root = "Root"

[types.Root]
attach = [{ name = "about", type = "Page", aliases = ["contact"] }]

[types.Page]
kind = "terminal"
"#,
    )
    .unwrap();

    let schema = load(&config_path).unwrap().build().unwrap();
    let root = schema.root(Context::new()).unwrap();
    let outcome = schema.resolve_path(&root, "contact").unwrap();
    assert_eq!(outcome.node().type_name(), "Page");
}
