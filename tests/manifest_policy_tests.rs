#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Policy checks on `Cargo.toml`.
//!
//! Library code is panic-free and the runtime pieces stay behind features so
//! the core view builds without an executor.

use std::path::PathBuf;

use toml::Table;

fn manifest() -> Table {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read '{}': {e}", path.display()));
    toml::from_str(&text).expect("Cargo.toml is valid TOML")
}

const REQUIRED_DENY_LINTS: &[&str] = &[
    "unwrap_used",
    "expect_used",
    "panic",
    "todo",
    "unimplemented",
    "indexing_slicing",
];

#[test]
fn panic_prone_lints_are_denied() {
    let manifest = manifest();
    let clippy = manifest["lints"]["clippy"]
        .as_table()
        .expect("[lints.clippy] section");
    for lint in REQUIRED_DENY_LINTS {
        assert_eq!(
            clippy.get(*lint).and_then(|v| v.as_str()),
            Some("deny"),
            "`{lint}` must be denied in [lints.clippy]"
        );
    }
}

#[test]
fn websocket_transport_is_the_default_feature() {
    let manifest = manifest();
    let features = manifest["features"].as_table().unwrap();
    let default: Vec<&str> = features["default"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(default, ["transport-websocket"]);

    let websocket: Vec<&str> = features["transport-websocket"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(websocket.contains(&"tokio-runtime"));
}

#[test]
fn core_tokio_dependency_has_no_runtime() {
    let manifest = manifest();
    let tokio = &manifest["dependencies"]["tokio"];
    let features: Vec<&str> = tokio["features"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(!features.contains(&"rt"), "the runtime belongs behind `tokio-runtime`");
    assert!(!features.contains(&"full"));
}

#[test]
fn transport_crates_are_optional() {
    let manifest = manifest();
    for dep in ["tokio-tungstenite", "futures-util"] {
        assert_eq!(
            manifest["dependencies"][dep]["optional"].as_bool(),
            Some(true),
            "`{dep}` must be optional"
        );
    }
}

#[test]
fn msrv_is_declared() {
    let manifest = manifest();
    let version = manifest["package"]["rust-version"].as_str().unwrap();
    assert!(version.starts_with("1."), "unexpected rust-version {version}");
}
