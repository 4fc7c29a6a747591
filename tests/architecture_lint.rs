//! Architecture enforcement tests.
//!
//! The crate is layered `core` < `store` < `binding` < `engine`, and every
//! workflow action goes through the engine's resolve, gate, invoke
//! sequence. These tests read the sources and catch violations in CI.
//!
//! # Test Categories
//!
//! 1. **Layering** - lower layers never import upper ones
//! 2. **Gating** - every resolved workflow is gated before use
//! 3. **Error Propagation** - no panicking shortcuts outside tests

use std::fs;
use std::path::{Path, PathBuf};

/// Files in `core` allowed to reach into `binding`.
///
/// Configuration validates exclude patterns with the binding filter's own
/// parser and builds the binary defaults from the record metadata names.
const CORE_BINDING_ALLOWED: &[&str] = &["config/mod.rs", "config/schema.rs"];

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Every `.rs` file below `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).expect("Failed to read source directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// The non-test part of a source file, without comment lines.
fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| (idx + 1, line))
        .collect()
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Collect production lines of the files in `layer` that mention any of
/// `forbidden`, skipping files listed in `allowed`.
fn layer_violations(layer: &str, forbidden: &[&str], allowed: &[&str]) -> Vec<String> {
    let base = src_dir().join(layer);
    let mut violations = Vec::new();

    for path in rust_files(&base) {
        let name = relative(&path, &base);
        let content =
            fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));

        for (line_no, line) in production_lines(&content) {
            for module in forbidden {
                let needle = format!("crate::{module}");
                if line.contains(&needle) && !allowed.contains(&name.as_str()) {
                    violations.push(format!("{layer}/{name}:{line_no}: uses {needle}"));
                }
            }
        }
    }
    violations
}

// =============================================================================
// Layering
// =============================================================================

#[test]
fn core_depends_on_nothing_above() {
    let mut violations = layer_violations("core", &["store", "engine"], &[]);
    violations.extend(layer_violations("core", &["binding"], CORE_BINDING_ALLOWED));

    assert!(
        violations.is_empty(),
        "Layering violations found:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn store_depends_only_on_core() {
    let violations = layer_violations("store", &["binding", "engine"], &[]);

    assert!(
        violations.is_empty(),
        "Layering violations found:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn binding_does_not_depend_on_engine() {
    let violations = layer_violations("binding", &["engine"], &[]);

    assert!(
        violations.is_empty(),
        "Layering violations found:\n  {}",
        violations.join("\n  ")
    );
}

// =============================================================================
// Gating
// =============================================================================

/// Every function in the document coordinator that resolves a workflow
/// also gates an action on it.
#[test]
fn resolved_workflows_are_gated() {
    let path = src_dir().join("engine/manager.rs");
    let content = fs::read_to_string(&path).expect("Failed to read manager.rs");
    let production: String = production_lines(&content)
        .into_iter()
        .map(|(_, line)| format!("{line}\n"))
        .collect();

    let mut violations = Vec::new();
    for body in production.split("\n    fn ").chain(production.split("\n    pub fn ")) {
        // Only the function itself, not whatever follows it.
        let body = body
            .split("\n    fn ")
            .next()
            .and_then(|b| b.split("\n    pub fn ").next())
            .unwrap_or(body);
        let resolutions = body.matches("_workflow(&mut").count();
        let gates = body.matches(".require(").count();
        if resolutions > gates {
            let name = body.split('(').next().unwrap_or("?");
            violations.push(format!(
                "{name}: {resolutions} workflow resolutions but {gates} gates"
            ));
        }
    }

    assert!(
        violations.is_empty(),
        "Ungated workflow use found:\n  {}",
        violations.join("\n  ")
    );
}

/// Binaries are written through the session, never through document
/// workflows.
#[test]
fn binary_import_bypasses_workflows() {
    let path = src_dir().join("engine/binary.rs");
    let content = fs::read_to_string(&path).expect("Failed to read binary.rs");

    for (line_no, line) in production_lines(&content) {
        assert!(
            !line.contains("_workflow("),
            "binary.rs:{line_no}: resolves a workflow"
        );
    }
}

// =============================================================================
// Error Propagation
// =============================================================================

#[test]
fn no_unwrap_outside_tests() {
    let base = src_dir();
    let mut violations = Vec::new();

    for path in rust_files(&base) {
        let name = relative(&path, &base);
        let content =
            fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read {}", name));
        for (line_no, line) in production_lines(&content) {
            if line.contains(".unwrap()") || line.contains(".expect(") {
                violations.push(format!("{name}:{line_no}: {}", line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Panicking shortcuts in library code:\n  {}",
        violations.join("\n  ")
    );
}
