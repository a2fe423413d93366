//! Dependency resolution: the resolved tree and its install order.
//!
//! The tree is built by the install service (descriptor fetches are I/O);
//! this module owns the pure parts — the node type, the post-order install
//! ordering, and the version-constraint comparator.

use serde::Serialize;

use agora_common::PackageKind;

// ── Resolved tree ────────────────────────────────────────────────────────────

/// One node of the resolved dependency tree. Duplicates are tolerated; the
/// install ordering deduplicates by id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNode {
    pub id: String,
    pub kind: PackageKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub installed: bool,
    pub dependencies: Vec<ResolvedNode>,
}

/// Depth-first post-order over the tree: every dependency precedes its
/// dependent. Nodes already installed are skipped and duplicates are
/// removed via a visited set.
#[must_use]
pub fn install_order(root: &ResolvedNode) -> Vec<&ResolvedNode> {
    let mut order = Vec::new();
    let mut visited = Vec::new();
    visit(root, &mut order, &mut visited);
    order
}

fn visit<'a>(node: &'a ResolvedNode, order: &mut Vec<&'a ResolvedNode>, visited: &mut Vec<String>) {
    for dep in &node.dependencies {
        visit(dep, order, visited);
    }
    if node.installed || visited.iter().any(|id| id == &node.id) {
        return;
    }
    visited.push(node.id.clone());
    order.push(node);
}

// ── Version constraints ──────────────────────────────────────────────────────

/// Check `actual` against a `<op><major>[.<minor>[.<patch>]]` constraint
/// with `op ∈ {=, >=, <=, >, <}` (default `=`).
///
/// Deliberately permissive: a missing or unparseable constraint — or an
/// unparseable actual version — always satisfies. Malformed `requires`
/// entries therefore never block an install.
#[must_use]
pub fn satisfies_version(actual: &str, constraint: Option<&str>) -> bool {
    let Some(constraint) = constraint else { return true };
    let constraint = constraint.trim();
    if constraint.is_empty() {
        return true;
    }

    let (op, version_part) = split_operator(constraint);
    let Some(wanted) = parse_triple(version_part) else { return true };
    let Some(actual) = parse_triple(actual) else { return true };

    match op {
        "=" => actual == wanted,
        ">=" => actual >= wanted,
        "<=" => actual <= wanted,
        ">" => actual > wanted,
        "<" => actual < wanted,
        _ => true,
    }
}

fn split_operator(constraint: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "="] {
        if let Some(rest) = constraint.strip_prefix(op) {
            return (op, rest.trim());
        }
    }
    ("=", constraint)
}

/// Parse up to three numeric dot components, zero-filling the rest.
fn parse_triple(version: &str) -> Option<(u64, u64, u64)> {
    let version = version.trim().trim_start_matches('v');
    let mut parts = [0u64; 3];
    let mut count = 0;
    for piece in version.split('.') {
        if count == 3 {
            break;
        }
        // Tolerate suffixes like "1.2.3-rc1" on the last component.
        let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
        parts[count] = digits.parse().ok()?;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((parts[0], parts[1], parts[2]))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
