//! Lint diagnostics for diagrams.
//!
//! Reports structural issues without modifying the scene. Used by
//! `wd lint` and available to hosts that want to surface warnings.

use crate::id::{ConnectionId, NodeId};
use crate::model::SceneGraph;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Likely a mistake.
    Warning,
    /// Style or cleanup suggestion.
    Info,
}

/// The entity a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintTarget {
    Node(NodeId),
    Connection(ConnectionId),
}

/// A single lint diagnostic.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    pub target: LintTarget,
    /// Human-readable message.
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "incompatible-classes").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the scene and return diagnostics.
#[must_use]
pub fn lint_scene(scene: &SceneGraph) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_incompatible_classes(scene, &mut diags);
    lint_locked_without_module(scene, &mut diags);
    lint_routing(scene, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Class compatibility is only checked when a connection is drawn, so a
/// later class change can leave mismatched endpoints behind.
fn lint_incompatible_classes(scene: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for conn in scene.connections() {
        let (Some(a), Some(b)) = (scene.node(conn.node1), scene.node(conn.node2)) else {
            continue;
        };
        if a.class != b.class {
            diags.push(LintDiagnostic {
                target: LintTarget::Connection(conn.id),
                message: format!(
                    "Connection joins `{}` ({}) and `{}` ({}), which have different classes.",
                    a.name, a.class, b.name, b.class
                ),
                severity: LintSeverity::Warning,
                rule: "incompatible-classes",
            });
        }
    }
}

fn lint_locked_without_module(scene: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for node in scene.nodes().filter(|n| n.locked && n.module_id.is_none()) {
        diags.push(LintDiagnostic {
            target: LintTarget::Node(node.id),
            message: format!("Node `{}` is locked but belongs to no module.", node.name),
            severity: LintSeverity::Warning,
            rule: "locked-without-module",
        });
    }
}

fn lint_routing(scene: &SceneGraph, diags: &mut Vec<LintDiagnostic>) {
    for conn in scene.connections() {
        if conn.is_orthogonal() && conn.waypoints.is_empty() {
            diags.push(LintDiagnostic {
                target: LintTarget::Connection(conn.id),
                message: "Orthogonal connection has no waypoints and will draw as a straight line."
                    .to_string(),
                severity: LintSeverity::Info,
                rule: "orthogonal-without-waypoints",
            });
        } else if !conn.is_orthogonal() && !conn.waypoints.is_empty() {
            diags.push(LintDiagnostic {
                target: LintTarget::Connection(conn.id),
                message: format!(
                    "Direct connection carries {} unused waypoint(s).",
                    conn.waypoints.len()
                ),
                severity: LintSeverity::Info,
                rule: "stray-waypoints",
            });
        }
    }
}
