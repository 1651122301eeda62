//! JSON codec for scene documents and module templates.
//!
//! Scene documents reference nodes by array position rather than by id, so
//! decoding rebuilds an index → node table and drops connections that point
//! outside it instead of failing the whole load.

use crate::color::Color;
use crate::config::EditorConfig;
use crate::error::CodecError;
use crate::geometry::Point;
use crate::id::InstanceId;
use crate::model::{Connection, Image, Node, Routing, SceneGraph, Waypoints};
use crate::module::Module;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Document Types ──────────────────────────────────────────────────────

/// View state stored alongside the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneMetadata {
    pub grid_enabled: bool,
    pub grid_size: f32,
    pub snap_to_grid: bool,
    pub zoom_level: f32,
    pub pan_offset: Point,
}

impl Default for SceneMetadata {
    fn default() -> Self {
        Self {
            grid_enabled: true,
            grid_size: 10.0,
            snap_to_grid: false,
            zoom_level: 1.0,
            pan_offset: Point::ORIGIN,
        }
    }
}

impl SceneMetadata {
    /// Metadata for a fresh canvas.
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            grid_enabled: config.grid.enabled_by_default,
            grid_size: config.grid.size,
            snap_to_grid: config.features.snap_to_grid_enabled,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneDoc {
    #[serde(default)]
    nodes: Vec<NodeDoc>,
    #[serde(default)]
    connections: Vec<ConnectionDoc>,
    #[serde(default)]
    images: Vec<ImageDoc>,
    #[serde(default)]
    metadata: SceneMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeDoc {
    name: String,
    x: f32,
    y: f32,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    module_id: Option<InstanceId>,
    #[serde(default)]
    locked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConnectionDoc {
    node1: i64,
    node2: i64,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    orthogonal: bool,
    #[serde(default)]
    waypoints: Vec<Point>,
}

fn image_kind() -> String {
    "image".to_string()
}

fn default_image_size() -> f32 {
    Image::DEFAULT_SIZE
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageDoc {
    #[serde(rename = "type", default = "image_kind")]
    kind: String,
    path: String,
    pos: Point,
    #[serde(default = "default_image_size")]
    width: f32,
    #[serde(default = "default_image_size")]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    module_instance_id: Option<InstanceId>,
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// Encode a scene as pretty-printed JSON.
pub fn encode_scene(scene: &SceneGraph, metadata: &SceneMetadata) -> Result<String, CodecError> {
    let mut index = HashMap::new();
    let nodes = scene
        .nodes()
        .enumerate()
        .map(|(i, n)| {
            index.insert(n.id, i as i64);
            NodeDoc {
                name: n.name.clone(),
                x: n.pos.x,
                y: n.pos.y,
                class: Some(n.class.clone()),
                color: Some(n.color),
                module_id: n.module_id,
                locked: n.locked,
            }
        })
        .collect();

    let connections = scene
        .connections()
        .filter_map(|c| {
            Some(ConnectionDoc {
                node1: *index.get(&c.node1)?,
                node2: *index.get(&c.node2)?,
                color: Some(c.color),
                orthogonal: c.is_orthogonal(),
                waypoints: c.waypoints.to_vec(),
            })
        })
        .collect();

    let images = scene
        .images
        .iter()
        .map(|i| ImageDoc {
            kind: image_kind(),
            path: i.path.clone(),
            pos: i.pos,
            width: i.width,
            height: i.height,
            rotation: i.rotation,
            module_instance_id: i.module_instance_id,
        })
        .collect();

    let doc = SceneDoc {
        nodes,
        connections,
        images,
        metadata: metadata.clone(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Decode a scene document into a new scene graph.
///
/// Missing optional keys take defaults: the class falls back to the
/// configured default class and the color to that class's color.
/// Connections with out-of-range, self-referencing or duplicate endpoints
/// are skipped with a warning. A node marked locked without a module
/// instance is loaded unlocked.
pub fn decode_scene(
    text: &str,
    config: &EditorConfig,
) -> Result<(SceneGraph, SceneMetadata), CodecError> {
    let doc: SceneDoc = serde_json::from_str(text)?;
    let mut scene = SceneGraph::new();

    let mut by_index = Vec::with_capacity(doc.nodes.len());
    for n in doc.nodes {
        let class = n.class.unwrap_or_else(|| config.default_class());
        let color = n.color.unwrap_or_else(|| config.class_color(&class));
        let mut node = Node::new(n.name, Point::new(n.x, n.y), class, color);
        node.module_id = n.module_id;
        node.locked = n.locked && n.module_id.is_some();
        if n.locked && n.module_id.is_none() {
            log::warn!("unlocking node '{}': locked without a module instance", node.name);
        }
        by_index.push((node.id, node.color));
        scene.insert_node(node);
    }

    let lookup = |i: i64| usize::try_from(i).ok().and_then(|i| by_index.get(i)).copied();
    for (i, c) in doc.connections.into_iter().enumerate() {
        let (Some((n1, color1)), Some((n2, _))) = (lookup(c.node1), lookup(c.node2)) else {
            log::warn!(
                "skipping connection #{i}: node index out of range ({}, {})",
                c.node1,
                c.node2
            );
            continue;
        };
        let connection = Connection {
            id: crate::id::ConnectionId::fresh(),
            node1: n1,
            node2: n2,
            color: c.color.unwrap_or(color1),
            routing: if c.orthogonal {
                Routing::Orthogonal
            } else {
                Routing::Direct
            },
            waypoints: Waypoints::from_vec(c.waypoints),
        };
        if let Err(e) = scene.insert_connection(connection) {
            log::warn!("skipping connection #{i}: {e}");
        }
    }

    for img in doc.images {
        if img.kind != "image" {
            log::warn!("skipping image entry of unknown type '{}'", img.kind);
            continue;
        }
        let mut image = Image::new(img.path, img.pos, img.width, img.height);
        image.set_rotation(img.rotation);
        image.module_instance_id = img.module_instance_id;
        scene.insert_image(image);
    }

    log::info!(
        "decoded scene: {} nodes, {} connections, {} images",
        scene.node_count(),
        scene.connection_count(),
        scene.image_count()
    );
    Ok((scene, doc.metadata))
}

// ─── Module ──────────────────────────────────────────────────────────────

pub fn encode_module(module: &Module) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(module)?)
}

pub fn decode_module(text: &str) -> Result<Module, CodecError> {
    let mut module: Module = serde_json::from_str(text)?;
    if module.id.trim().is_empty() {
        return Err(CodecError::Invalid {
            what: "module",
            reason: "empty id".to_string(),
        });
    }
    module.images.retain(|img| {
        let known = img.kind == "image";
        if !known {
            log::warn!("module {}: skipping image entry of unknown type '{}'", module.id, img.kind);
        }
        known
    });
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_optional_keys_take_class_defaults() {
        let config = EditorConfig::default();
        let text = r#"{
            "nodes": [
                { "name": "A", "x": 0, "y": 0 },
                { "name": "B", "x": 10, "y": 5, "class": "GRD" }
            ],
            "connections": [ { "node1": 0, "node2": 1 } ]
        }"#;
        let (scene, meta) = decode_scene(text, &config).unwrap();
        let nodes: Vec<&Node> = scene.nodes().collect();
        assert_eq!(nodes[0].class, "5V");
        assert_eq!(nodes[0].color, Color::rgb(255, 0, 0));
        assert_eq!(nodes[1].color, Color::rgb(0, 0, 0));
        let conn = scene.connections().next().unwrap();
        assert_eq!(conn.color, nodes[0].color);
        assert_eq!(conn.routing, Routing::Direct);
        assert_eq!(meta, SceneMetadata::default());
    }

    #[test]
    fn bad_connections_are_skipped() {
        let config = EditorConfig::default();
        let text = r#"{
            "nodes": [ { "name": "A", "x": 0, "y": 0 }, { "name": "B", "x": 1, "y": 1 } ],
            "connections": [
                { "node1": 0, "node2": 7 },
                { "node1": -1, "node2": 0 },
                { "node1": 1, "node2": 1 },
                { "node1": 0, "node2": 1 },
                { "node1": 1, "node2": 0 }
            ]
        }"#;
        let (scene, _) = decode_scene(text, &config).unwrap();
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.connection_count(), 1);
    }

    #[test]
    fn lock_without_instance_is_dropped() {
        let config = EditorConfig::default();
        let text = r#"{
            "nodes": [
                { "name": "A", "x": 0, "y": 0, "locked": true },
                { "name": "B", "x": 5, "y": 0, "locked": true, "module_id": "ab12cd34_inst_1" }
            ]
        }"#;
        let (scene, _) = decode_scene(text, &config).unwrap();
        let locked: Vec<(&str, bool)> = scene.nodes().map(|n| (n.name.as_str(), n.locked)).collect();
        assert_eq!(locked, vec![("A", false), ("B", true)]);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let config = EditorConfig::default();
        let err = decode_scene(r#"{ "nodes": [ { "name": "A", "x": 0 } ] }"#, &config).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
        assert!(decode_scene("not json", &config).is_err());
        assert!(decode_scene(r#"{ "images": [ { "path": "a.png" } ] }"#, &config).is_err());
    }

    #[test]
    fn scene_uses_object_colors_and_module_uses_arrays() {
        let mut scene = SceneGraph::new();
        scene.insert_node(Node::new("A", Point::ORIGIN, "SDA", Color::rgb(0, 0, 255)));
        let text = encode_scene(&scene, &SceneMetadata::default()).unwrap();
        assert!(text.contains(r#""color": {"#));

        let module_text = r#"{ "id": "ab12cd34", "name": "Bus",
            "nodes": [ { "name": "SDA", "pos": { "x": 1, "y": 2 }, "class": "SDA", "color": [0, 0, 255] } ] }"#;
        let module = decode_module(module_text).unwrap();
        assert_eq!(module.nodes[0].color, Color::rgb(0, 0, 255));
        assert!(module.images.is_empty());
        let encoded = encode_module(&module).unwrap();
        assert_eq!(decode_module(&encoded).unwrap(), module);

        let a = Node::new("A", Point::ORIGIN, "5V", Color::BLACK);
        let logo = Image::new("logo.png", Point::new(10.0, 10.0), 20.0, 20.0);
        let with_image = Module::from_selection("ef56ab78", "Logo", [&a], [&logo]).unwrap();
        let encoded = encode_module(&with_image).unwrap();
        assert!(encoded.contains(r#""type": "image""#));
        assert_eq!(decode_module(&encoded).unwrap().images[0].kind, "image");

        let err = decode_module(r#"{ "id": "", "name": "x" }"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid module: empty id");
    }
}
