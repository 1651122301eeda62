//! Module templates and instancing.
//!
//! A template is a flat copy of node and image geometry. Placing it creates
//! fresh, locked scene entities that share one [`InstanceId`] of the form
//! `<template_id>_inst_<n>`.

use crate::color::{self, Color};
use crate::config::FALLBACK_CLASS;
use crate::error::ModuleError;
use crate::geometry::Point;
use crate::id::InstanceId;
use crate::model::{Connection, Image, Node, SceneGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Offset between consecutive placements of the same template.
pub const PLACEMENT_STEP: f32 = 50.0;

/// Offset applied to a duplicated instance.
pub const DUPLICATE_OFFSET: f32 = 50.0;

fn default_class() -> String {
    FALLBACK_CLASS.to_string()
}

fn default_template_color() -> Color {
    Color::rgb(255, 0, 0)
}

fn default_image_size() -> f32 {
    Image::DEFAULT_SIZE
}

fn image_kind() -> String {
    "image".to_string()
}

/// Node geometry stored in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub name: String,
    pub pos: Point,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(with = "color::as_array", default = "default_template_color")]
    pub color: Color,
}

/// Image geometry stored in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateImage {
    #[serde(rename = "type", default = "image_kind")]
    pub kind: String,
    pub path: String,
    pub pos: Point,
    #[serde(default = "default_image_size")]
    pub width: f32,
    #[serde(default = "default_image_size")]
    pub height: f32,
    #[serde(default)]
    pub rotation: f32,
}

/// A named, reusable group of nodes and images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
    #[serde(default)]
    pub images: Vec<TemplateImage>,
}

impl Module {
    /// Build a template by copying the geometry of the given entities.
    pub fn from_selection<'a>(
        id: impl Into<String>,
        name: &str,
        nodes: impl IntoIterator<Item = &'a Node>,
        images: impl IntoIterator<Item = &'a Image>,
    ) -> Result<Self, ModuleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModuleError::EmptyName);
        }
        let nodes: Vec<TemplateNode> = nodes
            .into_iter()
            .map(|n| TemplateNode {
                name: n.name.clone(),
                pos: n.pos,
                class: n.class.clone(),
                color: n.color,
            })
            .collect();
        if nodes.is_empty() {
            return Err(ModuleError::EmptySelection);
        }
        let images = images
            .into_iter()
            .map(|i| TemplateImage {
                kind: image_kind(),
                path: i.path.clone(),
                pos: i.pos,
                width: i.width,
                height: i.height,
                rotation: i.rotation,
            })
            .collect();
        Ok(Self {
            id: id.into(),
            name: name.to_string(),
            nodes,
            images,
        })
    }

    /// Fresh, locked copies for the `k`-th placement, offset by `(50k, 50k)`.
    pub fn instantiate(&self, k: usize, instance: InstanceId) -> (Vec<Node>, Vec<Image>) {
        let d = PLACEMENT_STEP * k as f32;
        let nodes = self
            .nodes
            .iter()
            .map(|t| {
                let mut node = Node::new(t.name.clone(), t.pos.offset(d, d), t.class.clone(), t.color);
                node.locked = true;
                node.module_id = Some(instance);
                node
            })
            .collect();
        let images = self
            .images
            .iter()
            .map(|t| {
                let mut image = Image::new(t.path.clone(), t.pos.offset(d, d), t.width, t.height);
                image.set_rotation(t.rotation);
                image.module_instance_id = Some(instance);
                image
            })
            .collect();
        (nodes, images)
    }
}

/// Entities of a new module placement, ready to be inserted as one unit.
#[derive(Debug, Clone)]
pub struct Placement {
    pub instance: InstanceId,
    pub nodes: Vec<Node>,
    pub images: Vec<Image>,
    pub connections: Vec<Connection>,
}

/// Next free instance id for a template and the number of instances of it
/// already in the scene.
pub fn next_instance(scene: &SceneGraph, template_id: &str) -> (InstanceId, usize) {
    let numbers: Vec<u32> = scene
        .instance_ids()
        .into_iter()
        .filter(|id| id.base_template_id() == template_id)
        .filter_map(|id| id.instance_number())
        .collect();
    let next = numbers.iter().max().map_or(1, |n| n + 1);
    (InstanceId::for_template(template_id, next), numbers.len())
}

/// Place a template as a new instance. Nothing is inserted; the caller
/// records the placement as a command.
pub fn place(scene: &SceneGraph, module: &Module) -> Placement {
    let (instance, k) = next_instance(scene, &module.id);
    let (nodes, images) = module.instantiate(k, instance);
    log::info!(
        "placing module '{}' as {instance} ({} nodes, {} images)",
        module.name,
        nodes.len(),
        images.len()
    );
    Placement {
        instance,
        nodes,
        images,
        connections: Vec::new(),
    }
}

/// Copy a live instance, including drifted positions and the connections
/// between its own nodes. `None` when the instance has no members.
pub fn duplicate_instance(scene: &SceneGraph, instance: InstanceId) -> Option<Placement> {
    let members = scene.instance_members(instance);
    if members.is_empty() {
        return None;
    }
    let (new_instance, _) = next_instance(scene, instance.base_template_id());
    let d = DUPLICATE_OFFSET;

    let mut id_map = HashMap::new();
    let mut nodes = Vec::with_capacity(members.nodes.len());
    for old in members.nodes.iter().filter_map(|id| scene.node(*id)) {
        let mut copy = Node::new(old.name.clone(), old.pos.offset(d, d), old.class.clone(), old.color);
        copy.locked = true;
        copy.module_id = Some(new_instance);
        id_map.insert(old.id, copy.id);
        nodes.push(copy);
    }

    let images = members
        .images
        .iter()
        .filter_map(|id| scene.image(*id))
        .map(|old| {
            let mut copy = Image::new(old.path.clone(), old.pos.offset(d, d), old.width, old.height);
            copy.rotation = old.rotation;
            copy.module_instance_id = Some(new_instance);
            copy
        })
        .collect();

    let connections = scene
        .connections()
        .filter_map(|c| {
            let (&n1, &n2) = (id_map.get(&c.node1)?, id_map.get(&c.node2)?);
            let mut copy = c.clone();
            copy.id = crate::id::ConnectionId::fresh();
            copy.node1 = n1;
            copy.node2 = n2;
            for w in copy.waypoints.iter_mut() {
                *w = w.offset(d, d);
            }
            Some(copy)
        })
        .collect();

    Some(Placement {
        instance: new_instance,
        nodes,
        images,
        connections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Routing;
    use pretty_assertions::assert_eq;

    fn gnd_module() -> Module {
        let a = Node::new("G1", Point::new(0.0, 0.0), "GRD", Color::BLACK);
        let b = Node::new("G2", Point::new(40.0, 0.0), "GRD", Color::BLACK);
        Module::from_selection("abcd1234", "Gnd", [&a, &b], []).unwrap()
    }

    #[test]
    fn from_selection_rejects_empty() {
        let none: [&Node; 0] = [];
        assert_eq!(
            Module::from_selection("x", "Empty", none, []),
            Err(ModuleError::EmptySelection)
        );
        let a = Node::new("A", Point::ORIGIN, "5V", Color::BLACK);
        assert_eq!(Module::from_selection("x", "  ", [&a], []), Err(ModuleError::EmptyName));
    }

    #[test]
    fn instance_numbers_and_offsets() {
        let module = gnd_module();
        let mut scene = SceneGraph::new();

        let first = place(&scene, &module);
        assert_eq!(first.instance.as_str(), "abcd1234_inst_1");
        assert_eq!(first.nodes[1].pos, Point::new(40.0, 0.0));
        for n in first.nodes {
            assert!(n.locked);
            scene.insert_node(n);
        }

        let second = place(&scene, &module);
        assert_eq!(second.instance.as_str(), "abcd1234_inst_2");
        assert_eq!(second.nodes[0].pos, Point::new(50.0, 50.0));
        assert_eq!(second.nodes[1].pos, Point::new(90.0, 50.0));
    }

    #[test]
    fn next_instance_skips_past_gaps() {
        let mut scene = SceneGraph::new();
        let mut n = Node::new("A", Point::ORIGIN, "5V", Color::BLACK);
        n.module_id = Some(InstanceId::for_template("m", 4));
        scene.insert_node(n);
        let (id, k) = next_instance(&scene, "m");
        assert_eq!(id.as_str(), "m_inst_5");
        assert_eq!(k, 1);
        let (other, k) = next_instance(&scene, "q");
        assert_eq!(other.as_str(), "q_inst_1");
        assert_eq!(k, 0);
    }

    #[test]
    fn duplicate_copies_internal_connections_only() {
        let mut scene = SceneGraph::new();
        let inst = InstanceId::for_template("m", 1);
        let mut a = Node::new("A", Point::new(0.0, 0.0), "5V", Color::BLACK);
        let mut b = Node::new("B", Point::new(100.0, 40.0), "5V", Color::BLACK);
        let outside = Node::new("C", Point::new(300.0, 0.0), "5V", Color::BLACK);
        for n in [&mut a, &mut b] {
            n.module_id = Some(inst);
            n.locked = true;
        }
        let internal = Connection::new(&a, &b, Routing::Orthogonal);
        let external = Connection::new(&b, &outside, Routing::Direct);
        scene.insert_node(a);
        scene.insert_node(b);
        scene.insert_node(outside);
        scene.insert_connection(internal).unwrap();
        scene.insert_connection(external).unwrap();

        let copy = duplicate_instance(&scene, inst).unwrap();
        assert_eq!(copy.instance.as_str(), "m_inst_2");
        assert_eq!(copy.nodes.len(), 2);
        assert_eq!(copy.connections.len(), 1);
        let wire = &copy.connections[0];
        assert_eq!(
            wire.waypoints.as_slice(),
            &[Point::new(100.0, 50.0), Point::new(100.0, 90.0)]
        );
        assert!(copy.nodes.iter().any(|n| n.id == wire.node1));
        assert!(copy.nodes.iter().all(|n| n.module_id == Some(copy.instance)));
        assert!(copy.nodes.iter().all(|n| n.locked));

        assert!(duplicate_instance(&scene, InstanceId::intern("missing_inst_1")).is_none());
    }
}
