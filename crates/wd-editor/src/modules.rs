//! Module instance editing and rotation.
//!
//! Editing is a small state machine: entering unlocks one instance and
//! snapshots its geometry; saving writes the live geometry back to the
//! template and re-locks; cancelling restores the snapshot and re-locks.

use crate::EditError;
use crate::commands::shift_attached_waypoints;
use std::collections::HashMap;
use wd_core::geometry::{self, Point, QuarterTurn};
use wd_core::id::{ImageId, InstanceId, NodeId};
use wd_core::model::{SceneGraph, Waypoints};
use wd_core::module::Module;
use wd_core::store::ModuleStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModuleEditState {
    #[default]
    Normal,
    Editing {
        instance: InstanceId,
        node_snapshot: Vec<(NodeId, Point)>,
        image_snapshot: Vec<(ImageId, Point)>,
    },
}

impl ModuleEditState {
    pub fn is_editing(&self) -> bool {
        matches!(self, ModuleEditState::Editing { .. })
    }

    pub fn editing_instance(&self) -> Option<InstanceId> {
        match self {
            ModuleEditState::Editing { instance, .. } => Some(*instance),
            ModuleEditState::Normal => None,
        }
    }

    /// Unlock an instance for direct manipulation. Only valid from `Normal`.
    pub fn enter(&mut self, scene: &mut SceneGraph, instance: InstanceId) -> Result<(), EditError> {
        if let ModuleEditState::Editing { instance: current, .. } = self {
            return Err(EditError::AlreadyEditing(*current));
        }
        let members = scene.instance_members(instance);
        if members.is_empty() {
            return Err(EditError::UnknownInstance(instance));
        }

        let mut node_snapshot = Vec::with_capacity(members.nodes.len());
        for id in &members.nodes {
            if let Some(node) = scene.node_mut(*id) {
                node_snapshot.push((*id, node.pos));
                node.locked = false;
            }
        }
        let image_snapshot = members
            .images
            .iter()
            .filter_map(|id| scene.image(*id).map(|i| (*id, i.pos)))
            .collect();

        log::info!("editing module instance {instance}");
        *self = ModuleEditState::Editing {
            instance,
            node_snapshot,
            image_snapshot,
        };
        Ok(())
    }

    /// Persist the live geometry to the template (base id, original name)
    /// and re-lock. On error the state stays `Editing`.
    pub fn save(
        &mut self,
        scene: &mut SceneGraph,
        store: &mut dyn ModuleStore,
    ) -> Result<Module, EditError> {
        let ModuleEditState::Editing { instance, .. } = self else {
            return Err(EditError::NotEditing);
        };
        let instance = *instance;
        let base_id = instance.base_template_id().to_string();
        let original = store.load(&base_id)?;

        let members = scene.instance_members(instance);
        let module = Module::from_selection(
            base_id,
            &original.name,
            members.nodes.iter().filter_map(|id| scene.node(*id)),
            members.images.iter().filter_map(|id| scene.image(*id)),
        )?;
        store.save(&module)?;

        lock_nodes(scene, instance);
        *self = ModuleEditState::Normal;
        log::info!("saved edits of {instance} to module '{}'", module.name);
        Ok(module)
    }

    /// Restore the snapshot and re-lock without persisting.
    pub fn cancel(&mut self, scene: &mut SceneGraph) -> Result<(), EditError> {
        let ModuleEditState::Editing {
            instance,
            node_snapshot,
            image_snapshot,
        } = std::mem::take(self)
        else {
            return Err(EditError::NotEditing);
        };
        for (id, pos) in node_snapshot {
            if let Some(node) = scene.node_mut(id) {
                node.pos = pos;
            }
        }
        for (id, pos) in image_snapshot {
            if let Some(image) = scene.image_mut(id) {
                image.pos = pos;
            }
        }
        lock_nodes(scene, instance);
        log::info!("cancelled edits of {instance}");
        Ok(())
    }
}

fn lock_nodes(scene: &mut SceneGraph, instance: InstanceId) {
    for id in scene.instance_members(instance).nodes {
        if let Some(node) = scene.node_mut(id) {
            node.locked = true;
        }
    }
}

/// Rotate every member of an instance a quarter turn around the mean of
/// its node positions and image centers. Image rotations turn with it, and
/// waypoints of connections between two members rotate too.
pub fn rotate_instance(
    scene: &mut SceneGraph,
    instance: InstanceId,
    turn: QuarterTurn,
) -> Result<(), EditError> {
    let members = scene.instance_members(instance);
    let mut points: Vec<Point> = members
        .nodes
        .iter()
        .filter_map(|id| scene.node(*id).map(|n| n.pos))
        .collect();
    points.extend(
        members
            .images
            .iter()
            .filter_map(|id| scene.image(*id).map(|i| i.center())),
    );
    let Some(center) = geometry::centroid(&points) else {
        return Err(EditError::UnknownInstance(instance));
    };

    let mut moved = HashMap::new();
    for id in &members.nodes {
        if let Some(node) = scene.node_mut(*id) {
            let to = geometry::rotate_quarter(node.pos, center, turn);
            moved.insert(*id, (to.x - node.pos.x, to.y - node.pos.y));
            node.pos = to;
        }
    }
    for id in &members.images {
        if let Some(image) = scene.image_mut(*id) {
            let c = geometry::rotate_quarter(image.center(), center, turn);
            image.set_center(c);
            image.set_rotation(image.rotation + turn.degrees());
        }
    }

    // Internal wires turn with the instance; external wires only move the
    // waypoint at the attached end.
    let attached: Vec<_> = scene
        .connections()
        .filter_map(|c| {
            let (d1, d2) = (moved.get(&c.node1), moved.get(&c.node2));
            let waypoints: Waypoints = match (d1, d2) {
                (None, None) => return None,
                (Some(_), Some(_)) => c
                    .waypoints
                    .iter()
                    .map(|w| geometry::rotate_quarter(*w, center, turn))
                    .collect(),
                (Some(&(dx, dy)), None) => shift_attached_waypoints(c, true, false, dx, dy)?,
                (None, Some(&(dx, dy))) => shift_attached_waypoints(c, false, true, dx, dy)?,
            };
            Some((c.id, waypoints))
        })
        .collect();
    for (id, waypoints) in attached {
        if let Some(conn) = scene.connection_mut(id) {
            conn.waypoints = waypoints;
        }
    }
    log::debug!("rotated {instance} by {} degrees", turn.degrees());
    Ok(())
}
