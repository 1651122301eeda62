//! Selection state.
//!
//! Insertion-ordered sets of node, connection and image ids. Selection
//! changes are UI state and never enter the command log.

use crate::hit::Hit;
use wd_core::id::{ConnectionId, ImageId, NodeId};
use wd_core::model::{InstanceMembers, SceneGraph};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub nodes: Vec<NodeId>,
    pub connections: Vec<ConnectionId>,
    pub images: Vec<ImageId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty() && self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.connections.len() + self.images.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.images.clear();
    }

    pub fn contains(&self, hit: Hit) -> bool {
        match hit {
            Hit::Node(id) => self.nodes.contains(&id),
            Hit::Connection(id) | Hit::Waypoint { connection: id, .. } => {
                self.connections.contains(&id)
            }
            Hit::Image(id) => self.images.contains(&id),
        }
    }

    /// Add without duplicating. A waypoint hit selects its connection.
    pub fn add(&mut self, hit: Hit) {
        fn push<T: PartialEq>(v: &mut Vec<T>, x: T) {
            if !v.contains(&x) {
                v.push(x);
            }
        }
        match hit {
            Hit::Node(id) => push(&mut self.nodes, id),
            Hit::Connection(id) | Hit::Waypoint { connection: id, .. } => {
                push(&mut self.connections, id)
            }
            Hit::Image(id) => push(&mut self.images, id),
        }
    }

    pub fn remove(&mut self, hit: Hit) {
        match hit {
            Hit::Node(id) => self.nodes.retain(|n| *n != id),
            Hit::Connection(id) | Hit::Waypoint { connection: id, .. } => {
                self.connections.retain(|c| *c != id)
            }
            Hit::Image(id) => self.images.retain(|i| *i != id),
        }
    }

    /// Ctrl-click: add if absent, remove if present.
    pub fn toggle(&mut self, hit: Hit) {
        if self.contains(hit) {
            self.remove(hit);
        } else {
            self.add(hit);
        }
    }

    /// Replace the selection with one entity.
    pub fn replace(&mut self, hit: Hit) {
        self.clear();
        self.add(hit);
    }

    pub fn add_members(&mut self, members: &InstanceMembers) {
        for id in &members.nodes {
            self.add(Hit::Node(*id));
        }
        for id in &members.images {
            self.add(Hit::Image(*id));
        }
    }

    pub fn remove_members(&mut self, members: &InstanceMembers) {
        self.nodes.retain(|n| !members.nodes.contains(n));
        self.images.retain(|i| !members.images.contains(i));
    }

    /// Drop ids that no longer exist in the scene.
    pub fn retain_existing(&mut self, scene: &SceneGraph) {
        self.nodes.retain(|id| scene.contains_node(*id));
        self.connections.retain(|id| scene.contains_connection(*id));
        self.images.retain(|id| scene.contains_image(*id));
    }
}
