//! Hit testing: point → entity lookup.
//!
//! Priority is fixed: orthogonal waypoint > node > connection > image.
//! Within a kind, later-painted entities are on top, so each walk runs in
//! reverse paint order.

use wd_core::config::EditorConfig;
use wd_core::geometry::{Point, Rect};
use wd_core::id::{ConnectionId, ImageId, NodeId};
use wd_core::model::SceneGraph;

/// Grab radius around waypoint handles.
pub const WAYPOINT_RADIUS: f32 = 6.0;

/// Grab size of image resize handles.
pub const RESIZE_HANDLE_SIZE: f32 = 8.0;

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Waypoint {
        connection: ConnectionId,
        index: usize,
    },
    Node(NodeId),
    Connection(ConnectionId),
    Image(ImageId),
}

/// Sizes that control hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    pub node_size: f32,
    pub connection_distance: f32,
    pub waypoint_radius: f32,
}

impl HitTolerance {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            node_size: config.node.size,
            connection_distance: config.connection.hitbox_distance,
            waypoint_radius: WAYPOINT_RADIUS,
        }
    }
}

/// Find the topmost entity at `p`. Returns `None` for empty canvas.
pub fn hit_test(scene: &SceneGraph, p: Point, tol: &HitTolerance) -> Option<Hit> {
    waypoint_at(scene, p, tol.waypoint_radius)
        .or_else(|| node_at(scene, p, tol.node_size).map(Hit::Node))
        .or_else(|| connection_at(scene, p, tol.connection_distance).map(Hit::Connection))
        .or_else(|| image_at(scene, p).map(Hit::Image))
}

pub fn waypoint_at(scene: &SceneGraph, p: Point, radius: f32) -> Option<Hit> {
    let connections: Vec<_> = scene.connections().collect();
    connections.into_iter().rev().find_map(|c| {
        c.waypoint_at(p, radius).map(|index| Hit::Waypoint {
            connection: c.id,
            index,
        })
    })
}

pub fn node_at(scene: &SceneGraph, p: Point, node_size: f32) -> Option<NodeId> {
    let nodes: Vec<_> = scene.nodes().collect();
    nodes
        .into_iter()
        .rev()
        .find(|n| n.contains(p, node_size))
        .map(|n| n.id)
}

pub fn connection_at(scene: &SceneGraph, p: Point, tolerance: f32) -> Option<ConnectionId> {
    let connections: Vec<_> = scene.connections().collect();
    connections
        .into_iter()
        .rev()
        .find(|c| {
            scene
                .endpoints(c)
                .is_some_and(|(p1, p2)| c.hit(p, p1, p2, tolerance))
        })
        .map(|c| c.id)
}

pub fn image_at(scene: &SceneGraph, p: Point) -> Option<ImageId> {
    scene.images.iter().rev().find(|i| i.contains(p)).map(|i| i.id)
}

/// Nodes and images whose boxes intersect `rect`.
/// Used for marquee (box) selection.
pub fn hit_test_rect(scene: &SceneGraph, rect: Rect, node_size: f32) -> Vec<Hit> {
    let mut result: Vec<Hit> = scene
        .nodes()
        .filter(|n| n.bounds(node_size).intersects(&rect))
        .map(|n| Hit::Node(n.id))
        .collect();
    result.extend(
        scene
            .images
            .iter()
            .filter(|i| i.rotated_bounds().intersects(&rect))
            .map(|i| Hit::Image(i.id)),
    );
    result
}
