//! Scene entities and the scene graph that owns them.
//!
//! Nodes are graph vertices and connections are undirected graph edges, so
//! "at most one connection per unordered pair" and "deleting a node drops its
//! connections" fall out of the graph structure. Entities are addressed by
//! stable interned ids; the `NodeIndex`/`EdgeIndex` handles are internal and
//! may change when an entity is removed and re-inserted.

use crate::color::Color;
use crate::geometry::{self, Point, Rect};
use crate::id::{ConnectionId, ImageId, InstanceId, NodeId};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

// ─── Node ────────────────────────────────────────────────────────────────

/// A labeled connection point on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Display label. Not required to be unique.
    pub name: String,
    /// Center of the node.
    pub pos: Point,
    /// Class tag (e.g. `5V`, `GRD`). Only same-class nodes may be connected.
    pub class: String,
    /// Effective fill color: the class color unless explicitly overridden.
    pub color: Color,
    /// Set while the node belongs to a placed module instance; blocks
    /// individual dragging.
    pub locked: bool,
    /// The module instance owning this node, if any.
    pub module_id: Option<InstanceId>,
}

impl Node {
    pub fn new(name: impl Into<String>, pos: Point, class: impl Into<String>, color: Color) -> Self {
        Self {
            id: NodeId::fresh(),
            name: name.into(),
            pos,
            class: class.into(),
            color,
            locked: false,
            module_id: None,
        }
    }

    /// Square hit box of side `size` around the center.
    pub fn bounds(&self, size: f32) -> Rect {
        Rect::centered(self.pos, size)
    }

    pub fn contains(&self, p: Point, size: f32) -> bool {
        self.bounds(size).contains(p)
    }

    pub fn in_instance(&self, instance: InstanceId) -> bool {
        self.module_id == Some(instance)
    }
}

// ─── Connection ──────────────────────────────────────────────────────────

/// How a connection is drawn between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// Straight line.
    #[default]
    Direct,
    /// Axis-aligned polyline through the waypoints.
    Orthogonal,
}

/// Waypoint storage; most orthogonal wires have one L-bend (two points).
pub type Waypoints = SmallVec<[Point; 4]>;

/// A wire between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub node1: NodeId,
    pub node2: NodeId,
    pub color: Color,
    pub routing: Routing,
    /// Intermediate routing points, only meaningful for `Orthogonal`.
    pub waypoints: Waypoints,
}

impl Connection {
    /// New connection colored like `from`. Orthogonal connections start with
    /// an L-bend at the horizontal midpoint.
    pub fn new(from: &Node, to: &Node, routing: Routing) -> Self {
        let waypoints = match routing {
            Routing::Direct => Waypoints::new(),
            Routing::Orthogonal => Waypoints::from_slice(&geometry::l_bend(from.pos, to.pos)),
        };
        Self {
            id: ConnectionId::fresh(),
            node1: from.id,
            node2: to.id,
            color: from.color,
            routing,
            waypoints,
        }
    }

    pub fn is_orthogonal(&self) -> bool {
        self.routing == Routing::Orthogonal
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.node1 == node || self.node2 == node
    }

    /// Unordered endpoint comparison.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.node1 == a && self.node2 == b) || (self.node1 == b && self.node2 == a)
    }

    /// Polyline from `p1` (node1 center) to `p2` (node2 center).
    pub fn path(&self, p1: Point, p2: Point) -> Vec<Point> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(p1);
        if self.is_orthogonal() {
            path.extend(self.waypoints.iter().copied());
        }
        path.push(p2);
        path
    }

    /// Whether `p` lies within `tolerance` of any segment of the wire.
    pub fn hit(&self, p: Point, p1: Point, p2: Point, tolerance: f32) -> bool {
        self.path(p1, p2)
            .windows(2)
            .any(|seg| geometry::point_near_segment(p, seg[0], seg[1], tolerance))
    }

    /// Index of the waypoint within `radius` of `p`, topmost (last) first.
    pub fn waypoint_at(&self, p: Point, radius: f32) -> Option<usize> {
        if !self.is_orthogonal() {
            return None;
        }
        self.waypoints
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| w.distance(p) <= radius)
            .map(|(i, _)| i)
    }
}

// ─── Image ───────────────────────────────────────────────────────────────

/// Which corner resize handle is under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    BottomRight,
}

/// A raster or SVG image placed on the canvas.
///
/// `pos`, `width` and `height` always describe the *unrotated* box; the
/// rotation is applied around its center.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: ImageId,
    pub path: String,
    /// Top-left of the unrotated box.
    pub pos: Point,
    pub width: f32,
    pub height: f32,
    /// Degrees in `[0, 360)`.
    pub rotation: f32,
    pub module_instance_id: Option<InstanceId>,
}

impl Image {
    pub const DEFAULT_SIZE: f32 = 100.0;

    pub fn new(path: impl Into<String>, pos: Point, width: f32, height: f32) -> Self {
        Self {
            id: ImageId::fresh(),
            path: path.into(),
            pos,
            width,
            height,
            rotation: 0.0,
            module_instance_id: None,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.pos.x + self.width / 2.0, self.pos.y + self.height / 2.0)
    }

    /// Move so that the box is centered on `center`.
    pub fn set_center(&mut self, center: Point) {
        self.pos = Point::new(center.x - self.width / 2.0, center.y - self.height / 2.0);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = geometry::wrap_degrees(degrees);
    }

    pub fn in_instance(&self, instance: InstanceId) -> bool {
        self.module_instance_id == Some(instance)
    }

    /// Axis-aligned box of the rotated image.
    pub fn rotated_bounds(&self) -> Rect {
        let c = self.center();
        let corners = [
            Point::new(self.pos.x, self.pos.y),
            Point::new(self.pos.x + self.width, self.pos.y),
            Point::new(self.pos.x + self.width, self.pos.y + self.height),
            Point::new(self.pos.x, self.pos.y + self.height),
        ]
        .map(|p| geometry::rotate_about(p, c, self.rotation));

        let (mut min, mut max) = (corners[0], corners[0]);
        for p in &corners[1..] {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        Rect::from_corners(min, max)
    }

    /// Containment in the rotated box: the query point is rotated back into
    /// the image's local frame and compared against the half extents.
    pub fn contains(&self, p: Point) -> bool {
        let c = self.center();
        let local = geometry::rotate_about(p, c, -self.rotation);
        (local.x - c.x).abs() <= self.width / 2.0 && (local.y - c.y).abs() <= self.height / 2.0
    }

    /// Corner handle of the rotated bounds under `p`.
    pub fn resize_handle_at(&self, p: Point, handle_size: f32) -> Option<ResizeHandle> {
        let bounds = self.rotated_bounds();
        let near = |corner: Point| {
            (p.x - corner.x).abs() <= handle_size && (p.y - corner.y).abs() <= handle_size
        };
        if near(bounds.top_left()) {
            Some(ResizeHandle::TopLeft)
        } else if near(bounds.bottom_right()) {
            Some(ResizeHandle::BottomRight)
        } else {
            None
        }
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// Why a connection could not be inserted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("endpoint node does not exist")]
    MissingEndpoint,
    #[error("a node cannot be connected to itself")]
    SelfLoop,
    #[error("the nodes are already connected")]
    Duplicate,
}

/// Ids of every live entity carrying one instance id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceMembers {
    pub nodes: Vec<NodeId>,
    pub images: Vec<ImageId>,
}

impl InstanceMembers {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.images.is_empty()
    }
}

/// Everything removed along with a module instance.
#[derive(Debug, Clone, Default)]
pub struct RemovedInstance {
    pub nodes: Vec<Node>,
    pub images: Vec<Image>,
    pub connections: Vec<Connection>,
}

/// The authoritative container of nodes, connections and images.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    /// Nodes as vertices, connections as undirected edges.
    pub graph: StableUnGraph<Node, Connection>,

    /// NodeId → NodeIndex for fast lookup.
    pub id_index: HashMap<NodeId, NodeIndex>,

    /// ConnectionId → EdgeIndex for fast lookup.
    pub edge_index: HashMap<ConnectionId, EdgeIndex>,

    /// Images in paint order (last = topmost).
    pub images: Vec<Image>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0 && self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index.clear();
        self.edge_index.clear();
        self.images.clear();
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    // ── Nodes ──

    /// Insert a node. Re-inserting an existing id replaces the stored node.
    pub fn insert_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(&node.id) {
            log::warn!("node {} already in scene, replacing", node.id);
            self.graph[idx] = node;
            return idx;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Remove a node and every connection touching it.
    /// Returns the node and the removed connections.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, Vec<Connection>)> {
        let idx = self.id_index.remove(&id)?;
        let incident: Vec<ConnectionId> = self.graph.edges(idx).map(|e| e.weight().id).collect();
        let connections = incident
            .into_iter()
            .filter_map(|cid| self.remove_connection(cid))
            .collect();
        let node = self.graph.remove_node(idx)?;
        Some((node, connections))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let idx = *self.id_index.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Nodes in paint order (last = topmost).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|n| n.id).collect()
    }

    // ── Connections ──

    /// Insert a connection after checking the structural invariants
    /// (endpoints exist, no self loop, no duplicate pair). Class
    /// compatibility is an editing rule and is not checked here.
    pub fn insert_connection(&mut self, connection: Connection) -> Result<ConnectionId, LinkError> {
        if connection.node1 == connection.node2 {
            return Err(LinkError::SelfLoop);
        }
        let (Some(&a), Some(&b)) = (
            self.id_index.get(&connection.node1),
            self.id_index.get(&connection.node2),
        ) else {
            return Err(LinkError::MissingEndpoint);
        };
        if self.graph.find_edge(a, b).is_some() {
            return Err(LinkError::Duplicate);
        }
        let id = connection.id;
        let edge = self.graph.add_edge(a, b, connection);
        self.edge_index.insert(id, edge);
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let edge = self.edge_index.remove(&id)?;
        self.graph.remove_edge(edge)
    }

    pub fn contains_connection(&self, id: ConnectionId) -> bool {
        self.edge_index.contains_key(&id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.edge_index.get(&id).and_then(|&e| self.graph.edge_weight(e))
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        let edge = *self.edge_index.get(&id)?;
        self.graph.edge_weight_mut(edge)
    }

    /// Connections in paint order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_indices().map(move |e| &self.graph[e])
    }

    /// The connection joining `a` and `b` in either direction.
    pub fn connection_between(&self, a: NodeId, b: NodeId) -> Option<&Connection> {
        let ia = *self.id_index.get(&a)?;
        let ib = *self.id_index.get(&b)?;
        self.graph.find_edge(ia, ib).map(|e| &self.graph[e])
    }

    /// Ids of connections touching `node`.
    pub fn connections_of(&self, node: NodeId) -> Vec<ConnectionId> {
        match self.id_index.get(&node) {
            Some(&idx) => self.graph.edges(idx).map(|e| e.weight().id).collect(),
            None => Vec::new(),
        }
    }

    /// Center positions of a connection's endpoints.
    pub fn endpoints(&self, connection: &Connection) -> Option<(Point, Point)> {
        Some((self.node(connection.node1)?.pos, self.node(connection.node2)?.pos))
    }

    // ── Images ──

    pub fn insert_image(&mut self, image: Image) {
        self.insert_image_at(self.images.len(), image);
    }

    /// Insert at a paint-order position (clamped), e.g. to undo a deletion
    /// in place.
    pub fn insert_image_at(&mut self, index: usize, image: Image) {
        if let Some(existing) = self.image_mut(image.id) {
            log::warn!("image {} already in scene, replacing", image.id);
            *existing = image;
            return;
        }
        let index = index.min(self.images.len());
        self.images.insert(index, image);
    }

    /// Remove an image, returning its paint-order index and value.
    pub fn remove_image(&mut self, id: ImageId) -> Option<(usize, Image)> {
        let index = self.images.iter().position(|i| i.id == id)?;
        Some((index, self.images.remove(index)))
    }

    pub fn contains_image(&self, id: ImageId) -> bool {
        self.images.iter().any(|i| i.id == id)
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images.iter_mut().find(|i| i.id == id)
    }

    // ── Module instances ──

    /// Every node and image tagged with `instance`.
    pub fn instance_members(&self, instance: InstanceId) -> InstanceMembers {
        InstanceMembers {
            nodes: self
                .nodes()
                .filter(|n| n.in_instance(instance))
                .map(|n| n.id)
                .collect(),
            images: self
                .images
                .iter()
                .filter(|i| i.in_instance(instance))
                .map(|i| i.id)
                .collect(),
        }
    }

    /// Distinct instance ids present in the scene, sorted.
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        let mut seen = BTreeSet::new();
        seen.extend(self.nodes().filter_map(|n| n.module_id));
        seen.extend(self.images.iter().filter_map(|i| i.module_instance_id));
        let mut ids: Vec<InstanceId> = seen.into_iter().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Remove every node and image of an instance, plus every connection
    /// touching a removed node.
    pub fn remove_instance(&mut self, instance: InstanceId) -> RemovedInstance {
        let members = self.instance_members(instance);
        let mut removed = RemovedInstance::default();
        for id in members.nodes {
            if let Some((node, connections)) = self.remove_node(id) {
                removed.nodes.push(node);
                removed.connections.extend(connections);
            }
        }
        for id in members.images {
            if let Some((_, image)) = self.remove_image(id) {
                removed.images.push(image);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, x: f32, y: f32) -> Node {
        Node::new(name, Point::new(x, y), "5V", Color::rgb(255, 0, 0))
    }

    #[test]
    fn remove_node_cascades_connections() {
        let mut scene = SceneGraph::new();
        let a = node("A", 0.0, 0.0);
        let b = node("B", 100.0, 0.0);
        let c = node("C", 0.0, 100.0);
        let (ia, ib, ic) = (a.id, b.id, c.id);
        let ab = Connection::new(&a, &b, Routing::Direct);
        let ac = Connection::new(&a, &c, Routing::Direct);
        scene.insert_node(a);
        scene.insert_node(b);
        scene.insert_node(c);
        scene.insert_connection(ab).unwrap();
        scene.insert_connection(ac).unwrap();

        let (_, removed) = scene.remove_node(ia).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(scene.connection_count(), 0);
        assert!(scene.contains_node(ib));
        assert!(scene.contains_node(ic));
        assert!(scene.edge_index.is_empty());
    }

    #[test]
    fn duplicate_and_reverse_pairs_rejected() {
        let mut scene = SceneGraph::new();
        let a = node("A", 0.0, 0.0);
        let b = node("B", 100.0, 0.0);
        let forward = Connection::new(&a, &b, Routing::Direct);
        let reverse = Connection::new(&b, &a, Routing::Direct);
        let self_loop = Connection::new(&a, &a, Routing::Direct);
        scene.insert_node(a);
        scene.insert_node(b);
        assert!(scene.insert_connection(forward).is_ok());
        assert_eq!(scene.insert_connection(reverse), Err(LinkError::Duplicate));
        assert_eq!(scene.insert_connection(self_loop), Err(LinkError::SelfLoop));
        assert_eq!(scene.connection_count(), 1);
    }

    #[test]
    fn orthogonal_connection_gets_l_bend() {
        let a = node("A", 0.0, 0.0);
        let b = node("B", 100.0, 50.0);
        let conn = Connection::new(&a, &b, Routing::Orthogonal);
        assert_eq!(
            conn.waypoints.as_slice(),
            &[Point::new(50.0, 0.0), Point::new(50.0, 50.0)]
        );
        assert_eq!(conn.color, a.color);
        // Hits the vertical leg, misses the straight diagonal's midpoint
        assert!(conn.hit(Point::new(52.0, 25.0), a.pos, b.pos, 5.0));
        assert!(!conn.hit(Point::new(20.0, 40.0), a.pos, b.pos, 5.0));
        assert_eq!(conn.waypoint_at(Point::new(49.0, 51.0), 5.0), Some(1));
    }

    #[test]
    fn rotated_image_containment() {
        let mut img = Image::new("chip.png", Point::new(0.0, 0.0), 100.0, 20.0);
        // Wide and short: (50, 40) is below the unrotated box
        assert!(!img.contains(Point::new(50.0, 40.0)));
        img.set_rotation(90.0);
        // Rotated to tall and narrow around the center (50, 10)
        assert!(img.contains(Point::new(50.0, 40.0)));
        assert!(!img.contains(Point::new(90.0, 10.0)));

        let b = img.rotated_bounds();
        assert!((b.width - 20.0).abs() < 1e-3);
        assert!((b.height - 100.0).abs() < 1e-3);
    }

    #[test]
    fn resize_handles_on_corners() {
        let img = Image::new("a.svg", Point::new(10.0, 10.0), 50.0, 50.0);
        assert_eq!(img.resize_handle_at(Point::new(12.0, 8.0), 12.0), Some(ResizeHandle::TopLeft));
        assert_eq!(
            img.resize_handle_at(Point::new(60.0, 61.0), 12.0),
            Some(ResizeHandle::BottomRight)
        );
        assert_eq!(img.resize_handle_at(Point::new(35.0, 35.0), 12.0), None);
    }

    #[test]
    fn remove_instance_takes_members_and_wires() {
        let mut scene = SceneGraph::new();
        let inst = InstanceId::intern("m1_inst_1");
        let mut a = node("A", 0.0, 0.0);
        a.module_id = Some(inst);
        a.locked = true;
        let b = node("B", 100.0, 0.0);
        let ab = Connection::new(&a, &b, Routing::Direct);
        let mut img = Image::new("x.png", Point::ORIGIN, 10.0, 10.0);
        img.module_instance_id = Some(inst);
        let ib = b.id;
        scene.insert_node(a);
        scene.insert_node(b);
        scene.insert_connection(ab).unwrap();
        scene.insert_image(img);

        let removed = scene.remove_instance(inst);
        assert_eq!(removed.nodes.len(), 1);
        assert_eq!(removed.images.len(), 1);
        assert_eq!(removed.connections.len(), 1);
        assert_eq!(scene.node_ids(), vec![ib]);
        assert!(scene.images.is_empty());
        assert!(scene.instance_ids().is_empty());
    }
}
