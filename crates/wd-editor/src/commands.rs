//! Undo/Redo command stack.
//!
//! Every reversible mutation is wrapped in a `Command` that records what it
//! needs to reverse itself. State destroyed by the forward effect (deleted
//! nodes, prior module tags) is captured at execute time, so a redo always
//! re-captures against the scene it is applied to.
//!
//! Commands are built after validation. If a target has since disappeared
//! (for example through a direct, non-recorded edit), the command skips it
//! with a warning instead of failing.

use wd_core::color::Color;
use wd_core::geometry::Point;
use wd_core::id::{ConnectionId, ImageId, InstanceId, NodeId};
use wd_core::model::{Connection, Image, Node, Routing, SceneGraph, Waypoints};
use wd_core::module::Placement;

// ─── Captured state ──────────────────────────────────────────────────────

/// Unrotated image box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBox {
    pub pos: Point,
    pub width: f32,
    pub height: f32,
}

impl ImageBox {
    pub fn of(image: &Image) -> Self {
        Self {
            pos: image.pos,
            width: image.width,
            height: image.height,
        }
    }
}

/// Before/after positions for every member of a module instance, plus the
/// waypoints of orthogonal connections attached to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleMove {
    pub instance: Option<InstanceId>,
    pub nodes: Vec<(NodeId, Point, Point)>,
    pub images: Vec<(ImageId, Point, Point)>,
    pub waypoints: Vec<(ConnectionId, Waypoints, Waypoints)>,
}

impl ModuleMove {
    /// Capture a move of `instance` by `(dx, dy)` from the scene's current
    /// positions.
    ///
    /// For attached orthogonal connections, an endpoint inside the instance
    /// drags the waypoint next to it: node1 moves the first waypoint, node2
    /// the last. Connections with both ends inside move every waypoint.
    pub fn capture(scene: &SceneGraph, instance: InstanceId, dx: f32, dy: f32) -> Self {
        let members = scene.instance_members(instance);
        let nodes = members
            .nodes
            .iter()
            .filter_map(|id| scene.node(*id))
            .map(|n| (n.id, n.pos, n.pos.offset(dx, dy)))
            .collect();
        let images = members
            .images
            .iter()
            .filter_map(|id| scene.image(*id))
            .map(|i| (i.id, i.pos, i.pos.offset(dx, dy)))
            .collect();

        let inside = |id: NodeId| scene.node(id).is_some_and(|n| n.in_instance(instance));
        let waypoints = scene
            .connections()
            .filter(|c| c.is_orthogonal() && !c.waypoints.is_empty())
            .filter_map(|c| {
                let after = shift_attached_waypoints(c, inside(c.node1), inside(c.node2), dx, dy)?;
                Some((c.id, c.waypoints.clone(), after))
            })
            .collect();

        Self {
            instance: Some(instance),
            nodes,
            images,
            waypoints,
        }
    }

    /// Write the after (`forward`) or before positions into the scene.
    pub fn apply(&self, scene: &mut SceneGraph, forward: bool) {
        apply_module_move(scene, self, forward);
    }

    pub fn is_noop(&self) -> bool {
        self.nodes.iter().all(|(_, a, b)| a == b) && self.images.iter().all(|(_, a, b)| a == b)
    }
}

/// Waypoints of `conn` after its instance-side endpoints moved by
/// `(dx, dy)`. `None` when neither endpoint moved.
pub fn shift_attached_waypoints(
    conn: &Connection,
    node1_moved: bool,
    node2_moved: bool,
    dx: f32,
    dy: f32,
) -> Option<Waypoints> {
    let mut after = conn.waypoints.clone();
    match (node1_moved, node2_moved) {
        (false, false) => return None,
        (true, true) => after.iter_mut().for_each(|w| *w = w.offset(dx, dy)),
        (true, false) => {
            if let Some(first) = after.first_mut() {
                *first = first.offset(dx, dy);
            }
        }
        (false, true) => {
            if let Some(last) = after.last_mut() {
                *last = last.offset(dx, dy);
            }
        }
    }
    Some(after)
}

/// Prior module tagging of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTag {
    pub id: NodeId,
    pub locked: bool,
    pub module_id: Option<InstanceId>,
}

// ─── Command ─────────────────────────────────────────────────────────────

/// A reversible scene mutation.
#[derive(Debug, Clone)]
pub enum Command {
    AddNode {
        node: Node,
    },
    DeleteNode {
        id: NodeId,
        /// The node and its incident connections, captured on execute.
        removed: Option<(Node, Vec<Connection>)>,
    },
    AddConnection {
        connection: Connection,
    },
    DeleteConnection {
        id: ConnectionId,
        removed: Option<Connection>,
    },
    MoveNode {
        id: NodeId,
        from: Point,
        to: Point,
    },
    MoveImage {
        id: ImageId,
        from: Point,
        to: Point,
    },
    ResizeImage {
        id: ImageId,
        from: ImageBox,
        to: ImageBox,
    },
    ChangeNodeColor {
        id: NodeId,
        from: Color,
        to: Color,
    },
    /// Class and the class-derived color change together.
    ChangeNodeClass {
        id: NodeId,
        from: (String, Color),
        to: (String, Color),
    },
    ChangeConnectionColor {
        id: ConnectionId,
        from: Color,
        to: Color,
    },
    RenameNode {
        id: NodeId,
        from: String,
        to: String,
    },
    MoveModule(ModuleMove),
    DuplicateModule(Placement),
    PlaceModule(Placement),
    AddWaypoint {
        connection: ConnectionId,
        index: usize,
        point: Point,
    },
    RemoveWaypoint {
        connection: ConnectionId,
        index: usize,
        /// Captured on execute.
        removed: Option<Point>,
    },
    MoveWaypoint {
        connection: ConnectionId,
        index: usize,
        from: Point,
        to: Point,
    },
    SetConnectionRouting {
        connection: ConnectionId,
        from: (Routing, Waypoints),
        to: (Routing, Waypoints),
    },
    /// Lock and tag the given entities with a module id.
    CreateModule {
        module_id: InstanceId,
        name: String,
        nodes: Vec<NodeId>,
        images: Vec<ImageId>,
        /// Per-entity prior state, captured on execute.
        prior_nodes: Vec<NodeTag>,
        prior_images: Vec<(ImageId, Option<InstanceId>)>,
    },
    AddImage {
        image: Image,
    },
    DeleteImage {
        id: ImageId,
        /// Paint-order index and image, captured on execute.
        removed: Option<(usize, Image)>,
    },
}

impl Command {
    pub fn delete_node(id: NodeId) -> Self {
        Command::DeleteNode { id, removed: None }
    }

    pub fn delete_connection(id: ConnectionId) -> Self {
        Command::DeleteConnection { id, removed: None }
    }

    pub fn delete_image(id: ImageId) -> Self {
        Command::DeleteImage { id, removed: None }
    }

    pub fn remove_waypoint(connection: ConnectionId, index: usize) -> Self {
        Command::RemoveWaypoint {
            connection,
            index,
            removed: None,
        }
    }

    pub fn create_module(
        module_id: InstanceId,
        name: impl Into<String>,
        nodes: Vec<NodeId>,
        images: Vec<ImageId>,
    ) -> Self {
        Command::CreateModule {
            module_id,
            name: name.into(),
            nodes,
            images,
            prior_nodes: Vec::new(),
            prior_images: Vec::new(),
        }
    }

    /// Apply the forward effect.
    pub fn execute(&mut self, scene: &mut SceneGraph) {
        match self {
            Command::AddNode { node } => {
                scene.insert_node(node.clone());
            }
            Command::DeleteNode { id, removed } => {
                *removed = scene.remove_node(*id);
                if removed.is_none() {
                    log::warn!("delete: node {id} not in scene");
                }
            }
            Command::AddConnection { connection } => {
                if let Err(e) = scene.insert_connection(connection.clone()) {
                    log::warn!("add connection {}: {e}", connection.id);
                }
            }
            Command::DeleteConnection { id, removed } => {
                *removed = scene.remove_connection(*id);
                if removed.is_none() {
                    log::warn!("delete: connection {id} not in scene");
                }
            }
            Command::MoveNode { id, to, .. } => set_node_pos(scene, *id, *to),
            Command::MoveImage { id, to, .. } => set_image_pos(scene, *id, *to),
            Command::ResizeImage { id, to, .. } => set_image_box(scene, *id, *to),
            Command::ChangeNodeColor { id, to, .. } => set_node_color(scene, *id, *to),
            Command::ChangeNodeClass { id, to, .. } => set_node_class(scene, *id, to),
            Command::ChangeConnectionColor { id, to, .. } => set_connection_color(scene, *id, *to),
            Command::RenameNode { id, to, .. } => set_node_name(scene, *id, to),
            Command::MoveModule(mv) => apply_module_move(scene, mv, true),
            Command::DuplicateModule(placement) | Command::PlaceModule(placement) => {
                insert_placement(scene, placement)
            }
            Command::AddWaypoint {
                connection,
                index,
                point,
            } => with_connection(scene, *connection, |c| {
                let at = (*index).min(c.waypoints.len());
                c.waypoints.insert(at, *point);
            }),
            Command::RemoveWaypoint {
                connection,
                index,
                removed,
            } => {
                *removed = None;
                with_connection(scene, *connection, |c| {
                    if *index < c.waypoints.len() {
                        *removed = Some(c.waypoints.remove(*index));
                    } else {
                        log::warn!("remove waypoint: index {index} out of range");
                    }
                });
            }
            Command::MoveWaypoint {
                connection,
                index,
                to,
                ..
            } => set_waypoint(scene, *connection, *index, *to),
            Command::SetConnectionRouting { connection, to, .. } => {
                set_routing(scene, *connection, to)
            }
            Command::CreateModule {
                module_id,
                nodes,
                images,
                prior_nodes,
                prior_images,
                ..
            } => {
                prior_nodes.clear();
                prior_images.clear();
                for id in nodes.iter() {
                    match scene.node_mut(*id) {
                        Some(node) => {
                            prior_nodes.push(NodeTag {
                                id: *id,
                                locked: node.locked,
                                module_id: node.module_id,
                            });
                            node.locked = true;
                            node.module_id = Some(*module_id);
                        }
                        None => log::warn!("create module: node {id} not in scene"),
                    }
                }
                for id in images.iter() {
                    match scene.image_mut(*id) {
                        Some(image) => {
                            prior_images.push((*id, image.module_instance_id));
                            image.module_instance_id = Some(*module_id);
                        }
                        None => log::warn!("create module: image {id} not in scene"),
                    }
                }
            }
            Command::AddImage { image } => scene.insert_image(image.clone()),
            Command::DeleteImage { id, removed } => {
                *removed = scene.remove_image(*id);
                if removed.is_none() {
                    log::warn!("delete: image {id} not in scene");
                }
            }
        }
    }

    /// Reverse the forward effect.
    pub fn undo(&mut self, scene: &mut SceneGraph) {
        match self {
            Command::AddNode { node } => {
                if scene.remove_node(node.id).is_none() {
                    log::warn!("undo add: node {} not in scene", node.id);
                }
            }
            Command::DeleteNode { removed, .. } => {
                if let Some((node, connections)) = removed.take() {
                    scene.insert_node(node);
                    for connection in connections {
                        let id = connection.id;
                        if let Err(e) = scene.insert_connection(connection) {
                            log::warn!("undo delete: cannot restore connection {id}: {e}");
                        }
                    }
                }
            }
            Command::AddConnection { connection } => {
                scene.remove_connection(connection.id);
            }
            Command::DeleteConnection { removed, .. } => {
                if let Some(connection) = removed.take() {
                    let id = connection.id;
                    if let Err(e) = scene.insert_connection(connection) {
                        log::warn!("undo delete: cannot restore connection {id}: {e}");
                    }
                }
            }
            Command::MoveNode { id, from, .. } => set_node_pos(scene, *id, *from),
            Command::MoveImage { id, from, .. } => set_image_pos(scene, *id, *from),
            Command::ResizeImage { id, from, .. } => set_image_box(scene, *id, *from),
            Command::ChangeNodeColor { id, from, .. } => set_node_color(scene, *id, *from),
            Command::ChangeNodeClass { id, from, .. } => set_node_class(scene, *id, from),
            Command::ChangeConnectionColor { id, from, .. } => {
                set_connection_color(scene, *id, *from)
            }
            Command::RenameNode { id, from, .. } => set_node_name(scene, *id, from),
            Command::MoveModule(mv) => apply_module_move(scene, mv, false),
            Command::DuplicateModule(placement) | Command::PlaceModule(placement) => {
                remove_placement(scene, placement)
            }
            Command::AddWaypoint {
                connection, index, ..
            } => with_connection(scene, *connection, |c| {
                let at = (*index).min(c.waypoints.len().saturating_sub(1));
                if !c.waypoints.is_empty() {
                    c.waypoints.remove(at);
                }
            }),
            Command::RemoveWaypoint {
                connection,
                index,
                removed,
            } => {
                if let Some(point) = removed.take() {
                    with_connection(scene, *connection, |c| {
                        let at = (*index).min(c.waypoints.len());
                        c.waypoints.insert(at, point);
                    });
                }
            }
            Command::MoveWaypoint {
                connection,
                index,
                from,
                ..
            } => set_waypoint(scene, *connection, *index, *from),
            Command::SetConnectionRouting {
                connection, from, ..
            } => set_routing(scene, *connection, from),
            Command::CreateModule {
                prior_nodes,
                prior_images,
                ..
            } => {
                for tag in prior_nodes.iter() {
                    if let Some(node) = scene.node_mut(tag.id) {
                        node.locked = tag.locked;
                        node.module_id = tag.module_id;
                    }
                }
                for (id, prior) in prior_images.iter() {
                    if let Some(image) = scene.image_mut(*id) {
                        image.module_instance_id = *prior;
                    }
                }
            }
            Command::AddImage { image } => {
                scene.remove_image(image.id);
            }
            Command::DeleteImage { removed, .. } => {
                if let Some((index, image)) = removed.take() {
                    scene.insert_image_at(index, image);
                }
            }
        }
    }

    /// Human-readable label for status display.
    pub fn describe(&self) -> String {
        match self {
            Command::AddNode { node } => format!("Add node {}", node.name),
            Command::DeleteNode { removed, .. } => match removed {
                Some((node, _)) => format!("Delete node {}", node.name),
                None => "Delete node".to_string(),
            },
            Command::AddConnection { .. } => "Add connection".to_string(),
            Command::DeleteConnection { .. } => "Delete connection".to_string(),
            Command::MoveNode { .. } => "Move node".to_string(),
            Command::MoveImage { .. } => "Move image".to_string(),
            Command::ResizeImage { .. } => "Resize image".to_string(),
            Command::ChangeNodeColor { .. } => "Change node color".to_string(),
            Command::ChangeNodeClass { to, .. } => format!("Change node class to {}", to.0),
            Command::ChangeConnectionColor { .. } => "Change connection color".to_string(),
            Command::RenameNode { to, .. } => format!("Rename node to {to}"),
            Command::MoveModule(_) => "Move module".to_string(),
            Command::DuplicateModule(_) => "Duplicate module".to_string(),
            Command::PlaceModule(p) => format!("Place module {}", p.instance),
            Command::AddWaypoint { .. } => "Add waypoint".to_string(),
            Command::RemoveWaypoint { .. } => "Remove waypoint".to_string(),
            Command::MoveWaypoint { .. } => "Move waypoint".to_string(),
            Command::SetConnectionRouting { to, .. } => match to.0 {
                Routing::Direct => "Make connection direct".to_string(),
                Routing::Orthogonal => "Make connection orthogonal".to_string(),
            },
            Command::CreateModule { name, .. } => format!("Create module {name}"),
            Command::AddImage { .. } => "Add image".to_string(),
            Command::DeleteImage { .. } => "Delete image".to_string(),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn set_node_pos(scene: &mut SceneGraph, id: NodeId, pos: Point) {
    match scene.node_mut(id) {
        Some(node) => node.pos = pos,
        None => log::warn!("move: node {id} not in scene"),
    }
}

fn set_node_color(scene: &mut SceneGraph, id: NodeId, color: Color) {
    match scene.node_mut(id) {
        Some(node) => node.color = color,
        None => log::warn!("color: node {id} not in scene"),
    }
}

fn set_node_class(scene: &mut SceneGraph, id: NodeId, (class, color): &(String, Color)) {
    match scene.node_mut(id) {
        Some(node) => {
            node.class = class.clone();
            node.color = *color;
        }
        None => log::warn!("class: node {id} not in scene"),
    }
}

fn set_node_name(scene: &mut SceneGraph, id: NodeId, name: &str) {
    match scene.node_mut(id) {
        Some(node) => node.name = name.to_string(),
        None => log::warn!("rename: node {id} not in scene"),
    }
}

fn set_image_pos(scene: &mut SceneGraph, id: ImageId, pos: Point) {
    match scene.image_mut(id) {
        Some(image) => image.pos = pos,
        None => log::warn!("move: image {id} not in scene"),
    }
}

fn set_image_box(scene: &mut SceneGraph, id: ImageId, b: ImageBox) {
    match scene.image_mut(id) {
        Some(image) => {
            image.pos = b.pos;
            image.width = b.width;
            image.height = b.height;
        }
        None => log::warn!("resize: image {id} not in scene"),
    }
}

fn set_connection_color(scene: &mut SceneGraph, id: ConnectionId, color: Color) {
    with_connection(scene, id, |c| c.color = color);
}

fn with_connection(scene: &mut SceneGraph, id: ConnectionId, f: impl FnOnce(&mut Connection)) {
    match scene.connection_mut(id) {
        Some(connection) => f(connection),
        None => log::warn!("connection {id} not in scene"),
    }
}

fn set_waypoint(scene: &mut SceneGraph, id: ConnectionId, index: usize, p: Point) {
    with_connection(scene, id, |c| match c.waypoints.get_mut(index) {
        Some(w) => *w = p,
        None => log::warn!("waypoint {index} out of range on {id}"),
    });
}

fn set_routing(scene: &mut SceneGraph, id: ConnectionId, (routing, waypoints): &(Routing, Waypoints)) {
    with_connection(scene, id, |c| {
        c.routing = *routing;
        c.waypoints = waypoints.clone();
    });
}

fn apply_module_move(scene: &mut SceneGraph, mv: &ModuleMove, forward: bool) {
    let pick = |from: Point, to: Point| if forward { to } else { from };
    for (id, from, to) in &mv.nodes {
        set_node_pos(scene, *id, pick(*from, *to));
    }
    for (id, from, to) in &mv.images {
        set_image_pos(scene, *id, pick(*from, *to));
    }
    for (id, from, to) in &mv.waypoints {
        let target: Waypoints = if forward { to.clone() } else { from.clone() };
        with_connection(scene, *id, |c| c.waypoints = target);
    }
}

fn insert_placement(scene: &mut SceneGraph, placement: &Placement) {
    for node in &placement.nodes {
        scene.insert_node(node.clone());
    }
    for image in &placement.images {
        scene.insert_image(image.clone());
    }
    for connection in &placement.connections {
        if let Err(e) = scene.insert_connection(connection.clone()) {
            log::warn!("placement {}: connection skipped: {e}", placement.instance);
        }
    }
}

fn remove_placement(scene: &mut SceneGraph, placement: &Placement) {
    for connection in &placement.connections {
        scene.remove_connection(connection.id);
    }
    for node in &placement.nodes {
        scene.remove_node(node.id);
    }
    for image in &placement.images {
        scene.remove_image(image.id);
    }
}

// ─── Stack ───────────────────────────────────────────────────────────────

/// Manages undo/redo stacks.
#[derive(Debug, Default)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth. 0 = unbounded.
    max_depth: usize,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Execute a command and push it to the undo stack.
    pub fn run(&mut self, mut cmd: Command, scene: &mut SceneGraph) {
        log::debug!("execute: {}", cmd.describe());
        cmd.execute(scene);
        self.undo_stack.push(cmd);
        if self.max_depth > 0 && self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }

        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command.
    pub fn undo(&mut self, scene: &mut SceneGraph) -> Option<String> {
        let mut cmd = self.undo_stack.pop()?;
        let desc = cmd.describe();
        log::debug!("undo: {desc}");
        cmd.undo(scene);
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, scene: &mut SceneGraph) -> Option<String> {
        let mut cmd = self.redo_stack.pop()?;
        log::debug!("redo: {}", cmd.describe());
        cmd.execute(scene);
        let desc = cmd.describe();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(Command::describe)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(Command::describe)
    }

    /// Number of undoable commands.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(name: &str, x: f32, y: f32) -> Node {
        Node::new(name, Point::new(x, y), "5V", Color::rgb(255, 0, 0))
    }

    #[test]
    fn undo_redo_move() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(100);
        let n = node("A", 0.0, 0.0);
        let id = n.id;
        stack.run(Command::AddNode { node: n }, &mut scene);
        stack.run(
            Command::MoveNode {
                id,
                from: Point::new(0.0, 0.0),
                to: Point::new(40.0, 10.0),
            },
            &mut scene,
        );
        assert_eq!(scene.node(id).unwrap().pos, Point::new(40.0, 10.0));

        assert_eq!(stack.undo(&mut scene), Some("Move node".to_string()));
        assert_eq!(scene.node(id).unwrap().pos, Point::ORIGIN);

        assert_eq!(stack.redo(&mut scene), Some("Move node".to_string()));
        assert_eq!(scene.node(id).unwrap().pos, Point::new(40.0, 10.0));
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(100);
        stack.run(Command::AddNode { node: node("A", 0.0, 0.0) }, &mut scene);
        stack.undo(&mut scene);
        assert!(stack.can_redo());

        stack.run(Command::AddNode { node: node("B", 0.0, 0.0) }, &mut scene);
        assert!(!stack.can_redo());
        assert_eq!(stack.redo(&mut scene), None);
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(10);
        assert_eq!(stack.undo(&mut scene), None);
        assert_eq!(stack.redo(&mut scene), None);
        assert!(scene.is_empty());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(2);
        for name in ["A", "B", "C"] {
            stack.run(Command::AddNode { node: node(name, 0.0, 0.0) }, &mut scene);
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo_description(), Some("Add node C".to_string()));
        stack.undo(&mut scene);
        stack.undo(&mut scene);
        assert_eq!(stack.undo(&mut scene), None);
        // The oldest node was trimmed from history, so it stays.
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn delete_node_restores_incident_connections() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(0);
        let (a, b, c) = (node("A", 0.0, 0.0), node("B", 50.0, 0.0), node("C", 0.0, 50.0));
        let ia = a.id;
        let ab = Connection::new(&a, &b, Routing::Direct);
        let ac = Connection::new(&a, &c, Routing::Orthogonal);
        for n in [a, b, c] {
            scene.insert_node(n);
        }
        scene.insert_connection(ab).unwrap();
        scene.insert_connection(ac.clone()).unwrap();

        stack.run(Command::delete_node(ia), &mut scene);
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.connection_count(), 0);
        assert_eq!(stack.undo_description(), Some("Delete node A".to_string()));

        stack.undo(&mut scene);
        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.connection_count(), 2);
        assert_eq!(scene.connection(ac.id), Some(&ac));
    }

    #[test]
    fn create_module_restores_per_node_state() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(0);
        let old = InstanceId::intern("old_inst_1");
        let free = node("A", 0.0, 0.0);
        let mut tagged = node("B", 10.0, 0.0);
        tagged.locked = true;
        tagged.module_id = Some(old);
        let (ia, ib) = (free.id, tagged.id);
        scene.insert_node(free);
        scene.insert_node(tagged);

        let module = InstanceId::intern("feedbeef");
        stack.run(
            Command::create_module(module, "Pair", vec![ia, ib], Vec::new()),
            &mut scene,
        );
        assert!(scene.nodes().all(|n| n.locked && n.module_id == Some(module)));

        stack.undo(&mut scene);
        let a = scene.node(ia).unwrap();
        assert_eq!((a.locked, a.module_id), (false, None));
        let b = scene.node(ib).unwrap();
        assert_eq!((b.locked, b.module_id), (true, Some(old)));
    }

    #[test]
    fn waypoint_commands_are_index_based() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(0);
        let (a, b) = (node("A", 0.0, 0.0), node("B", 100.0, 40.0));
        let conn = Connection::new(&a, &b, Routing::Orthogonal);
        let cid = conn.id;
        scene.insert_node(a);
        scene.insert_node(b);
        scene.insert_connection(conn).unwrap();

        stack.run(
            Command::AddWaypoint {
                connection: cid,
                index: 1,
                point: Point::new(50.0, 20.0),
            },
            &mut scene,
        );
        assert_eq!(scene.connection(cid).unwrap().waypoints.len(), 3);
        assert_eq!(scene.connection(cid).unwrap().waypoints[1], Point::new(50.0, 20.0));

        stack.run(Command::remove_waypoint(cid, 0), &mut scene);
        assert_eq!(
            scene.connection(cid).unwrap().waypoints.as_slice(),
            &[Point::new(50.0, 20.0), Point::new(50.0, 40.0)]
        );

        stack.undo(&mut scene);
        stack.undo(&mut scene);
        assert_eq!(
            scene.connection(cid).unwrap().waypoints.as_slice(),
            &[Point::new(50.0, 0.0), Point::new(50.0, 40.0)]
        );
    }

    #[test]
    fn vanished_target_is_skipped() {
        let mut scene = SceneGraph::new();
        let mut stack = CommandStack::new(0);
        let n = node("A", 0.0, 0.0);
        let id = n.id;
        stack.run(Command::AddNode { node: n }, &mut scene);
        scene.remove_node(id);
        stack.run(
            Command::MoveNode {
                id,
                from: Point::ORIGIN,
                to: Point::new(5.0, 5.0),
            },
            &mut scene,
        );
        stack.undo(&mut scene);
        stack.undo(&mut scene);
        assert!(scene.is_empty());
    }
}
