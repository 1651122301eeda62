//! Canvas controller.
//!
//! Owns the scene and everything the user manipulates around it: the
//! selection, the undo history, the interaction mode, the viewport and the
//! module edit state. Gestures are interpreted here and turned into scene
//! mutations through one of two channels:
//!
//! | Channel        | Used for                                                   |
//! |----------------|------------------------------------------------------------|
//! | `run_command`  | node/connection/image edits, moves, properties, waypoints, routing, module create/place/duplicate/move |
//! | `apply_direct` | image placement, module instance deletion and rotation, clearing the canvas |
//!
//! Direct edits are not recorded and cannot be undone.

use crate::commands::{Command, CommandStack, ImageBox, ModuleMove};
use crate::hit::{self, Hit, HitTolerance, RESIZE_HANDLE_SIZE};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::modules::{self, ModuleEditState};
use crate::selection::Selection;
use crate::tools::{self, Gesture, Mode};
use crate::viewport::Viewport;
use crate::EditError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use wd_core::codec::{self, SceneMetadata};
use wd_core::color::Color;
use wd_core::config::EditorConfig;
use wd_core::files;
use wd_core::geometry::{self, Point, QuarterTurn};
use wd_core::id::{ConnectionId, ImageId, InstanceId, NodeId};
use wd_core::model::{Connection, Image, Node, Routing, SceneGraph, Waypoints};
use wd_core::module::{self as template, Module};
use wd_core::store::ModuleStore;

/// An irreversible scene edit that bypasses the command log.
#[derive(Debug, Clone)]
pub enum DirectEdit {
    PlaceImage(Image),
    DeleteInstance(InstanceId),
    RotateInstance {
        instance: InstanceId,
        turn: QuarterTurn,
    },
    Clear,
}

pub struct Canvas {
    scene: SceneGraph,
    selection: Selection,
    history: CommandStack,
    config: EditorConfig,
    mode: Mode,
    gesture: Gesture,
    pub viewport: Viewport,

    // Drawing state
    active_class: String,
    active_color: Color,
    routing: Routing,
    grid_visible: bool,
    snap_to_grid: bool,
    grid_size: f32,

    /// First node clicked in connect mode.
    pending_source: Option<NodeId>,
    node_counter: usize,
    edit: ModuleEditState,
}

impl Canvas {
    pub fn new(config: EditorConfig) -> Self {
        let active_class = config.default_class();
        let active_color = config.class_color(&active_class);
        Self {
            scene: SceneGraph::new(),
            selection: Selection::new(),
            history: CommandStack::new(config.history.max_depth),
            mode: Mode::Select,
            gesture: Gesture::Idle,
            viewport: Viewport::new(config.zoom.clone()),
            active_class,
            active_color,
            routing: if config.connection.orthogonal_by_default {
                Routing::Orthogonal
            } else {
                Routing::Direct
            },
            grid_visible: config.grid.enabled_by_default,
            snap_to_grid: config.features.snap_to_grid_enabled,
            grid_size: config.grid.size,
            pending_source: None,
            node_counter: 0,
            edit: ModuleEditState::Normal,
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch mode. Any armed connection source is dropped.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.pending_source = None;
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn pending_source(&self) -> Option<NodeId> {
        self.pending_source
    }

    pub fn edit_state(&self) -> &ModuleEditState {
        &self.edit
    }

    pub fn active_class(&self) -> &str {
        &self.active_class
    }

    /// Set the class used for new nodes; the color follows the class.
    pub fn set_active_class(&mut self, class: &str) {
        self.active_class = class.to_string();
        self.active_color = self.config.class_color(class);
    }

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn set_active_color(&mut self, color: Color) {
        self.active_color = color;
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Routing used for newly drawn connections.
    pub fn set_routing(&mut self, routing: Routing) {
        self.routing = routing;
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.grid_visible = visible;
    }

    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.snap_to_grid = enabled;
    }

    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    pub fn set_grid_size(&mut self, size: f32) {
        if size > 0.0 {
            self.grid_size = size;
        }
    }

    /// Grid-snap a canvas point. Identity when snapping is off.
    pub fn snap(&self, p: Point) -> Point {
        if self.snap_to_grid {
            geometry::snap_point(p, self.grid_size)
        } else {
            p
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Execute a reversible command and record it.
    pub fn run_command(&mut self, cmd: Command) {
        self.history.run(cmd, &mut self.scene);
        self.selection.retain_existing(&self.scene);
    }

    pub fn undo(&mut self) -> Option<String> {
        let desc = self.history.undo(&mut self.scene);
        self.selection.retain_existing(&self.scene);
        desc
    }

    pub fn redo(&mut self) -> Option<String> {
        let desc = self.history.redo(&mut self.scene);
        self.selection.retain_existing(&self.scene);
        desc
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ─── Direct channel ──────────────────────────────────────────────────

    /// Apply an unrecorded edit.
    pub fn apply_direct(&mut self, edit: DirectEdit) -> Result<(), EditError> {
        match edit {
            DirectEdit::PlaceImage(image) => self.insert_image(image),
            DirectEdit::DeleteInstance(instance) => {
                if self.edit.editing_instance() == Some(instance) {
                    self.edit = ModuleEditState::Normal;
                }
                let removed = self.scene.remove_instance(instance);
                if removed.nodes.is_empty() && removed.images.is_empty() {
                    return Err(EditError::UnknownInstance(instance));
                }
                log::info!(
                    "deleted module instance {instance}: {} nodes, {} images, {} connections",
                    removed.nodes.len(),
                    removed.images.len(),
                    removed.connections.len()
                );
            }
            DirectEdit::RotateInstance { instance, turn } => {
                modules::rotate_instance(&mut self.scene, instance, turn)?;
            }
            DirectEdit::Clear => self.clear(),
        }
        self.selection.retain_existing(&self.scene);
        Ok(())
    }

    fn insert_image(&mut self, image: Image) {
        log::info!("placed image {}", image.path);
        self.scene.insert_image(image);
    }

    /// Empty the scene and reset history, edit mode and node numbering.
    pub fn clear(&mut self) {
        self.scene.clear();
        self.history.clear();
        self.selection.clear();
        self.edit = ModuleEditState::Normal;
        self.pending_source = None;
        self.gesture = Gesture::Idle;
        self.node_counter = 0;
    }

    // ─── Hit testing & selection ─────────────────────────────────────────

    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        hit::hit_test(&self.scene, p, &HitTolerance::from_config(&self.config))
    }

    /// The module instance a hit belongs to, if it should be treated as a
    /// unit: locked nodes and module-tagged images, except for the instance
    /// being edited.
    fn unit_instance(&self, hit: Hit) -> Option<InstanceId> {
        let instance = match hit {
            Hit::Node(id) => self.scene.node(id).filter(|n| n.locked)?.module_id,
            Hit::Image(id) => self.scene.image(id)?.module_instance_id,
            _ => None,
        }?;
        (self.edit.editing_instance() != Some(instance)).then_some(instance)
    }

    /// Replace the selection with the hit entity, or its whole instance.
    pub fn select(&mut self, hit: Hit) {
        self.selection.clear();
        match self.unit_instance(hit) {
            Some(instance) => self.select_instance(instance),
            None => self.selection.add(hit),
        }
    }

    /// Ctrl-click: toggle the hit entity, or its whole instance.
    pub fn toggle(&mut self, hit: Hit) {
        match self.unit_instance(hit) {
            Some(instance) => {
                let members = self.scene.instance_members(instance);
                if self.selection.contains(hit) {
                    self.selection.remove_members(&members);
                } else {
                    self.selection.add_members(&members);
                }
            }
            None => self.selection.toggle(hit),
        }
    }

    pub fn select_instance(&mut self, instance: InstanceId) {
        let members = self.scene.instance_members(instance);
        self.selection.add_members(&members);
    }

    pub fn select_all(&mut self) {
        self.selection.clear();
        self.selection.nodes = self.scene.node_ids();
        self.selection.connections = self.scene.connections().map(|c| c.id).collect();
        self.selection.images = self.scene.images.iter().map(|i| i.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    /// Feed one input event, in screen coordinates.
    pub fn handle(&mut self, event: &InputEvent) -> Result<(), EditError> {
        match *event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(x, y), button, modifiers),
            InputEvent::PointerMove { x, y } => {
                self.pointer_move(Point::new(x, y));
                Ok(())
            }
            InputEvent::PointerUp { x, y } => {
                self.pointer_up(Point::new(x, y));
                Ok(())
            }
            InputEvent::Scroll { zoom } => {
                self.viewport.set_zoom(self.viewport.zoom * zoom);
                Ok(())
            }
        }
    }

    pub fn pointer_down(
        &mut self,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Result<(), EditError> {
        if button == PointerButton::Middle {
            self.gesture = Gesture::Pan { last: screen };
            return Ok(());
        }
        if button == PointerButton::Secondary {
            return Ok(());
        }
        let p = self.viewport.screen_to_canvas(screen);
        match self.mode {
            Mode::Select => {
                self.press_select(p, modifiers);
                Ok(())
            }
            Mode::Connect => self.press_connect(p),
            Mode::AddNode => {
                if self.hit_test(p).is_none() {
                    let pos = self.snap(p);
                    self.add_node(pos);
                }
                Ok(())
            }
        }
    }

    fn press_select(&mut self, p: Point, modifiers: Modifiers) {
        let Some(hit) = self.hit_test(p) else {
            if !modifiers.ctrl {
                self.selection.clear();
            }
            self.gesture = Gesture::Marquee { start: p, current: p };
            return;
        };

        if modifiers.ctrl {
            self.toggle(hit);
        } else if !self.selection.contains(hit) {
            self.select(hit);
        }

        self.gesture = match hit {
            Hit::Waypoint { connection, index } => Gesture::DragWaypoint {
                connection,
                index,
                start: self
                    .scene
                    .connection(connection)
                    .and_then(|c| c.waypoints.get(index).copied())
                    .unwrap_or(p),
            },
            Hit::Node(id) => match self.unit_instance(hit) {
                Some(instance) => self.module_drag(instance, p),
                None => match self.scene.node(id) {
                    Some(node) => Gesture::DragNode {
                        id,
                        start: node.pos,
                        grab: p - node.pos,
                    },
                    None => Gesture::Idle,
                },
            },
            Hit::Image(id) => match self.unit_instance(hit) {
                Some(instance) => self.module_drag(instance, p),
                None => match self.scene.image(id) {
                    Some(image) => match image.resize_handle_at(p, RESIZE_HANDLE_SIZE) {
                        Some(handle) => Gesture::ResizeImage {
                            id,
                            handle,
                            start: ImageBox::of(image),
                        },
                        None => Gesture::DragImage {
                            id,
                            start: image.pos,
                            grab: p - image.pos,
                        },
                    },
                    None => Gesture::Idle,
                },
            },
            Hit::Connection(_) => Gesture::Idle,
        };
    }

    fn module_drag(&self, instance: InstanceId, anchor: Point) -> Gesture {
        Gesture::DragModule {
            instance,
            anchor,
            base: ModuleMove::capture(&self.scene, instance, 0.0, 0.0),
            current: None,
        }
    }

    fn press_connect(&mut self, p: Point) -> Result<(), EditError> {
        let Some(target) = hit::node_at(&self.scene, p, self.config.node.size) else {
            return Ok(());
        };
        match self.pending_source {
            None => {
                self.pending_source = Some(target);
                Ok(())
            }
            Some(source) if source == target => Ok(()),
            Some(source) => {
                self.pending_source = None;
                self.add_connection(source, target).map(|_| ())
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let p = self.viewport.screen_to_canvas(screen);
        let snap_on = self.snap_to_grid;
        let grid = self.grid_size;
        let snap = |q: Point| if snap_on { geometry::snap_point(q, grid) } else { q };

        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Pan { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                self.viewport.pan_by(dx, dy);
            }
            Gesture::DragNode { id, grab, .. } => {
                let pos = snap(p - *grab);
                if let Some(node) = self.scene.node_mut(*id) {
                    node.pos = pos;
                }
            }
            Gesture::DragImage { id, grab, .. } => {
                let pos = p - *grab;
                if let Some(image) = self.scene.image_mut(*id) {
                    image.pos = pos;
                }
            }
            Gesture::ResizeImage { id, handle, start } => {
                let b = tools::resized_box(*start, *handle, p);
                if let Some(image) = self.scene.image_mut(*id) {
                    image.pos = b.pos;
                    image.width = b.width;
                    image.height = b.height;
                }
            }
            Gesture::DragModule {
                instance,
                anchor,
                base,
                current,
            } => {
                let delta = p - *anchor;
                let (dx, dy) = if snap_on {
                    (
                        geometry::snap_value(delta.x, grid),
                        geometry::snap_value(delta.y, grid),
                    )
                } else {
                    (delta.x, delta.y)
                };
                base.apply(&mut self.scene, false);
                let mv = ModuleMove::capture(&self.scene, *instance, dx, dy);
                mv.apply(&mut self.scene, true);
                *current = Some(mv);
            }
            Gesture::DragWaypoint {
                connection, index, ..
            } => {
                let pos = snap(p);
                if let Some(w) = self
                    .scene
                    .connection_mut(*connection)
                    .and_then(|c| c.waypoints.get_mut(*index))
                {
                    *w = pos;
                }
            }
            Gesture::Marquee { current, .. } => *current = p,
        }
    }

    /// Finish the gesture, committing at most one command.
    pub fn pointer_up(&mut self, screen: Point) {
        self.pointer_move(screen);
        match std::mem::take(&mut self.gesture) {
            Gesture::DragNode { id, start, .. } => {
                if let Some(to) = self.scene.node(id).map(|n| n.pos)
                    && to != start
                {
                    self.run_command(Command::MoveNode { id, from: start, to });
                }
            }
            Gesture::DragImage { id, start, .. } => {
                if let Some(to) = self.scene.image(id).map(|i| i.pos)
                    && to != start
                {
                    self.run_command(Command::MoveImage { id, from: start, to });
                }
            }
            Gesture::ResizeImage { id, start, .. } => {
                if let Some(to) = self.scene.image(id).map(ImageBox::of)
                    && to != start
                {
                    self.run_command(Command::ResizeImage { id, from: start, to });
                }
            }
            Gesture::DragModule { current, .. } => {
                if let Some(mv) = current
                    && !mv.is_noop()
                {
                    self.run_command(Command::MoveModule(mv));
                }
            }
            Gesture::DragWaypoint {
                connection,
                index,
                start,
            } => {
                if let Some(to) = self
                    .scene
                    .connection(connection)
                    .and_then(|c| c.waypoints.get(index).copied())
                    && to != start
                {
                    self.run_command(Command::MoveWaypoint {
                        connection,
                        index,
                        from: start,
                        to,
                    });
                }
            }
            Gesture::Marquee { start, current } => {
                let rect = geometry::Rect::from_corners(start, current);
                if rect.width > 1.0 || rect.height > 1.0 {
                    for hit in hit::hit_test_rect(&self.scene, rect, self.config.node.size) {
                        match self.unit_instance(hit) {
                            Some(instance) => self.select_instance(instance),
                            None => self.selection.add(hit),
                        }
                    }
                }
            }
            Gesture::Pan { .. } | Gesture::Idle => {}
        }
    }

    // ─── Nodes & connections ─────────────────────────────────────────────

    /// Create `Node<n>` with the active class and color.
    pub fn add_node(&mut self, pos: Point) -> NodeId {
        self.node_counter += 1;
        let node = Node::new(
            format!("Node{}", self.node_counter),
            pos,
            self.active_class.clone(),
            self.active_color,
        );
        let id = node.id;
        self.run_command(Command::AddNode { node });
        id
    }

    /// Connect two nodes of the same class. An existing connection between
    /// them (either direction) yields `Ok(None)` without change.
    pub fn add_connection(
        &mut self,
        n1: NodeId,
        n2: NodeId,
    ) -> Result<Option<ConnectionId>, EditError> {
        let from = self.scene.node(n1).ok_or(EditError::UnknownNode(n1))?;
        let to = self.scene.node(n2).ok_or(EditError::UnknownNode(n2))?;
        if n1 == n2 {
            return Err(EditError::SelfConnection);
        }
        if from.class != to.class {
            return Err(EditError::IncompatibleClasses {
                from: from.class.clone(),
                to: to.class.clone(),
            });
        }
        if self.scene.connection_between(n1, n2).is_some() {
            return Ok(None);
        }
        let connection = Connection::new(from, to, self.routing);
        let id = connection.id;
        self.run_command(Command::AddConnection { connection });
        Ok(Some(id))
    }

    /// Move a node through the command log.
    pub fn move_node(&mut self, id: NodeId, to: Point) -> Result<(), EditError> {
        let node = self.scene.node(id).ok_or(EditError::UnknownNode(id))?;
        if node.pos != to {
            let from = node.pos;
            self.run_command(Command::MoveNode { id, from, to });
        }
        Ok(())
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<(), EditError> {
        if !self.scene.contains_node(id) {
            return Err(EditError::UnknownNode(id));
        }
        self.run_command(Command::delete_node(id));
        Ok(())
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> Result<(), EditError> {
        if !self.scene.contains_connection(id) {
            return Err(EditError::UnknownConnection(id));
        }
        self.run_command(Command::delete_connection(id));
        Ok(())
    }

    /// Delete the selection. Module-tagged members take their whole
    /// instance with them through the direct channel; everything else is
    /// deleted with one command per entity, connections first.
    pub fn delete_selected(&mut self) {
        let editing = self.edit.editing_instance();
        let mut instances = BTreeSet::new();
        let mut free_nodes = Vec::new();
        let mut free_images = Vec::new();
        for id in &self.selection.nodes {
            match self.scene.node(*id).and_then(|n| n.module_id) {
                Some(instance) if Some(instance) != editing => {
                    instances.insert(instance);
                }
                _ => free_nodes.push(*id),
            }
        }
        for id in &self.selection.images {
            match self.scene.image(*id).and_then(|i| i.module_instance_id) {
                Some(instance) if Some(instance) != editing => {
                    instances.insert(instance);
                }
                _ => free_images.push(*id),
            }
        }
        let connections = self.selection.connections.clone();
        self.selection.clear();

        for instance in instances {
            if let Err(e) = self.apply_direct(DirectEdit::DeleteInstance(instance)) {
                log::warn!("delete selection: {e}");
            }
        }
        for id in connections {
            if self.scene.contains_connection(id) {
                self.run_command(Command::delete_connection(id));
            }
        }
        for id in free_nodes {
            if self.scene.contains_node(id) {
                self.run_command(Command::delete_node(id));
            }
        }
        for id in free_images {
            if self.scene.contains_image(id) {
                self.run_command(Command::delete_image(id));
            }
        }
    }

    // ─── Properties ──────────────────────────────────────────────────────

    /// Recolor selected nodes. Returns how many changed.
    pub fn set_selected_nodes_color(&mut self, color: Color) -> usize {
        let changes: Vec<_> = self
            .selection
            .nodes
            .iter()
            .filter_map(|id| self.scene.node(*id))
            .filter(|n| n.color != color)
            .map(|n| Command::ChangeNodeColor {
                id: n.id,
                from: n.color,
                to: color,
            })
            .collect();
        self.run_all(changes)
    }

    /// Change the class of selected nodes; their color follows the class.
    pub fn set_selected_nodes_class(&mut self, class: &str) -> usize {
        let color = self.config.class_color(class);
        let changes: Vec<_> = self
            .selection
            .nodes
            .iter()
            .filter_map(|id| self.scene.node(*id))
            .filter(|n| n.class != class || n.color != color)
            .map(|n| Command::ChangeNodeClass {
                id: n.id,
                from: (n.class.clone(), n.color),
                to: (class.to_string(), color),
            })
            .collect();
        self.run_all(changes)
    }

    pub fn set_selected_connections_color(&mut self, color: Color) -> usize {
        let changes: Vec<_> = self
            .selection
            .connections
            .iter()
            .filter_map(|id| self.scene.connection(*id))
            .filter(|c| c.color != color)
            .map(|c| Command::ChangeConnectionColor {
                id: c.id,
                from: c.color,
                to: color,
            })
            .collect();
        self.run_all(changes)
    }

    fn run_all(&mut self, commands: Vec<Command>) -> usize {
        let n = commands.len();
        for cmd in commands {
            self.run_command(cmd);
        }
        n
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<(), EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyNodeName);
        }
        let node = self.scene.node(id).ok_or(EditError::UnknownNode(id))?;
        if node.name != name {
            let from = node.name.clone();
            self.run_command(Command::RenameNode {
                id,
                from,
                to: name.to_string(),
            });
        }
        Ok(())
    }

    /// Switch a connection between direct and orthogonal routing. Becoming
    /// orthogonal regenerates the L-bend; becoming direct drops waypoints.
    pub fn set_connection_routing(
        &mut self,
        id: ConnectionId,
        routing: Routing,
    ) -> Result<(), EditError> {
        let conn = self
            .scene
            .connection(id)
            .ok_or(EditError::UnknownConnection(id))?;
        if conn.routing == routing {
            return Ok(());
        }
        let waypoints = match routing {
            Routing::Direct => Waypoints::new(),
            Routing::Orthogonal => {
                let (p1, p2) = self
                    .scene
                    .endpoints(conn)
                    .ok_or(EditError::UnknownConnection(id))?;
                Waypoints::from_slice(&geometry::l_bend(p1, p2))
            }
        };
        let from = (conn.routing, conn.waypoints.clone());
        self.run_command(Command::SetConnectionRouting {
            connection: id,
            from,
            to: (routing, waypoints),
        });
        Ok(())
    }

    fn orthogonal(&self, id: ConnectionId) -> Result<&Connection, EditError> {
        let conn = self
            .scene
            .connection(id)
            .ok_or(EditError::UnknownConnection(id))?;
        if !conn.is_orthogonal() {
            return Err(EditError::NotOrthogonal(id));
        }
        Ok(conn)
    }

    pub fn add_waypoint(
        &mut self,
        connection: ConnectionId,
        index: usize,
        point: Point,
    ) -> Result<(), EditError> {
        if index > self.orthogonal(connection)?.waypoints.len() {
            return Err(EditError::WaypointOutOfRange { index });
        }
        let point = self.snap(point);
        self.run_command(Command::AddWaypoint {
            connection,
            index,
            point,
        });
        Ok(())
    }

    pub fn remove_waypoint(&mut self, connection: ConnectionId, index: usize) -> Result<(), EditError> {
        if index >= self.orthogonal(connection)?.waypoints.len() {
            return Err(EditError::WaypointOutOfRange { index });
        }
        self.run_command(Command::remove_waypoint(connection, index));
        Ok(())
    }

    // ─── Images ──────────────────────────────────────────────────────────

    /// Place an image through the direct channel.
    pub fn place_image(&mut self, path: &str, pos: Point, width: f32, height: f32) -> ImageId {
        let image = Image::new(path, pos, width, height);
        let id = image.id;
        self.insert_image(image);
        id
    }

    /// Add an image as an undoable command.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        let id = image.id;
        self.run_command(Command::AddImage { image });
        id
    }

    pub fn resize_image(&mut self, id: ImageId, width: f32, height: f32) -> Result<(), EditError> {
        let image = self.scene.image(id).ok_or(EditError::UnknownImage(id))?;
        let from = ImageBox::of(image);
        let to = ImageBox {
            width: width.max(tools::MIN_IMAGE_SIZE),
            height: height.max(tools::MIN_IMAGE_SIZE),
            ..from
        };
        if from != to {
            self.run_command(Command::ResizeImage { id, from, to });
        }
        Ok(())
    }

    // ─── Modules ─────────────────────────────────────────────────────────

    /// Build a template from the selected nodes and images, save it, and
    /// tag the originals with its id.
    pub fn create_module(
        &mut self,
        name: &str,
        store: &mut dyn ModuleStore,
    ) -> Result<Module, EditError> {
        let nodes: Vec<&Node> = self
            .selection
            .nodes
            .iter()
            .filter_map(|id| self.scene.node(*id))
            .collect();
        let images: Vec<&Image> = self
            .selection
            .images
            .iter()
            .filter_map(|id| self.scene.image(*id))
            .collect();
        let module = Module::from_selection(
            store.generate_id(),
            name,
            nodes.iter().copied(),
            images.iter().copied(),
        )?;
        store.save(&module)?;

        let node_ids = nodes.iter().map(|n| n.id).collect();
        let image_ids = images.iter().map(|i| i.id).collect();
        self.run_command(Command::create_module(
            InstanceId::intern(&module.id),
            module.name.clone(),
            node_ids,
            image_ids,
        ));
        log::info!("created module '{}' ({})", module.name, module.id);
        Ok(module)
    }

    /// Place a new instance of a template.
    pub fn place_module(&mut self, module: &Module) -> InstanceId {
        let placement = template::place(&self.scene, module);
        let instance = placement.instance;
        self.run_command(Command::PlaceModule(placement));
        instance
    }

    pub fn load_module(
        &mut self,
        id: &str,
        store: &dyn ModuleStore,
    ) -> Result<InstanceId, EditError> {
        let module = store.load(id)?;
        Ok(self.place_module(&module))
    }

    pub fn duplicate_instance(&mut self, instance: InstanceId) -> Result<InstanceId, EditError> {
        let placement = template::duplicate_instance(&self.scene, instance)
            .ok_or(EditError::UnknownInstance(instance))?;
        let copy = placement.instance;
        self.run_command(Command::DuplicateModule(placement));
        Ok(copy)
    }

    /// Move every member of an instance by `(dx, dy)` as one command.
    pub fn move_instance(&mut self, instance: InstanceId, dx: f32, dy: f32) -> Result<(), EditError> {
        if self.scene.instance_members(instance).is_empty() {
            return Err(EditError::UnknownInstance(instance));
        }
        let mv = ModuleMove::capture(&self.scene, instance, dx, dy);
        if !mv.is_noop() {
            self.run_command(Command::MoveModule(mv));
        }
        Ok(())
    }

    pub fn rotate_instance(&mut self, instance: InstanceId, turn: QuarterTurn) -> Result<(), EditError> {
        self.apply_direct(DirectEdit::RotateInstance { instance, turn })
    }

    pub fn delete_instance(&mut self, instance: InstanceId) -> Result<(), EditError> {
        self.apply_direct(DirectEdit::DeleteInstance(instance))
    }

    pub fn edit_instance(&mut self, instance: InstanceId) -> Result<(), EditError> {
        self.edit.enter(&mut self.scene, instance)
    }

    pub fn save_module_edits(&mut self, store: &mut dyn ModuleStore) -> Result<Module, EditError> {
        self.edit.save(&mut self.scene, store)
    }

    pub fn cancel_module_edits(&mut self) -> Result<(), EditError> {
        self.edit.cancel(&mut self.scene)
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn metadata(&self) -> SceneMetadata {
        SceneMetadata {
            grid_enabled: self.grid_visible,
            grid_size: self.grid_size,
            snap_to_grid: self.snap_to_grid,
            zoom_level: self.viewport.zoom,
            pan_offset: self.viewport.pan,
        }
    }

    pub fn to_document(&self) -> Result<String, EditError> {
        Ok(codec::encode_scene(&self.scene, &self.metadata())?)
    }

    /// Replace the scene with a decoded document. The current scene is
    /// only swapped out after the whole document decoded.
    pub fn load_document(&mut self, text: &str) -> Result<(), EditError> {
        let (scene, meta) = codec::decode_scene(text, &self.config)?;
        self.clear();
        self.node_counter = scene
            .nodes()
            .filter_map(|n| n.name.strip_prefix("Node")?.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        self.scene = scene;
        self.grid_visible = meta.grid_enabled;
        self.set_grid_size(meta.grid_size);
        self.snap_to_grid = meta.snap_to_grid;
        self.viewport.set_zoom(meta.zoom_level);
        self.viewport.pan = meta.pan_offset;
        Ok(())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<PathBuf, EditError> {
        Ok(files::save_diagram(path, &self.to_document()?)?)
    }

    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<(), EditError> {
        let text = files::load_diagram(path)?;
        self.load_document(&text)
    }
}
