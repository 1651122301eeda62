pub mod canvas;
pub mod commands;
pub mod hit;
pub mod input;
pub mod modules;
pub mod selection;
pub mod tools;
pub mod viewport;

pub use canvas::{Canvas, DirectEdit};
pub use commands::{Command, CommandStack};
pub use hit::Hit;
pub use input::{InputEvent, Modifiers, PointerButton};
pub use modules::ModuleEditState;
pub use selection::Selection;
pub use tools::Mode;

use thiserror::Error;
use wd_core::error::{CodecError, ModuleError, StoreError};
use wd_core::id::{ConnectionId, ImageId, InstanceId, NodeId};

/// A rejected edit. Nothing in the scene changed.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Cannot connect a {from} node to a {to} node")]
    IncompatibleClasses { from: String, to: String },

    #[error("Cannot connect a node to itself")]
    SelfConnection,

    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    #[error("Connection not found: {0}")]
    UnknownConnection(ConnectionId),

    #[error("Image not found: {0}")]
    UnknownImage(ImageId),

    #[error("Module instance not found: {0}")]
    UnknownInstance(InstanceId),

    #[error("Connection {0} is not orthogonal")]
    NotOrthogonal(ConnectionId),

    #[error("Waypoint index {index} out of range")]
    WaypointOutOfRange { index: usize },

    #[error("Node name cannot be empty")]
    EmptyNodeName,

    #[error("Already editing module instance {0}")]
    AlreadyEditing(InstanceId),

    #[error("No module is being edited")]
    NotEditing,

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
