pub mod codec;
pub mod color;
pub mod config;
pub mod error;
pub mod files;
pub mod geometry;
pub mod id;
pub mod lint;
pub mod model;
pub mod module;
pub mod store;

pub use codec::{SceneMetadata, decode_module, decode_scene, encode_module, encode_scene};
pub use color::Color;
pub use config::EditorConfig;
pub use error::{CodecError, ConfigError, ModuleError, StoreError};
pub use geometry::{Point, QuarterTurn, Rect};
pub use id::{ConnectionId, ImageId, InstanceId, NodeId};
pub use lint::{LintDiagnostic, LintSeverity, LintTarget, lint_scene};
pub use model::*;
pub use module::{Module, Placement, TemplateImage, TemplateNode};
pub use store::{FsModuleStore, MemoryModuleStore, ModuleStore, ModuleSummary};
