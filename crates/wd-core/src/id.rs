use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by every entity identifier.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind `fresh()`. One sequence for all id kinds, so a `node_3`
/// and an `image_3` never coexist.
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique id such as `node_12`.
            pub fn fresh() -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{}_{n}", $prefix))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Stable identity of a node. Survives delete/undo cycles.
    NodeId,
    "node"
);

interned_id!(
    /// Stable identity of a connection.
    ConnectionId,
    "conn"
);

interned_id!(
    /// Stable identity of a placed image.
    ImageId,
    "image"
);

interned_id!(
    /// Identifier shared by every member of a module placement,
    /// normally `<template_id>_inst_<n>`.
    InstanceId,
    "instance"
);

/// Separator between a template id and the instance number.
pub const INSTANCE_MARKER: &str = "_inst_";

impl InstanceId {
    /// Build `<template_id>_inst_<n>`.
    pub fn for_template(template_id: &str, n: u32) -> Self {
        Self::intern(&format!("{template_id}{INSTANCE_MARKER}{n}"))
    }

    /// The template id this instance was placed from. Ids without an
    /// `_inst_<n>` suffix are their own base.
    pub fn base_template_id(&self) -> &str {
        split_instance(self.as_str()).0
    }

    /// The instance number, if the id carries a well-formed suffix.
    pub fn instance_number(&self) -> Option<u32> {
        split_instance(self.as_str()).1
    }
}

fn split_instance(s: &str) -> (&str, Option<u32>) {
    match s.rfind(INSTANCE_MARKER) {
        Some(pos) => match s[pos + INSTANCE_MARKER.len()..].parse::<u32>() {
            Ok(n) => (&s[..pos], Some(n)),
            Err(_) => (s, None),
        },
        None => (s, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("power_rail");
        let b = NodeId::intern("power_rail");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "power_rail");
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("node_"));
    }

    #[test]
    fn instance_suffix_parsing() {
        let inst = InstanceId::for_template("a1b2c3d4", 3);
        assert_eq!(inst.as_str(), "a1b2c3d4_inst_3");
        assert_eq!(inst.base_template_id(), "a1b2c3d4");
        assert_eq!(inst.instance_number(), Some(3));

        let bare = InstanceId::intern("a1b2c3d4");
        assert_eq!(bare.base_template_id(), "a1b2c3d4");
        assert_eq!(bare.instance_number(), None);

        let odd = InstanceId::intern("x_inst_abc");
        assert_eq!(odd.base_template_id(), "x_inst_abc");
    }
}
