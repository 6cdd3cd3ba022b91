//! Project data model: layers, the gate library and the geometry graph.
//!
//! Gate instances reference templates by id; the library owns the
//! templates. Connectivity is explicit: a [`Net`] lists the ports, vias and
//! wires that are electrically joined.

use std::fmt;

mod gate;
mod graph;
mod layer;
mod project;

pub use gate::{GateInstance, GateLibrary, GateTemplate, LogicClass, PortDirection, TemplatePort};
pub use graph::{Annotation, Graph, Net, Via, ViaDirection, Wire};
pub use layer::{Layer, LayerStack, LayerType};
pub use project::Project;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Stable layer identity (independent of the layer's stack position).
    LayerId(u32),
    "L"
);
id_type!(
    /// Gate template identity inside the library.
    TemplateId(u64),
    "T"
);
id_type!(
    /// Identity of a gate instance, via, wire or annotation.
    ObjectId(u64),
    "#"
);
id_type!(
    /// Port identity inside a gate template.
    PortId(u32),
    "P"
);
id_type!(
    /// Net identity.
    NetId(u64),
    "N"
);

/// Reference to anything a net or a rule violation can point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectRef {
    Gate(ObjectId),
    Port { gate: ObjectId, port: PortId },
    Via(ObjectId),
    Wire(ObjectId),
    Annotation(ObjectId),
}

impl ObjectRef {
    /// Graph object that owns this reference (the gate for a port).
    pub fn object_id(&self) -> ObjectId {
        match *self {
            ObjectRef::Gate(id)
            | ObjectRef::Via(id)
            | ObjectRef::Wire(id)
            | ObjectRef::Annotation(id) => id,
            ObjectRef::Port { gate, .. } => gate,
        }
    }

    /// Only ports, vias and wires can join a net.
    pub fn is_connectable(&self) -> bool {
        matches!(
            self,
            ObjectRef::Port { .. } | ObjectRef::Via(_) | ObjectRef::Wire(_)
        )
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Gate(id) => write!(f, "gate {id}"),
            ObjectRef::Port { gate, port } => write!(f, "port {port} of gate {gate}"),
            ObjectRef::Via(id) => write!(f, "via {id}"),
            ObjectRef::Wire(id) => write!(f, "wire {id}"),
            ObjectRef::Annotation(id) => write!(f, "annotation {id}"),
        }
    }
}
