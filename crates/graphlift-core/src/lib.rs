pub mod builtin;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod pin;
pub mod registry;
pub mod value;

// Re-export commonly used types
pub use edge::{Edge, EdgeKind, EdgeView};
pub use error::CoreError;
pub use graph::Graph;
pub use id::{EdgeId, NodeId};
pub use node::{CompositeRef, Node, NodeCategory, Port, SourceSpan};
pub use pin::{MappedPort, PinDirection, PinSpec, ResolvedPin};
pub use registry::{NodeRegistry, NodeSpec, PortSpec, StaticRegistry, Variadic, VariadicRange};
pub use value::Literal;
