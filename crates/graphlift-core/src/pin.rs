//! Virtual pin data types.
//!
//! A virtual pin is an input or output a composite exposes to its callers.
//! Pins are declared by method annotations and later bound to concrete
//! interior `(node, port)` locations. Binding only appends [`MappedPort`]
//! records; it never touches graph topology.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    Input,
    Output,
}

/// A declared pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSpec {
    /// 1-based position across the whole composite.
    pub index: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub direction: PinDirection,
    pub is_flow: bool,
    /// Method that declared the pin.
    pub method: String,
}

/// One interior location a pin is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappedPort {
    pub node: NodeId,
    pub port: String,
}

/// A pin together with its bindings.
///
/// Every resolved pin is either mapped to at least one port or explicitly
/// marked `allow_unmapped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPin {
    pub pin: PinSpec,
    pub mapped_ports: Vec<MappedPort>,
    pub allow_unmapped: bool,
}

impl ResolvedPin {
    pub fn new(pin: PinSpec) -> Self {
        ResolvedPin {
            pin,
            mapped_ports: Vec::new(),
            allow_unmapped: false,
        }
    }

    /// Appends a binding unless it is already present.
    pub fn map(&mut self, node: NodeId, port: impl Into<String>) -> bool {
        let mapped = MappedPort {
            node,
            port: port.into(),
        };
        if self.mapped_ports.contains(&mapped) {
            return false;
        }
        self.mapped_ports.push(mapped);
        true
    }

    pub fn is_mapped(&self) -> bool {
        !self.mapped_ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin() -> PinSpec {
        PinSpec {
            index: 1,
            name: "amount".into(),
            type_name: "int".into(),
            direction: PinDirection::Input,
            is_flow: false,
            method: "apply".into(),
        }
    }

    #[test]
    fn map_skips_duplicates() {
        let mut resolved = ResolvedPin::new(pin());
        assert!(!resolved.is_mapped());
        assert!(resolved.map(NodeId(2), "a"));
        assert!(!resolved.map(NodeId(2), "a"));
        assert!(resolved.map(NodeId(3), "a"));
        assert_eq!(resolved.mapped_ports.len(), 2);
    }

    #[test]
    fn pin_serializes_type_field() {
        let json = serde_json::to_value(pin()).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["direction"], "input");
    }
}
