//! Node registry: what the factory knows about callable node kinds.
//!
//! The lifter never owns node definitions. It resolves a callee name through
//! the narrow [`NodeRegistry`] trait and reads declared ports, variadic
//! ranges and types off the returned [`NodeSpec`]. [`StaticRegistry`] is the
//! in-memory implementation, loadable from a JSON document.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builtin;
use crate::error::CoreError;
use crate::node::{Node, NodeCategory, Port};

/// Registry port declarations share the node port shape. An input whose
/// name contains `~` declares a variadic range instead of a single port.
pub type PortSpec = Port;

/// Declared shape of a callable node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: NodeCategory,
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Keyword arguments naming undeclared ports create those ports.
    #[serde(default)]
    pub dynamic_ports: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_id: Option<String>,
}

fn default_category() -> NodeCategory {
    NodeCategory::Execution
}

/// A bounded family of ports `<prefix><start>` ..= `<prefix><end>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariadicRange {
    pub prefix: String,
    pub start: u32,
    pub end: u32,
    pub type_name: String,
}

/// Variadic shape of a node's inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variadic {
    None,
    /// One port per argument.
    Simple(VariadicRange),
    /// Arguments alternate between a key port and a value port.
    Keyed {
        key: VariadicRange,
        value: VariadicRange,
    },
}

impl VariadicRange {
    /// Parses `"<prefix><start>~<prefix><end>"`, e.g. `"0~99"` or
    /// `"key0~key49"`.
    pub fn parse(declaration: &str, type_name: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidVariadicRange {
            declaration: declaration.to_string(),
        };
        let (left, right) = declaration.split_once('~').ok_or_else(invalid)?;
        let (prefix, start) = split_numeric_suffix(left).ok_or_else(invalid)?;
        let (end_prefix, end) = split_numeric_suffix(right).ok_or_else(invalid)?;
        if prefix != end_prefix || start > end {
            return Err(invalid());
        }
        Ok(VariadicRange {
            prefix: prefix.to_string(),
            start,
            end,
            type_name: type_name.to_string(),
        })
    }

    /// Name of the `offset`-th port in the range.
    pub fn port_name(&self, offset: u32) -> String {
        format!("{}{}", self.prefix, self.start + offset)
    }

    /// Number of ports the range admits.
    pub fn capacity(&self) -> u32 {
        self.end - self.start + 1
    }

    /// `true` if `name` is one of this range's ports.
    pub fn contains(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .is_some_and(|n| n >= self.start && n <= self.end)
    }

    pub fn port(&self, offset: u32) -> Port {
        Port::data(self.port_name(offset), self.type_name.clone())
    }
}

fn split_numeric_suffix(text: &str) -> Option<(&str, u32)> {
    let digits_at = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let (prefix, digits) = text.split_at(digits_at);
    digits.parse().ok().map(|n| (prefix, n))
}

impl NodeSpec {
    /// Creates a spec with no ports.
    pub fn new(name: impl Into<String>, category: NodeCategory) -> Self {
        NodeSpec {
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            aliases: Vec::new(),
            dynamic_ports: false,
            composite_id: None,
        }
    }

    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    /// Parses the variadic range declarations among the inputs.
    pub fn variadic(&self) -> Result<Variadic, CoreError> {
        let mut ranges = self
            .inputs
            .iter()
            .filter(|p| p.name.contains('~'))
            .map(|p| VariadicRange::parse(&p.name, &p.type_name))
            .collect::<Result<Vec<_>, _>>()?;
        match ranges.len() {
            0 => Ok(Variadic::None),
            1 => Ok(Variadic::Simple(ranges.remove(0))),
            2 => {
                let value = ranges.remove(1);
                let key = ranges.remove(0);
                Ok(Variadic::Keyed { key, value })
            }
            _ => Err(CoreError::InvalidVariadicRange {
                declaration: self
                    .inputs
                    .iter()
                    .filter(|p| p.name.contains('~'))
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Declared single inputs, in order (range declarations excluded).
    pub fn fixed_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| !p.name.contains('~'))
    }

    /// Declared single data inputs, in order.
    pub fn fixed_data_inputs(&self) -> impl Iterator<Item = &Port> {
        self.fixed_inputs().filter(|p| !p.is_flow())
    }

    /// `true` if the kind carries no flow ports.
    pub fn is_pure(&self) -> bool {
        !self.inputs.iter().chain(self.outputs.iter()).any(Port::is_flow)
    }

    /// Instantiates a node with the fixed inputs and all outputs.
    pub fn instantiate(&self) -> Node {
        let mut node = Node::new(self.name.clone(), self.category);
        node.inputs.extend(self.fixed_inputs().cloned());
        node.outputs.extend(self.outputs.iter().cloned());
        node
    }
}

/// Lookup seam between the lifter and whoever owns node definitions.
pub trait NodeRegistry {
    fn resolve(&self, name: &str) -> Option<&NodeSpec>;
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    nodes: Vec<NodeSpec>,
}

/// In-memory registry keyed by name, with an alias index.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    specs: IndexMap<String, NodeSpec>,
    /// Alias or normalized name -> canonical name.
    index: HashMap<String, String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the synthetic branch/loop/local-variable
    /// kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in builtin::specs() {
            registry.insert(spec);
        }
        registry
    }

    /// Loads `{"nodes": [...]}` on top of the builtin kinds.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let document: RegistryDocument = serde_json::from_str(text)?;
        let mut registry = Self::with_builtins();
        for spec in document.nodes {
            spec.variadic()?;
            registry.insert(spec);
        }
        Ok(registry)
    }

    /// Adds or replaces a spec and indexes its aliases.
    pub fn insert(&mut self, spec: NodeSpec) {
        let name = spec.name.clone();
        for alias in spec.aliases.iter() {
            self.index.insert(alias.clone(), name.clone());
        }
        let normalized = normalize(&name);
        if normalized != name {
            self.index.insert(normalized, name.clone());
        }
        self.specs.insert(name, spec);
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.specs.values()
    }
}

/// Registry names may contain `/` (e.g. `"Get/Set Value"`), which cannot
/// appear in an identifier, so lookups also try the name with `/` removed.
fn normalize(name: &str) -> String {
    name.replace('/', "")
}

impl NodeRegistry for StaticRegistry {
    fn resolve(&self, name: &str) -> Option<&NodeSpec> {
        if let Some(spec) = self.specs.get(name) {
            return Some(spec);
        }
        self.index
            .get(name)
            .or_else(|| self.index.get(&normalize(name)))
            .and_then(|canonical| self.specs.get(canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_range() {
        let range = VariadicRange::parse("0~99", "int").unwrap();
        assert_eq!(range.prefix, "");
        assert_eq!((range.start, range.end), (0, 99));
        assert_eq!(range.port_name(3), "3");
        assert_eq!(range.capacity(), 100);
        assert!(range.contains("42"));
        assert!(!range.contains("100"));
        assert!(!range.contains("x1"));
    }

    #[test]
    fn parse_prefixed_range() {
        let range = VariadicRange::parse("key1~key8", "string").unwrap();
        assert_eq!(range.prefix, "key");
        assert_eq!(range.port_name(0), "key1");
        assert!(range.contains("key8"));
        assert!(!range.contains("key"));
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        for bad in ["~", "a~b", "key0~val9", "9~1", "0-9"] {
            assert!(
                matches!(
                    VariadicRange::parse(bad, "int"),
                    Err(CoreError::InvalidVariadicRange { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn keyed_variadic_uses_declaration_order() {
        let spec = NodeSpec::new("Assemble Dict", NodeCategory::Query)
            .with_input(Port::generic("key0~key49"))
            .with_input(Port::generic("value0~value49"))
            .with_output(Port::data("dict", "dict"));
        match spec.variadic().unwrap() {
            Variadic::Keyed { key, value } => {
                assert_eq!(key.prefix, "key");
                assert_eq!(value.prefix, "value");
            }
            other => panic!("expected keyed variadic, got {other:?}"),
        }
        assert!(spec.is_pure());
        assert_eq!(spec.fixed_inputs().count(), 0);
    }

    #[test]
    fn instantiate_skips_range_declarations() {
        let spec = NodeSpec::new("Print", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::generic("0~9"))
            .with_output(Port::flow("flow_out"));
        let node = spec.instantiate();
        assert_eq!(node.inputs.len(), 1);
        assert!(node.is_flow_node());
    }

    #[test]
    fn registry_resolves_aliases_and_slashless_names() {
        let json = r#"{
            "nodes": [
                {
                    "name": "Get/Set Value",
                    "category": "query",
                    "inputs": [{"name": "a"}],
                    "outputs": [{"name": "result", "type": "int"}],
                    "aliases": ["get_value"]
                }
            ]
        }"#;
        let registry = StaticRegistry::from_json(json).unwrap();
        assert!(registry.resolve("Get/Set Value").is_some());
        assert!(registry.resolve("GetSet Value").is_some());
        assert_eq!(
            registry.resolve("get_value").map(|s| s.name.as_str()),
            Some("Get/Set Value")
        );
        assert!(registry.resolve("missing").is_none());
        assert!(registry.resolve(builtin::DOUBLE_BRANCH).is_some());
    }

    #[test]
    fn registry_rejects_bad_range_in_document() {
        let json = r#"{"nodes": [{"name": "Bad", "inputs": [{"name": "a~b"}]}]}"#;
        assert!(matches!(
            StaticRegistry::from_json(json),
            Err(CoreError::InvalidVariadicRange { .. })
        ));
    }

    #[test]
    fn registry_rejects_malformed_json() {
        assert!(matches!(
            StaticRegistry::from_json("{nodes"),
            Err(CoreError::Registry(_))
        ));
    }
}
