//! Variable names for node outputs in re-lowered source.
//!
//! Event parameters and local variables keep their exact names, since the
//! lifter keys ports and handles on them. Every other output gets the name
//! the author bound it to when that name is still free, otherwise a name
//! suffixed with the node id.

use std::collections::{HashMap, HashSet};

use graphlift_core::NodeId;

const KEYWORDS: &[&str] = &[
    "and", "break", "case", "class", "continue", "def", "elif", "else", "False", "for", "from",
    "if", "import", "in", "is", "match", "None", "not", "or", "pass", "return", "True", "while",
];

#[derive(Debug, Default)]
pub(crate) struct NameTable {
    bound: HashMap<(NodeId, String), String>,
    taken: HashSet<String>,
}

impl NameTable {
    pub(crate) fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameTable {
            bound: HashMap::new(),
            taken: reserved.into_iter().map(Into::into).collect(),
        }
    }

    /// Binds `(node, port)` to `name` as is.
    pub(crate) fn bind_exact(&mut self, node: NodeId, port: &str, name: &str) {
        self.taken.insert(name.to_string());
        self.bound.insert((node, port.to_string()), name.to_string());
    }

    pub(crate) fn get(&self, node: NodeId, port: &str) -> Option<&str> {
        self.bound.get(&(node, port.to_string())).map(String::as_str)
    }

    /// The name of `(node, port)`, claimed from `preferred` on first use.
    pub(crate) fn claim(&mut self, node: NodeId, port: &str, preferred: &str) -> String {
        if let Some(name) = self.get(node, port) {
            return name.to_string();
        }
        let base = identifier(preferred);
        let mut name = base.clone();
        let mut attempt = 0;
        while self.taken.contains(&name) {
            name = if attempt == 0 {
                format!("{base}_{}", node.0)
            } else {
                format!("{base}_{}_{attempt}", node.0)
            };
            attempt += 1;
        }
        self.bind_exact(node, port, &name);
        name
    }
}

/// Turns arbitrary port or title text into an identifier. Non-ASCII
/// letters and digits are kept.
pub(crate) fn identifier(text: &str) -> String {
    let mut name: String = text
        .trim()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|ch: char| ch.is_numeric()) {
        name.insert_str(0, "value_");
    }
    if KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}
