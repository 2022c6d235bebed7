//! Usage tracking for virtual-pin resolution.
//!
//! While a composite method is lifted, every place an entry parameter's
//! value is consumed is recorded here: direct argument use, use through a
//! local alias (`y = param`), and use through an instance field that some
//! method initialised from a parameter (`self.speed = speed`).
//!
//! Direct and aliased uses belong to the method they occur in. Uses through
//! a state field are shared by every method of the unit.

use std::collections::HashMap;

use graphlift_core::{MappedPort, NodeId};
use graphlift_syntax::{Expr, ExprKind};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    /// Method being lifted.
    method: String,
    /// Entry parameters of the method being lifted.
    params: IndexSet<String>,
    /// Local name -> parameter it aliases.
    aliases: HashMap<String, String>,
    /// `self.<field>` -> parameter it was initialised from.
    state_fields: HashMap<String, String>,
    /// `(method, param)` -> sites inside that method.
    usages: IndexMap<(String, String), Vec<MappedPort>>,
    /// Sites reached through a state field, from any method.
    field_usages: IndexMap<String, Vec<MappedPort>>,
    control_flow: IndexSet<(String, String)>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_fields(state_fields: HashMap<String, String>) -> Self {
        UsageTracker {
            state_fields,
            ..Self::default()
        }
    }

    /// Starts `method`: its parameters become the tracked names and local
    /// aliases from the previous method are forgotten. Usages recorded from
    /// here on belong to `method`.
    pub fn begin_method<S: AsRef<str>>(&mut self, method: &str, params: &[S]) {
        self.method = method.to_string();
        self.params = params.iter().map(|p| p.as_ref().to_string()).collect();
        self.aliases.clear();
    }

    /// The parameter `expr` refers to, if any.
    pub fn param_of(&self, expr: &Expr) -> Option<&str> {
        match &expr.kind {
            ExprKind::Name(name) => {
                if let Some(param) = self.params.get(name.as_str()) {
                    return Some(param.as_str());
                }
                self.aliases.get(name).map(String::as_str)
            }
            _ => self.field_param(expr),
        }
    }

    fn field_param(&self, expr: &Expr) -> Option<&str> {
        expr.self_attribute()
            .and_then(|field| self.state_fields.get(field))
            .map(String::as_str)
    }

    /// Records that `target` now aliases whatever parameter `source` is.
    pub fn alias(&mut self, target: &str, source: &Expr) {
        match self.param_of(source).map(str::to_string) {
            Some(param) => {
                self.aliases.insert(target.to_string(), param);
            }
            None => {
                self.aliases.remove(target);
            }
        }
    }

    /// Forgets any alias held by `target` after it is rebound.
    pub fn rebind(&mut self, target: &str) {
        self.aliases.remove(target);
    }

    /// Records `expr` consumed at `(node, port)`.
    pub fn record(&mut self, expr: &Expr, node: NodeId, port: &str) {
        let site = MappedPort {
            node,
            port: port.to_string(),
        };
        let sites = if let Some(param) = self.field_param(expr).map(str::to_string) {
            self.field_usages.entry(param).or_default()
        } else if let Some(param) = self.param_of(expr).map(str::to_string) {
            self.usages.entry((self.method.clone(), param)).or_default()
        } else {
            return;
        };
        if !sites.contains(&site) {
            sites.push(site);
        }
    }

    /// Records every parameter read inside a branch condition or subject.
    pub fn record_condition(&mut self, expr: &Expr) {
        let mut found = Vec::new();
        expr.walk(&mut |e| {
            if let Some(param) = self.param_of(e) {
                found.push((self.method.clone(), param.to_string()));
            }
        });
        self.control_flow.extend(found);
    }

    /// Sites where `param` of `method` is consumed: that method's own
    /// direct and aliased uses, then uses through state fields anywhere in
    /// the unit.
    pub fn usages(&self, method: &str, param: &str) -> Vec<MappedPort> {
        let own = self
            .usages
            .get(&(method.to_string(), param.to_string()))
            .into_iter()
            .flatten();
        let shared = self.field_usages.get(param).into_iter().flatten();
        let mut sites: Vec<MappedPort> = Vec::new();
        for site in own.chain(shared) {
            if !sites.contains(site) {
                sites.push(site.clone());
            }
        }
        sites
    }

    pub fn used_in_condition(&self, method: &str, param: &str) -> bool {
        self.control_flow
            .contains(&(method.to_string(), param.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_field(field: &str) -> Expr {
        Expr::attribute(Expr::name("self"), field)
    }

    #[test]
    fn direct_and_aliased_parameter_use() {
        let mut tracker = UsageTracker::new();
        tracker.begin_method("apply", &["speed"]);
        tracker.record(&Expr::name("speed"), NodeId(2), "value");
        tracker.alias("s", &Expr::name("speed"));
        tracker.alias("t", &Expr::name("s"));
        tracker.record(&Expr::name("t"), NodeId(5), "amount");
        tracker.record(&Expr::name("other"), NodeId(6), "x");

        let usages = tracker.usages("apply", "speed");
        let sites: Vec<(NodeId, &str)> = usages.iter().map(|m| (m.node, m.port.as_str())).collect();
        assert_eq!(sites, vec![(NodeId(2), "value"), (NodeId(5), "amount")]);
        assert!(tracker.usages("apply", "other").is_empty());
    }

    #[test]
    fn state_fields_alias_parameters_across_methods() {
        let mut tracker =
            UsageTracker::with_state_fields(HashMap::from([("target".to_string(), "who".to_string())]));
        tracker.begin_method::<&str>("on_tick", &[]);
        tracker.record(&self_field("target"), NodeId(1), "entity");
        tracker.record(&self_field("unrelated"), NodeId(1), "other");
        tracker.begin_method("aim", &["who"]);
        tracker.record(&Expr::name("who"), NodeId(4), "entity");

        assert_eq!(tracker.usages("aim", "who").len(), 2);
        assert_eq!(tracker.usages("on_tick", "who").len(), 1);
    }

    #[test]
    fn aliases_reset_between_methods() {
        let mut tracker = UsageTracker::new();
        tracker.begin_method("first", &["a"]);
        tracker.alias("b", &Expr::name("a"));
        tracker.begin_method("second", &["c"]);
        assert_eq!(tracker.param_of(&Expr::name("b")), None);
        assert_eq!(tracker.param_of(&Expr::name("c")), Some("c"));
    }

    #[test]
    fn same_parameter_name_in_two_methods_is_kept_apart() {
        let mut tracker = UsageTracker::new();
        tracker.begin_method("first", &["amount"]);
        tracker.record(&Expr::name("amount"), NodeId(1), "text");
        tracker.begin_method("second", &["amount"]);
        tracker.record(&Expr::name("amount"), NodeId(2), "text");

        let site = |node| MappedPort {
            node,
            port: "text".to_string(),
        };
        assert_eq!(tracker.usages("first", "amount"), vec![site(NodeId(1))]);
        assert_eq!(tracker.usages("second", "amount"), vec![site(NodeId(2))]);
    }

    #[test]
    fn condition_usage() {
        let mut tracker = UsageTracker::new();
        tracker.begin_method("toggle", &["flag"]);
        tracker.record_condition(&Expr::call(Expr::name("is_set"), vec![Expr::name("flag")], vec![]));
        assert!(tracker.used_in_condition("toggle", "flag"));
        assert!(!tracker.used_in_condition("other", "flag"));
        assert!(tracker.usages("toggle", "flag").is_empty());
    }
}
