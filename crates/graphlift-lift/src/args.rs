//! Call-argument normalisation.
//!
//! Maps the arguments of a call onto the input port names of a node spec.
//! The factory (for top-level binding) and the flattener (for nested calls)
//! both go through [`normalize`], so a nested argument always targets the
//! exact port the enclosing call binds it to.

use graphlift_core::{CoreError, NodeSpec, Port, Variadic};
use graphlift_syntax::{Call, Expr};

use crate::config::LiftConfig;

/// One argument bound to a port.
#[derive(Debug, Clone)]
pub struct BoundArgument<'a> {
    pub port: Port,
    pub expr: &'a Expr,
    /// `true` when the port comes from a variadic range rather than the
    /// spec's fixed inputs.
    pub variadic: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedArguments<'a> {
    pub positional: Vec<BoundArgument<'a>>,
    /// Keyword arguments in source order; ports not yet checked against the
    /// spec.
    pub keywords: Vec<(&'a str, &'a Expr)>,
    /// Positional arguments bound into a variadic range.
    pub variadic_count: u32,
    /// Positional arguments with no port left to bind to.
    pub overflow: usize,
}

impl<'a> NormalizedArguments<'a> {
    /// Every bound argument, positional first.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binds the arguments of `call` to port names of `spec`.
///
/// Reserved context arguments are skipped wherever they appear. Remaining
/// positional arguments fill the fixed data inputs first, then the variadic
/// range: `<prefix><start+i>` for a simple range, alternating `key`/`value`
/// ports for a keyed one.
pub fn normalize<'a>(
    call: &'a Call,
    spec: &NodeSpec,
    config: &LiftConfig,
) -> Result<NormalizedArguments<'a>, CoreError> {
    let variadic = spec.variadic()?;
    let fixed: Vec<&Port> = spec.fixed_data_inputs().collect();

    let mut normalized = NormalizedArguments::default();
    let positional = call
        .args
        .iter()
        .filter(|arg| !config.is_reserved_argument(arg));

    for (index, expr) in positional.enumerate() {
        if let Some(port) = fixed.get(index) {
            normalized.positional.push(BoundArgument {
                port: (*port).clone(),
                expr,
                variadic: false,
            });
            continue;
        }

        let offset = (index - fixed.len()) as u32;
        let port = match &variadic {
            Variadic::None => None,
            Variadic::Simple(range) => (offset < range.capacity()).then(|| range.port(offset)),
            Variadic::Keyed { key, value } => {
                let pair = offset / 2;
                let capacity = key.capacity().min(value.capacity());
                match (pair < capacity, offset % 2 == 0) {
                    (false, _) => None,
                    (true, true) => Some(key.port(pair)),
                    (true, false) => Some(value.port(pair)),
                }
            }
        };

        match port {
            Some(port) => {
                normalized.variadic_count += 1;
                normalized.positional.push(BoundArgument {
                    port,
                    expr,
                    variadic: true,
                });
            }
            None => normalized.overflow += 1,
        }
    }

    normalized.keywords = call
        .keywords
        .iter()
        .map(|kw| (kw.name.as_str(), &kw.value))
        .collect();

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlift_core::NodeCategory;
    use graphlift_syntax::{parse_module, StmtKind};

    fn call(source: &str) -> Call {
        let module = parse_module(&format!("{source}\n")).unwrap();
        match module.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => expr.as_call().cloned().unwrap(),
            other => panic!("expected call, got {other:?}"),
        }
    }

    fn ports(normalized: &NormalizedArguments) -> Vec<String> {
        normalized
            .positional
            .iter()
            .map(|arg| arg.port.name.clone())
            .collect()
    }

    fn assemble_list() -> NodeSpec {
        NodeSpec::new("assemble_list", NodeCategory::Query)
            .with_input(Port::data("0~99", "generic"))
            .with_output(Port::data("list", "list"))
    }

    #[test]
    fn fixed_inputs_skip_reserved_arguments() {
        let spec = NodeSpec::new("damage", NodeCategory::Execution)
            .with_input(Port::flow("flow_in"))
            .with_input(Port::data("target", "entity"))
            .with_input(Port::data("amount", "int"));
        let call = call("damage(self.game, enemy, 5, crit=True)");
        let normalized = normalize(&call, &spec, &LiftConfig::default()).unwrap();
        assert_eq!(ports(&normalized), vec!["target", "amount"]);
        assert_eq!(normalized.keywords.len(), 1);
        assert_eq!(normalized.keywords[0].0, "crit");
        assert_eq!(normalized.overflow, 0);
    }

    #[test]
    fn simple_variadic_numbers_ports() {
        let call = call("assemble_list(self.game, a, b, c)");
        let normalized = normalize(&call, &assemble_list(), &LiftConfig::default()).unwrap();
        assert_eq!(ports(&normalized), vec!["0", "1", "2"]);
        assert_eq!(normalized.variadic_count, 3);
        assert!(normalized.positional.iter().all(|a| a.variadic));
    }

    #[test]
    fn variadic_overflow_is_counted() {
        let spec = NodeSpec::new("pair", NodeCategory::Query)
            .with_input(Port::data("item1~item2", "int"))
            .with_output(Port::data("list", "list"));
        let call = call("pair(game, 1, 2, 3)");
        let normalized = normalize(&call, &spec, &LiftConfig::default()).unwrap();
        assert_eq!(ports(&normalized), vec!["item1", "item2"]);
        assert_eq!(normalized.overflow, 1);
    }

    #[test]
    fn keyed_variadic_alternates() {
        let spec = NodeSpec::new("build_dict", NodeCategory::Query)
            .with_input(Port::data("key0~key49", "string"))
            .with_input(Port::data("value0~value49", "generic"))
            .with_output(Port::data("dict", "dict"));
        let call = call("build_dict(self.game, \"a\", 1, \"b\", 2)");
        let normalized = normalize(&call, &spec, &LiftConfig::default()).unwrap();
        assert_eq!(ports(&normalized), vec!["key0", "value0", "key1", "value1"]);
        assert_eq!(normalized.positional[0].port.type_name, "string");
        assert_eq!(normalized.positional[1].port.type_name, "generic");
    }

    #[test]
    fn fixed_inputs_come_before_the_range() {
        let spec = NodeSpec::new("format", NodeCategory::Query)
            .with_input(Port::data("template", "string"))
            .with_input(Port::data("arg1~arg9", "generic"))
            .with_output(Port::data("text", "string"));
        let call = call("format(\"{} {}\", x, y)");
        let normalized = normalize(&call, &spec, &LiftConfig::default()).unwrap();
        assert_eq!(ports(&normalized), vec!["template", "arg1", "arg2"]);
        assert_eq!(normalized.variadic_count, 2);
    }
}
