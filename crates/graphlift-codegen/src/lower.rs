//! Graph-to-source re-lowering.
//!
//! [`relower`] rebuilds the graph class a graph unit was lifted from. Each
//! event node in `event_order` becomes an `on_<event>` method whose body
//! follows flow order from the event's `flow_out`:
//!
//! - call nodes become call statements, assigned when their outputs are read;
//! - branch nodes become `if`/`match`, loop nodes `for`, and edges into a
//!   loop's `break` input `break`;
//! - a composite instance with several wired flow exits becomes a `match`
//!   over the instance call;
//! - local-variable nodes become plain assignments to one variable name.
//!
//! Pure nodes read exactly once through their first output are inlined as
//! nested calls. Other pure nodes are assigned as soon as everything they
//! read is available, so the assignment dominates every reader.

use std::collections::{BTreeSet, HashSet};

use graphlift_core::node::GENERIC_TYPE;
use graphlift_core::{
    builtin, CoreError, EdgeKind, Graph, Literal, Node, NodeCategory, NodeId, NodeRegistry,
    NodeSpec, SourceSpan, Variadic,
};
use graphlift_syntax::{
    print_module, ClassDef, Expr, ExprKind, FunctionDef, Keyword, MatchCase, Module, Param,
    Pattern, Stmt, StmtKind,
};
use indexmap::IndexMap;

use crate::error::CodegenError;
use crate::names::{identifier, NameTable};
use crate::options::CodegenOptions;
use crate::structure::{follow, is_connected, join_point, Step};

/// Stands in for values the graph leaves unconnected. The lifter leaves an
/// argument naming an unknown variable unbound.
const UNBOUND: &str = "unbound";

/// Rebuilds the graph class of a lifted graph unit.
pub fn relower(
    graph: &Graph,
    registry: &dyn NodeRegistry,
    options: &CodegenOptions,
) -> Result<Module, CodegenError> {
    let mut body = vec![stmt(StmtKind::FunctionDef(init_method(graph, options)))];

    let mut starts = graph.event_order.clone();
    starts.sort();
    for &event in &graph.event_order {
        let end = starts.iter().copied().find(|&other| other > event);
        let members: BTreeSet<NodeId> = graph
            .node_ids()
            .into_iter()
            .filter(|&id| id >= event && end.map_or(true, |end| id < end))
            .collect();
        tracing::debug!(event = %event, nodes = members.len(), "re-lowering event handler");
        let method = MethodLowerer::new(graph, registry, options, members).lower(event)?;
        body.push(stmt(StmtKind::FunctionDef(method)));
    }

    let class = ClassDef {
        name: graph.name.clone(),
        bases: Vec::new(),
        decorators: Vec::new(),
        body,
        span: SourceSpan::default(),
    };
    Ok(Module {
        body: vec![stmt(StmtKind::ClassDef(class))],
    })
}

/// [`relower`] followed by [`render`].
pub fn relower_source(
    graph: &Graph,
    registry: &dyn NodeRegistry,
    options: &CodegenOptions,
) -> Result<String, CodegenError> {
    Ok(render(&relower(graph, registry, options)?, options.indent))
}

/// Prints `module` with `indent` spaces per level.
pub fn render(module: &Module, indent: usize) -> String {
    let text = print_module(module);
    if indent == 4 {
        return text;
    }
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let content = line.trim_start_matches(' ');
        let leading = line.len() - content.len();
        out.push_str(&" ".repeat(leading / 4 * indent + leading % 4));
        out.push_str(content);
        out.push('\n');
    }
    out
}

/// `__init__` storing the context arguments and creating one instance per
/// composite instance the graph calls.
fn init_method(graph: &Graph, options: &CodegenOptions) -> FunctionDef {
    let mut params = vec![param("self", None)];
    let mut body = Vec::new();
    for argument in &options.init_arguments {
        params.push(param(argument, None));
        body.push(assign(self_attr(argument), Expr::name(argument.as_str())));
    }

    let mut instances: IndexMap<&str, &str> = IndexMap::new();
    for (_, node) in graph.nodes() {
        if let Some(composite) = node.composite.as_ref().filter(|c| !c.instance.is_empty()) {
            instances
                .entry(composite.instance.as_str())
                .or_insert(node.title.as_str());
        }
    }
    for (instance, title) in instances {
        let args = options.context_expr().into_iter().collect();
        body.push(assign(
            self_attr(instance),
            Expr::call(Expr::name(title), args, Vec::new()),
        ));
    }

    FunctionDef {
        name: "__init__".to_string(),
        params,
        returns: None,
        decorators: Vec::new(),
        body,
        span: SourceSpan::default(),
    }
}

// ---------------------------------------------------------------------------
// Per-method lowering
// ---------------------------------------------------------------------------

struct MethodLowerer<'a> {
    graph: &'a Graph,
    registry: &'a dyn NodeRegistry,
    options: &'a CodegenOptions,
    /// Nodes lifted from this handler's body.
    members: BTreeSet<NodeId>,
    names: NameTable,
    /// Nodes whose outputs can be referenced by name.
    available: HashSet<NodeId>,
    visited: HashSet<NodeId>,
    loops: Vec<NodeId>,
}

/// Assignment target for a node's outputs.
struct Target {
    expr: Expr,
    annotation: Option<Expr>,
}

impl Target {
    fn assign(self, value: Expr) -> Stmt {
        match self.annotation {
            Some(annotation) => stmt(StmtKind::AnnAssign {
                target: self.expr,
                annotation,
                value: Some(value),
            }),
            None => assign(self.expr, value),
        }
    }
}

impl<'a> MethodLowerer<'a> {
    fn new(
        graph: &'a Graph,
        registry: &'a dyn NodeRegistry,
        options: &'a CodegenOptions,
        members: BTreeSet<NodeId>,
    ) -> Self {
        let reserved = ["self", "range", UNBOUND]
            .into_iter()
            .map(str::to_string)
            .chain(options.init_arguments.iter().cloned());
        MethodLowerer {
            graph,
            registry,
            options,
            members,
            names: NameTable::new(reserved),
            available: HashSet::new(),
            visited: HashSet::new(),
            loops: Vec::new(),
        }
    }

    fn node(&self, id: NodeId) -> Result<&'a Node, CodegenError> {
        let graph = self.graph;
        graph
            .node(id)
            .ok_or(CodegenError::Core(CoreError::NodeNotFound { id }))
    }

    fn lower(mut self, event: NodeId) -> Result<FunctionDef, CodegenError> {
        let node = self.node(event)?;
        let mut params = vec![param("self", None)];
        for port in node.data_outputs() {
            self.names.bind_exact(event, &port.name, &port.name);
            let annotation = (port.type_name != GENERIC_TYPE)
                .then(|| Expr::constant(Literal::Str(port.type_name.clone())));
            params.push(param(&port.name, annotation));
        }
        self.available.insert(event);
        self.visited.insert(event);
        self.bind_locals();

        let mut body = Vec::new();
        self.flush_ready(&mut body)?;
        let start = match node.default_flow_output() {
            Some(port) => follow(self.graph, event, port)?,
            None => Step::End,
        };
        self.lower_chain(start, None, &mut body)?;
        self.report_skipped();

        Ok(FunctionDef {
            name: format!("{}{}", self.options.event_method_prefix, node.title),
            params,
            returns: None,
            decorators: Vec::new(),
            body,
            span: SourceSpan::default(),
        })
    }

    /// Names every local variable up front. A variable without an initial
    /// value is first assigned by a set node, so it is readable from the
    /// start.
    fn bind_locals(&mut self) {
        let graph = self.graph;
        for &id in &self.members {
            let Some(node) = graph.node(id) else {
                continue;
            };
            if node.title != builtin::GET_LOCAL_VARIABLE {
                continue;
            }
            let name = node
                .var_names
                .get(builtin::LOCAL_VALUE)
                .map(|name| identifier(name))
                .unwrap_or_else(|| format!("local_{}", id.0));
            self.names.bind_exact(id, builtin::LOCAL_VALUE, &name);
            if !has_value(graph, node, id, builtin::LOCAL_INITIAL_VALUE) {
                self.available.insert(id);
            }
        }
    }

    fn report_skipped(&self) {
        for &id in &self.members {
            if self.visited.contains(&id) || self.available.contains(&id) || self.inlinable(id) {
                continue;
            }
            if let Some(node) = self.graph.node(id) {
                tracing::debug!(node = %id, title = %node.title, "node not reachable from its event; skipped");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Flow walk
    // -----------------------------------------------------------------------

    /// Emits nodes along `step` until the flow ends, breaks, or reaches
    /// `stop`.
    fn lower_chain(
        &mut self,
        mut step: Step,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<(), CodegenError> {
        loop {
            let id = match step {
                Step::End => return Ok(()),
                Step::Break { loop_node } => {
                    if self.loops.last() != Some(&loop_node) {
                        return Err(CodegenError::UnstructuredFlow {
                            node: loop_node,
                            reason: "break edge from outside the innermost loop body".to_string(),
                        });
                    }
                    out.push(stmt(StmtKind::Break));
                    return Ok(());
                }
                Step::Node(id) => id,
            };
            if Some(id) == stop {
                return Ok(());
            }
            if !self.visited.insert(id) {
                return Err(CodegenError::UnstructuredFlow {
                    node: id,
                    reason: "reached along two flow paths".to_string(),
                });
            }
            step = self.lower_node(id, stop, out)?;
            self.flush_ready(out)?;
        }
    }

    fn lower_arm(
        &mut self,
        branch: NodeId,
        port: &str,
        stop: Option<NodeId>,
    ) -> Result<Vec<Stmt>, CodegenError> {
        let mut block = Vec::new();
        let step = follow(self.graph, branch, port)?;
        self.lower_chain(step, stop, &mut block)?;
        Ok(block)
    }

    fn lower_node(
        &mut self,
        id: NodeId,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        let node = self.node(id)?;
        tracing::trace!(node = %id, title = %node.title, "emit");
        match node.title.as_str() {
            builtin::DOUBLE_BRANCH => self.lower_if(id, stop, out),
            builtin::MULTI_BRANCH => self.lower_match(id, node, stop, out),
            builtin::FINITE_LOOP | builtin::LIST_LOOP => self.lower_loop(id, node, out),
            builtin::SET_LOCAL_VARIABLE => self.lower_set(id, out),
            _ if node.category == NodeCategory::Event => Err(CodegenError::UnstructuredFlow {
                node: id,
                reason: "flow enters an event node".to_string(),
            }),
            _ => self.lower_call(id, node, stop, out),
        }
    }

    fn lower_call(
        &mut self,
        id: NodeId,
        node: &'a Node,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        let default = node.default_flow_output();
        let wired: Vec<&str> = node
            .flow_outputs()
            .map(|port| port.name.as_str())
            .filter(|port| is_connected(self.graph, id, port))
            .collect();
        if wired.len() > 1 || wired.iter().any(|&port| Some(port) != default) {
            return self.lower_dispatch(id, node, stop, out);
        }

        let call = self.call_expr(id, node, out)?;
        let statement = match self.output_target(id, node, false) {
            Some(target) => target.assign(call),
            None => stmt(StmtKind::Expr(call)),
        };
        out.push(statement);
        self.available.insert(id);

        match default {
            Some(port) => follow(self.graph, id, port),
            None => Ok(Step::End),
        }
    }

    /// A composite instance whose flow exits lead to different statements:
    /// `match self.<instance>.<method>(...)` with one case per wired exit.
    /// Exits wired straight to the join point need no case.
    fn lower_dispatch(
        &mut self,
        id: NodeId,
        node: &'a Node,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        if !node.composite.as_ref().is_some_and(|c| !c.instance.is_empty()) {
            return Err(CodegenError::UnstructuredFlow {
                node: id,
                reason: "several flow exits are wired but the node is not a composite instance"
                    .to_string(),
            });
        }
        let subject = self.call_expr(id, node, out)?;
        self.available.insert(id);

        let exits: Vec<String> = node.flow_outputs().map(|port| port.name.clone()).collect();
        let join = join_point(self.graph, id, &exits)?;
        let arm_stop = join.or(stop);

        let mut cases = Vec::new();
        let mut fallback = None;
        for exit in &exits {
            let body = self.lower_arm(id, exit, arm_stop)?;
            if body.is_empty() {
                continue;
            }
            if exit == builtin::BRANCH_DEFAULT {
                fallback = Some(body);
            } else {
                cases.push(match_case(label_pattern(exit), body));
            }
        }
        if let Some(body) = fallback {
            cases.push(match_case(Pattern::Wildcard, body));
        }
        if cases.is_empty() {
            if let Some(first) = exits.first() {
                cases.push(match_case(exit_pattern(first), Vec::new()));
            }
        }

        out.push(stmt(StmtKind::Match { subject, cases }));
        Ok(join.map_or(Step::End, Step::Node))
    }

    fn lower_if(
        &mut self,
        id: NodeId,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        let test = self
            .input_expr(id, builtin::CONDITION, out)?
            .unwrap_or_else(unbound);
        self.available.insert(id);

        let arms = [builtin::BRANCH_TRUE.to_string(), builtin::BRANCH_FALSE.to_string()];
        let join = join_point(self.graph, id, &arms)?;
        let arm_stop = join.or(stop);
        let body = self.lower_arm(id, builtin::BRANCH_TRUE, arm_stop)?;
        let orelse = self.lower_arm(id, builtin::BRANCH_FALSE, arm_stop)?;

        out.push(stmt(StmtKind::If { test, body, orelse }));
        Ok(join.map_or(Step::End, Step::Node))
    }

    fn lower_match(
        &mut self,
        id: NodeId,
        node: &'a Node,
        stop: Option<NodeId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        let subject = self
            .input_expr(id, builtin::SUBJECT, out)?
            .unwrap_or_else(unbound);
        self.available.insert(id);

        let ports: Vec<String> = node.flow_outputs().map(|port| port.name.clone()).collect();
        let join = join_point(self.graph, id, &ports)?;
        let arm_stop = join.or(stop);

        let mut cases = Vec::new();
        for port in ports.iter().filter(|port| *port != builtin::BRANCH_DEFAULT) {
            let body = self.lower_arm(id, port, arm_stop)?;
            cases.push(match_case(label_pattern(port), body));
        }
        // Without a wildcard the lifter merges `default` into what follows,
        // which is exactly what an empty default arm is.
        let fallback = self.lower_arm(id, builtin::BRANCH_DEFAULT, arm_stop)?;
        if !fallback.is_empty() || cases.is_empty() {
            cases.push(match_case(Pattern::Wildcard, fallback));
        }

        out.push(stmt(StmtKind::Match { subject, cases }));
        Ok(join.map_or(Step::End, Step::Node))
    }

    fn lower_loop(
        &mut self,
        id: NodeId,
        node: &'a Node,
        out: &mut Vec<Stmt>,
    ) -> Result<Step, CodegenError> {
        let (iter, item) = if node.title == builtin::FINITE_LOOP {
            let start = self
                .input_expr(id, builtin::LOOP_START, out)?
                .unwrap_or_else(unbound);
            let end = self
                .input_expr(id, builtin::LOOP_END, out)?
                .unwrap_or_else(unbound);
            let range = Expr::call(Expr::name("range"), vec![start, end], Vec::new());
            (range, builtin::LOOP_INDEX)
        } else {
            let list = self
                .input_expr(id, builtin::LOOP_LIST, out)?
                .unwrap_or_else(unbound);
            (list, builtin::LOOP_ITEM)
        };
        let target = Expr::name(self.output_name(id, node, item));
        self.available.insert(id);

        self.loops.push(id);
        let mut body = Vec::new();
        self.flush_ready(&mut body)?;
        let entry = follow(self.graph, id, builtin::LOOP_BODY)?;
        self.lower_chain(entry, None, &mut body)?;
        self.loops.pop();

        out.push(stmt(StmtKind::For { target, iter, body }));
        follow(self.graph, id, builtin::LOOP_DONE)
    }

    fn lower_set(&mut self, id: NodeId, out: &mut Vec<Stmt>) -> Result<Step, CodegenError> {
        let (get, _) = self
            .graph
            .data_source(id, builtin::LOCAL_HANDLE)
            .ok_or_else(|| CodegenError::UnstructuredFlow {
                node: id,
                reason: "local-variable set without a handle".to_string(),
            })?;
        let value = self
            .input_expr(id, builtin::LOCAL_VALUE, out)?
            .unwrap_or_else(unbound);
        out.push(assign(Expr::name(self.local_name(get)), value));
        self.available.insert(id);
        follow(self.graph, id, builtin::FLOW_OUT)
    }

    // -----------------------------------------------------------------------
    // Pure nodes
    // -----------------------------------------------------------------------

    /// A node read exactly once, through its first data output, and never
    /// sequenced: it can be written as a nested call at its reader.
    fn inlinable(&self, id: NodeId) -> bool {
        let Some(node) = self.graph.node(id) else {
            return false;
        };
        if node.category == NodeCategory::Event || node.title == builtin::GET_LOCAL_VARIABLE {
            return false;
        }
        let edges = self.graph.outgoing(id);
        let sequenced = edges.iter().any(|e| e.kind == EdgeKind::Flow)
            || self
                .graph
                .incoming(id)
                .iter()
                .any(|e| e.kind == EdgeKind::Flow);
        if sequenced {
            return false;
        }
        let reads: Vec<&str> = edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Data)
            .map(|e| e.source_port.as_str())
            .collect();
        match (reads.as_slice(), node.data_outputs().next()) {
            ([port], Some(first)) => *port == first.name,
            _ => false,
        }
    }

    /// Pure nodes written as their own assignment rather than inlined.
    fn is_eager(&self, id: NodeId) -> bool {
        let Some(node) = self.graph.node(id) else {
            return false;
        };
        if self.available.contains(&id) || node.is_flow_node() {
            return false;
        }
        node.title == builtin::GET_LOCAL_VARIABLE || !self.inlinable(id)
    }

    fn ready(&self, id: NodeId) -> bool {
        self.graph
            .incoming(id)
            .iter()
            .filter(|e| e.kind == EdgeKind::Data)
            .all(|e| {
                self.available.contains(&e.source) || (self.inlinable(e.source) && self.ready(e.source))
            })
    }

    /// Assigns every pure node whose inputs have all become available.
    fn flush_ready(&mut self, out: &mut Vec<Stmt>) -> Result<(), CodegenError> {
        loop {
            let next = self
                .members
                .iter()
                .copied()
                .find(|&id| self.is_eager(id) && self.ready(id));
            let Some(id) = next else {
                return Ok(());
            };
            self.emit_pure(id, out)?;
        }
    }

    fn emit_pure(&mut self, id: NodeId, out: &mut Vec<Stmt>) -> Result<(), CodegenError> {
        let node = self.node(id)?;
        if node.title == builtin::GET_LOCAL_VARIABLE {
            let value = self
                .input_expr(id, builtin::LOCAL_INITIAL_VALUE, out)?
                .unwrap_or_else(unbound);
            out.push(assign(Expr::name(self.local_name(id)), value));
        } else {
            let call = self.call_expr(id, node, out)?;
            match self.output_target(id, node, true) {
                Some(target) => out.push(target.assign(call)),
                None => tracing::debug!(node = %id, title = %node.title, "pure node without outputs dropped"),
            }
        }
        self.available.insert(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// The expression feeding input `port` of `id`: the producer's variable
    /// or nested call, the inlined constant, or `None` when unconnected.
    fn input_expr(
        &mut self,
        id: NodeId,
        port: &str,
        out: &mut Vec<Stmt>,
    ) -> Result<Option<Expr>, CodegenError> {
        if let Some((source, source_port)) = self.graph.data_source(id, port) {
            return self.source_expr(source, &source_port, out).map(Some);
        }
        let node = self.node(id)?;
        Ok(node
            .constants
            .get(port)
            .map(|literal| self.literal_expr(literal)))
    }

    fn source_expr(
        &mut self,
        source: NodeId,
        port: &str,
        out: &mut Vec<Stmt>,
    ) -> Result<Expr, CodegenError> {
        let node = self.node(source)?;
        if node.category == NodeCategory::Event {
            return Ok(Expr::name(port));
        }
        if node.title == builtin::GET_LOCAL_VARIABLE {
            return Ok(Expr::name(self.local_name(source)));
        }
        if self.available.contains(&source) {
            return Ok(Expr::name(self.output_name(source, node, port)));
        }
        if self.inlinable(source) {
            return self.call_expr(source, node, out);
        }
        if node.is_pure() && self.members.contains(&source) {
            self.emit_pure(source, out)?;
            return Ok(Expr::name(self.output_name(source, node, port)));
        }
        Err(CodegenError::UnstructuredFlow {
            node: source,
            reason: format!("output '{port}' is read before the node runs"),
        })
    }

    /// `callee(context, fixed..., variadic..., keyword=value...)`.
    ///
    /// Positional arguments fill fixed inputs before a variadic range, so
    /// fixed inputs are positional whenever range ports are bound and
    /// keywords otherwise.
    fn call_expr(
        &mut self,
        id: NodeId,
        node: &'a Node,
        out: &mut Vec<Stmt>,
    ) -> Result<Expr, CodegenError> {
        let (func, spec) = match node.composite.as_ref().filter(|c| !c.instance.is_empty()) {
            Some(composite) => (
                Expr::attribute(self_attr(&composite.instance), composite.method.as_str()),
                None,
            ),
            None => {
                let (name, spec) = self.callee(id, node)?;
                (Expr::name(name), spec)
            }
        };

        let variadic = match spec {
            Some(spec) => spec.variadic()?,
            None => Variadic::None,
        };
        let in_range = |name: &str| match &variadic {
            Variadic::None => false,
            Variadic::Simple(range) => range.contains(name),
            Variadic::Keyed { key, value } => key.contains(name) || value.contains(name),
        };
        let fixed: Vec<&str> = spec
            .map(|spec| spec.fixed_data_inputs().map(|p| p.name.as_str()).collect())
            .unwrap_or_default();
        let positional_fixed = node.data_inputs().any(|p| in_range(&p.name));

        let mut args: Vec<Expr> = self.options.context_expr().into_iter().collect();
        let mut keywords = Vec::new();
        if positional_fixed {
            for port in &fixed {
                args.push(self.input_expr(id, port, out)?.unwrap_or_else(unbound));
            }
        }
        for port in node.data_inputs() {
            let name = port.name.as_str();
            let declared = fixed.contains(&name);
            if in_range(name) {
                args.push(self.input_expr(id, name, out)?.unwrap_or_else(unbound));
                continue;
            }
            if positional_fixed && declared {
                continue;
            }
            match self.input_expr(id, name, out)? {
                Some(value) => keywords.push(keyword(name, value)),
                // Undeclared ports only exist because a keyword named them.
                None if spec.is_some() && !declared => keywords.push(keyword(name, unbound())),
                None => {}
            }
        }

        Ok(Expr::call(func, args, keywords))
    }

    fn callee(
        &self,
        id: NodeId,
        node: &'a Node,
    ) -> Result<(String, Option<&'a NodeSpec>), CodegenError> {
        let registry = self.registry;
        let name: String = node.title.chars().filter(|&ch| ch != '/').collect();
        let spec = registry.resolve(&name);
        let known = spec.is_some() || node.composite.is_some();
        if !known || identifier(&name) != name {
            return Err(CodegenError::UnknownNodeTitle {
                node: id,
                title: node.title.clone(),
            });
        }
        Ok((name, spec))
    }

    /// Constants keep their source form; `"self.<attr>"` strings go back to
    /// attribute reads unless `<attr>` is a context argument.
    fn literal_expr(&self, literal: &Literal) -> Expr {
        let attribute = literal
            .as_str()
            .and_then(|text| text.strip_prefix("self."))
            .filter(|attr| {
                !attr.starts_with('_')
                    && identifier(attr) == *attr
                    && !self.options.init_arguments.iter().any(|a| a == attr)
            });
        match attribute {
            Some(attr) => self_attr(attr),
            None => Expr::constant(literal.clone()),
        }
    }

    /// Names for a node's read or author-named outputs. A single name binds
    /// the first data output; later outputs need a tuple target.
    fn output_target(&mut self, id: NodeId, node: &'a Node, force: bool) -> Option<Target> {
        let graph = self.graph;
        let outputs: Vec<&str> = node.data_outputs().map(|p| p.name.as_str()).collect();
        let used = outputs.iter().rposition(|port| {
            !graph.data_targets(id, port).is_empty() || node.var_names.contains_key(*port)
        });
        let last = match used {
            Some(last) => last,
            None if force && !outputs.is_empty() => 0,
            None => return None,
        };

        if last == 0 {
            let port = outputs[0];
            let annotation = graph
                .port_type_override(id, port)
                .map(|type_name| Expr::constant(Literal::Str(type_name.to_string())));
            return Some(Target {
                expr: Expr::name(self.output_name(id, node, port)),
                annotation,
            });
        }
        let items = outputs[..=last]
            .iter()
            .map(|port| Expr::name(self.output_name(id, node, port)))
            .collect();
        Some(Target {
            expr: Expr::new(ExprKind::Tuple(items), SourceSpan::default()),
            annotation: None,
        })
    }

    fn output_name(&mut self, id: NodeId, node: &Node, port: &str) -> String {
        let preferred = node.var_names.get(port).map(String::as_str).unwrap_or(port);
        self.names.claim(id, port, preferred)
    }

    fn local_name(&self, get: NodeId) -> String {
        self.names
            .get(get, builtin::LOCAL_VALUE)
            .unwrap_or(UNBOUND)
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn has_value(graph: &Graph, node: &Node, id: NodeId, port: &str) -> bool {
    graph.data_source(id, port).is_some() || node.constants.contains_key(port)
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, SourceSpan::default())
}

fn assign(target: Expr, value: Expr) -> Stmt {
    stmt(StmtKind::Assign {
        targets: vec![target],
        value,
    })
}

fn param(name: &str, annotation: Option<Expr>) -> Param {
    Param {
        name: name.to_string(),
        annotation,
        default: None,
    }
}

fn keyword(name: &str, value: Expr) -> Keyword {
    Keyword {
        name: name.to_string(),
        value,
    }
}

fn self_attr(attr: &str) -> Expr {
    Expr::attribute(Expr::name("self"), attr)
}

fn unbound() -> Expr {
    Expr::name(UNBOUND)
}

fn match_case(pattern: Pattern, body: Vec<Stmt>) -> MatchCase {
    MatchCase {
        pattern,
        body,
        span: SourceSpan::default(),
    }
}

/// Case pattern whose label is `label`. Labels are rendered literals, so
/// numbers and keywords parse back to the same label.
fn label_pattern(label: &str) -> Pattern {
    let numeric = |text: &str| {
        text.chars()
            .all(|ch| ch.is_ascii_digit() || ch == '.' || ch == '-')
    };
    let literal = match label {
        "True" => Literal::Bool(true),
        "False" => Literal::Bool(false),
        "None" => Literal::None,
        _ => match (label.parse::<i64>(), label.parse::<f64>()) {
            (Ok(value), _) => Literal::Int(value),
            (_, Ok(value)) if numeric(label) => Literal::Float(value),
            _ => Literal::Str(label.to_string()),
        },
    };
    Pattern::Literal(literal)
}

fn exit_pattern(exit: &str) -> Pattern {
    if exit == builtin::BRANCH_DEFAULT {
        Pattern::Wildcard
    } else {
        label_pattern(exit)
    }
}
