//! Common test utilities for scheduler tests.
//!
//! Provides a scriptable node pass that records every visit, plus small graph
//! builders shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use tessera_core::{
    ComputeGraph, GraphBuilder, GraphId, NamesToPass, NodeId, NodePass, PassCtx, PassEffects,
    Result, VisitPhase,
};

/// Initialize a tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_test_writer()
        .try_init();
}

/// One call to `NodePass::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub pass: String,
    pub node: String,
    pub phase: VisitPhase,
}

/// Shared record of visits, in call order, across all passes of a run.
#[derive(Debug, Clone, Default)]
pub struct VisitLog(Rc<RefCell<Vec<Visit>>>);

impl VisitLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, pass: &str, node: &str, phase: VisitPhase) {
        self.0.borrow_mut().push(Visit {
            pass: pass.to_string(),
            node: node.to_string(),
            phase,
        });
    }

    /// Mark a point in the log, e.g. from a lifecycle hook.
    pub fn marker(&self, label: &str) {
        self.record("<marker>", label, VisitPhase::Single);
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.0.borrow().clone()
    }

    /// Node names visited by `pass`, in call order.
    pub fn nodes_for(&self, pass: &str) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|v| v.pass == pass)
            .map(|v| v.node.clone())
            .collect()
    }

    /// Every entry as `pass:node`, in call order.
    pub fn entries(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .map(|v| format!("{}:{}", v.pass, v.node))
            .collect()
    }

    /// Number of times `pass` ran on `node`.
    pub fn count(&self, pass: &str, node: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|v| v.pass == pass && v.node == node)
            .count()
    }

    /// Position of the first matching entry.
    pub fn position(&self, pass: &str, node: &str) -> Option<usize> {
        self.0
            .borrow()
            .iter()
            .position(|v| v.pass == pass && v.node == node)
    }
}

type RunFn = Box<dyn FnMut(&mut PassCtx<'_>) -> Result<()>>;
type LeakFn = Box<dyn FnMut(&ComputeGraph, GraphId, &[NodeId], &mut PassEffects) -> Result<()>>;
type FinishFn = Box<dyn FnMut(&ComputeGraph, GraphId, &mut Vec<NodeId>) -> Result<()>>;

/// Node pass driven by closures that logs each visit before running them.
pub struct ScriptedPass {
    name: String,
    log: VisitLog,
    on_run: RunFn,
    on_leak: Option<LeakFn>,
    on_finish: Option<FinishFn>,
    gate: Option<Box<dyn Fn(&ComputeGraph, NodeId) -> bool>>,
}

impl ScriptedPass {
    /// A pass that only records its visits.
    pub fn new(name: &str, log: &VisitLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            on_run: Box::new(|_| Ok(())),
            on_leak: None,
            on_finish: None,
            gate: None,
        }
    }

    pub fn on_run(mut self, f: impl FnMut(&mut PassCtx<'_>) -> Result<()> + 'static) -> Self {
        self.on_run = Box::new(f);
        self
    }

    pub fn on_leak(
        mut self,
        f: impl FnMut(&ComputeGraph, GraphId, &[NodeId], &mut PassEffects) -> Result<()> + 'static,
    ) -> Self {
        self.on_leak = Some(Box::new(f));
        self
    }

    pub fn on_finish(
        mut self,
        f: impl FnMut(&ComputeGraph, GraphId, &mut Vec<NodeId>) -> Result<()> + 'static,
    ) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn gate(mut self, f: impl Fn(&ComputeGraph, NodeId) -> bool + 'static) -> Self {
        self.gate = Some(Box::new(f));
        self
    }

    /// Wrap into a single-entry pass list entry.
    pub fn entry(self) -> (String, Box<dyn NodePass>) {
        (self.name.clone(), Box::new(self))
    }
}

impl NodePass for ScriptedPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs_processing(&self, graph: &ComputeGraph, node: NodeId) -> bool {
        self.gate.as_ref().is_none_or(|gate| gate(graph, node))
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> Result<()> {
        self.log
            .record(&self.name, ctx.graph.node_name(ctx.node_id), ctx.phase);
        (self.on_run)(ctx)
    }

    fn on_suspend_nodes_leaked(
        &mut self,
        graph: &ComputeGraph,
        graph_id: GraphId,
        suspended: &[NodeId],
        effects: &mut PassEffects,
    ) -> Result<()> {
        match self.on_leak.as_mut() {
            Some(f) => f(graph, graph_id, suspended, effects),
            None => Ok(()),
        }
    }

    fn on_finish_graph(
        &mut self,
        graph: &ComputeGraph,
        graph_id: GraphId,
        repass: &mut Vec<NodeId>,
    ) -> Result<()> {
        match self.on_finish.as_mut() {
            Some(f) => f(graph, graph_id, repass),
            None => Ok(()),
        }
    }
}

/// Build a pass list from scripted passes, keeping their order.
pub fn pass_list(passes: Vec<ScriptedPass>) -> NamesToPass {
    passes.into_iter().map(ScriptedPass::entry).collect()
}

/// Build `names[0] -> names[1] -> ...` as single-input/single-output nodes.
pub fn chain_graph(names: &[&str]) -> (ComputeGraph, Vec<NodeId>) {
    let mut builder = GraphBuilder::new("main");
    let mut ids = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let inputs = if i == 0 { 0 } else { 1 };
        ids.push(builder.node(name, "Relu", inputs, 1).unwrap());
    }
    for pair in names.windows(2) {
        builder.data_edge(pair[0], 0, pair[1], 0).unwrap();
    }
    (builder.build(), ids)
}

/// Root graph `pre -> if -> post`, where `if` owns the subgraphs `then` and
/// `else`, each containing `<branch>_a -> <branch>_b`.
pub fn nested_graph() -> ComputeGraph {
    let mut builder = GraphBuilder::new("main");
    builder.node("pre", "Data", 0, 1).unwrap();
    builder.node("if", "If", 1, 1).unwrap();
    builder.node("post", "NetOutput", 1, 0).unwrap();
    builder
        .data_edge("pre", 0, "if", 0)
        .unwrap()
        .data_edge("if", 0, "post", 0)
        .unwrap();

    for branch in ["then", "else"] {
        let graph = builder.subgraph("if", branch).unwrap();
        let a = format!("{}_a", branch);
        let b = format!("{}_b", branch);
        builder.node_in(graph, &a, "Data", 0, 1).unwrap();
        builder.node_in(graph, &b, "Relu", 1, 1).unwrap();
        builder.data_edge(&a, 0, &b, 0).unwrap();
    }

    builder.build()
}
