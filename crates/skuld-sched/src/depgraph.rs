//! Commutation-aware dependency graph construction.
//!
//! The graph is built once from a kernel's linear gate list and never
//! mutated afterwards. Nodes are the kernel's gates plus the SOURCE and
//! SINK sentinels; arcs represent ordering constraints, weighted with the
//! source gate's duration in cycles.
//!
//! Every operand use of a gate is classified as an *event*. Qubit operands
//! produce `Default`, `XRotate` or `ZRotate` events; creg and breg
//! operands produce read/write events. Per operand a small state machine
//! tracks the last default/writer and the accumulated rotation/reader
//! lists, and adds arcs from the relevant previous events to the new gate.
//! Two X rotations (or two Z rotations) on the same qubit commute and get
//! no mutual arc, unless commutation is disabled; an X rotation and a Z
//! rotation on the same qubit are always ordered. Reads on the same
//! register commute; writes sequentialize with everything.
//!
//! The accepted event sequence per qubit is
//! `Default { Default | XRotate+ | ZRotate+ }* Default` and per creg/breg
//! `Write { Write | Read+ }* Write`, where the first write/default is
//! SOURCE and the last is SINK. This guarantees a single root and a single
//! terminal, which keeps depth measurement honest.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use std::fmt;

use skuld_ir::{Gate, GateKind, Kernel};

use crate::error::{SchedError, SchedResult};

/// Node index type for the dependency graph.
pub type NodeIndex = PetNodeIndex<u32>;

/// Z-rotation family: Z-axis rotations and Z-axis control endpoints.
const Z_ROTATION_NAMES: &[&str] = &[
    "rz", "z", "pauli_z", "rz180", "z90", "rz90", "zm90", "mrz90", "s", "sdag", "t", "tdag",
];

/// X-rotation family.
const X_ROTATION_NAMES: &[&str] = &[
    "rx", "x", "pauli_x", "rx180", "x90", "rx90", "xm90", "mrx90", "x45",
];

/// A node of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepNode {
    /// Top sentinel; "writes" every operand before the first real gate.
    Source,
    /// Bottom sentinel; "reads" every operand after the last real gate.
    Sink,
    /// A gate, by index into the kernel's arena.
    Gate(usize),
}

/// Operand space an arc's cause lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Qubit operand.
    Qubit,
    /// Classical register operand.
    Creg,
    /// Bit register operand.
    Breg,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Qubit => write!(f, "q"),
            OperandKind::Creg => write!(f, "c"),
            OperandKind::Breg => write!(f, "b"),
        }
    }
}

/// The kind of ordering constraint an arc records.
///
/// Purely informational: the scheduler treats every arc uniformly, but
/// tooling (dot output, future graph transformations) wants to know why an
/// arc exists. The first letter names the new event, the last the previous
/// one, e.g. `Xaz` is an X rotation after a Z rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    /// Read after read (only when sequentialized explicitly).
    Rar,
    /// Read after write.
    Raw,
    /// Write after read.
    War,
    /// Write after write.
    Waw,
    /// Default after default.
    Dad,
    /// Default after X rotation.
    Dax,
    /// Default after Z rotation.
    Daz,
    /// X rotation after default.
    Xad,
    /// X rotation after X rotation (commutation disabled).
    Xax,
    /// X rotation after Z rotation.
    Xaz,
    /// Z rotation after default.
    Zad,
    /// Z rotation after X rotation.
    Zax,
    /// Z rotation after Z rotation (commutation disabled).
    Zaz,
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DepKind::Rar => "RAR",
            DepKind::Raw => "RAW",
            DepKind::War => "WAR",
            DepKind::Waw => "WAW",
            DepKind::Dad => "DAD",
            DepKind::Dax => "DAX",
            DepKind::Daz => "DAZ",
            DepKind::Xad => "XAD",
            DepKind::Xax => "XAX",
            DepKind::Xaz => "XAZ",
            DepKind::Zad => "ZAD",
            DepKind::Zax => "ZAX",
            DepKind::Zaz => "ZAZ",
        };
        f.write_str(s)
    }
}

/// An arc of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepEdge {
    /// Cycles the source gate takes to complete before the target may
    /// start: `ceil(source.duration / cycle_time)`.
    pub weight: u64,
    /// The operand index that induced the dependency.
    pub cause: u32,
    /// The operand space `cause` indexes into.
    pub operand: OperandKind,
    /// Why the arc exists.
    pub dep: DepKind,
}

/// Commutation controls for graph construction. Both default to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommuteOptions {
    /// Allow CZ/CNOT operands to commute with same-axis rotations.
    pub multi_qubit: bool,
    /// Allow single-qubit X/Z rotations to commute among themselves.
    pub single_qubit: bool,
}

/// The dependency graph of one kernel.
#[derive(Debug)]
pub struct DepGraph {
    graph: DiGraph<DepNode, DepEdge, u32>,
    source: NodeIndex,
    sink: NodeIndex,
    /// Arena index -> node, in kernel gate order at build time.
    gate_nodes: Vec<NodeIndex>,
    /// Per-node duration in cycles (sentinels included).
    duration_cycles: Vec<u64>,
}

impl DepGraph {
    /// Build the dependency graph for a kernel.
    ///
    /// Returns a user error when a named gate has the wrong operand shape.
    ///
    /// # Panics
    ///
    /// Panics if the constructed graph contains a cycle; that is a bug in
    /// the classification rules, not a property of any input.
    pub fn build(kernel: &Kernel, commute: CommuteOptions) -> SchedResult<Self> {
        let mut b = Builder::new(kernel);

        for (idx, gate) in kernel.gates.iter().enumerate() {
            let node = b.add_gate_node(idx, gate, kernel.cycle_time);

            // condition operands are read by every conditional gate
            for breg in &gate.condition.operands {
                b.event(node, Event::BRead, breg.0, true);
            }

            let name = gate.base_name();
            if name == "measure" {
                for q in &gate.qubits {
                    b.event(node, Event::Default, q.0, false);
                }
                for c in &gate.cregs {
                    b.event(node, Event::CWrite, c.0, false);
                }
                for breg in &gate.bregs {
                    b.event(node, Event::BWrite, breg.0, false);
                }
            } else if name == "display" {
                // touches the entire operand space
                for q in 0..kernel.qubit_count {
                    b.event(node, Event::Default, q, false);
                }
                for c in 0..kernel.creg_count {
                    b.event(node, Event::CWrite, c, false);
                }
                for breg in 0..kernel.breg_count {
                    b.event(node, Event::BWrite, breg, false);
                }
            } else if gate.kind == GateKind::Classical {
                for c in &gate.cregs {
                    b.event(node, Event::CWrite, c.0, false);
                }
            } else if name == "cnot" {
                expect_operands(gate, 2)?;
                b.event(node, Event::ZRotate, gate.qubits[0].0, commute.multi_qubit);
                b.event(node, Event::XRotate, gate.qubits[1].0, commute.multi_qubit);
            } else if name == "cz" || name == "cphase" {
                expect_operands(gate, 2)?;
                b.event(node, Event::ZRotate, gate.qubits[0].0, commute.multi_qubit);
                b.event(node, Event::ZRotate, gate.qubits[1].0, commute.multi_qubit);
            } else if Z_ROTATION_NAMES.contains(&name) {
                expect_operands(gate, 1)?;
                b.event(node, Event::ZRotate, gate.qubits[0].0, commute.single_qubit);
            } else if X_ROTATION_NAMES.contains(&name) {
                expect_operands(gate, 1)?;
                b.event(node, Event::XRotate, gate.qubits[0].0, commute.single_qubit);
            } else {
                // catch-all: sequentialize on every operand
                for q in &gate.qubits {
                    b.event(node, Event::Default, q.0, false);
                }
                for c in &gate.cregs {
                    b.event(node, Event::CWrite, c.0, false);
                }
                for breg in &gate.bregs {
                    b.event(node, Event::BWrite, breg.0, false);
                }
            }
        }

        b.close(kernel);
        Ok(b.finish())
    }

    /// The SOURCE node.
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// The SINK node.
    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    /// Total node count, sentinels included.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The node for a gate arena index.
    pub fn gate_node(&self, gate_idx: usize) -> NodeIndex {
        self.gate_nodes[gate_idx]
    }

    /// What a node refers to.
    pub fn node(&self, n: NodeIndex) -> DepNode {
        self.graph[n]
    }

    /// The gate arena index behind a node, if it is not a sentinel.
    pub fn gate_index(&self, n: NodeIndex) -> Option<usize> {
        match self.graph[n] {
            DepNode::Gate(idx) => Some(idx),
            _ => None,
        }
    }

    /// The node's duration in cycles (arc weight of its outgoing arcs).
    pub fn duration_cycles(&self, n: NodeIndex) -> u64 {
        self.duration_cycles[n.index()]
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Arcs leaving a node, as (target, edge) pairs.
    pub fn successors(&self, n: NodeIndex) -> impl Iterator<Item = (NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(n, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Arcs entering a node, as (source, edge) pairs.
    pub fn predecessors(&self, n: NodeIndex) -> impl Iterator<Item = (NodeIndex, &DepEdge)> {
        self.graph
            .edges_directed(n, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    /// Direct dependents of a node in the given direction, deduplicated.
    /// Duplicates arise from parallel arcs with different causes.
    pub fn depending_nodes(&self, n: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = vec![];
        for edge in self.graph.edges_directed(n, dir) {
            let other = match dir {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    /// Whether any arc connects `from` to `to`.
    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.find_edge(from, to).is_some()
    }
}

fn expect_operands(gate: &Gate, expected: usize) -> SchedResult<()> {
    if gate.qubits.len() != expected {
        return Err(SchedError::OperandCount {
            gate: gate.base_name().to_string(),
            expected,
            got: gate.qubits.len(),
        });
    }
    Ok(())
}

/// A classified operand use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Default,
    XRotate,
    ZRotate,
    CRead,
    CWrite,
    BRead,
    BWrite,
}

/// Qubit state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QubitPhase {
    Default,
    XRotate,
    ZRotate,
}

/// Creg/breg state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegPhase {
    Write,
    Read,
}

struct Builder {
    graph: DiGraph<DepNode, DepEdge, u32>,
    source: NodeIndex,
    gate_nodes: Vec<NodeIndex>,
    duration_cycles: Vec<u64>,

    last_q_phase: Vec<QubitPhase>,
    last_default: Vec<NodeIndex>,
    last_x_rotates: Vec<Vec<NodeIndex>>,
    last_z_rotates: Vec<Vec<NodeIndex>>,

    last_c_phase: Vec<RegPhase>,
    last_c_writer: Vec<NodeIndex>,
    last_c_readers: Vec<Vec<NodeIndex>>,

    last_b_phase: Vec<RegPhase>,
    last_b_writer: Vec<NodeIndex>,
    last_b_readers: Vec<Vec<NodeIndex>>,
}

impl Builder {
    fn new(kernel: &Kernel) -> Self {
        let mut graph = DiGraph::default();
        let source = graph.add_node(DepNode::Source);
        let nq = kernel.qubit_count as usize;
        let nc = kernel.creg_count as usize;
        let nb = kernel.breg_count as usize;

        Self {
            graph,
            source,
            gate_nodes: Vec::with_capacity(kernel.len()),
            // SOURCE completes in one cycle, so the first real gates land
            // on cycle 1.
            duration_cycles: vec![1],

            // start as if SOURCE performed Default on every qubit and a
            // write on every creg/breg
            last_q_phase: vec![QubitPhase::Default; nq],
            last_default: vec![source; nq],
            last_x_rotates: vec![vec![]; nq],
            last_z_rotates: vec![vec![]; nq],

            last_c_phase: vec![RegPhase::Write; nc],
            last_c_writer: vec![source; nc],
            last_c_readers: vec![vec![]; nc],

            last_b_phase: vec![RegPhase::Write; nb],
            last_b_writer: vec![source; nb],
            last_b_readers: vec![vec![]; nb],
        }
    }

    fn add_gate_node(&mut self, idx: usize, gate: &Gate, cycle_time: u64) -> NodeIndex {
        let node = self.graph.add_node(DepNode::Gate(idx));
        self.gate_nodes.push(node);
        self.duration_cycles.push(gate.duration_in_cycles(cycle_time));
        node
    }

    fn add_dep(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        dep: DepKind,
        operand_kind: OperandKind,
        operand: u32,
    ) {
        let weight = self.duration_cycles[from.index()];
        self.graph.add_edge(
            from,
            to,
            DepEdge {
                weight,
                cause: operand,
                operand: operand_kind,
                dep,
            },
        );
    }

    /// Drive the per-operand state machine one step for a new event.
    ///
    /// `commutes` says whether the event may commute with previous events
    /// of its own class; when false, extra sequentializing arcs are added.
    fn event(&mut self, curr: NodeIndex, event: Event, operand: u32, commutes: bool) {
        let op = operand as usize;
        match event {
            Event::Default => {
                match self.last_q_phase[op] {
                    QubitPhase::Default => {
                        self.add_dep(self.last_default[op], curr, DepKind::Dad, OperandKind::Qubit, operand);
                    }
                    QubitPhase::ZRotate => {
                        for z in self.last_z_rotates[op].clone() {
                            self.add_dep(z, curr, DepKind::Daz, OperandKind::Qubit, operand);
                        }
                    }
                    QubitPhase::XRotate => {
                        for x in self.last_x_rotates[op].clone() {
                            self.add_dep(x, curr, DepKind::Dax, OperandKind::Qubit, operand);
                        }
                    }
                }
                self.last_default[op] = curr;
                self.last_q_phase[op] = QubitPhase::Default;
            }

            Event::ZRotate => {
                self.add_dep(self.last_default[op], curr, DepKind::Zad, OperandKind::Qubit, operand);
                if self.last_q_phase[op] != QubitPhase::ZRotate {
                    self.last_z_rotates[op].clear();
                } else if !commutes {
                    for z in self.last_z_rotates[op].clone() {
                        self.add_dep(z, curr, DepKind::Zaz, OperandKind::Qubit, operand);
                    }
                }
                for x in self.last_x_rotates[op].clone() {
                    self.add_dep(x, curr, DepKind::Zax, OperandKind::Qubit, operand);
                }
                self.last_z_rotates[op].push(curr);
                self.last_q_phase[op] = QubitPhase::ZRotate;
            }

            Event::XRotate => {
                self.add_dep(self.last_default[op], curr, DepKind::Xad, OperandKind::Qubit, operand);
                if self.last_q_phase[op] != QubitPhase::XRotate {
                    self.last_x_rotates[op].clear();
                } else if !commutes {
                    for x in self.last_x_rotates[op].clone() {
                        self.add_dep(x, curr, DepKind::Xax, OperandKind::Qubit, operand);
                    }
                }
                for z in self.last_z_rotates[op].clone() {
                    self.add_dep(z, curr, DepKind::Xaz, OperandKind::Qubit, operand);
                }
                self.last_x_rotates[op].push(curr);
                self.last_q_phase[op] = QubitPhase::XRotate;
            }

            Event::CWrite => {
                match self.last_c_phase[op] {
                    RegPhase::Write => {
                        self.add_dep(self.last_c_writer[op], curr, DepKind::Waw, OperandKind::Creg, operand);
                    }
                    RegPhase::Read => {
                        for r in self.last_c_readers[op].clone() {
                            self.add_dep(r, curr, DepKind::War, OperandKind::Creg, operand);
                        }
                    }
                }
                self.last_c_writer[op] = curr;
                self.last_c_phase[op] = RegPhase::Write;
            }

            Event::CRead => {
                self.add_dep(self.last_c_writer[op], curr, DepKind::Raw, OperandKind::Creg, operand);
                if self.last_c_phase[op] != RegPhase::Read {
                    self.last_c_readers[op].clear();
                }
                // reads commute; no RAR arcs
                self.last_c_readers[op].push(curr);
                self.last_c_phase[op] = RegPhase::Read;
            }

            Event::BWrite => {
                match self.last_b_phase[op] {
                    RegPhase::Write => {
                        self.add_dep(self.last_b_writer[op], curr, DepKind::Waw, OperandKind::Breg, operand);
                    }
                    RegPhase::Read => {
                        for r in self.last_b_readers[op].clone() {
                            self.add_dep(r, curr, DepKind::War, OperandKind::Breg, operand);
                        }
                    }
                }
                self.last_b_writer[op] = curr;
                self.last_b_phase[op] = RegPhase::Write;
            }

            Event::BRead => {
                self.add_dep(self.last_b_writer[op], curr, DepKind::Raw, OperandKind::Breg, operand);
                if self.last_b_phase[op] != RegPhase::Read {
                    self.last_b_readers[op].clear();
                }
                // reads commute; no RAR arcs
                self.last_b_readers[op].push(curr);
                self.last_b_phase[op] = RegPhase::Read;
            }
        }
    }

    /// Append SINK and close every dependence chain: SINK behaves as a
    /// Default on every qubit and a write on every creg/breg, so that at
    /// the start of SINK all still-executing gates have completed.
    fn close(&mut self, kernel: &Kernel) {
        let sink = self.graph.add_node(DepNode::Sink);
        self.duration_cycles.push(0);
        for q in 0..kernel.qubit_count {
            self.event(sink, Event::Default, q, false);
        }
        for c in 0..kernel.creg_count {
            self.event(sink, Event::CWrite, c, false);
        }
        for b in 0..kernel.breg_count {
            self.event(sink, Event::BWrite, b, false);
        }
    }

    fn finish(self) -> DepGraph {
        let sink = self
            .graph
            .node_indices()
            .find(|&n| self.graph[n] == DepNode::Sink)
            .expect("SINK node must exist");
        assert!(
            !petgraph::algo::is_cyclic_directed(&self.graph),
            "dependency graph has a cycle; classification rules are broken"
        );
        DepGraph {
            graph: self.graph,
            source: self.source,
            sink,
            gate_nodes: self.gate_nodes,
            duration_cycles: self.duration_cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skuld_ir::QubitId;

    fn kernel_with(gates: &[(&str, &[u32])]) -> Kernel {
        let mut k = Kernel::new("k", 4, 2, 2, 1);
        for (name, qs) in gates {
            k.push(Gate::new(*name, qs.iter().map(|&q| QubitId(q)), 1))
                .unwrap();
        }
        k
    }

    fn commute_all() -> CommuteOptions {
        CommuteOptions {
            multi_qubit: true,
            single_qubit: true,
        }
    }

    #[test]
    fn test_x_then_z_always_ordered() {
        let k = kernel_with(&[("x", &[0]), ("z", &[0])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
    }

    #[test]
    fn test_x_rotations_commute() {
        let k = kernel_with(&[("x", &[0]), ("x", &[0])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(!g.has_edge(g.gate_node(0), g.gate_node(1)));
        assert!(!g.has_edge(g.gate_node(1), g.gate_node(0)));
    }

    #[test]
    fn test_x_rotations_sequentialized_when_disabled() {
        let k = kernel_with(&[("x", &[0]), ("x", &[0])]);
        let g = DepGraph::build(&k, CommuteOptions::default()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
    }

    #[test]
    fn test_cnot_control_commutes_with_cz() {
        // cnot control and cz operands are all Z rotations on qubit 0
        let k = kernel_with(&[("cnot", &[0, 1]), ("cz", &[0, 2])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(!g.has_edge(g.gate_node(0), g.gate_node(1)));
    }

    #[test]
    fn test_cnot_target_blocks_control_use() {
        // first cnot's target (X) on qubit 1, second cnot's control (Z)
        // on qubit 1: these never commute
        let k = kernel_with(&[("cnot", &[0, 1]), ("cnot", &[1, 2])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
    }

    #[test]
    fn test_measure_sequentializes_qubit() {
        let k = kernel_with(&[("x", &[0]), ("measure", &[0]), ("x", &[0])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
        assert!(g.has_edge(g.gate_node(1), g.gate_node(2)));
    }

    #[test]
    fn test_single_root_and_terminal() {
        let k = kernel_with(&[("x", &[0]), ("cnot", &[1, 2])]);
        let g = DepGraph::build(&k, commute_all()).unwrap();
        // source reaches both gates, both gates reach sink
        assert!(g.has_edge(g.source(), g.gate_node(0)));
        assert!(g.has_edge(g.source(), g.gate_node(1)));
        assert!(g.has_edge(g.gate_node(0), g.sink()));
        assert!(g.has_edge(g.gate_node(1), g.sink()));
        // unused qubit 3 closes directly from source to sink
        assert!(g.has_edge(g.source(), g.sink()));
    }

    #[test]
    fn test_edge_weight_is_duration_in_cycles() {
        let mut k = Kernel::new("k", 1, 0, 0, 20);
        k.push(Gate::new("x", [QubitId(0)], 45)).unwrap();
        k.push(Gate::new("z", [QubitId(0)], 20)).unwrap();
        let g = DepGraph::build(&k, CommuteOptions::default()).unwrap();
        let (_, edge) = g
            .successors(g.gate_node(0))
            .find(|(t, _)| *t == g.gate_node(1))
            .unwrap();
        assert_eq!(edge.weight, 3); // ceil(45 / 20)
        assert_eq!(edge.dep, DepKind::Zax);
        assert_eq!(edge.operand, OperandKind::Qubit);
        assert_eq!(edge.cause, 0);
    }

    #[test]
    fn test_condition_reads_commute() {
        use skuld_ir::{BregId, CondKind, Condition, CregId};
        let mut k = Kernel::new("k", 2, 1, 1, 1);
        k.push(Gate::measure(QubitId(0), CregId(0), BregId(0), 1))
            .unwrap();
        let cond = Condition::new(CondKind::Unary, [BregId(0)]).unwrap();
        k.push(Gate::new("x", [QubitId(0)], 1).with_condition(cond.clone()))
            .unwrap();
        k.push(Gate::new("y", [QubitId(1)], 1).with_condition(cond))
            .unwrap();
        let g = DepGraph::build(&k, CommuteOptions::default()).unwrap();
        // both conditional gates read b[0] written by the measurement
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
        assert!(g.has_edge(g.gate_node(0), g.gate_node(2)));
        // but the two reads are unordered with respect to each other
        assert!(!g.has_edge(g.gate_node(1), g.gate_node(2)));
        assert!(!g.has_edge(g.gate_node(2), g.gate_node(1)));
    }

    #[test]
    fn test_classical_writes_sequentialize() {
        use skuld_ir::CregId;
        let mut k = Kernel::new("k", 1, 1, 0, 1);
        k.push(Gate::classical("add", [CregId(0)], 1)).unwrap();
        k.push(Gate::classical("sub", [CregId(0)], 1)).unwrap();
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
    }

    #[test]
    fn test_cnot_operand_count_is_user_error() {
        let k = kernel_with(&[("cnot", &[0])]);
        let err = DepGraph::build(&k, commute_all()).unwrap_err();
        assert!(matches!(err, SchedError::OperandCount { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_display_touches_everything() {
        let mut k = Kernel::new("k", 2, 1, 1, 1);
        k.push(Gate::new("x", [QubitId(1)], 1)).unwrap();
        k.push(Gate::new("display", std::iter::empty(), 0)).unwrap();
        let g = DepGraph::build(&k, commute_all()).unwrap();
        assert!(g.has_edge(g.gate_node(0), g.gate_node(1)));
    }
}
