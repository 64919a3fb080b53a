//! The gate record and its condition tags.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::ids::{BregId, CregId, QubitId};

/// Absolute upper bound on cycle values. A gate whose cycle equals this
/// value has not been assigned a cycle yet.
pub const MAX_CYCLE: u64 = u64::MAX / 4;

/// Initial cycle given to the SINK sentinel when scheduling backward.
/// Cycle values are shifted down so SOURCE lands on 0 afterwards.
pub const ALAP_SINK_CYCLE: u64 = MAX_CYCLE / 2;

/// The structural kind of a gate.
///
/// The specific operation a `Generic` gate performs is carried by its name;
/// the scheduler's classification rules switch on the name and operand
/// shape rather than on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    /// Dependency-graph top sentinel; "writes" every operand.
    Source,
    /// Dependency-graph bottom sentinel; "reads" every operand.
    Sink,
    /// Explicit wait/skip; never consumes resources.
    Wait,
    /// Placeholder gate; never consumes resources, skipped by the bundler.
    Dummy,
    /// Classical register operation; never consumes quantum resources.
    Classical,
    /// Any ordinary quantum gate.
    Generic,
}

/// How a gate's execution is predicated on bit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CondKind {
    /// Execute unconditionally.
    #[default]
    Always,
    /// Never execute.
    Never,
    /// Execute iff the single breg operand is set.
    Unary,
    /// Execute iff the single breg operand is clear.
    Not,
    /// Both breg operands set.
    And,
    /// Not both set.
    Nand,
    /// At least one set.
    Or,
    /// Neither set.
    Nor,
    /// Exactly one set.
    Xor,
    /// Both or neither set.
    Nxor,
}

impl CondKind {
    /// Number of breg operands this condition consumes.
    pub fn arity(self) -> usize {
        match self {
            CondKind::Always | CondKind::Never => 0,
            CondKind::Unary | CondKind::Not => 1,
            _ => 2,
        }
    }

    /// Canonical name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            CondKind::Always => "always",
            CondKind::Never => "never",
            CondKind::Unary => "unary",
            CondKind::Not => "not",
            CondKind::And => "and",
            CondKind::Nand => "nand",
            CondKind::Or => "or",
            CondKind::Nor => "nor",
            CondKind::Xor => "xor",
            CondKind::Nxor => "nxor",
        }
    }
}

impl fmt::Display for CondKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A gate's execution condition: a kind plus the bit registers it reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Condition {
    /// The condition function.
    pub kind: CondKind,
    /// The bit registers the condition reads.
    pub operands: Vec<BregId>,
}

impl Condition {
    /// Unconditional execution.
    pub fn always() -> Self {
        Self::default()
    }

    /// Build a condition, validating the operand arity for the kind.
    pub fn new(kind: CondKind, operands: impl IntoIterator<Item = BregId>) -> IrResult<Self> {
        let operands: Vec<_> = operands.into_iter().collect();
        if operands.len() != kind.arity() {
            return Err(IrError::ConditionArity {
                condition: kind.name(),
                expected: kind.arity(),
                got: operands.len(),
            });
        }
        Ok(Self { kind, operands })
    }

    /// Whether this condition is anything other than `Always`.
    pub fn is_conditional(&self) -> bool {
        self.kind != CondKind::Always
    }
}

/// A single operation on qubits, cregs and bregs.
///
/// Gates are plain records; the kernel owns them in an arena and every
/// other component refers to them by index into that arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Lower-case canonical instruction symbol. May carry a parameter
    /// suffix after a space (e.g. `rz 1.5708`); [`Gate::base_name`] strips
    /// it for classification.
    pub name: String,
    /// Structural kind.
    pub kind: GateKind,
    /// Qubit operands, in instruction order.
    pub qubits: Vec<QubitId>,
    /// Classical register operands.
    pub cregs: Vec<CregId>,
    /// Bit register operands.
    pub bregs: Vec<BregId>,
    /// Duration in nanoseconds.
    pub duration: u64,
    /// Optional rotation angle in radians.
    pub angle: Option<f64>,
    /// Start cycle; [`MAX_CYCLE`] until a scheduler assigns one.
    pub cycle: u64,
    /// Execution condition.
    pub condition: Condition,
}

impl Gate {
    /// Create a generic quantum gate.
    pub fn new(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = QubitId>,
        duration: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind: GateKind::Generic,
            qubits: qubits.into_iter().collect(),
            cregs: vec![],
            bregs: vec![],
            duration,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Create a measurement writing into a creg and a breg.
    pub fn measure(qubit: QubitId, creg: CregId, breg: BregId, duration: u64) -> Self {
        Self {
            name: "measure".into(),
            kind: GateKind::Generic,
            qubits: vec![qubit],
            cregs: vec![creg],
            bregs: vec![breg],
            duration,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Create a classical register operation.
    pub fn classical(
        name: impl Into<String>,
        cregs: impl IntoIterator<Item = CregId>,
        duration: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind: GateKind::Classical,
            qubits: vec![],
            cregs: cregs.into_iter().collect(),
            bregs: vec![],
            duration,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Create a wait gate covering the given qubits.
    pub fn wait(qubits: impl IntoIterator<Item = QubitId>, duration: u64) -> Self {
        Self {
            name: "wait".into(),
            kind: GateKind::Wait,
            qubits: qubits.into_iter().collect(),
            cregs: vec![],
            bregs: vec![],
            duration,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Create the SOURCE sentinel. Its duration is one cycle so that every
    /// dependence arc leaving it weighs exactly one cycle, putting the
    /// first real gates at cycle 1.
    pub fn source(cycle_time: u64) -> Self {
        Self {
            name: "source".into(),
            kind: GateKind::Source,
            qubits: vec![],
            cregs: vec![],
            bregs: vec![],
            duration: cycle_time,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Create the SINK sentinel.
    pub fn sink() -> Self {
        Self {
            name: "sink".into(),
            kind: GateKind::Sink,
            qubits: vec![],
            cregs: vec![],
            bregs: vec![],
            duration: 0,
            angle: None,
            cycle: MAX_CYCLE,
            condition: Condition::always(),
        }
    }

    /// Attach an angle.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    /// Attach an execution condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// The instruction symbol with any parameter suffix stripped.
    pub fn base_name(&self) -> &str {
        match self.name.find(' ') {
            Some(p) => &self.name[..p],
            None => &self.name,
        }
    }

    /// Whether execution is predicated on bit registers.
    pub fn is_conditional(&self) -> bool {
        self.condition.is_conditional()
    }

    /// Whether this gate is one of the SOURCE/SINK sentinels.
    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, GateKind::Source | GateKind::Sink)
    }

    /// Whether this gate ever occupies scheduling resources.
    ///
    /// Sentinels, dummies, classical operations and waits do not.
    pub fn uses_resources(&self) -> bool {
        matches!(self.kind, GateKind::Generic)
    }

    /// Duration rounded up to whole cycles.
    pub fn duration_in_cycles(&self, cycle_time: u64) -> u64 {
        self.duration.div_ceil(cycle_time)
    }

    /// Whether a cycle has been assigned.
    pub fn has_cycle(&self) -> bool {
        self.cycle != MAX_CYCLE
    }

    /// Diagnostic QASM-style rendering, including the condition prefix.
    pub fn qasm(&self) -> String {
        let mut out = String::new();
        if self.is_conditional() {
            out.push_str("cond(");
            out.push_str(self.condition.kind.name());
            for b in &self.condition.operands {
                out.push_str(&format!(",{b}"));
            }
            out.push_str(") ");
        }
        out.push_str(&self.name);
        let mut first = true;
        for q in &self.qubits {
            out.push_str(if first { " " } else { "," });
            out.push_str(&q.to_string());
            first = false;
        }
        for c in &self.cregs {
            out.push_str(if first { " " } else { "," });
            out.push_str(&c.to_string());
            first = false;
        }
        for b in &self.bregs {
            out.push_str(if first { " " } else { "," });
            out.push_str(&b.to_string());
            first = false;
        }
        out
    }
}
