//! Kernels: straight-line gate sequences plus operand counts.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;

/// A straight-line sequence of gates with its operand space.
///
/// The kernel exclusively owns its gates; the dependency graph and the
/// bundler refer to them by index into [`Kernel::gates`]. Those indices
/// are positional: a scheduler run ends with a stable sort on cycle value,
/// after which indices taken before the sort are stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kernel {
    /// Kernel name, used in diagnostics and output file names.
    pub name: String,
    /// Number of qubits addressable by gates in this kernel.
    pub qubit_count: u32,
    /// Number of classical registers.
    pub creg_count: u32,
    /// Number of bit registers.
    pub breg_count: u32,
    /// Platform cycle time in nanoseconds.
    pub cycle_time: u64,
    /// The gate arena.
    pub gates: Vec<Gate>,
    /// Whether every gate's cycle field holds a valid schedule: gates are
    /// ordered by non-decreasing cycle and every cycle is at least 1.
    pub cycles_valid: bool,
}

impl Kernel {
    /// Create an empty kernel.
    pub fn new(
        name: impl Into<String>,
        qubit_count: u32,
        creg_count: u32,
        breg_count: u32,
        cycle_time: u64,
    ) -> Self {
        Self {
            name: name.into(),
            qubit_count,
            creg_count,
            breg_count,
            cycle_time,
            gates: vec![],
            cycles_valid: false,
        }
    }

    /// Append a gate, validating every operand index against this kernel's
    /// counts. Appending invalidates any existing schedule.
    pub fn push(&mut self, gate: Gate) -> IrResult<()> {
        self.validate(&gate)?;
        self.gates.push(gate);
        self.cycles_valid = false;
        Ok(())
    }

    fn validate(&self, gate: &Gate) -> IrResult<()> {
        let ctx = || Some(gate.name.clone());
        let mut seen = Vec::with_capacity(gate.qubits.len());
        for q in &gate.qubits {
            if q.0 >= self.qubit_count {
                return Err(IrError::QubitOutOfRange {
                    index: q.0,
                    count: self.qubit_count,
                    gate_name: ctx(),
                });
            }
            if seen.contains(q) {
                return Err(IrError::DuplicateQubit {
                    index: q.0,
                    gate_name: ctx(),
                });
            }
            seen.push(*q);
        }
        for c in &gate.cregs {
            if c.0 >= self.creg_count {
                return Err(IrError::CregOutOfRange {
                    index: c.0,
                    count: self.creg_count,
                    gate_name: ctx(),
                });
            }
        }
        for b in gate.bregs.iter().chain(&gate.condition.operands) {
            if b.0 >= self.breg_count {
                return Err(IrError::BregOutOfRange {
                    index: b.0,
                    count: self.breg_count,
                    gate_name: ctx(),
                });
            }
        }
        Ok(())
    }

    /// Number of gates.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether the kernel has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Circuit depth in cycles, from the first gate's start to the last
    /// gate's completion. Requires a valid schedule.
    pub fn depth(&self) -> IrResult<u64> {
        if !self.cycles_valid {
            return Err(IrError::CyclesNotValid(self.name.clone()));
        }
        let Some(first) = self.gates.first() else {
            return Ok(0);
        };
        let end = self
            .gates
            .iter()
            .map(|g| g.cycle + g.duration_in_cycles(self.cycle_time))
            .max()
            .unwrap_or(first.cycle);
        Ok(end - first.cycle)
    }

    /// Diagnostic rendering of the gate list, one gate per line.
    pub fn qasm(&self) -> String {
        let mut out = String::new();
        for gate in &self.gates {
            out.push_str("    ");
            out.push_str(&gate.qasm());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{CondKind, Condition};
    use crate::ids::{BregId, CregId, QubitId};

    fn kernel() -> Kernel {
        Kernel::new("k", 3, 2, 2, 20)
    }

    #[test]
    fn test_push_validates_qubits() {
        let mut k = kernel();
        assert!(k.push(Gate::new("x", [QubitId(0)], 20)).is_ok());
        let err = k.push(Gate::new("x", [QubitId(3)], 20)).unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { index: 3, .. }));
    }

    #[test]
    fn test_push_rejects_duplicate_qubit() {
        let mut k = kernel();
        let err = k
            .push(Gate::new("cnot", [QubitId(1), QubitId(1)], 40))
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateQubit { index: 1, .. }));
    }

    #[test]
    fn test_push_validates_condition_operands() {
        let mut k = kernel();
        let gate = Gate::new("x", [QubitId(0)], 20)
            .with_condition(Condition::new(CondKind::Unary, [BregId(5)]).unwrap());
        let err = k.push(gate).unwrap_err();
        assert!(matches!(err, IrError::BregOutOfRange { index: 5, .. }));
    }

    #[test]
    fn test_push_invalidates_cycles() {
        let mut k = kernel();
        k.cycles_valid = true;
        k.push(Gate::measure(QubitId(0), CregId(0), BregId(0), 600))
            .unwrap();
        assert!(!k.cycles_valid);
    }

    #[test]
    fn test_depth_requires_schedule() {
        let mut k = kernel();
        k.push(Gate::new("x", [QubitId(0)], 40)).unwrap();
        assert!(k.depth().is_err());
        k.gates[0].cycle = 1;
        k.cycles_valid = true;
        assert_eq!(k.depth().unwrap(), 2);
    }
}
