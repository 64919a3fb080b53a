//! Read-only platform descriptors.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Description of one scheduling resource of a platform.
///
/// Descriptors are pure data; the scheduler crate turns them into live
/// state machines. They normally arrive from a platform configuration
/// file, hence the serde derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResourceDesc {
    /// One exclusive slot per qubit: at most one gate active on a qubit at
    /// any cycle.
    Qubit,
    /// An instrument shared by several qubits. Gates whose base name is in
    /// `gate_names` occupy the instrument mapped from their qubit
    /// operands; co-issue is allowed only for gates starting in the same
    /// cycle.
    SharedInstrument {
        /// Resource name, e.g. `meas_units`.
        name: String,
        /// Number of instruments.
        instrument_count: u32,
        /// Map from qubit index to instrument index.
        qubit_to_instrument: FxHashMap<u32, u32>,
        /// Base names of the instructions that use this instrument.
        gate_names: Vec<String>,
    },
}

impl ResourceDesc {
    /// The resource's name as used in diagnostics and manager keys.
    pub fn name(&self) -> &str {
        match self {
            ResourceDesc::Qubit => "qubits",
            ResourceDesc::SharedInstrument { name, .. } => name,
        }
    }
}

/// A read-only hardware descriptor consumed by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// Number of qubits.
    pub qubit_count: u32,
    /// Number of classical registers.
    pub creg_count: u32,
    /// Number of bit registers.
    pub breg_count: u32,
    /// Nanoseconds per cycle; strictly positive.
    pub cycle_time: u64,
    /// Architecture key used to pick a default compilation pipeline.
    pub eqasm_compiler_name: String,
    /// Scheduling resource descriptors.
    pub resources: Vec<ResourceDesc>,
}

impl Platform {
    /// Build a platform, validating the cycle time and every resource
    /// descriptor against the qubit count.
    pub fn new(
        qubit_count: u32,
        creg_count: u32,
        breg_count: u32,
        cycle_time: u64,
        eqasm_compiler_name: impl Into<String>,
        resources: Vec<ResourceDesc>,
    ) -> IrResult<Self> {
        if cycle_time == 0 {
            return Err(IrError::InvalidPlatform("cycle_time must be positive".into()));
        }
        for desc in &resources {
            if let ResourceDesc::SharedInstrument {
                name,
                instrument_count,
                qubit_to_instrument,
                ..
            } = desc
            {
                for (&q, &i) in qubit_to_instrument {
                    if q >= qubit_count {
                        return Err(IrError::InvalidPlatform(format!(
                            "resource '{name}' maps qubit {q} outside the platform's {qubit_count} qubits"
                        )));
                    }
                    if i >= *instrument_count {
                        return Err(IrError::InvalidPlatform(format!(
                            "resource '{name}' maps qubit {q} to instrument {i} of {instrument_count}"
                        )));
                    }
                }
            }
        }
        Ok(Self {
            qubit_count,
            creg_count,
            breg_count,
            cycle_time,
            eqasm_compiler_name: eqasm_compiler_name.into(),
            resources,
        })
    }

    /// Convert a duration in nanoseconds to whole cycles, rounding up.
    pub fn time_to_cycles(&self, duration: u64) -> u64 {
        duration.div_ceil(self.cycle_time)
    }
}
