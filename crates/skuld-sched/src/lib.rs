//! Skuld Kernel Scheduler
//!
//! Cycle-accurate scheduling of kernelized quantum programs. A kernel's
//! linear gate list is first translated into a dependency graph that
//! exposes the reordering room quantum commutation allows (X rotations on
//! one qubit commute among themselves, as do Z rotations; reads on a
//! classical or bit register commute; everything else sequentializes).
//! The schedulers then assign start cycles under one of several regimes:
//!
//! - **ASAP / ALAP**: dependence-driven only.
//! - **ASAP / ALAP with resource constraints**: critical-path list
//!   scheduling against the platform's resource state machines.
//! - **ALAP uniform**: dependence-driven with smoothed bundle sizes.
//!
//! # Example
//!
//! ```rust
//! use skuld_ir::{Gate, Kernel, QubitId};
//! use skuld_sched::{Scheduler, SchedulerConfig};
//!
//! let mut kernel = Kernel::new("demo", 2, 0, 0, 1);
//! kernel.push(Gate::new("x", [QubitId(0)], 1)).unwrap();
//! kernel.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 2)).unwrap();
//!
//! let mut sched = Scheduler::new(&kernel, &SchedulerConfig::default()).unwrap();
//! sched.schedule_asap(&mut kernel);
//!
//! assert!(kernel.cycles_valid);
//! assert_eq!(kernel.gates[0].cycle, 1);
//! assert_eq!(kernel.gates[1].cycle, 2);
//! ```

pub mod depgraph;
pub mod dot;
pub mod error;
pub mod resource;
pub mod scheduler;

pub use depgraph::{CommuteOptions, DepEdge, DepGraph, DepKind, DepNode, NodeIndex, OperandKind};
pub use error::{SchedError, SchedResult};
pub use resource::{Direction, Manager, QubitResource, Resource, SharedInstrumentResource, State};
pub use scheduler::{Heuristic, Scheduler, SchedulerConfig};
