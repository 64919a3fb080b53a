//! Skuld Intermediate Representation
//!
//! Core data structures for kernelized quantum programs: gates with their
//! operand sets and conditions, kernels that own gate arenas, platforms
//! describing the target hardware, and the bundle grouping of scheduled
//! gates.
//!
//! # Overview
//!
//! A [`Program`] holds a list of [`Kernel`]s compiled against one shared
//! [`Platform`]. Each kernel is a straight-line sequence of [`Gate`]
//! records; a scheduler assigns cycle numbers to them, after which
//! [`bundler`] groups gates starting in the same cycle into [`Bundle`]s.
//!
//! # Example
//!
//! ```rust
//! use skuld_ir::{Gate, Kernel, QubitId};
//!
//! let mut kernel = Kernel::new("bell", 2, 0, 0, 20);
//! kernel.push(Gate::new("x90", [QubitId(0)], 20)).unwrap();
//! kernel.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 40)).unwrap();
//!
//! assert_eq!(kernel.len(), 2);
//! assert!(!kernel.cycles_valid);
//! ```

pub mod bundle;
pub mod error;
pub mod gate;
pub mod ids;
pub mod kernel;
pub mod platform;
pub mod program;

pub use bundle::{Bundle, Filler, bundle_qasm, bundler};
pub use error::{IrError, IrResult};
pub use gate::{ALAP_SINK_CYCLE, CondKind, Condition, Gate, GateKind, MAX_CYCLE};
pub use ids::{BregId, CregId, QubitId};
pub use kernel::Kernel;
pub use platform::{Platform, ResourceDesc};
pub use program::Program;
