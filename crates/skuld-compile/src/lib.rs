//! Skuld Compilation Framework
//!
//! A hierarchical, option-driven pass manager for kernelized quantum
//! programs. Passes are organized in a tree of groups; each pass declares
//! typed options that freeze when the pass is constructed, and sub-passes
//! are addressed with dotted paths supporting `*`/`?`/`**` wildcards for
//! option routing.
//!
//! # Architecture
//!
//! ```text
//! Program (kernels + platform)
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── Factory (pass types), Options (per pass)
//! └─────────────┘
//!       │
//!       ├── sch.Schedule   (cycle assignment, bundling)
//!       └── ana.Statistics (per-kernel reporting)
//!       │
//!       ▼
//! Program with cycle-valid kernels
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use skuld_compile::PassManager;
//! use skuld_ir::{Gate, Platform, Program, QubitId};
//!
//! let platform = Arc::new(Platform::new(2, 0, 0, 1, "none", vec![]).unwrap());
//! let mut program = Program::new("demo", platform.clone());
//! let k = program.add_kernel("main");
//! program.kernels[k].push(Gate::new("x", [QubitId(0)], 1)).unwrap();
//!
//! let mut pm = PassManager::new();
//! pm.append_pass("sch.Schedule", "scheduler", &[("resource_constraints", "no")]).unwrap();
//! pm.compile(&mut program).unwrap();
//!
//! assert!(program.kernels[0].cycles_valid);
//! ```

pub mod error;
pub mod manager;
pub mod options;
pub mod pass;
pub mod passes;

pub use error::{CompileError, CompileResult};
pub use manager::{Pass, PassManager};
pub use options::{OptionDecl, OptionValue, Options};
pub use pass::{
    Construction, Context, Factory, KernelAnalysis, KernelTransform, PassDef, ProgramAnalysis,
    ProgramTransform, SubPassSpec, Transform,
};
