//! Pass-type contracts: run traits, the construction-time pass
//! descriptor, and the pass-type factory.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use skuld_ir::{Kernel, Platform, Program};
use skuld_sched::Manager;

use crate::error::{CompileError, CompileResult};
use crate::options::Options;

/// Per-invocation context handed to every pass.
pub struct Context<'a> {
    /// Prefix for output artifacts; unique per pass invocation.
    pub output_prefix: &'a str,
    /// Dotted path of the pass from the root, for diagnostics.
    pub full_pass_name: &'a str,
    /// The program's platform.
    pub platform: &'a Platform,
    resources: &'a Manager,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        output_prefix: &'a str,
        full_pass_name: &'a str,
        platform: &'a Platform,
        resources: &'a Manager,
    ) -> Self {
        Self {
            output_prefix,
            full_pass_name,
            platform,
            resources,
        }
    }

    /// The resource-manager factory for this compilation; build a fresh
    /// resource state from it per scheduling run.
    pub fn resources(&self) -> &Manager {
        self.resources
    }
}

/// A transformation over the whole program.
pub trait ProgramTransform: Send + Sync {
    /// Run the transformation.
    fn run(&self, program: &mut Program, ctx: &Context) -> CompileResult<()>;
}

/// A transformation invoked once per kernel.
pub trait KernelTransform: Send + Sync {
    /// Run the transformation on one kernel.
    fn run(&self, kernel: &mut Kernel, ctx: &Context) -> CompileResult<()>;
}

/// A read-only analysis over the whole program.
pub trait ProgramAnalysis: Send + Sync {
    /// Run the analysis.
    fn run(&self, program: &Program, ctx: &Context) -> CompileResult<()>;
}

/// A read-only analysis invoked once per kernel.
pub trait KernelAnalysis: Send + Sync {
    /// Run the analysis on one kernel.
    fn run(&self, kernel: &Kernel, ctx: &Context) -> CompileResult<()>;
}

/// The runnable payload of a constructed leaf pass.
pub enum Transform {
    /// Mutates the program.
    Program(Box<dyn ProgramTransform>),
    /// Mutates kernels one at a time.
    Kernel(Box<dyn KernelTransform>),
    /// Reads the program.
    ProgramAnalysis(Box<dyn ProgramAnalysis>),
    /// Reads kernels one at a time.
    KernelAnalysis(Box<dyn KernelAnalysis>),
}

/// A sub-pass requested by a group expansion.
pub struct SubPassSpec {
    /// Pass type to instantiate.
    pub type_name: String,
    /// Instance name for the sub-pass.
    pub instance_name: String,
    /// Options to apply before construction.
    pub options: Vec<(String, String)>,
}

/// What a pass type turns into when constructed.
pub enum Construction {
    /// An ordinary leaf pass.
    Leaf(Transform),
    /// The pass elects to become a group of sub-passes.
    Group {
        /// Sub-passes to instantiate, in order.
        passes: Vec<SubPassSpec>,
        /// Whether the group is conditional; conditional groups cannot be
        /// flattened.
        conditional: bool,
    },
}

/// A pass *type*: static description plus construction.
///
/// Construction happens once, after the option set froze; it may yield a
/// leaf transform or expand the pass into a group based on its options.
pub trait PassDef: Send + Sync {
    /// Dotted type name, e.g. `sch.Schedule`.
    fn type_name(&self) -> &str;

    /// Human-readable name for documentation.
    fn friendly_name(&self) -> &str;

    /// One-paragraph documentation.
    fn docs(&self) -> &str;

    /// Declare the pass's options (excluding the common `skip`).
    fn declare_options(&self, options: &mut Options);

    /// Whether this pass rewrites the platform; platform-derived caches
    /// are rebuilt after it runs.
    fn is_platform_transformer(&self) -> bool {
        false
    }

    /// Build the runnable payload from the frozen options.
    fn construct(&self, options: &Options) -> CompileResult<Construction>;
}

/// Registry of pass types by type name.
#[derive(Clone, Default)]
pub struct Factory {
    types: FxHashMap<String, Arc<dyn PassDef>>,
}

impl Factory {
    /// An empty factory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A factory with the built-in pass types registered.
    pub fn with_defaults() -> Self {
        let mut f = Self::empty();
        f.register(Arc::new(crate::passes::SchedulePassDef));
        f.register(Arc::new(crate::passes::StatisticsPassDef));
        f
    }

    /// Register a pass type. A later registration under the same type
    /// name replaces the earlier one.
    pub fn register(&mut self, def: Arc<dyn PassDef>) {
        self.types.insert(def.type_name().to_string(), def);
    }

    /// Look up a pass type.
    pub fn get(&self, type_name: &str) -> CompileResult<Arc<dyn PassDef>> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownPassType(type_name.to_string()))
    }

    /// Render documentation for every registered pass type and its
    /// options.
    pub fn dump_pass_types(&self) -> String {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        let mut out = String::new();
        for name in names {
            let def = &self.types[name];
            out.push_str(&format!("* {} ({})\n", name, def.friendly_name()));
            out.push_str(&format!("  {}\n", def.docs()));
            let mut options = Options::new();
            options.add_bool("skip", "Bypass this pass.", false);
            def.declare_options(&mut options);
            for decl in options.iter() {
                out.push_str(&format!(
                    "  - {} (default {}): {}\n",
                    decl.name(),
                    decl.effective(),
                    decl.description()
                ));
            }
        }
        out
    }
}
