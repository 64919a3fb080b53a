//! The scheduler pass: applies cycle numbers to every kernel.

use tracing::debug;

use skuld_ir::{Kernel, bundle_qasm, bundler};
use skuld_sched::{CommuteOptions, Heuristic, Scheduler, SchedulerConfig};

use crate::error::{CompileError, CompileResult};
use crate::options::Options;
use crate::pass::{Construction, Context, KernelTransform, PassDef, Transform};

/// Pass type for the scheduler.
pub struct SchedulePassDef;

impl PassDef for SchedulePassDef {
    fn type_name(&self) -> &str {
        "sch.Schedule"
    }

    fn friendly_name(&self) -> &str {
        "Scheduler"
    }

    fn docs(&self) -> &str {
        "Analyzes the data dependencies between gates and applies cycle \
         numbers to them based on the configured scheduling heuristic. \
         Depending on options, the scheduler is resource-constrained or \
         ignores resources."
    }

    fn declare_options(&self, options: &mut Options) {
        options.add_bool(
            "resource_constraints",
            "Whether to respect or ignore resource constraints when scheduling.",
            true,
        );
        options.add_enum(
            "scheduler_target",
            "Which scheduling target is to be used; asap schedules all gates as \
             soon as possible, alap starts from the last gate and schedules all \
             gates as late as possible, and uniform tries to smoothen out the \
             amount of parallelism throughout the kernel. Uniform scheduling is \
             only supported without resource constraints.",
            "alap",
            &["asap", "alap", "uniform"],
        );
        options.add_enum(
            "scheduler_heuristic",
            "How the list of available gates is ordered by criticality.",
            "path_length",
            &["path_length", "random"],
        );
        options.add_bool(
            "commute_multi_qubit",
            "Whether to consider commutation rules for the CZ and CNOT quantum gates.",
            false,
        );
        options.add_bool(
            "commute_single_qubit",
            "Whether to consider commutation rules for single-qubit X and Z rotations.",
            false,
        );
        options.add_bool(
            "write_dot_graphs",
            "Whether to emit a graphviz dot representation of the schedule of \
             the kernel. The emitted file will use suffix `_<kernel>.dot`.",
            false,
        );
    }

    fn construct(&self, options: &Options) -> CompileResult<Construction> {
        let target = match options.as_str("scheduler_target") {
            "asap" => Target::Asap,
            "alap" => Target::Alap,
            _ => Target::Uniform,
        };
        let resource_constraints = options.as_bool("resource_constraints");
        if target == Target::Uniform && resource_constraints {
            return Err(CompileError::InvalidConfiguration(
                "the uniform scheduling target does not support resource constraints".into(),
            ));
        }
        let heuristic = match options.as_str("scheduler_heuristic") {
            "random" => Heuristic::Random,
            _ => Heuristic::PathLength,
        };
        Ok(Construction::Leaf(Transform::Kernel(Box::new(
            SchedulePass {
                target,
                resource_constraints,
                config: SchedulerConfig {
                    commute: CommuteOptions {
                        multi_qubit: options.as_bool("commute_multi_qubit"),
                        single_qubit: options.as_bool("commute_single_qubit"),
                    },
                    heuristic,
                },
                write_dot_graphs: options.as_bool("write_dot_graphs"),
            },
        ))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Asap,
    Alap,
    Uniform,
}

struct SchedulePass {
    target: Target,
    resource_constraints: bool,
    config: SchedulerConfig,
    write_dot_graphs: bool,
}

impl KernelTransform for SchedulePass {
    fn run(&self, kernel: &mut Kernel, ctx: &Context) -> CompileResult<()> {
        let mut sched = Scheduler::new(kernel, &self.config)?;

        if self.resource_constraints {
            match self.target {
                Target::Asap => sched.schedule_asap_rc(kernel, ctx.platform, ctx.resources()),
                Target::Alap => sched.schedule_alap_rc(kernel, ctx.platform, ctx.resources()),
                Target::Uniform => unreachable!("rejected at construction"),
            }
        } else {
            match self.target {
                Target::Asap => sched.schedule_asap(kernel),
                Target::Alap => sched.schedule_alap(kernel),
                Target::Uniform => sched.schedule_alap_uniform(kernel),
            }
        }

        let bundles = bundler(kernel)?;
        let depth = kernel.depth()?;
        debug!(
            kernel = %kernel.name,
            bundles = bundles.len(),
            depth,
            "scheduled"
        );

        if self.write_dot_graphs {
            let path = format!("{}_{}.dot", ctx.output_prefix, kernel.name);
            std::fs::write(&path, sched.dot(kernel)).map_err(|source| CompileError::Io {
                path: path.clone(),
                source,
            })?;
            let qasm_path = format!("{}_{}.bundles", ctx.output_prefix, kernel.name);
            std::fs::write(&qasm_path, bundle_qasm(kernel, &bundles, skuld_ir::Filler::Skip))
                .map_err(|source| CompileError::Io {
                    path: qasm_path.clone(),
                    source,
                })?;
        }

        Ok(())
    }
}
