//! The statistics report pass.

use std::io::Write;

use skuld_ir::Program;

use crate::error::{CompileError, CompileResult};
use crate::options::Options;
use crate::pass::{Construction, Context, PassDef, ProgramAnalysis, Transform};

/// Pass type for the statistics reporter.
pub struct StatisticsPassDef;

impl PassDef for StatisticsPassDef {
    fn type_name(&self) -> &str {
        "ana.Statistics"
    }

    fn friendly_name(&self) -> &str {
        "Statistics reporter"
    }

    fn docs(&self) -> &str {
        "Appends per-kernel statistics (gate count, depth, operand counts) \
         to `<prefix>_statistics.txt`, delimited by in_<pass> and out_<pass> \
         marker lines."
    }

    fn declare_options(&self, _options: &mut Options) {}

    fn construct(&self, _options: &Options) -> CompileResult<Construction> {
        Ok(Construction::Leaf(Transform::ProgramAnalysis(Box::new(
            StatisticsPass,
        ))))
    }
}

struct StatisticsPass;

impl ProgramAnalysis for StatisticsPass {
    fn run(&self, program: &Program, ctx: &Context) -> CompileResult<()> {
        let path = format!("{}_statistics.txt", ctx.output_prefix);
        let io_err = |source| CompileError::Io {
            path: path.clone(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        writeln!(file, "in_{}", ctx.full_pass_name).map_err(io_err)?;
        for kernel in &program.kernels {
            writeln!(file, "kernel: {}", kernel.name).map_err(io_err)?;
            writeln!(file, "  gates: {}", kernel.len()).map_err(io_err)?;
            match kernel.depth() {
                Ok(depth) => writeln!(file, "  depth: {depth}").map_err(io_err)?,
                Err(_) => writeln!(file, "  depth: unscheduled").map_err(io_err)?,
            }
            writeln!(
                file,
                "  qubits: {}, cregs: {}, bregs: {}",
                kernel.qubit_count, kernel.creg_count, kernel.breg_count
            )
            .map_err(io_err)?;
        }
        writeln!(file, "out_{}", ctx.full_pass_name).map_err(io_err)?;
        Ok(())
    }
}
