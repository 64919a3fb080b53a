//! Grouping of scheduled gates into per-cycle bundles.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateKind;
use crate::kernel::Kernel;

/// A set of gates all starting in the same cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// The cycle in which every gate of this bundle starts.
    pub start_cycle: u64,
    /// Longest gate duration in the bundle, in cycles.
    pub duration_in_cycles: u64,
    /// Indices into the kernel's gate arena, in arena order.
    pub gates: Vec<usize>,
}

/// Keyword used to render idle gaps between bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filler {
    /// Render gaps as `skip N`.
    #[default]
    Skip,
    /// Render gaps as `wait N`.
    Wait,
}

impl Filler {
    fn keyword(self) -> &'static str {
        match self {
            Filler::Skip => "skip",
            Filler::Wait => "wait",
        }
    }
}

/// Pack a scheduled kernel's gates into bundles.
///
/// Requires `cycles_valid`; wait and dummy gates are skipped. Bundles come
/// out in non-decreasing start cycle, and within a bundle gates keep the
/// (stable-sorted) kernel order.
pub fn bundler(kernel: &Kernel) -> IrResult<Vec<Bundle>> {
    if !kernel.cycles_valid {
        return Err(IrError::CyclesNotValid(kernel.name.clone()));
    }

    let mut bundles: Vec<Bundle> = vec![];
    let mut curr: Option<Bundle> = None;

    for (idx, gate) in kernel.gates.iter().enumerate() {
        if matches!(gate.kind, GateKind::Wait | GateKind::Dummy) {
            continue;
        }
        let duration = gate.duration_in_cycles(kernel.cycle_time);
        match curr {
            Some(ref mut bundle) if bundle.start_cycle == gate.cycle => {
                bundle.gates.push(idx);
                bundle.duration_in_cycles = bundle.duration_in_cycles.max(duration);
            }
            _ => {
                // cycles_valid guarantees non-decreasing cycles
                assert!(
                    curr.as_ref().is_none_or(|b| b.start_cycle < gate.cycle),
                    "kernel '{}' not ordered by cycle at gate {}",
                    kernel.name,
                    gate.qasm(),
                );
                if let Some(done) = curr.take() {
                    bundles.push(done);
                }
                curr = Some(Bundle {
                    start_cycle: gate.cycle,
                    duration_in_cycles: duration,
                    gates: vec![idx],
                });
            }
        }
    }
    if let Some(done) = curr {
        bundles.push(done);
    }
    Ok(bundles)
}

/// Render bundles as bundled QASM text: `{ g1 | g2 }` per multi-gate
/// bundle, with filler lines for idle gaps between bundles and after the
/// last one.
pub fn bundle_qasm(kernel: &Kernel, bundles: &[Bundle], filler: Filler) -> String {
    let mut out = String::new();
    let mut curr_cycle = 1u64;

    for bundle in bundles {
        let delta = bundle.start_cycle - curr_cycle;
        if delta > 1 {
            out.push_str(&format!("    {} {}\n", filler.keyword(), delta - 1));
        }
        out.push_str("    ");
        if bundle.gates.len() > 1 {
            out.push_str("{ ");
        }
        for (i, &gate_idx) in bundle.gates.iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            out.push_str(&kernel.gates[gate_idx].qasm());
        }
        if bundle.gates.len() > 1 {
            out.push_str(" }");
        }
        out.push('\n');
        curr_cycle += delta;
    }

    if let Some(last) = bundles.last()
        && last.duration_in_cycles > 1
    {
        out.push_str(&format!(
            "    {} {}\n",
            filler.keyword(),
            last.duration_in_cycles - 1
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use crate::ids::QubitId;

    fn scheduled_kernel() -> Kernel {
        let mut k = Kernel::new("k", 3, 0, 0, 20);
        for (name, q, cycle) in [("x", 0, 1), ("y", 1, 1), ("x", 2, 4)] {
            let mut g = Gate::new(name, [QubitId(q)], 40);
            g.cycle = cycle;
            k.gates.push(g);
        }
        k.cycles_valid = true;
        k
    }

    #[test]
    fn test_bundler_requires_valid_cycles() {
        let mut k = scheduled_kernel();
        k.cycles_valid = false;
        assert!(bundler(&k).is_err());
    }

    #[test]
    fn test_bundler_groups_by_cycle() {
        let k = scheduled_kernel();
        let bundles = bundler(&k).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].start_cycle, 1);
        assert_eq!(bundles[0].gates, vec![0, 1]);
        assert_eq!(bundles[0].duration_in_cycles, 2);
        assert_eq!(bundles[1].start_cycle, 4);
        assert_eq!(bundles[1].gates, vec![2]);
    }

    #[test]
    fn test_bundler_skips_wait_and_dummy() {
        let mut k = scheduled_kernel();
        let mut w = Gate::wait([QubitId(0)], 20);
        w.cycle = 4;
        k.gates.push(w);
        let bundles = bundler(&k).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[1].gates, vec![2]);
    }

    #[test]
    fn test_bundle_qasm_gap_and_tail() {
        let k = scheduled_kernel();
        let bundles = bundler(&k).unwrap();
        let text = bundle_qasm(&k, &bundles, Filler::Skip);
        let lines: Vec<_> = text.lines().map(str::trim).collect();
        assert_eq!(
            lines,
            vec!["{ x q[0] | y q[1] }", "skip 2", "x q[2]", "skip 1"]
        );
    }

    #[test]
    fn test_bundle_qasm_wait_filler() {
        let k = scheduled_kernel();
        let bundles = bundler(&k).unwrap();
        let text = bundle_qasm(&k, &bundles, Filler::Wait);
        assert!(text.contains("wait 2"));
    }
}
