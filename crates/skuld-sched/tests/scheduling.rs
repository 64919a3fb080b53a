//! Integration tests for the scheduling pipeline: dependency analysis,
//! cycle assignment with and without resources, and bundling.

use skuld_ir::{Filler, Gate, Kernel, Platform, QubitId, ResourceDesc, bundle_qasm, bundler};
use skuld_sched::{CommuteOptions, Heuristic, Manager, Scheduler, SchedulerConfig};

/// Helper: a kernel over `n` qubits with unit cycle time.
fn kernel(n: u32) -> Kernel {
    Kernel::new("test", n, 1, 1, 1)
}

/// Helper: scheduler config with the given commutation switches.
fn config(multi: bool, single: bool) -> SchedulerConfig {
    SchedulerConfig {
        commute: CommuteOptions {
            multi_qubit: multi,
            single_qubit: single,
        },
        heuristic: Heuristic::PathLength,
    }
}

/// Helper: the cycle of each gate in kernel order.
fn cycles(kernel: &Kernel) -> Vec<u64> {
    kernel.gates.iter().map(|g| g.cycle).collect()
}

fn qubit_platform(n: u32) -> Platform {
    Platform::new(n, 1, 1, 1, "cc", vec![ResourceDesc::Qubit]).unwrap()
}

// ============================================================================
// Dependence-only scheduling
// ============================================================================

#[test]
fn x_and_z_on_one_qubit_serialize() {
    let mut k = kernel(1);
    k.push(Gate::new("x", [QubitId(0)], 1)).unwrap();
    k.push(Gate::new("z", [QubitId(0)], 1)).unwrap();

    let mut s = Scheduler::new(&k, &config(false, true)).unwrap();
    s.schedule_asap(&mut k);

    assert_eq!(cycles(&k), vec![1, 2]);
}

#[test]
fn commuting_x_pair_starts_together() {
    let mut k = kernel(1);
    k.push(Gate::new("x", [QubitId(0)], 1)).unwrap();
    k.push(Gate::new("x", [QubitId(0)], 1)).unwrap();

    let mut s = Scheduler::new(&k, &config(false, true)).unwrap();
    s.schedule_asap(&mut k);

    assert_eq!(cycles(&k), vec![1, 1]);
}

#[test]
fn asap_depth_equals_critical_path() {
    let mut k = kernel(2);
    k.push(Gate::new("x", [QubitId(0)], 3)).unwrap();
    k.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 2)).unwrap();
    k.push(Gate::new("measure", [QubitId(1)], 4)).unwrap();

    let mut s = Scheduler::new(&k, &config(false, false)).unwrap();
    s.schedule_asap(&mut k);

    assert_eq!(cycles(&k), vec![1, 4, 6]);
    assert_eq!(k.depth().unwrap(), 9);
}

#[test]
fn alap_and_asap_agree_on_chains() {
    // a pure dependence chain has no slack, so both directions coincide
    let build = || {
        let mut k = kernel(1);
        k.push(Gate::new("x", [QubitId(0)], 2)).unwrap();
        k.push(Gate::new("z", [QubitId(0)], 1)).unwrap();
        k.push(Gate::new("x", [QubitId(0)], 3)).unwrap();
        k
    };

    let mut asap = build();
    let mut s = Scheduler::new(&asap, &config(false, false)).unwrap();
    s.schedule_asap(&mut asap);

    let mut alap = build();
    let mut s = Scheduler::new(&alap, &config(false, false)).unwrap();
    s.schedule_alap(&mut alap);

    assert_eq!(cycles(&asap), cycles(&alap));
}

// ============================================================================
// Resource-constrained scheduling
// ============================================================================

#[test]
fn commuting_cnots_serialized_by_qubit_resource() {
    let mut k = kernel(3);
    k.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 2)).unwrap();
    k.push(Gate::new("cnot", [QubitId(0), QubitId(2)], 2)).unwrap();

    let p = qubit_platform(3);
    let rm = Manager::from_platform(&p);
    let mut s = Scheduler::new(&k, &config(true, false)).unwrap();
    s.schedule_asap_rc(&mut k, &p, &rm);

    // cycles [1, 1] would double-book qubit 0
    assert_eq!(cycles(&k), vec![1, 3]);
}

#[test]
fn non_commuting_cnots_serialized_by_dependence() {
    let mut k = kernel(3);
    k.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 2)).unwrap();
    k.push(Gate::new("cnot", [QubitId(0), QubitId(2)], 2)).unwrap();

    let mut s = Scheduler::new(&k, &config(false, false)).unwrap();
    s.schedule_asap(&mut k);

    // same [1, 3] shape, reached without any resource model
    assert_eq!(cycles(&k), vec![1, 3]);
}

#[test]
fn shared_readout_co_issues_and_bundles() {
    let mut k = kernel(2);
    k.push(Gate::new("measure", [QubitId(0)], 4)).unwrap();
    k.push(Gate::new("measure", [QubitId(1)], 4)).unwrap();

    let p = Platform::new(
        2,
        1,
        1,
        1,
        "cc",
        vec![
            ResourceDesc::Qubit,
            ResourceDesc::SharedInstrument {
                name: "meas_units".into(),
                instrument_count: 1,
                qubit_to_instrument: [(0u32, 0u32), (1, 0)].into_iter().collect(),
                gate_names: vec!["measure".into()],
            },
        ],
    )
    .unwrap();
    let rm = Manager::from_platform(&p);
    let mut s = Scheduler::new(&k, &config(false, false)).unwrap();
    s.schedule_asap_rc(&mut k, &p, &rm);

    assert_eq!(cycles(&k), vec![1, 1]);

    let bundles = bundler(&k).unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].start_cycle, 1);
    assert_eq!(bundles[0].duration_in_cycles, 4);
    assert_eq!(bundles[0].gates.len(), 2);

    let text = bundle_qasm(&k, &bundles, Filler::Skip);
    assert!(text.contains("{ measure q[0] | measure q[1] }"));
}

#[test]
fn staggered_readout_without_co_issue() {
    // second measurement cannot start at cycle 2: the shared unit is busy
    // with the first until cycle 5
    let mut k = kernel(2);
    k.push(Gate::new("measure", [QubitId(0)], 4)).unwrap();
    k.push(Gate::new("x", [QubitId(1)], 1)).unwrap();
    k.push(Gate::new("measure", [QubitId(1)], 4)).unwrap();

    let p = Platform::new(
        2,
        1,
        1,
        1,
        "cc",
        vec![
            ResourceDesc::Qubit,
            ResourceDesc::SharedInstrument {
                name: "meas_units".into(),
                instrument_count: 1,
                qubit_to_instrument: [(0u32, 0u32), (1, 0)].into_iter().collect(),
                gate_names: vec!["measure".into()],
            },
        ],
    )
    .unwrap();
    let rm = Manager::from_platform(&p);
    let mut s = Scheduler::new(&k, &config(false, false)).unwrap();
    s.schedule_asap_rc(&mut k, &p, &rm);

    let by_name: Vec<(String, u64)> = k.gates.iter().map(|g| (g.name.clone(), g.cycle)).collect();
    assert!(by_name.contains(&("x".into(), 1)));
    assert!(by_name.contains(&("measure".into(), 1)));
    assert!(by_name.contains(&("measure".into(), 5)));
}

#[test]
fn random_heuristic_schedules_validly() {
    let mut k = kernel(3);
    k.push(Gate::new("x", [QubitId(0)], 1)).unwrap();
    k.push(Gate::new("cnot", [QubitId(0), QubitId(1)], 2)).unwrap();
    k.push(Gate::new("x", [QubitId(2)], 1)).unwrap();
    k.push(Gate::new("cnot", [QubitId(1), QubitId(2)], 2)).unwrap();

    let p = qubit_platform(3);
    let rm = Manager::from_platform(&p);
    let cfg = SchedulerConfig {
        commute: CommuteOptions::default(),
        heuristic: Heuristic::Random,
    };
    let mut s = Scheduler::new(&k, &cfg).unwrap();
    s.schedule_asap_rc(&mut k, &p, &rm);

    assert!(k.cycles_valid);
    assert!(k.gates.iter().all(|g| g.cycle >= 1));
    assert_dependences_hold(&k, &CommuteOptions::default());
}

// ============================================================================
// Uniform scheduling
// ============================================================================

#[test]
fn uniform_keeps_asap_depth() {
    let build = || {
        let mut k = kernel(4);
        for q in 0..4 {
            k.push(Gate::new("x", [QubitId(q)], 1)).unwrap();
        }
        k.push(Gate::new("z", [QubitId(0)], 1)).unwrap();
        k.push(Gate::new("z", [QubitId(0)], 1)).unwrap();
        k
    };

    let mut asap = build();
    let mut s = Scheduler::new(&asap, &config(false, false)).unwrap();
    s.schedule_asap(&mut asap);
    let depth = asap.depth().unwrap();

    let mut uni = build();
    let mut s = Scheduler::new(&uni, &config(false, false)).unwrap();
    s.schedule_alap_uniform(&mut uni);

    assert_eq!(uni.depth().unwrap(), depth);
    assert_dependences_hold(&uni, &CommuteOptions::default());
}

// ============================================================================
// Schedule validity invariants
// ============================================================================

/// Rebuild the dependency graph for a scheduled kernel and check that
/// every arc's latency is honoured.
fn assert_dependences_hold(k: &Kernel, commute: &CommuteOptions) {
    let graph = skuld_sched::DepGraph::build(k, *commute).unwrap();
    for n in graph.nodes() {
        let Some(src_idx) = graph.gate_index(n) else {
            continue;
        };
        for (target, edge) in graph.successors(n) {
            let Some(dst_idx) = graph.gate_index(target) else {
                continue;
            };
            assert!(
                k.gates[dst_idx].cycle >= k.gates[src_idx].cycle + edge.weight,
                "dependence {} -> {} violated",
                k.gates[src_idx].qasm(),
                k.gates[dst_idx].qasm(),
            );
        }
    }
}

#[test]
fn schedule_is_stable_permutation_of_input() {
    let mut k = kernel(3);
    let names = ["x", "y", "z", "x", "h"];
    for (i, name) in names.iter().enumerate() {
        k.push(Gate::new(*name, [QubitId((i % 3) as u32)], 1)).unwrap();
    }
    let before: Vec<String> = k.gates.iter().map(|g| g.qasm()).collect();

    let mut s = Scheduler::new(&k, &config(false, false)).unwrap();
    s.schedule_asap(&mut k);

    let mut after: Vec<String> = k.gates.iter().map(|g| g.qasm()).collect();
    after.sort();
    let mut sorted_before = before.clone();
    sorted_before.sort();
    assert_eq!(after, sorted_before);

    // equal-cycle gates keep their input order
    for w in k.gates.windows(2) {
        assert!(w[0].cycle <= w[1].cycle);
        if w[0].cycle == w[1].cycle {
            let i0 = before.iter().position(|q| *q == w[0].qasm()).unwrap();
            let i1 = before.iter().position(|q| *q == w[1].qasm()).unwrap();
            assert!(i0 < i1);
        }
    }
}
