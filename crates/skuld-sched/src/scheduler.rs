//! ASAP/ALAP critical-path and uniform scheduling, with and without
//! resource constraints.
//!
//! All schedulers share the dependency graph built by [`DepGraph::build`]
//! and never modify it. A scheduling run assigns the cycle field of every
//! gate, stable-sorts the kernel's gate list by cycle, and marks the
//! kernel's cycles valid.
//!
//! The resource-constrained variants are list schedulers: they keep a
//! list of *available* nodes (nodes whose dependence predecessors, or
//! successors when scheduling backward, have all been scheduled),
//! ordered by deep criticality, and fill cycles one by one with nodes
//! whose operands have completed and whose resources are free. Without
//! resource constraints the dependence rules alone determine every cycle
//! and a single recursive sweep suffices.
//!
//! Criticality is measured as `remaining`: the number of cycles between a
//! node's start and the end of the schedule, computed against the
//! *opposite* scheduling direction so that a higher value means more
//! critical regardless of direction.

use petgraph::Direction as PetDirection;
use tracing::debug;

use skuld_ir::{ALAP_SINK_CYCLE, Gate, Kernel, MAX_CYCLE, Platform};

use crate::depgraph::{CommuteOptions, DepGraph, NodeIndex};
use crate::error::SchedResult;
use crate::resource::{Direction, Manager, State};

/// How ties in the available list are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// Deep criticality: recursive comparison of dependent sets.
    #[default]
    PathLength,
    /// Stable source order for equal `remaining` values.
    Random,
}

/// Scheduler construction options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerConfig {
    /// Commutation controls for dependency-graph construction.
    pub commute: CommuteOptions,
    /// Available-list tie-break rule.
    pub heuristic: Heuristic,
}

/// The scheduler for one kernel.
///
/// Holds the kernel's dependency graph plus per-node cycle and
/// criticality state. The kernel itself is only borrowed during the
/// individual scheduling calls; gate arena indices recorded in the graph
/// stay valid until a scheduling call sorts the gate list, which is the
/// last thing each of them does.
pub struct Scheduler {
    graph: DepGraph,
    cycle: Vec<u64>,
    remaining: Vec<u64>,
    heuristic: Heuristic,
    /// Where each build-time arena index currently lives in the kernel's
    /// gate list; updated by the schedule sort.
    gate_pos: Vec<usize>,
}

impl Scheduler {
    /// Build the dependency graph for a kernel and wrap it in a scheduler.
    pub fn new(kernel: &Kernel, config: &SchedulerConfig) -> SchedResult<Self> {
        let graph = DepGraph::build(kernel, config.commute)?;
        let n = graph.node_count();
        Ok(Self {
            graph,
            cycle: vec![MAX_CYCLE; n],
            remaining: vec![MAX_CYCLE; n],
            heuristic: config.heuristic,
            gate_pos: (0..kernel.len()).collect(),
        })
    }

    /// The kernel position of the gate behind a graph node, tracking the
    /// schedule sort.
    pub fn gate_position(&self, n: NodeIndex) -> Option<usize> {
        self.graph.gate_index(n).map(|idx| self.gate_pos[idx])
    }

    /// Read-only view of the dependency graph.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Criticality of a node: cycles between its start and the end of the
    /// schedule. Populated by the resource-constrained and uniform
    /// schedulers.
    pub fn remaining(&self, n: NodeIndex) -> u64 {
        self.remaining[n.index()]
    }

    // ===== plain schedulers, ASAP and ALAP without resource constraints

    /// ASAP without resource constraints: every gate as early as its
    /// dependences allow.
    pub fn schedule_asap(&mut self, kernel: &mut Kernel) {
        debug!(kernel = %kernel.name, "scheduling ASAP");
        self.set_cycle(kernel, Direction::Forward);
        self.write_back(kernel);
    }

    /// ALAP without resource constraints: every gate as late as possible
    /// without growing the circuit.
    pub fn schedule_alap(&mut self, kernel: &mut Kernel) {
        debug!(kernel = %kernel.name, "scheduling ALAP");
        self.set_cycle(kernel, Direction::Backward);
        self.write_back(kernel);
    }

    // ===== schedulers with resource constraints

    /// ASAP with resource constraints.
    pub fn schedule_asap_rc(&mut self, kernel: &mut Kernel, platform: &Platform, rm: &Manager) {
        debug!(kernel = %kernel.name, "scheduling ASAP with resource constraints");
        self.schedule_rc(kernel, platform, rm, Direction::Forward);
    }

    /// ALAP with resource constraints.
    pub fn schedule_alap_rc(&mut self, kernel: &mut Kernel, platform: &Platform, rm: &Manager) {
        debug!(kernel = %kernel.name, "scheduling ALAP with resource constraints");
        self.schedule_rc(kernel, platform, rm, Direction::Backward);
    }

    /// Assign every node its dependence-rule cycle: the forward maximum
    /// rule for ASAP, the backward minimum rule (from `ALAP_SINK_CYCLE`,
    /// shifted so SOURCE lands on 0) for ALAP.
    fn set_cycle(&mut self, kernel: &Kernel, dir: Direction) {
        self.cycle.fill(MAX_CYCLE);
        match dir {
            Direction::Forward => {
                self.set_cycle_node(self.graph.source(), dir);
                for idx in 0..kernel.len() {
                    let n = self.graph.gate_node(idx);
                    if self.cycle[n.index()] == MAX_CYCLE {
                        self.set_cycle_node(n, dir);
                    }
                }
                self.set_cycle_node(self.graph.sink(), dir);
            }
            Direction::Backward => {
                self.set_cycle_node(self.graph.sink(), dir);
                for idx in (0..kernel.len()).rev() {
                    let n = self.graph.gate_node(idx);
                    if self.cycle[n.index()] == MAX_CYCLE {
                        self.set_cycle_node(n, dir);
                    }
                }
                self.set_cycle_node(self.graph.source(), dir);
                self.shift_to_source_zero();
            }
        }
    }

    /// Dependence rule for one node, recursing into not-yet-visited
    /// neighbours. The graph is acyclic, so the recursion terminates.
    fn set_cycle_node(&mut self, n: NodeIndex, dir: Direction) {
        let curr = match dir {
            Direction::Forward => {
                let mut curr = 0;
                let preds: Vec<(NodeIndex, u64)> = self
                    .graph
                    .predecessors(n)
                    .map(|(p, e)| (p, e.weight))
                    .collect();
                for (pred, weight) in preds {
                    if self.cycle[pred.index()] == MAX_CYCLE {
                        self.set_cycle_node(pred, dir);
                    }
                    curr = curr.max(self.cycle[pred.index()] + weight);
                }
                curr
            }
            Direction::Backward => {
                let mut curr = ALAP_SINK_CYCLE;
                let succs: Vec<(NodeIndex, u64)> = self
                    .graph
                    .successors(n)
                    .map(|(s, e)| (s, e.weight))
                    .collect();
                for (succ, weight) in succs {
                    if self.cycle[succ.index()] == MAX_CYCLE {
                        self.set_cycle_node(succ, dir);
                    }
                    curr = curr.min(self.cycle[succ.index()] - weight);
                }
                curr
            }
        };
        self.cycle[n.index()] = curr;
    }

    /// After backward scheduling, shift all cycles so SOURCE sits at 0.
    fn shift_to_source_zero(&mut self) {
        let source_cycle = self.cycle[self.graph.source().index()];
        for c in &mut self.cycle {
            if *c != MAX_CYCLE {
                *c -= source_cycle;
            }
        }
    }

    /// Compute `remaining` for every node. For forward scheduling this is
    /// the distance to SINK (an ALAP-flavoured value); for backward the
    /// distance to SOURCE. Either way higher means more critical.
    fn set_remaining(&mut self, kernel: &Kernel, dir: Direction) {
        self.remaining.fill(MAX_CYCLE);
        match dir {
            Direction::Forward => {
                self.set_remaining_node(self.graph.sink(), dir);
                for idx in (0..kernel.len()).rev() {
                    let n = self.graph.gate_node(idx);
                    if self.remaining[n.index()] == MAX_CYCLE {
                        self.set_remaining_node(n, dir);
                    }
                }
                self.set_remaining_node(self.graph.source(), dir);
            }
            Direction::Backward => {
                self.set_remaining_node(self.graph.source(), dir);
                for idx in 0..kernel.len() {
                    let n = self.graph.gate_node(idx);
                    if self.remaining[n.index()] == MAX_CYCLE {
                        self.set_remaining_node(n, dir);
                    }
                }
                self.set_remaining_node(self.graph.sink(), dir);
            }
        }
    }

    fn set_remaining_node(&mut self, n: NodeIndex, dir: Direction) {
        let mut curr = 0u64;
        let next: Vec<(NodeIndex, u64)> = match dir {
            Direction::Forward => self
                .graph
                .successors(n)
                .map(|(s, e)| (s, e.weight))
                .collect(),
            Direction::Backward => self
                .graph
                .predecessors(n)
                .map(|(p, e)| (p, e.weight))
                .collect(),
        };
        for (next_node, weight) in next {
            if self.remaining[next_node.index()] == MAX_CYCLE {
                self.set_remaining_node(next_node, dir);
            }
            curr = curr.max(self.remaining[next_node.index()] + weight);
        }
        self.remaining[n.index()] = curr;
    }

    /// Direct dependents of `n` for the scheduling direction.
    fn depending_nodes(&self, n: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let pet_dir = match dir {
            Direction::Forward => PetDirection::Outgoing,
            Direction::Backward => PetDirection::Incoming,
        };
        self.graph.depending_nodes(n, pet_dir)
    }

    /// Whether `n1` is strictly less deep-critical than `n2`.
    ///
    /// Primary key is `remaining`; ties recurse over the dependent sets in
    /// the scheduling direction: an empty dependent set loses, a smaller
    /// set of maximally critical dependents loses, otherwise the most
    /// critical dependents themselves are compared. With the `Random`
    /// heuristic only the primary key counts, leaving equal nodes in
    /// stable source order.
    fn criticality_lessthan(&self, n1: NodeIndex, n2: NodeIndex, dir: Direction) -> bool {
        if n1 == n2 {
            return false;
        }
        if self.remaining[n1.index()] < self.remaining[n2.index()] {
            return true;
        }
        if self.heuristic == Heuristic::Random {
            return false;
        }
        if self.remaining[n1.index()] > self.remaining[n2.index()] {
            return false;
        }

        let mut ln1 = self.depending_nodes(n1, dir);
        let mut ln2 = self.depending_nodes(n2, dir);
        if ln2.is_empty() {
            return false;
        }
        if ln1.is_empty() {
            return true;
        }

        let crit1 = ln1.iter().map(|&d| self.remaining[d.index()]).max().unwrap();
        let crit2 = ln2.iter().map(|&d| self.remaining[d.index()]).max().unwrap();
        if crit1 != crit2 {
            return crit1 < crit2;
        }

        ln1.retain(|&d| self.remaining[d.index()] == crit1);
        ln2.retain(|&d| self.remaining[d.index()] == crit2);
        if ln1.len() != ln2.len() {
            return ln1.len() < ln2.len();
        }

        ln1.sort_by(|&a, &b| {
            if self.criticality_lessthan(a, b, dir) {
                std::cmp::Ordering::Less
            } else if self.criticality_lessthan(b, a, dir) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        ln2.sort_by(|&a, &b| {
            if self.criticality_lessthan(a, b, dir) {
                std::cmp::Ordering::Less
            } else if self.criticality_lessthan(b, a, dir) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        self.criticality_lessthan(*ln1.last().unwrap(), *ln2.last().unwrap(), dir)
    }

    /// Put `n` into the available list, keeping the list ordered from
    /// highest to lowest deep criticality. Its cycle is set to the plain
    /// dependence-rule value so the selection loop can check completion of
    /// its operands against the cycle cursor. Duplicates (from parallel
    /// arcs) are ignored.
    fn make_available(&mut self, n: NodeIndex, avlist: &mut Vec<NodeIndex>, dir: Direction) {
        if avlist.contains(&n) {
            return;
        }
        self.set_cycle_node(n, dir);
        let pos = avlist
            .iter()
            .position(|&m| self.criticality_lessthan(m, n, dir));
        match pos {
            Some(i) => avlist.insert(i, n),
            None => avlist.push(n),
        }
    }

    /// Remove a just-scheduled node from the available list and admit
    /// every dependent whose dependences are now all scheduled.
    fn take_available(
        &mut self,
        n: NodeIndex,
        avlist: &mut Vec<NodeIndex>,
        scheduled: &mut [bool],
        dir: Direction,
    ) {
        scheduled[n.index()] = true;
        avlist.retain(|&m| m != n);

        for dep in self.depending_nodes(n, dir) {
            let ready = match dir {
                Direction::Forward => self
                    .graph
                    .predecessors(dep)
                    .all(|(p, _)| scheduled[p.index()]),
                Direction::Backward => self
                    .graph
                    .successors(dep)
                    .all(|(s, _)| scheduled[s.index()]),
            };
            if ready {
                self.make_available(dep, avlist, dir);
            }
        }
    }

    /// Whether node `n` can be scheduled at the cycle cursor: its operands
    /// have completed and, for gates that occupy resources, the resources
    /// admit it. Sentinels, dummies, classical operations and waits never
    /// consume resources.
    fn immediately_schedulable(
        &self,
        n: NodeIndex,
        dir: Direction,
        curr_cycle: u64,
        state: &State,
        kernel: &Kernel,
        platform: &Platform,
    ) -> bool {
        let deps_done = match dir {
            Direction::Forward => self.cycle[n.index()] <= curr_cycle,
            Direction::Backward => curr_cycle <= self.cycle[n.index()],
        };
        if !deps_done {
            return false;
        }
        match self.node_gate(n, kernel) {
            Some(gate) if gate.uses_resources() => state.available(curr_cycle, gate, platform),
            _ => true,
        }
    }

    fn node_gate<'k>(&self, n: NodeIndex, kernel: &'k Kernel) -> Option<&'k Gate> {
        self.gate_position(n).map(|pos| &kernel.gates[pos])
    }

    /// Pick a node from the available list for the current cycle:
    /// zero-duration nodes first (they must go before the cursor can
    /// advance), then the most deep-critical schedulable node. The list is
    /// already ordered by criticality.
    fn select_available(
        &self,
        avlist: &[NodeIndex],
        dir: Direction,
        curr_cycle: u64,
        state: &State,
        kernel: &Kernel,
        platform: &Platform,
    ) -> Option<NodeIndex> {
        for &n in avlist {
            if self.graph.duration_cycles(n) == 0
                && self.immediately_schedulable(n, dir, curr_cycle, state, kernel, platform)
            {
                return Some(n);
            }
        }
        avlist
            .iter()
            .copied()
            .find(|&n| self.immediately_schedulable(n, dir, curr_cycle, state, kernel, platform))
    }

    /// The resource-constrained list scheduler, both directions.
    fn schedule_rc(&mut self, kernel: &mut Kernel, platform: &Platform, rm: &Manager, dir: Direction) {
        let mut state = rm.build(dir);
        let mut scheduled = vec![false; self.graph.node_count()];
        let mut avlist: Vec<NodeIndex> = vec![];

        self.cycle.fill(MAX_CYCLE);
        self.set_remaining(kernel, dir);

        let mut curr_cycle = match dir {
            Direction::Forward => {
                self.cycle[self.graph.source().index()] = 0;
                avlist.push(self.graph.source());
                0
            }
            Direction::Backward => {
                self.cycle[self.graph.sink().index()] = ALAP_SINK_CYCLE;
                avlist.push(self.graph.sink());
                ALAP_SINK_CYCLE
            }
        };

        while !avlist.is_empty() {
            let selected =
                self.select_available(&avlist, dir, curr_cycle, &state, kernel, platform);
            let Some(n) = selected else {
                // nothing fits this cycle; let running gates complete for
                // one more cycle and retry
                match dir {
                    Direction::Forward => curr_cycle += 1,
                    Direction::Backward => {
                        assert!(
                            curr_cycle > 0,
                            "backward scheduling ran past cycle 0 with {} nodes unscheduled",
                            avlist.len()
                        );
                        curr_cycle -= 1;
                    }
                }
                continue;
            };

            self.cycle[n.index()] = curr_cycle;
            if let Some(gate) = self.node_gate(n, kernel)
                && gate.uses_resources()
            {
                state.reserve(curr_cycle, gate, platform);
            }
            self.take_available(n, &mut avlist, &mut scheduled, dir);
        }

        assert!(
            scheduled.iter().all(|&s| s),
            "available list emptied with unscheduled gates remaining"
        );

        if dir == Direction::Backward {
            self.shift_to_source_zero();
        }
        self.write_back(kernel);
    }

    /// ALAP with uniform bundle sizes, without resource constraints.
    ///
    /// Starts from an ASAP schedule (large bundles at low cycles), then in
    /// a backward scan fills under-populated cycles by pulling eligible
    /// gates up from earlier cycles, without growing the circuit. The
    /// per-cycle target is gates-still-to-go over non-empty-cycles-to-go,
    /// recomputed as the scan progresses.
    pub fn schedule_alap_uniform(&mut self, kernel: &mut Kernel) {
        debug!(kernel = %kernel.name, "scheduling ALAP uniform");
        self.set_cycle(kernel, Direction::Forward);
        let cycle_count = self.cycle[self.graph.sink().index()].saturating_sub(1);
        // remaining is the latest cycle a gate can move to without
        // increasing the circuit's depth
        self.set_remaining(kernel, Direction::Forward);

        let mut gates_per_cycle: rustc_hash::FxHashMap<u64, Vec<NodeIndex>> =
            rustc_hash::FxHashMap::default();
        for idx in 0..kernel.len() {
            let n = self.graph.gate_node(idx);
            gates_per_cycle
                .entry(self.cycle[n.index()])
                .or_default()
                .push(n);
        }

        let mut non_empty_bundle_count = gates_per_cycle.values().filter(|v| !v.is_empty()).count() as u64;
        let mut gate_count = kernel.len() as u64;

        let mut curr_cycle = cycle_count;
        while curr_cycle >= 1 {
            if non_empty_bundle_count == 0 {
                break;
            }
            let mut avg_per_non_empty = gate_count as f64 / non_empty_bundle_count as f64;
            let mut pred_cycle = curr_cycle as i64 - 1;

            while (gates_per_cycle.get(&curr_cycle).map_or(0, Vec::len) as f64) < avg_per_non_empty
                && pred_cycle >= 1
            {
                // scan the earlier bundle for the least critical gate that
                // can move to curr_cycle without breaking anything
                let mut best: Option<(usize, NodeIndex)> = None;
                let mut min_remaining = MAX_CYCLE;
                if let Some(preds) = gates_per_cycle.get(&(pred_cycle as u64)) {
                    for (i, &n) in preds.iter().enumerate() {
                        let completion = curr_cycle + self.graph.duration_cycles(n);
                        // at SINK is ok, later is not
                        if completion > cycle_count + 1 {
                            continue;
                        }
                        if self
                            .graph
                            .successors(n)
                            .any(|(t, _)| completion > self.cycle[t.index()])
                        {
                            continue;
                        }
                        if self.remaining[n.index()] < min_remaining {
                            min_remaining = self.remaining[n.index()];
                            best = Some((i, n));
                        }
                    }
                }

                if let Some((i, n)) = best {
                    let pred_bundle = gates_per_cycle.get_mut(&(pred_cycle as u64)).unwrap();
                    pred_bundle.remove(i);
                    if pred_bundle.is_empty() {
                        non_empty_bundle_count -= 1;
                    }
                    let curr_bundle = gates_per_cycle.entry(curr_cycle).or_default();
                    if curr_bundle.is_empty() {
                        non_empty_bundle_count += 1;
                    }
                    self.cycle[n.index()] = curr_cycle;
                    curr_bundle.push(n);

                    if non_empty_bundle_count == 0 {
                        break;
                    }
                    avg_per_non_empty = gate_count as f64 / non_empty_bundle_count as f64;
                } else {
                    pred_cycle -= 1;
                }
            }

            let curr_len = gates_per_cycle.get(&curr_cycle).map_or(0, Vec::len) as u64;
            if curr_len > 0 {
                if (curr_len as f64) < avg_per_non_empty {
                    debug!(
                        cycle = curr_cycle,
                        size = curr_len,
                        target = avg_per_non_empty,
                        "bundle below uniform target"
                    );
                }
                non_empty_bundle_count -= 1;
            }
            gate_count -= curr_len;
            curr_cycle -= 1;
        }

        self.write_back(kernel);
    }

    /// Copy cycles back into the gate arena, stable-sort by cycle, and
    /// mark the schedule valid. The build-index to position map is updated
    /// so the graph's node-to-gate mapping stays usable after the sort.
    ///
    /// # Panics
    ///
    /// Panics if any gate's cycle is still undefined; scheduling must have
    /// visited every node.
    fn write_back(&mut self, kernel: &mut Kernel) {
        for idx in 0..kernel.len() {
            let n = self.graph.gate_node(idx);
            let cycle = self.cycle[n.index()];
            assert!(
                cycle != MAX_CYCLE,
                "gate '{}' has no cycle after scheduling",
                kernel.gates[self.gate_pos[idx]].qasm()
            );
            kernel.gates[self.gate_pos[idx]].cycle = cycle;
        }

        let mut order: Vec<usize> = (0..kernel.len()).collect();
        order.sort_by_key(|&pos| kernel.gates[pos].cycle);

        let mut slots: Vec<Option<Gate>> = std::mem::take(&mut kernel.gates)
            .into_iter()
            .map(Some)
            .collect();
        kernel.gates = order
            .iter()
            .map(|&pos| slots[pos].take().expect("positions are a permutation"))
            .collect();

        let mut new_pos = vec![0usize; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_pos[old] = new;
        }
        for pos in &mut self.gate_pos {
            *pos = new_pos[*pos];
        }

        kernel.cycles_valid = true;
    }
}
