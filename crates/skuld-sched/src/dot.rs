//! Graphviz rendering of the dependency graph.

use skuld_ir::Kernel;

use crate::depgraph::DepNode;
use crate::scheduler::Scheduler;

impl Scheduler {
    fn node_label(&self, kernel: &Kernel, n: crate::depgraph::NodeIndex) -> String {
        match self.graph().node(n) {
            DepNode::Source => "SOURCE".into(),
            DepNode::Sink => "SINK".into(),
            DepNode::Gate(_) => {
                let pos = self.gate_position(n).expect("gate node has a position");
                kernel.gates[pos].qasm()
            }
        }
    }

    /// Render the dependency graph as a dot digraph.
    ///
    /// Nodes carry the gate's QASM text and, once a resource-constrained
    /// or uniform run populated them, their criticality (`remaining`)
    /// values. When the kernel holds a valid schedule a cycle timeline is
    /// emitted and nodes are ranked by their cycle.
    pub fn dot(&self, kernel: &Kernel) -> String {
        let graph = self.graph();
        let mut out = String::new();
        out.push_str("digraph {\ngraph [ rankdir=TD; ];\n");
        out.push_str("edge [fontsize=16, arrowhead=vee, arrowsize=0.5];\n");

        for n in graph.nodes() {
            let mut label = self.node_label(kernel, n);
            let remaining = self.remaining(n);
            if remaining != skuld_ir::MAX_CYCLE {
                label.push_str(&format!("\\nremaining: {remaining}"));
            }
            out.push_str(&format!(
                "\"{}\" [label=\" {label} \" fontcolor=black, style=filled, fontsize=16];\n",
                n.index()
            ));
        }

        if kernel.cycles_valid {
            let total_cycles = match kernel.gates.last() {
                // +1 covers SOURCE's single cycle
                Some(last) => {
                    last.cycle + last.duration_in_cycles(kernel.cycle_time)
                        - kernel.gates.first().map_or(0, |g| g.cycle)
                        + 1
                }
                None => 1,
            };
            out.push_str("{\nnode [shape=plaintext, fontsize=16, fontcolor=blue];\n");
            let timeline: Vec<String> = (0..=total_cycles).map(|c| format!("Cycle{c}")).collect();
            out.push_str(&timeline.join(" -> "));
            out.push_str(";\n}\n");

            out.push_str(&format!(
                "{{ rank=same; Cycle0; \"{}\"; }}\n",
                graph.source().index()
            ));
            for n in graph.nodes() {
                if let Some(pos) = self.gate_position(n) {
                    out.push_str(&format!(
                        "{{ rank=same; Cycle{}; \"{}\"; }}\n",
                        kernel.gates[pos].cycle,
                        n.index()
                    ));
                }
            }
        }

        for n in graph.nodes() {
            for (target, edge) in graph.successors(n) {
                out.push_str(&format!(
                    "\"{}\"->\"{}\"[ label=\"{}[{}] , {} , {}\" color=black ]\n",
                    n.index(),
                    target.index(),
                    edge.operand,
                    edge.cause,
                    edge.weight,
                    edge.dep,
                ));
            }
        }

        out.push_str("}\n");
        out
    }
}
