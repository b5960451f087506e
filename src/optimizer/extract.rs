// SFC-Tree: Joint placement and multicast routing of service function chains
// Copyright (C) 2023 The SFC-Tree Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Reading back the solution of the engine.
//!
//! Binaries are rounded before they are interpreted. The edges selected for a destination may
//! contain cycles that do not contribute to the objective (for instance, with load balancing only
//! the most utilized link matters). Therefore, the path of each destination is resolved inside the
//! selected edges, and only the edges on that path are reported.

use good_lp::{Solution, Variable};
use petgraph::{algo::astar, graphmap::DiGraphMap};

use crate::{
    request::OptimizationRequest,
    topology::{Edge, NodeId},
};

use super::variables::EdgeVars;

/// Returns `true` if the binary variable is set, after rounding.
pub(crate) fn is_set(solution: &impl Solution, x: Variable) -> bool {
    solution.value(x).round() >= 1.0
}

/// All edges whose usage variable is set.
pub(crate) fn selected_edges(solution: &impl Solution, flow: &EdgeVars) -> Vec<Edge> {
    let mut edges: Vec<Edge> = flow
        .iter()
        .filter(|(_, x)| is_set(solution, **x))
        .map(|(e, _)| *e)
        .collect();
    edges.sort();
    edges
}

/// Resolve the path from `from` to `to` using only the selected edges of `flow`. The path with the
/// smallest delay is chosen. Returns an empty path if `from == to`, and `None` if `to` cannot be
/// reached.
pub(crate) fn resolve_path(
    request: &OptimizationRequest,
    solution: &impl Solution,
    flow: &EdgeVars,
    from: NodeId,
    to: NodeId,
) -> Option<Vec<Edge>> {
    if from == to {
        return Some(Vec::new());
    }
    let graph: DiGraphMap<NodeId, f64> = selected_edges(solution, flow)
        .into_iter()
        .map(|e| (e.src, e.dst, request.delay(e)))
        .collect();
    if !graph.contains_node(from) {
        return None;
    }
    let (_, nodes) = astar(&graph, from, |n| n == to, |(_, _, w)| *w, |_| 0.0)?;
    Some(
        nodes
            .windows(2)
            .map(|w| Edge::new(w[0], w[1]))
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        demand::Demand,
        topology::{ConstantWeigher, Topology},
    };
    use good_lp::{variable, ProblemVariables};
    use std::sync::Arc;

    #[test]
    fn path_ignores_detached_cycles() {
        let mut t = Topology::new();
        let n: Vec<NodeId> = (0..4).map(|i| t.add_switch(i.to_string())).collect();
        t.add_link(n[0], n[1]).unwrap();
        t.add_link(n[1], n[2]).unwrap();
        t.add_link(n[2], n[3]).unwrap();
        let request = OptimizationRequest::new(
            &t,
            vec![Demand::unchained(n[0], [n[1]], 1.0)],
            Arc::new(ConstantWeigher::new(10.0, 1.0)),
        )
        .unwrap();

        let mut vars = ProblemVariables::new();
        let flow: EdgeVars = request
            .edges()
            .iter()
            .map(|e| (*e, vars.add(variable().binary())))
            .collect();
        let set = [
            Edge::new(n[0], n[1]),
            Edge::new(n[2], n[3]),
            Edge::new(n[3], n[2]),
        ];
        let values: HashMap<Variable, f64> = flow
            .iter()
            .map(|(e, x)| (*x, if set.contains(e) { 0.9999 } else { 0.0001 }))
            .collect();

        assert_eq!(
            resolve_path(&request, &values, &flow, n[0], n[1]),
            Some(vec![Edge::new(n[0], n[1])])
        );
        assert_eq!(resolve_path(&request, &values, &flow, n[0], n[3]), None);
        assert_eq!(
            resolve_path(&request, &values, &flow, n[2], n[2]),
            Some(Vec::new())
        );
    }
}
