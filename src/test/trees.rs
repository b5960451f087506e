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

//! Tree-structure strategies on the eight-node scenario.

use std::sync::Arc;

use test_log::test;

use super::{approx, engine, in_degree_at_most_one, EPS};
use crate::{
    demand::Demand,
    goal::OptimizationGoal,
    optimizer::{Optimizer, SolverConfig, TreeKind},
    request::OptimizationRequest,
    scenario::Scenario,
    solution::OptimizationSolution,
    topology::{ConstantWeigher, NodeId, TableWeigher, Topology},
};

fn solve(tree: TreeKind) -> OptimizationSolution {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let config = SolverConfig::default().with_tree(tree);
    let mut solver = Optimizer::new(engine(), config);
    let sol = solver.solve(&request).unwrap().unwrap();
    sol.verify(&request, solver.config()).unwrap();
    sol
}

#[test]
fn per_segment() {
    let sol = solve(TreeKind::PerSegment);
    for segment in sol.demands()[0].segments().unwrap() {
        assert!(in_degree_at_most_one(segment), "{segment:?}");
    }
}

#[test]
fn shared() {
    let sol = solve(TreeKind::Shared);
    let demand = &sol.demands()[0];
    assert!(in_degree_at_most_one(demand.edges()));
    for e in demand.edges() {
        assert!(demand.usage(*e) >= 1);
    }
}

#[test]
fn objective_ordering() {
    let overlay = solve(TreeKind::Overlay).objective();
    let per_segment = solve(TreeKind::PerSegment).objective();
    let shared = solve(TreeKind::Shared).objective();
    assert!(overlay <= per_segment + EPS);
    assert!(per_segment <= shared + EPS);
}

/// Ingress `s` with a near destination `a` (delay 1) and a far destination `b` (delay 10). The
/// detached link `x - y` has a round-trip delay of 9.
fn detour_request() -> (OptimizationRequest, [NodeId; 2]) {
    let mut t = Topology::new();
    let s = t.add_switch("s");
    let a = t.add_switch("a");
    let b = t.add_switch("b");
    let x = t.add_switch("x");
    let y = t.add_switch("y");
    for (u, v) in [(s, a), (s, b), (s, x), (x, y)] {
        t.add_link(u, v).unwrap();
    }
    let mut w = TableWeigher::new(ConstantWeigher::new(10.0, 1.0));
    w.set_link(s, b, 10.0, 10.0)
        .set_link(s, x, 10.0, 100.0)
        .set_link(x, y, 10.0, 4.5);
    let request = OptimizationRequest::new(
        &t,
        vec![Demand::unchained(s, [a, b], 1.0)],
        Arc::new(w),
    )
    .unwrap();
    (request, [a, b])
}

fn solve_detour(tree: TreeKind) -> (OptimizationSolution, [NodeId; 2]) {
    let (request, dests) = detour_request();
    let config = SolverConfig::default()
        .with_goal(OptimizationGoal::MinMaxDelayThenDeviation)
        .with_tree(tree);
    let sol = Optimizer::new(engine(), config)
        .solve(&request)
        .unwrap()
        .unwrap();
    (sol, dests)
}

#[test]
fn overlay_pads_delay_with_cycle() {
    let (sol, [a, b]) = solve_detour(TreeKind::Overlay);
    // the flow towards `a` carries the cycle `x -> y -> x`, so both delays are 10
    assert!(approx(sol.objectives()[0], 10.0));
    assert!(approx(sol.objectives()[1], 0.0));
    let demand = &sol.demands()[0];
    assert!(approx(demand.path(a).unwrap().model_delay().unwrap(), 10.0));
    assert!(approx(demand.delay(a).unwrap(), 1.0));
    assert!(approx(demand.delay(b).unwrap(), 10.0));
}

#[test]
fn trees_forbid_cycles() {
    for tree in [TreeKind::PerSegment, TreeKind::Shared] {
        let (sol, [a, _]) = solve_detour(tree);
        assert!(approx(sol.objectives()[0], 10.0), "{tree}");
        assert!(approx(sol.objectives()[1], 9.0), "{tree}");
        let demand = &sol.demands()[0];
        assert!(approx(demand.path(a).unwrap().model_delay().unwrap(), 1.0), "{tree}");
        assert!(in_degree_at_most_one(demand.edges()));
    }
}
