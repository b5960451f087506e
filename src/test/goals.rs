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

//! Every optimization goal, on the four-node ring (load goals) and the eight-node scenario (delay
//! goals).

use maplit::btreeset;
use test_log::test;

use super::{approx, engine};
use crate::{
    demand::Demand,
    goal::OptimizationGoal,
    optimizer::{Optimizer, SolverConfig},
    request::OptimizationRequest,
    scenario::Scenario,
    solution::OptimizationSolution,
    vnf::VnfType,
};

/// Two unchained demands from `0` to `2` on a ring of four nodes, each with a volume of 4. Every
/// link has a bandwidth of 10.
fn ring_request() -> OptimizationRequest {
    let s = Scenario::ring(4).unwrap();
    let (a, c) = (s.node("0").unwrap(), s.node("2").unwrap());
    s.with_demands(vec![
        Demand::unchained(a, [c], 4.0),
        Demand::unchained(a, [c], 4.0),
    ])
    .request()
    .unwrap()
}

fn solve(request: &OptimizationRequest, goal: OptimizationGoal) -> OptimizationSolution {
    let config = SolverConfig::default().with_goal(goal);
    Optimizer::new(engine(), config)
        .solve(request)
        .unwrap()
        .unwrap()
}

#[test]
fn load_balancing() {
    let sol = solve(&ring_request(), OptimizationGoal::LoadBalancing);
    assert!(approx(sol.objective(), 0.4));
    assert!(approx(sol.max_utilization(), 0.4));
    assert_ne!(sol.demands()[0].edges(), sol.demands()[1].edges());
}

#[test]
fn load_reduction() {
    let sol = solve(&ring_request(), OptimizationGoal::LoadReduction);
    assert!(approx(sol.objective(), 1.6));
    let total: f64 = sol.links().iter().map(|l| l.utilization()).sum();
    assert!(approx(total, 1.6));
}

#[test]
fn balance_then_reduce() {
    let sol = solve(&ring_request(), OptimizationGoal::BalanceThenReduce);
    assert_eq!(sol.objectives().len(), 2);
    assert!(approx(sol.objectives()[0], 0.4));
    assert!(approx(sol.objectives()[1], 1.6));
}

#[test]
fn reduce_then_balance() {
    let sol = solve(&ring_request(), OptimizationGoal::ReduceThenBalance);
    assert_eq!(sol.objectives().len(), 2);
    assert!(approx(sol.objectives()[0], 1.6));
    assert!(approx(sol.objectives()[1], 0.4));
    assert!(approx(sol.max_utilization(), 0.4));
}

#[test]
fn delay_with_deviation() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let sol = solve(&request, OptimizationGoal::DelayReductionWithDeviation);
    assert_eq!(sol.objectives().len(), 2);
    assert!(approx(sol.objectives()[0], 125.0));
    assert!(approx(sol.objectives()[1], 5.0));
    assert!(approx(sol.deviation_sum(), 5.0));
}

#[test]
fn min_max_delay_then_deviation() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let sol = solve(&request, OptimizationGoal::MinMaxDelayThenDeviation);
    // largest delay (65) plus one transcoder and one IDS (10)
    assert!(approx(sol.objectives()[0], 75.0));
    assert!(approx(sol.objectives()[1], 5.0));
    assert!(approx(sol.demands()[0].max_delay(), 65.0));
    assert!(approx(sol.deployment_cost(), 10.0));
}

#[test]
fn shortest_path_tree() {
    let s = Scenario::eight_node().unwrap();
    let request = s.request().unwrap();
    let sol = solve(&request, OptimizationGoal::ShortestPathTree);
    let n7 = s.node("7").unwrap();
    assert!(approx(sol.objective(), 135.0));
    assert!(approx(sol.delay_sum(), 125.0));
    assert!(approx(sol.deployment_cost(), 10.0));
    assert_eq!(sol.nodes_of(VnfType::Transcoder), btreeset! {n7});
    assert_eq!(sol.nodes_of(VnfType::Ids), btreeset! {n7});
}

#[test]
fn deployment_cost_weight() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let config = SolverConfig::default()
        .with_goal(OptimizationGoal::ShortestPathTree)
        .with_alpha(0.0);
    let sol = Optimizer::new(engine(), config)
        .solve(&request)
        .unwrap()
        .unwrap();
    assert!(approx(sol.objective(), 125.0));
}
