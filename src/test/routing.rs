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

//! Routing without VNFs, capacity, and infeasibility.

use test_log::test;

use super::{approx, engine};
use crate::{
    demand::Demand,
    optimizer::{
        solve_all, ConfigError, LinkModel, NoChainSolver, Optimizer, SolverConfig, SolverError,
        SolverState,
    },
    scenario::Scenario,
    topology::Edge,
    vnf::VnfType,
};

#[test]
fn route_on_a_line() {
    let s = Scenario::line(4, 10.0).unwrap();
    let request = s.request().unwrap();
    let n: Vec<_> = (0..4).map(|i| s.node(&i.to_string()).unwrap()).collect();
    let sol = NoChainSolver::new(engine(), SolverConfig::default())
        .solve(&request)
        .unwrap()
        .unwrap();
    let demand = &sol.demands()[0];
    assert_eq!(demand.segments(), None);
    assert_eq!(
        demand.edges().iter().copied().collect::<Vec<_>>(),
        vec![
            Edge::new(n[0], n[1]),
            Edge::new(n[1], n[2]),
            Edge::new(n[2], n[3])
        ]
    );
    assert!(approx(demand.delay(n[3]).unwrap(), 3.0));
    assert!(sol.placement().is_empty());
}

#[test]
fn no_chain_solver_rejects_chains() {
    let s = Scenario::ring(4).unwrap();
    let request = s.request().unwrap();
    let engine = engine();
    let result = NoChainSolver::new(engine.clone(), SolverConfig::default()).solve(&request);
    assert!(matches!(
        result,
        Err(SolverError::Config(ConfigError::ChainedDemand(0)))
    ));
    assert_eq!(engine.num_solves(), 0);
}

#[test]
fn infeasible_on_single_edge() {
    let s = Scenario::line(2, 5.0).unwrap();
    let (a, b) = (s.node("0").unwrap(), s.node("1").unwrap());
    let request = s
        .with_demands(vec![Demand::unchained(a, [b], 10.0)])
        .request()
        .unwrap();
    let engine = engine();
    let mut solver = Optimizer::new(engine.clone(), SolverConfig::default());
    assert_eq!(solver.solve(&request).unwrap(), None);
    assert_eq!(solver.state(), SolverState::Optimize);
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn chained_and_unchained_share_capacity() {
    let build = |bandwidth: f64| {
        let s = Scenario::line(3, bandwidth).unwrap();
        let (a, c) = (s.node("0").unwrap(), s.node("2").unwrap());
        s.with_demands(vec![
            Demand::unchained(a, [c], 3.0),
            Demand::new(a, [c], [VnfType::Nat], 3.0),
        ])
        .request()
        .unwrap()
    };

    let mut solver = Optimizer::new(engine(), SolverConfig::default());
    assert_eq!(solver.solve(&build(5.0)).unwrap(), None);

    let sol = solver.solve(&build(6.0)).unwrap().unwrap();
    assert_eq!(sol.demands().len(), 2);
    assert!(sol.demands()[0].segments().is_none());
    assert_eq!(sol.demands()[1].segments().map(|s| s.len()), Some(2));
    assert_eq!(sol.nodes_of(VnfType::Nat).len(), 1);
    assert!(sol.links().iter().all(|l| l.load <= 6.0 + 1e-6));
}

#[test]
fn shared_duplex_links() {
    let s = Scenario::line(2, 5.0).unwrap();
    let (a, b) = (s.node("0").unwrap(), s.node("1").unwrap());
    let request = s
        .with_demands(vec![
            Demand::unchained(a, [b], 3.0),
            Demand::unchained(b, [a], 3.0),
        ])
        .request()
        .unwrap();

    let engine = engine();
    let directed = SolverConfig::default();
    let duplex = SolverConfig::default().with_link_model(LinkModel::SharedDuplex);
    let sol = Optimizer::new(engine.clone(), directed)
        .solve(&request)
        .unwrap()
        .unwrap();
    assert_eq!(sol.links().len(), 2);
    assert_eq!(
        Optimizer::new(engine, duplex).solve(&request).unwrap(),
        None
    );
}

#[test]
fn load_ceiling() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let engine = engine();

    let tight = SolverConfig::default().with_load_ceiling(0.1);
    assert_eq!(
        Optimizer::new(engine.clone(), tight)
            .solve(&request)
            .unwrap(),
        None
    );

    let loose = SolverConfig::default().with_load_ceiling(100.0);
    assert!(Optimizer::new(engine.clone(), loose)
        .solve(&request)
        .unwrap()
        .is_some());

    let invalid = SolverConfig::default().with_load_ceiling(-1.0);
    assert!(matches!(
        Optimizer::new(engine, invalid).solve(&request),
        Err(SolverError::Config(ConfigError::InvalidLoadCeiling(_)))
    ));
}

#[test]
fn batch() {
    let feasible = Scenario::eight_node().unwrap().request().unwrap();
    let s = Scenario::line(2, 5.0).unwrap();
    let (a, b) = (s.node("0").unwrap(), s.node("1").unwrap());
    let infeasible = s
        .with_demands(vec![Demand::unchained(a, [b], 10.0)])
        .request()
        .unwrap();

    let engine = engine();
    let results = solve_all(
        &engine,
        &SolverConfig::default(),
        &[feasible, infeasible.clone(), infeasible],
    );
    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], Ok(Some(_))));
    assert!(matches!(results[1], Ok(None)));
    assert!(matches!(results[2], Ok(None)));
    assert_eq!(engine.active_sessions(), 0);
    assert_eq!(engine.num_solves(), 3);
}
