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

//! Joint placement and routing on the eight-node scenario: ingress `1`, destinations `6` and `8`,
//! chain `[TRANSCODER, IDS]`, volume 4, bandwidth 10 and delay 5 on every link.

use maplit::btreeset;
use test_log::test;

use super::{approx, engine};
use crate::{
    engine::{EngineConfig, EngineContext},
    optimizer::{Optimizer, SolverConfig, SolverState},
    scenario::Scenario,
    vnf::{Resource, VnfType},
};

#[test]
fn feasible_with_placement_on_pops() {
    let s = Scenario::eight_node().unwrap();
    let request = s.request().unwrap();
    let mut solver = Optimizer::new(engine(), SolverConfig::default());
    let sol = solver.solve(&request).unwrap().unwrap();
    assert_eq!(solver.state(), SolverState::Done);

    let switches = [s.node("1").unwrap(), s.node("2").unwrap()];
    for ty in [VnfType::Transcoder, VnfType::Ids] {
        let nodes = sol.nodes_of(ty);
        assert!(!nodes.is_empty());
        for v in nodes {
            assert!(!switches.contains(&v));
            assert!(request.node(v).unwrap().supports(ty));
        }
    }

    for link in sol.links() {
        assert!(link.load <= 10.0 + 1e-6, "{link:?}");
    }

    let demand = &sol.demands()[0];
    assert_eq!(demand.segments().map(|s| s.len()), Some(3));
    for d in [s.node("6").unwrap(), s.node("8").unwrap()] {
        let path = demand.path(d).unwrap();
        let (t, i) = (path.placement()[0], path.placement()[1]);
        assert_eq!(t.0, VnfType::Transcoder);
        assert_eq!(i.0, VnfType::Ids);
        let accel_t = request.node(t.1).unwrap().accel_factor(VnfType::Transcoder);
        let accel_i = request.node(i.1).unwrap().accel_factor(VnfType::Ids);
        let expected = 5.0 * path.num_hops() as f64 + 40.0 * accel_t + 40.0 * accel_i;
        assert!(approx(path.delay(), expected), "{path}");
    }
}

#[test]
fn optimal_delay() {
    let s = Scenario::eight_node().unwrap();
    let request = s.request().unwrap();
    let sol = Optimizer::new(engine(), SolverConfig::default())
        .solve(&request)
        .unwrap()
        .unwrap();

    // towards 6: five hops, accelerated transcoder and IDS (65)
    // towards 8: 1 -> 3 -> 5 -> 7 -> 8, both accelerated on 7 (60)
    let demand = &sol.demands()[0];
    assert!(approx(demand.delay(s.node("6").unwrap()).unwrap(), 65.0));
    assert!(approx(demand.delay(s.node("8").unwrap()).unwrap(), 60.0));
    assert!(approx(sol.objective(), 125.0));
    assert!(approx(sol.delay_sum(), 125.0));
    for path in demand.paths().values() {
        assert!(approx(path.model_delay().unwrap(), path.delay()), "{path}");
    }
}

#[test]
fn cpu_limit_splits_placement() {
    let mut s = Scenario::eight_node().unwrap();
    let n7 = s.node("7").unwrap();
    // a transcoder (4) and an IDS (2) no longer fit on node 7
    s.topology_mut().set_capacity(n7, Resource::Cpu, 5.0).unwrap();
    let request = s.request().unwrap();
    let config = SolverConfig::default();
    let sol = Optimizer::new(engine(), config.clone())
        .solve(&request)
        .unwrap()
        .unwrap();
    sol.verify(&request, &config).unwrap();

    let on_7: Vec<VnfType> = sol
        .placement()
        .iter()
        .filter(|(_, nodes)| nodes.contains(&n7))
        .map(|(ty, _)| *ty)
        .collect();
    assert!(on_7.len() <= 1, "{on_7:?}");

    // towards 8: both accelerated instances on 7 are no longer possible (70 instead of 60)
    let demand = &sol.demands()[0];
    assert!(approx(demand.delay(s.node("6").unwrap()).unwrap(), 65.0));
    assert!(approx(demand.delay(s.node("8").unwrap()).unwrap(), 70.0));
    assert!(approx(sol.objective(), 135.0));
}

#[test]
fn same_objective_twice() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let engine = engine();
    let mut solver = Optimizer::new(engine.clone(), SolverConfig::default());
    let a = solver.solve(&request).unwrap().unwrap();
    let b = solver.solve(&request).unwrap().unwrap();
    assert!(approx(a.objective(), b.objective()));
    assert_eq!(engine.num_solves(), 2);
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn pinned_placement() {
    let s = Scenario::eight_node().unwrap();
    let request = s.request().unwrap();
    let n3 = s.node("3").unwrap();
    let config = SolverConfig::default().pin(VnfType::Transcoder, n3);
    let sol = Optimizer::new(engine(), config)
        .solve(&request)
        .unwrap()
        .unwrap();
    pretty_assertions_sorted::assert_eq!(sol.nodes_of(VnfType::Transcoder), btreeset! {n3});
}

#[test]
fn pin_on_switch_is_rejected() {
    let s = Scenario::eight_node().unwrap();
    let request = s.request().unwrap();
    let engine = engine();
    let config = SolverConfig::default().pin(VnfType::Ids, s.node("1").unwrap());
    let mut solver = Optimizer::new(engine.clone(), config);
    assert!(matches!(
        solver.solve(&request),
        Err(crate::optimizer::SolverError::Config(
            crate::optimizer::ConfigError::InvalidPin(VnfType::Ids, _)
        ))
    ));
    assert_eq!(solver.state(), SolverState::Init);
    assert_eq!(engine.active_sessions(), 0);
}

#[test]
fn exclusive_engine() {
    let request = Scenario::eight_node().unwrap().request().unwrap();
    let engine = EngineContext::new(EngineConfig::default().quiet().exclusive());
    let mut solver = Optimizer::new(engine.clone(), SolverConfig::default());
    assert!(solver.solve(&request).unwrap().is_some());
    assert!(solver.solve(&request).unwrap().is_some());
    assert_eq!(engine.active_sessions(), 0);
    let size = solver.problem_size().unwrap();
    assert_eq!(size.priorities, 1);
    assert!(size.rows > 0 && size.cols > 0);
}
