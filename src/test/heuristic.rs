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

//! Fixed-placement heuristic on the eight-node scenario with a single transcoder.

use maplit::btreeset;
use test_log::test;

use super::{approx, engine};
use crate::{
    demand::Demand,
    heuristic::FixedPlacement,
    optimizer::{ConfigError, SolverConfig, SolverError},
    scenario::Scenario,
    vnf::VnfType,
};

/// Eight-node scenario whose demand only traverses a transcoder.
fn single_vnf(chain: &[VnfType]) -> Scenario {
    let s = Scenario::eight_node().unwrap();
    let ingress = s.node("1").unwrap();
    let egress = [s.node("6").unwrap(), s.node("8").unwrap()];
    let demand = Demand::new(ingress, egress, chain.iter().copied(), 4.0);
    s.with_demands(vec![demand])
}

#[test]
fn placement() {
    let s = single_vnf(&[VnfType::Transcoder]);
    let request = s.request().unwrap();
    let heuristic = FixedPlacement::new(engine(), SolverConfig::default());
    // 1 -> 6 (15), then 6 -> 8 (5)
    assert_eq!(
        heuristic.placement(&request).unwrap(),
        Some((VnfType::Transcoder, s.node("6").unwrap()))
    );
}

#[test]
fn solve() {
    let s = single_vnf(&[VnfType::Transcoder]);
    let request = s.request().unwrap();
    let n6 = s.node("6").unwrap();
    let sol = FixedPlacement::new(engine(), SolverConfig::default())
        .solve(&request)
        .unwrap()
        .unwrap();
    pretty_assertions_sorted::assert_eq!(sol.nodes_of(VnfType::Transcoder), btreeset! {n6});
    let demand = &sol.demands()[0];
    assert!(approx(demand.delay(n6).unwrap(), 55.0));
    assert!(approx(demand.delay(s.node("8").unwrap()).unwrap(), 60.0));
}

#[test]
fn wrong_chain_length() {
    let request = single_vnf(&[VnfType::Transcoder, VnfType::Ids])
        .request()
        .unwrap();
    let heuristic = FixedPlacement::new(engine(), SolverConfig::default());
    assert_eq!(
        heuristic.placement(&request),
        Err(ConfigError::ChainLength {
            expected: 1,
            found: 2
        })
    );
}

#[test]
fn wrong_number_of_demands() {
    let s = single_vnf(&[VnfType::Transcoder]);
    let mut demands = s.demands().to_vec();
    demands.push(demands[0].clone());
    let request = s.with_demands(demands).request().unwrap();
    let engine = engine();
    let result = FixedPlacement::new(engine.clone(), SolverConfig::default()).solve(&request);
    assert!(matches!(
        result,
        Err(SolverError::Config(ConfigError::DemandCardinality {
            expected: 1,
            found: 2
        }))
    ));
    assert_eq!(engine.num_solves(), 0);
}
