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

//! Built-in topologies and demand generators, used to quickly set up requests.

use std::sync::Arc;

use clap::ValueEnum;
use rand::{seq::SliceRandom, Rng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    demand::Demand,
    request::{OptimizationRequest, RequestError},
    topology::{ConstantWeigher, LinkWeigher, NodeId, PopCapability, Topology, TopologyError},
    vnf::{Resource, VnfType},
};

/// Which built-in topology to use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ScenarioKind {
    /// Two switches and six PoPs hosting transcoders and intrusion detection, with a single
    /// multicast demand through both.
    #[default]
    EightNode,
    /// A line of nodes, every node except the first one is a PoP.
    Line,
    /// A ring of nodes, every other node is a PoP.
    Ring,
}

impl ScenarioKind {
    /// Build the scenario. `size` is the number of nodes of the line and the ring, and ignored for
    /// the eight-node scenario.
    pub fn build(&self, size: usize) -> Result<Scenario, ScenarioBuildError> {
        match self {
            ScenarioKind::EightNode => Scenario::eight_node(),
            ScenarioKind::Line => Scenario::line(size, 10.0),
            ScenarioKind::Ring => Scenario::ring(size),
        }
    }
}

/// Error thrown while building a scenario
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioBuildError {
    /// The topology could not be built.
    #[error("{0}")]
    Topology(#[from] TopologyError),
    /// The scenario needs more nodes.
    #[error("The scenario needs at least {0} nodes")]
    TooSmall(usize),
}

/// A topology, its link weigher, and a list of demands.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The topology
    topology: Topology,
    /// Bandwidth and delay of all links
    weigher: Arc<dyn LinkWeigher>,
    /// Demands
    demands: Vec<Demand>,
}

impl Scenario {
    /// Create a scenario from its parts.
    pub fn new(topology: Topology, weigher: Arc<dyn LinkWeigher>, demands: Vec<Demand>) -> Self {
        Self {
            topology,
            weigher,
            demands,
        }
    }

    /// The eight-node scenario. Nodes `1` and `2` are switches; `3` to `8` are PoPs hosting
    /// transcoders and intrusion detection with a deployment cost of 5, 8 CPUs, and 8 GB of memory.
    /// Every link has a bandwidth of 10 and a delay of 5. The demand sends a volume of 4 from `1`
    /// to `6` and `8`, through a transcoder and an IDS.
    pub fn eight_node() -> Result<Self, ScenarioBuildError> {
        // (transcoder, ids) acceleration of nodes 3 to 8
        const ACCEL: [(f64, f64); 6] = [
            (1.0, 1.0),
            (0.5, 1.0),
            (1.0, 0.5),
            (1.0, 1.0),
            (0.5, 0.5),
            (1.0, 1.0),
        ];

        let mut t = Topology::new();
        let mut n = vec![t.add_switch("1"), t.add_switch("2")];
        for (i, (tr, ids)) in ACCEL.iter().enumerate() {
            let pop = PopCapability::new()
                .with_vnf(VnfType::Transcoder, 5.0, *tr)
                .with_vnf(VnfType::Ids, 5.0, *ids)
                .with_capacity(Resource::Cpu, 8.0)
                .with_capacity(Resource::Memory, 8.0);
            n.push(t.add_pop((i + 3).to_string(), pop));
        }
        for (a, b) in [
            (1, 2),
            (1, 3),
            (2, 4),
            (3, 4),
            (3, 5),
            (4, 6),
            (5, 6),
            (5, 7),
            (6, 8),
            (7, 8),
        ] {
            t.add_link(n[a - 1], n[b - 1])?;
        }

        let demand = Demand::new(
            n[0],
            [n[5], n[7]],
            [VnfType::Transcoder, VnfType::Ids],
            4.0,
        );
        Ok(Self::new(
            t,
            Arc::new(ConstantWeigher::new(10.0, 5.0)),
            vec![demand],
        ))
    }

    /// A line of `n` nodes, named `0` to `n - 1`, with a single unchained demand from the first to
    /// the last node. Every node except the first is a PoP that can host every VNF type.
    pub fn line(n: usize, bandwidth: f64) -> Result<Self, ScenarioBuildError> {
        if n < 2 {
            return Err(ScenarioBuildError::TooSmall(2));
        }
        let mut t = Topology::new();
        let mut nodes = vec![t.add_switch("0")];
        for i in 1..n {
            nodes.push(t.add_pop(i.to_string(), all_types(1.0)));
        }
        for w in nodes.windows(2) {
            t.add_link(w[0], w[1])?;
        }
        let demand = Demand::unchained(nodes[0], [nodes[n - 1]], 1.0);
        Ok(Self::new(
            t,
            Arc::new(ConstantWeigher::new(bandwidth, 1.0)),
            vec![demand],
        ))
    }

    /// A ring of `n` nodes, named `0` to `n - 1`. Even nodes are PoPs hosting firewalls, NATs and
    /// DPIs. The demand goes from `0` to the opposite node, through a firewall.
    pub fn ring(n: usize) -> Result<Self, ScenarioBuildError> {
        if n < 3 {
            return Err(ScenarioBuildError::TooSmall(3));
        }
        let mut t = Topology::new();
        let nodes: Vec<NodeId> = (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    let pop = PopCapability::new()
                        .with_vnf(VnfType::Firewall, 2.0, 1.0)
                        .with_vnf(VnfType::Nat, 1.0, 1.0)
                        .with_vnf(VnfType::Dpi, 4.0, 0.5)
                        .with_capacity(Resource::Cpu, 4.0);
                    t.add_pop(i.to_string(), pop)
                } else {
                    t.add_switch(i.to_string())
                }
            })
            .collect();
        for i in 0..n {
            t.add_link(nodes[i], nodes[(i + 1) % n])?;
        }
        let demand = Demand::new(nodes[0], [nodes[n / 2]], [VnfType::Firewall], 1.0);
        Ok(Self::new(
            t,
            Arc::new(ConstantWeigher::new(10.0, 2.0)),
            vec![demand],
        ))
    }

    /// The topology
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutable reference to the topology, e.g., to change node capacities.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// The link weigher
    pub fn weigher(&self) -> Arc<dyn LinkWeigher> {
        Arc::clone(&self.weigher)
    }

    /// All demands
    pub fn demands(&self) -> &[Demand] {
        &self.demands
    }

    /// Get a node by its name.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.topology.node_by_name(name)
    }

    /// Replace the demands.
    pub fn with_demands(mut self, demands: Vec<Demand>) -> Self {
        self.demands = demands;
        self
    }

    /// Replace the link weigher.
    pub fn with_weigher(mut self, weigher: Arc<dyn LinkWeigher>) -> Self {
        self.weigher = weigher;
        self
    }

    /// Generate `n` random demands. Each demand has between one and three destinations, a chain
    /// of up to two distinct VNF types that are available in the topology, and a volume between 1
    /// and 3.
    pub fn random_demands<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Demand> {
        let nodes: Vec<NodeId> = self.topology.nodes().into_keys().collect();
        let mut types: Vec<VnfType> = VnfType::ALL
            .into_iter()
            .filter(|ty| {
                self.topology
                    .nodes()
                    .values()
                    .any(|node| node.supports(*ty))
            })
            .collect();
        if nodes.len() < 2 {
            return Vec::new();
        }

        (0..n)
            .map(|_| {
                let ingress = nodes[rng.gen_range(0..nodes.len())];
                let others: Vec<NodeId> = nodes.iter().copied().filter(|v| *v != ingress).collect();
                let num_egress = rng.gen_range(1..=others.len().min(3));
                let egress: Vec<NodeId> = others.choose_multiple(rng, num_egress).copied().collect();
                types.shuffle(rng);
                let len = rng.gen_range(0..=types.len().min(2));
                let volume = rng.gen_range(1..=3) as f64;
                Demand::new(ingress, egress, types[..len].to_vec(), volume)
            })
            .collect()
    }

    /// Build the optimization request.
    pub fn request(&self) -> Result<OptimizationRequest, RequestError> {
        OptimizationRequest::new(&self.topology, self.demands.clone(), self.weigher())
    }
}

/// PoP that can host every VNF type, without acceleration and without resource limits.
fn all_types(cost: f64) -> PopCapability {
    VnfType::ALL
        .into_iter()
        .fold(PopCapability::new(), |pop, ty| pop.with_vnf(ty, cost, 1.0))
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn eight_node() {
        let s = Scenario::eight_node().unwrap();
        assert_eq!(s.topology().num_nodes(), 8);
        assert_eq!(s.topology().edges().len(), 20);
        let request = s.request().unwrap();
        let pops = request.capable_nodes(VnfType::Transcoder);
        assert_eq!(pops.len(), 6);
        assert!(!pops.contains(&s.node("1").unwrap()));
        assert!(!pops.contains(&s.node("2").unwrap()));
        assert_eq!(request.vnf_delay(VnfType::Ids, s.node("7").unwrap()), 20.0);
    }

    #[test]
    fn too_small() {
        assert_eq!(Scenario::line(1, 1.0).err(), Some(ScenarioBuildError::TooSmall(2)));
        assert_eq!(Scenario::ring(2).err(), Some(ScenarioBuildError::TooSmall(3)));
    }

    #[test]
    fn random_demands_are_valid() {
        let s = Scenario::ring(6).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let demands = s.random_demands(20, &mut rng);
        assert_eq!(demands.len(), 20);
        for d in demands.iter() {
            assert!(d.chain().len() <= 2);
            assert!(!d.egress().contains(&d.ingress()));
        }
        s.with_demands(demands).request().unwrap();
    }
}
