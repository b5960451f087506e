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

//! Optimization requests: an immutable snapshot of the topology together with the demands.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use boolinator::Boolinator;
use clap::ValueEnum;
use petgraph::{algo::dijkstra, graphmap::DiGraphMap};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    demand::Demand,
    topology::{Edge, LinkWeigher, Node, NodeId, Topology},
    vnf::VnfType,
};

/// A single solve call: node set, edge set, demand list and link weigher. The request is validated
/// upon construction. Once built, it cannot be modified.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    /// All nodes
    nodes: BTreeMap<NodeId, Node>,
    /// All directed edges
    edges: BTreeSet<Edge>,
    /// All demands
    demands: Vec<Demand>,
    /// Bandwidth and delay of all edges
    weigher: Arc<dyn LinkWeigher>,
    /// Outgoing edges of each node
    out_edges: BTreeMap<NodeId, Vec<Edge>>,
    /// Incoming edges of each node
    in_edges: BTreeMap<NodeId, Vec<Edge>>,
}

impl OptimizationRequest {
    /// Take a snapshot of the topology and build a request.
    pub fn new(
        topology: &Topology,
        demands: Vec<Demand>,
        weigher: Arc<dyn LinkWeigher>,
    ) -> Result<Self, RequestError> {
        Self::from_parts(topology.nodes(), topology.edges(), demands, weigher)
    }

    /// Build a request from explicit node and edge sets.
    pub fn from_parts(
        nodes: BTreeMap<NodeId, Node>,
        edges: BTreeSet<Edge>,
        demands: Vec<Demand>,
        weigher: Arc<dyn LinkWeigher>,
    ) -> Result<Self, RequestError> {
        let mut out_edges: BTreeMap<NodeId, Vec<Edge>> =
            nodes.keys().map(|n| (*n, Vec::new())).collect();
        let mut in_edges = out_edges.clone();
        for e in edges.iter() {
            out_edges
                .get_mut(&e.src)
                .ok_or(RequestError::UnknownNode(e.src))?
                .push(*e);
            in_edges
                .get_mut(&e.dst)
                .ok_or(RequestError::UnknownNode(e.dst))?
                .push(*e);
        }

        let request = Self {
            nodes,
            edges,
            demands,
            weigher,
            out_edges,
            in_edges,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the links and all demands.
    fn validate(&self) -> Result<(), RequestError> {
        for e in self.edges.iter() {
            let bw = self.bandwidth(*e);
            (bw.is_finite() && bw > 0.0).ok_or(RequestError::InvalidBandwidth(*e, bw))?;
            let delay = self.delay(*e);
            (delay.is_finite() && delay >= 0.0).ok_or(RequestError::InvalidDelay(*e, delay))?;
        }

        let available = self.available_vnf_types();

        for (i, d) in self.demands.iter().enumerate() {
            self.nodes
                .contains_key(&d.ingress())
                .ok_or(RequestError::MissingIngress(i, d.ingress()))?;
            (!d.egress().is_empty()).ok_or(RequestError::EmptyEgress(i))?;
            for e in d.egress() {
                self.nodes
                    .contains_key(e)
                    .ok_or(RequestError::MissingEgress(i, *e))?;
            }
            (!d.egress().contains(&d.ingress()))
                .ok_or(RequestError::IngressIsEgress(i, d.ingress()))?;
            (d.volume().is_finite() && d.volume() > 0.0)
                .ok_or(RequestError::NonPositiveVolume(i, d.volume()))?;
            for ty in d.chain() {
                available
                    .contains(ty)
                    .ok_or(RequestError::UnavailableVnf(i, *ty))?;
            }
            (d.chain().len() <= available.len()).ok_or(RequestError::ChainTooLong {
                demand: i,
                len: d.chain().len(),
                available: available.len(),
            })?;
        }

        Ok(())
    }

    /// Set of VNF types that at least one node can host.
    pub fn available_vnf_types(&self) -> BTreeSet<VnfType> {
        self.nodes
            .values()
            .filter_map(Node::capability)
            .flat_map(|c| c.vnf_types())
            .collect()
    }

    /// All nodes of the request
    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    /// Get a specific node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All node ids, in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// All directed edges
    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Outgoing edges of a node
    pub fn out_edges(&self, node: NodeId) -> &[Edge] {
        self.out_edges
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Incoming edges of a node
    pub fn in_edges(&self, node: NodeId) -> &[Edge] {
        self.in_edges
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All demands
    pub fn demands(&self) -> &[Demand] {
        &self.demands
    }

    /// The link weigher
    pub fn weigher(&self) -> &dyn LinkWeigher {
        self.weigher.as_ref()
    }

    /// Bandwidth of an edge
    pub fn bandwidth(&self, edge: Edge) -> f64 {
        self.weigher.bandwidth(edge)
    }

    /// Delay of an edge
    pub fn delay(&self, edge: Edge) -> f64 {
        self.weigher.delay(edge)
    }

    /// Nodes that can host `ty`.
    pub fn capable_nodes(&self, ty: VnfType) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.supports(ty))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Processing delay of `ty` on `node`, including the acceleration factor.
    pub fn vnf_delay(&self, ty: VnfType, node: NodeId) -> f64 {
        let accel = self
            .nodes
            .get(&node)
            .map(|n| n.accel_factor(ty))
            .unwrap_or(1.0);
        ty.base_delay() * accel
    }

    /// Group the edges into links that share a bandwidth, according to the link model.
    pub fn links(&self, model: LinkModel) -> Vec<Link> {
        match model {
            LinkModel::Directed => self
                .edges
                .iter()
                .map(|e| Link {
                    key: *e,
                    members: vec![*e],
                    bandwidth: self.bandwidth(*e),
                })
                .collect(),
            LinkModel::SharedDuplex => self
                .edges
                .iter()
                .filter(|e| e.src < e.dst || !self.edges.contains(&e.reverse()))
                .map(|e| Link {
                    key: *e,
                    members: if self.edges.contains(&e.reverse()) {
                        vec![*e, e.reverse()]
                    } else {
                        vec![*e]
                    },
                    bandwidth: self.bandwidth(*e),
                })
                .collect(),
        }
    }

    /// Shortest link delay from `source` to every reachable node.
    pub fn delays_from(&self, source: NodeId) -> HashMap<NodeId, f64> {
        let graph: DiGraphMap<NodeId, f64> = self
            .edges
            .iter()
            .map(|e| (e.src, e.dst, self.delay(*e)))
            .collect();
        if !graph.contains_node(source) {
            return HashMap::from([(source, 0.0)]);
        }
        dijkstra(&graph, source, None, |(_, _, w)| *w)
    }

    /// Deployment cost of `ty` on `node`. Nodes that cannot host `ty` have zero cost.
    pub fn deployment_cost(&self, ty: VnfType, node: NodeId) -> f64 {
        self.nodes
            .get(&node)
            .and_then(Node::capability)
            .and_then(|c| c.deployment_cost(ty))
            .unwrap_or(0.0)
    }
}

/// How the bandwidth of the two directions of a physical link is accounted for.
///
/// Some formulations assume that the return direction of a link costs the same as the forward
/// direction. This is made explicit here instead of being hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum LinkModel {
    /// Each direction has its own bandwidth.
    #[default]
    Directed,
    /// Both directions share the bandwidth of the direction pointing from the lower to the higher
    /// node id.
    SharedDuplex,
}

/// A set of directed edges that share one bandwidth.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Edge identifying the link
    pub key: Edge,
    /// All directed edges sharing the bandwidth
    pub members: Vec<Edge>,
    /// Shared bandwidth
    pub bandwidth: f64,
}

/// Precondition violation of an optimization request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// An edge references a node that is not part of the node set.
    #[error("Edge references the unknown node {0:?}")]
    UnknownNode(NodeId),
    /// An edge has no positive bandwidth.
    #[error("Edge {0} has the invalid bandwidth {1}")]
    InvalidBandwidth(Edge, f64),
    /// An edge has a negative delay.
    #[error("Edge {0} has the invalid delay {1}")]
    InvalidDelay(Edge, f64),
    /// Ingress of a demand is not part of the node set.
    #[error("Ingress {1:?} of demand {0} is not part of the topology")]
    MissingIngress(usize, NodeId),
    /// An egress of a demand is not part of the node set.
    #[error("Egress {1:?} of demand {0} is not part of the topology")]
    MissingEgress(usize, NodeId),
    /// The egress set of a demand is empty.
    #[error("Demand {0} has no egress node")]
    EmptyEgress(usize),
    /// The ingress is also part of the egress set.
    #[error("Ingress {1:?} of demand {0} is also an egress")]
    IngressIsEgress(usize, NodeId),
    /// The demand volume is zero or negative.
    #[error("Demand {0} has the non-positive volume {1}")]
    NonPositiveVolume(usize, f64),
    /// No node can host a VNF of the chain.
    #[error("No node can host {1}, required by demand {0}")]
    UnavailableVnf(usize, VnfType),
    /// The chain is longer than the number of distinct VNF types available.
    #[error("Chain of demand {demand} has length {len}, but only {available} VNF types exist")]
    ChainTooLong {
        /// Index of the demand
        demand: usize,
        /// Length of the chain
        len: usize,
        /// Number of distinct VNF types available
        available: usize,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::topology::{ConstantWeigher, PopCapability};

    fn topo() -> (Topology, Vec<NodeId>) {
        let mut t = Topology::new();
        let a = t.add_switch("a");
        let b = t.add_pop("b", PopCapability::new().with_vnf(VnfType::Ids, 1.0, 1.0));
        let c = t.add_switch("c");
        t.add_link(a, b).unwrap();
        t.add_link(b, c).unwrap();
        (t, vec![a, b, c])
    }

    fn request(demands: Vec<Demand>) -> Result<OptimizationRequest, RequestError> {
        let (t, _) = topo();
        OptimizationRequest::new(&t, demands, Arc::new(ConstantWeigher::new(10.0, 1.0)))
    }

    #[test]
    fn valid_request() {
        let (_, n) = topo();
        let r = request(vec![Demand::new(n[0], [n[2]], [VnfType::Ids], 1.0)]).unwrap();
        assert_eq!(r.num_nodes(), 3);
        assert_eq!(r.edges().len(), 4);
        assert_eq!(r.out_edges(n[1]).len(), 2);
        assert_eq!(r.in_edges(n[0]), &[Edge::new(n[1], n[0])]);
        assert_eq!(r.capable_nodes(VnfType::Ids), vec![n[1]]);
        assert_eq!(r.vnf_delay(VnfType::Ids, n[1]), 40.0);
    }

    #[test]
    fn invalid_demands() {
        let (_, n) = topo();
        let unknown = NodeId::new(42);
        assert_eq!(
            request(vec![Demand::unchained(unknown, [n[2]], 1.0)]).unwrap_err(),
            RequestError::MissingIngress(0, unknown)
        );
        assert_eq!(
            request(vec![Demand::unchained(n[0], [n[2], unknown], 1.0)]).unwrap_err(),
            RequestError::MissingEgress(0, unknown)
        );
        assert_eq!(
            request(vec![Demand::unchained(n[0], Vec::<NodeId>::new(), 1.0)]).unwrap_err(),
            RequestError::EmptyEgress(0)
        );
        assert_eq!(
            request(vec![Demand::unchained(n[0], [n[0], n[2]], 1.0)]).unwrap_err(),
            RequestError::IngressIsEgress(0, n[0])
        );
        assert_eq!(
            request(vec![Demand::unchained(n[0], [n[2]], 0.0)]).unwrap_err(),
            RequestError::NonPositiveVolume(0, 0.0)
        );
        assert_eq!(
            request(vec![Demand::new(n[0], [n[2]], [VnfType::Nat], 1.0)]).unwrap_err(),
            RequestError::UnavailableVnf(0, VnfType::Nat)
        );
        assert_eq!(
            request(vec![Demand::new(n[0], [n[2]], [VnfType::Ids, VnfType::Ids], 1.0)])
                .unwrap_err(),
            RequestError::ChainTooLong {
                demand: 0,
                len: 2,
                available: 1
            }
        );
    }

    #[test]
    fn unknown_edge_endpoint() {
        let (t, n) = topo();
        let mut edges = t.edges();
        edges.insert(Edge::new(n[0], NodeId::new(9)));
        let err = OptimizationRequest::from_parts(
            t.nodes(),
            edges,
            vec![],
            Arc::new(ConstantWeigher::new(1.0, 1.0)),
        )
        .unwrap_err();
        assert_eq!(err, RequestError::UnknownNode(NodeId::new(9)));
    }

    #[test]
    fn link_models() {
        let (_, n) = topo();
        let r = request(vec![]).unwrap();
        assert_eq!(r.links(LinkModel::Directed).len(), 4);
        let duplex = r.links(LinkModel::SharedDuplex);
        assert_eq!(duplex.len(), 2);
        assert_eq!(duplex[0].key, Edge::new(n[0], n[1]));
        assert_eq!(
            duplex[0].members,
            vec![Edge::new(n[0], n[1]), Edge::new(n[1], n[0])]
        );
        assert_eq!(duplex[0].bandwidth, 10.0);
    }

    #[test]
    fn shortest_delays() {
        let (_, n) = topo();
        let r = request(vec![]).unwrap();
        let delays = r.delays_from(n[0]);
        assert_eq!(delays[&n[0]], 0.0);
        assert_eq!(delays[&n[1]], 1.0);
        assert_eq!(delays[&n[2]], 2.0);
    }

    #[test]
    fn invalid_bandwidth() {
        let (t, _) = topo();
        let err = OptimizationRequest::new(&t, vec![], Arc::new(ConstantWeigher::new(0.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidBandwidth(_, _)));
    }
}
