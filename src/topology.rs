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

//! Physical topology: nodes (optionally points of presence), directed links and the link weigher
//! that assigns bandwidth and delay to every link.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::{
    prelude::*,
    visit::{EdgeRef, IntoNodeReferences},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vnf::{Resource, VnfType};

/// Index type used for the topology graph
pub(crate) type IndexType = u32;
/// Node identification (and index into the topology graph)
pub type NodeId = NodeIndex<IndexType>;

/// Capabilities of a point of presence, i.e., a node that can host VNF instances.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PopCapability {
    /// Cost of deploying an instance of the given type on this node.
    deployment_cost: BTreeMap<VnfType, f64>,
    /// Hardware acceleration factor of the given type. `1.0` means no acceleration.
    accel_factor: BTreeMap<VnfType, f64>,
    /// Capacity for each resource kind.
    capacity: BTreeMap<Resource, f64>,
}

impl PopCapability {
    /// Create a point of presence that cannot host anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the PoP to host `ty` with the given deployment cost and acceleration factor.
    pub fn with_vnf(mut self, ty: VnfType, deployment_cost: f64, accel_factor: f64) -> Self {
        self.deployment_cost.insert(ty, deployment_cost);
        self.accel_factor.insert(ty, accel_factor);
        self
    }

    /// Set the capacity of `resource`. Resources without capacity are not limited.
    pub fn with_capacity(mut self, resource: Resource, capacity: f64) -> Self {
        self.capacity.insert(resource, capacity);
        self
    }

    /// Returns `true` if the PoP can host an instance of `ty`.
    pub fn supports(&self, ty: VnfType) -> bool {
        self.deployment_cost.contains_key(&ty)
    }

    /// Iterator over all VNF types this PoP can host.
    pub fn vnf_types(&self) -> impl Iterator<Item = VnfType> + '_ {
        self.deployment_cost.keys().copied()
    }

    /// Deployment cost of `ty`, or `None` if the PoP cannot host `ty`.
    pub fn deployment_cost(&self, ty: VnfType) -> Option<f64> {
        self.deployment_cost.get(&ty).copied()
    }

    /// Acceleration factor of `ty` on this PoP.
    pub fn accel_factor(&self, ty: VnfType) -> f64 {
        self.accel_factor.get(&ty).copied().unwrap_or(1.0)
    }

    /// Capacity of `resource`, or `None` if the resource is not limited.
    pub fn capacity(&self, resource: Resource) -> Option<f64> {
        self.capacity.get(&resource).copied()
    }
}

/// A physical switch in the topology.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Node {
    /// Human readable name
    name: String,
    /// PoP capability, `None` for plain switches.
    pop: Option<PopCapability>,
}

impl Node {
    /// Create a plain switch that cannot host any VNF.
    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pop: None,
        }
    }

    /// Create a point of presence.
    pub fn pop(name: impl Into<String>, capability: PopCapability) -> Self {
        Self {
            name: name.into(),
            pop: Some(capability),
        }
    }

    /// Name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// PoP capability of the node, if any.
    pub fn capability(&self) -> Option<&PopCapability> {
        self.pop.as_ref()
    }

    /// Returns `true` if the node can host an instance of `ty`.
    pub fn supports(&self, ty: VnfType) -> bool {
        self.pop.as_ref().map(|p| p.supports(ty)).unwrap_or(false)
    }

    /// Acceleration factor of `ty` on this node. Nodes that cannot host `ty` report `1.0`.
    pub fn accel_factor(&self, ty: VnfType) -> f64 {
        self.pop.as_ref().map(|p| p.accel_factor(ty)).unwrap_or(1.0)
    }
}

/// A directed physical link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Edge {
    /// Source of the link
    pub src: NodeId,
    /// Destination of the link
    pub dst: NodeId,
}

impl Edge {
    /// Create a new directed edge.
    pub fn new(src: NodeId, dst: NodeId) -> Self {
        Self { src, dst }
    }

    /// The same link in the opposite direction.
    pub fn reverse(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.src.index(), self.dst.index())
    }
}

/// Cost model of the links. Both functions must be pure functions of the edge.
pub trait LinkWeigher: std::fmt::Debug + Send + Sync {
    /// Bandwidth of the link.
    fn bandwidth(&self, edge: Edge) -> f64;
    /// Propagation delay of the link.
    fn delay(&self, edge: Edge) -> f64;
}

/// Link weigher that assigns the same bandwidth and delay to every link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantWeigher {
    /// Bandwidth of every link
    pub bandwidth: f64,
    /// Delay of every link
    pub delay: f64,
}

impl ConstantWeigher {
    /// Create a new constant link weigher
    pub fn new(bandwidth: f64, delay: f64) -> Self {
        Self { bandwidth, delay }
    }
}

impl LinkWeigher for ConstantWeigher {
    fn bandwidth(&self, _: Edge) -> f64 {
        self.bandwidth
    }

    fn delay(&self, _: Edge) -> f64 {
        self.delay
    }
}

/// Link weigher with explicit values per link, and a fallback for all other links.
#[derive(Debug, Clone, PartialEq)]
pub struct TableWeigher {
    /// Bandwidth and delay per link
    links: HashMap<Edge, (f64, f64)>,
    /// Fallback for links not in the table
    fallback: ConstantWeigher,
}

impl TableWeigher {
    /// Create a table weigher where all links use the `fallback` values.
    pub fn new(fallback: ConstantWeigher) -> Self {
        Self {
            links: HashMap::new(),
            fallback,
        }
    }

    /// Set the bandwidth and delay of a single directed link.
    pub fn set(&mut self, edge: Edge, bandwidth: f64, delay: f64) -> &mut Self {
        self.links.insert(edge, (bandwidth, delay));
        self
    }

    /// Set the bandwidth and delay of both directions of a link.
    pub fn set_link(&mut self, a: NodeId, b: NodeId, bandwidth: f64, delay: f64) -> &mut Self {
        self.set(Edge::new(a, b), bandwidth, delay);
        self.set(Edge::new(b, a), bandwidth, delay)
    }
}

impl LinkWeigher for TableWeigher {
    fn bandwidth(&self, edge: Edge) -> f64 {
        self.links
            .get(&edge)
            .map(|(bw, _)| *bw)
            .unwrap_or(self.fallback.bandwidth)
    }

    fn delay(&self, edge: Edge) -> f64 {
        self.links
            .get(&edge)
            .map(|(_, d)| *d)
            .unwrap_or(self.fallback.delay)
    }
}

/// Error when building a topology
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// The node does not exist in the topology
    #[error("Node {0:?} does not exist in the topology")]
    UnknownNode(NodeId),
    /// Links from a node to itself are not allowed
    #[error("Cannot add a link from {0:?} to itself")]
    SelfLoop(NodeId),
    /// The node is a plain switch, but a PoP is required
    #[error("Node {0:?} is not a point of presence")]
    NotAPop(NodeId),
}

/// Physical topology, from which optimization requests take their snapshot.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// The directed graph of switches and links
    graph: DiGraph<Node, (), IndexType>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the topology.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.graph.add_node(node)
    }

    /// Add a plain switch.
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(Node::switch(name))
    }

    /// Add a point of presence.
    pub fn add_pop(&mut self, name: impl Into<String>, capability: PopCapability) -> NodeId {
        self.add_node(Node::pop(name, capability))
    }

    /// Add a single directed link. Adding an existing link does nothing.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> Result<Edge, TopologyError> {
        for n in [src, dst] {
            if self.graph.node_weight(n).is_none() {
                return Err(TopologyError::UnknownNode(n));
            }
        }
        if src == dst {
            return Err(TopologyError::SelfLoop(src));
        }
        if self.graph.find_edge(src, dst).is_none() {
            self.graph.add_edge(src, dst, ());
        }
        Ok(Edge::new(src, dst))
    }

    /// Add a link in both directions.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) -> Result<(), TopologyError> {
        self.add_edge(a, b)?;
        self.add_edge(b, a)?;
        Ok(())
    }

    /// Get a node of the topology.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id)
    }

    /// Change the capacity of a PoP for a single resource.
    pub fn set_capacity(
        &mut self,
        id: NodeId,
        resource: Resource,
        capacity: f64,
    ) -> Result<(), TopologyError> {
        let node = self
            .graph
            .node_weight_mut(id)
            .ok_or(TopologyError::UnknownNode(id))?;
        let pop = node.pop.take().ok_or(TopologyError::NotAPop(id))?;
        node.pop = Some(pop.with_capacity(resource, capacity));
        Ok(())
    }

    /// Get a node by its name.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.graph
            .node_references()
            .find(|(_, n)| n.name() == name)
            .map(|(id, _)| id)
    }

    /// All nodes of the topology.
    pub fn nodes(&self) -> BTreeMap<NodeId, Node> {
        self.graph
            .node_references()
            .map(|(id, n)| (id, n.clone()))
            .collect()
    }

    /// All directed edges of the topology.
    pub fn edges(&self) -> BTreeSet<Edge> {
        self.graph
            .edge_references()
            .map(|e| Edge::new(e.source(), e.target()))
            .collect()
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Reference to the underlying graph.
    pub fn graph(&self) -> &DiGraph<Node, (), IndexType> {
        &self.graph
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pop_capability() {
        let pop = PopCapability::new()
            .with_vnf(VnfType::Ids, 5.0, 0.5)
            .with_capacity(Resource::Cpu, 8.0);
        assert!(pop.supports(VnfType::Ids));
        assert!(!pop.supports(VnfType::Nat));
        assert_eq!(pop.accel_factor(VnfType::Ids), 0.5);
        assert_eq!(pop.accel_factor(VnfType::Nat), 1.0);
        assert_eq!(pop.capacity(Resource::Cpu), Some(8.0));
        assert_eq!(pop.capacity(Resource::Memory), None);

        let switch = Node::switch("s");
        assert!(switch.capability().is_none());
        assert!(!switch.supports(VnfType::Ids));
    }

    #[test]
    fn links_are_added_in_both_directions() {
        let mut t = Topology::new();
        let a = t.add_switch("a");
        let b = t.add_switch("b");
        t.add_link(a, b).unwrap();
        t.add_link(b, a).unwrap();
        assert_eq!(
            t.edges(),
            [Edge::new(a, b), Edge::new(b, a)].into_iter().collect()
        );
        assert_eq!(t.add_edge(a, a), Err(TopologyError::SelfLoop(a)));
        assert_eq!(
            t.add_edge(a, NodeId::new(7)),
            Err(TopologyError::UnknownNode(NodeId::new(7)))
        );
        assert_eq!(t.node_by_name("b"), Some(b));
    }

    #[test]
    fn set_capacity() {
        let mut t = Topology::new();
        let s = t.add_switch("s");
        let p = t.add_pop("p", PopCapability::new().with_capacity(Resource::Cpu, 8.0));
        t.set_capacity(p, Resource::Cpu, 2.0).unwrap();
        let cap = t.node(p).and_then(Node::capability).unwrap();
        assert_eq!(cap.capacity(Resource::Cpu), Some(2.0));
        assert_eq!(
            t.set_capacity(s, Resource::Cpu, 2.0),
            Err(TopologyError::NotAPop(s))
        );
        assert!(t.node(s).unwrap().capability().is_none());
        assert_eq!(
            t.set_capacity(NodeId::new(5), Resource::Cpu, 2.0),
            Err(TopologyError::UnknownNode(NodeId::new(5)))
        );
    }

    #[test]
    fn table_weigher_fallback() {
        let a = NodeId::new(0);
        let b = NodeId::new(1);
        let mut w = TableWeigher::new(ConstantWeigher::new(10.0, 1.0));
        w.set(Edge::new(a, b), 3.0, 7.0);
        assert_eq!(w.bandwidth(Edge::new(a, b)), 3.0);
        assert_eq!(w.delay(Edge::new(a, b)), 7.0);
        assert_eq!(w.bandwidth(Edge::new(b, a)), 10.0);
        assert_eq!(w.delay(Edge::new(b, a)), 1.0);
    }
}
