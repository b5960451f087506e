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

//! Results of an optimization. A solution is assembled once by a [`SolutionBuilder`], and is
//! immutable afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use petgraph::{algo::is_cyclic_directed, graphmap::DiGraphMap};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    demand::Demand,
    optimizer::{SolverConfig, TreeKind},
    request::{LinkModel, OptimizationRequest},
    topology::{Edge, NodeId},
    vnf::{Resource, VnfType},
};

/// Relative slack allowed when checking numeric invariants.
const EPSILON: f64 = 1e-6;

/// The route of a demand towards a single destination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct DestinationPath {
    /// The destination
    destination: NodeId,
    /// Edges traversed in each logical segment, in order.
    hops: Vec<Vec<Edge>>,
    /// Node hosting each VNF of the chain, in order.
    placement: Vec<(VnfType, NodeId)>,
    /// Link delay plus (accelerated) VNF delay along the path.
    delay: f64,
    /// Delay of the destination as computed by the model, if the path was read from a model
    /// solution. It covers every edge the model selected for the destination, so it is never
    /// smaller than `delay`.
    model_delay: Option<f64>,
}

impl DestinationPath {
    /// Create a path and compute its delay.
    pub fn new(
        request: &OptimizationRequest,
        destination: NodeId,
        hops: Vec<Vec<Edge>>,
        placement: Vec<(VnfType, NodeId)>,
    ) -> Self {
        let delay = path_delay(request, &hops, &placement);
        Self {
            destination,
            hops,
            placement,
            delay,
            model_delay: None,
        }
    }

    /// Attach the delay the model computed for this destination.
    pub fn with_model_delay(mut self, delay: f64) -> Self {
        self.model_delay = Some(delay);
        self
    }

    /// The destination
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Edges traversed in each logical segment.
    pub fn hops(&self) -> &[Vec<Edge>] {
        &self.hops
    }

    /// Node hosting each VNF of the chain.
    pub fn placement(&self) -> &[(VnfType, NodeId)] {
        &self.placement
    }

    /// Total number of traversed links
    pub fn num_hops(&self) -> usize {
        self.hops.iter().map(Vec::len).sum()
    }

    /// Delay towards the destination
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Delay towards the destination according to the model
    pub fn model_delay(&self) -> Option<f64> {
        self.model_delay
    }
}

impl std::fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments = self.hops.iter().map(|hops| {
            if hops.is_empty() {
                String::from("-")
            } else {
                hops.iter().map(|e| e.to_string()).join(", ")
            }
        });
        write!(
            f,
            "{}: [{}] ({:.2})",
            self.destination.index(),
            segments.format(" | "),
            self.delay
        )
    }
}

/// Sum of the link delays along `hops`, plus the processing delay of all placed VNFs.
fn path_delay(
    request: &OptimizationRequest,
    hops: &[Vec<Edge>],
    placement: &[(VnfType, NodeId)],
) -> f64 {
    let links: f64 = hops.iter().flatten().map(|e| request.delay(*e)).sum();
    let vnfs: f64 = placement
        .iter()
        .map(|(ty, v)| request.vnf_delay(*ty, *v))
        .sum();
    links + vnfs
}

/// Solution of a single demand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct DemandSolution {
    /// The demand
    demand: Demand,
    /// Path towards each destination
    paths: BTreeMap<NodeId, DestinationPath>,
    /// Union of all used edges
    edges: BTreeSet<Edge>,
    /// Edges used in each logical segment (union over all destinations)
    segments: Vec<BTreeSet<Edge>>,
}

impl DemandSolution {
    /// Assemble the solution of a demand from the path towards each destination.
    pub fn new(demand: Demand, paths: impl IntoIterator<Item = DestinationPath>) -> Self {
        let paths: BTreeMap<NodeId, DestinationPath> =
            paths.into_iter().map(|p| (p.destination, p)).collect();
        let mut segments = vec![BTreeSet::new(); demand.num_segments()];
        for path in paths.values() {
            for (k, hops) in path.hops.iter().enumerate() {
                if let Some(seg) = segments.get_mut(k) {
                    seg.extend(hops.iter().copied());
                }
            }
        }
        let edges = segments.iter().flatten().copied().collect();
        Self {
            demand,
            paths,
            edges,
            segments,
        }
    }

    /// The demand
    pub fn demand(&self) -> &Demand {
        &self.demand
    }

    /// All edges used by the demand
    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Edges used in each logical segment. Only present for chained demands.
    pub fn segments(&self) -> Option<&[BTreeSet<Edge>]> {
        self.demand.is_chained().then_some(self.segments.as_slice())
    }

    /// Number of logical segments in which `edge` is used.
    pub fn usage(&self, edge: Edge) -> usize {
        self.segments.iter().filter(|s| s.contains(&edge)).count()
    }

    /// Path towards each destination
    pub fn paths(&self) -> &BTreeMap<NodeId, DestinationPath> {
        &self.paths
    }

    /// Path towards a single destination
    pub fn path(&self, destination: NodeId) -> Option<&DestinationPath> {
        self.paths.get(&destination)
    }

    /// Delay towards a single destination
    pub fn delay(&self, destination: NodeId) -> Option<f64> {
        self.path(destination).map(DestinationPath::delay)
    }

    /// Sum of the delays of all destinations
    pub fn delay_sum(&self) -> f64 {
        self.paths.values().map(DestinationPath::delay).sum()
    }

    /// Largest delay of any destination
    pub fn max_delay(&self) -> f64 {
        self.paths
            .values()
            .map(DestinationPath::delay)
            .fold(0.0, f64::max)
    }

    /// Smallest delay of any destination
    pub fn min_delay(&self) -> f64 {
        self.paths
            .values()
            .map(DestinationPath::delay)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Difference between the largest and the smallest delay
    pub fn deviation(&self) -> f64 {
        self.max_delay() - self.min_delay()
    }

    /// All VNF instances used by this demand.
    pub fn placement(&self) -> BTreeSet<(VnfType, NodeId)> {
        self.paths
            .values()
            .flat_map(|p| p.placement.iter().copied())
            .collect()
    }
}

/// Traffic on a single link.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct LinkUsage {
    /// Edge identifying the link
    pub link: Edge,
    /// Traffic on the link, in units of bandwidth.
    pub load: f64,
    /// Bandwidth of the link
    pub bandwidth: f64,
}

impl LinkUsage {
    /// Load divided by bandwidth
    pub fn utilization(&self) -> f64 {
        self.load / self.bandwidth
    }
}

/// The result of a successful optimization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct OptimizationSolution {
    /// Solution of each demand, in the order of the request
    demands: Vec<DemandSolution>,
    /// Nodes hosting each VNF type
    placement: BTreeMap<VnfType, BTreeSet<NodeId>>,
    /// Optimum of each priority level of the goal, highest priority first
    objectives: Vec<f64>,
    /// Traffic on each link
    links: Vec<LinkUsage>,
    /// Sum of the deployment cost of all placed instances
    deployment_cost: f64,
}

impl OptimizationSolution {
    /// Solutions of all demands
    pub fn demands(&self) -> &[DemandSolution] {
        &self.demands
    }

    /// Solution of a single demand
    pub fn demand(&self, idx: usize) -> Option<&DemandSolution> {
        self.demands.get(idx)
    }

    /// Nodes hosting each VNF type
    pub fn placement(&self) -> &BTreeMap<VnfType, BTreeSet<NodeId>> {
        &self.placement
    }

    /// Nodes hosting `ty`
    pub fn nodes_of(&self, ty: VnfType) -> BTreeSet<NodeId> {
        self.placement.get(&ty).cloned().unwrap_or_default()
    }

    /// Objective value of the highest priority
    pub fn objective(&self) -> f64 {
        self.objectives.first().copied().unwrap_or_default()
    }

    /// Objective value of each priority, highest first.
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    /// Traffic on every link
    pub fn links(&self) -> &[LinkUsage] {
        &self.links
    }

    /// Traffic on the link identified by `edge`
    pub fn link_load(&self, edge: Edge) -> Option<f64> {
        self.links.iter().find(|l| l.link == edge).map(|l| l.load)
    }

    /// Network load, i.e., the sum of all link utilizations
    pub fn load(&self) -> f64 {
        self.links.iter().map(LinkUsage::utilization).sum()
    }

    /// Largest link utilization
    pub fn max_utilization(&self) -> f64 {
        self.links
            .iter()
            .map(LinkUsage::utilization)
            .fold(0.0, f64::max)
    }

    /// Sum of the delays of all demands and destinations
    pub fn delay_sum(&self) -> f64 {
        self.demands.iter().map(DemandSolution::delay_sum).sum()
    }

    /// Sum of the delay deviations of all demands
    pub fn deviation_sum(&self) -> f64 {
        self.demands.iter().map(DemandSolution::deviation).sum()
    }

    /// Deployment cost of all placed instances
    pub fn deployment_cost(&self) -> f64 {
        self.deployment_cost
    }

    /// Check that the solution is consistent with the request: link capacity, node resources, node
    /// capabilities, reachability of every destination, the tree shape of the selected edges, and
    /// the model delays.
    ///
    /// The delay of a resolved path may never exceed the delay computed by the model. If the goal
    /// minimizes the sum of all delays, both must be equal. Other goals leave the model free to
    /// select detached cycles, which the resolved path does not contain.
    pub fn verify(
        &self,
        request: &OptimizationRequest,
        config: &SolverConfig,
    ) -> Result<(), SolutionViolation> {
        let exact_delay = config.goal.minimizes_all_delays();
        for link in request.links(config.link_model) {
            let load = link_load(&self.demands, &link.members);
            if load > link.bandwidth * (1.0 + EPSILON) + EPSILON {
                return Err(SolutionViolation::Capacity {
                    link: link.key,
                    load,
                    bandwidth: link.bandwidth,
                });
            }
        }

        for (ty, nodes) in self.placement.iter() {
            for v in nodes {
                if !request.node(*v).map(|n| n.supports(*ty)).unwrap_or(false) {
                    return Err(SolutionViolation::Capability(*ty, *v));
                }
            }
        }

        for (v, used) in resource_usage(&self.placement) {
            let Some(cap) = request.node(v).and_then(|n| n.capability()) else {
                continue;
            };
            for (resource, amount) in used {
                match cap.capacity(resource) {
                    Some(c) if amount > c + EPSILON => {
                        return Err(SolutionViolation::Resource {
                            node: v,
                            resource,
                            used: amount,
                            capacity: c,
                        })
                    }
                    _ => {}
                }
            }
        }

        for (i, sol) in self.demands.iter().enumerate() {
            for d in sol.demand.egress() {
                let path = sol
                    .path(*d)
                    .ok_or(SolutionViolation::Unreachable(i, *d))?;
                if !follows_chain(request, sol.demand(), path) {
                    return Err(SolutionViolation::Unreachable(i, *d));
                }
                if let Some(model) = path.model_delay {
                    let slack = EPSILON * model.abs().max(1.0);
                    let diff = path.delay - model;
                    if diff > slack || (exact_delay && diff < -slack) {
                        return Err(SolutionViolation::Delay {
                            demand: i,
                            destination: *d,
                            model,
                            path: path.delay,
                        });
                    }
                }
            }

            let trees: Vec<BTreeSet<Edge>> = match config.tree {
                TreeKind::Overlay => Vec::new(),
                TreeKind::PerSegment => sol.segments.clone(),
                TreeKind::Shared => vec![sol.edges.clone()],
            };
            for (k, edges) in trees.iter().enumerate() {
                if !is_tree(edges) {
                    return Err(SolutionViolation::NotATree(i, k));
                }
            }
        }

        Ok(())
    }
}

/// Walk along the path and check that it starts at the ingress, passes every placed VNF in order,
/// and ends at the destination.
fn follows_chain(request: &OptimizationRequest, demand: &Demand, path: &DestinationPath) -> bool {
    if path.hops.len() != demand.num_segments() || path.placement.len() != demand.chain().len() {
        return false;
    }
    let mut current = demand.ingress();
    for (k, hops) in path.hops.iter().enumerate() {
        for e in hops {
            if e.src != current || !request.edges().contains(e) {
                return false;
            }
            current = e.dst;
        }
        let target = match path.placement.get(k) {
            Some((ty, v)) if demand.chain().get(k) == Some(ty) => *v,
            Some(_) => return false,
            None => path.destination,
        };
        if current != target {
            return false;
        }
    }
    true
}

/// Every node has at most one incoming edge, and the edges contain no cycle.
fn is_tree(edges: &BTreeSet<Edge>) -> bool {
    let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
    for e in edges {
        *in_degree.entry(e.dst).or_default() += 1;
    }
    if in_degree.values().any(|d| *d > 1) {
        return false;
    }
    let graph: DiGraphMap<NodeId, ()> = edges.iter().map(|e| (e.src, e.dst)).collect();
    !is_cyclic_directed(&graph)
}

/// Traffic of all demands on the given set of edges.
fn link_load(demands: &[DemandSolution], members: &[Edge]) -> f64 {
    demands
        .iter()
        .map(|d| {
            let usage: usize = members.iter().map(|e| d.usage(*e)).sum();
            d.demand.volume() * usage as f64
        })
        .sum()
}

/// Resources used on each node.
fn resource_usage(
    placement: &BTreeMap<VnfType, BTreeSet<NodeId>>,
) -> BTreeMap<NodeId, BTreeMap<Resource, f64>> {
    let mut usage: BTreeMap<NodeId, BTreeMap<Resource, f64>> = BTreeMap::new();
    for (ty, nodes) in placement {
        for v in nodes {
            let node = usage.entry(*v).or_default();
            for r in Resource::ALL {
                *node.entry(r).or_default() += ty.requirement(r);
            }
        }
    }
    usage
}

impl std::fmt::Display for OptimizationSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "objective: [{}]",
            self.objectives.iter().map(|x| format!("{x:.3}")).join(", ")
        )?;
        for (ty, nodes) in self.placement.iter() {
            writeln!(
                f,
                "  {ty} @ {{{}}}",
                nodes.iter().map(|v| v.index()).join(", ")
            )?;
        }
        for (i, sol) in self.demands.iter().enumerate() {
            writeln!(f, "demand {i}: {}", sol.demand)?;
            for path in sol.paths.values() {
                writeln!(f, "    {path}")?;
            }
        }
        write!(
            f,
            "load: {:.3}, max utilization: {:.3}, delay: {:.2}, deviation: {:.2}, cost: {:.2}",
            self.load(),
            self.max_utilization(),
            self.delay_sum(),
            self.deviation_sum(),
            self.deployment_cost,
        )
    }
}

/// Builder for an [`OptimizationSolution`]. Add the solution of every demand, then call
/// [`SolutionBuilder::build`].
#[derive(Debug, Default)]
pub struct SolutionBuilder {
    /// Solution of each demand, by index
    demands: BTreeMap<usize, DemandSolution>,
    /// Optimum of each priority
    objectives: Vec<f64>,
}

impl SolutionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the solution of the demand with index `idx`.
    pub fn demand(&mut self, idx: usize, solution: DemandSolution) -> &mut Self {
        self.demands.insert(idx, solution);
        self
    }

    /// Set the optimum of each priority level.
    pub fn objectives(&mut self, values: Vec<f64>) -> &mut Self {
        self.objectives = values;
        self
    }

    /// Assemble the solution, and compute the placement, link loads and deployment cost.
    pub fn build(self, request: &OptimizationRequest, link_model: LinkModel) -> OptimizationSolution {
        let demands: Vec<DemandSolution> = self.demands.into_values().collect();

        let mut placement: BTreeMap<VnfType, BTreeSet<NodeId>> = BTreeMap::new();
        for (ty, v) in demands.iter().flat_map(|d| d.placement()) {
            placement.entry(ty).or_default().insert(v);
        }

        let deployment_cost = placement
            .iter()
            .flat_map(|(ty, nodes)| nodes.iter().map(|v| request.deployment_cost(*ty, *v)))
            .sum();

        let links = request
            .links(link_model)
            .into_iter()
            .map(|link| LinkUsage {
                link: link.key,
                load: link_load(&demands, &link.members),
                bandwidth: link.bandwidth,
            })
            .collect();

        OptimizationSolution {
            demands,
            placement,
            objectives: self.objectives,
            links,
            deployment_cost,
        }
    }
}

/// Invariant violated by a solution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolutionViolation {
    /// The traffic on a link exceeds its bandwidth.
    #[error("Link {link} carries {load}, but has a bandwidth of {bandwidth}")]
    Capacity {
        /// The link
        link: Edge,
        /// Traffic on the link
        load: f64,
        /// Bandwidth of the link
        bandwidth: f64,
    },
    /// The instances on a node require more resources than available.
    #[error("Node {node:?} uses {used} of {resource:?}, but has only {capacity}")]
    Resource {
        /// The node
        node: NodeId,
        /// The resource kind
        resource: Resource,
        /// Amount used
        used: f64,
        /// Capacity of the node
        capacity: f64,
    },
    /// A VNF is placed on a node that cannot host it.
    #[error("{0} is placed on {1:?}, which cannot host it")]
    Capability(VnfType, NodeId),
    /// A destination is not reached along the chain.
    #[error("Demand {0} does not reach {1:?} through its chain")]
    Unreachable(usize, NodeId),
    /// The edges of a segment (or of the shared tree) do not form a tree.
    #[error("Tree {1} of demand {0} is not a tree")]
    NotATree(usize, usize),
    /// The delay along the resolved path does not match the delay computed by the model.
    #[error("Demand {demand} has a model delay of {model} towards {destination:?}, but the path has {path}")]
    Delay {
        /// Index of the demand
        demand: usize,
        /// The destination
        destination: NodeId,
        /// Delay computed by the model
        model: f64,
        /// Delay along the resolved path
        path: f64,
    },
}
