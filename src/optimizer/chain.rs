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

//! Model part for demands with a VNF chain: joint placement and routing.
//!
//! A demand `t` with chain length `L` has the logical positions `0..=L+1`. Position `0` is the
//! ingress, position `k` in `1..=L` is the VNF `chain[k - 1]`, and position `L + 1` is the
//! destination. Segment `k` (in `0..=L`) connects position `k` with position `k + 1`. Placement and
//! routing are coupled by flow conservation:
//!
//! ```text
//! out_{t,d}[k](v) - in_{t,d}[k](v) == p_{t,d}[k](v) - p_{t,d}[k + 1](v)
//! ```
//!
//! Placement variables only exist on nodes that can host the required type, which realizes
//! `p[type](v) = 0` for all other nodes.

use std::collections::BTreeMap;

use good_lp::{Expression, Solution, Variable};
use log::debug;

use crate::{
    request::OptimizationRequest,
    solution::{DemandSolution, DestinationPath, SolutionBuilder},
    topology::NodeId,
    vnf::{Resource, VnfType},
};

use super::{
    constraints::{connect_flows, delay_constraints, flow_conservation, link_delay},
    extract::resolve_path,
    linear::LinearModel,
    objective::Terms,
    or_tools::{c_aggregate, c_exactly_one, weighted_sum},
    tree::{DemandFlows, TreeLayer},
    variables::{DelayVars, Position, SegmentFlow},
    BuildContext,
};

/// Variables of a single chained demand
pub(crate) struct ChainVars {
    /// Index of the demand in the request
    pub demand: usize,
    /// `f_t[k]` and `f_{t,d}[k]` for each segment `k` in `0..=L`
    pub segments: Vec<SegmentFlow>,
    /// `p_t[k]` for each position `k` in `1..=L` (stored at index `k - 1`)
    pub places: Vec<BTreeMap<NodeId, Variable>>,
    /// `p_{t,d}[k]` for each destination and each position `k` in `0..=L+1`
    pub positions: BTreeMap<NodeId, Vec<Position>>,
    /// Delay accounting
    pub delay: DelayVars,
    /// Variables of the tree strategy
    pub tree: Vec<TreeLayer>,
}

/// Model part of all chained demands.
pub(crate) struct ChainModel {
    /// Indices of the chained demands
    demands: Vec<usize>,
    /// `p[type](v)`, shared by all demands
    instances: BTreeMap<(VnfType, NodeId), Variable>,
    /// Variables of each demand
    vars: Vec<ChainVars>,
}

impl ChainModel {
    /// INIT: take ownership of the chained demands.
    pub fn init(ctx: &BuildContext<'_>, demands: Vec<usize>) -> Self {
        debug!(
            "Chain part handles {} of {} demands",
            demands.len(),
            ctx.request.demands().len()
        );
        Self {
            demands,
            instances: BTreeMap::new(),
            vars: Vec::new(),
        }
    }

    /// VARIABLES
    pub fn add_variables(&mut self, model: &mut LinearModel, ctx: &BuildContext<'_>) {
        let request = ctx.request;

        // shared instance variables, for every type used by any demand
        for t in self.demands.iter() {
            for ty in request.demands()[*t].chain() {
                for v in ctx.candidates(*ty) {
                    if !self.instances.contains_key(&(*ty, v)) {
                        let x = model.binary();
                        self.instances.insert((*ty, v), x);
                    }
                }
            }
        }

        for t in self.demands.iter().copied() {
            let demand = &request.demands()[t];
            let egress = demand.egress();

            let segments: Vec<SegmentFlow> = (0..demand.num_segments())
                .map(|_| SegmentFlow::new(model, request, egress))
                .collect();

            let candidates: Vec<Vec<NodeId>> =
                demand.chain().iter().map(|ty| ctx.candidates(*ty)).collect();

            let places: Vec<BTreeMap<NodeId, Variable>> = candidates
                .iter()
                .map(|c| c.iter().map(|v| (*v, model.binary())).collect())
                .collect();

            let positions: BTreeMap<NodeId, Vec<Position>> = egress
                .iter()
                .map(|d| {
                    let mut pos = Vec::with_capacity(demand.chain().len() + 2);
                    pos.push(Position::Fixed(demand.ingress()));
                    for c in candidates.iter() {
                        pos.push(Position::free(model, c));
                    }
                    pos.push(Position::Fixed(*d));
                    (*d, pos)
                })
                .collect();

            let delay = DelayVars::new(model, egress, ctx.config.goal.needs_delay_bounds());

            let mut roots = vec![vec![(demand.ingress(), Expression::from(1))]];
            roots.extend(places.iter().map(|p| {
                p.iter()
                    .map(|(v, x)| (*v, Expression::from(*x)))
                    .collect::<Vec<_>>()
            }));
            let tree = ctx.tree.add_variables(
                model,
                request,
                &DemandFlows {
                    segments: segments.iter().map(|s| &s.edges).collect(),
                    roots,
                },
            );

            self.vars.push(ChainVars {
                demand: t,
                segments,
                places,
                positions,
                delay,
                tree,
            });
        }
    }

    /// OBJECTIVE: terms of all chained demands, including the deployment cost.
    pub fn terms(&self, ctx: &BuildContext<'_>) -> Terms {
        let request = ctx.request;
        let mut terms = Terms::new();
        for vars in self.vars.iter() {
            let volume = request.demands()[vars.demand].volume();
            for seg in vars.segments.iter() {
                for (e, x) in seg.edges.iter() {
                    terms.add_load(*e, volume * *x);
                }
            }
            terms.delay += vars.delay.delay.values().copied().sum::<Expression>();
            if let Some(max) = vars.delay.max() {
                terms.max_delay += max;
            }
            if let Some(dev) = vars.delay.deviation() {
                terms.deviation += dev;
            }
        }
        if ctx.config.goal.has_deployment_cost() {
            terms.deployment_cost = weighted_sum(
                self.instances
                    .iter()
                    .map(|((ty, v), x)| (request.deployment_cost(*ty, *v), x)),
            );
        }
        terms
    }

    /// CONSTRAINTS
    pub fn add_constraints(&self, model: &mut LinearModel, ctx: &BuildContext<'_>) {
        let request = ctx.request;
        let rows = model.num_rows();

        for vars in self.vars.iter() {
            let demand = &request.demands()[vars.demand];

            for (k, seg) in vars.segments.iter().enumerate() {
                connect_flows(model, &seg.edges, seg.dests.values());
                for (d, flow) in seg.dests.iter() {
                    let pos = &vars.positions[d];
                    flow_conservation(model, request, flow, &pos[k], &pos[k + 1]);
                }
            }

            // p_{t,d}[k](v) <= p_t[k](v) <= sum_d p_{t,d}[k](v)
            for (i, place) in vars.places.iter().enumerate() {
                for (v, x) in place.iter() {
                    let parts = vars
                        .positions
                        .values()
                        .map(|pos| pos[i + 1].at(*v))
                        .collect();
                    c_aggregate(model, *x, parts);
                }
            }

            // exactly one node per position and destination
            for pos in vars.positions.values() {
                for p in pos.iter().filter(|p| matches!(p, Position::Free(_))) {
                    c_exactly_one(model, p.candidates().into_iter().map(|(_, x)| x));
                }
            }

            delay_constraints(model, &vars.delay, |d| {
                let links: Expression = vars
                    .segments
                    .iter()
                    .filter_map(|seg| seg.dests.get(&d))
                    .map(|flow| link_delay(request, flow))
                    .sum();
                let vnfs: Expression = vars
                    .positions
                    .get(&d)
                    .map(|pos| {
                        demand
                            .chain()
                            .iter()
                            .zip(pos.iter().skip(1))
                            .flat_map(|(ty, p)| {
                                p.candidates().into_iter().map(move |(v, x)| {
                                    request.vnf_delay(*ty, v) * x
                                })
                            })
                            .sum::<Expression>()
                    })
                    .unwrap_or_else(|| Expression::from(0));
                links + vnfs
            });

            ctx.tree.add_mtz_constraints(model, request, &vars.tree);
            ctx.tree.add_in_degree_constraints(model, request, &vars.tree);
        }

        // p_t[k](v) <= p[type](v) <= sum p_t[k](v)
        for ((ty, v), x) in self.instances.iter() {
            let parts = self
                .vars
                .iter()
                .flat_map(|vars| {
                    let chain = request.demands()[vars.demand].chain();
                    chain
                        .iter()
                        .zip(vars.places.iter())
                        .filter(|(t, _)| *t == ty)
                        .filter_map(|(_, place)| place.get(v))
                        .map(|x| Expression::from(*x))
                        .collect::<Vec<_>>()
                })
                .collect();
            c_aggregate(model, *x, parts);
        }

        // node resources
        for (v, node) in request.nodes() {
            let Some(cap) = node.capability() else {
                continue;
            };
            for resource in Resource::ALL {
                let Some(capacity) = cap.capacity(resource) else {
                    continue;
                };
                let used = weighted_sum(
                    self.instances
                        .iter()
                        .filter(|((_, n), _)| n == v)
                        .map(|((ty, _), x)| (ty.requirement(resource), x)),
                );
                model.leq(used, capacity);
            }
        }

        debug!("Chain part added {} rows", model.num_rows() - rows);
    }

    /// EXTRACT: resolve the placement and the path of every destination, segment by segment.
    pub fn extract(
        &self,
        ctx: &BuildContext<'_>,
        solution: &impl Solution,
        builder: &mut SolutionBuilder,
    ) {
        let request = ctx.request;
        for vars in self.vars.iter() {
            let demand = &request.demands()[vars.demand];
            let paths = vars
                .positions
                .iter()
                .map(|(d, pos)| extract_path(request, solution, vars, *d, pos));
            builder.demand(vars.demand, DemandSolution::new(demand.clone(), paths));
        }
    }
}

/// Resolve the path of a single destination.
fn extract_path(
    request: &OptimizationRequest,
    solution: &impl Solution,
    vars: &ChainVars,
    destination: NodeId,
    positions: &[Position],
) -> DestinationPath {
    let demand = &request.demands()[vars.demand];
    let nodes: Vec<Option<NodeId>> = positions.iter().map(|p| p.resolve(solution)).collect();

    let placement = demand
        .chain()
        .iter()
        .zip(nodes.iter().skip(1))
        .filter_map(|(ty, v)| v.map(|v| (*ty, v)))
        .collect();

    let hops = vars
        .segments
        .iter()
        .enumerate()
        .map(|(k, seg)| match (nodes[k], nodes[k + 1], seg.dests.get(&destination)) {
            (Some(from), Some(to), Some(flow)) => {
                resolve_path(request, solution, flow, from, to).unwrap_or_default()
            }
            _ => Vec::new(),
        })
        .collect();

    let path = DestinationPath::new(request, destination, hops, placement);
    match vars.delay.delay.get(&destination) {
        Some(x) => path.with_model_delay(solution.value(*x)),
        None => path,
    }
}
