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

//! Model part for demands without a VNF chain (pure multicast routing).
//!
//! Every unchained demand has a single logical segment from the ingress to each destination. The
//! part is embedded into every [`Optimizer`](super::Optimizer), such that the link capacity sees
//! the load of chained and unchained demands together. The [`NoChainSolver`] uses it on its own.

use std::sync::Arc;

use good_lp::{Expression, Solution};
use log::debug;

use crate::{
    engine::EngineContext,
    request::OptimizationRequest,
    solution::{DemandSolution, DestinationPath, OptimizationSolution, SolutionBuilder},
};

use super::{
    constraints::{connect_flows, delay_constraints, flow_conservation, link_delay},
    extract::resolve_path,
    linear::LinearModel,
    objective::Terms,
    tree::{DemandFlows, TreeLayer},
    variables::{DelayVars, Position, SegmentFlow},
    BuildContext, ConfigError, Optimizer, SolverConfig, SolverError,
};

/// Variables of a single unchained demand
pub(crate) struct RouteVars {
    /// Index of the demand in the request
    pub demand: usize,
    /// `f_t(e)` and `f_{t,d}(e)`
    pub flow: SegmentFlow,
    /// The ingress
    pub source: Position,
    /// Delay accounting
    pub delay: DelayVars,
    /// Variables of the tree strategy
    pub tree: Vec<TreeLayer>,
}

/// Model part of all unchained demands.
pub(crate) struct NoChainModel {
    /// Indices of the unchained demands
    demands: Vec<usize>,
    /// Variables of each demand, in the same order
    vars: Vec<RouteVars>,
}

impl NoChainModel {
    /// INIT: take ownership of the unchained demands.
    pub fn init(ctx: &BuildContext<'_>, demands: Vec<usize>) -> Self {
        debug!(
            "No-chain part handles {} of {} demands",
            demands.len(),
            ctx.request.demands().len()
        );
        Self {
            demands,
            vars: Vec::new(),
        }
    }

    /// VARIABLES
    pub fn add_variables(&mut self, model: &mut LinearModel, ctx: &BuildContext<'_>) {
        let request = ctx.request;
        for t in self.demands.iter().copied() {
            let demand = &request.demands()[t];
            let flow = SegmentFlow::new(model, request, demand.egress());
            let delay = DelayVars::new(model, demand.egress(), ctx.config.goal.needs_delay_bounds());
            let tree = ctx.tree.add_variables(
                model,
                request,
                &DemandFlows {
                    segments: vec![&flow.edges],
                    roots: vec![vec![(demand.ingress(), Expression::from(1))]],
                },
            );
            self.vars.push(RouteVars {
                demand: t,
                flow,
                source: Position::Fixed(demand.ingress()),
                delay,
                tree,
            });
        }
    }

    /// OBJECTIVE: terms of all unchained demands.
    pub fn terms(&self, ctx: &BuildContext<'_>) -> Terms {
        let mut terms = Terms::new();
        for vars in self.vars.iter() {
            let volume = ctx.request.demands()[vars.demand].volume();
            for (e, x) in vars.flow.edges.iter() {
                terms.add_load(*e, volume * *x);
            }
            terms.delay += vars.delay.delay.values().copied().sum::<Expression>();
            if let Some(max) = vars.delay.max() {
                terms.max_delay += max;
            }
            if let Some(dev) = vars.delay.deviation() {
                terms.deviation += dev;
            }
        }
        terms
    }

    /// CONSTRAINTS
    pub fn add_constraints(&self, model: &mut LinearModel, ctx: &BuildContext<'_>) {
        let request = ctx.request;
        for vars in self.vars.iter() {
            connect_flows(model, &vars.flow.edges, vars.flow.dests.values());
            for (d, flow) in vars.flow.dests.iter() {
                flow_conservation(model, request, flow, &vars.source, &Position::Fixed(*d));
            }
            delay_constraints(model, &vars.delay, |d| {
                vars.flow
                    .dests
                    .get(&d)
                    .map(|flow| link_delay(request, flow))
                    .unwrap_or_else(|| Expression::from(0))
            });
            ctx.tree.add_mtz_constraints(model, request, &vars.tree);
            ctx.tree.add_in_degree_constraints(model, request, &vars.tree);
        }
    }

    /// EXTRACT: resolve the path towards every destination.
    pub fn extract(
        &self,
        ctx: &BuildContext<'_>,
        solution: &impl Solution,
        builder: &mut SolutionBuilder,
    ) {
        let request = ctx.request;
        for vars in self.vars.iter() {
            let demand = &request.demands()[vars.demand];
            let paths = vars.flow.dests.iter().map(|(d, flow)| {
                let hops = resolve_path(request, solution, flow, demand.ingress(), *d)
                    .unwrap_or_default();
                let path = DestinationPath::new(request, *d, vec![hops], Vec::new());
                match vars.delay.delay.get(d) {
                    Some(x) => path.with_model_delay(solution.value(*x)),
                    None => path,
                }
            });
            builder.demand(vars.demand, DemandSolution::new(demand.clone(), paths));
        }
    }
}

/// Solver for requests that contain only unchained demands: multicast routing without VNFs.
#[derive(Debug)]
pub struct NoChainSolver {
    /// The underlying optimizer
    inner: Optimizer,
}

impl NoChainSolver {
    /// Create a new solver.
    pub fn new(engine: Arc<EngineContext>, config: SolverConfig) -> Self {
        Self {
            inner: Optimizer::new(engine, config),
        }
    }

    /// Route all demands. Returns `Ok(None)` if the request is infeasible, and an error if any
    /// demand has a VNF chain.
    pub fn solve(
        &mut self,
        request: &OptimizationRequest,
    ) -> Result<Option<OptimizationSolution>, SolverError> {
        if let Some(t) = request.demands().iter().position(|d| d.is_chained()) {
            return Err(ConfigError::ChainedDemand(t).into());
        }
        self.inner.solve(request)
    }
}
