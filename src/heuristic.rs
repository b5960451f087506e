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

//! Fixed-placement heuristic for a single demand with a single VNF.
//!
//! The VNF is placed on the capable node `v` that minimizes the delay from the ingress to `v`
//! plus the delays from `v` to every destination (shortest paths over the link delays). Then, the
//! routing is optimized with that placement fixed.

use std::sync::Arc;

use log::{debug, info};

use crate::{
    engine::EngineContext,
    optimizer::{ConfigError, Optimizer, SolverConfig, SolverError},
    request::OptimizationRequest,
    solution::OptimizationSolution,
    topology::NodeId,
    vnf::VnfType,
};

/// Solver variant that fixes the placement before routing.
#[derive(Debug, Clone)]
pub struct FixedPlacement {
    /// Handle to the engine
    engine: Arc<EngineContext>,
    /// Configuration used for routing
    config: SolverConfig,
}

impl FixedPlacement {
    /// Create a new heuristic solver.
    pub fn new(engine: Arc<EngineContext>, config: SolverConfig) -> Self {
        Self { engine, config }
    }

    /// Choose the placement of the VNF. Returns `Ok(None)` if no capable node can reach all
    /// destinations. The request must contain exactly one demand with a chain of length one.
    pub fn placement(
        &self,
        request: &OptimizationRequest,
    ) -> Result<Option<(VnfType, NodeId)>, ConfigError> {
        let [demand] = request.demands() else {
            return Err(ConfigError::DemandCardinality {
                expected: 1,
                found: request.demands().len(),
            });
        };
        let [ty] = demand.chain() else {
            return Err(ConfigError::ChainLength {
                expected: 1,
                found: demand.chain().len(),
            });
        };

        let candidates = match self.config.pinned.get(ty) {
            Some(v) => vec![*v],
            None => request.capable_nodes(*ty),
        };
        let from_ingress = request.delays_from(demand.ingress());

        let best = candidates
            .into_iter()
            .filter_map(|v| {
                let to_v = from_ingress.get(&v)?;
                let from_v = request.delays_from(v);
                let to_dests = demand
                    .egress()
                    .iter()
                    .map(|d| from_v.get(d).copied())
                    .sum::<Option<f64>>()?;
                debug!("Placing {ty} on {} costs {}", v.index(), to_v + to_dests);
                Some((v, to_v + to_dests))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(v, _)| (*ty, v));

        Ok(best)
    }

    /// Fix the placement and optimize the routing. Returns `Ok(None)` if no placement exists, or
    /// if the routing is infeasible.
    pub fn solve(
        &self,
        request: &OptimizationRequest,
    ) -> Result<Option<OptimizationSolution>, SolverError> {
        let Some((ty, v)) = self.placement(request)? else {
            info!("No node can host the VNF and reach all destinations");
            return Ok(None);
        };
        info!("Fixing {ty} on node {}", v.index());
        let config = self.config.clone().pin(ty, v);
        Optimizer::new(Arc::clone(&self.engine), config).solve(request)
    }
}
