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

//! Tree-structure strategies. A strategy decides whether (and how) the edges selected for a demand
//! must form a tree. Each strategy has three hooks that the driver calls for every demand:
//!
//! 1. [`TreeStrategy::add_variables`]: create the rank variables (and aggregated edge variables).
//! 2. [`TreeStrategy::add_mtz_constraints`]: forbid cycles using Miller-Tucker-Zemlin ordering.
//! 3. [`TreeStrategy::add_in_degree_constraints`]: every node has at most one incoming edge.
//!
//! The MTZ constraints use integer ranks `u(v)` in `[0, |V| - 1]`. Every root of a layer is pinned
//! to rank 0, and for each edge `(i, j)` of the layer:
//!
//! ```text
//! u(i) - u(j) + 1 <= |V| * (1 - usage(i, j))
//! ```

use std::collections::BTreeMap;

use clap::ValueEnum;
use good_lp::{Expression, Variable};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{request::OptimizationRequest, topology::NodeId};

use super::{
    linear::LinearModel,
    or_tools::c_aggregate,
    variables::{edge_variables, EdgeVars},
};

/// Selects the tree-structure strategy of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum TreeKind {
    /// No tree constraints. Paths towards different destinations may diverge and reconverge.
    #[default]
    Overlay,
    /// Every logical segment of a demand forms a tree on its own.
    PerSegment,
    /// All logical segments of a demand share a single tree.
    Shared,
}

impl TreeKind {
    /// Create the strategy object.
    pub(crate) fn strategy(&self) -> Box<dyn TreeStrategy> {
        match self {
            TreeKind::Overlay => Box::new(Overlay),
            TreeKind::PerSegment => Box::new(PerSegmentTree),
            TreeKind::Shared => Box::new(SharedTree),
        }
    }
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TreeKind::Overlay => "overlay",
            TreeKind::PerSegment => "tree per segment",
            TreeKind::Shared => "shared tree",
        })
    }
}

/// Aggregated edge usage of a single demand, as seen by a tree strategy.
pub(crate) struct DemandFlows<'a> {
    /// `f_t[k]` for each logical segment `k`.
    pub segments: Vec<&'a EdgeVars>,
    /// Nodes at which segment `k` may start, together with the expression that is `1` if it does.
    pub roots: Vec<Vec<(NodeId, Expression)>>,
}

/// One rank space of a demand.
pub(crate) struct TreeLayer {
    /// Edge usage that must form a tree (or forest)
    pub usage: EdgeVars,
    /// `u(v)`
    pub rank: BTreeMap<NodeId, Variable>,
    /// Roots of the layer, pinned to rank 0 when selected.
    pub roots: Vec<(NodeId, Expression)>,
}

/// Hooks of a tree-structure strategy.
pub(crate) trait TreeStrategy: std::fmt::Debug + Send + Sync {
    /// Kind of this strategy
    fn kind(&self) -> TreeKind;

    /// Create the variables of the strategy for a single demand.
    fn add_variables(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        flows: &DemandFlows<'_>,
    ) -> Vec<TreeLayer>;

    /// Add the subtour elimination constraints of a single demand.
    fn add_mtz_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    );

    /// Add the in-degree constraints of a single demand.
    fn add_in_degree_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    );
}

/// Shortest-path overlay: no tree constraints at all.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Overlay;

impl TreeStrategy for Overlay {
    fn kind(&self) -> TreeKind {
        TreeKind::Overlay
    }

    fn add_variables(
        &self,
        _model: &mut LinearModel,
        _request: &OptimizationRequest,
        _flows: &DemandFlows<'_>,
    ) -> Vec<TreeLayer> {
        Vec::new()
    }

    fn add_mtz_constraints(&self, _: &mut LinearModel, _: &OptimizationRequest, _: &[TreeLayer]) {}

    fn add_in_degree_constraints(
        &self,
        _: &mut LinearModel,
        _: &OptimizationRequest,
        _: &[TreeLayer],
    ) {
    }
}

/// One tree per logical segment. The roots of segment `k` are the nodes hosting position `k`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PerSegmentTree;

impl TreeStrategy for PerSegmentTree {
    fn kind(&self) -> TreeKind {
        TreeKind::PerSegment
    }

    fn add_variables(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        flows: &DemandFlows<'_>,
    ) -> Vec<TreeLayer> {
        flows
            .segments
            .iter()
            .zip(flows.roots.iter())
            .map(|(usage, roots)| TreeLayer {
                usage: (*usage).clone(),
                rank: rank_variables(model, request),
                roots: roots.clone(),
            })
            .collect()
    }

    fn add_mtz_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    ) {
        layers.iter().for_each(|l| mtz(model, request, l));
    }

    fn add_in_degree_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    ) {
        layers.iter().for_each(|l| in_degree(model, request, l));
    }
}

/// A single tree spanning the whole chain. A new binary `g(e)` marks every edge used by any
/// segment, and the only root is the ingress.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SharedTree;

impl TreeStrategy for SharedTree {
    fn kind(&self) -> TreeKind {
        TreeKind::Shared
    }

    fn add_variables(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        flows: &DemandFlows<'_>,
    ) -> Vec<TreeLayer> {
        let usage = edge_variables(model, request);
        for (e, g) in usage.iter() {
            let parts = flows
                .segments
                .iter()
                .map(|s| Expression::from(s[e]))
                .collect();
            c_aggregate(model, *g, parts);
        }
        vec![TreeLayer {
            usage,
            rank: rank_variables(model, request),
            roots: flows.roots.first().cloned().unwrap_or_default(),
        }]
    }

    fn add_mtz_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    ) {
        layers.iter().for_each(|l| mtz(model, request, l));
    }

    fn add_in_degree_constraints(
        &self,
        model: &mut LinearModel,
        request: &OptimizationRequest,
        layers: &[TreeLayer],
    ) {
        layers.iter().for_each(|l| in_degree(model, request, l));
    }
}

/// Create `u(v)` in `[0, |V| - 1]` for every node.
fn rank_variables(
    model: &mut LinearModel,
    request: &OptimizationRequest,
) -> BTreeMap<NodeId, Variable> {
    let max_rank = (request.num_nodes() as f64 - 1.0).max(0.0);
    request
        .node_ids()
        .into_iter()
        .map(|v| (v, model.integer(0.0, max_rank)))
        .collect()
}

/// Pin the roots to rank 0, and require the rank to increase along every used edge.
fn mtz(model: &mut LinearModel, request: &OptimizationRequest, layer: &TreeLayer) {
    let big_m = request.num_nodes() as f64;

    // u(root) <= (M - 1) * (1 - root)
    for (v, root) in layer.roots.iter() {
        if let Some(u) = layer.rank.get(v) {
            model.leq(*u, (big_m - 1.0) * (Expression::from(1) - root.clone()));
        }
    }

    // u(i) - u(j) + 1 <= M * (1 - x(i, j))
    for (e, x) in layer.usage.iter() {
        let (Some(u_i), Some(u_j)) = (layer.rank.get(&e.src), layer.rank.get(&e.dst)) else {
            continue;
        };
        model.leq(*u_i - *u_j + 1, big_m * (1 - *x));
    }
}

/// At most one incoming edge per node.
fn in_degree(model: &mut LinearModel, request: &OptimizationRequest, layer: &TreeLayer) {
    for v in request.node_ids() {
        let incoming: Expression = request
            .in_edges(v)
            .iter()
            .filter_map(|e| layer.usage.get(e))
            .copied()
            .sum();
        model.leq(incoming, 1);
    }
}
