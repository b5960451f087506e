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

//! Variables shared by the chained and the unchained model parts.
//!
//! | Symbol             | Kind       | Meaning                                                      |
//! |--------------------|------------|--------------------------------------------------------------|
//! | `f_t[k](e)`        | binary     | edge `e` carries segment `k` of demand `t`                   |
//! | `f_{t,d}[k](e)`    | binary     | edge `e` carries segment `k` of demand `t` towards `d`       |
//! | `p_t[k](v)`        | binary     | position `k` of demand `t` is realized at `v`                |
//! | `p_{t,d}[k](v)`    | binary     | position `k` of demand `t` towards `d` is realized at `v`    |
//! | `p[type](v)`       | binary     | an instance of `type` runs on `v`, shared by all demands     |
//! | `delay_t(d)`       | continuous | delay of demand `t` towards `d`                              |
//! | `max_t`, `min_t`   | continuous | bounds on the delays of demand `t`                           |
//!
//! Positions that are pinned to a single node (the ingress at `k = 0`, and the destination at
//! `k = L + 1`) are not represented by variables, but by constants.

use std::collections::{BTreeMap, HashMap};

use good_lp::{Expression, Solution, Variable};

use crate::{
    request::OptimizationRequest,
    topology::{Edge, NodeId},
};

use super::{extract::is_set, linear::LinearModel};

/// Type for mapping each edge to its usage variable.
pub(crate) type EdgeVars = HashMap<Edge, Variable>;

/// Create a binary variable for every edge of the request.
pub(crate) fn edge_variables(model: &mut LinearModel, request: &OptimizationRequest) -> EdgeVars {
    request
        .edges()
        .iter()
        .map(|e| (*e, model.binary()))
        .collect()
}

/// Logical position realized at a node.
#[derive(Debug, Clone)]
pub(crate) enum Position {
    /// The position is pinned to the given node.
    Fixed(NodeId),
    /// The position can be realized at any of the candidate nodes.
    Free(BTreeMap<NodeId, Variable>),
}

impl Position {
    /// Create a free position with one binary variable per candidate.
    pub fn free(model: &mut LinearModel, candidates: &[NodeId]) -> Self {
        Self::Free(candidates.iter().map(|v| (*v, model.binary())).collect())
    }

    /// Expression that is `1` if the position is realized at `v`, and `0` otherwise.
    pub fn at(&self, v: NodeId) -> Expression {
        match self {
            Position::Fixed(n) if *n == v => Expression::from(1),
            Position::Fixed(_) => Expression::from(0),
            Position::Free(vars) => vars
                .get(&v)
                .map(|x| Expression::from(*x))
                .unwrap_or_else(|| Expression::from(0)),
        }
    }

    /// Expressions for all nodes at which the position may be realized.
    pub fn candidates(&self) -> Vec<(NodeId, Expression)> {
        match self {
            Position::Fixed(n) => vec![(*n, Expression::from(1))],
            Position::Free(vars) => vars
                .iter()
                .map(|(v, x)| (*v, Expression::from(*x)))
                .collect(),
        }
    }

    /// Read back the node at which the position is realized.
    pub fn resolve(&self, solution: &impl Solution) -> Option<NodeId> {
        match self {
            Position::Fixed(n) => Some(*n),
            Position::Free(vars) => vars
                .iter()
                .find(|(_, x)| is_set(solution, **x))
                .map(|(v, _)| *v),
        }
    }
}

/// Edge usage of a single logical segment, aggregated and per destination.
#[derive(Debug, Clone)]
pub(crate) struct SegmentFlow {
    /// `f_t[k](e)`
    pub edges: EdgeVars,
    /// `f_{t,d}[k](e)`, for each destination `d`.
    pub dests: BTreeMap<NodeId, EdgeVars>,
}

impl SegmentFlow {
    /// Create all variables of a segment.
    pub fn new<'a>(
        model: &mut LinearModel,
        request: &OptimizationRequest,
        dests: impl IntoIterator<Item = &'a NodeId>,
    ) -> Self {
        Self {
            edges: edge_variables(model, request),
            dests: dests
                .into_iter()
                .map(|d| (*d, edge_variables(model, request)))
                .collect(),
        }
    }
}

/// Delay accounting of a single demand.
#[derive(Debug, Clone)]
pub(crate) struct DelayVars {
    /// `delay_t(d)` for each destination `d`.
    pub delay: BTreeMap<NodeId, Variable>,
    /// `(min_t, max_t)`, only present if the goal references them.
    pub bounds: Option<(Variable, Variable)>,
}

impl DelayVars {
    /// Create the delay variables for all destinations, and the bounds if requested.
    pub fn new<'a>(
        model: &mut LinearModel,
        dests: impl IntoIterator<Item = &'a NodeId>,
        with_bounds: bool,
    ) -> Self {
        let delay = dests
            .into_iter()
            .map(|d| (*d, model.non_negative()))
            .collect();
        let bounds = with_bounds.then(|| (model.non_negative(), model.non_negative()));
        Self { delay, bounds }
    }

    /// Expression of the maximum delay, if the bounds exist.
    pub fn max(&self) -> Option<Expression> {
        self.bounds.map(|(_, max)| Expression::from(max))
    }

    /// Expression of the deviation `max_t - min_t`, if the bounds exist.
    pub fn deviation(&self) -> Option<Expression> {
        self.bounds.map(|(min, max)| max - min)
    }
}
