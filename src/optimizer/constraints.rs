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

//! Constraints shared by the chained and the unchained model parts, as well as the constraints that
//! couple all demands (link capacity and the network load ceiling).

use std::collections::HashMap;

use good_lp::{Expression, Variable};

use crate::{
    request::{Link, OptimizationRequest},
    topology::{Edge, NodeId},
};

use super::{
    linear::LinearModel,
    or_tools::*,
    variables::{DelayVars, EdgeVars, Position},
    BuildContext,
};

/// Flow conservation of a single unit flow that starts at the node realizing `start` and ends at
/// the node realizing `end`. For each node `v`, this creates the constraint:
///
/// ```text
/// sum(f(v, *)) - sum(f(*, v)) == start(v) - end(v)
/// ```
///
/// This simultaneously states that the traffic enters the segment at the node hosting `start`, and
/// leaves it at the node hosting `end`. If both are realized at the same node, the segment is empty.
pub(crate) fn flow_conservation(
    model: &mut LinearModel,
    request: &OptimizationRequest,
    flow: &EdgeVars,
    start: &Position,
    end: &Position,
) {
    for v in request.node_ids() {
        let out: Expression = request.out_edges(v).iter().map(|e| flow[e]).sum();
        let inc: Expression = request.in_edges(v).iter().map(|e| flow[e]).sum();
        model.eq(out - inc, start.at(v) - end.at(v));
    }
}

/// Connect the aggregated edge usage of a segment with the edge usage towards each destination,
/// see [`c_aggregate`].
pub(crate) fn connect_flows<'a>(
    model: &mut LinearModel,
    aggregate: &EdgeVars,
    parts: impl IntoIterator<Item = &'a EdgeVars> + Clone,
) {
    for (e, x) in aggregate.iter() {
        let parts = parts
            .clone()
            .into_iter()
            .map(|p| Expression::from(p[e]))
            .collect();
        c_aggregate(model, *x, parts);
    }
}

/// Expression of the link delay of a flow: `sum(delay(e) * f(e))`.
pub(crate) fn link_delay(request: &OptimizationRequest, flow: &EdgeVars) -> Expression {
    weighted_sum(flow.iter().map(|(e, x)| (request.delay(*e), x)))
}

/// Set `delay_t(d)` to the given expression, and bound the delays by `min_t` and `max_t`.
///
/// The minimum and the maximum are linked by inequalities only, which is tight as long as the
/// objective minimizes the maximum (or the deviation).
pub(crate) fn delay_constraints(
    model: &mut LinearModel,
    vars: &DelayVars,
    mut delay_of: impl FnMut(NodeId) -> Expression,
) {
    for (d, x) in vars.delay.iter() {
        model.eq(*x, delay_of(*d));
    }
    if let Some((min, max)) = vars.bounds {
        c_upper_bound(model, max, vars.delay.values().map(|x| Expression::from(*x)));
        c_lower_bound(model, min, vars.delay.values().map(|x| Expression::from(*x)));
    }
}

/// Traffic on a link, i.e., the sum of all edge loads of its members.
pub(crate) fn link_load(load: &HashMap<Edge, Expression>, link: &Link) -> Expression {
    link.members
        .iter()
        .filter_map(|e| load.get(e).cloned())
        .sum()
}

/// Utilization of a link: its traffic divided by its bandwidth.
pub(crate) fn link_utilization(load: &HashMap<Edge, Expression>, link: &Link) -> Expression {
    link_load(load, link) * (1.0 / link.bandwidth)
}

/// Link capacity: for each link, `sum_t(demand(t) * sum_k f_t[k](e)) <= bandwidth(e)`.
pub(crate) fn capacity_constraints(
    model: &mut LinearModel,
    ctx: &BuildContext<'_>,
    load: &HashMap<Edge, Expression>,
) {
    for link in ctx.request.links(ctx.config.link_model) {
        model.leq(link_load(load, &link), link.bandwidth);
    }
}

/// Optional ceiling on the total network load: `sum(utilization(e)) <= ceiling`.
pub(crate) fn load_ceiling_constraint(
    model: &mut LinearModel,
    ctx: &BuildContext<'_>,
    load: &HashMap<Edge, Expression>,
) {
    if let Some(ceiling) = ctx.config.load_ceiling {
        let total: Expression = ctx
            .request
            .links(ctx.config.link_model)
            .iter()
            .map(|link| link_utilization(load, link))
            .sum();
        model.leq(total, ceiling);
    }
}

/// Create the variable `x` that is an upper bound on the utilization of every link.
pub(crate) fn max_utilization(
    model: &mut LinearModel,
    ctx: &BuildContext<'_>,
    load: &HashMap<Edge, Expression>,
) -> Variable {
    let x = model.non_negative();
    let utils = ctx
        .request
        .links(ctx.config.link_model)
        .iter()
        .map(|link| link_utilization(load, link))
        .collect::<Vec<_>>();
    c_upper_bound(model, x, utils);
    x
}
