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

//! Objective composer. The model parts contribute their [`Terms`], and the goal selects which terms
//! are minimized, and in which priority.
//!
//! | Goal                             | Priorities (highest first)                              |
//! |----------------------------------|---------------------------------------------------------|
//! | `LoadBalancing`                  | max utilization                                         |
//! | `LoadReduction`                  | sum of utilizations                                     |
//! | `BalanceThenReduce`              | max utilization, sum of utilizations                    |
//! | `ReduceThenBalance`              | sum of utilizations, max utilization                    |
//! | `DelayReduction`                 | sum of delays                                           |
//! | `DelayReductionWithDeviation`    | sum of delays, sum of deviations                        |
//! | `MinMaxDelayThenDeviation`       | sum of max delays + alpha * cost, sum of deviations     |
//! | `ShortestPathTree`               | sum of delays + alpha * cost                            |

use std::collections::HashMap;

use good_lp::Expression;

use crate::{goal::OptimizationGoal, topology::Edge};

use super::{
    constraints::{link_utilization, max_utilization},
    linear::LinearModel,
    BuildContext,
};

/// Linear terms contributed by the model parts.
pub(crate) struct Terms {
    /// `demand(t) * sum_k f_t[k](e)`, summed over all demands, for each edge
    pub load: HashMap<Edge, Expression>,
    /// `sum_t sum_d delay_t(d)`
    pub delay: Expression,
    /// `sum_t max_t`
    pub max_delay: Expression,
    /// `sum_t (max_t - min_t)`
    pub deviation: Expression,
    /// `sum(cost(type, v) * p[type](v))`
    pub deployment_cost: Expression,
}

impl Terms {
    /// All terms set to zero
    pub fn new() -> Self {
        Self {
            load: HashMap::new(),
            delay: Expression::from(0),
            max_delay: Expression::from(0),
            deviation: Expression::from(0),
            deployment_cost: Expression::from(0),
        }
    }

    /// Add traffic on an edge.
    pub fn add_load(&mut self, edge: Edge, load: Expression) {
        *self.load.entry(edge).or_insert_with(|| Expression::from(0)) += load;
    }

    /// Add all terms of `other` to `self`.
    pub fn merge(&mut self, other: Terms) {
        for (e, load) in other.load {
            self.add_load(e, load);
        }
        self.delay += other.delay;
        self.max_delay += other.max_delay;
        self.deviation += other.deviation;
        self.deployment_cost += other.deployment_cost;
    }
}

/// Compose the objective of each priority, highest priority first. Creates the max-utilization
/// variable if the goal needs it.
pub(crate) fn compose(
    model: &mut LinearModel,
    ctx: &BuildContext<'_>,
    terms: &Terms,
) -> Vec<Expression> {
    let goal = ctx.config.goal;
    let alpha = ctx.config.alpha;

    let total_utilization = || -> Expression {
        ctx.request
            .links(ctx.config.link_model)
            .iter()
            .map(|link| link_utilization(&terms.load, link))
            .sum()
    };
    let max_util = goal
        .needs_max_utilization()
        .then(|| Expression::from(max_utilization(model, ctx, &terms.load)));
    let max_util = || max_util.clone().unwrap_or_else(|| Expression::from(0));

    let objectives = match goal {
        OptimizationGoal::LoadBalancing => vec![max_util()],
        OptimizationGoal::LoadReduction => vec![total_utilization()],
        OptimizationGoal::BalanceThenReduce => vec![max_util(), total_utilization()],
        OptimizationGoal::ReduceThenBalance => vec![total_utilization(), max_util()],
        OptimizationGoal::DelayReduction => vec![terms.delay.clone()],
        OptimizationGoal::DelayReductionWithDeviation => {
            vec![terms.delay.clone(), terms.deviation.clone()]
        }
        OptimizationGoal::MinMaxDelayThenDeviation => vec![
            terms.max_delay.clone() + alpha * terms.deployment_cost.clone(),
            terms.deviation.clone(),
        ],
        OptimizationGoal::ShortestPathTree => {
            vec![terms.delay.clone() + alpha * terms.deployment_cost.clone()]
        }
    };
    debug_assert_eq!(objectives.len(), goal.num_priorities());
    objectives
}
