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

//! Optimization goals, selecting which terms the objective is composed of.

use clap::ValueEnum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Objective selector. Goals with multiple priorities are solved lexicographically: a lower
/// priority is only minimized among solutions that are optimal for all higher priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum OptimizationGoal {
    /// Minimize the maximum link utilization.
    LoadBalancing,
    /// Minimize the sum of all link utilizations.
    LoadReduction,
    /// Minimize the maximum link utilization, then the sum of all link utilizations.
    BalanceThenReduce,
    /// Minimize the sum of all link utilizations, then the maximum link utilization.
    ReduceThenBalance,
    /// Minimize the sum of all per-destination delays.
    #[default]
    DelayReduction,
    /// Minimize the sum of all per-destination delays, then the sum of all delay deviations.
    DelayReductionWithDeviation,
    /// Minimize the sum of the maximum delay of each demand plus the weighted deployment cost,
    /// then the sum of all delay deviations.
    MinMaxDelayThenDeviation,
    /// Minimize the sum of all per-destination delays plus the weighted deployment cost.
    ShortestPathTree,
}

impl OptimizationGoal {
    /// Returns `true` if the objective references the maximum and minimum delay of each demand.
    pub fn needs_delay_bounds(&self) -> bool {
        matches!(
            self,
            Self::DelayReductionWithDeviation | Self::MinMaxDelayThenDeviation
        )
    }

    /// Returns `true` if the objective references the maximum link utilization.
    pub fn needs_max_utilization(&self) -> bool {
        matches!(
            self,
            Self::LoadBalancing | Self::BalanceThenReduce | Self::ReduceThenBalance
        )
    }

    /// Returns `true` if the objective contains the delay of every destination.
    pub fn minimizes_all_delays(&self) -> bool {
        matches!(
            self,
            Self::DelayReduction | Self::DelayReductionWithDeviation | Self::ShortestPathTree
        )
    }

    /// Returns `true` if the objective contains the deployment cost.
    pub fn has_deployment_cost(&self) -> bool {
        matches!(self, Self::MinMaxDelayThenDeviation | Self::ShortestPathTree)
    }

    /// Number of lexicographic priorities of the goal.
    pub fn num_priorities(&self) -> usize {
        match self {
            Self::LoadBalancing
            | Self::LoadReduction
            | Self::DelayReduction
            | Self::ShortestPathTree => 1,
            Self::BalanceThenReduce
            | Self::ReduceThenBalance
            | Self::DelayReductionWithDeviation
            | Self::MinMaxDelayThenDeviation => 2,
        }
    }
}

impl std::fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::LoadBalancing => "load balancing",
            Self::LoadReduction => "load reduction",
            Self::BalanceThenReduce => "load balancing, then load reduction",
            Self::ReduceThenBalance => "load reduction, then load balancing",
            Self::DelayReduction => "delay reduction",
            Self::DelayReductionWithDeviation => "delay reduction, then deviation",
            Self::MinMaxDelayThenDeviation => "min-max delay, then deviation",
            Self::ShortestPathTree => "shortest path tree",
        })
    }
}
