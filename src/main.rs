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

use std::time::Duration;

use clap::{Parser, ValueEnum};
use itertools::Itertools;
use log::{info, warn};
use rand::prelude::*;

use sfc_tree::{
    optimizer::{LinkModel, TreeKind},
    scenario::ScenarioKind,
    EngineConfig, EngineContext, FixedPlacement, NoChainSolver, OptimizationGoal, Optimizer,
    SolverConfig,
};

/// Place VNF chains and route multicast demands on a built-in scenario.
#[derive(Debug, Parser)]
struct Cli {
    /// Scenario to solve.
    #[clap(long, short, value_enum, default_value_t = ScenarioKind::EightNode)]
    scenario: ScenarioKind,
    /// Number of nodes of the line and ring scenarios.
    #[clap(long, short = 'n', default_value_t = 6)]
    size: usize,
    /// Solver variant.
    #[clap(long, value_enum, default_value_t = Variant::Joint)]
    variant: Variant,
    /// Optimization goal.
    #[clap(long, short, value_enum, default_value_t = OptimizationGoal::DelayReduction)]
    goal: OptimizationGoal,
    /// Tree structure of each demand.
    #[clap(long, short, value_enum, default_value_t = TreeKind::Overlay)]
    tree: TreeKind,
    /// Weight of the deployment cost.
    #[clap(long, default_value_t = 1.0)]
    alpha: f64,
    /// Upper bound on the sum of all link utilizations.
    #[clap(long)]
    load_ceiling: Option<f64>,
    /// How both directions of a link share its bandwidth.
    #[clap(long, value_enum, default_value_t = LinkModel::Directed)]
    link_model: LinkModel,
    /// Time limit of each solve call, in seconds.
    #[clap(long)]
    time_limit: Option<u64>,
    /// Replace the demands of the scenario by this many random demands.
    #[clap(long, short)]
    demands: Option<usize>,
    /// Seed used to generate random demands.
    #[clap(long)]
    seed: Option<u64>,
    /// Print the solution as JSON.
    #[cfg(feature = "serde")]
    #[clap(long)]
    json: bool,
}

/// Which solver to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    /// Place and route all demands jointly.
    Joint,
    /// Place the single VNF by shortest paths, then route.
    FixedPlacement,
    /// Only route demands without any VNF chain.
    NoChain,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let args = Cli::parse();

    let mut scenario = args.scenario.build(args.size)?;
    if let Some(n) = args.demands {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let demands = scenario.random_demands(n, &mut rng);
        scenario = scenario.with_demands(demands);
    }
    let request = scenario.request()?;
    info!(
        "Solving {} demands on {} nodes: {}",
        request.demands().len(),
        request.num_nodes(),
        request.demands().iter().join(", ")
    );

    let mut engine_config = EngineConfig::default();
    if let Some(secs) = args.time_limit {
        engine_config = engine_config.with_time_limit(Duration::from_secs(secs));
    }
    let engine = EngineContext::new(engine_config);

    let mut config = SolverConfig::default()
        .with_goal(args.goal)
        .with_tree(args.tree)
        .with_alpha(args.alpha)
        .with_link_model(args.link_model);
    if let Some(ceiling) = args.load_ceiling {
        config = config.with_load_ceiling(ceiling);
    }

    let solution = match args.variant {
        Variant::Joint => Optimizer::new(engine, config).solve(&request)?,
        Variant::FixedPlacement => FixedPlacement::new(engine, config).solve(&request)?,
        Variant::NoChain => NoChainSolver::new(engine, config).solve(&request)?,
    };

    let Some(solution) = solution else {
        warn!("The problem is infeasible");
        return Ok(());
    };

    #[cfg(feature = "serde")]
    if args.json {
        println!("{}", serde_json::to_string_pretty(&solution)?);
        return Ok(());
    }

    println!("{solution}");
    Ok(())
}
