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

//! Solver driver, placing the VNFs and routing all demands jointly using a MILP.
//!
//! The driver runs through the states `INIT -> VARIABLES -> OBJECTIVE -> CONSTRAINTS -> OPTIMIZE
//! -> EXTRACT -> DONE`, in this order. Demands with a VNF chain are handled by the chain part, and
//! all others by the no-chain part. Both parts contribute to the same link capacity constraints.
//! The tree-structure strategy is selected with [`SolverConfig::tree`].
//!
//! If the engine reports the model to be infeasible, [`Optimizer::solve`] returns `Ok(None)`.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use boolinator::Boolinator;
use good_lp::Solution;
use log::{debug, error, info};
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    engine::{EngineContext, EngineError, EngineSession},
    goal::OptimizationGoal,
    request::{OptimizationRequest, RequestError},
    solution::{OptimizationSolution, SolutionBuilder, SolutionViolation},
    topology::NodeId,
    vnf::VnfType,
};

mod chain;
mod constraints;
mod extract;
mod linear;
mod no_chain;
mod objective;
mod or_tools;
mod tree;
mod variables;

pub use crate::request::LinkModel;
pub use no_chain::NoChainSolver;
pub use tree::TreeKind;

use chain::ChainModel;
use linear::LinearModel;
use no_chain::NoChainModel;
use tree::TreeStrategy;

/// Configuration of a solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct SolverConfig {
    /// Optimization goal
    pub goal: OptimizationGoal,
    /// Tree-structure strategy
    pub tree: TreeKind,
    /// Weight of the deployment cost relative to the delay
    pub alpha: f64,
    /// Upper bound on the sum of all link utilizations
    pub load_ceiling: Option<f64>,
    /// How the bandwidth of both directions of a link is accounted for
    pub link_model: LinkModel,
    /// VNF types that may only be placed on the given node
    pub pinned: BTreeMap<VnfType, NodeId>,
    /// Slack when locking the optimum of a higher priority, relative to the optimum (and absolute
    /// for optima smaller than 1).
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            goal: OptimizationGoal::default(),
            tree: TreeKind::default(),
            alpha: 1.0,
            load_ceiling: None,
            link_model: LinkModel::default(),
            pinned: BTreeMap::new(),
            tolerance: 1e-6,
        }
    }
}

impl SolverConfig {
    /// Set the optimization goal.
    pub fn with_goal(mut self, goal: OptimizationGoal) -> Self {
        self.goal = goal;
        self
    }

    /// Set the tree-structure strategy.
    pub fn with_tree(mut self, tree: TreeKind) -> Self {
        self.tree = tree;
        self
    }

    /// Set the weight of the deployment cost.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Limit the sum of all link utilizations.
    pub fn with_load_ceiling(mut self, ceiling: f64) -> Self {
        self.load_ceiling = Some(ceiling);
        self
    }

    /// Set the link model.
    pub fn with_link_model(mut self, link_model: LinkModel) -> Self {
        self.link_model = link_model;
        self
    }

    /// Set the tolerance used for lexicographic optimization.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Only allow `ty` to be placed on `node`.
    pub fn pin(mut self, ty: VnfType, node: NodeId) -> Self {
        self.pinned.insert(ty, node);
        self
    }

    /// Check the configuration against the request.
    pub fn validate(&self, request: &OptimizationRequest) -> Result<(), ConfigError> {
        (self.alpha.is_finite() && self.alpha >= 0.0).ok_or(ConfigError::InvalidAlpha(self.alpha))?;
        if let Some(c) = self.load_ceiling {
            (c.is_finite() && c > 0.0).ok_or(ConfigError::InvalidLoadCeiling(c))?;
        }
        for (ty, v) in self.pinned.iter() {
            request
                .node(*v)
                .map(|n| n.supports(*ty))
                .unwrap_or(false)
                .ok_or(ConfigError::InvalidPin(*ty, *v))?;
        }
        Ok(())
    }
}

/// State of the solver driver. States are only traversed in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SolverState {
    /// Partition the demands and validate the configuration.
    #[default]
    Init,
    /// Create all variables.
    Variables,
    /// Compose the objective.
    Objective,
    /// Add all constraints.
    Constraints,
    /// Call the engine, once per priority.
    Optimize,
    /// Read back the solution.
    Extract,
    /// Finished successfully.
    Done,
}

impl std::fmt::Display for SolverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SolverState::Init => "INIT",
            SolverState::Variables => "VARIABLES",
            SolverState::Objective => "OBJECTIVE",
            SolverState::Constraints => "CONSTRAINTS",
            SolverState::Optimize => "OPTIMIZE",
            SolverState::Extract => "EXTRACT",
            SolverState::Done => "DONE",
        })
    }
}

/// Size of the model of the last solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProblemSize {
    /// Number of constraints (equations)
    pub rows: usize,
    /// Number of variables
    pub cols: usize,
    /// Number of priorities, i.e., engine calls
    pub priorities: usize,
}

impl std::fmt::Display for ProblemSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}x{})", self.priorities, self.rows, self.cols)
    }
}

/// Everything the model parts need while building the model.
pub(crate) struct BuildContext<'a> {
    /// The request
    pub request: &'a OptimizationRequest,
    /// The configuration
    pub config: &'a SolverConfig,
    /// The tree-structure strategy
    pub tree: &'a dyn TreeStrategy,
}

impl BuildContext<'_> {
    /// Nodes on which `ty` may be placed.
    pub fn candidates(&self, ty: VnfType) -> Vec<NodeId> {
        match self.config.pinned.get(&ty) {
            Some(v) => vec![*v],
            None => self.request.capable_nodes(ty),
        }
    }
}

/// Solver for the joint placement and routing problem. A solver must not be used concurrently;
/// create one solver per thread instead, sharing the same [`EngineContext`].
#[derive(Debug)]
pub struct Optimizer {
    /// Handle to the engine
    engine: Arc<EngineContext>,
    /// Configuration
    config: SolverConfig,
    /// Tree-structure strategy, derived from the configuration
    tree: Box<dyn TreeStrategy>,
    /// Current state
    state: SolverState,
    /// Size of the last model
    size: Option<ProblemSize>,
}

impl Optimizer {
    /// Create a new solver.
    pub fn new(engine: Arc<EngineContext>, config: SolverConfig) -> Self {
        let tree = config.tree.strategy();
        Self {
            engine,
            config,
            tree,
            state: SolverState::Init,
            size: None,
        }
    }

    /// The configuration of the solver
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// State reached by the last call to [`Optimizer::solve`]. After a successful call, this is
    /// [`SolverState::Done`]; otherwise, it is the state in which the solver stopped.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Size of the model built by the last call to [`Optimizer::solve`].
    pub fn problem_size(&self) -> Option<ProblemSize> {
        self.size
    }

    /// Solve the request. Returns `Ok(None)` if the request is infeasible. The engine session is
    /// acquired before building the model, and released before returning.
    pub fn solve(
        &mut self,
        request: &OptimizationRequest,
    ) -> Result<Option<OptimizationSolution>, SolverError> {
        let engine = Arc::clone(&self.engine);
        let session = engine.acquire()?;
        let start = Instant::now();

        let result = self.run(&session, request);
        match &result {
            Ok(Some(sol)) => info!(
                "Solved {} demands in {:.3}s (objective {:?})",
                request.demands().len(),
                start.elapsed().as_secs_f64(),
                sol.objectives()
            ),
            Ok(None) => info!(
                "Request is infeasible (after {:.3}s)",
                start.elapsed().as_secs_f64()
            ),
            Err(e) => error!("Solver failed in state {}: {e}", self.state),
        }
        result
    }

    /// Walk through all states of the driver.
    fn run(
        &mut self,
        session: &EngineSession<'_>,
        request: &OptimizationRequest,
    ) -> Result<Option<OptimizationSolution>, SolverError> {
        self.size = None;
        self.state = SolverState::Init;
        debug!(
            "-> {} ({}, {})",
            self.state,
            self.config.goal,
            self.tree.kind()
        );

        self.config.validate(request)?;
        let ctx = BuildContext {
            request,
            config: &self.config,
            tree: self.tree.as_ref(),
        };
        let (chained, unchained): (Vec<usize>, Vec<usize>) =
            (0..request.demands().len()).partition(|t| request.demands()[*t].is_chained());
        let mut no_chain = NoChainModel::init(&ctx, unchained);
        let mut chain = ChainModel::init(&ctx, chained);

        advance(&mut self.state, SolverState::Variables);
        let mut model = LinearModel::new();
        no_chain.add_variables(&mut model, &ctx);
        chain.add_variables(&mut model, &ctx);
        debug!("Created {} variables", model.num_cols());

        advance(&mut self.state, SolverState::Objective);
        let mut terms = no_chain.terms(&ctx);
        terms.merge(chain.terms(&ctx));
        let objectives = objective::compose(&mut model, &ctx, &terms);

        advance(&mut self.state, SolverState::Constraints);
        no_chain.add_constraints(&mut model, &ctx);
        chain.add_constraints(&mut model, &ctx);
        constraints::capacity_constraints(&mut model, &ctx, &terms.load);
        constraints::load_ceiling_constraint(&mut model, &ctx, &terms.load);
        let size = ProblemSize {
            rows: model.num_rows(),
            cols: model.num_cols(),
            priorities: objectives.len(),
        };
        self.size = Some(size);
        debug!("Problem size: {size}");

        advance(&mut self.state, SolverState::Optimize);
        let tolerance = self.config.tolerance.max(0.0);
        let mut locks = Vec::with_capacity(objectives.len());
        let mut values = Vec::with_capacity(objectives.len());
        let mut last = None;
        for (i, objective) in objectives.iter().enumerate() {
            info!(
                "Optimizing priority {} of {} ({})",
                i + 1,
                objectives.len(),
                self.config.goal
            );
            let Some(solution) = session.optimize(model.problem(objective, &locks))? else {
                info!("Priority {} of {} is infeasible", i + 1, objectives.len());
                return Ok(None);
            };
            let value = objective.eval_with(&solution);
            debug!("Optimum of priority {}: {value}", i + 1);
            locks.push((objective.clone(), value + tolerance * value.abs().max(1.0)));
            values.push(value);
            last = Some(solution);
        }
        let Some(solution) = last else {
            return Ok(None);
        };

        advance(&mut self.state, SolverState::Extract);
        let result = extract_solution(&ctx, &no_chain, &chain, &solution, values);
        result.verify(request, &self.config)?;

        advance(&mut self.state, SolverState::Done);
        Ok(Some(result))
    }
}

/// Move to the next state.
fn advance(state: &mut SolverState, next: SolverState) {
    debug_assert!(next > *state);
    debug!("{} -> {}", state, next);
    *state = next;
}

/// Read back all demands.
fn extract_solution(
    ctx: &BuildContext<'_>,
    no_chain: &NoChainModel,
    chain: &ChainModel,
    solution: &impl Solution,
    objectives: Vec<f64>,
) -> OptimizationSolution {
    let mut builder = SolutionBuilder::new();
    no_chain.extract(ctx, solution, &mut builder);
    chain.extract(ctx, solution, &mut builder);
    builder.objectives(objectives);
    builder.build(ctx.request, ctx.config.link_model)
}

/// Solve many independent requests in parallel, with one solver per request.
pub fn solve_all(
    engine: &Arc<EngineContext>,
    config: &SolverConfig,
    requests: &[OptimizationRequest],
) -> Vec<Result<Option<OptimizationSolution>, SolverError>> {
    requests
        .par_iter()
        .map(|request| Optimizer::new(Arc::clone(engine), config.clone()).solve(request))
        .collect()
}

/// Configuration error of a solver variant
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The solver variant requires a specific number of demands.
    #[error("Expected {expected} demands, but found {found}")]
    DemandCardinality {
        /// Required number of demands
        expected: usize,
        /// Number of demands in the request
        found: usize,
    },
    /// The solver variant requires a specific chain length.
    #[error("Expected a chain of length {expected}, but found {found}")]
    ChainLength {
        /// Required chain length
        expected: usize,
        /// Chain length of the demand
        found: usize,
    },
    /// The no-chain solver received a chained demand.
    #[error("Demand {0} has a VNF chain, which the no-chain solver cannot handle")]
    ChainedDemand(usize),
    /// A VNF type is pinned to a node that cannot host it.
    #[error("{0} is pinned to {1:?}, which cannot host it")]
    InvalidPin(VnfType, NodeId),
    /// The load ceiling is not positive.
    #[error("Invalid load ceiling: {0}")]
    InvalidLoadCeiling(f64),
    /// The weight of the deployment cost is negative.
    #[error("Invalid weight of the deployment cost: {0}")]
    InvalidAlpha(f64),
}

/// Error of a solve call. Infeasibility is not an error.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The request violates a precondition.
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),
    /// The solver is not configured correctly.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The engine failed.
    #[error("{0}")]
    Engine(#[from] EngineError),
    /// The extracted solution violates an invariant.
    #[error("Inconsistent solution: {0}")]
    InconsistentSolution(#[from] SolutionViolation),
}
