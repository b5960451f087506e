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

//! Scoped access to the external MILP engine (CBC).
//!
//! The caller creates one [`EngineContext`] and passes it (as an `Arc`) to every solver it
//! constructs. A solver acquires an [`EngineSession`] before it builds its model, and the session
//! is released when it is dropped, on every exit path.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::{Duration, Instant},
};

use good_lp::{
    solvers::coin_cbc::{CoinCbcProblem, CoinCbcSolution},
    ResolutionError, SolverModel,
};
use log::debug;
use thiserror::Error;

/// Configuration passed through to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Time limit of a single engine call.
    pub time_limit: Option<Duration>,
    /// Number of threads used by CBC. With the feature `cbc-parallel`, this defaults to the
    /// number of cores (but at most 8).
    pub threads: Option<usize>,
    /// Disable the output of CBC.
    pub quiet: bool,
    /// Serialize all sessions of this context.
    pub exclusive: bool,
}

impl EngineConfig {
    /// Set the time limit of each engine call.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Disable the output of CBC.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Serialize all sessions of this context.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

/// Shared handle to the engine. Create it once and share it between all solver instances.
#[derive(Debug, Default)]
pub struct EngineContext {
    /// Configuration applied to every problem
    config: EngineConfig,
    /// Lock used when the context is exclusive
    lock: Mutex<()>,
    /// Number of currently acquired sessions
    active: AtomicUsize,
    /// Number of engine calls performed in total
    solves: AtomicUsize,
}

impl EngineContext {
    /// Create a new engine context.
    pub fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            ..Default::default()
        })
    }

    /// The configuration of this context
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Acquire a session. If the context is exclusive, this blocks until all other sessions are
    /// released.
    pub fn acquire(&self) -> Result<EngineSession<'_>, EngineError> {
        let guard = if self.config.exclusive {
            Some(self.lock.lock().map_err(|_| EngineError::Poisoned)?)
        } else {
            None
        };
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Acquired engine session ({active} active)");
        Ok(EngineSession {
            ctx: self,
            _guard: guard,
            started: Instant::now(),
        })
    }

    /// Number of sessions that are currently acquired.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of engine calls performed through this context.
    pub fn num_solves(&self) -> usize {
        self.solves.load(Ordering::SeqCst)
    }
}

/// Acquired engine session. The session is released once it is dropped.
#[derive(Debug)]
pub struct EngineSession<'a> {
    /// The context that owns this session
    ctx: &'a EngineContext,
    /// Lock guard, if the context is exclusive
    _guard: Option<MutexGuard<'a, ()>>,
    /// Time when the session was acquired
    started: Instant,
}

impl EngineSession<'_> {
    /// Apply the engine configuration and solve the problem. Returns `Ok(None)` if the problem is
    /// infeasible.
    pub fn optimize(
        &self,
        mut problem: CoinCbcProblem,
    ) -> Result<Option<CoinCbcSolution>, EngineError> {
        self.configure(&mut problem);
        self.ctx.solves.fetch_add(1, Ordering::SeqCst);
        match problem.solve() {
            Ok(solution) => Ok(Some(solution)),
            Err(ResolutionError::Infeasible) => Ok(None),
            Err(e) => Err(EngineError::Resolution(e)),
        }
    }

    /// Pass all configuration values to CBC.
    fn configure(&self, problem: &mut CoinCbcProblem) {
        let config = &self.ctx.config;

        // disable logging during tests
        #[cfg(any(test, feature = "hide-cbc-output"))]
        {
            problem.set_parameter("logLevel", "0");
        }
        if config.quiet {
            problem.set_parameter("logLevel", "0");
        }

        #[cfg(feature = "cbc-parallel")]
        let threads = config
            .threads
            .or_else(|| Some(num_cpus::get().min(8)));
        #[cfg(not(feature = "cbc-parallel"))]
        let threads = config.threads;
        if let Some(threads) = threads {
            problem.set_parameter("threads", &threads.to_string());
        }

        if let Some(t) = config.time_limit {
            problem.set_parameter("seconds", &t.as_secs().max(1).to_string());
        }
    }
}

impl Drop for EngineSession<'_> {
    fn drop(&mut self) {
        let active = self.ctx.active.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(
            "Released engine session after {:.3}s ({active} active)",
            self.started.elapsed().as_secs_f64()
        );
    }
}

/// Error of the optimization engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Another session panicked while holding the engine lock.
    #[error("The engine lock is poisoned")]
    Poisoned,
    /// The engine could not solve the model.
    #[error("Engine error: {0}")]
    Resolution(ResolutionError),
}
