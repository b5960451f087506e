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

//! Tests that run the full solver on small topologies.

use std::sync::Arc;

use crate::{
    engine::{EngineConfig, EngineContext},
    topology::Edge,
};

mod eight_node;
mod goals;
mod heuristic;
mod routing;
mod trees;

/// Tolerance when comparing objective values
const EPS: f64 = 1e-4;

/// Create a new engine context for a single test.
fn engine() -> Arc<EngineContext> {
    EngineContext::new(EngineConfig::default().quiet())
}

/// Returns `true` if both values are equal up to [`EPS`].
fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

/// Check that every node has at most one incoming edge among `edges`.
fn in_degree_at_most_one<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> bool {
    let mut seen = std::collections::HashSet::new();
    edges.into_iter().all(|e| seen.insert(e.dst))
}
