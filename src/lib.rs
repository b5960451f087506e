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

//! # SFC-Tree: Joint placement and multicast routing of service function chains
//!
//! This library places virtual network functions (VNFs) on points of presence (PoPs) and routes
//! multicast traffic through them, such that every destination receives traffic that traversed
//! the demanded chain of VNFs in order. Placement and routing are decided jointly by a single
//! mixed-integer linear program, solved with CBC.
//!
//! ## Model
//!
//! A demand with a chain of length `L` is split into `L + 1` *logical segments*: segment `0` goes
//! from the ingress to the first VNF, segment `k` from VNF `k` to VNF `k + 1`, and segment `L` from
//! the last VNF to each destination. Each segment carries its own flow variables for every
//! destination, and the placement variables connect consecutive segments. The tree structure of
//! the selected edges is controlled with [`optimizer::TreeKind`]:
//!
//! - [`TreeKind::Overlay`](optimizer::TreeKind::Overlay): no tree constraints,
//! - [`TreeKind::PerSegment`](optimizer::TreeKind::PerSegment): each segment is a tree,
//! - [`TreeKind::Shared`](optimizer::TreeKind::Shared): all segments share one tree.
//!
//! The objective is chosen with [`OptimizationGoal`]. Goals with multiple priorities are solved
//! lexicographically.
//!
//! ## Usage
//!
//! ```no_run
//! use sfc_tree::{EngineConfig, EngineContext, Optimizer, Scenario, SolverConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = Scenario::eight_node()?.request()?;
//! let engine = EngineContext::new(EngineConfig::default());
//! let mut solver = Optimizer::new(engine, SolverConfig::default());
//! match solver.solve(&request)? {
//!     Some(solution) => println!("{solution}"),
//!     None => println!("infeasible"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde`: Serialize and deserialize requests, configurations, and solutions.
//! - `hide-cbc-output`: Never show the output of CBC.
//! - `singlethread-cbc`: Only allow a single CBC instance at a time (enabled by default).
//! - `cbc-parallel`: Let CBC use multiple threads for each solve call.

#![deny(
    missing_docs,
    clippy::missing_docs_in_private_items,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::result_large_err)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod demand;
pub mod engine;
pub mod goal;
pub mod heuristic;
pub mod optimizer;
pub mod request;
pub mod scenario;
pub mod solution;
#[cfg(test)]
mod test;
pub mod topology;
pub mod vnf;

pub use demand::Demand;
pub use engine::{EngineConfig, EngineContext};
pub use goal::OptimizationGoal;
pub use heuristic::FixedPlacement;
pub use optimizer::{NoChainSolver, Optimizer, SolverConfig, SolverError};
pub use request::OptimizationRequest;
pub use scenario::Scenario;
pub use solution::OptimizationSolution;
pub use topology::{NodeId, Topology};
pub use vnf::VnfType;
