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

//! Traffic demands.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{topology::NodeId, vnf::VnfType};

/// A single multicast traffic demand. Traffic enters the network at the ingress, must traverse
/// every VNF of the chain in order, and must reach every node of the egress set.
///
/// The demand is split into logical positions: position `0` is the ingress, position `k` (for `k`
/// in `1..=L`) is the VNF `chain[k - 1]`, and position `L + 1` is the destination. Logical segment
/// `k` connects position `k` with position `k + 1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Demand {
    /// Ingress node
    ingress: NodeId,
    /// Egress nodes
    egress: BTreeSet<NodeId>,
    /// Ordered VNF chain (possibly empty)
    chain: Vec<VnfType>,
    /// Bandwidth demand
    volume: f64,
}

impl Demand {
    /// Create a new demand. The demand is validated once it is part of an
    /// [`OptimizationRequest`](crate::request::OptimizationRequest).
    pub fn new(
        ingress: NodeId,
        egress: impl IntoIterator<Item = NodeId>,
        chain: impl IntoIterator<Item = VnfType>,
        volume: f64,
    ) -> Self {
        Self {
            ingress,
            egress: egress.into_iter().collect(),
            chain: chain.into_iter().collect(),
            volume,
        }
    }

    /// Create a demand without any VNF chain.
    pub fn unchained(ingress: NodeId, egress: impl IntoIterator<Item = NodeId>, volume: f64) -> Self {
        Self::new(ingress, egress, Vec::new(), volume)
    }

    /// Ingress node of the demand
    pub fn ingress(&self) -> NodeId {
        self.ingress
    }

    /// Set of egress nodes
    pub fn egress(&self) -> &BTreeSet<NodeId> {
        &self.egress
    }

    /// The VNF chain of the demand
    pub fn chain(&self) -> &[VnfType] {
        &self.chain
    }

    /// Bandwidth demand
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns `true` if the demand requires at least one VNF.
    pub fn is_chained(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Number of logical segments, i.e., `L + 1`.
    pub fn num_segments(&self) -> usize {
        self.chain.len() + 1
    }

    /// VNF type at logical position `k`, or `None` for the ingress and destination positions.
    pub fn position_type(&self, k: usize) -> Option<VnfType> {
        if k == 0 {
            None
        } else {
            self.chain.get(k - 1).copied()
        }
    }
}

impl std::fmt::Display for Demand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use itertools::Itertools;
        write!(
            f,
            "{} -> [{}] -> {{{}}} ({})",
            self.ingress.index(),
            self.chain.iter().join(", "),
            self.egress.iter().map(|n| n.index()).join(", "),
            self.volume
        )
    }
}
