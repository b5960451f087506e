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

//! Virtual network function types and the resources they consume.

use clap::ValueEnum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of virtual network function that can be part of a service function chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum VnfType {
    /// Video transcoder
    Transcoder,
    /// Intrusion detection system
    Ids,
    /// Stateful firewall
    Firewall,
    /// Network address translation
    Nat,
    /// Deep packet inspection
    Dpi,
}

impl VnfType {
    /// All known VNF types.
    pub const ALL: [VnfType; 5] = [
        VnfType::Transcoder,
        VnfType::Ids,
        VnfType::Firewall,
        VnfType::Nat,
        VnfType::Dpi,
    ];

    /// Processing delay of this VNF type on a node without hardware acceleration. The delay on an
    /// actual node is this value multiplied by the acceleration factor of that node.
    pub fn base_delay(&self) -> f64 {
        match self {
            VnfType::Transcoder => 40.0,
            VnfType::Ids => 40.0,
            VnfType::Firewall => 10.0,
            VnfType::Nat => 5.0,
            VnfType::Dpi => 30.0,
        }
    }

    /// Amount of `resource` a single instance of this VNF type occupies on its host.
    pub fn requirement(&self, resource: Resource) -> f64 {
        match (self, resource) {
            (VnfType::Transcoder, Resource::Cpu) => 4.0,
            (VnfType::Transcoder, Resource::Memory) => 2.0,
            (VnfType::Ids, Resource::Cpu) => 2.0,
            (VnfType::Ids, Resource::Memory) => 2.0,
            (VnfType::Firewall, Resource::Cpu) => 1.0,
            (VnfType::Firewall, Resource::Memory) => 1.0,
            (VnfType::Nat, Resource::Cpu) => 1.0,
            (VnfType::Nat, Resource::Memory) => 0.5,
            (VnfType::Dpi, Resource::Cpu) => 3.0,
            (VnfType::Dpi, Resource::Memory) => 2.0,
        }
    }
}

impl std::fmt::Display for VnfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VnfType::Transcoder => "TRANSCODER",
            VnfType::Ids => "IDS",
            VnfType::Firewall => "FIREWALL",
            VnfType::Nat => "NAT",
            VnfType::Dpi => "DPI",
        })
    }
}

/// Kind of node resource that VNF instances consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Resource {
    /// Processing units
    Cpu,
    /// Memory, in GB
    Memory,
}

impl Resource {
    /// All known resource kinds.
    pub const ALL: [Resource; 2] = [Resource::Cpu, Resource::Memory];
}
