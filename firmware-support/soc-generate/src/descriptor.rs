// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! The SoC descriptor file: which cpu, memories and peripherals make up the
//! design, where they go on the bus and how the design is wired to the board.

use serde::{Deserialize, Serialize};

use crate::{
    address_map::Placement,
    error::{Error, Result},
    peripherals::{MemoryKind, PeripheralKind},
    platform::ResourceDef,
    resources::BindingSpec,
};

const MOONDANCER: &str = include_str!("../data/moondancer.toml");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocConfig {
    pub name: String,
    pub cpu: CpuConfig,
    /// Clock domain of the platform the SoC runs from.
    #[serde(default = "default_clock_domain")]
    pub clock_domain: String,
    #[serde(default)]
    pub memories: Vec<MemoryConfig>,
    #[serde(default)]
    pub peripherals: Vec<PeripheralConfig>,
    /// Resources the design adds to the platform before binding.
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub bindings: Vec<BindingSpec>,
    #[serde(default)]
    pub firmware: FirmwareConfig,
}

fn default_clock_domain() -> String {
    "usb".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpuConfig {
    pub name: String,
    pub variant: String,
    #[serde(default)]
    pub reset_address: u64,
    #[serde(default = "default_arch")]
    pub arch: String,
}

fn default_arch() -> String {
    "riscv32".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    pub name: String,
    pub kind: MemoryKind,
    pub size: u64,
    #[serde(default)]
    pub address: Option<u64>,
    #[serde(default)]
    pub description: String,
}

impl MemoryConfig {
    pub fn placement(&self) -> Placement {
        self.address.map_or(Placement::Auto, Placement::Fixed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeripheralConfig {
    pub name: String,
    pub kind: PeripheralKind,
    #[serde(default)]
    pub address: Option<u64>,
    /// Place the peripheral inside the window of another one.
    #[serde(default)]
    pub attach_to: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PeripheralConfig {
    pub fn placement(&self) -> Result<Placement> {
        match (self.address, &self.attach_to) {
            (Some(_), Some(_)) => Err(Error::ConflictingPlacement {
                name: self.name.clone(),
            }),
            (Some(address), None) => Ok(Placement::Fixed(address)),
            (None, Some(parent)) => Ok(Placement::Attached {
                parent: parent.clone(),
            }),
            (None, None) => Ok(Placement::Auto),
        }
    }
}

/// Memories the firmware sections are linked into. Unset roles fall back to
/// the first RAM of the design.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmwareConfig {
    pub text: Option<String>,
    pub rodata: Option<String>,
    pub data: Option<String>,
    pub bss: Option<String>,
    pub heap: Option<String>,
    pub stack: Option<String>,
}

impl SocConfig {
    /// The Moondancer design shipped with this crate.
    pub fn moondancer() -> Result<Self> {
        Self::from_toml(MOONDANCER, "built-in SoC descriptor")
    }

    pub fn from_toml(src: &str, what: &str) -> Result<Self> {
        toml::from_str(src).map_err(|source| Error::Config {
            what: what.to_string(),
            source,
        })
    }
}
