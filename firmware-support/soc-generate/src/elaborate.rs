// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Elaboration of a SoC descriptor against a platform: extra resources are
//! added, the default clock and every wiring entry are bound, and the SoC is
//! placed on the bus.

use serde::Serialize;
use tracing::info;

use crate::{
    descriptor::SocConfig,
    design::Design,
    error::{Error, Result},
    platform::Platform,
    resources::{bind_all, BoundSignal, ResourceBinding},
    soc::Soc,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Elaboration {
    pub design: Design,
    /// The platform's default clock input.
    pub clock: ResourceBinding,
    pub signals: Vec<BoundSignal>,
}

impl Elaboration {
    /// Bindings that ended up on an alternate resource.
    pub fn fallbacks(&self) -> impl Iterator<Item = &BoundSignal> {
        self.signals.iter().filter(|s| s.binding.fallback)
    }

    /// Every binding, the clock first.
    pub fn bindings(&self) -> impl Iterator<Item = &ResourceBinding> {
        std::iter::once(&self.clock).chain(self.signals.iter().map(|s| &s.binding))
    }
}

pub fn elaborate(config: &SocConfig, platform: &mut Platform) -> Result<Elaboration> {
    let soc = Soc::from_config(config)?;

    for spec in &config.bindings {
        let owner = spec.signal.split('.').next().unwrap_or_default();
        if owner != "cpu" && !soc.has_peripheral(owner) {
            return Err(Error::UnknownSignal {
                signal: spec.signal.clone(),
            });
        }
    }

    platform.add_resources(&config.resources)?;

    let default_clk = platform.desc().default_clk.clone();
    let clock = platform.request(&default_clk, 0)?;
    let signals = bind_all(platform, &config.bindings)?;

    for signal in &signals {
        if let Some(resource) = signal.binding.fallback_used() {
            info!(
                "{} uses {resource} in place of {}",
                signal.signal, signal.binding.requested
            );
        }
    }

    let design = soc.finalize(platform)?;
    info!(
        "elaborated {} for {} at {} Hz",
        design.name, design.platform, design.clock_frequency
    );

    Ok(Elaboration {
        design,
        clock,
        signals,
    })
}
