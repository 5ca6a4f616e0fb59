// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Binding of logical signal groups to the physical pins of a platform.
//!
//! There are two binding policies. Mandatory bindings propagate every error
//! and abort the build. Optional bindings log a warning and carry on when the
//! resource does not exist, but still propagate any other error: a resource
//! that is requested twice or points at a missing connector is a mistake in
//! the design, not a feature the board lacks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    platform::{ConnectorRef, Direction, Platform, ResourceDef},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignalBinding {
    /// Sub-signal name, empty for single-signal resources.
    pub name: String,
    pub pins: Vec<String>,
    pub dir: Direction,
    pub attrs: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceBinding {
    /// First resource that was asked for.
    pub requested: String,
    /// Resource that was actually bound.
    pub resource: String,
    pub number: u32,
    pub fallback: bool,
    pub clock: Option<f64>,
    pub signals: Vec<SignalBinding>,
}

impl ResourceBinding {
    /// Top level port name, `<resource>_<number>`.
    pub fn port(&self) -> String {
        format!("{}_{}", self.resource, self.number)
    }

    /// The alternate that was bound in place of the requested resource.
    pub fn fallback_used(&self) -> Option<&str> {
        self.fallback.then_some(self.resource.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    #[default]
    Mandatory,
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRef {
    pub name: String,
    #[serde(default)]
    pub number: u32,
}

/// One entry of a design's pin wiring: a logical signal group and the
/// resources that may carry it, in order of preference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    pub signal: String,
    pub candidates: Vec<ResourceRef>,
    #[serde(default)]
    pub policy: Policy,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundSignal {
    pub signal: String,
    pub binding: ResourceBinding,
}

impl Platform {
    /// Bind a resource the design cannot do without.
    pub fn request(&mut self, name: &str, number: u32) -> Result<ResourceBinding> {
        let Some(resource) = self.lookup(name, number).cloned() else {
            return Err(Error::ResourceNotFound {
                name: name.to_string(),
                number,
                platform: self.name().to_string(),
            });
        };
        self.bind(name, &resource)
    }

    /// Bind the first of `candidates` that exists on this platform.
    pub fn request_any(&mut self, candidates: &[(&str, u32)]) -> Result<ResourceBinding> {
        let Some((first, _)) = candidates.first() else {
            return Err(Error::EmptyCandidates);
        };

        for &(name, number) in candidates {
            if let Some(resource) = self.lookup(name, number).cloned() {
                return self.bind(first, &resource);
            }
            debug!("{} has no {name}#{number}", self.name());
        }

        Err(Error::NoCandidateResource {
            candidates: candidates
                .iter()
                .map(|(name, number)| format!("{name}#{number}"))
                .collect::<Vec<_>>()
                .join(", "),
            platform: self.name().to_string(),
        })
    }

    /// Like [`Platform::request_any`], but a missing resource only earns a
    /// warning.
    pub fn request_optional(
        &mut self,
        candidates: &[(&str, u32)],
    ) -> Result<Option<ResourceBinding>> {
        match self.request_any(candidates) {
            Ok(binding) => Ok(Some(binding)),
            Err(err) if err.is_resource_not_found() => {
                warn!("{err}, continuing without it");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn bind(&mut self, requested: &str, resource: &ResourceDef) -> Result<ResourceBinding> {
        if self.requested.contains(&resource.key()) {
            return Err(Error::ResourceAlreadyRequested {
                name: resource.name.clone(),
                number: resource.number,
            });
        }

        let signals = resource
            .signals()
            .into_iter()
            .map(|signal| {
                let pins = self.resolve_pins(resource, &signal.pins, signal.conn.as_ref())?;
                let mut attrs = resource.attrs.clone();
                attrs.extend(signal.attrs);
                Ok(SignalBinding {
                    name: signal.name,
                    pins,
                    dir: signal.dir,
                    attrs,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if signals.is_empty() {
            return Err(Error::EmptyResource {
                name: resource.name.clone(),
                number: resource.number,
            });
        }
        self.requested.insert(resource.key());

        let binding = ResourceBinding {
            requested: requested.to_string(),
            resource: resource.name.clone(),
            number: resource.number,
            fallback: requested != resource.name,
            clock: resource.clock,
            signals,
        };
        debug!(
            "bound {}#{} for {requested}{}",
            binding.resource,
            binding.number,
            if binding.fallback { " (fallback)" } else { "" }
        );
        Ok(binding)
    }

    fn resolve_pins(
        &self,
        resource: &ResourceDef,
        pins: &str,
        conn: Option<&ConnectorRef>,
    ) -> Result<Vec<String>> {
        let pins: Vec<&str> = pins.split_whitespace().collect();
        if pins.is_empty() {
            return Err(Error::EmptyResource {
                name: resource.name.clone(),
                number: resource.number,
            });
        }

        let Some(conn) = conn else {
            return Ok(pins.into_iter().map(str::to_string).collect());
        };
        let Some(connector) = self.connector(&conn.name, conn.number) else {
            return Err(Error::UnknownConnector {
                name: conn.name.clone(),
                number: conn.number,
            });
        };
        pins.into_iter()
            .map(|pin| {
                connector
                    .pin(pin)
                    .map(str::to_string)
                    .ok_or_else(|| Error::UnknownConnectorPin {
                        name: conn.name.clone(),
                        number: conn.number,
                        pin: pin.to_string(),
                    })
            })
            .collect()
    }
}

/// Bind one wiring entry according to its policy. `Ok(None)` means an
/// optional signal was left unconnected.
pub fn bind(platform: &mut Platform, spec: &BindingSpec) -> Result<Option<BoundSignal>> {
    let candidates: Vec<(&str, u32)> = spec
        .candidates
        .iter()
        .map(|c| (c.name.as_str(), c.number))
        .collect();

    let binding = match spec.policy {
        Policy::Mandatory => Some(platform.request_any(&candidates)?),
        Policy::Optional => platform.request_optional(&candidates)?,
    };

    Ok(binding.map(|binding| BoundSignal {
        signal: spec.signal.clone(),
        binding,
    }))
}

pub fn bind_all(platform: &mut Platform, specs: &[BindingSpec]) -> Result<Vec<BoundSignal>> {
    let mut bound = Vec::new();
    for spec in specs {
        if let Some(signal) = bind(platform, spec)? {
            bound.push(signal);
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformCatalogue;

    fn platform(name: &str) -> Platform {
        PlatformCatalogue::builtin()
            .unwrap()
            .select(Some(name))
            .unwrap()
    }

    #[test]
    fn aux_phy_falls_back_to_host_phy() {
        let mut r04 = platform("CynthionPlatformRev0D4");
        let binding = r04.request_any(&[("aux_phy", 0), ("host_phy", 0)]).unwrap();

        assert_eq!(binding.requested, "aux_phy");
        assert_eq!(binding.resource, "host_phy");
        assert_eq!(binding.fallback_used(), Some("host_phy"));
        assert_eq!(binding.port(), "host_phy_0");
    }

    #[test]
    fn preferred_resource_wins_when_present() {
        let mut r14 = platform("CynthionPlatformRev1D4");
        let binding = r14.request_any(&[("aux_phy", 0), ("host_phy", 0)]).unwrap();

        assert_eq!(binding.resource, "aux_phy");
        assert!(!binding.fallback);
        assert_eq!(binding.fallback_used(), None);
    }

    #[test]
    fn missing_mandatory_resource_is_an_error() {
        let mut r04 = platform("CynthionPlatformRev0D4");
        let err = r04.request("control_phy", 0).unwrap_err();
        assert!(err.is_resource_not_found());

        let err = r04.request_any(&[("aux_phy", 0), ("ghost_phy", 0)]).unwrap_err();
        assert!(matches!(err, Error::NoCandidateResource { .. }));
    }

    #[test]
    fn missing_optional_resource_is_tolerated() {
        let mut r04 = platform("CynthionPlatformRev0D4");
        assert_eq!(r04.request_optional(&[("button_user", 0)]).unwrap(), None);
    }

    #[test]
    fn optional_binding_still_reports_double_requests() {
        let mut r14 = platform("CynthionPlatformRev1D4");
        r14.request("button_user", 0).unwrap();

        let err = r14.request_optional(&[("button_user", 0)]).unwrap_err();
        assert!(matches!(err, Error::ResourceAlreadyRequested { .. }));
    }

    #[test]
    fn empty_candidate_list_is_not_swallowed() {
        let mut r14 = platform("CynthionPlatformRev1D4");
        assert!(matches!(
            r14.request_any(&[]).unwrap_err(),
            Error::EmptyCandidates
        ));

        let spec = BindingSpec {
            signal: "cpu.ext_reset".into(),
            candidates: vec![],
            policy: Policy::Optional,
        };
        let err = bind(&mut r14, &spec).unwrap_err();
        assert!(!err.is_resource_not_found());
    }

    #[test]
    fn connector_pins_resolve_to_balls() {
        let mut r14 = platform("CynthionPlatformRev1D4");
        let pmod = r14.request("user_pmod", 0).unwrap();

        assert_eq!(pmod.signals.len(), 1);
        assert_eq!(
            pmod.signals[0].pins,
            ["N5", "P5", "R5", "T5", "N6", "P6", "R6", "T6"]
        );
        assert_eq!(pmod.signals[0].attrs["IO_TYPE"], "LVCMOS33");
    }

    #[test]
    fn unknown_connector_pins_are_reported() {
        let mut r14 = platform("CynthionPlatformRev1D4");
        r14.add_resources(&[ResourceDef {
            name: "broken".into(),
            number: 0,
            pins: Some("5".into()),
            dir: Direction::Input,
            conn: Some(ConnectorRef {
                name: "pmod".into(),
                number: 1,
            }),
            subsignals: vec![],
            attrs: BTreeMap::new(),
            clock: None,
        }])
        .unwrap();

        assert!(matches!(
            r14.request("broken", 0).unwrap_err(),
            Error::UnknownConnectorPin { .. }
        ));
    }

    #[test]
    fn optional_specs_are_skipped_when_absent() {
        let mut r04 = platform("CynthionPlatformRev0D4");
        let specs = [
            BindingSpec {
                signal: "cpu.ext_reset".into(),
                candidates: vec![ResourceRef {
                    name: "button_user".into(),
                    number: 0,
                }],
                policy: Policy::Optional,
            },
            BindingSpec {
                signal: "usb0.bus".into(),
                candidates: vec![ResourceRef {
                    name: "target_phy".into(),
                    number: 0,
                }],
                policy: Policy::Mandatory,
            },
        ];

        let bound = bind_all(&mut r04, &specs).unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].signal, "usb0.bus");
        assert_eq!(bound[0].binding.signals[0].name, "data");
    }
}
