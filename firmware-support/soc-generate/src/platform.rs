// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Board descriptions: FPGA device, clocks, connectors and pin resources.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BUILTIN_PLATFORMS: &str = include_str!("../data/platforms.toml");

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "i")]
    Input,
    #[serde(rename = "o")]
    Output,
    #[default]
    #[serde(rename = "io")]
    Bidirectional,
    /// Output with an output enable, i.e. tristate.
    #[serde(rename = "oe")]
    Tristate,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "i",
            Direction::Output => "o",
            Direction::Bidirectional => "io",
            Direction::Tristate => "oe",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub name: String,
    pub number: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsignalDef {
    pub name: String,
    /// Whitespace separated pin names, or connector pin numbers when `conn`
    /// is set.
    pub pins: String,
    #[serde(default)]
    pub dir: Direction,
    #[serde(default)]
    pub conn: Option<ConnectorRef>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDef {
    pub name: String,
    #[serde(default)]
    pub number: u32,
    /// Pins of a resource that is a single signal.
    #[serde(default)]
    pub pins: Option<String>,
    #[serde(default)]
    pub dir: Direction,
    #[serde(default)]
    pub conn: Option<ConnectorRef>,
    #[serde(default)]
    pub subsignals: Vec<SubsignalDef>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Frequency of a clock input, in Hz.
    #[serde(default)]
    pub clock: Option<f64>,
}

impl ResourceDef {
    pub fn key(&self) -> (String, u32) {
        (self.name.clone(), self.number)
    }

    /// The resource as a list of signals. A single-signal resource yields one
    /// signal with an empty name.
    pub fn signals(&self) -> Vec<SubsignalDef> {
        match &self.pins {
            Some(pins) => vec![SubsignalDef {
                name: String::new(),
                pins: pins.clone(),
                dir: self.dir,
                conn: self.conn.clone(),
                attrs: BTreeMap::new(),
            }],
            None => self.subsignals.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorDef {
    pub name: String,
    #[serde(default)]
    pub number: u32,
    /// Physical pins for connector pins 1, 2, ... in order, `-` where the
    /// connector pin is not wired to the FPGA.
    pub pins: String,
}

impl ConnectorDef {
    pub fn pin(&self, pin: &str) -> Option<&str> {
        let index: usize = pin.parse().ok()?;
        let physical = self.pins.split_whitespace().nth(index.checked_sub(1)?)?;
        (physical != "-").then_some(physical)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformDesc {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub device: String,
    pub package: String,
    #[serde(default = "default_speed")]
    pub speed: u32,
    pub default_clk: String,
    pub clock_frequencies_mhz: BTreeMap<String, f64>,
    #[serde(default)]
    pub connectors: Vec<ConnectorDef>,
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
}

fn default_speed() -> u32 {
    6
}

impl PlatformDesc {
    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformCatalogue {
    #[serde(default, rename = "platform")]
    platforms: Vec<PlatformDesc>,
}

impl PlatformCatalogue {
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_PLATFORMS, "built-in platforms")
    }

    pub fn from_toml(src: &str, what: &str) -> Result<Self> {
        toml::from_str(src).map_err(|source| Error::Config {
            what: what.to_string(),
            source,
        })
    }

    /// Add the platforms of `other`, replacing ones with the same name.
    pub fn extend(&mut self, other: PlatformCatalogue) {
        for platform in other.platforms {
            self.platforms.retain(|p| p.name != platform.name);
            self.platforms.push(platform);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformDesc> {
        self.platforms.iter()
    }

    /// Look a platform up by name or alias. A `module:` prefix, as found in
    /// `LUNA_PLATFORM`, is ignored.
    pub fn find(&self, name: &str) -> Option<&PlatformDesc> {
        let name = name.rsplit(':').next().unwrap_or(name).trim();
        self.platforms.iter().find(|p| p.matches(name))
    }

    pub fn select(&self, name: Option<&str>) -> Result<Platform> {
        let name = name.ok_or(Error::NoPlatform)?;
        self.find(name)
            .cloned()
            .map(Platform::new)
            .ok_or_else(|| Error::UnknownPlatform(name.to_string()))
    }
}

/// A platform being elaborated against. Tracks which resources have been
/// handed out so none is bound twice.
#[derive(Clone, Debug)]
pub struct Platform {
    desc: PlatformDesc,
    pub(crate) requested: BTreeSet<(String, u32)>,
}

impl Platform {
    pub fn new(desc: PlatformDesc) -> Self {
        Platform {
            desc,
            requested: BTreeSet::new(),
        }
    }

    pub fn desc(&self) -> &PlatformDesc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn add_resources(&mut self, resources: &[ResourceDef]) -> Result<()> {
        for resource in resources {
            if self.lookup(&resource.name, resource.number).is_some() {
                return Err(Error::DuplicateResource {
                    name: resource.name.clone(),
                    number: resource.number,
                });
            }
            self.desc.resources.push(resource.clone());
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str, number: u32) -> Option<&ResourceDef> {
        self.desc
            .resources
            .iter()
            .find(|r| r.name == name && r.number == number)
    }

    pub fn connector(&self, name: &str, number: u32) -> Option<&ConnectorDef> {
        self.desc
            .connectors
            .iter()
            .find(|c| c.name == name && c.number == number)
    }

    /// Frequency of a clock domain, in Hz.
    pub fn clock_frequency(&self, domain: &str) -> Result<u64> {
        self.desc
            .clock_frequencies_mhz
            .get(domain)
            .map(|mhz| (mhz * 1e6).round() as u64)
            .ok_or_else(|| Error::UnknownClockDomain {
                platform: self.desc.name.clone(),
                domain: domain.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_parses() {
        let catalogue = PlatformCatalogue::builtin().unwrap();
        let r14 = catalogue.find("cynthion").unwrap();
        assert_eq!(r14.name, "CynthionPlatformRev1D4");
        assert!(catalogue.find("CynthionPlatformRev0D4").is_some());
    }

    #[test]
    fn luna_platform_module_prefix_is_ignored() {
        let catalogue = PlatformCatalogue::builtin().unwrap();
        let found = catalogue
            .find("cynthion.gateware.platform:CynthionPlatformRev1D4")
            .unwrap();
        assert_eq!(found.name, "CynthionPlatformRev1D4");
    }

    #[test]
    fn selecting_nothing_is_an_error() {
        let catalogue = PlatformCatalogue::builtin().unwrap();
        assert!(matches!(catalogue.select(None), Err(Error::NoPlatform)));
        assert!(matches!(
            catalogue.select(Some("ulx3s")),
            Err(Error::UnknownPlatform(_))
        ));
    }

    #[test]
    fn usb_clock_is_sixty_megahertz() {
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        assert_eq!(platform.clock_frequency("usb").unwrap(), 60_000_000);
        assert!(platform.clock_frequency("hdmi").is_err());
    }

    #[test]
    fn connector_pins_are_one_based() {
        let pmod = ConnectorDef {
            name: "pmod".into(),
            number: 0,
            pins: "A1 A2 - -".into(),
        };
        assert_eq!(pmod.pin("1"), Some("A1"));
        assert_eq!(pmod.pin("2"), Some("A2"));
        assert_eq!(pmod.pin("3"), None);
        assert_eq!(pmod.pin("0"), None);
        assert_eq!(pmod.pin("5"), None);
    }

    #[test]
    fn extra_resources_cannot_shadow_board_ones() {
        let mut platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        let existing = platform.lookup("target_phy", 0).unwrap().clone();
        assert!(matches!(
            platform.add_resources(&[existing]),
            Err(Error::DuplicateResource { .. })
        ));
    }

    #[test]
    fn user_catalogue_replaces_builtin_entries() {
        let mut catalogue = PlatformCatalogue::builtin().unwrap();
        let custom = PlatformCatalogue::from_toml(
            r#"
            [[platform]]
            name = "CynthionPlatformRev1D4"
            device = "LFE5U-25F"
            package = "CABGA256"
            default_clk = "clk_60MHz"
            clock_frequencies_mhz = { usb = 48.0 }
            "#,
            "test",
        )
        .unwrap();
        catalogue.extend(custom);

        let platform = catalogue.select(Some("CynthionPlatformRev1D4")).unwrap();
        assert_eq!(platform.desc().device, "LFE5U-25F");
        assert_eq!(platform.clock_frequency("usb").unwrap(), 48_000_000);
    }
}
