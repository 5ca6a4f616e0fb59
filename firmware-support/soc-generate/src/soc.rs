// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use tracing::debug;

use crate::{
    address_map::{AddressMap, Allocation, Placement, Window},
    descriptor::{CpuConfig, FirmwareConfig, SocConfig},
    design::{Design, EntryKind, PeripheralEntry, RegionAliases},
    error::{Error, Result},
    peripherals::{MemoryDesc, MemoryKind, PeripheralDesc, BUS_WIDTH},
    platform::Platform,
};

/// A SoC under construction. Memories and peripherals are registered in
/// order; [`Soc::finalize`] places them on the bus and numbers interrupts.
#[derive(Clone, Debug)]
pub struct Soc {
    name: String,
    cpu: CpuConfig,
    clock_domain: String,
    firmware: FirmwareConfig,
    map: AddressMap,
    memories: Vec<MemoryDesc>,
    peripherals: Vec<PeripheralDesc>,
}

impl Soc {
    pub fn new(name: &str, cpu: CpuConfig) -> Self {
        Soc {
            name: name.to_string(),
            cpu,
            clock_domain: "usb".to_string(),
            firmware: FirmwareConfig::default(),
            map: AddressMap::default(),
            memories: Vec::new(),
            peripherals: Vec::new(),
        }
    }

    pub fn from_config(config: &SocConfig) -> Result<Self> {
        let mut soc = Soc::new(&config.name, config.cpu.clone());
        soc.clock_domain = config.clock_domain.clone();
        soc.firmware = config.firmware.clone();

        for memory in &config.memories {
            soc.add_memory(
                MemoryDesc {
                    name: memory.name.clone(),
                    kind: memory.kind,
                    size: memory.size,
                    description: memory.description.clone(),
                },
                memory.placement(),
            )?;
        }

        for peripheral in &config.peripherals {
            let mut desc =
                PeripheralDesc::from_kind(peripheral.kind, &peripheral.name, peripheral.width)?;
            if let Some(description) = &peripheral.description {
                desc.description = description.clone();
            }
            soc.add_peripheral(desc, peripheral.placement()?)?;
        }

        Ok(soc)
    }

    pub fn add_memory(&mut self, memory: MemoryDesc, placement: Placement) -> Result<()> {
        self.map.add(&memory.name, memory.size, None, placement)?;
        self.memories.push(memory);
        Ok(())
    }

    pub fn add_peripheral(&mut self, peripheral: PeripheralDesc, placement: Placement) -> Result<()> {
        self.map.add(
            &peripheral.name,
            peripheral.block_size(),
            peripheral.window,
            placement,
        )?;
        self.peripherals.push(peripheral);
        Ok(())
    }

    pub fn has_peripheral(&self, name: &str) -> bool {
        self.peripherals.iter().any(|p| p.name == name)
    }

    /// Allocate addresses and interrupts. The clock comes from the
    /// platform's frequency for the SoC's clock domain.
    pub fn finalize(&self, platform: &Platform) -> Result<Design> {
        let allocation = self.map.allocate()?;
        let clock_frequency = platform.clock_frequency(&self.clock_domain)?;

        let memories = self
            .memories
            .iter()
            .map(|memory| memory_entry(memory, &allocation))
            .collect::<Result<Vec<_>>>()?;

        let mut next_irq = 0;
        let mut peripherals = Vec::with_capacity(self.peripherals.len());
        for peripheral in &self.peripherals {
            let irq = (!peripheral.events.is_empty()).then(|| {
                next_irq += 1;
                next_irq - 1
            });
            if let Some(irq) = irq {
                debug!("{} gets irq {irq}", peripheral.name);
            }
            peripherals.push(peripheral_entry(peripheral, &allocation, irq)?);
        }

        let regions = self.region_aliases()?;

        Ok(Design {
            name: self.name.clone(),
            platform: platform.name().to_string(),
            cpu: self.cpu.clone(),
            clock_frequency,
            memories,
            peripherals,
            regions,
        })
    }

    fn region_aliases(&self) -> Result<RegionAliases> {
        let first_ram = self
            .memories
            .iter()
            .find(|m| m.kind == MemoryKind::Ram)
            .map(|m| m.name.as_str());

        let resolve = |role: &Option<String>| -> Result<String> {
            let name = role
                .as_deref()
                .or(first_ram)
                .ok_or(Error::NoFirmwareMemory)?;
            if self.memories.iter().any(|m| m.name == name) {
                Ok(name.to_string())
            } else {
                Err(Error::UnknownMemory(name.to_string()))
            }
        };

        let fw = &self.firmware;
        Ok(RegionAliases {
            text: resolve(&fw.text)?,
            rodata: resolve(&fw.rodata)?,
            data: resolve(&fw.data)?,
            bss: resolve(&fw.bss)?,
            heap: resolve(&fw.heap)?,
            stack: resolve(&fw.stack)?,
        })
    }
}

fn window<'a>(allocation: &'a Allocation, name: &str) -> Result<&'a Window> {
    allocation
        .get(name)
        .ok_or_else(|| Error::Unallocated(name.to_string()))
}

fn memory_entry(memory: &MemoryDesc, allocation: &Allocation) -> Result<PeripheralEntry> {
    let window = window(allocation, &memory.name)?;
    Ok(PeripheralEntry {
        name: memory.name.clone(),
        kind: EntryKind::Memory(memory.kind),
        description: memory.description.clone(),
        base_address: window.base,
        size: memory.size,
        reserved: window.reserved,
        register_width: BUS_WIDTH,
        capabilities: memory.capabilities(),
        parent: None,
        irq: None,
        registers: Vec::new(),
        events: Vec::new(),
    })
}

fn peripheral_entry(
    peripheral: &PeripheralDesc,
    allocation: &Allocation,
    irq: Option<u32>,
) -> Result<PeripheralEntry> {
    let window = window(allocation, &peripheral.name)?;
    Ok(PeripheralEntry {
        name: peripheral.name.clone(),
        kind: EntryKind::Peripheral(peripheral.kind),
        description: peripheral.description.clone(),
        base_address: window.base,
        size: peripheral.block_size(),
        reserved: window.reserved,
        register_width: BUS_WIDTH,
        capabilities: peripheral.capabilities(),
        parent: window.parent.clone(),
        irq,
        registers: peripheral.layout(),
        events: peripheral.events.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformCatalogue;

    fn moondancer() -> Design {
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        Soc::from_config(&SocConfig::moondancer().unwrap())
            .unwrap()
            .finalize(&platform)
            .unwrap()
    }

    #[test]
    fn moondancer_address_map() {
        let design = moondancer();
        let base = |name: &str| design.peripheral(name).unwrap().base_address;

        assert_eq!(base("uart"), 0xf000_0000);
        assert_eq!(base("timer"), 0xf000_0100);
        assert_eq!(base("leds"), 0xf000_1000);
        assert_eq!(base("gpioa"), 0xf000_2000);
        assert_eq!(base("gpiob"), 0xf000_2100);
        assert_eq!(base("usb0"), 0xf000_3000);
        assert_eq!(base("usb0_ep_control"), 0xf000_3100);
        assert_eq!(base("usb0_ep_in"), 0xf000_3200);
        assert_eq!(base("usb0_ep_out"), 0xf000_3300);
        assert_eq!(base("usb2_ep_out"), 0xf000_5300);

        assert_eq!(design.memory("internal_sram").unwrap().base_address, 0x4000_0000);
        assert_eq!(design.memory("scratchpad").unwrap().base_address, 0x4000);
        assert_eq!(design.clock_frequency, 60_000_000);
    }

    #[test]
    fn interrupts_follow_registration_order() {
        let design = moondancer();
        let irqs = design.interrupts();

        assert_eq!(irqs[0], ("uart", 0));
        assert_eq!(irqs[1], ("timer", 1));
        assert_eq!(irqs[2], ("usb0", 2));
        assert_eq!(irqs[3], ("usb0_ep_control", 3));
        assert!(design.peripheral("leds").unwrap().irq.is_none());
        assert_eq!(irqs.len(), 2 + 3 * 4);
    }

    #[test]
    fn attached_peripherals_record_their_parent() {
        let design = moondancer();
        let ep = design.peripheral("usb1_ep_out").unwrap();
        assert_eq!(ep.parent.as_deref(), Some("usb1"));
        assert_eq!(
            ep.register_address("ev_pending"),
            Some(ep.base_address + 0x30)
        );
    }

    #[test]
    fn firmware_regions_default_to_the_first_ram() {
        let mut config = SocConfig::moondancer().unwrap();
        config.firmware = FirmwareConfig::default();
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        let design = Soc::from_config(&config).unwrap().finalize(&platform).unwrap();
        assert_eq!(design.regions.text, "scratchpad");

        config.firmware.stack = Some("dram".into());
        let err = Soc::from_config(&config).unwrap().finalize(&platform).unwrap_err();
        assert!(matches!(err, Error::UnknownMemory(name) if name == "dram"));
    }
}
