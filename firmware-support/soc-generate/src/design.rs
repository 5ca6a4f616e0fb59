// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! The finalized design: every memory and peripheral at its address. This is
//! what the artifact generators and the introspection code consume.

use std::ops::Range;

use serde::Serialize;

use crate::{
    descriptor::CpuConfig,
    peripherals::{Capabilities, Event, MemoryKind, PeripheralKind, PlacedRegister},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Memory(MemoryKind),
    Peripheral(PeripheralKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeripheralEntry {
    pub name: String,
    pub kind: EntryKind,
    pub description: String,
    pub base_address: u64,
    /// Bytes of registers or storage.
    pub size: u64,
    /// Bytes kept free on the bus, attachments included.
    pub reserved: u64,
    /// Bus width in bits.
    pub register_width: u32,
    pub capabilities: Capabilities,
    pub parent: Option<String>,
    pub irq: Option<u32>,
    pub registers: Vec<PlacedRegister>,
    pub events: Vec<Event>,
}

impl PeripheralEntry {
    pub fn range(&self) -> Range<u64> {
        self.base_address..self.base_address + self.size
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.kind, EntryKind::Memory(_))
    }

    /// Address of a register, if the entry has one by that name.
    pub fn register_address(&self, name: &str) -> Option<u64> {
        self.registers
            .iter()
            .find(|r| r.register.name == name)
            .map(|r| self.base_address + r.offset)
    }
}

/// Memories backing each firmware section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegionAliases {
    pub text: String,
    pub rodata: String,
    pub data: String,
    pub bss: String,
    pub heap: String,
    pub stack: String,
}

impl RegionAliases {
    /// `(REGION_*, memory)` pairs in linker script order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("REGION_TEXT", self.text.as_str()),
            ("REGION_RODATA", self.rodata.as_str()),
            ("REGION_DATA", self.data.as_str()),
            ("REGION_BSS", self.bss.as_str()),
            ("REGION_HEAP", self.heap.as_str()),
            ("REGION_STACK", self.stack.as_str()),
        ]
        .into_iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Design {
    pub name: String,
    pub platform: String,
    pub cpu: CpuConfig,
    /// SoC clock in Hz.
    pub clock_frequency: u64,
    pub memories: Vec<PeripheralEntry>,
    pub peripherals: Vec<PeripheralEntry>,
    pub regions: RegionAliases,
}

impl Design {
    /// Memories first, then peripherals, each in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &PeripheralEntry> {
        self.memories.iter().chain(&self.peripherals)
    }

    pub fn memory(&self, name: &str) -> Option<&PeripheralEntry> {
        self.memories.iter().find(|m| m.name == name)
    }

    pub fn peripheral(&self, name: &str) -> Option<&PeripheralEntry> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    /// `(peripheral, irq)` in interrupt number order.
    pub fn interrupts(&self) -> Vec<(&str, u32)> {
        let mut irqs: Vec<_> = self
            .peripherals
            .iter()
            .filter_map(|p| Some((p.name.as_str(), p.irq?)))
            .collect();
        irqs.sort_by_key(|&(_, irq)| irq);
        irqs
    }
}
