// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Linker script fragments describing the SoC's memories.

use std::io::{self, Write};

use super::{ident, IdentType};
use crate::{design::Design, peripherals::Capabilities};

/// `MEMORY` block with one line per memory, followed by the `REGION_ALIAS`
/// lines placing each firmware section.
pub(crate) fn memory_regions(design: &Design, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "MEMORY {{")?;
    for memory in &design.memories {
        writeln!(
            out,
            "    {} ({}) : ORIGIN = {:#010x}, LENGTH = {:#010x}",
            ident(IdentType::Section, &memory.name),
            attributes(memory.capabilities),
            memory.base_address,
            memory.size
        )?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;

    for (alias, memory) in design.regions.iter() {
        writeln!(
            out,
            "REGION_ALIAS(\"{alias}\", {});",
            ident(IdentType::Section, memory)
        )?;
    }
    Ok(())
}

fn attributes(caps: Capabilities) -> String {
    [
        (Capabilities::READ, 'r'),
        (Capabilities::WRITE, 'w'),
        (Capabilities::EXECUTE, 'x'),
    ]
    .into_iter()
    .filter(|&(cap, _)| caps.contains(cap))
    .map(|(_, c)| c)
    .collect()
}

pub fn generate_linker_script(design: &Design, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "/* Generated by moondancer-soc, do not edit. */")?;
    writeln!(out)?;
    memory_regions(design, out)?;
    writeln!(out)?;
    writeln!(
        out,
        "PROVIDE(__stack_top = ORIGIN({0}) + LENGTH({0}));",
        ident(IdentType::Section, &design.regions.stack)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::SocConfig, platform::PlatformCatalogue, soc::Soc};

    #[test]
    fn memories_and_aliases() {
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        let design = Soc::from_config(&SocConfig::moondancer().unwrap())
            .unwrap()
            .finalize(&platform)
            .unwrap();

        let mut out = Vec::new();
        generate_linker_script(&design, &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("    bootrom (rx) : ORIGIN = 0x00000000, LENGTH = 0x00004000\n"));
        assert!(script.contains("    internal_sram (rwx) : ORIGIN = 0x40000000, LENGTH = 0x00010000\n"));
        assert!(script.contains("REGION_ALIAS(\"REGION_TEXT\", internal_sram);"));
        assert!(script.contains("REGION_ALIAS(\"REGION_STACK\", internal_sram);"));
        assert!(script.contains("PROVIDE(__stack_top = ORIGIN(internal_sram) + LENGTH(internal_sram));"));
    }
}
