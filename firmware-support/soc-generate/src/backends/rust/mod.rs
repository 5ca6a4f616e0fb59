// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use crate::{backends::c::ld_script::memory_regions, design::Design};

/// `memory.x` for `riscv-rt`: the memories plus the region aliases its
/// `link.x` expects.
pub fn generate_memory_x(design: &Design, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "/* Generated by moondancer-soc, do not edit. */")?;
    writeln!(out)?;
    memory_regions(design, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::SocConfig, platform::PlatformCatalogue, soc::Soc};

    #[test]
    fn memory_x_lists_every_region_alias() {
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion-r0.4"))
            .unwrap();
        let design = Soc::from_config(&SocConfig::moondancer().unwrap())
            .unwrap()
            .finalize(&platform)
            .unwrap();

        let mut out = Vec::new();
        generate_memory_x(&design, &mut out).unwrap();
        let memory_x = String::from_utf8(out).unwrap();

        for alias in ["TEXT", "RODATA", "DATA", "BSS", "HEAP", "STACK"] {
            assert!(memory_x.contains(&format!("REGION_ALIAS(\"REGION_{alias}\", internal_sram);")));
        }
        assert!(memory_x.contains("    scratchpad (rwx) : ORIGIN = 0x00004000, LENGTH = 0x00001000"));
        assert!(!memory_x.contains("__stack_top"));
    }
}
