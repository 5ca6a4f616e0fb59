// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Generate the C header with the SoC's memory map.
//!
//! The header contains `#define` macros for:
//! - Memory base addresses and sizes
//! - Interrupt numbers
//! - Peripheral base addresses
//! - Volatile pointer macros for every register

use std::io::{self, Write};

use super::{access_str, ident, IdentType};
use crate::{
    design::{Design, PeripheralEntry},
    peripherals::WORD_STRIDE,
};

const GUARD: &str = "RESOURCES_H";

pub fn generate_c_header(design: &Design, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "/*")?;
    writeln!(out, " * Generated by moondancer-soc, do not edit.")?;
    writeln!(out, " *")?;
    writeln!(out, " * SoC: {}", design.name)?;
    writeln!(out, " * Platform: {}", design.platform)?;
    writeln!(out, " */")?;
    writeln!(out)?;
    writeln!(out, "#ifndef {GUARD}")?;
    writeln!(out, "#define {GUARD}")?;
    writeln!(out)?;
    writeln!(out, "#include \"stdint.h\"")?;
    writeln!(out)?;
    writeln!(out, "#define PLATFORM_NAME           \"{}\"", design.platform)?;
    writeln!(out, "#define CLOCK_FREQUENCY           {}UL", design.clock_frequency)?;
    writeln!(out)?;

    writeln!(out, "/* Memories */")?;
    writeln!(out)?;
    for memory in &design.memories {
        let name = ident(IdentType::Define, &memory.name);
        writeln!(out, "#define {name}_BASE           0x{:08X}UL", memory.base_address)?;
        writeln!(out, "#define {name}_SIZE           0x{:08X}UL", memory.size)?;
    }
    writeln!(out)?;

    writeln!(out, "/* Interrupts */")?;
    writeln!(out)?;
    for (name, irq) in design.interrupts() {
        writeln!(out, "#define {}_IRQ           {irq}", ident(IdentType::Define, name))?;
    }
    writeln!(out)?;

    for peripheral in &design.peripherals {
        peripheral_defines(out, peripheral)?;
    }

    writeln!(out, "#endif /* {GUARD} */")
}

fn peripheral_defines(out: &mut impl Write, peripheral: &PeripheralEntry) -> io::Result<()> {
    let base_name = ident(IdentType::Define, &peripheral.name);

    match &peripheral.parent {
        Some(parent) => writeln!(
            out,
            "/* {}: {} (attached to {parent}) */",
            peripheral.name, peripheral.description
        )?,
        None => writeln!(out, "/* {}: {} */", peripheral.name, peripheral.description)?,
    }
    writeln!(
        out,
        "#define {base_name}_BASE           0x{:08X}UL",
        peripheral.base_address
    )?;
    writeln!(out)?;

    for placed in &peripheral.registers {
        let register = &placed.register;
        let size = register.words() * WORD_STRIDE;

        writeln!(out, "/**")?;
        writeln!(out, " * Name: {}", register.name)?;
        if !register.description.is_empty() {
            writeln!(out, " * Description: {}", register.description)?;
        }
        writeln!(out, " * Access: {}", access_str(register.access))?;
        writeln!(
            out,
            " * Width: {} bit{}",
            register.width,
            if register.width == 1 { "" } else { "s" }
        )?;
        writeln!(out, " * Size: {size} bytes")?;
        writeln!(out, " */")?;

        write!(
            out,
            "#define {base_name}_{}           ((volatile uint32_t*)({base_name}_BASE + 0x{:02X}))\n\n",
            ident(IdentType::Define, &register.name),
            placed.offset
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::SocConfig, platform::PlatformCatalogue, soc::Soc};

    fn header() -> String {
        let platform = PlatformCatalogue::builtin()
            .unwrap()
            .select(Some("cynthion"))
            .unwrap();
        let design = Soc::from_config(&SocConfig::moondancer().unwrap())
            .unwrap()
            .finalize(&platform)
            .unwrap();
        let mut out = Vec::new();
        generate_c_header(&design, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_basic_header_generation() {
        let header = header();

        assert!(header.contains("#ifndef RESOURCES_H"));
        assert!(header.contains("#define PLATFORM_NAME           \"CynthionPlatformRev1D4\""));
        assert!(header.contains("#define CLOCK_FREQUENCY           60000000UL"));
        assert!(header.contains("#define INTERNAL_SRAM_BASE           0x40000000UL"));
        assert!(header.contains("#define INTERNAL_SRAM_SIZE           0x00010000UL"));
        assert!(header.contains("#define USB0_EP_CONTROL_BASE           0xF0003100UL"));
        assert!(header.trim_end().ends_with("#endif /* RESOURCES_H */"));
    }

    #[test]
    fn registers_get_pointer_macros() {
        let header = header();

        assert!(header.contains(
            "#define USB0_EP_CONTROL_EV_PENDING           \
             ((volatile uint32_t*)(USB0_EP_CONTROL_BASE + 0x1C))"
        ));
        assert!(header.contains("#define UART_IRQ           0"));
        assert!(header.contains("/* usb1_ep_in: IN endpoint transmit FIFO (attached to usb1) */"));
        assert!(header.contains(" * Access: write-only"));
    }
}
