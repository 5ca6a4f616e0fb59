// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! CMSIS-SVD description of the SoC, for generating a peripheral access crate.
//!
//! Peripheral and interrupt names are upper snake case, register and field
//! names are kept as they are.

use std::io::Write;

use heck::ToShoutySnakeCase;
use svd_rs::{
    AddressBlock, AddressBlockUsage, BitRange, Cpu, Device, Endian, Field, FieldInfo, Interrupt,
    Peripheral, PeripheralInfo, Register, RegisterCluster, RegisterInfo, RegisterProperties,
    ValidateLevel,
};

use crate::{
    design::{Design, PeripheralEntry},
    error::{Error, Result},
    peripherals::{Access, PlacedRegister, BUS_WIDTH},
};

const LEVEL: ValidateLevel = ValidateLevel::Weak;

fn svd_access(access: Access) -> svd_rs::Access {
    match access {
        Access::ReadOnly => svd_rs::Access::ReadOnly,
        Access::WriteOnly => svd_rs::Access::WriteOnly,
        Access::ReadWrite => svd_rs::Access::ReadWrite,
    }
}

pub fn device(design: &Design) -> Result<Device> {
    let cpu = Cpu::builder()
        .name(design.cpu.name.clone())
        .revision(design.cpu.variant.clone())
        .endian(Endian::Little)
        .mpu_present(false)
        .fpu_present(false)
        .nvic_priority_bits(0)
        .has_vendor_systick(false)
        .build(LEVEL)?;

    let peripherals = design
        .peripherals
        .iter()
        .map(peripheral)
        .collect::<Result<Vec<_>>>()?;

    Ok(Device::builder()
        .vendor(Some("moondancer-soc".to_string()))
        .name(design.name.to_shouty_snake_case())
        .version("1.0".to_string())
        .description(format!("{} on {}", design.name, design.platform))
        .cpu(Some(cpu))
        .address_unit_bits(8)
        .width(BUS_WIDTH)
        .default_register_properties(
            RegisterProperties::new()
                .size(Some(BUS_WIDTH))
                .access(Some(svd_rs::Access::ReadWrite))
                .reset_value(Some(0))
                .reset_mask(Some(0xffff_ffff)),
        )
        .peripherals(peripherals)
        .build(LEVEL)?)
}

fn peripheral(entry: &PeripheralEntry) -> Result<Peripheral> {
    let name = entry.name.to_shouty_snake_case();

    let registers = entry
        .registers
        .iter()
        .map(register)
        .collect::<Result<Vec<_>>>()?;

    let info = PeripheralInfo::builder()
        .name(name.clone())
        .description(Some(entry.description.clone()))
        .group_name(entry.parent.as_deref().map(|p| p.to_shouty_snake_case()))
        .base_address(entry.base_address)
        .address_block(Some(vec![AddressBlock::builder()
            .offset(0)
            .size(entry.size as u32)
            .usage(AddressBlockUsage::Registers)
            .protection(None)
            .build(ValidateLevel::Disabled)?]))
        .interrupt(Some(
            entry
                .irq
                .map(|value| {
                    Interrupt::builder()
                        .name(name)
                        .description(None)
                        .value(value)
                        .build(ValidateLevel::Disabled)
                })
                .transpose()?
                .into_iter()
                .collect(),
        ))
        .registers(Some(registers))
        .build(LEVEL)?;
    Ok(Peripheral::Single(info))
}

fn register(placed: &PlacedRegister) -> Result<RegisterCluster> {
    let register = &placed.register;

    let fields = register
        .fields
        .iter()
        .map(|field| {
            FieldInfo::builder()
                .name(field.name.clone())
                .description(Some(field.description.clone()))
                .bit_range(BitRange::from_offset_width(field.bit_offset, field.bit_width))
                .build(LEVEL)
                .map(Field::Single)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let info = RegisterInfo::builder()
        .name(register.name.clone())
        .description(Some(register.description.clone()))
        .address_offset(placed.offset as u32)
        .size(Some(register.words() as u32 * BUS_WIDTH))
        .access(Some(svd_access(register.access)))
        .reset_value(Some(0))
        .fields(Some(fields))
        .build(LEVEL)?;
    Ok(RegisterCluster::Register(Register::Single(info)))
}

pub fn generate_svd(design: &Design, out: &mut impl Write) -> Result<()> {
    let xml = svd_encoder::encode(&device(design)?)
        .map_err(|err| Error::SvdEncode(format!("{err:?}")))?;
    out.write_all(xml.as_bytes())?;
    if !xml.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}
