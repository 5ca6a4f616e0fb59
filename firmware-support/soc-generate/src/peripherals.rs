// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Register layouts of the peripherals a Moondancer SoC can instantiate.
//!
//! Every peripheral exposes a block of CSR registers on a 32-bit bus. Each
//! register starts on a word boundary and registers wider than the bus take up
//! consecutive words. Peripherals with events get the `ev_status`,
//! `ev_pending` and `ev_enable` registers appended to their block, one bit per
//! event.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width of the CSR bus in bits.
pub const BUS_WIDTH: u32 = 32;

/// Distance in bytes between two consecutive bus words.
pub const WORD_STRIDE: u64 = (BUS_WIDTH / 8) as u64;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
        const MEMORY = 1 << 3;
        const CSR = 1 << 4;
        const EVENTS = 1 << 5;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn is_readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub description: String,
    pub bit_offset: u32,
    pub bit_width: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub description: String,
    pub access: Access,
    /// Width in bits.
    pub width: u32,
    pub fields: Vec<Field>,
}

impl Register {
    /// A register with a single field spanning all of its bits, named after
    /// the register itself.
    pub fn new(name: &str, access: Access, width: u32, description: &str) -> Self {
        Self::with_field(name, name, access, width, description)
    }

    pub fn with_field(
        name: &str,
        field: &str,
        access: Access,
        width: u32,
        description: &str,
    ) -> Self {
        Register {
            name: name.to_string(),
            description: description.to_string(),
            access,
            width,
            fields: vec![Field {
                name: field.to_string(),
                description: description.to_string(),
                bit_offset: 0,
                bit_width: width,
            }],
        }
    }

    /// Number of bus words this register occupies.
    pub fn words(&self) -> u64 {
        u64::from(self.width.div_ceil(BUS_WIDTH).max(1))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub description: String,
}

impl Event {
    fn new(name: &str, description: &str) -> Self {
        Event {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    Timer,
    Uart,
    Leds,
    Gpio,
    UsbDeviceController,
    SetupFifo,
    InFifo,
    OutFifo,
}

/// A register located inside a peripheral's block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedRegister {
    pub offset: u64,
    #[serde(flatten)]
    pub register: Register,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralDesc {
    pub name: String,
    pub kind: PeripheralKind,
    pub description: String,
    pub registers: Vec<Register>,
    pub events: Vec<Event>,
    /// Bytes reserved on the bus for this peripheral and anything attached
    /// to it. `None` reserves just the register block.
    pub window: Option<u64>,
}

impl PeripheralDesc {
    fn new(name: &str, kind: PeripheralKind, description: &str) -> Self {
        PeripheralDesc {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            registers: Vec::new(),
            events: Vec::new(),
            window: None,
        }
    }

    /// Build a peripheral of the given kind. `width` is the counter width of
    /// a timer, the pin count of a GPIO port or the LED count, and is ignored
    /// by the other kinds.
    pub fn from_kind(kind: PeripheralKind, name: &str, width: Option<u32>) -> Result<Self> {
        let checked = |default: u32| -> Result<u32> {
            let width = width.unwrap_or(default);
            if width == 0 || width > BUS_WIDTH {
                return Err(Error::UnsupportedWidth {
                    name: name.to_string(),
                    width,
                });
            }
            Ok(width)
        };

        Ok(match kind {
            PeripheralKind::Timer => Self::timer(name, checked(32)?),
            PeripheralKind::Uart => Self::uart(name),
            PeripheralKind::Leds => Self::leds(name, checked(6)?),
            PeripheralKind::Gpio => Self::gpio(name, checked(8)?),
            PeripheralKind::UsbDeviceController => Self::usb_device_controller(name),
            PeripheralKind::SetupFifo => Self::setup_fifo(name),
            PeripheralKind::InFifo => Self::in_fifo(name),
            PeripheralKind::OutFifo => Self::out_fifo(name),
        })
    }

    pub fn timer(name: &str, width: u32) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::Timer, "Down-counting timer");
        p.registers = vec![
            Register::new("reload", ReadWrite, width, "Counter reload value"),
            Register::new("en", ReadWrite, 1, "Counter enable"),
            Register::new("ctr", ReadWrite, width, "Current counter value"),
        ];
        p.events = vec![Event::new("zero", "Counter reached zero")];
        p
    }

    pub fn uart(name: &str) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::Uart, "Asynchronous serial transceiver");
        p.registers = vec![
            Register::new("divisor", ReadWrite, 20, "Clock cycles per bit"),
            Register::new("rx_data", ReadOnly, 8, "Received byte"),
            Register::new("rx_rdy", ReadOnly, 1, "A received byte is waiting"),
            Register::new("rx_err", ReadOnly, 3, "Overflow, frame and parity errors"),
            Register::new("tx_data", WriteOnly, 8, "Byte to transmit"),
            Register::new("tx_rdy", ReadOnly, 1, "The transmitter can accept a byte"),
        ];
        p.events = vec![
            Event::new("rx_rdy", "A byte was received"),
            Event::new("rx_err", "A receive error occurred"),
            Event::new("tx_mty", "The transmit buffer is empty"),
        ];
        p
    }

    pub fn leds(name: &str, count: u32) -> Self {
        let mut p = Self::new(name, PeripheralKind::Leds, "User LEDs");
        p.registers = vec![Register::new(
            "output",
            Access::ReadWrite,
            count,
            "One bit per LED",
        )];
        p
    }

    pub fn gpio(name: &str, width: u32) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::Gpio, "General purpose I/O port");
        p.registers = vec![
            Register::new("moder", ReadWrite, width, "Output enable, one bit per pin"),
            Register::new("odr", ReadWrite, width, "Output data"),
            Register::new("idr", ReadOnly, width, "Input data"),
        ];
        p
    }

    pub fn usb_device_controller(name: &str) -> Self {
        use Access::*;
        let mut p = Self::new(
            name,
            PeripheralKind::UsbDeviceController,
            "USB device controller",
        );
        p.registers = vec![
            Register::new("connect", ReadWrite, 1, "Attach the device to the bus"),
            Register::new("speed", ReadOnly, 2, "Negotiated bus speed"),
            Register::new("low_speed_only", ReadWrite, 1, "Restrict the device to low speed"),
            Register::new("full_speed_only", ReadWrite, 1, "Restrict the device to full speed"),
        ];
        p.events = vec![Event::new("reset", "A bus reset was detected")];
        p.window = Some(0x1000);
        p
    }

    pub fn setup_fifo(name: &str) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::SetupFifo, "Control endpoint SETUP packet FIFO");
        p.registers = vec![
            Register::new("data", ReadOnly, 8, "Next byte of the SETUP packet"),
            Register::new("reset", WriteOnly, 1, "Flush the FIFO"),
            Register::new("epno", ReadOnly, 4, "Endpoint the packet was addressed to"),
            Register::new("have", ReadOnly, 1, "The FIFO holds data"),
            Register::new("pend", ReadOnly, 1, "An event is pending"),
            Register::new("address", ReadWrite, 7, "Device address"),
        ];
        p.events = vec![Event::new("setup", "A SETUP packet was received")];
        p
    }

    pub fn in_fifo(name: &str) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::InFifo, "IN endpoint transmit FIFO");
        p.registers = vec![
            Register::new("data", WriteOnly, 8, "Byte to queue for transmission"),
            Register::new("epno", WriteOnly, 4, "Endpoint to transmit on"),
            Register::new("reset", WriteOnly, 1, "Flush the FIFO"),
            Register::new("stall", WriteOnly, 1, "Stall the endpoint"),
            Register::new("idle", ReadOnly, 1, "No packet is being transmitted"),
            Register::new("have", ReadOnly, 1, "The FIFO holds data"),
            Register::new("pend", ReadOnly, 1, "An event is pending"),
            Register::new("pid", ReadWrite, 1, "Data toggle of the next packet"),
        ];
        p.events = vec![Event::new("done", "A packet was sent and acknowledged")];
        p
    }

    pub fn out_fifo(name: &str) -> Self {
        use Access::*;
        let mut p = Self::new(name, PeripheralKind::OutFifo, "OUT endpoint receive FIFO");
        p.registers = vec![
            Register::new("data", ReadOnly, 8, "Next received byte"),
            Register::new("data_ep", ReadOnly, 4, "Endpoint the data was received on"),
            Register::new("reset", WriteOnly, 1, "Flush the FIFO"),
            Register::new("epno", ReadWrite, 4, "Endpoint to configure"),
            Register::new("enable", ReadWrite, 1, "Accept packets on the endpoint"),
            Register::new("prime", WriteOnly, 1, "Ready the endpoint for one packet"),
            Register::new("stall", WriteOnly, 1, "Stall the endpoint"),
            Register::new("have", ReadOnly, 1, "The FIFO holds data"),
            Register::new("pend", ReadOnly, 1, "An event is pending"),
            Register::new("address", ReadWrite, 7, "Device address to respond to"),
            Register::new("pid", ReadWrite, 1, "Data toggle of the next packet"),
        ];
        p.events = vec![Event::new("done", "A packet was received")];
        p
    }

    /// The full register block, event registers included, with offsets.
    pub fn layout(&self) -> Vec<PlacedRegister> {
        let mut registers = self.registers.clone();

        if !self.events.is_empty() {
            let count = self.events.len() as u32;
            registers.extend([
                Register::with_field("ev_status", "status", Access::ReadOnly, count, "Event status"),
                Register::with_field("ev_pending", "pending", Access::ReadWrite, count, "Pending events, write 1 to clear"),
                Register::with_field("ev_enable", "enable", Access::ReadWrite, count, "Event enable"),
            ]);
        }

        let mut offset = 0;
        registers
            .into_iter()
            .map(|register| {
                let placed = PlacedRegister { offset, register };
                offset += placed.register.words() * WORD_STRIDE;
                placed
            })
            .collect()
    }

    /// Size of the register block in bytes.
    pub fn block_size(&self) -> u64 {
        self.layout()
            .last()
            .map(|last| last.offset + last.register.words() * WORD_STRIDE)
            .unwrap_or(0)
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::CSR;
        if self.registers.iter().any(|r| r.access.is_readable()) {
            caps |= Capabilities::READ;
        }
        if self.registers.iter().any(|r| r.access.is_writable()) {
            caps |= Capabilities::WRITE;
        }
        if !self.events.is_empty() {
            caps |= Capabilities::EVENTS | Capabilities::READ | Capabilities::WRITE;
        }
        caps
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Rom,
    Ram,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDesc {
    pub name: String,
    pub kind: MemoryKind,
    pub size: u64,
    pub description: String,
}

impl MemoryDesc {
    pub fn capabilities(&self) -> Capabilities {
        match self.kind {
            MemoryKind::Rom => Capabilities::MEMORY | Capabilities::READ | Capabilities::EXECUTE,
            MemoryKind::Ram => {
                Capabilities::MEMORY
                    | Capabilities::READ
                    | Capabilities::WRITE
                    | Capabilities::EXECUTE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_registers_follow_the_block() {
        let fifo = PeripheralDesc::setup_fifo("usb0_ep_control");
        let layout = fifo.layout();

        let names: Vec<_> = layout.iter().map(|r| r.register.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "data", "reset", "epno", "have", "pend", "address", "ev_status", "ev_pending",
                "ev_enable"
            ]
        );
        assert_eq!(layout[6].offset, 0x18);
        assert_eq!(layout[7].register.fields[0].name, "pending");
        assert_eq!(fifo.block_size(), 0x24);
    }

    #[test]
    fn peripherals_without_events_have_no_event_registers() {
        let leds = PeripheralDesc::leds("leds", 6);
        assert_eq!(leds.layout().len(), 1);
        assert_eq!(leds.block_size(), 4);
        assert!(!leds.capabilities().contains(Capabilities::EVENTS));
    }

    #[test]
    fn oversized_gpio_is_rejected() {
        let err = PeripheralDesc::from_kind(PeripheralKind::Gpio, "gpioa", Some(64)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedWidth { width: 64, .. }));
    }

    #[test]
    fn memory_capabilities() {
        let rom = MemoryDesc {
            name: "bootrom".into(),
            kind: MemoryKind::Rom,
            size: 0x4000,
            description: String::new(),
        };
        assert!(!rom.capabilities().contains(Capabilities::WRITE));
        assert!(rom.capabilities().contains(Capabilities::EXECUTE));
    }
}
