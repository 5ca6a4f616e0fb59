// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("`{0}` is registered more than once")]
    DuplicateEntry(String),

    #[error("`{name}` has a size of zero")]
    ZeroSize { name: String },

    #[error("`{name}` at {base:#010x} is not aligned to {granularity:#x}")]
    Misaligned {
        name: String,
        base: u64,
        granularity: u64,
    },

    #[error(
        "`{name}` ({start:#010x}..{end:#010x}) overlaps `{other}` \
         ({other_start:#010x}..{other_end:#010x})"
    )]
    Overlap {
        name: String,
        start: u64,
        end: u64,
        other: String,
        other_start: u64,
        other_end: u64,
    },

    #[error("`{name}` at {base:#x} with size {size:#x} runs past the 32-bit address space")]
    OutOfAddressSpace { name: String, base: u64, size: u64 },

    #[error("no room left in {start:#010x}..{end:#010x} for `{name}` ({size:#x} bytes)")]
    RegionExhausted {
        name: String,
        size: u64,
        start: u64,
        end: u64,
    },

    #[error("`{name}` is attached to unknown peripheral `{parent}`")]
    UnknownParent { name: String, parent: String },

    #[error("`{name}` cannot attach to `{parent}`, which is itself attached")]
    NestedAttachment { name: String, parent: String },

    #[error("`{name}` does not fit in the {window:#x} byte window of `{parent}`")]
    ParentWindowExhausted {
        name: String,
        parent: String,
        window: u64,
    },

    #[error("`{0}` was never allocated an address")]
    Unallocated(String),

    #[error("`{name}` has both a fixed address and a parent")]
    ConflictingPlacement { name: String },

    #[error("`{name}` needs {width} bits, registers must be 1 to 32 bits wide")]
    UnsupportedWidth { name: String, width: u32 },

    #[error("unknown memory `{0}`")]
    UnknownMemory(String),

    #[error("the design has no RAM to link firmware sections into")]
    NoFirmwareMemory,

    #[error("signal `{signal}` does not belong to the cpu or any peripheral")]
    UnknownSignal { signal: String },

    #[error("no platform selected; pass --platform or set LUNA_PLATFORM")]
    NoPlatform,

    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),

    #[error("platform `{platform}` has no `{domain}` clock domain")]
    UnknownClockDomain { platform: String, domain: String },

    #[error("resource {name}#{number} not found on platform `{platform}`")]
    ResourceNotFound {
        name: String,
        number: u32,
        platform: String,
    },

    #[error("none of [{candidates}] exist on platform `{platform}`")]
    NoCandidateResource { candidates: String, platform: String },

    #[error("a binding lists no candidate resources")]
    EmptyCandidates,

    #[error("resource {name}#{number} has already been requested")]
    ResourceAlreadyRequested { name: String, number: u32 },

    #[error("resource {name}#{number} is defined more than once")]
    DuplicateResource { name: String, number: u32 },

    #[error("resource {name}#{number} has no pins")]
    EmptyResource { name: String, number: u32 },

    #[error("connector {name}#{number} does not exist")]
    UnknownConnector { name: String, number: u32 },

    #[error("connector {name}#{number} has no pin `{pin}`")]
    UnknownConnectorPin {
        name: String,
        number: u32,
        pin: String,
    },

    #[error("unsupported FPGA device `{0}`")]
    UnsupportedDevice(String),

    #[error("no elaborated netlist found at {}", .0.display())]
    MissingNetlist(PathBuf),

    #[error("failed to launch `{program}`")]
    ToolchainLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}")]
    ToolchainFailed { program: String, status: ExitStatus },

    #[error("invalid SVD description")]
    Svd(#[from] svd_rs::SvdError),

    #[error("failed to encode the SVD description: {0}")]
    SvdEncode(String),

    #[error("failed to parse {what}")]
    Config {
        what: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the error only says that a resource does not exist. This is
    /// the one condition an optional binding may swallow.
    pub fn is_resource_not_found(&self) -> bool {
        matches!(
            self,
            Error::ResourceNotFound { .. } | Error::NoCandidateResource { .. }
        )
    }
}
