// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

pub mod address_map;
pub mod backends;
pub mod build_utils;
pub mod descriptor;
pub mod design;
pub mod elaborate;
pub mod error;
pub mod introspect;
pub mod peripherals;
pub mod platform;
pub mod resources;
pub mod soc;
pub mod toolchain;

pub use crate::address_map::{AddressMap, Allocation, Placement};
pub use crate::backends::{ArtifactKind, BuildArtifact};
pub use crate::build_utils::generate_artifacts;
pub use crate::descriptor::SocConfig;
pub use crate::design::{Design, PeripheralEntry};
pub use crate::elaborate::{elaborate, Elaboration};
pub use crate::error::{Error, Result};
pub use crate::platform::{Platform, PlatformCatalogue};
pub use crate::resources::{BoundSignal, ResourceBinding};
pub use crate::soc::Soc;
pub use crate::toolchain::{BuildOptions, Toolchain, Trellis};
