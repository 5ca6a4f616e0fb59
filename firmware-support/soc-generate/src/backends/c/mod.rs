// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use heck::{ToShoutySnakeCase, ToSnakeCase};

use crate::peripherals::Access;

pub mod c_header;
pub mod ld_script;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum IdentType {
    Define,
    Section,
}

/// Generate a contextual identifier from a string.
pub fn ident(ident_type: IdentType, n: impl AsRef<str>) -> String {
    let s = n.as_ref();
    match ident_type {
        IdentType::Define => s.to_shouty_snake_case(),
        IdentType::Section => s.to_snake_case(),
    }
}

/// Access as spelled in register documentation.
pub(crate) fn access_str(access: Access) -> &'static str {
    match access {
        Access::ReadWrite => "read-write",
        Access::ReadOnly => "read-only",
        Access::WriteOnly => "write-only",
    }
}
