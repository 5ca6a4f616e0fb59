// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Emitters for the files firmware is built against.
//!
//! Every emitter only reads the finalized [`Design`] and writes to an
//! [`io::Write`] sink. None of them record timestamps or host details, so
//! the same design always yields the same bytes.

use std::{io, path::PathBuf};

use serde::Serialize;

use crate::{design::Design, error::Result};

pub mod c;
pub mod rust;
pub mod svd;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Header,
    LinkerScript,
    Svd,
    MemoryLayout,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Header,
        ArtifactKind::LinkerScript,
        ArtifactKind::Svd,
        ArtifactKind::MemoryLayout,
    ];

    /// Directory below the build directory.
    pub fn subdir(self) -> &'static str {
        match self {
            ArtifactKind::Header | ArtifactKind::LinkerScript => "genc",
            ArtifactKind::Svd => "gensvd",
            ArtifactKind::MemoryLayout => "genrust",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Header => "resources.h",
            ArtifactKind::LinkerScript => "soc.ld",
            ArtifactKind::Svd => "lunasoc.svd",
            ArtifactKind::MemoryLayout => "memory.x",
        }
    }

    pub fn render(self, design: &Design, out: &mut impl io::Write) -> Result<()> {
        match self {
            ArtifactKind::Header => c::c_header::generate_c_header(design, out)?,
            ArtifactKind::LinkerScript => c::ld_script::generate_linker_script(design, out)?,
            ArtifactKind::Svd => svd::generate_svd(design, out)?,
            ArtifactKind::MemoryLayout => rust::generate_memory_x(design, out)?,
        }
        Ok(())
    }

    /// Render into memory.
    pub fn render_to_string(self, design: &Design) -> Result<String> {
        let mut buf = Vec::new();
        self.render(design, &mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    pub kind: ArtifactKind,
    pub output_path: PathBuf,
    pub content: String,
}
