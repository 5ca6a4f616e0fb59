// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Writing the generated artifacts into a build directory.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use tracing::info;

use crate::{
    backends::{ArtifactKind, BuildArtifact},
    design::Design,
    error::Result,
};

/// Render one artifact and write it below `build_dir`, creating the
/// directory when missing. An existing file is overwritten.
pub fn generate_artifact(
    design: &Design,
    kind: ArtifactKind,
    build_dir: impl AsRef<Path>,
) -> Result<BuildArtifact> {
    let dir = build_dir.as_ref().join(kind.subdir());
    fs::create_dir_all(&dir)?;

    let output_path = dir.join(kind.file_name());
    info!("generating {}", output_path.display());

    let content = kind.render_to_string(design)?;
    let mut file = BufWriter::new(File::create(&output_path)?);
    file.write_all(content.as_bytes())?;
    file.flush()?;

    Ok(BuildArtifact {
        kind,
        output_path,
        content,
    })
}

/// Generate the C header, linker script, SVD and `memory.x`.
pub fn generate_artifacts(design: &Design, build_dir: impl AsRef<Path>) -> Result<Vec<BuildArtifact>> {
    ArtifactKind::ALL
        .into_iter()
        .map(|kind| generate_artifact(design, kind, build_dir.as_ref()))
        .collect()
}
