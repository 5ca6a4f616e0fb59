// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use soc_generate::{
    elaborate, generate_artifacts, introspect, toolchain, BuildOptions, Elaboration, Platform,
    PlatformCatalogue, SocConfig, Trellis,
};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "moondancer-soc", about = "Builds the Moondancer SoC for Cynthion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Selection {
    /// Platform name or alias, e.g. `cynthion-r1.4`.
    #[arg(short, long, env = "LUNA_PLATFORM")]
    platform: Option<String>,
    /// TOML file with additional platform descriptions.
    #[arg(long)]
    platforms: Option<PathBuf>,
    /// SoC descriptor replacing the built-in Moondancer design.
    #[arg(long)]
    soc: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Elaborates the SoC, runs synthesis and generates the firmware
    /// artifacts.
    Build {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "build")]
        build_dir: PathBuf,
        /// Elaborated RTLIL netlist of the design.
        #[arg(long)]
        netlist: Option<PathBuf>,
        /// Only write the build plan, do not run the toolchain.
        #[arg(long)]
        skip_synthesis: bool,
        /// Request verbosity from the tools we shell out to.
        #[arg(short, long)]
        verbose: bool,
        /// Do not write `top.debug.v`.
        #[arg(long)]
        no_debug_verilog: bool,
    },

    /// Generates the C header, linker script, SVD and `memory.x` only.
    Generate {
        #[command(flatten)]
        selection: Selection,
        #[arg(long, default_value = "build")]
        build_dir: PathBuf,
    },

    /// Prints the finalized address map.
    Map {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        json: bool,
    },

    /// Lists the known platforms.
    Platforms {
        /// TOML file with additional platform descriptions.
        #[arg(long)]
        platforms: Option<PathBuf>,
    },
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
    // stdout is reserved for `map` and `generate` output
    let stderr_subscriber = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(
            // Use RUST_LOG or fall back to INFO.
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_subscriber)
        .init();
}

fn catalogue(platforms: Option<&PathBuf>) -> Result<PlatformCatalogue> {
    let mut catalogue = PlatformCatalogue::builtin()?;
    if let Some(path) = platforms {
        let src = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        catalogue.extend(PlatformCatalogue::from_toml(&src, &path.display().to_string())?);
    }
    Ok(catalogue)
}

fn soc_config(soc: Option<&PathBuf>) -> Result<SocConfig> {
    match soc {
        Some(path) => {
            let src = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(SocConfig::from_toml(&src, &path.display().to_string())?)
        }
        None => Ok(SocConfig::moondancer()?),
    }
}

fn elaborate_selection(selection: &Selection) -> Result<(Platform, Elaboration)> {
    let mut platform = catalogue(selection.platforms.as_ref())?
        .select(selection.platform.as_deref())
        .context("failed to identify a supported platform")?;
    let config = soc_config(selection.soc.as_ref())?;

    let clock = platform.clock_frequency(&config.clock_domain)?;
    info!("Building for {} with clock frequency: {clock}", platform.name());

    let elaboration = elaborate(&config, &mut platform)
        .with_context(|| format!("failed to elaborate {} for {}", config.name, platform.name()))?;
    Ok((platform, elaboration))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            selection,
            build_dir,
            netlist,
            skip_synthesis,
            verbose,
            no_debug_verilog,
        } => {
            let (platform, elaboration) = elaborate_selection(&selection)?;
            let options = BuildOptions {
                build_dir,
                netlist,
                debug_verilog: !no_debug_verilog,
                verbose,
                skip_synthesis,
            };

            info!("Building soc");
            let products = toolchain::build(&Trellis, &elaboration, platform.desc(), &options)
                .context("synthesis failed")?;

            introspect::log_resources(&elaboration.design);
            generate_artifacts(&elaboration.design, &options.build_dir)
                .context("failed to generate artifacts")?;

            match products {
                Some(products) => {
                    info!("bitstream: {}", products.bitstream.display());
                    println!("Build completed. Use 'make load' to load bitstream to device.");
                }
                None => println!(
                    "Build plan written to {}; synthesis was skipped.",
                    options.build_dir.display()
                ),
            }
        }

        Command::Generate {
            selection,
            build_dir,
        } => {
            let (_, elaboration) = elaborate_selection(&selection)?;
            introspect::log_resources(&elaboration.design);
            for artifact in generate_artifacts(&elaboration.design, &build_dir)
                .context("failed to generate artifacts")?
            {
                println!("{}", artifact.output_path.display());
            }
        }

        Command::Map { selection, json } => {
            let (_, elaboration) = elaborate_selection(&selection)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&elaboration.design)?);
            } else {
                print!("{}", introspect::format_map(&elaboration.design));
            }
        }

        Command::Platforms { platforms } => {
            for platform in catalogue(platforms.as_ref())?.iter() {
                println!(
                    "{:<28} {} {} [{}]",
                    platform.name,
                    platform.device,
                    platform.package,
                    platform.aliases.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
