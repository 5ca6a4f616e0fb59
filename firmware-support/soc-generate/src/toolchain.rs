// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Synthesis, place and route and bitstream packing.
//!
//! A build happens in two steps. [`prepare`] writes the constraint file, the
//! synthesis script and a shell script with the tool invocations into the
//! build directory. [`build`] then runs the tools one after the other with the
//! build directory as working directory. Any tool exiting with a non-zero
//! status fails the build.

use std::{env, fs, path::PathBuf, process::Command};

use tracing::{debug, info};

use crate::{
    elaborate::Elaboration,
    error::{Error, Result},
    platform::{Direction, PlatformDesc},
    resources::{ResourceBinding, SignalBinding},
};

/// Base name of every file in the build directory.
pub const TOP: &str = "top";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    pub build_dir: PathBuf,
    /// Elaborated RTLIL netlist, copied to `top.il`.
    pub netlist: Option<PathBuf>,
    pub debug_verilog: bool,
    pub verbose: bool,
    pub skip_synthesis: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            build_dir: PathBuf::from("build"),
            netlist: None,
            debug_verilog: true,
            verbose: false,
            skip_synthesis: false,
        }
    }
}

/// One tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Environment variable that overrides the program.
    pub env_var: &'static str,
    pub default_program: &'static str,
    pub program: String,
    pub args: Vec<String>,
}

impl Step {
    fn new(env_var: &'static str, default_program: &'static str, args: Vec<String>) -> Self {
        Step {
            env_var,
            default_program,
            program: env::var(env_var).unwrap_or_else(|_| default_program.to_string()),
            args,
        }
    }

    /// The invocation as a line of shell, honouring the override variable.
    pub fn shell_line(&self) -> String {
        let mut line = format!("\"${{{}:-{}}}\"", self.env_var, self.default_program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanFile {
    pub name: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildPlan {
    pub build_dir: PathBuf,
    pub files: Vec<PlanFile>,
    pub steps: Vec<Step>,
}

impl BuildPlan {
    pub fn file(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.content.as_str())
    }

    pub fn netlist(&self) -> PathBuf {
        self.build_dir.join(format!("{TOP}.il"))
    }

    fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.build_dir)?;
        for file in &self.files {
            let path = self.build_dir.join(&file.name);
            debug!("writing {}", path.display());
            fs::write(path, &file.content)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildProducts {
    pub build_dir: PathBuf,
    pub bitstream: PathBuf,
}

pub trait Toolchain {
    fn name(&self) -> &str;

    fn plan(
        &self,
        elaboration: &Elaboration,
        platform: &PlatformDesc,
        options: &BuildOptions,
    ) -> Result<BuildPlan>;

    fn run(&self, plan: &BuildPlan) -> Result<BuildProducts>;
}

/// The open source ECP5 flow: yosys, nextpnr-ecp5 and ecppack.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trellis;

impl Toolchain for Trellis {
    fn name(&self) -> &str {
        "trellis"
    }

    fn plan(
        &self,
        elaboration: &Elaboration,
        platform: &PlatformDesc,
        options: &BuildOptions,
    ) -> Result<BuildPlan> {
        let quiet = |flag: &str| (!options.verbose).then(|| flag.to_string());
        let owned = |args: &[&str]| args.iter().map(|a| a.to_string()).collect::<Vec<_>>();

        let mut yosys = Vec::from_iter(quiet("-q"));
        yosys.extend(owned(&["-l", "top.rpt", "top.ys"]));

        let mut nextpnr = Vec::from_iter(quiet("--quiet"));
        nextpnr.extend(owned(&["--log", "top.tim"]));
        nextpnr.push(format!("--{}", nextpnr_device(&platform.device)?));
        nextpnr.extend([
            "--package".to_string(),
            platform.package.to_uppercase(),
            "--speed".to_string(),
            platform.speed.to_string(),
        ]);
        nextpnr.extend(owned(&[
            "--json",
            "top.json",
            "--lpf",
            "top.lpf",
            "--textcfg",
            "top.config",
        ]));

        let mut ecppack = Vec::new();
        if options.verbose {
            ecppack.push("--verbose".to_string());
        }
        ecppack.extend(owned(&["--input", "top.config", "--bit", "top.bit"]));

        let steps = vec![
            Step::new("YOSYS", "yosys", yosys),
            Step::new("NEXTPNR_ECP5", "nextpnr-ecp5", nextpnr),
            Step::new("ECPPACK", "ecppack", ecppack),
        ];

        let files = vec![
            PlanFile {
                name: format!("{TOP}.lpf"),
                content: lpf(elaboration),
            },
            PlanFile {
                name: format!("{TOP}.ys"),
                content: yosys_script(options.debug_verilog),
            },
            PlanFile {
                name: format!("build_{TOP}.sh"),
                content: shell_script(&steps),
            },
        ];

        Ok(BuildPlan {
            build_dir: options.build_dir.clone(),
            files,
            steps,
        })
    }

    fn run(&self, plan: &BuildPlan) -> Result<BuildProducts> {
        for step in &plan.steps {
            info!("running {}", step.program);
            let status = Command::new(&step.program)
                .args(&step.args)
                .current_dir(&plan.build_dir)
                .status()
                .map_err(|source| Error::ToolchainLaunch {
                    program: step.program.clone(),
                    source,
                })?;
            if !status.success() {
                return Err(Error::ToolchainFailed {
                    program: step.program.clone(),
                    status,
                });
            }
        }

        Ok(BuildProducts {
            build_dir: plan.build_dir.clone(),
            bitstream: plan.build_dir.join(format!("{TOP}.bit")),
        })
    }
}

/// nextpnr-ecp5 device flag for an ECP5 part number such as `LFE5U-12F`.
fn nextpnr_device(device: &str) -> Result<String> {
    let unsupported = || Error::UnsupportedDevice(device.to_string());
    let (family, size) = device.split_once('-').ok_or_else(unsupported)?;
    let size = size
        .strip_suffix('F')
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(unsupported)?;

    let prefix = match family.to_uppercase().as_str() {
        "LFE5U" => "",
        "LFE5UM" => "um-",
        "LFE5UM5G" => "um5g-",
        _ => return Err(unsupported()),
    };
    Ok(format!("{prefix}{size}k"))
}

fn port_name(binding: &ResourceBinding, signal: &SignalBinding) -> String {
    let dir = match signal.dir {
        Direction::Input => "i",
        Direction::Output => "o",
        Direction::Bidirectional | Direction::Tristate => "io",
    };
    if signal.name.is_empty() {
        format!("{}__{dir}", binding.port())
    } else {
        format!("{}__{}__{dir}", binding.port(), signal.name)
    }
}

/// Pin constraints for every bound resource, and a frequency constraint for
/// clock inputs.
pub fn lpf(elaboration: &Elaboration) -> String {
    let mut out = String::from("# Generated by moondancer-soc, do not edit.\n");
    out.push_str("BLOCK ASYNCPATHS;\nBLOCK RESETPATHS;\n");

    for binding in elaboration.bindings() {
        for signal in &binding.signals {
            let port = port_name(binding, signal);
            let attrs: String = signal
                .attrs
                .iter()
                .map(|(key, value)| format!(" {key}={value}"))
                .collect();

            for (bit, pin) in signal.pins.iter().enumerate() {
                let comp = if signal.pins.len() == 1 {
                    port.clone()
                } else {
                    format!("{port}[{bit}]")
                };
                out.push_str(&format!("LOCATE COMP \"{comp}\" SITE \"{pin}\";\n"));
                if !attrs.is_empty() {
                    out.push_str(&format!("IOBUF PORT \"{comp}\"{attrs};\n"));
                }
            }
        }

        // one constraint per clock, on its first input
        if let Some(hz) = binding.clock {
            let clock_signal = binding
                .signals
                .iter()
                .find(|s| s.dir == Direction::Input)
                .or(binding.signals.first());
            if let Some(signal) = clock_signal {
                out.push_str(&format!(
                    "FREQUENCY PORT \"{}\" {} HZ;\n",
                    port_name(binding, signal),
                    hz.round() as u64
                ));
            }
        }
    }
    out
}

pub fn yosys_script(debug_verilog: bool) -> String {
    let mut out = format!("read_ilang {TOP}.il\n");
    out.push_str("delete w:$verilog_initial_trigger\n");
    if debug_verilog {
        out.push_str(&format!("write_verilog -norename {TOP}.debug.v\n"));
    }
    out.push_str(&format!("synth_ecp5 -top {TOP}\n"));
    out.push_str(&format!("write_json {TOP}.json\n"));
    out
}

fn shell_script(steps: &[Step]) -> String {
    let mut out = String::from("#!/bin/sh\n# Generated by moondancer-soc, do not edit.\nset -e\n");
    for step in steps {
        out.push_str(&step.shell_line());
        out.push('\n');
    }
    out
}

/// Write the build plan, and the netlist if one was given, into the build
/// directory.
pub fn prepare(
    toolchain: &impl Toolchain,
    elaboration: &Elaboration,
    platform: &PlatformDesc,
    options: &BuildOptions,
) -> Result<BuildPlan> {
    let plan = toolchain.plan(elaboration, platform, options)?;
    plan.write()?;

    if let Some(netlist) = &options.netlist {
        if !netlist.is_file() {
            return Err(Error::MissingNetlist(netlist.clone()));
        }
        let target = plan.netlist();
        // copying a file onto itself truncates it
        if target.is_file() && fs::canonicalize(netlist)? == fs::canonicalize(&target)? {
            debug!("netlist already at {}", target.display());
        } else {
            fs::copy(netlist, target)?;
        }
    }
    info!(
        "prepared {} build in {}",
        toolchain.name(),
        plan.build_dir.display()
    );
    Ok(plan)
}

/// Prepare and, unless synthesis is skipped, run the toolchain.
pub fn build(
    toolchain: &impl Toolchain,
    elaboration: &Elaboration,
    platform: &PlatformDesc,
    options: &BuildOptions,
) -> Result<Option<BuildProducts>> {
    let plan = prepare(toolchain, elaboration, platform, options)?;
    if options.skip_synthesis {
        info!("skipping synthesis");
        return Ok(None);
    }

    let netlist = plan.netlist();
    if !netlist.is_file() {
        return Err(Error::MissingNetlist(netlist));
    }
    toolchain.run(&plan).map(Some)
}
