// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use tracing::info;

use crate::design::Design;

/// Log the finalized memory map and interrupt assignment.
pub fn log_resources(design: &Design) {
    info!("memories:");
    for memory in &design.memories {
        info!(
            "  {:<24} {:#010x}..{:#010x} ({} bytes)",
            memory.name,
            memory.base_address,
            memory.range().end,
            memory.size
        );
    }

    info!("peripherals:");
    for peripheral in &design.peripherals {
        let attached = peripheral
            .parent
            .as_deref()
            .map(|parent| format!(" in {parent}"))
            .unwrap_or_default();
        info!(
            "  {:<24} {:#010x}..{:#010x}{attached}",
            peripheral.name,
            peripheral.base_address,
            peripheral.range().end
        );
    }

    info!("interrupts:");
    for (name, irq) in design.interrupts() {
        info!("  {irq:>2} {name}");
    }
}

/// The map as aligned text, one line per memory or peripheral.
pub fn format_map(design: &Design) -> String {
    let mut lines = Vec::new();
    for entry in design.entries() {
        let irq = entry.irq.map(|irq| format!("irq {irq}")).unwrap_or_default();
        let parent = entry.parent.as_deref().unwrap_or("");
        lines.push(
            format!(
                "{:#010x} {:#010x} {:<20} {:<8} {:<8} {irq}",
                entry.base_address,
                entry.size,
                entry.name,
                if entry.is_memory() { "memory" } else { "csr" },
                parent,
            )
            .trim_end()
            .to_string(),
        );
    }
    lines.join("\n") + "\n"
}
