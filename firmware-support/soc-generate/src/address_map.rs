// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Allocation of bus windows in the flat 32-bit physical address space.
//!
//! Requests are resolved in three passes:
//!
//! 1. Fixed requests are placed at their address. Misalignment, overlap with
//!    an earlier fixed request or running past 4 GiB is an error.
//! 2. `Auto` requests are packed first-fit, in registration order, into the
//!    auto region.
//! 3. Attached requests are carved out of their parent's window, directly
//!    after the parent's own register block.
//!
//! Windows of at least [`PAGE`] bytes are page aligned, smaller ones are
//! aligned to [`PACKED`].

use std::{collections::BTreeMap, ops::Range};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const PAGE: u64 = 0x1000;
pub const PACKED: u64 = 0x100;
pub const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Where peripherals without a fixed address end up.
pub const DEFAULT_AUTO_REGION: Range<u64> = 0xf000_0000..ADDRESS_SPACE_END;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Fixed(u64),
    Auto,
    /// Shares the window of `parent` instead of taking up its own range.
    Attached {
        parent: String,
    },
}

pub fn granularity(size: u64) -> u64 {
    if size >= PAGE {
        PAGE
    } else {
        PACKED
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// Round a size up to the granularity it will be placed at.
pub fn window_size(size: u64) -> u64 {
    align_up(size, granularity(size))
}

#[derive(Clone, Debug)]
struct Request {
    size: u64,
    reserve: u64,
    placement: Placement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Window {
    pub base: u64,
    /// Bytes occupied by this entry's own registers or storage.
    pub size: u64,
    /// Bytes kept free on the bus for this entry and its attachments.
    pub reserved: u64,
    pub parent: Option<String>,
}

impl Window {
    pub fn range(&self) -> Range<u64> {
        self.base..self.base + self.size
    }

    pub fn reserved_range(&self) -> Range<u64> {
        self.base..self.base + self.reserved
    }
}

#[derive(Clone, Debug)]
pub struct AddressMap {
    auto_region: Range<u64>,
    requests: IndexMap<String, Request>,
}

impl Default for AddressMap {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_REGION)
    }
}

impl AddressMap {
    pub fn new(auto_region: Range<u64>) -> Self {
        AddressMap {
            auto_region,
            requests: IndexMap::new(),
        }
    }

    /// Register `name`, which occupies `size` bytes. `reserve` widens the
    /// window kept on the bus, for entries that have others attached.
    pub fn add(
        &mut self,
        name: &str,
        size: u64,
        reserve: Option<u64>,
        placement: Placement,
    ) -> Result<()> {
        if size == 0 {
            return Err(Error::ZeroSize {
                name: name.to_string(),
            });
        }
        if self.requests.contains_key(name) {
            return Err(Error::DuplicateEntry(name.to_string()));
        }

        let size = window_size(size);
        let reserve = window_size(reserve.unwrap_or(size).max(size));
        self.requests.insert(
            name.to_string(),
            Request {
                size,
                reserve,
                placement,
            },
        );
        Ok(())
    }

    pub fn allocate(&self) -> Result<Allocation> {
        // start -> (end, name), only top level entries
        let mut occupied: BTreeMap<u64, (u64, &str)> = BTreeMap::new();
        let mut placed: BTreeMap<&str, Window> = BTreeMap::new();

        for (name, req) in &self.requests {
            let Placement::Fixed(base) = req.placement else {
                continue;
            };
            let granularity = granularity(req.reserve);
            if base % granularity != 0 {
                return Err(Error::Misaligned {
                    name: name.clone(),
                    base,
                    granularity,
                });
            }
            let Some(end) = base
                .checked_add(req.reserve)
                .filter(|&end| end <= ADDRESS_SPACE_END)
            else {
                return Err(Error::OutOfAddressSpace {
                    name: name.clone(),
                    base,
                    size: req.reserve,
                });
            };
            if let Some((&other_start, &(other_end, other))) = occupied.range(..end).next_back() {
                if other_end > base {
                    return Err(Error::Overlap {
                        name: name.clone(),
                        start: base,
                        end,
                        other: other.to_string(),
                        other_start,
                        other_end,
                    });
                }
            }
            debug!("fixed {name} at {base:#010x}..{end:#010x}");
            occupied.insert(base, (end, name.as_str()));
            placed.insert(name.as_str(), self.window(base, req));
        }

        for (name, req) in &self.requests {
            if req.placement != Placement::Auto {
                continue;
            }
            let base = self.first_fit(name, req.reserve, &occupied)?;
            let end = base + req.reserve;
            debug!("auto {name} at {base:#010x}..{end:#010x}");
            occupied.insert(base, (end, name.as_str()));
            placed.insert(name.as_str(), self.window(base, req));
        }

        // parent -> next free address inside its window
        let mut cursors: BTreeMap<&str, u64> = BTreeMap::new();
        for (name, req) in &self.requests {
            let Placement::Attached { parent } = &req.placement else {
                continue;
            };
            let Some(parent_req) = self.requests.get(parent.as_str()) else {
                return Err(Error::UnknownParent {
                    name: name.clone(),
                    parent: parent.clone(),
                });
            };
            if matches!(parent_req.placement, Placement::Attached { .. }) {
                return Err(Error::NestedAttachment {
                    name: name.clone(),
                    parent: parent.clone(),
                });
            }
            let parent_window = &placed[parent.as_str()];
            let window_end = parent_window.base + parent_window.reserved;

            let cursor = cursors
                .entry(parent.as_str())
                .or_insert(parent_window.base + align_up(parent_window.size, PACKED));
            let base = *cursor;
            let size = align_up(req.size, PACKED);
            if base + size > window_end {
                return Err(Error::ParentWindowExhausted {
                    name: name.clone(),
                    parent: parent.clone(),
                    window: parent_window.reserved,
                });
            }
            *cursor = base + size;

            debug!("attached {name} to {parent} at {base:#010x}");
            placed.insert(
                name.as_str(),
                Window {
                    base,
                    size,
                    reserved: size,
                    parent: Some(parent.clone()),
                },
            );
        }

        let windows = self
            .requests
            .keys()
            .map(|name| (name.clone(), placed[name.as_str()].clone()))
            .collect();

        Ok(Allocation { windows })
    }

    fn window(&self, base: u64, req: &Request) -> Window {
        Window {
            base,
            size: req.size,
            reserved: req.reserve,
            parent: None,
        }
    }

    fn first_fit(
        &self,
        name: &str,
        size: u64,
        occupied: &BTreeMap<u64, (u64, &str)>,
    ) -> Result<u64> {
        let align = granularity(size);
        let mut candidate = align_up(self.auto_region.start, align);

        loop {
            let end = candidate + size;
            if end > self.auto_region.end {
                return Err(Error::RegionExhausted {
                    name: name.to_string(),
                    size,
                    start: self.auto_region.start,
                    end: self.auto_region.end,
                });
            }
            match occupied.range(..end).next_back() {
                Some((_, &(other_end, _))) if other_end > candidate => {
                    candidate = align_up(other_end, align);
                }
                _ => return Ok(candidate),
            }
        }
    }
}

/// The finalized map, in registration order.
#[derive(Clone, Debug, Serialize)]
pub struct Allocation {
    windows: IndexMap<String, Window>,
}

impl Allocation {
    pub fn get(&self, name: &str) -> Option<&Window> {
        self.windows.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Window)> {
        self.windows.iter().map(|(name, window)| (name.as_str(), window))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(alloc: &Allocation, name: &str) -> u64 {
        alloc.get(name).unwrap().base
    }

    #[test]
    fn fixed_addresses_are_kept() {
        let mut map = AddressMap::default();
        map.add("leds", 4, None, Placement::Fixed(0xf000_1000)).unwrap();
        map.add("gpioa", 12, None, Placement::Fixed(0xf000_2000)).unwrap();
        map.add("gpiob", 12, None, Placement::Fixed(0xf000_2100)).unwrap();
        let alloc = map.allocate().unwrap();

        assert_eq!(base(&alloc, "leds"), 0xf000_1000);
        assert_eq!(base(&alloc, "gpiob"), 0xf000_2100);
        assert_eq!(alloc.get("gpioa").unwrap().size, PACKED);
    }

    #[test]
    fn overlapping_fixed_addresses_are_rejected() {
        let mut map = AddressMap::default();
        map.add("usb0", 0x40, Some(PAGE), Placement::Fixed(0xf000_3000)).unwrap();
        map.add("leds", 4, None, Placement::Fixed(0xf000_3400)).unwrap();

        let err = map.allocate().unwrap_err();
        match err {
            Error::Overlap { name, other, .. } => {
                assert_eq!(name, "leds");
                assert_eq!(other, "usb0");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn misaligned_pages_are_rejected() {
        let mut map = AddressMap::default();
        map.add("sram", 0x10000, None, Placement::Fixed(0x4000_0100)).unwrap();

        assert!(matches!(
            map.allocate().unwrap_err(),
            Error::Misaligned { granularity: PAGE, .. }
        ));
    }

    #[test]
    fn auto_entries_fill_gaps_around_fixed_ones() {
        let mut map = AddressMap::default();
        map.add("uart", 0x30, None, Placement::Auto).unwrap();
        map.add("leds", 4, None, Placement::Fixed(0xf000_0000)).unwrap();
        map.add("timer", 0x18, None, Placement::Auto).unwrap();
        let alloc = map.allocate().unwrap();

        assert_eq!(base(&alloc, "uart"), 0xf000_0100);
        assert_eq!(base(&alloc, "timer"), 0xf000_0200);
        // registration order is preserved
        let names: Vec<_> = alloc.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["uart", "leds", "timer"]);
    }

    #[test]
    fn auto_region_can_run_out() {
        let mut map = AddressMap::new(0x1000..0x1200);
        map.add("a", 0x100, None, Placement::Auto).unwrap();
        map.add("b", 0x100, None, Placement::Auto).unwrap();
        map.add("c", 0x100, None, Placement::Auto).unwrap();

        assert!(matches!(
            map.allocate().unwrap_err(),
            Error::RegionExhausted { name, .. } if name == "c"
        ));
    }

    #[test]
    fn attached_entries_share_the_parent_window() {
        let mut map = AddressMap::default();
        map.add("usb0", 0x14, Some(PAGE), Placement::Fixed(0xf000_3000)).unwrap();
        for child in ["usb0_ep_control", "usb0_ep_in", "usb0_ep_out"] {
            map.add(
                child,
                0x30,
                None,
                Placement::Attached {
                    parent: "usb0".into(),
                },
            )
            .unwrap();
        }
        map.add("next", 4, None, Placement::Auto).unwrap();
        let alloc = map.allocate().unwrap();

        assert_eq!(base(&alloc, "usb0_ep_control"), 0xf000_3100);
        assert_eq!(base(&alloc, "usb0_ep_in"), 0xf000_3200);
        assert_eq!(base(&alloc, "usb0_ep_out"), 0xf000_3300);
        assert_eq!(
            alloc.get("usb0_ep_out").unwrap().parent.as_deref(),
            Some("usb0")
        );
        assert_eq!(base(&alloc, "next"), 0xf000_0000);
    }

    #[test]
    fn attachments_must_fit_the_parent() {
        let mut map = AddressMap::default();
        map.add("ctrl", 0x10, None, Placement::Fixed(0xf000_0000)).unwrap();
        map.add(
            "child",
            0x10,
            None,
            Placement::Attached {
                parent: "ctrl".into(),
            },
        )
        .unwrap();

        assert!(matches!(
            map.allocate().unwrap_err(),
            Error::ParentWindowExhausted { .. }
        ));
    }

    #[test]
    fn attaching_to_an_unknown_parent_fails() {
        let mut map = AddressMap::default();
        map.add(
            "orphan",
            0x10,
            None,
            Placement::Attached {
                parent: "nobody".into(),
            },
        )
        .unwrap();

        assert!(matches!(
            map.allocate().unwrap_err(),
            Error::UnknownParent { .. }
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut map = AddressMap::default();
        map.add("leds", 4, None, Placement::Auto).unwrap();
        assert!(matches!(
            map.add("leds", 4, None, Placement::Auto),
            Err(Error::DuplicateEntry(_))
        ));
    }

    #[test]
    fn the_address_space_ends_at_four_gigabytes() {
        let mut map = AddressMap::default();
        map.add("top", PAGE * 2, None, Placement::Fixed(0xffff_f000)).unwrap();
        assert!(matches!(
            map.allocate().unwrap_err(),
            Error::OutOfAddressSpace { .. }
        ));
    }
}
