// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use proptest::{collection, prelude::*};
use soc_generate::{
    platform::{Direction, PlatformDesc, ResourceDef},
    Error, Platform, PlatformCatalogue,
};
use test_strategy::proptest;

const PHYS: [&str; 4] = ["phy_a", "phy_b", "phy_c", "phy_d"];

fn board(present: &[bool]) -> Platform {
    let resources = PHYS
        .iter()
        .zip(present)
        .filter(|(_, &present)| present)
        .map(|(name, _)| ResourceDef {
            name: name.to_string(),
            number: 0,
            pins: Some("A1 A2".into()),
            dir: Direction::Bidirectional,
            conn: None,
            subsignals: vec![],
            attrs: BTreeMap::new(),
            clock: None,
        })
        .collect();

    Platform::new(PlatformDesc {
        name: "test".into(),
        aliases: vec![],
        device: "LFE5U-12F".into(),
        package: "CABGA256".into(),
        speed: 6,
        default_clk: "clk".into(),
        clock_frequencies_mhz: BTreeMap::new(),
        connectors: vec![],
        resources,
    })
}

// The first candidate that exists is bound; nothing existing is an error.
#[proptest]
fn first_available_candidate_wins(
    #[strategy(collection::vec(any::<bool>(), 4))] present: Vec<bool>,
    #[strategy(Just((0..4usize).collect::<Vec<_>>()).prop_shuffle())] order: Vec<usize>,
) {
    let mut platform = board(&present);
    let candidates: Vec<(&str, u32)> = order.iter().map(|&i| (PHYS[i], 0)).collect();
    let expected = order.iter().copied().find(|&i| present[i]);

    match (platform.request_any(&candidates), expected) {
        (Ok(binding), Some(i)) => {
            prop_assert_eq!(&binding.resource, PHYS[i]);
            prop_assert_eq!(&binding.requested, candidates[0].0);
            prop_assert_eq!(binding.fallback, i != order[0]);
        }
        (Err(err), None) => prop_assert!(
            matches!(err, Error::NoCandidateResource { .. }),
            "unexpected error: {}",
            err
        ),
        (result, expected) => panic!("got {result:?}, expected {expected:?}"),
    }
}

#[test]
fn aux_phy_request_on_r0_4_binds_host_phy() {
    let mut r04 = PlatformCatalogue::builtin()
        .unwrap()
        .select(Some("cynthion-r0.4"))
        .unwrap();

    let usb1 = r04.request_any(&[("aux_phy", 0), ("host_phy", 0)]).unwrap();
    assert_eq!(usb1.resource, "host_phy");
    assert!(usb1.fallback);

    // host_phy is taken now, and there is nothing left to fall back to
    let err = r04.request_any(&[("aux_phy", 0), ("host_phy", 0)]).unwrap_err();
    assert!(matches!(err, Error::ResourceAlreadyRequested { .. }));
}

#[test]
fn optional_reset_button() {
    let catalogue = PlatformCatalogue::builtin().unwrap();

    let mut r04 = catalogue.select(Some("cynthion-r0.4")).unwrap();
    assert!(r04.request_optional(&[("button_user", 0)]).unwrap().is_none());

    let mut r14 = catalogue.select(Some("cynthion-r1.4")).unwrap();
    let button = r14.request_optional(&[("button_user", 0)]).unwrap().unwrap();
    assert_eq!(button.signals[0].pins, ["C15"]);
}
