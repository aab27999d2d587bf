// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
    // sanity: later than 2020-01-01
    assert!(a > 1_577_836_800_000);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::at_epoch_ms(10_000);
    assert_eq!(clock.epoch_ms(), 10_000);
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), 10_250);
    clock.set_epoch_ms(5);
    assert_eq!(clock.epoch_ms(), 5);
}

#[test]
fn until_epoch_ms_measures_forward_only() {
    let clock = FakeClock::at_epoch_ms(1_000);
    assert_eq!(clock.until_epoch_ms(1_300), Duration::from_millis(300));
    assert_eq!(clock.until_epoch_ms(1_000), Duration::ZERO);
    assert_eq!(clock.until_epoch_ms(999), Duration::ZERO);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::default();
    let other = clock.clone();
    clock.advance(Duration::from_millis(42));
    assert_eq!(other.epoch_ms(), clock.epoch_ms());
}
