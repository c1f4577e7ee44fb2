//! Threaded Runtime Tests
//!
//! Tests for the free-running and lockstep two-thread runtimes
//! Run with: cargo test --test runtime_tests

use dds_beacon::beacon::Beacon;
use dds_beacon::config::{BeaconConfig, FrequencyPlan, UnitTiming};
use dds_beacon::dds::{Accumulator, ClockDomainBridge};
use dds_beacon::message::MessageRom;
use dds_beacon::message_rom;
use dds_beacon::runtime::{RunReport, SignalMailbox, ThreadedBeacon};
use dds_beacon::types::ControlSignals;

fn test_plan() -> FrequencyPlan {
    BeaconConfig::compact()
        .with_fast_clock_hz(1_000_000)
        .with_slow_clock_hz(1_000)
        .with_carrier_hz(100_000)
        .with_timing(UnitTiming::Ticks(2))
        .with_pitch_bit(1)
        .validate()
        .unwrap()
}

/// Same totals gathered from a cooperative run
fn cooperative_report(
    plan: &FrequencyPlan,
    rom: MessageRom<'_>,
    cycles: u64,
    enable: bool,
) -> RunReport {
    let mut beacon = Beacon::new(plan, rom).unwrap();
    beacon.set_enable(enable);
    let mut report = RunReport::default();
    let mut last_rf = false;
    let mut last_restart = false;

    for _ in 0..cycles {
        let out = beacon.step();
        let word = beacon.word();
        if word == plan.high() {
            report.high_cycles += 1;
        } else if word == plan.low() {
            report.low_cycles += 1;
        } else {
            report.center_cycles += 1;
        }
        if out.rf && !last_rf {
            report.rising_edges += 1;
        }
        if out.diagnostics.restart && !last_restart {
            report.restarts += 1;
        }
        last_rf = out.rf;
        last_restart = out.diagnostics.restart;
    }

    report.fast_cycles = cycles;
    report.slow_ticks = beacon.slow_ticks();
    report.final_phase = beacon.accumulator().phase();
    report
}

// =============================================================================
// Mailbox
// =============================================================================

#[test]
fn test_mailbox_shared_between_threads() {
    let mailbox = SignalMailbox::new();
    std::thread::scope(|s| {
        s.spawn(|| {
            for tick in 1..=1_000 {
                mailbox.publish(tick, ControlSignals::from_bits((tick % 4) as u8));
            }
        });
        s.spawn(|| {
            let mut last = 0;
            while last < 1_000 {
                let (tick, signals) = mailbox.load();
                assert!(tick >= last);
                assert_eq!(signals, ControlSignals::from_bits((tick % 4) as u8));
                last = tick;
            }
        });
    });
}

#[test]
fn test_published_signals_visible_after_two_cycles() {
    let mailbox = SignalMailbox::new();
    let mut bridge = ClockDomainBridge::new();
    let signals = ControlSignals::new(true, true);

    std::thread::scope(|s| {
        s.spawn(|| mailbox.publish(1, signals));
    });

    bridge.clock(mailbox.load().1);
    assert_eq!(bridge.output(), ControlSignals::IDLE);
    bridge.clock(mailbox.load().1);
    assert_eq!(bridge.output(), signals);
}

// =============================================================================
// Free-running
// =============================================================================

#[test]
fn test_free_running_feeds_only_plan_words() {
    let plan = test_plan();
    let report = ThreadedBeacon::new(&plan, message_rom!("TEST"))
        .unwrap()
        .run(200_000);
    assert_eq!(report.fast_cycles, 200_000);
    assert_eq!(
        report.center_cycles + report.high_cycles + report.low_cycles,
        200_000
    );
    assert_eq!(report.calibration_cycles, 0);
    assert!(report.slow_ticks > 0);
    // "T" opens every pass with a 3-unit tone
    assert!(report.high_cycles + report.low_cycles > 0);
    assert!(report.restarts >= 1);
}

#[test]
fn test_free_running_disabled_sends_center_only() {
    let plan = test_plan();
    let report = ThreadedBeacon::new(&plan, message_rom!("TEST"))
        .unwrap()
        .with_enable(false)
        .run(50_000);
    assert_eq!(report.center_cycles, 50_000);
    assert_eq!(report.high_cycles + report.low_cycles, 0);
    assert_eq!(report.restarts, 0);
}

#[test]
fn test_free_running_calibration_counts_separately() {
    let plan = BeaconConfig::compact()
        .with_fast_clock_hz(1_000_000)
        .with_slow_clock_hz(1_000)
        .with_carrier_hz(100_000)
        .with_calibration_mode(true)
        .validate()
        .unwrap();
    let report = ThreadedBeacon::new(&plan, message_rom!("E"))
        .unwrap()
        .run(20_000);
    assert_eq!(report.calibration_cycles, 20_000);
    assert_eq!(report.center_cycles + report.high_cycles + report.low_cycles, 0);
    // word 1 on 13 bits: the phase is a plain cycle counter
    assert_eq!(report.final_phase, 20_000 % 8_192);
}

// =============================================================================
// Lockstep vs cooperative
// =============================================================================

#[test]
fn test_lockstep_run_matches_cooperative() {
    let plan = test_plan();
    let rom = message_rom!("TEST");
    let cycles = 60_000;

    let threaded = ThreadedBeacon::new(&plan, rom).unwrap().run_lockstep(cycles);
    let cooperative = cooperative_report(&plan, rom, cycles, true);
    assert_eq!(threaded, cooperative);
}

#[test]
fn test_lockstep_counts_cover_every_cycle() {
    let plan = test_plan();
    let report = ThreadedBeacon::new(&plan, message_rom!("E"))
        .unwrap()
        .run_lockstep(40_000);
    assert_eq!(report.fast_cycles, 40_000);
    assert_eq!(report.slow_ticks, 40);
    assert_eq!(
        report.center_cycles + report.high_cycles + report.low_cycles,
        40_000
    );
    // "E" passes are 16 ticks long
    assert_eq!(report.restarts, 3);
    assert!(report.high_cycles > 0);
    assert!(report.low_cycles > 0);
}

#[test]
fn test_lockstep_disabled_sends_center_only() {
    let plan = test_plan();
    let rom = message_rom!("TEST");
    let report = ThreadedBeacon::new(&plan, rom)
        .unwrap()
        .with_enable(false)
        .run_lockstep(20_000);
    assert_eq!(report.center_cycles, 20_000);
    assert_eq!(report.restarts, 0);
    assert_eq!(report, cooperative_report(&plan, rom, 20_000, false));
}

#[test]
fn test_threaded_rejects_empty_message() {
    assert!(ThreadedBeacon::new(&test_plan(), message_rom!("")).is_err());
}
