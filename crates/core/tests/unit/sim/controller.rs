//! Trace Controller Tests.
//!
//! Whole runs from a handful of requests, checked against the command stream and the
//! counters they must produce.

use minirank_core::config::PagePolicy;
use minirank_core::dram::DramCommand;
use minirank_core::sim::{SimError, SimReport, TraceController, TraceError, TraceRecord};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{init_tracing, test_config};

fn rd(at: u64, bank: u8, row: u32) -> TraceRecord {
    TraceRecord {
        at,
        rank: 0,
        bank,
        row,
        is_read: true,
    }
}

fn wr(at: u64, bank: u8, row: u32) -> TraceRecord {
    TraceRecord {
        is_read: false,
        ..rd(at, bank, row)
    }
}

fn run(trace: Vec<TraceRecord>) -> SimReport {
    init_tracing();
    TraceController::new(&test_config(), trace)
        .unwrap()
        .run()
        .unwrap()
}

fn stream(report: &SimReport) -> Vec<(DramCommand, u64)> {
    report.commands.iter().map(|c| (c.command, c.cycle)).collect()
}

// ══════════════════════════════════════════════════════════
// 1. Row hits and conflicts
// ══════════════════════════════════════════════════════════

#[test]
fn reads_to_one_row_stream_back_to_back() {
    let report = run(vec![rd(0, 0, 5), rd(0, 0, 5), rd(0, 0, 5), rd(0, 0, 5)]);

    assert_eq!(report.served, 4);
    assert_eq!(report.end_tick, 44_000);
    assert_eq!(
        stream(&report),
        vec![
            (DramCommand::Act, 0),
            (DramCommand::Rd, 14),
            (DramCommand::Rd, 18),
            (DramCommand::Rd, 22),
            (DramCommand::Rd, 26),
        ]
    );

    let stats = &report.stats;
    assert_eq!(stats.read_bursts, 4);
    assert_eq!(stats.read_row_hits, 3);
    assert_eq!(stats.activates, 1);
    assert_eq!(stats.bytes_read, 256);
    assert_eq!(stats.per_bank_rd_bursts[0], 4);
    assert_eq!(stats.tot_q_lat, 80_000);
    assert_eq!(stats.tot_bus_lat, 16_000);
    assert_eq!(stats.tot_mem_acc_lat, 152_000);
}

#[test]
fn row_conflict_precharges_and_reopens() {
    let report = run(vec![rd(0, 0, 5), rd(0, 0, 6)]);

    assert_eq!(
        stream(&report),
        vec![
            (DramCommand::Act, 0),
            (DramCommand::Rd, 14),
            (DramCommand::Pre, 32),
            (DramCommand::Act, 46),
            (DramCommand::Rd, 60),
        ]
    );
    assert_eq!(report.end_tick, 78_000);
    assert_eq!(report.stats.activates, 2);
    assert_eq!(report.stats.precharges, 1);
    assert_eq!(report.stats.read_row_hits, 0);
}

#[test]
fn writes_complete_before_the_run_ends() {
    let report = run(vec![wr(0, 1, 3), wr(0, 1, 3)]);

    assert_eq!(report.served, 2);
    assert_eq!(report.end_tick, 36_000);
    assert_eq!(
        stream(&report),
        vec![
            (DramCommand::Act, 0),
            (DramCommand::Wr, 14),
            (DramCommand::Wr, 18),
        ]
    );
    assert_eq!(report.stats.write_bursts, 2);
    assert_eq!(report.stats.write_row_hits, 1);
    assert_eq!(report.stats.bytes_written, 128);
    assert_eq!(report.stats.per_bank_wr_bursts[1], 2);
}

#[test]
fn reads_are_served_before_a_lone_write() {
    let report = run(vec![wr(0, 2, 1), rd(0, 3, 1)]);

    assert_eq!(report.served, 2);
    assert_eq!(report.stats.read_bursts, 1);
    assert_eq!(report.stats.write_bursts, 1);

    let cycle_of = |kind| {
        report
            .commands
            .iter()
            .find(|c| c.command == kind)
            .map(|c| c.cycle)
            .unwrap()
    };
    assert!(cycle_of(DramCommand::Rd) < cycle_of(DramCommand::Wr));
}

// ══════════════════════════════════════════════════════════
// 2. Refresh interaction
// ══════════════════════════════════════════════════════════

#[test]
fn request_during_refresh_waits_for_completion() {
    let report = run(vec![rd(0, 0, 5), rd(7_790_000, 0, 5)]);

    assert_eq!(report.served, 2);
    assert_eq!(report.stats.refreshes, 1);
    assert_eq!(report.end_tick, 8_182_000);
    assert_eq!(
        stream(&report),
        vec![
            (DramCommand::Act, 0),
            (DramCommand::Rd, 14),
            (DramCommand::Prea, 7_786),
            (DramCommand::Ref, 7_800),
            (DramCommand::Act, 8_150),
            (DramCommand::Rd, 8_164),
        ]
    );
}

/// Two ranks, 300 mixed requests every 5 ns: more than the bus can carry, with a
/// refresh due every microsecond.
fn saturating_trace() -> Vec<TraceRecord> {
    (0..300u32)
        .map(|i| TraceRecord {
            at: u64::from(i) * 5_000,
            rank: (i % 2) as u8,
            bank: ((i * 7) % 8) as u8,
            row: (i * 13) % 32,
            is_read: i % 3 != 0,
        })
        .collect()
}

#[rstest]
#[case::close(PagePolicy::Close)]
#[case::close_adaptive(PagePolicy::CloseAdaptive)]
fn saturated_bus_keeps_up_with_refresh(#[case] policy: PagePolicy) {
    init_tracing();
    let mut config = test_config();
    config.device.ranks_per_channel = 2;
    config.timing.t_refi = 1_000_000;
    config.policy.page_policy = policy;

    let report = TraceController::new(&config, saturating_trace())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.served, 300);
    assert_eq!(report.stats.read_bursts + report.stats.write_bursts, 300);

    for rank in 0..2u8 {
        let refreshes = report
            .commands
            .iter()
            .filter(|c| c.rank == rank && c.command == DramCommand::Ref)
            .count();
        assert!(refreshes >= 1, "rank {rank} never refreshed");

        // no more than four activates in any tXAW window
        let mut acts: Vec<u64> = report
            .commands
            .iter()
            .filter(|c| c.rank == rank && c.command == DramCommand::Act)
            .map(|c| c.cycle)
            .collect();
        acts.sort_unstable();
        for window in acts.windows(5) {
            assert!(window[4] - window[0] >= 21, "rank {rank}: {window:?}");
        }
    }
}

// ══════════════════════════════════════════════════════════
// 3. Setup
// ══════════════════════════════════════════════════════════

#[test]
fn empty_trace_finishes_at_startup() {
    let report = run(Vec::new());
    assert_eq!(report.served, 0);
    assert_eq!(report.end_tick, 0);
    assert!(report.commands.is_empty());
}

#[test]
fn controller_sizes_engine_from_config() {
    let controller = TraceController::new(&test_config(), vec![rd(0, 7, 1)]).unwrap();
    assert_eq!(controller.engine().ranks().len(), 1);
}

#[test]
fn record_outside_device_is_rejected() {
    let err = TraceController::new(&test_config(), vec![rd(0, 0, 1), rd(5, 8, 1)]).unwrap_err();
    assert!(matches!(
        err,
        SimError::Trace(TraceError::OutOfRange {
            index: 1,
            rank: 0,
            bank: 8
        })
    ));
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = test_config();
    config.controller.write_low_threshold = config.controller.write_high_threshold;
    let err = TraceController::new(&config, Vec::new()).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
}
