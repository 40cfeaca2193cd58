//! FR-FCFS Selection Tests.
//!
//! Seamless row hits win outright; otherwise the earliest-prepared miss competes with a
//! delayed hit, and wins only when its bank commands hide behind bus activity.

use minirank_core::dram::RequestQueue;
use pretty_assertions::assert_eq;

use crate::common::harness::{FIRST_REFRESH, read, read_host, started_engine, test_config, write};

fn queue(reqs: impl IntoIterator<Item = minirank_core::dram::DramRequest>) -> RequestQueue {
    reqs.into_iter().collect()
}

// ══════════════════════════════════════════════════════════
// 1. choose_next_frfcfs
// ══════════════════════════════════════════════════════════

#[test]
fn seamless_hit_beats_earlier_miss() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 5).unwrap();
    let q = queue([read(0, 1, 9), read(1, 0, 5)]);

    let host = read_host();
    assert_eq!(engine.choose_next_frfcfs(&q, 14_000, &host), Some((1, 14_000)));
}

#[test]
fn delayed_hit_beats_visible_miss() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 5).unwrap();
    let q = queue([read(0, 0, 5), read(1, 1, 9)]);

    let host = read_host();
    assert_eq!(engine.choose_next_frfcfs(&q, 0, &host), Some((0, 14_000)));
}

#[test]
fn hidden_miss_beats_delayed_hit() {
    let mut engine = started_engine(&test_config());
    // write opens row 5 and pushes every read out to 37 ns
    let _ = engine.do_burst_access(&mut write(0, 0, 5), 0, &[]).unwrap();
    let q = queue([read(1, 0, 5), read(2, 1, 9)]);

    let host = read_host();
    let (prep, hidden) = engine.min_bank_prep(&q, 36_000, &host);
    assert_eq!(prep, vec![1 << 1]);
    assert!(hidden);
    assert_eq!(engine.choose_next_frfcfs(&q, 36_000, &host), Some((1, 37_000)));
}

#[test]
fn first_miss_in_queue_order_wins_among_equals() {
    let engine = started_engine(&test_config());
    let q = queue([read(0, 6, 1), read(1, 2, 1)]);
    let host = read_host();
    assert_eq!(engine.choose_next_frfcfs(&q, 0, &host), Some((0, 0)));
}

#[test]
fn refreshing_rank_is_never_chosen() {
    let mut engine = started_engine(&test_config());
    let mut host = read_host();
    engine.advance_to(FIRST_REFRESH, &mut host).unwrap();

    let q = queue([read(0, 0, 1), read(1, 3, 2)]);
    assert_eq!(engine.choose_next_frfcfs(&q, FIRST_REFRESH, &host), None);
}

#[test]
fn empty_queue_selects_nothing() {
    let engine = started_engine(&test_config());
    assert_eq!(engine.choose_next_frfcfs(&RequestQueue::new(), 0, &read_host()), None);
}

// ══════════════════════════════════════════════════════════
// 2. min_bank_prep
// ══════════════════════════════════════════════════════════

#[test]
fn equal_activate_times_share_the_mask() {
    let engine = started_engine(&test_config());
    let q = queue([read(0, 2, 1), read(1, 5, 1)]);
    let (prep, hidden) = engine.min_bank_prep(&q, 0, &read_host());
    assert_eq!(prep, vec![(1 << 2) | (1 << 5)]);
    assert!(hidden);
}

#[test]
fn seamless_bank_replaces_earlier_candidates() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 2, 0, 1).unwrap();
    // bank 2 needs PRE + ACT; bank 5 only waits for tRRD
    let q = queue([read(0, 2, 9), read(1, 5, 1)]);
    let (prep, hidden) = engine.min_bank_prep(&q, 18_000, &read_host());
    assert_eq!(prep, vec![1 << 5]);
    assert!(hidden);
}

#[test]
fn banks_without_waiting_requests_are_ignored() {
    let engine = started_engine(&test_config());
    let q = queue([read(0, 7, 1)]);
    let (prep, _) = engine.min_bank_prep(&q, 0, &read_host());
    assert_eq!(prep, vec![1 << 7]);
}

#[test]
fn late_activate_is_not_hidden() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 1).unwrap();
    let q = queue([read(0, 0, 2)]);
    let (prep, hidden) = engine.min_bank_prep(&q, 20_000, &read_host());
    assert_eq!(prep, vec![1]);
    assert!(!hidden);
}
