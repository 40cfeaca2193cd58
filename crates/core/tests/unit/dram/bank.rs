//! Bank Watermark Tests.
//!
//! Watermarks may only move forward, whatever sequence of accesses the engine serves.

use minirank_core::dram::{Bank, DramRequest, TimingEngine};
use proptest::prelude::*;

use crate::common::harness::{started_engine, test_config};

fn watermarks(engine: &TimingEngine) -> Vec<[u64; 4]> {
    engine
        .ranks()
        .iter()
        .flat_map(|r| r.banks.iter())
        .map(|b| {
            [
                b.act_allowed_at(),
                b.pre_allowed_at(),
                b.rd_allowed_at(),
                b.wr_allowed_at(),
            ]
        })
        .collect()
}

#[test]
fn new_bank_is_closed_and_eligible() {
    let bank = Bank::new(3, 1);
    assert_eq!(bank.open_row, None);
    assert!(!bank.is_open(0));
    assert_eq!(bank.act_allowed_at(), 0);
    assert_eq!(bank.col_allowed_at(true), 0);
    assert_eq!(bank.col_allowed_at(false), 0);
}

#[test]
fn col_allowed_picks_direction() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 1).unwrap();
    let bank = engine.bank(0, 0).unwrap();
    assert_eq!(bank.col_allowed_at(true), bank.rd_allowed_at());
    assert_eq!(bank.col_allowed_at(false), bank.wr_allowed_at());
    assert!(bank.is_open(1));
    assert!(!bank.is_open(2));
}

proptest! {
    #[test]
    fn watermarks_never_move_backwards(
        accesses in prop::collection::vec((0u8..8, 0u32..4, any::<bool>()), 1..40)
    ) {
        let mut engine = started_engine(&test_config());
        let mut next_burst_at = 0;
        for (id, (bank, row, is_read)) in accesses.into_iter().enumerate() {
            let before = watermarks(&engine);
            let col_allowed = engine.bank(0, bank).unwrap().col_allowed_at(is_read);

            let mut req = DramRequest::new(id as u64, 0, bank, row, is_read, 0);
            let (issued_at, next) = engine.do_burst_access(&mut req, next_burst_at, &[]).unwrap();

            prop_assert!(issued_at >= next_burst_at);
            prop_assert!(issued_at >= col_allowed);
            prop_assert_eq!(req.ready_time, issued_at + 14_000 + 4_000);
            next_burst_at = next;

            let after = watermarks(&engine);
            for (old, new) in before.iter().zip(&after) {
                for (o, n) in old.iter().zip(new) {
                    prop_assert!(n >= o, "watermark moved from {} to {}", o, n);
                }
            }
        }
    }
}
