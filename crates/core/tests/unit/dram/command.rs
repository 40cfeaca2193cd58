//! Command Stream Tests.
//!
//! Commands reach the power sink sorted by tick, converted to command-clock cycles
//! relative to startup, and only once their tick has passed.

use minirank_core::dram::{CommandRecorder, DramCommand};
use mockall::Sequence;
use mockall::predicate::eq;

use crate::common::harness::{flushed, started_engine, test_config};
use crate::common::mocks::MockSink;

#[test]
fn sink_receives_commands_in_tick_order() {
    let mut engine = started_engine(&test_config());
    // logged out of order: the second activate lands on an earlier tick
    let _ = engine.activate(0, 3, 8_000, 1).unwrap();
    let _ = engine.activate(0, 5, 4_000, 2).unwrap();
    let mut host = crate::common::harness::read_host();
    engine.advance_to(8_000, &mut host).unwrap();

    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    sink.expect_do_command()
        .with(eq(0), eq(DramCommand::Act), eq(5), eq(4))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_do_command()
        .with(eq(0), eq(DramCommand::Act), eq(3), eq(8))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    engine.flush_command_logs(&mut sink);
}

#[test]
fn future_commands_stay_queued() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 1).unwrap();
    let _ = engine.precharge(0, 0, 32_000, false, true).unwrap();

    assert_eq!(flushed(&mut engine), vec![(DramCommand::Act, 0)]);

    let mut host = crate::common::harness::read_host();
    engine.advance_to(32_000, &mut host).unwrap();
    assert_eq!(flushed(&mut engine), vec![(DramCommand::Pre, 32)]);
}

#[test]
fn untraced_precharge_is_not_logged() {
    let mut engine = started_engine(&test_config());
    let _ = engine.activate(0, 0, 0, 1).unwrap();
    let _ = engine.precharge(0, 0, 32_000, true, false).unwrap();
    let mut host = crate::common::harness::read_host();
    engine.advance_to(50_000, &mut host).unwrap();

    let mut sink = CommandRecorder::new();
    engine.flush_command_logs(&mut sink);
    assert_eq!(sink.count(DramCommand::Act), 1);
    assert_eq!(sink.count(DramCommand::Pre), 0);
}

#[test]
fn cycles_are_relative_to_startup() {
    let mut engine = minirank_core::TimingEngine::with_private_bus(&test_config()).unwrap();
    engine.startup(10_000).unwrap();
    assert_eq!(engine.timestamp_offset(), 10);

    let _ = engine.activate(0, 0, 12_000, 1).unwrap();
    let mut host = crate::common::harness::read_host();
    engine.advance_to(12_000, &mut host).unwrap();
    assert_eq!(flushed(&mut engine), vec![(DramCommand::Act, 2)]);
}

#[test]
fn mnemonics_match_command_names() {
    assert_eq!(DramCommand::Act.mnemonic(), "ACT");
    assert_eq!(DramCommand::Prea.mnemonic(), "PREA");
    assert_eq!(DramCommand::PdnFAct.mnemonic(), "PDN_F_ACT");
    assert_eq!(DramCommand::Srex.mnemonic(), "SREX");
}
