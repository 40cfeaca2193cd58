use minirank_core::common::DramError;
use minirank_core::dram::{EventId, EventQueue, RankEvent};

fn id(rank: u8, kind: RankEvent) -> EventId {
    EventId::new(rank, kind)
}

#[test]
fn pops_in_time_then_insertion_order() {
    let mut q = EventQueue::new();
    q.schedule(id(0, RankEvent::Refresh), 500).unwrap();
    q.schedule(id(1, RankEvent::Power), 100).unwrap();
    q.schedule(id(0, RankEvent::Power), 100).unwrap();

    assert_eq!(q.next_at(), Some(100));
    assert_eq!(q.pop_due(1_000), Some((100, id(1, RankEvent::Power))));
    assert_eq!(q.pop_due(1_000), Some((100, id(0, RankEvent::Power))));
    assert_eq!(q.pop_due(499), None);
    assert_eq!(q.pop_due(500), Some((500, id(0, RankEvent::Refresh))));
    assert!(q.is_empty());
}

#[test]
fn double_schedule_is_an_error() {
    let mut q = EventQueue::new();
    q.schedule(id(2, RankEvent::WakeUp), 10).unwrap();
    assert_eq!(
        q.schedule(id(2, RankEvent::WakeUp), 20),
        Err(DramError::EventAlreadyScheduled {
            rank: 2,
            event: RankEvent::WakeUp.as_str()
        })
    );
    // same kind on another rank is a different event
    q.schedule(id(3, RankEvent::WakeUp), 20).unwrap();
    assert_eq!(q.len(), 2);
}

#[test]
fn advance_only_moves_earlier() {
    let mut q = EventQueue::new();
    let act = id(0, RankEvent::Activate);
    q.schedule_or_advance(act, 300);
    q.schedule_or_advance(act, 500);
    assert_eq!(q.when(act), Some(300));
    q.schedule_or_advance(act, 200);
    assert_eq!(q.when(act), Some(200));
    assert_eq!(q.len(), 1);
}

#[test]
fn extend_only_moves_later() {
    let mut q = EventQueue::new();
    let pre = id(0, RankEvent::Precharge);
    assert!(q.schedule_or_extend(pre, 300));
    assert!(!q.schedule_or_extend(pre, 200));
    assert_eq!(q.when(pre), Some(300));
    assert!(!q.schedule_or_extend(pre, 700));
    assert_eq!(q.when(pre), Some(700));
    assert_eq!(q.len(), 1);
}

#[test]
fn deschedule_and_reschedule() {
    let mut q = EventQueue::new();
    let refresh = id(0, RankEvent::Refresh);
    assert!(!q.deschedule(refresh));
    q.reschedule(refresh, 50);
    assert!(q.is_scheduled(refresh));
    q.reschedule(refresh, 10);
    assert_eq!(q.when(refresh), Some(10));
    assert!(q.deschedule(refresh));
    assert!(!q.is_scheduled(refresh));
    assert_eq!(q.next_at(), None);
}
