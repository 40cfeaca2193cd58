//! Statistics Unit Tests.

use minirank_core::dram::PowerState;
use minirank_core::stats::{DramStats, RankPowerStats};
use pretty_assertions::assert_eq;

#[test]
fn new_sizes_per_bank_and_per_rank_tables() {
    let stats = DramStats::new(2, 8);
    assert_eq!(stats.per_bank_rd_bursts.len(), 16);
    assert_eq!(stats.per_bank_wr_bursts.len(), 16);
    assert_eq!(stats.power, vec![RankPowerStats::default(); 2]);
}

#[test]
fn ratios_without_samples_are_zero() {
    let stats = DramStats::new(1, 8);
    assert_eq!(stats.read_row_hit_rate(), 0.0);
    assert_eq!(stats.write_row_hit_rate(), 0.0);
    assert_eq!(stats.page_hit_rate(), 0.0);
    assert_eq!(stats.avg_q_lat(), 0.0);
    assert_eq!(stats.avg_bytes_per_activate(), 0.0);
}

#[test]
fn hit_rates_are_percentages() {
    let stats = DramStats {
        read_bursts: 4,
        read_row_hits: 3,
        write_bursts: 4,
        write_row_hits: 1,
        ..DramStats::new(1, 8)
    };
    assert_eq!(stats.read_row_hit_rate(), 75.0);
    assert_eq!(stats.write_row_hit_rate(), 25.0);
    assert_eq!(stats.page_hit_rate(), 50.0);
}

#[test]
fn latencies_average_over_read_bursts() {
    let stats = DramStats {
        read_bursts: 4,
        tot_q_lat: 80_000,
        tot_bus_lat: 16_000,
        tot_mem_acc_lat: 152_000,
        ..DramStats::new(1, 8)
    };
    assert_eq!(stats.avg_q_lat(), 20_000.0);
    assert_eq!(stats.avg_bus_lat(), 4_000.0);
    assert_eq!(stats.avg_mem_acc_lat(), 38_000.0);
}

#[test]
fn bytes_per_activate_averages_closed_activations() {
    let stats = DramStats {
        bytes_per_activate_total: 64 + 256,
        bytes_per_activate_samples: 2,
        ..DramStats::new(1, 8)
    };
    assert_eq!(stats.avg_bytes_per_activate(), 160.0);
}

#[test]
fn power_residency_is_indexed_by_state() {
    let mut power = RankPowerStats::default();
    power.state_time[PowerState::Sref.index()] = 500;
    assert_eq!(power.time_in(PowerState::Sref), 500);
    assert_eq!(power.time_in(PowerState::Idle), 0);
}

#[test]
fn stats_serialize_to_json() {
    let json = serde_json::to_value(DramStats::new(1, 2)).unwrap();
    assert_eq!(json["read_bursts"], 0);
    assert_eq!(json["per_bank_rd_bursts"].as_array().map(Vec::len), Some(2));
}
