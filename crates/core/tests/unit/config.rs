//! Configuration Unit Tests.
//!
//! Verifies defaults, partial JSON overrides, derived delays, and every setup-time
//! validation rule.

use minirank_core::Config;
use minirank_core::common::ConfigError;
use minirank_core::config::PagePolicy;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::test_config;

// ══════════════════════════════════════════════════════════
// 1. Defaults and parsing
// ══════════════════════════════════════════════════════════

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.burst_size(), 64);
    assert_eq!(config.row_buffer_size(), 8 * 1024);
    assert!(config.bank_group_arch());
    assert_eq!(config.policy.page_policy, PagePolicy::OpenAdaptive);
}

#[test]
fn empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    let defaults = Config::default();
    assert_eq!(config.timing.t_refi, defaults.timing.t_refi);
    assert_eq!(config.device.banks_per_rank, defaults.device.banks_per_rank);
    assert_eq!(
        config.controller.write_high_threshold,
        defaults.controller.write_high_threshold
    );
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = Config::from_json(r#"{ "timing": { "t_rcd": 15000 } }"#).unwrap();
    assert_eq!(config.timing.t_rcd, 15_000);
    assert_eq!(config.timing.t_rp, Config::default().timing.t_rp);
}

#[rstest]
#[case("Open", PagePolicy::Open)]
#[case("OpenAdaptive", PagePolicy::OpenAdaptive)]
#[case("Close", PagePolicy::Close)]
#[case("CloseAdaptive", PagePolicy::CloseAdaptive)]
fn page_policy_names(#[case] name: &str, #[case] expected: PagePolicy) {
    let json = format!(r#"{{ "policy": {{ "page_policy": "{name}" }} }}"#);
    assert_eq!(Config::from_json(&json).unwrap().policy.page_policy, expected);
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        Config::from_json("{ not json"),
        Err(ConfigError::Parse(_))
    ));
}

// ══════════════════════════════════════════════════════════
// 2. Derived delays
// ══════════════════════════════════════════════════════════

#[test]
fn turnaround_delays_compose_base_timings() {
    let config = test_config();
    assert_eq!(config.read_to_write_delay(), 4_000 + 2_000);
    assert_eq!(config.write_to_read_delay(), 4_000 + 5_000 + 14_000);
    assert_eq!(config.rank_to_rank_delay(), 4_000 + 2_000);
    assert_eq!(config.command_offset(), 28_000);
    assert_eq!(config.access_latency(), 42_000);
}

#[test]
fn burst_bounds_fall_back_to_t_burst() {
    let mut config = test_config();
    assert_eq!(config.timing.burst_min(), 4_000);
    assert_eq!(config.timing.burst_max(), 4_000);

    config.timing.t_burst_min = Some(2_000);
    config.timing.t_burst_max = Some(6_000);
    config.policy.burst_interleave = true;
    assert_eq!(config.timing.burst_min(), 2_000);
    assert_eq!(config.burst_delay(), 3_000);
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_non_power_of_two_burst() {
    let mut config = test_config();
    config.device.devices_per_rank = 3;
    assert_eq!(
        config.validate(),
        Err(ConfigError::BurstSizeNotPowerOfTwo(24))
    );
}

#[rstest]
#[case(3)]
#[case(6)]
fn rejects_non_power_of_two_ranks(#[case] ranks: u32) {
    let mut config = test_config();
    config.device.ranks_per_channel = ranks;
    assert_eq!(
        config.validate(),
        Err(ConfigError::RankCountNotPowerOfTwo(ranks))
    );
}

#[rstest]
#[case(0)]
#[case(65)]
fn rejects_bank_count_outside_mask_width(#[case] banks: u32) {
    let mut config = test_config();
    config.device.banks_per_rank = banks;
    assert_eq!(config.validate(), Err(ConfigError::BankCountOutOfRange(banks)));
}

#[test]
fn rejects_refresh_interval_shorter_than_refresh() {
    let mut config = test_config();
    config.timing.t_refi = 300_000;
    assert_eq!(
        config.validate(),
        Err(ConfigError::RefreshIntervalTooShort {
            t_refi: 300_000,
            t_rp: 14_000,
            t_rfc: 350_000,
        })
    );
}

#[test]
fn rejects_more_groups_than_banks() {
    let mut config = test_config();
    config.device.bank_groups_per_rank = 16;
    assert_eq!(
        config.validate(),
        Err(ConfigError::TooManyBankGroups {
            banks: 8,
            groups: 16
        })
    );
}

#[test]
fn rejects_uneven_groups() {
    let mut config = test_config();
    config.device.bank_groups_per_rank = 3;
    assert_eq!(
        config.validate(),
        Err(ConfigError::UnevenBankGroups {
            banks: 8,
            groups: 3
        })
    );
}

#[test]
fn rejects_same_group_column_delay_below_burst() {
    let mut config = test_config();
    config.device.bank_groups_per_rank = 4;
    config.timing.t_ccd_l = 3_000;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ColumnDelayBelowBurst { name: "tCCD_L", .. })
    ));
}

#[test]
fn rejects_short_same_group_activate_delay() {
    let mut config = test_config();
    config.device.bank_groups_per_rank = 4;
    config.timing.t_rrd_l = 3_000;
    assert_eq!(
        config.validate(),
        Err(ConfigError::SameGroupActivateTooShort {
            t_rrd_l: 3_000,
            t_rrd: 4_000
        })
    );
}

#[test]
fn group_rules_are_skipped_without_bank_groups() {
    let mut config = test_config();
    config.timing.t_ccd_l = 0;
    config.timing.t_rrd_l = 0;
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn rejects_inverted_write_thresholds() {
    let mut config = test_config();
    config.controller.write_low_threshold = 40;
    assert_eq!(
        config.validate(),
        Err(ConfigError::WriteThresholds { low: 40, high: 32 })
    );
}

#[rstest]
#[case::clock("t_ck")]
#[case::window("activation_limit")]
fn rejects_zero_parameters(#[case] name: &'static str) {
    let mut config = test_config();
    match name {
        "t_ck" => config.timing.t_ck = 0,
        _ => config.timing.activation_limit = 0,
    }
    assert_eq!(config.validate(), Err(ConfigError::ZeroParameter(name)));
}

#[test]
fn from_json_validates() {
    let json = r#"{ "device": { "ranks_per_channel": 3 } }"#;
    assert_eq!(
        Config::from_json(json).err(),
        Some(ConfigError::RankCountNotPowerOfTwo(3))
    );
}
