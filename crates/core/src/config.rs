//! Configuration system for the DRAM engine.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the engine. It provides:
//! 1. **Defaults:** Baseline DDR4-2400 x8 organization and timing constants.
//! 2. **Structures:** Hierarchical config for device organization, timing, policy, and the
//!    trace controller.
//! 3. **Enums:** Row-buffer (page) management policy.
//! 4. **Validation:** Setup-time consistency checks; the engine refuses to start on failure.
//!
//! Configuration is supplied as JSON (see [`Config::from_json`]) or use `Config::default()`.

use serde::Deserialize;

use crate::common::{ConfigError, Tick};

/// Default configuration constants.
///
/// Timings are in ticks (picoseconds). Values follow a DDR4-2400 device with an x8
/// interface, eight devices per rank, and four bank groups.
mod defaults {
    use crate::common::Tick;

    /// Burst length in beats.
    pub const BURST_LENGTH: u32 = 8;
    /// Data pins per device.
    pub const DEVICE_BUS_WIDTH: u32 = 8;
    /// Devices forming one rank.
    pub const DEVICES_PER_RANK: u32 = 8;
    /// Row buffer size of a single device in bytes.
    pub const DEVICE_ROWBUFFER_SIZE: u32 = 1024;
    /// Ranks per channel.
    pub const RANKS_PER_CHANNEL: u32 = 2;
    /// Banks per rank.
    pub const BANKS_PER_RANK: u32 = 16;
    /// Bank groups per rank (0 disables the bank-group architecture).
    pub const BANK_GROUPS_PER_RANK: u32 = 4;

    /// Clock period.
    pub const T_CK: Tick = 833;
    /// CAS latency.
    pub const T_CL: Tick = 14_160;
    /// Burst duration on the data bus.
    pub const T_BURST: Tick = 3_332;
    /// Activate-to-column delay.
    pub const T_RCD: Tick = 14_160;
    /// Precharge duration.
    pub const T_RP: Tick = 14_160;
    /// Minimum row-active duration.
    pub const T_RAS: Tick = 32_000;
    /// Write recovery.
    pub const T_WR: Tick = 15_000;
    /// Read to precharge.
    pub const T_RTP: Tick = 7_500;
    /// Refresh recovery.
    pub const T_RFC: Tick = 350_000;
    /// Refresh interval.
    pub const T_REFI: Tick = 7_800_000;
    /// Activate-to-activate, different bank group.
    pub const T_RRD: Tick = 3_332;
    /// Activate-to-activate, same bank group.
    pub const T_RRD_L: Tick = 4_900;
    /// Precharge-to-precharge.
    pub const T_PPD: Tick = 0;
    /// Second-cycle activate delay for two-cycle activates.
    pub const T_AAD: Tick = 0;
    /// Activation window.
    pub const T_XAW: Tick = 21_000;
    /// Activates allowed per window.
    pub const ACTIVATION_LIMIT: u32 = 4;
    /// Power-down exit.
    pub const T_XP: Tick = 6_000;
    /// Self-refresh exit.
    pub const T_XS: Tick = 340_000;
    /// Column-to-column, same bank group.
    pub const T_CCD_L: Tick = 5_000;
    /// Write-to-write, same bank group.
    pub const T_CCD_L_WR: Tick = 5_000;
    /// Write-to-read turnaround.
    pub const T_WTR: Tick = 5_000;
    /// Read-to-write turnaround.
    pub const T_RTW: Tick = 1_666;
    /// Rank-to-rank switch.
    pub const T_CS: Tick = 1_666;

    /// Column accesses per row before a forced auto-precharge.
    pub const MAX_ACCESSES_PER_ROW: u32 = 16;
    /// Commands per window for the multi-command path.
    pub const MAX_COMMANDS_PER_WINDOW: u32 = 2;
    /// Arbiter calls between reservation prunes.
    pub const BUS_PRUNE_INTERVAL: u32 = 1000;

    /// Write queue occupancy that forces a switch to writes.
    pub const WRITE_HIGH_THRESHOLD: usize = 32;
    /// Write queue occupancy at which draining stops.
    pub const WRITE_LOW_THRESHOLD: usize = 16;
}

/// Row-buffer management policy.
///
/// Decides whether a row stays open after a column access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PagePolicy {
    /// Keep the row open until a conflict forces a precharge.
    Open,
    /// Keep the row open unless there are no queued hits and a queued bank conflict.
    #[default]
    OpenAdaptive,
    /// Auto-precharge after every access.
    Close,
    /// Auto-precharge unless a queued request hits the same row.
    CloseAdaptive,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use minirank_core::config::{Config, PagePolicy};
///
/// let json = r#"{
///     "device": { "ranks_per_channel": 1, "banks_per_rank": 8, "bank_groups_per_rank": 0 },
///     "timing": { "t_refi": 3900000 },
///     "policy": { "page_policy": "Close", "enable_powerdown": true }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.device.banks_per_rank, 8);
/// assert_eq!(config.timing.t_refi, 3_900_000);
/// assert_eq!(config.timing.t_rcd, 14_160);
/// assert_eq!(config.policy.page_policy, PagePolicy::Close);
/// assert!(!config.bank_group_arch());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Device and channel organization
    #[serde(default)]
    pub device: DeviceConfig,
    /// DRAM timing parameters
    #[serde(default)]
    pub timing: TimingConfig,
    /// Page, interleave, and power policies
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Trace controller queue thresholds
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// Device organization of one channel.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Burst length in beats
    #[serde(default = "DeviceConfig::default_burst_length")]
    pub burst_length: u32,

    /// Data pins per device
    #[serde(default = "DeviceConfig::default_device_bus_width")]
    pub device_bus_width: u32,

    /// Devices per rank
    #[serde(default = "DeviceConfig::default_devices_per_rank")]
    pub devices_per_rank: u32,

    /// Row buffer size per device in bytes
    #[serde(default = "DeviceConfig::default_device_rowbuffer_size")]
    pub device_rowbuffer_size: u32,

    /// Ranks in this channel
    #[serde(default = "DeviceConfig::default_ranks_per_channel")]
    pub ranks_per_channel: u32,

    /// Banks per rank
    #[serde(default = "DeviceConfig::default_banks_per_rank")]
    pub banks_per_rank: u32,

    /// Bank groups per rank; 0 disables the bank-group architecture
    #[serde(default = "DeviceConfig::default_bank_groups_per_rank")]
    pub bank_groups_per_rank: u32,
}

impl DeviceConfig {
    fn default_burst_length() -> u32 {
        defaults::BURST_LENGTH
    }

    fn default_device_bus_width() -> u32 {
        defaults::DEVICE_BUS_WIDTH
    }

    fn default_devices_per_rank() -> u32 {
        defaults::DEVICES_PER_RANK
    }

    fn default_device_rowbuffer_size() -> u32 {
        defaults::DEVICE_ROWBUFFER_SIZE
    }

    fn default_ranks_per_channel() -> u32 {
        defaults::RANKS_PER_CHANNEL
    }

    fn default_banks_per_rank() -> u32 {
        defaults::BANKS_PER_RANK
    }

    fn default_bank_groups_per_rank() -> u32 {
        defaults::BANK_GROUPS_PER_RANK
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            burst_length: defaults::BURST_LENGTH,
            device_bus_width: defaults::DEVICE_BUS_WIDTH,
            devices_per_rank: defaults::DEVICES_PER_RANK,
            device_rowbuffer_size: defaults::DEVICE_ROWBUFFER_SIZE,
            ranks_per_channel: defaults::RANKS_PER_CHANNEL,
            banks_per_rank: defaults::BANKS_PER_RANK,
            bank_groups_per_rank: defaults::BANK_GROUPS_PER_RANK,
        }
    }
}

/// DRAM timing parameters, in ticks.
///
/// `t_burst_min` and `t_burst_max` default to `t_burst` when omitted; they only differ
/// for interleaved-burst devices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Clock period (command bus slot width)
    pub t_ck: Tick,
    /// CAS latency
    pub t_cl: Tick,
    /// Burst duration
    pub t_burst: Tick,
    /// Minimum spacing between interleaved bursts
    pub t_burst_min: Option<Tick>,
    /// Longest burst window of an interleaved pair
    pub t_burst_max: Option<Tick>,
    /// Activate to column command
    pub t_rcd: Tick,
    /// Precharge duration
    pub t_rp: Tick,
    /// Minimum row-active time
    pub t_ras: Tick,
    /// Write recovery before precharge
    pub t_wr: Tick,
    /// Read to precharge
    pub t_rtp: Tick,
    /// Refresh recovery
    pub t_rfc: Tick,
    /// Refresh interval
    pub t_refi: Tick,
    /// Activate to activate, different bank group
    pub t_rrd: Tick,
    /// Activate to activate, same bank group
    pub t_rrd_l: Tick,
    /// Precharge to precharge
    pub t_ppd: Tick,
    /// Second-cycle activate delay
    pub t_aad: Tick,
    /// Activation window length
    pub t_xaw: Tick,
    /// Activates allowed within `t_xaw`
    pub activation_limit: u32,
    /// Power-down exit delay
    pub t_xp: Tick,
    /// Self-refresh exit delay
    pub t_xs: Tick,
    /// Column to column, same bank group
    pub t_ccd_l: Tick,
    /// Write to write, same bank group
    pub t_ccd_l_wr: Tick,
    /// Write to read turnaround
    pub t_wtr: Tick,
    /// Read to write turnaround
    pub t_rtw: Tick,
    /// Rank to rank switch
    pub t_cs: Tick,
    /// Additional write-to-read delay within a bank group
    pub wr_to_rd_dly_same_bg: Tick,
    /// Additional read-to-write delay within a bank group
    pub rd_to_wr_dly_same_bg: Tick,
    /// Gap after which the data clock must resynchronize
    pub clk_resync_delay: Tick,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            t_ck: defaults::T_CK,
            t_cl: defaults::T_CL,
            t_burst: defaults::T_BURST,
            t_burst_min: None,
            t_burst_max: None,
            t_rcd: defaults::T_RCD,
            t_rp: defaults::T_RP,
            t_ras: defaults::T_RAS,
            t_wr: defaults::T_WR,
            t_rtp: defaults::T_RTP,
            t_rfc: defaults::T_RFC,
            t_refi: defaults::T_REFI,
            t_rrd: defaults::T_RRD,
            t_rrd_l: defaults::T_RRD_L,
            t_ppd: defaults::T_PPD,
            t_aad: defaults::T_AAD,
            t_xaw: defaults::T_XAW,
            activation_limit: defaults::ACTIVATION_LIMIT,
            t_xp: defaults::T_XP,
            t_xs: defaults::T_XS,
            t_ccd_l: defaults::T_CCD_L,
            t_ccd_l_wr: defaults::T_CCD_L_WR,
            t_wtr: defaults::T_WTR,
            t_rtw: defaults::T_RTW,
            t_cs: defaults::T_CS,
            wr_to_rd_dly_same_bg: 0,
            rd_to_wr_dly_same_bg: 0,
            clk_resync_delay: 0,
        }
    }
}

impl TimingConfig {
    /// Minimum burst spacing, falling back to `t_burst`.
    pub const fn burst_min(&self) -> Tick {
        match self.t_burst_min {
            Some(t) => t,
            None => self.t_burst,
        }
    }

    /// Maximum burst window, falling back to `t_burst`.
    pub const fn burst_max(&self) -> Tick {
        match self.t_burst_max {
            Some(t) => t,
            None => self.t_burst,
        }
    }
}

/// Row-buffer, interleave, and power-management policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Page management policy
    #[serde(default)]
    pub page_policy: PagePolicy,

    /// Column accesses per row before a forced auto-precharge (0 disables the limit)
    #[serde(default = "PolicyConfig::default_max_accesses_per_row")]
    pub max_accesses_per_row: u32,

    /// Align bursts to interleave boundaries
    #[serde(default)]
    pub burst_interleave: bool,

    /// Data clock must resynchronize after `clk_resync_delay` of bus idle
    #[serde(default)]
    pub data_clock_sync: bool,

    /// Activates occupy two command cycles
    #[serde(default)]
    pub two_cycle_activate: bool,

    /// Allow ranks to enter power-down and self-refresh
    #[serde(default)]
    pub enable_powerdown: bool,

    /// Commands per window on the multi-command bus path
    #[serde(default = "PolicyConfig::default_max_commands_per_window")]
    pub max_commands_per_window: u32,

    /// Arbiter calls between pruning of stale bus reservations
    #[serde(default = "PolicyConfig::default_bus_prune_interval")]
    pub bus_prune_interval: u32,
}

impl PolicyConfig {
    fn default_max_accesses_per_row() -> u32 {
        defaults::MAX_ACCESSES_PER_ROW
    }

    fn default_max_commands_per_window() -> u32 {
        defaults::MAX_COMMANDS_PER_WINDOW
    }

    fn default_bus_prune_interval() -> u32 {
        defaults::BUS_PRUNE_INTERVAL
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            page_policy: PagePolicy::default(),
            max_accesses_per_row: defaults::MAX_ACCESSES_PER_ROW,
            burst_interleave: false,
            data_clock_sync: false,
            two_cycle_activate: false,
            enable_powerdown: false,
            max_commands_per_window: defaults::MAX_COMMANDS_PER_WINDOW,
            bus_prune_interval: defaults::BUS_PRUNE_INTERVAL,
        }
    }
}

/// Queue thresholds of the built-in trace controller.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Switch to writes once this many are queued
    #[serde(default = "ControllerConfig::default_write_high")]
    pub write_high_threshold: usize,

    /// Stop draining writes at this occupancy
    #[serde(default = "ControllerConfig::default_write_low")]
    pub write_low_threshold: usize,
}

impl ControllerConfig {
    fn default_write_high() -> usize {
        defaults::WRITE_HIGH_THRESHOLD
    }

    fn default_write_low() -> usize {
        defaults::WRITE_LOW_THRESHOLD
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            write_high_threshold: defaults::WRITE_HIGH_THRESHOLD,
            write_low_threshold: defaults::WRITE_LOW_THRESHOLD,
        }
    }
}

impl Config {
    /// Parses a JSON configuration and validates it.
    ///
    /// Omitted sections and fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Bytes transferred by one burst across the whole rank.
    pub const fn burst_size(&self) -> u64 {
        (self.device.devices_per_rank as u64
            * self.device.burst_length as u64
            * self.device.device_bus_width as u64)
            / 8
    }

    /// Row buffer size of a rank in bytes.
    pub const fn row_buffer_size(&self) -> u64 {
        self.device.devices_per_rank as u64 * self.device.device_rowbuffer_size as u64
    }

    /// Whether same-group timings (`tRRD_L`, `tCCD_L`) apply.
    pub const fn bank_group_arch(&self) -> bool {
        self.device.bank_groups_per_rank > 0
    }

    /// Time the data bus is occupied by one burst.
    pub const fn burst_delay(&self) -> Tick {
        if self.policy.burst_interleave {
            self.timing.burst_max() / 2
        } else {
            self.timing.t_burst
        }
    }

    /// Turnaround from a read burst to the next write command.
    pub const fn read_to_write_delay(&self) -> Tick {
        self.timing.t_burst + self.timing.t_rtw
    }

    /// Turnaround from a write burst to the next read command.
    pub const fn write_to_read_delay(&self) -> Tick {
        self.timing.t_burst + self.timing.t_wtr + self.timing.t_cl
    }

    /// Switch delay between bursts to different ranks.
    pub const fn rank_to_rank_delay(&self) -> Tick {
        self.timing.t_burst + self.timing.t_cs
    }

    /// Lead time a controller needs for a precharge plus activate ahead of a burst.
    pub const fn command_offset(&self) -> Tick {
        self.timing.t_rp + self.timing.t_rcd
    }

    /// Closed-page access latency.
    pub const fn access_latency(&self) -> Tick {
        self.timing.t_rp + self.timing.t_rcd + self.timing.t_cl
    }

    /// Checks every setup-time consistency rule.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the engine may start, otherwise the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.device;
        let t = &self.timing;

        if t.t_ck == 0 {
            return Err(ConfigError::ZeroParameter("t_ck"));
        }
        if t.activation_limit == 0 {
            return Err(ConfigError::ZeroParameter("activation_limit"));
        }
        if self.policy.bus_prune_interval == 0 {
            return Err(ConfigError::ZeroParameter("bus_prune_interval"));
        }

        let burst_size = self.burst_size();
        if !burst_size.is_power_of_two() {
            return Err(ConfigError::BurstSizeNotPowerOfTwo(burst_size));
        }

        // rank index is taken from address bits
        if !d.ranks_per_channel.is_power_of_two() {
            return Err(ConfigError::RankCountNotPowerOfTwo(d.ranks_per_channel));
        }

        if d.ranks_per_channel > 128 {
            return Err(ConfigError::RankCountOutOfRange(d.ranks_per_channel));
        }

        if d.banks_per_rank == 0 || d.banks_per_rank > 64 {
            return Err(ConfigError::BankCountOutOfRange(d.banks_per_rank));
        }

        if t.t_refi <= t.t_rp || t.t_refi <= t.t_rfc {
            return Err(ConfigError::RefreshIntervalTooShort {
                t_refi: t.t_refi,
                t_rp: t.t_rp,
                t_rfc: t.t_rfc,
            });
        }

        if self.bank_group_arch() {
            let groups = d.bank_groups_per_rank;
            if groups > d.banks_per_rank {
                return Err(ConfigError::TooManyBankGroups {
                    banks: d.banks_per_rank,
                    groups,
                });
            }
            if d.banks_per_rank % groups != 0 {
                return Err(ConfigError::UnevenBankGroups {
                    banks: d.banks_per_rank,
                    groups,
                });
            }
            if t.t_ccd_l < t.t_burst {
                return Err(ConfigError::ColumnDelayBelowBurst {
                    name: "tCCD_L",
                    value: t.t_ccd_l,
                    t_burst: t.t_burst,
                });
            }
            if t.t_ccd_l_wr < t.t_burst {
                return Err(ConfigError::ColumnDelayBelowBurst {
                    name: "tCCD_L_WR",
                    value: t.t_ccd_l_wr,
                    t_burst: t.t_burst,
                });
            }
            if t.t_rrd_l < t.t_rrd {
                return Err(ConfigError::SameGroupActivateTooShort {
                    t_rrd_l: t.t_rrd_l,
                    t_rrd: t.t_rrd,
                });
            }
        }

        let c = &self.controller;
        if c.write_low_threshold >= c.write_high_threshold {
            return Err(ConfigError::WriteThresholds {
                low: c.write_low_threshold,
                high: c.write_high_threshold,
            });
        }

        Ok(())
    }
}
