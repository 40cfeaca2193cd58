//! Channel timing engine.
//!
//! The engine owns every rank of one channel and sequences bank and column commands
//! against them. It performs:
//! 1. **Activate/precharge:** Opening and closing rows with `tRAS`, `tRCD`, `tRRD(_L)`,
//!    `tXAW`, `tPPD`, and `tRP` enforced.
//! 2. **Burst access:** Hit/miss resolution, column command placement on the shared bus,
//!    and propagation of column-to-column and turnaround delays to every bank.
//! 3. **Event dispatch:** Firing the per-rank callbacks that drive the refresh and power
//!    state machines.
//! 4. **Command stream:** Flushing issued commands to an energy model.
//!
//! All state changes happen synchronously inside one call; nothing blocks. A call either
//! computes its result from current state or schedules a future callback.

use std::fmt;

use tracing::{debug, trace};

use super::bank::Bank;
use super::bus::{CommandBusArbiter, SharedBus};
use super::command::{Command, DramCommand, PowerSink, flush_commands};
use super::event::{EventId, EventQueue, RankEvent};
use super::host::ControllerHost;
use super::rank::{PowerState, Rank, RefreshState};
use super::request::{DramRequest, RequestQueue};
use crate::common::{ConfigError, DramError, DramResult, Tick};
use crate::config::{Config, PagePolicy};
use crate::stats::DramStats;

/// Timing engine for one channel.
pub struct TimingEngine {
    pub(crate) cfg: Config,
    pub(crate) ranks: Vec<Rank>,
    pub(crate) events: EventQueue,
    bus: SharedBus,
    pub(crate) now: Tick,
    pub(crate) active_rank: u8,
    pub(crate) timestamp_offset: u64,
    pub(crate) stats: DramStats,
}

impl fmt::Debug for TimingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingEngine")
            .field("now", &self.now)
            .field("ranks", &self.ranks.len())
            .field("active_rank", &self.active_rank)
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl TimingEngine {
    /// Builds an engine from a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Channel configuration; rejected if inconsistent.
    /// * `bus` - Command bus, possibly shared with other engines.
    ///
    /// # Returns
    ///
    /// An engine with every bank closed, at tick 0. Call [`Self::startup`] before use.
    pub fn new(config: &Config, bus: SharedBus) -> Result<Self, ConfigError> {
        config.validate()?;

        let d = &config.device;
        let activation_limit = config.timing.activation_limit as usize;
        let ranks: Vec<Rank> = (0..d.ranks_per_channel)
            .map(|r| {
                Rank::new(
                    r as u8,
                    d.banks_per_rank as u8,
                    d.bank_groups_per_rank as u8,
                    activation_limit,
                )
            })
            .collect();

        debug!(
            ranks = ranks.len(),
            banks = d.banks_per_rank,
            burst_size = config.burst_size(),
            row_buffer_size = config.row_buffer_size(),
            "timing engine created"
        );

        Ok(Self {
            stats: DramStats::new(ranks.len(), d.banks_per_rank as usize),
            cfg: config.clone(),
            ranks,
            events: EventQueue::new(),
            bus,
            now: 0,
            active_rank: 0,
            timestamp_offset: 0,
        })
    }

    /// Builds an engine with its own private command bus.
    pub fn with_private_bus(config: &Config) -> Result<Self, ConfigError> {
        let bus = CommandBusArbiter::shared(
            config.timing.t_ck,
            config.policy.bus_prune_interval,
        );
        Self::new(config, bus)
    }

    /// Configuration in use.
    pub const fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current simulated tick.
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Tick of the next pending rank callback.
    pub fn next_event_at(&self) -> Option<Tick> {
        self.events.next_at()
    }

    /// All ranks.
    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    /// Rank `rank`, if it exists.
    pub fn rank(&self, rank: u8) -> Option<&Rank> {
        self.ranks.get(usize::from(rank))
    }

    /// Bank `bank` of rank `rank`, if it exists.
    pub fn bank(&self, rank: u8, bank: u8) -> Option<&Bank> {
        self.rank(rank)?.banks.get(usize::from(bank))
    }

    /// Rank of the most recent burst.
    pub const fn active_rank(&self) -> u8 {
        self.active_rank
    }

    /// Startup time in command-clock cycles.
    pub const fn timestamp_offset(&self) -> u64 {
        self.timestamp_offset
    }

    /// Collected statistics.
    pub const fn stats(&self) -> &DramStats {
        &self.stats
    }

    /// Shared command bus handle.
    pub fn bus(&self) -> SharedBus {
        SharedBus::clone(&self.bus)
    }

    /// Whether the `kind` callback of `rank` is pending.
    pub fn is_event_scheduled(&self, rank: u8, kind: RankEvent) -> bool {
        self.events.is_scheduled(EventId::new(rank, kind))
    }

    /// When the `kind` callback of `rank` fires, if pending.
    pub fn event_time(&self, rank: u8, kind: RankEvent) -> Option<Tick> {
        self.events.when(EventId::new(rank, kind))
    }

    pub(crate) fn index(&self, rank: u8, bank: u8) -> DramResult<(usize, usize)> {
        let r = usize::from(rank);
        let b = usize::from(bank);
        match self.ranks.get(r) {
            Some(rank_ref) if b < rank_ref.banks.len() => Ok((r, b)),
            _ => Err(DramError::OutOfRange { rank, bank }),
        }
    }

    pub(crate) fn rank_index(&self, rank: u8) -> DramResult<usize> {
        let r = usize::from(rank);
        if r < self.ranks.len() {
            Ok(r)
        } else {
            Err(DramError::OutOfRange { rank, bank: 0 })
        }
    }

    pub(crate) fn event(&self, r: usize, kind: RankEvent) -> EventId {
        EventId::new(self.ranks[r].rank, kind)
    }

    pub(crate) fn log_command(&mut self, r: usize, kind: DramCommand, bank: u8, at: Tick) {
        let rank = &mut self.ranks[r];
        trace!(
            rank = rank.rank,
            bank,
            at,
            command = kind.mnemonic(),
            "command logged"
        );
        rank.cmd_list.push(Command::new(kind, bank, at));
    }

    /// Starts the channel: records the command-stream offset and schedules each rank's
    /// first refresh, leaving time to precharge before it is due.
    pub fn startup(&mut self, now: Tick) -> DramResult<()> {
        self.now = now;
        self.timestamp_offset = now.div_ceil(self.cfg.timing.t_ck);
        let ref_at = now + self.cfg.timing.t_refi - self.cfg.timing.t_rp;

        for r in 0..self.ranks.len() {
            self.ranks[r].power_state_at = now;
            let id = self.event(r, RankEvent::Refresh);
            self.events.schedule(id, ref_at)?;
        }
        debug!(now, first_refresh = ref_at, "channel started");
        Ok(())
    }

    /// Fires every rank callback due at or before `until`, in order, then moves the
    /// current tick to `until`.
    pub fn advance_to(&mut self, until: Tick, host: &mut dyn ControllerHost) -> DramResult<()> {
        while let Some((at, id)) = self.events.pop_due(until) {
            self.now = self.now.max(at);
            self.dispatch(id, host)?;
        }
        self.now = self.now.max(until);
        Ok(())
    }

    fn dispatch(&mut self, id: EventId, host: &mut dyn ControllerHost) -> DramResult<()> {
        let r = self.rank_index(id.rank)?;
        trace!(rank = id.rank, event = id.kind.as_str(), at = self.now, "event");
        match id.kind {
            RankEvent::WriteDone => self.process_write_done_event(r),
            RankEvent::Activate => self.process_activate_event(r),
            RankEvent::Precharge => self.process_precharge_event(r, host),
            RankEvent::Refresh => self.process_refresh_event(r, host),
            RankEvent::Power => self.process_power_event(r, host),
            RankEvent::WakeUp => self.process_wake_up_event(r),
        }
    }

    /// Opens `row` in a closed bank.
    ///
    /// # Arguments
    ///
    /// * `rank`, `bank` - Target bank.
    /// * `act_tick` - Earliest issue tick; the bus may grant a later one.
    /// * `row` - Row to open.
    ///
    /// # Returns
    ///
    /// The tick the activate issued at.
    pub fn activate(&mut self, rank: u8, bank: u8, act_tick: Tick, row: u32) -> DramResult<Tick> {
        let (r, b) = self.index(rank, bank)?;
        if let Some(open) = self.ranks[r].banks[b].open_row {
            return Err(DramError::RowAlreadyOpen { rank, bank, open });
        }

        let act_at = if self.cfg.policy.two_cycle_activate {
            self.bus.borrow_mut().verify_multi_cmd(
                act_tick,
                self.now,
                self.cfg.timing.t_aad,
                self.cfg.policy.max_commands_per_window,
            )
        } else {
            self.bus.borrow_mut().schedule_addr_bus(act_tick, self.now)
        };

        let t = &self.cfg.timing;
        let bank_group_arch = self.cfg.bank_group_arch();
        let banks_per_rank = self.cfg.device.banks_per_rank;
        let rank_ref = &mut self.ranks[r];

        let within_window =
            |oldest: Tick| act_at.checked_sub(oldest).is_some_and(|gap| gap < t.t_xaw);
        if let Some(oldest) = rank_ref.act_window.oldest().filter(|&o| within_window(o)) {
            return Err(DramError::ActivationWindow {
                rank,
                limit: t.activation_limit,
                window: act_at - oldest,
                at: act_at,
                oldest,
                t_xaw: t.t_xaw,
            });
        }
        if rank_ref.num_banks_active >= banks_per_rank {
            return Err(DramError::ActiveBankOverflow {
                rank,
                banks: banks_per_rank,
            });
        }
        rank_ref.num_banks_active += 1;

        let bank_ref = &mut rank_ref.banks[b];
        bank_ref.open_row = Some(row);
        // counters restart whether the row was auto-precharged or forced closed
        bank_ref.bytes_accessed = 0;
        bank_ref.row_accesses = 0;
        bank_ref.raise_pre(act_at + t.t_ras);
        bank_ref.raise_rd(act_at + t.t_rcd);
        bank_ref.raise_wr(act_at + t.t_rcd);
        let group = bank_ref.bank_group;

        for other in &mut rank_ref.banks {
            let delay = if bank_group_arch && other.bank_group == group {
                t.t_rrd_l
            } else {
                t.t_rrd
            };
            other.raise_act(act_at + delay);
        }

        rank_ref.act_window.record(act_at);
        if let Some(oldest) = rank_ref.act_window.oldest().filter(|&o| within_window(o)) {
            debug!(
                rank,
                limit = t.activation_limit,
                next_act = oldest + t.t_xaw,
                "enforcing tXAW"
            );
            for other in &mut rank_ref.banks {
                other.raise_act(oldest + t.t_xaw);
            }
        }

        debug!(
            rank,
            bank,
            row,
            at = act_at,
            active = rank_ref.num_banks_active,
            "activate"
        );

        self.stats.activates += 1;
        self.log_command(r, DramCommand::Act, bank, act_at);
        let id = self.event(r, RankEvent::Activate);
        self.events.schedule_or_advance(id, act_at);
        Ok(act_at)
    }

    /// Closes the open row of a bank.
    ///
    /// # Arguments
    ///
    /// * `rank`, `bank` - Target bank.
    /// * `pre_tick` - Issue tick. Used as-is when `auto_or_preall`, otherwise the earliest
    ///   acceptable bus slot.
    /// * `auto_or_preall` - Part of a burst (auto-precharge) or of a precharge-all; takes
    ///   no bus slot of its own.
    /// * `trace` - Log the command for the energy model.
    ///
    /// # Returns
    ///
    /// The tick the precharge issued at.
    pub fn precharge(
        &mut self,
        rank: u8,
        bank: u8,
        pre_tick: Tick,
        auto_or_preall: bool,
        trace: bool,
    ) -> DramResult<Tick> {
        let (r, b) = self.index(rank, bank)?;
        if self.ranks[r].banks[b].open_row.is_none() {
            return Err(DramError::NoOpenRow { rank, bank });
        }
        if self.ranks[r].num_banks_active == 0 {
            return Err(DramError::ActiveBankUnderflow { rank });
        }

        let pre_at = if auto_or_preall {
            pre_tick
        } else {
            self.bus.borrow_mut().schedule_addr_bus(pre_tick, self.now)
        };

        let t_rp = self.cfg.timing.t_rp;
        let t_ppd = self.cfg.timing.t_ppd;
        let rank_ref = &mut self.ranks[r];

        let bytes = rank_ref.banks[b].bytes_accessed;
        self.stats.bytes_per_activate_total += bytes;
        self.stats.bytes_per_activate_samples += 1;
        self.stats.precharges += 1;

        rank_ref.banks[b].open_row = None;
        if auto_or_preall {
            rank_ref.banks[b].raise_pre(pre_at);
        } else {
            for other in &mut rank_ref.banks {
                other.raise_pre(pre_at + t_ppd);
            }
        }

        let pre_done_at = pre_at + t_rp;
        rank_ref.banks[b].raise_act(pre_done_at);
        rank_ref.num_banks_active -= 1;

        debug!(
            rank,
            bank,
            at = pre_at,
            active = rank_ref.num_banks_active,
            "precharge"
        );

        if trace {
            self.log_command(r, DramCommand::Pre, bank, pre_at);
        }

        // The rank is only idle once the last precharge completes; an activate issued
        // before then may still reopen a bank, so decide at pre_done_at.
        let id = self.event(r, RankEvent::Precharge);
        if self.events.schedule_or_extend(id, pre_done_at) {
            self.ranks[r].outstanding_events += 1;
        }
        Ok(pre_at)
    }

    /// Issues the bank and column commands for one burst.
    ///
    /// # Arguments
    ///
    /// * `req` - The request; its `ready_time` is updated.
    /// * `next_burst_at` - Earliest tick the data bus allows the next burst.
    /// * `queues` - Pending requests of the current direction, in priority order. `req`
    ///   may still be present; it is skipped by id.
    ///
    /// # Returns
    ///
    /// `(issued_at, next_burst_at)` for the column command.
    pub fn do_burst_access(
        &mut self,
        req: &mut DramRequest,
        next_burst_at: Tick,
        queues: &[RequestQueue],
    ) -> DramResult<(Tick, Tick)> {
        let (r, b) = self.index(req.rank, req.bank)?;
        let rank = req.rank;
        let bank = req.bank;
        let now = self.now;

        trace!(rank, bank, row = req.row, read = req.is_read, "burst access");

        let state = self.ranks[r].refresh_state;
        if !self.ranks[r].in_ref_idle_state() {
            return Err(DramError::RankNotIdle {
                rank,
                state: state.as_str(),
            });
        }

        let t_xp = self.cfg.timing.t_xp;
        if self.ranks[r].in_low_power {
            if self.ranks[r].power_state == PowerState::Sref {
                return Err(DramError::InvalidPowerState {
                    rank,
                    what: "burst access",
                    state: PowerState::Sref.as_str(),
                });
            }
            self.schedule_wake_up(r, t_xp)?;
        }

        let open_row = self.ranks[r].banks[b].open_row;
        let row_hit = open_row == Some(req.row);
        if !row_hit {
            if open_row.is_some() {
                let pre_at = self.ranks[r].banks[b].pre_allowed_at().max(now);
                let _ = self.precharge(rank, bank, pre_at, false, true)?;
            }
            let act_at = self.ranks[r].banks[b].act_allowed_at().max(now);
            let _ = self.activate(rank, bank, act_at, req.row)?;
        }

        let t = &self.cfg.timing;
        let (t_ck, t_cl, t_burst, t_burst_min) = (t.t_ck, t.t_cl, t.t_burst, t.burst_min());
        let (t_ccd_l, t_ccd_l_wr, t_rtp, t_wr) = (t.t_ccd_l, t.t_ccd_l_wr, t.t_rtp, t.t_wr);
        let (wr_to_rd_same_bg, rd_to_wr_same_bg) = (t.wr_to_rd_dly_same_bg, t.rd_to_wr_dly_same_bg);
        let clk_resync_delay = t.clk_resync_delay;
        let policy = self.cfg.policy.clone();
        let read_to_write = self.cfg.read_to_write_delay();
        let write_to_read = self.cfg.write_to_read_delay();
        let rank_to_rank = self.cfg.rank_to_rank_delay();
        let bank_group_arch = self.cfg.bank_group_arch();
        let burst_size = self.cfg.burst_size();

        let col_allowed_at = self.ranks[r].banks[b].col_allowed_at(req.is_read);
        let last_burst_at = self.ranks[r].last_burst_at;
        let mut cmd_at = col_allowed_at.max(next_burst_at).max(now);

        let needs_resync = policy.data_clock_sync
            && cmd_at
                .checked_sub(last_burst_at)
                .is_none_or(|gap| gap > clk_resync_delay);
        cmd_at = if needs_resync {
            self.bus
                .borrow_mut()
                .verify_multi_cmd(cmd_at, now, t_ck, policy.max_commands_per_window)
        } else {
            self.bus.borrow_mut().schedule_addr_bus(cmd_at, now)
        };

        let mut burst_gap = t_burst_min;
        if policy.burst_interleave {
            if cmd_at == last_burst_at + t_burst_min {
                // already interleaving, next command waits a full burst
                burst_gap = t_burst;
            } else if cmd_at < last_burst_at + t_burst {
                // stay within the burst window but off the data of the previous burst
                cmd_at = last_burst_at + t_burst;
            }
        }
        debug!(rank, bank, at = cmd_at, read = req.is_read, "schedule burst");

        req.ready_time = cmd_at + t_cl + t_burst;
        self.ranks[r].last_burst_at = cmd_at;

        let group = self.ranks[r].banks[b].bank_group;
        for (j, rank_j) in self.ranks.iter_mut().enumerate() {
            for other in &mut rank_j.banks {
                let (dly_to_rd, dly_to_wr) = if j != r {
                    // other ranks only see the rank switch
                    (rank_to_rank, rank_to_rank)
                } else if bank_group_arch && other.bank_group == group {
                    if req.is_read {
                        (t_ccd_l, t_ccd_l.max(rd_to_wr_same_bg))
                    } else {
                        (t_ccd_l.max(wr_to_rd_same_bg), t_ccd_l_wr)
                    }
                } else if req.is_read {
                    (burst_gap, read_to_write)
                } else {
                    (write_to_read, burst_gap)
                };
                other.raise_rd(cmd_at + dly_to_rd);
                other.raise_wr(cmd_at + dly_to_wr);
            }
        }

        self.active_rank = rank;

        let bank_ref = &mut self.ranks[r].banks[b];
        bank_ref.raise_pre(if req.is_read {
            cmd_at + t_rtp
        } else {
            req.ready_time + t_wr
        });
        bank_ref.bytes_accessed += burst_size;
        bank_ref.row_accesses += 1;
        let row_accesses = bank_ref.row_accesses;

        let mut auto_precharge = policy.page_policy == PagePolicy::Close
            || row_accesses == policy.max_accesses_per_row;
        if !auto_precharge
            && matches!(
                policy.page_policy,
                PagePolicy::OpenAdaptive | PagePolicy::CloseAdaptive
            )
        {
            let (more_hits, bank_conflict) = Self::queued_row_demand(req, queues);
            auto_precharge = !more_hits
                && (bank_conflict || policy.page_policy == PagePolicy::CloseAdaptive);
        }

        let kind = if req.is_read {
            DramCommand::Rd
        } else {
            DramCommand::Wr
        };
        self.log_command(r, kind, bank, cmd_at);

        if auto_precharge {
            let pre_at = now.max(self.ranks[r].banks[b].pre_allowed_at());
            let _ = self.precharge(rank, bank, pre_at, true, true)?;
            debug!(rank, bank, at = pre_at, "auto-precharge");
        }

        let bank_id = req.bank_id(self.ranks[r].banks.len());
        if req.is_read {
            self.ranks[r].outstanding_events += 1;

            self.stats.read_bursts += 1;
            self.stats.read_row_hits += u64::from(row_hit);
            self.stats.bytes_read += burst_size;
            self.stats.per_bank_rd_bursts[bank_id] += 1;
            self.stats.tot_mem_acc_lat += req.ready_time.saturating_sub(req.entry_time);
            self.stats.tot_q_lat += cmd_at.saturating_sub(req.entry_time);
            self.stats.tot_bus_lat += t_burst;
        } else {
            // one write-done event per rank, pushed to the latest ready time
            let id = self.event(r, RankEvent::WriteDone);
            if self.events.schedule_or_extend(id, req.ready_time) {
                self.ranks[r].outstanding_events += 1;
            }
            let rank_ref = &mut self.ranks[r];
            rank_ref.write_entries = rank_ref.write_entries.saturating_sub(1);

            self.stats.write_bursts += 1;
            self.stats.write_row_hits += u64::from(row_hit);
            self.stats.bytes_written += burst_size;
            self.stats.per_bank_wr_bursts[bank_id] += 1;
        }

        Ok((cmd_at, cmd_at + burst_gap))
    }

    /// Looks for other queued requests to the same bank.
    ///
    /// # Returns
    ///
    /// `(more_hits, bank_conflict)`: a request to the same row exists, and a request to a
    /// different row exists (only meaningful when there are no hits).
    fn queued_row_demand(req: &DramRequest, queues: &[RequestQueue]) -> (bool, bool) {
        let mut bank_conflict = false;
        let same_bank = queues
            .iter()
            .flatten()
            .filter(|p| p.id != req.id && p.rank == req.rank && p.bank == req.bank);
        for p in same_bank {
            if p.row == req.row {
                return (true, bank_conflict);
            }
            bank_conflict = true;
        }
        (false, bank_conflict)
    }

    /// Applies the rank-switch delay to every bank, for bursts issued by another engine
    /// sharing the same data bus.
    pub fn add_rank_to_rank_delay(&mut self, cmd_at: Tick) {
        let delay = self.cfg.rank_to_rank_delay();
        for bank in self.ranks.iter_mut().flat_map(|r| r.banks.iter_mut()) {
            bank.raise_rd(cmd_at + delay);
            bank.raise_wr(cmd_at + delay);
        }
    }

    /// Whether the rank of `req` accepts reads and writes.
    pub fn burst_ready(&self, req: &DramRequest) -> bool {
        self.rank(req.rank).is_some_and(Rank::in_ref_idle_state)
    }

    /// Whether no rank can accept a burst right now.
    ///
    /// A rank counts as busy when its refresh state is not idle, except a rank in
    /// self-refresh: it is never counted, so `true` means every rank is refreshing and none
    /// of them sits in self-refresh.
    ///
    /// Also lets a rank waiting to drain proceed with its refresh, and wakes ranks in
    /// self-refresh that have work queued.
    pub fn is_busy(&mut self, host: &dyn ControllerHost) -> DramResult<bool> {
        let t_xs = self.cfg.timing.t_xs;
        let mut busy_ranks = 0;
        for r in 0..self.ranks.len() {
            if self.ranks[r].in_ref_idle_state() {
                continue;
            }
            if self.ranks[r].power_state != PowerState::Sref {
                trace!(rank = self.ranks[r].rank, "rank not available");
                busy_ranks += 1;
                self.check_drain_done(r)?;
            }
            let rank_ref = &self.ranks[r];
            if rank_ref.power_state == PowerState::Sref
                && rank_ref.in_low_power
                && self.force_self_refresh_exit(r, host)
            {
                debug!(rank = rank_ref.rank, "waking from self-refresh");
                self.schedule_wake_up(r, t_xs)?;
            }
        }
        Ok(busy_ranks == self.ranks.len())
    }

    /// Counts a newly queued request against its rank.
    pub fn setup_rank(&mut self, rank: u8, is_read: bool) -> DramResult<()> {
        let r = self.rank_index(rank)?;
        if is_read {
            self.ranks[r].read_entries += 1;
        } else {
            self.ranks[r].write_entries += 1;
        }
        Ok(())
    }

    /// Retires a read that reached its ready time, powering the rank down if it has
    /// nothing left to do.
    pub fn respond_event(&mut self, rank: u8, host: &dyn ControllerHost) -> DramResult<()> {
        let r = self.rank_index(rank)?;
        let enable_powerdown = self.cfg.policy.enable_powerdown;
        let rank_ref = &mut self.ranks[r];

        rank_ref.read_entries = rank_ref.read_entries.saturating_sub(1);
        if rank_ref.outstanding_events == 0 {
            return Err(DramError::OutstandingUnderflow { rank });
        }
        rank_ref.outstanding_events -= 1;

        if rank_ref.power_state.is_low_power() {
            return Err(DramError::InvalidPowerState {
                rank,
                what: "read response",
                state: rank_ref.power_state.as_str(),
            });
        }

        if enable_powerdown
            && self.ranks[r].outstanding_events == 0
            && self.ranks[r].in_ref_idle_state()
            && self.is_queue_empty(r, host)
        {
            // active power-down unless a precharge already closed every bank
            let next = if self.ranks[r].power_state == PowerState::Idle {
                PowerState::PrePdn
            } else {
                PowerState::ActPdn
            };
            debug!(rank, at = self.now, next = next.as_str(), "rank sleep");
            self.power_down_sleep(r, next, self.now)?;
        }
        Ok(())
    }

    /// Restarts a refresh that was waiting on a read to complete.
    pub fn check_refresh_state(&mut self, rank: u8) -> DramResult<()> {
        let r = self.rank_index(rank)?;
        let precharge = self.event(r, RankEvent::Precharge);
        let refresh = self.event(r, RankEvent::Refresh);
        if self.ranks[r].refresh_state == RefreshState::Pre
            && !self.events.is_scheduled(precharge)
            && !self.events.is_scheduled(refresh)
        {
            self.events.schedule(refresh, self.now)?;
        }
        Ok(())
    }

    /// Forces ranks out of self-refresh so the system can drain.
    pub fn drain_ranks(&mut self) -> DramResult<()> {
        let t_xs = self.cfg.timing.t_xs;
        for r in 0..self.ranks.len() {
            if self.ranks[r].power_state == PowerState::Sref {
                debug!(rank = self.ranks[r].rank, "forcing self-refresh wake-up for drain");
                self.schedule_wake_up(r, t_xs)?;
            }
        }
        Ok(())
    }

    /// Whether every rank is power-idle and refresh-idle.
    pub fn all_ranks_drained(&self) -> bool {
        self.ranks
            .iter()
            .all(|r| r.in_pwr_idle_state() && r.in_ref_idle_state())
    }

    /// Stops periodic refresh and closes out power residency accounting.
    pub fn suspend(&mut self) {
        for r in 0..self.ranks.len() {
            let id = self.event(r, RankEvent::Refresh);
            let _ = self.events.deschedule(id);
            self.account_power_residency(r);
            self.ranks[r].power_state_post_refresh = PowerState::Idle;
        }
        debug!(now = self.now, "channel suspended");
    }

    /// Delivers every logged command at or before the current tick to `sink`.
    pub fn flush_command_logs(&mut self, sink: &mut dyn PowerSink) {
        let t_ck = self.cfg.timing.t_ck;
        for rank in &mut self.ranks {
            flush_commands(
                rank.rank,
                &mut rank.cmd_list,
                self.now,
                t_ck,
                self.timestamp_offset,
                sink,
            );
        }
    }
}
