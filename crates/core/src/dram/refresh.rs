//! Rank refresh state machine.
//!
//! A refresh walks `Idle -> Drain -> PdExit -> Pre -> Start -> Run -> Idle`. Each step
//! either advances immediately or returns and waits for another callback (an access
//! draining, a wake-up, the last precharge) to re-enter it. While the rank is anywhere
//! but `Idle` it accepts no reads or writes.

use tracing::debug;

use super::bank::Bank;
use super::command::DramCommand;
use super::engine::TimingEngine;
use super::event::RankEvent;
use super::host::{ControllerHost, DrainState};
use super::rank::{PowerState, RefreshState};
use crate::common::{DramError, DramResult, Tick};

impl TimingEngine {
    pub(crate) fn process_refresh_event(
        &mut self,
        r: usize,
        host: &mut dyn ControllerHost,
    ) -> DramResult<()> {
        let now = self.now;
        let t_xp = self.cfg.timing.t_xp;
        let t_rp = self.cfg.timing.t_rp;
        let t_rfc = self.cfg.timing.t_rfc;
        let t_refi = self.cfg.timing.t_refi;
        let rank_id = self.ranks[r].rank;

        if matches!(
            self.ranks[r].refresh_state,
            RefreshState::Idle | RefreshState::SrefExit
        ) {
            let rank = &mut self.ranks[r];
            rank.refresh_due_at = now;
            rank.refresh_state = RefreshState::Drain;
            // keeps power-down and self-refresh away while the refresh is pending
            rank.outstanding_events += 1;
            debug!(rank = rank_id, at = now, "refresh due");
        }

        if self.ranks[r].refresh_state == RefreshState::Drain {
            // let an access already in flight to this rank finish first
            if self.active_rank == rank_id && host.request_event_scheduled() {
                debug!(rank = rank_id, "refresh awaiting drain");
                return Ok(());
            }
            self.ranks[r].refresh_state = RefreshState::PdExit;
        }

        if self.ranks[r].refresh_state == RefreshState::PdExit {
            if self.ranks[r].in_low_power {
                debug!(rank = rank_id, "waking up for refresh");
                return self.schedule_wake_up(r, t_xp);
            }
            self.ranks[r].refresh_state = RefreshState::Pre;
        }

        if self.ranks[r].refresh_state == RefreshState::Pre {
            return self.refresh_precharge_all(r, host);
        }

        if self.ranks[r].refresh_state == RefreshState::Start {
            self.check_refreshable(r, "refresh start")?;

            let ref_done_at = now + t_rfc;
            for bank in &mut self.ranks[r].banks {
                bank.raise_act(ref_done_at);
            }
            self.log_command(r, DramCommand::Ref, 0, now);
            self.stats.refreshes += 1;

            let rank = &mut self.ranks[r];
            rank.refresh_due_at += t_refi;
            if rank.refresh_due_at < ref_done_at {
                return Err(DramError::RefreshOverrun {
                    rank: rank_id,
                    due: rank.refresh_due_at,
                    done: ref_done_at,
                });
            }
            rank.refresh_state = RefreshState::Run;
            debug!(rank = rank_id, at = now, done = ref_done_at, "refresh issued");

            let id = self.event(r, RankEvent::Refresh);
            return self.events.schedule(id, ref_done_at);
        }

        if self.ranks[r].refresh_state == RefreshState::Run {
            self.check_refreshable(r, "refresh completion")?;

            let draining = matches!(
                host.drain_state(),
                DrainState::Draining | DrainState::Drained
            );
            if draining {
                // no low-power entry while draining
                self.schedule_power_event(r, PowerState::Idle, now)?;
            } else if self.ranks[r].power_state_post_refresh != PowerState::Idle {
                debug!(
                    rank = rank_id,
                    state = self.ranks[r].power_state_post_refresh.as_str(),
                    "sleeping after refresh"
                );
                let state = self.ranks[r].power_state;
                self.power_down_sleep(r, state, now)?;
            } else if self.cfg.policy.enable_powerdown && self.is_queue_empty(r, host) {
                debug!(rank = rank_id, "entering power-down after refresh");
                self.power_down_sleep(r, PowerState::PrePdn, now)?;
            } else {
                self.schedule_power_event(r, PowerState::Idle, now)?;
            }

            // make up for the time spent precharging before the refresh
            let next_at = self.ranks[r].refresh_due_at.saturating_sub(t_rp).max(now);
            debug!(rank = rank_id, at = now, next = next_at, "refresh done");
            let id = self.event(r, RankEvent::Refresh);
            self.events.schedule(id, next_at)?;
        }

        Ok(())
    }

    /// Closes every open bank of rank `r` with one precharge-all, or kicks off the
    /// refresh directly if the rank is already idle.
    fn refresh_precharge_all(&mut self, r: usize, host: &dyn ControllerHost) -> DramResult<()> {
        let now = self.now;
        let t_rp = self.cfg.timing.t_rp;
        let rank_id = self.ranks[r].rank;

        if self.ranks[r].num_banks_active != 0 {
            // respect any auto-precharge already placed in the future
            let pre_at = self.ranks[r]
                .banks
                .iter()
                .map(Bank::pre_allowed_at)
                .fold(now, Tick::max);
            let act_allowed_at = pre_at + t_rp;
            debug!(rank = rank_id, at = pre_at, "precharging all");

            for b in 0..self.ranks[r].banks.len() {
                if self.ranks[r].banks[b].open_row.is_some() {
                    let _ = self.precharge(rank_id, b as u8, pre_at, true, false)?;
                } else {
                    let bank = &mut self.ranks[r].banks[b];
                    bank.raise_act(act_allowed_at);
                    bank.raise_pre(pre_at);
                }
            }
            self.log_command(r, DramCommand::Prea, 0, pre_at);
        } else if self.ranks[r].power_state == PowerState::Idle
            && self.ranks[r].outstanding_events == 1
        {
            debug!(rank = rank_id, "all banks already precharged, starting refresh");
            self.schedule_power_event(r, PowerState::Ref, now)?;
        } else {
            // the last precharge or read response restarts this step
            debug!(
                rank = rank_id,
                precharge_pending = self.events.is_scheduled(self.event(r, RankEvent::Precharge)),
                respond_pending = host.respond_event_scheduled(),
                "refresh waiting for banks to close"
            );
        }
        Ok(())
    }

    fn check_refreshable(&self, r: usize, what: &'static str) -> DramResult<()> {
        let rank = &self.ranks[r];
        if rank.num_banks_active != 0 || rank.power_state != PowerState::Ref {
            return Err(DramError::InvalidPowerState {
                rank: rank.rank,
                what,
                state: rank.power_state.as_str(),
            });
        }
        Ok(())
    }

    /// Lets a rank that was waiting for an access to drain proceed to its refresh.
    pub(crate) fn check_drain_done(&mut self, r: usize) -> DramResult<()> {
        if self.ranks[r].refresh_state == RefreshState::Drain {
            debug!(rank = self.ranks[r].rank, "refresh drain done");
            self.ranks[r].refresh_state = RefreshState::PdExit;
            let id = self.event(r, RankEvent::Refresh);
            if !self.events.is_scheduled(id) {
                self.events.schedule(id, self.now)?;
            }
        }
        Ok(())
    }
}
