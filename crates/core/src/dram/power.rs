//! Rank power-state machine.
//!
//! Transitions are never applied directly: [`TimingEngine::schedule_power_event`] records
//! the target state and schedules the rank's power callback, which then applies it and
//! reacts (restarting refresh, entering self-refresh, resuming request scheduling).
//!
//! A rank powers down only with empty queues, no outstanding events, and refresh idle.
//! Exits cost `tXP` from power-down and `tXS` from self-refresh.

use tracing::debug;

use super::command::DramCommand;
use super::engine::TimingEngine;
use super::event::RankEvent;
use super::host::{ControllerHost, DrainState};
use super::rank::{PowerState, RefreshState};
use crate::common::{DramError, DramResult, Tick};

impl TimingEngine {
    /// Schedules a transition of rank `r` to `state` at `at`.
    ///
    /// # Errors
    ///
    /// [`DramError::PowerEventConflict`] if another transition is still pending.
    pub(crate) fn schedule_power_event(
        &mut self,
        r: usize,
        state: PowerState,
        at: Tick,
    ) -> DramResult<()> {
        let id = self.event(r, RankEvent::Power);
        let rank = &mut self.ranks[r];
        if self.events.is_scheduled(id) {
            return Err(DramError::PowerEventConflict {
                rank: rank.rank,
                requested: state.as_str(),
                pending: rank.power_state_trans.as_str(),
                at,
            });
        }
        debug!(rank = rank.rank, at, state = state.as_str(), "power event scheduled");
        rank.power_state_trans = state;
        self.events.schedule(id, at.max(self.now))
    }

    /// Commits rank `r` to a low-power state at `at`.
    ///
    /// `Ref` means "just refreshed" and enters precharge power-down. `Sref` is only
    /// valid after waking from precharge power-down for a refresh.
    pub(crate) fn power_down_sleep(
        &mut self,
        r: usize,
        state: PowerState,
        at: Tick,
    ) -> DramResult<()> {
        let (target, command) = match state {
            PowerState::ActPdn => (PowerState::ActPdn, DramCommand::PdnFAct),
            PowerState::PrePdn | PowerState::Ref => (PowerState::PrePdn, DramCommand::PdnFPre),
            PowerState::Sref => {
                if self.ranks[r].power_state_post_refresh != PowerState::PrePdn {
                    return Err(DramError::InvalidPowerState {
                        rank: self.ranks[r].rank,
                        what: "self-refresh entry",
                        state: self.ranks[r].power_state_post_refresh.as_str(),
                    });
                }
                (PowerState::Sref, DramCommand::Sren)
            }
            PowerState::Idle | PowerState::Act => {
                return Err(DramError::InvalidPowerState {
                    rank: self.ranks[r].rank,
                    what: "power-down entry",
                    state: state.as_str(),
                });
            }
        };

        self.schedule_power_event(r, target, at.max(self.now))?;
        self.log_command(r, command, 0, at);

        // entry is committed; hold off wake-up for one clock
        let t_ck = self.cfg.timing.t_ck;
        let rank = &mut self.ranks[r];
        rank.wake_up_allowed_at = at + t_ck;
        rank.in_low_power = true;
        Ok(())
    }

    /// Starts waking rank `r`; commands may issue `exit_delay` after the wake-up tick.
    pub(crate) fn schedule_wake_up(&mut self, r: usize, exit_delay: Tick) -> DramResult<()> {
        let rank = &mut self.ranks[r];
        let wake_at = self.now.max(rank.wake_up_allowed_at);
        debug!(rank = rank.rank, at = wake_at, "wake-up scheduled");

        // waking for refresh returns to the low-power state afterwards
        rank.power_state_post_refresh = if rank.refresh_state == RefreshState::PdExit {
            rank.power_state
        } else {
            PowerState::Idle
        };

        for bank in &mut rank.banks {
            bank.raise_all(wake_at + exit_delay);
        }
        rank.in_low_power = false;

        // the entry transition may not have been applied yet
        let command = match rank.power_state_trans {
            PowerState::ActPdn => Some(DramCommand::PupAct),
            PowerState::PrePdn => Some(DramCommand::PupPre),
            PowerState::Sref => Some(DramCommand::Srex),
            _ => None,
        };
        if let Some(command) = command {
            self.log_command(r, command, 0, wake_at);
        }

        let id = self.event(r, RankEvent::WakeUp);
        self.events.schedule(id, wake_at)
    }

    pub(crate) fn process_wake_up_event(&mut self, r: usize) -> DramResult<()> {
        let state = self.ranks[r].power_state;
        let next = match state {
            // banks are still open
            PowerState::ActPdn => PowerState::Act,
            PowerState::PrePdn | PowerState::Sref => PowerState::Idle,
            _ => {
                return Err(DramError::InvalidPowerState {
                    rank: self.ranks[r].rank,
                    what: "wake-up",
                    state: state.as_str(),
                });
            }
        };
        self.schedule_power_event(r, next, self.now)
    }

    pub(crate) fn account_power_residency(&mut self, r: usize) {
        let now = self.now;
        let rank = &mut self.ranks[r];
        let duration = now.saturating_sub(rank.power_state_at);
        let stats = &mut self.stats.power[r];
        stats.state_time[rank.power_state.index()] += duration;
        if rank.power_state.is_low_power() {
            stats.total_idle_time += duration;
        }
        rank.power_state_at = now;
    }

    pub(crate) fn process_power_event(
        &mut self,
        r: usize,
        host: &mut dyn ControllerHost,
    ) -> DramResult<()> {
        let now = self.now;
        let prev_state = self.ranks[r].power_state;
        let duration = now.saturating_sub(self.ranks[r].power_state_at);
        self.account_power_residency(r);

        let rank_id = self.ranks[r].rank;
        let rank = &mut self.ranks[r];
        rank.power_state = rank.power_state_trans;
        debug!(
            rank = rank_id,
            at = now,
            from = prev_state.as_str(),
            to = rank.power_state.as_str(),
            "power state"
        );

        if prev_state == PowerState::Ref {
            // only the refresh itself should be outstanding
            if rank.outstanding_events == 0 {
                return Err(DramError::OutstandingUnderflow { rank: rank_id });
            }
            rank.outstanding_events -= 1;
            rank.refresh_state = RefreshState::Idle;
            debug!(rank = rank_id, duration, "refresh complete");

            if !host.request_event_scheduled() {
                host.restart_scheduler(now);
            }
        }

        let t_xp = self.cfg.timing.t_xp;
        let t_xs = self.cfg.timing.t_xs;
        let state = self.ranks[r].power_state;
        let refresh_state = self.ranks[r].refresh_state;

        if state == PowerState::Act && refresh_state == RefreshState::PdExit {
            // out of active power-down; close the banks for the refresh
            self.ranks[r].refresh_state = RefreshState::Pre;
            let id = self.event(r, RankEvent::Refresh);
            self.events.schedule(id, now)?;
        } else if state == PowerState::Idle {
            if prev_state == PowerState::Sref {
                // stay unavailable for tXS, then refresh
                self.ranks[r].refresh_state = RefreshState::SrefExit;
                let id = self.event(r, RankEvent::Refresh);
                self.events.schedule(id, now + t_xs)?;
            } else if matches!(refresh_state, RefreshState::Pre | RefreshState::PdExit)
                && !self.events.is_scheduled(self.event(r, RankEvent::Activate))
            {
                // restart refresh only after the final precharge
                if refresh_state == RefreshState::PdExit {
                    self.schedule_power_event(r, PowerState::Ref, now + t_xp)?;
                } else {
                    self.ranks[r].power_state = PowerState::Ref;
                }
            }
        }

        if self.ranks[r].power_state == PowerState::Ref {
            let draining = matches!(
                host.drain_state(),
                DrainState::Draining | DrainState::Drained
            );
            if self.ranks[r].power_state_post_refresh == PowerState::PrePdn
                && self.is_queue_empty(r, host)
                && !draining
                && self.cfg.policy.enable_powerdown
            {
                // self-refresh refreshes on entry, so skip the explicit refresh
                debug!(rank = rank_id, at = now, "bypassing refresh into self-refresh");
                self.power_down_sleep(r, PowerState::Sref, now)?;
                let rank = &mut self.ranks[r];
                rank.outstanding_events = rank.outstanding_events.saturating_sub(1);
                // idle until the self-refresh entry applies
                rank.power_state = PowerState::Idle;
            } else {
                let id = self.event(r, RankEvent::Refresh);
                self.events.schedule(id, now)?;
                self.ranks[r].refresh_state = RefreshState::Start;
            }
        }
        Ok(())
    }

    pub(crate) fn process_activate_event(&mut self, r: usize) -> DramResult<()> {
        // a later precharge may already have closed the bank again
        if self.ranks[r].power_state != PowerState::Act {
            self.schedule_power_event(r, PowerState::Act, self.now)?;
        }
        Ok(())
    }

    pub(crate) fn process_precharge_event(
        &mut self,
        r: usize,
        host: &dyn ControllerHost,
    ) -> DramResult<()> {
        let rank = &mut self.ranks[r];
        if rank.outstanding_events == 0 {
            return Err(DramError::OutstandingUnderflow { rank: rank.rank });
        }
        rank.outstanding_events -= 1;

        if rank.num_banks_active != 0 {
            return Ok(());
        }

        let sleep = rank.outstanding_events == 0
            && self.cfg.policy.enable_powerdown
            && self.is_queue_empty(r, host);
        if sleep {
            let state = self.ranks[r].power_state;
            if state != PowerState::Act {
                return Err(DramError::InvalidPowerState {
                    rank: self.ranks[r].rank,
                    what: "precharge power-down entry",
                    state: state.as_str(),
                });
            }
            debug!(rank = self.ranks[r].rank, at = self.now, "rank sleep");
            self.power_down_sleep(r, PowerState::PrePdn, self.now)
        } else {
            self.schedule_power_event(r, PowerState::Idle, self.now)
        }
    }

    pub(crate) fn process_write_done_event(&mut self, r: usize) -> DramResult<()> {
        let rank = &mut self.ranks[r];
        if rank.outstanding_events == 0 {
            return Err(DramError::OutstandingUnderflow { rank: rank.rank });
        }
        rank.outstanding_events -= 1;
        Ok(())
    }

    /// Whether rank `r` has nothing queued in the upcoming bus direction.
    pub(crate) fn is_queue_empty(&self, r: usize, host: &dyn ControllerHost) -> bool {
        let rank = &self.ranks[r];
        (host.in_read_bus_state(true) && rank.read_entries == 0)
            || (host.in_write_bus_state(true) && rank.write_entries == 0)
    }

    /// Whether rank `r` has enough queued work to leave self-refresh.
    pub(crate) fn force_self_refresh_exit(&self, r: usize, host: &dyn ControllerHost) -> bool {
        let rank = &self.ranks[r];
        rank.read_entries != 0 || (host.in_write_bus_state(true) && rank.write_entries != 0)
    }
}
