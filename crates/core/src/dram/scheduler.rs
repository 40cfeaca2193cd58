//! FR-FCFS request selection.
//!
//! Row hits that can issue without extra bus delay win outright, earliest in the queue
//! first. Otherwise the scheduler falls back to a row hit whose bank is still busy, or to a
//! miss whose bank can be prepared soonest; a miss whose precharge/activate is hidden behind
//! the current bus activity beats a delayed hit.

use tracing::trace;

use super::engine::TimingEngine;
use super::host::ControllerHost;
use super::request::RequestQueue;
use crate::common::{MAX_TICK, Tick};

impl TimingEngine {
    /// Picks the next request to serve from `queue`.
    ///
    /// # Arguments
    ///
    /// * `queue` - Pending requests of one direction, in arrival order.
    /// * `min_col_at` - Earliest tick the next column command could use the bus.
    /// * `host` - Controller state (current bus direction).
    ///
    /// # Returns
    ///
    /// The queue index of the selected request and its column watermark, or `None` if no
    /// queued request targets a refresh-idle rank.
    pub fn choose_next_frfcfs(
        &self,
        queue: &RequestQueue,
        min_col_at: Tick,
        host: &dyn ControllerHost,
    ) -> Option<(usize, Tick)> {
        let mut earliest_banks: Vec<u64> = Vec::new();
        let mut filled_earliest_banks = false;
        let mut hidden_bank_prep = false;

        let mut found_hidden_bank = false;
        let mut found_prepped_pkt = false;
        let mut found_earliest_pkt = false;

        let mut selected: Option<(usize, Tick)> = None;

        for (i, req) in queue.iter().enumerate() {
            let Some(bank) = self.bank(req.rank, req.bank) else {
                continue;
            };
            if !self.burst_ready(req) {
                trace!(rank = req.rank, bank = req.bank, "rank not available");
                continue;
            }
            let col_allowed_at = bank.col_allowed_at(req.is_read);

            if bank.is_open(req.row) {
                if col_allowed_at <= min_col_at {
                    trace!(rank = req.rank, bank = req.bank, "seamless row hit");
                    return Some((i, col_allowed_at));
                }
                if !found_hidden_bank && !found_prepped_pkt {
                    trace!(rank = req.rank, bank = req.bank, "prepped row hit");
                    selected = Some((i, col_allowed_at));
                    found_prepped_pkt = true;
                }
            } else if !found_earliest_pkt {
                if !filled_earliest_banks {
                    (earliest_banks, hidden_bank_prep) = self.min_bank_prep(queue, min_col_at, host);
                    filled_earliest_banks = true;
                }

                let in_mask = earliest_banks
                    .get(usize::from(req.rank))
                    .is_some_and(|mask| mask & (1u64 << req.bank) != 0);
                if in_mask {
                    found_earliest_pkt = true;
                    found_hidden_bank = hidden_bank_prep;
                    // bank commands issuing behind the scenes beat a delayed hit
                    if hidden_bank_prep || !found_prepped_pkt {
                        trace!(
                            rank = req.rank,
                            bank = req.bank,
                            hidden = hidden_bank_prep,
                            "earliest bank miss"
                        );
                        selected = Some((i, col_allowed_at));
                    }
                }
            }
        }

        if selected.is_none() {
            trace!("no available ranks found");
        }
        selected
    }

    /// Finds the banks that can be prepared earliest for the queued requests.
    ///
    /// # Arguments
    ///
    /// * `queue` - Pending requests.
    /// * `min_col_at` - Earliest tick the next column command could use the bus.
    /// * `host` - Controller state (selects the read or write watermark).
    ///
    /// # Returns
    ///
    /// One bank bitmask per rank, and whether the winning activate is hidden (early enough
    /// to add no bus delay).
    pub fn min_bank_prep(
        &self,
        queue: &RequestQueue,
        min_col_at: Tick,
        host: &dyn ControllerHost,
    ) -> (Vec<u64>, bool) {
        let t_rp = self.cfg.timing.t_rp;
        let t_rcd = self.cfg.timing.t_rcd;
        let banks_per_rank = self.cfg.device.banks_per_rank as usize;
        let now = self.now;

        let mut bank_mask = vec![0u64; self.ranks.len()];
        let mut min_act_at = MAX_TICK;

        // latest activate that still adds no data bus delay
        let hidden_act_max = min_col_at.saturating_sub(t_rcd).max(now);

        let mut found_seamless_bank = false;
        let mut hidden_bank_prep = false;

        let mut got_waiting = vec![false; self.ranks.len() * banks_per_rank];
        for req in queue {
            if self.burst_ready(req) {
                if let Some(slot) = got_waiting.get_mut(req.bank_id(banks_per_rank)) {
                    *slot = true;
                }
            }
        }

        let read_bus = host.in_read_bus_state(false);
        for (i, rank) in self.ranks.iter().enumerate() {
            for (j, bank) in rank.banks.iter().enumerate() {
                if !got_waiting[i * banks_per_rank + j] {
                    continue;
                }

                // ignores rank-to-rank switching
                let act_at = if bank.open_row.is_none() {
                    bank.act_allowed_at().max(now)
                } else {
                    bank.pre_allowed_at().max(now) + t_rp
                };
                let col_allowed_at = bank.col_allowed_at(read_bus);
                let col_at = col_allowed_at.max(act_at + t_rcd);

                let new_seamless_bank = col_at <= min_col_at;
                if new_seamless_bank || (!found_seamless_bank && act_at <= min_act_at) {
                    // a first seamless bank, or a strictly earlier activate, restarts the set
                    if !found_seamless_bank && (new_seamless_bank || act_at < min_act_at) {
                        bank_mask.fill(0);
                    }
                    found_seamless_bank |= new_seamless_bank;
                    hidden_bank_prep = act_at <= hidden_act_max;
                    bank_mask[i] |= 1u64 << j;
                    min_act_at = act_at;
                }
            }
        }

        (bank_mask, hidden_bank_prep)
    }
}
