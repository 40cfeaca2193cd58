//! Trace controller.
//!
//! Drives one [`TimingEngine`] from a request trace. The controller keeps:
//! 1. **Queues:** One read and one write queue, served FR-FCFS.
//! 2. **Bus direction:** Reads are preferred; the bus turns to writes when the read queue is
//!    empty or the write queue crosses its high watermark, and back once it falls to the low
//!    watermark.
//! 3. **Responses:** Reads retire at their ready time, which may let a rank power down or
//!    resume a refresh.
//!
//! Time advances to the earliest of the next arrival, the next scheduling attempt, the next
//! response, and the next engine callback.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, trace};

use super::SimError;
use super::trace::{TraceRecord, check_bounds};
use crate::common::{DramResult, Tick};
use crate::config::Config;
use crate::dram::{
    CommandRecorder, DramRequest, HostState, RankEvent, RecordedCommand, RequestQueue,
    TimingEngine,
};
use crate::stats::DramStats;

/// Outcome of a trace run.
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Engine statistics at the end of the run.
    pub stats: DramStats,
    /// Command stream, in issue order per rank.
    pub commands: Vec<RecordedCommand>,
    /// Tick the last request completed at.
    pub end_tick: Tick,
    /// Requests served.
    pub served: u64,
}

/// Minimal memory controller around a timing engine.
#[derive(Debug)]
pub struct TraceController {
    engine: TimingEngine,
    host: HostState,
    arrivals: VecDeque<TraceRecord>,
    read_queue: RequestQueue,
    write_queue: RequestQueue,
    // (ready tick, request id) -> rank
    responses: BTreeMap<(Tick, u64), u8>,
    next_burst_at: Tick,
    next_req_at: Option<Tick>,
    next_id: u64,
    served: u64,
    write_high: usize,
    write_low: usize,
    recorder: CommandRecorder,
}

impl TraceController {
    /// Creates a controller for `trace`.
    ///
    /// # Arguments
    ///
    /// * `config` - Channel configuration.
    /// * `trace` - Requests sorted by arrival tick.
    ///
    /// # Returns
    ///
    /// A controller ready to [`run`](Self::run), or an error if the configuration is
    /// invalid or a record addresses a missing rank or bank.
    pub fn new(config: &Config, trace: Vec<TraceRecord>) -> Result<Self, SimError> {
        let engine = TimingEngine::with_private_bus(config)?;
        check_bounds(
            &trace,
            config.device.ranks_per_channel,
            config.device.banks_per_rank,
        )?;

        Ok(Self {
            engine,
            host: HostState::default(),
            arrivals: trace.into(),
            read_queue: RequestQueue::new(),
            write_queue: RequestQueue::new(),
            responses: BTreeMap::new(),
            next_burst_at: 0,
            next_req_at: None,
            next_id: 0,
            served: 0,
            write_high: config.controller.write_high_threshold,
            write_low: config.controller.write_low_threshold,
            recorder: CommandRecorder::new(),
        })
    }

    /// The engine being driven.
    pub const fn engine(&self) -> &TimingEngine {
        &self.engine
    }

    /// Runs the trace to completion.
    ///
    /// # Returns
    ///
    /// Statistics and the command stream once every request has been served and every read
    /// has responded.
    pub fn run(mut self) -> Result<SimReport, SimError> {
        self.engine.startup(0)?;
        info!(requests = self.arrivals.len(), "trace run started");

        while let Some(t) = self.next_time() {
            self.step(t)?;
        }

        // let in-flight writes and precharges complete so their commands are flushed
        let settle_at = self.settle_time();
        self.sync_host();
        self.engine.advance_to(settle_at, &mut self.host)?;

        self.engine.suspend();
        self.engine.flush_command_logs(&mut self.recorder);
        let end_tick = self.engine.now();
        info!(
            served = self.served,
            end_tick,
            commands = self.recorder.commands.len(),
            "trace run finished"
        );

        Ok(SimReport {
            stats: self.engine.stats().clone(),
            commands: self.recorder.commands,
            end_tick,
            served: self.served,
        })
    }

    fn is_done(&self) -> bool {
        self.arrivals.is_empty()
            && self.read_queue.is_empty()
            && self.write_queue.is_empty()
            && self.responses.is_empty()
    }

    fn next_time(&self) -> Option<Tick> {
        if self.is_done() {
            return None;
        }
        [
            self.arrivals.front().map(|r| r.at),
            self.next_req_at,
            self.responses.keys().next().map(|&(at, _)| at),
            self.engine.next_event_at(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn settle_time(&self) -> Tick {
        let engine = &self.engine;
        engine
            .ranks()
            .iter()
            .flat_map(|rank| {
                [RankEvent::WriteDone, RankEvent::Precharge, RankEvent::Activate]
                    .into_iter()
                    .filter_map(move |kind| engine.event_time(rank.rank, kind))
            })
            .fold(self.next_burst_at.max(engine.now()), Tick::max)
    }

    fn sync_host(&mut self) {
        self.host.request_scheduled = self.next_req_at.is_some();
        self.host.respond_scheduled = !self.responses.is_empty();
    }

    fn schedule_request(&mut self, at: Tick) {
        let at = at.max(self.engine.now());
        self.next_req_at = Some(self.next_req_at.map_or(at, |t| t.min(at)));
    }

    fn step(&mut self, t: Tick) -> DramResult<()> {
        self.sync_host();
        self.engine.advance_to(t, &mut self.host)?;
        if let Some(at) = self.host.take_restart() {
            trace!(at, "scheduler restart");
            self.schedule_request(at);
        }

        while let Some(record) = self.arrivals.front().copied().filter(|r| r.at <= t) {
            let _ = self.arrivals.pop_front();
            self.enqueue(record, t)?;
        }

        while let Some((&(at, id), &rank)) = self.responses.first_key_value() {
            if at > t {
                break;
            }
            let _ = self.responses.remove(&(at, id));
            self.sync_host();
            trace!(id, rank, at, "read response");
            self.engine.respond_event(rank, &self.host)?;
            self.engine.check_refresh_state(rank)?;
        }

        if self.next_req_at.is_some_and(|at| at <= t) {
            self.next_req_at = None;
            self.process_request(t)?;
        }
        Ok(())
    }

    fn enqueue(&mut self, record: TraceRecord, now: Tick) -> DramResult<()> {
        let req = DramRequest::new(
            self.next_id,
            record.rank,
            record.bank,
            record.row,
            record.is_read,
            now,
        );
        self.next_id += 1;
        self.engine.setup_rank(record.rank, record.is_read)?;
        trace!(id = req.id, rank = req.rank, bank = req.bank, row = req.row, "enqueue");
        if record.is_read {
            self.read_queue.push_back(req);
        } else {
            self.write_queue.push_back(req);
        }
        if self.next_req_at.is_none() {
            // never run ahead of the burst already on the bus
            let offset = self.engine.config().command_offset();
            self.schedule_request(self.next_burst_at.saturating_sub(offset));
        }
        Ok(())
    }

    fn select_direction(&mut self) {
        let reads = self.read_queue.len();
        let writes = self.write_queue.len();
        let read_bus = if self.host.read_bus {
            !(writes > 0 && (reads == 0 || writes > self.write_high))
        } else {
            writes == 0 || (reads > 0 && writes <= self.write_low)
        };
        if read_bus != self.host.read_bus {
            debug!(read_bus, reads, writes, "bus turnaround");
        }
        self.host.set_read_bus(read_bus);
    }

    fn process_request(&mut self, now: Tick) -> DramResult<()> {
        self.select_direction();
        self.sync_host();

        if self.engine.is_busy(&self.host)? {
            trace!(now, "all ranks busy");
            return Ok(());
        }

        let queue = if self.host.read_bus {
            &mut self.read_queue
        } else {
            &mut self.write_queue
        };
        let min_col_at = self.next_burst_at.max(now);
        let Some((idx, _)) = self.engine.choose_next_frfcfs(queue, min_col_at, &self.host) else {
            return Ok(());
        };

        let mut req = queue[idx].clone();
        let (_, next_burst_at) = self.engine.do_burst_access(
            &mut req,
            self.next_burst_at,
            std::slice::from_ref(&*queue),
        )?;
        let _ = queue.remove(idx);
        self.next_burst_at = next_burst_at;
        self.served += 1;

        if req.is_read {
            let _ = self.responses.insert((req.ready_time, req.id), req.rank);
        }

        if !self.read_queue.is_empty() || !self.write_queue.is_empty() {
            let offset = self.engine.config().command_offset();
            self.schedule_request(self.next_burst_at.saturating_sub(offset));
        }
        Ok(())
    }
}
