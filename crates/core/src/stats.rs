//! DRAM channel statistics collection and reporting.
//!
//! This module tracks the counters updated by the timing engine. It provides:
//! 1. **Bursts:** Read and write bursts, row hits, and bytes transferred.
//! 2. **Bank commands:** Activates, precharges, refreshes, and bytes per activate.
//! 3. **Latency:** Queueing, bus, and total access latency of reads.
//! 4. **Power states:** Per-rank residency and low-power idle time.
//!
//! No energy numbers are computed; the command stream is the input for that.

use serde::Serialize;

use crate::dram::rank::PowerState;

/// Power-state residency of one rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankPowerStats {
    /// Ticks spent in each state, indexed by [`PowerState::index`].
    pub state_time: [u64; PowerState::COUNT],
    /// Ticks spent in a low-power state.
    pub total_idle_time: u64,
}

impl RankPowerStats {
    /// Ticks spent in `state`.
    pub const fn time_in(&self, state: PowerState) -> u64 {
        self.state_time[state.index()]
    }
}

/// Counters of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DramStats {
    /// Read bursts issued.
    pub read_bursts: u64,
    /// Write bursts issued.
    pub write_bursts: u64,
    /// Read bursts served from an open row.
    pub read_row_hits: u64,
    /// Write bursts served from an open row.
    pub write_row_hits: u64,
    /// Bytes read.
    pub bytes_read: u64,
    /// Bytes written.
    pub bytes_written: u64,

    /// Activates issued.
    pub activates: u64,
    /// Precharges issued (explicit and automatic).
    pub precharges: u64,
    /// Refreshes issued.
    pub refreshes: u64,
    /// Sum of bytes accessed per closed activation.
    pub bytes_per_activate_total: u64,
    /// Closed activations sampled into `bytes_per_activate_total`.
    pub bytes_per_activate_samples: u64,

    /// Read bursts per flat bank index.
    pub per_bank_rd_bursts: Vec<u64>,
    /// Write bursts per flat bank index.
    pub per_bank_wr_bursts: Vec<u64>,

    /// Total ticks reads spent queued before their column command.
    pub tot_q_lat: u64,
    /// Total ticks reads occupied the data bus.
    pub tot_bus_lat: u64,
    /// Total ticks from read entry to data ready.
    pub tot_mem_acc_lat: u64,

    /// Power residency per rank.
    pub power: Vec<RankPowerStats>,
}

impl DramStats {
    /// Creates zeroed statistics sized for the given organization.
    pub fn new(ranks: usize, banks_per_rank: usize) -> Self {
        Self {
            per_bank_rd_bursts: vec![0; ranks * banks_per_rank],
            per_bank_wr_bursts: vec![0; ranks * banks_per_rank],
            power: vec![RankPowerStats::default(); ranks],
            ..Self::default()
        }
    }

    fn ratio(num: u64, den: u64) -> f64 {
        if den == 0 { 0.0 } else { num as f64 / den as f64 }
    }

    /// Read row hit rate in percent.
    pub fn read_row_hit_rate(&self) -> f64 {
        Self::ratio(self.read_row_hits, self.read_bursts) * 100.0
    }

    /// Write row hit rate in percent.
    pub fn write_row_hit_rate(&self) -> f64 {
        Self::ratio(self.write_row_hits, self.write_bursts) * 100.0
    }

    /// Combined row hit rate in percent.
    pub fn page_hit_rate(&self) -> f64 {
        Self::ratio(
            self.read_row_hits + self.write_row_hits,
            self.read_bursts + self.write_bursts,
        ) * 100.0
    }

    /// Average queueing latency per read burst.
    pub fn avg_q_lat(&self) -> f64 {
        Self::ratio(self.tot_q_lat, self.read_bursts)
    }

    /// Average bus latency per read burst.
    pub fn avg_bus_lat(&self) -> f64 {
        Self::ratio(self.tot_bus_lat, self.read_bursts)
    }

    /// Average access latency per read burst.
    pub fn avg_mem_acc_lat(&self) -> f64 {
        Self::ratio(self.tot_mem_acc_lat, self.read_bursts)
    }

    /// Average bytes accessed per activation.
    pub fn avg_bytes_per_activate(&self) -> f64 {
        Self::ratio(self.bytes_per_activate_total, self.bytes_per_activate_samples)
    }

    /// Prints only the requested sections. Empty slice means print all.
    ///
    /// Section names: `summary`, `latency`, `banks`, `power`.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            println!("\n==========================================================");
            println!("DRAM CHANNEL STATISTICS");
            println!("==========================================================");
            println!("read_bursts              {}", self.read_bursts);
            println!("write_bursts             {}", self.write_bursts);
            println!(
                "read_row_hits            {} ({:.2}%)",
                self.read_row_hits,
                self.read_row_hit_rate()
            );
            println!(
                "write_row_hits           {} ({:.2}%)",
                self.write_row_hits,
                self.write_row_hit_rate()
            );
            println!("page_hit_rate            {:.2}%", self.page_hit_rate());
            println!("bytes_read               {}", self.bytes_read);
            println!("bytes_written            {}", self.bytes_written);
            println!("activates                {}", self.activates);
            println!("precharges               {}", self.precharges);
            println!("refreshes                {}", self.refreshes);
            println!(
                "bytes_per_activate       {:.2}",
                self.avg_bytes_per_activate()
            );
            println!("----------------------------------------------------------");
        }
        if want("latency") {
            println!("READ LATENCY");
            println!("  lat.queue_avg          {:.2}", self.avg_q_lat());
            println!("  lat.bus_avg            {:.2}", self.avg_bus_lat());
            println!("  lat.access_avg         {:.2}", self.avg_mem_acc_lat());
            println!("----------------------------------------------------------");
        }
        if want("banks") {
            println!("PER-BANK BURSTS");
            for (i, (rd, wr)) in self
                .per_bank_rd_bursts
                .iter()
                .zip(&self.per_bank_wr_bursts)
                .enumerate()
            {
                if *rd > 0 || *wr > 0 {
                    println!("  bank[{i:>3}]              rd {rd:<10} wr {wr}");
                }
            }
            println!("----------------------------------------------------------");
        }
        if want("power") {
            println!("POWER STATE RESIDENCY");
            for (r, p) in self.power.iter().enumerate() {
                for state in PowerState::ALL {
                    println!(
                        "  rank{r}.{:<22} {}",
                        state.as_str(),
                        p.time_in(state)
                    );
                }
                println!("  rank{r}.total_idle_time       {}", p.total_idle_time);
            }
        }
        println!("==========================================================");
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
